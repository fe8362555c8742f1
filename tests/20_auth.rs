mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn post(path: &str, payload: Value) -> Result<(StatusCode, Value)> {
    let server = common::ensure_server().await?;
    let res = reqwest::Client::new()
        .post(server.url(path))
        .json(&payload)
        .send()
        .await?;
    let status = res.status();
    Ok((status, res.json::<Value>().await?))
}

#[tokio::test]
async fn register_rejects_invalid_email() -> Result<()> {
    let (status, body) = post(
        "/v1/auth/register",
        json!({"name": "Ada", "email": "not-an-email", "password": "secret123"}),
    )
    .await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["field_errors"]["email"], "Email is invalid");
    Ok(())
}

#[tokio::test]
async fn register_rejects_short_password() -> Result<()> {
    let (status, body) = post(
        "/v1/auth/register",
        json!({"name": "Ada", "email": "ada@example.com", "password": "12345"}),
    )
    .await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field_errors"]["password"], "Password must be at least 6 characters");
    Ok(())
}

#[tokio::test]
async fn register_requires_a_name() -> Result<()> {
    let (status, body) = post(
        "/v1/auth/register",
        json!({"name": "   ", "email": "ada@example.com", "password": "secret123"}),
    )
    .await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field_errors"]["name"], "Name is required");
    Ok(())
}

#[tokio::test]
async fn login_requires_email_and_password() -> Result<()> {
    let (status, body) = post("/v1/auth/login", json!({"email": "", "password": ""})).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email and password are required");
    Ok(())
}

#[tokio::test]
async fn login_for_unknown_user_fails_cleanly() -> Result<()> {
    let email = format!("{}@example.com", uuid::Uuid::new_v4().simple());
    let (status, body) = post("/v1/auth/login", json!({"email": email, "password": "secret123"})).await?;

    // 404 with a database, 503 without one
    assert!(
        status == StatusCode::NOT_FOUND || status == StatusCode::SERVICE_UNAVAILABLE,
        "unexpected status {}",
        status
    );
    assert_eq!(body["success"], false);
    if status == StatusCode::NOT_FOUND {
        assert_eq!(body["error"], "User not found");
    }
    Ok(())
}

#[tokio::test]
async fn oversized_bodies_are_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    let name = "x".repeat(common::MAX_BODY_BYTES * 2);
    let res = reqwest::Client::new()
        .post(server.url("/v1/auth/register"))
        .json(&json!({"name": name, "email": "big@example.com", "password": "secret123"}))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    Ok(())
}
