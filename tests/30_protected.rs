mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

async fn get_with(path: &str, authorization: Option<&str>) -> Result<(StatusCode, Value)> {
    let server = common::ensure_server().await?;
    let mut request = reqwest::Client::new().get(server.url(path));
    if let Some(value) = authorization {
        request = request.header("Authorization", value);
    }
    let res = request.send().await?;
    let status = res.status();
    Ok((status, res.json::<Value>().await?))
}

#[tokio::test]
async fn missing_token_is_401() -> Result<()> {
    for path in ["/v1/boards", "/v1/cards/user/all", "/v1/dashboard/overview", "/v1/cron/status"] {
        let (status, body) = get_with(path, None).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", path);
        assert_eq!(body["error"], "Access token is required");
        assert_eq!(body["code"], "UNAUTHORIZED");
    }
    Ok(())
}

#[tokio::test]
async fn non_bearer_header_is_401() -> Result<()> {
    let (status, body) = get_with("/v1/boards", Some("Basic dXNlcjpwYXNz")).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid authorization header format");
    Ok(())
}

#[tokio::test]
async fn garbage_token_is_401() -> Result<()> {
    let (status, body) = get_with("/v1/boards", Some("Bearer not.a.jwt")).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");
    Ok(())
}

#[tokio::test]
async fn expired_token_is_401() -> Result<()> {
    let token = common::token_for(uuid::Uuid::new_v4(), -3600)?;
    let (status, body) = get_with("/v1/boards", Some(&format!("Bearer {}", token))).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Token has expired");
    Ok(())
}

#[tokio::test]
async fn valid_token_for_unknown_user_is_rejected_after_jwt_check() -> Result<()> {
    let token = common::token_for(uuid::Uuid::new_v4(), 3600)?;
    let (status, body) = get_with("/v1/users/me", Some(&format!("Bearer {}", token))).await?;

    // The user lookup needs the database: 401 when it answers, 503 otherwise
    match status {
        StatusCode::UNAUTHORIZED => assert_eq!(body["error"], "User no longer exists"),
        StatusCode::SERVICE_UNAVAILABLE => assert_eq!(body["code"], "SERVICE_UNAVAILABLE"),
        other => panic!("unexpected status {}", other),
    }
    Ok(())
}
