mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn root_describes_the_service() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::get(server.url("/")).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<Value>().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Kanban API");
    assert!(body["data"]["endpoints"]["boards"].is_string());
    Ok(())
}

#[tokio::test]
async fn health_reports_database_state() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::get(server.url("/health")).await?;
    let status = res.status();
    let body = res.json::<Value>().await?;

    match status {
        StatusCode::OK => {
            assert_eq!(body["success"], true);
            assert_eq!(body["data"]["status"], "ok");
        }
        StatusCode::SERVICE_UNAVAILABLE => {
            assert_eq!(body["success"], false);
            assert_eq!(body["data"]["status"], "degraded");
            assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
        }
        other => panic!("unexpected health status {}", other),
    }
    Ok(())
}

#[tokio::test]
async fn status_is_live_without_database() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::get(server.url("/v1/status")).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn unknown_routes_are_404() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::get(server.url("/v1/nothing-here")).await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}
