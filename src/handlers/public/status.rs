// handlers/public/status.rs - service info, health and liveness probes

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::manager::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult};

/// GET / - service information
pub async fn root() -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "name": "Kanban API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "endpoints": {
            "health": "/health (public)",
            "status": "/v1/status (public)",
            "auth": "/v1/auth/register, /v1/auth/login (public)",
            "users": "/v1/users/* (protected)",
            "boards": "/v1/boards/* (protected)",
            "lists": "/v1/lists/* (protected)",
            "cards": "/v1/cards/* (protected)",
            "tracking": "/v1/cards/tracking/* (protected)",
            "dashboard": "/v1/dashboard/* (protected)",
            "organization": "/v1/companies, /v1/departments (protected)",
            "rbac": "/v1/roles, /v1/permissions (protected)",
            "cron": "/v1/cron/* (admin)",
        }
    })))
}

/// GET /health - 200 when the database answers, 503 otherwise
pub async fn health() -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "Database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                    }
                })),
            )
        }
    }
}

/// GET /v1/status - liveness only, never touches the database
pub async fn status() -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
    })))
}
