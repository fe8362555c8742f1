// handlers/public/auth.rs - POST /v1/auth/register and POST /v1/auth/login
//
// Both return the user (never the password hash) plus a signed JWT.
// Input is validated before any database work so malformed requests are
// rejected even while the database is unreachable.

use axum::Json;

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::auth_service::{AuthPayload, LoginRequest, RegisterRequest};
use crate::services::AuthService;

/// POST /v1/auth/register - create a staff account and sign it in
pub async fn register(Json(request): Json<RegisterRequest>) -> ApiResult<AuthPayload> {
    request.validate()?;
    let payload = AuthService::new().await?.register(request).await?;
    Ok(ApiResponse::created(payload).with_message("Registration successful"))
}

/// POST /v1/auth/login
pub async fn login(Json(request): Json<LoginRequest>) -> ApiResult<AuthPayload> {
    request.validate()?;
    let payload = AuthService::new().await?.login(request).await?;
    Ok(ApiResponse::success(payload).with_message("Login successful"))
}
