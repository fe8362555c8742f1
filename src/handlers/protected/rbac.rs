// handlers/protected/rbac.rs - /v1/roles/* and /v1/permissions/*

use axum::{extract::Path, Extension, Json};
use serde_json::Value;
use uuid::Uuid;

use crate::database::models::{Permission, Role};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::rbac_service::{NamedInput, PermissionIds, RBAC_MANAGE};
use crate::services::RbacService;

/// Service handle for a write, after checking `rbac.manage`
async fn manager(user: &CurrentUser) -> Result<RbacService, ApiError> {
    let service = RbacService::new().await?;
    service.require_permission(user, RBAC_MANAGE).await?;
    Ok(service)
}

/// GET /v1/roles
pub async fn role_list(Extension(_user): Extension<CurrentUser>) -> ApiResult<Vec<Role>> {
    let roles = RbacService::new().await?.roles().await?;
    Ok(ApiResponse::success(roles))
}

/// POST /v1/roles
pub async fn role_create(
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<NamedInput>,
) -> ApiResult<Role> {
    let role = manager(&user).await?.create_role(input).await?;
    Ok(ApiResponse::created(role).with_message("Role created"))
}

/// GET /v1/roles/:id
pub async fn role_get(
    Extension(_user): Extension<CurrentUser>,
    Path(role_id): Path<Uuid>,
) -> ApiResult<Role> {
    let role = RbacService::new().await?.role(role_id).await?;
    Ok(ApiResponse::success(role))
}

/// PUT /v1/roles/:id
pub async fn role_update(
    Extension(user): Extension<CurrentUser>,
    Path(role_id): Path<Uuid>,
    Json(input): Json<NamedInput>,
) -> ApiResult<Role> {
    let role = manager(&user).await?.update_role(role_id, input).await?;
    Ok(ApiResponse::success(role).with_message("Role updated"))
}

/// DELETE /v1/roles/:id
pub async fn role_delete(
    Extension(user): Extension<CurrentUser>,
    Path(role_id): Path<Uuid>,
) -> ApiResult<Value> {
    manager(&user).await?.delete_role(role_id).await?;
    Ok(ApiResponse::success(Value::Null).with_message("Role deleted"))
}

/// GET /v1/roles/:id/permissions
pub async fn role_permissions(
    Extension(_user): Extension<CurrentUser>,
    Path(role_id): Path<Uuid>,
) -> ApiResult<Vec<Permission>> {
    let permissions = RbacService::new().await?.role_permissions(role_id).await?;
    Ok(ApiResponse::success(permissions))
}

/// PUT /v1/roles/:id/permissions - replaces the role's permission set
pub async fn role_set_permissions(
    Extension(user): Extension<CurrentUser>,
    Path(role_id): Path<Uuid>,
    Json(body): Json<PermissionIds>,
) -> ApiResult<Vec<Permission>> {
    let permissions = manager(&user)
        .await?
        .set_role_permissions(role_id, body.permission_ids)
        .await?;
    Ok(ApiResponse::success(permissions))
}

/// GET /v1/permissions
pub async fn permission_list(Extension(_user): Extension<CurrentUser>) -> ApiResult<Vec<Permission>> {
    let permissions = RbacService::new().await?.permissions().await?;
    Ok(ApiResponse::success(permissions))
}

/// POST /v1/permissions
pub async fn permission_create(
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<NamedInput>,
) -> ApiResult<Permission> {
    let permission = manager(&user).await?.create_permission(input).await?;
    Ok(ApiResponse::created(permission).with_message("Permission created"))
}

/// GET /v1/permissions/:id
pub async fn permission_get(
    Extension(_user): Extension<CurrentUser>,
    Path(permission_id): Path<Uuid>,
) -> ApiResult<Permission> {
    let permission = RbacService::new().await?.permission(permission_id).await?;
    Ok(ApiResponse::success(permission))
}

/// PUT /v1/permissions/:id
pub async fn permission_update(
    Extension(user): Extension<CurrentUser>,
    Path(permission_id): Path<Uuid>,
    Json(input): Json<NamedInput>,
) -> ApiResult<Permission> {
    let permission = manager(&user).await?.update_permission(permission_id, input).await?;
    Ok(ApiResponse::success(permission).with_message("Permission updated"))
}

/// DELETE /v1/permissions/:id
pub async fn permission_delete(
    Extension(user): Extension<CurrentUser>,
    Path(permission_id): Path<Uuid>,
) -> ApiResult<Value> {
    manager(&user).await?.delete_permission(permission_id).await?;
    Ok(ApiResponse::success(Value::Null).with_message("Permission deleted"))
}
