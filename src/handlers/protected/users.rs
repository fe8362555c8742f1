// handlers/protected/users.rs - /v1/users/* handlers
//
// Self-service endpoints (/me, password, card order) are open to every
// authenticated user. Everything else needs admin or `users.manage`.

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::database::models::{Permission, Role, User};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::rbac_service::{PermissionIds, RoleIds, USERS_MANAGE};
use crate::services::user_service::{ChangePassword, CreateUser, PasswordStatus, UpdateUser, UserListQuery};
use crate::services::{RbacService, UserService};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardOrder {
    pub card_order_ids: Vec<Uuid>,
}

async fn require_users_manage(user: &CurrentUser) -> Result<(), crate::error::ApiError> {
    RbacService::new().await?.require_permission(user, USERS_MANAGE).await
}

/// GET /v1/users/me
pub async fn me(Extension(user): Extension<CurrentUser>) -> ApiResult<User> {
    let profile = UserService::new().await?.get(user.id).await?;
    Ok(ApiResponse::success(profile))
}

/// PUT /v1/users/change-password
pub async fn change_password(
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<ChangePassword>,
) -> ApiResult<Value> {
    UserService::new().await?.change_password(&user, input).await?;
    Ok(ApiResponse::success(Value::Null).with_message("Password changed"))
}

/// GET /v1/users/password-status
pub async fn password_status(Extension(user): Extension<CurrentUser>) -> ApiResult<PasswordStatus> {
    let status = UserService::new().await?.password_status(&user).await?;
    Ok(ApiResponse::success(status))
}

/// PATCH /v1/users/card-order
pub async fn card_order(
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<CardOrder>,
) -> ApiResult<Vec<Uuid>> {
    let order = UserService::new().await?.set_card_order(&user, body.card_order_ids).await?;
    Ok(ApiResponse::success(order).with_message("Card order saved"))
}

/// GET /v1/users?page=&limit=&search=&type=
pub async fn user_list(
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<UserListQuery>,
) -> ApiResult<Vec<User>> {
    require_users_manage(&user).await?;
    let page = UserService::new().await?.list(query).await?;
    Ok(ApiResponse::page(page))
}

/// POST /v1/users
pub async fn user_create(
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<CreateUser>,
) -> ApiResult<User> {
    require_users_manage(&user).await?;
    let created = UserService::new().await?.create(input).await?;
    Ok(ApiResponse::created(created).with_message("User created"))
}

/// GET /v1/users/:id
pub async fn user_get(
    Extension(user): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<User> {
    require_users_manage(&user).await?;
    let found = UserService::new().await?.get(user_id).await?;
    Ok(ApiResponse::success(found))
}

/// PUT|PATCH /v1/users/:id
pub async fn user_update(
    Extension(user): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
    Json(input): Json<UpdateUser>,
) -> ApiResult<User> {
    require_users_manage(&user).await?;
    let updated = UserService::new().await?.update(user_id, input).await?;
    Ok(ApiResponse::success(updated).with_message("User updated"))
}

/// DELETE /v1/users/:id
pub async fn user_delete(
    Extension(user): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Value> {
    require_users_manage(&user).await?;
    UserService::new().await?.delete(&user, user_id).await?;
    Ok(ApiResponse::success(Value::Null).with_message("User deleted"))
}

/// GET /v1/users/:id/roles
pub async fn user_roles(
    Extension(user): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Vec<Role>> {
    require_users_manage(&user).await?;
    let roles = RbacService::new().await?.user_roles(user_id).await?;
    Ok(ApiResponse::success(roles))
}

/// PUT /v1/users/:id/roles - replaces the user's roles
pub async fn user_set_roles(
    Extension(user): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<RoleIds>,
) -> ApiResult<Vec<Role>> {
    require_users_manage(&user).await?;
    let roles = RbacService::new().await?.set_user_roles(user_id, body.role_ids).await?;
    Ok(ApiResponse::success(roles))
}

/// GET /v1/users/:id/permissions - direct grants only
pub async fn user_permissions(
    Extension(user): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Vec<Permission>> {
    require_users_manage(&user).await?;
    let permissions = RbacService::new().await?.user_direct_permissions(user_id).await?;
    Ok(ApiResponse::success(permissions))
}

/// PUT /v1/users/:id/permissions - replaces the direct grants
pub async fn user_set_permissions(
    Extension(user): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<PermissionIds>,
) -> ApiResult<Vec<Permission>> {
    require_users_manage(&user).await?;
    let permissions = RbacService::new()
        .await?
        .set_user_permissions(user_id, body.permission_ids)
        .await?;
    Ok(ApiResponse::success(permissions))
}

/// GET /v1/users/:id/effective-permissions
pub async fn user_effective_permissions(
    Extension(user): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Vec<Permission>> {
    require_users_manage(&user).await?;
    let permissions = RbacService::new().await?.effective_permissions(user_id).await?;
    Ok(ApiResponse::success(permissions))
}
