// handlers/protected/lists.rs - /v1/lists/* handlers

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::database::models::List;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::list_service::{CreateList, UpdateList};
use crate::services::ListService;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub board_id: Option<Uuid>,
    #[serde(default)]
    pub include_archived: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardOrder {
    pub card_order_ids: Vec<Uuid>,
}

/// POST /v1/lists
pub async fn list_create(
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<CreateList>,
) -> ApiResult<List> {
    let list = ListService::new().await?.create(&user, input).await?;
    Ok(ApiResponse::created(list).with_message("List created"))
}

/// GET /v1/lists?boardId=
pub async fn list_index(
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<List>> {
    let board_id = query
        .board_id
        .ok_or_else(|| ApiError::invalid_field("boardId", "boardId is required"))?;
    let lists = ListService::new()
        .await?
        .by_board(&user, board_id, query.include_archived)
        .await?;
    Ok(ApiResponse::success(lists))
}

/// GET /v1/lists/board/:board_id
pub async fn list_by_board(
    Extension(user): Extension<CurrentUser>,
    Path(board_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<List>> {
    let lists = ListService::new()
        .await?
        .by_board(&user, board_id, query.include_archived)
        .await?;
    Ok(ApiResponse::success(lists))
}

/// GET /v1/lists/:id
pub async fn list_get(
    Extension(user): Extension<CurrentUser>,
    Path(list_id): Path<Uuid>,
) -> ApiResult<List> {
    let list = ListService::new().await?.get(&user, list_id).await?;
    Ok(ApiResponse::success(list))
}

/// PUT|PATCH /v1/lists/:id
pub async fn list_update(
    Extension(user): Extension<CurrentUser>,
    Path(list_id): Path<Uuid>,
    Json(input): Json<UpdateList>,
) -> ApiResult<List> {
    let list = ListService::new().await?.update(&user, list_id, input).await?;
    Ok(ApiResponse::success(list).with_message("List updated"))
}

/// DELETE /v1/lists/:id
pub async fn list_delete(
    Extension(user): Extension<CurrentUser>,
    Path(list_id): Path<Uuid>,
) -> ApiResult<Value> {
    ListService::new().await?.delete(&user, list_id).await?;
    Ok(ApiResponse::success(Value::Null).with_message("List deleted"))
}

/// PATCH /v1/lists/:id/reorder
pub async fn list_reorder(
    Extension(user): Extension<CurrentUser>,
    Path(list_id): Path<Uuid>,
    Json(body): Json<CardOrder>,
) -> ApiResult<List> {
    let list = ListService::new()
        .await?
        .reorder_cards(&user, list_id, body.card_order_ids)
        .await?;
    Ok(ApiResponse::success(list))
}

/// PUT /v1/lists/:id/archive
pub async fn list_archive(
    Extension(user): Extension<CurrentUser>,
    Path(list_id): Path<Uuid>,
) -> ApiResult<List> {
    let list = ListService::new().await?.set_archived(&user, list_id, true).await?;
    Ok(ApiResponse::success(list).with_message("List archived"))
}

/// PUT /v1/lists/:id/restore
pub async fn list_restore(
    Extension(user): Extension<CurrentUser>,
    Path(list_id): Path<Uuid>,
) -> ApiResult<List> {
    let list = ListService::new().await?.set_archived(&user, list_id, false).await?;
    Ok(ApiResponse::success(list).with_message("List restored"))
}
