// handlers/protected/cards.rs - /v1/cards/* handlers
//
// Card CRUD, moves and copies, card members and custom fields, plus the
// cross-board "my cards" listing at /v1/cards/user/all.

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::board_view::CardView;
use crate::database::models::{Card, CardWithBoard, MemberView};
use crate::database::pagination::Page;
use crate::error::ApiError;
use crate::filter::{CardQuery, CardQueryParams};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::card_service::{
    AddCardMember, CopyCard, CreateCard, CreateCustomField, MoveCard, UpdateCard, UpdateCustomField,
};
use crate::services::CardService;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardListQuery {
    pub board_id: Option<Uuid>,
    pub list_id: Option<Uuid>,
}

/// POST /v1/cards
pub async fn card_create(
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<CreateCard>,
) -> ApiResult<Card> {
    let card = CardService::new().await?.create(&user, input).await?;
    Ok(ApiResponse::created(card).with_message("Card created"))
}

/// GET /v1/cards?boardId=&listId=
pub async fn card_index(
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<CardListQuery>,
) -> ApiResult<Vec<CardView>> {
    let list_id = query
        .list_id
        .ok_or_else(|| ApiError::invalid_field("listId", "listId is required"))?;
    let cards = CardService::new().await?.by_list(&user, query.board_id, list_id).await?;
    Ok(ApiResponse::success(cards))
}

/// GET /v1/cards/user/all?search=&filters=&page=&limit=
pub async fn card_user_all(
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<CardQueryParams>,
) -> ApiResult<Vec<CardWithBoard>> {
    let query = CardQuery::try_from(params)?;
    let page = CardService::new().await?.user_cards(&user, &query).await?;
    Ok(ApiResponse::page(Page {
        items: page.cards,
        pagination: page.pagination,
    }))
}

/// GET /v1/cards/:id
pub async fn card_get(
    Extension(user): Extension<CurrentUser>,
    Path(card_id): Path<Uuid>,
) -> ApiResult<CardView> {
    let card = CardService::new().await?.get(&user, card_id).await?;
    Ok(ApiResponse::success(card))
}

/// PUT|PATCH /v1/cards/:id
pub async fn card_update(
    Extension(user): Extension<CurrentUser>,
    Path(card_id): Path<Uuid>,
    Json(input): Json<UpdateCard>,
) -> ApiResult<Card> {
    let card = CardService::new().await?.update(&user, card_id, input).await?;
    Ok(ApiResponse::success(card).with_message("Card updated"))
}

/// DELETE /v1/cards/:id
pub async fn card_delete(
    Extension(user): Extension<CurrentUser>,
    Path(card_id): Path<Uuid>,
) -> ApiResult<Value> {
    CardService::new().await?.delete(&user, card_id).await?;
    Ok(ApiResponse::success(Value::Null).with_message("Card deleted"))
}

/// PUT /v1/cards/:id/move
pub async fn card_move(
    Extension(user): Extension<CurrentUser>,
    Path(card_id): Path<Uuid>,
    Json(input): Json<MoveCard>,
) -> ApiResult<Card> {
    let card = CardService::new().await?.move_card(&user, card_id, input).await?;
    Ok(ApiResponse::success(card).with_message("Card moved"))
}

/// POST /v1/cards/:id/copy
pub async fn card_copy(
    Extension(user): Extension<CurrentUser>,
    Path(card_id): Path<Uuid>,
    input: Option<Json<CopyCard>>,
) -> ApiResult<Card> {
    let input = input.map(|Json(body)| body).unwrap_or_default();
    let card = CardService::new().await?.copy(&user, card_id, input).await?;
    Ok(ApiResponse::created(card).with_message("Card copied"))
}

/// PUT /v1/cards/:id/archive
pub async fn card_archive(
    Extension(user): Extension<CurrentUser>,
    Path(card_id): Path<Uuid>,
) -> ApiResult<Card> {
    let card = CardService::new().await?.set_archived(&user, card_id, true).await?;
    Ok(ApiResponse::success(card).with_message("Card archived"))
}

/// PUT /v1/cards/:id/restore
pub async fn card_restore(
    Extension(user): Extension<CurrentUser>,
    Path(card_id): Path<Uuid>,
) -> ApiResult<Card> {
    let card = CardService::new().await?.set_archived(&user, card_id, false).await?;
    Ok(ApiResponse::success(card).with_message("Card restored"))
}

/// GET /v1/cards/:id/members
pub async fn member_list(
    Extension(user): Extension<CurrentUser>,
    Path(card_id): Path<Uuid>,
) -> ApiResult<Vec<MemberView>> {
    let members = CardService::new().await?.members(&user, card_id).await?;
    Ok(ApiResponse::success(members))
}

/// POST /v1/cards/:id/members
pub async fn member_add(
    Extension(user): Extension<CurrentUser>,
    Path(card_id): Path<Uuid>,
    Json(input): Json<AddCardMember>,
) -> ApiResult<MemberView> {
    let member = CardService::new().await?.add_member(&user, card_id, input).await?;
    Ok(ApiResponse::success(member).with_message("Member added"))
}

/// DELETE /v1/cards/:id/members/:member_id
pub async fn member_remove(
    Extension(user): Extension<CurrentUser>,
    Path((card_id, member_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Value> {
    CardService::new().await?.remove_member(&user, card_id, member_id).await?;
    Ok(ApiResponse::success(Value::Null).with_message("Member removed"))
}

/// GET /v1/cards/:id/custom-fields
pub async fn custom_field_list(
    Extension(user): Extension<CurrentUser>,
    Path(card_id): Path<Uuid>,
) -> ApiResult<Value> {
    let fields = CardService::new().await?.custom_fields(&user, card_id).await?;
    Ok(ApiResponse::success(fields))
}

/// POST /v1/cards/:id/custom-fields
pub async fn custom_field_add(
    Extension(user): Extension<CurrentUser>,
    Path(card_id): Path<Uuid>,
    Json(input): Json<CreateCustomField>,
) -> ApiResult<Card> {
    let card = CardService::new().await?.add_custom_field(&user, card_id, input).await?;
    Ok(ApiResponse::created(card).with_message("Custom field added"))
}

/// PUT /v1/cards/:id/custom-fields/:field_name
pub async fn custom_field_update(
    Extension(user): Extension<CurrentUser>,
    Path((card_id, field_name)): Path<(Uuid, String)>,
    Json(input): Json<UpdateCustomField>,
) -> ApiResult<Card> {
    let card = CardService::new()
        .await?
        .update_custom_field(&user, card_id, &field_name, input)
        .await?;
    Ok(ApiResponse::success(card).with_message("Custom field updated"))
}

/// DELETE /v1/cards/:id/custom-fields/:field_name
pub async fn custom_field_remove(
    Extension(user): Extension<CurrentUser>,
    Path((card_id, field_name)): Path<(Uuid, String)>,
) -> ApiResult<Card> {
    let card = CardService::new()
        .await?
        .remove_custom_field(&user, card_id, &field_name)
        .await?;
    Ok(ApiResponse::success(card).with_message("Custom field removed"))
}
