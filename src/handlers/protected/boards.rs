// handlers/protected/boards.rs - /v1/boards/* handlers
//
// Boards, their members and their labels. Access level checks live in the
// service; handlers only shape requests and responses.

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::board_view::{AssignedBoard, BoardDetail, BoardViewOptions};
use crate::database::models::{Board, BoardSummary, Label, MemberView};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::board_service::{
    AddMember, CreateBoard, CreateLabel, RecurringConfigInput, UpdateBoard,
};
use crate::services::{BoardService, UserService};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailQuery {
    #[serde(default)]
    pub include_archived: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardOrder {
    pub board_order_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrder {
    pub list_order_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewConfigBody {
    pub view_config: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringConfigBody {
    pub recurring_config: RecurringConfigInput,
}

#[derive(Debug, Deserialize)]
pub struct MemberRoleBody {
    pub role: String,
}

/// GET /v1/boards
pub async fn board_list(Extension(user): Extension<CurrentUser>) -> ApiResult<Vec<BoardSummary>> {
    let boards = BoardService::new().await?.list(&user).await?;
    Ok(ApiResponse::success(boards))
}

/// POST /v1/boards
pub async fn board_create(
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<CreateBoard>,
) -> ApiResult<Board> {
    let board = BoardService::new().await?.create(&user, input).await?;
    Ok(ApiResponse::created(board).with_message("Board created"))
}

/// GET /v1/boards/assigned
pub async fn board_assigned(Extension(user): Extension<CurrentUser>) -> ApiResult<AssignedBoard> {
    let board = BoardService::new().await?.assigned(&user).await?;
    Ok(ApiResponse::success(board))
}

/// PUT /v1/boards/order - the caller's personal board order
pub async fn board_order(
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<BoardOrder>,
) -> ApiResult<Vec<Uuid>> {
    let order = UserService::new()
        .await?
        .set_board_order(&user, body.board_order_ids)
        .await?;
    Ok(ApiResponse::success(order).with_message("Board order saved"))
}

/// GET /v1/boards/:id?includeArchived=
pub async fn board_get(
    Extension(user): Extension<CurrentUser>,
    Path(board_id): Path<Uuid>,
    Query(query): Query<DetailQuery>,
) -> ApiResult<BoardDetail> {
    let options = BoardViewOptions {
        include_archived: query.include_archived,
    };
    let detail = BoardService::new().await?.detail(&user, board_id, options).await?;
    Ok(ApiResponse::success(detail))
}

/// PUT|PATCH /v1/boards/:id
pub async fn board_update(
    Extension(user): Extension<CurrentUser>,
    Path(board_id): Path<Uuid>,
    Json(input): Json<UpdateBoard>,
) -> ApiResult<Board> {
    let board = BoardService::new().await?.update(&user, board_id, input).await?;
    Ok(ApiResponse::success(board).with_message("Board updated"))
}

/// DELETE /v1/boards/:id
pub async fn board_delete(
    Extension(user): Extension<CurrentUser>,
    Path(board_id): Path<Uuid>,
) -> ApiResult<Value> {
    BoardService::new().await?.delete(&user, board_id).await?;
    Ok(ApiResponse::success(Value::Null).with_message("Board deleted"))
}

/// PATCH /v1/boards/:id/reorder
pub async fn board_reorder(
    Extension(user): Extension<CurrentUser>,
    Path(board_id): Path<Uuid>,
    Json(body): Json<ListOrder>,
) -> ApiResult<Board> {
    let board = BoardService::new()
        .await?
        .reorder_lists(&user, board_id, body.list_order_ids)
        .await?;
    Ok(ApiResponse::success(board))
}

/// PATCH /v1/boards/:id/view-config
pub async fn board_view_config(
    Extension(user): Extension<CurrentUser>,
    Path(board_id): Path<Uuid>,
    Json(body): Json<ViewConfigBody>,
) -> ApiResult<Board> {
    let board = BoardService::new()
        .await?
        .set_view_config(&user, board_id, body.view_config)
        .await?;
    Ok(ApiResponse::success(board))
}

/// PATCH /v1/boards/:id/recurring-config
pub async fn board_recurring_config(
    Extension(user): Extension<CurrentUser>,
    Path(board_id): Path<Uuid>,
    Json(body): Json<RecurringConfigBody>,
) -> ApiResult<Board> {
    let board = BoardService::new()
        .await?
        .set_recurring_config(&user, board_id, body.recurring_config)
        .await?;
    Ok(ApiResponse::success(board).with_message("Recurring configuration saved"))
}

/// GET /v1/boards/:id/members
pub async fn member_list(
    Extension(user): Extension<CurrentUser>,
    Path(board_id): Path<Uuid>,
) -> ApiResult<Vec<MemberView>> {
    let members = BoardService::new().await?.members(&user, board_id).await?;
    Ok(ApiResponse::success(members))
}

/// POST /v1/boards/:id/members
pub async fn member_add(
    Extension(user): Extension<CurrentUser>,
    Path(board_id): Path<Uuid>,
    Json(input): Json<AddMember>,
) -> ApiResult<MemberView> {
    let member = BoardService::new().await?.add_member(&user, board_id, input).await?;
    Ok(ApiResponse::created(member).with_message("Member added"))
}

/// PUT /v1/boards/:id/members/:member_id
pub async fn member_update(
    Extension(user): Extension<CurrentUser>,
    Path((board_id, member_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<MemberRoleBody>,
) -> ApiResult<MemberView> {
    let member = BoardService::new()
        .await?
        .update_member(&user, board_id, member_id, &body.role)
        .await?;
    Ok(ApiResponse::success(member))
}

/// DELETE /v1/boards/:id/members/:member_id
pub async fn member_remove(
    Extension(user): Extension<CurrentUser>,
    Path((board_id, member_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Value> {
    BoardService::new().await?.remove_member(&user, board_id, member_id).await?;
    Ok(ApiResponse::success(Value::Null).with_message("Member removed"))
}

/// GET /v1/boards/:id/labels
pub async fn label_list(
    Extension(user): Extension<CurrentUser>,
    Path(board_id): Path<Uuid>,
) -> ApiResult<Vec<Label>> {
    let labels = BoardService::new().await?.labels(&user, board_id).await?;
    Ok(ApiResponse::success(labels))
}

/// POST /v1/boards/:id/labels
pub async fn label_create(
    Extension(user): Extension<CurrentUser>,
    Path(board_id): Path<Uuid>,
    Json(input): Json<CreateLabel>,
) -> ApiResult<Label> {
    let label = BoardService::new().await?.create_label(&user, board_id, input).await?;
    Ok(ApiResponse::created(label))
}

/// DELETE /v1/boards/:id/labels/:label_id
pub async fn label_delete(
    Extension(user): Extension<CurrentUser>,
    Path((board_id, label_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Value> {
    BoardService::new().await?.delete_label(&user, board_id, label_id).await?;
    Ok(ApiResponse::success(Value::Null).with_message("Label deleted"))
}
