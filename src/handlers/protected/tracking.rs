// handlers/protected/tracking.rs - /v1/cards/tracking/* handlers

use axum::{extract::Path, Extension, Json};
use uuid::Uuid;

use crate::database::models::TimeTrackingEntry;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::time_tracking_service::TrackRequest;
use crate::services::TimeTrackingService;
use crate::tracking::TrackingSummary;

/// POST /v1/cards/tracking - {cardId, action: start|pause|resume|stop, note?}
pub async fn track(
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<TrackRequest>,
) -> ApiResult<TimeTrackingEntry> {
    let entry = TimeTrackingService::new().await?.track(&user, request).await?;
    Ok(ApiResponse::created(entry))
}

/// GET /v1/cards/tracking/:card_id/history
pub async fn history(
    Extension(user): Extension<CurrentUser>,
    Path(card_id): Path<Uuid>,
) -> ApiResult<Vec<TimeTrackingEntry>> {
    let entries = TimeTrackingService::new().await?.history(&user, card_id).await?;
    Ok(ApiResponse::success(entries))
}

/// GET /v1/cards/tracking/:card_id/summary
pub async fn summary(
    Extension(user): Extension<CurrentUser>,
    Path(card_id): Path<Uuid>,
) -> ApiResult<TrackingSummary> {
    let summary = TimeTrackingService::new().await?.summary(&user, card_id).await?;
    Ok(ApiResponse::success(summary))
}

/// POST /v1/cards/tracking/:card_id/reset
pub async fn reset(
    Extension(user): Extension<CurrentUser>,
    Path(card_id): Path<Uuid>,
) -> ApiResult<TrackingSummary> {
    let summary = TimeTrackingService::new().await?.reset(&user, card_id).await?;
    Ok(ApiResponse::success(summary).with_message("Time tracking reset"))
}
