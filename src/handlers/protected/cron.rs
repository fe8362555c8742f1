// handlers/protected/cron.rs - /v1/cron/* handlers (admin only)

use axum::Extension;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::scheduler::{self, SchedulerStatus};
use crate::services::{RecurringReport, RecurringService};

fn require_admin(user: &CurrentUser) -> Result<(), ApiError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Admin access required"))
    }
}

/// GET /v1/cron/status
pub async fn status(Extension(user): Extension<CurrentUser>) -> ApiResult<SchedulerStatus> {
    require_admin(&user)?;
    Ok(ApiResponse::success(scheduler::status()))
}

/// POST /v1/cron/trigger-recurring-cards - run the recurring job now
pub async fn trigger_recurring_cards(Extension(user): Extension<CurrentUser>) -> ApiResult<RecurringReport> {
    require_admin(&user)?;
    tracing::info!("Recurring job triggered manually by {}", user.email);
    let report = RecurringService::new().await?.run().await?;
    Ok(ApiResponse::success(report).with_message("Recurring cards processed"))
}
