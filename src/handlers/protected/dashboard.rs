// handlers/protected/dashboard.rs - /v1/dashboard/* handlers

use axum::{extract::Query, Extension};
use serde::Deserialize;

use crate::dashboard::{CategorySeries, MemberActivity, Overview, WorkStatistics};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::dashboard_service::ChartData;
use crate::services::DashboardService;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartQuery {
    pub chart_type: Option<String>,
    pub time_range: Option<String>,
}

/// GET /v1/dashboard/work-statistics
pub async fn work_statistics(Extension(user): Extension<CurrentUser>) -> ApiResult<WorkStatistics> {
    let stats = DashboardService::new().await?.work_statistics(&user).await?;
    Ok(ApiResponse::success(stats))
}

/// GET /v1/dashboard/active-members
pub async fn active_members(Extension(user): Extension<CurrentUser>) -> ApiResult<Vec<MemberActivity>> {
    let members = DashboardService::new().await?.active_members(&user).await?;
    Ok(ApiResponse::success(members))
}

/// GET /v1/dashboard/chart-data?chartType=&timeRange=
pub async fn chart_data(
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ChartQuery>,
) -> ApiResult<ChartData> {
    let chart_type = query
        .chart_type
        .as_deref()
        .ok_or_else(|| ApiError::invalid_field("chartType", "chartType is required"))?;
    let data = DashboardService::new()
        .await?
        .chart_data(&user, chart_type, query.time_range.as_deref())
        .await?;
    Ok(ApiResponse::success(data))
}

/// GET /v1/dashboard/overview
pub async fn overview(Extension(user): Extension<CurrentUser>) -> ApiResult<Overview> {
    let overview = DashboardService::new().await?.overview(&user).await?;
    Ok(ApiResponse::success(overview))
}

/// GET /v1/dashboard/gantt-chart?timeRange=day|week|month
pub async fn gantt_chart(
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ChartQuery>,
) -> ApiResult<CategorySeries> {
    let chart = DashboardService::new()
        .await?
        .gantt_chart(&user, query.time_range.as_deref())
        .await?;
    Ok(ApiResponse::success(chart))
}
