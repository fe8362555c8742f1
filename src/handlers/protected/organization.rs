// handlers/protected/organization.rs - /v1/companies/* and /v1/departments/*
//
// Reads are open to any authenticated user; writes need admin or
// `organization.manage`.

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use serde_json::Value;
use uuid::Uuid;

use crate::database::models::{Company, Department};
use crate::database::pagination::PageQuery;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::organization_service::{CompanyInput, DepartmentInput, DepartmentQuery};
use crate::services::rbac_service::ORGANIZATION_MANAGE;
use crate::services::{OrganizationService, RbacService};

async fn require_organization_manage(user: &CurrentUser) -> Result<(), ApiError> {
    RbacService::new().await?.require_permission(user, ORGANIZATION_MANAGE).await
}

/// GET /v1/companies?page=&limit=&search=
pub async fn company_list(
    Extension(_user): Extension<CurrentUser>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Vec<Company>> {
    let page = OrganizationService::new().await?.companies(query).await?;
    Ok(ApiResponse::page(page))
}

/// POST /v1/companies
pub async fn company_create(
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<CompanyInput>,
) -> ApiResult<Company> {
    require_organization_manage(&user).await?;
    let company = OrganizationService::new().await?.create_company(input).await?;
    Ok(ApiResponse::created(company).with_message("Company created"))
}

/// GET /v1/companies/:id
pub async fn company_get(
    Extension(_user): Extension<CurrentUser>,
    Path(company_id): Path<Uuid>,
) -> ApiResult<Company> {
    let company = OrganizationService::new().await?.company(company_id).await?;
    Ok(ApiResponse::success(company))
}

/// PUT /v1/companies/:id
pub async fn company_update(
    Extension(user): Extension<CurrentUser>,
    Path(company_id): Path<Uuid>,
    Json(input): Json<CompanyInput>,
) -> ApiResult<Company> {
    require_organization_manage(&user).await?;
    let company = OrganizationService::new().await?.update_company(company_id, input).await?;
    Ok(ApiResponse::success(company).with_message("Company updated"))
}

/// DELETE /v1/companies/:id
pub async fn company_delete(
    Extension(user): Extension<CurrentUser>,
    Path(company_id): Path<Uuid>,
) -> ApiResult<Value> {
    require_organization_manage(&user).await?;
    OrganizationService::new().await?.delete_company(company_id).await?;
    Ok(ApiResponse::success(Value::Null).with_message("Company deleted"))
}

/// GET /v1/departments?page=&limit=&search=&companyId=&sortBy=&sortOrder=
pub async fn department_list(
    Extension(_user): Extension<CurrentUser>,
    Query(query): Query<DepartmentQuery>,
) -> ApiResult<Vec<Department>> {
    let page = OrganizationService::new().await?.departments(query).await?;
    Ok(ApiResponse::page(page))
}

/// POST /v1/departments
pub async fn department_create(
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<DepartmentInput>,
) -> ApiResult<Department> {
    require_organization_manage(&user).await?;
    let department = OrganizationService::new().await?.create_department(input).await?;
    Ok(ApiResponse::created(department).with_message("Department created"))
}

/// GET /v1/departments/:id
pub async fn department_get(
    Extension(_user): Extension<CurrentUser>,
    Path(department_id): Path<Uuid>,
) -> ApiResult<Department> {
    let department = OrganizationService::new().await?.department(department_id).await?;
    Ok(ApiResponse::success(department))
}

/// PUT /v1/departments/:id
pub async fn department_update(
    Extension(user): Extension<CurrentUser>,
    Path(department_id): Path<Uuid>,
    Json(input): Json<DepartmentInput>,
) -> ApiResult<Department> {
    require_organization_manage(&user).await?;
    let department = OrganizationService::new()
        .await?
        .update_department(department_id, input)
        .await?;
    Ok(ApiResponse::success(department).with_message("Department updated"))
}

/// DELETE /v1/departments/:id
pub async fn department_delete(
    Extension(user): Extension<CurrentUser>,
    Path(department_id): Path<Uuid>,
) -> ApiResult<Value> {
    require_organization_manage(&user).await?;
    OrganizationService::new().await?.delete_department(department_id).await?;
    Ok(ApiResponse::success(Value::Null).with_message("Department deleted"))
}
