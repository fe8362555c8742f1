use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::validation;
use crate::database::manager::DatabaseManager;
use crate::database::models::{Company, Department};
use crate::database::pagination::{Page, PageQuery, Pagination};
use crate::database::patch::{deserialize_some, UpdateBuilder};
use crate::error::ApiError;
use crate::types::COMPANY_SIZES;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInput {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub website: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub industry: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub size: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentInput {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub company_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub company_id: Option<Uuid>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// Column for an allow-listed sort field; unknown fields sort by creation time
fn department_sort_column(field: Option<&str>) -> &'static str {
    match field {
        Some("name") => "d.name",
        Some("description") => "d.description",
        Some("companyName") => "c.name",
        _ => "d.created_at",
    }
}

fn sort_direction(order: Option<&str>) -> &'static str {
    match order.map(str::to_ascii_uppercase).as_deref() {
        Some("ASC") => "ASC",
        _ => "DESC",
    }
}

fn validate_size(size: Option<&Option<String>>) -> Result<(), ApiError> {
    match size {
        Some(Some(size)) => validation::one_of("size", size, &COMPANY_SIZES),
        _ => Ok(()),
    }
}

const DEPARTMENT_SELECT: &str = r#"
    SELECT d.id, d.company_id, c.name AS company_name, d.name, d.description, d.created_at, d.updated_at
    FROM departments d
    LEFT JOIN companies c ON c.id = d.company_id
    WHERE d.deleted_at IS NULL"#;

pub struct OrganizationService {
    pool: PgPool,
}

impl OrganizationService {
    pub async fn new() -> Result<Self, ApiError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    pub async fn companies(&self, query: PageQuery) -> Result<Page<Company>, ApiError> {
        let pattern = query.search_pattern();
        let push_filters = |builder: &mut QueryBuilder<'_, Postgres>| {
            builder.push(" WHERE deleted_at IS NULL");
            if let Some(pattern) = &pattern {
                builder
                    .push(" AND (name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR description ILIKE ")
                    .push_bind(pattern.clone())
                    .push(")");
            }
        };

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM companies");
        push_filters(&mut count);
        let (total,): (i64,) = count.build_query_as().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::new("SELECT * FROM companies");
        push_filters(&mut select);
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(query.limit() as i64)
            .push(" OFFSET ")
            .push_bind(query.offset());
        let companies = select.build_query_as::<Company>().fetch_all(&self.pool).await?;

        Ok(Page {
            items: companies,
            pagination: Pagination::new(total, query.page(), query.limit()),
        })
    }

    pub async fn company(&self, id: Uuid) -> Result<Company, ApiError> {
        sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Company not found"))
    }

    pub async fn create_company(&self, input: CompanyInput) -> Result<Company, ApiError> {
        let name = validation::title("name", input.name.as_deref().unwrap_or_default(), 1, 255)?;
        validate_size(input.size.as_ref())?;

        let company = sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (id, name, description, address, phone, email, website, industry, size)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&name)
        .bind(input.description.flatten())
        .bind(input.address.flatten())
        .bind(input.phone.flatten())
        .bind(input.email.flatten())
        .bind(input.website.flatten())
        .bind(input.industry.flatten())
        .bind(input.size.flatten())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("Company {} '{}' created", company.id, company.name);
        Ok(company)
    }

    pub async fn update_company(&self, id: Uuid, input: CompanyInput) -> Result<Company, ApiError> {
        let name = validation::optional_title("name", input.name, 1, 255)?;
        validate_size(input.size.as_ref())?;

        let mut update = UpdateBuilder::new("companies");
        update
            .set("name", name)
            .set("description", input.description)
            .set("address", input.address)
            .set("phone", input.phone)
            .set("email", input.email)
            .set("website", input.website)
            .set("industry", input.industry)
            .set("size", input.size);

        update
            .finish(id)
            .build_query_as::<Company>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Company not found"))
    }

    pub async fn delete_company(&self, id: Uuid) -> Result<(), ApiError> {
        let deleted = sqlx::query("UPDATE companies SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(ApiError::not_found("Company not found"));
        }
        tracing::info!("Company {} deleted", id);
        Ok(())
    }

    pub async fn departments(&self, query: DepartmentQuery) -> Result<Page<Department>, ApiError> {
        let paging = PageQuery {
            page: query.page,
            limit: query.limit,
            search: query.search.clone(),
        };
        let pattern = paging.search_pattern();
        let company_id = query.company_id;

        let push_filters = |builder: &mut QueryBuilder<'_, Postgres>| {
            if let Some(pattern) = &pattern {
                builder
                    .push(" AND (d.name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR d.description ILIKE ")
                    .push_bind(pattern.clone())
                    .push(")");
            }
            if let Some(company_id) = company_id {
                builder.push(" AND d.company_id = ").push_bind(company_id);
            }
        };

        let mut count = QueryBuilder::new(
            "SELECT COUNT(*) FROM departments d LEFT JOIN companies c ON c.id = d.company_id WHERE d.deleted_at IS NULL",
        );
        push_filters(&mut count);
        let (total,): (i64,) = count.build_query_as().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::new(DEPARTMENT_SELECT);
        push_filters(&mut select);
        select
            .push(" ORDER BY ")
            .push(department_sort_column(query.sort_by.as_deref()))
            .push(" ")
            .push(sort_direction(query.sort_order.as_deref()))
            .push(" LIMIT ")
            .push_bind(paging.limit() as i64)
            .push(" OFFSET ")
            .push_bind(paging.offset());
        let departments = select.build_query_as::<Department>().fetch_all(&self.pool).await?;

        Ok(Page {
            items: departments,
            pagination: Pagination::new(total, paging.page(), paging.limit()),
        })
    }

    pub async fn department(&self, id: Uuid) -> Result<Department, ApiError> {
        let sql = format!("{} AND d.id = $1", DEPARTMENT_SELECT);
        sqlx::query_as::<_, Department>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Department not found"))
    }

    async fn require_company(&self, company_id: Option<Uuid>) -> Result<(), ApiError> {
        if let Some(company_id) = company_id {
            self.company(company_id)
                .await
                .map_err(|_| ApiError::invalid_field("companyId", "Company does not exist"))?;
        }
        Ok(())
    }

    pub async fn create_department(&self, input: DepartmentInput) -> Result<Department, ApiError> {
        let name = validation::title("name", input.name.as_deref().unwrap_or_default(), 1, 255)?;
        let company_id = input.company_id.flatten();
        self.require_company(company_id).await?;

        let (id,): (Uuid,) = sqlx::query_as(
            "INSERT INTO departments (id, company_id, name, description) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(&name)
        .bind(input.description.flatten())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("Department {} '{}' created", id, name);
        self.department(id).await
    }

    pub async fn update_department(&self, id: Uuid, input: DepartmentInput) -> Result<Department, ApiError> {
        let name = validation::optional_title("name", input.name, 1, 255)?;
        if let Some(company_id) = input.company_id {
            self.require_company(company_id).await?;
        }

        let mut update = UpdateBuilder::new("departments");
        update
            .set("name", name)
            .set("company_id", input.company_id)
            .set("description", input.description);

        let updated = update.finish(id).build().execute(&self.pool).await?;
        if updated.rows_affected() == 0 {
            return Err(ApiError::not_found("Department not found"));
        }
        self.department(id).await
    }

    pub async fn delete_department(&self, id: Uuid) -> Result<(), ApiError> {
        let deleted = sqlx::query("UPDATE departments SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(ApiError::not_found("Department not found"));
        }
        tracing::info!("Department {} deleted", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_fields_are_allow_listed() {
        assert_eq!(department_sort_column(Some("companyName")), "c.name");
        assert_eq!(department_sort_column(Some("name; DROP TABLE users")), "d.created_at");
        assert_eq!(department_sort_column(None), "d.created_at");
        assert_eq!(sort_direction(Some("asc")), "ASC");
        assert_eq!(sort_direction(Some("sideways")), "DESC");
    }

    #[test]
    fn company_size_must_be_known() {
        assert!(validate_size(Some(&Some("small".to_string()))).is_ok());
        assert!(validate_size(Some(&None)).is_ok());
        assert!(validate_size(Some(&Some("huge".to_string()))).is_err());
    }
}
