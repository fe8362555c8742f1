use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use super::validation;
use crate::auth::{hash_password, verify_password};
use crate::database::manager::DatabaseManager;
use crate::database::models::User;
use crate::database::pagination::{Page, PageQuery, Pagination};
use crate::database::patch::{deserialize_some, UpdateBuilder};
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::ordering;
use crate::types::{UserStatus, UserType};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePassword {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordStatus {
    pub must_change_password: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub user_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "type")]
    pub user_type: Option<String>,
    pub status: Option<String>,
    pub avatar: Option<String>,
    pub company_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub must_change_password: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "type")]
    pub user_type: Option<String>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub avatar: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub company_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub department_id: Option<Option<Uuid>>,
    pub must_change_password: Option<bool>,
}

pub struct UserService {
    pool: PgPool,
}

fn parse_user_type(raw: &str) -> Result<UserType, ApiError> {
    raw.parse::<UserType>()
        .map_err(|_| ApiError::invalid_field("type", "Type must be one of: staff, manager, boss, admin"))
}

fn parse_status(raw: &str) -> Result<UserStatus, ApiError> {
    raw.parse::<UserStatus>()
        .map_err(|_| ApiError::invalid_field("status", "Status must be one of: online, banned, disabled"))
}

impl UserService {
    pub async fn new() -> Result<Self, ApiError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    pub async fn get(&self, user_id: Uuid) -> Result<User, ApiError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    pub async fn change_password(&self, user: &CurrentUser, input: ChangePassword) -> Result<(), ApiError> {
        validation::password("newPassword", &input.new_password)?;
        if input.new_password == input.current_password {
            return Err(ApiError::invalid_field(
                "newPassword",
                "New password must be different from the current password",
            ));
        }

        let account = self.get(user.id).await?;
        if !verify_password(&input.current_password, &account.password_hash) {
            return Err(ApiError::unauthorized("Current password is incorrect"));
        }

        sqlx::query(
            "UPDATE users SET password_hash = $2, must_change_password = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(user.id)
        .bind(hash_password(&input.new_password))
        .execute(&self.pool)
        .await?;

        tracing::info!("User {} changed their password", user.id);
        Ok(())
    }

    pub async fn password_status(&self, user: &CurrentUser) -> Result<PasswordStatus, ApiError> {
        let account = self.get(user.id).await?;
        Ok(PasswordStatus {
            must_change_password: account.must_change_password,
        })
    }

    pub async fn set_board_order(&self, user: &CurrentUser, ids: Vec<Uuid>) -> Result<Vec<Uuid>, ApiError> {
        let order = ordering::dedup(&ids);
        sqlx::query("UPDATE users SET board_order_ids = $2, updated_at = NOW() WHERE id = $1")
            .bind(user.id)
            .bind(json!(order))
            .execute(&self.pool)
            .await?;
        Ok(order)
    }

    pub async fn set_card_order(&self, user: &CurrentUser, ids: Vec<Uuid>) -> Result<Vec<Uuid>, ApiError> {
        let order = ordering::dedup(&ids);
        sqlx::query("UPDATE users SET card_order_ids = $2, updated_at = NOW() WHERE id = $1")
            .bind(user.id)
            .bind(json!(order))
            .execute(&self.pool)
            .await?;
        Ok(order)
    }

    pub async fn list(&self, query: UserListQuery) -> Result<Page<User>, ApiError> {
        let user_type = query.user_type.as_deref().map(parse_user_type).transpose()?;
        let paging = PageQuery {
            page: query.page,
            limit: query.limit,
            search: query.search,
        };
        let pattern = paging.search_pattern();

        let push_filters = |builder: &mut QueryBuilder<'_, sqlx::Postgres>| {
            builder.push(" WHERE deleted_at IS NULL");
            if let Some(pattern) = &pattern {
                builder
                    .push(" AND (name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR email ILIKE ")
                    .push_bind(pattern.clone())
                    .push(")");
            }
            if let Some(user_type) = user_type {
                builder.push(" AND user_type = ").push_bind(user_type.as_str());
            }
        };

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM users");
        push_filters(&mut count);
        let (total,): (i64,) = count.build_query_as().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::new("SELECT * FROM users");
        push_filters(&mut select);
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(paging.limit() as i64)
            .push(" OFFSET ")
            .push_bind(paging.offset());
        let users = select.build_query_as::<User>().fetch_all(&self.pool).await?;

        Ok(Page {
            items: users,
            pagination: Pagination::new(total, paging.page(), paging.limit()),
        })
    }

    pub async fn create(&self, input: CreateUser) -> Result<User, ApiError> {
        let name = validation::title("name", &input.name, 1, 255)?;
        let email = validation::email(&input.email)?;
        validation::password("password", &input.password)?;
        let user_type = input.user_type.as_deref().map(parse_user_type).transpose()?.unwrap_or(UserType::Staff);
        let status = input.status.as_deref().map(parse_status).transpose()?.unwrap_or(UserStatus::Online);

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, user_type, status, avatar,
                               company_id, department_id, must_change_password)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&name)
        .bind(&email)
        .bind(hash_password(&input.password))
        .bind(user_type.as_str())
        .bind(status.as_str())
        .bind(input.avatar)
        .bind(input.company_id)
        .bind(input.department_id)
        .bind(input.must_change_password.unwrap_or(true))
        .fetch_one(&self.pool)
        .await
        .map_err(duplicate_email)?;

        tracing::info!("User {} <{}> created as {}", user.id, user.email, user.user_type);
        Ok(user)
    }

    pub async fn update(&self, user_id: Uuid, input: UpdateUser) -> Result<User, ApiError> {
        let name = validation::optional_title("name", input.name, 1, 255)?;
        let email = input.email.as_deref().map(validation::email).transpose()?;
        if let Some(password) = &input.password {
            validation::password("password", password)?;
        }
        let user_type = input.user_type.as_deref().map(parse_user_type).transpose()?;
        let status = input.status.as_deref().map(parse_status).transpose()?;

        let mut update = UpdateBuilder::new("users");
        update
            .set("name", name)
            .set("email", email)
            .set("password_hash", input.password.as_deref().map(hash_password))
            .set("user_type", user_type.map(|t| t.as_str()))
            .set("status", status.map(|s| s.as_str()))
            .set("avatar", input.avatar)
            .set("company_id", input.company_id)
            .set("department_id", input.department_id)
            .set("must_change_password", input.must_change_password);

        update
            .finish(user_id)
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await
            .map_err(duplicate_email)?
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    pub async fn delete(&self, actor: &CurrentUser, user_id: Uuid) -> Result<(), ApiError> {
        if actor.id == user_id {
            return Err(ApiError::bad_request("You cannot delete your own account"));
        }
        let deleted = sqlx::query("UPDATE users SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(ApiError::not_found("User not found"));
        }
        tracing::info!("User {} deleted by {}", user_id, actor.id);
        Ok(())
    }
}

pub(crate) fn duplicate_email(err: sqlx::Error) -> ApiError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ApiError::conflict("Email is already registered")
        }
        _ => err.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_reads_type() {
        let query: UserListQuery = serde_json::from_str(r#"{"type": "manager", "page": 2}"#).unwrap();
        assert_eq!(query.user_type.as_deref(), Some("manager"));
        assert_eq!(parse_user_type("manager").unwrap(), UserType::Manager);
        assert!(parse_user_type("intern").is_err());
    }

    #[test]
    fn update_can_clear_department() {
        let input: UpdateUser = serde_json::from_str(r#"{"departmentId": null}"#).unwrap();
        assert_eq!(input.department_id, Some(None));
        assert_eq!(input.company_id, None);
    }
}
