use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::user_service::duplicate_email;
use super::validation;
use crate::auth::{generate_jwt, hash_password, verify_password, Claims};
use crate::database::manager::DatabaseManager;
use crate::database::models::User;
use crate::error::ApiError;
use crate::types::{UserStatus, UserType};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    /// Normalized `(name, email)`
    pub fn validate(&self) -> Result<(String, String), ApiError> {
        let name = validation::title("name", &self.name, 1, 255)?;
        let email = validation::email(&self.email)?;
        validation::password("password", &self.password)?;
        Ok((name, email))
    }
}

impl LoginRequest {
    /// Normalized email
    pub fn validate(&self) -> Result<String, ApiError> {
        let email = self.email.trim().to_lowercase();
        if email.is_empty() || self.password.is_empty() {
            return Err(ApiError::validation_error("Email and password are required", None));
        }
        Ok(email)
    }
}

#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub user: User,
    pub token: String,
}

pub struct AuthService {
    pool: PgPool,
}

impl AuthService {
    pub async fn new() -> Result<Self, ApiError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<AuthPayload, ApiError> {
        let (name, email) = request.validate()?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, user_type, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&name)
        .bind(&email)
        .bind(hash_password(&request.password))
        .bind(UserType::Staff.as_str())
        .bind(UserStatus::Online.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(duplicate_email)?;

        tracing::info!("Registered user {} <{}>", user.id, user.email);
        issue(user)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<AuthPayload, ApiError> {
        let email = request.validate()?;

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1 AND deleted_at IS NULL")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;

        if !verify_password(&request.password, &user.password_hash) {
            tracing::warn!("Failed login for {}", email);
            return Err(ApiError::unauthorized("Invalid email or password"));
        }

        match user.account_status() {
            Some(UserStatus::Banned) => return Err(ApiError::forbidden("Account has been banned")),
            Some(UserStatus::Disabled) => return Err(ApiError::forbidden("Account has been disabled")),
            _ => {}
        }

        tracing::info!("User {} logged in", user.id);
        issue(user)
    }
}

fn issue(user: User) -> Result<AuthPayload, ApiError> {
    let claims = Claims::new(user.id, user.email.clone(), user.user_type.clone());
    let token = generate_jwt(&claims)?;
    Ok(AuthPayload { user, token })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_requires_both_fields() {
        let request = LoginRequest { email: " Ann@Example.com ".into(), password: "secret1".into() };
        assert_eq!(request.validate().unwrap(), "ann@example.com");

        let missing = LoginRequest { email: "ann@example.com".into(), password: String::new() };
        assert_eq!(missing.validate().unwrap_err().error_code(), "VALIDATION_ERROR");
    }

    #[test]
    fn register_checks_password_length() {
        let request = RegisterRequest { name: "Ann".into(), email: "ann@example.com".into(), password: "12345".into() };
        assert_eq!(request.validate().unwrap_err().status_code(), 400);
    }
}
