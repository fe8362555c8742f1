use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use super::auth::AuthUser;
use crate::database::manager::DatabaseManager;
use crate::database::models::User;
use crate::error::ApiError;
use crate::types::{UserStatus, UserType};
use crate::visibility::Viewer;

/// The user behind the request, loaded fresh from the database
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub user_type: UserType,
    pub company_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
}

impl CurrentUser {
    pub fn viewer(&self) -> Viewer {
        Viewer {
            id: self.id,
            user_type: self.user_type,
            company_id: self.company_id,
            department_id: self.department_id,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.user_type == UserType::Admin
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            user_type: user.kind(),
            company_id: user.company_id,
            department_id: user.department_id,
        }
    }
}

/// Middleware that loads the JWT's user and rejects deleted, banned or disabled accounts
pub async fn validate_user_middleware(
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before user validation"))?;

    let pool = DatabaseManager::pool().await?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL")
        .bind(auth_user.user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| {
            tracing::warn!("User validation failed: user {} not found or deleted", auth_user.user_id);
            ApiError::unauthorized("User no longer exists")
        })?;

    match user.account_status() {
        Some(UserStatus::Banned) => {
            tracing::warn!("User validation failed: user {} is banned", user.id);
            return Err(ApiError::forbidden("Account has been banned"));
        }
        Some(UserStatus::Disabled) => {
            tracing::warn!("User validation failed: user {} is disabled", user.id);
            return Err(ApiError::forbidden("Account has been disabled"));
        }
        _ => {}
    }

    tracing::debug!("User validation successful: {} ({})", user.email, user.user_type);

    request.extensions_mut().insert(CurrentUser::from(&user));

    Ok(next.run(request).await)
}
