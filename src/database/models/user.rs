use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use crate::types::{UserStatus, UserType};
use crate::visibility::Viewer;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[serde(rename = "type")]
    pub user_type: String,
    pub status: String,
    pub avatar: Option<String>,
    pub company_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub board_order_ids: Json<Vec<Uuid>>,
    pub card_order_ids: Json<Vec<Uuid>>,
    pub must_change_password: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Unknown stored values fall back to the least privileged type.
    pub fn kind(&self) -> UserType {
        self.user_type.parse().unwrap_or(UserType::Staff)
    }

    pub fn account_status(&self) -> Option<UserStatus> {
        self.status.parse().ok()
    }

    pub fn viewer(&self) -> Viewer {
        Viewer {
            id: self.id,
            user_type: self.kind(),
            company_id: self.company_id,
            department_id: self.department_id,
        }
    }
}
