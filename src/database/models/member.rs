use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Member of a board or card joined with the user's public profile
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub member_id: Uuid,
    pub role: String,
    pub joined_at: DateTime<Utc>,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    #[serde(rename = "type")]
    pub user_type: String,
}

/// Card membership row tagged with its card, for bulk loading
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CardMemberRow {
    pub card_id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub member: MemberView,
}
