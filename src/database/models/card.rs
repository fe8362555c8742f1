use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::card_status;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: Uuid,
    pub board_id: Uuid,
    pub list_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub position: i32,
    pub due_date: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub card_type: String,
    pub status: String,
    pub priority: Option<String>,
    pub checklist_items: Value,
    pub labels: Value,
    pub dependencies: Value,
    pub metadata: Value,
    pub archived: bool,
    pub total_time_spent: i64,
    pub is_tracking: bool,
    pub tracking_start_time: Option<DateTime<Utc>>,
    pub tracking_pause_time: i64,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Card {
    pub fn is_complete(&self) -> bool {
        card_status::is_complete(&self.status)
    }
}

/// Card joined with its board and list titles, used by cross-board views
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CardWithBoard {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub card: Card,
    pub board_title: String,
    pub list_title: String,
    /// The board's recurring configuration
    pub recurring_config: Option<Value>,
}

impl CardWithBoard {
    pub fn is_recurring(&self) -> bool {
        self.recurring_config
            .as_ref()
            .and_then(|c| c.get("isRecurring"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}
