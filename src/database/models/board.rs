use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub owner_id: Uuid,
    pub company_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub is_public: bool,
    pub list_order_ids: Json<Vec<Uuid>>,
    pub view_config: Option<Value>,
    pub recurring_config: Option<Value>,
    pub last_activity: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Board {
    /// `(isRecurring, completedListId)` from the recurring config
    pub fn recurring(&self) -> (bool, Option<Uuid>) {
        let Some(config) = &self.recurring_config else {
            return (false, None);
        };
        let is_recurring = config
            .get("isRecurring")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let completed_list_id = config
            .get("completedListId")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok());
        (is_recurring, completed_list_id)
    }
}

/// Board row as shown in the board list, with owner details
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BoardSummary {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub owner_id: Uuid,
    pub owner_name: String,
    pub owner_email: String,
    pub owner_type: String,
    pub is_public: bool,
    pub member_count: i64,
    pub recurring_config: Option<Value>,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: Uuid,
    pub board_id: Uuid,
    pub title: String,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_recurring_config() {
        let list_id = Uuid::new_v4();
        let mut board = crate::testing::board(Uuid::new_v4());
        assert_eq!(board.recurring(), (false, None));

        board.recurring_config = Some(json!({"isRecurring": true, "completedListId": list_id.to_string()}));
        assert_eq!(board.recurring(), (true, Some(list_id)));

        board.recurring_config = Some(json!({"isRecurring": true, "completedListId": null}));
        assert_eq!(board.recurring(), (true, None));
    }
}
