//! Fixture builders for unit tests

use chrono::Utc;
use serde_json::json;
use sqlx::types::Json;
use uuid::Uuid;

use crate::database::models::{Board, Card, CardWithBoard, List, MemberView, User};

pub fn user(user_type: &str) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        name: "Test User".to_string(),
        email: format!("{}@example.com", Uuid::new_v4().simple()),
        password_hash: String::new(),
        user_type: user_type.to_string(),
        status: "online".to_string(),
        avatar: None,
        company_id: None,
        department_id: None,
        board_order_ids: Json(Vec::new()),
        card_order_ids: Json(Vec::new()),
        must_change_password: false,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

pub fn board(owner_id: Uuid) -> Board {
    let now = Utc::now();
    Board {
        id: Uuid::new_v4(),
        title: "Roadmap".to_string(),
        description: None,
        icon: None,
        owner_id,
        company_id: None,
        department_id: None,
        is_public: false,
        list_order_ids: Json(Vec::new()),
        view_config: None,
        recurring_config: None,
        last_activity: now,
        created_by: Some(owner_id),
        updated_by: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn list(board_id: Uuid, title: &str) -> List {
    let now = Utc::now();
    List {
        id: Uuid::new_v4(),
        board_id,
        title: title.to_string(),
        color: "#3B82F6".to_string(),
        archived: false,
        card_order_ids: Json(Vec::new()),
        created_by: None,
        updated_by: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn card(board_id: Uuid, list_id: Uuid, title: &str) -> Card {
    let now = Utc::now();
    Card {
        id: Uuid::new_v4(),
        board_id,
        list_id,
        title: title.to_string(),
        description: None,
        position: 0,
        due_date: None,
        start_date: None,
        end_date: None,
        card_type: "normal".to_string(),
        status: "todo".to_string(),
        priority: None,
        checklist_items: json!([]),
        labels: json!([]),
        dependencies: json!([]),
        metadata: json!({}),
        archived: false,
        total_time_spent: 0,
        is_tracking: false,
        tracking_start_time: None,
        tracking_pause_time: 0,
        created_by: None,
        updated_by: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn card_with_board(title: &str) -> CardWithBoard {
    CardWithBoard {
        card: card(Uuid::new_v4(), Uuid::new_v4(), title),
        board_title: "Roadmap".to_string(),
        list_title: "Doing".to_string(),
        recurring_config: None,
    }
}

pub fn member(member_id: Uuid, role: &str) -> MemberView {
    MemberView {
        member_id,
        role: role.to_string(),
        joined_at: Utc::now(),
        name: "Member".to_string(),
        email: "member@example.com".to_string(),
        avatar: None,
        user_type: "staff".to_string(),
    }
}
