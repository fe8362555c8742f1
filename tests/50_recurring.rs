mod common;

use anyhow::Result;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use common::{detail_list, distinct, ids, uuid_list, Api};
use reqwest::StatusCode;
use serde_json::{json, Value};

/// Advisory lock key the server holds while a recurring run is in progress
const RUN_LOCK_KEY: i64 = 0x6b61_6e62_616e_7263;

fn due(card: &Value) -> Option<DateTime<Utc>> {
    card["dueDate"]
        .as_str()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|d| d.with_timezone(&Utc))
}

fn titles(cards: &Value) -> Vec<String> {
    cards
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|c| c["title"].as_str().map(str::to_string))
        .collect()
}

// A single test so runs inside this binary never overlap on the run lock
#[tokio::test]
async fn recurring_run_duplicates_open_cards_once_per_day() -> Result<()> {
    let Some(server) = common::db_server().await? else { return Ok(()) };
    let owner = Api::register(server, "Operator").await?;
    let helper = Api::register(server, "Oncall").await?;
    let admin = Api::register(server, "Root").await?;
    admin.make_admin().await?;

    let now = Utc::now();
    let today = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    let overdue_at = today - Duration::days(2) + Duration::hours(9);
    let upcoming_at = today + Duration::days(2);

    let board = owner.board("Daily checks").await?;
    let todo = owner.list(board, "Todo").await?;
    let done = owner.list(board, "Done").await?;

    let undated = owner.card(todo, json!({"title": "undated"})).await?;
    let overdue = owner.card(todo, json!({"title": "overdue", "dueDate": overdue_at})).await?;
    owner.card(todo, json!({"title": "upcoming", "dueDate": upcoming_at})).await?;
    let shelved = owner.card(todo, json!({"title": "shelved", "dueDate": overdue_at})).await?;
    let dropped = owner.card(todo, json!({"title": "dropped", "dueDate": overdue_at})).await?;
    owner.card(done, json!({"title": "finished", "dueDate": overdue_at})).await?;

    let (status, _) = owner
        .post(&format!("/v1/cards/{}/members", overdue), json!({"memberId": helper.user_id}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = owner.put(&format!("/v1/cards/{}/archive", shelved), json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = owner.delete(&format!("/v1/cards/{}", dropped)).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = owner
        .patch(
            &format!("/v1/boards/{}/recurring-config", board),
            json!({"recurringConfig": {"isRecurring": true, "completedListId": done}}),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["recurringConfig"]["isRecurring"], true);

    // Admin only
    let (status, _) = owner.post("/v1/cron/trigger-recurring-cards", json!({})).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = admin.post("/v1/cron/trigger-recurring-cards", json!({})).await?;
    assert_eq!(status, StatusCode::OK, "first run: {}", body);
    assert!(body["data"]["boards"].as_u64().unwrap_or(0) >= 1);
    assert!(body["data"]["duplicated"].as_u64().unwrap_or(0) >= 2);

    let detail = owner.board_detail(board).await?;
    let todo_view = detail_list(&detail, todo);
    assert_eq!(
        titles(&todo_view["cards"]),
        vec!["undated", "overdue", "upcoming", "undated", "overdue"]
    );
    assert_eq!(titles(&detail_list(&detail, done)["cards"]), vec!["finished"]);

    let order = uuid_list(&todo_view["cardOrderIds"]);
    assert!(distinct(&order));
    let cards = todo_view["cards"].as_array().cloned().unwrap_or_default();
    let copies: Vec<&Value> = cards.iter().skip(3).collect();
    assert_eq!(order[order.len() - 2..], ids(&json!(copies))[..]);
    for copy in &copies {
        assert_eq!(due(copy), Some(today), "copy due date: {}", copy);
        assert_eq!(copy["isTracking"], false);
        assert_eq!(copy["totalTimeSpent"], 0);
    }
    assert!(copies.iter().all(|c| c["id"] != json!(undated) && c["id"] != json!(overdue)));

    let overdue_copy = copies[1];
    let members: Vec<Value> = overdue_copy["members"].as_array().cloned().unwrap_or_default();
    assert!(members.iter().any(|m| m["memberId"] == json!(helper.user_id)));

    // Archived cards stay single
    let (_, body) = owner
        .get(&format!("/v1/boards/{}?includeArchived=true", board))
        .await?;
    let archived: Vec<String> = titles(&detail_list(&body["data"], todo)["cards"])
        .into_iter()
        .filter(|t| t == "shelved")
        .collect();
    assert_eq!(archived.len(), 1);

    // Same day again: every candidate already has today's copy
    let (status, body) = admin.post("/v1/cron/trigger-recurring-cards", json!({})).await?;
    assert_eq!(status, StatusCode::OK, "second run: {}", body);
    assert_eq!(body["data"]["duplicated"], 0);

    let detail = owner.board_detail(board).await?;
    assert_eq!(detail_list(&detail, todo)["cards"].as_array().map(Vec::len), Some(5));

    let (status, body) = admin.get("/v1/cron/status").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["enabled"], false);
    assert_eq!(body["data"]["lastRun"]["report"]["duplicated"], 0);

    // A run that finds another one in progress backs off with a conflict
    let url = common::database_url().unwrap_or_default();
    let pool = sqlx::PgPool::connect(&url).await?;
    let mut holder = pool.acquire().await?;
    sqlx::query("SELECT pg_advisory_lock($1)")
        .bind(RUN_LOCK_KEY)
        .execute(&mut *holder)
        .await?;

    let (status, body) = admin.post("/v1/cron/trigger-recurring-cards", json!({})).await?;
    assert_eq!(status, StatusCode::CONFLICT, "locked run: {}", body);

    sqlx::query("SELECT pg_advisory_unlock($1)")
        .bind(RUN_LOCK_KEY)
        .execute(&mut *holder)
        .await?;
    drop(holder);
    pool.close().await;

    let (status, _) = admin.post("/v1/cron/trigger-recurring-cards", json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}
