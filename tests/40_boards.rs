mod common;

use anyhow::Result;
use common::{detail_list, distinct, ids, uuid_list, Api};
use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

// Board, list and card flows against Postgres. Each test registers its own
// users, so they can share one server and database.

#[tokio::test]
async fn order_arrays_follow_create_move_copy_delete() -> Result<()> {
    let Some(server) = common::db_server().await? else { return Ok(()) };
    let owner = Api::register(server, "Owner").await?;

    let board = owner.board("Release train").await?;
    let backlog = owner.list(board, "Backlog").await?;
    let doing = owner.list(board, "Doing").await?;
    let review = owner.list(board, "Review").await?;

    let first = owner.card(backlog, json!({"title": "first"})).await?;
    let second = owner.card(backlog, json!({"title": "second"})).await?;
    let third = owner.card(backlog, json!({"title": "third"})).await?;

    let detail = owner.board_detail(board).await?;
    assert_eq!(uuid_list(&detail["listOrderIds"]), vec![backlog, doing, review]);
    assert_eq!(uuid_list(&detail_list(&detail, backlog)["cardOrderIds"]), vec![first, second, third]);

    // Moving twice into the same list leaves a single entry
    let (status, _) = owner
        .put(&format!("/v1/cards/{}/move", first), json!({"listId": doing, "index": 0}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = owner
        .put(&format!("/v1/cards/{}/move", first), json!({"listId": doing, "index": 0}))
        .await?;
    assert_eq!(status, StatusCode::OK);

    // A copy in the same list lands right after its source
    let (status, body) = owner.post(&format!("/v1/cards/{}/copy", second), json!({})).await?;
    assert_eq!(status, StatusCode::CREATED);
    let copy: Uuid = body["data"]["id"].as_str().unwrap_or_default().parse()?;
    assert_eq!(body["data"]["title"], "second");

    let (status, _) = owner.delete(&format!("/v1/cards/{}", third)).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = owner.delete(&format!("/v1/lists/{}", review)).await?;
    assert_eq!(status, StatusCode::OK);

    let detail = owner.board_detail(board).await?;
    assert_eq!(uuid_list(&detail["listOrderIds"]), vec![backlog, doing]);
    assert_eq!(ids(&detail["lists"]), vec![backlog, doing]);

    let backlog_view = detail_list(&detail, backlog);
    let doing_view = detail_list(&detail, doing);
    assert_eq!(uuid_list(&backlog_view["cardOrderIds"]), vec![second, copy]);
    assert_eq!(ids(&backlog_view["cards"]), vec![second, copy]);
    assert_eq!(uuid_list(&doing_view["cardOrderIds"]), vec![first]);
    assert_eq!(ids(&doing_view["cards"]), vec![first]);

    for list in detail["lists"].as_array().into_iter().flatten() {
        assert!(distinct(&uuid_list(&list["cardOrderIds"])), "duplicate card ids in {}", list);
    }

    let (status, _) = owner.get(&format!("/v1/cards/{}", third)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn reorder_reconciles_unknown_and_missing_ids() -> Result<()> {
    let Some(server) = common::db_server().await? else { return Ok(()) };
    let owner = Api::register(server, "Planner").await?;

    let board = owner.board("Quarter plan").await?;
    let todo = owner.list(board, "Todo").await?;
    let doing = owner.list(board, "Doing").await?;
    let done = owner.list(board, "Done").await?;

    // Stale id, a duplicate, and `doing` left out entirely
    let (status, _) = owner
        .patch(
            &format!("/v1/boards/{}/reorder", board),
            json!({"listOrderIds": [done, Uuid::new_v4(), done, todo]}),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let detail = owner.board_detail(board).await?;
    assert_eq!(ids(&detail["lists"]), vec![done, todo, doing]);

    let (_, body) = owner.get(&format!("/v1/lists/board/{}", board)).await?;
    assert_eq!(ids(&body["data"]), vec![done, todo, doing]);

    let a = owner.card(todo, json!({"title": "a"})).await?;
    let b = owner.card(todo, json!({"title": "b"})).await?;
    let c = owner.card(todo, json!({"title": "c"})).await?;

    let (status, body) = owner
        .patch(
            &format!("/v1/lists/{}/reorder", todo),
            json!({"cardOrderIds": [c, Uuid::new_v4(), c, a]}),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(distinct(&uuid_list(&body["data"]["cardOrderIds"])));

    let (status, body) = owner.get(&format!("/v1/cards?listId={}", todo)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body["data"]), vec![c, a, b]);
    Ok(())
}

#[tokio::test]
async fn member_viewer_sees_only_their_cards() -> Result<()> {
    let Some(server) = common::db_server().await? else { return Ok(()) };
    let owner = Api::register(server, "Lead").await?;
    let member = Api::register(server, "Helper").await?;

    let board = owner.board("Support rota").await?;
    let list = owner.list(board, "Inbox").await?;
    let private = owner.card(list, json!({"title": "owner only"})).await?;
    let shared = owner.card(list, json!({"title": "shared"})).await?;

    // Not a member yet: the board does not exist for them
    let (status, _) = member.get(&format!("/v1/boards/{}", board)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = owner
        .post(
            &format!("/v1/boards/{}/members", board),
            json!({"memberId": member.user_id, "role": "member"}),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = owner
        .post(&format!("/v1/cards/{}/members", shared), json!({"memberId": member.user_id}))
        .await?;
    assert_eq!(status, StatusCode::OK);

    let own = member.card(list, json!({"title": "helper's own"})).await?;

    let detail = member.board_detail(board).await?;
    assert_eq!(detail["access"], "member");
    assert_eq!(ids(&detail_list(&detail, list)["cards"]), vec![shared, own]);

    let (status, _) = member.get(&format!("/v1/cards/{}", private)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = member.get(&format!("/v1/cards/{}", shared)).await?;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = member.get(&format!("/v1/cards?listId={}", list)).await?;
    assert_eq!(ids(&body["data"]), vec![shared, own]);

    let detail = owner.board_detail(board).await?;
    assert_eq!(detail["access"], "full");
    assert_eq!(ids(&detail_list(&detail, list)["cards"]), vec![private, shared, own]);

    // Assigned view: cards others put the member on, never their own
    let (status, body) = member.get("/v1/boards/assigned").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], "assigned");
    let assigned = body["data"]["lists"]
        .as_array()
        .and_then(|lists| lists.iter().find(|l| l["boardId"] == json!(board)).cloned())
        .unwrap_or_default();
    assert_eq!(assigned["title"], "Support rota");
    assert_eq!(ids(&assigned["cards"]), vec![shared]);
    Ok(())
}

#[tokio::test]
async fn custom_fields_and_card_members_round_trip() -> Result<()> {
    let Some(server) = common::db_server().await? else { return Ok(()) };
    let owner = Api::register(server, "Estimator").await?;
    let other = Api::register(server, "Checker").await?;

    let board = owner.board("Estimates").await?;
    let list = owner.list(board, "Open").await?;
    let card = owner.card(list, json!({"title": "size it", "metadata": {"source": "import"}})).await?;
    let fields = format!("/v1/cards/{}/custom-fields", card);

    let (status, _) = owner
        .post(&fields, json!({"fieldName": "estimate", "fieldValue": 5, "fieldType": "number"}))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = owner
        .post(&fields, json!({"fieldName": "estimate", "fieldValue": 6}))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = owner.get(&fields).await?;
    assert_eq!(body["data"], json!({"estimate": {"value": 5, "type": "number"}}));

    let (status, body) = owner.put(&format!("{}/estimate", fields), json!({"fieldValue": 8})).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["metadata"]["customFields"]["estimate"]["value"], 8);
    assert_eq!(body["data"]["metadata"]["source"], "import");

    let (status, _) = owner.delete(&format!("{}/estimate", fields)).await?;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = owner.get(&fields).await?;
    assert_eq!(body["data"], json!({}));
    let (status, _) = owner.delete(&format!("{}/estimate", fields)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The creator is a member from the start
    let members = format!("/v1/cards/{}/members", card);
    let (_, body) = owner.get(&members).await?;
    assert_eq!(body["data"][0]["memberId"], json!(owner.user_id));

    let (status, body) = owner.post(&members, json!({"memberId": other.user_id})).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["memberId"], json!(other.user_id));
    let (_, body) = owner.get(&members).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));

    let (status, _) = owner.delete(&format!("{}/{}", members, other.user_id)).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = owner.delete(&format!("{}/{}", members, other.user_id)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = owner.get(&members).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn personal_card_order_is_deduplicated() -> Result<()> {
    let Some(server) = common::db_server().await? else { return Ok(()) };
    let user = Api::register(server, "Sorter").await?;

    let board = user.board("Errands").await?;
    let list = user.list(board, "Today").await?;
    let first = user.card(list, json!({"title": "groceries"})).await?;
    let second = user.card(list, json!({"title": "laundry"})).await?;

    let (status, body) = user
        .patch("/v1/users/card-order", json!({"cardOrderIds": [second, second, first]}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(uuid_list(&body["data"]), vec![second, first]);

    let (status, body) = user.get("/v1/cards/user/all").await?;
    assert_eq!(status, StatusCode::OK);
    let mine: Vec<Uuid> = ids(&body["data"])
        .into_iter()
        .filter(|id| *id == first || *id == second)
        .collect();
    assert_eq!(mine, vec![second, first]);
    Ok(())
}
