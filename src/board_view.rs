//! Assembly of the board detail and the synthetic "Assigned to me" board
//! from flat query results.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::database::models::{Board, Card, CardMemberRow, CardWithBoard, Label, List, MemberView};
use crate::ordering;
use crate::visibility::BoardAccess;

pub const ASSIGNED_BOARD_ID: &str = "assigned";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    #[serde(flatten)]
    pub card: Card,
    pub members: Vec<MemberView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListView {
    #[serde(flatten)]
    pub list: List,
    pub cards: Vec<CardView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardDetail {
    #[serde(flatten)]
    pub board: Board,
    pub lists: Vec<ListView>,
    pub labels: Vec<Label>,
    pub members: Vec<MemberView>,
    pub access: &'static str,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BoardViewOptions {
    pub include_archived: bool,
}

/// Everything loaded for one board
pub struct BoardRows {
    pub board: Board,
    pub lists: Vec<List>,
    pub cards: Vec<Card>,
    pub card_members: Vec<CardMemberRow>,
    pub labels: Vec<Label>,
    pub members: Vec<MemberView>,
}

fn members_by_card(rows: Vec<CardMemberRow>) -> HashMap<Uuid, Vec<MemberView>> {
    let mut by_card: HashMap<Uuid, Vec<MemberView>> = HashMap::new();
    for row in rows {
        by_card.entry(row.card_id).or_default().push(row.member);
    }
    by_card
}

pub fn assemble_board(
    viewer_id: Uuid,
    rows: BoardRows,
    access: BoardAccess,
    options: BoardViewOptions,
) -> BoardDetail {
    let BoardRows { board, lists, cards, card_members, labels, members } = rows;
    let mut card_members = members_by_card(card_members);

    let lists: Vec<List> = lists
        .into_iter()
        .filter(|l| options.include_archived || !l.archived)
        .collect();
    let lists = ordering::reconcile(&board.list_order_ids.0, lists, |l| l.id);

    let mut cards: Vec<Card> = cards
        .into_iter()
        .filter(|c| options.include_archived || !c.archived)
        .filter(|c| {
            access.sees_all_cards()
                || c.created_by == Some(viewer_id)
                || card_members
                    .get(&c.id)
                    .is_some_and(|ms| ms.iter().any(|m| m.member_id == viewer_id))
        })
        .collect();
    cards.sort_by(|a, b| a.position.cmp(&b.position).then(a.created_at.cmp(&b.created_at)));

    let mut by_list: HashMap<Uuid, Vec<Card>> = HashMap::new();
    for card in cards {
        by_list.entry(card.list_id).or_default().push(card);
    }

    let lists = lists
        .into_iter()
        .map(|list| {
            let list_cards = by_list.remove(&list.id).unwrap_or_default();
            let list_cards = ordering::reconcile(&list.card_order_ids.0, list_cards, |c| c.id);
            let cards = list_cards
                .into_iter()
                .map(|card| CardView {
                    members: card_members.remove(&card.id).unwrap_or_default(),
                    card,
                })
                .collect();
            ListView { list, cards }
        })
        .collect();

    BoardDetail {
        board,
        lists,
        labels,
        members,
        access: if access.sees_all_cards() { "full" } else { "member" },
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedCard {
    #[serde(flatten)]
    pub card: CardWithBoard,
    pub members: Vec<MemberView>,
}

/// One list per source board
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedList {
    pub board_id: Uuid,
    pub title: String,
    pub cards: Vec<AssignedCard>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedBoard {
    pub id: &'static str,
    pub title: &'static str,
    pub lists: Vec<AssignedList>,
}

/// Cards other people put the viewer on, grouped by board.
pub fn assemble_assigned(
    viewer_id: Uuid,
    cards: Vec<CardWithBoard>,
    card_members: Vec<CardMemberRow>,
    order_ids: &[Uuid],
) -> AssignedBoard {
    let mut card_members = members_by_card(card_members);

    let assigned: Vec<CardWithBoard> = cards
        .into_iter()
        .filter(|c| c.card.created_by != Some(viewer_id))
        .filter(|c| {
            card_members
                .get(&c.card.id)
                .is_some_and(|ms| ms.iter().any(|m| m.member_id == viewer_id))
        })
        .collect();

    // (board title, board id) keeps lists sorted by title and distinct per board
    let mut by_board: BTreeMap<(String, Uuid), Vec<CardWithBoard>> = BTreeMap::new();
    for card in assigned {
        by_board
            .entry((card.board_title.clone(), card.card.board_id))
            .or_default()
            .push(card);
    }

    let lists = by_board
        .into_iter()
        .map(|((title, board_id), cards)| {
            let cards = ordering::reconcile(order_ids, cards, |c| c.card.id);
            let cards = ordering::completed_last(cards, |c| c.card.is_complete());
            AssignedList {
                board_id,
                title,
                cards: cards
                    .into_iter()
                    .map(|card| AssignedCard {
                        members: card_members.remove(&card.card.id).unwrap_or_default(),
                        card,
                    })
                    .collect(),
            }
        })
        .collect();

    AssignedBoard {
        id: ASSIGNED_BOARD_ID,
        title: "Assigned to me",
        lists,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::types::MemberRole;
    use sqlx::types::Json;

    fn member_row(card_id: Uuid, member_id: Uuid) -> CardMemberRow {
        CardMemberRow { card_id, member: testing::member(member_id, "member") }
    }

    struct Fixture {
        viewer: Uuid,
        rows: BoardRows,
        todo: Uuid,
        doing: Uuid,
    }

    fn fixture() -> Fixture {
        let viewer = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let mut board = testing::board(owner);
        let mut todo = testing::list(board.id, "Todo");
        let doing = testing::list(board.id, "Doing");
        let mut archived = testing::list(board.id, "Old");
        archived.archived = true;

        let mut mine = testing::card(board.id, todo.id, "mine");
        mine.created_by = Some(viewer);
        mine.position = 2;
        let mut assigned = testing::card(board.id, todo.id, "assigned");
        assigned.position = 1;
        let other = testing::card(board.id, todo.id, "other");
        let later = testing::card(board.id, doing.id, "later");
        let orphan = testing::card(board.id, archived.id, "orphan");

        // Stored order names a stale id and only one of the live lists
        board.list_order_ids = Json(vec![Uuid::new_v4(), doing.id]);
        todo.card_order_ids = Json(vec![mine.id]);

        let (todo_id, doing_id) = (todo.id, doing.id);
        let card_members = vec![member_row(assigned.id, viewer)];
        Fixture {
            viewer,
            rows: BoardRows {
                board,
                lists: vec![todo, doing, archived],
                cards: vec![mine, assigned, other, later, orphan],
                card_members,
                labels: Vec::new(),
                members: Vec::new(),
            },
            todo: todo_id,
            doing: doing_id,
        }
    }

    fn titles(list: &ListView) -> Vec<&str> {
        list.cards.iter().map(|c| c.card.title.as_str()).collect()
    }

    #[test]
    fn full_access_orders_lists_and_cards() {
        let f = fixture();
        let detail = assemble_board(f.viewer, f.rows, BoardAccess::Full, BoardViewOptions::default());

        let list_ids: Vec<Uuid> = detail.lists.iter().map(|l| l.list.id).collect();
        assert_eq!(list_ids, vec![f.doing, f.todo]);
        assert_eq!(titles(&detail.lists[1]), vec!["mine", "other", "assigned"]);
        assert_eq!(detail.access, "full");
    }

    #[test]
    fn member_access_sees_own_and_assigned_cards() {
        let f = fixture();
        let detail = assemble_board(
            f.viewer,
            f.rows,
            BoardAccess::Member(MemberRole::Member),
            BoardViewOptions::default(),
        );
        assert_eq!(titles(&detail.lists[1]), vec!["mine", "assigned"]);
        assert!(detail.lists[0].cards.is_empty());
        assert_eq!(detail.lists[1].cards[1].members.len(), 1);
    }

    #[test]
    fn archived_lists_only_on_request() {
        let f = fixture();
        let detail = assemble_board(
            f.viewer,
            f.rows,
            BoardAccess::Full,
            BoardViewOptions { include_archived: true },
        );
        assert_eq!(detail.lists.len(), 3);
        assert_eq!(titles(&detail.lists[2]), vec!["orphan"]);
    }

    #[test]
    fn assigned_view_excludes_own_cards_and_groups_by_board() {
        let viewer = Uuid::new_v4();
        let mut own = testing::card_with_board("own");
        own.card.created_by = Some(viewer);
        let mut first = testing::card_with_board("first");
        first.board_title = "Beta".to_string();
        let mut done = testing::card_with_board("done");
        done.card.status = "completed".to_string();
        done.board_title = "Alpha".to_string();
        let mut open = testing::card_with_board("open");
        open.board_title = "Alpha".to_string();
        open.card.board_id = done.card.board_id;
        let unassigned = testing::card_with_board("unassigned");

        let members = vec![
            member_row(own.card.id, viewer),
            member_row(first.card.id, viewer),
            member_row(done.card.id, viewer),
            member_row(open.card.id, viewer),
        ];
        let order = vec![done.card.id, open.card.id];
        let board = assemble_assigned(viewer, vec![own, first, done, open, unassigned], members, &order);

        assert_eq!(board.id, ASSIGNED_BOARD_ID);
        let lists: Vec<&str> = board.lists.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(lists, vec!["Alpha", "Beta"]);
        let alpha: Vec<&str> = board.lists[0].cards.iter().map(|c| c.card.card.title.as_str()).collect();
        assert_eq!(alpha, vec!["open", "done"]);
    }
}
