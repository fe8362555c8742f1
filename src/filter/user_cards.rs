use serde::Serialize;
use uuid::Uuid;

use super::evaluate::{evaluate, matches_search};
use super::types::CardQuery;
use crate::database::models::CardWithBoard;
use crate::database::pagination::Pagination;
use crate::ordering;

#[derive(Debug, Clone, Serialize)]
pub struct UserCardPage {
    pub cards: Vec<CardWithBoard>,
    pub pagination: Pagination,
}

/// Search, filter, order and page a user's cards.
///
/// Order follows the user's saved card order with unknown cards appended,
/// then completed cards are moved to the end.
pub fn arrange_user_cards(cards: Vec<CardWithBoard>, order_ids: &[Uuid], query: &CardQuery) -> UserCardPage {
    let matching: Vec<CardWithBoard> = cards
        .into_iter()
        .filter(|card| query.search.as_deref().map_or(true, |term| matches_search(card, term)))
        .filter(|card| query.filters.iter().all(|filter| evaluate(card, filter)))
        .collect();

    let ordered = ordering::reconcile(order_ids, matching, |card| card.card.id);
    let ordered = ordering::completed_last(ordered, |card| card.card.is_complete());

    let total = ordered.len();
    let start = (query.page.saturating_sub(1) as usize).saturating_mul(query.limit as usize);
    let cards = ordered.into_iter().skip(start).take(query.limit as usize).collect();

    UserCardPage {
        cards,
        pagination: Pagination::new(total as i64, query.page, query.limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{CardFilter, CardQueryParams, FilterOp};
    use crate::testing;
    use serde_json::json;

    fn titles(page: &UserCardPage) -> Vec<&str> {
        page.cards.iter().map(|c| c.card.title.as_str()).collect()
    }

    fn sample() -> Vec<CardWithBoard> {
        let mut done = testing::card_with_board("Ship v1");
        done.card.status = "done".to_string();
        vec![
            testing::card_with_board("Alpha"),
            done,
            testing::card_with_board("Beta"),
            testing::card_with_board("Gamma"),
        ]
    }

    #[test]
    fn saved_order_then_completed_last() {
        let cards = sample();
        let order = vec![cards[1].card.id, cards[3].card.id];
        let page = arrange_user_cards(cards, &order, &CardQuery::default());
        assert_eq!(titles(&page), vec!["Gamma", "Alpha", "Beta", "Ship v1"]);
        assert_eq!(page.pagination.total, 4);
    }

    #[test]
    fn search_and_filters_combine() {
        let query = CardQuery {
            search: Some("a".to_string()),
            filters: vec![CardFilter {
                field: "title".to_string(),
                operator: FilterOp::NotEquals,
                value: json!("gamma"),
            }],
            ..CardQuery::default()
        };
        let page = arrange_user_cards(sample(), &[], &query);
        assert_eq!(titles(&page), vec!["Alpha", "Beta"]);
    }

    #[test]
    fn paginates_after_ordering() {
        let query = CardQuery { page: 2, limit: 3, ..CardQuery::default() };
        let page = arrange_user_cards(sample(), &[], &query);
        assert_eq!(titles(&page), vec!["Ship v1"]);
        assert_eq!(page.pagination.total_pages, 2);
    }

    #[test]
    fn parses_query_string_filters() {
        let params = CardQueryParams {
            search_term: Some("  notes ".to_string()),
            filters: Some(r#"[{"field":"status","operator":"equals","value":"todo"}]"#.to_string()),
            limit: Some(10_000),
            ..Default::default()
        };
        let query = CardQuery::try_from(params).unwrap();
        assert_eq!(query.search.as_deref(), Some("notes"));
        assert_eq!(query.filters.len(), 1);
        assert_eq!(query.limit, CardQuery::MAX_LIMIT);

        let bad = CardQueryParams { filters: Some("{not json".to_string()), ..Default::default() };
        assert!(CardQuery::try_from(bad).is_err());
    }
}
