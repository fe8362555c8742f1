use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::FilterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    DateGreaterThan,
    DateGreaterThanOrEqual,
    DateLessThan,
    DateLessThanOrEqual,
    In,
    NotIn,
    /// Anything else; matches every card
    #[serde(other)]
    Unknown,
}

/// One `{field, operator, value}` condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardFilter {
    pub field: String,
    pub operator: FilterOp,
    #[serde(default)]
    pub value: Value,
}

/// Query string of `GET /cards/user/all`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardQueryParams {
    pub search: Option<String>,
    pub search_term: Option<String>,
    /// JSON-encoded `Vec<CardFilter>`
    pub filters: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardQuery {
    pub search: Option<String>,
    pub filters: Vec<CardFilter>,
    pub page: u32,
    pub limit: u32,
}

impl CardQuery {
    pub const DEFAULT_LIMIT: u32 = 50;
    pub const MAX_LIMIT: u32 = 500;
}

impl Default for CardQuery {
    fn default() -> Self {
        Self {
            search: None,
            filters: Vec::new(),
            page: 1,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

impl TryFrom<CardQueryParams> for CardQuery {
    type Error = FilterError;

    fn try_from(params: CardQueryParams) -> Result<Self, Self::Error> {
        let filters = match params.filters.as_deref().map(str::trim) {
            None | Some("") => Vec::new(),
            Some(raw) => serde_json::from_str::<Vec<CardFilter>>(raw)
                .map_err(|e| FilterError::InvalidFilters(e.to_string()))?,
        };

        let search = params
            .search
            .or(params.search_term)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            search,
            filters,
            page: params.page.filter(|p| *p > 0).unwrap_or(1),
            limit: params
                .limit
                .filter(|l| *l > 0)
                .unwrap_or(Self::DEFAULT_LIMIT)
                .min(Self::MAX_LIMIT),
        })
    }
}
