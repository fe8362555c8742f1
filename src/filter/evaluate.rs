use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use std::cmp::Ordering;

use super::types::{CardFilter, FilterOp};
use crate::database::models::CardWithBoard;

/// A card field reduced to something comparable
#[derive(Debug, Clone, PartialEq)]
enum FieldValue {
    Text(String),
    Date(NaiveDate),
    Bool(bool),
}

impl FieldValue {
    fn text(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            FieldValue::Bool(b) => b.to_string(),
        }
    }

    fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            FieldValue::Text(s) => parse_date(s),
            FieldValue::Bool(_) => None,
        }
    }
}

fn field_value(card: &CardWithBoard, field: &str) -> Option<FieldValue> {
    let c = &card.card;
    match field {
        "title" => Some(FieldValue::Text(c.title.clone())),
        "description" => c.description.clone().map(FieldValue::Text),
        "dueDate" => c.due_date.map(|d| FieldValue::Date(d.date_naive())),
        "startDate" => c.start_date.map(|d| FieldValue::Date(d.date_naive())),
        "endDate" => c.end_date.map(|d| FieldValue::Date(d.date_naive())),
        "status" => Some(FieldValue::Text(c.status.clone())),
        "priority" => c.priority.clone().map(FieldValue::Text),
        "type" => Some(FieldValue::Text(c.card_type.clone())),
        "recurring" => Some(FieldValue::Bool(card.is_recurring())),
        "board" => Some(FieldValue::Text(card.board_title.clone())),
        "list" => Some(FieldValue::Text(card.list_title.clone())),
        custom => c
            .metadata
            .get("customFields")
            .and_then(|fields| fields.get(custom))
            .and_then(|field| field.get("value"))
            .and_then(json_field_value),
    }
}

fn json_field_value(value: &Value) -> Option<FieldValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(FieldValue::Bool(*b)),
        Value::String(s) => Some(FieldValue::Text(s.clone())),
        other => Some(FieldValue::Text(other.to_string())),
    }
}

fn value_is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp; the date is taken in UTC
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|d| d.naive_utc().date()))
}

fn value_date(value: &Value) -> Option<NaiveDate> {
    value.as_str().and_then(parse_date)
}

fn number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok()
}

/// Date comparison when the field is a date, numeric comparison otherwise
fn compare(field: &FieldValue, value: &Value) -> Option<Ordering> {
    match field {
        FieldValue::Date(d) => value_date(value).map(|v| d.cmp(&v)),
        _ => {
            let left = number(&field.text())?;
            let right = match value {
                Value::Number(n) => n.as_f64()?,
                other => number(&value_text(other))?,
            };
            left.partial_cmp(&right)
        }
    }
}

fn compare_dates(field: &FieldValue, value: &Value) -> Option<Ordering> {
    Some(field.as_date()?.cmp(&value_date(value)?))
}

fn equals(field: &FieldValue, value: &Value) -> bool {
    match field {
        FieldValue::Date(d) => value_date(value) == Some(*d),
        FieldValue::Bool(b) => match value {
            Value::Bool(v) => v == b,
            other => value_text(other).eq_ignore_ascii_case(&b.to_string()),
        },
        FieldValue::Text(s) => s.to_lowercase() == value_text(value).to_lowercase(),
    }
}

fn contained_in(field: &FieldValue, value: &Value) -> bool {
    let text = field.text();
    match value {
        Value::Array(items) => items.iter().any(|item| value_text(item) == text),
        other => value_text(other) == text,
    }
}

/// Evaluate one filter against a card
pub fn evaluate(card: &CardWithBoard, filter: &CardFilter) -> bool {
    let value = &filter.value;

    let Some(field) = field_value(card, &filter.field) else {
        return match filter.operator {
            FilterOp::Equals => value_is_empty(value),
            FilterOp::NotEquals => !value_is_empty(value),
            FilterOp::NotContains => true,
            _ => false,
        };
    };

    let haystack = || field.text().to_lowercase();
    let needle = || value_text(value).to_lowercase();

    match filter.operator {
        FilterOp::Contains => haystack().contains(&needle()),
        FilterOp::NotContains => !haystack().contains(&needle()),
        FilterOp::StartsWith => haystack().starts_with(&needle()),
        FilterOp::EndsWith => haystack().ends_with(&needle()),
        FilterOp::Equals => equals(&field, value),
        FilterOp::NotEquals => !equals(&field, value),
        FilterOp::GreaterThan => compare(&field, value) == Some(Ordering::Greater),
        FilterOp::GreaterThanOrEqual => {
            matches!(compare(&field, value), Some(Ordering::Greater | Ordering::Equal))
        }
        FilterOp::LessThan => compare(&field, value) == Some(Ordering::Less),
        FilterOp::LessThanOrEqual => {
            matches!(compare(&field, value), Some(Ordering::Less | Ordering::Equal))
        }
        FilterOp::DateGreaterThan => compare_dates(&field, value) == Some(Ordering::Greater),
        FilterOp::DateGreaterThanOrEqual => {
            matches!(compare_dates(&field, value), Some(Ordering::Greater | Ordering::Equal))
        }
        FilterOp::DateLessThan => compare_dates(&field, value) == Some(Ordering::Less),
        FilterOp::DateLessThanOrEqual => {
            matches!(compare_dates(&field, value), Some(Ordering::Less | Ordering::Equal))
        }
        FilterOp::In => contained_in(&field, value),
        FilterOp::NotIn => !contained_in(&field, value),
        FilterOp::Unknown => true,
    }
}

/// Case-insensitive substring match on title or description
pub fn matches_search(card: &CardWithBoard, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    card.card.title.to_lowercase().contains(&term)
        || card
            .card
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&term))
}
