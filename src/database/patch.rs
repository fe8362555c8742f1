//! Partial UPDATE support.
//!
//! Request bodies model "field absent" as `None` and "field explicitly null"
//! as `Some(None)`. `UpdateBuilder` turns the present fields into a
//! `SET col = $n, ...` list on top of `sqlx::QueryBuilder`.

use serde::{Deserialize, Deserializer};
use sqlx::{Encode, Postgres, QueryBuilder, Type};

/// Deserialize a present field (including `null`) as `Some(value)`.
/// Use with `#[serde(default, deserialize_with = "deserialize_some")]`.
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

pub struct UpdateBuilder<'a> {
    query: QueryBuilder<'a, Postgres>,
}

impl<'a> UpdateBuilder<'a> {
    /// Starts `UPDATE <table> SET updated_at = NOW()`; the table name must be a constant.
    pub fn new(table: &'static str) -> Self {
        let mut query = QueryBuilder::new("UPDATE ");
        query.push(table).push(" SET updated_at = NOW()");
        Self { query }
    }

    /// Set `column` when the value is present
    pub fn set<T>(&mut self, column: &'static str, value: Option<T>) -> &mut Self
    where
        T: 'a + Encode<'a, Postgres> + Type<Postgres> + Send,
    {
        if let Some(value) = value {
            self.query.push(", ").push(column).push(" = ").push_bind(value);
        }
        self
    }

    /// Set a column unconditionally
    pub fn set_always<T>(&mut self, column: &'static str, value: T) -> &mut Self
    where
        T: 'a + Encode<'a, Postgres> + Type<Postgres> + Send,
    {
        self.query.push(", ").push(column).push(" = ").push_bind(value);
        self
    }

    /// Append `WHERE id = $n AND deleted_at IS NULL RETURNING *`
    pub fn finish(mut self, id: uuid::Uuid) -> QueryBuilder<'a, Postgres> {
        self.query
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND deleted_at IS NULL RETURNING *");
        self.query
    }
}
