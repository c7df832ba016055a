mod rest;
mod memory;

pub use rest::RestStore;
pub use memory::MemoryStore;

use crate::error::MentorError;
use serde_json::{Map, Value};

/// A table row as the store sees it.
pub type Row = Map<String, Value>;

/// Equality filters plus optional ordering and limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<(String, Value)>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending: false,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// True when every filter matches the row.
    pub fn matches(&self, row: &Row) -> bool {
        self.filters
            .iter()
            .all(|(column, value)| row.get(column).map(|v| loose_eq(v, value)).unwrap_or(false))
    }
}

/// Filters arrive as strings from URLs, so `"7"` must match `7`.
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(s), Value::Number(n)) | (Value::Number(n), Value::String(s)) => {
            *s == n.to_string()
        }
        _ => a == b,
    }
}

/// Generic row-based client for the hosted table store.
///
/// Every write returns the affected rows as the store echoes them back, so
/// callers can learn server-assigned ids.
#[async_trait::async_trait]
pub trait RowStore: Send + Sync {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>, MentorError>;

    async fn insert(&self, table: &str, row: Row) -> Result<Row, MentorError>;

    /// Insert, or replace the row with the same `id`. Rows without `id` get one assigned.
    async fn upsert(&self, table: &str, row: Row) -> Result<Row, MentorError>;

    /// Merge `patch` into every matching row.
    async fn update(&self, table: &str, query: &Query, patch: Row)
        -> Result<Vec<Row>, MentorError>;

    /// Returns the number of deleted rows.
    async fn delete(&self, table: &str, query: &Query) -> Result<usize, MentorError>;

    /// Select expecting exactly one row.
    async fn select_single(&self, table: &str, query: &Query) -> Result<Row, MentorError> {
        let mut rows = self.select(table, query).await?;
        match rows.len() {
            1 => Ok(rows.remove(0)),
            0 => Err(MentorError::NotFound(format!("no row in {table}"))),
            n => Err(MentorError::Store(format!(
                "expected one row in {table}, got {n}"
            ))),
        }
    }
}
