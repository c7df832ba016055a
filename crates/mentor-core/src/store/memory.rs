use crate::error::MentorError;
use crate::store::{Query, Row, RowStore};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-process table store with the same semantics as the hosted one.
///
/// Assigns UUID ids and `created_at` on insert. Used for offline runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently in `table`.
    pub async fn count(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .get(table)
            .map(|rows| rows.len())
            .unwrap_or(0)
    }

    fn stamp(mut row: Row) -> Row {
        let has_id = row.get("id").map(|v| !v.is_null()).unwrap_or(false);
        if !has_id {
            row.insert(
                "id".to_string(),
                Value::String(uuid::Uuid::new_v4().to_string()),
            );
        }
        row.entry("created_at".to_string())
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
        row
    }
}

/// Timestamps compare chronologically even when their fractional digits differ.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (
                DateTime::parse_from_rfc3339(x),
                DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(dx), Ok(dy)) => dx.cmp(&dy),
                _ => x.cmp(y),
            }
        }
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

#[async_trait::async_trait]
impl RowStore for MemoryStore {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>, MentorError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Row> = tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();

        if let Some(ref order) = query.order {
            rows.sort_by(|a, b| {
                let ord = compare_values(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, MentorError> {
        let row = Self::stamp(row);
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();

        if let Some(id) = row.get("id") {
            if rows.iter().any(|r| r.get("id") == Some(id)) {
                return Err(MentorError::api(409, format!("duplicate key id={id}")));
            }
        }
        rows.push(row.clone());
        Ok(row)
    }

    async fn upsert(&self, table: &str, row: Row) -> Result<Row, MentorError> {
        let row = Self::stamp(row);
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();

        let existing = rows
            .iter()
            .position(|r| r.get("id").is_some() && r.get("id") == row.get("id"));

        match existing {
            Some(index) => {
                let current = &mut rows[index];
                // merge-duplicates: incoming columns win, untouched columns stay
                for (k, v) in row {
                    if k == "created_at" {
                        continue;
                    }
                    current.insert(k, v);
                }
                Ok(current.clone())
            }
            None => {
                rows.push(row.clone());
                Ok(row)
            }
        }
    }

    async fn update(
        &self,
        table: &str,
        query: &Query,
        patch: Row,
    ) -> Result<Vec<Row>, MentorError> {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(Vec::new());
        };

        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|r| query.matches(r)) {
            for (k, v) in &patch {
                row.insert(k.clone(), v.clone());
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, query: &Query) -> Result<usize, MentorError> {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|r| !query.matches(r));
        Ok(before - rows.len())
    }
}
