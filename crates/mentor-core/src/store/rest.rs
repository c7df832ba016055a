use crate::constants::endpoints;
use crate::error::MentorError;
use crate::store::{Query, Row, RowStore};
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;

/// PostgREST client for the hosted table store (Supabase `rest/v1`).
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Option<String>,
}

impl RestStore {
    pub fn new(project_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let project_url = project_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: format!(
                "{}{}",
                project_url.trim_end_matches('/'),
                endpoints::STORE_REST_PATH
            ),
            api_key: api_key.into(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    /// Renders filters, ordering and limit as PostgREST query parameters.
    pub(crate) fn query_string(query: &Query, with_select: bool) -> String {
        let mut params: Vec<String> = Vec::new();
        if with_select {
            params.push("select=*".to_string());
        }
        for (column, value) in &query.filters {
            let raw = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            params.push(format!(
                "{}=eq.{}",
                urlencoding::encode(column),
                urlencoding::encode(&raw)
            ));
        }
        if let Some(ref order) = query.order {
            let dir = if order.ascending { "asc" } else { "desc" };
            params.push(format!("order={}.{}", urlencoding::encode(&order.column), dir));
        }
        if let Some(limit) = query.limit {
            params.push(format!("limit={limit}"));
        }
        params.join("&")
    }

    fn request(&self, method: Method, table: &str, query: &str) -> RequestBuilder {
        let url = if query.is_empty() {
            self.table_url(table)
        } else {
            format!("{}?{}", self.table_url(table), query)
        };
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
    }

    async fn send_rows(&self, builder: RequestBuilder) -> Result<Vec<Row>, MentorError> {
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(MentorError::api(status.as_u16(), Self::error_message(&text)));
        }
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Value>(&text)? {
            Value::Array(items) => Ok(items
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect()),
            Value::Object(map) => Ok(vec![map]),
            other => Err(MentorError::Store(format!("unexpected response: {other}"))),
        }
    }

    fn error_message(body: &str) -> String {
        match serde_json::from_str::<PostgrestError>(body) {
            Ok(err) => {
                let mut msg = match err.code {
                    Some(code) => format!("{}: {}", code, err.message),
                    None => err.message,
                };
                if let Some(details) = err.details {
                    msg.push_str(&format!(" ({details})"));
                }
                msg
            }
            Err(_) => body.to_string(),
        }
    }

    fn first_row(mut rows: Vec<Row>, table: &str) -> Result<Row, MentorError> {
        if rows.is_empty() {
            return Err(MentorError::Store(format!("{table}: write returned no rows")));
        }
        Ok(rows.remove(0))
    }
}

#[async_trait::async_trait]
impl RowStore for RestStore {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>, MentorError> {
        let qs = Self::query_string(query, true);
        tracing::debug!("select {} ?{}", table, qs);
        self.send_rows(self.request(Method::GET, table, &qs)).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, MentorError> {
        let builder = self
            .request(Method::POST, table, "")
            .header("Prefer", "return=representation")
            .json(&row);
        let rows = self.send_rows(builder).await?;
        Self::first_row(rows, table)
    }

    async fn upsert(&self, table: &str, row: Row) -> Result<Row, MentorError> {
        let builder = self
            .request(Method::POST, table, "")
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&row);
        let rows = self.send_rows(builder).await?;
        Self::first_row(rows, table)
    }

    async fn update(
        &self,
        table: &str,
        query: &Query,
        patch: Row,
    ) -> Result<Vec<Row>, MentorError> {
        let qs = Self::query_string(query, false);
        let builder = self
            .request(Method::PATCH, table, &qs)
            .header("Prefer", "return=representation")
            .json(&patch);
        self.send_rows(builder).await
    }

    async fn delete(&self, table: &str, query: &Query) -> Result<usize, MentorError> {
        let qs = Self::query_string(query, false);
        let builder = self
            .request(Method::DELETE, table, &qs)
            .header("Prefer", "return=representation");
        Ok(self.send_rows(builder).await?.len())
    }
}
