use crate::models::{Match, MatchResponse};
use crate::services::store::{DataStore, Filter, StoreError, StoreResult, Table};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

/// Client for the hosted backend's PostgREST data API
///
/// Handles all table traffic for the service:
/// - Filtered reads (`GET /rest/v1/{table}?col=op.value`)
/// - Inserts and patches
/// - The `respond_to_match` database function for the joint status write
pub struct RestStore {
    base_url: String,
    service_key: String,
    client: Client,
}

impl RestStore {
    /// Create a new REST store client
    pub fn new(base_url: String, service_key: String, timeout: Duration) -> StoreResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            service_key,
            client,
        })
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), table.name())
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
    }

    /// Map a non-success response onto a store error
    async fn error_from(response: Response, what: &str) -> StoreError {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read body".to_string());

        // PostgREST error bodies carry a `message`; fall back to the raw body
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(body);

        tracing::error!("{} failed: {} - {}", what, status, message);

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Unauthorized,
            StatusCode::NOT_FOUND => StoreError::NotFound(message),
            StatusCode::CONFLICT => StoreError::Conflict(message),
            _ => StoreError::ApiError {
                status: status.as_u16(),
                message,
            },
        }
    }
}

/// PostgREST array literal, every element quoted: `{"Math","Social Studies"}`
fn array_literal(values: &[String]) -> String {
    let items = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect::<Vec<_>>()
        .join(",");
    format!("{{{}}}", items)
}

/// Render one filter as a `column=operator.value` query pair
pub fn filter_param(filter: &Filter) -> String {
    let (column, expr) = match filter {
        Filter::Eq(column, Value::Null) => (column, "is.null".to_string()),
        Filter::Eq(column, Value::String(s)) => (column, format!("eq.{}", s)),
        Filter::Eq(column, other) => (column, format!("eq.{}", other)),
        Filter::Gte(column, bound) => (column, format!("gte.{}", bound)),
        Filter::Lte(column, bound) => (column, format!("lte.{}", bound)),
        Filter::Contains(column, values) => (column, format!("cs.{}", array_literal(values))),
        Filter::Overlaps(column, values) => (column, format!("ov.{}", array_literal(values))),
    };

    format!("{}={}", urlencoding::encode(column), urlencoding::encode(&expr))
}

#[async_trait]
impl DataStore for RestStore {
    async fn create(&self, table: Table, record: Value) -> StoreResult<String> {
        table.check_record(&record)?;

        let response = self
            .authorized(self.client.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(&record)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, "Insert").await);
        }

        let json: Value = response.json().await?;

        let id = json
            .as_array()
            .and_then(|rows| rows.first())
            .unwrap_or(&json)
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::InvalidResponse("Inserted row has no id".into()))?
            .to_string();

        tracing::debug!("Created {} row {}", table.name(), id);

        Ok(id)
    }

    async fn query(&self, table: Table, filters: &[Filter]) -> StoreResult<Vec<Value>> {
        let mut params = vec!["select=*".to_string()];
        for filter in filters {
            table.check_column(filter.column())?;
            params.push(filter_param(filter));
        }
        params.push("order=created_at.asc,id.asc".to_string());

        let url = format!("{}?{}", self.table_url(table), params.join("&"));

        tracing::debug!("Querying {}", url);

        let response = self.authorized(self.client.get(&url)).send().await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, "Query").await);
        }

        let json: Value = response.json().await?;

        match json {
            Value::Array(rows) => Ok(rows),
            _ => Err(StoreError::InvalidResponse("Expected an array of rows".into())),
        }
    }

    async fn update(&self, table: Table, id: &str, patch: Value) -> StoreResult<()> {
        table.check_record(&patch)?;

        let url = format!(
            "{}?{}",
            self.table_url(table),
            filter_param(&Filter::eq("id", id))
        );

        let response = self
            .authorized(self.client.patch(&url))
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, "Update").await);
        }

        let json: Value = response.json().await?;
        if json.as_array().is_some_and(|rows| rows.is_empty()) {
            return Err(StoreError::NotFound(format!("{} row {}", table.name(), id)));
        }

        Ok(())
    }

    async fn apply_response(&self, response: &MatchResponse) -> StoreResult<Match> {
        let url = format!(
            "{}/rest/v1/rpc/respond_to_match",
            self.base_url.trim_end_matches('/')
        );

        let payload = json!({
            "p_request_id": response.request_id,
            "p_tutor_id": response.tutor_id,
            "p_match_id": response.match_id,
            "p_decision": response.decision,
        });

        let http_response = self
            .authorized(self.client.post(&url))
            .json(&payload)
            .send()
            .await?;

        if !http_response.status().is_success() {
            return Err(Self::error_from(http_response, "respond_to_match").await);
        }

        let json: Value = http_response.json().await?;
        let row = match json {
            Value::Array(mut rows) if !rows.is_empty() => rows.swap_remove(0),
            object @ Value::Object(_) => object,
            _ => return Err(StoreError::InvalidResponse("respond_to_match returned no row".into())),
        };

        tracing::info!(
            "Request {} answered with {} (rest)",
            response.request_id,
            response.decision.as_str()
        );

        serde_json::from_value(row)
            .map_err(|e| StoreError::InvalidResponse(format!("Failed to parse match: {}", e)))
    }

    async fn health_check(&self) -> StoreResult<bool> {
        let url = format!("{}/rest/v1/", self.base_url.trim_end_matches('/'));
        let response = self.authorized(self.client.get(&url)).send().await?;
        Ok(response.status().is_success())
    }

    fn backend(&self) -> &'static str {
        "rest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_store_creation() {
        let store = RestStore::new(
            "https://backend.test/".to_string(),
            "test_key".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(store.table_url(Table::Matches), "https://backend.test/rest/v1/matches");
        assert_eq!(store.service_key, "test_key");
    }

    #[test]
    fn test_filter_params() {
        assert_eq!(filter_param(&Filter::eq("location", "New Delhi")), "location=eq.New%20Delhi");
        assert_eq!(filter_param(&Filter::Gte("hourly_rate".into(), 2000.0)), "hourly_rate=gte.2000");
        assert_eq!(filter_param(&Filter::Lte("hourly_rate".into(), 3999.5)), "hourly_rate=lte.3999.5");
        assert_eq!(filter_param(&Filter::Eq("bio".into(), Value::Null)), "bio=is.null");
    }

    #[test]
    fn test_array_literal_quotes_elements() {
        assert_eq!(
            array_literal(&["Math".to_string(), "Social \"Studies\"".to_string()]),
            r#"{"Math","Social \"Studies\""}"#
        );
        assert_eq!(array_literal(&[]), "{}");
    }
}
