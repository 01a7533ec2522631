//! In-process data store.
//!
//! Used by the test suites and by `store.backend = "memory"` for local runs.
//! Nothing is persisted. Every table sits behind one lock so the joint status
//! write is atomic in the same sense a database transaction is.

use crate::core::lifecycle;
use crate::models::{Match, MatchResponse, MatchStatus, RequestStatus};
use crate::services::store::{DataStore, Filter, StoreError, StoreResult, Table};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Table, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        tracing::info!("Creating in-memory data store (not persisted)");
        Self::default()
    }

    /// Number of rows currently held in `table`
    pub async fn len(&self, table: Table) -> usize {
        self.tables.read().await.get(&table).map_or(0, Vec::len)
    }

    pub async fn is_empty(&self, table: Table) -> bool {
        self.len(table).await == 0
    }
}

fn row_id(row: &Value) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

fn created_at(row: &Value) -> Option<DateTime<Utc>> {
    row.get("created_at")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn status_of<T: serde::de::DeserializeOwned>(row: &Value, what: &str) -> StoreResult<T> {
    let raw = row.get("status").cloned().unwrap_or(Value::Null);
    serde_json::from_value(raw)
        .map_err(|e| StoreError::InvalidResponse(format!("Bad {} status: {}", what, e)))
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn create(&self, table: Table, mut record: Value) -> StoreResult<String> {
        table.check_record(&record)?;

        let id = match row_id(&record) {
            Some(id) => id.to_string(),
            None => uuid::Uuid::new_v4().to_string(),
        };

        if let Some(obj) = record.as_object_mut() {
            obj.insert("id".to_string(), Value::String(id.clone()));
            obj.entry("created_at")
                .or_insert_with(|| json!(Utc::now()));
        }

        let mut tables = self.tables.write().await;
        let rows = tables.entry(table).or_default();

        if rows.iter().any(|row| row_id(row) == Some(id.as_str())) {
            return Err(StoreError::Conflict(format!(
                "duplicate key {} in {}",
                id,
                table.name()
            )));
        }

        rows.push(record);
        tracing::debug!("Created {} row {}", table.name(), id);

        Ok(id)
    }

    async fn query(&self, table: Table, filters: &[Filter]) -> StoreResult<Vec<Value>> {
        for filter in filters {
            table.check_column(filter.column())?;
        }

        let tables = self.tables.read().await;
        let mut rows: Vec<Value> = tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| filters.iter().all(|f| f.matches(row)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        rows.sort_by(|a, b| {
            created_at(a)
                .cmp(&created_at(b))
                .then_with(|| row_id(a).cmp(&row_id(b)))
        });

        Ok(rows)
    }

    async fn update(&self, table: Table, id: &str, patch: Value) -> StoreResult<()> {
        table.check_record(&patch)?;

        let mut tables = self.tables.write().await;
        let row = tables
            .get_mut(&table)
            .and_then(|rows| rows.iter_mut().find(|row| row_id(row) == Some(id)))
            .ok_or_else(|| StoreError::NotFound(format!("{} row {}", table.name(), id)))?;

        if let (Some(target), Some(changes)) = (row.as_object_mut(), patch.as_object()) {
            for (key, value) in changes {
                if key != "id" {
                    target.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(())
    }

    async fn apply_response(&self, response: &MatchResponse) -> StoreResult<Match> {
        let mut tables = self.tables.write().await;

        let request_status: RequestStatus = {
            let request = tables
                .get(&Table::ParentRequests)
                .and_then(|rows| rows.iter().find(|row| row_id(row) == Some(response.request_id.as_str())))
                .ok_or_else(|| StoreError::NotFound(format!("parent request {}", response.request_id)))?;
            status_of(request, "request")?
        };

        let existing_match: Option<MatchStatus> = match &response.match_id {
            Some(match_id) => {
                let row = tables
                    .get(&Table::Matches)
                    .and_then(|rows| rows.iter().find(|row| row_id(row) == Some(match_id.as_str())))
                    .filter(|row| {
                        row.get("request_id").and_then(Value::as_str) == Some(response.request_id.as_str())
                            && row.get("tutor_id").and_then(Value::as_str) == Some(response.tutor_id.as_str())
                    })
                    .ok_or_else(|| StoreError::NotFound(format!("match {}", match_id)))?;
                Some(status_of(row, "match")?)
            }
            None => None,
        };

        let transition = lifecycle::plan(request_status, existing_match, response.decision)?;

        // Both checks passed; from here on nothing can fail halfway.
        if let Some(request) = tables
            .get_mut(&Table::ParentRequests)
            .and_then(|rows| rows.iter_mut().find(|row| row_id(row) == Some(response.request_id.as_str())))
        {
            request["status"] = json!(transition.request);
        }

        let matches = tables.entry(Table::Matches).or_default();
        let row = match &response.match_id {
            Some(match_id) => {
                let row = matches
                    .iter_mut()
                    .find(|row| row_id(row) == Some(match_id.as_str()))
                    .ok_or_else(|| StoreError::NotFound(format!("match {}", match_id)))?;
                row["status"] = json!(transition.matched);
                row.clone()
            }
            None => {
                let row = json!({
                    "id": uuid::Uuid::new_v4().to_string(),
                    "request_id": response.request_id,
                    "tutor_id": response.tutor_id,
                    "status": transition.matched,
                    "created_at": Utc::now(),
                });
                matches.push(row.clone());
                row
            }
        };

        tracing::info!(
            "Request {} -> {}, match {} -> {}",
            response.request_id,
            transition.request,
            row_id(&row).unwrap_or_default(),
            transition.matched
        );

        serde_json::from_value(row)
            .map_err(|e| StoreError::InvalidResponse(format!("Failed to parse match: {}", e)))
    }

    async fn health_check(&self) -> StoreResult<bool> {
        Ok(true)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
