//! Account & data store interface.
//!
//! Every backend (direct Postgres, the hosted REST API, in-memory) speaks the
//! same four-table, filter-based surface. Rows travel as JSON objects; typed
//! decoding happens at the call site through [`decode_rows`].

use crate::core::lifecycle::LifecycleError;
use crate::models::{Match, MatchResponse};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when talking to the data store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Unauthorized: invalid service key")]
    Unauthorized,

    #[error("Unknown column {column} on {table}")]
    UnknownColumn { table: &'static str, column: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl From<LifecycleError> for StoreError {
    fn from(err: LifecycleError) -> Self {
        StoreError::Conflict(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Tables of the data store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Profiles,
    TutorProfiles,
    ParentRequests,
    Matches,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Profiles => "profiles",
            Table::TutorProfiles => "tutor_profiles",
            Table::ParentRequests => "parent_requests",
            Table::Matches => "matches",
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::Profiles => &[
                "id", "role", "full_name", "email", "phone", "location", "created_at", "updated_at",
            ],
            Table::TutorProfiles => &[
                "id", "subjects", "hourly_rate", "qualifications", "bio", "location", "created_at",
                "updated_at",
            ],
            Table::ParentRequests => &[
                "id", "parent_id", "grade_level", "subjects", "budget_min", "budget_max", "location",
                "requirements", "status", "created_at",
            ],
            Table::Matches => &["id", "request_id", "tutor_id", "status", "created_at"],
        }
    }

    /// Reject column names the table does not have
    pub fn check_column(&self, column: &str) -> StoreResult<()> {
        if self.columns().contains(&column) {
            Ok(())
        } else {
            Err(StoreError::UnknownColumn {
                table: self.name(),
                column: column.to_string(),
            })
        }
    }

    /// Check every key of a JSON object record
    pub fn check_record(&self, record: &Value) -> StoreResult<Vec<String>> {
        let object = record
            .as_object()
            .ok_or_else(|| StoreError::InvalidResponse("record must be a JSON object".into()))?;

        object
            .keys()
            .map(|key| self.check_column(key).map(|_| key.clone()))
            .collect()
    }
}

/// Row predicate understood by every store backend
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Column equals value
    Eq(String, Value),
    /// Numeric column is at least value
    Gte(String, f64),
    /// Numeric column is at most value
    Lte(String, f64),
    /// Array column contains every listed value
    Contains(String, Vec<String>),
    /// Array column shares at least one listed value
    Overlaps(String, Vec<String>),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(column.to_string(), value.into())
    }

    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(c, _)
            | Filter::Gte(c, _)
            | Filter::Lte(c, _)
            | Filter::Contains(c, _)
            | Filter::Overlaps(c, _) => c,
        }
    }

    /// Evaluate against a JSON row. Missing or mistyped columns never match.
    pub fn matches(&self, row: &Value) -> bool {
        let field = row.get(self.column());
        match self {
            Filter::Eq(_, value) => field.unwrap_or(&Value::Null) == value,
            Filter::Gte(_, bound) => field.and_then(Value::as_f64).is_some_and(|n| n >= *bound),
            Filter::Lte(_, bound) => field.and_then(Value::as_f64).is_some_and(|n| n <= *bound),
            Filter::Contains(_, wanted) => string_array(field)
                .is_some_and(|have| wanted.iter().all(|w| have.contains(&w.as_str()))),
            Filter::Overlaps(_, wanted) => string_array(field)
                .is_some_and(|have| wanted.iter().any(|w| have.contains(&w.as_str()))),
        }
    }
}

fn string_array(field: Option<&Value>) -> Option<Vec<&str>> {
    field
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
}

/// Generic create/read/update surface of the account & data store, plus the
/// one joint write the status lifecycle needs.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Insert a record and return its id
    async fn create(&self, table: Table, record: Value) -> StoreResult<String>;

    /// Rows matching every filter, ordered by `created_at` then `id`
    async fn query(&self, table: Table, filters: &[Filter]) -> StoreResult<Vec<Value>>;

    /// Merge `patch` into the row with `id`. Fails with `NotFound` when absent.
    async fn update(&self, table: Table, id: &str, patch: Value) -> StoreResult<()>;

    /// Apply a tutor decision to the match and its request atomically.
    ///
    /// Both must still be pending; otherwise nothing is written and the call
    /// fails with `Conflict`.
    async fn apply_response(&self, response: &MatchResponse) -> StoreResult<Match>;

    async fn health_check(&self) -> StoreResult<bool>;

    /// Short backend name for logs and health output
    fn backend(&self) -> &'static str;
}

/// Decode JSON rows into typed records
pub fn decode_rows<T: DeserializeOwned>(table: Table, rows: Vec<Value>) -> StoreResult<Vec<T>> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row).map_err(|e| {
                StoreError::InvalidResponse(format!("Failed to parse {} row: {}", table.name(), e))
            })
        })
        .collect()
}

/// Decode at most one row
pub fn decode_first<T: DeserializeOwned>(table: Table, rows: Vec<Value>) -> StoreResult<Option<T>> {
    Ok(decode_rows(table, rows.into_iter().take(1).collect())?.pop())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_column_rejected() {
        let err = Table::Matches.check_column("hourly_rate").unwrap_err();
        assert!(matches!(err, StoreError::UnknownColumn { table: "matches", .. }));
        assert!(Table::TutorProfiles.check_column("hourly_rate").is_ok());
    }

    #[test]
    fn test_check_record_lists_keys() {
        let keys = Table::Matches
            .check_record(&json!({"id": "m1", "status": "pending"}))
            .unwrap();
        assert_eq!(keys.len(), 2);
        assert!(Table::Matches.check_record(&json!(["not", "an", "object"])).is_err());
    }

    #[test]
    fn test_filter_eq_and_range() {
        let row = json!({"location": "Pune", "hourly_rate": 2500.0});
        assert!(Filter::eq("location", "Pune").matches(&row));
        assert!(!Filter::eq("location", "Mumbai").matches(&row));
        assert!(Filter::Gte("hourly_rate".into(), 2500.0).matches(&row));
        assert!(Filter::Lte("hourly_rate".into(), 2500.0).matches(&row));
        assert!(!Filter::Gte("hourly_rate".into(), 2500.5).matches(&row));
    }

    #[test]
    fn test_filter_array_predicates() {
        let row = json!({"subjects": ["Math", "Physics"]});
        assert!(Filter::Contains("subjects".into(), vec!["Math".into()]).matches(&row));
        assert!(!Filter::Contains("subjects".into(), vec!["Math".into(), "English".into()]).matches(&row));
        assert!(Filter::Overlaps("subjects".into(), vec!["English".into(), "Physics".into()]).matches(&row));
        assert!(!Filter::Overlaps("subjects".into(), vec![]).matches(&row));
    }

    #[test]
    fn test_missing_column_never_matches() {
        let row = json!({"id": "x"});
        assert!(!Filter::Gte("hourly_rate".into(), 0.0).matches(&row));
        assert!(!Filter::Contains("subjects".into(), vec![]).matches(&row));
    }

    #[test]
    fn test_lifecycle_error_is_conflict() {
        let err: StoreError = LifecycleError::RequestClosed(crate::models::RequestStatus::Matched).into();
        assert_eq!(err.to_string(), "request already matched");
    }
}
