use crate::core::lifecycle;
use crate::models::{Match, MatchResponse, MatchStatus, RequestStatus};
use crate::services::store::{DataStore, Filter, StoreError, StoreResult, Table};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::time::Duration;
use uuid::Uuid;

/// Data store backed directly by PostgreSQL
///
/// Rows travel as `jsonb` so one code path serves all four tables, while
/// filters compare the typed columns themselves so the table indexes apply.
/// Column names are checked against [`Table::columns`] before they are
/// spliced into SQL; values are always bound.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL store from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// `SELECT` for `table` with every filter applied to the typed columns
    fn select_rows(table: Table, filters: &[Filter]) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT to_jsonb(t) AS row FROM {} t WHERE TRUE",
            table.name()
        ));
        for filter in filters {
            Self::push_filter(&mut qb, filter);
        }
        qb.push(" ORDER BY t.created_at, t.id");
        qb
    }

    /// Append one filter. Column names are whitelisted by [`Table::check_column`]
    /// before they get here; a value of the wrong type matches nothing, as in
    /// [`Filter::matches`].
    fn push_filter(qb: &mut QueryBuilder<'static, Postgres>, filter: &Filter) {
        let column = filter.column();
        let kind = ColumnKind::of(column);

        match (filter, kind) {
            (Filter::Eq(_, Value::Null), _) => {
                qb.push(format!(" AND t.{} IS NULL", column));
            }
            (Filter::Eq(_, Value::String(s)), ColumnKind::Uuid) => match row_id(s) {
                Some(id) => {
                    qb.push(format!(" AND t.{} = ", column));
                    qb.push_bind(id);
                }
                None => {
                    qb.push(" AND FALSE");
                }
            },
            (Filter::Eq(_, Value::String(s)), ColumnKind::Timestamp) => {
                match DateTime::parse_from_rfc3339(s) {
                    Ok(at) => {
                        qb.push(format!(" AND t.{} = ", column));
                        qb.push_bind(at.with_timezone(&Utc));
                    }
                    Err(_) => {
                        qb.push(" AND FALSE");
                    }
                }
            }
            (Filter::Eq(_, Value::String(s)), ColumnKind::Text) => {
                qb.push(format!(" AND t.{} = ", column));
                qb.push_bind(s.clone());
            }
            (Filter::Eq(_, Value::Number(n)), ColumnKind::Number) => match n.as_f64() {
                Some(n) => {
                    qb.push(format!(" AND t.{} = ", column));
                    qb.push_bind(n);
                }
                None => {
                    qb.push(" AND FALSE");
                }
            },
            (Filter::Eq(_, Value::Array(items)), ColumnKind::TextArray) => {
                match items.iter().map(|v| v.as_str().map(str::to_string)).collect::<Option<Vec<_>>>() {
                    Some(values) => {
                        qb.push(format!(" AND t.{} = ", column));
                        qb.push_bind(values);
                    }
                    None => {
                        qb.push(" AND FALSE");
                    }
                }
            }
            (Filter::Gte(_, bound), ColumnKind::Number) => {
                qb.push(format!(" AND t.{} >= ", column));
                qb.push_bind(*bound);
            }
            (Filter::Lte(_, bound), ColumnKind::Number) => {
                qb.push(format!(" AND t.{} <= ", column));
                qb.push_bind(*bound);
            }
            (Filter::Contains(_, values), ColumnKind::TextArray) => {
                qb.push(format!(" AND t.{} @> ", column));
                qb.push_bind(values.clone());
            }
            (Filter::Overlaps(_, values), ColumnKind::TextArray) => {
                qb.push(format!(" AND t.{} && ", column));
                qb.push_bind(values.clone());
            }
            _ => {
                qb.push(" AND FALSE");
            }
        }
    }

    async fn locked_status<'c>(
        tx: &mut sqlx::Transaction<'c, Postgres>,
        sql: &str,
        id: Uuid,
    ) -> StoreResult<Option<sqlx::postgres::PgRow>> {
        Ok(sqlx::query(sql).bind(id).fetch_optional(&mut **tx).await?)
    }
}

/// SQL type family of a column, shared by all four tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Uuid,
    Text,
    Number,
    TextArray,
    Timestamp,
}

impl ColumnKind {
    fn of(column: &str) -> Self {
        match column {
            "id" | "parent_id" | "request_id" | "tutor_id" => ColumnKind::Uuid,
            "hourly_rate" | "budget_min" | "budget_max" => ColumnKind::Number,
            "subjects" | "qualifications" => ColumnKind::TextArray,
            "created_at" | "updated_at" => ColumnKind::Timestamp,
            _ => ColumnKind::Text,
        }
    }
}

/// Row ids are UUIDs; any other string names no row
fn row_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id).ok()
}

const UNIQUE_VIOLATION: &str = "23505";

/// Unique violations surface as `Conflict`, like the other backends
fn insert_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return StoreError::Conflict(db.message().to_string());
        }
    }
    StoreError::SqlxError(err)
}

fn parse_status<T: std::str::FromStr>(raw: &str) -> StoreResult<T>
where
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e: T::Err| StoreError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl DataStore for PostgresStore {
    async fn create(&self, table: Table, record: Value) -> StoreResult<String> {
        let columns = table.check_record(&record)?.join(", ");
        let sql = format!(
            "INSERT INTO {table} ({columns}) \
             SELECT {columns} FROM jsonb_populate_record(NULL::{table}, $1) \
             RETURNING id::text AS id",
            table = table.name(),
            columns = columns,
        );

        let row = sqlx::query(&sql)
            .bind(Json(record))
            .fetch_one(&self.pool)
            .await
            .map_err(insert_error)?;
        let id: String = row.try_get("id")?;

        tracing::debug!("Created {} row {}", table.name(), id);

        Ok(id)
    }

    async fn query(&self, table: Table, filters: &[Filter]) -> StoreResult<Vec<Value>> {
        for filter in filters {
            table.check_column(filter.column())?;
        }

        let mut qb = Self::select_rows(table, filters);
        let rows = qb.build().fetch_all(&self.pool).await?;

        let values = rows
            .iter()
            .map(|row| row.try_get::<Json<Value>, _>("row").map(|json| json.0))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Queried {} {} rows", values.len(), table.name());

        Ok(values)
    }

    async fn update(&self, table: Table, id: &str, patch: Value) -> StoreResult<()> {
        let assignments = table
            .check_record(&patch)?
            .into_iter()
            .filter(|column| column != "id")
            .map(|column| format!("{column} = r.{column}"))
            .collect::<Vec<_>>();

        if assignments.is_empty() {
            return Ok(());
        }

        let row = row_id(id).ok_or_else(|| StoreError::NotFound(format!("{} row {}", table.name(), id)))?;

        let sql = format!(
            "UPDATE {table} AS t SET {assignments} \
             FROM jsonb_populate_record(NULL::{table}, $1) AS r \
             WHERE t.id = $2",
            table = table.name(),
            assignments = assignments.join(", "),
        );

        let result = sqlx::query(&sql)
            .bind(Json(patch))
            .bind(row)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("{} row {}", table.name(), id)));
        }

        Ok(())
    }

    /// Joint status write inside one transaction.
    ///
    /// Rows are locked with `FOR UPDATE`, so concurrent decisions on the same
    /// request queue up and all but the first see a terminal status.
    async fn apply_response(&self, response: &MatchResponse) -> StoreResult<Match> {
        let request_id = row_id(&response.request_id)
            .ok_or_else(|| StoreError::NotFound(format!("parent request {}", response.request_id)))?;
        let match_id = match &response.match_id {
            Some(id) => Some(row_id(id).ok_or_else(|| StoreError::NotFound(format!("match {}", id)))?),
            None => None,
        };

        let mut tx = self.pool.begin().await?;

        let request_row = Self::locked_status(
            &mut tx,
            "SELECT status FROM parent_requests WHERE id = $1 FOR UPDATE",
            request_id,
        )
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("parent request {}", response.request_id)))?;
        let request_status: RequestStatus = parse_status(&request_row.try_get::<String, _>("status")?)?;

        let existing_match: Option<MatchStatus> = match match_id {
            Some(match_id) => {
                let row = Self::locked_status(
                    &mut tx,
                    "SELECT status, request_id::text AS request_id, tutor_id::text AS tutor_id \
                     FROM matches WHERE id = $1 FOR UPDATE",
                    match_id,
                )
                .await?
                .ok_or_else(|| StoreError::NotFound(format!("match {}", match_id)))?;

                let request_id: String = row.try_get("request_id")?;
                let tutor_id: String = row.try_get("tutor_id")?;
                if request_id != response.request_id || tutor_id != response.tutor_id {
                    return Err(StoreError::NotFound(format!("match {}", match_id)));
                }
                Some(parse_status(&row.try_get::<String, _>("status")?)?)
            }
            None => None,
        };

        let transition = lifecycle::plan(request_status, existing_match, response.decision)?;

        sqlx::query("UPDATE parent_requests SET status = $1 WHERE id = $2")
            .bind(transition.request.as_str())
            .bind(request_id)
            .execute(&mut *tx)
            .await?;

        let row = match match_id {
            Some(match_id) => {
                sqlx::query(
                    "UPDATE matches SET status = $1 WHERE id = $2 \
                     RETURNING to_jsonb(matches) AS row",
                )
                .bind(transition.matched.as_str())
                .bind(match_id)
                .fetch_one(&mut *tx)
                .await?
            }
            None => {
                sqlx::query(
                    "INSERT INTO matches (id, request_id, tutor_id, status, created_at) \
                     VALUES ($1::uuid, $2::uuid, $3::uuid, $4, NOW()) \
                     RETURNING to_jsonb(matches) AS row",
                )
                .bind(Uuid::new_v4().to_string())
                .bind(&response.request_id)
                .bind(&response.tutor_id)
                .bind(transition.matched.as_str())
                .fetch_one(&mut *tx)
                .await?
            }
        };

        let Json(value) = row.try_get::<Json<Value>, _>("row")?;
        tx.commit().await?;

        tracing::info!(
            "Request {} -> {}, match -> {} (postgres)",
            response.request_id,
            transition.request,
            transition.matched
        );

        serde_json::from_value(value)
            .map_err(|e| StoreError::InvalidResponse(format!("Failed to parse match: {}", e)))
    }

    /// Health check for the database connection
    async fn health_check(&self) -> StoreResult<bool> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
