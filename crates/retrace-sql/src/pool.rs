//! Pool - recording wrapper around a sqlx Postgres pool
//!
//! `RecordingPool` exposes the operations request handlers actually issue
//! (ping, execute, fetch) with a single call site for every mode: capture
//! runs the real operation and records its outcome, replay answers from the
//! recorded outcome without acquiring a connection.

use std::future::Future;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPool};
use sqlx::query::Query;
use sqlx::{Connection, Postgres};
use tracing::instrument;

use retrace_core::{
    process_dependency_in, recording_enabled, DependencyKind, DependencyMeta, ErrorRecord,
    ExecutionContext, Interception, Mode, RecordedValue,
};

use crate::error::{Error, Result};
use crate::row::row_to_json;

/// Tagged positional query parameter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// SQL NULL
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit integer
    Int(i64),
    /// Double-precision float
    Float(f64),
    /// Text
    Text(String),
    /// Raw bytes
    Bytes(Vec<u8>),
}

/// Mode-aware SQL executor wrapping a real `sqlx::PgPool`
#[derive(Debug, Clone)]
pub struct RecordingPool {
    pool: PgPool,
    target: String,
}

impl RecordingPool {
    /// Wrap an existing pool
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            target: "postgres".to_string(),
        }
    }

    /// Name this connection target in recorded metadata
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// The wrapped pool, for operations that must bypass interception
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn meta(&self, operation: &str) -> DependencyMeta {
        DependencyMeta::new(self.target.clone(), DependencyKind::Sql, operation)
    }

    /// Check connectivity
    #[instrument(skip(self))]
    pub async fn ping(&self) -> Result<()> {
        self.intercept("Ping", "unit", async {
            let mut conn = self.pool.acquire().await?;
            conn.ping().await
        })
        .await
    }

    /// Run a statement, returning the number of affected rows
    #[instrument(skip(self, params))]
    pub async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64> {
        self.intercept("Execute", "rows_affected", async {
            let result = bind_params(sqlx::query(sql), params)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected())
        })
        .await
    }

    /// Run a query, returning every row as a column → JSON-value map
    #[instrument(skip(self, params))]
    pub async fn fetch_all(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Value>> {
        self.intercept("FetchAll", "rows", async {
            let rows = bind_params(sqlx::query(sql), params)
                .fetch_all(&self.pool)
                .await?;
            Ok(rows.iter().map(row_to_json).collect())
        })
        .await
    }

    /// Run a query expected to return exactly one row
    #[instrument(skip(self, params))]
    pub async fn fetch_one(&self, sql: &str, params: &[SqlParam]) -> Result<Value> {
        self.intercept("FetchOne", "row", async {
            let row = bind_params(sqlx::query(sql), params)
                .fetch_one(&self.pool)
                .await?;
            Ok(row_to_json(&row))
        })
        .await
    }

    /// Run a query returning at most one row
    #[instrument(skip(self, params))]
    pub async fn fetch_optional(&self, sql: &str, params: &[SqlParam]) -> Result<Option<Value>> {
        self.intercept("FetchOptional", "maybe_row", async {
            let row = bind_params(sqlx::query(sql), params)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row.as_ref().map(row_to_json))
        })
        .await
    }

    /// Route one operation through the interception protocol.
    ///
    /// `call` is only awaited in capture and off modes; replay drops it
    /// unpolled, so the real database is never touched.
    async fn intercept<T, F>(&self, operation: &str, tag: &str, call: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        if !recording_enabled() {
            return call.await.map_err(Error::from);
        }
        let ctx = ExecutionContext::current()?;
        match ctx.mode() {
            Mode::Off => call.await.map_err(Error::from),
            Mode::Capture => match call.await {
                Ok(value) => {
                    process_dependency_in(
                        &ctx,
                        self.meta(operation),
                        None,
                        vec![RecordedValue::of(tag, &value)?],
                    )?;
                    Ok(value)
                }
                Err(err) => {
                    process_dependency_in(
                        &ctx,
                        self.meta(operation),
                        Some(ErrorRecord::of(&err)),
                        Vec::new(),
                    )?;
                    Err(err.into())
                }
            },
            Mode::Replay => match process_dependency_in(
                &ctx,
                self.meta(operation),
                None,
                Vec::new(),
            )? {
                Interception::Mocked {
                    error: Some(err), ..
                } => Err(Error::Replayed(err.message)),
                Interception::Mocked { results, .. } => results
                    .first()
                    .ok_or_else(|| Error::InvalidRecord(format!("{operation} record is empty")))?
                    .decode()
                    .map_err(Error::from),
                Interception::Passthrough { .. } => Err(Error::Core(
                    retrace_core::Error::InvalidMode("passthrough outcome during replay".into()),
                )),
            },
        }
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[SqlParam],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            SqlParam::Null => query.bind(Option::<String>::None),
            SqlParam::Bool(v) => query.bind(*v),
            SqlParam::Int(v) => query.bind(*v),
            SqlParam::Float(v) => query.bind(*v),
            SqlParam::Text(v) => query.bind(v.clone()),
            SqlParam::Bytes(v) => query.bind(v.clone()),
        };
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrace_core::{set_recording_enabled, DependencyRecord};
    use serde_json::json;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::{Mutex, MutexGuard, PoisonError};

    static SWITCH: Mutex<()> = Mutex::new(());

    fn switch_guard() -> MutexGuard<'static, ()> {
        SWITCH.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A pool that never connects; replay must not need one.
    fn lazy_pool() -> RecordingPool {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://nobody@127.0.0.1:9/nowhere")
            .expect("lazy pool");
        RecordingPool::new(pool)
    }

    fn record<T: Serialize>(operation: &str, tag: &str, value: &T) -> DependencyRecord {
        DependencyRecord::new(
            DependencyMeta::new("postgres", DependencyKind::Sql, operation),
            None,
            vec![RecordedValue::of(tag, value).unwrap()],
        )
    }

    #[tokio::test]
    async fn test_replay_ping_without_database() {
        let _guard = switch_guard();
        set_recording_enabled(true);
        let pool = lazy_pool();
        let ctx = ExecutionContext::replay("t-1", vec![record("Ping", "unit", &())]);

        ctx.scope(pool.ping()).await.unwrap();
        set_recording_enabled(false);
    }

    #[tokio::test]
    async fn test_replay_execute_returns_recorded_count() {
        let _guard = switch_guard();
        set_recording_enabled(true);
        let pool = lazy_pool();
        let ctx =
            ExecutionContext::replay("t-1", vec![record("Execute", "rows_affected", &3u64)]);

        let affected = ctx
            .scope(pool.execute("update users set active = $1", &[SqlParam::Bool(true)]))
            .await
            .unwrap();
        assert_eq!(affected, 3);
        set_recording_enabled(false);
    }

    #[tokio::test]
    async fn test_replay_fetch_all_returns_recorded_rows() {
        let _guard = switch_guard();
        set_recording_enabled(true);
        let pool = lazy_pool();
        let rows = vec![json!({"id": 1, "name": "alice"}), json!({"id": 2, "name": "bob"})];
        let ctx = ExecutionContext::replay("t-1", vec![record("FetchAll", "rows", &rows)]);

        let fetched = ctx
            .scope(pool.fetch_all("select id, name from users", &[]))
            .await
            .unwrap();
        assert_eq!(fetched, rows);
        set_recording_enabled(false);
    }

    #[tokio::test]
    async fn test_replay_reproduces_database_failure() {
        let _guard = switch_guard();
        set_recording_enabled(true);
        let pool = lazy_pool();
        let failing = DependencyRecord::new(
            DependencyMeta::new("postgres", DependencyKind::Sql, "Execute"),
            Some(ErrorRecord::new("duplicate key value")),
            Vec::new(),
        );
        let ctx = ExecutionContext::replay("t-1", vec![failing]);

        let err = ctx
            .scope(pool.execute("insert into users values ($1)", &[SqlParam::Int(1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Replayed(ref msg) if msg == "duplicate key value"));
        set_recording_enabled(false);
    }

    #[tokio::test]
    async fn test_replay_exhaustion_surfaces_engine_error() {
        let _guard = switch_guard();
        set_recording_enabled(true);
        let pool = lazy_pool();
        let ctx = ExecutionContext::replay("t-1", Vec::new());

        let err = ctx.scope(pool.ping()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Core(retrace_core::Error::ReplayExhausted { .. })
        ));
        set_recording_enabled(false);
    }

    #[tokio::test]
    async fn test_missing_context_is_reported() {
        let _guard = switch_guard();
        set_recording_enabled(true);
        let pool = lazy_pool();
        let err = pool.ping().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Core(retrace_core::Error::ContextMissing)
        ));
        set_recording_enabled(false);
    }
}
