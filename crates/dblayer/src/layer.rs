//! The entry point tying an executor to hooks, caching and metrics.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dblayer_core::{AlterTable, Ddl, Dialect, DropTable, ParameterizedSql, TableBuilder, TruncateTable};
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::audit::audit_table;
use crate::cache::Cache;
use crate::config::DbConfig;
use crate::error::Result;
use crate::events::{EventKind, Hooks};
use crate::executor::{Connection, ExecResult, Executor, Row, TransactionalExecutor};
use crate::metrics::{MetricsCollector, QueryKind, QueryObservation};
use crate::query::QueryBuilder;
use crate::queue::queue_table;
use crate::transaction::Transaction;

const DEFAULT_AUDIT_TABLE: &str = "audit_logs";
const DEFAULT_SLOW_QUERY: Duration = Duration::from_millis(500);

/// A database handle.
///
/// There is no global connection: every [`QueryBuilder`] borrows the
/// `DbLayer` it was created from, and a transactional `DbLayer` routes all
/// of its builders through the transaction.
///
/// ```rust,no_run
/// use dblayer::prelude::*;
///
/// # async fn run() -> dblayer::Result<()> {
/// let db = DbLayer::new(Database::connect("sqlite::memory:").await?)?;
/// db.create_table("users", |t| {
///     t.id();
///     t.string("email", 255).unique();
/// })
/// .await?;
///
/// let id = db
///     .table("users")
///     .create(&serde_json::json!({"email": "ada@example.com"}))
///     .await?;
/// let count = db.table("users").where_eq("id", id).count().await?;
/// assert_eq!(count, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DbLayer<E> {
    executor: E,
    dialect: Dialect,
    hooks: Arc<Hooks>,
    cache: Option<Arc<dyn Cache>>,
    metrics: Option<Arc<dyn MetricsCollector>>,
    audit_table: Arc<str>,
    slow_query: Duration,
}

impl<E: Executor> fmt::Debug for DbLayer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbLayer")
            .field("driver", &self.executor.driver_name())
            .field("dialect", &self.dialect)
            .field("hooks", &self.hooks)
            .field("cache", &self.cache.is_some())
            .field("metrics", &self.metrics.is_some())
            .field("audit_table", &self.audit_table)
            .finish_non_exhaustive()
    }
}

impl<E: Executor> DbLayer<E> {
    /// Wraps `executor`, resolving its dialect once.
    pub fn new(executor: E) -> Result<Self> {
        let dialect = executor.dialect()?;
        Ok(Self {
            executor,
            dialect,
            hooks: Arc::new(Hooks::new()),
            cache: None,
            metrics: None,
            audit_table: Arc::from(DEFAULT_AUDIT_TABLE),
            slow_query: DEFAULT_SLOW_QUERY,
        })
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Collector used by every builder that does not set its own.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_audit_table(mut self, table: &str) -> Result<Self> {
        dblayer_core::dialect::validate_identifier(table)?;
        self.audit_table = Arc::from(table);
        Ok(self)
    }

    #[must_use]
    pub const fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query = threshold;
        self
    }

    /// Applies the runtime settings of `config`.
    pub fn configure(self, config: &DbConfig) -> Result<Self> {
        self.with_slow_query_threshold(config.slow_query_threshold())
            .with_audit_table(&config.audit_table)
    }

    fn with_executor<X>(&self, executor: X) -> DbLayer<X> {
        DbLayer {
            executor,
            dialect: self.dialect,
            hooks: Arc::clone(&self.hooks),
            cache: self.cache.clone(),
            metrics: self.metrics.clone(),
            audit_table: Arc::clone(&self.audit_table),
            slow_query: self.slow_query,
        }
    }

    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    #[must_use]
    pub const fn executor(&self) -> &E {
        &self.executor
    }

    #[must_use]
    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    #[must_use]
    pub fn cache(&self) -> Option<&Arc<dyn Cache>> {
        self.cache.as_ref()
    }

    #[must_use]
    pub fn audit_table_name(&self) -> &str {
        &self.audit_table
    }

    /// Starts a query against `table`.
    #[must_use]
    pub fn table(&self, table: &str) -> QueryBuilder<'_, E> {
        QueryBuilder::new(self, table)
    }

    /// Registers a hook for writes to `table`.
    pub fn on<F>(&self, table: &str, kind: EventKind, handler: F)
    where
        F: Fn(&Value) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.hooks.register(table, kind, Arc::new(handler));
    }

    /// Executes a statement that returns no rows.
    pub async fn raw_exec(&self, stmt: &ParameterizedSql) -> Result<ExecResult> {
        self.run_exec(stmt, None).await
    }

    /// Executes a query and returns the decoded rows.
    pub async fn raw_query(&self, stmt: &ParameterizedSql) -> Result<Vec<Row>> {
        self.run_query(stmt, None).await
    }

    pub(crate) async fn run_exec(
        &self,
        stmt: &ParameterizedSql,
        metrics: Option<&Arc<dyn MetricsCollector>>,
    ) -> Result<ExecResult> {
        debug!(sql = %stmt.sql, args = stmt.args.len(), "executing statement");
        let started = Instant::now();
        let result = self.executor.exec(stmt).await;
        let rows = result.as_ref().map_or(0, |r| r.rows_affected);
        self.observe(stmt, started.elapsed(), rows, result.as_ref().err(), metrics);
        result
    }

    pub(crate) async fn run_query(
        &self,
        stmt: &ParameterizedSql,
        metrics: Option<&Arc<dyn MetricsCollector>>,
    ) -> Result<Vec<Row>> {
        debug!(sql = %stmt.sql, args = stmt.args.len(), "executing query");
        let started = Instant::now();
        let result = self.executor.query(stmt).await;
        let rows = result.as_ref().map_or(0, |r| u64::try_from(r.len()).unwrap_or(u64::MAX));
        self.observe(stmt, started.elapsed(), rows, result.as_ref().err(), metrics);
        result
    }

    fn observe(
        &self,
        stmt: &ParameterizedSql,
        duration: Duration,
        rows: u64,
        error: Option<&crate::Error>,
        metrics: Option<&Arc<dyn MetricsCollector>>,
    ) {
        if let Some(err) = error {
            warn!(sql = %stmt.sql, error = %err, "statement failed");
        }
        if duration > self.slow_query {
            warn!(
                sql = %stmt.sql,
                elapsed_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
                "slow statement"
            );
        }
        if let Some(collector) = metrics.or(self.metrics.as_ref()) {
            collector.observe(&QueryObservation {
                sql: stmt.sql.clone(),
                kind: QueryKind::from_sql(&stmt.sql),
                duration,
                rows,
                error: error.map(ToString::to_string),
            });
        }
    }

    /// Runs every statement of `ddl` in order. A failure leaves earlier
    /// statements applied unless this handle is transactional.
    ///
    /// DDL with cleanup statements runs as one script on a single
    /// connection, and the cleanup runs even when a statement fails.
    pub async fn execute_ddl<D: Ddl + Sync + ?Sized>(&self, ddl: &D) -> Result<()> {
        let statements = ddl.to_statements(self.dialect)?;
        let cleanup = ddl.cleanup_statements(self.dialect);
        if cleanup.is_empty() {
            for sql in statements {
                self.run_exec(&ParameterizedSql::raw(sql), None).await?;
            }
            return Ok(());
        }

        let statements: Vec<ParameterizedSql> =
            statements.into_iter().map(ParameterizedSql::raw).collect();
        let cleanup: Vec<ParameterizedSql> = cleanup.into_iter().map(ParameterizedSql::raw).collect();
        let script = ParameterizedSql::raw(
            statements
                .iter()
                .chain(&cleanup)
                .map(|stmt| stmt.sql.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        );
        debug!(sql = %script.sql, "executing script");
        let started = Instant::now();
        let result = self.executor.exec_script(&statements, &cleanup).await;
        self.observe(&script, started.elapsed(), 0, result.as_ref().err(), None);
        result
    }

    /// Builds a table with `define` and creates it.
    pub async fn create_table<F>(&self, name: &str, define: F) -> Result<()>
    where
        F: FnOnce(&mut TableBuilder),
    {
        let mut table = TableBuilder::new(name);
        define(&mut table);
        let definition = table.finish();
        self.execute_ddl(&definition).await?;
        info!(table = name, "table created");
        Ok(())
    }

    /// Records alterations with `alter` and applies them.
    pub async fn update_table<F>(&self, name: &str, alter: F) -> Result<()>
    where
        F: FnOnce(&mut AlterTable),
    {
        let mut table = AlterTable::new(name);
        alter(&mut table);
        self.execute_ddl(&table).await?;
        info!(table = name, operations = table.operations.len(), "table altered");
        Ok(())
    }

    /// Starts a `DROP TABLE`; run it with [`DdlExt::execute`].
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn drop_table(&self, tables: &[&str]) -> DropTable {
        DropTable::new(tables)
    }

    /// Starts a `TRUNCATE`; run it with [`DdlExt::execute`].
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn truncate_table(&self, tables: &[&str]) -> TruncateTable {
        TruncateTable::new(tables)
    }

    /// Creates the audit table if it does not exist.
    pub async fn ensure_audit_table(&self) -> Result<()> {
        self.execute_ddl(&audit_table(&self.audit_table)).await
    }

    /// Creates a queue table named `name` if it does not exist.
    pub async fn ensure_queue_table(&self, name: &str) -> Result<()> {
        self.execute_ddl(&queue_table(name)).await
    }
}

impl<E: Connection> DbLayer<E> {
    /// Opens a transaction. The returned handle shares this handle's hooks,
    /// cache and metrics.
    pub async fn begin(&self) -> Result<DbLayer<Transaction<E::Tx>>> {
        let tx = self.executor.begin().await?;
        debug!(driver = self.executor.driver_name(), "transaction started");
        Ok(self.with_executor(Transaction::new(tx)))
    }

    /// Runs `f` inside a transaction.
    ///
    /// Commits when `f` returns `Ok`, rolls back when it returns `Err` or
    /// panics. A panic is resumed after the rollback.
    pub async fn transaction<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(DbLayer<Transaction<E::Tx>>) -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        let tx = self.begin().await?;
        let handle = tx.clone();
        match AssertUnwindSafe(f(tx)).catch_unwind().await {
            Ok(Ok(value)) => {
                // The closure may have committed on its own.
                if handle.is_active() {
                    handle.commit().await?;
                }
                Ok(value)
            }
            Ok(Err(err)) => {
                if handle.is_active() {
                    if let Err(rollback_err) = handle.rollback().await {
                        warn!(error = %rollback_err, "rollback failed");
                    }
                }
                Err(err)
            }
            Err(panic) => {
                if handle.is_active() {
                    if let Err(rollback_err) = handle.rollback().await {
                        warn!(error = %rollback_err, "rollback after panic failed");
                    }
                }
                std::panic::resume_unwind(panic)
            }
        }
    }
}

impl<T: TransactionalExecutor> DbLayer<Transaction<T>> {
    pub async fn commit(&self) -> Result<()> {
        self.executor.commit().await
    }

    pub async fn rollback(&self) -> Result<()> {
        self.executor.rollback().await
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.executor.is_active()
    }
}

/// Runs a DDL definition against a [`DbLayer`], compiling it for the
/// layer's dialect.
pub trait DdlExt: Ddl {
    fn execute<E: Executor>(&self, db: &DbLayer<E>) -> impl Future<Output = Result<()>> + Send;
}

impl<D: Ddl + Sync> DdlExt for D {
    async fn execute<E: Executor>(&self, db: &DbLayer<E>) -> Result<()> {
        db.execute_ddl(self).await
    }
}
