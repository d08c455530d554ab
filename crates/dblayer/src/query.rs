//! Executable queries bound to a [`DbLayer`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dblayer_core::{
    values_from_json, Condition, Connector, Filter, GeoColumn, GeoPoint, JoinKind, Operator,
    OrderDirection, ParameterizedSql, Predicate, QuerySpec, SqlValue, ToSqlValue, Values,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::audit::{AuditAction, AuditRecord};
use crate::error::{Error, Result};
use crate::events::EventKind;
use crate::executor::{column_i64, Executor, Row};
use crate::layer::DbLayer;
use crate::metrics::MetricsCollector;
use crate::pagination::{page_offset, Page};
use crate::queue::{QueueReport, QueueStatus, QueuedOperation};

/// A query under construction against one table.
///
/// Builders are single-use: every terminal method consumes the builder.
///
/// ```rust,no_run
/// use std::time::Duration;
/// use dblayer::prelude::*;
///
/// # async fn run(db: &DbLayer<Database>) -> dblayer::Result<()> {
/// let active: Vec<serde_json::Value> = db
///     .table("users")
///     .where_eq("status", "active")
///     .order_by_desc("created_at")
///     .remember("users:active", Duration::from_secs(60))
///     .get()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct QueryBuilder<'db, E> {
    db: &'db DbLayer<E>,
    spec: QuerySpec,
    remember: Option<(String, Duration)>,
    metrics: Option<Arc<dyn MetricsCollector>>,
    actor: Option<i64>,
    primary_key: String,
}

impl<E> Filter for QueryBuilder<'_, E> {
    fn predicate_mut(&mut self) -> &mut Predicate {
        self.spec.predicate_mut()
    }
}

impl<E> std::fmt::Debug for QueryBuilder<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("spec", &self.spec)
            .field("remember", &self.remember)
            .field("actor", &self.actor)
            .field("primary_key", &self.primary_key)
            .finish_non_exhaustive()
    }
}

impl<'db, E> QueryBuilder<'db, E> {
    pub(crate) fn new(db: &'db DbLayer<E>, table: &str) -> Self {
        Self {
            db,
            spec: QuerySpec::new(table),
            remember: None,
            metrics: None,
            actor: None,
            primary_key: String::from("id"),
        }
    }

    /// The accumulated query.
    #[must_use]
    pub const fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    fn map_spec(mut self, f: impl FnOnce(QuerySpec) -> QuerySpec) -> Self {
        let spec = std::mem::replace(&mut self.spec, QuerySpec::new(""));
        self.spec = f(spec);
        self
    }

    // ========================================================================
    // Query shape
    // ========================================================================

    #[must_use]
    pub fn select(self, columns: &[&str]) -> Self {
        self.map_spec(|s| s.select(columns))
    }

    #[must_use]
    pub fn select_raw(self, sql: &str) -> Self {
        self.map_spec(|s| s.select_raw(sql))
    }

    #[must_use]
    pub fn distinct(self) -> Self {
        self.map_spec(QuerySpec::distinct)
    }

    #[must_use]
    pub fn join_kind(self, kind: JoinKind, table: &str, on: Option<&str>) -> Self {
        self.map_spec(|s| s.join_kind(kind, table, on))
    }

    #[must_use]
    pub fn join(self, table: &str, on: &str) -> Self {
        self.map_spec(|s| s.join(table, on))
    }

    #[must_use]
    pub fn left_join(self, table: &str, on: &str) -> Self {
        self.map_spec(|s| s.left_join(table, on))
    }

    #[must_use]
    pub fn right_join(self, table: &str, on: &str) -> Self {
        self.map_spec(|s| s.right_join(table, on))
    }

    #[must_use]
    pub fn cross_join(self, table: &str) -> Self {
        self.map_spec(|s| s.cross_join(table))
    }

    #[must_use]
    pub fn group_by(self, columns: &[&str]) -> Self {
        self.map_spec(|s| s.group_by(columns))
    }

    #[must_use]
    pub fn having<T: ToSqlValue>(self, column: &str, op: Operator, value: T) -> Self {
        self.map_spec(|s| s.having(column, op, value))
    }

    #[must_use]
    pub fn or_having<T: ToSqlValue>(self, column: &str, op: Operator, value: T) -> Self {
        self.map_spec(|s| s.or_having(column, op, value))
    }

    #[must_use]
    pub fn having_raw(self, sql: &str, args: Vec<SqlValue>) -> Self {
        self.map_spec(|s| s.having_raw(sql, args))
    }

    #[must_use]
    pub fn or_having_raw(self, sql: &str, args: Vec<SqlValue>) -> Self {
        self.map_spec(|s| s.or_having_raw(sql, args))
    }

    #[must_use]
    pub fn order_by(self, column: &str, direction: OrderDirection) -> Self {
        self.map_spec(|s| s.order_by(column, direction))
    }

    #[must_use]
    pub fn order_by_asc(self, column: &str) -> Self {
        self.map_spec(|s| s.order_by_asc(column))
    }

    #[must_use]
    pub fn order_by_desc(self, column: &str) -> Self {
        self.map_spec(|s| s.order_by_desc(column))
    }

    #[must_use]
    pub fn limit(self, n: u64) -> Self {
        self.map_spec(|s| s.limit(n))
    }

    #[must_use]
    pub fn offset(self, n: u64) -> Self {
        self.map_spec(|s| s.offset(n))
    }

    #[must_use]
    pub fn lock_for_update(self) -> Self {
        self.map_spec(QuerySpec::lock_for_update)
    }

    #[must_use]
    pub fn shared_lock(self) -> Self {
        self.map_spec(QuerySpec::shared_lock)
    }

    #[must_use]
    pub fn search(self, columns: &[&str], term: &str) -> Self {
        self.map_spec(|s| s.search(columns, term))
    }

    #[must_use]
    pub fn geo_search(self, column: GeoColumn, point: GeoPoint, radius_m: f64) -> Self {
        self.map_spec(|s| s.geo_search(column, point, radius_m))
    }

    // ========================================================================
    // Execution options
    // ========================================================================

    /// Caches the rows of [`get`](Self::get) under `key` for `ttl`.
    ///
    /// The key is used as given; the caller is responsible for making it
    /// unique per distinct query. Has no effect without a configured cache.
    #[must_use]
    pub fn remember(mut self, key: &str, ttl: Duration) -> Self {
        self.remember = Some((String::from(key), ttl));
        self
    }

    /// Overrides the layer's metrics collector for this query.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Records an audit entry attributed to `actor_id` for every write.
    #[must_use]
    pub const fn with_audit(mut self, actor_id: i64) -> Self {
        self.actor = Some(actor_id);
        self
    }

    /// Column holding generated ids. Defaults to `id`.
    #[must_use]
    pub fn primary_key(mut self, column: &str) -> Self {
        self.primary_key = String::from(column);
        self
    }
}

impl<E: Executor> QueryBuilder<'_, E> {
    /// Registers a hook on this builder's table. The hook stays registered
    /// on the [`DbLayer`] after the builder is consumed.
    #[must_use]
    pub fn on<F>(self, kind: EventKind, handler: F) -> Self
    where
        F: Fn(&Value) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.db.hooks().register(self.spec.table(), kind, Arc::new(handler));
        self
    }

    /// Compiles the SELECT without executing it.
    pub fn build(&self) -> Result<ParameterizedSql> {
        Ok(self.spec.to_select(self.db.dialect())?)
    }

    fn cached<T: DeserializeOwned>(&self) -> Option<Vec<T>> {
        let (key, _) = self.remember.as_ref()?;
        let cache = self.db.cache()?;
        let Some(cached) = cache.get(key) else {
            debug!(key, "cache miss");
            return None;
        };
        match serde_json::from_value(cached) {
            Ok(rows) => {
                trace!(key, "cache hit");
                Some(rows)
            }
            Err(err) => {
                debug!(key, error = %err, "cached rows did not decode");
                None
            }
        }
    }

    fn store(&self, rows: &Value) {
        let (Some((key, ttl)), Some(cache)) = (self.remember.as_ref(), self.db.cache()) else {
            return;
        };
        if let Err(err) = cache.set(key, rows.clone(), *ttl) {
            warn!(key, error = %err, "cache write failed");
        }
    }

    /// Runs the query and decodes every row into `T`.
    pub async fn get<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        let stmt = self.build()?;
        if let Some(rows) = self.cached() {
            return Ok(rows);
        }
        let rows = self.db.run_query(&stmt, self.metrics.as_ref()).await?;
        let rows = Value::Array(rows.into_iter().map(Value::Object).collect());
        self.store(&rows);
        Ok(serde_json::from_value(rows)?)
    }

    /// Runs the query and returns the rows as JSON maps.
    pub async fn get_rows(self) -> Result<Vec<Row>> {
        self.get().await
    }

    /// Runs the query with `LIMIT 1`.
    pub async fn first<T: DeserializeOwned>(self) -> Result<Option<T>> {
        let rows: Vec<T> = self.limit(1).get().await?;
        Ok(rows.into_iter().next())
    }

    /// Counts the matching rows.
    pub async fn count(self) -> Result<u64> {
        let stmt = self.spec.to_count(self.db.dialect())?;
        let rows = self.db.run_query(&stmt, self.metrics.as_ref()).await?;
        aggregate(&rows)
    }

    /// Returns page `page` (starting at 1) of `per_page` rows.
    pub async fn paginate<T: DeserializeOwned>(self, page: u64, per_page: u64) -> Result<Page<T>> {
        let offset = page_offset(page, per_page)?;
        let dialect = self.db.dialect();
        let count = self.spec.to_count(dialect)?;
        let data = self
            .spec
            .clone()
            .limit(per_page)
            .offset(offset)
            .to_select(dialect)?;

        let total = aggregate(&self.db.run_query(&count, self.metrics.as_ref()).await?)?;
        let rows = self.db.run_query(&data, self.metrics.as_ref()).await?;
        Ok(Page::new(total, per_page, page, decode_rows(rows)?))
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Runs an INSERT and returns the generated key. Uses `RETURNING` where
    /// the dialect has it and the driver's last insert id elsewhere.
    async fn insert(&self, table: &str, values: &Values, key: &str) -> Result<i64> {
        let dialect = self.db.dialect();
        let stmt = QuerySpec::new(table).to_insert(dialect, values, Some(key))?;
        if dialect.features().supports_returning {
            let rows = self.db.run_query(&stmt, self.metrics.as_ref()).await?;
            rows.first()
                .and_then(|row| column_i64(row, key))
                .ok_or_else(|| Error::Driver(format!("INSERT into '{table}' returned no '{key}'")))
        } else {
            let result = self.db.run_exec(&stmt, self.metrics.as_ref()).await?;
            result.last_insert_id.ok_or_else(|| {
                Error::Driver(format!("INSERT into '{table}' reported no insert id"))
            })
        }
    }

    async fn audit(&self, record: AuditRecord) -> Result<()> {
        let stmt = QuerySpec::new(self.db.audit_table_name())
            .to_insert(self.db.dialect(), &record.values(), None)?;
        self.db.run_exec(&stmt, self.metrics.as_ref()).await?;
        Ok(())
    }

    /// Reads the rows a write is about to change, for the audit trail.
    async fn snapshot(&self) -> Result<Vec<Row>> {
        if self.actor.is_none() {
            return Ok(Vec::new());
        }
        let stmt = self.spec.to_select(self.db.dialect())?;
        self.db.run_query(&stmt, self.metrics.as_ref()).await
    }

    async fn audit_rows(&self, action: AuditAction, previous: Vec<Row>, new_values: Option<&Value>) -> Result<()> {
        let Some(actor) = self.actor else {
            return Ok(());
        };
        for row in previous {
            let mut record = AuditRecord::new(self.spec.table(), action, actor);
            record.record_id = column_i64(&row, &self.primary_key);
            record.old_values = Some(Value::Object(row));
            record.new_values = new_values.cloned();
            self.audit(record).await?;
        }
        Ok(())
    }

    /// Inserts `row` and returns its id.
    ///
    /// `BeforeCreate` hooks run first and any failure aborts the insert.
    /// An `AfterCreate` failure is returned but the row stays inserted.
    pub async fn create<V: Serialize + Sync>(self, row: &V) -> Result<i64> {
        let payload = serde_json::to_value(row)?;
        let values = values_from_json(&payload)?;
        let table = self.spec.table();
        let hooks = self.db.hooks();

        hooks.run(table, EventKind::BeforeCreate, &payload)?;
        let id = self.insert(table, &values, &self.primary_key).await?;
        debug!(table, id, "row created");

        if let Some(actor) = self.actor {
            let mut record = AuditRecord::new(table, AuditAction::Create, actor);
            record.record_id = Some(id);
            record.new_values = Some(payload.clone());
            self.audit(record).await?;
        }

        let mut created = payload;
        if let Value::Object(map) = &mut created {
            map.insert(self.primary_key.clone(), Value::from(id));
        }
        hooks.run(table, EventKind::AfterCreate, &created)?;
        Ok(id)
    }

    /// Updates the matching rows and returns the number affected.
    pub async fn update<V: Serialize + Sync>(self, values: &V) -> Result<u64> {
        let payload = serde_json::to_value(values)?;
        let values = values_from_json(&payload)?;
        let table = self.spec.table();
        let stmt = self.spec.to_update(self.db.dialect(), &values)?;
        let hooks = self.db.hooks();

        hooks.run(table, EventKind::BeforeUpdate, &payload)?;
        let previous = self.snapshot().await?;
        let result = self.db.run_exec(&stmt, self.metrics.as_ref()).await?;
        debug!(table, rows = result.rows_affected, "rows updated");
        self.audit_rows(AuditAction::Update, previous, Some(&payload)).await?;
        hooks.run(table, EventKind::AfterUpdate, &payload)?;
        Ok(result.rows_affected)
    }

    /// Deletes the matching rows and returns the number affected.
    pub async fn delete(self) -> Result<u64> {
        let table = self.spec.table();
        let stmt = self.spec.to_delete(self.db.dialect())?;
        let hooks = self.db.hooks();

        hooks.run(table, EventKind::BeforeDelete, &Value::Null)?;
        let previous = self.snapshot().await?;
        let result = self.db.run_exec(&stmt, self.metrics.as_ref()).await?;
        debug!(table, rows = result.rows_affected, "rows deleted");
        self.audit_rows(AuditAction::Delete, previous, None).await?;
        hooks.run(table, EventKind::AfterDelete, &Value::Null)?;
        Ok(result.rows_affected)
    }

    /// Updates many rows keyed on `key`, `batch_size` rows per statement.
    ///
    /// Chunks run in order. A failing chunk stops the run; earlier chunks
    /// stay applied unless the builder belongs to a transaction.
    pub async fn batch_update<V: Serialize + Sync>(self, rows: &[V], key: &str, batch_size: usize) -> Result<u64> {
        if batch_size == 0 {
            return Err(Error::invalid("batch size must be at least 1"));
        }
        let dialect = self.db.dialect();
        let mut affected = 0;
        for (i, chunk) in rows.chunks(batch_size).enumerate() {
            let values = chunk
                .iter()
                .map(|row| -> Result<Values> { Ok(values_from_json(&serde_json::to_value(row)?)?) })
                .collect::<Result<Vec<_>>>()?;
            let stmt = self.spec.to_batch_update(dialect, key, &values)?;
            let result = self.db.run_exec(&stmt, self.metrics.as_ref()).await?;
            debug!(table = self.spec.table(), chunk = i, rows = result.rows_affected, "batch applied");
            affected += result.rows_affected;
        }
        Ok(affected)
    }

    // ========================================================================
    // Queue
    // ========================================================================

    /// Stores `operation` with `payload` in this builder's table, to be run
    /// by [`process_queue`](Self::process_queue) once `run_at` has passed.
    pub async fn queue<P: Serialize + Sync>(self, operation: &str, payload: &P, run_at: DateTime<Utc>) -> Result<i64> {
        let payload = serde_json::to_value(payload)?;
        let values = QueuedOperation::insert_values(operation, &payload, run_at);
        let id = self.insert(self.spec.table(), &values, "id").await?;
        debug!(table = self.spec.table(), id, operation, "operation queued");
        Ok(id)
    }

    /// Runs every due pending operation through `handler`, oldest first.
    ///
    /// Each operation is marked `completed` or `failed` as soon as its
    /// handler returns; a failure stores the handler's message and does not
    /// stop the run. Conditions and limits on the builder narrow the batch.
    pub async fn process_queue<F, Fut>(self, mut handler: F) -> Result<QueueReport>
    where
        F: FnMut(QueuedOperation) -> Fut + Send,
        Fut: Future<Output = std::result::Result<(), String>> + Send,
    {
        let dialect = self.db.dialect();
        let table = self.spec.table();
        // The caller's filters are grouped so an OR among them cannot
        // reach past the pending/due conditions.
        let mut due = self.spec.clone();
        let scope = std::mem::take(due.predicate_mut());
        due.predicate_mut().push(Connector::And, Condition::Group(scope));
        let due = due
            .where_eq("status", QueueStatus::Pending.as_str())
            .where_op("run_at", Operator::LtEq, Utc::now().timestamp())
            .order_by_asc("run_at")
            .order_by_asc("id")
            .to_select(dialect)?;

        let rows = self.db.run_query(&due, self.metrics.as_ref()).await?;
        let mut report = QueueReport::default();
        for row in &rows {
            let operation = QueuedOperation::from_row(row)?;
            let id = operation.id;
            let attempts = operation.attempts + 1;
            let (status, last_error) = match handler(operation).await {
                Ok(()) => (QueueStatus::Completed, SqlValue::Null),
                Err(message) => {
                    warn!(table, id, attempts, error = %message, "queued operation failed");
                    (QueueStatus::Failed, SqlValue::Text(message))
                }
            };

            let values = vec![
                (String::from("status"), SqlValue::Text(String::from(status.as_str()))),
                (String::from("attempts"), SqlValue::Int(attempts)),
                (String::from("last_error"), last_error),
                (String::from("processed_at"), SqlValue::Int(Utc::now().timestamp())),
            ];
            let stmt = QuerySpec::new(table).where_eq("id", id).to_update(dialect, &values)?;
            self.db.run_exec(&stmt, self.metrics.as_ref()).await?;

            report.processed += 1;
            match status {
                QueueStatus::Completed => report.completed += 1,
                _ => report.failed += 1,
            }
        }
        info!(
            table,
            processed = report.processed,
            failed = report.failed,
            "queue processed"
        );
        Ok(report)
    }
}

/// Reads the `aggregate` column of a COUNT query.
fn aggregate(rows: &[Row]) -> Result<u64> {
    let count = rows
        .first()
        .and_then(|row| column_i64(row, "aggregate"))
        .ok_or_else(|| Error::Driver(String::from("COUNT query returned no aggregate")))?;
    u64::try_from(count).map_err(|_| Error::Driver(format!("negative count {count}")))
}

fn decode_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(Value::Object(row)).map_err(Error::from))
        .collect()
}
