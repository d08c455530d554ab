//! sqlx-backed executor for MySQL, PostgreSQL and SQLite.
//!
//! Uses the `Any` driver so one type serves every dialect; the dialect is
//! taken from the URL scheme.

use dblayer_core::{Dialect, ParameterizedSql, SqlValue};
use serde_json::Value;
use sqlx::any::{AnyArguments, AnyPoolOptions, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, AnyPool, Column, Row as _, ValueRef};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::DbConfig;
use crate::error::{Error, Result};
use crate::executor::{Connection, ExecResult, Executor, Row, TransactionalExecutor};

/// A connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: AnyPool,
    driver: String,
}

impl Database {
    /// Connects with default pool options.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with(AnyPoolOptions::new(), url).await
    }

    /// Connects with caller-supplied pool options.
    pub async fn connect_with(options: AnyPoolOptions, url: &str) -> Result<Self> {
        let driver = driver_from_url(url)?;
        sqlx::any::install_default_drivers();
        let pool = options.connect(url).await?;
        debug!(driver = %driver, "connected");
        Ok(Self { pool, driver })
    }

    pub async fn from_config(config: &DbConfig) -> Result<Self> {
        let options = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout());
        Self::connect_with(options, &config.url).await
    }

    #[must_use]
    pub const fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Validates the URL scheme up front so an unknown driver fails before
/// any connection attempt.
fn driver_from_url(url: &str) -> Result<String> {
    let scheme = url.split(':').next().unwrap_or_default().to_ascii_lowercase();
    Dialect::from_driver_name(&scheme)?;
    Ok(scheme)
}

fn bind_args(stmt: &ParameterizedSql) -> Query<'_, Any, AnyArguments<'_>> {
    let mut query = sqlx::query(&stmt.sql);
    for value in &stmt.args {
        query = match value {
            SqlValue::Null => query.bind(Option::<String>::None),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Text(s) => query.bind(s.clone()),
            SqlValue::Blob(b) => query.bind(b.clone()),
        };
    }
    query
}

fn decode_row(row: &AnyRow) -> Result<Row> {
    let mut out = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        out.insert(String::from(column.name()), decode_column(row, index)?);
    }
    Ok(out)
}

/// Decodes one column by probing the types the `Any` driver can carry.
fn decode_column(row: &AnyRow, index: usize) -> Result<Value> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }
    if let Ok(v) = row.try_get::<i64, _>(index) {
        return Ok(Value::from(v));
    }
    if let Ok(v) = row.try_get::<f64, _>(index) {
        return Ok(SqlValue::Float(v).to_json());
    }
    if let Ok(v) = row.try_get::<bool, _>(index) {
        return Ok(Value::Bool(v));
    }
    if let Ok(v) = row.try_get::<String, _>(index) {
        return Ok(Value::String(v));
    }
    let bytes: Vec<u8> = row.try_get(index)?;
    Ok(SqlValue::Blob(bytes).to_json())
}

fn decode_rows(rows: &[AnyRow]) -> Result<Vec<Row>> {
    rows.iter().map(decode_row).collect()
}

impl Executor for Database {
    fn driver_name(&self) -> &str {
        &self.driver
    }

    async fn exec(&self, stmt: &ParameterizedSql) -> Result<ExecResult> {
        let result = bind_args(stmt).execute(&self.pool).await?;
        Ok(ExecResult {
            rows_affected: result.rows_affected(),
            last_insert_id: result.last_insert_id(),
        })
    }

    async fn query(&self, stmt: &ParameterizedSql) -> Result<Vec<Row>> {
        let rows = bind_args(stmt).fetch_all(&self.pool).await?;
        decode_rows(&rows)
    }

    async fn exec_script(
        &self,
        statements: &[ParameterizedSql],
        cleanup: &[ParameterizedSql],
    ) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        let mut outcome = Ok(());
        for stmt in statements {
            if let Err(err) = bind_args(stmt).execute(&mut *conn).await {
                outcome = Err(Error::from(err));
                break;
            }
        }
        for stmt in cleanup {
            if let Err(err) = bind_args(stmt).execute(&mut *conn).await {
                // The session state was not restored; keep this connection
                // out of the pool.
                warn!(sql = %stmt.sql, error = %err, "cleanup failed, closing connection");
                conn.close_on_drop();
                if outcome.is_ok() {
                    outcome = Err(Error::from(err));
                }
            }
        }
        outcome
    }
}

impl Connection for Database {
    type Tx = DatabaseTransaction;

    async fn begin(&self) -> Result<DatabaseTransaction> {
        let tx = self.pool.begin().await?;
        Ok(DatabaseTransaction {
            tx: Mutex::new(Some(tx)),
            driver: self.driver.clone(),
        })
    }
}

/// An open sqlx transaction. Statements are serialized on its single
/// connection.
#[derive(Debug)]
pub struct DatabaseTransaction {
    tx: Mutex<Option<sqlx::Transaction<'static, Any>>>,
    driver: String,
}

impl Executor for DatabaseTransaction {
    fn driver_name(&self) -> &str {
        &self.driver
    }

    async fn exec(&self, stmt: &ParameterizedSql) -> Result<ExecResult> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or(Error::TransactionClosed)?;
        let result = bind_args(stmt).execute(&mut **tx).await?;
        Ok(ExecResult {
            rows_affected: result.rows_affected(),
            last_insert_id: result.last_insert_id(),
        })
    }

    async fn query(&self, stmt: &ParameterizedSql) -> Result<Vec<Row>> {
        let mut guard = self.tx.lock().await;
        let tx = guard.as_mut().ok_or(Error::TransactionClosed)?;
        let rows = bind_args(stmt).fetch_all(&mut **tx).await?;
        decode_rows(&rows)
    }
}

impl TransactionalExecutor for DatabaseTransaction {
    async fn commit(&self) -> Result<()> {
        let tx = self.tx.lock().await.take().ok_or(Error::TransactionClosed)?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        let tx = self.tx.lock().await.take().ok_or(Error::TransactionClosed)?;
        tx.rollback().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_from_url() {
        assert_eq!(driver_from_url("postgres://u@localhost/db").unwrap(), "postgres");
        assert_eq!(driver_from_url("SQLite::memory:").unwrap(), "sqlite");
        assert!(driver_from_url("oracle://x").unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_script_cleanup_runs_after_failure() {
        let db = Database::connect_with(AnyPoolOptions::new().max_connections(1), "sqlite::memory:")
            .await
            .unwrap();
        db.exec(&ParameterizedSql::raw("CREATE TABLE marks (n INTEGER)"))
            .await
            .unwrap();

        let result = db
            .exec_script(
                &[
                    ParameterizedSql::raw("INSERT INTO marks VALUES (1)"),
                    ParameterizedSql::raw("INSERT INTO missing VALUES (2)"),
                    ParameterizedSql::raw("INSERT INTO marks VALUES (3)"),
                ],
                &[ParameterizedSql::raw("INSERT INTO marks VALUES (9)")],
            )
            .await;
        assert!(matches!(result, Err(Error::Execution(_))));

        let rows = db
            .query(&ParameterizedSql::raw("SELECT n FROM marks ORDER BY n"))
            .await
            .unwrap();
        let marks: Vec<i64> = rows.iter().map(|r| r["n"].as_i64().unwrap()).collect();
        assert_eq!(marks, vec![1, 9]);
    }

    #[tokio::test]
    async fn test_decode_types() {
        let db = Database::connect_with(AnyPoolOptions::new().max_connections(1), "sqlite::memory:")
            .await
            .unwrap();
        let rows = db
            .query(&ParameterizedSql::raw(
                "SELECT 1 AS i, 2.5 AS f, 'x' AS s, NULL AS n, X'0102' AS b",
            ))
            .await
            .unwrap();
        let row = &rows[0];
        assert_eq!(row["i"], Value::from(1));
        assert_eq!(row["f"], Value::from(2.5));
        assert_eq!(row["s"], Value::from("x"));
        assert_eq!(row["n"], Value::Null);
        assert_eq!(row["b"], serde_json::json!([1, 2]));
    }
}
