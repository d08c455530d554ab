//! The seam between compiled SQL and a database driver.
//!
//! Everything above this module speaks [`ParameterizedSql`]; everything
//! below it speaks a driver. [`Database`](crate::Database) is the sqlx
//! implementation; tests substitute recording executors.

use std::future::Future;

use dblayer_core::{Dialect, ParameterizedSql};

use crate::error::Result;

/// A decoded result row, keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Set by drivers that report generated keys (MySQL, SQLite).
    pub last_insert_id: Option<i64>,
}

/// Runs compiled statements.
///
/// Implementations must accept concurrent calls; a pool satisfies this
/// directly and a transaction serializes internally.
pub trait Executor: Send + Sync {
    /// The driver identifier, e.g. `postgres` or `sqlite`.
    fn driver_name(&self) -> &str;

    /// The dialect to compile for, resolved from [`driver_name`](Self::driver_name).
    fn dialect(&self) -> Result<Dialect> {
        Ok(Dialect::from_driver_name(self.driver_name())?)
    }

    /// Executes a statement that returns no rows.
    fn exec(&self, stmt: &ParameterizedSql) -> impl Future<Output = Result<ExecResult>> + Send;

    /// Executes a query and decodes every row.
    fn query(&self, stmt: &ParameterizedSql) -> impl Future<Output = Result<Vec<Row>>> + Send;

    /// Runs `statements` in order, stopping at the first failure, then
    /// runs `cleanup` whatever happened. Both must share one connection,
    /// since cleanup restores session state set by the statements.
    /// Returns the first error.
    ///
    /// The default suits executors that already pin a single connection.
    fn exec_script(
        &self,
        statements: &[ParameterizedSql],
        cleanup: &[ParameterizedSql],
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            let mut outcome = Ok(());
            for stmt in statements {
                if let Err(err) = self.exec(stmt).await {
                    outcome = Err(err);
                    break;
                }
            }
            for stmt in cleanup {
                match self.exec(stmt).await {
                    Err(err) if outcome.is_ok() => outcome = Err(err),
                    _ => {}
                }
            }
            outcome
        }
    }
}

/// An executor bound to an open transaction.
pub trait TransactionalExecutor: Executor {
    fn commit(&self) -> impl Future<Output = Result<()>> + Send;

    fn rollback(&self) -> impl Future<Output = Result<()>> + Send;
}

/// An executor that can open transactions.
///
/// Transactions do not implement this trait, so nested transactions are
/// rejected at compile time.
pub trait Connection: Executor {
    type Tx: TransactionalExecutor + 'static;

    fn begin(&self) -> impl Future<Output = Result<Self::Tx>> + Send;
}

/// Reads an integer column, accepting numeric strings from drivers that
/// return `BIGINT` or `NUMERIC` as text.
pub(crate) fn column_i64(row: &Row, column: &str) -> Option<i64> {
    match row.get(column)? {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
