//! Transaction state tracking.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use dblayer_core::ParameterizedSql;
use tracing::debug;

use crate::error::{Error, Result};
use crate::executor::{ExecResult, Executor, Row, TransactionalExecutor};

/// Lifecycle of a [`Transaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Active,
    Committed,
    RolledBack,
}

const ACTIVE: u8 = 0;
const COMMITTED: u8 = 1;
const ROLLED_BACK: u8 = 2;

struct Inner<T> {
    tx: T,
    state: AtomicU8,
}

/// A shareable handle to an open transaction.
///
/// Clones refer to the same transaction. Once it is committed or rolled
/// back, every further statement fails with [`Error::TransactionClosed`].
pub struct Transaction<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Transaction<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for Transaction<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<T> Transaction<T> {
    #[must_use]
    pub fn new(tx: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                tx,
                state: AtomicU8::new(ACTIVE),
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> TxState {
        match self.inner.state.load(Ordering::Acquire) {
            ACTIVE => TxState::Active,
            COMMITTED => TxState::Committed,
            _ => TxState::RolledBack,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state() == TxState::Active
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(Error::TransactionClosed)
        }
    }

    /// Moves from `Active` to `to`; only one caller can win.
    fn close(&self, to: u8) -> Result<()> {
        self.inner
            .state
            .compare_exchange(ACTIVE, to, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| Error::TransactionClosed)
    }
}

impl<T: TransactionalExecutor> Executor for Transaction<T> {
    fn driver_name(&self) -> &str {
        self.inner.tx.driver_name()
    }

    async fn exec(&self, stmt: &ParameterizedSql) -> Result<ExecResult> {
        self.ensure_active()?;
        self.inner.tx.exec(stmt).await
    }

    async fn query(&self, stmt: &ParameterizedSql) -> Result<Vec<Row>> {
        self.ensure_active()?;
        self.inner.tx.query(stmt).await
    }
}

impl<T: TransactionalExecutor> TransactionalExecutor for Transaction<T> {
    async fn commit(&self) -> Result<()> {
        self.close(COMMITTED)?;
        debug!("transaction committed");
        self.inner.tx.commit().await
    }

    async fn rollback(&self) -> Result<()> {
        self.close(ROLLED_BACK)?;
        debug!("transaction rolled back");
        self.inner.tx.rollback().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        statements: AtomicUsize,
        commits: AtomicUsize,
        rollbacks: AtomicUsize,
    }

    impl Executor for Recorder {
        fn driver_name(&self) -> &str {
            "sqlite"
        }

        async fn exec(&self, _stmt: &ParameterizedSql) -> Result<ExecResult> {
            self.statements.fetch_add(1, Ordering::SeqCst);
            Ok(ExecResult::default())
        }

        async fn query(&self, _stmt: &ParameterizedSql) -> Result<Vec<Row>> {
            self.statements.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    impl TransactionalExecutor for Recorder {
        async fn commit(&self) -> Result<()> {
            self.commits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn rollback(&self) -> Result<()> {
            self.rollbacks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_statements_after_commit_fail() {
        let tx = Transaction::new(Recorder::default());
        tx.exec(&ParameterizedSql::raw("SELECT 1")).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(tx.state(), TxState::Committed);

        assert!(matches!(
            tx.exec(&ParameterizedSql::raw("SELECT 1")).await,
            Err(Error::TransactionClosed)
        ));
        assert!(matches!(tx.rollback().await, Err(Error::TransactionClosed)));
        assert_eq!(tx.inner.tx.statements.load(Ordering::SeqCst), 1);
        assert_eq!(tx.inner.tx.rollbacks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let tx = Transaction::new(Recorder::default());
        let other = tx.clone();
        other.rollback().await.unwrap();
        assert_eq!(tx.state(), TxState::RolledBack);
        assert!(matches!(tx.commit().await, Err(Error::TransactionClosed)));
        assert_eq!(tx.inner.tx.commits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_debug_shows_state() {
        let tx = Transaction::new(Recorder::default());
        assert_eq!(format!("{tx:?}"), "Transaction { state: Active, .. }");
        tx.commit().await.unwrap();
        assert_eq!(format!("{tx:?}"), "Transaction { state: Committed, .. }");
    }
}
