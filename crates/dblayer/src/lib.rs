//! # dblayer
//!
//! Executes what `dblayer-core` compiles, against MySQL, PostgreSQL or
//! SQLite.
//!
//! This crate provides:
//! - [`DbLayer`], the handle every query and schema change goes through
//! - [`QueryBuilder`] with `get`, `paginate`, `create`, `update`, `delete`,
//!   `batch_update` and a table-backed operation queue
//! - Transactions with commit-on-success and rollback-on-error or panic
//! - Write hooks, audit records, result caching and query metrics
//! - [`Database`], an sqlx pool for all three dialects
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dblayer::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct User {
//!     name: String,
//!     email: String,
//! }
//!
//! async fn example() -> dblayer::Result<()> {
//!     let db = DbLayer::new(Database::from_config(&DbConfig::from_env()?).await?)?;
//!
//!     db.on("users", EventKind::BeforeCreate, |row| {
//!         match row["email"].as_str() {
//!             Some(email) if email.contains('@') => Ok(()),
//!             _ => Err(String::from("invalid email")),
//!         }
//!     });
//!
//!     db.transaction(|tx| async move {
//!         let user = User {
//!             name: String::from("Ada"),
//!             email: String::from("ada@example.com"),
//!         };
//!         tx.table("users").with_audit(1).create(&user).await?;
//!         Ok(())
//!     })
//!     .await?;
//!
//!     let page = db
//!         .table("users")
//!         .where_like("email", "%@example.com")
//!         .order_by_asc("id")
//!         .paginate::<User>(1, 20)
//!         .await?;
//!     println!("{} of {}", page.data.len(), page.total);
//!     Ok(())
//! }
//! ```

mod audit;
mod cache;
mod config;
mod database;
mod error;
mod events;
mod executor;
mod layer;
mod metrics;
mod pagination;
mod query;
mod queue;
mod transaction;

pub use audit::{audit_table, AuditAction, AuditRecord};
pub use cache::{Cache, CacheError, MemoryCache};
pub use config::DbConfig;
pub use database::{Database, DatabaseTransaction};
pub use error::{Error, Result};
pub use events::{EventKind, Handler, Hooks};
pub use executor::{Connection, ExecResult, Executor, Row, TransactionalExecutor};
pub use layer::{DbLayer, DdlExt};
pub use metrics::{MetricsCollector, QueryKind, QueryObservation, QueryStats, StatsCollector};
pub use pagination::Page;
pub use query::QueryBuilder;
pub use queue::{queue_table, QueueReport, QueueStatus, QueuedOperation};
pub use transaction::{Transaction, TxState};

// Re-export the compiler so callers need one dependency.
pub use dblayer_core;

/// The types most callers need.
pub mod prelude {
    pub use crate::{
        Cache, Connection, Database, DbConfig, DbLayer, DdlExt, EventKind, Executor,
        MemoryCache, Page, QueryBuilder, StatsCollector, TransactionalExecutor,
    };
    pub use dblayer_core::{
        AddColumns, Dialect, Filter, ForeignKeyAction, GeoColumn, GeoPoint, Operator,
        OrderDirection, SqlValue,
    };
}
