//! # dblayer-core
//!
//! Dialect-aware SQL generation for MySQL, PostgreSQL and SQLite.
//!
//! This crate is pure and synchronous. It provides:
//! - A dialect descriptor with one static capability table per database
//! - A predicate builder and a query specification compiled into
//!   parameterized SQL
//! - A schema builder compiled into CREATE / ALTER / DROP / TRUNCATE DDL
//!
//! Nothing here performs I/O; the `dblayer` crate executes what this crate
//! compiles.
//!
//! ## Parameterized queries
//!
//! Values never reach the SQL text. Identifiers are validated and quoted for
//! the target dialect, and placeholders are numbered in emission order:
//!
//! ```rust
//! use dblayer_core::{Dialect, Filter, Operator, QuerySpec};
//!
//! let query = QuerySpec::new("users")
//!     .where_eq("name", "'; DROP TABLE users; --")
//!     .where_op("age", Operator::GtEq, 18);
//!
//! let stmt = query.to_select(Dialect::Postgres).unwrap();
//! assert_eq!(
//!     stmt.sql,
//!     r#"SELECT * FROM "users" WHERE "name" = $1 AND "age" >= $2"#
//! );
//! assert_eq!(stmt.args.len(), 2);
//! ```
//!
//! ## Schema definitions
//!
//! ```rust
//! use dblayer_core::{AddColumns, Dialect, TableBuilder};
//!
//! let mut table = TableBuilder::new("users");
//! table.id();
//! table.string("email", 255).unique();
//! let statements = table.finish().to_sql(Dialect::Postgres).unwrap();
//! assert!(statements[0].contains(r#""id" BIGSERIAL PRIMARY KEY"#));
//! ```

pub mod builder;
pub mod dialect;
pub mod error;
pub mod schema;

pub use builder::{
    Condition, Connector, Filter, GeoColumn, GeoPoint, GeoSearch, Join, JoinKind,
    LockMode, Operator, OrderDirection, ParameterizedSql, Predicate, Projection, QuerySpec,
    SqlValue, SqlWriter, TextSearch, ToSqlValue, Values, values_from_json, values_from_map,
};
pub use dialect::{AutoIncrement, Dialect, DialectFeatures, PlaceholderStyle};
pub use error::{BuildError, Result};
pub use schema::{
    AddColumns, AlterOperation, AlterTable, ColumnBuilder, ColumnDefinition, DataType, Ddl, DefaultValue,
    DropOption, DropOptions, DropTable, ForeignKeyAction, ForeignKeyBuilder,
    ForeignKeyDefinition, IdentityBehavior, IndexDefinition, PendingColumn, TableBuilder,
    TableDefinition, TableOptions, TruncateTable,
};
