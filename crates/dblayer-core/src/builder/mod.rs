//! Query building and compilation.
//!
//! [`QuerySpec`] accumulates the structure of a query; its `to_*` methods
//! compile it into [`ParameterizedSql`] for one [`Dialect`](crate::Dialect).

mod dml;
mod predicate;
mod query;
mod search;
mod value;
mod writer;

pub use predicate::{Condition, Connector, Filter, Operator, Predicate};
pub use query::{Join, JoinKind, LockMode, OrderDirection, Projection, QuerySpec};
pub use search::{GeoColumn, GeoPoint, GeoSearch, TextSearch};
pub use value::{values_from_json, values_from_map, SqlValue, ToSqlValue, Values};
pub use writer::{ParameterizedSql, SqlWriter};
