//! Query specification and SELECT / COUNT compilation.
//!
//! A [`QuerySpec`] only accumulates structure. Compilation borrows it, so
//! the same spec can be compiled as a data query and as a COUNT query.

use std::str::FromStr;

use super::predicate::{Condition, Connector, Filter, Operator, Predicate};
use super::search::{GeoColumn, GeoPoint, GeoSearch, TextSearch};
use super::value::{SqlValue, ToSqlValue};
use super::writer::{ParameterizedSql, SqlWriter};
use crate::dialect::Dialect;
use crate::error::{BuildError, Result};

/// One entry of the SELECT list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// A column reference, validated and quoted.
    Column(String),
    /// Verbatim SQL such as `COUNT(orders.id) AS order_count`.
    Raw(String),
}

/// Join types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Cross,
}

impl JoinKind {
    const fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => " INNER JOIN ",
            Self::Left => " LEFT JOIN ",
            Self::Right => " RIGHT JOIN ",
            Self::Cross => " CROSS JOIN ",
        }
    }
}

/// A join clause. The condition is raw SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: String,
    pub on: Option<String>,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => " ASC",
            Self::Desc => " DESC",
        }
    }
}

impl FromStr for OrderDirection {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(BuildError::invalid(format!("unknown sort direction '{s}'")))
        }
    }
}

/// Row locking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    ForUpdate,
    Shared,
}

/// Everything a SELECT-shaped query is made of.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    table: String,
    projection: Vec<Projection>,
    distinct: bool,
    joins: Vec<Join>,
    wheres: Predicate,
    group_by: Vec<String>,
    havings: Predicate,
    order_by: Vec<(String, OrderDirection)>,
    limit: Option<u64>,
    offset: Option<u64>,
    lock: Option<LockMode>,
    search: Option<TextSearch>,
    geo: Option<GeoSearch>,
}

impl Filter for QuerySpec {
    fn predicate_mut(&mut self) -> &mut Predicate {
        &mut self.wheres
    }
}

impl QuerySpec {
    /// Creates a spec targeting `table`.
    #[must_use]
    pub fn new(table: &str) -> Self {
        Self {
            table: String::from(table),
            projection: Vec::new(),
            distinct: false,
            joins: Vec::new(),
            wheres: Predicate::new(),
            group_by: Vec::new(),
            havings: Predicate::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            lock: None,
            search: None,
            geo: None,
        }
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub const fn wheres(&self) -> &Predicate {
        &self.wheres
    }

    #[must_use]
    pub const fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    #[must_use]
    pub const fn offset_value(&self) -> Option<u64> {
        self.offset
    }

    /// Adds columns to the projection.
    #[must_use]
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.projection
            .extend(columns.iter().map(|c| Projection::Column(String::from(*c))));
        self
    }

    /// Adds a verbatim projection expression.
    #[must_use]
    pub fn select_raw(mut self, sql: &str) -> Self {
        self.projection.push(Projection::Raw(String::from(sql)));
        self
    }

    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    #[must_use]
    pub fn join_kind(mut self, kind: JoinKind, table: &str, on: Option<&str>) -> Self {
        self.joins.push(Join {
            kind,
            table: String::from(table),
            on: on.map(String::from),
        });
        self
    }

    #[must_use]
    pub fn join(self, table: &str, on: &str) -> Self {
        self.join_kind(JoinKind::Inner, table, Some(on))
    }

    #[must_use]
    pub fn left_join(self, table: &str, on: &str) -> Self {
        self.join_kind(JoinKind::Left, table, Some(on))
    }

    #[must_use]
    pub fn right_join(self, table: &str, on: &str) -> Self {
        self.join_kind(JoinKind::Right, table, Some(on))
    }

    #[must_use]
    pub fn cross_join(self, table: &str) -> Self {
        self.join_kind(JoinKind::Cross, table, None)
    }

    #[must_use]
    pub fn group_by(mut self, columns: &[&str]) -> Self {
        self.group_by.extend(columns.iter().map(|c| String::from(*c)));
        self
    }

    #[must_use]
    pub fn having<T: ToSqlValue>(mut self, column: &str, op: Operator, value: T) -> Self {
        self.havings.push(Connector::And, having_compare(column, op, value));
        self
    }

    #[must_use]
    pub fn or_having<T: ToSqlValue>(mut self, column: &str, op: Operator, value: T) -> Self {
        self.havings.push(Connector::Or, having_compare(column, op, value));
        self
    }

    /// Adds a raw HAVING fragment such as `COUNT(orders.id) > ?`.
    #[must_use]
    pub fn having_raw(mut self, sql: &str, args: Vec<SqlValue>) -> Self {
        self.havings.push(
            Connector::And,
            Condition::Raw {
                sql: String::from(sql),
                args,
            },
        );
        self
    }

    #[must_use]
    pub fn or_having_raw(mut self, sql: &str, args: Vec<SqlValue>) -> Self {
        self.havings.push(
            Connector::Or,
            Condition::Raw {
                sql: String::from(sql),
                args,
            },
        );
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: &str, direction: OrderDirection) -> Self {
        self.order_by.push((String::from(column), direction));
        self
    }

    #[must_use]
    pub fn order_by_asc(self, column: &str) -> Self {
        self.order_by(column, OrderDirection::Asc)
    }

    #[must_use]
    pub fn order_by_desc(self, column: &str) -> Self {
        self.order_by(column, OrderDirection::Desc)
    }

    #[must_use]
    pub const fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    #[must_use]
    pub const fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    #[must_use]
    pub const fn lock_for_update(mut self) -> Self {
        self.lock = Some(LockMode::ForUpdate);
        self
    }

    #[must_use]
    pub const fn shared_lock(mut self) -> Self {
        self.lock = Some(LockMode::Shared);
        self
    }

    /// Full-text search over `columns`; the rank is projected as
    /// `search_rank`.
    #[must_use]
    pub fn search(mut self, columns: &[&str], term: &str) -> Self {
        self.search = Some(TextSearch {
            columns: columns.iter().map(|c| String::from(*c)).collect(),
            term: String::from(term),
        });
        self
    }

    /// Restricts rows to `radius_m` metres around `point`; the distance is
    /// projected as `distance`.
    #[must_use]
    pub fn geo_search(mut self, column: GeoColumn, point: GeoPoint, radius_m: f64) -> Self {
        self.geo = Some(GeoSearch {
            column,
            point,
            radius_m,
        });
        self
    }

    // ========================================================================
    // Compilation
    // ========================================================================

    /// Compiles the full SELECT statement.
    pub fn to_select(&self, dialect: Dialect) -> Result<ParameterizedSql> {
        let mut w = SqlWriter::new(dialect);
        self.write_select(&mut w, true)?;
        Ok(w.finish())
    }

    /// Compiles a `COUNT(*) AS aggregate` query over the same rows.
    ///
    /// Ordering, limit, offset and locking are dropped. Grouped or distinct
    /// queries are counted through a subquery.
    pub fn to_count(&self, dialect: Dialect) -> Result<ParameterizedSql> {
        let mut w = SqlWriter::new(dialect);
        if self.group_by.is_empty() && self.havings.is_empty() && !self.distinct {
            w.push("SELECT COUNT(*) AS aggregate");
            self.write_from_where(&mut w)?;
        } else {
            w.push("SELECT COUNT(*) AS aggregate FROM (");
            self.write_select(&mut w, false)?;
            w.push(") AS aggregate_table");
        }
        Ok(w.finish())
    }

    fn write_select(&self, w: &mut SqlWriter, with_tail: bool) -> Result<()> {
        w.push("SELECT ");
        if self.distinct {
            w.push("DISTINCT ");
        }
        self.write_projection(w)?;
        self.write_from_where(w)?;

        if !self.group_by.is_empty() {
            w.push(" GROUP BY ");
            w.push_identifier_list(&self.group_by)?;
        }
        if !self.havings.is_empty() {
            w.push(" HAVING ");
            self.havings.write(w)?;
        }
        if with_tail {
            self.write_tail(w)?;
        }
        Ok(())
    }

    fn write_projection(&self, w: &mut SqlWriter) -> Result<()> {
        if self.projection.is_empty() {
            w.push("*");
        }
        for (i, item) in self.projection.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            match item {
                Projection::Column(name) => {
                    w.push_identifier(name)?;
                }
                Projection::Raw(sql) => {
                    w.push(sql);
                }
            }
        }
        if let Some(search) = &self.search {
            w.push(", ");
            search.write_rank(w)?;
            w.push(" AS search_rank");
        }
        if let Some(geo) = &self.geo {
            w.push(", ");
            geo.write_distance(w)?;
            w.push(" AS distance");
        }
        Ok(())
    }

    pub(crate) fn write_from_where(&self, w: &mut SqlWriter) -> Result<()> {
        w.push(" FROM ");
        w.push_identifier(&self.table)?;
        for join in &self.joins {
            w.push(join.kind.as_sql());
            w.push_identifier(&join.table)?;
            if let Some(on) = &join.on {
                w.push(" ON ").push(on);
            }
        }
        self.write_where(w)
    }

    /// Writes ` WHERE ...` combining the predicate with search and geo
    /// filters. Writes nothing when there is nothing to filter on.
    /// UPDATE and DELETE compile only the predicate; a row window has no
    /// portable form there, so it is rejected rather than dropped.
    pub(crate) fn ensure_no_window(&self, dialect: Dialect) -> Result<()> {
        if self.limit.is_some() || self.offset.is_some() || !self.order_by.is_empty() {
            return Err(BuildError::Unsupported {
                dialect,
                feature: "LIMIT, OFFSET or ORDER BY on UPDATE and DELETE",
            });
        }
        Ok(())
    }

    pub(crate) fn write_where(&self, w: &mut SqlWriter) -> Result<()> {
        let extra = self.search.is_some() || self.geo.is_some();
        if self.wheres.is_empty() && !extra {
            return Ok(());
        }
        w.push(" WHERE ");
        let mut first = true;
        if !self.wheres.is_empty() {
            let wrap = extra && self.wheres.len() > 1;
            if wrap {
                w.push("(");
            }
            self.wheres.write(w)?;
            if wrap {
                w.push(")");
            }
            first = false;
        }
        if let Some(search) = &self.search {
            if !first {
                w.push(" AND ");
            }
            search.write_filter(w)?;
            first = false;
        }
        if let Some(geo) = &self.geo {
            if !first {
                w.push(" AND ");
            }
            geo.write_distance(w)?;
            w.push(" <= ");
            w.push_arg(SqlValue::Float(geo.radius_m));
        }
        Ok(())
    }

    fn write_tail(&self, w: &mut SqlWriter) -> Result<()> {
        if !self.order_by.is_empty() {
            w.push(" ORDER BY ");
            for (i, (column, direction)) in self.order_by.iter().enumerate() {
                if i > 0 {
                    w.push(", ");
                }
                w.push_identifier(column)?;
                w.push(direction.as_sql());
            }
        }

        let features = w.dialect().features();
        match (self.limit, self.offset) {
            (Some(limit), offset) => {
                w.push(&format!(" LIMIT {limit}"));
                if let Some(offset) = offset {
                    w.push(&format!(" OFFSET {offset}"));
                }
            }
            (None, Some(offset)) => {
                if let Some(max) = features.offset_without_limit {
                    w.push(" LIMIT ").push(max);
                }
                w.push(&format!(" OFFSET {offset}"));
            }
            (None, None) => {}
        }

        match self.lock {
            Some(LockMode::ForUpdate) if features.supports_row_locks => {
                w.push(" FOR UPDATE");
            }
            Some(LockMode::Shared) if features.supports_row_locks => {
                w.push(features.shared_lock_clause);
            }
            _ => {}
        }
        Ok(())
    }
}

fn having_compare<T: ToSqlValue>(column: &str, op: Operator, value: T) -> Condition {
    Condition::Compare {
        column: String::from(column),
        op,
        value: value.to_sql_value(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_all() {
        let stmt = QuerySpec::new("users").to_select(Dialect::MySql).unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM `users`");
        assert!(stmt.args.is_empty());
    }

    #[test]
    fn test_empty_where_omitted() {
        let stmt = QuerySpec::new("users")
            .where_group(|g| g)
            .to_select(Dialect::Postgres)
            .unwrap();
        assert_eq!(stmt.sql, r#"SELECT * FROM "users""#);
    }

    #[test]
    fn test_clause_order() {
        let stmt = QuerySpec::new("users")
            .select_raw("users.*, COUNT(orders.id) AS order_count")
            .left_join("orders", "orders.user_id = users.id")
            .where_eq("users.active", true)
            .group_by(&["users.id"])
            .having_raw("COUNT(orders.id) > ?", vec![SqlValue::Int(5)])
            .order_by("order_count", "DESC".parse().unwrap())
            .limit(10)
            .offset(20)
            .to_select(Dialect::Postgres)
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT users.*, COUNT(orders.id) AS order_count FROM \"users\" \
             LEFT JOIN \"orders\" ON orders.user_id = users.id \
             WHERE \"users\".\"active\" = $1 GROUP BY \"users\".\"id\" \
             HAVING (COUNT(orders.id) > $2) ORDER BY \"order_count\" DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(stmt.args, vec![SqlValue::Bool(true), SqlValue::Int(5)]);
    }

    #[test]
    fn test_offset_without_limit() {
        let spec = QuerySpec::new("t").offset(5);
        assert_eq!(
            spec.to_select(Dialect::Sqlite).unwrap().sql,
            r#"SELECT * FROM "t" LIMIT -1 OFFSET 5"#
        );
        assert_eq!(
            spec.to_select(Dialect::Postgres).unwrap().sql,
            r#"SELECT * FROM "t" OFFSET 5"#
        );
        assert_eq!(
            spec.to_select(Dialect::MySql).unwrap().sql,
            "SELECT * FROM `t` LIMIT 18446744073709551615 OFFSET 5"
        );
    }

    #[test]
    fn test_locks() {
        let spec = QuerySpec::new("accounts").where_eq("id", 1).lock_for_update();
        assert!(spec
            .to_select(Dialect::Postgres)
            .unwrap()
            .sql
            .ends_with(" FOR UPDATE"));
        assert!(!spec.to_select(Dialect::Sqlite).unwrap().sql.contains("FOR"));

        let shared = QuerySpec::new("accounts").shared_lock();
        assert!(shared
            .to_select(Dialect::MySql)
            .unwrap()
            .sql
            .ends_with(" LOCK IN SHARE MODE"));
        assert!(shared
            .to_select(Dialect::Postgres)
            .unwrap()
            .sql
            .ends_with(" FOR SHARE"));
    }

    #[test]
    fn test_count_drops_tail() {
        let spec = QuerySpec::new("users")
            .where_eq("active", true)
            .order_by_desc("id")
            .limit(10)
            .offset(10);
        let stmt = spec.to_count(Dialect::MySql).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT COUNT(*) AS aggregate FROM `users` WHERE `active` = ?"
        );
        assert_eq!(stmt.args.len(), 1);
    }

    #[test]
    fn test_count_grouped_uses_subquery() {
        let stmt = QuerySpec::new("orders")
            .select(&["user_id"])
            .group_by(&["user_id"])
            .to_count(Dialect::Postgres)
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT COUNT(*) AS aggregate FROM (SELECT \"user_id\" FROM \"orders\" \
             GROUP BY \"user_id\") AS aggregate_table"
        );
    }

    #[test]
    fn test_compile_does_not_mutate() {
        let spec = QuerySpec::new("users").where_in("id", vec![1, 2]).limit(5);
        let before = spec.clone();
        let first = spec.to_select(Dialect::Postgres).unwrap();
        let second = spec.to_select(Dialect::Postgres).unwrap();
        assert_eq!(first, second);
        assert_eq!(spec, before);
    }

    #[test]
    fn test_where_wrapped_when_combined_with_search() {
        let stmt = QuerySpec::new("posts")
            .where_eq("status", "published")
            .or_where_eq("status", "featured")
            .search(&["title"], "rust")
            .to_select(Dialect::Sqlite)
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT *, 0 AS search_rank FROM \"posts\" \
             WHERE (\"status\" = ? OR \"status\" = ?) AND (\"title\" LIKE ?)"
        );
        assert_eq!(stmt.args.len(), 3);
    }

    #[test]
    fn test_invalid_order_direction() {
        assert!("sideways".parse::<OrderDirection>().is_err());
    }
}
