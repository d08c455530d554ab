//! Predicate builder.
//!
//! A [`Predicate`] is an ordered list of conditions, each joined to the
//! previous one by a [`Connector`]. Groups nest a whole predicate inside
//! parentheses. The [`Filter`] trait gives every builder that owns a
//! predicate the same `where_*` / `or_where_*` vocabulary.

use std::fmt;
use std::str::FromStr;

use super::value::{SqlValue, ToSqlValue};
use super::writer::{ParameterizedSql, SqlWriter};
use crate::dialect::Dialect;
use crate::error::{BuildError, Result};

/// Binary comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    NotLike,
}

impl Operator {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
        }
    }
}

impl FromStr for Operator {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "=" | "==" => Ok(Self::Eq),
            "!=" | "<>" => Ok(Self::NotEq),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::LtEq),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::GtEq),
            "LIKE" => Ok(Self::Like),
            "NOT LIKE" => Ok(Self::NotLike),
            other => Err(BuildError::invalid(format!("unknown operator '{other}'"))),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// How a condition attaches to the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

impl Connector {
    const fn as_sql(self) -> &'static str {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

/// A single predicate node.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        column: String,
        op: Operator,
        value: SqlValue,
    },
    In {
        column: String,
        values: Vec<SqlValue>,
        negated: bool,
    },
    Between {
        column: String,
        low: SqlValue,
        high: SqlValue,
        negated: bool,
    },
    Null {
        column: String,
        negated: bool,
    },
    /// Verbatim SQL; `?` markers bind `args` in order.
    Raw { sql: String, args: Vec<SqlValue> },
    Group(Predicate),
}

impl Condition {
    fn write(&self, w: &mut SqlWriter) -> Result<()> {
        match self {
            // `= NULL` never matches; compare against NULL with IS.
            Self::Compare {
                column,
                op: op @ (Operator::Eq | Operator::NotEq),
                value: SqlValue::Null,
            } => {
                w.push_identifier(column)?;
                w.push(if *op == Operator::Eq {
                    " IS NULL"
                } else {
                    " IS NOT NULL"
                });
            }
            Self::Compare { column, op, value } => {
                w.push_identifier(column)?;
                w.push(" ").push(op.as_sql()).push(" ");
                w.push_arg(value.clone());
            }
            Self::In {
                column,
                values,
                negated,
            } => {
                if values.is_empty() {
                    return Err(BuildError::EmptyInList(column.clone()));
                }
                w.push_identifier(column)?;
                w.push(if *negated { " NOT IN (" } else { " IN (" });
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        w.push(", ");
                    }
                    w.push_arg(value.clone());
                }
                w.push(")");
            }
            Self::Between {
                column,
                low,
                high,
                negated,
            } => {
                w.push_identifier(column)?;
                w.push(if *negated {
                    " NOT BETWEEN "
                } else {
                    " BETWEEN "
                });
                w.push_arg(low.clone()).push(" AND ").push_arg(high.clone());
            }
            Self::Null { column, negated } => {
                w.push_identifier(column)?;
                w.push(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            // Parenthesized so an OR inside the fragment stays local.
            Self::Raw { sql, args } => {
                w.push("(");
                w.push_fragment(sql, args)?;
                w.push(")");
            }
            Self::Group(inner) => {
                w.push("(");
                inner.write(w)?;
                w.push(")");
            }
        }
        Ok(())
    }

    fn is_blank(&self) -> bool {
        matches!(self, Self::Group(inner) if inner.is_empty())
    }
}

/// An ordered tree of conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    items: Vec<(Connector, Condition)>,
}

impl Predicate {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Appends a condition. The connector of the first emitted condition is
    /// ignored.
    pub fn push(&mut self, connector: Connector, condition: Condition) -> &mut Self {
        self.items.push((connector, condition));
        self
    }

    /// Returns `true` if the predicate contributes no SQL.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.iter().all(|(_, c)| c.is_blank())
    }

    /// Number of conditions at the top level, empty groups excluded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.iter().filter(|(_, c)| !c.is_blank()).count()
    }

    pub fn conditions(&self) -> impl Iterator<Item = &(Connector, Condition)> {
        self.items.iter()
    }

    /// Writes the predicate without a leading keyword.
    pub fn write(&self, w: &mut SqlWriter) -> Result<()> {
        let mut first = true;
        for (connector, condition) in &self.items {
            if condition.is_blank() {
                continue;
            }
            if !first {
                w.push(connector.as_sql());
            }
            first = false;
            condition.write(w)?;
        }
        Ok(())
    }

    /// Compiles the predicate on its own, for embedding or inspection.
    pub fn to_sql(&self, dialect: Dialect) -> Result<ParameterizedSql> {
        let mut w = SqlWriter::new(dialect);
        self.write(&mut w)?;
        Ok(w.finish())
    }
}

// ============================================================================
// Fluent filtering
// ============================================================================

/// Fluent `where_*` methods for anything that owns a [`Predicate`].
///
/// Each method consumes and returns the builder so calls chain.
pub trait Filter: Sized {
    /// The predicate the methods append to.
    fn predicate_mut(&mut self) -> &mut Predicate;

    #[must_use]
    fn filter(mut self, connector: Connector, condition: Condition) -> Self {
        self.predicate_mut().push(connector, condition);
        self
    }

    #[must_use]
    fn where_eq<T: ToSqlValue>(self, column: &str, value: T) -> Self {
        self.where_op(column, Operator::Eq, value)
    }

    #[must_use]
    fn where_op<T: ToSqlValue>(self, column: &str, op: Operator, value: T) -> Self {
        self.filter(Connector::And, compare(column, op, value))
    }

    #[must_use]
    fn where_in<T, I>(self, column: &str, values: I) -> Self
    where
        T: ToSqlValue,
        I: IntoIterator<Item = T>,
    {
        self.filter(Connector::And, in_list(column, values, false))
    }

    #[must_use]
    fn where_not_in<T, I>(self, column: &str, values: I) -> Self
    where
        T: ToSqlValue,
        I: IntoIterator<Item = T>,
    {
        self.filter(Connector::And, in_list(column, values, true))
    }

    #[must_use]
    fn where_between<T: ToSqlValue, U: ToSqlValue>(self, column: &str, low: T, high: U) -> Self {
        self.filter(Connector::And, between(column, low, high, false))
    }

    #[must_use]
    fn where_not_between<T: ToSqlValue, U: ToSqlValue>(
        self,
        column: &str,
        low: T,
        high: U,
    ) -> Self {
        self.filter(Connector::And, between(column, low, high, true))
    }

    #[must_use]
    fn where_null(self, column: &str) -> Self {
        self.filter(Connector::And, null(column, false))
    }

    #[must_use]
    fn where_not_null(self, column: &str) -> Self {
        self.filter(Connector::And, null(column, true))
    }

    #[must_use]
    fn where_like<T: ToSqlValue>(self, column: &str, pattern: T) -> Self {
        self.where_op(column, Operator::Like, pattern)
    }

    #[must_use]
    fn where_raw(self, sql: &str, args: Vec<SqlValue>) -> Self {
        self.filter(Connector::And, raw(sql, args))
    }

    /// Adds a parenthesized group built by `f`.
    #[must_use]
    fn where_group(self, f: impl FnOnce(Predicate) -> Predicate) -> Self {
        self.filter(Connector::And, Condition::Group(f(Predicate::new())))
    }

    #[must_use]
    fn or_where_eq<T: ToSqlValue>(self, column: &str, value: T) -> Self {
        self.or_where_op(column, Operator::Eq, value)
    }

    #[must_use]
    fn or_where_op<T: ToSqlValue>(self, column: &str, op: Operator, value: T) -> Self {
        self.filter(Connector::Or, compare(column, op, value))
    }

    #[must_use]
    fn or_where_in<T, I>(self, column: &str, values: I) -> Self
    where
        T: ToSqlValue,
        I: IntoIterator<Item = T>,
    {
        self.filter(Connector::Or, in_list(column, values, false))
    }

    #[must_use]
    fn or_where_not_in<T, I>(self, column: &str, values: I) -> Self
    where
        T: ToSqlValue,
        I: IntoIterator<Item = T>,
    {
        self.filter(Connector::Or, in_list(column, values, true))
    }

    #[must_use]
    fn or_where_between<T: ToSqlValue, U: ToSqlValue>(
        self,
        column: &str,
        low: T,
        high: U,
    ) -> Self {
        self.filter(Connector::Or, between(column, low, high, false))
    }

    #[must_use]
    fn or_where_null(self, column: &str) -> Self {
        self.filter(Connector::Or, null(column, false))
    }

    #[must_use]
    fn or_where_not_null(self, column: &str) -> Self {
        self.filter(Connector::Or, null(column, true))
    }

    #[must_use]
    fn or_where_like<T: ToSqlValue>(self, column: &str, pattern: T) -> Self {
        self.or_where_op(column, Operator::Like, pattern)
    }

    #[must_use]
    fn or_where_raw(self, sql: &str, args: Vec<SqlValue>) -> Self {
        self.filter(Connector::Or, raw(sql, args))
    }

    #[must_use]
    fn or_where_group(self, f: impl FnOnce(Predicate) -> Predicate) -> Self {
        self.filter(Connector::Or, Condition::Group(f(Predicate::new())))
    }
}

impl Filter for Predicate {
    fn predicate_mut(&mut self) -> &mut Predicate {
        self
    }
}

fn compare<T: ToSqlValue>(column: &str, op: Operator, value: T) -> Condition {
    Condition::Compare {
        column: String::from(column),
        op,
        value: value.to_sql_value(),
    }
}

fn in_list<T, I>(column: &str, values: I, negated: bool) -> Condition
where
    T: ToSqlValue,
    I: IntoIterator<Item = T>,
{
    Condition::In {
        column: String::from(column),
        values: values.into_iter().map(ToSqlValue::to_sql_value).collect(),
        negated,
    }
}

fn between<T: ToSqlValue, U: ToSqlValue>(column: &str, low: T, high: U, negated: bool) -> Condition {
    Condition::Between {
        column: String::from(column),
        low: low.to_sql_value(),
        high: high.to_sql_value(),
        negated,
    }
}

fn null(column: &str, negated: bool) -> Condition {
    Condition::Null {
        column: String::from(column),
        negated,
    }
}

fn raw(sql: &str, args: Vec<SqlValue>) -> Condition {
    Condition::Raw {
        sql: String::from(sql),
        args,
    }
}
