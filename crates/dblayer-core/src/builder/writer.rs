//! Statement assembly.
//!
//! [`SqlWriter`] accumulates SQL text and bound arguments for one statement
//! and renders placeholders for the target dialect in emission order.

use std::fmt;

use super::value::SqlValue;
use crate::dialect::{Dialect, PlaceholderStyle};
use crate::error::{BuildError, Result};

/// A compiled statement: SQL text plus its ordered arguments.
///
/// This is the only form handed to an executor. The number of placeholders
/// in `sql` always equals `args.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterizedSql {
    pub sql: String,
    pub args: Vec<SqlValue>,
}

impl ParameterizedSql {
    /// Creates a statement from already-rendered parts.
    #[must_use]
    pub fn new(sql: impl Into<String>, args: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }

    /// Creates a statement without arguments.
    #[must_use]
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }
}

impl fmt::Display for ParameterizedSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Incremental builder for a single statement.
#[derive(Debug)]
pub struct SqlWriter {
    dialect: Dialect,
    sql: String,
    args: Vec<SqlValue>,
}

impl SqlWriter {
    #[must_use]
    pub const fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Appends SQL text verbatim.
    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Appends a validated, quoted identifier.
    pub fn push_identifier(&mut self, name: &str) -> Result<&mut Self> {
        let quoted = self.dialect.identifier(name)?;
        self.sql.push_str(&quoted);
        Ok(self)
    }

    /// Appends a comma-separated list of validated, quoted identifiers.
    pub fn push_identifier_list(&mut self, names: &[String]) -> Result<&mut Self> {
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.push_identifier(name)?;
        }
        Ok(self)
    }

    /// Binds a value and appends its placeholder.
    pub fn push_arg(&mut self, value: SqlValue) -> &mut Self {
        self.args.push(value);
        let placeholder = self.dialect.placeholder(self.args.len());
        self.sql.push_str(&placeholder);
        self
    }

    /// Appends a raw fragment whose `?` markers bind `args` in order.
    ///
    /// Markers inside single-quoted literals, double-quoted or backquoted
    /// identifiers are left alone. The marker count must match `args`.
    pub fn push_fragment(&mut self, fragment: &str, args: &[SqlValue]) -> Result<&mut Self> {
        let markers = count_markers(fragment);
        if markers != args.len() {
            return Err(BuildError::invalid(format!(
                "raw fragment has {markers} placeholder(s) but {} argument(s) were given",
                args.len()
            )));
        }

        let numbered = self.dialect.features().placeholder == PlaceholderStyle::Numbered;
        let mut args = args.iter();
        let mut quote: Option<char> = None;
        for c in fragment.chars() {
            match quote {
                Some(q) => {
                    if c == q {
                        quote = None;
                    }
                    self.sql.push(c);
                }
                None if c == '\'' || c == '"' || c == '`' => {
                    quote = Some(c);
                    self.sql.push(c);
                }
                None if c == '?' => {
                    let Some(value) = args.next() else {
                        return Err(BuildError::Compilation(String::from(
                            "raw fragment placeholder without argument",
                        )));
                    };
                    self.args.push(value.clone());
                    if numbered {
                        let placeholder = self.dialect.placeholder(self.args.len());
                        self.sql.push_str(&placeholder);
                    } else {
                        self.sql.push('?');
                    }
                }
                None => self.sql.push(c),
            }
        }
        Ok(self)
    }

    /// Returns `true` if nothing has been written yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Number of arguments bound so far.
    #[must_use]
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    #[must_use]
    pub fn finish(self) -> ParameterizedSql {
        ParameterizedSql {
            sql: self.sql,
            args: self.args,
        }
    }
}

/// Counts `?` markers outside quoted sections.
fn count_markers(fragment: &str) -> usize {
    let mut quote: Option<char> = None;
    let mut count = 0;
    for c in fragment.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' || c == '`' => quote = Some(c),
            None if c == '?' => count += 1,
            None => {}
        }
    }
    count
}
