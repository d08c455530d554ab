//! INSERT, UPDATE and DELETE compilation.

use super::query::QuerySpec;
use super::value::{SqlValue, Values};
use super::writer::{ParameterizedSql, SqlWriter};
use crate::dialect::Dialect;
use crate::error::{BuildError, Result};

impl QuerySpec {
    /// Compiles an INSERT of one row into the spec's table.
    ///
    /// `returning` names the column to return on dialects with `RETURNING`;
    /// elsewhere it is ignored and the driver's last insert id is used.
    pub fn to_insert(
        &self,
        dialect: Dialect,
        values: &[(String, SqlValue)],
        returning: Option<&str>,
    ) -> Result<ParameterizedSql> {
        let mut w = SqlWriter::new(dialect);
        w.push("INSERT INTO ");
        w.push_identifier(self.table())?;

        if values.is_empty() {
            // MySQL has no DEFAULT VALUES form.
            w.push(match dialect {
                Dialect::MySql => " () VALUES ()",
                Dialect::Postgres | Dialect::Sqlite => " DEFAULT VALUES",
            });
        } else {
            w.push(" (");
            for (i, (column, _)) in values.iter().enumerate() {
                if i > 0 {
                    w.push(", ");
                }
                w.push_identifier(column)?;
            }
            w.push(") VALUES (");
            for (i, (_, value)) in values.iter().enumerate() {
                if i > 0 {
                    w.push(", ");
                }
                w.push_arg(value.clone());
            }
            w.push(")");
        }

        if let Some(column) = returning {
            if dialect.features().supports_returning {
                w.push(" RETURNING ");
                w.push_identifier(column)?;
            }
        }
        Ok(w.finish())
    }

    /// Compiles an UPDATE of the rows matched by the spec's predicate.
    /// Limit, offset and ordering are rejected.
    pub fn to_update(&self, dialect: Dialect, values: &[(String, SqlValue)]) -> Result<ParameterizedSql> {
        if values.is_empty() {
            return Err(BuildError::invalid("UPDATE requires at least one column"));
        }
        self.ensure_no_window(dialect)?;
        let mut w = SqlWriter::new(dialect);
        w.push("UPDATE ");
        w.push_identifier(self.table())?;
        w.push(" SET ");
        for (i, (column, value)) in values.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.push_identifier(column)?;
            w.push(" = ");
            w.push_arg(value.clone());
        }
        self.write_where(&mut w)?;
        Ok(w.finish())
    }

    /// Compiles a DELETE of the rows matched by the spec's predicate.
    /// Limit, offset and ordering are rejected.
    pub fn to_delete(&self, dialect: Dialect) -> Result<ParameterizedSql> {
        self.ensure_no_window(dialect)?;
        let mut w = SqlWriter::new(dialect);
        w.push("DELETE FROM ");
        w.push_identifier(self.table())?;
        self.write_where(&mut w)?;
        Ok(w.finish())
    }

    /// Compiles one multi-row UPDATE keyed on `key`.
    ///
    /// Every non-key column becomes `c = CASE key WHEN ? THEN ? ... ELSE c
    /// END`, listing only the rows that carry `c`. The spec's predicate, if
    /// any, is ANDed to the `key IN (...)` filter.
    pub fn to_batch_update(&self, dialect: Dialect, key: &str, rows: &[Values]) -> Result<ParameterizedSql> {
        if rows.is_empty() {
            return Err(BuildError::invalid("batch update requires at least one row"));
        }
        self.ensure_no_window(dialect)?;

        let mut keys = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            match row.iter().find(|(c, _)| c == key) {
                Some((_, value)) if !value.is_null() => keys.push(value),
                _ => {
                    return Err(BuildError::invalid(format!(
                        "batch update row {i} has no value for key column '{key}'"
                    )))
                }
            }
        }

        let mut columns: Vec<&str> = Vec::new();
        for row in rows {
            for (column, _) in row {
                if column != key && !columns.contains(&column.as_str()) {
                    columns.push(column);
                }
            }
        }
        if columns.is_empty() {
            return Err(BuildError::invalid(
                "batch update rows contain no columns besides the key",
            ));
        }

        let mut w = SqlWriter::new(dialect);
        let quoted_key = dialect.identifier(key)?;
        w.push("UPDATE ");
        w.push_identifier(self.table())?;
        w.push(" SET ");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            let quoted = dialect.identifier(column)?;
            w.push(&quoted).push(" = CASE ").push(&quoted_key);
            for (row, key_value) in rows.iter().zip(&keys) {
                if let Some((_, value)) = row.iter().find(|(c, _)| c == column) {
                    w.push(" WHEN ").push_arg((*key_value).clone());
                    w.push(" THEN ").push_arg(value.clone());
                }
            }
            w.push(" ELSE ").push(&quoted).push(" END");
        }

        w.push(" WHERE ").push(&quoted_key).push(" IN (");
        for (i, key_value) in keys.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.push_arg((*key_value).clone());
        }
        w.push(")");
        if !self.wheres().is_empty() {
            w.push(" AND (");
            self.wheres().write(&mut w)?;
            w.push(")");
        }
        Ok(w.finish())
    }
}
