//! SQL dialect support.
//!
//! A [`Dialect`] is resolved once from a driver name and then used to look
//! up its [`DialectFeatures`] table. Identifier quoting and placeholder
//! rendering live here as well since every compiler needs them.

mod features;

use std::fmt;

pub use features::{AutoIncrement, DialectFeatures, PlaceholderStyle};

use crate::error::{BuildError, Result};

/// The database families this crate generates SQL for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    MySql,
    Postgres,
    Sqlite,
}

impl Dialect {
    /// All supported dialects.
    pub const ALL: [Self; 3] = [Self::MySql, Self::Postgres, Self::Sqlite];

    /// Resolves a driver identifier such as `postgres` or `sqlite3`.
    ///
    /// Matching is case-insensitive. A full connection URL is accepted too;
    /// only its scheme is inspected.
    pub fn from_driver_name(name: &str) -> Result<Self> {
        let scheme = name.split(':').next().unwrap_or(name).trim();
        match scheme.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::MySql),
            "postgres" | "postgresql" | "pgx" | "pg" => Ok(Self::Postgres),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            _ => Err(BuildError::UnknownDialect(name.to_string())),
        }
    }

    /// Returns the capability table for this dialect.
    #[must_use]
    pub const fn features(self) -> &'static DialectFeatures {
        match self {
            Self::MySql => &features::MYSQL,
            Self::Postgres => &features::POSTGRES,
            Self::Sqlite => &features::SQLITE,
        }
    }

    /// Returns the name of the dialect.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.features().name
    }

    /// Quotes an identifier without validating it.
    ///
    /// Each dot-separated segment is quoted on its own and embedded quote
    /// characters are doubled. `*` segments are left alone.
    #[must_use]
    pub fn quote_identifier(self, name: &str) -> String {
        let quote = self.features().identifier_quote;
        let mut out = String::with_capacity(name.len() + 2);
        for (i, segment) in name.split('.').enumerate() {
            if i > 0 {
                out.push('.');
            }
            if segment == "*" {
                out.push('*');
                continue;
            }
            out.push(quote);
            for c in segment.chars() {
                if c == quote {
                    out.push(quote);
                }
                out.push(c);
            }
            out.push(quote);
        }
        out
    }

    /// Validates and quotes an identifier.
    pub fn identifier(self, name: &str) -> Result<String> {
        validate_identifier(name)?;
        Ok(self.quote_identifier(name))
    }

    /// Returns the placeholder for the `index`-th parameter (1-based).
    #[must_use]
    pub fn placeholder(self, index: usize) -> String {
        match self.features().placeholder {
            PlaceholderStyle::Question => String::from("?"),
            PlaceholderStyle::Numbered => format!("${index}"),
        }
    }

    /// Renders a string literal with single quotes doubled.
    #[must_use]
    pub fn quote_literal(self, value: &str) -> String {
        let escaped = value.replace('\'', "''");
        match self {
            // Backslash is an escape character in MySQL string literals.
            Self::MySql => format!("'{}'", escaped.replace('\\', "\\\\")),
            Self::Postgres | Self::Sqlite => format!("'{escaped}'"),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Checks that `name` is a plain or dotted identifier.
///
/// Segments must match `[A-Za-z_][A-Za-z0-9_$]*`; a trailing `*` segment is
/// allowed so `users.*` can be projected.
pub fn validate_identifier(name: &str) -> Result<()> {
    let invalid = || BuildError::InvalidIdentifier(name.to_string());
    if name.is_empty() {
        return Err(invalid());
    }
    let segments: Vec<&str> = name.split('.').collect();
    let last = segments.len() - 1;
    for (i, segment) in segments.iter().enumerate() {
        if *segment == "*" && i == last {
            continue;
        }
        let mut chars = segment.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return Err(invalid()),
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
            return Err(invalid());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_driver_name() {
        assert_eq!(Dialect::from_driver_name("mysql").unwrap(), Dialect::MySql);
        assert_eq!(Dialect::from_driver_name("MariaDB").unwrap(), Dialect::MySql);
        assert_eq!(Dialect::from_driver_name("pgx").unwrap(), Dialect::Postgres);
        assert_eq!(
            Dialect::from_driver_name("postgresql").unwrap(),
            Dialect::Postgres
        );
        assert_eq!(Dialect::from_driver_name("sqlite3").unwrap(), Dialect::Sqlite);
        assert_eq!(
            Dialect::from_driver_name("sqlite::memory:").unwrap(),
            Dialect::Sqlite
        );
    }

    #[test]
    fn test_unknown_driver() {
        let err = Dialect::from_driver_name("oracle").unwrap_err();
        assert_eq!(err, BuildError::UnknownDialect(String::from("oracle")));
        assert!(err.is_validation());
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(Dialect::MySql.quote_identifier("users"), "`users`");
        assert_eq!(Dialect::Postgres.quote_identifier("users"), "\"users\"");
        assert_eq!(
            Dialect::Sqlite.quote_identifier("users.id"),
            "\"users\".\"id\""
        );
        assert_eq!(Dialect::Postgres.quote_identifier("u.*"), "\"u\".*");
        assert_eq!(Dialect::MySql.quote_identifier("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("public.users").is_ok());
        assert!(validate_identifier("users.*").is_ok());
        assert!(validate_identifier("_tmp$1").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1abc").is_err());
        assert!(validate_identifier("name; DROP TABLE users").is_err());
        assert!(validate_identifier("users.").is_err());
        assert!(validate_identifier("*.users").is_err());
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(Dialect::MySql.placeholder(3), "?");
        assert_eq!(Dialect::Sqlite.placeholder(1), "?");
        assert_eq!(Dialect::Postgres.placeholder(3), "$3");
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(Dialect::Postgres.quote_literal("it's"), "'it''s'");
        assert_eq!(Dialect::MySql.quote_literal("a\\b"), "'a\\\\b'");
    }

    #[test]
    fn test_capability_tables() {
        assert!(Dialect::Postgres.features().supports_returning);
        assert!(Dialect::Sqlite.features().supports_returning);
        assert!(!Dialect::MySql.features().supports_returning);
        assert!(Dialect::MySql.features().inline_indexes);
        assert!(!Dialect::Sqlite.features().multi_clause_alter);
        assert_eq!(
            Dialect::Postgres.features().autoincrement,
            AutoIncrement::SerialType
        );
    }
}
