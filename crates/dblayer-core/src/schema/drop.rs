//! DROP TABLE and TRUNCATE builders.
//!
//! Options a dialect cannot express are accepted and contribute no SQL, so
//! the same request compiles on every dialect.

use crate::dialect::Dialect;
use crate::error::{BuildError, Result};

/// What happens to identity sequences on TRUNCATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityBehavior {
    Restart,
    Continue,
}

/// The individual flags of [`DropOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOption {
    IfExists,
    Cascade,
    Restrict,
    Temporary,
    Concurrent,
    Force,
    RestartIdentity,
    ContinueIdentity,
}

impl DropOption {
    /// The dialects on which this option produces SQL.
    #[must_use]
    pub const fn dialects(self) -> &'static [Dialect] {
        match self {
            Self::IfExists => &Dialect::ALL,
            Self::Temporary | Self::Force => &[Dialect::MySql],
            Self::Cascade | Self::Restrict | Self::RestartIdentity | Self::ContinueIdentity => {
                &[Dialect::Postgres]
            }
            // No dialect has a concurrent DROP TABLE.
            Self::Concurrent => &[],
        }
    }

    /// Returns `true` if the option has an effect on `dialect`.
    #[must_use]
    pub fn applies_to(self, dialect: Dialect) -> bool {
        let features = dialect.features();
        match self {
            Self::IfExists => true,
            Self::Temporary => features.supports_drop_temporary,
            Self::Cascade => features.supports_cascade,
            Self::Restrict => features.supports_restrict,
            Self::Concurrent => false,
            Self::Force => features.supports_force,
            Self::RestartIdentity | Self::ContinueIdentity => features.supports_restart_identity,
        }
    }
}

/// Flags shared by [`DropTable`] and [`TruncateTable`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct DropOptions {
    pub if_exists: bool,
    pub cascade: bool,
    pub restrict: bool,
    pub temporary: bool,
    pub concurrent: bool,
    pub force: bool,
    pub identity: Option<IdentityBehavior>,
}

impl DropOptions {
    /// Returns `true` if `option` is set and has an effect on `dialect`.
    #[must_use]
    pub fn effective(&self, option: DropOption, dialect: Dialect) -> bool {
        let set = match option {
            DropOption::IfExists => self.if_exists,
            DropOption::Cascade => self.cascade,
            // CASCADE wins when both are requested.
            DropOption::Restrict => self.restrict && !self.cascade,
            DropOption::Temporary => self.temporary,
            DropOption::Concurrent => self.concurrent,
            DropOption::Force => self.force,
            DropOption::RestartIdentity => self.identity == Some(IdentityBehavior::Restart),
            DropOption::ContinueIdentity => self.identity == Some(IdentityBehavior::Continue),
        };
        set && option.applies_to(dialect)
    }
}

fn quoted_tables(dialect: Dialect, tables: &[String]) -> Result<Vec<String>> {
    if tables.is_empty() {
        return Err(BuildError::invalid("at least one table is required"));
    }
    tables.iter().map(|t| dialect.identifier(t)).collect()
}

/// `DROP TABLE` over one or more tables.
///
/// ```rust
/// use dblayer_core::{Dialect, DropTable};
///
/// let drop = DropTable::new(&["old_users", "old_posts"]).if_exists().cascade();
/// assert_eq!(
///     drop.to_sql(Dialect::Postgres).unwrap(),
///     r#"DROP TABLE IF EXISTS "old_users", "old_posts" CASCADE"#
/// );
/// assert_eq!(
///     drop.to_sql(Dialect::MySql).unwrap(),
///     "DROP TABLE IF EXISTS `old_users`, `old_posts`"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTable {
    pub tables: Vec<String>,
    pub options: DropOptions,
}

impl DropTable {
    #[must_use]
    pub fn new(tables: &[&str]) -> Self {
        Self {
            tables: tables.iter().map(|t| String::from(*t)).collect(),
            options: DropOptions::default(),
        }
    }

    #[must_use]
    pub const fn if_exists(mut self) -> Self {
        self.options.if_exists = true;
        self
    }

    #[must_use]
    pub const fn cascade(mut self) -> Self {
        self.options.cascade = true;
        self
    }

    #[must_use]
    pub const fn restrict(mut self) -> Self {
        self.options.restrict = true;
        self
    }

    #[must_use]
    pub const fn temporary(mut self) -> Self {
        self.options.temporary = true;
        self
    }

    /// Accepted on every dialect and never emitted: `CONCURRENTLY` exists
    /// for indexes, not tables.
    #[must_use]
    pub const fn concurrent(mut self) -> Self {
        self.options.concurrent = true;
        self
    }

    /// Only [`TruncateTable`] gives `force` a meaning; `DROP TABLE` has no
    /// forced form, so the flag contributes no SQL here.
    #[must_use]
    pub const fn force(mut self) -> Self {
        self.options.force = true;
        self
    }

    pub fn to_sql(&self, dialect: Dialect) -> Result<String> {
        let tables = quoted_tables(dialect, &self.tables)?;
        let on = |option| self.options.effective(option, dialect);

        let mut sql = String::from("DROP ");
        if on(DropOption::Temporary) {
            sql.push_str("TEMPORARY ");
        }
        sql.push_str("TABLE ");
        if on(DropOption::IfExists) {
            sql.push_str("IF EXISTS ");
        }
        sql.push_str(&tables.join(", "));
        if on(DropOption::Cascade) {
            sql.push_str(" CASCADE");
        }
        if on(DropOption::Restrict) {
            sql.push_str(" RESTRICT");
        }
        Ok(sql)
    }
}

/// `TRUNCATE` over one or more tables.
///
/// MySQL truncates one table per statement and implements `force` by
/// disabling foreign key checks around them. SQLite has no TRUNCATE and
/// gets one `DELETE FROM` per table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruncateTable {
    pub tables: Vec<String>,
    pub options: DropOptions,
}

impl TruncateTable {
    #[must_use]
    pub fn new(tables: &[&str]) -> Self {
        Self {
            tables: tables.iter().map(|t| String::from(*t)).collect(),
            options: DropOptions::default(),
        }
    }

    #[must_use]
    pub const fn restart_identity(mut self) -> Self {
        self.options.identity = Some(IdentityBehavior::Restart);
        self
    }

    #[must_use]
    pub const fn continue_identity(mut self) -> Self {
        self.options.identity = Some(IdentityBehavior::Continue);
        self
    }

    #[must_use]
    pub const fn cascade(mut self) -> Self {
        self.options.cascade = true;
        self
    }

    #[must_use]
    pub const fn restrict(mut self) -> Self {
        self.options.restrict = true;
        self
    }

    #[must_use]
    pub const fn force(mut self) -> Self {
        self.options.force = true;
        self
    }

    /// Every statement in execution order, cleanup included.
    pub fn to_sql(&self, dialect: Dialect) -> Result<Vec<String>> {
        let mut statements = self.to_body(dialect)?;
        statements.extend(self.to_cleanup(dialect));
        Ok(statements)
    }

    /// Statements that restore session state changed by the body. They
    /// must run on the body's connection even when the body fails.
    #[must_use]
    pub fn to_cleanup(&self, dialect: Dialect) -> Vec<String> {
        if self.disables_fk_checks(dialect) {
            vec![String::from("SET FOREIGN_KEY_CHECKS = 1")]
        } else {
            Vec::new()
        }
    }

    fn disables_fk_checks(&self, dialect: Dialect) -> bool {
        let features = dialect.features();
        features.supports_truncate
            && !features.truncate_multiple_tables
            && self.options.effective(DropOption::Force, dialect)
    }

    pub(crate) fn to_body(&self, dialect: Dialect) -> Result<Vec<String>> {
        let tables = quoted_tables(dialect, &self.tables)?;
        let features = dialect.features();
        let on = |option| self.options.effective(option, dialect);

        if !features.supports_truncate {
            return Ok(tables
                .iter()
                .map(|t| format!("DELETE FROM {t}"))
                .collect());
        }

        if !features.truncate_multiple_tables {
            let mut statements = Vec::with_capacity(tables.len() + 1);
            if self.disables_fk_checks(dialect) {
                statements.push(String::from("SET FOREIGN_KEY_CHECKS = 0"));
            }
            statements.extend(tables.iter().map(|t| format!("TRUNCATE TABLE {t}")));
            return Ok(statements);
        }

        let mut sql = format!("TRUNCATE TABLE {}", tables.join(", "));
        if on(DropOption::RestartIdentity) {
            sql.push_str(" RESTART IDENTITY");
        }
        if on(DropOption::ContinueIdentity) {
            sql.push_str(" CONTINUE IDENTITY");
        }
        if on(DropOption::Cascade) {
            sql.push_str(" CASCADE");
        }
        if on(DropOption::Restrict) {
            sql.push_str(" RESTRICT");
        }
        Ok(vec![sql])
    }
}
