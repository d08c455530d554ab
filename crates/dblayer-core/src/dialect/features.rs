//! Static capability tables, one per dialect.

/// How positional parameters are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` for every parameter (MySQL, SQLite).
    Question,
    /// `$1`, `$2`, ... in emission order (PostgreSQL).
    Numbered,
}

/// How auto-increment columns are declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoIncrement {
    /// A keyword appended to the column definition.
    Keyword(&'static str),
    /// The column type itself is replaced (`SERIAL` / `BIGSERIAL`).
    SerialType,
}

/// Everything the compilers need to know about a dialect.
///
/// Compilers consult these flags instead of matching on the dialect, so
/// adding a capability means adding a field here and filling it in three
/// tables.
#[derive(Debug, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct DialectFeatures {
    pub name: &'static str,
    pub identifier_quote: char,
    pub placeholder: PlaceholderStyle,
    pub autoincrement: AutoIncrement,
    /// Literal forms of `true` and `false` in DDL defaults.
    pub boolean_literals: (&'static str, &'static str),
    /// `LIMIT` value to emit when only an offset is requested.
    pub offset_without_limit: Option<&'static str>,
    pub supports_restart_identity: bool,
    pub supports_force: bool,
    pub supports_drop_temporary: bool,
    pub supports_cascade: bool,
    pub supports_restrict: bool,
    pub supports_engine: bool,
    pub supports_charset: bool,
    pub supports_column_comment_inline: bool,
    pub supports_comment_statements: bool,
    pub supports_column_position: bool,
    pub supports_truncate: bool,
    pub truncate_multiple_tables: bool,
    pub multi_clause_alter: bool,
    pub supports_returning: bool,
    pub supports_modify_column: bool,
    pub supports_alter_foreign_key: bool,
    pub supports_row_locks: bool,
    /// Clause for a shared row lock, when row locks are supported.
    pub shared_lock_clause: &'static str,
    pub supports_unsigned: bool,
    pub inline_indexes: bool,
    pub standalone_rename: bool,
}

pub(super) static MYSQL: DialectFeatures = DialectFeatures {
    name: "mysql",
    identifier_quote: '`',
    placeholder: PlaceholderStyle::Question,
    autoincrement: AutoIncrement::Keyword(" AUTO_INCREMENT"),
    boolean_literals: ("1", "0"),
    offset_without_limit: Some("18446744073709551615"),
    supports_restart_identity: false,
    supports_force: true,
    supports_drop_temporary: true,
    supports_cascade: false,
    supports_restrict: false,
    supports_engine: true,
    supports_charset: true,
    supports_column_comment_inline: true,
    supports_comment_statements: false,
    supports_column_position: true,
    supports_truncate: true,
    truncate_multiple_tables: false,
    multi_clause_alter: true,
    supports_returning: false,
    supports_modify_column: true,
    supports_alter_foreign_key: true,
    supports_row_locks: true,
    shared_lock_clause: " LOCK IN SHARE MODE",
    supports_unsigned: true,
    inline_indexes: true,
    standalone_rename: false,
};

pub(super) static POSTGRES: DialectFeatures = DialectFeatures {
    name: "postgres",
    identifier_quote: '"',
    placeholder: PlaceholderStyle::Numbered,
    autoincrement: AutoIncrement::SerialType,
    boolean_literals: ("TRUE", "FALSE"),
    offset_without_limit: None,
    supports_restart_identity: true,
    supports_force: false,
    supports_drop_temporary: false,
    supports_cascade: true,
    supports_restrict: true,
    supports_engine: false,
    supports_charset: false,
    supports_column_comment_inline: false,
    supports_comment_statements: true,
    supports_column_position: false,
    supports_truncate: true,
    truncate_multiple_tables: true,
    multi_clause_alter: true,
    supports_returning: true,
    supports_modify_column: true,
    supports_alter_foreign_key: true,
    supports_row_locks: true,
    shared_lock_clause: " FOR SHARE",
    supports_unsigned: false,
    inline_indexes: false,
    standalone_rename: true,
};

pub(super) static SQLITE: DialectFeatures = DialectFeatures {
    name: "sqlite",
    identifier_quote: '"',
    placeholder: PlaceholderStyle::Question,
    autoincrement: AutoIncrement::Keyword(" AUTOINCREMENT"),
    boolean_literals: ("1", "0"),
    offset_without_limit: Some("-1"),
    supports_restart_identity: false,
    supports_force: false,
    supports_drop_temporary: false,
    supports_cascade: false,
    supports_restrict: false,
    supports_engine: false,
    supports_charset: false,
    supports_column_comment_inline: false,
    supports_comment_statements: false,
    supports_column_position: false,
    supports_truncate: false,
    truncate_multiple_tables: false,
    multi_clause_alter: false,
    supports_returning: true,
    supports_modify_column: false,
    supports_alter_foreign_key: false,
    supports_row_locks: false,
    shared_lock_clause: "",
    supports_unsigned: false,
    inline_indexes: false,
    standalone_rename: false,
};
