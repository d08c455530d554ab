//! DDL compilation.
//!
//! Type mapping is the one place that matches on the dialect directly;
//! everything else consults the dialect's capability table.

use super::alter::{AlterOperation, AlterTable};
use super::column::{ColumnDefinition, DefaultValue};
use super::table::{ForeignKeyDefinition, IndexDefinition, TableDefinition};
use super::types::DataType;
use crate::builder::SqlValue;
use crate::dialect::{AutoIncrement, Dialect};
use crate::error::{BuildError, Result};

/// Checks an engine, charset or collation name. These are spliced into the
/// statement unquoted, so only `[A-Za-z0-9_]` is accepted.
fn option_word<'a>(kind: &str, value: &'a str) -> Result<&'a str> {
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(value)
    } else {
        Err(BuildError::invalid(format!("invalid {kind} name: {value:?}")))
    }
}

/// Maps a [`DataType`] to the dialect's type name.
#[must_use]
pub fn map_data_type(dialect: Dialect, data_type: &DataType) -> String {
    match dialect {
        Dialect::MySql => match data_type {
            DataType::Smallint => String::from("SMALLINT"),
            DataType::Integer => String::from("INT"),
            DataType::Bigint => String::from("BIGINT"),
            DataType::Real => String::from("FLOAT"),
            DataType::Double => String::from("DOUBLE"),
            DataType::Decimal { precision, scale } => format!("DECIMAL({precision}, {scale})"),
            DataType::Char(n) => format!("CHAR({n})"),
            DataType::Varchar(n) => format!("VARCHAR({n})"),
            DataType::Text => String::from("TEXT"),
            DataType::Blob => String::from("BLOB"),
            DataType::Date => String::from("DATE"),
            DataType::Time => String::from("TIME"),
            DataType::Timestamp => String::from("TIMESTAMP"),
            DataType::Datetime => String::from("DATETIME"),
            DataType::Boolean => String::from("TINYINT(1)"),
            DataType::Json => String::from("JSON"),
            DataType::Enum(variants) => {
                let quoted: Vec<String> = variants.iter().map(|v| dialect.quote_literal(v)).collect();
                format!("ENUM({})", quoted.join(", "))
            }
            DataType::Custom(name) => name.clone(),
        },
        Dialect::Postgres => match data_type {
            DataType::Smallint => String::from("SMALLINT"),
            DataType::Integer => String::from("INTEGER"),
            DataType::Bigint => String::from("BIGINT"),
            DataType::Real => String::from("REAL"),
            DataType::Double => String::from("DOUBLE PRECISION"),
            DataType::Decimal { precision, scale } => format!("NUMERIC({precision}, {scale})"),
            DataType::Char(n) => format!("CHAR({n})"),
            DataType::Varchar(n) => format!("VARCHAR({n})"),
            DataType::Text => String::from("TEXT"),
            DataType::Blob => String::from("BYTEA"),
            DataType::Date => String::from("DATE"),
            DataType::Time => String::from("TIME"),
            DataType::Timestamp | DataType::Datetime => String::from("TIMESTAMP"),
            DataType::Boolean => String::from("BOOLEAN"),
            DataType::Json => String::from("JSONB"),
            DataType::Enum(_) => String::from("VARCHAR(255)"),
            DataType::Custom(name) => name.clone(),
        },
        // SQLite has dynamic typing; map to its storage classes.
        Dialect::Sqlite => match data_type {
            DataType::Smallint
            | DataType::Integer
            | DataType::Bigint
            | DataType::Boolean => String::from("INTEGER"),
            DataType::Real | DataType::Double => String::from("REAL"),
            DataType::Decimal { .. } => String::from("NUMERIC"),
            DataType::Char(_)
            | DataType::Varchar(_)
            | DataType::Text
            | DataType::Json
            | DataType::Enum(_)
            | DataType::Date
            | DataType::Time
            | DataType::Timestamp
            | DataType::Datetime => String::from("TEXT"),
            DataType::Blob => String::from("BLOB"),
            DataType::Custom(name) => name.clone(),
        },
    }
}

/// Renders a column default. Literals are inlined with quotes escaped.
fn default_sql(dialect: Dialect, default: &DefaultValue) -> String {
    match default {
        DefaultValue::Null => String::from("NULL"),
        DefaultValue::Expression(expr) => expr.clone(),
        DefaultValue::Value(SqlValue::Bool(b)) => {
            let (t, f) = dialect.features().boolean_literals;
            String::from(if *b { t } else { f })
        }
        DefaultValue::Value(SqlValue::Text(s)) => dialect.quote_literal(s),
        DefaultValue::Value(value) => value.to_sql_inline(),
    }
}

/// Renders one column definition.
///
/// `inline_pk` places `PRIMARY KEY` on the column itself; it is false when
/// the table declares a table-level primary key.
pub(crate) fn column_sql(dialect: Dialect, col: &ColumnDefinition, inline_pk: bool) -> Result<String> {
    let features = dialect.features();
    let serial = col.autoincrement && features.autoincrement == AutoIncrement::SerialType;

    let type_sql = if serial {
        String::from(match col.data_type {
            DataType::Smallint => "SMALLSERIAL",
            DataType::Integer => "SERIAL",
            _ => "BIGSERIAL",
        })
    } else if col.autoincrement && dialect == Dialect::Sqlite {
        if !inline_pk {
            return Err(BuildError::invalid(format!(
                "column '{}': SQLite AUTOINCREMENT requires a single-column INTEGER PRIMARY KEY",
                col.name
            )));
        }
        String::from("INTEGER")
    } else {
        map_data_type(dialect, &col.data_type)
    };

    let mut sql = format!("{} {}", dialect.identifier(&col.name)?, type_sql);
    if col.unsigned && features.supports_unsigned && col.data_type.is_numeric() {
        sql.push_str(" UNSIGNED");
    }

    let keyword = match features.autoincrement {
        AutoIncrement::Keyword(k) if col.autoincrement => Some(k),
        _ => None,
    };
    if inline_pk {
        sql.push_str(" PRIMARY KEY");
        if let Some(k) = keyword {
            sql.push_str(k);
        }
    } else {
        if !col.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(k) = keyword {
            sql.push_str(k);
        }
        if col.unique {
            sql.push_str(" UNIQUE");
        }
    }

    if let Some(default) = &col.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(&default_sql(dialect, default));
    }
    if let Some(comment) = &col.comment {
        if features.supports_column_comment_inline {
            sql.push_str(" COMMENT ");
            sql.push_str(&dialect.quote_literal(comment));
        }
    }
    Ok(sql)
}

fn identifier_list(dialect: Dialect, columns: &[String]) -> Result<String> {
    let quoted: Result<Vec<String>> = columns.iter().map(|c| dialect.identifier(c)).collect();
    Ok(quoted?.join(", "))
}

fn foreign_key_sql(dialect: Dialect, fk: &ForeignKeyDefinition) -> Result<String> {
    if fk.columns.is_empty() || fk.columns.len() != fk.references_columns.len() {
        return Err(BuildError::invalid(format!(
            "foreign key to '{}' must reference as many columns as it declares",
            fk.references_table
        )));
    }
    let mut sql = String::new();
    if let Some(name) = &fk.name {
        sql.push_str(&format!("CONSTRAINT {} ", dialect.identifier(name)?));
    }
    sql.push_str(&format!(
        "FOREIGN KEY ({}) REFERENCES {} ({})",
        identifier_list(dialect, &fk.columns)?,
        dialect.identifier(&fk.references_table)?,
        identifier_list(dialect, &fk.references_columns)?
    ));
    if let Some(action) = fk.on_delete {
        sql.push_str(" ON DELETE ");
        sql.push_str(action.as_sql());
    }
    if let Some(action) = fk.on_update {
        sql.push_str(" ON UPDATE ");
        sql.push_str(action.as_sql());
    }
    Ok(sql)
}

fn create_index_sql(
    dialect: Dialect,
    table: &str,
    index: &IndexDefinition,
    if_not_exists: bool,
) -> Result<String> {
    Ok(format!(
        "CREATE {}INDEX {}{} ON {} ({})",
        if index.unique { "UNIQUE " } else { "" },
        if if_not_exists { "IF NOT EXISTS " } else { "" },
        dialect.identifier(&index.name)?,
        dialect.identifier(table)?,
        identifier_list(dialect, &index.columns)?
    ))
}

fn comment_on_column_sql(dialect: Dialect, table: &str, column: &str, comment: &str) -> Result<String> {
    Ok(format!(
        "COMMENT ON COLUMN {}.{} IS {}",
        dialect.identifier(table)?,
        dialect.identifier(column)?,
        dialect.quote_literal(comment)
    ))
}

// =============================================================================
// CREATE TABLE
// =============================================================================

impl TableDefinition {
    fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(BuildError::invalid(format!(
                "table '{}' has no columns",
                self.name
            )));
        }
        for (i, col) in self.columns.iter().enumerate() {
            if self.columns[..i].iter().any(|c| c.name == col.name) {
                return Err(BuildError::invalid(format!(
                    "table '{}' declares column '{}' twice",
                    self.name, col.name
                )));
            }
        }
        let referenced = self
            .primary_key
            .iter()
            .chain(self.indexes.iter().flat_map(|i| i.columns.iter()))
            .chain(self.foreign_keys.iter().flat_map(|f| f.columns.iter()));
        for name in referenced {
            if self.column(name).is_none() {
                return Err(BuildError::invalid(format!(
                    "table '{}' has no column '{name}'",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// Primary key columns, whether declared on columns or on the table.
    fn primary_key_columns(&self) -> Vec<String> {
        if self.primary_key.is_empty() {
            self.columns
                .iter()
                .filter(|c| c.primary_key)
                .map(|c| c.name.clone())
                .collect()
        } else {
            self.primary_key.clone()
        }
    }

    /// Compiles the definition.
    ///
    /// The first statement is the `CREATE TABLE`; follow-up statements
    /// create indexes and comments on dialects that cannot inline them.
    #[allow(clippy::too_many_lines)]
    pub fn to_sql(&self, dialect: Dialect) -> Result<Vec<String>> {
        self.validate()?;
        let features = dialect.features();
        let table = dialect.identifier(&self.name)?;

        let pk = self.primary_key_columns();
        let inline_pk = self.primary_key.is_empty() && pk.len() == 1;

        let mut entries = Vec::new();
        for col in &self.columns {
            let inline = inline_pk && col.primary_key;
            entries.push(column_sql(dialect, col, inline)?);
        }
        if !inline_pk && !pk.is_empty() {
            entries.push(format!("PRIMARY KEY ({})", identifier_list(dialect, &pk)?));
        }
        for index in self.indexes.iter().filter(|i| i.unique) {
            let name = dialect.identifier(&index.name)?;
            let columns = identifier_list(dialect, &index.columns)?;
            entries.push(if features.inline_indexes {
                format!("UNIQUE KEY {name} ({columns})")
            } else {
                format!("CONSTRAINT {name} UNIQUE ({columns})")
            });
        }
        if features.inline_indexes {
            for index in self.indexes.iter().filter(|i| !i.unique) {
                entries.push(format!(
                    "INDEX {} ({})",
                    dialect.identifier(&index.name)?,
                    identifier_list(dialect, &index.columns)?
                ));
            }
        }
        for fk in &self.foreign_keys {
            entries.push(foreign_key_sql(dialect, fk)?);
        }

        let mut sql = String::from("CREATE ");
        if self.temporary {
            sql.push_str("TEMPORARY ");
        }
        sql.push_str("TABLE ");
        if self.if_not_exists {
            sql.push_str("IF NOT EXISTS ");
        }
        sql.push_str(&table);
        sql.push_str(" (\n");
        let body: Vec<String> = entries.iter().map(|e| format!("    {e}")).collect();
        sql.push_str(&body.join(",\n"));
        sql.push_str("\n)");

        let options = &self.options;
        if let Some(engine) = &options.engine {
            let engine = option_word("engine", engine)?;
            if features.supports_engine {
                sql.push_str(&format!(" ENGINE={engine}"));
            }
        }
        if let Some(charset) = &options.charset {
            let charset = option_word("charset", charset)?;
            if features.supports_charset {
                sql.push_str(&format!(" DEFAULT CHARSET={charset}"));
            }
        }
        if let Some(collation) = &options.collation {
            let collation = option_word("collation", collation)?;
            if features.supports_charset {
                sql.push_str(&format!(" COLLATE={collation}"));
            }
        }
        if features.supports_column_comment_inline {
            if let Some(comment) = &options.comment {
                sql.push_str(&format!(" COMMENT={}", dialect.quote_literal(comment)));
            }
        }

        let mut statements = vec![sql];
        if !features.inline_indexes {
            for index in self.indexes.iter().filter(|i| !i.unique) {
                statements.push(create_index_sql(dialect, &self.name, index, self.if_not_exists)?);
            }
        }
        if features.supports_comment_statements {
            if let Some(comment) = &options.comment {
                statements.push(format!(
                    "COMMENT ON TABLE {table} IS {}",
                    dialect.quote_literal(comment)
                ));
            }
            for col in &self.columns {
                if let Some(comment) = &col.comment {
                    statements.push(comment_on_column_sql(dialect, &self.name, &col.name, comment)?);
                }
            }
        }
        Ok(statements)
    }
}

// =============================================================================
// ALTER TABLE
// =============================================================================

/// A compiled alteration: either a clause of an `ALTER TABLE` statement or
/// a statement of its own.
enum Piece {
    Clause(String),
    Statement(String),
}

impl AlterTable {
    #[allow(clippy::too_many_lines)]
    fn pieces(&self, dialect: Dialect, op: &AlterOperation) -> Result<Vec<Piece>> {
        let features = dialect.features();
        let table = dialect.identifier(&self.table)?;
        let unsupported = |feature| BuildError::Unsupported { dialect, feature };

        let pieces = match op {
            AlterOperation::AddColumn(col) => {
                // Existing rows need a value for the new column.
                if !col.nullable && col.default.is_none() && !col.autoincrement {
                    return Err(BuildError::invalid(format!(
                        "column '{}' is added as NOT NULL without a default; \
                         mark it nullable or give it a default",
                        col.name
                    )));
                }
                let mut clause = format!("ADD COLUMN {}", column_sql(dialect, col, col.primary_key)?);
                if let Some(after) = &col.after {
                    if features.supports_column_position {
                        clause.push_str(&format!(" AFTER {}", dialect.identifier(after)?));
                    }
                }
                let mut pieces = vec![Piece::Clause(clause)];
                if let Some(comment) = col.comment.as_ref().filter(|_| features.supports_comment_statements) {
                    pieces.push(Piece::Statement(comment_on_column_sql(
                        dialect, &self.table, &col.name, comment,
                    )?));
                }
                pieces
            }
            AlterOperation::ModifyColumn(col) => {
                if !features.supports_modify_column {
                    return Err(unsupported("ALTER TABLE ... MODIFY COLUMN"));
                }
                if features.supports_column_position {
                    let mut clause = format!("MODIFY COLUMN {}", column_sql(dialect, col, col.primary_key)?);
                    if let Some(after) = &col.after {
                        clause.push_str(&format!(" AFTER {}", dialect.identifier(after)?));
                    }
                    vec![Piece::Clause(clause)]
                } else {
                    modify_column_clauses(dialect, &self.table, col)?
                }
            }
            AlterOperation::RenameColumn { from, to } => {
                let clause = format!(
                    "RENAME COLUMN {} TO {}",
                    dialect.identifier(from)?,
                    dialect.identifier(to)?
                );
                if features.standalone_rename {
                    vec![Piece::Statement(format!("ALTER TABLE {table} {clause}"))]
                } else {
                    vec![Piece::Clause(clause)]
                }
            }
            AlterOperation::DropColumn(column) => {
                vec![Piece::Clause(format!("DROP COLUMN {}", dialect.identifier(column)?))]
            }
            AlterOperation::AddIndex {
                name,
                columns,
                unique,
            } => {
                if columns.is_empty() {
                    return Err(BuildError::invalid(format!("index '{name}' has no columns")));
                }
                if features.inline_indexes {
                    vec![Piece::Clause(format!(
                        "ADD {}INDEX {} ({})",
                        if *unique { "UNIQUE " } else { "" },
                        dialect.identifier(name)?,
                        identifier_list(dialect, columns)?
                    ))]
                } else {
                    let index = IndexDefinition {
                        name: name.clone(),
                        columns: columns.clone(),
                        unique: *unique,
                    };
                    vec![Piece::Statement(create_index_sql(dialect, &self.table, &index, false)?)]
                }
            }
            AlterOperation::DropIndex(name) => {
                let name = dialect.identifier(name)?;
                if features.inline_indexes {
                    vec![Piece::Clause(format!("DROP INDEX {name}"))]
                } else {
                    vec![Piece::Statement(format!("DROP INDEX {name}"))]
                }
            }
            AlterOperation::AddForeignKey(fk) => {
                if !features.supports_alter_foreign_key {
                    return Err(unsupported("ALTER TABLE ... ADD FOREIGN KEY"));
                }
                vec![Piece::Clause(format!("ADD {}", foreign_key_sql(dialect, fk)?))]
            }
            AlterOperation::DropForeignKey(name) => {
                if !features.supports_alter_foreign_key {
                    return Err(unsupported("ALTER TABLE ... DROP FOREIGN KEY"));
                }
                let name = dialect.identifier(name)?;
                // MySQL names the constraint kind.
                if dialect == Dialect::MySql {
                    vec![Piece::Clause(format!("DROP FOREIGN KEY {name}"))]
                } else {
                    vec![Piece::Clause(format!("DROP CONSTRAINT {name}"))]
                }
            }
            AlterOperation::ChangeEngine(engine) => {
                let engine = option_word("engine", engine)?;
                if features.supports_engine {
                    vec![Piece::Clause(format!("ENGINE = {engine}"))]
                } else {
                    Vec::new()
                }
            }
            AlterOperation::ChangeCharset { charset, collation } => {
                let charset = option_word("charset", charset)?;
                let collation = collation
                    .as_deref()
                    .map(|c| option_word("collation", c))
                    .transpose()?;
                if features.supports_charset {
                    let mut clause = format!("CONVERT TO CHARACTER SET {charset}");
                    if let Some(collation) = collation {
                        clause.push_str(&format!(" COLLATE {collation}"));
                    }
                    vec![Piece::Clause(clause)]
                } else {
                    Vec::new()
                }
            }
        };
        Ok(pieces)
    }

    /// Compiles the alterations in order.
    ///
    /// Clauses are grouped into one `ALTER TABLE` where the dialect allows
    /// it; a standalone statement flushes the clauses collected before it.
    pub fn to_sql(&self, dialect: Dialect) -> Result<Vec<String>> {
        let table = dialect.identifier(&self.table)?;
        let multi = dialect.features().multi_clause_alter;

        let mut statements = Vec::new();
        let mut clauses: Vec<String> = Vec::new();
        let flush = |clauses: &mut Vec<String>, statements: &mut Vec<String>| {
            if !clauses.is_empty() {
                statements.push(format!("ALTER TABLE {table} {}", clauses.join(", ")));
                clauses.clear();
            }
        };

        for op in &self.operations {
            for piece in self.pieces(dialect, op)? {
                match piece {
                    Piece::Clause(clause) => {
                        if !multi {
                            flush(&mut clauses, &mut statements);
                        }
                        clauses.push(clause);
                    }
                    Piece::Statement(sql) => {
                        flush(&mut clauses, &mut statements);
                        statements.push(sql);
                    }
                }
            }
        }
        flush(&mut clauses, &mut statements);
        Ok(statements)
    }
}

/// Postgres spells a column redefinition as several ALTER COLUMN clauses.
fn modify_column_clauses(dialect: Dialect, table: &str, col: &ColumnDefinition) -> Result<Vec<Piece>> {
    let name = dialect.identifier(&col.name)?;
    let mut pieces = vec![Piece::Clause(format!(
        "ALTER COLUMN {name} TYPE {}",
        map_data_type(dialect, &col.data_type)
    ))];
    pieces.push(Piece::Clause(if col.nullable {
        format!("ALTER COLUMN {name} DROP NOT NULL")
    } else {
        format!("ALTER COLUMN {name} SET NOT NULL")
    }));
    pieces.push(Piece::Clause(match &col.default {
        Some(default) => format!(
            "ALTER COLUMN {name} SET DEFAULT {}",
            default_sql(dialect, default)
        ),
        None => format!("ALTER COLUMN {name} DROP DEFAULT"),
    }));
    if col.unique {
        pieces.push(Piece::Clause(format!("ADD UNIQUE ({name})")));
    }
    if let Some(comment) = &col.comment {
        pieces.push(Piece::Statement(comment_on_column_sql(
            dialect, table, &col.name, comment,
        )?));
    }
    Ok(pieces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AddColumns, ForeignKeyAction, TableBuilder};

    fn users() -> TableDefinition {
        let mut t = TableBuilder::new("users");
        t.id();
        t.string("email", 255).unique();
        t.integer("age").nullable();
        t.boolean("active").default(true);
        t.timestamp("created_at").default_expr("CURRENT_TIMESTAMP");
        t.finish()
    }

    #[test]
    fn test_create_table_mysql() {
        let sql = users().to_sql(Dialect::MySql).unwrap();
        assert_eq!(
            sql,
            vec![
                "CREATE TABLE `users` (\n    \
                 `id` BIGINT UNSIGNED PRIMARY KEY AUTO_INCREMENT,\n    \
                 `email` VARCHAR(255) NOT NULL UNIQUE,\n    \
                 `age` INT,\n    \
                 `active` TINYINT(1) NOT NULL DEFAULT 1,\n    \
                 `created_at` TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP\n)"
            ]
        );
    }

    #[test]
    fn test_create_table_postgres() {
        let sql = users().to_sql(Dialect::Postgres).unwrap();
        assert_eq!(sql.len(), 1);
        assert!(sql[0].contains(r#""id" BIGSERIAL PRIMARY KEY"#));
        assert!(sql[0].contains(r#""active" BOOLEAN NOT NULL DEFAULT TRUE"#));
        assert!(!sql[0].contains("AUTO_INCREMENT"));
        assert!(!sql[0].contains("UNSIGNED"));
    }

    #[test]
    fn test_create_table_sqlite() {
        let sql = users().to_sql(Dialect::Sqlite).unwrap();
        assert!(sql[0].contains(r#""id" INTEGER PRIMARY KEY AUTOINCREMENT"#));
        assert!(sql[0].contains(r#""active" INTEGER NOT NULL DEFAULT 1"#));
    }

    #[test]
    fn test_composite_primary_key_and_indexes() {
        let mut t = TableBuilder::new("team_members");
        t.integer("team_id");
        t.integer("user_id");
        t.string("role", 20).default("member").comment("member role");
        t.primary_key(&["team_id", "user_id"]);
        t.index("idx_role", &["role"]);
        t.foreign_key("user_id", "users", "id")
            .on_delete(ForeignKeyAction::Cascade)
            .add();
        t.engine("InnoDB").charset("utf8mb4").comment("memberships");
        let def = t.finish();

        let mysql = def.to_sql(Dialect::MySql).unwrap();
        assert_eq!(mysql.len(), 1);
        assert!(mysql[0].contains("`role` VARCHAR(20) NOT NULL DEFAULT 'member' COMMENT 'member role'"));
        assert!(mysql[0].contains("PRIMARY KEY (`team_id`, `user_id`)"));
        assert!(mysql[0].contains("INDEX `idx_role` (`role`)"));
        assert!(mysql[0].contains(
            "FOREIGN KEY (`user_id`) REFERENCES `users` (`id`) ON DELETE CASCADE"
        ));
        assert!(mysql[0].ends_with(") ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COMMENT='memberships'"));

        let pg = def.to_sql(Dialect::Postgres).unwrap();
        assert_eq!(
            pg[1..],
            [
                r#"CREATE INDEX "idx_role" ON "team_members" ("role")"#,
                r#"COMMENT ON TABLE "team_members" IS 'memberships'"#,
                r#"COMMENT ON COLUMN "team_members"."role" IS 'member role'"#,
            ]
        );
        assert!(!pg[0].contains("ENGINE"));

        let sqlite = def.to_sql(Dialect::Sqlite).unwrap();
        assert_eq!(sqlite.len(), 2);
        assert!(!sqlite[0].contains("COMMENT"));
    }

    #[test]
    fn test_unique_key_constraint() {
        let mut t = TableBuilder::new("users");
        t.string("email", 255);
        t.unique_key("uk_email", &["email"]);
        let def = t.finish();
        assert!(def.to_sql(Dialect::MySql).unwrap()[0].contains("UNIQUE KEY `uk_email` (`email`)"));
        assert!(def.to_sql(Dialect::Postgres).unwrap()[0]
            .contains(r#"CONSTRAINT "uk_email" UNIQUE ("email")"#));
    }

    #[test]
    fn test_default_escaping() {
        let mut t = TableBuilder::new("notes");
        t.string("title", 50).default("it's");
        let sql = t.finish().to_sql(Dialect::Postgres).unwrap();
        assert!(sql[0].contains("DEFAULT 'it''s'"));
    }

    #[test]
    fn test_table_options_reject_injection() {
        let hostile = "InnoDB; DROP TABLE users; --";
        for dialect in Dialect::ALL {
            let mut t = TableBuilder::new("t");
            t.integer("a");
            t.engine(hostile);
            assert!(matches!(
                t.finish().to_sql(dialect),
                Err(BuildError::InvalidArgument(_))
            ));

            let mut t = TableBuilder::new("t");
            t.integer("a");
            t.charset("utf8mb4").collation("x' OR '1");
            assert!(t.finish().to_sql(dialect).is_err());

            let mut alter = AlterTable::new("t");
            alter.change_engine(hostile);
            assert!(alter.to_sql(dialect).is_err());

            let mut alter = AlterTable::new("t");
            alter.change_charset("utf8mb4", Some("utf8mb4_bin COLLATE x"));
            assert!(alter.to_sql(dialect).is_err());
        }

        let mut alter = AlterTable::new("t");
        alter.change_charset("utf8mb4", Some("utf8mb4_unicode_ci"));
        assert_eq!(
            alter.to_sql(Dialect::MySql).unwrap(),
            vec!["ALTER TABLE `t` CONVERT TO CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci"]
        );
    }

    #[test]
    fn test_validation() {
        assert!(TableBuilder::new("empty").finish().to_sql(Dialect::MySql).is_err());

        let mut t = TableBuilder::new("dup");
        t.integer("a");
        t.integer("a");
        assert!(t.finish().to_sql(Dialect::MySql).is_err());

        let mut t = TableBuilder::new("pk");
        t.integer("a");
        t.primary_key(&["missing"]);
        assert!(t.finish().to_sql(Dialect::MySql).is_err());
    }

    #[test]
    fn test_alter_groups_clauses_on_mysql() {
        let mut alter = AlterTable::new("users");
        alter.string("phone", 20).nullable();
        alter.drop_column("legacy");
        alter.add_index("idx_phone", &["phone"], false);
        alter.change_engine("InnoDB");
        let sql = alter.to_sql(Dialect::MySql).unwrap();
        assert_eq!(
            sql,
            vec![
                "ALTER TABLE `users` ADD COLUMN `phone` VARCHAR(20), DROP COLUMN `legacy`, \
                 ADD INDEX `idx_phone` (`phone`), ENGINE = InnoDB"
            ]
        );
    }

    #[test]
    fn test_alter_postgres_standalone_statements() {
        let mut alter = AlterTable::new("users");
        alter.string("phone", 20).nullable();
        alter.rename_column("name", "full_name");
        alter.drop_column("legacy");
        alter.add_index("idx_phone", &["phone"], true);
        alter.change_charset("utf8mb4", Some("utf8mb4_unicode_ci"));
        let sql = alter.to_sql(Dialect::Postgres).unwrap();
        assert_eq!(
            sql,
            vec![
                r#"ALTER TABLE "users" ADD COLUMN "phone" VARCHAR(20)"#,
                r#"ALTER TABLE "users" RENAME COLUMN "name" TO "full_name""#,
                r#"ALTER TABLE "users" DROP COLUMN "legacy""#,
                r#"CREATE UNIQUE INDEX "idx_phone" ON "users" ("phone")"#,
            ]
        );
    }

    #[test]
    fn test_alter_postgres_modify_column() {
        let mut alter = AlterTable::new("users");
        alter.modify_column(super::super::column::varchar("email", 320).unique());
        let sql = alter.to_sql(Dialect::Postgres).unwrap();
        assert_eq!(
            sql,
            vec![
                "ALTER TABLE \"users\" ALTER COLUMN \"email\" TYPE VARCHAR(320), \
                 ALTER COLUMN \"email\" SET NOT NULL, ALTER COLUMN \"email\" DROP DEFAULT, \
                 ADD UNIQUE (\"email\")"
            ]
        );
    }

    #[test]
    fn test_alter_sqlite_one_statement_per_operation() {
        let mut alter = AlterTable::new("users");
        alter.string("phone", 20).nullable();
        alter.rename_column("name", "full_name");
        let sql = alter.to_sql(Dialect::Sqlite).unwrap();
        assert_eq!(
            sql,
            vec![
                r#"ALTER TABLE "users" ADD COLUMN "phone" TEXT"#,
                r#"ALTER TABLE "users" RENAME COLUMN "name" TO "full_name""#,
            ]
        );
    }

    #[test]
    fn test_add_column_needs_default_or_nullable() {
        for dialect in Dialect::ALL {
            let mut alter = AlterTable::new("users");
            alter.string("phone", 20);
            assert!(matches!(
                alter.to_sql(dialect),
                Err(BuildError::InvalidArgument(_))
            ));
        }

        let mut alter = AlterTable::new("users");
        alter.integer("score").default(0);
        assert_eq!(
            alter.to_sql(Dialect::Sqlite).unwrap(),
            vec![r#"ALTER TABLE "users" ADD COLUMN "score" INTEGER NOT NULL DEFAULT 0"#]
        );
    }

    #[test]
    fn test_alter_sqlite_rejects_unsupported() {
        let mut alter = AlterTable::new("users");
        alter.modify_column(super::super::column::integer("age"));
        assert!(matches!(
            alter.to_sql(Dialect::Sqlite),
            Err(BuildError::Unsupported { .. })
        ));

        let mut alter = AlterTable::new("posts");
        alter.add_foreign_key(ForeignKeyDefinition::new("user_id", "users", "id"));
        assert!(matches!(
            alter.to_sql(Dialect::Sqlite),
            Err(BuildError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_alter_foreign_keys() {
        let mut alter = AlterTable::new("posts");
        alter.add_foreign_key(
            ForeignKeyDefinition::new("user_id", "users", "id")
                .named("fk_posts_user")
                .on_delete(ForeignKeyAction::SetNull),
        );
        alter.drop_foreign_key("fk_old");
        assert_eq!(
            alter.to_sql(Dialect::MySql).unwrap(),
            vec![
                "ALTER TABLE `posts` ADD CONSTRAINT `fk_posts_user` FOREIGN KEY (`user_id`) \
                 REFERENCES `users` (`id`) ON DELETE SET NULL, DROP FOREIGN KEY `fk_old`"
            ]
        );
        assert!(alter.to_sql(Dialect::Postgres).unwrap()[0].ends_with(r#"DROP CONSTRAINT "fk_old""#));
    }

    #[test]
    fn test_empty_alter() {
        assert!(AlterTable::new("users").to_sql(Dialect::MySql).unwrap().is_empty());
    }
}
