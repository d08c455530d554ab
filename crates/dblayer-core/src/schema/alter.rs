//! ALTER TABLE operations.

use super::column::ColumnDefinition;
use super::table::{AddColumns, ForeignKeyDefinition};

/// One alteration. Operations are emitted in the order they were recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum AlterOperation {
    AddColumn(ColumnDefinition),
    /// Replaces the definition of an existing column.
    ModifyColumn(ColumnDefinition),
    RenameColumn {
        from: String,
        to: String,
    },
    DropColumn(String),
    AddIndex {
        name: String,
        columns: Vec<String>,
        unique: bool,
    },
    DropIndex(String),
    AddForeignKey(ForeignKeyDefinition),
    DropForeignKey(String),
    /// MySQL only.
    ChangeEngine(String),
    /// MySQL only.
    ChangeCharset {
        charset: String,
        collation: Option<String>,
    },
}

/// An ordered list of alterations to one table.
///
/// Column helpers from [`AddColumns`] record `AddColumn` operations:
///
/// ```rust
/// use dblayer_core::schema::{AddColumns, AlterTable};
/// use dblayer_core::Dialect;
///
/// let mut alter = AlterTable::new("users");
/// alter.string("phone", 20).nullable().after("email");
/// alter.rename_column("name", "full_name");
/// let sql = alter.to_sql(Dialect::MySql).unwrap();
/// assert_eq!(
///     sql,
///     vec!["ALTER TABLE `users` ADD COLUMN `phone` VARCHAR(20) AFTER `email`, \
///           RENAME COLUMN `name` TO `full_name`"]
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AlterTable {
    pub table: String,
    pub operations: Vec<AlterOperation>,
}

impl AddColumns for AlterTable {
    fn add_column(&mut self, column: ColumnDefinition) -> &mut ColumnDefinition {
        self.operations.push(AlterOperation::AddColumn(column));
        match self.operations.last_mut() {
            Some(AlterOperation::AddColumn(column)) => column,
            _ => unreachable!("an AddColumn operation was just pushed"),
        }
    }
}

impl AlterTable {
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            operations: Vec::new(),
        }
    }

    pub fn push(&mut self, operation: AlterOperation) -> &mut Self {
        self.operations.push(operation);
        self
    }

    pub fn modify_column(&mut self, column: impl Into<ColumnDefinition>) -> &mut Self {
        self.push(AlterOperation::ModifyColumn(column.into()))
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> &mut Self {
        self.push(AlterOperation::RenameColumn {
            from: String::from(from),
            to: String::from(to),
        })
    }

    pub fn drop_column(&mut self, column: &str) -> &mut Self {
        self.push(AlterOperation::DropColumn(String::from(column)))
    }

    pub fn add_index(&mut self, name: &str, columns: &[&str], unique: bool) -> &mut Self {
        self.push(AlterOperation::AddIndex {
            name: String::from(name),
            columns: columns.iter().map(|c| String::from(*c)).collect(),
            unique,
        })
    }

    pub fn drop_index(&mut self, name: &str) -> &mut Self {
        self.push(AlterOperation::DropIndex(String::from(name)))
    }

    pub fn add_foreign_key(&mut self, foreign_key: ForeignKeyDefinition) -> &mut Self {
        self.push(AlterOperation::AddForeignKey(foreign_key))
    }

    pub fn drop_foreign_key(&mut self, name: &str) -> &mut Self {
        self.push(AlterOperation::DropForeignKey(String::from(name)))
    }

    pub fn change_engine(&mut self, engine: &str) -> &mut Self {
        self.push(AlterOperation::ChangeEngine(String::from(engine)))
    }

    pub fn change_charset(&mut self, charset: &str, collation: Option<&str>) -> &mut Self {
        self.push(AlterOperation::ChangeCharset {
            charset: String::from(charset),
            collation: collation.map(String::from),
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
