//! Schema definitions and DDL compilation.
//!
//! Tables are described with [`TableBuilder`], altered with [`AlterTable`]
//! and removed with [`DropTable`] / [`TruncateTable`]. Every definition
//! compiles to one or more statements through [`Ddl`].

mod alter;
mod column;
mod ddl;
mod drop;
mod table;
mod types;

pub use alter::{AlterOperation, AlterTable};
pub use column::{
    bigint, boolean, decimal, integer, text, timestamp, varchar, ColumnBuilder,
    ColumnDefinition, DefaultValue, ForeignKeyAction,
};
pub use ddl::map_data_type;
pub use drop::{DropOption, DropOptions, DropTable, IdentityBehavior, TruncateTable};
pub use table::{
    AddColumns, ForeignKeyBuilder, ForeignKeyDefinition, IndexDefinition, PendingColumn,
    TableBuilder, TableDefinition, TableOptions,
};
pub use types::DataType;

use crate::dialect::Dialect;
use crate::error::Result;

/// Anything that compiles to an ordered list of DDL statements.
pub trait Ddl {
    fn to_statements(&self, dialect: Dialect) -> Result<Vec<String>>;

    /// Statements that undo session changes made by
    /// [`to_statements`](Self::to_statements). Executors run them on the
    /// same connection afterwards, whether or not a statement failed.
    fn cleanup_statements(&self, _dialect: Dialect) -> Vec<String> {
        Vec::new()
    }
}

impl Ddl for TableDefinition {
    fn to_statements(&self, dialect: Dialect) -> Result<Vec<String>> {
        self.to_sql(dialect)
    }
}

impl Ddl for TableBuilder {
    fn to_statements(&self, dialect: Dialect) -> Result<Vec<String>> {
        self.definition().to_sql(dialect)
    }
}

impl Ddl for AlterTable {
    fn to_statements(&self, dialect: Dialect) -> Result<Vec<String>> {
        self.to_sql(dialect)
    }
}

impl Ddl for DropTable {
    fn to_statements(&self, dialect: Dialect) -> Result<Vec<String>> {
        Ok(vec![self.to_sql(dialect)?])
    }
}

impl Ddl for TruncateTable {
    fn to_statements(&self, dialect: Dialect) -> Result<Vec<String>> {
        self.to_body(dialect)
    }

    fn cleanup_statements(&self, dialect: Dialect) -> Vec<String> {
        self.to_cleanup(dialect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ddl_is_object_safe() {
        let mut table = TableBuilder::new("tags");
        table.increments("id");
        table.string("label", 64);
        let items: Vec<Box<dyn Ddl>> = vec![
            Box::new(table),
            Box::new(DropTable::new(&["tags"]).if_exists()),
            Box::new(TruncateTable::new(&["tags"])),
        ];
        let statements: Vec<String> = items
            .iter()
            .flat_map(|d| d.to_statements(Dialect::Sqlite).unwrap())
            .collect();
        assert_eq!(statements.len(), 3);
        assert!(statements[0].starts_with("CREATE TABLE \"tags\""));
        assert_eq!(statements[1], r#"DROP TABLE IF EXISTS "tags""#);
        assert_eq!(statements[2], r#"DELETE FROM "tags""#);
    }
}
