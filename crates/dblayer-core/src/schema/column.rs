//! Column definition builder.
//!
//! A [`ColumnDefinition`] can be modified in place through `&mut` methods,
//! which is what the closure helpers on tables hand back, or built by value
//! through [`ColumnBuilder`].

use super::types::DataType;
use crate::builder::{SqlValue, ToSqlValue};

/// Foreign key referential action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignKeyAction {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ForeignKeyAction {
    /// Returns the SQL representation of the action.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// Default value for a column.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Null,
    /// A literal, rendered inline with quotes escaped.
    Value(SqlValue),
    /// Raw SQL expression (e.g., `CURRENT_TIMESTAMP`).
    Expression(String),
}

/// A complete column definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
    /// Columns are NOT NULL unless marked nullable.
    pub nullable: bool,
    pub default: Option<DefaultValue>,
    pub primary_key: bool,
    pub unique: bool,
    pub autoincrement: bool,
    /// MySQL only.
    pub unsigned: bool,
    pub comment: Option<String>,
    /// Position hint for ALTER TABLE ... ADD COLUMN (MySQL only).
    pub after: Option<String>,
}

impl ColumnDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: false,
            default: None,
            primary_key: false,
            unique: false,
            autoincrement: false,
            unsigned: false,
            comment: None,
            after: None,
        }
    }

    pub fn nullable(&mut self) -> &mut Self {
        self.nullable = true;
        self
    }

    pub fn not_null(&mut self) -> &mut Self {
        self.nullable = false;
        self
    }

    /// Marks the column as PRIMARY KEY (implicitly NOT NULL).
    pub fn primary(&mut self) -> &mut Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn unique(&mut self) -> &mut Self {
        self.unique = true;
        self
    }

    pub fn auto_increment(&mut self) -> &mut Self {
        self.autoincrement = true;
        self
    }

    pub fn unsigned(&mut self) -> &mut Self {
        self.unsigned = true;
        self
    }

    /// Sets a literal default value.
    pub fn default<T: ToSqlValue>(&mut self, value: T) -> &mut Self {
        self.default = Some(match value.to_sql_value() {
            SqlValue::Null => DefaultValue::Null,
            other => DefaultValue::Value(other),
        });
        self
    }

    /// Sets a raw SQL expression as default.
    pub fn default_expr(&mut self, expr: impl Into<String>) -> &mut Self {
        self.default = Some(DefaultValue::Expression(expr.into()));
        self
    }

    pub fn default_null(&mut self) -> &mut Self {
        self.default = Some(DefaultValue::Null);
        self.nullable = true;
        self
    }

    pub fn comment(&mut self, comment: impl Into<String>) -> &mut Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn after(&mut self, column: impl Into<String>) -> &mut Self {
        self.after = Some(column.into());
        self
    }
}

/// By-value builder for [`ColumnDefinition`].
#[derive(Debug, Clone)]
pub struct ColumnBuilder {
    def: ColumnDefinition,
}

impl ColumnBuilder {
    /// Creates a new column builder with name and type.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            def: ColumnDefinition::new(name, data_type),
        }
    }

    /// Creates a builder from a loose type name, see [`DataType::from_name`].
    #[must_use]
    pub fn typed(name: impl Into<String>, type_name: &str, length: Option<u32>) -> Self {
        Self::new(name, DataType::from_name(type_name, length))
    }

    #[must_use]
    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.def.data_type = data_type;
        self
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.def.nullable();
        self
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.def.not_null();
        self
    }

    #[must_use]
    pub fn primary(mut self) -> Self {
        self.def.primary();
        self
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.def.unique();
        self
    }

    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.def.auto_increment();
        self
    }

    #[must_use]
    pub fn unsigned(mut self) -> Self {
        self.def.unsigned();
        self
    }

    #[must_use]
    pub fn default<T: ToSqlValue>(mut self, value: T) -> Self {
        self.def.default(value);
        self
    }

    #[must_use]
    pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
        self.def.default_expr(expr);
        self
    }

    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.def.comment(comment);
        self
    }

    #[must_use]
    pub fn after(mut self, column: impl Into<String>) -> Self {
        self.def.after(column);
        self
    }

    /// Builds the column definition.
    #[must_use]
    pub fn build(self) -> ColumnDefinition {
        self.def
    }
}

impl From<ColumnBuilder> for ColumnDefinition {
    fn from(builder: ColumnBuilder) -> Self {
        builder.build()
    }
}

// =============================================================================
// Shorthand functions for common types
// =============================================================================

#[must_use]
pub fn integer(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, DataType::Integer)
}

#[must_use]
pub fn bigint(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, DataType::Bigint)
}

#[must_use]
pub fn varchar(name: impl Into<String>, len: u32) -> ColumnBuilder {
    ColumnBuilder::new(name, DataType::Varchar(len))
}

#[must_use]
pub fn text(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, DataType::Text)
}

#[must_use]
pub fn boolean(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, DataType::Boolean)
}

#[must_use]
pub fn timestamp(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, DataType::Timestamp)
}

#[must_use]
pub fn decimal(name: impl Into<String>, precision: u16, scale: u16) -> ColumnBuilder {
    ColumnBuilder::new(name, DataType::Decimal { precision, scale })
}
