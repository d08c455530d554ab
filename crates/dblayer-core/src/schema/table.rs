//! Table definitions and the CREATE TABLE builder.

use super::column::{ColumnDefinition, ForeignKeyAction};
use super::types::DataType;

/// An index over one or more columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl IndexDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>, columns: &[&str], unique: bool) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| String::from(*c)).collect(),
            unique,
        }
    }
}

/// A foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDefinition {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub references_table: String,
    pub references_columns: Vec<String>,
    pub on_delete: Option<ForeignKeyAction>,
    pub on_update: Option<ForeignKeyAction>,
}

impl ForeignKeyDefinition {
    /// A single-column reference `column -> table(references)`.
    #[must_use]
    pub fn new(column: &str, table: &str, references: &str) -> Self {
        Self {
            name: None,
            columns: vec![String::from(column)],
            references_table: String::from(table),
            references_columns: vec![String::from(references)],
            on_delete: None,
            on_update: None,
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub const fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    #[must_use]
    pub const fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = Some(action);
        self
    }
}

/// Storage options. Only MySQL renders `engine`, `charset` and
/// `collation`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableOptions {
    pub engine: Option<String>,
    pub charset: Option<String>,
    pub collation: Option<String>,
    pub comment: Option<String>,
}

/// A complete table definition, ready to be compiled.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    /// Table-level (possibly composite) primary key.
    pub primary_key: Vec<String>,
    pub indexes: Vec<IndexDefinition>,
    pub foreign_keys: Vec<ForeignKeyDefinition>,
    pub options: TableOptions,
    pub if_not_exists: bool,
    pub temporary: bool,
}

impl TableDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            options: TableOptions::default(),
            if_not_exists: false,
            temporary: false,
        }
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }
}

// =============================================================================
// Column helpers shared by CREATE and ALTER
// =============================================================================

/// Shorthand column helpers for anything that collects columns.
///
/// Each helper adds the column immediately and returns it for chained
/// modifiers, e.g. `t.string("email", 255).unique();`.
pub trait AddColumns {
    /// Adds a column and returns it for further modification.
    fn add_column(&mut self, column: ColumnDefinition) -> &mut ColumnDefinition;

    fn column(&mut self, column: impl Into<ColumnDefinition>) -> &mut ColumnDefinition
    where
        Self: Sized,
    {
        self.add_column(column.into())
    }

    /// Starts a column whose type is set by chained calls, ending in
    /// [`PendingColumn::add`].
    fn column_named(&mut self, name: &str) -> PendingColumn<'_, Self>
    where
        Self: Sized,
    {
        PendingColumn {
            sink: self,
            def: ColumnDefinition::new(name, DataType::Varchar(255)),
        }
    }

    /// `id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY` or its equivalent.
    fn id(&mut self) -> &mut ColumnDefinition {
        self.big_increments("id")
    }

    fn big_increments(&mut self, name: &str) -> &mut ColumnDefinition {
        let col = self.add_column(ColumnDefinition::new(name, DataType::Bigint));
        col.unsigned().primary().auto_increment();
        col
    }

    fn increments(&mut self, name: &str) -> &mut ColumnDefinition {
        let col = self.add_column(ColumnDefinition::new(name, DataType::Integer));
        col.unsigned().primary().auto_increment();
        col
    }

    fn string(&mut self, name: &str, length: u32) -> &mut ColumnDefinition {
        self.add_column(ColumnDefinition::new(name, DataType::Varchar(length)))
    }

    fn text(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnDefinition::new(name, DataType::Text))
    }

    fn integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnDefinition::new(name, DataType::Integer))
    }

    fn big_integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnDefinition::new(name, DataType::Bigint))
    }

    fn boolean(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnDefinition::new(name, DataType::Boolean))
    }

    fn double(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnDefinition::new(name, DataType::Double))
    }

    fn decimal(&mut self, name: &str, precision: u16, scale: u16) -> &mut ColumnDefinition {
        self.add_column(ColumnDefinition::new(
            name,
            DataType::Decimal { precision, scale },
        ))
    }

    fn date(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnDefinition::new(name, DataType::Date))
    }

    fn timestamp(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnDefinition::new(name, DataType::Timestamp))
    }

    fn json(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(ColumnDefinition::new(name, DataType::Json))
    }

    /// Nullable `created_at` and `updated_at` timestamps.
    fn timestamps(&mut self) {
        self.timestamp("created_at").nullable();
        self.timestamp("updated_at").nullable();
    }
}

/// A column being described fluently before it is added.
#[derive(Debug)]
pub struct PendingColumn<'a, S> {
    sink: &'a mut S,
    def: ColumnDefinition,
}

impl<'a, S: AddColumns> PendingColumn<'a, S> {
    /// Sets the type from a loose name such as `varchar`, see
    /// [`DataType::from_name`].
    #[must_use]
    pub fn type_name(mut self, name: &str, length: Option<u32>) -> Self {
        self.def.data_type = DataType::from_name(name, length);
        self
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
    pub fn unique(mut self) -> Self {
        self.def.unique();
        self
    }

    #[must_use]
    pub fn primary(mut self) -> Self {
        self.def.primary();
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
    pub fn default<T: crate::builder::ToSqlValue>(mut self, value: T) -> Self {
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

    /// Adds the column to the table or alteration.
    pub fn add(self) -> &'a mut ColumnDefinition {
        self.sink.add_column(self.def)
    }
}

// =============================================================================
// CREATE TABLE builder
// =============================================================================

/// Builder for a [`TableDefinition`].
///
/// Methods take `&mut self` so the builder works inside closures:
///
/// ```rust
/// use dblayer_core::schema::{AddColumns, TableBuilder};
/// use dblayer_core::ForeignKeyAction;
///
/// let mut t = TableBuilder::new("posts");
/// t.id();
/// t.string("title", 200);
/// t.big_integer("user_id").unsigned();
/// t.foreign_key("user_id", "users", "id")
///     .on_delete(ForeignKeyAction::Cascade)
///     .add();
/// t.timestamps();
/// let table = t.finish();
/// assert_eq!(table.columns.len(), 5);
/// ```
#[derive(Debug, Clone)]
pub struct TableBuilder {
    def: TableDefinition,
}

impl AddColumns for TableBuilder {
    fn add_column(&mut self, column: ColumnDefinition) -> &mut ColumnDefinition {
        let columns = &mut self.def.columns;
        columns.push(column);
        let last = columns.len() - 1;
        &mut columns[last]
    }
}

impl TableBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            def: TableDefinition::new(name),
        }
    }

    /// Sets a table-level, possibly composite, primary key.
    pub fn primary_key(&mut self, columns: &[&str]) -> &mut Self {
        self.def.primary_key = columns.iter().map(|c| String::from(*c)).collect();
        self
    }

    pub fn unique_key(&mut self, name: &str, columns: &[&str]) -> &mut Self {
        self.def.indexes.push(IndexDefinition::new(name, columns, true));
        self
    }

    pub fn index(&mut self, name: &str, columns: &[&str]) -> &mut Self {
        self.def.indexes.push(IndexDefinition::new(name, columns, false));
        self
    }

    /// Starts a foreign key `column -> table(references)`, finished by
    /// [`ForeignKeyBuilder::add`].
    pub fn foreign_key(&mut self, column: &str, table: &str, references: &str) -> ForeignKeyBuilder<'_> {
        ForeignKeyBuilder {
            target: &mut self.def.foreign_keys,
            def: ForeignKeyDefinition::new(column, table, references),
        }
    }

    pub fn comment(&mut self, comment: impl Into<String>) -> &mut Self {
        self.def.options.comment = Some(comment.into());
        self
    }

    pub fn engine(&mut self, engine: impl Into<String>) -> &mut Self {
        self.def.options.engine = Some(engine.into());
        self
    }

    pub fn charset(&mut self, charset: impl Into<String>) -> &mut Self {
        self.def.options.charset = Some(charset.into());
        self
    }

    pub fn collation(&mut self, collation: impl Into<String>) -> &mut Self {
        self.def.options.collation = Some(collation.into());
        self
    }

    pub fn if_not_exists(&mut self) -> &mut Self {
        self.def.if_not_exists = true;
        self
    }

    pub fn temporary(&mut self) -> &mut Self {
        self.def.temporary = true;
        self
    }

    /// Returns the definition built so far.
    #[must_use]
    pub const fn definition(&self) -> &TableDefinition {
        &self.def
    }

    #[must_use]
    pub fn finish(self) -> TableDefinition {
        self.def
    }
}

/// A foreign key being described; nothing is recorded until
/// [`add`](Self::add).
#[derive(Debug)]
pub struct ForeignKeyBuilder<'a> {
    target: &'a mut Vec<ForeignKeyDefinition>,
    def: ForeignKeyDefinition,
}

impl ForeignKeyBuilder<'_> {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.def.name = Some(name.into());
        self
    }

    #[must_use]
    pub const fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.def.on_delete = Some(action);
        self
    }

    #[must_use]
    pub const fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.def.on_update = Some(action);
        self
    }

    pub fn add(self) {
        self.target.push(self.def);
    }
}
