use crate::{Expression, FieldType, OpPrecedence, SqlWriter, TableRef, writer::Context};

/// Fully-qualified reference to a table column.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    /// Column name.
    pub name: &'static str,
    /// Table name.
    pub table: &'static str,
    /// Schema name (may be empty).
    pub schema: &'static str,
}

impl ColumnRef {
    pub const fn new(table: &'static str, name: &'static str) -> Self {
        Self {
            name,
            table,
            schema: "",
        }
    }
    pub fn table(&self) -> TableRef {
        TableRef {
            name: self.table,
            schema: self.schema,
            ..Default::default()
        }
    }
}

/// Indicates how (or if) a column participates in the primary key.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryKeyType {
    /// Single-column primary key.
    PrimaryKey,
    /// Not part of the primary key.
    #[default]
    None,
}

/// Declarative definition of a table column.
///
/// Every builder method is `const`, models describe their columns in a static table:
/// ```rust
/// use reprise_core::{ColumnDef, FieldType};
/// static COLUMNS: [ColumnDef; 2] = [
///     ColumnDef::new("author", "id", FieldType::AutoField).primary_key(),
///     ColumnDef::new("author", "name", FieldType::Char { max_length: 100 }).unique(),
/// ];
/// assert_eq!(COLUMNS[1].name(), "name");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    /// Column identity.
    pub column_ref: ColumnRef,
    /// Semantic type, drives both the DDL and the cleaning of bound values.
    pub field_type: FieldType,
    /// Nullability flag.
    pub nullable: bool,
    /// Primary key participation.
    pub primary_key: PrimaryKeyType,
    /// Unique constraint.
    pub unique: bool,
    /// Foreign key target column.
    pub references: Option<ColumnRef>,
}

impl ColumnDef {
    pub const fn new(table: &'static str, name: &'static str, field_type: FieldType) -> Self {
        Self {
            column_ref: ColumnRef::new(table, name),
            field_type,
            nullable: false,
            primary_key: PrimaryKeyType::None,
            unique: false,
            references: None,
        }
    }
    pub const fn nullable(self) -> Self {
        Self {
            nullable: true,
            ..self
        }
    }
    pub const fn primary_key(self) -> Self {
        Self {
            primary_key: PrimaryKeyType::PrimaryKey,
            ..self
        }
    }
    pub const fn unique(self) -> Self {
        Self {
            unique: true,
            ..self
        }
    }
    pub const fn references(self, column: ColumnRef) -> Self {
        Self {
            references: Some(column),
            ..self
        }
    }
    pub fn name(&self) -> &'static str {
        self.column_ref.name
    }
    pub fn table(&self) -> &'static str {
        self.column_ref.table
    }
    pub fn schema(&self) -> &'static str {
        self.column_ref.schema
    }
    pub fn is_primary_key(&self) -> bool {
        self.primary_key == PrimaryKeyType::PrimaryKey
    }
}

impl<'a> From<&'a ColumnDef> for &'a ColumnRef {
    fn from(value: &'a ColumnDef) -> Self {
        &value.column_ref
    }
}

impl OpPrecedence for ColumnRef {
    fn precedence(&self, _writer: &dyn SqlWriter) -> i32 {
        1_000_000
    }
}

impl Expression for ColumnRef {
    fn write_query(&self, writer: &dyn SqlWriter, context: &mut Context, out: &mut String) {
        writer.write_column_ref(context, out, self);
    }
}

impl OpPrecedence for ColumnDef {
    fn precedence(&self, _writer: &dyn SqlWriter) -> i32 {
        1_000_000
    }
}

impl Expression for ColumnDef {
    fn write_query(&self, writer: &dyn SqlWriter, context: &mut Context, out: &mut String) {
        writer.write_column_ref(context, out, &self.column_ref);
    }
    fn output_type(&self) -> Option<FieldType> {
        Some(self.field_type)
    }
    fn is_nullable(&self) -> bool {
        self.nullable
    }
}
