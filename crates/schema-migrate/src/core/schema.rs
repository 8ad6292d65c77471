//! Portable schema model: database, tables, columns, indexes and constraints.
//!
//! These types are the contract between schema providers (which build them)
//! and code generators (which read them). Constraints reference columns by
//! name within the owning table; the model holds no pointers between objects.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::parser::{Expr, Parser};

use super::types::{ColumnAttributes, ColumnType, ForeignKeyRule};
use super::value::Value;

/// A database: the root of the portable model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    /// Database name.
    pub name: String,

    /// Tables in catalog order.
    pub tables: Vec<Table>,

    /// User-defined domains (enumerations and sets).
    pub types: Vec<DataType>,
}

impl Database {
    /// Create an empty database model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Find a table by name and owner (owner ignored when empty).
    pub fn table(&self, name: &str, owner: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.name == name && (owner.is_empty() || t.owner == owner))
    }

    /// Find a user-defined type by name.
    pub fn data_type(&self, name: &str) -> Option<&DataType> {
        self.types.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Tables included in the current export.
    pub fn checked_tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter().filter(|t| t.checked)
    }
}

/// Table metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Owner / schema qualifier (empty when the dialect has none).
    pub owner: String,

    /// Column definitions in ordinal order.
    pub columns: Vec<Column>,

    /// Primary key, if any.
    pub primary_key: Option<PrimaryKey>,

    /// Indexes (may include the one backing the primary key).
    pub indexes: Vec<Index>,

    /// Foreign key constraints.
    pub foreign_keys: Vec<ForeignKey>,

    /// Check constraints.
    pub check_constraints: Vec<CheckConstraint>,

    /// Included in the current export.
    pub checked: bool,

    /// Literal data rows, in column order. Only filled for data exports.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty, checked table.
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            columns: Vec::new(),
            primary_key: None,
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            check_constraints: Vec::new(),
            checked: true,
            rows: Vec::new(),
        }
    }

    /// Get the fully qualified table name.
    pub fn full_name(&self) -> String {
        if self.owner.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.owner, self.name)
        }
    }

    /// Look up a column by name (case-insensitive).
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Check if the table has a primary key.
    pub fn has_pk(&self) -> bool {
        self.primary_key
            .as_ref()
            .is_some_and(|pk| !pk.columns.is_empty())
    }

    /// True when `column` is the table's only primary key column.
    pub fn is_single_pk_column(&self, column: &str) -> bool {
        match &self.primary_key {
            Some(pk) => pk.columns.len() == 1 && pk.columns[0].eq_ignore_ascii_case(column),
            None => false,
        }
    }

    /// True when any column is an identity column.
    pub fn has_identity(&self) -> bool {
        self.columns.iter().any(Column::is_identity)
    }
}

/// Primary key constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryKey {
    /// Constraint name (may be empty when the source did not name it).
    pub name: String,

    /// Key column names in key order.
    pub columns: Vec<String>,
}

/// Identity seed and increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// First value generated.
    pub seed: i64,
    /// Step between generated values.
    pub increment: i64,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            seed: 1,
            increment: 1,
        }
    }
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Portable type.
    pub column_type: ColumnType,

    /// Native type string from the source (fallback for Unknown/UserDefined).
    pub native_type: String,

    /// Length for character/binary types, bit count for bit strings (0 = unbounded).
    pub size: u32,

    /// Numeric precision.
    pub precision: u8,

    /// Numeric scale.
    pub scale: u8,

    /// Nullability and other attributes.
    pub attributes: ColumnAttributes,

    /// Default value; `None` means no default.
    pub default: Option<Value>,

    /// Seed/increment, only for identity columns.
    pub identity: Option<Identity>,

    /// Column comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Column {
    /// Create a nullable column with no size information.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            native_type: String::new(),
            size: 0,
            precision: 0,
            scale: 0,
            attributes: ColumnAttributes::NONE,
            default: None,
            identity: None,
            description: None,
        }
    }

    /// Whether the column allows NULL.
    pub fn is_nullable(&self) -> bool {
        !self.attributes.contains(ColumnAttributes::REQUIRED)
    }

    /// Whether the column is an identity column.
    pub fn is_identity(&self) -> bool {
        self.attributes.contains(ColumnAttributes::IDENTITY)
    }

    /// Whether the column is computed by the database.
    pub fn is_computed(&self) -> bool {
        self.attributes.contains(ColumnAttributes::COMPUTED)
    }

    /// Whether the column stores unicode text.
    pub fn is_unicode(&self) -> bool {
        self.attributes.contains(ColumnAttributes::UNICODE) || self.column_type.is_unicode()
    }
}

/// Index metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    /// Index name.
    pub name: String,

    /// Indexed column names.
    pub columns: Vec<String>,

    /// Whether the index is unique.
    pub unique: bool,

    /// Whether the index backs the primary key (never re-emitted).
    pub primary_key: bool,
}

/// Foreign key metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name.
    pub name: String,

    /// Local column names.
    pub columns: Vec<String>,

    /// Referenced table name.
    pub related_table: String,

    /// Referenced table owner.
    pub related_owner: String,

    /// Referenced column names.
    pub related_columns: Vec<String>,

    /// ON UPDATE action.
    pub update_rule: ForeignKeyRule,

    /// ON DELETE action.
    pub delete_rule: ForeignKeyRule,
}

/// Check constraint metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckConstraint {
    /// Constraint name.
    pub name: String,

    /// Constraint expression as portable SQL text.
    pub expression: String,

    /// Parsed expression, rendered with the target's quoting on output.
    /// `None` when the source text did not parse and is carried verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expr: Option<Expr>,
}

impl CheckConstraint {
    pub fn from_expr(name: impl Into<String>, expr: Expr) -> Self {
        Self {
            name: name.into(),
            expression: expr.to_string(),
            expr: Some(expr),
        }
    }

    /// Build from catalog text, normalized through the DDL parser.
    ///
    /// `([qty]>(0))` becomes `qty > 0`. Definitions the parser does not
    /// accept are kept verbatim.
    pub fn parse(name: impl Into<String>, definition: &str) -> Self {
        match Parser::new(definition).expression() {
            Ok(expr) => Self::from_expr(name, expr),
            Err(e) => {
                debug!("Keeping check constraint verbatim ({}): {}", e, definition);
                Self {
                    name: name.into(),
                    expression: definition.to_string(),
                    expr: None,
                }
            }
        }
    }
}

/// A user-defined domain drawing its values from a fixed list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataType {
    /// Type name.
    pub name: String,

    /// Owner / schema.
    pub owner: String,

    /// Backing portable type (usually VarChar).
    pub base_type: ColumnType,

    /// Allowed literal values, in declaration order.
    pub values: Vec<String>,

    /// `true` for an enumeration (one value), `false` for a set (several values).
    pub enumerated: bool,
}

impl DataType {
    /// Length of the longest value (the size a set needs is the joined list).
    pub fn max_value_len(&self) -> usize {
        if self.enumerated {
            self.values.iter().map(|v| v.chars().count()).max().unwrap_or(0)
        } else {
            self.values.iter().map(|v| v.chars().count() + 1).sum()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_table() -> Table {
        let mut table = Table::new("Orders", "dbo");
        let mut id = Column::new("Id", ColumnType::Int);
        id.attributes = ColumnAttributes::REQUIRED | ColumnAttributes::IDENTITY;
        table.columns.push(id);
        table.columns.push(Column::new("Note", ColumnType::NVarChar));
        table.primary_key = Some(PrimaryKey {
            name: "PK_Orders".to_string(),
            columns: vec!["Id".to_string()],
        });
        table
    }

    #[test]
    fn test_table_full_name() {
        let table = make_test_table();
        assert_eq!(table.full_name(), "dbo.Orders");
        assert_eq!(Table::new("t", "").full_name(), "t");
    }

    #[test]
    fn test_table_lookup_helpers() {
        let table = make_test_table();
        assert!(table.has_pk());
        assert!(table.has_identity());
        assert!(table.is_single_pk_column("id"));
        assert!(!table.is_single_pk_column("Note"));
        assert!(table.column("NOTE").is_some());
    }

    #[test]
    fn test_column_attributes() {
        let table = make_test_table();
        let id = table.column("Id").unwrap();
        assert!(!id.is_nullable());
        assert!(id.is_identity());
        let note = table.column("Note").unwrap();
        assert!(note.is_nullable());
        assert!(note.is_unicode());
    }

    #[test]
    fn test_database_lookup() {
        let mut db = Database::new("shop");
        db.tables.push(make_test_table());
        let mut hidden = Table::new("Audit", "dbo");
        hidden.checked = false;
        db.tables.push(hidden);
        db.types.push(DataType {
            name: "mood".to_string(),
            owner: "public".to_string(),
            base_type: ColumnType::VarChar,
            values: vec!["sad".to_string(), "happy".to_string()],
            enumerated: true,
        });

        assert!(db.table("Orders", "dbo").is_some());
        assert!(db.table("Orders", "").is_some());
        assert!(db.table("Orders", "sales").is_none());
        assert_eq!(db.checked_tables().count(), 1);
        assert_eq!(db.data_type("MOOD").unwrap().max_value_len(), 5);
    }

    #[test]
    fn test_check_constraint_parse() {
        let check = CheckConstraint::parse("ck_qty", "([qty]>(0))");
        assert_eq!(check.expression, "qty > 0");
        assert!(check.expr.is_some());

        let check = CheckConstraint::parse("ck_price", "([price]>=(0) AND [price]<(1000))");
        assert_eq!(check.expression, "(price >= 0) AND (price < 1000)");

        let check = CheckConstraint::parse("ck_range", "([a] BETWEEN 1 AND 2)");
        assert_eq!(check.expression, "([a] BETWEEN 1 AND 2)");
        assert!(check.expr.is_none());
    }

    #[test]
    fn test_set_value_len() {
        let set = DataType {
            name: "flags".to_string(),
            owner: String::new(),
            base_type: ColumnType::VarChar,
            values: vec!["a".to_string(), "bb".to_string()],
            enumerated: false,
        };
        assert_eq!(set.max_value_len(), 5);
    }
}
