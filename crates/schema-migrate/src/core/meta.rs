//! Metadata records returned by schema providers.
//!
//! Providers answer fine-grained questions (one table, one column, one index)
//! with these plain records; the model builder assembles them into the
//! portable [`Database`](super::schema::Database).

use serde::{Deserialize, Serialize};

use super::schema::Identity;
use super::types::{ColumnAttributes, ColumnType, ForeignKeyRule};
use super::value::Value;

/// A catalog object addressed by name and owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectName {
    pub name: String,
    pub owner: String,
}

impl ObjectName {
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
        }
    }
}

/// Table-level facts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableMeta {
    pub name: String,
    pub owner: String,
    /// Primary key constraint name (empty when unnamed or absent).
    pub pk_name: String,
    /// Primary key columns in key order (empty when the table has no key).
    pub pk_columns: Vec<String>,
}

/// Column facts, already mapped into the portable type system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub column_type: ColumnType,
    pub native_type: String,
    pub size: u32,
    pub precision: u8,
    pub scale: u8,
    pub default_value: Option<Value>,
    pub description: Option<String>,
    pub attributes: ColumnAttributes,
    pub identity: Option<Identity>,
}

impl ColumnMeta {
    /// Column meta for `column_type` with no size, default or attributes.
    pub fn new(column_type: ColumnType, native_type: impl Into<String>) -> Self {
        Self {
            column_type,
            native_type: native_type.into(),
            size: 0,
            precision: 0,
            scale: 0,
            default_value: None,
            description: None,
            attributes: ColumnAttributes::NONE,
            identity: None,
        }
    }
}

/// Index facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub unique: bool,
    pub primary_key: bool,
    pub columns: Vec<String>,
}

/// Foreign key facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyMeta {
    pub columns: Vec<String>,
    pub related_table: String,
    pub related_owner: String,
    pub related_columns: Vec<String>,
    pub update_rule: ForeignKeyRule,
    pub delete_rule: ForeignKeyRule,
}

/// Facts about an enumerated or set domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeMeta {
    pub base_type: ColumnType,
    pub values: Vec<String>,
    pub enumerated: bool,
}
