//! Core abstractions for dialect-neutral schema translation.
//!
//! This module provides the foundational types and traits used throughout
//! the translator:
//!
//! - [`types`]: the portable column type set and its attribute flags
//! - [`value`]: typed literals for defaults and data rows
//! - [`schema`]: the in-memory model (database, tables, columns, constraints)
//! - [`meta`]: per-object answers returned by schema providers
//! - [`identifier`]: identifier validation and quoting
//! - [`traits`]: [`SchemaProvider`] and [`SqlDialect`]
//!
//! # Architecture
//!
//! Providers (`drivers/*/reader.rs`) translate native catalogs into the model;
//! generators (`drivers/*/generator.rs`) translate the model into DDL. Nothing
//! in this module knows about a particular dialect.

pub mod identifier;
pub mod meta;
pub mod schema;
pub mod traits;
pub mod types;
pub mod value;

// Re-export commonly used types for convenience
pub use meta::{ColumnMeta, ForeignKeyMeta, IndexMeta, ObjectName, TableMeta, TypeMeta};
pub use schema::{
    CheckConstraint, Column, DataType, Database, ForeignKey, Identity, Index, PrimaryKey, Table,
};
pub use traits::{SchemaProvider, SqlDialect};
pub use types::{ColumnAttributes, ColumnType, ForeignKeyRule, MappedType};
pub use value::Value;
