//! # schema-migrate
//!
//! Translate relational schemas (and optionally their data) between SQL
//! dialects.
//!
//! The library is a small retargetable compiler for DDL:
//!
//! - **Front ends** ([`SchemaProvider`]) read native catalogs of SQL Server,
//!   PostgreSQL, MySQL/MariaDB and SQLite. SQLite tables are rebuilt from their
//!   stored `CREATE TABLE` text through the [`parser`].
//! - **The portable model** ([`Database`], [`Table`], [`Column`], ...) holds
//!   the dialect-neutral schema.
//! - **Back ends** ([`SqlDialect`] strategies driven by [`Generator`]) emit
//!   DDL and `INSERT` statements for the target dialect.
//!
//! ## Example
//!
//! ```rust,no_run
//! use schema_migrate::{pipeline, Config};
//!
//! #[tokio::main]
//! async fn main() -> schema_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let report = pipeline::convert(&config, std::io::stdout()).await?;
//!     eprintln!("Generated {} tables", report.tables);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod generator;
pub mod parser;
pub mod pipeline;

// Re-exports for convenient access
pub use config::{Config, ExportConfig, SourceConfig, TargetConfig};
pub use core::{
    Column, ColumnAttributes, ColumnType, Database, ForeignKey, Index, SchemaProvider, SqlDialect,
    Table, Value,
};
pub use drivers::DialectKind;
pub use error::{MigrateError, Result};
pub use generator::{DirectiveStatus, ExportFlags, ExportOptions, GenerationReport, Generator};
pub use parser::{parse_create_table, Parser};
