//! SQLite database driver.
//!
//! This module provides SQLite-specific implementations for:
//! - [`SqliteDialect`]: generation strategy
//! - [`SqliteProvider`]: schema provider over a database file
//!
//! # Connection
//!
//! SQLite sources are opened read-only from `source.path`; host, port and
//! credentials are ignored.

mod generator;
mod reader;
pub mod types;

pub use generator::SqliteDialect;
pub use reader::SqliteProvider;
