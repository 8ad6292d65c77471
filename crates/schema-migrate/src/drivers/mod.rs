//! Database drivers: one schema provider and one generator strategy per dialect.
//!
//! - [`mssql`]: SQL Server (tiberius + bb8)
//! - [`postgres`]: PostgreSQL (tokio-postgres + deadpool-postgres)
//! - [`mysql`]: MySQL / MariaDB (sqlx)
//! - [`sqlite`]: SQLite (sqlx, tables rebuilt through the DDL parser)
//!
//! Each driver module contains:
//! - `types.rs`: native type → [`ColumnType`](crate::core::ColumnType) mapping
//!   and catalog default unwrapping
//! - `reader.rs`: the [`SchemaProvider`] implementation
//! - `generator.rs`: the [`SqlDialect`] strategy
//!
//! # Dispatch
//!
//! [`DialectKind`] is the closed set of dialects. Generators are selected
//! statically through [`GeneratorDialect`]; providers are boxed because
//! their constructors are async and hold connection pools.

pub mod mssql;
pub mod mysql;
pub mod postgres;
pub mod sqlite;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::SourceConfig;
use crate::core::traits::{SchemaProvider, SqlDialect};
use crate::error::{MigrateError, Result};

pub use mssql::{MssqlDialect, MssqlProvider};
pub use mysql::{MysqlDialect, MysqlProvider};
pub use postgres::{PostgresDialect, PostgresProvider};
pub use sqlite::{SqliteDialect, SqliteProvider};

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DialectKind {
    Mssql,
    Postgres,
    Mysql,
    Sqlite,
}

impl DialectKind {
    /// Every dialect, in display order.
    pub const ALL: [DialectKind; 4] = [
        DialectKind::Mssql,
        DialectKind::Postgres,
        DialectKind::Mysql,
        DialectKind::Sqlite,
    ];

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            DialectKind::Mssql => "mssql",
            DialectKind::Postgres => "postgres",
            DialectKind::Mysql => "mysql",
            DialectKind::Sqlite => "sqlite",
        }
    }

    /// Alternative names accepted by [`FromStr`].
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            DialectKind::Mssql => &["sqlserver", "sql_server"],
            DialectKind::Postgres => &["postgresql", "pg"],
            DialectKind::Mysql => &["mariadb"],
            DialectKind::Sqlite => &["sqlite3"],
        }
    }

    /// Default TCP port, `None` for file-based dialects.
    pub fn default_port(self) -> Option<u16> {
        match self {
            DialectKind::Mssql => Some(1433),
            DialectKind::Postgres => Some(5432),
            DialectKind::Mysql => Some(3306),
            DialectKind::Sqlite => None,
        }
    }

    /// Generator strategy for this dialect.
    pub fn generator(self) -> GeneratorDialect {
        match self {
            DialectKind::Mssql => GeneratorDialect::Mssql(MssqlDialect::new()),
            DialectKind::Postgres => GeneratorDialect::Postgres(PostgresDialect::new()),
            DialectKind::Mysql => GeneratorDialect::Mysql(MysqlDialect::new()),
            DialectKind::Sqlite => GeneratorDialect::Sqlite(SqliteDialect::new()),
        }
    }

    /// Connect a schema provider for this dialect.
    pub async fn connect(self, config: &SourceConfig) -> Result<Box<dyn SchemaProvider>> {
        let provider: Box<dyn SchemaProvider> = match self {
            DialectKind::Mssql => Box::new(MssqlProvider::new(config).await?),
            DialectKind::Postgres => Box::new(PostgresProvider::new(config).await?),
            DialectKind::Mysql => Box::new(MysqlProvider::new(config).await?),
            DialectKind::Sqlite => Box::new(SqliteProvider::new(config).await?),
        };
        Ok(provider)
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DialectKind {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        DialectKind::ALL
            .into_iter()
            .find(|kind| kind.name() == lower || kind.aliases().contains(&lower.as_str()))
            .ok_or_else(|| {
                MigrateError::Config(format!(
                    "Unknown dialect: '{}'. Supported dialects: mssql, postgres, mysql, sqlite",
                    s
                ))
            })
    }
}

impl TryFrom<String> for DialectKind {
    type Error = MigrateError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<DialectKind> for String {
    fn from(kind: DialectKind) -> Self {
        kind.name().to_string()
    }
}

/// Enum-based static dispatch for generator strategies.
#[derive(Debug, Clone)]
pub enum GeneratorDialect {
    Mssql(MssqlDialect),
    Postgres(PostgresDialect),
    Mysql(MysqlDialect),
    Sqlite(SqliteDialect),
}

impl GeneratorDialect {
    /// The strategy as a trait object for the generator.
    pub fn strategy(&self) -> &dyn SqlDialect {
        match self {
            GeneratorDialect::Mssql(d) => d,
            GeneratorDialect::Postgres(d) => d,
            GeneratorDialect::Mysql(d) => d,
            GeneratorDialect::Sqlite(d) => d,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("mssql".parse::<DialectKind>().unwrap(), DialectKind::Mssql);
        assert_eq!("SqlServer".parse::<DialectKind>().unwrap(), DialectKind::Mssql);
        assert_eq!("postgresql".parse::<DialectKind>().unwrap(), DialectKind::Postgres);
        assert_eq!("pg".parse::<DialectKind>().unwrap(), DialectKind::Postgres);
        assert_eq!("mariadb".parse::<DialectKind>().unwrap(), DialectKind::Mysql);
        assert_eq!("sqlite3".parse::<DialectKind>().unwrap(), DialectKind::Sqlite);

        let err = "oracle".parse::<DialectKind>().unwrap_err();
        assert!(err.to_string().contains("Unknown dialect"));
    }

    #[test]
    fn test_dialect_display_roundtrip() {
        for kind in DialectKind::ALL {
            assert_eq!(kind.to_string().parse::<DialectKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_generator_dispatch() {
        for kind in DialectKind::ALL {
            assert_eq!(kind.generator().strategy().kind(), kind);
        }
    }

    #[test]
    fn test_default_ports() {
        assert_eq!(DialectKind::Mssql.default_port(), Some(1433));
        assert_eq!(DialectKind::Sqlite.default_port(), None);
    }
}
