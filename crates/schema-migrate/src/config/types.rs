//! Configuration type definitions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::drivers::DialectKind;
use crate::generator::options::{DialectOptions, ExportFlags, ExportOptions};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database whose schema is read.
    pub source: SourceConfig,

    /// Dialect the script is generated for.
    pub target: TargetConfig,

    /// What to emit.
    #[serde(default)]
    pub export: ExportConfig,
}

/// Source database connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Source dialect.
    pub dialect: DialectKind,

    /// Database host.
    #[serde(default)]
    pub host: String,

    /// Database port (dialect default when omitted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Database name.
    #[serde(default)]
    pub database: String,

    /// Username.
    #[serde(default)]
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Owner / schema filter; all user schemas when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Database file (SQLite only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Encrypt the SQL Server connection (default: false).
    #[serde(default)]
    pub encrypt: bool,

    /// Trust the SQL Server certificate without validation (default: false).
    #[serde(default)]
    pub trust_server_cert: bool,
}

impl SourceConfig {
    /// Configured port, or the dialect's default.
    pub fn port(&self) -> u16 {
        self.port
            .or_else(|| self.dialect.default_port())
            .unwrap_or_default()
    }
}

/// Target dialect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Target dialect.
    pub dialect: DialectKind,

    /// Name used by the create-database directive (defaults to the source name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// Export behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Emit DDL (default: true).
    #[serde(default = "default_true")]
    pub schema: bool,

    /// Emit INSERT statements (default: false).
    #[serde(default)]
    pub data: bool,

    /// Emit the create-database directive (default: false).
    #[serde(default)]
    pub create_database: bool,

    #[serde(default = "default_true")]
    pub primary_keys: bool,

    #[serde(default = "default_true")]
    pub foreign_keys: bool,

    #[serde(default = "default_true")]
    pub indexes: bool,

    #[serde(default = "default_true")]
    pub defaults: bool,

    #[serde(default = "default_true")]
    pub identities: bool,

    /// Tables to include; empty means all.
    #[serde(default)]
    pub tables: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mysql: Option<MysqlOptions>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postgres: Option<PostgresOptions>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mssql: Option<MssqlOptions>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            schema: true,
            data: false,
            create_database: false,
            primary_keys: true,
            foreign_keys: true,
            indexes: true,
            defaults: true,
            identities: true,
            tables: Vec::new(),
            mysql: None,
            postgres: None,
            mssql: None,
        }
    }
}

impl ExportConfig {
    /// Object flags selected by the boolean switches.
    pub fn flags(&self) -> ExportFlags {
        let mut flags = ExportFlags::empty();
        flags.set(ExportFlags::PRIMARY_KEYS, self.primary_keys);
        flags.set(ExportFlags::FOREIGN_KEYS, self.foreign_keys);
        flags.set(ExportFlags::INDEXES, self.indexes);
        flags.set(ExportFlags::DEFAULTS, self.defaults);
        flags.set(ExportFlags::IDENTITIES, self.identities);
        flags
    }

    /// Generator options for `target`, picking that dialect's settings.
    pub fn to_options(&self, target: DialectKind, database_name: Option<String>) -> ExportOptions {
        let dialect_options = match target {
            DialectKind::Mysql => self
                .mysql
                .clone()
                .map(|o| DialectOptions::Mysql {
                    engine: o.engine,
                    charset: o.charset,
                    collation: o.collation,
                })
                .unwrap_or_default(),
            DialectKind::Postgres => self
                .postgres
                .clone()
                .map(|o| DialectOptions::Postgres {
                    owner: o.owner,
                    encoding: o.encoding,
                })
                .unwrap_or_default(),
            DialectKind::Mssql => self
                .mssql
                .clone()
                .map(|o| DialectOptions::Mssql {
                    collation: o.collation,
                })
                .unwrap_or_default(),
            DialectKind::Sqlite => DialectOptions::None,
        };

        ExportOptions {
            flags: self.flags(),
            export_schema: self.schema,
            export_data: self.data,
            create_database: self.create_database,
            database_name,
            dialect_options,
        }
    }

    /// Whether `table` passes the include list.
    pub fn includes(&self, table: &str) -> bool {
        self.tables.is_empty() || self.tables.iter().any(|t| t.eq_ignore_ascii_case(table))
    }
}

/// MySQL table and database options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MysqlOptions {
    pub engine: Option<String>,
    pub charset: Option<String>,
    pub collation: Option<String>,
}

/// PostgreSQL database options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostgresOptions {
    pub owner: Option<String>,
    pub encoding: Option<String>,
}

/// SQL Server database options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MssqlOptions {
    pub collation: Option<String>,
}

fn default_true() -> bool {
    true
}
