//! Configuration validation.

use super::Config;
use crate::drivers::DialectKind;
use crate::error::{MigrateError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    let source = &config.source;

    // Source validation
    if source.dialect == DialectKind::Sqlite {
        if source.path.is_none() {
            return Err(MigrateError::Config(
                "source.path is required for sqlite".into(),
            ));
        }
    } else {
        if source.host.is_empty() {
            return Err(MigrateError::Config("source.host is required".into()));
        }
        if source.database.is_empty() {
            return Err(MigrateError::Config("source.database is required".into()));
        }
        if source.user.is_empty() {
            return Err(MigrateError::Config("source.user is required".into()));
        }
    }
    if let Some(0) = source.port {
        return Err(MigrateError::Config("source.port must not be 0".into()));
    }

    // Target validation
    if let Some(name) = &config.target.database {
        if name.trim().is_empty() {
            return Err(MigrateError::Config(
                "target.database must not be empty when set".into(),
            ));
        }
    }

    // Export validation
    let export = &config.export;
    if !export.schema && !export.data {
        return Err(MigrateError::Config(
            "export.schema or export.data must be enabled".into(),
        ));
    }
    if export.tables.iter().any(|t| t.trim().is_empty()) {
        return Err(MigrateError::Config(
            "export.tables must not contain empty names".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExportConfig, SourceConfig, TargetConfig};

    fn valid_config() -> Config {
        Config {
            source: SourceConfig {
                dialect: DialectKind::Postgres,
                host: "localhost".to_string(),
                port: None,
                database: "source_db".to_string(),
                user: "postgres".to_string(),
                password: "password".to_string(),
                schema: Some("public".to_string()),
                path: None,
                encrypt: false,
                trust_server_cert: false,
            },
            target: TargetConfig {
                dialect: DialectKind::Mssql,
                database: None,
            },
            export: ExportConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_source_host() {
        let mut config = valid_config();
        config.source.host = String::new();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("source.host is required"));
    }

    #[test]
    fn test_missing_source_user() {
        let mut config = valid_config();
        config.source.user = String::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_sqlite_requires_path() {
        let mut config = valid_config();
        config.source.dialect = DialectKind::Sqlite;
        config.source.host = String::new();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("source.path is required"));

        config.source.path = Some("app.db".into());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_nothing_to_export() {
        let mut config = valid_config();
        config.export.schema = false;
        config.export.data = false;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("export.schema or export.data"));
    }

    #[test]
    fn test_empty_table_name() {
        let mut config = valid_config();
        config.export.tables = vec!["orders".into(), " ".into()];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_port() {
        let mut config = valid_config();
        config.source.port = Some(0);
        assert!(validate(&config).is_err());
    }
}
