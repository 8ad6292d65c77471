//! Error types for the schema migration library.

use thiserror::Error;

/// Main error type for schema migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// DDL text could not be scanned into tokens.
    #[error("Lexical error at offset {position}: {message}")]
    Lexical { position: usize, message: String },

    /// Token stream does not match the accepted grammar.
    #[error("Syntax error at offset {position}: {message}")]
    Syntax { position: usize, message: String },

    /// Native catalog access failed.
    #[error("Schema provider error: {0}")]
    Provider(String),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// SQL Server driver error
    #[error("SQL Server error: {0}")]
    Mssql(#[from] tiberius::error::Error),

    /// PostgreSQL driver error
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// MySQL / SQLite driver error
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// A literal could not be converted to the column's portable type.
    #[error("Invalid {column_type} value '{text}'")]
    InvalidValue { column_type: String, text: String },

    /// The target dialect cannot express a construct of the model.
    #[error("Generation failed: {0}")]
    Generate(String),

    /// IO error (file operations, output sink)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl ToString, context: impl Into<String>) -> Self {
        MigrateError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a lexical error at the given byte offset.
    pub fn lexical(position: usize, message: impl Into<String>) -> Self {
        MigrateError::Lexical {
            position,
            message: message.into(),
        }
    }

    /// Create a syntax error at the given byte offset.
    pub fn syntax(position: usize, message: impl Into<String>) -> Self {
        MigrateError::Syntax {
            position,
            message: message.into(),
        }
    }

    /// Create an InvalidValue error
    pub fn invalid_value(column_type: impl ToString, text: impl Into<String>) -> Self {
        MigrateError::InvalidValue {
            column_type: column_type.to_string(),
            text: text.into(),
        }
    }

    /// True for errors raised by the lexer or parser.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            MigrateError::Lexical { .. } | MigrateError::Syntax { .. }
        )
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) => 1,
            MigrateError::Lexical { .. } | MigrateError::Syntax { .. } => 2,
            MigrateError::Provider(_)
            | MigrateError::Pool { .. }
            | MigrateError::Mssql(_)
            | MigrateError::Postgres(_)
            | MigrateError::Sqlx(_)
            | MigrateError::InvalidValue { .. } => 3,
            MigrateError::Generate(_) | MigrateError::Io(_) | MigrateError::Json(_) => 4,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        // Add error chain for wrapped errors
        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for schema migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(MigrateError::Config("x".into()).exit_code(), 1);
        assert_eq!(MigrateError::syntax(3, "expected ')'").exit_code(), 2);
        assert_eq!(MigrateError::lexical(0, "bad char").exit_code(), 2);
        assert_eq!(MigrateError::Provider("down".into()).exit_code(), 3);
        assert_eq!(MigrateError::Generate("nope".into()).exit_code(), 4);
    }

    #[test]
    fn test_parse_error_display() {
        let err = MigrateError::syntax(12, "expected ')'");
        assert!(err.is_parse_error());
        assert_eq!(err.to_string(), "Syntax error at offset 12: expected ')'");
        assert!(!MigrateError::Provider("x".into()).is_parse_error());
    }

    #[test]
    fn test_format_detailed() {
        let err = MigrateError::pool("timed out", "creating MySQL source pool");
        let detailed = err.format_detailed();
        assert!(detailed.starts_with("Error: Pool error: timed out"));
        assert!(detailed.contains("creating MySQL source pool"));
    }
}
