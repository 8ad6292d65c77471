//! Identifier validation and quoting for emitted DDL.
//!
//! Every generator routes table, column, index and constraint names through
//! this module so the escaping rules of each dialect live in one place:
//!
//! | Dialect    | Delimiters  | Escape      |
//! |------------|-------------|-------------|
//! | SQL Server | `[name]`    | `]` → `]]`  |
//! | PostgreSQL | `"name"`    | `"` → `""`  |
//! | SQLite     | `"name"`    | `"` → `""`  |
//! | MySQL      | `` `name` ``| `` ` `` → ``` `` ``` |
//!
//! Identifiers coming out of a source catalog are trusted to be names, but
//! they still pass through [`validate_identifier`] so a NUL byte or an absurd
//! length fails the export instead of producing a broken script.

use crate::error::{MigrateError, Result};

/// Maximum identifier length accepted (SQL Server allows 128 characters).
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier before it is quoted.
///
/// # Errors
///
/// Returns `MigrateError::Generate` when the name is empty, contains a NUL
/// byte or is longer than the longest identifier any dialect accepts.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MigrateError::Generate(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(MigrateError::Generate(format!(
            "Identifier contains a null byte: {:?}",
            name
        )));
    }

    if name.chars().count() > MAX_IDENTIFIER_LENGTH {
        return Err(MigrateError::Generate(format!(
            "Identifier exceeds maximum length of {} characters: {:?}",
            MAX_IDENTIFIER_LENGTH, name
        )));
    }

    Ok(())
}

/// Quote with ANSI double quotes (PostgreSQL, SQLite).
pub fn quote_ansi(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Quote a MySQL identifier using backticks.
pub fn quote_mysql(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("`{}`", name.replace('`', "``")))
}

/// Quote a SQL Server identifier using brackets.
pub fn quote_mssql(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("[{}]", name.replace(']', "]]")))
}

/// Quote a list of column names with `quote` and join them with `", "`.
pub fn quote_list<F>(names: &[String], quote: F) -> Result<String>
where
    F: Fn(&str) -> Result<String>,
{
    let quoted = names
        .iter()
        .map(|n| quote(n))
        .collect::<Result<Vec<_>>>()?;
    Ok(quoted.join(", "))
}

/// Escape a string for use inside a single-quoted SQL literal.
pub fn escape_string(text: &str) -> String {
    text.replace('\'', "''")
}

/// Validate a check constraint expression carried between databases.
///
/// Expressions come from a source catalog (or a parsed `CREATE TABLE`) and
/// should be a single boolean expression. Statement separators and comment
/// markers outside of string literals are rejected.
pub fn validate_check_expression(expression: &str) -> Result<()> {
    let mut in_string = false;
    let mut prev = '\0';
    for ch in expression.chars() {
        if ch == '\'' {
            in_string = !in_string;
        } else if !in_string {
            let comment = (prev == '-' && ch == '-') || (prev == '/' && ch == '*');
            if ch == ';' || comment {
                return Err(MigrateError::Generate(format!(
                    "Check constraint is not a single expression: {:?}",
                    expression
                )));
            }
        }
        prev = ch;
    }
    Ok(())
}
