//! MySQL type mapping, `COLUMN_DEFAULT` unwrapping and check rewriting.

use tracing::debug;

use crate::core::types::{catalog_digits, catalog_size, ColumnType, MappedType};
use crate::core::value::Value;
use crate::error::{MigrateError, Result};
use crate::parser::{tokenize, Token};

/// Map an `INFORMATION_SCHEMA.COLUMNS` row into the portable type system.
///
/// `data_type` is `DATA_TYPE` (`int`), `column_type` is `COLUMN_TYPE`
/// (`int(10) unsigned`), which carries signedness and the `tinyint(1)`
/// boolean convention.
pub fn map_native_type(
    data_type: &str,
    column_type: &str,
    max_length: i64,
    precision: i64,
    scale: i64,
) -> MappedType {
    let data_type = data_type.to_lowercase();
    let column_type = column_type.to_lowercase();
    let unsigned = column_type.contains("unsigned");

    let signed_or = |signed: ColumnType, unsigned_ty: ColumnType| {
        MappedType::plain(if unsigned { unsigned_ty } else { signed })
    };

    match data_type.as_str() {
        // Boolean
        "bool" | "boolean" => MappedType::plain(ColumnType::Boolean),
        "tinyint" if column_type.starts_with("tinyint(1)") && !unsigned => {
            MappedType::plain(ColumnType::Boolean)
        }

        // Integers
        "tinyint" => signed_or(ColumnType::TinyInt, ColumnType::UnsignedTinyInt),
        "smallint" => signed_or(ColumnType::SmallInt, ColumnType::UnsignedSmallInt),
        "mediumint" | "int" | "integer" => signed_or(ColumnType::Int, ColumnType::UnsignedInt),
        "bigint" => signed_or(ColumnType::BigInt, ColumnType::UnsignedBigInt),
        "year" => MappedType::plain(ColumnType::SmallInt),

        // Floating point
        "float" => MappedType::plain(ColumnType::Float),
        "double" | "real" | "double precision" => MappedType::plain(ColumnType::Double),

        // Exact numerics
        "decimal" | "numeric" | "dec" | "fixed" => {
            MappedType::numeric(catalog_digits(precision), catalog_digits(scale))
        }

        // Date/time
        "date" => MappedType::plain(ColumnType::Date),
        "time" => MappedType::plain(ColumnType::Time),
        "datetime" | "timestamp" => MappedType::plain(ColumnType::DateTime),

        // Character
        "char" => MappedType::sized(ColumnType::Char, catalog_size(max_length)),
        "varchar" => MappedType::sized(ColumnType::VarChar, catalog_size(max_length)),
        "tinytext" | "text" | "mediumtext" | "longtext" => MappedType::plain(ColumnType::Text),

        // Binary
        "bit" => MappedType::sized(ColumnType::Bit, catalog_size(precision).max(1)),
        "binary" | "varbinary" => MappedType::sized(ColumnType::Blob, catalog_size(max_length)),
        "tinyblob" | "blob" | "mediumblob" | "longblob" => MappedType::plain(ColumnType::Blob),

        // Special
        "json" => MappedType::plain(ColumnType::Json),
        "enum" | "set" => MappedType::plain(ColumnType::UserDefined),
        "geometry" | "point" | "linestring" | "polygon" | "multipoint" | "multilinestring"
        | "multipolygon" | "geometrycollection" => MappedType::plain(ColumnType::Geometry),

        _ => MappedType::plain(ColumnType::Unknown)
            .lossy(format!("unrecognized MySQL type '{}' copied verbatim", column_type)),
    }
}

/// Decode `enum('a','b')` / `set('x','y')` into (enumerated, values).
pub fn domain_values(column_type: &str) -> Result<(bool, Vec<String>)> {
    let tokens = tokenize(column_type)?;
    let mut iter = tokens.into_iter();

    let enumerated = match iter.next() {
        Some(Token::Ident(word)) if word.eq_ignore_ascii_case("enum") => true,
        Some(Token::Ident(word)) if word.eq_ignore_ascii_case("set") => false,
        _ => {
            return Err(MigrateError::Provider(format!(
                "Not an enum or set column type: {}",
                column_type
            )))
        }
    };

    let mut values = Vec::new();
    for token in iter {
        match token {
            Token::Str(value) => values.push(value),
            Token::LParen | Token::RParen | Token::Comma => {}
            other => {
                return Err(MigrateError::Provider(format!(
                    "Unexpected {} in column type {}",
                    other, column_type
                )))
            }
        }
    }
    Ok((enumerated, values))
}

/// Unwrap a `COLUMN_DEFAULT` string.
///
/// MySQL reports literals bare (`abc`, `5`) and MariaDB quotes them (`'abc'`);
/// both report bit defaults as `b'101'`. Expression defaults are flagged by
/// `DEFAULT_GENERATED` in `EXTRA` and yield `None`.
pub fn default_value(raw: &str, column_type: ColumnType, is_expression: bool) -> Option<Value> {
    if is_expression || raw.eq_ignore_ascii_case("NULL") {
        debug!("Ignoring MySQL expression default: {}", raw);
        return None;
    }

    let text = if let Some(bits) = strip_quoted(raw, "b'").or_else(|| strip_quoted(raw, "B'")) {
        bits
    } else if let Some(inner) = strip_quoted(raw, "'") {
        inner.replace("''", "'").replace("\\'", "'").replace("\\\\", "\\")
    } else {
        let lower = raw.to_lowercase();
        if lower.starts_with("current_timestamp") || lower.ends_with("()") {
            debug!("Ignoring MySQL function default: {}", raw);
            return None;
        }
        raw.to_string()
    };

    match Value::parse_literal(column_type, &text) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Ignoring MySQL default {}: {}", raw, e);
            None
        }
    }
}

fn strip_quoted(raw: &str, open: &str) -> Option<String> {
    raw.strip_prefix(open)
        .and_then(|rest| rest.strip_suffix('\''))
        .map(str::to_string)
}

/// Rewrite a `CHECK_CLAUSE` into the portable grammar.
///
/// Charset introducers are dropped and backslash escapes inside string
/// literals become standard SQL: ``(`kind` in (_utf8mb4'a',_utf8mb4'it\'s'))``
/// becomes ``(`kind` in ('a','it''s'))``.
pub fn check_definition(clause: &str) -> String {
    let mut out = String::with_capacity(clause.len());
    let mut chars = clause.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\'' => {
                out.push('\'');
                while let Some(ch) = chars.next() {
                    match ch {
                        '\\' => match chars.next() {
                            Some('\'') => out.push_str("''"),
                            Some(other) => out.push(other),
                            None => {}
                        },
                        '\'' if chars.peek() == Some(&'\'') => {
                            chars.next();
                            out.push_str("''");
                        }
                        '\'' => {
                            out.push('\'');
                            break;
                        }
                        other => out.push(other),
                    }
                }
            }
            '`' => {
                out.push('`');
                for ch in chars.by_ref() {
                    out.push(ch);
                    if ch == '`' {
                        break;
                    }
                }
            }
            '_' if !out.ends_with(|c: char| c.is_alphanumeric() || c == '_') => {
                let mut word = String::from('_');
                while let Some(&next) = chars.peek() {
                    if next.is_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if chars.peek() != Some(&'\'') {
                    out.push_str(&word);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_signedness() {
        assert_eq!(
            map_native_type("tinyint", "tinyint(3) unsigned", 0, 3, 0).column_type,
            ColumnType::UnsignedTinyInt
        );
        assert_eq!(
            map_native_type("tinyint", "tinyint(1)", 0, 3, 0).column_type,
            ColumnType::Boolean
        );
        assert_eq!(
            map_native_type("bigint", "bigint unsigned", 0, 20, 0).column_type,
            ColumnType::UnsignedBigInt
        );
        assert_eq!(
            map_native_type("int", "int", 0, 10, 0).column_type,
            ColumnType::Int
        );
    }

    #[test]
    fn test_map_sizes() {
        let varchar = map_native_type("varchar", "varchar(80)", 80, 0, 0);
        assert_eq!((varchar.column_type, varchar.size), (ColumnType::VarChar, 80));
        let dec = map_native_type("decimal", "decimal(12,3)", 0, 12, 3);
        assert_eq!((dec.precision, dec.scale), (12, 3));
        let bits = map_native_type("bit", "bit(5)", 0, 5, 0);
        assert_eq!((bits.column_type, bits.size), (ColumnType::Bit, 5));
    }

    #[test]
    fn test_mapping_is_total_over_fixture() {
        let fixture = [
            "bool", "tinyint", "smallint", "mediumint", "int", "bigint", "year", "float",
            "double", "decimal", "date", "time", "datetime", "timestamp", "char", "varchar",
            "text", "longtext", "bit", "binary", "varbinary", "blob", "longblob", "json",
            "enum", "set", "geometry", "point",
        ];
        for name in fixture {
            let mapped = map_native_type(name, name, 10, 10, 0);
            assert_ne!(mapped.column_type, ColumnType::Unknown, "{}", name);
        }
        let unknown = map_native_type("vector", "vector(3)", 0, 0, 0);
        assert_eq!(unknown.column_type, ColumnType::Unknown);
        assert!(unknown.warning.is_some());
    }

    #[test]
    fn test_domain_values() {
        let (enumerated, values) = domain_values("enum('small','it''s','large')").unwrap();
        assert!(enumerated);
        assert_eq!(values, ["small", "it's", "large"]);

        let (enumerated, values) = domain_values("set('a','b')").unwrap();
        assert!(!enumerated);
        assert_eq!(values, ["a", "b"]);

        assert!(domain_values("varchar(10)").is_err());
    }

    #[test]
    fn test_default_values() {
        assert_eq!(
            default_value("5", ColumnType::Int, false),
            Some(Value::Int(5))
        );
        assert_eq!(
            default_value("'abc'", ColumnType::VarChar, false),
            Some(Value::Text("abc".into()))
        );
        assert_eq!(
            default_value("abc", ColumnType::VarChar, false),
            Some(Value::Text("abc".into()))
        );
        assert_eq!(
            default_value("b'101'", ColumnType::Bit, false),
            Some(Value::UInt(5))
        );
        assert_eq!(default_value("CURRENT_TIMESTAMP", ColumnType::DateTime, false), None);
        assert_eq!(default_value("uuid()", ColumnType::Guid, true), None);
        assert_eq!(default_value("NULL", ColumnType::Int, false), None);
    }

    #[test]
    fn test_check_definition() {
        assert_eq!(check_definition("(`qty` > 0)"), "(`qty` > 0)");
        assert_eq!(
            check_definition("(`kind` in (_utf8mb4'a',_utf8mb4'it\\'s'))"),
            "(`kind` in ('a','it''s'))"
        );
        assert_eq!(
            check_definition("(`unit_price` >= _latin1'0' and _x < 5)"),
            "(`unit_price` >= '0' and _x < 5)"
        );
    }
}
