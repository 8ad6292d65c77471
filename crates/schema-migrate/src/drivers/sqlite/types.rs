//! SQLite declared-type mapping and default unwrapping.
//!
//! SQLite stores whatever type text the `CREATE TABLE` statement carried, so
//! mapping works on the parser's `type_name` and falls back to SQLite's own
//! affinity rules when the name is not one of the common spellings.

use tracing::debug;

use crate::core::types::{ColumnType, MappedType};
use crate::core::value::Value;
use crate::parser::{Expr, UnaryOp};

/// Map a declared type (as parsed, without its arguments) into the portable set.
pub fn map_native_type(type_name: &str, precision: Option<u32>, scale: Option<u32>) -> MappedType {
    let lower = type_name.trim().to_lowercase();
    let size = precision.unwrap_or(0);

    match lower.as_str() {
        "" => MappedType::plain(ColumnType::Text)
            .lossy("column has no declared type, treating it as text"),

        // Boolean
        "boolean" | "bool" => MappedType::plain(ColumnType::Boolean),
        "bit" if size <= 1 => MappedType::plain(ColumnType::Boolean),
        "bit" => MappedType::sized(ColumnType::Bit, size),

        // Integers
        "tinyint" => MappedType::plain(ColumnType::TinyInt),
        "unsigned tinyint" => MappedType::plain(ColumnType::UnsignedTinyInt),
        "smallint" | "int2" => MappedType::plain(ColumnType::SmallInt),
        "unsigned smallint" => MappedType::plain(ColumnType::UnsignedSmallInt),
        "int" | "integer" | "mediumint" => MappedType::plain(ColumnType::Int),
        "unsigned int" | "unsigned integer" => MappedType::plain(ColumnType::UnsignedInt),
        "bigint" | "int8" => MappedType::plain(ColumnType::BigInt),
        "unsigned big int" | "unsigned bigint" => MappedType::plain(ColumnType::UnsignedBigInt),

        // Floating point
        "float" => MappedType::plain(ColumnType::Float),
        "real" | "double" | "double precision" => MappedType::plain(ColumnType::Double),

        // Exact numerics
        "money" | "currency" => MappedType::plain(ColumnType::Currency),
        "numeric" | "decimal" => {
            MappedType::numeric(digits(precision), digits(scale))
        }

        // Date/time
        "date" => MappedType::plain(ColumnType::Date),
        "time" => MappedType::plain(ColumnType::Time),
        "datetime" | "timestamp" => MappedType::plain(ColumnType::DateTime),

        // Character
        "char" | "character" => MappedType::sized(ColumnType::Char, size),
        "varchar" | "character varying" | "varying character" => {
            MappedType::sized(ColumnType::VarChar, size)
        }
        "nchar" | "native character" => MappedType::sized(ColumnType::NChar, size),
        "nvarchar" => MappedType::sized(ColumnType::NVarChar, size),
        "text" | "clob" => MappedType::plain(ColumnType::Text),
        "ntext" => MappedType::plain(ColumnType::NText),

        // Binary
        "blob" | "binary" | "varbinary" => MappedType::sized(ColumnType::Blob, size),

        // Special
        "guid" | "uuid" | "uniqueidentifier" => MappedType::plain(ColumnType::Guid),
        "json" => MappedType::plain(ColumnType::Json),
        "xml" => MappedType::plain(ColumnType::Xml),

        _ => map_by_affinity(&lower),
    }
}

/// SQLite's column affinity rules, applied to names the table above misses.
fn map_by_affinity(lower: &str) -> MappedType {
    if lower.contains("int") {
        MappedType::plain(ColumnType::BigInt)
    } else if lower.contains("char") || lower.contains("clob") || lower.contains("text") {
        MappedType::plain(ColumnType::Text)
    } else if lower.contains("blob") {
        MappedType::plain(ColumnType::Blob)
    } else if lower.contains("real") || lower.contains("floa") || lower.contains("doub") {
        MappedType::plain(ColumnType::Double)
    } else {
        MappedType::plain(ColumnType::Unknown)
            .lossy(format!("unrecognized SQLite type '{}' copied verbatim", lower))
    }
}

fn digits(value: Option<u32>) -> u8 {
    value.map(|v| u8::try_from(v).unwrap_or(u8::MAX)).unwrap_or(0)
}

/// Turn a parsed `DEFAULT` expression into a value of `column_type`.
///
/// Only literals survive; function calls and other expressions yield `None`.
pub fn default_value(expr: &Expr, column_type: ColumnType) -> Option<Value> {
    let parsed = match expr {
        Expr::NumericLiteral(text) | Expr::CharLiteral(text) => {
            Value::parse_literal(column_type, text).ok()
        }
        Expr::Unary {
            op: UnaryOp::Minus,
            operand,
        } => match operand.as_ref() {
            Expr::NumericLiteral(text) => {
                Value::parse_literal(column_type, &format!("-{}", text)).ok()
            }
            _ => None,
        },
        Expr::BlobLiteral(digits) => hex::decode(digits).ok().map(Value::Bytes),
        Expr::ColumnRef(word)
            if word.eq_ignore_ascii_case("true") || word.eq_ignore_ascii_case("false") =>
        {
            Value::parse_literal(ColumnType::Boolean, word)
                .ok()
                .map(|v| v.coerce(column_type))
        }
        _ => None,
    };

    if parsed.is_none() {
        debug!("Ignoring non-literal SQLite default: {}", expr);
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_common_names() {
        assert_eq!(
            map_native_type("INTEGER", None, None).column_type,
            ColumnType::Int
        );
        assert_eq!(
            map_native_type("UNSIGNED BIG INT", None, None).column_type,
            ColumnType::UnsignedBigInt
        );
        let varchar = map_native_type("VARCHAR", Some(50), None);
        assert_eq!(varchar.column_type, ColumnType::VarChar);
        assert_eq!(varchar.size, 50);
        let dec = map_native_type("decimal", Some(10), Some(2));
        assert_eq!((dec.precision, dec.scale), (10, 2));
    }

    #[test]
    fn test_affinity_fallbacks() {
        assert_eq!(
            map_native_type("MEDIUMINTEGER", None, None).column_type,
            ColumnType::BigInt
        );
        assert_eq!(
            map_native_type("VARYING NCHARACTER", None, None).column_type,
            ColumnType::Text
        );
        assert_eq!(
            map_native_type("DOUBLE FLOAT", None, None).column_type,
            ColumnType::Double
        );
        let unknown = map_native_type("GEOMETRY", None, None);
        assert_eq!(unknown.column_type, ColumnType::Unknown);
        assert!(unknown.warning.is_some());
    }

    #[test]
    fn test_mapping_is_total_over_fixture() {
        let fixture = [
            "", "bool", "bit", "tinyint", "smallint", "int", "integer", "bigint", "float",
            "real", "double precision", "numeric", "decimal", "money", "date", "time",
            "datetime", "timestamp", "char", "varchar", "nchar", "nvarchar", "text", "clob",
            "blob", "guid", "json", "xml", "whatever",
        ];
        for name in fixture {
            let mapped = map_native_type(name, None, None);
            if mapped.column_type == ColumnType::Unknown {
                assert_eq!(name, "whatever");
            }
        }
    }

    #[test]
    fn test_default_values() {
        assert_eq!(
            default_value(&Expr::NumericLiteral("-5".into()), ColumnType::Int),
            Some(Value::Int(-5))
        );
        assert_eq!(
            default_value(&Expr::CharLiteral("abc".into()), ColumnType::VarChar),
            Some(Value::Text("abc".into()))
        );
        assert_eq!(
            default_value(&Expr::ColumnRef("TRUE".into()), ColumnType::Boolean),
            Some(Value::Bool(true))
        );
        assert_eq!(
            default_value(&Expr::BlobLiteral("00ff".into()), ColumnType::Blob),
            Some(Value::Bytes(vec![0x00, 0xff]))
        );
        assert_eq!(
            default_value(&Expr::ColumnRef("CURRENT_TIMESTAMP".into()), ColumnType::DateTime),
            None
        );
    }
}
