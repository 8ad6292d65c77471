//! SQL Server type mapping and default unwrapping.

use tracing::debug;

use crate::core::types::{catalog_digits, catalog_size, ColumnType, MappedType};
use crate::core::value::Value;

/// Map a `sys.types` name into the portable type system.
///
/// `max_length` is `sys.columns.max_length`: bytes, `-1` for `(max)`, and
/// twice the character count for `nchar` / `nvarchar`.
pub fn map_native_type(type_name: &str, max_length: i16, precision: u8, scale: u8) -> MappedType {
    let bytes = catalog_size(max_length.into());

    match type_name.to_lowercase().as_str() {
        "bit" => MappedType::plain(ColumnType::Boolean),

        // SQL Server tinyint is 0..=255
        "tinyint" => MappedType::plain(ColumnType::UnsignedTinyInt),
        "smallint" => MappedType::plain(ColumnType::SmallInt),
        "int" => MappedType::plain(ColumnType::Int),
        "bigint" => MappedType::plain(ColumnType::BigInt),

        "real" => MappedType::plain(ColumnType::Float),
        "float" if precision <= 24 => MappedType::plain(ColumnType::Float),
        "float" => MappedType::plain(ColumnType::Double),
        "money" | "smallmoney" => MappedType::plain(ColumnType::Currency),
        "decimal" | "numeric" => MappedType::numeric(
            catalog_digits(precision.into()),
            catalog_digits(scale.into()),
        ),

        "date" => MappedType::plain(ColumnType::Date),
        "time" => MappedType::plain(ColumnType::Time),
        "datetime" | "datetime2" | "smalldatetime" => MappedType::plain(ColumnType::DateTime),
        "datetimeoffset" => MappedType::plain(ColumnType::DateTime)
            .lossy("datetimeoffset loses its time zone offset"),

        "char" => MappedType::sized(ColumnType::Char, bytes),
        "varchar" => MappedType::sized(ColumnType::VarChar, bytes),
        "nchar" => MappedType::sized(ColumnType::NChar, bytes / 2),
        "nvarchar" | "sysname" => MappedType::sized(ColumnType::NVarChar, bytes / 2),
        "text" => MappedType::plain(ColumnType::Text),
        "ntext" => MappedType::plain(ColumnType::NText),

        "binary" | "varbinary" => MappedType::sized(ColumnType::Blob, bytes),
        "image" => MappedType::plain(ColumnType::Blob),
        "timestamp" | "rowversion" => MappedType::plain(ColumnType::RowVersion),

        "uniqueidentifier" => MappedType::plain(ColumnType::Guid),
        "xml" => MappedType::plain(ColumnType::Xml),
        "geometry" | "geography" => MappedType::plain(ColumnType::Geometry),

        other => MappedType::plain(ColumnType::Unknown)
            .lossy(format!("unrecognized SQL Server type '{}' copied verbatim", other)),
    }
}

/// Unwrap a `sys.default_constraints.definition` such as `((1))`, `(N'x')`
/// or `(CONVERT([bit],(0)))`.
///
/// Function calls other than `CONVERT` / `CAST` yield `None`.
pub fn default_value(raw: &str, column_type: ColumnType) -> Option<Value> {
    let expr = unwrap_expression(raw);

    let text = if let Some(body) = quoted_body(expr, "N'").or_else(|| quoted_body(expr, "'")) {
        body
    } else if expr.eq_ignore_ascii_case("NULL") {
        return None;
    } else if expr.starts_with(|c: char| c.is_ascii_alphabetic()) {
        debug!("Ignoring SQL Server expression default: {}", raw);
        return None;
    } else {
        expr.to_string()
    };

    match Value::parse_literal(column_type, &text) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Ignoring SQL Server default {}: {}", raw, e);
            None
        }
    }
}

/// Strip redundant parentheses and `CONVERT(type, value[, style])` /
/// `CAST(value AS type)` wrappers.
fn unwrap_expression(raw: &str) -> &str {
    let mut expr = raw.trim();
    loop {
        if let Some(inner) = enclosed(expr, "(") {
            expr = inner;
        } else if let Some(args) = enclosed(expr, "CONVERT(") {
            match split_top_level(args, ',').get(1) {
                Some(value) => expr = *value,
                None => return expr,
            }
        } else if let Some(args) = enclosed(expr, "CAST(") {
            let upper = args.to_ascii_uppercase();
            match upper.rfind(" AS ") {
                Some(pos) => expr = args[..pos].trim(),
                None => return expr,
            }
        } else {
            return expr;
        }
    }
}

/// Body of `open ... )` when the closing parenthesis matches the opening one.
fn enclosed<'a>(expr: &'a str, open: &str) -> Option<&'a str> {
    if !expr.get(..open.len())?.eq_ignore_ascii_case(open) {
        return None;
    }
    let body = expr[open.len()..].strip_suffix(')')?;
    // `(1)+(2)` is not enclosed by its first parenthesis.
    let mut depth = 0i32;
    let mut in_string = false;
    for ch in body.chars() {
        match ch {
            '\'' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    (depth == 0).then(|| body.trim())
}

/// Split on `sep` outside parentheses and string literals.
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut start = 0;
    for (i, ch) in text.char_indices() {
        match ch {
            '\'' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => depth -= 1,
            c if c == sep && !in_string && depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts
}

fn quoted_body(expr: &str, open: &str) -> Option<String> {
    if !expr.get(..open.len())?.eq_ignore_ascii_case(open) {
        return None;
    }
    let body = expr[open.len()..].strip_suffix('\'')?;
    Some(body.replace("''", "'"))
}
