//! PostgreSQL type mapping, column default unwrapping and check rewriting.

use tracing::debug;

use crate::core::types::{catalog_digits, catalog_size, ColumnType, MappedType};
use crate::core::value::Value;

/// Map an `information_schema.columns.udt_name` into the portable type system.
///
/// `max_length` is `character_maximum_length`, which also carries the bit
/// count of `bit` / `varbit` columns.
pub fn map_native_type(udt_name: &str, max_length: i32, precision: i32, scale: i32) -> MappedType {
    let udt = udt_name.to_lowercase();
    let size = catalog_size(max_length.into());

    match udt.as_str() {
        "bool" => MappedType::plain(ColumnType::Boolean),

        "int2" => MappedType::plain(ColumnType::SmallInt),
        "int4" => MappedType::plain(ColumnType::Int),
        "int8" => MappedType::plain(ColumnType::BigInt),

        "float4" => MappedType::plain(ColumnType::Float),
        "float8" => MappedType::plain(ColumnType::Double),
        "money" => MappedType::plain(ColumnType::Currency),
        "numeric" => MappedType::numeric(
            catalog_digits(precision.into()),
            catalog_digits(scale.into()),
        ),

        "date" => MappedType::plain(ColumnType::Date),
        "time" | "timetz" => MappedType::plain(ColumnType::Time),
        "timestamp" | "timestamptz" => MappedType::plain(ColumnType::DateTime),
        "interval" => MappedType::plain(ColumnType::Interval),

        "bpchar" | "char" => MappedType::sized(ColumnType::Char, size.max(1)),
        "varchar" => MappedType::sized(ColumnType::VarChar, size),
        "name" => MappedType::sized(ColumnType::VarChar, 63),
        "text" | "citext" => MappedType::plain(ColumnType::Text),

        "bit" | "varbit" => MappedType::sized(ColumnType::Bit, size.max(1)),
        "bytea" => MappedType::plain(ColumnType::Blob),

        "uuid" => MappedType::plain(ColumnType::Guid),
        "json" | "jsonb" => MappedType::plain(ColumnType::Json),
        "xml" => MappedType::plain(ColumnType::Xml),
        "geometry" | "geography" | "point" | "line" | "lseg" | "box" | "path" | "polygon"
        | "circle" => MappedType::plain(ColumnType::Geometry),

        _ => MappedType::plain(ColumnType::Unknown)
            .lossy(format!("unrecognized PostgreSQL type '{}' copied verbatim", udt_name)),
    }
}

/// Whether a column default draws from a sequence (`serial` columns).
pub fn is_sequence_default(raw: &str) -> bool {
    raw.trim_start().to_lowercase().starts_with("nextval(")
}

/// Unwrap a `column_default` expression such as `'abc'::character varying`,
/// `(-1)`, `B'101'::"bit"` or `'\x0102'::bytea`.
///
/// Function calls and keywords other than `true` / `false` yield `None`.
pub fn default_value(raw: &str, column_type: ColumnType) -> Option<Value> {
    let expr = strip_parens(strip_cast(raw.trim()));

    let text = if let Some(bits) = quoted_body(expr, "B'").or_else(|| quoted_body(expr, "b'")) {
        bits
    } else if let Some(body) = quoted_body(expr, "E'") {
        body.replace("\\\\", "\\")
    } else if let Some(body) = quoted_body(expr, "'") {
        body
    } else if expr.eq_ignore_ascii_case("NULL") {
        return None;
    } else if expr.starts_with(|c: char| c.is_ascii_alphabetic())
        && !expr.eq_ignore_ascii_case("true")
        && !expr.eq_ignore_ascii_case("false")
    {
        debug!("Ignoring PostgreSQL expression default: {}", raw);
        return None;
    } else {
        expr.to_string()
    };

    match Value::parse_literal(column_type, &text) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Ignoring PostgreSQL default {}: {}", raw, e);
            None
        }
    }
}

/// Drop a trailing `::type` cast that sits outside any string literal.
fn strip_cast(expr: &str) -> &str {
    let mut in_string = false;
    let mut prev = '\0';
    for (i, ch) in expr.char_indices() {
        if ch == '\'' {
            in_string = !in_string;
        } else if !in_string && ch == ':' && prev == ':' {
            return expr[..i - 1].trim_end();
        }
        prev = ch;
    }
    expr
}

/// `(-1)` → `-1`, repeatedly.
fn strip_parens(mut expr: &str) -> &str {
    while let Some(inner) = expr.strip_prefix('(').and_then(|e| e.strip_suffix(')')) {
        expr = inner.trim();
    }
    expr
}

/// Body of `<open>...'` with doubled quotes collapsed.
fn quoted_body(expr: &str, open: &str) -> Option<String> {
    let body = expr.strip_prefix(open)?.strip_suffix('\'')?;
    Some(body.replace("''", "'"))
}

/// Rewrite a `pg_get_expr` check expression into the portable grammar.
///
/// Casts are dropped and array membership becomes a list:
/// `((status)::text = ANY ((ARRAY['a'::character varying])::text[]))`
/// becomes `((status) IN ('a'))`.
pub fn check_definition(expr: &str) -> String {
    let mut out = strip_all_casts(expr);
    for (pattern, replacement) in [("= ANY (", "IN ("), ("<> ALL (", "NOT IN (")] {
        let mut from = 0;
        while let Some(found) = out[from..].find(pattern) {
            let start = from + found;
            match array_items(&out[start + pattern.len()..]) {
                Some((items, tail)) => {
                    out = format!("{}{}{}){}", &out[..start], replacement, items, tail);
                }
                None => from = start + pattern.len(),
            }
        }
    }
    out
}

/// Split `(ARRAY[a, b]))...` into the items and what follows the closing paren.
fn array_items(rest: &str) -> Option<(String, String)> {
    let opens = rest.len() - rest.trim_start_matches('(').len();
    let body = rest[opens..].strip_prefix("ARRAY[")?;
    let close = body.find(']')?;
    let tail = body[close + 1..].strip_prefix(")".repeat(opens + 1).as_str())?;
    Some((body[..close].to_string(), tail.to_string()))
}

/// Drop every `::type` cast outside string literals and quoted names.
fn strip_all_casts(expr: &str) -> String {
    let mut out = String::with_capacity(expr.len());
    let mut rest = expr;
    while let Some(ch) = rest.chars().next() {
        if ch == '\'' || ch == '"' {
            let end = quoted_len(rest, ch);
            out.push_str(&rest[..end]);
            rest = &rest[end..];
        } else if let Some(after) = rest.strip_prefix("::") {
            rest = skip_type_name(after);
        } else {
            out.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
    }
    out
}

/// Byte length of the quoted run opening `text`, doubled quotes included.
fn quoted_len(text: &str, quote: char) -> usize {
    let mut chars = text.char_indices().skip(1).peekable();
    while let Some((i, ch)) = chars.next() {
        if ch == quote {
            if chars.peek().map(|&(_, next)| next) == Some(quote) {
                chars.next();
            } else {
                return i + 1;
            }
        }
    }
    text.len()
}

fn skip_type_name(text: &str) -> &str {
    let mut rest = if text.starts_with('"') {
        &text[quoted_len(text, '"')..]
    } else {
        text.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    };
    for suffix in [" varying", " precision", " without time zone", " with time zone"] {
        if rest
            .get(..suffix.len())
            .is_some_and(|s| s.eq_ignore_ascii_case(suffix))
        {
            rest = &rest[suffix.len()..];
        }
    }
    if let Some(args) = rest.strip_prefix('(') {
        if let Some(end) = args.find(')') {
            if args[..end].chars().all(|c| c.is_ascii_digit() || c == ',' || c == ' ') {
                rest = &args[end + 1..];
            }
        }
    }
    while let Some(after) = rest.strip_prefix("[]") {
        rest = after;
    }
    rest
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_map_native_types() {
        assert_eq!(map_native_type("int4", 0, 32, 0).column_type, ColumnType::Int);
        assert_eq!(
            map_native_type("timestamptz", 0, 0, 0).column_type,
            ColumnType::DateTime
        );
        let vc = map_native_type("varchar", 120, 0, 0);
        assert_eq!((vc.column_type, vc.size), (ColumnType::VarChar, 120));
        let num = map_native_type("numeric", 0, 18, 4);
        assert_eq!((num.precision, num.scale), (18, 4));
        let bits = map_native_type("bit", 8, 0, 0);
        assert_eq!((bits.column_type, bits.size), (ColumnType::Bit, 8));
    }

    #[test]
    fn test_mapping_is_total_over_fixture() {
        let fixture = [
            "bool", "int2", "int4", "int8", "float4", "float8", "money", "numeric", "date",
            "time", "timetz", "timestamp", "timestamptz", "interval", "bpchar", "varchar",
            "text", "bit", "varbit", "bytea", "uuid", "json", "jsonb", "xml", "point",
        ];
        for name in fixture {
            assert_ne!(
                map_native_type(name, 10, 10, 0).column_type,
                ColumnType::Unknown,
                "{}",
                name
            );
        }
        let unknown = map_native_type("tsvector", 0, 0, 0);
        assert_eq!(unknown.column_type, ColumnType::Unknown);
        assert!(unknown.warning.is_some());
    }

    #[test]
    fn test_default_values() {
        assert_eq!(
            default_value("'it''s'::character varying", ColumnType::VarChar),
            Some(Value::Text("it's".into()))
        );
        assert_eq!(default_value("(-1)", ColumnType::Int), Some(Value::Int(-1)));
        assert_eq!(
            default_value("'-5'::integer", ColumnType::Int),
            Some(Value::Int(-5))
        );
        assert_eq!(default_value("true", ColumnType::Boolean), Some(Value::Bool(true)));
        assert_eq!(
            default_value("B'101'::\"bit\"", ColumnType::Bit),
            Some(Value::UInt(5))
        );
        assert_eq!(
            default_value("'\\x0102'::bytea", ColumnType::Blob),
            Some(Value::Bytes(vec![1, 2]))
        );
        assert_eq!(
            default_value("'2024-01-31'::date", ColumnType::Date),
            Some(Value::Date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()))
        );
        assert_eq!(default_value("now()", ColumnType::DateTime), None);
        assert_eq!(default_value("CURRENT_TIMESTAMP", ColumnType::DateTime), None);
        assert_eq!(default_value("NULL::text", ColumnType::Text), None);
    }

    #[test]
    fn test_sequence_default() {
        assert!(is_sequence_default("nextval('orders_id_seq'::regclass)"));
        assert!(!is_sequence_default("0"));
    }

    #[test]
    fn test_check_definition() {
        assert_eq!(check_definition("(qty > 0)"), "(qty > 0)");
        assert_eq!(
            check_definition("((price)::numeric > (0)::numeric)"),
            "((price) > (0))"
        );
        assert_eq!(
            check_definition(
                "((status)::text = ANY ((ARRAY['new'::character varying, 'it''s'::character varying])::text[]))"
            ),
            "((status) IN ('new', 'it''s'))"
        );
        assert_eq!(
            check_definition("(code <> ALL (ARRAY[1, 2]))"),
            "(code NOT IN (1, 2))"
        );
        assert_eq!(
            check_definition("(note <> 'a::b'::text)"),
            "(note <> 'a::b')"
        );
        assert_eq!(
            check_definition("(created > '2020-01-01 00:00:00'::timestamp without time zone)"),
            "(created > '2020-01-01 00:00:00')"
        );
    }
}
