//! Typed literal values carried by the portable model.
//!
//! A [`Value`] is what a column default or a data cell looks like once it has
//! left the source dialect: catalog default strings are parsed into values with
//! [`Value::parse_literal`], and generators format values back into literals for
//! the target dialect.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::ColumnType;
use crate::error::{MigrateError, Result};

/// A literal value of one of the portable types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL.
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (any width up to 64 bits).
    Int(i64),

    /// Unsigned integer (any width up to 64 bits), also used for bit strings.
    UInt(u64),

    /// Floating point.
    Float(f64),

    /// Exact decimal with arbitrary precision.
    Decimal(Decimal),

    /// Text/string data.
    Text(String),

    /// Binary data.
    Bytes(Vec<u8>),

    /// UUID/GUID value.
    Guid(Uuid),

    /// Date without time component.
    Date(NaiveDate),

    /// Time without date component.
    Time(NaiveTime),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),
}

/// Accepted textual forms for dates with a time part.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Accepted textual forms for times of day.
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

impl Value {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Parse the textual form of a literal into a value of the given portable type.
    ///
    /// This is the one set of numeric/date/boolean rules shared by every provider:
    /// dialect-specific wrappers (quotes, casts, parentheses) must be stripped
    /// before calling it.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::InvalidValue`] when `text` is not a valid literal
    /// for `column_type`.
    pub fn parse_literal(column_type: ColumnType, text: &str) -> Result<Value> {
        let trimmed = text.trim();
        let invalid = || MigrateError::invalid_value(column_type, text);

        match column_type {
            ColumnType::Boolean => parse_bool(trimmed).map(Value::Bool).ok_or_else(invalid),

            ColumnType::TinyInt | ColumnType::SmallInt | ColumnType::Int | ColumnType::BigInt => {
                parse_signed(trimmed).map(Value::Int).ok_or_else(invalid)
            }
            ColumnType::UnsignedTinyInt
            | ColumnType::UnsignedSmallInt
            | ColumnType::UnsignedInt
            | ColumnType::UnsignedBigInt => {
                parse_unsigned(trimmed).map(Value::UInt).ok_or_else(invalid)
            }

            ColumnType::Float | ColumnType::Double => {
                trimmed.parse::<f64>().map(Value::Float).map_err(|_| invalid())
            }
            ColumnType::Currency | ColumnType::Decimal => {
                parse_decimal(trimmed).map(Value::Decimal).ok_or_else(invalid)
            }

            ColumnType::Date => parse_date(trimmed).map(Value::Date).ok_or_else(invalid),
            ColumnType::Time => parse_time(trimmed).map(Value::Time).ok_or_else(invalid),
            ColumnType::DateTime => parse_datetime(trimmed)
                .map(Value::DateTime)
                .ok_or_else(invalid),

            ColumnType::Bit => parse_bits(trimmed).map(Value::UInt).ok_or_else(invalid),
            ColumnType::Blob | ColumnType::RowVersion => {
                parse_hex(trimmed).map(Value::Bytes).ok_or_else(invalid)
            }
            ColumnType::Guid => Uuid::parse_str(trimmed)
                .map(Value::Guid)
                .map_err(|_| invalid()),

            // Character-like types keep the text verbatim (untrimmed).
            ColumnType::Char
            | ColumnType::VarChar
            | ColumnType::NChar
            | ColumnType::NVarChar
            | ColumnType::Text
            | ColumnType::NText
            | ColumnType::Interval
            | ColumnType::Xml
            | ColumnType::Json
            | ColumnType::Geometry
            | ColumnType::UserDefined
            | ColumnType::Unknown => Ok(Value::Text(text.to_string())),
        }
    }

    /// Reshape a value read through a loosely typed driver into the variant
    /// that `column_type` expects.
    ///
    /// Values that cannot be reshaped are returned unchanged.
    #[must_use]
    pub fn coerce(self, column_type: ColumnType) -> Value {
        match (self, column_type) {
            (Value::Int(i), ColumnType::Boolean) => Value::Bool(i != 0),
            (Value::Int(i), ty) if ty.is_unsigned() || ty == ColumnType::Bit => {
                u64::try_from(i).map(Value::UInt).unwrap_or(Value::Int(i))
            }
            (Value::Int(i), ColumnType::Decimal | ColumnType::Currency) => {
                Value::Decimal(Decimal::from(i))
            }
            (Value::Int(i), ColumnType::Float | ColumnType::Double) => Value::Float(i as f64),
            (Value::Float(f), ColumnType::Decimal | ColumnType::Currency) => {
                Decimal::try_from(f).map(Value::Decimal).unwrap_or(Value::Float(f))
            }
            (Value::Bytes(b), ColumnType::Guid) if b.len() == 16 => {
                Uuid::from_slice(&b).map(Value::Guid).unwrap_or(Value::Bytes(b))
            }
            (Value::Text(s), ty) if !ty.is_character() => {
                Value::parse_literal(ty, &s).unwrap_or(Value::Text(s))
            }
            (value, _) => value,
        }
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn parse_signed(text: &str) -> Option<i64> {
    if let Ok(v) = text.parse::<i64>() {
        return Some(v);
    }
    // Catalogs sometimes report integral defaults as "5.0".
    let d = parse_decimal(text)?;
    if d.fract().is_zero() {
        i64::try_from(d).ok()
    } else {
        None
    }
}

fn parse_unsigned(text: &str) -> Option<u64> {
    if let Ok(v) = text.trim_start_matches('+').parse::<u64>() {
        return Some(v);
    }
    let d = parse_decimal(text)?;
    if d.fract().is_zero() && !d.is_sign_negative() {
        u64::try_from(d).ok()
    } else {
        None
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(text).map(|dt| dt.date()))
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(text, fmt).ok())
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// A bit string is written as binary digits, most significant first.
fn parse_bits(text: &str) -> Option<u64> {
    if !text.is_empty() && text.len() <= 64 && text.chars().all(|c| c == '0' || c == '1') {
        return u64::from_str_radix(text, 2).ok();
    }
    None
}

fn parse_hex(text: &str) -> Option<Vec<u8>> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .or_else(|| text.strip_prefix("\\x"))
        .unwrap_or(text);
    hex::decode(digits).ok()
}

// From implementations for common types
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Guid(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
