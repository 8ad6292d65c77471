//! Portable type system shared by every schema provider and code generator.
//!
//! [`ColumnType`] is the vocabulary all dialects are translated through:
//!
//! ```text
//! Source catalog  →  ColumnType  →  Target DDL
//!   tinyint       →  UnsignedTinyInt  →  tinyint unsigned (MySQL)
//!   int4          →  Int              →  int (SQL Server)
//! ```
//!
//! Providers map native type strings into it, generators map it back out.
//! Only [`ColumnType::Unknown`] and [`ColumnType::UserDefined`] fall back to
//! the native type string stored on the column.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Portable column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    // ===== Boolean =====
    /// Boolean/bit type.
    Boolean,

    // ===== Integer Types =====
    /// 8-bit signed integer.
    TinyInt,
    /// 8-bit unsigned integer (0-255).
    UnsignedTinyInt,
    /// 16-bit signed integer.
    SmallInt,
    /// 16-bit unsigned integer.
    UnsignedSmallInt,
    /// 32-bit signed integer.
    Int,
    /// 32-bit unsigned integer.
    UnsignedInt,
    /// 64-bit signed integer.
    BigInt,
    /// 64-bit unsigned integer.
    UnsignedBigInt,

    // ===== Floating Point =====
    /// 32-bit floating point.
    Float,
    /// 64-bit floating point.
    Double,

    // ===== Exact Numerics =====
    /// Money type with fixed precision (19,4).
    Currency,
    /// Exact decimal; precision and scale live on the column.
    Decimal,

    // ===== Date/Time Types =====
    /// Date only.
    Date,
    /// Time of day only.
    Time,
    /// Date and time.
    DateTime,
    /// Time interval/duration.
    Interval,

    // ===== Character Types =====
    /// Fixed-length character string.
    Char,
    /// Variable-length character string (size 0 = unbounded).
    VarChar,
    /// Fixed-length unicode string.
    NChar,
    /// Variable-length unicode string (size 0 = unbounded).
    NVarChar,
    /// Unlimited text / CLOB.
    Text,
    /// Unlimited unicode text.
    NText,

    // ===== Binary Types =====
    /// Bit string of `size` bits.
    Bit,
    /// Binary data (size 0 = unbounded).
    Blob,

    // ===== Special Types =====
    /// UUID/GUID.
    Guid,
    /// Row version / automatic timestamp.
    RowVersion,
    /// XML document.
    Xml,
    /// JSON document.
    Json,
    /// Spatial data.
    Geometry,

    // ===== Fallback =====
    /// Domain declared in the database (see [`DataType`](super::DataType)).
    UserDefined,
    /// Type that couldn't be mapped; the native string is emitted as-is.
    Unknown,
}

impl ColumnType {
    /// Every variant, in declaration order.
    pub const ALL: [ColumnType; 32] = [
        ColumnType::Boolean,
        ColumnType::TinyInt,
        ColumnType::UnsignedTinyInt,
        ColumnType::SmallInt,
        ColumnType::UnsignedSmallInt,
        ColumnType::Int,
        ColumnType::UnsignedInt,
        ColumnType::BigInt,
        ColumnType::UnsignedBigInt,
        ColumnType::Float,
        ColumnType::Double,
        ColumnType::Currency,
        ColumnType::Decimal,
        ColumnType::Date,
        ColumnType::Time,
        ColumnType::DateTime,
        ColumnType::Interval,
        ColumnType::Char,
        ColumnType::VarChar,
        ColumnType::NChar,
        ColumnType::NVarChar,
        ColumnType::Text,
        ColumnType::NText,
        ColumnType::Bit,
        ColumnType::Blob,
        ColumnType::Guid,
        ColumnType::RowVersion,
        ColumnType::Xml,
        ColumnType::Json,
        ColumnType::Geometry,
        ColumnType::UserDefined,
        ColumnType::Unknown,
    ];

    /// True for the signed and unsigned integer family.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ColumnType::TinyInt
                | ColumnType::UnsignedTinyInt
                | ColumnType::SmallInt
                | ColumnType::UnsignedSmallInt
                | ColumnType::Int
                | ColumnType::UnsignedInt
                | ColumnType::BigInt
                | ColumnType::UnsignedBigInt
        )
    }

    /// True for unsigned integers.
    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            ColumnType::UnsignedTinyInt
                | ColumnType::UnsignedSmallInt
                | ColumnType::UnsignedInt
                | ColumnType::UnsignedBigInt
        )
    }

    /// True for character types (fixed, variable and unbounded).
    pub fn is_character(self) -> bool {
        matches!(
            self,
            ColumnType::Char
                | ColumnType::VarChar
                | ColumnType::NChar
                | ColumnType::NVarChar
                | ColumnType::Text
                | ColumnType::NText
        )
    }

    /// True for the unicode character types.
    pub fn is_unicode(self) -> bool {
        matches!(
            self,
            ColumnType::NChar | ColumnType::NVarChar | ColumnType::NText
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

bitflags! {
    /// Column semantics beyond the type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ColumnAttributes: u8 {
        /// NOT NULL.
        const REQUIRED = 0b0001;
        /// Identity / auto-increment.
        const IDENTITY = 0b0010;
        /// Computed by the database.
        const COMPUTED = 0b0100;
        /// Stores unicode text.
        const UNICODE = 0b1000;
    }
}

impl ColumnAttributes {
    /// No attributes set.
    pub const NONE: ColumnAttributes = ColumnAttributes::empty();
}

/// Referential action for a foreign key's ON UPDATE / ON DELETE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ForeignKeyRule {
    /// No action; the clause is omitted.
    #[default]
    None,
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
}

impl ForeignKeyRule {
    /// Parse a catalog rule string (`CASCADE`, `SET_NULL`, `SET NULL`, `NO ACTION`, ...).
    pub fn from_catalog(rule: &str) -> Self {
        match rule.trim().to_uppercase().replace('_', " ").as_str() {
            "CASCADE" => ForeignKeyRule::Cascade,
            "SET NULL" => ForeignKeyRule::SetNull,
            "SET DEFAULT" => ForeignKeyRule::SetDefault,
            "RESTRICT" => ForeignKeyRule::Restrict,
            _ => ForeignKeyRule::None,
        }
    }

    /// SQL keyword for the rule, `None` when no clause should be emitted.
    pub fn as_sql(self) -> Option<&'static str> {
        match self {
            ForeignKeyRule::None => None,
            ForeignKeyRule::Cascade => Some("CASCADE"),
            ForeignKeyRule::SetNull => Some("SET NULL"),
            ForeignKeyRule::SetDefault => Some("SET DEFAULT"),
            ForeignKeyRule::Restrict => Some("RESTRICT"),
        }
    }
}

/// Result of mapping a native type into the portable type system.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedType {
    /// Portable type.
    pub column_type: ColumnType,
    /// Character/binary length or bit count (0 = unbounded / not applicable).
    pub size: u32,
    /// Numeric precision.
    pub precision: u8,
    /// Numeric scale.
    pub scale: u8,
    /// Warning message if the mapping loses information.
    pub warning: Option<String>,
}

impl MappedType {
    /// A mapping with no size information.
    pub fn plain(column_type: ColumnType) -> Self {
        Self {
            column_type,
            size: 0,
            precision: 0,
            scale: 0,
            warning: None,
        }
    }

    /// A sized mapping (character, binary and bit types).
    pub fn sized(column_type: ColumnType, size: u32) -> Self {
        Self {
            size,
            ..Self::plain(column_type)
        }
    }

    /// An exact numeric mapping.
    pub fn numeric(precision: u8, scale: u8) -> Self {
        Self {
            precision,
            scale,
            ..Self::plain(ColumnType::Decimal)
        }
    }

    /// Attach a lossy-conversion warning.
    pub fn lossy(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }
}

/// Clamp a catalog integer (which may be negative for "max") into a size.
pub fn catalog_size(value: i64) -> u32 {
    if value <= 0 {
        0
    } else {
        u32::try_from(value).unwrap_or(u32::MAX)
    }
}

/// Clamp a catalog precision/scale into `u8`.
pub fn catalog_digits(value: i64) -> u8 {
    u8::try_from(value.max(0)).unwrap_or(u8::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_display() {
        assert_eq!(ColumnType::UnsignedTinyInt.to_string(), "UnsignedTinyInt");
        assert_eq!(ColumnType::NVarChar.to_string(), "NVarChar");
    }

    #[test]
    fn test_column_type_families() {
        assert!(ColumnType::UnsignedBigInt.is_integer());
        assert!(ColumnType::UnsignedBigInt.is_unsigned());
        assert!(!ColumnType::BigInt.is_unsigned());
        assert!(ColumnType::NText.is_character());
        assert!(ColumnType::NText.is_unicode());
        assert!(!ColumnType::VarChar.is_unicode());
        assert!(!ColumnType::Blob.is_character());
    }

    #[test]
    fn test_attributes_combine() {
        let attrs = ColumnAttributes::REQUIRED | ColumnAttributes::IDENTITY;
        assert!(attrs.contains(ColumnAttributes::REQUIRED));
        assert!(attrs.contains(ColumnAttributes::IDENTITY));
        assert!(!attrs.contains(ColumnAttributes::UNICODE));
        assert!(ColumnAttributes::NONE.is_empty());
    }

    #[test]
    fn test_foreign_key_rule_from_catalog() {
        assert_eq!(ForeignKeyRule::from_catalog("CASCADE"), ForeignKeyRule::Cascade);
        assert_eq!(ForeignKeyRule::from_catalog("SET_NULL"), ForeignKeyRule::SetNull);
        assert_eq!(ForeignKeyRule::from_catalog("set default"), ForeignKeyRule::SetDefault);
        assert_eq!(ForeignKeyRule::from_catalog("RESTRICT"), ForeignKeyRule::Restrict);
        assert_eq!(ForeignKeyRule::from_catalog("NO_ACTION"), ForeignKeyRule::None);
        assert_eq!(ForeignKeyRule::None.as_sql(), None);
        assert_eq!(ForeignKeyRule::SetNull.as_sql(), Some("SET NULL"));
    }

    #[test]
    fn test_catalog_clamping() {
        assert_eq!(catalog_size(-1), 0);
        assert_eq!(catalog_size(50), 50);
        assert_eq!(catalog_digits(300), 255);
        assert_eq!(catalog_digits(-4), 0);
    }
}
