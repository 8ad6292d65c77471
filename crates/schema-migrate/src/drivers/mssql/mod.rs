//! Microsoft SQL Server database driver.
//!
//! This module provides SQL Server-specific implementations for:
//! - [`MssqlDialect`]: generation strategy with `GO` batch separators
//! - [`MssqlProvider`]: schema provider over the `sys.*` catalog views

mod generator;
mod reader;
pub mod types;

pub use generator::MssqlDialect;
pub use reader::MssqlProvider;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::Column;
    use crate::core::traits::SqlDialect;
    use crate::core::types::{ColumnAttributes, ColumnType};
    use crate::core::value::Value;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    /// Emit `value` as a SQL Server literal and unwrap it the way
    /// `sys.default_constraints` stores it.
    fn round_trip(column_type: ColumnType, value: Value) -> Option<Value> {
        let dialect = MssqlDialect::new();
        let mut column = Column::new("c", column_type);
        if column_type == ColumnType::NVarChar {
            column.attributes = ColumnAttributes::UNICODE;
        }
        let literal = dialect.format_literal(&value, &column).unwrap();
        types::default_value(&format!("({})", literal), column_type)
    }

    #[test]
    fn test_literal_round_trip() {
        let cases = vec![
            (ColumnType::Int, Value::Int(42)),
            (ColumnType::Boolean, Value::Bool(true)),
            (ColumnType::Decimal, Value::Decimal(Decimal::new(-1999, 2))),
            (ColumnType::NVarChar, Value::Text("it's ünïcode".into())),
            (ColumnType::VarChar, Value::Text("plain".into())),
            (ColumnType::Blob, Value::Bytes(vec![1, 2, 254])),
            (ColumnType::Guid, Value::Guid(Uuid::nil())),
            (
                ColumnType::Date,
                Value::Date(NaiveDate::from_ymd_opt(2021, 3, 14).unwrap()),
            ),
        ];
        for (column_type, value) in cases {
            assert_eq!(round_trip(column_type, value.clone()), Some(value));
        }
    }

    #[test]
    fn test_tiny_int_maps_to_unsigned_and_back() {
        let mapped = types::map_native_type("tinyint", 1, 3, 0);
        let column = Column::new("level", mapped.column_type);
        assert_eq!(MssqlDialect::new().type_name(&column, None).unwrap(), "tinyint");
    }
}
