//! PostgreSQL database driver.
//!
//! This module provides PostgreSQL-specific implementations for:
//! - [`PostgresDialect`]: generation strategy
//! - [`PostgresProvider`]: schema provider over `information_schema` and `pg_catalog`

mod generator;
mod reader;
pub mod types;

pub use generator::PostgresDialect;
pub use reader::PostgresProvider;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{CheckConstraint, Column};
    use crate::core::traits::SqlDialect;
    use crate::core::types::ColumnType;
    use crate::core::value::Value;
    use chrono::{NaiveDate, NaiveTime};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    /// Emit `value` as a PostgreSQL literal, decorate it the way
    /// `column_default` reports it, and unwrap it again.
    fn round_trip(column_type: ColumnType, value: Value) -> Option<Value> {
        let dialect = PostgresDialect::new();
        let mut column = Column::new("c", column_type);
        column.size = 8;
        let literal = dialect.format_literal(&value, &column).unwrap();
        let catalog = format!(
            "{}::{}",
            literal,
            dialect.type_name(&column, None).unwrap()
        );
        types::default_value(&catalog, column_type)
    }

    #[test]
    fn test_literal_round_trip() {
        let cases = vec![
            (ColumnType::Int, Value::Int(123)),
            (ColumnType::BigInt, Value::Int(-9_000_000_000)),
            (ColumnType::Boolean, Value::Bool(true)),
            (ColumnType::Double, Value::Float(0.25)),
            (ColumnType::Decimal, Value::Decimal(Decimal::new(31415, 4))),
            (ColumnType::VarChar, Value::Text("a 'quoted' word".into())),
            (ColumnType::Blob, Value::Bytes(vec![0, 255, 16])),
            (ColumnType::Bit, Value::UInt(0b1010_0001)),
            (ColumnType::Guid, Value::Guid(Uuid::nil())),
            (
                ColumnType::Date,
                Value::Date(NaiveDate::from_ymd_opt(2023, 7, 4).unwrap()),
            ),
            (
                ColumnType::Time,
                Value::Time(NaiveTime::from_hms_opt(23, 59, 1).unwrap()),
            ),
        ];
        for (column_type, value) in cases {
            assert_eq!(round_trip(column_type, value.clone()), Some(value));
        }
    }

    #[test]
    fn test_catalog_check_carries_to_mysql() {
        let catalog = "((status)::text = ANY ((ARRAY['new'::character varying, 'done'::character varying])::text[]))";
        let check = CheckConstraint::parse("ck_status", &types::check_definition(catalog));
        assert!(check.expr.is_some());

        let mysql = crate::drivers::MysqlDialect::new();
        assert_eq!(
            mysql.check_clause(&check).unwrap(),
            "CONSTRAINT `ck_status` CHECK (`status` IN ('new', 'done'))"
        );
    }
}
