//! MySQL/MariaDB database driver.
//!
//! This module provides MySQL-specific implementations for:
//! - [`MysqlDialect`]: generation strategy
//! - [`MysqlProvider`]: schema provider over `INFORMATION_SCHEMA`
//!
//! # Supported Versions
//!
//! - MySQL 5.7+, 8.0+
//! - MariaDB 10.2+
//!
//! # Domains
//!
//! `enum(...)` and `set(...)` columns are exposed as domains named
//! `{table}_{column}` so dialects with standalone enum types can declare them.

mod generator;
mod reader;
pub mod types;

pub use generator::MysqlDialect;
pub use reader::{domain_name, MysqlProvider};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{CheckConstraint, Column};
    use crate::core::traits::SqlDialect;
    use crate::core::types::ColumnType;
    use crate::core::value::Value;
    use crate::parser::{parse_create_table, TableConstraint};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    /// Emit `value` as a MySQL literal and unwrap it the way the catalog reports it.
    fn round_trip(column_type: ColumnType, size: u32, value: Value) -> Option<Value> {
        let dialect = MysqlDialect::new();
        let mut column = Column::new("c", column_type);
        column.size = size;
        let literal = dialect.format_literal(&value, &column).unwrap();
        types::default_value(&literal, column_type, false)
    }

    #[test]
    fn test_literal_round_trip() {
        let cases = vec![
            (ColumnType::Int, 0, Value::Int(-7)),
            (ColumnType::UnsignedBigInt, 0, Value::UInt(u64::MAX)),
            (ColumnType::Boolean, 0, Value::Bool(false)),
            (ColumnType::Decimal, 0, Value::Decimal(Decimal::new(-505, 1))),
            (ColumnType::VarChar, 20, Value::Text("O'Brien \\ co".into())),
            (ColumnType::Bit, 3, Value::UInt(6)),
            (
                ColumnType::Date,
                0,
                Value::Date(NaiveDate::from_ymd_opt(1999, 12, 31).unwrap()),
            ),
        ];
        for (column_type, size, value) in cases {
            assert_eq!(round_trip(column_type, size, value.clone()), Some(value));
        }
    }

    #[test]
    fn test_unsigned_tiny_int_keeps_sign_information() {
        let column = Column::new("flags", ColumnType::UnsignedTinyInt);
        let mysql = MysqlDialect::new().type_name(&column, None).unwrap();
        let pg = crate::drivers::PostgresDialect::new()
            .type_name(&column, None)
            .unwrap();
        assert_eq!(mysql, "tinyint unsigned");
        assert_eq!(pg, "smallint");
        assert_ne!(mysql, pg);
    }

    #[test]
    fn test_domain_name() {
        assert_eq!(domain_name("shirts", "size"), "shirts_size");
    }

    #[test]
    fn test_catalog_check_carries_to_postgres() {
        let check = CheckConstraint::parse("ck_qty", &types::check_definition("(`qty` > 0)"));
        let pg = crate::drivers::PostgresDialect::new();
        assert_eq!(
            pg.check_clause(&check).unwrap(),
            "CONSTRAINT \"ck_qty\" CHECK (\"qty\" > 0)"
        );

        let check = CheckConstraint::parse(
            "ck_kind",
            &types::check_definition("(`kind` in (_utf8mb4'a',_utf8mb4'b'))"),
        );
        assert_eq!(
            pg.check_clause(&check).unwrap(),
            "CONSTRAINT \"ck_kind\" CHECK (\"kind\" IN ('a', 'b'))"
        );
    }

    #[test]
    fn test_quoted_column_check_uses_backticks() {
        let table = parse_create_table(
            "CREATE TABLE t (\"Unit Price\" REAL, CONSTRAINT ck CHECK (\"Unit Price\" > 0))",
        )
        .unwrap();
        let TableConstraint::Check(spec) = &table.constraints[0] else {
            panic!("expected check constraint");
        };
        let check = CheckConstraint::from_expr("ck", spec.expr.clone());
        assert_eq!(
            MysqlDialect::new().check_clause(&check).unwrap(),
            "CONSTRAINT `ck` CHECK (`Unit Price` > 0)"
        );
    }
}
