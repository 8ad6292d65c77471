//! SQLite generation strategy.

use crate::core::schema::{Column, DataType, Table};
use crate::core::traits::{decimal_type, sized_type, SqlDialect};
use crate::core::types::ColumnType;
use crate::drivers::DialectKind;
use crate::error::Result;

/// SQLite dialect.
///
/// Foreign keys can only be declared inside `CREATE TABLE`, and an
/// auto-increment column must be the table's single `integer` primary key.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    pub fn new() -> Self {
        Self
    }
}

impl SqlDialect for SqliteDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn type_name(&self, column: &Column, data_type: Option<&DataType>) -> Result<String> {
        if let Some(dt) = data_type {
            return self.user_type_name(dt);
        }
        // AUTOINCREMENT is only accepted on a column declared exactly `integer`.
        if column.is_identity() && column.column_type.is_integer() {
            return Ok("integer".to_string());
        }

        let name = match column.column_type {
            ColumnType::Boolean => "boolean".to_string(),
            ColumnType::TinyInt => "tinyint".to_string(),
            ColumnType::UnsignedTinyInt | ColumnType::SmallInt => "smallint".to_string(),
            ColumnType::UnsignedSmallInt | ColumnType::Int | ColumnType::Bit => {
                "integer".to_string()
            }
            ColumnType::UnsignedInt | ColumnType::BigInt => "bigint".to_string(),
            ColumnType::UnsignedBigInt => "unsigned big int".to_string(),
            ColumnType::Float => "float".to_string(),
            ColumnType::Double => "double".to_string(),
            ColumnType::Currency => "decimal(19,4)".to_string(),
            ColumnType::Decimal => decimal_type("decimal", column),
            ColumnType::Date => "date".to_string(),
            ColumnType::Time => "time".to_string(),
            ColumnType::DateTime => "datetime".to_string(),
            ColumnType::Char => sized_type("char", column.size.max(1)),
            ColumnType::NChar => sized_type("nchar", column.size.max(1)),
            ColumnType::VarChar if column.size > 0 => sized_type("varchar", column.size),
            ColumnType::NVarChar if column.size > 0 => sized_type("nvarchar", column.size),
            ColumnType::VarChar
            | ColumnType::NVarChar
            | ColumnType::Text
            | ColumnType::NText
            | ColumnType::Interval => "text".to_string(),
            ColumnType::Guid => "guid".to_string(),
            ColumnType::Json => "json".to_string(),
            ColumnType::Xml => "xml".to_string(),
            ColumnType::Blob | ColumnType::RowVersion | ColumnType::Geometry => "blob".to_string(),
            ColumnType::UserDefined | ColumnType::Unknown if column.native_type.is_empty() => {
                "text".to_string()
            }
            ColumnType::UserDefined | ColumnType::Unknown => column.native_type.clone(),
        };
        Ok(name)
    }

    fn user_type_name(&self, _data_type: &DataType) -> Result<String> {
        Ok("text".to_string())
    }

    fn identity_clause(&self, table: &Table, column: &Column) -> Option<String> {
        if column.column_type.is_integer() && table.is_single_pk_column(&column.name) {
            Some("PRIMARY KEY AUTOINCREMENT".to_string())
        } else {
            None
        }
    }

    fn identity_declares_primary_key(&self) -> bool {
        true
    }

    fn format_bool(&self, value: bool) -> String {
        if value { "1" } else { "0" }.to_string()
    }

    fn foreign_keys_inline(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Identity, PrimaryKey};
    use crate::core::types::ColumnAttributes;
    use crate::core::value::Value;

    fn make_test_table() -> Table {
        let mut table = Table::new("items", "");
        let mut id = Column::new("id", ColumnType::BigInt);
        id.attributes = ColumnAttributes::REQUIRED | ColumnAttributes::IDENTITY;
        id.identity = Some(Identity::default());
        table.columns.push(id);
        table.primary_key = Some(PrimaryKey {
            name: "PK_items".to_string(),
            columns: vec!["id".to_string()],
        });
        table
    }

    #[test]
    fn test_identity_requires_single_integer_key() {
        let d = SqliteDialect::new();
        let mut table = make_test_table();
        let id = table.columns[0].clone();
        assert_eq!(d.type_name(&id, None).unwrap(), "integer");
        assert_eq!(
            d.identity_clause(&table, &id).as_deref(),
            Some("PRIMARY KEY AUTOINCREMENT")
        );

        table
            .primary_key
            .as_mut()
            .unwrap()
            .columns
            .push("other".to_string());
        assert_eq!(d.identity_clause(&table, &id), None);
    }

    #[test]
    fn test_type_names() {
        let d = SqliteDialect::new();
        let mut name = Column::new("name", ColumnType::NVarChar);
        assert_eq!(d.type_name(&name, None).unwrap(), "text");
        name.size = 40;
        assert_eq!(d.type_name(&name, None).unwrap(), "nvarchar(40)");
        let flag = Column::new("flag", ColumnType::UnsignedTinyInt);
        assert_eq!(d.type_name(&flag, None).unwrap(), "smallint");
    }

    #[test]
    fn test_literals() {
        let d = SqliteDialect::new();
        let col = Column::new("b", ColumnType::Boolean);
        assert_eq!(d.format_literal(&Value::Bool(true), &col).unwrap(), "1");
        let blob = Column::new("data", ColumnType::Blob);
        assert_eq!(
            d.format_literal(&Value::Bytes(vec![1, 2]), &blob).unwrap(),
            "X'0102'"
        );
    }
}
