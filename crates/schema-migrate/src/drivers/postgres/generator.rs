//! PostgreSQL generation strategy.

use crate::core::identifier::quote_ansi;
use crate::core::schema::{Column, DataType, Table};
use crate::core::traits::{decimal_type, sized_type, SqlDialect};
use crate::core::types::ColumnType;
use crate::drivers::DialectKind;
use crate::error::Result;
use crate::generator::options::{DialectOptions, ExportOptions};

/// PostgreSQL dialect implementation.
///
/// Enumerated domains become `CREATE TYPE ... AS ENUM`; sets have no
/// PostgreSQL counterpart and are stored as `text`.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Create a new PostgreSQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl SqlDialect for PostgresDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Postgres
    }

    fn type_name(&self, column: &Column, data_type: Option<&DataType>) -> Result<String> {
        if let Some(dt) = data_type {
            return self.user_type_name(dt);
        }

        let name = match column.column_type {
            ColumnType::Boolean => "boolean".to_string(),
            ColumnType::TinyInt | ColumnType::UnsignedTinyInt | ColumnType::SmallInt => {
                "smallint".to_string()
            }
            ColumnType::UnsignedSmallInt | ColumnType::Int => "integer".to_string(),
            ColumnType::UnsignedInt | ColumnType::BigInt => "bigint".to_string(),
            ColumnType::UnsignedBigInt => "numeric(20,0)".to_string(),
            ColumnType::Float => "real".to_string(),
            ColumnType::Double => "double precision".to_string(),
            ColumnType::Currency => "numeric(19,4)".to_string(),
            ColumnType::Decimal => decimal_type("numeric", column),
            ColumnType::Date => "date".to_string(),
            ColumnType::Time => "time".to_string(),
            ColumnType::DateTime => "timestamp".to_string(),
            ColumnType::Interval => "interval".to_string(),
            ColumnType::Char | ColumnType::NChar => sized_type("char", column.size.max(1)),
            ColumnType::VarChar | ColumnType::NVarChar if column.size > 0 => {
                sized_type("varchar", column.size)
            }
            ColumnType::VarChar | ColumnType::NVarChar | ColumnType::Text | ColumnType::NText => {
                "text".to_string()
            }
            ColumnType::Bit => sized_type("bit", column.size.max(1)),
            ColumnType::Blob | ColumnType::RowVersion => "bytea".to_string(),
            ColumnType::Guid => "uuid".to_string(),
            ColumnType::Xml => "xml".to_string(),
            ColumnType::Json => "jsonb".to_string(),
            ColumnType::Geometry => "text".to_string(),
            ColumnType::UserDefined | ColumnType::Unknown if column.native_type.is_empty() => {
                "text".to_string()
            }
            ColumnType::UserDefined | ColumnType::Unknown => column.native_type.clone(),
        };
        Ok(name)
    }

    fn user_type_name(&self, data_type: &DataType) -> Result<String> {
        if data_type.enumerated {
            self.quote_ident(&data_type.name)
        } else {
            Ok("text".to_string())
        }
    }

    fn create_type_statement(&self, data_type: &DataType) -> Result<Option<String>> {
        if !data_type.enumerated {
            return Ok(None);
        }
        let column = Column::new(&data_type.name, ColumnType::VarChar);
        let labels = data_type
            .values
            .iter()
            .map(|v| self.format_text(v, &column))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(Some(format!(
            "CREATE TYPE {} AS ENUM ({})",
            self.quote_ident(&data_type.name)?,
            labels
        )))
    }

    /// Identity columns must be `smallint`, `integer` or `bigint`.
    fn identity_clause(&self, _table: &Table, column: &Column) -> Option<String> {
        if !column.column_type.is_integer() || column.column_type == ColumnType::UnsignedBigInt {
            return None;
        }
        let identity = column.identity.unwrap_or_default();
        Some(format!(
            "GENERATED BY DEFAULT AS IDENTITY (START WITH {} INCREMENT BY {})",
            identity.seed, identity.increment
        ))
    }

    fn format_bits(&self, value: u64, size: u32) -> String {
        let width = size.clamp(1, 64) as usize;
        format!("B'{:0width$b}'", value, width = width)
    }

    fn format_bytes(&self, bytes: &[u8]) -> String {
        format!("'\\x{}'", hex::encode(bytes))
    }

    fn database_directive(&self, name: &str, options: &ExportOptions) -> Option<Vec<String>> {
        let mut create = format!("CREATE DATABASE {}", quote_ansi(name).ok()?);
        if let DialectOptions::Postgres { owner, encoding } = &options.dialect_options {
            if let Some(owner) = owner {
                create.push_str(&format!(" OWNER {}", quote_ansi(owner).ok()?));
            }
            if let Some(encoding) = encoding {
                create.push_str(&format!(" ENCODING '{}'", encoding));
            }
        }
        Some(vec![create])
    }

    /// Move each identity sequence past the inserted keys. An empty table
    /// leaves the sequence at its seed, not yet called.
    fn rows_epilogue(&self, table: &Table) -> Result<Vec<String>> {
        let table_name = self.table_name(&table.name)?;
        table
            .columns
            .iter()
            .filter(|c| c.is_identity() && self.identity_clause(table, c).is_some())
            .map(|c| {
                let column = self.quote_ident(&c.name)?;
                let seed = c.identity.as_ref().map_or(1, |identity| identity.seed);
                Ok(format!(
                    "SELECT setval(pg_get_serial_sequence('{}', '{}'), COALESCE(MAX({}), {}), MAX({}) IS NOT NULL) FROM {}",
                    table_name.replace('\'', "''"),
                    c.name.replace('\'', "''"),
                    column,
                    seed,
                    column,
                    table_name
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::Identity;
    use crate::core::types::ColumnAttributes;
    use crate::core::value::Value;

    fn make_test_enum() -> DataType {
        DataType {
            name: "mood".to_string(),
            owner: "public".to_string(),
            base_type: ColumnType::VarChar,
            values: vec!["sad".to_string(), "ok".to_string()],
            enumerated: true,
        }
    }

    #[test]
    fn test_type_names() {
        let d = PostgresDialect::new();
        let mut vc = Column::new("name", ColumnType::VarChar);
        assert_eq!(d.type_name(&vc, None).unwrap(), "text");
        vc.size = 30;
        assert_eq!(d.type_name(&vc, None).unwrap(), "varchar(30)");
        let ubig = Column::new("n", ColumnType::UnsignedBigInt);
        assert_eq!(d.type_name(&ubig, None).unwrap(), "numeric(20,0)");
        let tiny = Column::new("n", ColumnType::UnsignedTinyInt);
        assert_eq!(d.type_name(&tiny, None).unwrap(), "smallint");
    }

    #[test]
    fn test_enum_type() {
        let d = PostgresDialect::new();
        let dt = make_test_enum();
        assert_eq!(
            d.create_type_statement(&dt).unwrap().unwrap(),
            "CREATE TYPE \"mood\" AS ENUM ('sad', 'ok')"
        );
        let col = Column::new("m", ColumnType::UserDefined);
        assert_eq!(d.type_name(&col, Some(&dt)).unwrap(), "\"mood\"");

        let set = DataType {
            enumerated: false,
            ..make_test_enum()
        };
        assert_eq!(d.create_type_statement(&set).unwrap(), None);
        assert_eq!(d.type_name(&col, Some(&set)).unwrap(), "text");
    }

    #[test]
    fn test_literals() {
        let d = PostgresDialect::new();
        let mut bits = Column::new("b", ColumnType::Bit);
        bits.size = 3;
        assert_eq!(d.format_literal(&Value::UInt(5), &bits).unwrap(), "B'101'");
        let blob = Column::new("data", ColumnType::Blob);
        assert_eq!(
            d.format_literal(&Value::Bytes(vec![0xca, 0xfe]), &blob).unwrap(),
            "'\\xcafe'"
        );
        let flag = Column::new("f", ColumnType::Boolean);
        assert_eq!(d.format_literal(&Value::Bool(false), &flag).unwrap(), "FALSE");
    }

    #[test]
    fn test_identity_and_setval() {
        let d = PostgresDialect::new();
        let mut table = Table::new("orders", "public");
        let mut id = Column::new("id", ColumnType::BigInt);
        id.attributes = ColumnAttributes::REQUIRED | ColumnAttributes::IDENTITY;
        id.identity = Some(Identity {
            seed: 10,
            increment: 2,
        });
        table.columns.push(id.clone());

        assert_eq!(
            d.identity_clause(&table, &id).unwrap(),
            "GENERATED BY DEFAULT AS IDENTITY (START WITH 10 INCREMENT BY 2)"
        );
        assert_eq!(
            d.rows_epilogue(&table).unwrap(),
            ["SELECT setval(pg_get_serial_sequence('\"orders\"', 'id'), COALESCE(MAX(\"id\"), 10), MAX(\"id\") IS NOT NULL) FROM \"orders\""]
        );

        let mut dec = Column::new("id", ColumnType::Decimal);
        dec.attributes = ColumnAttributes::IDENTITY;
        assert_eq!(d.identity_clause(&table, &dec), None);
    }

    #[test]
    fn test_database_directive() {
        let d = PostgresDialect::new();
        let options = ExportOptions {
            dialect_options: DialectOptions::Postgres {
                owner: Some("app".into()),
                encoding: Some("UTF8".into()),
            },
            ..ExportOptions::default()
        };
        assert_eq!(
            d.database_directive("sales", &options).unwrap(),
            ["CREATE DATABASE \"sales\" OWNER \"app\" ENCODING 'UTF8'"]
        );
    }
}
