//! MySQL/MariaDB generation strategy.
//!
//! Compatible with MySQL 5.7+, 8.0+, and MariaDB 10.2+.

use crate::core::identifier::{escape_string, quote_mysql};
use crate::core::schema::{Column, DataType, Table};
use crate::core::traits::{decimal_type, sized_type, SqlDialect};
use crate::core::types::{ColumnType, ForeignKeyRule};
use crate::drivers::DialectKind;
use crate::error::Result;
use crate::generator::options::{DialectOptions, ExportOptions};

/// Longest `varchar` that still fits a utf8mb4 row.
const MAX_VARCHAR: u32 = 16383;

/// Longest `varbinary` before falling back to `longblob`.
const MAX_VARBINARY: u32 = 65535;

/// MySQL/MariaDB dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Create a new MySQL dialect instance.
    pub fn new() -> Self {
        Self
    }

    fn varchar(size: u32) -> String {
        match size {
            0 => "varchar(255)".to_string(),
            n if n > MAX_VARCHAR => "longtext".to_string(),
            n => sized_type("varchar", n),
        }
    }
}

impl SqlDialect for MysqlDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Mysql
    }

    fn quote_ident(&self, name: &str) -> Result<String> {
        quote_mysql(name)
    }

    fn type_name(&self, column: &Column, data_type: Option<&DataType>) -> Result<String> {
        if let Some(dt) = data_type {
            return self.user_type_name(dt);
        }

        let name = match column.column_type {
            ColumnType::Boolean => "tinyint(1)".to_string(),
            ColumnType::TinyInt => "tinyint".to_string(),
            ColumnType::UnsignedTinyInt => "tinyint unsigned".to_string(),
            ColumnType::SmallInt => "smallint".to_string(),
            ColumnType::UnsignedSmallInt => "smallint unsigned".to_string(),
            ColumnType::Int => "int".to_string(),
            ColumnType::UnsignedInt => "int unsigned".to_string(),
            ColumnType::BigInt => "bigint".to_string(),
            ColumnType::UnsignedBigInt => "bigint unsigned".to_string(),
            ColumnType::Float => "float".to_string(),
            ColumnType::Double => "double".to_string(),
            ColumnType::Currency => "decimal(19,4)".to_string(),
            ColumnType::Decimal => decimal_type("decimal", column),
            ColumnType::Date => "date".to_string(),
            ColumnType::Time => "time".to_string(),
            ColumnType::DateTime => "datetime".to_string(),
            ColumnType::Interval => "varchar(64)".to_string(),
            ColumnType::Char | ColumnType::NChar => sized_type("char", column.size.clamp(1, 255)),
            ColumnType::VarChar | ColumnType::NVarChar => Self::varchar(column.size),
            ColumnType::Text | ColumnType::NText | ColumnType::Xml => "longtext".to_string(),
            ColumnType::Json => "json".to_string(),
            ColumnType::Guid => "char(36)".to_string(),
            ColumnType::Bit => sized_type("bit", column.size.clamp(1, 64)),
            ColumnType::Blob if column.size > 0 && column.size <= MAX_VARBINARY => {
                sized_type("varbinary", column.size)
            }
            ColumnType::Blob => "longblob".to_string(),
            ColumnType::RowVersion => "binary(8)".to_string(),
            ColumnType::Geometry => "geometry".to_string(),
            ColumnType::UserDefined | ColumnType::Unknown => column.native_type.clone(),
        };
        Ok(name)
    }

    /// Enumerations and sets are declared inline on the column.
    fn user_type_name(&self, data_type: &DataType) -> Result<String> {
        let values = data_type
            .values
            .iter()
            .map(|v| self.format_escaped(v))
            .collect::<Vec<_>>()
            .join(",");
        let keyword = if data_type.enumerated { "enum" } else { "set" };
        Ok(format!("{}({})", keyword, values))
    }

    fn identity_clause(&self, _table: &Table, _column: &Column) -> Option<String> {
        Some("AUTO_INCREMENT".to_string())
    }

    fn format_bool(&self, value: bool) -> String {
        if value { "1" } else { "0" }.to_string()
    }

    fn format_bits(&self, value: u64, size: u32) -> String {
        let width = size.clamp(1, 64) as usize;
        format!("b'{:0width$b}'", value, width = width)
    }

    fn format_text(&self, text: &str, _column: &Column) -> String {
        self.format_escaped(text)
    }

    fn table_suffix(&self, table: &Table, options: &ExportOptions) -> Result<String> {
        let mut suffix = ")".to_string();
        if let DialectOptions::Mysql {
            engine,
            charset,
            collation,
        } = &options.dialect_options
        {
            if let Some(engine) = engine {
                suffix.push_str(&format!(" ENGINE={}", engine));
            }
            if let Some(charset) = charset {
                suffix.push_str(&format!(" DEFAULT CHARSET={}", charset));
            }
            if let Some(collation) = collation {
                suffix.push_str(&format!(" COLLATE={}", collation));
            }
        }

        let seed = table
            .columns
            .iter()
            .filter(|c| c.is_identity())
            .find_map(|c| c.identity)
            .map(|identity| identity.seed);
        if let Some(seed) = seed.filter(|s| *s > 1) {
            suffix.push_str(&format!(" AUTO_INCREMENT={}", seed));
        }
        Ok(suffix)
    }

    /// InnoDB rejects SET DEFAULT.
    fn referential_action(&self, rule: ForeignKeyRule) -> Option<&'static str> {
        match rule {
            ForeignKeyRule::SetDefault => None,
            other => other.as_sql(),
        }
    }

    fn database_directive(&self, name: &str, options: &ExportOptions) -> Option<Vec<String>> {
        let quoted = quote_mysql(name).ok()?;
        let mut create = format!("CREATE DATABASE IF NOT EXISTS {}", quoted);
        if let DialectOptions::Mysql {
            charset, collation, ..
        } = &options.dialect_options
        {
            if let Some(charset) = charset {
                create.push_str(&format!(" CHARACTER SET {}", charset));
            }
            if let Some(collation) = collation {
                create.push_str(&format!(" COLLATE {}", collation));
            }
        }
        Some(vec![create, format!("USE {}", quoted)])
    }
}

impl MysqlDialect {
    /// Quote text, escaping backslashes as well as quotes.
    fn format_escaped(&self, text: &str) -> String {
        format!("'{}'", escape_string(&text.replace('\\', "\\\\")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::Identity;
    use crate::core::types::ColumnAttributes;
    use crate::core::value::Value;

    #[test]
    fn test_quote_ident() {
        let dialect = MysqlDialect::new();
        assert_eq!(dialect.quote_ident("name").unwrap(), "`name`");
        assert_eq!(dialect.quote_ident("table`name").unwrap(), "`table``name`");
    }

    #[test]
    fn test_unsigned_types_kept() {
        let d = MysqlDialect::new();
        let col = Column::new("c", ColumnType::UnsignedTinyInt);
        assert_eq!(d.type_name(&col, None).unwrap(), "tinyint unsigned");
        let col = Column::new("c", ColumnType::UnsignedBigInt);
        assert_eq!(d.type_name(&col, None).unwrap(), "bigint unsigned");
    }

    #[test]
    fn test_unsized_varchar() {
        let d = MysqlDialect::new();
        let mut col = Column::new("c", ColumnType::VarChar);
        assert_eq!(d.type_name(&col, None).unwrap(), "varchar(255)");
        col.size = 100_000;
        assert_eq!(d.type_name(&col, None).unwrap(), "longtext");
    }

    #[test]
    fn test_enum_inline() {
        let d = MysqlDialect::new();
        let dt = DataType {
            name: "t_size".to_string(),
            owner: String::new(),
            base_type: ColumnType::VarChar,
            values: vec!["s".to_string(), "it's".to_string()],
            enumerated: true,
        };
        let col = Column::new("size", ColumnType::UserDefined);
        assert_eq!(d.type_name(&col, Some(&dt)).unwrap(), "enum('s','it''s')");
    }

    #[test]
    fn test_literals() {
        let d = MysqlDialect::new();
        let mut bits = Column::new("b", ColumnType::Bit);
        bits.size = 4;
        assert_eq!(d.format_literal(&Value::UInt(5), &bits).unwrap(), "b'0101'");
        let text = Column::new("t", ColumnType::VarChar);
        assert_eq!(
            d.format_literal(&Value::Text("a\\b".into()), &text).unwrap(),
            "'a\\\\b'"
        );
    }

    #[test]
    fn test_table_suffix_options() {
        let d = MysqlDialect::new();
        let mut table = Table::new("t", "");
        let mut id = Column::new("id", ColumnType::Int);
        id.attributes = ColumnAttributes::IDENTITY;
        id.identity = Some(Identity {
            seed: 1000,
            increment: 1,
        });
        table.columns.push(id);
        let options = ExportOptions {
            dialect_options: DialectOptions::Mysql {
                engine: Some("InnoDB".into()),
                charset: Some("utf8mb4".into()),
                collation: None,
            },
            ..ExportOptions::default()
        };
        assert_eq!(
            d.table_suffix(&table, &options).unwrap(),
            ") ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 AUTO_INCREMENT=1000"
        );
    }

    #[test]
    fn test_database_directive() {
        let d = MysqlDialect::new();
        let stmts = d
            .database_directive("shop", &ExportOptions::default())
            .unwrap();
        assert_eq!(stmts, ["CREATE DATABASE IF NOT EXISTS `shop`", "USE `shop`"]);
    }
}
