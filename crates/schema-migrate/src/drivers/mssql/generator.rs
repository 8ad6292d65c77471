//! SQL Server generation strategy.

use crate::core::identifier::quote_mssql;
use crate::core::schema::{Column, DataType, Table};
use crate::core::traits::{decimal_type, sized_type, SqlDialect};
use crate::core::types::{ColumnType, ForeignKeyRule};
use crate::drivers::DialectKind;
use crate::error::Result;
use crate::generator::options::{DialectOptions, ExportOptions};

/// Longest sized `varchar` / `varbinary`.
const MAX_BYTES: u32 = 8000;

/// Longest sized `nvarchar`.
const MAX_UNICODE_CHARS: u32 = 4000;

/// SQL Server dialect implementation.
///
/// Statements are separated into `GO` batches so the script runs unchanged
/// in `sqlcmd` and SSMS.
#[derive(Debug, Clone, Default)]
pub struct MssqlDialect;

impl MssqlDialect {
    /// Create a new SQL Server dialect instance.
    pub fn new() -> Self {
        Self
    }

    fn character_type(column: &Column, fixed: bool) -> String {
        let unicode = column.is_unicode();
        let (name, limit) = match (fixed, unicode) {
            (true, true) => ("nchar", MAX_UNICODE_CHARS),
            (true, false) => ("char", MAX_BYTES),
            (false, true) => ("nvarchar", MAX_UNICODE_CHARS),
            (false, false) => ("varchar", MAX_BYTES),
        };
        match column.size {
            0 if fixed => sized_type(name, 1),
            n if n <= limit && n > 0 => sized_type(name, n),
            // char(max) does not exist
            _ if fixed => format!("{}(max)", if unicode { "nvarchar" } else { "varchar" }),
            _ => format!("{}(max)", name),
        }
    }

    fn identity_target(&self, table: &Table) -> bool {
        table
            .columns
            .iter()
            .any(|c| c.is_identity() && self.identity_clause(table, c).is_some())
    }
}

impl SqlDialect for MssqlDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Mssql
    }

    fn quote_ident(&self, name: &str) -> Result<String> {
        quote_mssql(name)
    }

    fn type_name(&self, column: &Column, data_type: Option<&DataType>) -> Result<String> {
        if let Some(dt) = data_type {
            return self.user_type_name(dt);
        }

        let name = match column.column_type {
            ColumnType::Boolean => "bit".to_string(),
            ColumnType::TinyInt => "smallint".to_string(),
            ColumnType::UnsignedTinyInt => "tinyint".to_string(),
            ColumnType::SmallInt => "smallint".to_string(),
            ColumnType::UnsignedSmallInt | ColumnType::Int => "int".to_string(),
            ColumnType::UnsignedInt | ColumnType::BigInt => "bigint".to_string(),
            ColumnType::UnsignedBigInt => "decimal(20,0)".to_string(),
            ColumnType::Float => "real".to_string(),
            ColumnType::Double => "float".to_string(),
            ColumnType::Currency => "money".to_string(),
            ColumnType::Decimal => decimal_type("decimal", column),
            ColumnType::Date => "date".to_string(),
            ColumnType::Time => "time".to_string(),
            ColumnType::DateTime => "datetime2".to_string(),
            ColumnType::Interval => "varchar(64)".to_string(),
            ColumnType::Char | ColumnType::NChar => Self::character_type(column, true),
            ColumnType::VarChar | ColumnType::NVarChar => Self::character_type(column, false),
            ColumnType::Text if !column.is_unicode() => "varchar(max)".to_string(),
            ColumnType::Text | ColumnType::NText | ColumnType::Json => "nvarchar(max)".to_string(),
            ColumnType::Bit if column.size <= 1 => "bit".to_string(),
            ColumnType::Bit if column.size >= 64 => "decimal(20,0)".to_string(),
            ColumnType::Bit => "bigint".to_string(),
            ColumnType::Blob if column.size > 0 && column.size <= MAX_BYTES => {
                sized_type("varbinary", column.size)
            }
            ColumnType::Blob => "varbinary(max)".to_string(),
            ColumnType::RowVersion => "rowversion".to_string(),
            ColumnType::Guid => "uniqueidentifier".to_string(),
            ColumnType::Xml => "xml".to_string(),
            ColumnType::Geometry => "geometry".to_string(),
            ColumnType::UserDefined | ColumnType::Unknown if column.native_type.is_empty() => {
                "nvarchar(max)".to_string()
            }
            ColumnType::UserDefined | ColumnType::Unknown => column.native_type.clone(),
        };
        Ok(name)
    }

    /// Domains become plain strings wide enough for their longest value.
    fn user_type_name(&self, data_type: &DataType) -> Result<String> {
        Ok(sized_type(
            "nvarchar",
            data_type.max_value_len().clamp(1, MAX_UNICODE_CHARS as usize) as u32,
        ))
    }

    /// `IDENTITY` accepts integers and decimals of scale 0.
    fn identity_clause(&self, _table: &Table, column: &Column) -> Option<String> {
        let allowed = column.column_type.is_integer()
            || (column.column_type == ColumnType::Decimal && column.scale == 0);
        if !allowed {
            return None;
        }
        let identity = column.identity.unwrap_or_default();
        Some(format!("IDENTITY({},{})", identity.seed, identity.increment))
    }

    fn format_bool(&self, value: bool) -> String {
        if value { "1" } else { "0" }.to_string()
    }

    fn format_text(&self, text: &str, column: &Column) -> String {
        let quoted = format!("'{}'", text.replace('\'', "''"));
        if column.is_unicode() || !text.is_ascii() {
            format!("N{}", quoted)
        } else {
            quoted
        }
    }

    fn format_bytes(&self, bytes: &[u8]) -> String {
        format!("0x{}", hex::encode_upper(bytes))
    }

    /// SQL Server has neither RESTRICT nor an equivalent keyword.
    fn referential_action(&self, rule: ForeignKeyRule) -> Option<&'static str> {
        match rule {
            ForeignKeyRule::Restrict => None,
            other => other.as_sql(),
        }
    }

    fn statement_delimiter(&self) -> &'static str {
        "\nGO"
    }

    fn database_directive(&self, name: &str, options: &ExportOptions) -> Option<Vec<String>> {
        let quoted = quote_mssql(name).ok()?;
        let mut create = format!("CREATE DATABASE {}", quoted);
        if let DialectOptions::Mssql {
            collation: Some(collation),
        } = &options.dialect_options
        {
            create.push_str(&format!(" COLLATE {}", collation));
        }
        Some(vec![create, format!("USE {}", quoted)])
    }

    /// Computed and `rowversion` columns are always server-generated.
    fn is_insertable(&self, column: &Column) -> bool {
        !column.is_computed() && column.column_type != ColumnType::RowVersion
    }

    fn rows_prologue(&self, table: &Table) -> Result<Vec<String>> {
        if !self.identity_target(table) {
            return Ok(Vec::new());
        }
        Ok(vec![format!(
            "SET IDENTITY_INSERT {} ON",
            self.table_name(&table.name)?
        )])
    }

    fn rows_epilogue(&self, table: &Table) -> Result<Vec<String>> {
        if !self.identity_target(table) {
            return Ok(Vec::new());
        }
        Ok(vec![format!(
            "SET IDENTITY_INSERT {} OFF",
            self.table_name(&table.name)?
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::Identity;
    use crate::core::types::ColumnAttributes;
    use crate::core::value::Value;

    fn make_test_identity_table() -> Table {
        let mut table = Table::new("Orders", "dbo");
        let mut id = Column::new("OrderId", ColumnType::Int);
        id.attributes = ColumnAttributes::REQUIRED | ColumnAttributes::IDENTITY;
        id.identity = Some(Identity {
            seed: 100,
            increment: 5,
        });
        table.columns.push(id);
        table.columns.push(Column::new("Note", ColumnType::VarChar));
        table
    }

    #[test]
    fn test_quote_ident() {
        let d = MssqlDialect::new();
        assert_eq!(d.quote_ident("Order Details").unwrap(), "[Order Details]");
        assert_eq!(d.quote_ident("a]b").unwrap(), "[a]]b]");
    }

    #[test]
    fn test_character_types() {
        let d = MssqlDialect::new();
        let mut col = Column::new("c", ColumnType::NVarChar);
        col.attributes = ColumnAttributes::UNICODE;
        col.size = 50;
        assert_eq!(d.type_name(&col, None).unwrap(), "nvarchar(50)");
        col.size = 5000;
        assert_eq!(d.type_name(&col, None).unwrap(), "nvarchar(max)");

        let mut col = Column::new("c", ColumnType::VarChar);
        col.size = 5000;
        assert_eq!(d.type_name(&col, None).unwrap(), "varchar(5000)");
        col.size = 0;
        assert_eq!(d.type_name(&col, None).unwrap(), "varchar(max)");

        let col = Column::new("c", ColumnType::Char);
        assert_eq!(d.type_name(&col, None).unwrap(), "char(1)");
    }

    #[test]
    fn test_numeric_types() {
        let d = MssqlDialect::new();
        let tiny = Column::new("c", ColumnType::UnsignedTinyInt);
        assert_eq!(d.type_name(&tiny, None).unwrap(), "tinyint");
        let signed = Column::new("c", ColumnType::TinyInt);
        assert_eq!(d.type_name(&signed, None).unwrap(), "smallint");
        let mut bits = Column::new("c", ColumnType::Bit);
        bits.size = 8;
        assert_eq!(d.type_name(&bits, None).unwrap(), "bigint");
        bits.size = 1;
        assert_eq!(d.type_name(&bits, None).unwrap(), "bit");
    }

    #[test]
    fn test_literals() {
        let d = MssqlDialect::new();
        let mut text = Column::new("t", ColumnType::NVarChar);
        text.attributes = ColumnAttributes::UNICODE;
        assert_eq!(
            d.format_literal(&Value::Text("it's".into()), &text).unwrap(),
            "N'it''s'"
        );
        let plain = Column::new("t", ColumnType::VarChar);
        assert_eq!(
            d.format_literal(&Value::Text("café".into()), &plain).unwrap(),
            "N'café'"
        );
        let blob = Column::new("b", ColumnType::Blob);
        assert_eq!(
            d.format_literal(&Value::Bytes(vec![0xde, 0xad]), &blob).unwrap(),
            "0xDEAD"
        );
        let flag = Column::new("f", ColumnType::Boolean);
        assert_eq!(d.format_literal(&Value::Bool(true), &flag).unwrap(), "1");
    }

    #[test]
    fn test_identity_insert_wraps_rows() {
        let d = MssqlDialect::new();
        let table = make_test_identity_table();
        assert_eq!(
            d.identity_clause(&table, &table.columns[0]).unwrap(),
            "IDENTITY(100,5)"
        );
        assert_eq!(
            d.rows_prologue(&table).unwrap(),
            ["SET IDENTITY_INSERT [Orders] ON"]
        );
        assert_eq!(
            d.rows_epilogue(&table).unwrap(),
            ["SET IDENTITY_INSERT [Orders] OFF"]
        );

        let plain = Table::new("Notes", "dbo");
        assert!(d.rows_prologue(&plain).unwrap().is_empty());
    }

    #[test]
    fn test_rowversion_not_insertable() {
        let d = MssqlDialect::new();
        let col = Column::new("rv", ColumnType::RowVersion);
        assert!(!d.is_insertable(&col));
        assert!(d.is_insertable(&Column::new("n", ColumnType::Int)));
    }

    #[test]
    fn test_restrict_is_omitted() {
        let d = MssqlDialect::new();
        assert_eq!(d.referential_action(ForeignKeyRule::Restrict), None);
        assert_eq!(d.referential_action(ForeignKeyRule::Cascade), Some("CASCADE"));
    }

    #[test]
    fn test_database_directive() {
        let d = MssqlDialect::new();
        let options = ExportOptions {
            dialect_options: DialectOptions::Mssql {
                collation: Some("Latin1_General_CI_AS".into()),
            },
            ..ExportOptions::default()
        };
        assert_eq!(
            d.database_directive("Sales", &options).unwrap(),
            ["CREATE DATABASE [Sales] COLLATE Latin1_General_CI_AS", "USE [Sales]"]
        );
        assert_eq!(d.statement_delimiter(), "\nGO");
    }
}
