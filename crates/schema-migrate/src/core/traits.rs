//! Core traits for dialect-neutral schema translation.
//!
//! - [`SchemaProvider`]: answers catalog questions for one source database
//! - [`SqlDialect`]: emission strategy for one target dialect
//!
//! # Design Patterns
//!
//! - **Strategy**: each target dialect is a [`SqlDialect`] implementation that
//!   overrides only what differs from the default (ANSI) behavior.
//! - **Template Method**: the generator drives the traversal and calls back
//!   into the strategy for every dialect-dependent fragment.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::drivers::DialectKind;
use crate::error::{MigrateError, Result};
use crate::generator::options::ExportOptions;

use super::identifier::{escape_string, quote_ansi, quote_list, validate_check_expression};
use super::meta::{ColumnMeta, ForeignKeyMeta, IndexMeta, ObjectName, TableMeta, TypeMeta};
use super::schema::{CheckConstraint, Column, DataType, ForeignKey, Index, PrimaryKey, Table};
use super::types::{ColumnType, ForeignKeyRule};
use super::value::Value;

/// Read schema facts (and optionally data) from a source database.
///
/// The model builder calls these methods in sequence: table names, then for
/// each table its meta, columns, indexes and foreign keys. Implementations
/// map native types into [`ColumnType`] and unwrap catalog default strings
/// into [`Value`]s before answering.
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    /// Dialect this provider reads.
    fn dialect(&self) -> DialectKind;

    /// List base tables in catalog order.
    async fn table_names(&self) -> Result<Vec<ObjectName>>;

    /// Column names of a table, in ordinal order.
    async fn column_names(&self, table: &str, owner: &str) -> Result<Vec<String>>;

    /// Index names of a table (including the one backing the primary key).
    async fn index_names(&self, table: &str, owner: &str) -> Result<Vec<String>>;

    /// Foreign key constraint names of a table.
    async fn foreign_key_names(&self, table: &str, owner: &str) -> Result<Vec<String>>;

    /// Table-level facts, including the primary key.
    async fn table_meta(&self, table: &str, owner: &str) -> Result<TableMeta>;

    /// Facts about one column.
    async fn column_meta(&self, table: &str, owner: &str, column: &str) -> Result<ColumnMeta>;

    /// Facts about one index.
    async fn index_meta(&self, table: &str, owner: &str, index: &str) -> Result<IndexMeta>;

    /// Facts about one foreign key.
    async fn foreign_key_meta(
        &self,
        table: &str,
        owner: &str,
        foreign_key: &str,
    ) -> Result<ForeignKeyMeta>;

    /// Enumerated / set domains declared in the database.
    async fn type_names(&self) -> Result<Vec<ObjectName>> {
        Ok(Vec::new())
    }

    /// Facts about one domain returned by [`type_names`](Self::type_names).
    async fn type_meta(&self, name: &str, owner: &str) -> Result<TypeMeta> {
        Err(MigrateError::Provider(format!(
            "{} does not declare user-defined type {}.{}",
            self.dialect(),
            owner,
            name
        )))
    }

    /// Check constraints of a table.
    async fn check_constraints(&self, _table: &str, _owner: &str) -> Result<Vec<CheckConstraint>> {
        Ok(Vec::new())
    }

    /// Read every row of a table, decoded according to `columns`.
    async fn read_rows(&self, table: &str, owner: &str, columns: &[Column])
        -> Result<Vec<Vec<Value>>>;

    /// Release connections.
    async fn close(&self);
}

/// Emission strategy for one target dialect.
///
/// Every method has a default producing ANSI-flavored SQL; dialects override
/// only the fragments where they differ. Methods return fragments, never
/// whole scripts: the generator owns statement order and delimiters.
pub trait SqlDialect: Send + Sync {
    /// Dialect this strategy emits.
    fn kind(&self) -> DialectKind;

    // ===== Identifiers =====

    /// Quote one identifier.
    fn quote_ident(&self, name: &str) -> Result<String> {
        quote_ansi(name)
    }

    /// Name used for a table in emitted statements.
    ///
    /// Owners are not carried across dialects (`dbo`, `public` and MySQL
    /// database names do not translate), so tables are emitted unqualified.
    fn table_name(&self, table: &str) -> Result<String> {
        self.quote_ident(table)
    }

    /// Quote and join a list of column names.
    fn column_list(&self, columns: &[String]) -> Result<String> {
        quote_list(columns, |c| self.quote_ident(c))
    }

    // ===== Types =====

    /// Target type for a column.
    ///
    /// `data_type` is the resolved domain when the column is
    /// [`ColumnType::UserDefined`].
    fn type_name(&self, column: &Column, data_type: Option<&DataType>) -> Result<String> {
        if let Some(dt) = data_type {
            return self.user_type_name(dt);
        }
        Ok(ansi_type_name(column))
    }

    /// Target type for a column drawing its values from a domain.
    fn user_type_name(&self, data_type: &DataType) -> Result<String> {
        Ok(format!("varchar({})", data_type.max_value_len().max(1)))
    }

    /// Statement declaring a domain before any table uses it.
    fn create_type_statement(&self, _data_type: &DataType) -> Result<Option<String>> {
        Ok(None)
    }

    /// Identity fragment for `column`, `None` when the dialect cannot express it.
    fn identity_clause(&self, _table: &Table, column: &Column) -> Option<String> {
        let identity = column.identity.unwrap_or_default();
        Some(format!(
            "GENERATED BY DEFAULT AS IDENTITY (START WITH {} INCREMENT BY {})",
            identity.seed, identity.increment
        ))
    }

    /// Whether a non-`None` identity clause also declares the primary key.
    fn identity_declares_primary_key(&self) -> bool {
        false
    }

    // ===== Literals =====

    /// Render a value as a literal for `column`.
    fn format_literal(&self, value: &Value, column: &Column) -> Result<String> {
        match value {
            Value::Null => Ok("NULL".to_string()),
            Value::Bool(b) => Ok(self.format_bool(*b)),
            Value::Int(i) => Ok(i.to_string()),
            Value::UInt(u) if column.column_type == ColumnType::Bit => {
                Ok(self.format_bits(*u, column.size))
            }
            Value::UInt(u) => Ok(u.to_string()),
            Value::Float(f) => format_float(*f),
            Value::Decimal(d) => Ok(d.to_string()),
            Value::Text(s) => Ok(self.format_text(s, column)),
            Value::Bytes(b) => Ok(self.format_bytes(b)),
            Value::Guid(g) => Ok(self.format_text(&g.to_string(), column)),
            Value::Date(d) => Ok(self.format_date(d)),
            Value::Time(t) => Ok(self.format_time(t)),
            Value::DateTime(dt) => Ok(self.format_datetime(dt)),
        }
    }

    fn format_bool(&self, value: bool) -> String {
        if value { "TRUE" } else { "FALSE" }.to_string()
    }

    /// Bit strings render as their numeric value by default.
    fn format_bits(&self, value: u64, _size: u32) -> String {
        value.to_string()
    }

    fn format_text(&self, text: &str, _column: &Column) -> String {
        format!("'{}'", escape_string(text))
    }

    fn format_bytes(&self, bytes: &[u8]) -> String {
        format!("X'{}'", hex::encode_upper(bytes))
    }

    fn format_date(&self, date: &NaiveDate) -> String {
        format!("'{}'", date.format("%Y-%m-%d"))
    }

    fn format_time(&self, time: &NaiveTime) -> String {
        format!("'{}'", format_time_text(time))
    }

    fn format_datetime(&self, datetime: &NaiveDateTime) -> String {
        format!(
            "'{} {}'",
            datetime.date().format("%Y-%m-%d"),
            format_time_text(&datetime.time())
        )
    }

    // ===== Tables =====

    /// Opening of a `CREATE TABLE` statement.
    fn table_prefix(&self, table: &Table) -> Result<String> {
        Ok(format!("CREATE TABLE {} (", self.table_name(&table.name)?))
    }

    /// Closing of a `CREATE TABLE` statement (storage options go here).
    fn table_suffix(&self, _table: &Table, _options: &ExportOptions) -> Result<String> {
        Ok(")".to_string())
    }

    /// Table-body primary key clause.
    fn primary_key_clause(&self, primary_key: &PrimaryKey) -> Result<String> {
        let columns = self.column_list(&primary_key.columns)?;
        if primary_key.name.is_empty() {
            Ok(format!("PRIMARY KEY ({})", columns))
        } else {
            Ok(format!(
                "CONSTRAINT {} PRIMARY KEY ({})",
                self.quote_ident(&primary_key.name)?,
                columns
            ))
        }
    }

    /// Table-body check clause. Parsed expressions quote their column
    /// references like every other identifier; unparsed text goes out as is.
    fn check_clause(&self, check: &CheckConstraint) -> Result<String> {
        let expression = match &check.expr {
            Some(expr) => expr.to_sql(|name| self.quote_ident(name))?,
            None => {
                validate_check_expression(&check.expression)?;
                check.expression.clone()
            }
        };
        if check.name.is_empty() {
            Ok(format!("CHECK ({})", expression))
        } else {
            Ok(format!(
                "CONSTRAINT {} CHECK ({})",
                self.quote_ident(&check.name)?,
                expression
            ))
        }
    }

    /// Keyword for a referential action, `None` to omit the clause.
    fn referential_action(&self, rule: ForeignKeyRule) -> Option<&'static str> {
        rule.as_sql()
    }

    /// Foreign key clause, usable inline or after `ALTER TABLE ... ADD`.
    fn foreign_key_clause(&self, foreign_key: &ForeignKey) -> Result<String> {
        let mut sql = String::new();
        if !foreign_key.name.is_empty() {
            sql.push_str(&format!(
                "CONSTRAINT {} ",
                self.quote_ident(&foreign_key.name)?
            ));
        }
        sql.push_str(&format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            self.column_list(&foreign_key.columns)?,
            self.table_name(&foreign_key.related_table)?,
            self.column_list(&foreign_key.related_columns)?
        ));
        if let Some(action) = self.referential_action(foreign_key.update_rule) {
            sql.push_str(" ON UPDATE ");
            sql.push_str(action);
        }
        if let Some(action) = self.referential_action(foreign_key.delete_rule) {
            sql.push_str(" ON DELETE ");
            sql.push_str(action);
        }
        Ok(sql)
    }

    /// Whether foreign keys must be declared inside `CREATE TABLE`.
    fn foreign_keys_inline(&self) -> bool {
        false
    }

    /// `CREATE INDEX` statement.
    fn index_statement(&self, table: &Table, index: &Index) -> Result<String> {
        Ok(format!(
            "CREATE {}INDEX {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            self.quote_ident(&index.name)?,
            self.table_name(&table.name)?,
            self.column_list(&index.columns)?
        ))
    }

    // ===== Scripts =====

    /// Text written after every statement.
    fn statement_delimiter(&self) -> &'static str {
        ";"
    }

    /// Statements creating and selecting the target database.
    ///
    /// `None` means the dialect has no such directive.
    fn database_directive(&self, _name: &str, _options: &ExportOptions) -> Option<Vec<String>> {
        None
    }

    /// Whether data rows may supply a value for `column`.
    fn is_insertable(&self, column: &Column) -> bool {
        !column.is_computed()
    }

    /// Statements emitted before a table's rows.
    fn rows_prologue(&self, _table: &Table) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    /// Statements emitted after a table's rows.
    fn rows_epilogue(&self, _table: &Table) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// ANSI type names, the fallback for dialects that do not override a type.
pub fn ansi_type_name(column: &Column) -> String {
    match column.column_type {
        ColumnType::Boolean => "boolean".to_string(),
        ColumnType::TinyInt | ColumnType::UnsignedTinyInt | ColumnType::SmallInt => {
            "smallint".to_string()
        }
        ColumnType::UnsignedSmallInt | ColumnType::Int => "integer".to_string(),
        ColumnType::UnsignedInt | ColumnType::BigInt => "bigint".to_string(),
        ColumnType::UnsignedBigInt => "decimal(20,0)".to_string(),
        ColumnType::Float => "real".to_string(),
        ColumnType::Double => "double precision".to_string(),
        ColumnType::Currency => "decimal(19,4)".to_string(),
        ColumnType::Decimal => decimal_type("decimal", column),
        ColumnType::Date => "date".to_string(),
        ColumnType::Time => "time".to_string(),
        ColumnType::DateTime => "timestamp".to_string(),
        ColumnType::Interval => "interval".to_string(),
        ColumnType::Char => sized_type("char", column.size.max(1)),
        ColumnType::NChar => sized_type("nchar", column.size.max(1)),
        ColumnType::VarChar | ColumnType::NVarChar if column.size > 0 => {
            sized_type("varchar", column.size)
        }
        ColumnType::VarChar
        | ColumnType::NVarChar
        | ColumnType::Text
        | ColumnType::NText
        | ColumnType::Xml
        | ColumnType::Json
        | ColumnType::Guid => "varchar(4000)".to_string(),
        ColumnType::Bit => sized_type("bit", column.size.max(1)),
        ColumnType::Blob | ColumnType::RowVersion | ColumnType::Geometry => "blob".to_string(),
        ColumnType::UserDefined | ColumnType::Unknown => column.native_type.clone(),
    }
}

/// `name(size)`.
pub fn sized_type(name: &str, size: u32) -> String {
    format!("{}({})", name, size)
}

/// `name(p,s)`, or the bare name when the column carries no precision.
pub fn decimal_type(name: &str, column: &Column) -> String {
    if column.precision == 0 {
        name.to_string()
    } else {
        format!("{}({},{})", name, column.precision, column.scale)
    }
}

/// `HH:MM:SS` with the fraction only when non-zero.
pub fn format_time_text(time: &NaiveTime) -> String {
    if time.nanosecond() == 0 {
        time.format("%H:%M:%S").to_string()
    } else {
        time.format("%H:%M:%S%.6f").to_string()
    }
}

fn format_float(value: f64) -> Result<String> {
    if value.is_finite() {
        Ok(value.to_string())
    } else {
        Err(MigrateError::Generate(format!(
            "Non-finite float {} has no SQL literal",
            value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ColumnAttributes;

    struct AnsiDialect;

    impl SqlDialect for AnsiDialect {
        fn kind(&self) -> DialectKind {
            DialectKind::Postgres
        }
    }

    fn make_test_column(name: &str, column_type: ColumnType) -> Column {
        Column::new(name, column_type)
    }

    #[test]
    fn test_default_literals() {
        let d = AnsiDialect;
        let text = make_test_column("t", ColumnType::VarChar);
        assert_eq!(d.format_literal(&Value::Null, &text).unwrap(), "NULL");
        assert_eq!(d.format_literal(&Value::Bool(true), &text).unwrap(), "TRUE");
        assert_eq!(
            d.format_literal(&Value::Text("it's".into()), &text).unwrap(),
            "'it''s'"
        );
        assert_eq!(
            d.format_literal(&Value::Bytes(vec![0xab, 0x01]), &text).unwrap(),
            "X'AB01'"
        );
        let time = NaiveTime::from_hms_milli_opt(12, 30, 0, 250).unwrap();
        assert_eq!(
            d.format_literal(&Value::Time(time), &text).unwrap(),
            "'12:30:00.250000'"
        );
    }

    #[test]
    fn test_non_finite_float_rejected() {
        let d = AnsiDialect;
        let col = make_test_column("f", ColumnType::Double);
        assert!(d.format_literal(&Value::Float(f64::NAN), &col).is_err());
        assert_eq!(d.format_literal(&Value::Float(1.5), &col).unwrap(), "1.5");
    }

    #[test]
    fn test_default_foreign_key_clause() {
        let d = AnsiDialect;
        let fk = ForeignKey {
            name: "FK_a_b".to_string(),
            columns: vec!["b_id".to_string()],
            related_table: "b".to_string(),
            related_owner: String::new(),
            related_columns: vec!["id".to_string()],
            update_rule: ForeignKeyRule::Cascade,
            delete_rule: ForeignKeyRule::None,
        };
        assert_eq!(
            d.foreign_key_clause(&fk).unwrap(),
            "CONSTRAINT \"FK_a_b\" FOREIGN KEY (\"b_id\") REFERENCES \"b\" (\"id\") ON UPDATE CASCADE"
        );
    }

    #[test]
    fn test_default_identity_clause() {
        let d = AnsiDialect;
        let table = Table::new("t", "");
        let mut col = make_test_column("id", ColumnType::Int);
        col.attributes = ColumnAttributes::IDENTITY;
        col.identity = Some(crate::core::schema::Identity {
            seed: 100,
            increment: 5,
        });
        assert_eq!(
            d.identity_clause(&table, &col).unwrap(),
            "GENERATED BY DEFAULT AS IDENTITY (START WITH 100 INCREMENT BY 5)"
        );
    }

    #[test]
    fn test_ansi_type_name_fallbacks() {
        let mut unknown = make_test_column("g", ColumnType::Unknown);
        unknown.native_type = "hierarchyid".to_string();
        assert_eq!(ansi_type_name(&unknown), "hierarchyid");

        let mut dec = make_test_column("d", ColumnType::Decimal);
        dec.precision = 10;
        dec.scale = 2;
        assert_eq!(ansi_type_name(&dec), "decimal(10,2)");
    }
}
