//! Script generation: a visitor over the portable model.
//!
//! [`Generator`] owns traversal order, statement delimiters and the export
//! flags; the [`SqlDialect`] strategy it is handed supplies every
//! dialect-specific fragment. The traversal is:
//!
//! 1. create-database directive (when requested)
//! 2. user-defined types used by exported tables
//! 3. each exported table, followed by its indexes
//! 4. foreign keys, once every table exists (inline on SQLite)
//! 5. data rows
//!
//! Output depends only on the model and the options, so the same input
//! always produces the same script.

pub mod options;

use std::io::Write;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::schema::{Column, DataType, Database, ForeignKey, Table};
use crate::core::traits::SqlDialect;
use crate::core::types::ColumnType;
use crate::core::value::Value;
use crate::error::{MigrateError, Result};

pub use options::{DialectOptions, ExportFlags, ExportOptions};

/// What happened to the create-database directive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveStatus {
    /// `create_database` was off.
    #[default]
    NotRequested,
    /// The directive was written.
    Emitted,
    /// The target dialect cannot express it; nothing was written.
    Unsupported,
}

/// Summary of one generation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationReport {
    pub database_directive: DirectiveStatus,
    pub types: usize,
    pub tables: usize,
    pub indexes: usize,
    pub foreign_keys: usize,
    pub rows: usize,
    /// Objects that were skipped or degraded.
    pub warnings: Vec<String>,
}

/// Writes a script for one target dialect into `W`.
pub struct Generator<'a, W: Write> {
    dialect: &'a dyn SqlDialect,
    sink: W,
    options: ExportOptions,
    report: GenerationReport,
}

impl<'a, W: Write> Generator<'a, W> {
    /// Create a generator writing `dialect` statements into `sink`.
    pub fn new(dialect: &'a dyn SqlDialect, sink: W, options: ExportOptions) -> Self {
        Self {
            dialect,
            sink,
            options,
            report: GenerationReport::default(),
        }
    }

    /// Give back the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Emit the whole script for `database`.
    ///
    /// On error the sink holds a partial script that callers should discard.
    pub fn visit_database(&mut self, database: &Database) -> Result<GenerationReport> {
        self.report = GenerationReport::default();
        info!(
            "Generating {} script for {} tables",
            self.dialect.kind(),
            database.checked_tables().count()
        );

        if self.options.create_database {
            self.visit_directive(database)?;
        }

        if self.options.export_schema {
            for data_type in used_types(database) {
                self.visit_data_type(data_type)?;
            }
            for table in database.checked_tables() {
                self.visit_table(database, table)?;
            }
            if self.options.has(ExportFlags::FOREIGN_KEYS) && !self.dialect.foreign_keys_inline() {
                for table in database.checked_tables() {
                    for foreign_key in &table.foreign_keys {
                        self.visit_foreign_key(database, table, foreign_key)?;
                    }
                }
            }
        }

        if self.options.export_data {
            for table in database.checked_tables() {
                self.visit_rows(table)?;
            }
        }

        self.sink.flush()?;
        info!(
            "Generated {} tables, {} indexes, {} foreign keys, {} rows",
            self.report.tables, self.report.indexes, self.report.foreign_keys, self.report.rows
        );
        Ok(std::mem::take(&mut self.report))
    }

    fn visit_directive(&mut self, database: &Database) -> Result<()> {
        let name = self
            .options
            .database_name
            .clone()
            .unwrap_or_else(|| database.name.clone());

        match self.dialect.database_directive(&name, &self.options) {
            Some(statements) => {
                for sql in &statements {
                    self.statement(sql)?;
                }
                self.blank_line()?;
                self.report.database_directive = DirectiveStatus::Emitted;
            }
            None => {
                self.warning(format!(
                    "{} has no create-database directive; database {} was not created",
                    self.dialect.kind(),
                    name
                ));
                self.report.database_directive = DirectiveStatus::Unsupported;
            }
        }
        Ok(())
    }

    fn visit_data_type(&mut self, data_type: &DataType) -> Result<()> {
        if let Some(sql) = self.dialect.create_type_statement(data_type)? {
            self.statement(&sql)?;
            self.report.types += 1;
        }
        Ok(())
    }

    fn visit_table(&mut self, database: &Database, table: &Table) -> Result<()> {
        debug!("Generating table {}", table.full_name());
        let mut items = Vec::with_capacity(table.columns.len() + 1);
        let mut identity_declared_pk = false;

        for column in &table.columns {
            let (definition, has_identity) = self.column_definition(database, table, column)?;
            identity_declared_pk |= has_identity && self.dialect.identity_declares_primary_key();
            items.push(definition);
        }

        if let Some(primary_key) = &table.primary_key {
            if self.options.has(ExportFlags::PRIMARY_KEYS)
                && table.has_pk()
                && !identity_declared_pk
            {
                items.push(self.dialect.primary_key_clause(primary_key)?);
            }
        }

        for check in &table.check_constraints {
            items.push(self.dialect.check_clause(check)?);
        }

        if self.options.has(ExportFlags::FOREIGN_KEYS) && self.dialect.foreign_keys_inline() {
            for foreign_key in &table.foreign_keys {
                if self.references_exported_table(database, table, foreign_key) {
                    items.push(self.dialect.foreign_key_clause(foreign_key)?);
                    self.report.foreign_keys += 1;
                }
            }
        }

        let sql = format!(
            "{}\n    {}\n{}",
            self.dialect.table_prefix(table)?,
            items.join(",\n    "),
            self.dialect.table_suffix(table, &self.options)?
        );
        self.statement(&sql)?;
        self.report.tables += 1;

        if self.options.has(ExportFlags::INDEXES) {
            for index in &table.indexes {
                // The primary key already created this index.
                if index.primary_key || index.columns.is_empty() {
                    continue;
                }
                let sql = self.dialect.index_statement(table, index)?;
                self.statement(&sql)?;
                self.report.indexes += 1;
            }
        }

        self.blank_line()
    }

    /// Column definition and whether an identity clause was emitted.
    fn column_definition(
        &mut self,
        database: &Database,
        table: &Table,
        column: &Column,
    ) -> Result<(String, bool)> {
        let data_type = if column.column_type == ColumnType::UserDefined {
            database.data_type(&column.native_type)
        } else {
            None
        };

        let mut sql = format!(
            "{} {}",
            self.dialect.quote_ident(&column.name)?,
            self.dialect.type_name(column, data_type)?
        );

        let identity = if self.options.has(ExportFlags::IDENTITIES) && column.is_identity() {
            let clause = self.dialect.identity_clause(table, column);
            if clause.is_none() {
                self.warning(format!(
                    "{} cannot make {}.{} ({}) an identity column; emitted as a plain column",
                    self.dialect.kind(),
                    table.name,
                    column.name,
                    column.column_type
                ));
            }
            clause
        } else {
            None
        };

        if let Some(clause) = &identity {
            sql.push(' ');
            sql.push_str(clause);
        }
        if !column.is_nullable() {
            sql.push_str(" NOT NULL");
        }
        if identity.is_none() && self.options.has(ExportFlags::DEFAULTS) {
            if let Some(default) = column.default.as_ref().filter(|v| **v != Value::Null) {
                sql.push_str(" DEFAULT ");
                sql.push_str(&self.dialect.format_literal(default, column)?);
            }
        }

        Ok((sql, identity.is_some()))
    }

    fn visit_foreign_key(
        &mut self,
        database: &Database,
        table: &Table,
        foreign_key: &ForeignKey,
    ) -> Result<()> {
        if !self.references_exported_table(database, table, foreign_key) {
            return Ok(());
        }
        let sql = format!(
            "ALTER TABLE {} ADD {}",
            self.dialect.table_name(&table.name)?,
            self.dialect.foreign_key_clause(foreign_key)?
        );
        self.statement(&sql)?;
        self.report.foreign_keys += 1;
        Ok(())
    }

    fn references_exported_table(
        &mut self,
        database: &Database,
        table: &Table,
        foreign_key: &ForeignKey,
    ) -> bool {
        let exported = database
            .table(&foreign_key.related_table, &foreign_key.related_owner)
            .is_some_and(|t| t.checked);
        if !exported {
            self.warning(format!(
                "Skipping foreign key {} on {}: referenced table {} is not exported",
                foreign_key.name, table.name, foreign_key.related_table
            ));
        }
        exported
    }

    fn visit_rows(&mut self, table: &Table) -> Result<()> {
        if table.rows.is_empty() {
            return Ok(());
        }

        let insertable: Vec<usize> = table
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| self.dialect.is_insertable(c))
            .map(|(i, _)| i)
            .collect();
        if insertable.is_empty() {
            self.warning(format!(
                "Skipping rows of {}: no column accepts inserted values",
                table.name
            ));
            return Ok(());
        }

        let names: Vec<String> = insertable
            .iter()
            .map(|&i| table.columns[i].name.clone())
            .collect();
        let prefix = format!(
            "INSERT INTO {} ({}) VALUES",
            self.dialect.table_name(&table.name)?,
            self.dialect.column_list(&names)?
        );

        let identities = self.options.has(ExportFlags::IDENTITIES);
        if identities {
            for sql in self.dialect.rows_prologue(table)? {
                self.statement(&sql)?;
            }
        }

        for (n, row) in table.rows.iter().enumerate() {
            if row.len() != table.columns.len() {
                return Err(MigrateError::Generate(format!(
                    "Row {} of {} has {} values for {} columns",
                    n,
                    table.name,
                    row.len(),
                    table.columns.len()
                )));
            }
            let values = insertable
                .iter()
                .map(|&i| self.dialect.format_literal(&row[i], &table.columns[i]))
                .collect::<Result<Vec<_>>>()?;
            self.statement(&format!("{} ({})", prefix, values.join(", ")))?;
            self.report.rows += 1;
        }

        if identities {
            for sql in self.dialect.rows_epilogue(table)? {
                self.statement(&sql)?;
            }
        }

        debug!("Wrote {} rows for {}", table.rows.len(), table.name);
        self.blank_line()
    }

    fn statement(&mut self, sql: &str) -> Result<()> {
        writeln!(self.sink, "{}{}", sql, self.dialect.statement_delimiter())?;
        Ok(())
    }

    fn blank_line(&mut self) -> Result<()> {
        writeln!(self.sink)?;
        Ok(())
    }

    fn warning(&mut self, message: String) {
        warn!("{}", message);
        self.report.warnings.push(message);
    }
}

/// Domains referenced by at least one exported column, in model order.
fn used_types(database: &Database) -> impl Iterator<Item = &DataType> {
    database.types.iter().filter(move |data_type| {
        database.checked_tables().any(|table| {
            table.columns.iter().any(|c| {
                c.column_type == ColumnType::UserDefined
                    && c.native_type.eq_ignore_ascii_case(&data_type.name)
            })
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{CheckConstraint, Identity, Index, PrimaryKey};
    use crate::core::types::{ColumnAttributes, ForeignKeyRule};
    use crate::drivers::{MssqlDialect, MysqlDialect, PostgresDialect, SqliteDialect};

    fn make_test_column(name: &str, column_type: ColumnType, required: bool) -> Column {
        let mut column = Column::new(name, column_type);
        if required {
            column.attributes = ColumnAttributes::REQUIRED;
        }
        column
    }

    fn make_test_identity(name: &str) -> Column {
        let mut column = make_test_column(name, ColumnType::Int, true);
        column.attributes |= ColumnAttributes::IDENTITY;
        column.identity = Some(Identity::default());
        column
    }

    fn make_test_database() -> Database {
        let mut customers = Table::new("customers", "dbo");
        customers.columns.push(make_test_identity("id"));
        let mut name = make_test_column("name", ColumnType::VarChar, true);
        name.size = 50;
        name.default = Some(Value::Text("anon".into()));
        customers.columns.push(name);
        customers.primary_key = Some(PrimaryKey {
            name: "PK_customers".to_string(),
            columns: vec!["id".to_string()],
        });
        customers.indexes.push(Index {
            name: "PK_customers".to_string(),
            columns: vec!["id".to_string()],
            unique: true,
            primary_key: true,
        });
        customers.indexes.push(Index {
            name: "IX_customers_name".to_string(),
            columns: vec!["name".to_string()],
            unique: false,
            primary_key: false,
        });

        let mut orders = Table::new("orders", "dbo");
        orders
            .columns
            .push(make_test_column("id", ColumnType::BigInt, true));
        orders
            .columns
            .push(make_test_column("customer_id", ColumnType::Int, false));
        orders.primary_key = Some(PrimaryKey {
            name: "PK_orders".to_string(),
            columns: vec!["id".to_string()],
        });
        orders.foreign_keys.push(ForeignKey {
            name: "FK_orders_customers".to_string(),
            columns: vec!["customer_id".to_string()],
            related_table: "customers".to_string(),
            related_owner: "dbo".to_string(),
            related_columns: vec!["id".to_string()],
            update_rule: ForeignKeyRule::Cascade,
            delete_rule: ForeignKeyRule::None,
        });

        let mut database = Database::new("shop");
        database.tables.push(customers);
        database.tables.push(orders);
        database
    }

    fn generate(
        dialect: &dyn SqlDialect,
        database: &Database,
        options: ExportOptions,
    ) -> (String, GenerationReport) {
        let mut generator = Generator::new(dialect, Vec::new(), options);
        let report = generator.visit_database(database).unwrap();
        let script = String::from_utf8(generator.into_inner()).unwrap();
        (script, report)
    }

    #[test]
    fn test_sqlite_autoincrement_declares_primary_key_inline() {
        let mut table = Table::new("t", "");
        table.columns.push(make_test_identity("id"));
        let mut name = make_test_column("name", ColumnType::VarChar, true);
        name.size = 50;
        table.columns.push(name);
        table.primary_key = Some(PrimaryKey {
            name: String::new(),
            columns: vec!["id".to_string()],
        });
        let mut database = Database::new("main");
        database.tables.push(table);

        let (script, _) = generate(&SqliteDialect::new(), &database, ExportOptions::default());
        assert_eq!(
            script,
            "CREATE TABLE \"t\" (\n    \"id\" integer PRIMARY KEY AUTOINCREMENT NOT NULL,\n    \"name\" varchar(50) NOT NULL\n);\n\n"
        );
    }

    #[test]
    fn test_primary_key_index_not_reemitted() {
        let database = make_test_database();
        let (script, report) =
            generate(&PostgresDialect::new(), &database, ExportOptions::default());

        assert!(script.contains("CONSTRAINT \"PK_customers\" PRIMARY KEY (\"id\")"));
        assert!(script.contains("CREATE INDEX \"IX_customers_name\" ON \"customers\" (\"name\");"));
        assert!(!script.contains("INDEX \"PK_customers\""));
        assert_eq!(report.indexes, 1);
    }

    #[test]
    fn test_identities_disabled_suppresses_clause() {
        let database = make_test_database();
        let options = ExportOptions::default().without(ExportFlags::IDENTITIES);

        let (pg, _) = generate(&PostgresDialect::new(), &database, options.clone());
        assert!(!pg.contains("GENERATED"));
        assert!(pg.contains("\"id\" integer NOT NULL,"));

        let (mysql, _) = generate(&MysqlDialect::new(), &database, options.clone());
        assert!(!mysql.contains("AUTO_INCREMENT"));

        let (mssql, _) = generate(&MssqlDialect::new(), &database, options);
        assert!(!mssql.contains("IDENTITY"));
    }

    #[test]
    fn test_foreign_key_update_cascade_only() {
        let database = make_test_database();
        let (script, report) =
            generate(&PostgresDialect::new(), &database, ExportOptions::default());

        assert!(script.contains(
            "ALTER TABLE \"orders\" ADD CONSTRAINT \"FK_orders_customers\" FOREIGN KEY (\"customer_id\") REFERENCES \"customers\" (\"id\") ON UPDATE CASCADE;"
        ));
        assert!(!script.contains("ON DELETE"));
        assert_eq!(report.foreign_keys, 1);

        // Foreign keys follow every table.
        let alter = script.find("ALTER TABLE").unwrap();
        assert!(script.find("CREATE TABLE \"orders\"").unwrap() < alter);
    }

    #[test]
    fn test_sqlite_foreign_keys_inline() {
        let database = make_test_database();
        let (script, report) = generate(&SqliteDialect::new(), &database, ExportOptions::default());
        assert!(!script.contains("ALTER TABLE"));
        assert!(script.contains(
            "    CONSTRAINT \"FK_orders_customers\" FOREIGN KEY (\"customer_id\") REFERENCES \"customers\" (\"id\") ON UPDATE CASCADE\n);"
        ));
        assert_eq!(report.foreign_keys, 1);
    }

    #[test]
    fn test_foreign_key_to_unexported_table_skipped() {
        let mut database = make_test_database();
        database.tables[0].checked = false;
        let (script, report) =
            generate(&PostgresDialect::new(), &database, ExportOptions::default());

        assert!(!script.contains("FOREIGN KEY"));
        assert!(!script.contains("CREATE TABLE \"customers\""));
        assert_eq!(report.foreign_keys, 0);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("FK_orders_customers"));
    }

    #[test]
    fn test_database_directive_status() {
        let database = make_test_database();
        let options = ExportOptions {
            create_database: true,
            ..ExportOptions::default()
        };

        let (script, report) = generate(&MysqlDialect::new(), &database, options.clone());
        assert!(script.starts_with("CREATE DATABASE IF NOT EXISTS `shop`;\nUSE `shop`;\n"));
        assert_eq!(report.database_directive, DirectiveStatus::Emitted);

        let (script, report) = generate(&SqliteDialect::new(), &database, options);
        assert!(script.starts_with("CREATE TABLE"));
        assert_eq!(report.database_directive, DirectiveStatus::Unsupported);
        assert_eq!(report.warnings.len(), 1);

        let (_, report) = generate(&SqliteDialect::new(), &database, ExportOptions::default());
        assert_eq!(report.database_directive, DirectiveStatus::NotRequested);
    }

    #[test]
    fn test_defaults_follow_flag_and_identity() {
        let database = make_test_database();
        let (script, _) = generate(&MysqlDialect::new(), &database, ExportOptions::default());
        assert!(script.contains("`name` varchar(50) NOT NULL DEFAULT 'anon'"));
        assert!(script.contains("`id` int AUTO_INCREMENT NOT NULL,"));

        let options = ExportOptions::default().without(ExportFlags::DEFAULTS);
        let (script, _) = generate(&MysqlDialect::new(), &database, options);
        assert!(!script.contains("DEFAULT 'anon'"));
    }

    #[test]
    fn test_check_constraints_in_body() {
        let mut database = make_test_database();
        database.tables[1]
            .check_constraints
            .push(CheckConstraint::parse("CK_orders_id", "id > 0"));
        database.tables[1].check_constraints.push(CheckConstraint {
            name: String::new(),
            expression: "id BETWEEN 1 AND 9".to_string(),
            expr: None,
        });
        let (script, _) = generate(&MssqlDialect::new(), &database, ExportOptions::default());
        assert!(script.contains("CONSTRAINT [CK_orders_id] CHECK ([id] > 0)"));
        assert!(script.contains("CHECK (id BETWEEN 1 AND 9)"));
    }

    #[test]
    fn test_mssql_rows_use_go_batches_and_identity_insert() {
        let mut database = make_test_database();
        database.tables[0].rows = vec![
            vec![Value::Int(1), Value::Text("Ada".into())],
            vec![Value::Int(2), Value::Null],
        ];
        let options = ExportOptions {
            export_schema: false,
            export_data: true,
            ..ExportOptions::default()
        };
        let (script, report) = generate(&MssqlDialect::new(), &database, options);

        assert_eq!(
            script,
            "SET IDENTITY_INSERT [customers] ON\nGO\n\
             INSERT INTO [customers] ([id], [name]) VALUES (1, 'Ada')\nGO\n\
             INSERT INTO [customers] ([id], [name]) VALUES (2, NULL)\nGO\n\
             SET IDENTITY_INSERT [customers] OFF\nGO\n\n"
        );
        assert_eq!(report.rows, 2);
        assert_eq!(report.tables, 0);
    }

    #[test]
    fn test_unparsed_check_with_comment_is_rejected() {
        let mut database = make_test_database();
        database.tables[1].check_constraints.push(CheckConstraint {
            name: "ck".to_string(),
            expression: "id > 0 -- note".to_string(),
            expr: None,
        });
        let dialect = PostgresDialect::new();
        let mut generator = Generator::new(&dialect, Vec::new(), ExportOptions::default());
        let err = generator.visit_database(&database).unwrap_err();
        assert!(matches!(err, MigrateError::Generate(_)));
    }

    #[test]
    fn test_nested_sign_check_survives_sqlite() {
        let mut database = make_test_database();
        let expr = crate::parser::Parser::new("id > - -1").expression().unwrap();
        database.tables[1]
            .check_constraints
            .push(CheckConstraint::from_expr("ck_id", expr));
        let (script, _) = generate(&SqliteDialect::new(), &database, ExportOptions::default());
        assert!(script.contains("CONSTRAINT \"ck_id\" CHECK (\"id\" > -(-1))"));
    }

    #[test]
    fn test_row_width_mismatch_is_an_error() {
        let mut database = make_test_database();
        database.tables[0].rows = vec![vec![Value::Int(1)]];
        let options = ExportOptions {
            export_data: true,
            ..ExportOptions::default()
        };
        let dialect = PostgresDialect::new();
        let mut generator = Generator::new(&dialect, Vec::new(), options);
        let err = generator.visit_database(&database).unwrap_err();
        assert!(matches!(err, MigrateError::Generate(_)));
    }

    #[test]
    fn test_enum_types_precede_tables() {
        let mut database = make_test_database();
        database.types.push(DataType {
            name: "customers_tier".to_string(),
            owner: String::new(),
            base_type: ColumnType::VarChar,
            values: vec!["gold".to_string(), "silver".to_string()],
            enumerated: true,
        });
        database.types.push(DataType {
            name: "unused".to_string(),
            owner: String::new(),
            base_type: ColumnType::VarChar,
            values: vec!["x".to_string()],
            enumerated: true,
        });
        let mut tier = Column::new("tier", ColumnType::UserDefined);
        tier.native_type = "customers_tier".to_string();
        database.tables[0].columns.push(tier);

        let (script, report) =
            generate(&PostgresDialect::new(), &database, ExportOptions::default());
        assert!(script.starts_with("CREATE TYPE \"customers_tier\" AS ENUM ('gold', 'silver');\n"));
        assert!(script.contains("\"tier\" \"customers_tier\""));
        assert!(!script.contains("unused"));
        assert_eq!(report.types, 1);

        let (script, _) = generate(&MysqlDialect::new(), &database, ExportOptions::default());
        assert!(script.contains("`tier` enum('gold','silver')"));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let database = make_test_database();
        for kind in crate::drivers::DialectKind::ALL {
            let dialect = kind.generator();
            let (first, _) = generate(dialect.strategy(), &database, ExportOptions::default());
            let (second, _) = generate(dialect.strategy(), &database, ExportOptions::default());
            assert_eq!(first, second, "{}", kind);
        }
    }
}
