//! MySQL/MariaDB schema provider.
//!
//! Answers catalog questions from `INFORMATION_SCHEMA`. Uses SQLx for
//! connection pooling and async query execution. `enum` and `set` columns
//! are surfaced as user-defined domains named `<table>_<column>`.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use sqlx::{Row, ValueRef};
use tracing::{debug, info, warn};

use crate::config::SourceConfig;
use crate::core::identifier::quote_mysql;
use crate::core::meta::{ColumnMeta, ForeignKeyMeta, IndexMeta, ObjectName, TableMeta, TypeMeta};
use crate::core::schema::{CheckConstraint, Column, Identity};
use crate::core::traits::SchemaProvider;
use crate::core::types::{ColumnAttributes, ColumnType, ForeignKeyRule};
use crate::core::value::Value;
use crate::drivers::DialectKind;
use crate::error::{MigrateError, Result};

use super::types::{check_definition, default_value, domain_values, map_native_type};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Name of the domain backing an `enum` / `set` column.
pub fn domain_name(table: &str, column: &str) -> String {
    format!("{}_{}", table, column)
}

/// MySQL/MariaDB schema provider.
pub struct MysqlProvider {
    pool: MySqlPool,
    database: String,
}

impl MysqlProvider {
    /// Create a new MySQL provider from configuration.
    pub async fn new(config: &SourceConfig) -> Result<Self> {
        // Default to Preferred SSL mode for source connections
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port())
            .database(&config.database)
            .username(&config.user)
            .password(&config.password)
            .ssl_mode(MySqlSslMode::Preferred);

        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| MigrateError::pool(e, "creating MySQL source pool"))?;

        // Test connection
        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| MigrateError::pool(e, "testing MySQL source connection"))?;

        info!(
            "Connected to MySQL source: {}:{}/{}",
            config.host,
            config.port(),
            config.database
        );

        Ok(Self {
            pool,
            database: config.schema.clone().unwrap_or_else(|| config.database.clone()),
        })
    }

    fn owner_or_default<'a>(&'a self, owner: &'a str) -> &'a str {
        if owner.is_empty() {
            &self.database
        } else {
            owner
        }
    }

    async fn column_row(&self, table: &str, owner: &str, column: &str) -> Result<MySqlRow> {
        // CAST to CHAR to handle collation differences where information_schema
        // may return VARBINARY instead of VARCHAR
        let query = r#"
            SELECT
                CAST(DATA_TYPE AS CHAR(255)) AS DATA_TYPE,
                CAST(COLUMN_TYPE AS CHAR(4000)) AS COLUMN_TYPE,
                CAST(CASE
                    WHEN CHARACTER_MAXIMUM_LENGTH IS NULL THEN 0
                    WHEN CHARACTER_MAXIMUM_LENGTH > 2147483647 THEN -1
                    ELSE CHARACTER_MAXIMUM_LENGTH
                END AS SIGNED) AS max_length,
                CAST(COALESCE(NUMERIC_PRECISION, 0) AS SIGNED) AS num_precision,
                CAST(COALESCE(NUMERIC_SCALE, 0) AS SIGNED) AS num_scale,
                IF(IS_NULLABLE = 'YES', 1, 0) AS is_nullable,
                CAST(COLUMN_DEFAULT AS CHAR(4000)) AS COLUMN_DEFAULT,
                CAST(EXTRA AS CHAR(255)) AS EXTRA,
                CAST(COLUMN_COMMENT AS CHAR(4000)) AS COLUMN_COMMENT,
                CAST(COALESCE(CHARACTER_SET_NAME, '') AS CHAR(64)) AS CHARACTER_SET_NAME
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND COLUMN_NAME = ?
        "#;

        sqlx::query(query)
            .bind(owner)
            .bind(table)
            .bind(column)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MigrateError::pool(e, "loading MySQL column"))?
            .ok_or_else(|| {
                MigrateError::Provider(format!("Column {}.{}.{} not found", owner, table, column))
            })
    }

    /// Enum and set columns of the database, as (table, column, COLUMN_TYPE).
    async fn domain_columns(&self) -> Result<Vec<(String, String, String)>> {
        let query = r#"
            SELECT
                CAST(TABLE_NAME AS CHAR(255)) AS TABLE_NAME,
                CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
                CAST(COLUMN_TYPE AS CHAR(4000)) AS COLUMN_TYPE
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = ? AND DATA_TYPE IN ('enum', 'set')
            ORDER BY TABLE_NAME, ORDINAL_POSITION
        "#;

        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(&self.database)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrateError::pool(e, "loading MySQL enum columns"))?;

        Ok(rows
            .iter()
            .map(|row| {
                (
                    row.get::<String, _>("TABLE_NAME"),
                    row.get::<String, _>("COLUMN_NAME"),
                    row.get::<String, _>("COLUMN_TYPE"),
                )
            })
            .collect())
    }

    /// Decode one cell according to the portable column type.
    fn cell(row: &MySqlRow, idx: usize, column: &Column) -> Result<Value> {
        // Handle NULL values
        if row.try_get_raw(idx)?.is_null() {
            return Ok(Value::Null);
        }

        let value = match column.column_type {
            ColumnType::Boolean => Value::Bool(row.try_get::<bool, _>(idx)?),
            ColumnType::TinyInt => Value::Int(row.try_get::<i8, _>(idx)?.into()),
            ColumnType::UnsignedTinyInt => Value::UInt(row.try_get::<u8, _>(idx)?.into()),
            ColumnType::SmallInt => Value::Int(row.try_get::<i16, _>(idx)?.into()),
            ColumnType::UnsignedSmallInt => Value::UInt(row.try_get::<u16, _>(idx)?.into()),
            ColumnType::Int => Value::Int(row.try_get::<i32, _>(idx)?.into()),
            ColumnType::UnsignedInt => Value::UInt(row.try_get::<u32, _>(idx)?.into()),
            ColumnType::BigInt => Value::Int(row.try_get::<i64, _>(idx)?),
            ColumnType::UnsignedBigInt => Value::UInt(row.try_get::<u64, _>(idx)?),
            ColumnType::Float => Value::Float(row.try_get::<f32, _>(idx)?.into()),
            ColumnType::Double => Value::Float(row.try_get::<f64, _>(idx)?),
            ColumnType::Decimal | ColumnType::Currency => {
                Value::Decimal(row.try_get::<rust_decimal::Decimal, _>(idx)?)
            }
            ColumnType::Date => Value::Date(row.try_get::<chrono::NaiveDate, _>(idx)?),
            ColumnType::Time => Value::Time(row.try_get::<chrono::NaiveTime, _>(idx)?),
            ColumnType::DateTime => {
                Value::DateTime(row.try_get::<chrono::NaiveDateTime, _>(idx)?)
            }
            // BIT(n) arrives as big-endian bytes.
            ColumnType::Bit => {
                let bytes = row.try_get_unchecked::<Vec<u8>, _>(idx)?;
                Value::UInt(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
            }
            ColumnType::Blob | ColumnType::RowVersion | ColumnType::Geometry => {
                Value::Bytes(row.try_get::<Vec<u8>, _>(idx)?)
            }
            // Default to string
            _ => Value::Text(row.try_get_unchecked::<String, _>(idx)?),
        };
        Ok(value.coerce(column.column_type))
    }
}

#[async_trait]
impl SchemaProvider for MysqlProvider {
    fn dialect(&self) -> DialectKind {
        DialectKind::Mysql
    }

    async fn table_names(&self) -> Result<Vec<ObjectName>> {
        let query = r#"
            SELECT CAST(TABLE_NAME AS CHAR(255)) AS TABLE_NAME
            FROM INFORMATION_SCHEMA.TABLES
            WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
        "#;

        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(&self.database)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrateError::pool(e, "listing MySQL tables"))?;

        info!(
            "Found {} tables in MySQL database '{}'",
            rows.len(),
            self.database
        );
        Ok(rows
            .iter()
            .map(|row| ObjectName::new(row.get::<String, _>("TABLE_NAME"), self.database.as_str()))
            .collect())
    }

    async fn column_names(&self, table: &str, owner: &str) -> Result<Vec<String>> {
        let query = r#"
            SELECT CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;

        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(self.owner_or_default(owner))
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrateError::pool(e, "loading MySQL columns"))?;

        Ok(rows.iter().map(|row| row.get("COLUMN_NAME")).collect())
    }

    async fn index_names(&self, table: &str, owner: &str) -> Result<Vec<String>> {
        let query = r#"
            SELECT CAST(INDEX_NAME AS CHAR(255)) AS INDEX_NAME
            FROM INFORMATION_SCHEMA.STATISTICS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            GROUP BY INDEX_NAME
            ORDER BY INDEX_NAME = 'PRIMARY' DESC, INDEX_NAME
        "#;

        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(self.owner_or_default(owner))
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrateError::pool(e, "loading MySQL indexes"))?;

        Ok(rows.iter().map(|row| row.get("INDEX_NAME")).collect())
    }

    async fn foreign_key_names(&self, table: &str, owner: &str) -> Result<Vec<String>> {
        let query = r#"
            SELECT CAST(CONSTRAINT_NAME AS CHAR(255)) AS CONSTRAINT_NAME
            FROM INFORMATION_SCHEMA.REFERENTIAL_CONSTRAINTS
            WHERE CONSTRAINT_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY CONSTRAINT_NAME
        "#;

        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(self.owner_or_default(owner))
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrateError::pool(e, "loading MySQL foreign keys"))?;

        Ok(rows.iter().map(|row| row.get("CONSTRAINT_NAME")).collect())
    }

    async fn table_meta(&self, table: &str, owner: &str) -> Result<TableMeta> {
        // CAST to CHAR to handle collation differences
        let query = r#"
            SELECT CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME
            FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND CONSTRAINT_NAME = 'PRIMARY'
            ORDER BY ORDINAL_POSITION
        "#;

        let owner = self.owner_or_default(owner);
        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(owner)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrateError::pool(e, "loading MySQL primary key"))?;

        let pk_columns: Vec<String> = rows.iter().map(|row| row.get("COLUMN_NAME")).collect();
        // Every MySQL primary key is called PRIMARY; give it a portable name.
        let pk_name = if pk_columns.is_empty() {
            String::new()
        } else {
            format!("PK_{}", table)
        };

        Ok(TableMeta {
            name: table.to_string(),
            owner: owner.to_string(),
            pk_name,
            pk_columns,
        })
    }

    async fn column_meta(&self, table: &str, owner: &str, column: &str) -> Result<ColumnMeta> {
        let row = self
            .column_row(table, self.owner_or_default(owner), column)
            .await?;

        let data_type: String = row.get("DATA_TYPE");
        let column_type: String = row.get("COLUMN_TYPE");
        let extra = row.get::<String, _>("EXTRA").to_lowercase();
        let mapped = map_native_type(
            &data_type,
            &column_type,
            row.get::<i64, _>("max_length"),
            row.get::<i64, _>("num_precision"),
            row.get::<i64, _>("num_scale"),
        );
        if let Some(warning) = &mapped.warning {
            warn!("{}.{}: {}", table, column, warning);
        }

        let mut attributes = ColumnAttributes::NONE;
        if row.get::<i32, _>("is_nullable") == 0 {
            attributes |= ColumnAttributes::REQUIRED;
        }
        let is_identity = extra.contains("auto_increment");
        if is_identity {
            attributes |= ColumnAttributes::IDENTITY;
        }
        if extra.contains("virtual generated") || extra.contains("stored generated") {
            attributes |= ColumnAttributes::COMPUTED;
        }
        let charset: String = row.get("CHARACTER_SET_NAME");
        if mapped.column_type.is_character() && charset.starts_with("utf8") {
            attributes |= ColumnAttributes::UNICODE;
        }

        let default_value = row
            .get::<Option<String>, _>("COLUMN_DEFAULT")
            .and_then(|raw| {
                default_value(&raw, mapped.column_type, extra.contains("default_generated"))
            });

        let native_type = if mapped.column_type == ColumnType::UserDefined {
            domain_name(table, column)
        } else {
            column_type
        };

        let comment: String = row.get("COLUMN_COMMENT");

        Ok(ColumnMeta {
            column_type: mapped.column_type,
            native_type,
            size: mapped.size,
            precision: mapped.precision,
            scale: mapped.scale,
            default_value,
            description: (!comment.is_empty()).then_some(comment),
            attributes,
            identity: is_identity.then(Identity::default),
        })
    }

    async fn index_meta(&self, table: &str, owner: &str, index: &str) -> Result<IndexMeta> {
        let query = r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
                IF(NON_UNIQUE = 0, 1, 0) AS is_unique
            FROM INFORMATION_SCHEMA.STATISTICS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND INDEX_NAME = ?
            ORDER BY SEQ_IN_INDEX
        "#;

        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(self.owner_or_default(owner))
            .bind(table)
            .bind(index)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrateError::pool(e, "loading MySQL index columns"))?;

        if rows.is_empty() {
            return Err(MigrateError::Provider(format!(
                "Index {} not found on {}",
                index, table
            )));
        }

        Ok(IndexMeta {
            unique: rows[0].get::<i32, _>("is_unique") == 1,
            primary_key: index == "PRIMARY",
            columns: rows.iter().map(|row| row.get("COLUMN_NAME")).collect(),
        })
    }

    async fn foreign_key_meta(
        &self,
        table: &str,
        owner: &str,
        foreign_key: &str,
    ) -> Result<ForeignKeyMeta> {
        let query = r#"
            SELECT
                CAST(kcu.COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
                CAST(kcu.REFERENCED_TABLE_SCHEMA AS CHAR(255)) AS REFERENCED_TABLE_SCHEMA,
                CAST(kcu.REFERENCED_TABLE_NAME AS CHAR(255)) AS REFERENCED_TABLE_NAME,
                CAST(kcu.REFERENCED_COLUMN_NAME AS CHAR(255)) AS REFERENCED_COLUMN_NAME,
                CAST(rc.UPDATE_RULE AS CHAR(64)) AS UPDATE_RULE,
                CAST(rc.DELETE_RULE AS CHAR(64)) AS DELETE_RULE
            FROM INFORMATION_SCHEMA.REFERENTIAL_CONSTRAINTS rc
            JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
                ON rc.CONSTRAINT_SCHEMA = kcu.CONSTRAINT_SCHEMA
                AND rc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
                AND rc.TABLE_NAME = kcu.TABLE_NAME
            WHERE rc.CONSTRAINT_SCHEMA = ? AND rc.TABLE_NAME = ? AND rc.CONSTRAINT_NAME = ?
            ORDER BY kcu.ORDINAL_POSITION
        "#;

        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(self.owner_or_default(owner))
            .bind(table)
            .bind(foreign_key)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrateError::pool(e, "loading MySQL foreign key"))?;

        let first = rows.first().ok_or_else(|| {
            MigrateError::Provider(format!(
                "Foreign key {} not found on {}",
                foreign_key, table
            ))
        })?;

        let meta = ForeignKeyMeta {
            columns: rows.iter().map(|row| row.get("COLUMN_NAME")).collect(),
            related_table: first.get("REFERENCED_TABLE_NAME"),
            related_owner: first.get("REFERENCED_TABLE_SCHEMA"),
            related_columns: rows.iter().map(|row| row.get("REFERENCED_COLUMN_NAME")).collect(),
            update_rule: ForeignKeyRule::from_catalog(&first.get::<String, _>("UPDATE_RULE")),
            delete_rule: ForeignKeyRule::from_catalog(&first.get::<String, _>("DELETE_RULE")),
        };
        debug!("Loaded foreign key {} on {}", foreign_key, table);
        Ok(meta)
    }

    async fn type_names(&self) -> Result<Vec<ObjectName>> {
        Ok(self
            .domain_columns()
            .await?
            .into_iter()
            .map(|(table, column, _)| ObjectName::new(domain_name(&table, &column), &self.database))
            .collect())
    }

    async fn type_meta(&self, name: &str, _owner: &str) -> Result<TypeMeta> {
        let (_, _, column_type) = self
            .domain_columns()
            .await?
            .into_iter()
            .find(|(table, column, _)| domain_name(table, column) == name)
            .ok_or_else(|| MigrateError::Provider(format!("Enum column {} not found", name)))?;

        let (enumerated, values) = domain_values(&column_type)?;
        Ok(TypeMeta {
            base_type: ColumnType::VarChar,
            values,
            enumerated,
        })
    }

    async fn check_constraints(&self, table: &str, owner: &str) -> Result<Vec<CheckConstraint>> {
        // MySQL 8.0+ supports check constraints via INFORMATION_SCHEMA.CHECK_CONSTRAINTS
        // For older versions, this returns empty
        let query = r#"
            SELECT
                CAST(cc.CONSTRAINT_NAME AS CHAR(255)) AS CONSTRAINT_NAME,
                CAST(cc.CHECK_CLAUSE AS CHAR(4000)) AS CHECK_CLAUSE
            FROM INFORMATION_SCHEMA.CHECK_CONSTRAINTS cc
            JOIN INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
                ON cc.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA
                AND cc.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
            WHERE tc.TABLE_SCHEMA = ? AND tc.TABLE_NAME = ?
              AND tc.CONSTRAINT_TYPE = 'CHECK'
        "#;

        let result: std::result::Result<Vec<MySqlRow>, _> = sqlx::query(query)
            .bind(self.owner_or_default(owner))
            .bind(table)
            .fetch_all(&self.pool)
            .await;

        match result {
            Ok(rows) => Ok(rows
                .iter()
                .map(|row| {
                    let clause: String = row.get("CHECK_CLAUSE");
                    CheckConstraint::parse(
                        row.get::<String, _>("CONSTRAINT_NAME"),
                        &check_definition(&clause),
                    )
                })
                .collect()),
            Err(e) => {
                debug!("No check constraints available for {}: {}", table, e);
                Ok(Vec::new())
            }
        }
    }

    async fn read_rows(
        &self,
        table: &str,
        owner: &str,
        columns: &[Column],
    ) -> Result<Vec<Vec<Value>>> {
        let column_list = columns
            .iter()
            .map(|c| quote_mysql(&c.name))
            .collect::<Result<Vec<_>>>()?
            .join(", ");
        let sql = format!(
            "SELECT {} FROM {}.{}",
            column_list,
            quote_mysql(self.owner_or_default(owner))?,
            quote_mysql(table)?
        );

        let rows: Vec<MySqlRow> = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrateError::pool(e, "reading MySQL rows"))?;

        debug!("Read {} rows from {}", rows.len(), table);

        rows.iter()
            .map(|row| {
                columns
                    .iter()
                    .enumerate()
                    .map(|(i, col)| Self::cell(row, i, col))
                    .collect()
            })
            .collect()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
