//! SQL Server schema provider.
//!
//! Answers catalog questions from the `sys.*` views. Uses Tiberius with bb8
//! connection pooling.

use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use tiberius::{AuthMethod, Client, Config, EncryptionLevel, Query, Row};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info, warn};

use crate::config::SourceConfig;
use crate::core::identifier::quote_mssql;
use crate::core::meta::{ColumnMeta, ForeignKeyMeta, IndexMeta, ObjectName, TableMeta};
use crate::core::schema::{CheckConstraint, Column, Identity};
use crate::core::traits::SchemaProvider;
use crate::core::types::{ColumnAttributes, ColumnType, ForeignKeyRule};
use crate::core::value::Value;
use crate::drivers::DialectKind;
use crate::error::{MigrateError, Result};

use super::types::{default_value, map_native_type};

/// Connection acquisition timeout from pool (30 seconds).
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Owner assumed when neither the caller nor the configuration names one.
const DEFAULT_SCHEMA: &str = "dbo";

/// Connection manager for bb8 pool with Tiberius.
#[derive(Clone)]
struct TiberiusConnectionManager {
    config: SourceConfig,
}

impl TiberiusConnectionManager {
    fn new(config: SourceConfig) -> Self {
        Self { config }
    }

    fn build_config(&self) -> Config {
        let mut config = Config::new();
        config.host(&self.config.host);
        config.port(self.config.port());
        config.database(&self.config.database);
        config.authentication(AuthMethod::sql_server(
            &self.config.user,
            &self.config.password,
        ));

        // Encryption settings
        if self.config.encrypt {
            if self.config.trust_server_cert {
                config.trust_cert();
            }
            config.encryption(EncryptionLevel::Required);
        } else {
            config.encryption(EncryptionLevel::NotSupported);
        }

        config
    }
}

#[async_trait]
impl bb8::ManageConnection for TiberiusConnectionManager {
    type Connection = Client<Compat<TcpStream>>;
    type Error = tiberius::error::Error;

    async fn connect(&self) -> std::result::Result<Self::Connection, Self::Error> {
        let config = self.build_config();
        let tcp = TcpStream::connect(config.get_addr()).await.map_err(|e| {
            tiberius::error::Error::Io {
                kind: e.kind(),
                message: e.to_string(),
            }
        })?;
        tcp.set_nodelay(true).ok();
        Client::connect(config, tcp.compat_write()).await
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> std::result::Result<(), Self::Error> {
        conn.simple_query("SELECT 1").await?.into_row().await?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// SQL Server schema provider.
pub struct MssqlProvider {
    pool: Pool<TiberiusConnectionManager>,
    schema: Option<String>,
}

impl MssqlProvider {
    /// Create a new SQL Server provider from configuration.
    pub async fn new(config: &SourceConfig) -> Result<Self> {
        let manager = TiberiusConnectionManager::new(config.clone());
        let pool = Pool::builder()
            .max_size(2)
            .connection_timeout(POOL_CONNECTION_TIMEOUT)
            .test_on_check_out(true)
            .build(manager)
            .await
            .map_err(|e| MigrateError::pool(e, "creating MSSQL connection pool"))?;

        // Test connection
        {
            let mut conn = pool
                .get()
                .await
                .map_err(|e| MigrateError::pool(e, "testing MSSQL connection"))?;
            conn.simple_query("SELECT 1").await?.into_row().await?;
        }

        info!(
            "Connected to MSSQL source: {}:{}/{}",
            config.host,
            config.port(),
            config.database
        );

        Ok(Self {
            pool,
            schema: config.schema.clone(),
        })
    }

    /// Get a pooled connection.
    async fn get_client(&self) -> Result<PooledConnection<'_, TiberiusConnectionManager>> {
        self.pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, "getting MSSQL connection from pool"))
    }

    /// Run a catalog query binding `params` as `@P1..@Pn`.
    async fn fetch(&self, sql: &str, params: &[&str]) -> Result<Vec<Row>> {
        let mut client = self.get_client().await?;
        let mut query = Query::new(sql);
        for param in params {
            query.bind(*param);
        }
        let stream = query.query(&mut client).await?;
        Ok(stream.into_first_result().await?)
    }

    fn owner_or_default<'a>(&'a self, owner: &'a str) -> &'a str {
        if !owner.is_empty() {
            owner
        } else {
            self.schema.as_deref().unwrap_or(DEFAULT_SCHEMA)
        }
    }

    /// Select-list expression that decodes through [`Self::cell`].
    fn select_expr(column: &Column) -> Result<String> {
        let name = quote_mssql(&column.name)?;
        let expr = match column.column_type {
            ColumnType::Currency => format!("CAST({} AS decimal(19,4))", name),
            ColumnType::DateTime => format!("CAST({} AS datetime2)", name),
            ColumnType::Xml
            | ColumnType::Geometry
            | ColumnType::Interval
            | ColumnType::Json
            | ColumnType::UserDefined
            | ColumnType::Unknown => format!("CAST({} AS nvarchar(max))", name),
            _ => name,
        };
        Ok(expr)
    }

    /// Decode one cell according to the portable column type.
    fn cell(row: &Row, idx: usize, column: &Column) -> Result<Value> {
        fn or_null<T>(value: Option<T>, f: impl FnOnce(T) -> Value) -> Value {
            value.map(f).unwrap_or(Value::Null)
        }

        let value = match column.column_type {
            ColumnType::Boolean => or_null(row.try_get::<bool, _>(idx)?, Value::Bool),
            ColumnType::UnsignedTinyInt => {
                or_null(row.try_get::<u8, _>(idx)?, |v| Value::UInt(v.into()))
            }
            ColumnType::SmallInt => or_null(row.try_get::<i16, _>(idx)?, |v| Value::Int(v.into())),
            ColumnType::Int => or_null(row.try_get::<i32, _>(idx)?, |v| Value::Int(v.into())),
            ColumnType::BigInt => or_null(row.try_get::<i64, _>(idx)?, Value::Int),
            ColumnType::Float => or_null(row.try_get::<f32, _>(idx)?, |v| Value::Float(v.into())),
            ColumnType::Double => or_null(row.try_get::<f64, _>(idx)?, Value::Float),
            ColumnType::Decimal | ColumnType::Currency => {
                or_null(row.try_get::<rust_decimal::Decimal, _>(idx)?, Value::Decimal)
            }
            ColumnType::Date => or_null(row.try_get::<chrono::NaiveDate, _>(idx)?, Value::Date),
            ColumnType::Time => or_null(row.try_get::<chrono::NaiveTime, _>(idx)?, Value::Time),
            ColumnType::DateTime => {
                or_null(row.try_get::<chrono::NaiveDateTime, _>(idx)?, Value::DateTime)
            }
            ColumnType::Guid => or_null(row.try_get::<uuid::Uuid, _>(idx)?, Value::Guid),
            ColumnType::Blob | ColumnType::RowVersion => {
                or_null(row.try_get::<&[u8], _>(idx)?, |b| Value::Bytes(b.to_vec()))
            }
            // Default to string
            _ => or_null(row.try_get::<&str, _>(idx)?, |s| Value::Text(s.to_string())),
        };
        Ok(value.coerce(column.column_type))
    }
}

/// Column `idx` as an owned string, empty when NULL.
fn text(row: &Row, idx: usize) -> String {
    row.get::<&str, _>(idx).unwrap_or_default().to_string()
}

#[async_trait]
impl SchemaProvider for MssqlProvider {
    fn dialect(&self) -> DialectKind {
        DialectKind::Mssql
    }

    async fn table_names(&self) -> Result<Vec<ObjectName>> {
        let mut query = String::from(
            r#"
            SELECT s.name, t.name
            FROM sys.tables t
            JOIN sys.schemas s ON s.schema_id = t.schema_id
            WHERE t.is_ms_shipped = 0
        "#,
        );
        let rows = match &self.schema {
            Some(schema) => {
                query.push_str(" AND s.name = @P1 ORDER BY s.name, t.name");
                self.fetch(&query, &[schema]).await?
            }
            None => {
                query.push_str(" ORDER BY s.name, t.name");
                self.fetch(&query, &[]).await?
            }
        };

        info!("Found {} tables in MSSQL source", rows.len());
        Ok(rows
            .iter()
            .map(|row| ObjectName::new(text(row, 1), text(row, 0)))
            .collect())
    }

    async fn column_names(&self, table: &str, owner: &str) -> Result<Vec<String>> {
        let query = r#"
            SELECT c.name
            FROM sys.columns c
            JOIN sys.tables t ON t.object_id = c.object_id
            JOIN sys.schemas s ON s.schema_id = t.schema_id
            WHERE s.name = @P1 AND t.name = @P2
            ORDER BY c.column_id
        "#;

        let owner = self.owner_or_default(owner);
        let rows = self.fetch(query, &[owner, table]).await?;
        if rows.is_empty() {
            return Err(MigrateError::Provider(format!(
                "Table {}.{} not found",
                owner, table
            )));
        }
        Ok(rows.iter().map(|row| text(row, 0)).collect())
    }

    async fn index_names(&self, table: &str, owner: &str) -> Result<Vec<String>> {
        let query = r#"
            SELECT i.name
            FROM sys.indexes i
            JOIN sys.tables t ON t.object_id = i.object_id
            JOIN sys.schemas s ON s.schema_id = t.schema_id
            WHERE s.name = @P1 AND t.name = @P2
              AND i.type > 0
              AND i.is_hypothetical = 0
            ORDER BY i.is_primary_key DESC, i.name
        "#;

        let rows = self
            .fetch(query, &[self.owner_or_default(owner), table])
            .await?;
        Ok(rows.iter().map(|row| text(row, 0)).collect())
    }

    async fn foreign_key_names(&self, table: &str, owner: &str) -> Result<Vec<String>> {
        let query = r#"
            SELECT fk.name
            FROM sys.foreign_keys fk
            JOIN sys.tables t ON t.object_id = fk.parent_object_id
            JOIN sys.schemas s ON s.schema_id = t.schema_id
            WHERE s.name = @P1 AND t.name = @P2
            ORDER BY fk.name
        "#;

        let rows = self
            .fetch(query, &[self.owner_or_default(owner), table])
            .await?;
        Ok(rows.iter().map(|row| text(row, 0)).collect())
    }

    async fn table_meta(&self, table: &str, owner: &str) -> Result<TableMeta> {
        let query = r#"
            SELECT kc.name, c.name
            FROM sys.key_constraints kc
            JOIN sys.tables t ON t.object_id = kc.parent_object_id
            JOIN sys.schemas s ON s.schema_id = t.schema_id
            JOIN sys.index_columns ic
                ON ic.object_id = kc.parent_object_id AND ic.index_id = kc.unique_index_id
            JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id
            WHERE s.name = @P1 AND t.name = @P2 AND kc.type = 'PK'
            ORDER BY ic.key_ordinal
        "#;

        let owner = self.owner_or_default(owner);
        let rows = self.fetch(query, &[owner, table]).await?;

        let pk_columns: Vec<String> = rows.iter().map(|row| text(row, 1)).collect();
        debug!("Primary key for {}.{}: {:?}", owner, table, pk_columns);

        Ok(TableMeta {
            name: table.to_string(),
            owner: owner.to_string(),
            pk_name: rows.first().map(|row| text(row, 0)).unwrap_or_default(),
            pk_columns,
        })
    }

    async fn column_meta(&self, table: &str, owner: &str, column: &str) -> Result<ColumnMeta> {
        // Alias types report their base type; CLR types keep their own name.
        let query = r#"
            SELECT
                CASE WHEN ty.is_user_defined = 1 AND ty.is_assembly_type = 0
                     THEN TYPE_NAME(c.system_type_id) ELSE ty.name END,
                c.max_length,
                c.precision,
                c.scale,
                c.is_nullable,
                c.is_identity,
                c.is_computed,
                dc.definition,
                CAST(ic.seed_value AS bigint),
                CAST(ic.increment_value AS bigint),
                CAST(ep.value AS nvarchar(4000))
            FROM sys.columns c
            JOIN sys.tables t ON t.object_id = c.object_id
            JOIN sys.schemas s ON s.schema_id = t.schema_id
            JOIN sys.types ty ON ty.user_type_id = c.user_type_id
            LEFT JOIN sys.default_constraints dc ON dc.object_id = c.default_object_id
            LEFT JOIN sys.identity_columns ic
                ON ic.object_id = c.object_id AND ic.column_id = c.column_id
            LEFT JOIN sys.extended_properties ep
                ON ep.major_id = c.object_id AND ep.minor_id = c.column_id
                AND ep.class = 1 AND ep.name = 'MS_Description'
            WHERE s.name = @P1 AND t.name = @P2 AND c.name = @P3
        "#;

        let owner = self.owner_or_default(owner);
        let rows = self.fetch(query, &[owner, table, column]).await?;
        let row = rows.first().ok_or_else(|| {
            MigrateError::Provider(format!("Column {}.{}.{} not found", owner, table, column))
        })?;

        let type_name = text(row, 0);
        let mapped = map_native_type(
            &type_name,
            row.get::<i16, _>(1).unwrap_or(0),
            row.get::<u8, _>(2).unwrap_or(0),
            row.get::<u8, _>(3).unwrap_or(0),
        );
        if let Some(warning) = &mapped.warning {
            warn!("{}.{}: {}", table, column, warning);
        }

        let is_identity = row.get::<bool, _>(5).unwrap_or(false);
        let mut attributes = ColumnAttributes::NONE;
        if !row.get::<bool, _>(4).unwrap_or(true) {
            attributes |= ColumnAttributes::REQUIRED;
        }
        if is_identity {
            attributes |= ColumnAttributes::IDENTITY;
        }
        if row.get::<bool, _>(6).unwrap_or(false) {
            attributes |= ColumnAttributes::COMPUTED;
        }
        if mapped.column_type.is_unicode() {
            attributes |= ColumnAttributes::UNICODE;
        }

        let identity = is_identity.then(|| Identity {
            seed: row.get::<i64, _>(8).unwrap_or(1),
            increment: row.get::<i64, _>(9).unwrap_or(1),
        });

        let default_value = row
            .get::<&str, _>(7)
            .and_then(|raw| default_value(raw, mapped.column_type));

        Ok(ColumnMeta {
            column_type: mapped.column_type,
            native_type: type_name,
            size: mapped.size,
            precision: mapped.precision,
            scale: mapped.scale,
            default_value,
            description: row.get::<&str, _>(10).map(str::to_string),
            attributes,
            identity,
        })
    }

    async fn index_meta(&self, table: &str, owner: &str, index: &str) -> Result<IndexMeta> {
        let query = r#"
            SELECT i.is_unique, i.is_primary_key, c.name
            FROM sys.indexes i
            JOIN sys.tables t ON t.object_id = i.object_id
            JOIN sys.schemas s ON s.schema_id = t.schema_id
            JOIN sys.index_columns ic ON ic.object_id = i.object_id AND ic.index_id = i.index_id
            JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id
            WHERE s.name = @P1 AND t.name = @P2 AND i.name = @P3
              AND ic.is_included_column = 0
            ORDER BY ic.key_ordinal
        "#;

        let rows = self
            .fetch(query, &[self.owner_or_default(owner), table, index])
            .await?;
        let first = rows.first().ok_or_else(|| {
            MigrateError::Provider(format!("Index {} not found on {}", index, table))
        })?;

        Ok(IndexMeta {
            unique: first.get::<bool, _>(0).unwrap_or(false),
            primary_key: first.get::<bool, _>(1).unwrap_or(false),
            columns: rows.iter().map(|row| text(row, 2)).collect(),
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
                COL_NAME(fkc.parent_object_id, fkc.parent_column_id),
                OBJECT_SCHEMA_NAME(fk.referenced_object_id),
                OBJECT_NAME(fk.referenced_object_id),
                COL_NAME(fkc.referenced_object_id, fkc.referenced_column_id),
                fk.update_referential_action_desc,
                fk.delete_referential_action_desc
            FROM sys.foreign_keys fk
            JOIN sys.tables t ON t.object_id = fk.parent_object_id
            JOIN sys.schemas s ON s.schema_id = t.schema_id
            JOIN sys.foreign_key_columns fkc ON fkc.constraint_object_id = fk.object_id
            WHERE s.name = @P1 AND t.name = @P2 AND fk.name = @P3
            ORDER BY fkc.constraint_column_id
        "#;

        let rows = self
            .fetch(query, &[self.owner_or_default(owner), table, foreign_key])
            .await?;
        let first = rows.first().ok_or_else(|| {
            MigrateError::Provider(format!(
                "Foreign key {} not found on {}",
                foreign_key, table
            ))
        })?;

        let meta = ForeignKeyMeta {
            columns: rows.iter().map(|row| text(row, 0)).collect(),
            related_owner: text(first, 1),
            related_table: text(first, 2),
            related_columns: rows.iter().map(|row| text(row, 3)).collect(),
            update_rule: ForeignKeyRule::from_catalog(&text(first, 4)),
            delete_rule: ForeignKeyRule::from_catalog(&text(first, 5)),
        };
        debug!("Loaded foreign key {} on {}", foreign_key, table);
        Ok(meta)
    }

    async fn check_constraints(&self, table: &str, owner: &str) -> Result<Vec<CheckConstraint>> {
        let query = r#"
            SELECT cc.name, cc.definition
            FROM sys.check_constraints cc
            JOIN sys.tables t ON t.object_id = cc.parent_object_id
            JOIN sys.schemas s ON s.schema_id = t.schema_id
            WHERE s.name = @P1 AND t.name = @P2
            ORDER BY cc.name
        "#;

        let rows = self
            .fetch(query, &[self.owner_or_default(owner), table])
            .await?;

        let checks: Vec<CheckConstraint> = rows
            .iter()
            .map(|row| CheckConstraint::parse(text(row, 0), &text(row, 1)))
            .collect();
        debug!("Loaded {} check constraints for {}", checks.len(), table);
        Ok(checks)
    }

    async fn read_rows(
        &self,
        table: &str,
        owner: &str,
        columns: &[Column],
    ) -> Result<Vec<Vec<Value>>> {
        let select_list = columns
            .iter()
            .map(Self::select_expr)
            .collect::<Result<Vec<_>>>()?
            .join(", ");
        let sql = format!(
            "SELECT {} FROM {}.{}",
            select_list,
            quote_mssql(self.owner_or_default(owner))?,
            quote_mssql(table)?
        );

        let rows = self.fetch(&sql, &[]).await?;
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
        // bb8 closes idle connections when the pool is dropped.
        debug!("Releasing MSSQL connection pool");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_config_from_source() {
        let source: SourceConfig = serde_yaml::from_str(
            "dialect: mssql\nhost: db.example\ndatabase: Sales\nuser: sa\npassword: secret\n",
        )
        .unwrap();
        let config = TiberiusConnectionManager::new(source).build_config();
        assert_eq!(config.get_addr(), "db.example:1433");
    }

    #[test]
    fn test_select_expr_casts() {
        let mut col = Column::new("Amount", ColumnType::Currency);
        assert_eq!(
            MssqlProvider::select_expr(&col).unwrap(),
            "CAST([Amount] AS decimal(19,4))"
        );
        col.column_type = ColumnType::Int;
        assert_eq!(MssqlProvider::select_expr(&col).unwrap(), "[Amount]");
        col.column_type = ColumnType::Geometry;
        assert_eq!(
            MssqlProvider::select_expr(&col).unwrap(),
            "CAST([Amount] AS nvarchar(max))"
        );
    }
}
