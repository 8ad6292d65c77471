//! PostgreSQL schema provider.
//!
//! Answers catalog questions from `information_schema` and `pg_catalog`.
//! Uses deadpool-postgres for connection pooling. Enum types declared with
//! `CREATE TYPE ... AS ENUM` are surfaced as user-defined domains.

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use tokio_postgres::{Config as PgConfig, NoTls, Row};
use tracing::{debug, info, warn};

use crate::config::SourceConfig;
use crate::core::identifier::quote_ansi;
use crate::core::meta::{ColumnMeta, ForeignKeyMeta, IndexMeta, ObjectName, TableMeta, TypeMeta};
use crate::core::schema::{CheckConstraint, Column, Identity};
use crate::core::traits::SchemaProvider;
use crate::core::types::{ColumnAttributes, ColumnType, ForeignKeyRule, MappedType};
use crate::core::value::Value;
use crate::drivers::DialectKind;
use crate::error::{MigrateError, Result};

use super::types::{check_definition, default_value, is_sequence_default, map_native_type};

/// Owner assumed when neither the caller nor the configuration names one.
const DEFAULT_SCHEMA: &str = "public";

/// PostgreSQL schema provider.
pub struct PostgresProvider {
    pool: Pool,
    schema: Option<String>,
}

impl PostgresProvider {
    /// Create a new PostgreSQL provider from configuration.
    pub async fn new(config: &SourceConfig) -> Result<Self> {
        let mut pg_config = PgConfig::new();
        pg_config.host(&config.host);
        pg_config.port(config.port());
        pg_config.dbname(&config.database);
        pg_config.user(&config.user);
        pg_config.password(&config.password);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let mgr = Manager::from_config(pg_config, NoTls, mgr_config);
        let pool = Pool::builder(mgr)
            .max_size(2)
            .build()
            .map_err(|e| MigrateError::pool(e, "creating PostgreSQL source pool"))?;

        // Test connection
        let client = pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, "testing PostgreSQL source connection"))?;
        client.simple_query("SELECT 1").await?;

        info!(
            "Connected to PostgreSQL source: {}:{}/{}",
            config.host,
            config.port(),
            config.database
        );

        Ok(Self {
            pool,
            schema: config.schema.clone(),
        })
    }

    async fn client(&self, context: &str) -> Result<Object> {
        self.pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, format!("getting connection for {}", context)))
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
        let name = quote_ansi(&column.name)?;
        let cast = match column.column_type {
            ColumnType::Boolean
            | ColumnType::SmallInt
            | ColumnType::Int
            | ColumnType::BigInt
            | ColumnType::Float
            | ColumnType::Double
            | ColumnType::Decimal
            | ColumnType::Date
            | ColumnType::Guid
            | ColumnType::Blob => "",
            ColumnType::Currency => "::numeric",
            ColumnType::Time => "::time",
            ColumnType::DateTime => "::timestamp",
            _ => "::text",
        };
        Ok(format!("{}{}", name, cast))
    }

    /// Decode one cell according to the portable column type.
    fn cell(row: &Row, idx: usize, column: &Column) -> Result<Value> {
        fn or_null<T>(value: Option<T>, f: impl FnOnce(T) -> Value) -> Value {
            value.map(f).unwrap_or(Value::Null)
        }

        let value = match column.column_type {
            ColumnType::Boolean => or_null(row.try_get::<_, Option<bool>>(idx)?, Value::Bool),
            ColumnType::SmallInt => {
                or_null(row.try_get::<_, Option<i16>>(idx)?, |v| Value::Int(v.into()))
            }
            ColumnType::Int => {
                or_null(row.try_get::<_, Option<i32>>(idx)?, |v| Value::Int(v.into()))
            }
            ColumnType::BigInt => or_null(row.try_get::<_, Option<i64>>(idx)?, Value::Int),
            ColumnType::Float => {
                or_null(row.try_get::<_, Option<f32>>(idx)?, |v| Value::Float(v.into()))
            }
            ColumnType::Double => or_null(row.try_get::<_, Option<f64>>(idx)?, Value::Float),
            ColumnType::Decimal | ColumnType::Currency => or_null(
                row.try_get::<_, Option<rust_decimal::Decimal>>(idx)?,
                Value::Decimal,
            ),
            ColumnType::Date => {
                or_null(row.try_get::<_, Option<chrono::NaiveDate>>(idx)?, Value::Date)
            }
            ColumnType::Time => {
                or_null(row.try_get::<_, Option<chrono::NaiveTime>>(idx)?, Value::Time)
            }
            ColumnType::DateTime => or_null(
                row.try_get::<_, Option<chrono::NaiveDateTime>>(idx)?,
                Value::DateTime,
            ),
            ColumnType::Guid => or_null(row.try_get::<_, Option<uuid::Uuid>>(idx)?, Value::Guid),
            ColumnType::Blob => or_null(row.try_get::<_, Option<Vec<u8>>>(idx)?, Value::Bytes),
            // Everything else was cast to text in the select list
            _ => or_null(row.try_get::<_, Option<String>>(idx)?, Value::Text),
        };
        Ok(value.coerce(column.column_type))
    }
}

#[async_trait]
impl SchemaProvider for PostgresProvider {
    fn dialect(&self) -> DialectKind {
        DialectKind::Postgres
    }

    async fn table_names(&self) -> Result<Vec<ObjectName>> {
        let client = self.client("table_names").await?;

        let query = r#"
            SELECT table_schema, table_name
            FROM information_schema.tables
            WHERE table_type = 'BASE TABLE'
              AND table_schema NOT IN ('pg_catalog', 'information_schema')
              AND ($1::text IS NULL OR table_schema = $1)
            ORDER BY table_schema, table_name
        "#;

        let rows = client.query(query, &[&self.schema]).await?;

        info!("Found {} tables in PostgreSQL source", rows.len());
        Ok(rows
            .iter()
            .map(|row| ObjectName::new(row.get::<_, String>(1), row.get::<_, String>(0)))
            .collect())
    }

    async fn column_names(&self, table: &str, owner: &str) -> Result<Vec<String>> {
        let client = self.client("column_names").await?;

        let query = r#"
            SELECT column_name
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2
            ORDER BY ordinal_position
        "#;

        let rows = client
            .query(query, &[&self.owner_or_default(owner), &table])
            .await?;
        if rows.is_empty() {
            return Err(MigrateError::Provider(format!(
                "Table {}.{} not found",
                self.owner_or_default(owner),
                table
            )));
        }
        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    async fn index_names(&self, table: &str, owner: &str) -> Result<Vec<String>> {
        let client = self.client("index_names").await?;

        let query = r#"
            SELECT i.relname
            FROM pg_catalog.pg_index ix
            JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid
            JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            WHERE n.nspname = $1 AND t.relname = $2
            ORDER BY ix.indisprimary DESC, i.relname
        "#;

        let rows = client
            .query(query, &[&self.owner_or_default(owner), &table])
            .await?;
        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    async fn foreign_key_names(&self, table: &str, owner: &str) -> Result<Vec<String>> {
        let client = self.client("foreign_key_names").await?;

        let query = r#"
            SELECT c.conname
            FROM pg_catalog.pg_constraint c
            JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            WHERE n.nspname = $1 AND t.relname = $2 AND c.contype = 'f'
            ORDER BY c.conname
        "#;

        let rows = client
            .query(query, &[&self.owner_or_default(owner), &table])
            .await?;
        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    async fn table_meta(&self, table: &str, owner: &str) -> Result<TableMeta> {
        let client = self.client("table_meta").await?;

        let query = r#"
            SELECT c.conname, a.attname
            FROM pg_catalog.pg_constraint c
            JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid
            WHERE n.nspname = $1
              AND t.relname = $2
              AND c.contype = 'p'
              AND a.attnum = ANY(c.conkey)
            ORDER BY array_position(c.conkey, a.attnum)
        "#;

        let owner = self.owner_or_default(owner);
        let rows = client.query(query, &[&owner, &table]).await?;

        let pk_name = rows
            .first()
            .map(|row| row.get::<_, String>(0))
            .unwrap_or_default();
        let pk_columns: Vec<String> = rows.iter().map(|row| row.get(1)).collect();
        debug!("Primary key for {}.{}: {:?}", owner, table, pk_columns);

        Ok(TableMeta {
            name: table.to_string(),
            owner: owner.to_string(),
            pk_name,
            pk_columns,
        })
    }

    async fn column_meta(&self, table: &str, owner: &str, column: &str) -> Result<ColumnMeta> {
        let client = self.client("column_meta").await?;

        let query = r#"
            SELECT
                c.udt_name,
                COALESCE(c.character_maximum_length, 0)::int4,
                COALESCE(c.numeric_precision, 0)::int4,
                COALESCE(c.numeric_scale, 0)::int4,
                c.is_nullable = 'YES',
                c.column_default,
                c.is_identity = 'YES',
                c.identity_start,
                c.identity_increment,
                c.is_generated = 'ALWAYS',
                COALESCE(ty.typtype = 'e', false),
                col_description(
                    (quote_ident(c.table_schema) || '.' || quote_ident(c.table_name))::regclass,
                    c.ordinal_position::int
                )
            FROM information_schema.columns c
            LEFT JOIN pg_catalog.pg_namespace tn ON tn.nspname = c.udt_schema
            LEFT JOIN pg_catalog.pg_type ty ON ty.typname = c.udt_name AND ty.typnamespace = tn.oid
            WHERE c.table_schema = $1 AND c.table_name = $2 AND c.column_name = $3
        "#;

        let owner = self.owner_or_default(owner);
        let row = client
            .query_opt(query, &[&owner, &table, &column])
            .await?
            .ok_or_else(|| {
                MigrateError::Provider(format!("Column {}.{}.{} not found", owner, table, column))
            })?;

        let udt_name: String = row.get(0);
        let is_enum: bool = row.get(10);
        let mapped = if is_enum {
            MappedType::plain(ColumnType::UserDefined)
        } else {
            map_native_type(&udt_name, row.get(1), row.get(2), row.get(3))
        };
        if let Some(warning) = &mapped.warning {
            warn!("{}.{}: {}", table, column, warning);
        }

        let raw_default: Option<String> = row.get(5);
        let serial = raw_default.as_deref().is_some_and(is_sequence_default);
        let is_identity = row.get::<_, bool>(6) || serial;

        let mut attributes = ColumnAttributes::NONE;
        if !row.get::<_, bool>(4) {
            attributes |= ColumnAttributes::REQUIRED;
        }
        if is_identity {
            attributes |= ColumnAttributes::IDENTITY;
        }
        if row.get::<_, bool>(9) {
            attributes |= ColumnAttributes::COMPUTED;
        }
        // Server encoding is assumed to be UTF8.
        if mapped.column_type.is_character() {
            attributes |= ColumnAttributes::UNICODE;
        }

        let identity = is_identity.then(|| {
            let parse = |idx: usize, fallback: i64| {
                row.get::<_, Option<String>>(idx)
                    .and_then(|s| s.parse::<i64>().ok())
                    .unwrap_or(fallback)
            };
            Identity {
                seed: parse(7, 1),
                increment: parse(8, 1),
            }
        });

        let default_value = if serial {
            None
        } else {
            raw_default
                .as_deref()
                .and_then(|raw| default_value(raw, mapped.column_type))
        };

        Ok(ColumnMeta {
            column_type: mapped.column_type,
            native_type: udt_name,
            size: mapped.size,
            precision: mapped.precision,
            scale: mapped.scale,
            default_value,
            description: row.get(11),
            attributes,
            identity,
        })
    }

    async fn index_meta(&self, table: &str, owner: &str, index: &str) -> Result<IndexMeta> {
        let client = self.client("index_meta").await?;

        let query = r#"
            SELECT
                ix.indisunique,
                ix.indisprimary,
                array_agg(a.attname ORDER BY array_position(ix.indkey, a.attnum)) AS columns
            FROM pg_catalog.pg_index ix
            JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid
            JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey)
            WHERE n.nspname = $1 AND t.relname = $2 AND i.relname = $3
            GROUP BY ix.indisunique, ix.indisprimary
        "#;

        let row = client
            .query_opt(query, &[&self.owner_or_default(owner), &table, &index])
            .await?
            .ok_or_else(|| {
                MigrateError::Provider(format!("Index {} not found on {}", index, table))
            })?;

        Ok(IndexMeta {
            unique: row.get(0),
            primary_key: row.get(1),
            columns: row.get(2),
        })
    }

    async fn foreign_key_meta(
        &self,
        table: &str,
        owner: &str,
        foreign_key: &str,
    ) -> Result<ForeignKeyMeta> {
        let client = self.client("foreign_key_meta").await?;

        let query = r#"
            SELECT
                array_agg(a.attname ORDER BY array_position(c.conkey, a.attnum)) AS columns,
                rn.nspname AS ref_schema,
                rt.relname AS ref_table,
                array_agg(ra.attname ORDER BY array_position(c.confkey, ra.attnum)) AS ref_columns,
                CASE c.confupdtype
                    WHEN 'r' THEN 'RESTRICT'
                    WHEN 'c' THEN 'CASCADE'
                    WHEN 'n' THEN 'SET NULL'
                    WHEN 'd' THEN 'SET DEFAULT'
                    ELSE 'NO ACTION'
                END AS on_update,
                CASE c.confdeltype
                    WHEN 'r' THEN 'RESTRICT'
                    WHEN 'c' THEN 'CASCADE'
                    WHEN 'n' THEN 'SET NULL'
                    WHEN 'd' THEN 'SET DEFAULT'
                    ELSE 'NO ACTION'
                END AS on_delete
            FROM pg_catalog.pg_constraint c
            JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_catalog.pg_class rt ON rt.oid = c.confrelid
            JOIN pg_catalog.pg_namespace rn ON rn.oid = rt.relnamespace
            JOIN LATERAL unnest(c.conkey, c.confkey) AS k(attnum, refnum) ON true
            JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
            JOIN pg_catalog.pg_attribute ra ON ra.attrelid = rt.oid AND ra.attnum = k.refnum
            WHERE n.nspname = $1
              AND t.relname = $2
              AND c.conname = $3
              AND c.contype = 'f'
            GROUP BY rn.nspname, rt.relname, c.confupdtype, c.confdeltype
        "#;

        let row = client
            .query_opt(query, &[&self.owner_or_default(owner), &table, &foreign_key])
            .await?
            .ok_or_else(|| {
                MigrateError::Provider(format!(
                    "Foreign key {} not found on {}",
                    foreign_key, table
                ))
            })?;

        let meta = ForeignKeyMeta {
            columns: row.get(0),
            related_owner: row.get(1),
            related_table: row.get(2),
            related_columns: row.get(3),
            update_rule: ForeignKeyRule::from_catalog(row.get(4)),
            delete_rule: ForeignKeyRule::from_catalog(row.get(5)),
        };
        debug!("Loaded foreign key {} on {}", foreign_key, table);
        Ok(meta)
    }

    async fn type_names(&self) -> Result<Vec<ObjectName>> {
        let client = self.client("type_names").await?;

        let query = r#"
            SELECT n.nspname, t.typname
            FROM pg_catalog.pg_type t
            JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace
            WHERE t.typtype = 'e'
              AND n.nspname NOT IN ('pg_catalog', 'information_schema')
              AND ($1::text IS NULL OR n.nspname = $1)
            ORDER BY n.nspname, t.typname
        "#;

        let rows = client.query(query, &[&self.schema]).await?;
        Ok(rows
            .iter()
            .map(|row| ObjectName::new(row.get::<_, String>(1), row.get::<_, String>(0)))
            .collect())
    }

    async fn type_meta(&self, name: &str, owner: &str) -> Result<TypeMeta> {
        let client = self.client("type_meta").await?;

        let query = r#"
            SELECT e.enumlabel
            FROM pg_catalog.pg_enum e
            JOIN pg_catalog.pg_type t ON t.oid = e.enumtypid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace
            WHERE t.typname = $1 AND n.nspname = $2
            ORDER BY e.enumsortorder
        "#;

        let rows = client
            .query(query, &[&name, &self.owner_or_default(owner)])
            .await?;
        if rows.is_empty() {
            return Err(MigrateError::Provider(format!(
                "Enum type {}.{} not found",
                owner, name
            )));
        }

        Ok(TypeMeta {
            base_type: ColumnType::VarChar,
            values: rows.iter().map(|row| row.get(0)).collect(),
            enumerated: true,
        })
    }

    async fn check_constraints(&self, table: &str, owner: &str) -> Result<Vec<CheckConstraint>> {
        let client = self.client("check_constraints").await?;

        // consrc was removed in PostgreSQL 12; pg_get_expr renders the bare expression.
        let query = r#"
            SELECT c.conname, pg_get_expr(c.conbin, c.conrelid)
            FROM pg_catalog.pg_constraint c
            JOIN pg_catalog.pg_class t ON t.oid = c.conrelid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
            WHERE n.nspname = $1 AND t.relname = $2 AND c.contype = 'c'
            ORDER BY c.conname
        "#;

        let rows = client
            .query(query, &[&self.owner_or_default(owner), &table])
            .await?;

        let checks: Vec<CheckConstraint> = rows
            .iter()
            .map(|row| {
                let expr: String = row.get(1);
                CheckConstraint::parse(row.get::<_, String>(0), &check_definition(&expr))
            })
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
        let client = self.client("read_rows").await?;

        let select_list = columns
            .iter()
            .map(Self::select_expr)
            .collect::<Result<Vec<_>>>()?
            .join(", ");
        let sql = format!(
            "SELECT {} FROM {}.{}",
            select_list,
            quote_ansi(self.owner_or_default(owner))?,
            quote_ansi(table)?
        );

        let rows = client.query(sql.as_str(), &[]).await?;
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
        self.pool.close();
    }
}
