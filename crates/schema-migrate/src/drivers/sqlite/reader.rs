//! SQLite schema provider.
//!
//! SQLite keeps no structured catalog of columns or constraints, only the
//! original `CREATE TABLE` text in `sqlite_master`. Tables are rebuilt by
//! running that text through the DDL parser; index facts come from the
//! `index_list` / `index_info` pragmas.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, TypeInfo, ValueRef};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::SourceConfig;
use crate::core::identifier::quote_ansi;
use crate::core::meta::{ColumnMeta, ForeignKeyMeta, IndexMeta, ObjectName, TableMeta};
use crate::core::schema::{CheckConstraint, Column, Identity};
use crate::core::traits::SchemaProvider;
use crate::core::types::ColumnAttributes;
use crate::core::value::Value;
use crate::drivers::DialectKind;
use crate::error::{MigrateError, Result};
use crate::parser::{parse_create_table, ColumnRefList, CreateTable, ForeignKeySpec, TableConstraint};

use super::types::{default_value, map_native_type};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// One row of `PRAGMA index_list`, with the display name resolved.
#[derive(Debug, Clone)]
struct IndexEntry {
    /// Name reported to the model builder.
    name: String,
    /// Name SQLite knows the index by.
    raw_name: String,
    unique: bool,
    primary_key: bool,
}

/// SQLite schema provider.
pub struct SqliteProvider {
    pool: SqlitePool,
    definitions: Mutex<HashMap<String, CreateTable>>,
}

impl SqliteProvider {
    /// Open the database file named by `config.path` read-only.
    pub async fn new(config: &SourceConfig) -> Result<Self> {
        let path = config
            .path
            .as_ref()
            .ok_or_else(|| MigrateError::Config("source.path is required for sqlite".into()))?;

        let options = SqliteConnectOptions::new().filename(path).read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| MigrateError::pool(e, "opening SQLite source database"))?;

        info!("Connected to SQLite source: {}", path.display());

        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            definitions: Mutex::new(HashMap::new()),
        }
    }

    /// Parsed `CREATE TABLE` statement for `table`, cached per provider.
    async fn definition(&self, table: &str) -> Result<CreateTable> {
        let mut definitions = self.definitions.lock().await;
        if let Some(def) = definitions.get(table) {
            return Ok(def.clone());
        }

        let sql: Option<String> =
            sqlx::query_scalar("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1")
                .bind(table)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| MigrateError::pool(e, "loading SQLite table definition"))?;
        let sql = sql.ok_or_else(|| {
            MigrateError::Provider(format!("SQLite table {} not found", table))
        })?;

        debug!("Parsing SQLite definition of {}", table);
        let def = parse_create_table(&sql)?;
        definitions.insert(table.to_string(), def.clone());
        Ok(def)
    }

    /// Primary key name and columns, from a table constraint or column flags.
    fn primary_key(def: &CreateTable) -> (String, Vec<String>) {
        if let Some(pk) = def.primary_key() {
            return (pk.name.clone().unwrap_or_default(), pk.columns.to_vec());
        }
        let columns = def
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone())
            .collect();
        (String::new(), columns)
    }

    /// Foreign keys with their reported names, table constraints first.
    fn foreign_keys(def: &CreateTable) -> Vec<(String, ForeignKeySpec)> {
        let table_level = def.constraints.iter().filter_map(|c| match c {
            TableConstraint::ForeignKey(fk) => Some(fk.clone()),
            _ => None,
        });
        let column_level = def.columns.iter().filter_map(|c| {
            c.references.clone().map(|mut fk| {
                fk.columns = ColumnRefList(vec![c.name.clone()]);
                fk
            })
        });

        table_level
            .chain(column_level)
            .enumerate()
            .map(|(i, fk)| {
                let name = fk
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("FK_{}_{}", def.name, i + 1));
                (name, fk)
            })
            .collect()
    }

    async fn index_entries(&self, table: &str) -> Result<Vec<IndexEntry>> {
        let rows: Vec<SqliteRow> = sqlx::query(
            r#"SELECT name, "unique", origin FROM pragma_index_list(?1) ORDER BY seq"#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MigrateError::pool(e, "loading SQLite index list"))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let raw_name: String = row.get("name");
            let origin: String = row.get("origin");
            let unique = row.get::<i64, _>("unique") != 0;
            let primary_key = origin == "pk";

            let name = if raw_name.starts_with("sqlite_autoindex_") {
                let columns = self.index_columns(&raw_name).await?;
                let prefix = if primary_key { "PK" } else { "UQ" };
                format!("{}_{}_{}", prefix, table, columns.join("_"))
            } else {
                raw_name.clone()
            };

            entries.push(IndexEntry {
                name,
                raw_name,
                unique,
                primary_key,
            });
        }
        Ok(entries)
    }

    async fn index_columns(&self, raw_name: &str) -> Result<Vec<String>> {
        let columns: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")
                .bind(raw_name)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| MigrateError::pool(e, "loading SQLite index columns"))?;
        Ok(columns)
    }

    /// Decode one cell by its storage class.
    fn cell(row: &SqliteRow, index: usize, column: &Column) -> Result<Value> {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        let storage = raw.type_info().name().to_string();

        let value = match storage.as_str() {
            "INTEGER" => Value::Int(row.try_get::<i64, _>(index)?),
            "REAL" => Value::Float(row.try_get::<f64, _>(index)?),
            "BLOB" => Value::Bytes(row.try_get::<Vec<u8>, _>(index)?),
            _ => Value::Text(row.try_get::<String, _>(index)?),
        };
        Ok(value.coerce(column.column_type))
    }
}

#[async_trait]
impl SchemaProvider for SqliteProvider {
    fn dialect(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    async fn table_names(&self) -> Result<Vec<ObjectName>> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
             ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MigrateError::pool(e, "listing SQLite tables"))?;

        info!("Found {} tables", names.len());
        Ok(names.into_iter().map(|n| ObjectName::new(n, "")).collect())
    }

    async fn column_names(&self, table: &str, _owner: &str) -> Result<Vec<String>> {
        let def = self.definition(table).await?;
        Ok(def.columns.iter().map(|c| c.name.clone()).collect())
    }

    async fn index_names(&self, table: &str, _owner: &str) -> Result<Vec<String>> {
        Ok(self
            .index_entries(table)
            .await?
            .into_iter()
            .map(|e| e.name)
            .collect())
    }

    async fn foreign_key_names(&self, table: &str, _owner: &str) -> Result<Vec<String>> {
        let def = self.definition(table).await?;
        Ok(Self::foreign_keys(&def)
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    async fn table_meta(&self, table: &str, owner: &str) -> Result<TableMeta> {
        let def = self.definition(table).await?;
        let (pk_name, pk_columns) = Self::primary_key(&def);
        Ok(TableMeta {
            name: def.name.clone(),
            owner: owner.to_string(),
            pk_name,
            pk_columns,
        })
    }

    async fn column_meta(&self, table: &str, _owner: &str, column: &str) -> Result<ColumnMeta> {
        let def = self.definition(table).await?;
        let spec = def
            .columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(column))
            .ok_or_else(|| {
                MigrateError::Provider(format!("Column {}.{} not found", table, column))
            })?;

        let mapped = map_native_type(&spec.type_name, spec.precision, spec.scale);
        if let Some(warning) = &mapped.warning {
            warn!("{}.{}: {}", table, column, warning);
        }

        let (_, pk_columns) = Self::primary_key(&def);
        let in_pk = pk_columns.iter().any(|c| c.eq_ignore_ascii_case(&spec.name));

        let mut attributes = ColumnAttributes::NONE;
        if spec.not_null || in_pk {
            attributes |= ColumnAttributes::REQUIRED;
        }
        if spec.autoincrement {
            attributes |= ColumnAttributes::IDENTITY;
        }
        if mapped.column_type.is_character() {
            attributes |= ColumnAttributes::UNICODE;
        }

        let native_type = match (spec.precision, spec.scale) {
            (Some(p), Some(s)) => format!("{}({},{})", spec.type_name, p, s),
            (Some(p), None) => format!("{}({})", spec.type_name, p),
            _ => spec.type_name.clone(),
        };

        Ok(ColumnMeta {
            column_type: mapped.column_type,
            native_type,
            size: mapped.size,
            precision: mapped.precision,
            scale: mapped.scale,
            default_value: spec
                .default
                .as_ref()
                .and_then(|expr| default_value(expr, mapped.column_type)),
            description: None,
            attributes,
            identity: spec.autoincrement.then(Identity::default),
        })
    }

    async fn index_meta(&self, table: &str, _owner: &str, index: &str) -> Result<IndexMeta> {
        let entry = self
            .index_entries(table)
            .await?
            .into_iter()
            .find(|e| e.name == index)
            .ok_or_else(|| {
                MigrateError::Provider(format!("Index {} not found on {}", index, table))
            })?;

        Ok(IndexMeta {
            unique: entry.unique,
            primary_key: entry.primary_key,
            columns: self.index_columns(&entry.raw_name).await?,
        })
    }

    async fn foreign_key_meta(
        &self,
        table: &str,
        _owner: &str,
        foreign_key: &str,
    ) -> Result<ForeignKeyMeta> {
        let def = self.definition(table).await?;
        let (_, fk) = Self::foreign_keys(&def)
            .into_iter()
            .find(|(name, _)| name == foreign_key)
            .ok_or_else(|| {
                MigrateError::Provider(format!(
                    "Foreign key {} not found on {}",
                    foreign_key, table
                ))
            })?;

        // REFERENCES parent without a column list points at the parent's key.
        let related_columns = if fk.ref_columns.is_empty() {
            self.table_meta(&fk.ref_table, "").await?.pk_columns
        } else {
            fk.ref_columns.to_vec()
        };

        Ok(ForeignKeyMeta {
            columns: fk.columns.to_vec(),
            related_table: fk.ref_table.clone(),
            related_owner: String::new(),
            related_columns,
            update_rule: fk.on_update,
            delete_rule: fk.on_delete,
        })
    }

    async fn check_constraints(&self, table: &str, _owner: &str) -> Result<Vec<CheckConstraint>> {
        let def = self.definition(table).await?;

        let table_level = def.constraints.iter().filter_map(|c| match c {
            TableConstraint::Check(check) => Some(CheckConstraint::from_expr(
                check.name.clone().unwrap_or_default(),
                check.expr.clone(),
            )),
            _ => None,
        });
        let column_level = def.columns.iter().flat_map(|c| {
            c.checks
                .iter()
                .map(|expr| CheckConstraint::from_expr(String::new(), expr.clone()))
        });

        Ok(table_level.chain(column_level).collect())
    }

    async fn read_rows(
        &self,
        table: &str,
        _owner: &str,
        columns: &[Column],
    ) -> Result<Vec<Vec<Value>>> {
        let column_list = columns
            .iter()
            .map(|c| quote_ansi(&c.name))
            .collect::<Result<Vec<_>>>()?
            .join(", ");
        let sql = format!("SELECT {} FROM {}", column_list, quote_ansi(table)?);

        let rows: Vec<SqliteRow> = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| MigrateError::pool(e, "reading SQLite rows"))?;

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
