//! Conversion pipeline: provider → portable model → generator.
//!
//! [`load_database`] drives any [`SchemaProvider`] through its catalog
//! questions to build a [`Database`]; [`generate`] hands that model to the
//! target dialect's generator; [`convert`] does both from a [`Config`].

use std::io::Write;

use tracing::{debug, info};

use crate::config::{Config, ExportConfig};
use crate::core::schema::{Column, DataType, Database, ForeignKey, Index, PrimaryKey, Table};
use crate::core::traits::SchemaProvider;
use crate::core::types::ColumnAttributes;
use crate::drivers::DialectKind;
use crate::error::Result;
use crate::generator::{ExportOptions, GenerationReport, Generator};

/// Build the portable model for everything `provider` exposes.
///
/// Tables outside `export.tables` are listed but not loaded, so foreign keys
/// pointing at them can be reported. Rows are read only when data export is
/// enabled.
pub async fn load_database(
    provider: &dyn SchemaProvider,
    name: &str,
    export: &ExportConfig,
) -> Result<Database> {
    let mut database = Database::new(name);

    for type_name in provider.type_names().await? {
        let meta = provider.type_meta(&type_name.name, &type_name.owner).await?;
        debug!(
            "Loaded type {} with {} values",
            type_name.name,
            meta.values.len()
        );
        database.types.push(DataType {
            name: type_name.name,
            owner: type_name.owner,
            base_type: meta.base_type,
            values: meta.values,
            enumerated: meta.enumerated,
        });
    }

    let names = provider.table_names().await?;
    info!("Loading {} tables from {}", names.len(), provider.dialect());

    for object in names {
        if !export.includes(&object.name) {
            debug!("Skipping table {} (not in include list)", object.name);
            let mut table = Table::new(object.name, object.owner);
            table.checked = false;
            database.tables.push(table);
            continue;
        }

        let mut table = load_table(provider, &object.name, &object.owner).await?;
        if export.data {
            table.rows = provider
                .read_rows(&table.name, &table.owner, &table.columns)
                .await?;
        }

        info!(
            "Loaded table {}: {} columns, {} indexes, {} foreign keys, {} rows",
            table.full_name(),
            table.columns.len(),
            table.indexes.len(),
            table.foreign_keys.len(),
            table.rows.len()
        );
        database.tables.push(table);
    }

    Ok(database)
}

/// Load one table's structure.
pub async fn load_table(provider: &dyn SchemaProvider, name: &str, owner: &str) -> Result<Table> {
    let meta = provider.table_meta(name, owner).await?;
    let mut table = Table::new(meta.name, meta.owner);

    if !meta.pk_columns.is_empty() {
        table.primary_key = Some(PrimaryKey {
            name: meta.pk_name,
            columns: meta.pk_columns,
        });
    }

    for column_name in provider.column_names(name, owner).await? {
        let meta = provider.column_meta(name, owner, &column_name).await?;
        let is_identity = meta.attributes.contains(ColumnAttributes::IDENTITY);
        table.columns.push(Column {
            name: column_name,
            column_type: meta.column_type,
            native_type: meta.native_type,
            size: meta.size,
            precision: meta.precision,
            scale: meta.scale,
            attributes: meta.attributes,
            default: meta.default_value,
            identity: if is_identity {
                Some(meta.identity.unwrap_or_default())
            } else {
                None
            },
            description: meta.description,
        });
    }

    for index_name in provider.index_names(name, owner).await? {
        let meta = provider.index_meta(name, owner, &index_name).await?;
        let primary_key = meta.primary_key || matches_primary_key(&table, &index_name, &meta.columns);
        table.indexes.push(Index {
            name: index_name,
            columns: meta.columns,
            unique: meta.unique,
            primary_key,
        });
    }

    for fk_name in provider.foreign_key_names(name, owner).await? {
        let meta = provider.foreign_key_meta(name, owner, &fk_name).await?;
        table.foreign_keys.push(ForeignKey {
            name: fk_name,
            columns: meta.columns,
            related_table: meta.related_table,
            related_owner: meta.related_owner,
            related_columns: meta.related_columns,
            update_rule: meta.update_rule,
            delete_rule: meta.delete_rule,
        });
    }

    table.check_constraints = provider.check_constraints(name, owner).await?;
    Ok(table)
}

/// An index named after the primary key and covering exactly its columns.
fn matches_primary_key(table: &Table, index: &str, columns: &[String]) -> bool {
    table.primary_key.as_ref().is_some_and(|pk| {
        !pk.name.is_empty()
            && pk.name.eq_ignore_ascii_case(index)
            && pk.columns.len() == columns.len()
            && pk
                .columns
                .iter()
                .zip(columns)
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    })
}

/// Write the `target` script for `database` into `sink`.
pub fn generate<W: Write>(
    database: &Database,
    target: DialectKind,
    options: ExportOptions,
    sink: W,
) -> Result<GenerationReport> {
    let dialect = target.generator();
    let mut generator = Generator::new(dialect.strategy(), sink, options);
    generator.visit_database(database)
}

/// Run a whole conversion described by `config`.
pub async fn convert<W: Write>(config: &Config, sink: W) -> Result<GenerationReport> {
    info!(
        "Converting {} database {} to {}",
        config.source.dialect,
        config.target_database_name(),
        config.target.dialect
    );

    let provider = config.source.dialect.connect(&config.source).await?;
    let loaded = load_database(
        provider.as_ref(),
        &config.target_database_name(),
        &config.export,
    )
    .await;
    provider.close().await;
    let database = loaded?;

    let options = config
        .export
        .to_options(config.target.dialect, Some(config.target_database_name()));
    generate(&database, config.target.dialect, options, sink)
}
