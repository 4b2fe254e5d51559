//! Schema catalog: builds a [`Schema`] from a live database.
//!
//! Tables are described concurrently, one future per table. The first
//! failing table aborts the others and the whole fetch fails; a partial
//! schema is never returned.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::{debug, info};

use crate::error::{MergeError, Result};
use crate::schema::{Column, KeyKind, Schema, Table};

/// One row of `SHOW COLUMNS`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnRow {
    /// `Field`.
    pub field: String,
    /// `Type`.
    pub column_type: String,
    /// `Null` (`YES` or `NO`).
    pub null: String,
    /// `Key` (`PRI`, `UNI`, `MUL` or empty).
    pub key: String,
    /// `Default`.
    pub default: Option<String>,
    /// `Extra`.
    pub extra: String,
}

impl ColumnRow {
    /// Converts the raw row into a [`Column`] without any offset.
    #[must_use]
    pub fn into_column(self) -> Column {
        let mut column = Column {
            name: self.field,
            column_type: self.column_type,
            nullable: self.null.eq_ignore_ascii_case("YES"),
            key: KeyKind::from_mysql(&self.key),
            default: self.default,
            extra: self.extra,
            auto_increment: false,
            auto_increment_offset: None,
        };
        column.auto_increment = column.extra_is_auto_increment();
        column
    }
}

/// Queries the catalog needs from a database.
///
/// Implemented by [`MySqlCatalog`](crate::mysql::MySqlCatalog) for live
/// servers; tests drive the catalog with in-memory implementations.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Lists the tables of `database`.
    async fn table_names(&self, database: &str) -> Result<Vec<String>>;

    /// Describes the columns of `database.table`.
    async fn columns(&self, database: &str, table: &str) -> Result<Vec<ColumnRow>>;

    /// Returns the table's current `AUTO_INCREMENT` value.
    async fn auto_increment(&self, database: &str, table: &str) -> Result<Option<i64>>;

    /// Returns every value of an integer key column.
    async fn primary_key_values(
        &self,
        database: &str,
        table: &str,
        column: &str,
    ) -> Result<Vec<i64>>;
}

/// Attaches database and table context to driver errors.
fn with_table_context(database: &str, table: &str, err: MergeError) -> MergeError {
    match err {
        MergeError::Database(source) => MergeError::introspection(database, table, source),
        other => other,
    }
}

/// Reads the structure of `database`, skipping the tables in `ignore_tables`.
///
/// # Errors
///
/// Fails with [`MergeError::Introspection`] if listing the tables or
/// describing any one of them fails.
pub async fn fetch_schema<S>(source: &S, database: &str, ignore_tables: &[String]) -> Result<Schema>
where
    S: CatalogSource + ?Sized,
{
    let names = source.table_names(database).await.map_err(|e| match e {
        MergeError::Database(err) => MergeError::listing(database, err),
        other => other,
    })?;

    let (ignored, names): (Vec<String>, Vec<String>) = names
        .into_iter()
        .partition(|name| ignore_tables.contains(name));
    for name in &ignored {
        debug!(database, table = %name, "Ignoring table");
    }

    let tables = Mutex::new(BTreeMap::new());
    let fetches = names.iter().map(|name| {
        let tables = &tables;
        async move {
            let table = describe_table(source, database, name)
                .await
                .map_err(|e| with_table_context(database, name, e))?;
            tables
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(table.name.clone(), table);
            Ok::<_, MergeError>(())
        }
    });
    try_join_all(fetches).await?;

    let tables = tables.into_inner().unwrap_or_else(PoisonError::into_inner);
    info!(
        database,
        tables = tables.len(),
        ignored = ignored.len(),
        "Schema loaded"
    );

    Ok(Schema {
        name: database.to_string(),
        tables,
    })
}

async fn describe_table<S>(source: &S, database: &str, name: &str) -> Result<Table>
where
    S: CatalogSource + ?Sized,
{
    let rows = source.columns(database, name).await?;
    let mut table = Table::new(name);
    // One AUTO_INCREMENT counter per table, fetched at most once.
    let mut high_water: Option<Option<i64>> = None;

    for row in rows {
        let mut column = row.into_column();
        if column.auto_increment {
            let offset = match high_water {
                Some(offset) => offset,
                None => {
                    let offset = source.auto_increment(database, name).await?;
                    high_water = Some(offset);
                    offset
                }
            };
            column = column.with_auto_increment_offset(offset);
        }
        table.add_column(column);
    }

    debug!(
        database,
        table = name,
        columns = table.columns.len(),
        auto_increment = ?high_water.flatten(),
        "Described table"
    );
    Ok(table)
}
