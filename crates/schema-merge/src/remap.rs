//! Primary key translation table.
//!
//! While rows are shifted out of collision range, the remapper records
//! `(table, column, old value) -> new value` so that columns referencing a
//! shifted key can later be rewritten to the same value.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

type ValueMap = HashMap<i64, i64>;
type ColumnMap = HashMap<String, ValueMap>;

/// Lookup failure, naming the level at which the key was absent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemapError {
    /// Nothing was recorded for the table.
    #[error("table {0} not found")]
    TableNotFound(String),

    /// The table is known but the column is not.
    #[error("column {column} not found in table {table}")]
    ColumnNotFound {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// The column is known but the value was never shifted.
    #[error("value {value} not found for {table}.{column}")]
    ValueNotFound {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// The old key value that was looked up.
        value: i64,
    },
}

/// Concurrency-safe store of shifted primary key values.
///
/// A single lock guards the whole map and is held for one read or write
/// only, never across an `.await`.
#[derive(Debug, Default)]
pub struct PrimaryKeyRemapper {
    keys: Mutex<HashMap<String, ColumnMap>>,
}

impl PrimaryKeyRemapper {
    /// Creates an empty remapper.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Every critical section leaves the map consistent, so a poisoned lock
    // is still safe to use.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, ColumnMap>> {
        self.keys
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Records that `old_value` of `table.column` becomes `new_value`.
    pub fn set_mapping(&self, table: &str, column: &str, old_value: i64, new_value: i64) {
        self.lock()
            .entry(table.to_string())
            .or_default()
            .entry(column.to_string())
            .or_default()
            .insert(old_value, new_value);
    }

    /// Returns the value `old_value` of `table.column` was shifted to.
    ///
    /// # Errors
    ///
    /// Returns a [`RemapError`] naming whether the table, the column or the
    /// value was never recorded.
    pub fn get_mapping(&self, table: &str, column: &str, old_value: i64) -> Result<i64, RemapError> {
        let keys = self.lock();
        let columns = keys
            .get(table)
            .ok_or_else(|| RemapError::TableNotFound(table.to_string()))?;
        let values = columns
            .get(column)
            .ok_or_else(|| RemapError::ColumnNotFound {
                table: table.to_string(),
                column: column.to_string(),
            })?;
        values
            .get(&old_value)
            .copied()
            .ok_or_else(|| RemapError::ValueNotFound {
                table: table.to_string(),
                column: column.to_string(),
                value: old_value,
            })
    }

    /// Returns the number of recorded values across all tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock()
            .values()
            .flat_map(HashMap::values)
            .map(HashMap::len)
            .sum()
    }

    /// Returns whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
