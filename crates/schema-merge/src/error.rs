//! Error types for schema comparison and merge planning.

use crate::compare::SchemaMismatch;
use crate::remap::RemapError;

/// Errors that can occur while introspecting, comparing or merging schemas.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// The database locator is malformed, uses an unsupported engine, or the
    /// server refused the connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Database error outside of schema introspection.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A catalog query failed while listing tables or describing one.
    #[error("Failed to introspect {}: {source}", introspection_target(.database, .table.as_deref()))]
    Introspection {
        /// Database being introspected.
        database: String,
        /// Table being described, `None` while listing tables.
        table: Option<String>,
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },

    /// The two schemas are not structural clones of each other.
    #[error("Schemas are not equal: {0}")]
    SchemaMismatch(#[from] SchemaMismatch),

    /// A primary key translation was requested but never recorded.
    #[error("Primary key lookup failed: {0}")]
    RemapLookup(#[from] RemapError),

    /// An identifier cannot be safely quoted.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A statement builder was asked to build before it was complete.
    #[error("Incomplete statement: {0}")]
    IncompleteStatement(String),

    /// Shifting a source key by the target offset does not fit in an `i64`.
    #[error("Shifting {table}.{column} value {value} by {offset} overflows")]
    KeyShiftOverflow {
        /// Source table holding the key.
        table: String,
        /// Shifted key column.
        column: String,
        /// Source key value.
        value: i64,
        /// Target offset.
        offset: i64,
    },
}

impl MergeError {
    /// Creates an introspection error for a single table.
    pub fn introspection(
        database: impl Into<String>,
        table: impl Into<String>,
        source: sqlx::Error,
    ) -> Self {
        Self::Introspection {
            database: database.into(),
            table: Some(table.into()),
            source,
        }
    }

    /// Creates an introspection error raised while listing tables.
    pub fn listing(database: impl Into<String>, source: sqlx::Error) -> Self {
        Self::Introspection {
            database: database.into(),
            table: None,
            source,
        }
    }
}

fn introspection_target(database: &str, table: Option<&str>) -> String {
    match table {
        Some(table) => format!("table '{database}.{table}'"),
        None => format!("tables of database '{database}'"),
    }
}

/// Result type for schema merge operations.
pub type Result<T> = std::result::Result<T, MergeError>;
