//! Structural equality between two schemas.
//!
//! Two schemas are equal when they hold the same tables, each with the same
//! columns, and every matched column agrees on type and auto-increment flag.
//! Nullability, default value, key kind and extra attributes are not
//! compared.

use crate::schema::{Schema, Table};

/// The first difference found between two schemas.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaMismatch {
    /// The schemas hold a different number of tables.
    #[error("table count mismatch: {left} != {right}")]
    TableCount {
        /// Tables in the left schema.
        left: usize,
        /// Tables in the right schema.
        right: usize,
    },

    /// A table of the left schema is absent from the right one.
    #[error("table {table} not found in other schema")]
    MissingTable {
        /// Table name.
        table: String,
    },

    /// A table has a different number of columns on each side.
    #[error("column count mismatch in table {table}: {left} != {right}")]
    ColumnCount {
        /// Table name.
        table: String,
        /// Columns on the left.
        left: usize,
        /// Columns on the right.
        right: usize,
    },

    /// A column of the left table is absent from the right one.
    #[error("column {table}.{column} not found in other schema")]
    MissingColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A column has a different type on each side.
    #[error("column type mismatch for {table}.{column}: {left} != {right}")]
    TypeMismatch {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Type on the left.
        left: String,
        /// Type on the right.
        right: String,
    },

    /// A column auto-increments on one side only.
    #[error("column auto increment mismatch for {table}.{column}: {left} != {right}")]
    AutoIncrementMismatch {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Flag on the left.
        left: bool,
        /// Flag on the right.
        right: bool,
    },
}

/// Checks that `right` is a structural clone of `left`.
///
/// # Errors
///
/// Returns the first [`SchemaMismatch`] found.
pub fn ensure_equal(left: &Schema, right: &Schema) -> Result<(), SchemaMismatch> {
    if left.tables.len() != right.tables.len() {
        return Err(SchemaMismatch::TableCount {
            left: left.tables.len(),
            right: right.tables.len(),
        });
    }

    for (name, table) in &left.tables {
        let other = right
            .tables
            .get(name)
            .ok_or_else(|| SchemaMismatch::MissingTable {
                table: name.clone(),
            })?;
        ensure_tables_equal(table, other)?;
    }

    Ok(())
}

fn ensure_tables_equal(left: &Table, right: &Table) -> Result<(), SchemaMismatch> {
    if left.columns.len() != right.columns.len() {
        return Err(SchemaMismatch::ColumnCount {
            table: left.name.clone(),
            left: left.columns.len(),
            right: right.columns.len(),
        });
    }

    for (name, column) in &left.columns {
        let Some(other) = right.columns.get(name) else {
            return Err(SchemaMismatch::MissingColumn {
                table: left.name.clone(),
                column: name.clone(),
            });
        };
        if column.column_type != other.column_type {
            return Err(SchemaMismatch::TypeMismatch {
                table: left.name.clone(),
                column: name.clone(),
                left: column.column_type.clone(),
                right: other.column_type.clone(),
            });
        }
        if column.auto_increment != other.auto_increment {
            return Err(SchemaMismatch::AutoIncrementMismatch {
                table: left.name.clone(),
                column: name.clone(),
                left: column.auto_increment,
                right: other.auto_increment,
            });
        }
    }

    Ok(())
}

impl Schema {
    /// Checks that `other` is a structural clone of this schema.
    ///
    /// # Errors
    ///
    /// See [`ensure_equal`].
    pub fn ensure_equal(&self, other: &Self) -> Result<(), SchemaMismatch> {
        ensure_equal(self, other)
    }
}
