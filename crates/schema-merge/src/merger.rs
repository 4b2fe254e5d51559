//! Merge planning.
//!
//! For every table of the target schema with an auto-increment primary key,
//! the merger emits one `INSERT INTO target ... SELECT ... FROM source`
//! statement that shifts the source keys by the target's high-water mark, so
//! copied rows land strictly above the rows already in the target.
//!
//! Statements are emitted in table-name order. Foreign keys pointing at a
//! shifted key are not rewritten and tables are not ordered by dependency;
//! [`Merger::record_key_shifts`] fills the [`PrimaryKeyRemapper`] that such
//! a rewrite would consult.

use std::fmt;

use tracing::{debug, info};

use crate::catalog::CatalogSource;
use crate::compare::ensure_equal;
use crate::error::{MergeError, Result};
use crate::remap::PrimaryKeyRemapper;
use crate::schema::{Column, Schema, Table};
use crate::statement::InsertSelect;

/// A key column shifted by a fixed offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftedKey {
    /// Column name.
    pub column: String,
    /// Amount added to every source value.
    pub offset: i64,
}

/// Row migration for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatement {
    /// Table name (identical in source and target).
    pub table: String,
    /// Offsettable primary key columns.
    pub shifted: Vec<ShiftedKey>,
    /// Columns copied unchanged.
    pub copied: Vec<String>,
    /// Rendered SQL, without a trailing semicolon.
    pub sql: String,
}

impl fmt::Display for MigrationStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// The ordered statements of one merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergePlan {
    /// Database rows are copied from.
    pub source: String,
    /// Database rows are copied into.
    pub target: String,
    /// One statement per table with an offsettable primary key.
    pub statements: Vec<MigrationStatement>,
    /// Tables left out because they have no offsettable primary key.
    pub skipped: Vec<String>,
}

impl MergePlan {
    /// Returns whether there is nothing to migrate.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Returns the SQL of every statement in order.
    pub fn sql(&self) -> impl Iterator<Item = &str> {
        self.statements.iter().map(|s| s.sql.as_str())
    }
}

impl fmt::Display for MergePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for statement in &self.statements {
            writeln!(f, "{statement};")?;
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Plans merges and owns the key translations of one merge run.
#[derive(Debug, Default)]
pub struct Merger {
    remapper: PrimaryKeyRemapper,
}

impl Merger {
    /// Creates a merger with an empty remapper.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the key translations recorded so far.
    #[must_use]
    pub fn remapper(&self) -> &PrimaryKeyRemapper {
        &self.remapper
    }

    /// Plans the copy of every row of `source` into `target`.
    ///
    /// # Errors
    ///
    /// Fails with [`MergeError::SchemaMismatch`] before producing anything if
    /// the schemas differ, or with [`MergeError::InvalidIdentifier`] if a name
    /// cannot be quoted.
    pub fn plan_merge(&self, source: &Schema, target: &Schema) -> Result<MergePlan> {
        ensure_equal(source, target)?;

        let mut plan = MergePlan {
            source: source.name.clone(),
            target: target.name.clone(),
            ..MergePlan::default()
        };

        for table in target.tables.values() {
            match plan_table(&source.name, &target.name, table)? {
                Some(statement) => {
                    debug!(table = %table.name, sql = %statement.sql, "Planned table");
                    plan.statements.push(statement);
                }
                None => {
                    debug!(table = %table.name, "Skipping table without auto-increment primary key");
                    plan.skipped.push(table.name.clone());
                }
            }
        }

        info!(
            source = %plan.source,
            target = %plan.target,
            statements = plan.statements.len(),
            skipped = plan.skipped.len(),
            "Merge planned"
        );
        Ok(plan)
    }

    /// Records `old -> old + offset` for every shifted key value of the
    /// source tables in `plan`.
    ///
    /// Returns the number of values recorded.
    ///
    /// # Errors
    ///
    /// Fails if reading the key values of a source table fails, or with
    /// [`MergeError::KeyShiftOverflow`] if a shifted value does not fit in an
    /// `i64`. Nothing is recorded for the column that overflowed.
    pub async fn record_key_shifts<S>(&self, source: &S, plan: &MergePlan) -> Result<usize>
    where
        S: CatalogSource + ?Sized,
    {
        let mut recorded = 0;
        for statement in &plan.statements {
            for key in &statement.shifted {
                let values = source
                    .primary_key_values(&plan.source, &statement.table, &key.column)
                    .await?;
                let shifts = values
                    .iter()
                    .map(|&value| {
                        value
                            .checked_add(key.offset)
                            .map(|shifted| (value, shifted))
                            .ok_or_else(|| MergeError::KeyShiftOverflow {
                                table: statement.table.clone(),
                                column: key.column.clone(),
                                value,
                                offset: key.offset,
                            })
                    })
                    .collect::<Result<Vec<_>>>()?;
                for (old, new) in shifts {
                    self.remapper
                        .set_mapping(&statement.table, &key.column, old, new);
                }
                debug!(
                    table = %statement.table,
                    column = %key.column,
                    values = values.len(),
                    "Recorded key shifts"
                );
                recorded += values.len();
            }
        }
        Ok(recorded)
    }
}

/// Builds the statement for one target table, or `None` if it has no
/// offsettable primary key.
fn plan_table(
    source_db: &str,
    target_db: &str,
    table: &Table,
) -> Result<Option<MigrationStatement>> {
    let (keys, rest): (Vec<&Column>, Vec<&Column>) = table
        .columns
        .values()
        .partition(|column| column.is_offsettable_primary_key());

    let shifted: Vec<ShiftedKey> = keys
        .iter()
        .filter_map(|column| {
            column.auto_increment_offset.map(|offset| ShiftedKey {
                column: column.name.clone(),
                offset,
            })
        })
        .collect();
    if shifted.is_empty() {
        return Ok(None);
    }
    let copied: Vec<String> = rest.iter().map(|column| column.name.clone()).collect();

    let mut builder = InsertSelect::new()
        .into_table(target_db, &table.name)
        .from_table(source_db, &table.name);
    for key in &shifted {
        builder = builder.shifted_column(&key.column, key.offset);
    }
    for column in &copied {
        builder = builder.column(column);
    }

    Ok(Some(MigrationStatement {
        table: table.name.clone(),
        sql: builder.build()?,
        shifted,
        copied,
    }))
}
