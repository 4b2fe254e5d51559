//! Identifier quoting and the INSERT ... SELECT builder.
//!
//! Table and column names come from introspection results, which are not
//! guaranteed to be trusted. Identifiers cannot be bound as parameters, so
//! every name that ends up in generated SQL goes through [`quote_ident`].

use crate::error::{MergeError, Result};

/// Longest identifier MySQL accepts.
const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Rejects identifiers that cannot be quoted safely.
///
/// # Errors
///
/// Returns [`MergeError::InvalidIdentifier`] for empty names, names
/// containing a NUL byte, and names longer than MySQL allows.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MergeError::InvalidIdentifier(
            "identifier cannot be empty".to_string(),
        ));
    }
    if name.contains('\0') {
        return Err(MergeError::InvalidIdentifier(format!(
            "identifier contains a NUL byte: {name:?}"
        )));
    }
    if name.chars().count() > MAX_IDENTIFIER_LENGTH {
        return Err(MergeError::InvalidIdentifier(format!(
            "identifier exceeds {MAX_IDENTIFIER_LENGTH} characters: {name:?}"
        )));
    }
    Ok(())
}

/// Quotes a MySQL identifier with backticks, doubling inner backticks.
///
/// # Errors
///
/// See [`validate_identifier`].
pub fn quote_ident(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("`{}`", name.replace('`', "``")))
}

/// Quotes `database.table`.
///
/// # Errors
///
/// See [`validate_identifier`].
pub fn qualify(database: &str, table: &str) -> Result<String> {
    Ok(format!("{}.{}", quote_ident(database)?, quote_ident(table)?))
}

/// One entry of the SELECT list.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Projection {
    Plain(String),
    Shifted(String, i64),
}

impl Projection {
    fn column(&self) -> &str {
        match self {
            Self::Plain(column) | Self::Shifted(column, _) => column,
        }
    }
}

/// Builder for `INSERT INTO target (cols) SELECT exprs FROM source`.
///
/// Every projected column is inserted into the column of the same name, so
/// the insert list and the select list always line up.
#[derive(Debug, Clone, Default)]
pub struct InsertSelect {
    target: Option<(String, String)>,
    source: Option<(String, String)>,
    projections: Vec<Projection>,
}

impl InsertSelect {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the table rows are inserted into.
    #[must_use]
    pub fn into_table(mut self, database: &str, table: &str) -> Self {
        self.target = Some((database.to_string(), table.to_string()));
        self
    }

    /// Sets the table rows are selected from.
    #[must_use]
    pub fn from_table(mut self, database: &str, table: &str) -> Self {
        self.source = Some((database.to_string(), table.to_string()));
        self
    }

    /// Copies a column unchanged.
    #[must_use]
    pub fn column(mut self, name: &str) -> Self {
        self.projections.push(Projection::Plain(name.to_string()));
        self
    }

    /// Copies a column shifted by `offset`.
    #[must_use]
    pub fn shifted_column(mut self, name: &str, offset: i64) -> Self {
        self.projections
            .push(Projection::Shifted(name.to_string(), offset));
        self
    }

    /// Renders the statement.
    ///
    /// # Errors
    ///
    /// Fails with [`MergeError::IncompleteStatement`] if either table is
    /// missing or no column was projected, and with
    /// [`MergeError::InvalidIdentifier`] if a name cannot be quoted.
    pub fn build(&self) -> Result<String> {
        let (target_db, target_table) = self.target.as_ref().ok_or_else(|| {
            MergeError::IncompleteStatement("INSERT ... SELECT has no target table".to_string())
        })?;
        let (source_db, source_table) = self.source.as_ref().ok_or_else(|| {
            MergeError::IncompleteStatement("INSERT ... SELECT has no source table".to_string())
        })?;
        if self.projections.is_empty() {
            return Err(MergeError::IncompleteStatement(format!(
                "INSERT ... SELECT into {target_table} has no columns"
            )));
        }

        let mut columns = Vec::with_capacity(self.projections.len());
        let mut select = Vec::with_capacity(self.projections.len());
        for projection in &self.projections {
            let quoted = quote_ident(projection.column())?;
            select.push(match projection {
                Projection::Plain(_) => quoted.clone(),
                Projection::Shifted(_, offset) => format!("{quoted} + {offset}"),
            });
            columns.push(quoted);
        }

        Ok(format!(
            "INSERT INTO {} ({}) SELECT {} FROM {}",
            qualify(target_db, target_table)?,
            columns.join(", "),
            select.join(", "),
            qualify(source_db, source_table)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("users").unwrap(), "`users`");
        assert_eq!(quote_ident("we`ird").unwrap(), "`we``ird`");
        assert_eq!(qualify("shop", "orders").unwrap(), "`shop`.`orders`");
    }

    #[test]
    fn test_quote_ident_rejects_bad_names() {
        assert!(matches!(
            quote_ident(""),
            Err(MergeError::InvalidIdentifier(_))
        ));
        assert!(quote_ident("a\0b").is_err());
        assert!(quote_ident(&"x".repeat(65)).is_err());
        assert!(quote_ident(&"x".repeat(64)).is_ok());
    }

    #[test]
    fn test_build_insert_select() {
        let sql = InsertSelect::new()
            .into_table("target", "orders")
            .from_table("source", "orders")
            .shifted_column("id", 500)
            .column("total")
            .build()
            .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO `target`.`orders` (`id`, `total`) SELECT `id` + 500, `total` FROM `source`.`orders`"
        );
    }

    #[test]
    fn test_build_requires_tables_and_columns() {
        assert!(matches!(
            InsertSelect::new().from_table("s", "t").column("a").build(),
            Err(MergeError::IncompleteStatement(_))
        ));
        assert!(matches!(
            InsertSelect::new().into_table("t", "t").column("a").build(),
            Err(MergeError::IncompleteStatement(_))
        ));
        assert!(matches!(
            InsertSelect::new()
                .into_table("t", "t")
                .from_table("s", "t")
                .build(),
            Err(MergeError::IncompleteStatement(_))
        ));
        assert!(matches!(
            InsertSelect::new()
                .into_table("t", "")
                .from_table("s", "t")
                .column("a")
                .build(),
            Err(MergeError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_injection_in_column_name_stays_quoted() {
        let sql = InsertSelect::new()
            .into_table("t", "x")
            .from_table("s", "x")
            .column("a`; DROP TABLE x; --")
            .build()
            .unwrap();
        assert!(sql.contains("`a``; DROP TABLE x; --`"));
    }
}
