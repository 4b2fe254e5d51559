//! Schema representation types.
//!
//! These types describe the structure of one database as captured by the
//! catalog. They are immutable snapshots: the comparator and the merger only
//! read them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Index kind reported in the `Key` field of `SHOW COLUMNS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum KeyKind {
    /// Column is not the first column of any index.
    #[default]
    None,
    /// Column is (part of) the primary key.
    Primary,
    /// Column is the first column of a unique index.
    Unique,
    /// Column is the first column of a non-unique index.
    Index,
}

impl KeyKind {
    /// Parses the MySQL `Key` field (`PRI`, `UNI`, `MUL` or empty).
    ///
    /// Unknown values are treated as [`KeyKind::None`].
    #[must_use]
    pub fn from_mysql(key: &str) -> Self {
        match key {
            "PRI" => Self::Primary,
            "UNI" => Self::Unique,
            "MUL" => Self::Index,
            _ => Self::None,
        }
    }

    /// Returns the MySQL spelling of this key kind.
    #[must_use]
    pub fn as_mysql(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Primary => "PRI",
            Self::Unique => "UNI",
            Self::Index => "MUL",
        }
    }
}

/// A single column as described by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Full column type, e.g. `int unsigned` or `varchar(255)`.
    pub column_type: String,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Index kind.
    pub key: KeyKind,
    /// Default value as reported by the server.
    pub default: Option<String>,
    /// Extra attributes, e.g. `auto_increment`.
    pub extra: String,
    /// Whether the column auto-increments.
    pub auto_increment: bool,
    /// The table's auto-increment high-water mark at introspection time.
    ///
    /// Only present on auto-increment primary keys.
    pub auto_increment_offset: Option<i64>,
}

impl Column {
    /// Creates a nullable, unindexed column.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            nullable: true,
            key: KeyKind::None,
            default: None,
            extra: String::new(),
            auto_increment: false,
            auto_increment_offset: None,
        }
    }

    /// Marks the column as the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.key = KeyKind::Primary;
        self.nullable = false;
        self
    }

    /// Sets the key kind.
    #[must_use]
    pub fn key(mut self, key: KeyKind) -> Self {
        self.key = key;
        self
    }

    /// Marks the column as auto-incrementing.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self.extra = "auto_increment".to_string();
        self
    }

    /// Sets NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Records the captured high-water mark.
    ///
    /// The offset is dropped unless the column is an auto-increment primary
    /// key, so a snapshot never carries an offset the merger cannot use.
    #[must_use]
    pub fn with_auto_increment_offset(mut self, offset: Option<i64>) -> Self {
        self.auto_increment_offset = if self.auto_increment && self.key == KeyKind::Primary {
            offset
        } else {
            None
        };
        self
    }

    /// Returns whether the `extra` attribute flags auto-increment.
    #[must_use]
    pub fn extra_is_auto_increment(&self) -> bool {
        self.extra
            .split_whitespace()
            .any(|attr| attr.eq_ignore_ascii_case("auto_increment"))
    }

    /// Returns whether the merger can shift this column by its offset.
    #[must_use]
    pub fn is_offsettable_primary_key(&self) -> bool {
        self.key == KeyKind::Primary && self.auto_increment && self.auto_increment_offset.is_some()
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.column_type)
    }
}

/// A table and its columns keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Columns keyed by name, sorted for deterministic iteration.
    pub columns: BTreeMap<String, Column>,
}

impl Table {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: BTreeMap::new(),
        }
    }

    /// Adds a column, replacing any column with the same name.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.add_column(column);
        self
    }

    /// Adds a column in place.
    pub fn add_column(&mut self, column: Column) {
        self.columns.insert(column.name.clone(), column);
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Table {}", self.name)?;
        for column in self.columns.values() {
            write!(f, "\n{column}")?;
        }
        Ok(())
    }
}

/// The structure of one database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Database name.
    pub name: String,
    /// Tables keyed by name, sorted for deterministic iteration.
    pub tables: BTreeMap<String, Table>,
}

impl Schema {
    /// Creates an empty schema for the named database.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: BTreeMap::new(),
        }
    }

    /// Adds a table, replacing any table with the same name.
    #[must_use]
    pub fn table(mut self, table: Table) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    /// Looks up a table by name.
    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Returns table names in iteration order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for table in self.tables.values() {
            if !first {
                writeln!(f)?;
            }
            write!(f, "{table}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_kind_from_mysql() {
        assert_eq!(KeyKind::from_mysql("PRI"), KeyKind::Primary);
        assert_eq!(KeyKind::from_mysql("UNI"), KeyKind::Unique);
        assert_eq!(KeyKind::from_mysql("MUL"), KeyKind::Index);
        assert_eq!(KeyKind::from_mysql(""), KeyKind::None);
        assert_eq!(KeyKind::from_mysql("???"), KeyKind::None);
        assert_eq!(KeyKind::Index.as_mysql(), "MUL");
    }

    #[test]
    fn test_offset_only_kept_on_auto_increment_primary_key() {
        let pk = Column::new("id", "int")
            .primary_key()
            .auto_increment()
            .with_auto_increment_offset(Some(42));
        assert_eq!(pk.auto_increment_offset, Some(42));
        assert!(pk.is_offsettable_primary_key());

        let plain_pk = Column::new("code", "char(3)")
            .primary_key()
            .with_auto_increment_offset(Some(42));
        assert_eq!(plain_pk.auto_increment_offset, None);
        assert!(!plain_pk.is_offsettable_primary_key());

        let counter = Column::new("seq", "int")
            .key(KeyKind::Unique)
            .auto_increment()
            .with_auto_increment_offset(Some(7));
        assert_eq!(counter.auto_increment_offset, None);
    }

    #[test]
    fn test_extra_is_auto_increment() {
        let mut column = Column::new("id", "int");
        assert!(!column.extra_is_auto_increment());
        column.extra = "auto_increment".to_string();
        assert!(column.extra_is_auto_increment());
        column.extra = "DEFAULT_GENERATED on update CURRENT_TIMESTAMP".to_string();
        assert!(!column.extra_is_auto_increment());
    }

    #[test]
    fn test_display() {
        let schema = Schema::new("shop")
            .table(
                Table::new("orders")
                    .column(Column::new("id", "int").primary_key())
                    .column(Column::new("total", "decimal(10,2)")),
            )
            .table(Table::new("tags").column(Column::new("label", "varchar(32)")));

        assert_eq!(
            schema.to_string(),
            "Table orders\nid int\ntotal decimal(10,2)\nTable tags\nlabel varchar(32)"
        );
    }

    #[test]
    fn test_json_roundtrip_keeps_offsets() {
        let schema = Schema::new("shop").table(
            Table::new("orders").column(
                Column::new("id", "int")
                    .primary_key()
                    .auto_increment()
                    .with_auto_increment_offset(Some(500)),
            ),
        );
        let json = serde_json::to_string(&schema).unwrap();
        let back: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
        assert_eq!(back.table_names().collect::<Vec<_>>(), vec!["orders"]);
    }
}
