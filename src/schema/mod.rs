//! Column order catalog built from the CREATE TABLE statements of a dump.
//!
//! mysqldump writes `INSERT INTO t VALUES (...)` without a column list by
//! default, so masking a configured table needs the column order declared by
//! its CREATE TABLE, which always precedes the data in the stream.

pub mod ddl;

use ahash::AHashMap;

#[derive(Debug, Default)]
pub struct ColumnCatalog {
    tables: AHashMap<String, Vec<String>>,
}

impl ColumnCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the columns of a complete CREATE TABLE statement.
    ///
    /// Returns the table name when the statement could be understood. A later
    /// definition of the same table replaces the earlier one.
    pub fn record_create_table(&mut self, stmt: &str) -> Option<String> {
        let (table, columns) = ddl::parse_create_table(stmt)?;
        self.tables.insert(table.clone(), columns);
        Some(table)
    }

    pub fn insert(&mut self, table: impl Into<String>, columns: Vec<String>) {
        self.tables.insert(table.into(), columns);
    }

    pub fn columns(&self, table: &str) -> Option<&[String]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
