//! Schema introspection and per-table column descriptors.
//!
//! # Responsibility
//! - Answer "does table T have column C" for the batch updater.
//! - Snapshot a table's columns once so services do not re-query the
//!   catalog on every call.
//!
//! # Invariants
//! - A `TableSchema` is never empty; a table without columns does not exist.

use crate::db::DbResult;
use crate::error::{KitError, KitResult};
use crate::sql;
use rusqlite::Connection;
use std::collections::BTreeSet;

/// Source of table column metadata.
pub trait SchemaIntrospector {
    /// Returns column names in declaration order; empty for unknown tables.
    fn columns(&self, table: &str) -> DbResult<Vec<String>>;

    fn has_column(&self, table: &str, column: &str) -> DbResult<bool> {
        Ok(self.columns(table)?.iter().any(|name| name == column))
    }
}

impl SchemaIntrospector for Connection {
    fn columns(&self, table: &str) -> DbResult<Vec<String>> {
        let mut stmt = self.prepare("SELECT name FROM pragma_table_info(?1);")?;
        let mut rows = stmt.query([table])?;
        let mut columns = Vec::new();
        while let Some(row) = rows.next()? {
            columns.push(row.get(0)?);
        }
        Ok(columns)
    }
}

/// Column snapshot of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    table: String,
    columns: BTreeSet<String>,
}

impl TableSchema {
    /// Loads the columns of `table`, failing when it does not exist.
    pub fn load(introspector: &dyn SchemaIntrospector, table: &str) -> KitResult<Self> {
        sql::identifier(table)?;
        let columns = introspector.columns(table)?;
        if columns.is_empty() {
            return Err(KitError::MissingTable(table.to_string()));
        }
        Ok(Self {
            table: table.to_string(),
            columns: columns.into_iter().collect(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// Fails with `MissingColumn` unless `column` exists.
    pub fn require(&self, column: &str) -> KitResult<()> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(KitError::MissingColumn {
                table: self.table.clone(),
                column: column.to_string(),
            })
        }
    }
}
