//! Multi-row conditional update in a single statement.
//!
//! # Responsibility
//! - Turn N rows with differing values into one
//!   `UPDATE .. SET col = CASE WHEN ref = x THEN v .. ELSE col END WHERE ref IN (..)`.
//! - Execute it and report success as a boolean.
//!
//! # Invariants
//! - The reference column is `id` when the first row carries a non-null
//!   `id`, otherwise the first column of the first row.
//! - `ELSE <col>` keeps the stored value for rows outside the batch.
//! - Identifiers are validated; values are rendered as escaped literals.
//! - Empty input never reaches the database.

use crate::error::{KitError, KitResult};
use crate::logging::sql_summary;
use crate::model::value::{Row, Value};
use crate::schema::SchemaIntrospector;
use crate::sql;
use log::{info, warn};
use rusqlite::Connection;
use std::time::Instant;

const DEFAULT_REFERENCE_COLUMN: &str = "id";

/// A built, not yet executed batch update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchUpdateStatement {
    pub sql: String,
    pub reference_column: String,
    /// Number of reference values in the `IN` list.
    pub row_count: usize,
}

/// Builds the single-statement batch update for `rows` on `table`.
pub fn build_batch_update(table: &str, rows: &[Row]) -> KitResult<BatchUpdateStatement> {
    let first = rows.first().ok_or(KitError::EmptyInput)?;
    let table = sql::identifier(table)?;
    let reference = reference_column(first).ok_or(KitError::EmptyInput)?;
    let reference = sql::identifier(reference)?;

    let update_columns = first
        .keys()
        .filter(|column| *column != reference)
        .map(sql::identifier)
        .collect::<KitResult<Vec<_>>>()?;
    if update_columns.is_empty() {
        return Err(KitError::NothingToUpdate);
    }

    let mut reference_values = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        match row.get(reference) {
            Some(value) if *value != Value::Null => reference_values.push(sql::literal(value)),
            _ => {
                return Err(KitError::IncompleteRow {
                    index,
                    column: reference.to_string(),
                })
            }
        }
    }

    let mut assignments = Vec::with_capacity(update_columns.len());
    for column in &update_columns {
        let mut expr = format!("{column} = CASE");
        for (index, row) in rows.iter().enumerate() {
            let value = row.get(column).ok_or_else(|| KitError::IncompleteRow {
                index,
                column: (*column).to_string(),
            })?;
            expr.push_str(&format!(
                " WHEN {reference} = {} THEN {}",
                reference_values[index],
                sql::literal(value)
            ));
        }
        expr.push_str(&format!(" ELSE {column} END"));
        assignments.push(expr);
    }

    let sql = format!(
        "UPDATE {table} SET {} WHERE {reference} IN ({})",
        assignments.join(", "),
        reference_values.join(", ")
    );

    Ok(BatchUpdateStatement {
        sql,
        reference_column: reference.to_string(),
        row_count: reference_values.len(),
    })
}

fn reference_column(first: &Row) -> Option<&str> {
    match first.get(DEFAULT_REFERENCE_COLUMN) {
        Some(value) if *value != Value::Null => Some(DEFAULT_REFERENCE_COLUMN),
        _ => first.first_key(),
    }
}

/// Executes batch updates on one borrowed connection.
pub struct BatchUpdater<'conn> {
    conn: &'conn Connection,
}

impl<'conn> BatchUpdater<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Updates `rows` on `table` after checking the reference column exists.
    ///
    /// Returns `false` on any failure, including zero affected rows.
    pub fn update_all_batch_by_table(&self, table: &str, rows: &[Row]) -> bool {
        report(table, self.try_update_all_batch_by_table(table, rows))
    }

    /// Schema-checked variant returning the affected row count.
    pub fn try_update_all_batch_by_table(&self, table: &str, rows: &[Row]) -> KitResult<usize> {
        let statement = build_batch_update(table, rows)?;
        if !self.conn.has_column(table, &statement.reference_column)? {
            return Err(KitError::MissingColumn {
                table: table.to_string(),
                column: statement.reference_column,
            });
        }
        self.execute(&statement)
    }

    /// Updates `rows` on `table` without the reference column check.
    ///
    /// Used by entity-bound callers; the table comes from the entity
    /// definition, so no column lookup is made.
    pub fn update_all_unchecked(&self, table: &str, rows: &[Row]) -> bool {
        let outcome = build_batch_update(table, rows).and_then(|stmt| self.execute(&stmt));
        report(table, outcome)
    }

    fn execute(&self, statement: &BatchUpdateStatement) -> KitResult<usize> {
        let started_at = Instant::now();
        let affected = self.conn.execute(&statement.sql, [])?;
        info!(
            "event=batch_update module=batch status=ok rows={} affected={} duration_ms={}",
            statement.row_count,
            affected,
            started_at.elapsed().as_millis()
        );
        log::debug!(
            "event=batch_update module=batch sql={}",
            sql_summary(&statement.sql)
        );
        Ok(affected)
    }
}

fn report(table: &str, outcome: KitResult<usize>) -> bool {
    match outcome {
        Ok(affected) => affected > 0,
        Err(err) => {
            warn!(
                "event=batch_update module=batch status=error table={} error={}",
                table, err
            );
            false
        }
    }
}
