//! Model repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide search, lookup and single-row write primitives for one entity.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - The table schema is snapshotted once at construction.
//! - Entities with an active-only scope must declare status sentinels and
//!   carry the status column.
//! - The active-only scope restricts searches, not primary key lookups.

use crate::batch::BatchUpdater;
use crate::config::KitConfig;
use crate::error::{KitError, KitResult};
use crate::logging::sql_summary;
use crate::model::entity::{EntityDef, RelationKind};
use crate::model::value::{row_from_sqlite, Record, Row, Value};
use crate::query::builder::{build_select, QueryContext, SelectQuery};
use crate::query::page::{Page, ResultShape, SearchOutput};
use crate::query::params::SearchParams;
use crate::query::relation::RelationDirectives;
use crate::schema::TableSchema;
use crate::sql;
use log::debug;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use std::collections::HashMap;

/// Persistence primitives used by [`crate::service::model_service::ModelService`].
pub trait ModelRepository {
    fn entity(&self) -> &EntityDef;
    fn schema(&self) -> &TableSchema;
    fn config(&self) -> &KitConfig;

    /// Loads one record by primary key.
    fn find(&self, id: &Value) -> KitResult<Option<Record>>;
    /// Returns the first record matching `params`.
    fn find_by_field(
        &self,
        params: &SearchParams,
        relations: &RelationDirectives,
    ) -> KitResult<Option<Record>>;
    fn search(
        &self,
        params: &SearchParams,
        relations: &RelationDirectives,
        shape: ResultShape,
    ) -> KitResult<SearchOutput>;

    /// Inserts `row` and returns its primary key value.
    fn insert(&self, row: &Row) -> KitResult<Value>;
    /// Updates columns of one row; returns affected row count.
    fn update(&self, id: &Value, row: &Row) -> KitResult<usize>;
    fn delete(&self, id: &Value) -> KitResult<usize>;

    /// `MAX(column)`, `0` for empty tables or non-numeric values.
    fn max_value(&self, column: &str) -> KitResult<i64>;
    /// Whether `id` exists; soft-deleted rows count only when asked.
    fn exists(&self, id: &Value, include_soft_deleted: bool) -> KitResult<bool>;
    /// Rows other than `excluding` whose `column` equals `value`.
    fn count_duplicates(&self, column: &str, value: &Value, excluding: &Value) -> KitResult<u64>;
    /// Batch update on the entity table without a reference column check.
    fn update_batch(&self, rows: &[Row]) -> bool;
}

/// SQLite-backed model repository.
pub struct SqliteModelRepository<'conn> {
    conn: &'conn Connection,
    entity: EntityDef,
    schema: TableSchema,
    config: KitConfig,
}

impl<'conn> SqliteModelRepository<'conn> {
    /// Binds `entity` to its table on a migrated connection.
    ///
    /// # Errors
    /// - `MissingTable` / `MissingColumn` when the table or its primary key
    ///   (or the status column of an active-only entity) is absent.
    /// - `MissingConstant` when an active-only entity lacks sentinels.
    pub fn try_new(conn: &'conn Connection, entity: EntityDef, config: KitConfig) -> KitResult<Self> {
        sql::identifier(&entity.primary_key)?;
        let table = config.table_name(&entity.table);
        let schema = TableSchema::load(conn, &table)?;
        schema.require(&entity.primary_key)?;

        if entity.active_only {
            if entity.status.is_none() {
                return Err(KitError::MissingConstant {
                    entity: entity.name.clone(),
                    constant: "on",
                });
            }
            let column = entity
                .status_column
                .as_deref()
                .unwrap_or(config.columns.status.as_str());
            schema.require(column)?;
        }

        debug!(
            "event=repo_open module=repo status=ok entity={} table={}",
            entity.name, table
        );
        Ok(Self {
            conn,
            entity,
            schema,
            config,
        })
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    fn context(&self) -> QueryContext<'_> {
        QueryContext {
            entity: &self.entity,
            schema: &self.schema,
            config: &self.config,
        }
    }

    fn table(&self) -> &str {
        self.schema.table()
    }

    fn build(&self, params: &SearchParams, relations: &RelationDirectives) -> KitResult<SelectQuery> {
        let query = build_select(&self.context(), params, relations)?;
        debug!(
            "event=query_build module=repo status=ok entity={} sql={}",
            self.entity.name,
            sql_summary(&query.sql())
        );
        Ok(query)
    }

    fn fetch(&self, sql: &str, binds: &[Value]) -> KitResult<Vec<Row>> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(row_from_sqlite(row, &columns)?);
        }
        Ok(out)
    }

    fn load_records(&self, rows: Vec<Row>, relations: &RelationDirectives) -> KitResult<Vec<Record>> {
        let mut records = rows.into_iter().map(Record::new).collect::<Vec<_>>();
        for name in &relations.with {
            self.eager_load(&mut records, name)?;
        }
        Ok(records)
    }

    fn eager_load(&self, records: &mut [Record], name: &str) -> KitResult<()> {
        let relation = self
            .entity
            .find_relation(name)
            .ok_or_else(|| KitError::UnknownRelation {
                entity: self.entity.name.clone(),
                relation: name.to_string(),
            })?;

        let mut seen = HashMap::new();
        for record in records.iter() {
            if let Some(value) = record.get(&relation.local_column) {
                if let Some(key) = relation_key(value) {
                    seen.entry(key).or_insert_with(|| value.clone());
                }
            }
        }

        let mut grouped: HashMap<String, Vec<Row>> = HashMap::new();
        if !seen.is_empty() {
            let keys = seen.into_values().collect::<Vec<_>>();
            let related_table = self.config.table_name(&relation.related_table);
            let related_column = sql::identifier(&relation.related_column)?;
            let sql = format!(
                "SELECT * FROM {} WHERE {related_column} IN ({})",
                sql::identifier(&related_table)?,
                sql::placeholders(keys.len())
            );
            for row in self.fetch(&sql, &keys)? {
                if let Some(key) = row.get(related_column).and_then(relation_key) {
                    grouped.entry(key).or_default().push(row);
                }
            }
        }

        for record in records.iter_mut() {
            let mut related = record
                .get(&relation.local_column)
                .and_then(relation_key)
                .and_then(|key| grouped.get(&key))
                .cloned()
                .unwrap_or_default();
            if relation.kind == RelationKind::BelongsTo {
                related.truncate(1);
            }
            record.relations.insert(name.to_string(), related);
        }
        Ok(())
    }

    fn paginate(
        &self,
        query: &SelectQuery,
        params: &SearchParams,
        relations: &RelationDirectives,
    ) -> KitResult<Page> {
        let per_page = params
            .limit
            .filter(|limit| *limit > 0)
            .unwrap_or(self.config.default_page_size);
        let current_page = params.page.filter(|page| *page > 0).unwrap_or(1);

        let total: i64 = self.conn.query_row(
            &query.count_sql(),
            params_from_iter(query.binds()),
            |row| row.get(0),
        )?;

        let mut binds = query.binds().to_vec();
        binds.push(Value::Integer(i64::from(per_page)));
        binds.push(Value::Integer(
            i64::from(current_page - 1) * i64::from(per_page),
        ));
        let rows = self.fetch(&format!("{} LIMIT ? OFFSET ?", query.sql()), &binds)?;
        let records = self.load_records(rows, relations)?;

        Ok(Page::new(
            records,
            u64::try_from(total).unwrap_or(0),
            per_page,
            current_page,
            params.clone(),
        ))
    }
}

impl ModelRepository for SqliteModelRepository<'_> {
    fn entity(&self) -> &EntityDef {
        &self.entity
    }

    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn config(&self) -> &KitConfig {
        &self.config
    }

    fn find(&self, id: &Value) -> KitResult<Option<Record>> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?1 LIMIT 1",
            self.table(),
            self.entity.primary_key
        );
        let row = self.fetch(&sql, std::slice::from_ref(id))?.into_iter().next();
        Ok(row.map(Record::new))
    }

    fn find_by_field(
        &self,
        params: &SearchParams,
        relations: &RelationDirectives,
    ) -> KitResult<Option<Record>> {
        let query = self.build(params, relations)?;
        let rows = self.fetch(&format!("{} LIMIT 1", query.sql()), query.binds())?;
        Ok(self.load_records(rows, relations)?.into_iter().next())
    }

    fn search(
        &self,
        params: &SearchParams,
        relations: &RelationDirectives,
        shape: ResultShape,
    ) -> KitResult<SearchOutput> {
        let query = self.build(params, relations)?;
        match shape {
            ResultShape::Paginated => Ok(SearchOutput::Page(self.paginate(&query, params, relations)?)),
            ResultShape::All => {
                let rows = self.fetch(&query.sql(), query.binds())?;
                Ok(SearchOutput::Collection(self.load_records(rows, relations)?))
            }
        }
    }

    fn insert(&self, row: &Row) -> KitResult<Value> {
        let sql = if row.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", self.table())
        } else {
            let columns = row
                .keys()
                .map(sql::identifier)
                .collect::<KitResult<Vec<_>>>()?;
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.table(),
                columns.join(", "),
                sql::placeholders(columns.len())
            )
        };
        self.conn
            .execute(&sql, params_from_iter(row.iter().map(|(_, value)| value)))?;

        match row.get(&self.entity.primary_key) {
            Some(value) if *value != Value::Null => Ok(value.clone()),
            _ => Ok(Value::Integer(self.conn.last_insert_rowid())),
        }
    }

    fn update(&self, id: &Value, row: &Row) -> KitResult<usize> {
        if row.is_empty() {
            return Ok(0);
        }
        let assignments = row
            .keys()
            .map(|column| sql::identifier(column).map(|column| format!("{column} = ?")))
            .collect::<KitResult<Vec<_>>>()?;
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            self.table(),
            assignments.join(", "),
            self.entity.primary_key
        );
        let binds = row
            .iter()
            .map(|(_, value)| value)
            .chain(std::iter::once(id));
        Ok(self.conn.execute(&sql, params_from_iter(binds))?)
    }

    fn delete(&self, id: &Value) -> KitResult<usize> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1",
            self.table(),
            self.entity.primary_key
        );
        Ok(self.conn.execute(&sql, [id])?)
    }

    fn max_value(&self, column: &str) -> KitResult<i64> {
        let sql = format!("SELECT MAX({}) FROM {}", sql::identifier(column)?, self.table());
        let max: Value = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(max.as_i64().unwrap_or(0))
    }

    fn exists(&self, id: &Value, include_soft_deleted: bool) -> KitResult<bool> {
        let mut sql = format!(
            "SELECT 1 FROM {} WHERE {} = ?1",
            self.table(),
            self.entity.primary_key
        );
        let deleted_at = self.config.columns.deleted_at.as_str();
        if !include_soft_deleted && self.schema.has_column(deleted_at) {
            sql.push_str(&format!(" AND {deleted_at} IS NULL"));
        }
        let found: Option<i64> = self
            .conn
            .query_row(&format!("{sql} LIMIT 1"), [id], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    fn count_duplicates(&self, column: &str, value: &Value, excluding: &Value) -> KitResult<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} <> ?1 AND {} = ?2",
            self.table(),
            self.entity.primary_key,
            sql::identifier(column)?
        );
        let count: i64 = self
            .conn
            .query_row(&sql, [excluding, value], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn update_batch(&self, rows: &[Row]) -> bool {
        BatchUpdater::new(self.conn).update_all_unchecked(self.table(), rows)
    }
}

/// Grouping key for eager loading; `1` and `'1'` share a key, `NULL` has none.
fn relation_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
