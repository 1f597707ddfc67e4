//! Composes `SearchParams` and relation directives into one `SELECT`.
//!
//! # Invariants
//! - Relation existence clauses precede field filters in the `WHERE` list.
//! - A field in no rule is filtered only when it is a table column and its
//!   value is not blank; `0` is not blank.
//! - Bind values appear in the same order as their `WHERE` placeholders.

use crate::config::KitConfig;
use crate::error::{KitError, KitResult, QueryStage};
use crate::model::entity::{EntityDef, Relation, SearchMode};
use crate::model::value::{ParamValue, Value};
use crate::query::params::{CompareOp, Condition, SearchParams};
use crate::query::relation::RelationDirectives;
use crate::schema::TableSchema;
use crate::sql;

const RELATED_ALIAS: &str = "rel";

/// Everything the builder needs to know about the target entity.
#[derive(Debug, Clone, Copy)]
pub struct QueryContext<'a> {
    pub entity: &'a EntityDef,
    pub schema: &'a TableSchema,
    pub config: &'a KitConfig,
}

/// A composed, parameterized select.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    table: String,
    columns: Vec<String>,
    wheres: Vec<String>,
    binds: Vec<Value>,
    orders: Vec<String>,
}

impl SelectQuery {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Self::default()
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn wheres(&self) -> &[String] {
        &self.wheres
    }

    pub fn binds(&self) -> &[Value] {
        &self.binds
    }

    pub fn orders(&self) -> &[String] {
        &self.orders
    }

    pub fn sql(&self) -> String {
        let mut sql = format!("SELECT {} FROM {}", self.columns.join(", "), self.table);
        self.push_where_clause(&mut sql);
        if !self.orders.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.orders.join(", "));
        }
        sql
    }

    /// Row count under the same filters, ignoring projection and order.
    pub fn count_sql(&self) -> String {
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.table);
        self.push_where_clause(&mut sql);
        sql
    }

    fn push_where_clause(&self, sql: &mut String) {
        if !self.wheres.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.wheres.join(" AND "));
        }
    }

    fn push_where(&mut self, clause: String, binds: impl IntoIterator<Item = Value>) {
        self.wheres.push(clause);
        self.binds.extend(binds);
    }
}

/// Builds the select for `params` and `relations` against `ctx`.
///
/// # Errors
/// - `QueryBuild` naming the failing stage and carrying the cause.
pub fn build_select(
    ctx: &QueryContext<'_>,
    params: &SearchParams,
    relations: &RelationDirectives,
) -> KitResult<SelectQuery> {
    let mut query = SelectQuery::new(ctx.schema.table());

    let count_columns = apply_relations(ctx, &mut query, relations)
        .map_err(|err| KitError::query_build(QueryStage::Relations, &err))?;

    apply_scope(ctx, &mut query)
        .and_then(|()| apply_filters(ctx, &mut query, params))
        .and_then(|()| apply_directives(&mut query, params))
        .and_then(|()| apply_order(ctx, &mut query, params))
        .and_then(|()| apply_projection(&mut query, params, count_columns))
        .map_err(|err| KitError::query_build(QueryStage::Filters, &err))?;

    Ok(query)
}

fn apply_relations(
    ctx: &QueryContext<'_>,
    query: &mut SelectQuery,
    relations: &RelationDirectives,
) -> KitResult<Vec<String>> {
    for name in &relations.with {
        find_relation(ctx, name)?;
    }

    let mut count_columns = Vec::with_capacity(relations.with_count.len());
    for name in &relations.with_count {
        let alias = format!("{}_count", sql::identifier(name)?);
        let subquery = relation_subquery(ctx, name, "COUNT(*)", &[], &mut Vec::new())?;
        count_columns.push(format!("({subquery}) AS {alias}"));
    }

    for directive in &relations.has {
        let mut binds = Vec::new();
        let clause = match directive.count {
            Some((op, count)) => {
                let subquery = relation_subquery(ctx, &directive.relation, "COUNT(*)", &[], &mut binds)?;
                binds.push(Value::Integer(count));
                format!("({subquery}) {} ?", op.as_sql())
            }
            None => {
                let subquery = relation_subquery(ctx, &directive.relation, "1", &[], &mut binds)?;
                format!("EXISTS ({subquery})")
            }
        };
        query.push_where(clause, binds);
    }

    for filter in &relations.where_has {
        let mut binds = Vec::new();
        let subquery = relation_subquery(ctx, &filter.relation, "1", &filter.conditions, &mut binds)?;
        query.push_where(format!("EXISTS ({subquery})"), binds);
    }

    for name in &relations.doesnt_have {
        let subquery = relation_subquery(ctx, name, "1", &[], &mut Vec::new())?;
        query.push_where(format!("NOT EXISTS ({subquery})"), Vec::new());
    }

    for filter in &relations.where_doesnt_have {
        let mut binds = Vec::new();
        let subquery = relation_subquery(ctx, &filter.relation, "1", &filter.conditions, &mut binds)?;
        query.push_where(format!("NOT EXISTS ({subquery})"), binds);
    }

    Ok(count_columns)
}

fn find_relation<'a>(
    ctx: &QueryContext<'a>,
    name: &str,
) -> KitResult<&'a Relation> {
    ctx.entity
        .find_relation(name)
        .ok_or_else(|| KitError::UnknownRelation {
            entity: ctx.entity.name.clone(),
            relation: name.to_string(),
        })
}

fn relation_subquery(
    ctx: &QueryContext<'_>,
    name: &str,
    projection: &str,
    conditions: &[Condition],
    binds: &mut Vec<Value>,
) -> KitResult<String> {
    let relation = find_relation(ctx, name)?;
    let related_table = ctx.config.table_name(&relation.related_table);
    let mut subquery = format!(
        "SELECT {projection} FROM {} AS {RELATED_ALIAS} WHERE {RELATED_ALIAS}.{} = {}",
        sql::identifier(&related_table)?,
        sql::identifier(&relation.related_column)?,
        qualify(ctx.schema.table(), &relation.local_column)?
    );
    for condition in conditions {
        subquery.push_str(" AND ");
        subquery.push_str(&condition_sql(RELATED_ALIAS, condition, binds)?);
    }
    Ok(subquery)
}

fn apply_scope(ctx: &QueryContext<'_>, query: &mut SelectQuery) -> KitResult<()> {
    if !ctx.entity.active_only {
        return Ok(());
    }
    let sentinels = ctx
        .entity
        .status
        .as_ref()
        .ok_or_else(|| KitError::MissingConstant {
            entity: ctx.entity.name.clone(),
            constant: "on",
        })?;
    let column = status_column(ctx);
    ctx.schema.require(column)?;
    let clause = format!("{} = ?", qualify(&query.table, column)?);
    query.push_where(clause, [sentinels.on.clone()]);
    Ok(())
}

/// Status column of the entity, falling back to the configured default.
pub fn status_column<'a>(ctx: &QueryContext<'a>) -> &'a str {
    ctx.entity
        .status_column
        .as_deref()
        .unwrap_or(ctx.config.columns.status.as_str())
}

fn apply_filters(
    ctx: &QueryContext<'_>,
    query: &mut SelectQuery,
    params: &SearchParams,
) -> KitResult<()> {
    let table = query.table.clone();
    for (key, value) in params.filters.iter() {
        let pass_through = ctx.entity.rules.is_pass_through(key);
        match ctx.entity.rules.mode_for(key) {
            None => {
                if pass_through || (!value.is_blank() && ctx.schema.has_column(key)) {
                    push_equals(query, &table, key, value)?;
                }
            }
            Some(_) if value.is_falsy() && !pass_through => {}
            Some(mode) => {
                ctx.schema.require(key)?;
                match mode {
                    SearchMode::Equals => push_equals(query, &table, key, value)?,
                    SearchMode::Like => {
                        let needle = scalar(key, value)?.to_string();
                        let clause = format!("{} LIKE ? ESCAPE '\\'", qualify(&table, key)?);
                        let pattern = format!("%{}%", sql::escape_like(&needle));
                        query.push_where(clause, [Value::Text(pattern)]);
                    }
                    SearchMode::In => push_in(query, &qualify(&table, key)?, value.to_list()),
                }
            }
        }
    }
    Ok(())
}

fn apply_directives(query: &mut SelectQuery, params: &SearchParams) -> KitResult<()> {
    let table = query.table.clone();
    for condition in &params.where_custom {
        let mut binds = Vec::new();
        let clause = condition_sql(&table, condition, &mut binds)?;
        query.push_where(clause, binds);
    }
    for (column, values) in &params.where_custom_in {
        push_in(query, &qualify(&table, column)?, values.clone());
    }
    for fragment in &params.where_raw {
        if !fragment.trim().is_empty() {
            query.push_where(format!("({fragment})"), Vec::new());
        }
    }
    Ok(())
}

fn apply_order(
    ctx: &QueryContext<'_>,
    query: &mut SelectQuery,
    params: &SearchParams,
) -> KitResult<()> {
    if !params.order.is_empty() {
        for (field, direction) in &params.order {
            let field = sql::identifier(field)?;
            query.orders.push(format!("{field} {}", direction.as_sql()));
        }
        return Ok(());
    }

    let sort = ctx.config.columns.sort.as_str();
    let primary_key = ctx.entity.primary_key.as_str();
    if ctx.schema.has_column(sort) {
        query.orders.push(format!("{} DESC", sql::identifier(sort)?));
    }
    if ctx.schema.has_column(primary_key) {
        query
            .orders
            .push(format!("{} DESC", sql::identifier(primary_key)?));
    }
    Ok(())
}

fn apply_projection(
    query: &mut SelectQuery,
    params: &SearchParams,
    count_columns: Vec<String>,
) -> KitResult<()> {
    let table = query.table.clone();
    for column in &params.select {
        query.columns.push(qualify(&table, column)?);
    }
    if let Some(expression) = params.select_raw.as_deref() {
        if !expression.trim().is_empty() {
            query.columns.push(expression.to_string());
        }
    }
    if query.columns.is_empty() {
        query.columns.push(format!("{table}.*"));
    }
    query.columns.extend(count_columns);
    Ok(())
}

fn push_equals(
    query: &mut SelectQuery,
    table: &str,
    key: &str,
    value: &ParamValue,
) -> KitResult<()> {
    let column = qualify(table, key)?;
    match scalar(key, value)? {
        Value::Null => query.push_where(format!("{column} IS NULL"), Vec::new()),
        other => query.push_where(format!("{column} = ?"), [other.clone()]),
    }
    Ok(())
}

fn push_in(query: &mut SelectQuery, column: &str, values: Vec<Value>) {
    if values.is_empty() {
        query.push_where("0 = 1".to_string(), Vec::new());
        return;
    }
    let clause = format!("{column} IN ({})", sql::placeholders(values.len()));
    query.push_where(clause, values);
}

fn condition_sql(table: &str, condition: &Condition, binds: &mut Vec<Value>) -> KitResult<String> {
    let column = qualify(table, &condition.column)?;
    let clause = match (condition.op, &condition.value) {
        (CompareOp::Eq, Value::Null) => format!("{column} IS NULL"),
        (CompareOp::Ne, Value::Null) => format!("{column} IS NOT NULL"),
        (op, value) => {
            binds.push(value.clone());
            format!("{column} {} ?", op.as_sql())
        }
    };
    Ok(clause)
}

fn scalar<'v>(key: &str, value: &'v ParamValue) -> KitResult<&'v Value> {
    match value {
        ParamValue::Scalar(value) => Ok(value),
        ParamValue::List(_) => Err(KitError::NonScalarField(key.to_string())),
    }
}

fn qualify(table: &str, column: &str) -> KitResult<String> {
    let column = sql::identifier(column)?;
    if column.contains('.') {
        Ok(column.to_string())
    } else {
        Ok(format!("{table}.{column}"))
    }
}
