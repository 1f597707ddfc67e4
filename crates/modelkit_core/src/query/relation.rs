//! Relation inclusion directives.
//!
//! Existence filters become correlated `EXISTS` subqueries on the entity
//! table; `with` requests are resolved after the main query.

use crate::query::params::{CompareOp, Condition};

/// `has` / `doesnt_have` request with an optional count constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct HasDirective {
    pub relation: String,
    pub count: Option<(CompareOp, i64)>,
}

/// `where_has` / `where_doesnt_have` request.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationFilter {
    pub relation: String,
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationDirectives {
    pub with: Vec<String>,
    pub with_count: Vec<String>,
    pub has: Vec<HasDirective>,
    pub where_has: Vec<RelationFilter>,
    pub doesnt_have: Vec<String>,
    pub where_doesnt_have: Vec<RelationFilter>,
}

impl RelationDirectives {
    pub fn new() -> Self {
        Self::default()
    }

    /// Eager-loads related rows into each record.
    pub fn with(mut self, relation: impl Into<String>) -> Self {
        self.with.push(relation.into());
        self
    }

    /// Adds a `<relation>_count` column.
    pub fn with_count(mut self, relation: impl Into<String>) -> Self {
        self.with_count.push(relation.into());
        self
    }

    pub fn has(mut self, relation: impl Into<String>) -> Self {
        self.has.push(HasDirective {
            relation: relation.into(),
            count: None,
        });
        self
    }

    /// Keeps rows whose related row count satisfies `count <op> value`.
    pub fn has_count(mut self, relation: impl Into<String>, op: CompareOp, value: i64) -> Self {
        self.has.push(HasDirective {
            relation: relation.into(),
            count: Some((op, value)),
        });
        self
    }

    pub fn where_has(mut self, relation: impl Into<String>, conditions: Vec<Condition>) -> Self {
        self.where_has.push(RelationFilter {
            relation: relation.into(),
            conditions,
        });
        self
    }

    pub fn doesnt_have(mut self, relation: impl Into<String>) -> Self {
        self.doesnt_have.push(relation.into());
        self
    }

    pub fn where_doesnt_have(
        mut self,
        relation: impl Into<String>,
        conditions: Vec<Condition>,
    ) -> Self {
        self.where_doesnt_have.push(RelationFilter {
            relation: relation.into(),
            conditions,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.with.is_empty()
            && self.with_count.is_empty()
            && self.has.is_empty()
            && self.where_has.is_empty()
            && self.doesnt_have.is_empty()
            && self.where_doesnt_have.is_empty()
    }
}
