//! Per-entity persistence conventions.
//!
//! # Responsibility
//! - Declare table, primary key and search field rules of one entity type.
//! - Declare optional status sentinels and relations used by the query
//!   builder and CRUD wrappers.
//!
//! # Invariants
//! - A field is resolved against rules in `equals`, `like`, `in` order; the
//!   first rule naming it wins.

use crate::model::value::Value;
use std::collections::BTreeSet;

/// Comparison used when a filter value is matched against a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SearchMode {
    Equals,
    Like,
    In,
}

impl SearchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::Like => "like",
            Self::In => "in",
        }
    }
}

/// Field rule table for one entity type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRules {
    equals: BTreeSet<String>,
    like: BTreeSet<String>,
    within: BTreeSet<String>,
    pass_through: BTreeSet<String>,
}

impl FieldRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `fields` under `mode`.
    pub fn rule(mut self, mode: SearchMode, fields: &[&str]) -> Self {
        let target = match mode {
            SearchMode::Equals => &mut self.equals,
            SearchMode::Like => &mut self.like,
            SearchMode::In => &mut self.within,
        };
        target.extend(fields.iter().map(|field| (*field).to_string()));
        self
    }

    /// Declares keys that are applied as exact matches even when blank.
    pub fn pass_through(mut self, fields: &[&str]) -> Self {
        self.pass_through
            .extend(fields.iter().map(|field| (*field).to_string()));
        self
    }

    /// Returns the declared mode for `field`, if any.
    pub fn mode_for(&self, field: &str) -> Option<SearchMode> {
        if self.equals.contains(field) {
            Some(SearchMode::Equals)
        } else if self.like.contains(field) {
            Some(SearchMode::Like)
        } else if self.within.contains(field) {
            Some(SearchMode::In)
        } else {
            None
        }
    }

    pub fn is_pass_through(&self, field: &str) -> bool {
        self.pass_through.contains(field)
    }
}

/// Two-valued status column sentinels.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSentinels {
    pub on: Value,
    pub off: Value,
}

/// Shape of related rows when eager-loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// `related.related_column = local.local_column`, many rows.
    HasMany,
    /// Same join, at most one related row is kept.
    BelongsTo,
}

/// Declared relation between the entity table and another table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub name: String,
    pub kind: RelationKind,
    pub related_table: String,
    pub related_column: String,
    pub local_column: String,
}

impl Relation {
    /// `related_table.foreign_key` points at the local primary key column.
    pub fn has_many(
        name: impl Into<String>,
        related_table: impl Into<String>,
        foreign_key: impl Into<String>,
        local_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::HasMany,
            related_table: related_table.into(),
            related_column: foreign_key.into(),
            local_column: local_key.into(),
        }
    }

    /// Local `foreign_key` points at `related_table.owner_key`.
    pub fn belongs_to(
        name: impl Into<String>,
        related_table: impl Into<String>,
        foreign_key: impl Into<String>,
        owner_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RelationKind::BelongsTo,
            related_table: related_table.into(),
            related_column: owner_key.into(),
            local_column: foreign_key.into(),
        }
    }
}

/// Persistence conventions of one entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDef {
    pub name: String,
    /// Unprefixed table name; the configured prefix is prepended at use.
    pub table: String,
    pub primary_key: String,
    pub rules: FieldRules,
    /// Status column override; the configured default applies when `None`.
    pub status_column: Option<String>,
    pub status: Option<StatusSentinels>,
    /// Restrict every search to rows whose status equals the `on` sentinel.
    pub active_only: bool,
    pub relations: Vec<Relation>,
}

impl EntityDef {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            primary_key: "id".to_string(),
            rules: FieldRules::default(),
            status_column: None,
            status: None,
            active_only: false,
            relations: Vec::new(),
        }
    }

    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    pub fn rules(mut self, rules: FieldRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn status(mut self, on: impl Into<Value>, off: impl Into<Value>) -> Self {
        self.status = Some(StatusSentinels {
            on: on.into(),
            off: off.into(),
        });
        self
    }

    pub fn status_column(mut self, column: impl Into<String>) -> Self {
        self.status_column = Some(column.into());
        self
    }

    pub fn active_only(mut self, enabled: bool) -> Self {
        self.active_only = enabled;
        self
    }

    pub fn relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn find_relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|relation| relation.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::{EntityDef, FieldRules, Relation, SearchMode};

    #[test]
    fn equals_rule_takes_precedence() {
        let rules = FieldRules::new()
            .rule(SearchMode::Like, &["title"])
            .rule(SearchMode::Equals, &["title", "kind"])
            .rule(SearchMode::In, &["tag"]);

        assert_eq!(rules.mode_for("title"), Some(SearchMode::Equals));
        assert_eq!(rules.mode_for("tag"), Some(SearchMode::In));
        assert_eq!(rules.mode_for("other"), None);
    }

    #[test]
    fn relations_are_found_by_name() {
        let entity = EntityDef::new("Article", "articles")
            .relation(Relation::has_many("comments", "comments", "article_id", "id"))
            .relation(Relation::belongs_to("author", "users", "created_user", "id"));

        let author = entity.find_relation("author").unwrap();
        assert_eq!(author.local_column, "created_user");
        assert_eq!(author.related_column, "id");
        assert!(entity.find_relation("missing").is_none());
    }
}
