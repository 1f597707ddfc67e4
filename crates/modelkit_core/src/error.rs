//! Error taxonomy shared by the query builder, batch updater and CRUD
//! wrappers.
//!
//! # Invariants
//! - Mutating service operations translate every `KitError` into an
//!   `UpdateResult`; only read paths return it to callers.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type KitResult<T> = Result<T, KitError>;

/// Which part of query composition failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    Relations,
    Filters,
}

impl QueryStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Relations => "relation directives",
            Self::Filters => "filters",
        }
    }
}

#[derive(Debug)]
pub enum KitError {
    /// Batch input contained no rows.
    EmptyInput,
    /// Batch rows carry no column besides the reference column.
    NothingToUpdate,
    /// Batch row `index` lacks a value for `column`.
    IncompleteRow {
        index: usize,
        column: String,
    },
    MissingTable(String),
    MissingColumn {
        table: String,
        column: String,
    },
    /// Rejected by a registered entity validator.
    Validation(String),
    /// Entity lacks the status sentinels required by the operation.
    MissingConstant {
        entity: String,
        constant: &'static str,
    },
    NonScalarField(String),
    InvalidIdentifier(String),
    UnknownRelation {
        entity: String,
        relation: String,
    },
    QueryBuild {
        stage: QueryStage,
        message: String,
    },
    Persistence(DbError),
    NotFound {
        entity: String,
        id: String,
    },
}

impl KitError {
    /// Wraps any composition failure with the stage it happened in.
    pub fn query_build(stage: QueryStage, source: &KitError) -> Self {
        Self::QueryBuild {
            stage,
            message: source.to_string(),
        }
    }
}

impl Display for KitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "batch input must not be empty"),
            Self::NothingToUpdate => {
                write!(f, "batch rows have no columns besides the reference column")
            }
            Self::IncompleteRow { index, column } => {
                write!(f, "batch row {index} has no value for `{column}`")
            }
            Self::MissingTable(table) => write!(f, "table `{table}` does not exist"),
            Self::MissingColumn { table, column } => {
                write!(f, "table `{table}` has no column `{column}`")
            }
            Self::Validation(message) => write!(f, "{message}"),
            Self::MissingConstant { entity, constant } => write!(
                f,
                "entity `{entity}` does not declare the `{constant}` status sentinel"
            ),
            Self::NonScalarField(field) => {
                write!(f, "field `{field}` expects a scalar value")
            }
            Self::InvalidIdentifier(value) => write!(f, "invalid SQL identifier `{value}`"),
            Self::UnknownRelation { entity, relation } => {
                write!(f, "entity `{entity}` has no relation `{relation}`")
            }
            Self::QueryBuild { stage, message } => {
                write!(f, "failed to build query {}: {message}", stage.as_str())
            }
            Self::Persistence(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
        }
    }
}

impl Error for KitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for KitError {
    fn from(value: DbError) -> Self {
        Self::Persistence(value)
    }
}

impl From<rusqlite::Error> for KitError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Persistence(DbError::Sqlite(value))
    }
}
