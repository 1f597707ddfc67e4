//! Declarative search parameters and their translation into SQL.
//!
//! # Responsibility
//! - Model caller filters, directives and relation inclusion requests.
//! - Compose them into one parameterized `SELECT` per entity table.
//!
//! # Invariants
//! - Caller values are always bound; only `where_raw` and `select_raw`
//!   fragments are spliced verbatim.

pub mod builder;
pub mod page;
pub mod params;
pub mod relation;
