//! Transient data shapes shared by the query builder, batch updater and
//! CRUD wrappers.
//!
//! # Responsibility
//! - Define scalar values, ordered rows and eager-loaded records.
//! - Describe per-entity persistence conventions (`EntityDef`).
//! - Define the `UpdateResult` envelope returned by mutating operations.
//!
//! # Invariants
//! - Rows keep caller insertion order; nothing here talks to the database.

pub mod entity;
pub mod result;
pub mod value;
