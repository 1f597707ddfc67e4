//! Repository layer over one entity table.
//!
//! # Responsibility
//! - Execute composed selects, pagination and eager loading.
//! - Perform single-row writes without policy (validation, defaults and
//!   result translation belong to the service layer).
//!
//! # Invariants
//! - A repository is only constructed for an existing table that carries
//!   the entity's primary key column.

pub mod model_repo;
