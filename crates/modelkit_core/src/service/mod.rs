//! Use-case services built on repositories.

pub mod auth;
pub mod model_service;
pub mod registry;
