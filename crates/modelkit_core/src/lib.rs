//! Generic persistence helpers for entity-backed SQLite tables.
//! Batch CASE updates, search query building, date presets and CRUD
//! wrappers that report structured update results.

pub mod batch;
pub mod config;
pub mod date_range;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod schema;
pub mod service;
pub mod sql;

pub use batch::{build_batch_update, BatchUpdateStatement, BatchUpdater};
pub use config::{ConfigError, ConventionColumns, KitConfig, LoggingConfig};
pub use date_range::{
    parse_custom_range, Clock, DatePreset, DateRange, DateRangeResolver, FixedClock, SystemClock,
};
pub use db::{open_db, open_db_in_memory, DbError, DbResult, Migration};
pub use error::{KitError, KitResult, QueryStage};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::entity::{EntityDef, FieldRules, Relation, RelationKind, SearchMode};
pub use model::result::{ResultCode, UpdateResult};
pub use model::value::{FieldMap, ParamValue, Params, Record, Row, Value};
pub use query::builder::{build_select, QueryContext, SelectQuery};
pub use query::page::{Page, ResultShape, SearchOutput};
pub use query::params::{CompareOp, Condition, Direction, SearchParams};
pub use query::relation::RelationDirectives;
pub use repo::model_repo::{ModelRepository, SqliteModelRepository};
pub use schema::{SchemaIntrospector, TableSchema};
pub use service::auth::{AuthContext, StaticActor};
pub use service::model_service::{FieldUpdate, ModelService};
pub use service::registry::{EntityValidator, RegistryError, ValidatorRegistry};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
