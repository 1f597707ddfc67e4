//! Per-entity validator registry.

use crate::model::value::{Params, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Validation hooks one entity type may register.
///
/// Every hook defaults to accepting the input.
pub trait EntityValidator: Send + Sync {
    fn validate_create(&self, _input: &Params) -> Result<(), String> {
        Ok(())
    }

    fn validate_update(&self, _input: &Params) -> Result<(), String> {
        Ok(())
    }

    fn validate_delete(&self, _id: &Value) -> Result<(), String> {
        Ok(())
    }

    /// Runs after a successful single-field update.
    fn after_field_update(&self, _id: &Value, _field: &str, _value: &Value) {}
}

/// Validator registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidEntityName(String),
    DuplicateEntity(String),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEntityName(value) => write!(f, "entity name is invalid: {value}"),
            Self::DuplicateEntity(value) => {
                write!(f, "validator already registered for entity: {value}")
            }
        }
    }
}

impl Error for RegistryError {}

/// Validators keyed by entity name.
#[derive(Default, Clone)]
pub struct ValidatorRegistry {
    validators: BTreeMap<String, Arc<dyn EntityValidator>>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the validator of one entity.
    pub fn register(
        &mut self,
        entity: &str,
        validator: Arc<dyn EntityValidator>,
    ) -> Result<(), RegistryError> {
        let entity = entity.trim().to_string();
        if !is_valid_entity_name(&entity) {
            return Err(RegistryError::InvalidEntityName(entity));
        }
        if self.validators.contains_key(entity.as_str()) {
            return Err(RegistryError::DuplicateEntity(entity));
        }

        self.validators.insert(entity, validator);
        Ok(())
    }

    pub fn get(&self, entity: &str) -> Option<Arc<dyn EntityValidator>> {
        self.validators.get(entity.trim()).cloned()
    }

    /// Returns sorted entity names.
    pub fn entity_names(&self) -> Vec<String> {
        self.validators.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

fn is_valid_entity_name(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
