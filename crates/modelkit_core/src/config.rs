//! Library configuration.
//!
//! # Responsibility
//! - Hold table prefix, pagination default and conventional column names.
//! - Load overrides from JSON; every field falls back to its default.
//!
//! # Invariants
//! - A loaded config has `default_page_size > 0` and identifier-safe
//!   column names and prefix.

use crate::sql;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DEFAULT_PAGE_SIZE: u32 = 10;

/// Column names the CRUD wrappers treat specially when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConventionColumns {
    pub status: String,
    pub sort: String,
    pub created_user: String,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: String,
}

impl Default for ConventionColumns {
    fn default() -> Self {
        Self {
            status: "status".to_string(),
            sort: "sort".to_string(),
            created_user: "created_user".to_string(),
            created_at: "created_at".to_string(),
            updated_at: "updated_at".to_string(),
            deleted_at: "deleted_at".to_string(),
        }
    }
}

/// File logger settings consumed by [`crate::logging::init_logging`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Absolute log directory; logging stays off when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KitConfig {
    /// Prepended to every entity table name.
    pub table_prefix: String,
    pub default_page_size: u32,
    pub columns: ConventionColumns,
    pub logging: LoggingConfig,
}

impl Default for KitConfig {
    fn default() -> Self {
        Self {
            table_prefix: String::new(),
            default_page_size: DEFAULT_PAGE_SIZE,
            columns: ConventionColumns::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl KitConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Returns `table` with the configured prefix.
    pub fn table_name(&self, table: &str) -> String {
        format!("{}{}", self.table_prefix, table)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_page_size == 0 {
            return Err(ConfigError::Invalid(
                "default_page_size must be greater than zero".to_string(),
            ));
        }
        if !self.table_prefix.is_empty() && sql::identifier(&self.table_prefix).is_err() {
            return Err(ConfigError::Invalid(format!(
                "table_prefix `{}` is not identifier-safe",
                self.table_prefix
            )));
        }
        let columns = &self.columns;
        for name in [
            &columns.status,
            &columns.sort,
            &columns.created_user,
            &columns.created_at,
            &columns.updated_at,
            &columns.deleted_at,
        ] {
            if sql::identifier(name).is_err() {
                return Err(ConfigError::Invalid(format!(
                    "column name `{name}` is not identifier-safe"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config JSON: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}
