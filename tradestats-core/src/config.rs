//! Serializable report configuration, loaded from TOML.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::cleaning::CleanOptions;
use crate::schema::DEFAULT_COLUMNS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Schema section: which columns a table must carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Empty means the full default schema.
    pub required_columns: Vec<String>,
}

/// Everything a report run can be configured with.
///
/// ```toml
/// [cleaning]
/// invalid = "null"
/// percent_policy = "strict"
///
/// [schema]
/// required_columns = ["outcome", "pl_by_percentage"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    pub cleaning: CleanOptions,
    pub schema: SchemaConfig,
}

impl StatsConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Required columns, falling back to the default schema.
    pub fn required_columns(&self) -> Vec<&str> {
        if self.schema.required_columns.is_empty() {
            DEFAULT_COLUMNS.to_vec()
        } else {
            self.schema
                .required_columns
                .iter()
                .map(String::as_str)
                .collect()
        }
    }
}
