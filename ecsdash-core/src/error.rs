use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by the remote inventory.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InventoryError {
    /// Network or API error; retried on the next scheduled cycle.
    #[error("transient: {message}")]
    Transient { message: String },
    /// The referenced resource vanished between list and describe.
    #[error("not found: {resource}")]
    NotFound { resource: String },
}

impl InventoryError {
    pub fn transient(message: impl Into<String>) -> Self {
        InventoryError::Transient {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        InventoryError::NotFound {
            resource: resource.into(),
        }
    }
}

/// A full tree/table rebuild that had to be abandoned.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("build aborted while {stage}: {source}")]
    Aborted {
        stage: String,
        #[source]
        source: InventoryError,
    },
}

impl BuildError {
    pub fn aborted(stage: impl Into<String>, source: InventoryError) -> Self {
        BuildError::Aborted {
            stage: stage.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid value for '{field}': {reason}")]
    Invalid { field: String, reason: String },
    #[error("no config file found, searched: {searched:?}")]
    NotFound { searched: Vec<PathBuf> },
}
