//! Overlay subsystem error types

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// Overlay subsystem result type
pub type OverlayResult<T> = Result<T, OverlayError>;

/// Overlay subsystem errors
#[derive(Error, Debug)]
pub enum OverlayError {
    /// Plugin root could not be located
    #[error("plugin '{name}' not found (searched {searched:?})")]
    PluginNotFound { name: String, searched: Vec<PathBuf> },

    /// A plugin with the same name is already registered
    #[error("plugin '{name}' is already registered")]
    DuplicateName { name: String },

    /// The captured path marker is no longer present in a host path list,
    /// or no marker could be captured because a host list was empty (the
    /// path is empty in that case)
    #[error("path marker {path:?} not present in host path list")]
    MarkerNotFound { path: PathBuf },

    /// Migration bookkeeping failed for a plugin
    #[error("migration error for plugin '{plugin}': {reason}")]
    Migration { plugin: String, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Generic error
    #[error("overlay error: {0}")]
    Generic(String),
}

impl OverlayError {
    /// Create a new generic overlay error
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic(message.into())
    }

    /// Create a new plugin-not-found error
    pub fn plugin_not_found(name: impl Into<String>, searched: Vec<PathBuf>) -> Self {
        Self::PluginNotFound {
            name: name.into(),
            searched,
        }
    }

    /// Create a new migration error
    pub fn migration(plugin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Migration {
            plugin: plugin.into(),
            reason: reason.into(),
        }
    }
}
