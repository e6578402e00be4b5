//! Overlay configuration with validation, defaults, and YAML loading

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error reading configuration file
    #[error("failed to read config file: {0}")]
    FileReadError(#[from] std::io::Error),

    /// YAML parsing error
    #[error("failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Validation error
    #[error("invalid configuration: {0}")]
    ValidationError(String),
}

/// Overlay subsystem configuration
///
/// Every field has a sensible default, so `OverlayConfig::default()` is a
/// working configuration for a conventionally laid out host application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Directory under which plugin roots are located
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Root of the host application tree, used for fallback resolution
    #[serde(default = "default_application_root")]
    pub application_root: PathBuf,

    /// Shared public directory that plugin assets are mirrored into
    #[serde(default = "default_public_directory")]
    pub public_directory: PathBuf,

    /// Name of the shared per-plugin schema version table
    #[serde(default = "default_schema_info_table")]
    pub schema_info_table: String,

    /// File stem (any extension) that marks a directory as a plugin
    #[serde(default = "default_startup_file_name")]
    pub startup_file_name: String,

    /// Skip the host application's view directory during view resolution,
    /// so only plugin views are eligible (used when testing plugin views)
    #[serde(default)]
    pub disable_application_view_loading: bool,

    /// Skip the host application's code directories during code resolution
    #[serde(default)]
    pub disable_application_code_loading: bool,

    /// Short-circuit multi-source code resolution entirely; code files
    /// resolve against the host application alone
    #[serde(default)]
    pub disable_code_mixing: bool,
}

fn default_root() -> PathBuf {
    PathBuf::from("vendor/plugins")
}

fn default_application_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_public_directory() -> PathBuf {
    PathBuf::from("public/plugin_assets")
}

fn default_schema_info_table() -> String {
    "plugin_schema_info".to_string()
}

fn default_startup_file_name() -> String {
    "init_plugin".to_string()
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            application_root: default_application_root(),
            public_directory: default_public_directory(),
            schema_info_table: default_schema_info_table(),
            startup_file_name: default_startup_file_name(),
            disable_application_view_loading: false,
            disable_application_code_loading: false,
            disable_code_mixing: false,
        }
    }
}

impl OverlayConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.schema_info_table.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "schema_info_table cannot be empty".to_string(),
            ));
        }
        if self.startup_file_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "startup_file_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
