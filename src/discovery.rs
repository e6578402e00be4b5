//! Plugin discovery under the plugins root
//!
//! A direct child directory of the plugins root qualifies as a plugin when
//! it carries a startup file, or when its name ends in a recognized engine
//! suffix. Plain directories without either are skipped so the plugins
//! root can hold unrelated material.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::OverlayConfig;
use crate::error::OverlayResult;
use crate::plugin::Plugin;

/// Discovery configuration
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Directory scanned for plugin roots
    pub root: PathBuf,
    /// File stem (any extension) that marks a directory as a plugin
    pub startup_file_name: String,
    /// Directory-name suffixes that qualify a directory on their own
    pub engine_suffixes: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("vendor/plugins"),
            startup_file_name: "init_plugin".to_string(),
            engine_suffixes: vec!["_engine".to_string(), "_bundle".to_string()],
        }
    }
}

impl From<&OverlayConfig> for DiscoveryConfig {
    fn from(config: &OverlayConfig) -> Self {
        Self {
            root: config.root.clone(),
            startup_file_name: config.startup_file_name.clone(),
            ..Default::default()
        }
    }
}

/// Why a directory qualified as a plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualifiedBy {
    /// The directory contains a startup file
    StartupFile,
    /// The directory name ends in a recognized engine suffix
    NameSuffix,
}

/// A plugin directory found during a discovery scan
#[derive(Debug, Clone)]
pub struct DiscoveredPlugin {
    pub name: String,
    pub root: PathBuf,
    pub qualified_by: QualifiedBy,
    pub discovered_at: DateTime<Utc>,
}

/// Scans the plugins root for qualifying plugin directories
#[derive(Debug, Clone, Default)]
pub struct PluginDiscovery {
    config: DiscoveryConfig,
}

impl PluginDiscovery {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Scan the plugins root and return qualifying directories sorted by
    /// name. A missing root is not an error; it yields an empty set.
    pub async fn discover(&self) -> OverlayResult<Vec<DiscoveredPlugin>> {
        if !self.config.root.is_dir() {
            tracing::debug!(
                target: "overlay_discovery",
                root = ?self.config.root,
                "plugins root does not exist, nothing to discover"
            );
            return Ok(Vec::new());
        }

        tracing::info!(
            target: "overlay_discovery",
            root = ?self.config.root,
            "scanning for plugins"
        );

        let mut discovered = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.config.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let root = entry.path();
            let Some(name) = root.file_name().and_then(|n| n.to_str()).map(str::to_string)
            else {
                continue;
            };

            let Some(qualified_by) = self.qualify(&name, &root) else {
                tracing::debug!(
                    target: "overlay_discovery",
                    directory = %name,
                    "directory does not qualify as a plugin, skipping"
                );
                continue;
            };

            tracing::debug!(
                target: "overlay_discovery",
                plugin = %name,
                qualified_by = ?qualified_by,
                "discovered plugin"
            );
            discovered.push(DiscoveredPlugin {
                name,
                root,
                qualified_by,
                discovered_at: Utc::now(),
            });
        }

        discovered.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(discovered)
    }

    fn qualify(&self, name: &str, root: &std::path::Path) -> Option<QualifiedBy> {
        let probe = Plugin::from_root(root).ok()?;
        if probe.startup_file(&self.config.startup_file_name).is_some() {
            return Some(QualifiedBy::StartupFile);
        }
        if self
            .config
            .engine_suffixes
            .iter()
            .any(|suffix| name.ends_with(suffix.as_str()))
        {
            return Some(QualifiedBy::NameSuffix);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn discovery(root: PathBuf) -> PluginDiscovery {
        PluginDiscovery::new(DiscoveryConfig {
            root,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_discover_by_startup_file_and_suffix() {
        let tmp = tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("widgets")).unwrap();
        fs::write(tmp.path().join("widgets/init_plugin.rb"), "").unwrap();
        fs::create_dir_all(tmp.path().join("login_engine")).unwrap();

        let found = discovery(tmp.path().to_path_buf()).discover().await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "login_engine");
        assert_eq!(found[0].qualified_by, QualifiedBy::NameSuffix);
        assert_eq!(found[1].name, "widgets");
        assert_eq!(found[1].qualified_by, QualifiedBy::StartupFile);
    }

    #[tokio::test]
    async fn test_discover_skips_unqualified_entries() {
        let tmp = tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("just_a_dir")).unwrap();
        fs::write(tmp.path().join("stray_file.txt"), "").unwrap();

        let found = discovery(tmp.path().to_path_buf()).discover().await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_discover_missing_root() {
        let tmp = tempdir().unwrap();
        let found = discovery(tmp.path().join("nope")).discover().await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_discover_sorted_by_name() {
        let tmp = tempdir().unwrap();
        for name in ["zeta_engine", "alpha_engine", "mid_bundle"] {
            fs::create_dir_all(tmp.path().join(name)).unwrap();
        }

        let found = discovery(tmp.path().to_path_buf()).discover().await.unwrap();
        let names: Vec<_> = found.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["alpha_engine", "mid_bundle", "zeta_engine"]);
    }
}
