//! Per-plugin schema version tracking
//!
//! Each plugin advances its own integer schema version, independent of the
//! host application's version. Versions live in a shared table keyed by
//! plugin name, behind the [`VersionStore`] trait so the host's connection
//! layer stays an external collaborator. Migration steps themselves are
//! executed by the host's migration DSL through [`MigrationRunner`]; this
//! module only orders the steps and keeps the bookkeeping transactional
//! per step.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{OverlayError, OverlayResult};
use crate::plugin::Plugin;

/// One row of the shared version table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub plugin_name: String,
    pub version: i64,
}

/// Direction a migration step is applied in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// One migration step found under a plugin's migration directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStep {
    /// Numeric prefix of the file name
    pub version: i64,
    /// Full file name, e.g. `0002_add_index.ext`
    pub name: String,
    /// Absolute path to the migration file
    pub path: PathBuf,
}

impl MigrationStep {
    /// Parse a step from a file name with a leading integer prefix
    /// followed by an underscore. Returns `None` for anything else.
    fn parse(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let prefix = name.split('_').next()?;
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        // Numeric parse, so zero-padding width never affects ordering.
        let version = prefix.parse::<i64>().ok()?;
        Some(Self {
            version,
            name: name.to_string(),
            path: path.to_path_buf(),
        })
    }
}

/// Persistence surface for the shared version table. Implemented by the
/// host over its connection layer; in-memory and JSON-file implementations
/// are provided for tests and single-binary hosts.
#[async_trait]
pub trait VersionStore: Send + Sync {
    /// Read a plugin's recorded version, `None` when no row exists
    async fn version(&self, plugin_name: &str) -> OverlayResult<Option<i64>>;

    /// Insert a new row for a plugin
    async fn insert(&self, plugin_name: &str, version: i64) -> OverlayResult<()>;

    /// Update an existing plugin row
    async fn update(&self, plugin_name: &str, version: i64) -> OverlayResult<()>;
}

/// External migration-execution collaborator (the host's migration DSL)
#[async_trait]
pub trait MigrationRunner: Send + Sync {
    /// Apply one migration step in the given direction. Errors propagate
    /// and halt the plugin's migration.
    async fn apply(
        &self,
        plugin: &Plugin,
        step: &MigrationStep,
        direction: Direction,
    ) -> OverlayResult<()>;
}

/// In-memory version store
#[derive(Debug, Default)]
pub struct InMemoryVersionStore {
    records: RwLock<HashMap<String, i64>>,
}

impl InMemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VersionStore for InMemoryVersionStore {
    async fn version(&self, plugin_name: &str) -> OverlayResult<Option<i64>> {
        Ok(self.records.read().await.get(plugin_name).copied())
    }

    async fn insert(&self, plugin_name: &str, version: i64) -> OverlayResult<()> {
        self.records
            .write()
            .await
            .insert(plugin_name.to_string(), version);
        Ok(())
    }

    async fn update(&self, plugin_name: &str, version: i64) -> OverlayResult<()> {
        let mut records = self.records.write().await;
        match records.get_mut(plugin_name) {
            Some(v) => {
                *v = version;
                Ok(())
            }
            None => Err(OverlayError::migration(
                plugin_name,
                "no version row to update",
            )),
        }
    }
}

/// File-backed version store. The file is named after the configured
/// schema-info table and holds the full row set as JSON, rewritten on
/// every mutation.
#[derive(Debug)]
pub struct JsonVersionStore {
    path: PathBuf,
    records: RwLock<HashMap<String, i64>>,
}

impl JsonVersionStore {
    /// Open (or create) the store file `<dir>/<table_name>.json`
    pub async fn open(dir: impl AsRef<Path>, table_name: &str) -> OverlayResult<Self> {
        let path = dir.as_ref().join(format!("{}.json", table_name));
        let records = if path.is_file() {
            let content = tokio::fs::read_to_string(&path).await?;
            let rows: Vec<MigrationRecord> = serde_json::from_str(&content)?;
            rows.into_iter().map(|r| (r.plugin_name, r.version)).collect()
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, records: &HashMap<String, i64>) -> OverlayResult<()> {
        let mut rows: Vec<MigrationRecord> = records
            .iter()
            .map(|(name, version)| MigrationRecord {
                plugin_name: name.clone(),
                version: *version,
            })
            .collect();
        rows.sort_by(|a, b| a.plugin_name.cmp(&b.plugin_name));

        if let Some(parent) = self.path.parent() {
            if !parent.is_dir() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(&rows)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl VersionStore for JsonVersionStore {
    async fn version(&self, plugin_name: &str) -> OverlayResult<Option<i64>> {
        Ok(self.records.read().await.get(plugin_name).copied())
    }

    async fn insert(&self, plugin_name: &str, version: i64) -> OverlayResult<()> {
        let mut records = self.records.write().await;
        records.insert(plugin_name.to_string(), version);
        self.persist(&records).await
    }

    async fn update(&self, plugin_name: &str, version: i64) -> OverlayResult<()> {
        let mut records = self.records.write().await;
        if !records.contains_key(plugin_name) {
            return Err(OverlayError::migration(
                plugin_name,
                "no version row to update",
            ));
        }
        records.insert(plugin_name.to_string(), version);
        self.persist(&records).await
    }
}

/// Tracks and advances per-plugin schema versions
pub struct MigrationTracker {
    store: Arc<dyn VersionStore>,
    runner: Arc<dyn MigrationRunner>,
}

impl MigrationTracker {
    pub fn new(store: Arc<dyn VersionStore>, runner: Arc<dyn MigrationRunner>) -> Self {
        Self { store, runner }
    }

    /// The plugin's current schema version. A plugin with no row yet gets
    /// one created at version 0; subsequent reads see the same row.
    pub async fn current_version(&self, plugin: &Plugin) -> OverlayResult<i64> {
        match self.store.version(plugin.name()).await? {
            Some(version) => Ok(version),
            None => {
                self.store.insert(plugin.name(), 0).await?;
                Ok(0)
            }
        }
    }

    /// The numerically highest migration prefix under the plugin's
    /// migration directory, `None` when the directory is absent or holds
    /// no migrations
    pub async fn latest_migration(&self, plugin: &Plugin) -> OverlayResult<Option<i64>> {
        let steps = self.migration_steps(plugin).await?;
        Ok(steps.last().map(|s| s.version))
    }

    /// All migration steps for the plugin, sorted ascending by version.
    /// Files without a numeric prefix are ignored.
    pub async fn migration_steps(&self, plugin: &Plugin) -> OverlayResult<Vec<MigrationStep>> {
        let dir = plugin.migration_directory();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut steps = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                if let Some(step) = MigrationStep::parse(&entry.path()) {
                    steps.push(step);
                }
            }
        }
        steps.sort_by_key(|s| s.version);
        Ok(steps)
    }

    /// Migrate the plugin to `target` (`None` = latest), applying steps
    /// through the external runner and updating the version row after each
    /// step. A plugin with no migration directory keeps its current
    /// version; runner errors propagate and halt immediately, leaving the
    /// row at the last applied step.
    pub async fn migrate(&self, plugin: &Plugin, target: Option<i64>) -> OverlayResult<i64> {
        let current = self.current_version(plugin).await?;
        let steps = self.migration_steps(plugin).await?;

        let Some(latest) = steps.last().map(|s| s.version) else {
            tracing::debug!(
                target: "overlay_migrations",
                plugin = %plugin.name(),
                "no migrations found, version unchanged"
            );
            return Ok(current);
        };
        let target = target.unwrap_or(latest);

        tracing::info!(
            target: "overlay_migrations",
            plugin = %plugin.name(),
            current = current,
            target = target,
            "migrating plugin"
        );

        if target > current {
            for step in steps.iter().filter(|s| s.version > current && s.version <= target) {
                self.apply_step(plugin, step, Direction::Up).await?;
            }
        } else if target < current {
            for step in steps
                .iter()
                .rev()
                .filter(|s| s.version > target && s.version <= current)
            {
                self.apply_step(plugin, step, Direction::Down).await?;
            }
        }

        self.current_version(plugin).await
    }

    async fn apply_step(
        &self,
        plugin: &Plugin,
        step: &MigrationStep,
        direction: Direction,
    ) -> OverlayResult<()> {
        tracing::debug!(
            target: "overlay_migrations",
            plugin = %plugin.name(),
            step = %step.name,
            direction = ?direction,
            "applying migration step"
        );
        self.runner.apply(plugin, step, direction).await?;

        // Bookkeeping follows each step so a later failure leaves the
        // recorded version at the last applied step.
        let recorded = match direction {
            Direction::Up => step.version,
            Direction::Down => step.version - 1,
        };
        self.store.update(plugin.name(), recorded).await
    }
}
