//! Plugin lifecycle orchestration
//!
//! The manager owns the registry, injector, mirror, and migration tracker
//! and drives each plugin through its load sequence: inject code paths,
//! run the registered startup hook, re-inject anything the hook appended,
//! mirror assets, and finally register. Startup errors are fatal and stop
//! the sequence where they occur.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::OverlayConfig;
use crate::discovery::{DiscoveryConfig, PluginDiscovery};
use crate::error::{OverlayError, OverlayResult};
use crate::migrations::{InMemoryVersionStore, MigrationRunner, MigrationTracker, VersionStore};
use crate::mirror::AssetMirror;
use crate::paths::{LoadPathInjector, PathMarker};
use crate::plugin::Plugin;
use crate::registry::PluginRegistry;
use crate::resolver::ResolutionEngine;

/// The host application's ordered path lists, mutated in place as plugins
/// load
#[derive(Debug, Default)]
pub struct HostPaths {
    /// Code search paths
    pub search: Vec<PathBuf>,
    /// Dependency (autoload) paths
    pub dependency: Vec<PathBuf>,
}

/// Per-plugin startup logic, registered with the manager by plugin name
/// and run once during that plugin's load sequence. Hooks may mutate the
/// plugin (append code paths, set version and info) before injection
/// completes.
#[async_trait]
pub trait StartupHook: Send + Sync {
    async fn on_load(&self, plugin: &mut Plugin) -> OverlayResult<()>;
}

/// Builds a [`PluginManager`], wiring in the optional collaborators
pub struct PluginManagerBuilder {
    config: OverlayConfig,
    store: Option<Arc<dyn VersionStore>>,
    runner: Option<Arc<dyn MigrationRunner>>,
    hooks: HashMap<String, Arc<dyn StartupHook>>,
}

impl PluginManagerBuilder {
    pub fn new() -> Self {
        Self {
            config: OverlayConfig::default(),
            store: None,
            runner: None,
            hooks: HashMap::new(),
        }
    }

    pub fn with_config(mut self, config: OverlayConfig) -> Self {
        self.config = config;
        self
    }

    /// Version persistence backend; defaults to an in-memory store
    pub fn with_version_store(mut self, store: Arc<dyn VersionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Migration execution collaborator. Without one, migration requests
    /// are rejected.
    pub fn with_migration_runner(mut self, runner: Arc<dyn MigrationRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Register a startup hook for the named plugin
    pub fn with_startup_hook(
        mut self,
        plugin_name: impl Into<String>,
        hook: Arc<dyn StartupHook>,
    ) -> Self {
        self.hooks.insert(plugin_name.into(), hook);
        self
    }

    pub fn build(self) -> PluginManager {
        let tracker = self.runner.map(|runner| {
            let store = self
                .store
                .unwrap_or_else(|| Arc::new(InMemoryVersionStore::new()));
            MigrationTracker::new(store, runner)
        });

        let mirror = AssetMirror::new(self.config.public_directory.clone());
        PluginManager {
            config: self.config,
            registry: PluginRegistry::new(),
            injector: LoadPathInjector::new(),
            mirror,
            tracker,
            hooks: self.hooks,
            marker: None,
        }
    }
}

impl Default for PluginManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns all overlay state and drives the plugin load sequence
pub struct PluginManager {
    config: OverlayConfig,
    registry: PluginRegistry,
    injector: LoadPathInjector,
    mirror: AssetMirror,
    tracker: Option<MigrationTracker>,
    hooks: HashMap<String, Arc<dyn StartupHook>>,
    marker: Option<PathMarker>,
}

impl PluginManager {
    pub fn builder() -> PluginManagerBuilder {
        PluginManagerBuilder::new()
    }

    /// Capture the path marker from the host's current path lists and
    /// prepare the shared public directory. Runs once; later calls are
    /// no-ops so `start_all` can invoke it unconditionally.
    pub async fn init(&mut self, host: &HostPaths) -> OverlayResult<()> {
        if self.marker.is_none() {
            self.marker = Some(PathMarker::capture(&host.search, &host.dependency)?);
            tracing::info!(
                target: "overlay_manager",
                "path marker captured, overlay initialized"
            );
        }
        self.mirror.initialize_public_directory().await
    }

    /// Discover every plugin under the configured root and start each one
    /// in name order. Any failure is fatal and aborts the remaining
    /// plugins.
    pub async fn start_all(&mut self, host: &mut HostPaths) -> OverlayResult<()> {
        self.init(host).await?;

        let discovery = PluginDiscovery::new(DiscoveryConfig::from(&self.config));
        let discovered = discovery.discover().await?;
        tracing::info!(
            target: "overlay_manager",
            count = discovered.len(),
            "starting discovered plugins"
        );

        for entry in discovered {
            let plugin = Plugin::from_root(&entry.root)?;
            self.start_plugin(plugin, host).await?;
        }
        Ok(())
    }

    /// Locate a single plugin by name under the configured root and start
    /// it
    pub async fn start(&mut self, name: &str, host: &mut HostPaths) -> OverlayResult<()> {
        self.init(host).await?;
        let plugin = Plugin::locate(&self.config.root, name)?;
        self.start_plugin(plugin, host).await
    }

    async fn start_plugin(&mut self, mut plugin: Plugin, host: &mut HostPaths) -> OverlayResult<()> {
        // Duplicate check precedes all side effects so a repeated name
        // leaves the host paths untouched.
        if self.registry.contains(plugin.name()) {
            return Err(OverlayError::DuplicateName {
                name: plugin.name().to_string(),
            });
        }
        let marker = self
            .marker
            .clone()
            .ok_or_else(|| OverlayError::generic("plugin manager not initialized"))?;

        tracing::info!(
            target: "overlay_manager",
            plugin = %plugin.name(),
            root = ?plugin.root(),
            "starting plugin"
        );

        self.injector
            .inject(&plugin, &marker, &mut host.search, &mut host.dependency)?;

        if let Some(hook) = self.hooks.get(plugin.name()).cloned() {
            hook.on_load(&mut plugin).await?;
            // The hook may have appended code paths; injection is
            // idempotent, so re-running it picks up only the additions.
            self.injector
                .inject(&plugin, &marker, &mut host.search, &mut host.dependency)?;
        } else if plugin.startup_file(&self.config.startup_file_name).is_none() {
            tracing::debug!(
                target: "overlay_manager",
                plugin = %plugin.name(),
                "plugin has no startup file and no registered hook"
            );
        }

        let stats = self.mirror.mirror(&plugin).await?;
        tracing::debug!(
            target: "overlay_manager",
            plugin = %plugin.name(),
            copied = stats.files_copied,
            unchanged = stats.files_unchanged,
            failures = stats.failures,
            "plugin assets mirrored"
        );

        self.registry.add(plugin)
    }

    /// Migrate a started plugin to `target` (`None` = latest). Requires a
    /// migration runner to have been configured.
    pub async fn migrate(&self, name: &str, target: Option<i64>) -> OverlayResult<i64> {
        let tracker = self
            .tracker
            .as_ref()
            .ok_or_else(|| OverlayError::generic("no migration runner configured"))?;
        let plugin = self
            .registry
            .get(name)
            .ok_or_else(|| OverlayError::plugin_not_found(name, Vec::new()))?;
        tracker.migrate(plugin, target).await
    }

    /// Resolution engine over the current configuration
    pub fn resolver(&self) -> ResolutionEngine {
        ResolutionEngine::new(&self.config)
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// The captured path marker, `None` before initialization
    pub fn marker(&self) -> Option<&PathMarker> {
        self.marker.as_ref()
    }
}
