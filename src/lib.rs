//! Precedence-ordered plugin overlay subsystem for host web applications.
//!
//! Plugins are self-contained directory trees contributing code, view
//! templates, and static assets to a host application. The overlay keeps
//! them ordered: code directories are spliced into the host's load paths
//! relative to a captured marker, resources resolve across sources by
//! existence with a well-defined winner, assets are mirrored into one
//! shared public tree, and each plugin's schema version advances
//! independently of the host's.
//!
//! The usual entry point is [`PluginManager`]:
//!
//! ```no_run
//! use overlay_engine::{HostPaths, OverlayConfig, PluginManager};
//!
//! # async fn demo() -> overlay_engine::OverlayResult<()> {
//! let mut host = HostPaths {
//!     search: vec!["app".into(), "lib".into()],
//!     dependency: vec!["app".into()],
//! };
//!
//! let mut manager = PluginManager::builder()
//!     .with_config(OverlayConfig::default())
//!     .build();
//! manager.start_all(&mut host).await?;
//!
//! let resolver = manager.resolver();
//! let view = resolver.resolve_view("widgets/show", "html", manager.registry());
//! println!("rendering {}", view.path.display());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod manager;
pub mod migrations;
pub mod mirror;
pub mod paths;
pub mod plugin;
pub mod registry;
pub mod resolver;
pub mod version;

pub use config::{ConfigError, ConfigResult, OverlayConfig};
pub use discovery::{DiscoveredPlugin, DiscoveryConfig, PluginDiscovery, QualifiedBy};
pub use error::{OverlayError, OverlayResult};
pub use manager::{HostPaths, PluginManager, PluginManagerBuilder, StartupHook};
pub use migrations::{
    Direction, InMemoryVersionStore, JsonVersionStore, MigrationRecord, MigrationRunner,
    MigrationStep, MigrationTracker, VersionStore,
};
pub use mirror::{AssetMirror, MirrorStats};
pub use paths::{LoadPathInjector, PathMarker};
pub use plugin::Plugin;
pub use registry::PluginRegistry;
pub use resolver::{Resolution, ResolutionEngine, ResolutionSource, ResourceKind};
pub use version::VersionSpec;
