//! Precedence-ordered resource resolution
//!
//! Given a resource identifier, the engine decides which source supplies
//! it: one of the loaded plugins or the host application. Matching is
//! existence-based; the first path that exists on disk wins and content is
//! never merged across sources.
//!
//! Code files and views deliberately traverse the registry in opposite
//! orders. Code files iterate in load order so earlier-declared plugin
//! code is supplemented, not shadowed, by later plugins; views and layouts
//! iterate in precedence order so the most recently loaded plugin
//! overrides the rest.

use std::path::{Path, PathBuf};

use crate::config::OverlayConfig;
use crate::plugin::Plugin;
use crate::registry::PluginRegistry;

/// Which source supplied a resolved path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionSource {
    /// The host application's own tree
    Application,
    /// A loaded plugin, by name
    Plugin(String),
    /// Nothing matched; the path is the host default, returned so callers
    /// always have an actionable location for diagnostics
    Fallback,
}

/// Outcome of a resolution: always a concrete path, plus its provenance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub path: PathBuf,
    pub source: ResolutionSource,
}

impl Resolution {
    /// Whether the resolved path actually exists
    pub fn found(&self) -> bool {
        !matches!(self.source, ResolutionSource::Fallback)
    }
}

/// A resolvable resource identifier
#[derive(Debug, Clone, Copy)]
pub enum ResourceKind<'a> {
    /// Controller/helper file, identified by file name with a type-marker
    /// suffix in the stem (e.g. `widgets_controller.rb`,
    /// `admin/widgets_helper.rb`)
    CodeFile { file_name: &'a str },
    /// View template path plus extension (e.g. `widgets/show`, `html`)
    ViewTemplate { template: &'a str, extension: &'a str },
    /// Mirrored static asset; never resolved against plugin sources at
    /// runtime, only against the shared mirrored tree
    PublicAsset { plugin: &'a str, relative_path: &'a str },
}

/// Resolves resource identifiers across the plugin registry and the host
/// application
#[derive(Debug, Clone)]
pub struct ResolutionEngine {
    application_root: PathBuf,
    public_root: PathBuf,
    disable_application_view_loading: bool,
    disable_application_code_loading: bool,
    disable_code_mixing: bool,
}

impl ResolutionEngine {
    pub fn new(config: &OverlayConfig) -> Self {
        Self {
            application_root: config.application_root.clone(),
            public_root: config.public_directory.clone(),
            disable_application_view_loading: config.disable_application_view_loading,
            disable_application_code_loading: config.disable_application_code_loading,
            disable_code_mixing: config.disable_code_mixing,
        }
    }

    /// Resolve a resource against the registry and the host application
    pub fn resolve(&self, kind: ResourceKind<'_>, registry: &PluginRegistry) -> Resolution {
        match kind {
            ResourceKind::CodeFile { file_name } => self.resolve_code_file(file_name, registry),
            ResourceKind::ViewTemplate { template, extension } => {
                self.resolve_view(template, extension, registry)
            }
            ResourceKind::PublicAsset { plugin, relative_path } => {
                self.resolve_public_asset(plugin, relative_path)
            }
        }
    }

    /// Resolve a controller or helper file by its type-marked file name.
    ///
    /// Plugins are tried in load order (first loaded first); the host
    /// application is tried last unless application code loading is
    /// disabled. Identifiers without a recognized type marker go straight
    /// to the host application.
    pub fn resolve_code_file(&self, file_name: &str, registry: &PluginRegistry) -> Resolution {
        let (type_dir, relative) = match split_code_identifier(file_name) {
            Some(parts) => parts,
            None => {
                let path = self.application_root.join(file_name);
                return self.application_or_fallback(path);
            }
        };

        let app_path = self.application_root.join(type_dir).join(relative);

        if self.disable_code_mixing {
            return self.application_or_fallback(app_path);
        }

        for plugin in registry.load_order() {
            let candidate = plugin.root().join(type_dir).join(relative);
            if candidate.is_file() {
                tracing::debug!(
                    target: "overlay_resolver",
                    plugin = %plugin.name(),
                    path = ?candidate,
                    "code file resolved from plugin"
                );
                return Resolution {
                    path: candidate,
                    source: ResolutionSource::Plugin(plugin.name().to_string()),
                };
            }
        }

        if !self.disable_application_code_loading && app_path.is_file() {
            return Resolution {
                path: app_path,
                source: ResolutionSource::Application,
            };
        }

        Resolution {
            path: app_path,
            source: ResolutionSource::Fallback,
        }
    }

    /// Resolve a view template.
    ///
    /// The host application's view directory is checked first unless
    /// application view loading is disabled; plugins are then tried in
    /// precedence order so the most recently loaded plugin wins.
    pub fn resolve_view(
        &self,
        template: &str,
        extension: &str,
        registry: &PluginRegistry,
    ) -> Resolution {
        let relative = Path::new("app/views").join(format!("{}.{}", template, extension));
        let app_path = self.application_root.join(&relative);

        if !self.disable_application_view_loading && app_path.is_file() {
            return Resolution {
                path: app_path,
                source: ResolutionSource::Application,
            };
        }

        for plugin in registry.precedence_order() {
            let candidate = plugin.root().join(&relative);
            if candidate.is_file() {
                tracing::debug!(
                    target: "overlay_resolver",
                    plugin = %plugin.name(),
                    path = ?candidate,
                    "view resolved from plugin"
                );
                return Resolution {
                    path: candidate,
                    source: ResolutionSource::Plugin(plugin.name().to_string()),
                };
            }
        }

        Resolution {
            path: app_path,
            source: ResolutionSource::Fallback,
        }
    }

    /// Directories searched for layouts: the host application's layout
    /// directory first (unless application view loading is disabled),
    /// then each plugin's existing layout directory in precedence order.
    pub fn layout_candidates(&self, registry: &PluginRegistry) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if !self.disable_application_view_loading {
            let app_layouts = self.application_root.join("app/views/layouts");
            if app_layouts.is_dir() {
                candidates.push(app_layouts);
            }
        }

        for plugin in registry.precedence_order() {
            let dir = plugin.root().join("app/views/layouts");
            if dir.is_dir() {
                candidates.push(dir);
            }
        }

        candidates
    }

    /// The mirrored location of a plugin asset. Assets are copied ahead of
    /// time by the mirror and served by the host's static file layer, so
    /// this is a pure path computation checked against the mirrored tree.
    pub fn resolve_public_asset(&self, plugin: &str, relative_path: &str) -> Resolution {
        let path = self.public_root.join(plugin).join(relative_path);
        if path.is_file() {
            Resolution {
                path,
                source: ResolutionSource::Plugin(plugin.to_string()),
            }
        } else {
            Resolution {
                path,
                source: ResolutionSource::Fallback,
            }
        }
    }

    fn application_or_fallback(&self, path: PathBuf) -> Resolution {
        if path.is_file() {
            Resolution {
                path,
                source: ResolutionSource::Application,
            }
        } else {
            Resolution {
                path,
                source: ResolutionSource::Fallback,
            }
        }
    }
}

/// Recognized code-file type markers and the directories they map to
const CODE_TYPE_MARKERS: &[(&str, &str)] = &[
    ("_controller", "app/controllers"),
    ("_helper", "app/helpers"),
];

/// Split a code identifier into its type directory and the path relative
/// to it. Any explicit `app/<type>s/` prefix is stripped so module-nested
/// identifiers keep their subdirectories. `None` when the stem carries no
/// recognized type marker.
fn split_code_identifier(file_name: &str) -> Option<(&'static str, &str)> {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())?;

    for (marker, type_dir) in CODE_TYPE_MARKERS {
        if stem.ends_with(marker) {
            let relative = file_name
                .strip_prefix(&format!("{}/", type_dir))
                .unwrap_or(file_name);
            return Some((type_dir, relative));
        }
    }
    None
}
