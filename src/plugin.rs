//! The plugin entity: one discovered plugin/engine directory

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{OverlayError, OverlayResult};
use crate::version::VersionSpec;

/// Suffixes tried when locating a plugin root by name
pub const ROOT_SUFFIXES: &[&str] = &["", "_engine", "_bundle"];

/// Subdirectories preferred (in order) as a plugin's public asset source
pub const PUBLIC_DIR_CANDIDATES: &[&str] = &["assets", "public"];

/// A single plugin contributing code, views, and assets to the host
/// application.
///
/// A plugin is mutable only during its own load phase: startup hooks may
/// append to `code_paths` and set `version`/`info` before injection
/// completes. The root is fixed at construction.
#[derive(Debug, Clone)]
pub struct Plugin {
    name: String,
    root: PathBuf,
    /// Relative directories injected into the host load paths, in order.
    /// Startup hooks may append entries before injection completes.
    pub code_paths: Vec<PathBuf>,
    /// Declared version, resolved lazily
    pub version: Option<VersionSpec>,
    /// Free-form plugin-supplied description
    pub info: Option<String>,
}

impl Plugin {
    /// The default set of code paths added to the host search paths
    pub fn default_code_paths() -> Vec<PathBuf> {
        ["app/controllers", "app/helpers", "app/models", "components", "lib"]
            .iter()
            .map(PathBuf::from)
            .collect()
    }

    /// Construct a plugin from its root directory. The plugin name is the
    /// directory basename.
    pub fn from_root(root: impl Into<PathBuf>) -> OverlayResult<Self> {
        let root = root.into();
        let name = root
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| OverlayError::generic(format!("invalid plugin root {:?}", root)))?;

        if !root.is_dir() {
            return Err(OverlayError::plugin_not_found(name, vec![root]));
        }

        Ok(Self {
            name,
            root,
            code_paths: Self::default_code_paths(),
            version: None,
            info: None,
        })
    }

    /// Locate a plugin by name under the plugins root, trying the bare
    /// name first and then each recognized suffix (`_engine`, `_bundle`).
    pub fn locate(plugins_root: &Path, name: &str) -> OverlayResult<Self> {
        let mut searched = Vec::new();
        for suffix in ROOT_SUFFIXES {
            let candidate = plugins_root.join(format!("{}{}", name, suffix));
            if candidate.is_dir() {
                return Self::from_root(candidate);
            }
            searched.push(candidate);
        }
        Err(OverlayError::plugin_not_found(name, searched))
    }

    /// Plugin name (registry key, asset namespace, migration-row key)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute path to the plugin's source tree
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The declared code paths that actually exist on disk, resolved
    /// against the plugin root, in declared order
    pub fn existing_code_paths(&self) -> Vec<PathBuf> {
        self.code_paths
            .iter()
            .map(|p| self.root.join(p))
            .filter(|p| p.is_dir())
            .collect()
    }

    /// The subdirectory mirrored into the shared public tree: the first
    /// existing of `assets` and `public`, or `None` when neither exists
    pub fn public_directory(&self) -> Option<PathBuf> {
        PUBLIC_DIR_CANDIDATES
            .iter()
            .map(|d| self.root.join(d))
            .find(|p| p.is_dir())
    }

    /// The directory containing this plugin's migrations
    pub fn migration_directory(&self) -> PathBuf {
        self.root.join("db").join("migrate")
    }

    /// The plugin's startup file: a file directly under the root whose
    /// stem matches `stem`, with any extension. `None` when absent.
    pub fn startup_file(&self, stem: &str) -> Option<PathBuf> {
        let entries = std::fs::read_dir(&self.root).ok()?;
        entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .find(|p| p.is_file() && p.file_stem().and_then(|s| s.to_str()) == Some(stem))
    }

    /// The mirrored location of this plugin's assets under the shared
    /// public directory
    pub fn asset_base_path(&self, public_root: &Path) -> PathBuf {
        public_root.join(&self.name)
    }

    /// Resolved version string, `"unknown"` when no version was declared
    pub fn version_string(&self) -> String {
        self.version
            .as_ref()
            .map(VersionSpec::resolve)
            .unwrap_or_else(|| "unknown".to_string())
    }
}

impl fmt::Display for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Plugin<'{}' [{}]>", self.name, self.version_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn make_plugin_dir(root: &Path, name: &str, subdirs: &[&str]) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        for sub in subdirs {
            fs::create_dir_all(dir.join(sub)).unwrap();
        }
        dir
    }

    #[test]
    fn test_from_root_derives_name() {
        let tmp = tempdir().unwrap();
        let dir = make_plugin_dir(tmp.path(), "widgets", &["app/models"]);

        let plugin = Plugin::from_root(&dir).unwrap();
        assert_eq!(plugin.name(), "widgets");
        assert_eq!(plugin.root(), dir.as_path());
        assert_eq!(plugin.code_paths, Plugin::default_code_paths());
    }

    #[test]
    fn test_from_root_missing_directory() {
        let tmp = tempdir().unwrap();
        let err = Plugin::from_root(tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, OverlayError::PluginNotFound { .. }));
    }

    #[test]
    fn test_locate_with_suffix_fallback() {
        let tmp = tempdir().unwrap();
        make_plugin_dir(tmp.path(), "login_engine", &[]);

        let plugin = Plugin::locate(tmp.path(), "login").unwrap();
        assert_eq!(plugin.name(), "login_engine");
    }

    #[test]
    fn test_locate_reports_searched_locations() {
        let tmp = tempdir().unwrap();
        let err = Plugin::locate(tmp.path(), "ghost").unwrap_err();
        match err {
            OverlayError::PluginNotFound { name, searched } => {
                assert_eq!(name, "ghost");
                assert_eq!(searched.len(), ROOT_SUFFIXES.len());
                assert!(searched[1].ends_with("ghost_engine"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_existing_code_paths_skips_missing() {
        let tmp = tempdir().unwrap();
        let dir = make_plugin_dir(tmp.path(), "widgets", &["lib", "app/models"]);

        let plugin = Plugin::from_root(&dir).unwrap();
        let paths = plugin.existing_code_paths();
        // Declared order preserved: app/models before lib
        assert_eq!(paths, vec![dir.join("app/models"), dir.join("lib")]);
    }

    #[test]
    fn test_public_directory_prefers_assets() {
        let tmp = tempdir().unwrap();
        let dir = make_plugin_dir(tmp.path(), "widgets", &["assets", "public"]);

        let plugin = Plugin::from_root(&dir).unwrap();
        assert_eq!(plugin.public_directory(), Some(dir.join("assets")));
    }

    #[test]
    fn test_public_directory_absent() {
        let tmp = tempdir().unwrap();
        let dir = make_plugin_dir(tmp.path(), "widgets", &["lib"]);

        let plugin = Plugin::from_root(&dir).unwrap();
        assert_eq!(plugin.public_directory(), None);
    }

    #[test]
    fn test_startup_file_any_extension() {
        let tmp = tempdir().unwrap();
        let dir = make_plugin_dir(tmp.path(), "widgets", &[]);
        fs::write(dir.join("init_plugin.rb"), "").unwrap();

        let plugin = Plugin::from_root(&dir).unwrap();
        assert!(plugin.startup_file("init_plugin").is_some());
        assert!(plugin.startup_file("other").is_none());
    }

    #[test]
    fn test_version_string() {
        let tmp = tempdir().unwrap();
        let dir = make_plugin_dir(tmp.path(), "widgets", &[]);

        let mut plugin = Plugin::from_root(&dir).unwrap();
        assert_eq!(plugin.version_string(), "unknown");

        plugin.version = Some(crate::version::VersionSpec::triple(1, 0, 6));
        assert_eq!(plugin.version_string(), "1.0.6");
        assert_eq!(plugin.to_string(), "Plugin<'widgets' [1.0.6]>");
    }
}
