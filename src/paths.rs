//! Marker-relative load path injection
//!
//! The host application owns two ordered path lists: its code search paths
//! and its dependency (autoload) paths. Plugin code directories are spliced
//! into both immediately after a marker captured before any plugin was
//! processed, so host-native entries keep their positions and their
//! precedence over plugin entries.

use std::path::{Path, PathBuf};

use crate::error::{OverlayError, OverlayResult};
use crate::plugin::Plugin;

/// A snapshot of the last host-native entry in each host path list, taken
/// once at subsystem initialization. Everything inserted by the overlay
/// lands immediately after these entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMarker {
    load_path: PathBuf,
    dependency_path: PathBuf,
}

impl PathMarker {
    /// Capture the marker from the host's current path lists. Must be
    /// called before any plugin path is injected. An empty list has no
    /// marker entry to capture and fails with [`OverlayError::MarkerNotFound`].
    pub fn capture(search: &[PathBuf], dependency: &[PathBuf]) -> OverlayResult<Self> {
        let load_path = Self::last_entry(search)?;
        let dependency_path = Self::last_entry(dependency)?;
        Ok(Self {
            load_path,
            dependency_path,
        })
    }

    fn last_entry(list: &[PathBuf]) -> OverlayResult<PathBuf> {
        list.last().cloned().ok_or(OverlayError::MarkerNotFound {
            path: PathBuf::new(),
        })
    }

    /// Marker entry within the host search path list
    pub fn load_path(&self) -> &Path {
        &self.load_path
    }

    /// Marker entry within the host dependency path list
    pub fn dependency_path(&self) -> &Path {
        &self.dependency_path
    }
}

/// Splices plugin code directories into the host path lists.
///
/// The injector remembers every path it has inserted so that later plugins
/// land after earlier ones (load order is preserved after the marker) and
/// so that re-injecting a plugin is a no-op.
#[derive(Debug, Default)]
pub struct LoadPathInjector {
    injected: Vec<PathBuf>,
}

impl LoadPathInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the plugin's existing code directories into both host lists,
    /// immediately after the marker and after any previously injected
    /// paths. Returns the directories considered for this plugin.
    ///
    /// Nonexistent declared directories are skipped. Paths already present
    /// in a list are never inserted twice; the first occurrence keeps its
    /// position. A missing plugin root is an error and leaves both lists
    /// untouched.
    pub fn inject(
        &mut self,
        plugin: &Plugin,
        marker: &PathMarker,
        search: &mut Vec<PathBuf>,
        dependency: &mut Vec<PathBuf>,
    ) -> OverlayResult<Vec<PathBuf>> {
        if !plugin.root().is_dir() {
            return Err(OverlayError::plugin_not_found(
                plugin.name(),
                vec![plugin.root().to_path_buf()],
            ));
        }

        let dirs = plugin.existing_code_paths();
        for dir in plugin
            .code_paths
            .iter()
            .map(|p| plugin.root().join(p))
            .filter(|p| !p.is_dir())
        {
            tracing::debug!(
                target: "overlay_paths",
                plugin = %plugin.name(),
                path = ?dir,
                "declared code path does not exist, skipping"
            );
        }

        // Both markers are located before either list is touched so a
        // missing marker leaves both lists unchanged.
        let search_at = self.insertion_index(search, marker.load_path())?;
        let dependency_at = self.insertion_index(dependency, marker.dependency_path())?;
        Self::insert_at(search, search_at, &dirs);
        Self::insert_at(dependency, dependency_at, &dirs);

        for dir in &dirs {
            if !self.injected.contains(dir) {
                tracing::debug!(
                    target: "overlay_paths",
                    plugin = %plugin.name(),
                    path = ?dir,
                    "code path injected"
                );
                self.injected.push(dir.clone());
            }
        }

        Ok(dirs)
    }

    /// Every path this injector has inserted, in injection order
    pub fn injected_paths(&self) -> &[PathBuf] {
        &self.injected
    }

    fn insertion_index(&self, list: &[PathBuf], marker: &Path) -> OverlayResult<usize> {
        let marker_index = list
            .iter()
            .position(|p| p == marker)
            .ok_or_else(|| OverlayError::MarkerNotFound {
                path: marker.to_path_buf(),
            })?;

        // Skip past paths injected for earlier plugins so relative load
        // order is preserved after the marker.
        let mut at = marker_index + 1;
        while at < list.len() && self.injected.contains(&list[at]) {
            at += 1;
        }
        Ok(at)
    }

    fn insert_at(list: &mut Vec<PathBuf>, mut at: usize, dirs: &[PathBuf]) {
        for dir in dirs {
            if !list.contains(dir) {
                list.insert(at, dir.clone());
                at += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn plugin_with_dirs(root: &Path, name: &str, dirs: &[&str]) -> Plugin {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        for d in dirs {
            fs::create_dir_all(dir.join(d)).unwrap();
        }
        Plugin::from_root(dir).unwrap()
    }

    fn host_paths() -> (Vec<PathBuf>, Vec<PathBuf>) {
        (
            vec![PathBuf::from("/host/one"), PathBuf::from("/host/two")],
            vec![PathBuf::from("/host/deps")],
        )
    }

    #[test]
    fn test_marker_capture() {
        let (search, deps) = host_paths();
        let marker = PathMarker::capture(&search, &deps).unwrap();
        assert_eq!(marker.load_path(), Path::new("/host/two"));
        assert_eq!(marker.dependency_path(), Path::new("/host/deps"));
    }

    #[test]
    fn test_marker_capture_empty_list() {
        let err = PathMarker::capture(&[], &[PathBuf::from("/x")]).unwrap_err();
        assert!(matches!(err, OverlayError::MarkerNotFound { .. }));
    }

    #[test]
    fn test_injection_preserves_load_order_after_marker() {
        let tmp = tempdir().unwrap();
        let a = plugin_with_dirs(tmp.path(), "a", &["lib", "app/models"]);
        let b = plugin_with_dirs(tmp.path(), "b", &["lib"]);

        let (mut search, mut deps) = host_paths();
        let marker = PathMarker::capture(&search, &deps).unwrap();
        let mut injector = LoadPathInjector::new();

        injector.inject(&a, &marker, &mut search, &mut deps).unwrap();
        injector.inject(&b, &marker, &mut search, &mut deps).unwrap();

        // Host paths untouched and in original order; A's paths in declared
        // order (app/models before lib); B after A.
        assert_eq!(
            search,
            vec![
                PathBuf::from("/host/one"),
                PathBuf::from("/host/two"),
                a.root().join("app/models"),
                a.root().join("lib"),
                b.root().join("lib"),
            ]
        );
        assert_eq!(
            deps,
            vec![
                PathBuf::from("/host/deps"),
                a.root().join("app/models"),
                a.root().join("lib"),
                b.root().join("lib"),
            ]
        );
    }

    #[test]
    fn test_injection_is_idempotent() {
        let tmp = tempdir().unwrap();
        let a = plugin_with_dirs(tmp.path(), "a", &["lib"]);

        let (mut search, mut deps) = host_paths();
        let marker = PathMarker::capture(&search, &deps).unwrap();
        let mut injector = LoadPathInjector::new();

        injector.inject(&a, &marker, &mut search, &mut deps).unwrap();
        let once = search.clone();
        injector.inject(&a, &marker, &mut search, &mut deps).unwrap();

        assert_eq!(search, once);
    }

    #[test]
    fn test_injection_lands_before_host_entries_appended_later() {
        let tmp = tempdir().unwrap();
        let a = plugin_with_dirs(tmp.path(), "a", &["lib"]);
        let b = plugin_with_dirs(tmp.path(), "b", &["lib"]);

        let (mut search, mut deps) = host_paths();
        let marker = PathMarker::capture(&search, &deps).unwrap();
        let mut injector = LoadPathInjector::new();

        injector.inject(&a, &marker, &mut search, &mut deps).unwrap();
        // The host appends another entry after startup began.
        search.push(PathBuf::from("/host/late"));
        injector.inject(&b, &marker, &mut search, &mut deps).unwrap();

        assert_eq!(
            search,
            vec![
                PathBuf::from("/host/one"),
                PathBuf::from("/host/two"),
                a.root().join("lib"),
                b.root().join("lib"),
                PathBuf::from("/host/late"),
            ]
        );
    }

    #[test]
    fn test_missing_root_leaves_lists_intact() {
        let tmp = tempdir().unwrap();
        let a = plugin_with_dirs(tmp.path(), "a", &["lib"]);
        let ghost_dir = tmp.path().join("ghost");
        fs::create_dir_all(&ghost_dir).unwrap();
        let ghost = Plugin::from_root(&ghost_dir).unwrap();
        fs::remove_dir_all(&ghost_dir).unwrap();

        let (mut search, mut deps) = host_paths();
        let marker = PathMarker::capture(&search, &deps).unwrap();
        let mut injector = LoadPathInjector::new();

        injector.inject(&a, &marker, &mut search, &mut deps).unwrap();
        let before = search.clone();

        let err = injector
            .inject(&ghost, &marker, &mut search, &mut deps)
            .unwrap_err();
        assert!(matches!(err, OverlayError::PluginNotFound { .. }));
        assert_eq!(search, before);
    }

    #[test]
    fn test_marker_missing_from_list() {
        let tmp = tempdir().unwrap();
        let a = plugin_with_dirs(tmp.path(), "a", &["lib"]);

        let (search, deps) = host_paths();
        let marker = PathMarker::capture(&search, &deps).unwrap();
        let mut injector = LoadPathInjector::new();

        let mut replaced = vec![PathBuf::from("/elsewhere")];
        let mut deps = deps;
        let err = injector
            .inject(&a, &marker, &mut replaced, &mut deps)
            .unwrap_err();
        assert!(matches!(err, OverlayError::MarkerNotFound { .. }));
    }

    #[test]
    fn test_marker_missing_from_second_list_leaves_both_untouched() {
        let tmp = tempdir().unwrap();
        let a = plugin_with_dirs(tmp.path(), "a", &["lib"]);

        let (mut search, deps) = host_paths();
        let marker = PathMarker::capture(&search, &deps).unwrap();
        let mut injector = LoadPathInjector::new();

        // Marker still present in the search list but gone from the
        // dependency list.
        let mut replaced_deps = vec![PathBuf::from("/elsewhere")];
        let search_before = search.clone();

        let err = injector
            .inject(&a, &marker, &mut search, &mut replaced_deps)
            .unwrap_err();
        assert!(matches!(err, OverlayError::MarkerNotFound { .. }));
        assert_eq!(search, search_before);
        assert_eq!(replaced_deps, vec![PathBuf::from("/elsewhere")]);
        assert!(injector.injected_paths().is_empty());
    }
}
