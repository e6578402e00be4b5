//! Ordered plugin registry
//!
//! Insertion order is load order: the first plugin added has the lowest
//! precedence. The registry is plain in-memory state with no internal
//! locking; all mutation happens during the single-threaded startup window.

use crate::error::{OverlayError, OverlayResult};
use crate::plugin::Plugin;

/// Ordered collection of loaded plugins, keyed by unique name
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: Vec<Plugin>,
}

impl PluginRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a plugin in load order. Fails when a plugin with the same
    /// name is already registered.
    pub fn add(&mut self, plugin: Plugin) -> OverlayResult<()> {
        if self.contains(plugin.name()) {
            return Err(OverlayError::DuplicateName {
                name: plugin.name().to_string(),
            });
        }
        tracing::debug!(
            target: "overlay_registry",
            plugin = %plugin.name(),
            position = self.plugins.len(),
            "plugin registered"
        );
        self.plugins.push(plugin);
        Ok(())
    }

    /// Whether a plugin with exactly this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p.name() == name)
    }

    /// Look up a plugin by name, trying the exact name first and then
    /// `<name>_engine` for legacy compatibility. Absence is not an error.
    pub fn get(&self, name: &str) -> Option<&Plugin> {
        let engine_name = format!("{}_engine", name);
        self.plugins
            .iter()
            .find(|p| p.name() == name)
            .or_else(|| self.plugins.iter().find(|p| p.name() == engine_name))
    }

    /// Mutable variant of [`PluginRegistry::get`]
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Plugin> {
        let engine_name = format!("{}_engine", name);
        if self.plugins.iter().any(|p| p.name() == name) {
            self.plugins.iter_mut().find(|p| p.name() == name)
        } else {
            self.plugins.iter_mut().find(|p| p.name() == engine_name)
        }
    }

    /// Plugins in load order (first loaded first)
    pub fn load_order(&self) -> impl Iterator<Item = &Plugin> {
        self.plugins.iter()
    }

    /// Plugins in precedence order (most recently loaded first)
    pub fn precedence_order(&self) -> impl Iterator<Item = &Plugin> {
        self.plugins.iter().rev()
    }

    /// Registered plugin names, in load order
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(Plugin::name).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn plugin(root: &Path, name: &str) -> Plugin {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        Plugin::from_root(dir).unwrap()
    }

    #[test]
    fn test_load_and_precedence_order() {
        let tmp = tempdir().unwrap();
        let mut registry = PluginRegistry::new();
        for name in ["a", "b", "c"] {
            registry.add(plugin(tmp.path(), name)).unwrap();
        }

        let load: Vec<_> = registry.load_order().map(Plugin::name).collect();
        assert_eq!(load, vec!["a", "b", "c"]);

        let precedence: Vec<_> = registry.precedence_order().map(Plugin::name).collect();
        assert_eq!(precedence, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let tmp = tempdir().unwrap();
        let mut registry = PluginRegistry::new();
        registry.add(plugin(tmp.path(), "a")).unwrap();

        let err = registry.add(plugin(tmp.path(), "a")).unwrap_err();
        assert!(matches!(err, OverlayError::DuplicateName { name } if name == "a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_get_by_name_and_absence() {
        let tmp = tempdir().unwrap();
        let mut registry = PluginRegistry::new();
        registry.add(plugin(tmp.path(), "b")).unwrap();

        assert_eq!(registry.get("b").map(Plugin::name), Some("b"));
        assert!(registry.get("z").is_none());
    }

    #[test]
    fn test_get_engine_suffix_fallback() {
        let tmp = tempdir().unwrap();
        let mut registry = PluginRegistry::new();
        registry.add(plugin(tmp.path(), "login_engine")).unwrap();

        assert_eq!(registry.get("login").map(Plugin::name), Some("login_engine"));
    }

    #[test]
    fn test_get_prefers_exact_match() {
        let tmp = tempdir().unwrap();
        let mut registry = PluginRegistry::new();
        registry.add(plugin(tmp.path(), "login_engine")).unwrap();
        registry.add(plugin(tmp.path(), "login")).unwrap();

        assert_eq!(registry.get("login").map(Plugin::name), Some("login"));
    }

    #[test]
    fn test_get_mut_allows_load_phase_mutation() {
        let tmp = tempdir().unwrap();
        let mut registry = PluginRegistry::new();
        registry.add(plugin(tmp.path(), "a")).unwrap();

        registry.get_mut("a").unwrap().info = Some("auth plugin".to_string());
        assert_eq!(registry.get("a").unwrap().info.as_deref(), Some("auth plugin"));
    }
}
