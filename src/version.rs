//! Plugin version representations

use std::fmt;
use std::sync::Arc;

/// A plugin's declared version.
///
/// Plugins declare their version in one of three shapes: a literal string,
/// a major/minor/patch triple, or a callable computed at read time (for
/// versions derived from a file or build metadata). Resolution is lazy and
/// read-only; nothing is evaluated until [`VersionSpec::resolve`] is called.
#[derive(Clone)]
pub enum VersionSpec {
    /// Literal version string, used verbatim
    Literal(String),
    /// Semantic version triple
    Triple(semver::Version),
    /// Computed version, evaluated on each resolution
    Computed(Arc<dyn Fn() -> String + Send + Sync>),
}

impl VersionSpec {
    /// Create a literal version
    pub fn literal(version: impl Into<String>) -> Self {
        Self::Literal(version.into())
    }

    /// Create a version from a major/minor/patch triple
    pub fn triple(major: u64, minor: u64, patch: u64) -> Self {
        Self::Triple(semver::Version::new(major, minor, patch))
    }

    /// Create a computed version
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(f))
    }

    /// Resolve the version to a display string
    pub fn resolve(&self) -> String {
        match self {
            Self::Literal(s) => s.clone(),
            Self::Triple(v) => v.to_string(),
            Self::Computed(f) => f(),
        }
    }
}

impl fmt::Debug for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => f.debug_tuple("Literal").field(s).finish(),
            Self::Triple(v) => f.debug_tuple("Triple").field(&v.to_string()).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resolve())
    }
}
