//! Idempotent mirroring of plugin assets into the shared public tree
//!
//! Mirroring is best-effort: it runs on every process start, so it must be
//! cheap when nothing changed and must never abort startup over a single
//! unreadable file. Correctness-critical failures (the shared directory
//! itself cannot be created) still propagate.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::OverlayResult;
use crate::plugin::Plugin;

/// Sentinel dropped into the shared public directory on first creation
const PUBLIC_README: &str = "\
Files in this directory are automatically generated from the installed
plugins. They are copied from each plugin's 'assets' (or 'public')
directory every time the application starts. Any edits you make here will
NOT persist across the next restart; edit the files inside the plugin's
own asset directory instead.
";

/// Counters describing one mirroring pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorStats {
    /// Files copied because the destination was missing or differed
    pub files_copied: usize,
    /// Files skipped because source and destination were byte-identical
    pub files_unchanged: usize,
    /// Directories created under the mirrored tree
    pub dirs_created: usize,
    /// Entries that failed to mirror (logged, never fatal)
    pub failures: usize,
}

/// Copies plugin asset trees into the shared public directory, namespaced
/// by plugin name
#[derive(Debug, Clone)]
pub struct AssetMirror {
    public_root: PathBuf,
}

impl AssetMirror {
    pub fn new(public_root: impl Into<PathBuf>) -> Self {
        Self {
            public_root: public_root.into(),
        }
    }

    /// The shared public directory assets are mirrored into
    pub fn public_root(&self) -> &Path {
        &self.public_root
    }

    /// Ensure the shared public directory exists, writing the README
    /// sentinel the first time it is created
    pub async fn initialize_public_directory(&self) -> OverlayResult<()> {
        if !self.public_root.is_dir() {
            tracing::debug!(
                target: "overlay_mirror",
                path = ?self.public_root,
                "creating shared plugin public directory"
            );
            tokio::fs::create_dir_all(&self.public_root).await?;
        }
        let readme = self.public_root.join("README");
        if !readme.exists() {
            tokio::fs::write(&readme, PUBLIC_README).await?;
        }
        Ok(())
    }

    /// Mirror the plugin's public asset subtree into
    /// `<public_root>/<plugin name>/`.
    ///
    /// Files are copied only when the destination is missing or not
    /// byte-identical to the source, so repeated startup calls are cheap.
    /// Individual copy failures are logged as warnings and counted; they
    /// never abort the rest of the pass.
    pub async fn mirror(&self, plugin: &Plugin) -> OverlayResult<MirrorStats> {
        self.initialize_public_directory().await?;

        let mut stats = MirrorStats::default();
        let source = match plugin.public_directory() {
            Some(dir) => dir,
            None => {
                tracing::debug!(
                    target: "overlay_mirror",
                    plugin = %plugin.name(),
                    "plugin has no public directory, nothing to mirror"
                );
                return Ok(stats);
            }
        };

        let destination = plugin.asset_base_path(&self.public_root);
        tracing::debug!(
            target: "overlay_mirror",
            plugin = %plugin.name(),
            source = ?source,
            destination = ?destination,
            "mirroring plugin assets"
        );

        for entry in WalkDir::new(&source).into_iter().filter_map(|e| e.ok()) {
            let relative = match entry.path().strip_prefix(&source) {
                Ok(rel) => rel,
                Err(_) => continue,
            };
            let target = destination.join(relative);

            if entry.file_type().is_dir() {
                if !target.is_dir() {
                    if let Err(e) = tokio::fs::create_dir_all(&target).await {
                        tracing::warn!(
                            target: "overlay_mirror",
                            plugin = %plugin.name(),
                            path = ?target,
                            error = %e,
                            "failed to create mirrored directory"
                        );
                        stats.failures += 1;
                    } else {
                        stats.dirs_created += 1;
                    }
                }
            } else if entry.file_type().is_file() {
                match self.copy_if_changed(entry.path(), &target).await {
                    Ok(true) => stats.files_copied += 1,
                    Ok(false) => stats.files_unchanged += 1,
                    Err(e) => {
                        tracing::warn!(
                            target: "overlay_mirror",
                            plugin = %plugin.name(),
                            source = ?entry.path(),
                            destination = ?target,
                            error = %e,
                            "failed to mirror asset file"
                        );
                        stats.failures += 1;
                    }
                }
            }
        }

        Ok(stats)
    }

    /// Copy `source` to `target` unless the two are already byte-identical.
    /// Returns whether a copy happened.
    async fn copy_if_changed(&self, source: &Path, target: &Path) -> std::io::Result<bool> {
        if target.is_file() && Self::files_identical(source, target).await? {
            return Ok(false);
        }
        if let Some(parent) = target.parent() {
            if !parent.is_dir() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::copy(source, target).await?;
        Ok(true)
    }

    /// Byte-identity check: sizes first, then SHA-256 digests
    async fn files_identical(a: &Path, b: &Path) -> std::io::Result<bool> {
        let (meta_a, meta_b) = (
            tokio::fs::metadata(a).await?,
            tokio::fs::metadata(b).await?,
        );
        if meta_a.len() != meta_b.len() {
            return Ok(false);
        }
        Ok(Self::checksum(a).await? == Self::checksum(b).await?)
    }

    async fn checksum(path: &Path) -> std::io::Result<[u8; 32]> {
        let content = tokio::fs::read(path).await?;
        let mut hasher = Sha256::new();
        hasher.update(&content);
        Ok(hasher.finalize().into())
    }
}
