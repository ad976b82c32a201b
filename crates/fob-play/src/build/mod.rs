//! Turning test files into a served artifact.
//!
//! A [`BuildStrategy`] takes the discovered test files and produces a
//! [`BuildArtifact`]: an in-memory set of files keyed by server path,
//! always including the harness page at [`HARNESS_PATH`]. Two strategies
//! exist:
//!
//! - [`RolldownStrategy`] bundles tests with everything they import
//! - [`TranspileStrategy`] strips types from each file and concatenates them
//!
//! Strategies register anything long-lived they start with the run's
//! [`ResourceLedger`] so it is torn down with the rest of the run.

mod harness;
mod rolldown;
mod transpile;

use crate::config::{BundlerSelection, HarnessOptions};
use crate::error::Result;
use crate::ledger::ResourceLedger;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

pub use harness::{render_harness, ScriptTag, OPTIONS_ELEMENT_ID};
pub use rolldown::{RolldownStrategy, TESTS_ENTRY};
pub use transpile::TranspileStrategy;

/// Server path of the page that runs the tests.
pub const HARNESS_PATH: &str = "/tests.html";

/// Server path of the compiled test code.
pub const TESTS_SCRIPT_PATH: &str = "/tests.js";

/// Produces a [`BuildArtifact`] from test files.
#[async_trait]
pub trait BuildStrategy: Send + Sync {
    /// Name used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Builds the artifact for `test_files`.
    ///
    /// # Errors
    ///
    /// Returns a build or configuration error; nothing is served in that case.
    async fn build(
        &self,
        test_files: &[PathBuf],
        harness: &HarnessOptions,
        ledger: &ResourceLedger,
    ) -> Result<BuildArtifact>;
}

/// Creates the strategy for a bundler selection.
#[must_use]
pub fn strategy_for(selection: &BundlerSelection, cwd: &Path) -> Box<dyn BuildStrategy> {
    match selection {
        BundlerSelection::Rolldown(config) => {
            Box::new(RolldownStrategy::new(config.clone(), cwd.to_path_buf()))
        }
        BundlerSelection::Transpile(config) => {
            Box::new(TranspileStrategy::new(config.clone(), cwd.to_path_buf()))
        }
    }
}

/// One in-memory file of an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactEntry {
    /// File contents
    pub content: Vec<u8>,
    /// Content hash used as the HTTP entity tag
    pub hash: String,
}

impl ArtifactEntry {
    /// Wraps `content`, hashing it.
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        let content = content.into();
        let hash = blake3::hash(&content).to_hex().as_str()[..16].to_string();
        Self { content, hash }
    }
}

/// In-memory files served in preference to anything on disk.
#[derive(Debug, Clone, Default)]
pub struct BuildArtifact {
    entries: IndexMap<String, ArtifactEntry>,
    /// Directory for paths the artifact doesn't hold; `None` means the run's cwd
    pub static_root: Option<PathBuf>,
}

impl BuildArtifact {
    /// Creates an empty artifact.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the static root.
    #[must_use]
    pub fn with_static_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.static_root = Some(root.into());
        self
    }

    /// Adds or replaces a file. `path` is normalized to start with `/`.
    pub fn insert(&mut self, path: impl AsRef<str>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref();
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        self.entries.insert(path, ArtifactEntry::new(content));
    }

    /// Looks up a file by server path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&ArtifactEntry> {
        self.entries.get(path)
    }

    /// Server paths in insertion order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the artifact holds no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_normalizes_path() {
        let mut artifact = BuildArtifact::new();
        artifact.insert("tests.js", "1");
        artifact.insert("/tests.html", "<html>");

        assert!(artifact.get("/tests.js").is_some());
        assert!(artifact.get("tests.js").is_none());
        assert_eq!(
            artifact.paths().collect::<Vec<_>>(),
            vec!["/tests.js", "/tests.html"]
        );
    }

    #[test]
    fn test_hash_tracks_content() {
        let a = ArtifactEntry::new("console.log(1)");
        let b = ArtifactEntry::new("console.log(1)");
        let c = ArtifactEntry::new("console.log(2)");

        assert_eq!(a.hash, b.hash);
        assert_ne!(a.hash, c.hash);
        assert_eq!(a.hash.len(), 16);
    }
}
