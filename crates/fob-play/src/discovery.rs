//! Test file discovery from glob patterns.
//!
//! Each pattern is split into a literal base directory and a glob part. The
//! base is walked with `ignore` (hidden files and git-ignored paths are
//! skipped) and only files matching the glob are kept. Results keep the
//! order of the patterns, are sorted within a pattern and contain every
//! file once.

use crate::error::{PlayError, Result};
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use indexmap::IndexSet;
use path_clean::PathClean;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

const GLOB_CHARS: &[char] = &['*', '?', '[', '{'];

/// Expands glob patterns relative to `cwd` into absolute test file paths.
///
/// # Errors
///
/// Returns `NoTestFiles` if no pattern matches a file, and a configuration
/// error if a pattern is not a valid glob.
pub fn find_test_files(patterns: &[String], cwd: &Path) -> Result<Vec<PathBuf>> {
    let mut files = IndexSet::new();

    for pattern in patterns {
        let mut matches = expand(pattern, cwd)?;
        debug!("{pattern}: {} files", matches.len());
        matches.sort();
        files.extend(matches);
    }

    if files.is_empty() {
        return Err(PlayError::NoTestFiles);
    }
    Ok(files.into_iter().collect())
}

fn expand(pattern: &str, cwd: &Path) -> Result<Vec<PathBuf>> {
    let (base, glob) = split_pattern(pattern);
    let base = cwd.join(base).clean();

    let Some(glob) = glob else {
        return Ok(if base.is_file() { vec![base] } else { vec![] });
    };
    if !base.is_dir() {
        return Ok(vec![]);
    }

    let overrides = OverrideBuilder::new(&base)
        .add(&format!("/{glob}"))
        .and_then(|builder| builder.build())
        .map_err(|e| crate::error::ConfigError::InvalidValue {
            field: "pattern".to_string(),
            value: pattern.to_string(),
            hint: format!("Not a valid glob: {e}"),
        })?;

    let mut matches = Vec::new();
    for entry in WalkBuilder::new(&base).overrides(overrides).build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("skipping unreadable path: {e}");
                continue;
            }
        };
        if entry.file_type().is_some_and(|t| t.is_file()) {
            matches.push(entry.into_path().clean());
        }
    }
    Ok(matches)
}

/// Splits `pattern` into the leading components without glob syntax and
/// the remainder, if any.
fn split_pattern(pattern: &str) -> (PathBuf, Option<String>) {
    let path = Path::new(pattern);
    let mut base = PathBuf::new();
    let mut rest = Vec::new();

    for component in path.components() {
        let text = component.as_os_str().to_string_lossy();
        if rest.is_empty() && !text.contains(GLOB_CHARS) {
            base.push(component);
            continue;
        }
        if !matches!(component, Component::CurDir) {
            rest.push(text.into_owned());
        }
    }

    if rest.is_empty() {
        (base, None)
    } else {
        (base, Some(rest.join("/")))
    }
}
