//! Terminal status lines of a run.
//!
//! Status output goes to stderr so stdout carries only the relayed page
//! console. Colors follow `NO_COLOR`/`FORCE_COLOR` and the terminal.

use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

/// Announces the discovered test files, listing them when asked.
pub fn found_test_files(files: &[PathBuf], cwd: &Path, list: bool) {
    eprintln!("{} {}", "ℹ".blue().bold(), found_summary(files.len(), cwd));
    if list {
        for file in files {
            eprintln!("  {}", relative(file, cwd).dimmed());
        }
    }
}

/// Warns that `--watch` will not end on its own in CI.
pub fn watch_in_ci() {
    eprintln!(
        "{} {}",
        "⚠".yellow().bold(),
        "--watch waits for Ctrl+C, which never comes in CI".yellow()
    );
}

/// Reports a failed run whose resources are being kept open.
pub fn run_failed(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message.red());
}

/// Tells the user how to end a run that was kept open.
pub fn kept_open() {
    eprintln!(
        "{} Browser and server are still open. Press {} to stop",
        "ℹ".blue().bold(),
        "Ctrl+C".bold()
    );
}

/// Confirms a clean run.
pub fn all_passed() {
    eprintln!("{} {}", "✓".green().bold(), "All tests passed".green());
}

fn found_summary(count: usize, cwd: &Path) -> String {
    format!("Found {count} test files in {}", cwd.display())
}

/// `path` relative to `cwd` when it lies below it.
fn relative(path: &Path, cwd: &Path) -> String {
    path.strip_prefix(cwd)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Check if running in a CI environment.
pub fn is_ci() -> bool {
    ["CI", "GITHUB_ACTIONS", "GITLAB_CI", "CIRCLECI", "TRAVIS"]
        .iter()
        .any(|var| std::env::var_os(var).is_some())
}

/// Check if colored status output should be enabled.
pub fn should_use_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::user_attended_stderr()
}

/// Initialize color support based on environment.
///
/// Should be called early in `main`. `--no-color` turns colors off for
/// the rest of the process.
pub fn init_colors(no_color: bool) {
    let enabled = !no_color && should_use_color();
    owo_colors::set_override(enabled);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_found_summary() {
        assert_eq!(
            found_summary(2, Path::new("/project")),
            "Found 2 test files in /project"
        );
    }

    #[test]
    fn test_relative_display() {
        let cwd = PathBuf::from("/project");
        assert_eq!(
            relative(&cwd.join("test/a.test.js"), &cwd),
            PathBuf::from("test/a.test.js").display().to_string()
        );
        assert_eq!(relative(Path::new("/elsewhere/b.js"), &cwd), "/elsewhere/b.js");
    }

    #[test]
    #[serial]
    fn test_is_ci_with_ci_var() {
        unsafe {
            std::env::set_var("CI", "true");
        }
        let detected = is_ci();
        unsafe {
            std::env::remove_var("CI");
        }
        assert!(detected);
    }

    #[test]
    #[serial]
    fn test_no_color_overrides_force() {
        unsafe {
            std::env::set_var("NO_COLOR", "1");
            std::env::set_var("FORCE_COLOR", "1");
        }
        let color = should_use_color();
        unsafe {
            std::env::remove_var("NO_COLOR");
            std::env::remove_var("FORCE_COLOR");
        }
        assert!(!color);
    }

    #[test]
    #[serial]
    fn test_force_color() {
        unsafe {
            std::env::remove_var("NO_COLOR");
            std::env::set_var("FORCE_COLOR", "1");
        }
        let color = should_use_color();
        unsafe {
            std::env::remove_var("FORCE_COLOR");
        }
        assert!(color);
    }
}
