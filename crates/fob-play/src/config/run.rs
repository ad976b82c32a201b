//! Resolved, immutable description of one test run.

use crate::config::defaults::*;
use crate::entry::EntrySpec;
use crate::error::{ConfigError, PlayError, Result};
use fob_browser_test::{BrowserContextOptions, TestBrowserConfig};
use rolldown::BundlerOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything the orchestrator needs. Built once, never mutated by a run.
#[derive(Debug, Clone)]
pub struct RunConfiguration {
    /// Absolute test files, in discovery order
    pub test_files: Vec<PathBuf>,
    /// Port tried first by the dev server
    pub preferred_port: u16,
    /// Build strategy and its user configuration
    pub bundler: BundlerSelection,
    /// How to launch the browser process
    pub launch: TestBrowserConfig,
    /// Settings of the browser context the page is opened in
    pub context: BrowserContextOptions,
    /// Leave server and browser running after the outcome is known
    pub keep_open: bool,
    /// Options forwarded to the test framework in the page
    pub harness: HarnessOptions,
    /// Directory used to resolve relative paths and as default static root
    pub cwd: PathBuf,
}

impl RunConfiguration {
    /// Creates a configuration with default settings.
    ///
    /// # Errors
    ///
    /// Returns `NoTestFiles` if `test_files` is empty.
    pub fn new(test_files: Vec<PathBuf>, cwd: impl Into<PathBuf>) -> Result<Self> {
        if test_files.is_empty() {
            return Err(PlayError::NoTestFiles);
        }

        Ok(Self {
            test_files,
            preferred_port: default_port(),
            bundler: BundlerSelection::default(),
            launch: TestBrowserConfig::default(),
            context: BrowserContextOptions::default(),
            keep_open: false,
            harness: HarnessOptions::default(),
            cwd: cwd.into(),
        })
    }
}

/// Options of the test framework running in the page.
///
/// Serialized (without `framework`) into the harness page, where the setup
/// script reads them back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarnessOptions {
    /// Interface style, e.g. `bdd` or `tdd`
    pub ui: String,
    /// Reporter name
    pub reporter: String,
    /// Per-test timeout in milliseconds
    #[serde(rename = "timeout")]
    pub timeout_ms: u64,
    /// Colored reporter output
    pub color: bool,
    /// Only run tests matching this pattern
    pub grep: Option<String>,
    /// How many times each test is registered
    pub iterate: u32,
    /// Where the framework is loaded from
    #[serde(skip)]
    pub framework: FrameworkAssets,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            ui: default_ui(),
            reporter: default_reporter().to_string(),
            timeout_ms: default_timeout(),
            color: true,
            grep: None,
            iterate: default_iterate(),
            framework: FrameworkAssets::default(),
        }
    }
}

/// Server paths of the test framework's script and stylesheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FrameworkAssets {
    /// Script defining the global `mocha`
    #[serde(default = "default_framework_script")]
    pub script: String,
    /// Optional stylesheet for the HTML reporter
    #[serde(default = "default_framework_stylesheet")]
    pub stylesheet: Option<String>,
}

impl Default for FrameworkAssets {
    fn default() -> Self {
        Self {
            script: default_framework_script(),
            stylesheet: default_framework_stylesheet(),
        }
    }
}

/// Which build strategy runs, together with its configuration.
#[derive(Debug, Clone)]
pub enum BundlerSelection {
    /// Full module bundling
    Rolldown(RolldownConfig),
    /// Per-file transpilation, no import resolution
    Transpile(TranspileConfig),
}

impl Default for BundlerSelection {
    fn default() -> Self {
        BundlerSelection::Rolldown(RolldownConfig::default())
    }
}

impl BundlerSelection {
    /// Short bundler name for messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            BundlerSelection::Rolldown(_) => "rolldown",
            BundlerSelection::Transpile(_) => "transpile",
        }
    }
}

/// Native rolldown options fob-play always sets itself.
const ROLLDOWN_OWNED: [(&str, &str); 4] = [
    ("input", "list the modules under 'entry' instead"),
    ("format", "the harness loads ES modules"),
    ("platform", "tests always run in the browser"),
    ("sourcemap", "source maps are always inlined"),
];

/// User configuration for the rolldown strategy.
///
/// Every key other than `entry`, `cwd` and `external` is a native rolldown
/// option and is handed to the bundler as-is.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolldownConfig {
    /// Additional entries bundled next to the tests
    #[serde(default)]
    pub entry: EntrySpec,
    /// Bundling context and static root; defaults to the run's cwd
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    /// Module specifiers left to the page to provide
    #[serde(default)]
    pub external: Vec<String>,
    /// Remaining native options, such as `define` or `resolve`
    #[serde(flatten)]
    pub native: serde_json::Map<String, serde_json::Value>,
}

impl RolldownConfig {
    /// Reads `bundlerConfig` for rolldown.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBundlerConfig` on wrong types, on keys rolldown does
    /// not know, and on options fob-play sets itself.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let config: Self = bundler_config("rolldown", value)?;
        config.native_options()?;
        Ok(config)
    }

    /// The native options as rolldown reads them.
    ///
    /// # Errors
    ///
    /// Same as [`RolldownConfig::from_value`].
    pub fn native_options(&self) -> Result<BundlerOptions, ConfigError> {
        if let Some((key, reason)) = ROLLDOWN_OWNED
            .iter()
            .find(|(key, _)| self.native.contains_key(*key))
        {
            return Err(ConfigError::InvalidBundlerConfig {
                bundler: "rolldown",
                message: format!("'{key}' is managed by fob-play: {reason}"),
            });
        }

        serde_json::from_value(serde_json::Value::Object(self.native.clone())).map_err(|e| {
            ConfigError::InvalidBundlerConfig {
                bundler: "rolldown",
                message: e.to_string(),
            }
        })
    }
}

/// User configuration for the transpile strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TranspileConfig {
    /// Static root of the dev server; defaults to the run's cwd
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    /// Code placed before the first test file
    #[serde(default)]
    pub banner: Option<String>,
}

impl TranspileConfig {
    /// Reads `bundlerConfig` for the transpiler.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBundlerConfig` on unknown fields or wrong types.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        bundler_config("transpile", value)
    }
}

fn bundler_config<T>(bundler: &'static str, value: serde_json::Value) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value).map_err(|e| ConfigError::InvalidBundlerConfig {
        bundler,
        message: e.to_string(),
    })
}
