//! Configuration system for test runs with multi-source loading.
//!
//! Merges settings from CLI args, environment variables, and the config file.
//! Priority: CLI > Environment > File > Defaults
//!
//! The merged `PlayConfig` is then resolved into a [`RunConfiguration`],
//! the immutable input of the orchestrator.

mod defaults;
mod loading;
mod run;
mod tests;

use crate::error::{ConfigError, Result};
use fob_browser_test::{BrowserContextOptions, TestBrowserConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use defaults::*;
pub use loading::find_config_file;
pub use run::*;

/// Selects the build strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BundlerKind {
    /// Bundle with rolldown, resolving imports
    Rolldown,
    /// Transpile each file on its own
    Transpile,
}

/// Browser process settings of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BrowserSettings {
    /// Chrome/Chromium executable; auto-detected when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<PathBuf>,

    /// Extra command-line arguments for Chrome
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Browser window size as `[width, height]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_size: Option<(u32, u32)>,
}

/// Test run configuration - loaded from fob-play.config.json, env and CLI args.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PlayConfig {
    /// Build strategy
    #[serde(default = "default_bundler")]
    pub bundler: BundlerKind,

    /// Configuration handed to the selected bundler
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub bundler_config: serde_json::Value,

    /// Preferred dev server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-test timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Test interface style (bdd, tdd, ...)
    #[serde(default = "default_ui")]
    pub ui: String,

    /// Reporter; defaults to `spec`, or `html` in watch mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter: Option<String>,

    /// Colored reporter output
    #[serde(default = "default_color")]
    pub color: bool,

    /// Only run tests matching this pattern
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grep: Option<String>,

    /// Repeat every test this many times
    #[serde(default = "default_iterate")]
    pub iterate: u32,

    /// Where the test framework is served from
    #[serde(default)]
    pub framework: FrameworkAssets,

    /// Browser process settings
    #[serde(default)]
    pub browser: BrowserSettings,
}

impl Default for PlayConfig {
    fn default() -> Self {
        Self {
            bundler: default_bundler(),
            bundler_config: serde_json::Value::Null,
            port: default_port(),
            timeout: default_timeout(),
            ui: default_ui(),
            reporter: None,
            color: default_color(),
            grep: None,
            iterate: default_iterate(),
            framework: FrameworkAssets::default(),
            browser: BrowserSettings::default(),
        }
    }
}

impl PlayConfig {
    /// Validate configuration values that types alone don't constrain.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.iterate == 0 {
            return Err(invalid("iterate", "0", "Must be at least 1"));
        }
        if self.timeout == 0 {
            return Err(invalid(
                "timeout",
                "0",
                "Use a positive number of milliseconds",
            ));
        }
        if self.port == 0 {
            return Err(invalid(
                "port",
                "0",
                "Use a real port; a free port is picked automatically if it is taken",
            ));
        }
        if self.ui.trim().is_empty() {
            return Err(invalid("ui", "\"\"", "Use an interface such as bdd or tdd"));
        }
        if self.framework.script.trim().is_empty() {
            return Err(invalid(
                "framework.script",
                "\"\"",
                "Point it at the server path of mocha.js",
            ));
        }
        if let Some((width, height)) = self.browser.window_size {
            if width == 0 || height == 0 {
                return Err(invalid(
                    "browser.windowSize",
                    &format!("[{width}, {height}]"),
                    "Both dimensions must be positive",
                ));
            }
        }
        Ok(())
    }

    /// Resolves into the orchestrator's input.
    ///
    /// Watch mode keeps everything open, shows the browser with devtools,
    /// drops the viewport limit and defaults to the HTML reporter.
    ///
    /// # Errors
    ///
    /// Returns `NoTestFiles` for an empty file list and `InvalidBundlerConfig`
    /// when `bundlerConfig` doesn't fit the selected bundler.
    pub fn into_run_configuration(
        self,
        test_files: Vec<PathBuf>,
        cwd: PathBuf,
        watch: bool,
    ) -> Result<RunConfiguration> {
        let mut run = RunConfiguration::new(test_files, cwd)?;

        run.bundler = match self.bundler {
            BundlerKind::Rolldown => {
                BundlerSelection::Rolldown(RolldownConfig::from_value(self.bundler_config)?)
            }
            BundlerKind::Transpile => {
                BundlerSelection::Transpile(TranspileConfig::from_value(self.bundler_config)?)
            }
        };
        run.preferred_port = self.port;
        run.keep_open = watch;

        let default_reporter = if watch {
            default_watch_reporter()
        } else {
            default_reporter()
        };
        run.harness = HarnessOptions {
            ui: self.ui,
            reporter: self
                .reporter
                .unwrap_or_else(|| default_reporter.to_string()),
            timeout_ms: self.timeout,
            color: self.color,
            grep: self.grep,
            iterate: self.iterate,
            framework: self.framework,
        };

        let mut launch = TestBrowserConfig::default().with_args(self.browser.args);
        if let Some(path) = self.browser.chrome_path {
            launch = launch.with_chrome_path(path.to_string_lossy().into_owned());
        }
        if let Some((width, height)) = self.browser.window_size {
            launch = launch.with_window_size(width, height);
        }
        if watch {
            launch = launch.visible().with_devtools(true);
            run.context = BrowserContextOptions::unconstrained();
        }
        run.launch = launch;

        Ok(run)
    }
}

fn invalid(field: &str, value: &str, hint: &str) -> crate::error::PlayError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        hint: hint.to_string(),
    }
    .into()
}
