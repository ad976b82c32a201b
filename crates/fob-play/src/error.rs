//! Error handling for test runs.
//!
//! Every failure of a run is a `PlayError`. Configuration and build problems
//! carry their own detailed enums so the message can tell the user what to
//! change, usually with a `Hint:` line.
//!
//! Test failures are not errors of the run itself. The orchestrator reports
//! them as a count in `RunOutcome`; the command layer turns a non-zero count
//! into [`PlayError::TestsFailed`] so the process exits non-zero.

use fob_browser_test::{BrowserError, PageFault};
use std::path::PathBuf;
use thiserror::Error;

mod report;

pub use report::into_report;

/// Top-level error of a test run.
#[derive(Debug, Error)]
pub enum PlayError {
    /// Discovery produced an empty file list.
    #[error("Cannot find any test files")]
    NoTestFiles,

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The selected bundler failed to produce a runnable artifact
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Neither the preferred port nor an ephemeral port could be bound
    #[error("Failed to start HTTP server on port {port}: {source}\n\nHint: Free the port or pass --port with another value")]
    Bind {
        /// Port the server tried first
        port: u16,
        /// Error of the last bind attempt
        #[source]
        source: std::io::Error,
    },

    /// The page under test threw an uncaught error or crashed.
    #[error("{0}")]
    PageFault(PageFault),

    /// The browser could not be launched or driven
    #[error("Browser error: {0}")]
    Browser(BrowserError),

    /// The suite completed with failing tests
    #[error("{0} tests failed!")]
    TestsFailed(u64),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<BrowserError> for PlayError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::PageFault(fault) => PlayError::PageFault(fault),
            other => PlayError::Browser(other),
        }
    }
}

impl From<PageFault> for PlayError {
    fn from(fault: PageFault) -> Self {
        PlayError::PageFault(fault)
    }
}

/// Configuration-specific errors.
///
/// Raised while loading the config file, merging overrides and shaping
/// bundler configuration. All of them are detected before anything is
/// started.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file passed with `--config` doesn't exist
    #[error("Config file not found: {}\n\nHint: Create a fob-play.config.json file or fix the --config path", .0.display())]
    NotFound(PathBuf),

    /// The layered configuration could not be extracted
    #[error("Failed to load configuration: {0}")]
    Load(String),

    /// Invalid value for a configuration option
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The invalid value
        value: String,
        /// Helpful hint for correct values
        hint: String,
    },

    /// An entry declaration is neither a string, a list of strings nor a map of those
    #[error("Unsupported entry: {found}\n\nHint: Use a path, an array of paths, or an object mapping names to either")]
    UnsupportedEntry {
        /// Short description of the offending value
        found: String,
    },

    /// A user entry uses the name reserved for the generated test bundle
    #[error("Entry name '{0}' is reserved for the test bundle\n\nHint: Rename that entry in bundlerConfig")]
    ReservedEntry(String),

    /// `bundlerConfig` does not fit the selected bundler
    #[error("Invalid {bundler} configuration: {message}\n\nHint: Check the 'bundlerConfig' field of your config file")]
    InvalidBundlerConfig {
        /// Bundler the configuration was meant for
        bundler: &'static str,
        /// Deserialization message
        message: String,
    },
}

/// Build errors.
///
/// Raised by a build strategy while turning test files into a served
/// artifact.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The bundler reported one or more diagnostics
    #[error("Errors while bundling with {bundler}:\n{}", .diagnostics.join("\n"))]
    Diagnostics {
        /// Name of the bundler that failed
        bundler: &'static str,
        /// Formatted diagnostics, one per entry
        diagnostics: Vec<String>,
    },

    /// The test harness page could not be rendered
    #[error("Failed to render test harness: {0}")]
    Harness(String),

    /// The bundle is missing an expected output file
    #[error("Bundler produced no output for '{0}'")]
    MissingOutput(String),

    /// A test file could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        /// File that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias using `PlayError` as the default error type.
pub type Result<T, E = PlayError> = std::result::Result<T, E>;
