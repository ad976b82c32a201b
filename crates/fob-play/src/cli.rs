//! Command-line interface definition for fob-play.
//!
//! A single command: everything after the options is a list of globs
//! naming the test files to run.

use crate::config::BundlerKind;
use clap::Parser;
use std::path::PathBuf;

/// fob-play - Run browser unit tests in headless Chrome
#[derive(Parser, Debug)]
#[command(
    name = "fob-play",
    version,
    about = "Run browser unit tests in headless Chrome",
    long_about = "fob-play bundles your test files, serves them on a local HTTP server and\n\
                  runs them with mocha inside headless Chrome. Console output of the page is\n\
                  relayed to the terminal in order and the process exits non-zero when any\n\
                  test fails."
)]
pub struct Cli {
    /// Glob patterns of test files (e.g., "test/**/*.spec.ts")
    #[arg(value_name = "GLOB", required = true)]
    pub patterns: Vec<String>,

    /// Path to a config file
    ///
    /// Without this flag fob-play.config.json is looked up from the working
    /// directory upwards.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Bundler used to build the tests
    #[arg(short, long, value_enum)]
    pub bundler: Option<BundlerKind>,

    /// Keep the browser and server open with a visible window and devtools
    ///
    /// Uses the HTML reporter unless --reporter is given. Press Ctrl+C to
    /// close everything.
    #[arg(short, long)]
    pub watch: bool,

    /// Print the list of discovered test files
    #[arg(short = 'l', long)]
    pub list_files: bool,

    /// Per-test timeout in milliseconds
    #[arg(short, long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Preferred port of the HTTP server
    ///
    /// A free port is picked when this one is taken.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Only run tests matching this pattern
    #[arg(short, long, value_name = "PATTERN")]
    pub grep: Option<String>,

    /// Run every test this many times
    #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub iterate: Option<u32>,

    /// Mocha reporter (default: spec, or html with --watch)
    #[arg(long, value_name = "NAME")]
    pub reporter: Option<String>,

    /// Mocha interface (bdd, tdd, qunit, exports)
    #[arg(long, value_name = "NAME")]
    pub ui: Option<String>,

    /// Chrome/Chromium executable
    #[arg(long, value_name = "PATH")]
    pub chrome: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all output except errors and test output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}
