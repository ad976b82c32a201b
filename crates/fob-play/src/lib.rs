//! # fob-play
//!
//! Runs browser unit tests headlessly: bundles the test files, serves them
//! on a local HTTP server, loads them into headless Chrome with mocha and
//! reports the failure count through the exit status.
//!
//! ## Architecture
//!
//! - [`build`] - `BuildStrategy` with rolldown and single-pass oxc
//!   implementations, plus the harness page
//! - [`server`] - serves the `BuildArtifact` with a static fallback
//! - [`collector`] - waits for `mochaStatus.finished` or a page fault
//! - [`ledger`] - every started resource and its release operation
//! - [`runner`] - `RunOrchestrator`, which sequences one run
//! - [`config`], [`discovery`], [`cli`], [`commands`] - the command-line layer
//!
//! ## Example Usage
//!
//! ```ignore
//! use fob_play::config::RunConfiguration;
//! use fob_play::runner::RunOrchestrator;
//!
//! let config = RunConfiguration::new(vec!["test/math.test.js".into()], "/project")?;
//! let outcome = RunOrchestrator::new(config).run().await?;
//! println!("{} failed", outcome.failed);
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod build;
pub mod cli;
pub mod collector;
pub mod commands;
pub mod config;
pub mod discovery;
pub mod entry;
pub mod error;
pub mod ledger;
pub mod logger;
pub mod runner;
pub mod server;
pub mod ui;

pub use error::{PlayError, Result};
pub use runner::{RunOrchestrator, RunOutcome};
