//! The `fob-play` command.
//!
//! Turns parsed arguments into a run: load configuration, discover test
//! files, run them once and map the outcome to the process result. With
//! `--watch` the server and browser stay up until Ctrl+C.

use crate::cli::Cli;
use crate::config::PlayConfig;
use crate::discovery::find_test_files;
use crate::error::{PlayError, Result};
use crate::runner::RunOrchestrator;
use crate::ui;
use std::future::Future;
use tokio::signal;

/// Execute a test run.
///
/// # Errors
///
/// Returns configuration and discovery errors, any fault of the run, and
/// `TestsFailed` when the suite completed with failures.
pub async fn execute(args: Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let config = PlayConfig::load(&args, &cwd)?;
    if args.watch && ui::is_ci() {
        ui::watch_in_ci();
    }

    let test_files = find_test_files(&args.patterns, &cwd)?;
    ui::found_test_files(&test_files, &cwd, args.list_files);

    let run = config.into_run_configuration(test_files, cwd, args.watch)?;
    let runner = RunOrchestrator::new(run);
    let outcome = runner.run().await;

    if runner.config().keep_open && !runner.ledger().is_empty() {
        if let Err(e) = &outcome {
            ui::run_failed(&e.to_string());
        }
        hold_open(&runner, signal::ctrl_c()).await?;
    }

    let outcome = outcome?;
    if !outcome.passed() {
        return Err(PlayError::TestsFailed(outcome.failed));
    }

    ui::all_passed();
    Ok(())
}

/// Keeps the run's resources up until `stop` resolves, then releases them.
///
/// Teardown happens even when waiting for `stop` fails.
async fn hold_open<F>(runner: &RunOrchestrator, stop: F) -> Result<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    ui::kept_open();
    let stopped = stop.await;
    runner.teardown().await;
    stopped.map_err(PlayError::from)
}
