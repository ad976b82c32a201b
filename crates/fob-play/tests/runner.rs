//! Teardown guarantees of the orchestrator, driven without a browser.

use async_trait::async_trait;
use fob_browser_test::BrowserError;
use fob_play::build::{BuildArtifact, BuildStrategy, HARNESS_PATH, TESTS_SCRIPT_PATH};
use fob_play::config::{HarnessOptions, RunConfiguration};
use fob_play::error::{BuildError, PlayError, Result};
use fob_play::ledger::ResourceLedger;
use fob_play::RunOrchestrator;
use std::net::{Ipv4Addr, TcpListener};
use std::path::PathBuf;
use tempfile::TempDir;

/// Produces a fixed artifact without touching the test files.
struct Prebuilt;

#[async_trait]
impl BuildStrategy for Prebuilt {
    fn name(&self) -> &'static str {
        "prebuilt"
    }

    async fn build(
        &self,
        _test_files: &[PathBuf],
        _harness: &HarnessOptions,
        _ledger: &ResourceLedger,
    ) -> Result<BuildArtifact> {
        let mut artifact = BuildArtifact::new();
        artifact.insert(HARNESS_PATH, "<!doctype html>");
        artifact.insert(TESTS_SCRIPT_PATH, "");
        Ok(artifact)
    }
}

/// Always reports a compiler diagnostic.
struct Failing;

#[async_trait]
impl BuildStrategy for Failing {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn build(
        &self,
        _test_files: &[PathBuf],
        _harness: &HarnessOptions,
        _ledger: &ResourceLedger,
    ) -> Result<BuildArtifact> {
        Err(BuildError::Diagnostics {
            bundler: "failing",
            diagnostics: vec!["a.test.js:1:5: Unexpected token".to_string()],
        }
        .into())
    }
}

fn free_port() -> u16 {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    listener.local_addr().unwrap().port()
}

fn config(dir: &TempDir, port: u16, keep_open: bool) -> RunConfiguration {
    let mut config =
        RunConfiguration::new(vec![dir.path().join("a.test.js")], dir.path()).unwrap();
    config.preferred_port = port;
    config.keep_open = keep_open;
    // Never a real browser: launching must fail after the server is up.
    config.launch = config
        .launch
        .with_chrome_path(dir.path().join("no-such-chrome").display().to_string());
    config
}

#[tokio::test]
async fn build_failure_never_starts_a_server() {
    let dir = TempDir::new().unwrap();
    let port = free_port();
    let runner = RunOrchestrator::with_strategy(config(&dir, port, false), Box::new(Failing));

    let err = runner.run().await.unwrap_err();
    assert!(err.to_string().contains("Unexpected token"));
    assert!(runner.ledger().is_empty());
    assert!(TcpListener::bind((Ipv4Addr::LOCALHOST, port)).is_ok());
}

#[tokio::test]
async fn launch_failure_closes_the_server() {
    let dir = TempDir::new().unwrap();
    let port = free_port();
    let runner = RunOrchestrator::with_strategy(config(&dir, port, false), Box::new(Prebuilt));

    let err = runner.run().await.unwrap_err();
    assert!(
        matches!(err, PlayError::Browser(BrowserError::LaunchFailed { .. })),
        "unexpected error: {err:?}"
    );
    assert!(runner.ledger().is_empty());
    assert!(TcpListener::bind((Ipv4Addr::LOCALHOST, port)).is_ok());
}

#[tokio::test]
async fn keep_open_leaves_the_server_running() {
    let dir = TempDir::new().unwrap();
    let port = free_port();
    let runner = RunOrchestrator::with_strategy(config(&dir, port, true), Box::new(Prebuilt));

    runner.run().await.unwrap_err();
    assert_eq!(runner.ledger().names(), vec!["HTTP server"]);

    let response = reqwest::get(format!("http://127.0.0.1:{port}{HARNESS_PATH}"))
        .await
        .unwrap();
    assert!(response.status().is_success());

    runner.teardown().await;
    assert!(runner.ledger().is_empty());
    assert!(TcpListener::bind((Ipv4Addr::LOCALHOST, port)).is_ok());
}
