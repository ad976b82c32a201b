//! Full runs in headless Chrome.
//!
//! These tests require Chrome/Chromium to be installed and are marked #[ignore].
//! Run with: cargo test --package fob-play -- --ignored
//!
//! A tiny mocha stand-in served from the fixture directory keeps them
//! independent of node_modules.

use fob_browser_test::{ConsoleCapture, PageFault};
use fob_play::config::{BundlerSelection, RunConfiguration, TranspileConfig};
use fob_play::error::PlayError;
use fob_play::RunOrchestrator;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

const MINI_MOCHA: &str = r"
(function () {
  var tests = [];
  var grep = null;
  var listeners = { pass: [] };
  window.describe = function (title, fn) { fn(); };
  window.it = function (title, fn) { tests.push({ title: title, fn: fn }); };
  window.mocha = {
    setup: function (options) { window.__setup = options; },
    grep: function (pattern) { grep = new RegExp(pattern); },
    run: function (done) {
      var runner = { on: function (event, fn) { (listeners[event] || []).push(fn); return runner; } };
      setTimeout(function () {
        var failures = 0;
        tests.forEach(function (test) {
          if (grep && !grep.test(test.title)) { return; }
          try {
            test.fn();
            console.log('pass: ' + test.title);
            listeners.pass.forEach(function (fn) { fn(test); });
          } catch (e) {
            failures++;
            console.error('fail: ' + test.title);
          }
        });
        done(failures);
      }, 0);
      return runner;
    }
  };
})();
";

fn fixture(files: &[(&str, &str)]) -> (TempDir, Vec<PathBuf>) {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("mini-mocha.js"), MINI_MOCHA).unwrap();
    let paths = files
        .iter()
        .map(|(name, content)| {
            let path = dir.path().join(name);
            std::fs::write(&path, content).unwrap();
            path
        })
        .collect();
    (dir, paths)
}

fn config(root: &Path, files: Vec<PathBuf>) -> RunConfiguration {
    let mut config = RunConfiguration::new(files, root).unwrap();
    config.preferred_port = 0;
    config.bundler = BundlerSelection::Transpile(TranspileConfig::default());
    config.harness.framework.script = "/mini-mocha.js".to_string();
    config.harness.framework.stylesheet = None;
    config
}

#[tokio::test]
#[ignore] // Requires Chrome to be installed
async fn counts_failures_and_relays_console_in_order() {
    let (dir, files) = fixture(&[
        (
            "a.test.js",
            "describe('a', () => { it('one', () => {}); it('two', () => { throw new Error('x'); }); });",
        ),
        (
            "b.test.ts",
            "const n: number = 3;\ndescribe('b', () => { it('three', () => { if (n !== 3) throw new Error(); }); });",
        ),
    ]);

    let capture = ConsoleCapture::new();
    let runner = RunOrchestrator::new(config(dir.path(), files))
        .with_console(Arc::new(capture.clone()));

    let outcome = runner.run().await.expect("run should complete");
    assert_eq!(outcome.failed, 1);
    assert!(!outcome.passed());
    assert_ne!(outcome.port, 0);
    assert!(runner.ledger().is_empty());

    let texts = capture.texts();
    let one = texts.iter().position(|t| t == "pass: one").unwrap();
    let two = texts.iter().position(|t| t == "fail: two").unwrap();
    let three = texts.iter().position(|t| t == "pass: three").unwrap();
    assert!(one < two && two < three);
}

#[tokio::test]
#[ignore]
async fn grep_reaches_the_page() {
    let (dir, files) = fixture(&[(
        "a.test.js",
        "it('kept', () => {}); it('dropped', () => { throw new Error('ran'); });",
    )]);

    let mut config = config(dir.path(), files);
    config.harness.grep = Some("kept".to_string());

    let outcome = RunOrchestrator::new(config).run().await.unwrap();
    assert!(outcome.passed());
}

#[tokio::test]
#[ignore]
async fn throwing_at_load_is_a_page_fault() {
    let (dir, files) = fixture(&[("a.test.js", "throw new Error('broken at load');")]);

    let runner = RunOrchestrator::new(config(dir.path(), files));
    let err = runner.run().await.unwrap_err();

    match err {
        PlayError::PageFault(PageFault::Exception { message }) => {
            assert!(message.contains("broken at load"), "{message}");
        }
        other => panic!("expected a page fault, got {other:?}"),
    }
    assert!(runner.ledger().is_empty());
}

#[tokio::test]
#[ignore]
async fn iterate_registers_each_test_repeatedly() {
    let (dir, files) = fixture(&[("a.test.js", "it('again', () => {});")]);

    let mut config = config(dir.path(), files);
    config.harness.iterate = 3;

    let capture = ConsoleCapture::new();
    let outcome = RunOrchestrator::new(config)
        .with_console(Arc::new(capture.clone()))
        .run()
        .await
        .unwrap();

    assert!(outcome.passed());
    let runs = capture.texts().iter().filter(|t| *t == "pass: again").count();
    assert_eq!(runs, 3);
}
