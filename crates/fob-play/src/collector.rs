//! Waiting for the suite to finish and reading its failure count.
//!
//! The harness publishes `window.mochaStatus`. The collector polls it
//! without a deadline (mocha's own per-test timeouts bound the run) and
//! races the poll against the page's fault signal, so a page that throws
//! or crashes ends the wait immediately.

use crate::error::{PlayError, Result};
use async_trait::async_trait;
use fob_browser_test::{wait_for_result, BrowserError, Page, PageFaults, WaitConfig};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Expression reading the harness status in one round trip.
const STATUS_SCRIPT: &str = "(() => { \
    const status = window.mochaStatus; \
    return status \
        ? { finished: Boolean(status.finished), failed: Number(status.failed) || 0 } \
        : { finished: false, failed: 0 }; \
})()";

/// Snapshot of `window.mochaStatus`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct HarnessStatus {
    /// The run callback has fired
    pub finished: bool,
    /// Number of failed tests so far
    pub failed: u64,
}

/// Where the collector reads status and faults from.
#[async_trait]
pub trait StatusProbe: Send + Sync {
    /// Reads the current harness status.
    async fn status(&self) -> std::result::Result<HarnessStatus, BrowserError>;

    /// Fault signal of the page being observed.
    fn faults(&self) -> &PageFaults;
}

#[async_trait]
impl StatusProbe for Page {
    async fn status(&self) -> std::result::Result<HarnessStatus, BrowserError> {
        self.evaluate(STATUS_SCRIPT).await
    }

    fn faults(&self) -> &PageFaults {
        Page::faults(self)
    }
}

/// Awaits the end of a test run.
#[derive(Debug, Clone)]
pub struct ResultCollector {
    poll_interval: Duration,
}

impl Default for ResultCollector {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl ResultCollector {
    /// Creates a collector polling every `poll_interval`.
    #[must_use]
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// Waits until the suite reports completion and returns its failure count.
    ///
    /// # Errors
    ///
    /// Returns `PageFault` if the page throws or crashes first.
    pub async fn await_outcome<P: StatusProbe + ?Sized>(&self, probe: &P) -> Result<u64> {
        let config = WaitConfig::unbounded().poll_every(self.poll_interval);
        let finished = wait_for_result(
            move || async move { Ok::<_, BrowserError>(probe.status().await?.finished) },
            config,
            "mochaStatus.finished",
        );

        tokio::select! {
            fault = probe.faults().wait() => return Err(PlayError::PageFault(fault)),
            done = finished => done?,
        }

        let status = probe.status().await?;
        debug!("suite finished with {} failures", status.failed);
        Ok(status.failed)
    }
}
