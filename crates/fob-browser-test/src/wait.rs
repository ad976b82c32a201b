//! Polling waits for page conditions.
//!
//! A condition is an async closure polled at a fixed interval. Waits are
//! bounded by default; [`WaitConfig::unbounded`] waits for as long as it
//! takes, for callers that bound the work some other way (for example a
//! per-test timeout enforced inside the page).

use crate::error::{BrowserError, Result};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Default timeout for wait operations (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default poll interval for checking conditions (100ms).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration for wait operations.
#[derive(Debug, Clone, Copy)]
pub struct WaitConfig {
    /// Maximum time to wait for the condition. `None` waits forever.
    pub timeout: Option<Duration>,

    /// How often to check if the condition is satisfied.
    pub poll_interval: Duration,
}

impl WaitConfig {
    /// Creates a bounded wait configuration.
    #[must_use]
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            poll_interval,
        }
    }

    /// Creates a config with custom timeout and default poll interval.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(timeout, DEFAULT_POLL_INTERVAL)
    }

    /// Creates a config that never times out.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            timeout: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Overrides the poll interval.
    #[must_use]
    pub fn poll_every(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn expired(&self, start: Instant) -> Option<Duration> {
        self.timeout.filter(|timeout| start.elapsed() >= *timeout)
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_POLL_INTERVAL)
    }
}

/// Waits for a condition to become true.
///
/// # Errors
///
/// Returns `WaitTimeout` if the config is bounded and the timeout expires.
pub async fn wait_for<F, Fut>(condition: F, config: WaitConfig, description: &str) -> Result<()>
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    let condition = &condition;
    wait_for_result(
        move || async move { Ok(condition().await) },
        config,
        description,
    )
    .await
}

/// Waits for a condition that returns a `Result<bool>`.
///
/// Errors from the condition are treated as transient and polling
/// continues; only the timeout ends the wait unsuccessfully.
///
/// # Errors
///
/// Returns `WaitTimeout` if the config is bounded and the timeout expires.
pub async fn wait_for_result<F, Fut>(
    condition: F,
    config: WaitConfig,
    description: &str,
) -> Result<()>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let start = Instant::now();

    loop {
        match condition().await {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(e) => tracing::trace!("{description}: transient error while polling: {e}"),
        }

        if let Some(timeout) = config.expired(start) {
            return Err(BrowserError::WaitTimeout {
                condition: description.to_string(),
                timeout,
            });
        }

        sleep(config.poll_interval).await;
    }
}
