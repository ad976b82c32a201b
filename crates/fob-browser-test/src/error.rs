//! Error types for browser session operations.
//!
//! Launch, navigation and scripting failures are kept apart from page
//! faults. A page fault is something the page itself did (threw, crashed)
//! and callers usually want to report it verbatim instead of as a
//! browser malfunction.

use std::time::Duration;
use thiserror::Error;

/// A fatal condition raised by the page under test.
///
/// Produced by [`PageFaults`](crate::fault::PageFaults) and used to cut
/// short whichever wait is in progress when it fires.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageFault {
    /// An exception escaped to the top level of the page.
    #[error("page error: {message}")]
    Exception {
        /// Description reported by the runtime, usually including the stack
        message: String,
    },

    /// The renderer process for the page died.
    #[error("page crashed")]
    Crashed,
}

/// The main error type for all browser session operations.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Failed to launch the browser process.
    ///
    /// This typically occurs when Chrome/Chromium is not installed,
    /// or when there are permission issues with the executable.
    #[error("failed to launch browser: {reason}")]
    LaunchFailed {
        /// Human-readable reason for the launch failure
        reason: String,
        /// Optional underlying error that caused the failure
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A DevTools command needed to set up the session was rejected.
    #[error("CDP connection failed: {0}")]
    ConnectionFailed(String),

    /// Navigation to a URL failed.
    #[error("navigation to '{url}' failed: {reason}")]
    NavigationFailed {
        /// The URL that failed to load
        url: String,
        /// Reason for the navigation failure
        reason: String,
    },

    /// A bounded wait condition was not satisfied in time.
    #[error("wait condition '{condition}' timed out after {timeout:?}")]
    WaitTimeout {
        /// Description of the condition that timed out
        condition: String,
        /// How long we waited before timing out
        timeout: Duration,
    },

    /// JavaScript execution in the page context failed.
    #[error("JavaScript execution failed: {0}")]
    ScriptExecutionFailed(String),

    /// The page threw or crashed while we were waiting on it.
    #[error(transparent)]
    PageFault(#[from] PageFault),

    /// An operation was attempted on a closed browser instance.
    #[error("browser instance is already closed")]
    AlreadyClosed,

    /// Wraps errors from the chromiumoxide library.
    #[error("chromiumoxide error: {0}")]
    ChromiumOxide(#[from] chromiumoxide::error::CdpError),

    /// Generic I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BrowserError {
    /// Returns the page fault if this error was caused by one.
    #[must_use]
    pub fn as_page_fault(&self) -> Option<&PageFault> {
        match self {
            BrowserError::PageFault(fault) => Some(fault),
            _ => None,
        }
    }
}

/// A specialized Result type for browser operations.
pub type Result<T> = std::result::Result<T, BrowserError>;
