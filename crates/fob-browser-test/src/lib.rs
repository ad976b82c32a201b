//! # fob-browser-test
//!
//! Headless Chrome session primitives built on chromiumoxide.
//!
//! This crate knows how to launch a browser, open a page that cannot be
//! blocked by native dialogs, notice when that page throws or crashes, and
//! relay its console to the host in the order the page produced it. It does
//! not know what is being tested; `fob-play` composes these pieces into a
//! test run.
//!
//! ## Architecture
//!
//! - **TestBrowser**: Manages the browser process lifecycle and opens pages
//!   in isolated browser contexts
//! - **Page**: A tab with navigation raced against page faults
//! - **PageFaults**: Latched first exception/crash of a page
//! - **ConsoleRelay**: Ordered console forwarding into a `ConsoleSink`
//! - **WaitConfig**: Bounded or unbounded polling waits
//!
//! ## Example Usage
//!
//! ```ignore
//! use fob_browser_test::{BrowserContextOptions, ConsoleRelay, HostConsole, TestBrowser, TestBrowserConfig};
//! use std::sync::Arc;
//!
//! let browser = TestBrowser::launch(TestBrowserConfig::default()).await?;
//! let page = browser.new_page(&BrowserContextOptions::default()).await?;
//! let relay = ConsoleRelay::attach(&page, Arc::new(HostConsole::new())).await?;
//!
//! page.navigate("http://127.0.0.1:3000/tests.html").await?;
//!
//! relay.detach();
//! browser.close().await?;
//! ```
//!
//! ## Testing Strategy
//!
//! 1. **Unit tests**: ordering, fault latching and waits, driven without a browser
//! 2. **Integration tests**: real browser tests (require Chrome installed)
//!
//! Run with `cargo test` (unit) or `cargo test -- --ignored` (integration).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod browser;
pub mod console;
pub mod error;
pub mod fault;
pub mod page;
pub mod wait;

// Re-export main types for convenience
pub use browser::{BrowserContextOptions, TestBrowser, TestBrowserConfig};
pub use console::{
    ConsoleCapture, ConsoleEvent, ConsoleKind, ConsoleMessage, ConsoleRelay, ConsoleSink,
    HostConsole,
};
pub use error::{BrowserError, PageFault, Result};
pub use fault::PageFaults;
pub use page::Page;
pub use wait::{wait_for, wait_for_result, WaitConfig, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT};
