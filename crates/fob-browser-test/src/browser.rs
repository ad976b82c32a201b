//! Browser lifecycle management and process control.
//!
//! `TestBrowser` launches Chrome, drives its DevTools handler and opens
//! pages, each in its own browser context so cookies and storage never leak
//! between runs that share a process.
//!
//! # Resource Safety
//!
//! chromiumoxide kills the Chrome process when the `Browser` is dropped, so
//! a panicking test cannot leak it. Explicit `close()` is still preferred:
//! it shuts Chrome down gracefully and is what a resource ledger calls.

use crate::error::{BrowserError, Result};
use crate::page::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams,
};
use chromiumoxide::handler::viewport::Viewport;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Configuration for launching a test browser.
#[derive(Debug, Clone)]
pub struct TestBrowserConfig {
    /// Run in headless mode (default: true unless the `visible` feature is on).
    pub headless: bool,

    /// Open DevTools for every new tab. Only meaningful with a visible browser.
    pub devtools: bool,

    /// Browser window size (default: 1920x1080).
    pub window_size: (u32, u32),

    /// Additional Chrome arguments.
    pub args: Vec<String>,

    /// Chrome executable path (None = auto-detect).
    pub chrome_path: Option<String>,
}

impl TestBrowserConfig {
    /// Creates a new config with defaults for headless testing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables visible mode for debugging.
    #[must_use]
    pub fn visible(mut self) -> Self {
        self.headless = false;
        self
    }

    /// Opens DevTools alongside each tab.
    #[must_use]
    pub fn with_devtools(mut self, devtools: bool) -> Self {
        self.devtools = devtools;
        self
    }

    /// Sets a custom window size.
    #[must_use]
    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_size = (width, height);
        self
    }

    /// Adds additional Chrome arguments.
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args.extend(args);
        self
    }

    /// Uses a specific Chrome executable.
    #[must_use]
    pub fn with_chrome_path(mut self, path: impl Into<String>) -> Self {
        self.chrome_path = Some(path.into());
        self
    }

    /// Converts to chromiumoxide `BrowserConfig`.
    fn to_browser_config(&self) -> Result<BrowserConfig> {
        let mut config = BrowserConfig::builder()
            // Page size is applied per browser context, not per process.
            .viewport(None::<Viewport>);

        if !self.headless {
            config = config.with_head();
        }

        if self.devtools {
            config = config.arg("--auto-open-devtools-for-tabs");
        }

        config = config.arg(format!(
            "--window-size={},{}",
            self.window_size.0, self.window_size.1
        ));

        // A unique profile directory avoids ProcessSingleton conflicts when
        // several browsers run in parallel.
        let unique_id = uuid::Uuid::new_v4();
        let user_data_dir = std::env::temp_dir().join(format!("fob-play-{unique_id}"));
        config = config.arg(format!("--user-data-dir={}", user_data_dir.display()));

        for arg in &self.args {
            config = config.arg(arg.clone());
        }

        if let Some(path) = &self.chrome_path {
            config = config.chrome_executable(path.clone());
        }

        config.build().map_err(|e| BrowserError::LaunchFailed {
            reason: format!("invalid browser configuration: {e}"),
            source: None,
        })
    }
}

impl Default for TestBrowserConfig {
    fn default() -> Self {
        Self {
            headless: !cfg!(feature = "visible"),
            devtools: false,
            window_size: (1920, 1080),
            args: vec![
                // Disables Chrome's sandbox. Fine for CI containers running
                // local test code; never point this at untrusted content.
                "--no-sandbox".to_string(),
                // Prevents /dev/shm exhaustion in containerized environments
                "--disable-dev-shm-usage".to_string(),
            ],
            chrome_path: None,
        }
    }
}

/// Options for the isolated browsing context a page is opened in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserContextOptions {
    /// Emulated viewport size. `None` leaves the page at window size.
    pub viewport: Option<(u32, u32)>,
}

impl BrowserContextOptions {
    /// A context without viewport emulation.
    #[must_use]
    pub fn unconstrained() -> Self {
        Self { viewport: None }
    }
}

impl Default for BrowserContextOptions {
    fn default() -> Self {
        Self {
            viewport: Some((1280, 720)),
        }
    }
}

/// A managed browser instance.
pub struct TestBrowser {
    inner: Arc<Mutex<Option<Browser>>>,
    handler: JoinHandle<()>,
}

impl TestBrowser {
    /// Launches a new browser instance with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `LaunchFailed` if Chrome is not installed, not executable,
    /// or fails to start.
    pub async fn launch(config: TestBrowserConfig) -> Result<Self> {
        debug!("Launching browser with config: {:?}", config);

        let browser_config = config.to_browser_config()?;

        let (browser, mut handler) =
            Browser::launch(browser_config)
                .await
                .map_err(|e| BrowserError::LaunchFailed {
                    reason: e.to_string(),
                    source: Some(Box::new(e)),
                })?;

        // chromiumoxide only processes CDP traffic while the handler is polled.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("Browser handler error: {}", e);
                }
            }
        });

        debug!("Browser launched successfully");

        Ok(Self {
            inner: Arc::new(Mutex::new(Some(browser))),
            handler,
        })
    }

    /// Opens a page in a fresh browser context.
    ///
    /// The page comes back with dialog suppression and fault watching
    /// already installed, and with the context's viewport applied.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyClosed` if the browser has been closed, or
    /// `ConnectionFailed` if Chrome rejects the context or target.
    pub async fn new_page(&self, options: &BrowserContextOptions) -> Result<Page> {
        let mut guard = self.inner.lock().await;
        let browser = guard.as_mut().ok_or(BrowserError::AlreadyClosed)?;

        let context_id = browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
            .map_err(|e| BrowserError::ConnectionFailed(e.to_string()))?;

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id)
            .build()
            .map_err(BrowserError::ConnectionFailed)?;

        let chrome_page = browser
            .new_page(target)
            .await
            .map_err(|e| BrowserError::ConnectionFailed(e.to_string()))?;
        drop(guard);

        if let Some((width, height)) = options.viewport {
            chrome_page
                .execute(SetDeviceMetricsOverrideParams::new(
                    i64::from(width),
                    i64::from(height),
                    1.0,
                    false,
                ))
                .await?;
        }

        Page::new(chrome_page).await
    }

    /// Closes the browser and waits for the Chrome process to exit.
    ///
    /// Calling it again after a successful close is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the browser fails to close gracefully.
    pub async fn close(&self) -> Result<()> {
        let mut browser_guard = self.inner.lock().await;

        if let Some(mut browser) = browser_guard.take() {
            debug!("Closing browser gracefully");
            browser
                .close()
                .await
                .map_err(|e| BrowserError::ConnectionFailed(e.to_string()))?;
            if let Err(e) = browser.wait().await {
                warn!("failed to reap browser process: {e}");
            }
            self.handler.abort();
        }

        Ok(())
    }

    /// Returns true if the browser has been closed.
    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.is_none()
    }
}

impl std::fmt::Debug for TestBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestBrowser").finish_non_exhaustive()
    }
}

impl Drop for TestBrowser {
    fn drop(&mut self) {
        // Browser's own Drop kills the process if close() never ran.
        if let Ok(guard) = self.inner.try_lock() {
            if guard.is_some() {
                warn!("TestBrowser dropped without explicit close() - forcing shutdown via Drop");
            }
        }
        self.handler.abort();
    }
}
