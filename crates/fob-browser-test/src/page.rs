//! Page-level operations: navigation, scripting and fault racing.
//!
//! A [`Page`] is created with two things already installed:
//!
//! - a dialog suppressor, so `alert`/`confirm`/`prompt` never block an
//!   unattended run
//! - a [`PageFaults`] watcher, so any wait on the page can be cut short by an
//!   uncaught exception or a renderer crash

use crate::error::{BrowserError, Result};
use crate::fault::PageFaults;
use crate::wait::{wait_for_result, WaitConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use chromiumoxide::page::Page as ChromePage;
use futures::StreamExt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A browser page (tab) under test.
#[derive(Debug)]
pub struct Page {
    inner: Arc<ChromePage>,
    faults: PageFaults,
    tasks: Vec<JoinHandle<()>>,
}

impl Page {
    /// Wraps a fresh page and installs the dialog suppressor and fault
    /// watcher. Called by `TestBrowser::new_page`.
    pub(crate) async fn new(page: ChromePage) -> Result<Self> {
        let inner = Arc::new(page);
        let faults = PageFaults::new();

        let mut tasks = faults.watch(&inner).await?;
        tasks.push(suppress_dialogs(&inner).await?);

        Ok(Self {
            inner,
            faults,
            tasks,
        })
    }

    pub(crate) fn inner(&self) -> &Arc<ChromePage> {
        &self.inner
    }

    /// The fault signal of this page.
    #[must_use]
    pub fn faults(&self) -> &PageFaults {
        &self.faults
    }

    /// Navigates to an absolute URL.
    ///
    /// The navigation is raced against the page's fault signal: a script
    /// that throws while the document loads fails the call with
    /// [`BrowserError::PageFault`] instead of leaving it pending.
    ///
    /// # Errors
    ///
    /// Returns `PageFault` if the page threw or crashed first, or
    /// `NavigationFailed` if the navigation itself failed.
    pub async fn navigate(&self, url: &str) -> Result<()> {
        debug!("navigating to {url}");
        self.faults
            .race(async {
                self.inner
                    .goto(url)
                    .await
                    .map(|_| ())
                    .map_err(|e| BrowserError::NavigationFailed {
                        url: url.to_string(),
                        reason: e.to_string(),
                    })
            })
            .await
    }

    /// Waits for `document.readyState` to become `complete`.
    ///
    /// # Errors
    ///
    /// Returns `WaitTimeout` if the page does not finish loading in time.
    pub async fn wait_for_load(&self, config: WaitConfig) -> Result<()> {
        wait_for_result(
            move || async move {
                let state: String = self.evaluate("document.readyState").await?;
                Ok::<_, BrowserError>(state == "complete")
            },
            config,
            "document ready",
        )
        .await
    }

    /// Executes JavaScript in the page context and returns the result.
    ///
    /// Do not pass unsanitized input; embed values with
    /// `serde_json::to_string` instead of string concatenation.
    ///
    /// # Errors
    ///
    /// Returns an error if script execution fails or the result cannot be deserialized.
    pub async fn evaluate<T>(&self, script: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let result = self
            .inner
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::ScriptExecutionFailed(e.to_string()))?;

        result
            .into_value()
            .map_err(|e| BrowserError::ScriptExecutionFailed(e.to_string()))
    }

    /// Returns the current page URL.
    ///
    /// # Errors
    ///
    /// Returns an error if script execution fails.
    pub async fn url(&self) -> Result<String> {
        self.evaluate("window.location.href").await
    }

    /// Returns the page title.
    ///
    /// # Errors
    ///
    /// Returns an error if script execution fails.
    pub async fn title(&self) -> Result<String> {
        self.evaluate("document.title").await
    }
}

impl Drop for Page {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Dismisses every native dialog the page opens.
async fn suppress_dialogs(page: &Arc<ChromePage>) -> Result<JoinHandle<()>> {
    let mut dialogs = page
        .event_listener::<EventJavascriptDialogOpening>()
        .await?;
    let page = Arc::clone(page);

    Ok(tokio::spawn(async move {
        while let Some(dialog) = dialogs.next().await {
            debug!("dismissing {:?} dialog: {}", dialog.r#type, dialog.message);
            if let Err(e) = page.execute(HandleJavaScriptDialogParams::new(false)).await {
                warn!("failed to dismiss dialog: {e}");
            }
        }
    }))
}
