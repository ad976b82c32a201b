//! Page-fatal signal shared by every wait on a page.
//!
//! A page can fail in two ways that no navigation or polling loop will ever
//! notice on its own: an exception escapes to the top level, or the
//! renderer dies. `PageFaults` latches the first such event and lets any
//! number of waiters race against it.

use crate::error::{BrowserError, PageFault, Result};
use chromiumoxide::cdp::browser_protocol::inspector::{self, EventTargetCrashed};
use chromiumoxide::cdp::js_protocol::runtime::EventExceptionThrown;
use chromiumoxide::page::Page as ChromePage;
use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Latched first-fault signal for one page.
///
/// Cheap to clone; all clones observe the same latch.
#[derive(Debug, Clone)]
pub struct PageFaults {
    tx: Arc<watch::Sender<Option<PageFault>>>,
}

impl PageFaults {
    /// Creates a signal with no fault raised.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Raises a fault. Only the first fault is kept.
    ///
    /// Returns `true` if this call latched the signal.
    pub fn raise(&self, fault: PageFault) -> bool {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(fault);
            true
        })
    }

    /// Returns the latched fault, if any.
    #[must_use]
    pub fn current(&self) -> Option<PageFault> {
        self.tx.borrow().clone()
    }

    /// Resolves with the first fault. Never resolves on a healthy page.
    pub async fn wait(&self) -> PageFault {
        let mut rx = self.tx.subscribe();
        match rx.wait_for(Option::is_some).await {
            Ok(fault) => fault.clone().unwrap_or(PageFault::Crashed),
            // The sender lives as long as `self`, so this is unreachable in
            // practice; park instead of inventing a fault.
            Err(_) => std::future::pending().await,
        }
    }

    /// Runs `operation` unless the page faults first.
    ///
    /// A fault latched while `operation` was running wins over its result,
    /// so an exception thrown during a navigation that still completed is
    /// not lost. Errors of `operation` itself are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `PageFault` on a fault, otherwise whatever `operation` returns.
    pub async fn race<F, T>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            fault = self.wait() => Err(fault.into()),
            outcome = operation => {
                let value = outcome?;
                match self.current() {
                    Some(fault) => Err(BrowserError::PageFault(fault)),
                    None => Ok(value),
                }
            }
        }
    }

    /// Subscribes to exception and crash events of `page`.
    ///
    /// The returned tasks feed this signal until aborted.
    pub(crate) async fn watch(&self, page: &Arc<ChromePage>) -> Result<Vec<JoinHandle<()>>> {
        page.execute(inspector::EnableParams::default()).await?;

        let mut exceptions = page.event_listener::<EventExceptionThrown>().await?;
        let mut crashes = page.event_listener::<EventTargetCrashed>().await?;

        let faults = self.clone();
        let exception_task = tokio::spawn(async move {
            while let Some(event) = exceptions.next().await {
                let fault = exception_fault(&event);
                debug!("page raised {fault}");
                faults.raise(fault);
            }
        });

        let faults = self.clone();
        let crash_task = tokio::spawn(async move {
            if crashes.next().await.is_some() {
                debug!("page renderer crashed");
                faults.raise(PageFault::Crashed);
            }
        });

        Ok(vec![exception_task, crash_task])
    }
}

impl Default for PageFaults {
    fn default() -> Self {
        Self::new()
    }
}

fn exception_fault(event: &EventExceptionThrown) -> PageFault {
    let details = &event.exception_details;
    let message = details
        .exception
        .as_ref()
        .and_then(|exception| exception.description.clone())
        .unwrap_or_else(|| details.text.clone());
    PageFault::Exception { message }
}
