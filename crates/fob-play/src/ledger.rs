//! Ownership record of everything a run has started.
//!
//! Each resource is registered the moment it exists, so a failure at any
//! later stage still leaves a complete list to tear down. Draining releases
//! all entries concurrently and never stops at the first failure.

use async_trait::async_trait;
use futures::future::{join_all, BoxFuture};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// A resource that can be shut down.
///
/// Implementations must tolerate being released more than once.
#[async_trait]
pub trait Release: Send + Sync {
    /// Shuts the resource down.
    async fn release(&self) -> anyhow::Result<()>;
}

type ReleaseFn = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<()>> + Send>;

/// One registered resource.
pub struct Closable {
    name: String,
    release: ReleaseFn,
}

impl Closable {
    /// Wraps an async shutdown closure.
    pub fn new<F, Fut>(name: impl Into<String>, release: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            release: Box::new(move || Box::pin(release())),
        }
    }

    /// Wraps a shared [`Release`] implementation.
    pub fn from_release<R>(name: impl Into<String>, resource: Arc<R>) -> Self
    where
        R: Release + ?Sized + 'static,
    {
        Self::new(name, move || async move { resource.release().await })
    }

    /// Name used in logs and drain reports.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for Closable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Closable").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Result of [`ResourceLedger::drain_all`].
#[derive(Debug, Default)]
pub struct DrainReport {
    /// Names of resources released cleanly
    pub released: Vec<String>,
    /// Names and errors of resources that failed to release
    pub failures: Vec<(String, anyhow::Error)>,
}

impl DrainReport {
    /// True when every resource released without error.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Ordered set of resources owned by one run.
#[derive(Debug, Default)]
pub struct ResourceLedger {
    entries: Mutex<Vec<Closable>>,
}

impl ResourceLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a shared resource.
    pub fn register<R>(&self, name: impl Into<String>, resource: Arc<R>)
    where
        R: Release + ?Sized + 'static,
    {
        self.push(Closable::from_release(name, resource));
    }

    /// Registers an async shutdown closure.
    pub fn register_fn<F, Fut>(&self, name: impl Into<String>, release: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.push(Closable::new(name, release));
    }

    /// Registers an already built [`Closable`].
    pub fn push(&self, closable: Closable) {
        debug!("registered {}", closable.name());
        self.entries.lock().push(closable);
    }

    /// Number of resources not yet drained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Names of the registered resources, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .map(|closable| closable.name.clone())
            .collect()
    }

    /// Releases every registered resource concurrently and empties the ledger.
    ///
    /// Failures are logged and collected; they never stop the others.
    /// Draining an empty ledger does nothing.
    pub async fn drain_all(&self) -> DrainReport {
        let entries = std::mem::take(&mut *self.entries.lock());
        if entries.is_empty() {
            return DrainReport::default();
        }

        debug!("releasing {} resources", entries.len());
        let results = join_all(entries.into_iter().map(|closable| async move {
            let Closable { name, release } = closable;
            let result = release().await;
            (name, result)
        }))
        .await;

        let mut report = DrainReport::default();
        for (name, result) in results {
            match result {
                Ok(()) => report.released.push(name),
                Err(e) => {
                    warn!("failed to release {name}: {e:#}");
                    report.failures.push((name, e));
                }
            }
        }
        report
    }
}
