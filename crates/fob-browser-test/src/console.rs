//! Ordered relay of page console output.
//!
//! Console events arrive with argument handles that still live in the page.
//! Turning them into values takes a round trip per object, so two messages
//! emitted back to back can finish resolving in either order. The relay
//! resolves every message concurrently but prints them strictly in arrival
//! order: each print step waits for its predecessor's print step.
//!
//! ```text
//! event A ──resolve A──────────────┐
//! event B ──resolve B──┐           ▼
//!                      └──wait A──print A──► print B
//! ```
//!
//! The relay is split in two halves so the ordering logic can be driven
//! without a browser:
//!
//! - [`ConsoleRelay::spawn`] takes any stream of [`ConsoleEvent`]s
//! - [`ConsoleRelay::attach`] adapts `Runtime.consoleAPICalled` into that stream

use crate::error::{BrowserError, Result};
use crate::page::Page;
use chromiumoxide::cdp::js_protocol::runtime::{
    CallFunctionOnParams, ConsoleApiCalledType, EventConsoleApiCalled, RemoteObject,
    RemoteObjectSubtype, RemoteObjectType,
};
use chromiumoxide::page::Page as ChromePage;
use futures::future::BoxFuture;
use futures::{FutureExt, Stream, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// The console method a message was emitted with.
///
/// `console.clear()` has no variant: clearing is never forwarded to the
/// host terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConsoleKind {
    /// `console.log()`
    Log,
    /// `console.debug()`
    Debug,
    /// `console.info()`
    Info,
    /// `console.error()`
    Error,
    /// `console.warn()`
    Warning,
    /// `console.dir()`
    Dir,
    /// `console.dirxml()`
    Dirxml,
    /// `console.table()`
    Table,
    /// `console.trace()`
    Trace,
    /// `console.group()`
    StartGroup,
    /// `console.groupCollapsed()`
    StartGroupCollapsed,
    /// `console.groupEnd()`
    EndGroup,
    /// A failed `console.assert()`
    Assert,
    /// `console.profile()`
    Profile,
    /// `console.profileEnd()`
    ProfileEnd,
    /// `console.count()`
    Count,
    /// `console.timeEnd()`
    TimeEnd,
}

impl ConsoleKind {
    /// Maps a DevTools console type. Returns `None` for `clear`.
    #[must_use]
    pub fn from_cdp(kind: &ConsoleApiCalledType) -> Option<Self> {
        let kind = match kind {
            ConsoleApiCalledType::Log => ConsoleKind::Log,
            ConsoleApiCalledType::Debug => ConsoleKind::Debug,
            ConsoleApiCalledType::Info => ConsoleKind::Info,
            ConsoleApiCalledType::Error => ConsoleKind::Error,
            ConsoleApiCalledType::Warning => ConsoleKind::Warning,
            ConsoleApiCalledType::Dir => ConsoleKind::Dir,
            ConsoleApiCalledType::Dirxml => ConsoleKind::Dirxml,
            ConsoleApiCalledType::Table => ConsoleKind::Table,
            ConsoleApiCalledType::Trace => ConsoleKind::Trace,
            ConsoleApiCalledType::StartGroup => ConsoleKind::StartGroup,
            ConsoleApiCalledType::StartGroupCollapsed => ConsoleKind::StartGroupCollapsed,
            ConsoleApiCalledType::EndGroup => ConsoleKind::EndGroup,
            ConsoleApiCalledType::Assert => ConsoleKind::Assert,
            ConsoleApiCalledType::Profile => ConsoleKind::Profile,
            ConsoleApiCalledType::ProfileEnd => ConsoleKind::ProfileEnd,
            ConsoleApiCalledType::Count => ConsoleKind::Count,
            ConsoleApiCalledType::TimeEnd => ConsoleKind::TimeEnd,
            ConsoleApiCalledType::Clear => return None,
        };
        Some(kind)
    }

    /// Returns true for kinds that belong on stderr.
    #[must_use]
    pub fn is_stderr(self) -> bool {
        matches!(
            self,
            ConsoleKind::Error | ConsoleKind::Warning | ConsoleKind::Assert | ConsoleKind::Trace
        )
    }
}

/// A console message whose arguments have been resolved to values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleMessage {
    /// Console method used
    pub kind: ConsoleKind,

    /// Argument values in call order
    pub args: Vec<Value>,

    /// When the message was printed (host time)
    pub timestamp: SystemTime,
}

impl ConsoleMessage {
    /// Creates a message stamped with the current time.
    #[must_use]
    pub fn new(kind: ConsoleKind, args: Vec<Value>) -> Self {
        Self {
            kind,
            args,
            timestamp: SystemTime::now(),
        }
    }

    /// Formats the arguments the way a terminal console would: strings
    /// bare, everything else as compact JSON, separated by spaces.
    #[must_use]
    pub fn text(&self) -> String {
        self.args
            .iter()
            .map(|arg| match arg {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One console event as it enters the relay.
///
/// `args` is a pending resolution; the relay drives it concurrently with
/// the resolution of neighbouring events.
pub struct ConsoleEvent {
    /// Console method used
    pub kind: ConsoleKind,

    /// Pending argument values
    pub args: BoxFuture<'static, Result<Vec<Value>>>,
}

impl ConsoleEvent {
    /// An event whose arguments still need to be resolved.
    pub fn resolving<F>(kind: ConsoleKind, args: F) -> Self
    where
        F: Future<Output = Result<Vec<Value>>> + Send + 'static,
    {
        Self {
            kind,
            args: args.boxed(),
        }
    }

    /// An event that only carries the raw message text.
    #[must_use]
    pub fn text(kind: ConsoleKind, text: impl Into<String>) -> Self {
        let args = vec![Value::String(text.into())];
        Self {
            kind,
            args: futures::future::ready(Ok(args)).boxed(),
        }
    }
}

impl std::fmt::Debug for ConsoleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleEvent")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Where relayed messages end up.
pub trait ConsoleSink: Send + Sync + 'static {
    /// Receives one message. Calls arrive in page emission order.
    fn emit(&self, message: ConsoleMessage);
}

/// Prints relayed messages on the host's stdout and stderr.
///
/// Group markers indent subsequent output by two spaces per level.
#[derive(Debug, Default)]
pub struct HostConsole {
    depth: AtomicUsize,
}

impl HostConsole {
    /// Creates a console at indentation level zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders `message` into the line(s) that would be printed, or `None`
    /// if the message prints nothing. Updates group depth.
    pub fn render(&self, message: &ConsoleMessage) -> Option<String> {
        let text = message.text();
        let body = match message.kind {
            ConsoleKind::StartGroup | ConsoleKind::StartGroupCollapsed => {
                let depth = self.depth.fetch_add(1, Ordering::SeqCst);
                return (!text.is_empty()).then(|| indent(&text, depth));
            }
            ConsoleKind::EndGroup => {
                let _ = self
                    .depth
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |d| d.checked_sub(1));
                return None;
            }
            ConsoleKind::Assert if text.is_empty() => "Assertion failed".to_string(),
            ConsoleKind::Assert => format!("Assertion failed: {text}"),
            ConsoleKind::Trace => format!("Trace: {text}"),
            _ => text,
        };
        Some(indent(&body, self.depth.load(Ordering::SeqCst)))
    }
}

impl ConsoleSink for HostConsole {
    fn emit(&self, message: ConsoleMessage) {
        let Some(line) = self.render(&message) else {
            return;
        };
        if message.kind.is_stderr() {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }
}

fn indent(text: &str, depth: usize) -> String {
    if depth == 0 {
        return text.to_string();
    }
    let pad = "  ".repeat(depth);
    text.lines()
        .map(|line| format!("{pad}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// In-memory sink that keeps every relayed message.
///
/// Cheap to clone; clones share one buffer.
#[derive(Debug, Clone, Default)]
pub struct ConsoleCapture {
    messages: Arc<Mutex<Vec<ConsoleMessage>>>,
}

impl ConsoleCapture {
    /// Creates an empty capture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured messages, in relay order.
    #[must_use]
    pub fn messages(&self) -> Vec<ConsoleMessage> {
        self.messages.lock().clone()
    }

    /// Formatted text of every captured message, in relay order.
    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        self.messages.lock().iter().map(ConsoleMessage::text).collect()
    }

    /// Messages of one kind.
    #[must_use]
    pub fn messages_of_kind(&self, kind: ConsoleKind) -> Vec<ConsoleMessage> {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.kind == kind)
            .cloned()
            .collect()
    }

    /// Number of `console.error` messages.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.kind == ConsoleKind::Error)
            .count()
    }

    /// Number of captured messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    /// Returns true if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    /// Drops all captured messages.
    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

impl ConsoleSink for ConsoleCapture {
    fn emit(&self, message: ConsoleMessage) {
        self.messages.lock().push(message);
    }
}

/// A running relay from a console event stream to a sink.
///
/// Dropping the relay does not stop it; call [`detach`](Self::detach).
#[derive(Debug)]
pub struct ConsoleRelay {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ConsoleRelay {
    /// Relays `events` into `sink`, preserving event order.
    ///
    /// Each event's arguments start resolving as soon as the event arrives.
    /// A failed resolution is logged and skipped; later events still print.
    pub fn spawn<S>(events: S, sink: Arc<dyn ConsoleSink>) -> Self
    where
        S: Stream<Item = ConsoleEvent> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut events = Box::pin(events);
            let mut previous: Option<oneshot::Receiver<()>> = None;

            while let Some(event) = events.next().await {
                let (printed_tx, printed_rx) = oneshot::channel();
                let predecessor = previous.replace(printed_rx);
                let sink = Arc::clone(&sink);

                tokio::spawn(async move {
                    let ConsoleEvent { kind, args } = event;
                    let resolved = args.await;
                    if let Some(predecessor) = predecessor {
                        // Err only means the predecessor task went away.
                        let _ = predecessor.await;
                    }
                    match resolved {
                        Ok(args) => sink.emit(ConsoleMessage::new(kind, args)),
                        Err(e) => warn!("failed to resolve console.{kind:?} arguments: {e}"),
                    }
                    let _ = printed_tx.send(());
                });
            }

            if let Some(last) = previous {
                let _ = last.await;
            }
            debug!("console event stream ended");
        });

        Self {
            task: Mutex::new(Some(task)),
        }
    }

    /// Relays the console of `page` into `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if the console event subscription fails.
    pub async fn attach(page: &Page, sink: Arc<dyn ConsoleSink>) -> Result<Self> {
        let chrome = Arc::clone(page.inner());
        let listener = chrome.event_listener::<EventConsoleApiCalled>().await?;

        let events = listener.filter_map(move |event| {
            let chrome = Arc::clone(&chrome);
            async move {
                let kind = ConsoleKind::from_cdp(&event.r#type)?;
                Some(ConsoleEvent::resolving(kind, async move {
                    resolve_args(&chrome, &event.args).await
                }))
            }
        });

        Ok(Self::spawn(events, sink))
    }

    /// Stops listening for new events. Safe to call more than once.
    ///
    /// Messages already received still finish printing.
    pub fn detach(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }

    /// Returns true once [`detach`](Self::detach) has been called.
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.task.lock().is_none()
    }

    /// Waits until the event stream has ended and every message has printed.
    ///
    /// Returns immediately if the relay was detached.
    pub async fn finished(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

async fn resolve_args(page: &ChromePage, args: &[RemoteObject]) -> Result<Vec<Value>> {
    futures::future::try_join_all(args.iter().map(|arg| resolve_remote(page, arg))).await
}

/// Converts one remote console argument into a local value.
async fn resolve_remote(page: &ChromePage, object: &RemoteObject) -> Result<Value> {
    if let Some(value) = &object.value {
        return Ok(value.clone());
    }
    if let Some(unserializable) = &object.unserializable_value {
        return Ok(Value::String(unserializable.inner().clone()));
    }
    if object.r#type == RemoteObjectType::Undefined {
        return Ok(Value::String("undefined".to_string()));
    }

    let description = object.description.clone().map(Value::String);
    let is_error = object.subtype == Some(RemoteObjectSubtype::Error);
    let Some(object_id) = object.object_id.clone().filter(|_| !is_error) else {
        return Ok(description.unwrap_or(Value::Null));
    };

    let params = CallFunctionOnParams::builder()
        .function_declaration("function() { return this; }")
        .object_id(object_id)
        .return_by_value(true)
        .build()
        .map_err(BrowserError::ScriptExecutionFailed)?;

    let response = page.execute(params).await?;
    let by_value = response.result.result.value.clone();
    Ok(by_value.or(description).unwrap_or(Value::Null))
}
