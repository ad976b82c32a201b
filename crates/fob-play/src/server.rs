//! HTTP server for the test harness.
//!
//! Requests are answered from the build artifact first, then from the
//! static root on disk. Artifact responses carry an entity tag derived
//! from the content hash and are never cached without revalidation.

use crate::build::BuildArtifact;
use crate::error::{PlayError, Result};
use crate::ledger::Release;
use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use parking_lot::Mutex;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tracing::{debug, warn};

/// How long `close` waits for open connections to finish.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Serves a build artifact over HTTP.
pub struct DevServer {
    artifact: Arc<BuildArtifact>,
    static_root: PathBuf,
}

impl DevServer {
    /// Creates a server for `artifact`. Paths the artifact lacks are served
    /// from its static root, or from `default_root` if it has none.
    #[must_use]
    pub fn new(artifact: BuildArtifact, default_root: &Path) -> Self {
        let static_root = artifact
            .static_root
            .clone()
            .unwrap_or_else(|| default_root.to_path_buf());
        Self {
            artifact: Arc::new(artifact),
            static_root,
        }
    }

    /// Builds the router.
    pub fn router(&self) -> Router {
        Router::new()
            .fallback_service(ServeDir::new(&self.static_root))
            .layer(middleware::from_fn_with_state(
                Arc::clone(&self.artifact),
                serve_artifact,
            ))
    }

    /// Binds and starts serving in the background.
    ///
    /// Tries `127.0.0.1:preferred_port` first and falls back to a port
    /// chosen by the OS.
    ///
    /// # Errors
    ///
    /// Returns `Bind` if neither address can be bound.
    pub async fn start(self, preferred_port: u16) -> Result<ServerHandle> {
        let listener = bind(preferred_port).await?;
        let addr = listener.local_addr()?;
        let router = self.router();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        debug!("serving {} from {}", addr, self.static_root.display());
        Ok(ServerHandle {
            addr,
            shutdown: Mutex::new(Some(shutdown_tx)),
            task: Mutex::new(Some(task)),
        })
    }
}

async fn bind(preferred_port: u16) -> Result<TcpListener> {
    match TcpListener::bind((Ipv4Addr::LOCALHOST, preferred_port)).await {
        Ok(listener) => Ok(listener),
        Err(e) => {
            debug!("port {preferred_port} unavailable ({e}), asking the OS for one");
            TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
                .await
                .map_err(|source| PlayError::Bind {
                    port: preferred_port,
                    source,
                })
        }
    }
}

/// A running server. Closing it more than once is harmless.
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    task: Mutex<Option<JoinHandle<std::io::Result<()>>>>,
}

impl ServerHandle {
    /// Bound port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Bound address.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Absolute URL of a server path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Stops accepting connections and waits for the server task.
    ///
    /// # Errors
    ///
    /// Returns the server's I/O error, if it failed while running.
    pub async fn close(&self) -> std::io::Result<()> {
        if let Some(shutdown) = self.shutdown.lock().take() {
            let _ = shutdown.send(());
        }

        let task = self.task.lock().take();
        let Some(mut task) = task else {
            return Ok(());
        };

        match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) if e.is_cancelled() => Ok(()),
            Ok(Err(e)) => Err(std::io::Error::other(e)),
            Err(_) => {
                warn!("HTTP server did not stop within {SHUTDOWN_GRACE:?}, aborting");
                task.abort();
                Ok(())
            }
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.get_mut().take() {
            let _ = shutdown.send(());
        }
    }
}

#[async_trait]
impl Release for ServerHandle {
    async fn release(&self) -> anyhow::Result<()> {
        self.close().await?;
        Ok(())
    }
}

/// Answers from the artifact when it holds the requested path.
///
/// Any other path ending in `favicon.ico` gets an empty success.
async fn serve_artifact(
    State(artifact): State<Arc<BuildArtifact>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let Some(entry) = artifact.get(&path) else {
        if path.ends_with("favicon.ico") {
            return empty_favicon().into_response();
        }
        return next.run(request).await;
    };

    let etag = format!("\"{}\"", entry.hash);
    let not_modified = request
        .headers()
        .get(header::IF_NONE_MATCH)
        .is_some_and(|value| value.as_bytes() == etag.as_bytes());

    let headers = [
        (header::ETAG, etag),
        (header::CACHE_CONTROL, "no-cache".to_string()),
        (header::CONTENT_TYPE, determine_content_type(&path).to_string()),
    ];

    if not_modified {
        return (StatusCode::NOT_MODIFIED, headers).into_response();
    }
    (StatusCode::OK, headers, entry.content.clone()).into_response()
}

fn empty_favicon() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, HeaderValue::from_static("image/x-icon"))],
    )
}

fn determine_content_type(path: &str) -> &'static str {
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    match extension {
        "js" | "mjs" => "application/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "html" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "wasm" => "application/wasm",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}
