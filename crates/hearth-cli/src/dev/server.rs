//! Development HTTP server.
//!
//! Serves the output directory with an SPA fallback: any path that isn't a
//! file in the output directory gets `index.html`. Live-reload clients
//! connect to `/livereload`. Every response allows any origin.

use axum::{
    Router,
    body::Body,
    extract::{FromRef, Request, State},
    http::{HeaderValue, header},
    response::Response,
    routing::get,
};
use path_clean::PathClean;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tower_http::{services::ServeFile, set_header::SetResponseHeaderLayer};

use crate::config::OrchestratorConfig;
use crate::dev::livereload::{LIVERELOAD_PATH, LiveReload, handle_livereload};
use crate::dev::tls::{self, TlsListener};
use crate::error::{CliError, Result};
use crate::html::INDEX_FILE_NAME;
use crate::logger::Logger;

/// State shared by request handlers.
#[derive(Debug, Clone)]
pub struct ServerState {
    out_dir: Arc<PathBuf>,
    live: LiveReload,
}

impl ServerState {
    pub fn new(out_dir: impl Into<PathBuf>, live: LiveReload) -> Self {
        Self {
            out_dir: Arc::new(out_dir.into()),
            live,
        }
    }
}

impl FromRef<ServerState> for LiveReload {
    fn from_ref(state: &ServerState) -> Self {
        state.live.clone()
    }
}

/// Router for the dev server.
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route(LIVERELOAD_PATH, get(handle_livereload))
        .fallback(serve_static)
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .with_state(state)
}

/// File under `out_dir` a request path points at.
///
/// The path is percent-decoded, then cleaned as if rooted, so `..` segments
/// (encoded or not) can't climb out. A path that doesn't decode to UTF-8 is
/// used as sent.
pub fn candidate_path(out_dir: &Path, request_path: &str) -> PathBuf {
    let decoded = urlencoding::decode(request_path)
        .unwrap_or(std::borrow::Cow::Borrowed(request_path));
    let rooted = PathBuf::from(format!("/{}", decoded.trim_start_matches('/'))).clean();
    let relative = rooted.strip_prefix("/").unwrap_or(&rooted);
    out_dir.join(relative)
}

/// The candidate if it is a file, `index.html` otherwise.
async fn resolve_file(out_dir: &Path, request_path: &str) -> PathBuf {
    let candidate = candidate_path(out_dir, request_path);
    match tokio::fs::metadata(&candidate).await {
        Ok(metadata) if metadata.is_file() => candidate,
        _ => out_dir.join(INDEX_FILE_NAME),
    }
}

async fn serve_static(State(state): State<ServerState>, request: Request) -> Response {
    let path = resolve_file(&state.out_dir, request.uri().path()).await;
    tracing::debug!(uri = %request.uri(), file = %path.display(), "serving");

    match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}

/// The dev HTTP(S) server.
#[derive(Debug, Clone)]
pub struct DevServer {
    host: String,
    port: u16,
    secure: bool,
    /// Where the TLS key pair lives.
    cwd: PathBuf,
    state: ServerState,
    logger: Logger,
}

impl DevServer {
    pub fn new(config: &OrchestratorConfig, live: LiveReload, logger: Logger) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            secure: config.secure,
            cwd: config.cwd().to_path_buf(),
            state: ServerState::new(config.out_dir(), live),
            logger,
        }
    }

    pub fn url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// Serve until `cancel` fires.
    ///
    /// Bind and TLS failures are logged, not returned: the rebuild loop keeps
    /// running without a server.
    pub async fn run(self, cancel: CancellationToken) {
        if let Err(e) = self.serve(cancel).await {
            self.logger.error(&e.to_string());
        }
    }

    async fn serve(&self, cancel: CancellationToken) -> Result<()> {
        let listener = TcpListener::bind((self.host.as_str(), self.port))
            .await
            .map_err(|e| CliError::Server(format!("Failed to bind to {}: {}", self.url(), e)))?;

        let app = router(self.state.clone());
        let shutdown = cancel.cancelled_owned();

        let served = if self.secure {
            let (key, cert) = tls::ensure_keypair(&self.host, &self.cwd)?;
            let config = tls::load_server_config(&key, &cert)?;
            let listener = TlsListener::new(listener, config);
            self.logger.banner("ready on", &self.url());
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
        } else {
            self.logger.banner("ready on", &self.url());
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
        };

        served.map_err(|e| CliError::Server(format!("Server error: {}", e)))
    }
}
