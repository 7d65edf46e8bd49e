//! Live-reload transport: connected browsers and the SSE endpoint.
//!
//! Each browser that loads the client snippet holds an `EventSource` on
//! `/livereload`. Events are pushed through a small bounded channel per
//! client; a client that falls behind loses events instead of slowing
//! everyone else down.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_stream::{Stream, StreamExt, wrappers::ReceiverStream};

/// Route the client script connects to.
pub const LIVERELOAD_PATH: &str = "/livereload";

/// Events buffered per client before new ones are dropped.
pub const CLIENT_BUFFER: usize = 16;

const CLIENT_SCRIPT: &str = include_str!("../../assets/livereload.js");

/// Event pushed to browsers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveReloadEvent {
    /// Reload the page.
    Reload,
    /// A build failed; the payload is shown in the browser console.
    Error(String),
}

impl LiveReloadEvent {
    fn into_sse(self) -> Event {
        match self {
            LiveReloadEvent::Reload => Event::default().event("reload").data("reload"),
            LiveReloadEvent::Error(message) => Event::default().event("error").data(message),
        }
    }
}

/// Registry of connected live-reload clients.
///
/// Cloning is cheap; clones share the registry.
#[derive(Debug, Clone, Default)]
pub struct LiveReload {
    clients: Arc<RwLock<HashMap<usize, mpsc::Sender<LiveReloadEvent>>>>,
    next_id: Arc<AtomicUsize>,
}

impl LiveReload {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `<script>` block injected by `livereload()` in templates.
    pub fn snippet() -> String {
        format!("<script>\n{}</script>", CLIENT_SCRIPT)
    }

    /// Register a new client.
    ///
    /// # Returns
    ///
    /// Client ID and receiver for events
    pub fn register(&self) -> (usize, mpsc::Receiver<LiveReloadEvent>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(CLIENT_BUFFER);
        self.clients.write().insert(id, tx);
        tracing::debug!(client = id, "live-reload client connected");
        (id, rx)
    }

    pub fn unregister(&self, id: usize) {
        self.clients.write().remove(&id);
    }

    /// Get number of connected clients.
    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Tell every client to reload.
    pub fn reload(&self) {
        self.broadcast(LiveReloadEvent::Reload);
    }

    /// Send a build error to every client.
    pub fn error(&self, message: impl Into<String>) {
        self.broadcast(LiveReloadEvent::Error(message.into()));
    }

    /// Deliver `event` to every client without waiting.
    ///
    /// Full clients miss this event; closed clients are unregistered.
    pub fn broadcast(&self, event: LiveReloadEvent) {
        let mut closed = Vec::new();
        {
            let clients = self.clients.read();
            for (id, tx) in clients.iter() {
                match tx.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        tracing::debug!(client = id, "client buffer full, dropping event");
                    }
                    Err(TrySendError::Closed(_)) => closed.push(*id),
                }
            }
        }

        if !closed.is_empty() {
            let mut clients = self.clients.write();
            for id in closed {
                clients.remove(&id);
                tracing::debug!(client = id, "live-reload client gone");
            }
        }
    }
}

/// `GET /livereload`: the SSE stream for one browser.
pub async fn handle_livereload(
    State(live): State<LiveReload>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (_id, rx) = live.register();

    let stream = ReceiverStream::new(rx).map(|event| Ok(event.into_sse()));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
