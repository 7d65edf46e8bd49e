//! Turns rebuild results into live-reload events.

use async_trait::async_trait;
use hearth_bundler::{BuildResult, Diagnostic};

use crate::dev::{LiveReload, RebuildHandler};
use crate::error::Result;
use crate::logger::Logger;

/// Rebuild handler for served HTML entries.
///
/// A failed build sends one `error` event per diagnostic and no reload, so
/// the page keeps showing the last good build.
#[derive(Debug, Clone)]
pub struct RebuildNotifier {
    live: LiveReload,
    logger: Logger,
}

impl RebuildNotifier {
    pub fn new(live: LiveReload, logger: Logger) -> Self {
        Self { live, logger }
    }

    pub fn notify(&self, result: &BuildResult) {
        if result.has_errors() {
            for diagnostic in &result.errors {
                self.logger.error(&diagnostic.to_string());
                self.live.error(error_payload(diagnostic));
            }
        } else {
            tracing::debug!(clients = self.live.client_count(), "sending reload");
            self.live.reload();
        }
    }
}

#[async_trait]
impl RebuildHandler for RebuildNotifier {
    async fn on_rebuild(&mut self, result: &BuildResult) -> Result<()> {
        self.notify(result);
        Ok(())
    }
}

/// `Build Error: <text> @ <file>`
pub fn error_payload(diagnostic: &Diagnostic) -> String {
    format!("Build Error: {} @ {}", diagnostic.text, diagnostic.file())
}
