//! Watch mode and the development server.
//!
//! - [`FileWatcher`] feeds file changes into the [`RebuildLoop`]
//! - the loop hands each [`hearth_bundler::BuildResult`] to a
//!   [`RebuildHandler`]: the process supervisor in run mode, the
//!   [`RebuildNotifier`] in serve mode
//! - [`DevServer`] serves the output directory and the live-reload stream

pub mod livereload;
pub mod notifier;
pub mod rebuild;
pub mod server;
pub mod tls;
pub mod watcher;

pub use livereload::{LiveReload, LiveReloadEvent};
pub use notifier::RebuildNotifier;
pub use rebuild::{RebuildHandler, RebuildLoop};
pub use server::{DevServer, ServerState, router};
pub use watcher::{FileChange, FileWatcher};
