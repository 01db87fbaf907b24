//! Development server and watch mode for gantry.
//!
//! Serves the output folder with a live reload client injected into every
//! page, watches the sources and re-runs the matching task on change.

pub mod server;
pub mod watch;
pub mod watcher;
pub mod websocket;

pub use server::{DevServer, DevServerConfig, ServerError};
pub use watch::serve_and_watch;
pub use watcher::{ChangeKind, FileWatcher, WatchEvent};
pub use websocket::{ReloadHub, ReloadMessage};
