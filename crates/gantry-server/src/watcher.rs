//! File watching for the watch loop.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

/// Quiet period that ends a batch of events.
pub const DEBOUNCE: Duration = Duration::from_millis(100);

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

/// A change to a single path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// File watcher for detecting changes.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Watch `paths` recursively.
    ///
    /// Events arriving within [`DEBOUNCE`] of each other are delivered as
    /// one batch, with one event per path.
    pub fn new(
        paths: &[PathBuf],
    ) -> Result<(Self, async_mpsc::Receiver<Vec<WatchEvent>>), std::io::Error> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(std::io::Error::other)?;

        for path in paths {
            if path.exists() {
                watcher
                    .watch(path, RecursiveMode::Recursive)
                    .map_err(std::io::Error::other)?;
            } else {
                tracing::warn!("Not watching missing path {}", path.display());
            }
        }

        std::thread::spawn(move || {
            while let Ok(first) = sync_rx.recv() {
                let mut batch = Vec::new();
                push_events(&mut batch, &first);

                let disconnected = loop {
                    match sync_rx.recv_timeout(DEBOUNCE) {
                        Ok(event) => push_events(&mut batch, &event),
                        Err(RecvTimeoutError::Timeout) => break false,
                        Err(RecvTimeoutError::Disconnected) => break true,
                    }
                };

                if !batch.is_empty() && async_tx.blocking_send(batch).is_err() {
                    break;
                }
                if disconnected {
                    break;
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

fn push_events(batch: &mut Vec<WatchEvent>, event: &notify::Event) {
    for path in &event.paths {
        let Some(change) = classify_event(path, &event.kind) else {
            continue;
        };

        match batch.iter_mut().find(|e| e.path == change.path) {
            Some(existing) => existing.kind = change.kind,
            None => batch.push(change),
        }
    }
}

/// Classify a notify event; access and metadata-only events are ignored.
fn classify_event(path: &Path, kind: &EventKind) -> Option<WatchEvent> {
    use notify::event::ModifyKind;

    let kind = match kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Remove(_) => ChangeKind::Removed,
        EventKind::Modify(ModifyKind::Metadata(_)) => return None,
        EventKind::Modify(_) => ChangeKind::Modified,
        _ => return None,
    };

    Some(WatchEvent {
        path: path.to_path_buf(),
        kind,
    })
}
