//! Filesystem watch adapter using the notify crate
//!
//! One `RecommendedWatcher` per subscription, watching a single directory
//! non-recursively. The notify callback runs on the backend's own thread
//! and forwards creation events into an unbounded channel, so it never
//! blocks on a slow consumer.

use notify::event::CreateKind;
use notify::{ErrorKind, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::domain::error::WatchError;
use crate::domain::ports::{CreateEventSource, CreatedEvent, EventItem, Subscription};

/// Create-event source backed by the platform's native notification API
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyEventSource;

impl NotifyEventSource {
    pub const fn new() -> Self {
        Self
    }
}

impl CreateEventSource for NotifyEventSource {
    fn subscribe(&self, directory: &Path) -> Result<Subscription, WatchError> {
        let subscribe_failed = |message: String| WatchError::SubscribeFailed {
            path: directory.to_path_buf(),
            message,
        };

        if !directory.is_dir() {
            return Err(subscribe_failed("not an accessible directory".to_string()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let root = directory.to_path_buf();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                for item in translate(&root, res) {
                    if tx.send(item).is_err() {
                        // Subscription dropped; the watcher goes with it shortly.
                        break;
                    }
                }
            },
            notify::Config::default(),
        )
        .map_err(|e| subscribe_failed(e.to_string()))?;

        watcher
            .watch(directory, RecursiveMode::NonRecursive)
            .map_err(|e| subscribe_failed(e.to_string()))?;

        Ok(Subscription::new(rx, Some(Box::new(watcher))))
    }
}

/// Map one backend callback to subscription items
///
/// Lost events and a lost watch end the subscription; other backend errors
/// are logged and dropped.
fn translate(root: &Path, res: notify::Result<Event>) -> Vec<EventItem> {
    let event = match res {
        Ok(event) => event,
        Err(e) if matches!(e.kind, ErrorKind::MaxFilesWatch | ErrorKind::WatchNotFound) => {
            return vec![Err(WatchError::Backend(e.to_string()))];
        }
        Err(e) => {
            warn!(path = %root.display(), error = %e, "watch backend error");
            return Vec::new();
        }
    };

    trace!(kind = ?event.kind, paths = ?event.paths, "notify event");

    if event.need_rescan() {
        return vec![Err(WatchError::Backend(
            "event queue overflowed, creation events were lost".to_string(),
        ))];
    }

    match event.kind {
        EventKind::Create(kind) => event
            .paths
            .into_iter()
            .map(|path| Ok(created(kind, path)))
            .collect(),
        EventKind::Remove(_) if event.paths.iter().any(|p| p == root) => {
            vec![Err(WatchError::DirectoryGone(root.to_path_buf()))]
        }
        _ => Vec::new(),
    }
}

fn created(kind: CreateKind, path: PathBuf) -> CreatedEvent {
    let is_directory = match kind {
        CreateKind::Folder => true,
        CreateKind::File => false,
        // Backends that cannot tell report Any/Other
        CreateKind::Any | CreateKind::Other => path.is_dir(),
    };
    CreatedEvent { path, is_directory }
}
