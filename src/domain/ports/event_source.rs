use std::any::Any;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use crate::domain::error::WatchError;

/// A "file created" notification for a direct child of a watched directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedEvent {
    pub path: PathBuf,
    pub is_directory: bool,
}

impl CreatedEvent {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_directory: false,
        }
    }

    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_directory: true,
        }
    }
}

/// Item delivered by a subscription; an `Err` ends the subscription
pub type EventItem = Result<CreatedEvent, WatchError>;

/// Live subscription to creation events of one directory
///
/// Dropping the subscription cancels it: the guard owns whatever keeps the
/// backend watching (an OS watcher, a test sender, ...).
pub struct Subscription {
    events: mpsc::UnboundedReceiver<EventItem>,
    _guard: Option<Box<dyn Any + Send>>,
}

impl Subscription {
    pub fn new(events: mpsc::UnboundedReceiver<EventItem>, guard: Option<Box<dyn Any + Send>>) -> Self {
        Self {
            events,
            _guard: guard,
        }
    }

    /// Next event, or `None` once the backend has gone away
    pub async fn next(&mut self) -> Option<EventItem> {
        self.events.recv().await
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Port trait for the filesystem watch collaborator
///
/// Subscriptions are non-recursive and only carry creation events.
pub trait CreateEventSource: Send + Sync {
    /// Start watching `directory`
    ///
    /// # Errors
    /// Returns `WatchError::SubscribeFailed` if the directory cannot be watched.
    fn subscribe(&self, directory: &Path) -> Result<Subscription, WatchError>;
}
