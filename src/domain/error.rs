use std::path::PathBuf;
use thiserror::Error;

/// Reasons a sample name could not be derived from page text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no 'Data File' line found")]
    NotFound,

    #[error("'Data File' line has no colon: {0}")]
    MissingColon(String),

    #[error("'Data File' line yields an empty name: {0}")]
    EmptyName(String),

    #[error("derived name is not a plain file name: {0}")]
    InvalidName(String),
}

/// Errors from the PDF text collaborator
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse PDF {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("PDF {0} has no pages")]
    NoPages(PathBuf),

    #[error("PDF reader task failed: {0}")]
    Worker(String),
}

/// Errors from the filesystem watch collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WatchError {
    #[error("cannot watch {path}: {message}")]
    SubscribeFailed { path: PathBuf, message: String },

    #[error("watched directory is gone or inaccessible: {0}")]
    DirectoryGone(PathBuf),

    #[error("watch backend error: {0}")]
    Backend(String),

    #[error("event subscription closed")]
    SubscriptionClosed,
}

/// Errors persisting the instrument registry
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("failed to access registry file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid registry file {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("duplicate instrument name in registry: {0}")]
    DuplicateName(String),
}

/// Errors reported by supervisor operations to the operator layer
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("instrument not found: {0}")]
    InstrumentNotFound(String),

    #[error("instrument already registered: {0}")]
    DuplicateInstrument(String),

    #[error("watch path does not exist or is not a directory: {0}")]
    PathNotFound(PathBuf),

    #[error("instrument {0} is already starting or stopping")]
    TransitionInProgress(String),

    #[error("instrument {0} is running; stop it first")]
    StillRunning(String),

    #[error("instrument {0} is already running")]
    AlreadyRunning(String),

    #[error("instrument {0} is not running")]
    NotRunning(String),

    #[error("supervisor is shutting down")]
    ShuttingDown,

    #[error("failed to start watcher for {name}: {source}")]
    WatchFailed {
        name: String,
        #[source]
        source: WatchError,
    },
}
