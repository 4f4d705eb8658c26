//! Common test utilities for integration tests
//!
//! Provides shared fixtures, helpers, and test doubles used across
//! multiple integration test files.

#![allow(dead_code)]

pub mod pdf;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

use autorename::application::{InstrumentSupervisor, InstrumentWatcher};
use autorename::domain::error::{ReadError, WatchError};
use autorename::domain::models::{Instrument, PipelineConfig};
use autorename::domain::ports::{
    CreateEventSource, CreatedEvent, EventItem, PdfTextReader, Subscription,
};
use autorename::services::RenamePipeline;

/// Line that makes [`TextFileReader`] panic, for crash isolation tests
pub const PANIC_LINE: &str = "@@panic@@";

/// Create a temporary directory for test isolation
///
/// Returns a TempDir that will be cleaned up when dropped.
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Wait for a condition to be true with timeout
///
/// Polls the predicate every 20ms until it returns true or timeout is reached.
pub async fn wait_for<F>(mut predicate: F, timeout_ms: u64) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = Duration::from_millis(timeout_ms);

    while start.elapsed() < timeout {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    predicate()
}

/// Pipeline timings short enough for tests, keeping five attempts
pub fn fast_pipeline_config() -> PipelineConfig {
    PipelineConfig {
        settle_delay_ms: 10,
        retry_backoff_ms: 10,
        max_attempts: 5,
    }
}

/// Write a plain-text "report" that [`TextFileReader`] understands
pub fn write_report(dir: &Path, file_name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.join(file_name);
    std::fs::write(&path, lines.join("\n")).expect("Failed to write report");
    path
}

/// Sorted file names in a directory
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("Failed to read dir")
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Reader that treats the file's bytes as the first page's text
///
/// Counts reads per path and can fail the first `fail_first` reads of every
/// path to exercise the retry loop. A slow reader sleeps before every read
/// and records how many reads ever overlapped.
#[derive(Default)]
pub struct TextFileReader {
    reads: Mutex<HashMap<PathBuf, u32>>,
    fail_first: AtomicU32,
    delay_ms: AtomicU64,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
}

struct InFlight<'a>(&'a AtomicU32);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl TextFileReader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_first(n: u32) -> Arc<Self> {
        let reader = Self::default();
        reader.fail_first.store(n, Ordering::SeqCst);
        Arc::new(reader)
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        let reader = Self::default();
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        reader.delay_ms.store(millis, Ordering::SeqCst);
        Arc::new(reader)
    }

    /// Highest number of reads that were in progress at the same time
    pub fn max_in_flight(&self) -> u32 {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn reads_of(&self, path: &Path) -> u32 {
        self.reads
            .lock()
            .unwrap()
            .get(path)
            .copied()
            .unwrap_or_default()
    }

    pub fn total_reads(&self) -> u32 {
        self.reads.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl PdfTextReader for TextFileReader {
    async fn read_first_page_lines(&self, path: &Path) -> Result<Vec<String>, ReadError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let attempt = {
            let mut reads = self.reads.lock().unwrap();
            let count = reads.entry(path.to_path_buf()).or_default();
            *count += 1;
            *count
        };

        if attempt <= self.fail_first.load(Ordering::SeqCst) {
            return Err(ReadError::Parse {
                path: path.to_path_buf(),
                message: "file still being written".to_string(),
            });
        }

        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ReadError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        assert!(
            !text.contains(PANIC_LINE),
            "reader blew up on {}",
            path.display()
        );

        Ok(text.lines().map(str::to_string).collect())
    }
}

/// Event source driven by the test instead of the OS
///
/// Each subscribed directory gets a channel the test pushes events into.
#[derive(Default)]
pub struct ChannelEventSource {
    senders: Mutex<HashMap<PathBuf, mpsc::UnboundedSender<EventItem>>>,
    subscribe_calls: AtomicU32,
}

impl ChannelEventSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Emit a file creation; false if nobody is subscribed
    pub fn create_file(&self, path: &Path) -> bool {
        let dir = path.parent().expect("path has a parent");
        self.send(dir, Ok(CreatedEvent::file(path)))
    }

    pub fn create_directory(&self, path: &Path) -> bool {
        let dir = path.parent().expect("path has a parent");
        self.send(dir, Ok(CreatedEvent::directory(path)))
    }

    /// Deliver a fatal watch error to the subscription of `dir`
    pub fn fail(&self, dir: &Path, error: WatchError) -> bool {
        self.send(dir, Err(error))
    }

    /// Close the channel of `dir` as a crashed backend would
    pub fn close(&self, dir: &Path) {
        self.senders.lock().unwrap().remove(dir);
    }

    /// Whether a live subscription for `dir` still exists
    pub fn is_subscribed(&self, dir: &Path) -> bool {
        self.senders
            .lock()
            .unwrap()
            .get(dir)
            .is_some_and(|tx| !tx.is_closed())
    }

    pub fn subscribe_calls(&self) -> u32 {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    fn send(&self, dir: &Path, item: EventItem) -> bool {
        self.senders
            .lock()
            .unwrap()
            .get(dir)
            .is_some_and(|tx| tx.send(item).is_ok())
    }
}

impl CreateEventSource for ChannelEventSource {
    fn subscribe(&self, directory: &Path) -> Result<Subscription, WatchError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);

        if !directory.is_dir() {
            return Err(WatchError::SubscribeFailed {
                path: directory.to_path_buf(),
                message: "not an accessible directory".to_string(),
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.senders
            .lock()
            .unwrap()
            .insert(directory.to_path_buf(), tx);
        Ok(Subscription::new(rx, None))
    }
}

/// Supervisor wired to test doubles
pub struct Harness {
    pub supervisor: Arc<InstrumentSupervisor>,
    pub source: Arc<ChannelEventSource>,
    pub reader: Arc<TextFileReader>,
}

pub struct HarnessOptions {
    pub pipeline: PipelineConfig,
    pub health_check_interval: Duration,
    pub drain_timeout: Duration,
    pub reader: Arc<TextFileReader>,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            pipeline: fast_pipeline_config(),
            health_check_interval: Duration::from_millis(50),
            drain_timeout: Duration::from_secs(5),
            reader: TextFileReader::new(),
        }
    }
}

impl Harness {
    pub fn new(instruments: Vec<Instrument>) -> Self {
        Self::with_options(instruments, HarnessOptions::default())
    }

    pub fn with_options(instruments: Vec<Instrument>, options: HarnessOptions) -> Self {
        let source = ChannelEventSource::new();
        let reader = options.reader;
        let pipeline = Arc::new(RenamePipeline::new(reader.clone(), options.pipeline));
        let watcher =
            InstrumentWatcher::new(source.clone(), pipeline, options.health_check_interval);
        let supervisor = InstrumentSupervisor::new(watcher, instruments, options.drain_timeout)
            .expect("valid instrument list");

        Self {
            supervisor: Arc::new(supervisor),
            source,
            reader,
        }
    }
}
