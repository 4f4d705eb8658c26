//! Supervisor and watch unit behavior with test-driven event sources

mod common;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use autorename::application::UnitExit;
use autorename::domain::error::{SupervisorError, WatchError};
use autorename::domain::models::{Instrument, InstrumentKind, PipelineConfig, RunState};
use common::{
    fast_pipeline_config, file_names, setup_test_logging, temp_dir, wait_for, write_report,
    Harness, HarnessOptions, TextFileReader, PANIC_LINE,
};
use tempfile::TempDir;

/// Temp root with one watch directory per name
fn instrument_dirs(names: &[&str]) -> (TempDir, Vec<Instrument>) {
    let root = temp_dir();
    let instruments = names
        .iter()
        .map(|name| {
            let dir = root.path().join(name);
            std::fs::create_dir(&dir).unwrap();
            Instrument::new(*name, InstrumentKind::ChemStation, dir)
        })
        .collect();
    (root, instruments)
}

fn renamed(harness: &Harness, index: usize) -> u64 {
    harness.supervisor.snapshot()[index].jobs.renamed
}

#[tokio::test]
async fn test_toggle_starts_and_stops_instrument() {
    setup_test_logging();
    let (_root, instruments) = instrument_dirs(&["GC-1"]);
    let dir = instruments[0].path.clone();
    let harness = Harness::new(instruments);

    assert_eq!(harness.supervisor.state_of("GC-1"), Some(RunState::Stopped));

    let state = harness.supervisor.toggle("GC-1").await.unwrap();
    assert_eq!(state, RunState::Running);
    assert_eq!(harness.supervisor.state_of("GC-1"), Some(RunState::Running));
    assert!(harness.source.is_subscribed(&dir));

    let state = harness.supervisor.toggle("GC-1").await.unwrap();
    assert_eq!(state, RunState::Stopped);
    assert_eq!(harness.supervisor.state_of("GC-1"), Some(RunState::Stopped));
    assert!(!harness.source.is_subscribed(&dir), "subscription must be dropped");
}

#[tokio::test]
async fn test_toggle_unknown_instrument() {
    let (_root, instruments) = instrument_dirs(&["GC-1"]);
    let harness = Harness::new(instruments);

    let result = harness.supervisor.toggle("GC-9").await;
    assert!(matches!(result, Err(SupervisorError::InstrumentNotFound(name)) if name == "GC-9"));
    assert!(harness.supervisor.name_at(2).is_err());
    assert!(harness.supervisor.name_at(0).is_err());
}

#[tokio::test]
async fn test_created_report_is_renamed_by_running_instrument() {
    let (_root, instruments) = instrument_dirs(&["GC-1"]);
    let dir = instruments[0].path.clone();
    let harness = Harness::new(instruments);
    harness.supervisor.start("GC-1").await.unwrap();

    let report = write_report(&dir, "PrintText.pdf", &["Data File: P0QC2418.D"]);
    assert!(harness.source.create_file(&report));

    assert!(wait_for(|| renamed(&harness, 0) == 1, 2000).await);
    assert_eq!(file_names(&dir), vec!["PrintTextP0QC2418.D.pdf"]);
}

#[tokio::test]
async fn test_directory_and_foreign_files_are_ignored() {
    let (_root, instruments) = instrument_dirs(&["GC-1"]);
    let dir = instruments[0].path.clone();
    let harness = Harness::new(instruments);
    harness.supervisor.start("GC-1").await.unwrap();

    let sub = dir.join("PrintText.pdf.d");
    std::fs::create_dir(&sub).unwrap();
    harness.source.create_directory(&sub);
    let other = write_report(&dir, "summary.pdf", &["Data File: X.D"]);
    harness.source.create_file(&other);

    assert!(wait_for(|| harness.supervisor.snapshot()[0].jobs.skipped == 1, 2000).await);
    assert_eq!(harness.reader.total_reads(), 0);
    assert_eq!(harness.supervisor.snapshot()[0].jobs.total(), 1);
}

#[tokio::test]
async fn test_stopped_instrument_receives_nothing() {
    let (_root, instruments) = instrument_dirs(&["GC-1"]);
    let dir = instruments[0].path.clone();
    let harness = Harness::new(instruments);

    let report = write_report(&dir, "PrintText.pdf", &["Data File: P0QC2418.D"]);
    assert!(!harness.source.create_file(&report));
    assert_eq!(harness.source.subscribe_calls(), 0);
    assert_eq!(file_names(&dir), vec!["PrintText.pdf"]);
}

#[tokio::test]
async fn test_watch_failure_is_isolated_and_reconciled() {
    setup_test_logging();
    let (_root, instruments) = instrument_dirs(&["GC-1", "GC-2"]);
    let dir_a = instruments[0].path.clone();
    let dir_b = instruments[1].path.clone();
    let harness = Harness::new(instruments);
    harness.supervisor.start("GC-1").await.unwrap();
    harness.supervisor.start("GC-2").await.unwrap();

    harness
        .source
        .fail(&dir_a, WatchError::Backend("inotify queue overflow".to_string()));

    assert!(
        wait_for(
            || harness.supervisor.state_of("GC-1") == Some(RunState::Stopped),
            2000
        )
        .await
    );

    let reconciled = harness.supervisor.reconcile().await;
    assert_eq!(reconciled.len(), 1);
    assert_eq!(reconciled[0].0, "GC-1");
    assert!(matches!(reconciled[0].1, UnitExit::Failed(WatchError::Backend(_))));

    // GC-2 keeps working
    assert_eq!(harness.supervisor.state_of("GC-2"), Some(RunState::Running));
    let report = write_report(&dir_b, "PrintText.pdf", &["Data File: B1.D"]);
    harness.source.create_file(&report);
    assert!(wait_for(|| renamed(&harness, 1) == 1, 2000).await);

    // GC-1 can be started again after reconciliation
    assert_eq!(harness.supervisor.toggle("GC-1").await.unwrap(), RunState::Running);
}

#[tokio::test]
async fn test_closed_subscription_ends_unit() {
    let (_root, instruments) = instrument_dirs(&["GC-1"]);
    let dir = instruments[0].path.clone();
    let harness = Harness::new(instruments);
    harness.supervisor.start("GC-1").await.unwrap();

    harness.source.close(&dir);

    assert!(
        wait_for(
            || harness.supervisor.state_of("GC-1") == Some(RunState::Stopped),
            2000
        )
        .await
    );
    let reconciled = harness.supervisor.reconcile().await;
    assert_eq!(
        reconciled,
        vec![(
            "GC-1".to_string(),
            UnitExit::Failed(WatchError::SubscriptionClosed)
        )]
    );
}

#[tokio::test]
async fn test_deleted_watch_directory_stops_instrument() {
    let (_root, instruments) = instrument_dirs(&["GC-1"]);
    let dir = instruments[0].path.clone();
    let harness = Harness::new(instruments);
    harness.supervisor.start("GC-1").await.unwrap();

    std::fs::remove_dir_all(&dir).unwrap();

    assert!(
        wait_for(
            || harness.supervisor.state_of("GC-1") == Some(RunState::Stopped),
            2000
        )
        .await
    );
    let reconciled = harness.supervisor.reconcile().await;
    assert_eq!(
        reconciled,
        vec![(
            "GC-1".to_string(),
            UnitExit::Failed(WatchError::DirectoryGone(dir))
        )]
    );
}

#[tokio::test]
async fn test_panicking_job_does_not_kill_unit() {
    let (_root, instruments) = instrument_dirs(&["GC-1"]);
    let dir = instruments[0].path.clone();
    let harness = Harness::new(instruments);
    harness.supervisor.start("GC-1").await.unwrap();

    let bad = write_report(&dir, "1PrintText.pdf", &[PANIC_LINE]);
    harness.source.create_file(&bad);
    assert!(wait_for(|| harness.supervisor.snapshot()[0].jobs.failed == 1, 2000).await);
    assert_eq!(harness.supervisor.state_of("GC-1"), Some(RunState::Running));

    let good = write_report(&dir, "PrintText.pdf", &["Data File: OK.D"]);
    harness.source.create_file(&good);
    assert!(wait_for(|| renamed(&harness, 0) == 1, 2000).await);
    assert!(dir.join("PrintTextOK.D.pdf").exists());
    assert!(bad.exists());
}

#[tokio::test]
async fn test_toggle_during_stop_is_rejected_and_jobs_drain() {
    let (_root, instruments) = instrument_dirs(&["GC-1"]);
    let dir = instruments[0].path.clone();
    let harness = Harness::with_options(
        instruments,
        HarnessOptions {
            pipeline: PipelineConfig {
                settle_delay_ms: 400,
                ..fast_pipeline_config()
            },
            ..HarnessOptions::default()
        },
    );
    harness.supervisor.start("GC-1").await.unwrap();

    let report = write_report(&dir, "PrintText.pdf", &["Data File: SLOW.D"]);
    harness.source.create_file(&report);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let supervisor = Arc::clone(&harness.supervisor);
    let stopping = tokio::spawn(async move { supervisor.stop("GC-1").await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let second = harness.supervisor.toggle("GC-1").await;
    assert!(matches!(
        second,
        Err(SupervisorError::TransitionInProgress(name)) if name == "GC-1"
    ));
    assert!(harness.supervisor.snapshot()[0].transitioning);

    let exit = stopping.await.unwrap().unwrap();
    assert_eq!(exit, UnitExit::Stopped);
    assert_eq!(harness.supervisor.state_of("GC-1"), Some(RunState::Stopped));
    // The in-flight job finished during the drain
    assert!(dir.join("PrintTextSLOW.D.pdf").exists());
}

#[tokio::test]
async fn test_stop_is_bounded_by_drain_timeout() {
    let (_root, instruments) = instrument_dirs(&["GC-1"]);
    let dir = instruments[0].path.clone();
    let harness = Harness::with_options(
        instruments,
        HarnessOptions {
            pipeline: PipelineConfig {
                settle_delay_ms: 5_000,
                ..fast_pipeline_config()
            },
            drain_timeout: Duration::from_millis(100),
            ..HarnessOptions::default()
        },
    );
    harness.supervisor.start("GC-1").await.unwrap();

    let report = write_report(&dir, "PrintText.pdf", &["Data File: SLOW.D"]);
    harness.source.create_file(&report);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = std::time::Instant::now();
    let exit = harness.supervisor.stop("GC-1").await.unwrap();
    assert_eq!(exit, UnitExit::DrainTimedOut);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(harness.supervisor.state_of("GC-1"), Some(RunState::Stopped));
}

#[tokio::test]
async fn test_start_with_missing_directory_fails() {
    let (_root, instruments) = instrument_dirs(&["GC-1"]);
    std::fs::remove_dir(&instruments[0].path).unwrap();
    let harness = Harness::new(instruments);

    let result = harness.supervisor.toggle("GC-1").await;
    assert!(matches!(
        result,
        Err(SupervisorError::WatchFailed {
            source: WatchError::SubscribeFailed { .. },
            ..
        })
    ));
    assert_eq!(harness.supervisor.state_of("GC-1"), Some(RunState::Stopped));
    assert!(!harness.supervisor.snapshot()[0].transitioning);
}

#[tokio::test]
async fn test_start_and_stop_reject_wrong_state() {
    let (_root, instruments) = instrument_dirs(&["GC-1"]);
    let harness = Harness::new(instruments);

    assert!(matches!(
        harness.supervisor.stop("GC-1").await,
        Err(SupervisorError::NotRunning(_))
    ));
    harness.supervisor.start("GC-1").await.unwrap();
    assert!(matches!(
        harness.supervisor.start("GC-1").await,
        Err(SupervisorError::AlreadyRunning(_))
    ));
}

#[tokio::test]
async fn test_stop_all_stops_everything_and_refuses_restarts() {
    let (_root, instruments) = instrument_dirs(&["GC-1", "GC-2", "GC-3"]);
    let harness = Harness::new(instruments);
    harness.supervisor.start("GC-1").await.unwrap();
    harness.supervisor.start("GC-3").await.unwrap();

    let mut exits = harness.supervisor.stop_all().await;
    exits.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        exits,
        vec![
            ("GC-1".to_string(), UnitExit::Stopped),
            ("GC-3".to_string(), UnitExit::Stopped),
        ]
    );

    for status in harness.supervisor.snapshot() {
        assert_eq!(status.state, RunState::Stopped);
    }
    assert!(matches!(
        harness.supervisor.toggle("GC-2").await,
        Err(SupervisorError::ShuttingDown)
    ));

    // Idempotent
    assert!(harness.supervisor.stop_all().await.is_empty());
}

#[tokio::test]
async fn test_add_and_remove_instruments() {
    let (root, instruments) = instrument_dirs(&["GC-1"]);
    let harness = Harness::new(instruments);

    let missing = Instrument::new("GC-2", InstrumentKind::PeakSimple, root.path().join("nope"));
    assert!(matches!(
        harness.supervisor.add(missing),
        Err(SupervisorError::PathNotFound(_))
    ));

    let duplicate = Instrument::new("GC-1", InstrumentKind::PeakSimple, root.path());
    assert!(matches!(
        harness.supervisor.add(duplicate),
        Err(SupervisorError::DuplicateInstrument(_))
    ));

    harness
        .supervisor
        .add(Instrument::new("GC-2", InstrumentKind::PeakSimple, root.path()))
        .unwrap();
    assert_eq!(harness.supervisor.name_at(2).unwrap(), "GC-2");
    assert_eq!(harness.supervisor.state_of("GC-2"), Some(RunState::Stopped));

    harness.supervisor.start("GC-1").await.unwrap();
    assert!(matches!(
        harness.supervisor.remove("GC-1").await,
        Err(SupervisorError::StillRunning(_))
    ));

    let removed = harness.supervisor.remove("GC-2").await.unwrap();
    assert_eq!(removed.path, PathBuf::from(root.path()));
    let names: Vec<String> = harness
        .supervisor
        .instruments()
        .into_iter()
        .map(|i| i.name)
        .collect();
    assert_eq!(names, vec!["GC-1"]);
}

#[tokio::test]
async fn test_snapshot_reports_order_and_start_time() {
    let (_root, instruments) = instrument_dirs(&["GC-1", "GC-2"]);
    let harness = Harness::new(instruments);
    harness.supervisor.start("GC-2").await.unwrap();

    let snapshot = harness.supervisor.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!((snapshot[0].index, snapshot[0].name.as_str()), (1, "GC-1"));
    assert_eq!((snapshot[1].index, snapshot[1].name.as_str()), (2, "GC-2"));
    assert!(snapshot[0].started_at.is_none());
    assert!(snapshot[1].started_at.is_some());
    assert_eq!(snapshot[1].state, RunState::Running);
}

#[tokio::test]
async fn test_background_reconciler_collects_dead_units() {
    let (_root, instruments) = instrument_dirs(&["GC-1"]);
    let dir = instruments[0].path.clone();
    let harness = Harness::new(instruments);
    harness.supervisor.start("GC-1").await.unwrap();

    let shutdown = CancellationToken::new();
    let reconciler = harness
        .supervisor
        .spawn_reconciler(Duration::from_millis(50), shutdown.clone());

    harness.source.close(&dir);

    assert!(
        wait_for(
            || harness.supervisor.snapshot()[0].started_at.is_none(),
            2000
        )
        .await,
        "reconciler should move the slot back to stopped"
    );
    assert!(harness.supervisor.reconcile().await.is_empty());

    shutdown.cancel();
    reconciler.await.unwrap();
}

#[tokio::test]
async fn test_duplicate_names_rejected_at_construction() {
    let (_root, mut instruments) = instrument_dirs(&["GC-1"]);
    instruments.push(instruments[0].clone());

    let source = common::ChannelEventSource::new();
    let pipeline = Arc::new(autorename::services::RenamePipeline::new(
        common::TextFileReader::new(),
        fast_pipeline_config(),
    ));
    let watcher = autorename::application::InstrumentWatcher::new(
        source,
        pipeline,
        Duration::from_millis(50),
    );
    let result = autorename::application::InstrumentSupervisor::new(
        watcher,
        instruments,
        Duration::from_secs(1),
    );
    assert!(matches!(result, Err(SupervisorError::DuplicateInstrument(_))));
}

#[tokio::test]
async fn test_watch_failure_with_stuck_job_is_reconciled_promptly() {
    setup_test_logging();
    let (_root, instruments) = instrument_dirs(&["GC-1"]);
    let dir = instruments[0].path.clone();
    let harness = Harness::with_options(
        instruments,
        HarnessOptions {
            reader: TextFileReader::slow(Duration::from_secs(30)),
            drain_timeout: Duration::from_millis(200),
            ..HarnessOptions::default()
        },
    );
    harness.supervisor.start("GC-1").await.unwrap();

    let report = write_report(&dir, "PrintText.pdf", &["Data File: STUCK.D"]);
    harness.source.create_file(&report);
    assert!(wait_for(|| harness.reader.max_in_flight() == 1, 2000).await);

    harness
        .source
        .fail(&dir, WatchError::Backend("inotify queue overflow".to_string()));

    assert!(
        wait_for(
            || harness.supervisor.state_of("GC-1") == Some(RunState::Stopped),
            1000
        )
        .await
    );
    assert!(!harness.source.is_subscribed(&dir));

    let reconciled = harness.supervisor.reconcile().await;
    assert_eq!(reconciled.len(), 1);
    assert!(matches!(reconciled[0].1, UnitExit::Failed(WatchError::Backend(_))));

    // The stuck job does not block a restart or the bounded shutdown
    harness.supervisor.start("GC-1").await.unwrap();
    let started = std::time::Instant::now();
    let exits = harness.supervisor.stop_all().await;
    assert_eq!(exits, vec![("GC-1".to_string(), UnitExit::Stopped)]);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(report.exists());
}

#[tokio::test]
async fn test_repeated_events_for_one_path_rename_once() {
    setup_test_logging();
    let (_root, instruments) = instrument_dirs(&["GC-1"]);
    let dir = instruments[0].path.clone();
    let harness = Harness::with_options(
        instruments,
        HarnessOptions {
            reader: TextFileReader::slow(Duration::from_millis(100)),
            ..HarnessOptions::default()
        },
    );
    harness.supervisor.start("GC-1").await.unwrap();

    let report = write_report(&dir, "PrintText.pdf", &["Data File: TWICE.D"]);
    assert!(harness.source.create_file(&report));
    assert!(harness.source.create_file(&report));

    assert!(
        wait_for(|| harness.supervisor.snapshot()[0].jobs.total() == 2, 5000).await,
        "both jobs should reach a terminal outcome"
    );

    let jobs = harness.supervisor.snapshot()[0].jobs;
    assert_eq!(jobs.renamed, 1);
    assert_eq!(jobs.failed, 1);
    assert_eq!(harness.reader.max_in_flight(), 1);
    assert_eq!(file_names(&dir), vec!["PrintTextTWICE.D.pdf"]);
}
