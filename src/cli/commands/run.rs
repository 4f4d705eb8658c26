//! Interactive watcher: `autorename run`
//!
//! Loads the registry, supervises one watch unit per started instrument
//! and reads console commands until `exit`, end of input or Ctrl-C, all of
//! which stop every instrument before returning.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::{BufRead, Write};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::build_pipeline;
use crate::application::{InstrumentStatus, InstrumentSupervisor, InstrumentWatcher, UnitExit};
use crate::cli::console::{self, ConsoleCommand, HELP};
use crate::cli::output::table::TableFormatter;
use crate::cli::output::{output, CommandOutput, MessageOutput};
use crate::domain::models::{Config, Instrument};
use crate::domain::ports::InstrumentStore;
use crate::infrastructure::{NotifyEventSource, YamlInstrumentStore};

const TITLE: &str = "Auto File Renamer";

#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub instruments: Vec<InstrumentStatus>,
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        if self.instruments.is_empty() {
            return "No instruments registered. Use: add <name> <kind> <path>".to_string();
        }
        TableFormatter::new().format_status(&self.instruments)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct StoppedUnit {
    pub name: String,
    pub exit: String,
}

#[derive(Debug, Serialize)]
pub struct ShutdownOutput {
    pub stopped: Vec<StoppedUnit>,
}

impl CommandOutput for ShutdownOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!("Stopped {} instrument(s).", self.stopped.len())];
        for unit in &self.stopped {
            lines.push(format!("  {}: {}", unit.name, unit.exit));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn describe(exit: &UnitExit) -> String {
    match exit {
        UnitExit::Stopped => "stopped".to_string(),
        UnitExit::DrainTimedOut => "stopped (rename jobs still finishing)".to_string(),
        UnitExit::Failed(e) => format!("watch failed: {e}"),
        UnitExit::Panicked(e) => format!("watch unit panicked: {e}"),
    }
}

/// Build a supervisor over the OS notification backend
pub fn build_supervisor(config: &Config, instruments: Vec<Instrument>) -> Result<InstrumentSupervisor> {
    let watcher = InstrumentWatcher::new(
        Arc::new(NotifyEventSource::new()),
        build_pipeline(config.pipeline.clone()),
        config.supervisor.health_check_interval(),
    );
    InstrumentSupervisor::new(watcher, instruments, config.supervisor.drain_timeout())
        .context("Invalid instrument registry")
}

pub async fn execute(config: &Config, start_all: bool, json_mode: bool) -> Result<()> {
    let store = YamlInstrumentStore::new(&config.registry.path);
    let instruments = store.load().context("Failed to load instrument registry")?;
    let supervisor = Arc::new(build_supervisor(config, instruments)?);

    let shutdown = CancellationToken::new();
    let reconciler =
        supervisor.spawn_reconciler(config.supervisor.health_check_interval(), shutdown.clone());

    let mut input = spawn_input_reader()?;

    if !json_mode {
        banner();
    }

    if start_all {
        for instrument in supervisor.instruments() {
            if let Err(e) = supervisor.start(&instrument.name).await {
                output(&MessageOutput::new(format!("Could not start {}: {e}", instrument.name)), json_mode);
            }
        }
    }

    let console = Console {
        supervisor: Arc::clone(&supervisor),
        store,
        json_mode,
    };
    console.list();

    loop {
        prompt(json_mode);

        let line = tokio::select! {
            line = input.recv() => line,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received");
                None
            }
        };

        let line = match line {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                warn!(error = %e, "console input failed");
                break;
            }
            None => break,
        };

        match console::parse(&line) {
            Ok(ConsoleCommand::Exit) => break,
            Ok(command) => {
                if let Err(e) = console.dispatch(command).await {
                    output(&MessageOutput::new(format!("Error: {e:#}")), json_mode);
                }
            }
            Err(message) => output(&MessageOutput::new(message), json_mode),
        }
    }

    shutdown.cancel();
    let exits = supervisor.stop_all().await;
    if let Err(e) = reconciler.await {
        warn!(error = %e, "reconciler task failed");
    }

    output(
        &ShutdownOutput {
            stopped: exits
                .iter()
                .map(|(name, exit)| StoppedUnit {
                    name: name.clone(),
                    exit: describe(exit),
                })
                .collect(),
        },
        json_mode,
    );
    info!("shutdown complete");
    Ok(())
}

struct Console {
    supervisor: Arc<InstrumentSupervisor>,
    store: YamlInstrumentStore,
    json_mode: bool,
}

impl Console {
    async fn dispatch(&self, command: ConsoleCommand) -> Result<()> {
        match command {
            ConsoleCommand::Empty | ConsoleCommand::Exit => {}
            ConsoleCommand::Help => println!("{HELP}"),
            ConsoleCommand::List => {
                self.supervisor.reconcile().await;
                self.list();
            }
            ConsoleCommand::Toggle(index) => {
                let name = self.supervisor.name_at(index)?;
                let state = self.supervisor.toggle(&name).await?;
                self.say(format!("{name} is now {state}"));
            }
            ConsoleCommand::Add { name, kind, path } => {
                self.supervisor.add(Instrument::new(name.clone(), kind, path))?;
                self.persist()?;
                self.say(format!("Added {name} ({kind})"));
            }
            ConsoleCommand::Remove(index) => {
                let name = self.supervisor.name_at(index)?;
                self.supervisor.remove(&name).await?;
                self.persist()?;
                self.say(format!("Removed {name}"));
            }
        }
        Ok(())
    }

    fn list(&self) {
        output(
            &StatusOutput {
                instruments: self.supervisor.snapshot(),
            },
            self.json_mode,
        );
    }

    fn persist(&self) -> Result<()> {
        self.store
            .save(&self.supervisor.instruments())
            .context("Failed to save instrument registry")
    }

    fn say(&self, message: String) {
        output(&MessageOutput::new(message), self.json_mode);
    }
}

fn banner() {
    let rule = "=".repeat(32 + TITLE.len());
    println!("{rule}\n\t\t{TITLE}\n{rule}");
    println!("Type 'help' for commands.\n");
}

fn prompt(json_mode: bool) {
    if !json_mode {
        print!("> ");
        let _ = std::io::stdout().flush();
    }
}

/// Read stdin lines on a plain thread
///
/// A blocking stdin read inside the runtime would hold up shutdown until
/// the next newline; a detached thread does not.
fn spawn_input_reader() -> Result<mpsc::UnboundedReceiver<std::io::Result<String>>> {
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("Failed to start console input thread")?;

    Ok(rx)
}
