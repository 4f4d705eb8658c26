//! Offline registry commands: `autorename instrument ...`

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::output::table::TableFormatter;
use crate::cli::output::{output, CommandOutput, MessageOutput};
use crate::cli::types::InstrumentCommands;
use crate::domain::models::{Config, Instrument};
use crate::domain::ports::InstrumentStore;
use crate::infrastructure::YamlInstrumentStore;

#[derive(Debug, Serialize)]
pub struct InstrumentListOutput {
    pub instruments: Vec<Instrument>,
}

impl CommandOutput for InstrumentListOutput {
    fn to_human(&self) -> String {
        if self.instruments.is_empty() {
            return "No instruments registered. Add one with `autorename instrument add`.".to_string();
        }
        TableFormatter::new().format_instruments(&self.instruments)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn execute(command: InstrumentCommands, config: &Config, json_mode: bool) -> Result<()> {
    let store = YamlInstrumentStore::new(&config.registry.path);
    let mut instruments = store.load().context("Failed to load instrument registry")?;

    match command {
        InstrumentCommands::List => {
            output(&InstrumentListOutput { instruments }, json_mode);
        }
        InstrumentCommands::Add { name, kind, path } => {
            if !path.is_dir() {
                anyhow::bail!("Watch path does not exist or is not a directory: {}", path.display());
            }
            if instruments.iter().any(|i| i.name == name) {
                anyhow::bail!("Instrument already registered: {name}");
            }

            let instrument = Instrument::new(name, kind, path);
            instruments.push(instrument.clone());
            store.save(&instruments).context("Failed to save instrument registry")?;

            output(
                &MessageOutput::with_detail(
                    format!("Added {} ({}) watching {}", instrument.name, instrument.kind, instrument.path.display()),
                    &instrument,
                ),
                json_mode,
            );
        }
        InstrumentCommands::Remove { instrument } => {
            let position = resolve(&instruments, &instrument)
                .with_context(|| format!("Instrument not found: {instrument}"))?;
            let removed = instruments.remove(position);
            store.save(&instruments).context("Failed to save instrument registry")?;

            output(
                &MessageOutput::with_detail(format!("Removed {}", removed.name), &removed),
                json_mode,
            );
        }
    }

    Ok(())
}

/// Position of an instrument given by exact name or 1-based list number
fn resolve(instruments: &[Instrument], key: &str) -> Option<usize> {
    instruments.iter().position(|i| i.name == key).or_else(|| {
        key.parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .filter(|&i| i < instruments.len())
    })
}
