//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::models::InstrumentKind;

#[derive(Parser, Debug)]
#[command(name = "autorename")]
#[command(about = "Auto File Renamer - names instrument PDF reports after their data file", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Load configuration from this file instead of autorename.yaml
    #[arg(short, long, global = true, env = "AUTORENAME_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch registered instruments and take console commands
    Run {
        /// Start every registered instrument immediately
        #[arg(long)]
        start_all: bool,
    },

    /// Edit the instrument registry
    #[command(subcommand)]
    Instrument(InstrumentCommands),

    /// Rename a single report now
    Rename {
        /// Report PDF to rename
        file: PathBuf,

        /// Report software (chemstation|cs, peaksimple|ps)
        #[arg(short, long)]
        kind: InstrumentKind,

        /// Only print the derived name
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum InstrumentCommands {
    /// List registered instruments
    List,

    /// Register an instrument
    Add {
        /// Unique instrument name
        name: String,

        /// Report software (chemstation|cs, peaksimple|ps)
        kind: InstrumentKind,

        /// Directory the instrument writes reports to
        path: PathBuf,
    },

    /// Remove an instrument by name or list number
    Remove {
        /// Instrument name or 1-based list number
        instrument: String,
    },
}
