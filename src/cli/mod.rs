//! Command-line interface: clap commands, console parsing and output

pub mod commands;
pub mod console;
pub mod output;
pub mod types;

pub use types::{Cli, Commands, InstrumentCommands};

/// Report a top-level command error on stderr
pub fn handle_error(err: &anyhow::Error, json_mode: bool) {
    if json_mode {
        let body = serde_json::json!({
            "error": err.to_string(),
            "causes": err.chain().skip(1).map(ToString::to_string).collect::<Vec<_>>(),
        });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
}
