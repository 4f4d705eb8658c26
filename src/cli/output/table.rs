//! Table output formatting for CLI commands
//!
//! Instrument status and registry tables using comfy-table.

use crate::application::InstrumentStatus;
use crate::domain::models::{Instrument, RunState};
use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

/// Table formatter for CLI output
pub struct TableFormatter {
    use_colors: bool,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
        }
    }

    pub const fn with_colors(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Numbered status table, as shown by the console `list` command
    pub fn format_status(&self, statuses: &[InstrumentStatus]) -> String {
        let mut table = create_base_table();

        table.set_header(vec![
            Cell::new("#").add_attribute(Attribute::Bold),
            Cell::new("Instrument").add_attribute(Attribute::Bold),
            Cell::new("Software").add_attribute(Attribute::Bold),
            Cell::new("State").add_attribute(Attribute::Bold),
            Cell::new("Since").add_attribute(Attribute::Bold),
            Cell::new("Renamed").add_attribute(Attribute::Bold),
            Cell::new("Skipped").add_attribute(Attribute::Bold),
            Cell::new("Failed").add_attribute(Attribute::Bold),
            Cell::new("Path").add_attribute(Attribute::Bold),
        ]);

        for status in statuses {
            let label = if status.transitioning {
                format!("{}*", status.state)
            } else {
                status.state.to_string()
            };
            let state_cell = if self.use_colors {
                Cell::new(label).fg(state_color(status.state))
            } else {
                Cell::new(format!("{} {label}", state_icon(status.state)))
            };

            let since = status
                .started_at
                .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string());

            table.add_row(vec![
                Cell::new(status.index),
                Cell::new(&status.name),
                Cell::new(status.kind),
                state_cell,
                Cell::new(since),
                Cell::new(status.jobs.renamed),
                Cell::new(status.jobs.skipped),
                Cell::new(status.jobs.failed),
                Cell::new(status.path.display()),
            ]);
        }

        table.to_string()
    }

    /// Registry contents without run state
    pub fn format_instruments(&self, instruments: &[Instrument]) -> String {
        let mut table = create_base_table();

        table.set_header(vec![
            Cell::new("#").add_attribute(Attribute::Bold),
            Cell::new("Instrument").add_attribute(Attribute::Bold),
            Cell::new("Software").add_attribute(Attribute::Bold),
            Cell::new("Path").add_attribute(Attribute::Bold),
        ]);

        for (i, instrument) in instruments.iter().enumerate() {
            let path_cell = if self.use_colors && !instrument.path.is_dir() {
                Cell::new(instrument.path.display()).fg(Color::Red)
            } else {
                Cell::new(instrument.path.display())
            };
            table.add_row(vec![
                Cell::new(i + 1),
                Cell::new(&instrument.name),
                Cell::new(instrument.kind),
                path_cell,
            ]);
        }

        table.to_string()
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn create_base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn supports_color() -> bool {
    // Respect NO_COLOR environment variable
    if env::var("NO_COLOR").is_ok() {
        return false;
    }

    !matches!(env::var("TERM").as_deref(), Ok("dumb"))
}

const fn state_color(state: RunState) -> Color {
    match state {
        RunState::Running => Color::Green,
        RunState::Stopped => Color::DarkGrey,
    }
}

const fn state_icon(state: RunState) -> &'static str {
    match state {
        RunState::Running => "●",
        RunState::Stopped => "○",
    }
}
