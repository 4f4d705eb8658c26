//! Line commands accepted by `autorename run`

use std::path::PathBuf;

use crate::domain::models::InstrumentKind;

pub const HELP: &str = "\
Commands:
  list                        show instruments and their state
  toggle <N> | <N>            start or stop instrument N
  add <name> <kind> <path>    register an instrument (kind: cs | ps)
  remove <N>                  unregister stopped instrument N
  help                        show this help
  exit                        stop all instruments and quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Empty,
    List,
    Toggle(usize),
    Add {
        name: String,
        kind: InstrumentKind,
        path: PathBuf,
    },
    Remove(usize),
    Help,
    Exit,
}

/// Parse one console line
///
/// The path of `add` is the rest of the line, so it may contain spaces.
pub fn parse(line: &str) -> Result<ConsoleCommand, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    if rest.is_empty() {
        if let Ok(index) = verb.parse::<usize>() {
            return Ok(ConsoleCommand::Toggle(index));
        }
    }

    match verb.to_lowercase().as_str() {
        "" => Ok(ConsoleCommand::Empty),
        "list" | "ls" | "status" => Ok(ConsoleCommand::List),
        "toggle" => index(rest).map(ConsoleCommand::Toggle),
        "remove" | "rm" => index(rest).map(ConsoleCommand::Remove),
        "add" => add(rest),
        "help" | "?" => Ok(ConsoleCommand::Help),
        "exit" | "quit" | "q" => Ok(ConsoleCommand::Exit),
        other => Err(format!("unknown command '{other}', type 'help'")),
    }
}

fn index(arg: &str) -> Result<usize, String> {
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("expected an instrument number, got '{arg}'")),
    }
}

fn add(rest: &str) -> Result<ConsoleCommand, String> {
    let usage = || "usage: add <name> <kind> <path>".to_string();

    let (name, rest) = rest.split_once(char::is_whitespace).ok_or_else(usage)?;
    let (kind, path) = rest.trim().split_once(char::is_whitespace).ok_or_else(usage)?;
    let path = path.trim();
    if path.is_empty() {
        return Err(usage());
    }

    Ok(ConsoleCommand::Add {
        name: name.to_string(),
        kind: kind.parse()?,
        path: PathBuf::from(path),
    })
}
