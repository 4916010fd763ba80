//! Console command processing.
//!
//! The command loop is the "UI-level actions" boundary: it parses one line at a
//! time, drives the engine, and renders engine errors as player-facing text.
//! Backend failures never surface as crashes here; they become messages.

use anyhow::Result;
use log::debug;

use crate::logutil::escape_log;
use crate::quest::engine::QuestEngine;
use crate::quest::errors::QuestError;

/// What the loop should do after a processed line.
#[derive(Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Print this reply and keep going.
    Reply(String),
    /// End the session.
    Quit,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Start,
    Go(String),
    Password(String),
    Hint,
    Status,
    Locations,
    Reset,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

fn parse(line: &str) -> Command {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Command::Empty;
    }
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let verb = parts.next().unwrap_or_default().to_ascii_lowercase();
    let rest = parts.next().map(str::trim).unwrap_or_default();

    match verb.as_str() {
        "start" => Command::Start,
        "go" | "goto" => {
            if rest.is_empty() {
                Command::Unknown("go needs a location id".to_string())
            } else {
                Command::Go(rest.to_string())
            }
        }
        "pass" | "password" => {
            if rest.is_empty() {
                Command::Unknown("password needs a value".to_string())
            } else {
                Command::Password(rest.to_string())
            }
        }
        "hint" | "h" => Command::Hint,
        "status" | "s" => Command::Status,
        "locations" | "map" | "l" => Command::Locations,
        "reset" => Command::Reset,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => Command::Unknown(format!("unknown command: {}", verb)),
    }
}

const HELP_TEXT: &str = "Commands:\n\
    start            - begin the mission\n\
    go <location>    - travel to a location\n\
    password <text>  - submit the password for the current location\n\
    hint             - request a hint (limited budget)\n\
    status           - progress summary\n\
    locations        - list locations and reachability\n\
    reset            - wipe all progress\n\
    quit             - leave\n";

/// Parses console input and executes it against the engine.
pub struct CommandProcessor;

impl CommandProcessor {
    pub fn new() -> Self {
        CommandProcessor
    }

    /// Process one input line.
    pub async fn process(&self, engine: &mut QuestEngine, line: &str) -> Result<CommandOutcome> {
        debug!("processing command: {}", escape_log(line));

        let reply = match parse(line) {
            Command::Empty => String::new(),
            Command::Quit => return Ok(CommandOutcome::Quit),
            Command::Help => HELP_TEXT.to_string(),
            Command::Status => engine.status_summary(),
            Command::Locations => Self::render_locations(engine),
            Command::Start => {
                if engine.start_game() {
                    "Mission started. Type 'locations' to see where you can go.".to_string()
                } else {
                    "The mission is already underway.".to_string()
                }
            }
            Command::Go(id) => Self::go(engine, &id).await,
            Command::Password(password) => Self::password(engine, &password).await,
            Command::Hint => Self::hint(engine).await,
            Command::Reset => {
                engine.reset();
                "All progress wiped. Type 'start' to begin again.".to_string()
            }
            Command::Unknown(message) => format!("{} (try 'help')", message),
        };
        Ok(CommandOutcome::Reply(reply))
    }

    fn render_locations(engine: &QuestEngine) -> String {
        let mut out = String::from("Locations:\n");
        for location in engine.graph().iter() {
            let state = if engine.progress().completed.contains(&location.id) {
                "done"
            } else if engine.can_access(&location.id) {
                "open"
            } else {
                "locked"
            };
            out.push_str(&format!("  {:<10} {:<18} [{}]\n", location.id, location.name, state));
        }
        out
    }

    async fn go(engine: &mut QuestEngine, id: &str) -> String {
        match engine.enter_location(id).await {
            Ok(Some(mission)) => format!("You arrive. Mission briefing:\n{}", mission),
            Ok(None) => "You arrive. (mission briefing unavailable offline)".to_string(),
            Err(QuestError::UnknownLocation(id)) => format!("No such location: {}", id),
            Err(QuestError::LocationLocked(name)) => {
                format!("{} is still locked. Clear the earlier locations first.", name)
            }
            Err(e) => format!("Could not enter location: {}", e),
        }
    }

    async fn password(engine: &mut QuestEngine, password: &str) -> String {
        match engine.submit_password(password).await {
            Ok(verdict) if verdict.success => {
                let mut out = "Correct! Amulet secured.".to_string();
                if engine.is_quest_complete() {
                    out.push_str(" The quest is complete!");
                }
                out
            }
            Ok(verdict) => verdict
                .message
                .unwrap_or_else(|| "Wrong password.".to_string()),
            Err(QuestError::Unauthorized) => {
                "Passwords can only be checked in an authenticated session.".to_string()
            }
            Err(QuestError::Unconfigured) => {
                "No backend configured; passwords cannot be checked offline.".to_string()
            }
            Err(e) => format!("Password check failed: {}", e),
        }
    }

    async fn hint(engine: &mut QuestEngine) -> String {
        match engine.request_hint().await {
            Ok(hint) => format!("Hint ({} left): {}", engine.hints_left(), hint),
            Err(QuestError::HintsExhausted) => "No hints left!".to_string(),
            Err(QuestError::Unauthorized) => {
                "Hints are only available in an authenticated session.".to_string()
            }
            Err(e) => format!("Hint unavailable ({} left): {}", engine.hints_left(), e),
        }
    }
}

impl Default for CommandProcessor {
    fn default() -> Self {
        Self::new()
    }
}
