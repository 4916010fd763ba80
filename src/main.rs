//! Binary entrypoint for the Questline CLI.
//!
//! Commands:
//! - `start [--user <id>] [--team <id>] [--token <credential>]` - run the interactive quest console
//! - `init` - create a starter `config.toml`
//! - `status` - print the current progress summary
//! - `reset --yes` - wipe all stored progress
//!
//! See the library crate docs for module-level details: `questline::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use questline::config::Config;
use questline::quest::commands::{CommandOutcome, CommandProcessor};
use questline::quest::QuestEngine;

#[derive(Parser)]
#[command(name = "questline")]
#[command(about = "Progress tracking and backend sync engine for location-based quest games")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive quest console
    Start {
        /// Player id override (normally supplied by the hosting platform)
        #[arg(long)]
        user: Option<String>,

        /// Team id override
        #[arg(long)]
        team: Option<String>,

        /// Session token override (opaque launch credential)
        #[arg(long)]
        token: Option<String>,
    },
    /// Initialize a new configuration file
    Init,
    /// Show quest progress
    Status,
    /// Wipe all stored progress
    Reset {
        /// Confirm: reset is destructive and cannot be undone
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Start { user, team, token } => {
            let mut config = pre_config.unwrap_or(Config::load(&cli.config).await?);
            // CLI identity overrides config (the host platform passes these at launch)
            if user.is_some() {
                config.session.user_id = user;
            }
            if team.is_some() {
                config.session.team_id = team;
            }
            if token.is_some() {
                config.session.auth_token = token;
            }

            info!("Starting Questline v{}", env!("CARGO_PKG_VERSION"));
            let mut engine = QuestEngine::new(&config)?;
            engine.load_triggers().await;
            run_console(engine, config.backend.trigger_poll_seconds).await?;
        }
        Commands::Init => {
            info!("Initializing new Questline configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Status => {
            let config = pre_config.unwrap_or(Config::load(&cli.config).await?);
            let engine = QuestEngine::new(&config)?;
            println!("{}", engine.status_summary());
        }
        Commands::Reset { yes } => {
            if !yes {
                eprintln!("Refusing to reset without --yes (this wipes all progress).");
                std::process::exit(1);
            }
            let config = pre_config.unwrap_or(Config::load(&cli.config).await?);
            let mut engine = QuestEngine::new(&config)?;
            engine.reset();
            println!("Progress wiped.");
        }
    }

    Ok(())
}

/// Interactive console loop: player commands on stdin, trigger evaluation on a
/// polling interval. Trigger correctness does not depend on the cadence; the
/// interval only bounds how late a message can surface.
async fn run_console(mut engine: QuestEngine, poll_seconds: u64) -> Result<()> {
    let processor = CommandProcessor::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut ticker =
        tokio::time::interval(std::time::Duration::from_secs(poll_seconds.max(1)));

    println!("{}", engine.status_summary());
    stdout.write_all(b"quest> ").await?;
    stdout.flush().await?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break; // stdin closed
                };
                match processor.process(&mut engine, &line).await? {
                    CommandOutcome::Quit => break,
                    CommandOutcome::Reply(reply) => {
                        if !reply.is_empty() {
                            println!("{}", reply);
                        }
                    }
                }
                stdout.write_all(b"quest> ").await?;
                stdout.flush().await?;
            }
            _ = ticker.tick() => {
                for fire in engine.poll_triggers(chrono::Utc::now()) {
                    match fire.message {
                        Some(message) => println!("\n*** {} ***", message),
                        None => warn!("trigger {} fired without a message", fire.id),
                    }
                }
            }
        }
    }

    info!("session ended");
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .map(|c| c.logging.level.parse().unwrap_or(log::LevelFilter::Info))
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config.as_ref().and_then(|c| c.logging.file.clone());
    if let Some(file) = log_file {
        if let Ok(f) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file)
        {
            let mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            let write_mutex = mutex.clone();

            // If stdout is a terminal, mirror log lines to the console as well;
            // under a pipe or service manager only the file gets them.
            let is_tty = atty::is(atty::Stream::Stdout);

            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());

                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }

                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        } else {
            builder.format(|fmt, record| {
                writeln!(
                    fmt,
                    "{} [{}] {}",
                    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                    record.level(),
                    record.args()
                )
            });
        }
    } else {
        builder.format(|fmt, record| {
            writeln!(
                fmt,
                "{} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.args()
            )
        });
    }
    let _ = builder.try_init();
}
