//! Headless decision engine.
//!
//! This binary serves one game over JSON lines on stdin/stdout, or works
//! offline on a recorded session file.
//!
//! # Usage
//!
//! ```bash
//! # Serve a session from stdin
//! fleet_headless
//!
//! # Same, with a tuned engine configuration
//! fleet_headless --config engine.ron run
//!
//! # Replay a recorded session, save the decision log and compare it
//! fleet_headless replay --session game.jsonl --output decisions.bin --check old.bin
//!
//! # Verify determinism
//! fleet_headless verify --session game.jsonl --runs 5
//! ```
//!
//! Logs go to stderr; stdout carries protocol output only.

use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fleet_core::config::EngineConfig;
use fleet_core::replay::DecisionLog;
use fleet_headless::runner::{replay, verify, HeadlessRunner, Session};

#[derive(Parser)]
#[command(name = "fleet_headless")]
#[command(about = "Headless decision engine for real-time strategy games")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Engine configuration file (RON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve one session over stdin/stdout
    Run,

    /// Replay a recorded session
    Replay {
        /// Recorded session (JSON lines)
        #[arg(short, long)]
        session: PathBuf,

        /// Write the decision log here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Compare against a previously saved decision log
        #[arg(long)]
        check: Option<PathBuf>,

        /// Print every move to stdout
        #[arg(long)]
        moves: bool,
    },

    /// Verify determinism by replaying a session several times
    Verify {
        /// Recorded session (JSON lines)
        #[arg(short, long)]
        session: PathBuf,

        /// Number of runs
        #[arg(short, long, default_value = "5")]
        runs: usize,
    },

    /// Print the effective engine configuration as RON
    Config,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    let config = load_config(cli.config);

    match cli.command {
        Some(Commands::Run) | None => cmd_run(config),
        Some(Commands::Replay {
            session,
            output,
            check,
            moves,
        }) => cmd_replay(&config, session, output, check, moves),
        Some(Commands::Verify { session, runs }) => cmd_verify(&config, session, runs),
        Some(Commands::Config) => println!("{}", config.to_ron_string()),
    }
}

fn fail(context: &str, err: impl std::fmt::Display) -> ! {
    tracing::error!("{context}: {err}");
    eprintln!("{context}: {err}");
    std::process::exit(1);
}

fn load_config(path: Option<PathBuf>) -> EngineConfig {
    let Some(path) = path else {
        return EngineConfig::default();
    };
    match EngineConfig::load(&path) {
        Ok(config) => {
            tracing::info!("Loaded engine configuration from {}", path.display());
            config
        }
        Err(e) => fail("Failed to load configuration", e),
    }
}

fn load_session(path: &Path) -> Session {
    match Session::load(path) {
        Ok(session) => {
            tracing::info!(
                "Loaded session {} ({} ticks)",
                path.display(),
                session.ticks.len()
            );
            session
        }
        Err(e) => fail("Failed to load session", e),
    }
}

/// Serve one session over stdin/stdout
fn cmd_run(config: EngineConfig) {
    tracing::info!("Starting session");

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut runner = HeadlessRunner::new(config);
    if let Err(e) = runner.run(BufReader::new(stdin.lock()), stdout.lock()) {
        fail("Session aborted", e);
    }
}

/// Replay a recorded session
fn cmd_replay(
    config: &EngineConfig,
    session: PathBuf,
    output: Option<PathBuf>,
    check: Option<PathBuf>,
    print_moves: bool,
) {
    let session = load_session(&session);
    let (moves, log) = match replay(&session, config) {
        Ok(result) => result,
        Err(e) => fail("Replay failed", e),
    };

    if print_moves {
        for decision in &moves {
            match serde_json::to_string(decision) {
                Ok(line) => println!("{line}"),
                Err(e) => fail("Failed to encode move", e),
            }
        }
    }

    eprintln!("Replayed session:");
    eprintln!("  Strategy: {}", log.strategy);
    eprintln!("  Ticks: {}", log.len());
    eprintln!("  Commands: {}", log.issued().count());
    eprintln!("  Hash: {:016x}", log.final_hash());

    if let Some(path) = output {
        if let Err(e) = log.save(&path) {
            fail("Failed to save decision log", e);
        }
        tracing::info!("Decision log written to {}", path.display());
    }

    if let Some(path) = check {
        let expected = match DecisionLog::load(&path) {
            Ok(expected) => expected,
            Err(e) => fail("Failed to load decision log", e),
        };
        if expected.final_hash() == log.final_hash() {
            eprintln!("PASS: Replay matches {}", path.display());
        } else {
            eprintln!("FAIL: Replay differs from {}", path.display());
            eprintln!("  Expected hash: {:016x}", expected.final_hash());
            eprintln!("  Actual hash:   {:016x}", log.final_hash());
            std::process::exit(1);
        }
    }
}

/// Verify determinism by replaying a session several times
fn cmd_verify(config: &EngineConfig, session: PathBuf, runs: usize) {
    tracing::info!("Verifying determinism: {} ({} runs)", session.display(), runs);

    let session = load_session(&session);
    let report = match verify(&session, config, runs) {
        Ok(report) => report,
        Err(e) => fail("Verification failed", e),
    };

    if report.is_deterministic() {
        eprintln!(
            "PASS: All {} runs produced identical results ({:016x})",
            report.hashes.len(),
            report.hashes.first().copied().unwrap_or_default()
        );
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        if let Some(tick) = report.first_divergence {
            eprintln!("  First divergence at tick {tick}");
        }
        std::process::exit(1);
    }
}
