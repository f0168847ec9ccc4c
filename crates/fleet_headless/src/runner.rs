//! Session runner.
//!
//! [`HeadlessRunner`] drives one engine over a stream of protocol lines.
//! Recorded sessions (the same JSON lines saved to a file) can be replayed
//! to produce a decision log, or replayed several times to verify that the
//! engine is deterministic.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use thiserror::Error;

use fleet_core::command::MoveDescription;
use fleet_core::config::EngineConfig;
use fleet_core::engine::DecisionEngine;
use fleet_core::environment::{GameRules, TickInput};
use fleet_core::error::EngineError;
use fleet_core::replay::DecisionLog;

use crate::protocol::{encode_response, parse_message, Message, ProtocolError, Response};

/// Errors from running or replaying a session.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Protocol failure that cannot be reported in-band.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Engine construction or log IO failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Reading a session file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A recorded session has no init message.
    #[error("Session has no init message")]
    MissingInit,

    /// A recorded session has a malformed line.
    #[error("Session line {line}: {source}")]
    BadLine {
        /// One-based line number.
        line: usize,
        /// What went wrong.
        source: ProtocolError,
    },
}

/// Outcome of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Ticks processed.
    pub ticks: u64,
    /// Non-no-op moves sent.
    pub issued: u64,
    /// Lines answered with an error response.
    pub rejected: u64,
    /// Hash of the decision log.
    pub final_hash: u64,
}

/// Drives one engine from protocol messages.
#[derive(Debug)]
pub struct HeadlessRunner {
    config: EngineConfig,
    engine: Option<DecisionEngine>,
    ticks: u64,
    issued: u64,
}

impl HeadlessRunner {
    /// Create a runner that builds its engine with `config` on init.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            engine: None,
            ticks: 0,
            issued: 0,
        }
    }

    /// Handle one message, returning the line to send back, if any.
    pub fn handle(&mut self, message: Message) -> Result<Option<Response>, ProtocolError> {
        match message {
            Message::Init { rules } => {
                if self.engine.is_some() {
                    return Err(ProtocolError::AlreadyInitialized);
                }
                tracing::info!(
                    world_width = rules.world_width,
                    tick_count = rules.tick_count,
                    "Session initialized"
                );
                self.engine = Some(DecisionEngine::new(&rules, self.config.clone())?);
                Ok(None)
            }
            Message::Tick(report) => {
                let tick = report.tick;
                let engine = self
                    .engine
                    .as_mut()
                    .ok_or(ProtocolError::NotInitialized(tick))?;
                let decision = engine.tick(&TickInput::from(report));
                self.ticks += 1;
                if !decision.is_noop() {
                    self.issued += 1;
                }
                Ok(Some(Response::Move(decision)))
            }
            Message::Quit => Ok(Some(self.bye())),
        }
    }

    fn bye(&self) -> Response {
        Response::Bye {
            ticks: self.ticks,
            final_hash: self.final_hash(),
        }
    }

    /// Hash of the decision log so far, zero before init.
    #[must_use]
    pub fn final_hash(&self) -> u64 {
        self.engine.as_ref().map_or(0, |e| e.log().final_hash())
    }

    /// Decision log, once initialized.
    #[must_use]
    pub fn log(&self) -> Option<&DecisionLog> {
        self.engine.as_ref().map(DecisionEngine::log)
    }

    /// Serve a whole session: read lines until quit or end of input.
    ///
    /// Malformed lines and out-of-order messages are answered with an
    /// error response and skipped; only IO failures end the session early.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        reader: R,
        mut writer: W,
    ) -> Result<RunSummary, RunnerError> {
        let mut rejected = 0;
        let mut said_bye = false;

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let response = match parse_message(&line).and_then(|m| self.handle(m)) {
                Ok(response) => response,
                Err(err) => {
                    tracing::warn!(error = %err, "Rejected message");
                    rejected += 1;
                    Some(Response::Error {
                        message: err.to_string(),
                    })
                }
            };

            if let Some(response) = response {
                said_bye = matches!(response, Response::Bye { .. });
                writeln!(writer, "{}", encode_response(&response)?)?;
                writer.flush()?;
            }
            if said_bye {
                break;
            }
        }

        if !said_bye {
            writeln!(writer, "{}", encode_response(&self.bye())?)?;
            writer.flush()?;
        }

        tracing::info!(
            ticks = self.ticks,
            issued = self.issued,
            rejected,
            "Session finished"
        );
        Ok(RunSummary {
            ticks: self.ticks,
            issued: self.issued,
            rejected,
            final_hash: self.final_hash(),
        })
    }
}

/// A recorded session: the rules and every tick report, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Game rules from the init message.
    pub rules: GameRules,
    /// Tick reports.
    pub ticks: Vec<TickInput>,
}

impl Session {
    /// Parse a recorded session from protocol lines.
    ///
    /// Unlike a live run, a malformed line is an error here.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self, RunnerError> {
        let mut rules = None;
        let mut ticks = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let message = parse_message(&line).map_err(|source| RunnerError::BadLine {
                line: index + 1,
                source,
            })?;
            match message {
                Message::Init { rules: r } => rules = Some(r),
                Message::Tick(report) => ticks.push(TickInput::from(report)),
                Message::Quit => break,
            }
        }

        Ok(Self {
            rules: rules.ok_or(RunnerError::MissingInit)?,
            ticks,
        })
    }

    /// Load a recorded session file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RunnerError> {
        let file = File::open(path.as_ref())?;
        Self::parse(BufReader::new(file))
    }
}

/// Play a recorded session through a fresh engine.
pub fn replay(
    session: &Session,
    config: &EngineConfig,
) -> Result<(Vec<MoveDescription>, DecisionLog), RunnerError> {
    let mut engine = DecisionEngine::new(&session.rules, config.clone())?;
    let moves = session.ticks.iter().map(|input| engine.tick(input)).collect();
    Ok((moves, engine.into_log()))
}

/// Result of replaying a session several times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    /// Final log hash of each run.
    pub hashes: Vec<u64>,
    /// First tick at which a run's log differed from the first run's.
    pub first_divergence: Option<u64>,
}

impl VerifyReport {
    /// Whether every run produced the same log.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.first_divergence.is_none() && self.hashes.windows(2).all(|w| w[0] == w[1])
    }
}

/// Replay a session `runs` times and compare the decision logs.
pub fn verify(
    session: &Session,
    config: &EngineConfig,
    runs: usize,
) -> Result<VerifyReport, RunnerError> {
    let mut hashes = Vec::with_capacity(runs);
    let mut reference: Option<DecisionLog> = None;
    let mut first_divergence = None;

    for run in 0..runs.max(1) {
        let (_, log) = replay(session, config)?;
        hashes.push(log.final_hash());
        match &reference {
            None => reference = Some(log),
            Some(first) => {
                let diverged = first
                    .records
                    .iter()
                    .zip(&log.records)
                    .find(|(a, b)| a != b)
                    .map(|(a, _)| a.tick);
                if let Some(tick) = diverged {
                    tracing::warn!(run, tick, "Replay diverged");
                    first_divergence = Some(first_divergence.map_or(tick, |t: u64| t.min(tick)));
                }
            }
        }
    }

    Ok(VerifyReport {
        hashes,
        first_divergence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{encode_message, TickReport};
    use fleet_test_utils::fixtures::Scenario;

    fn session_text(scenario: &Scenario, ticks: u64) -> String {
        let mut lines = vec![encode_message(&Message::Init {
            rules: scenario.rules.clone(),
        })
        .expect("encode init")];
        for tick in 0..ticks {
            let report = TickReport::from(&scenario.input(tick));
            lines.push(encode_message(&Message::Tick(report)).expect("encode tick"));
        }
        lines.join("\n")
    }

    #[test]
    fn test_run_answers_every_tick() {
        let scenario = Scenario::open_field(3);
        let input = session_text(&scenario, 20);
        let mut output = Vec::new();

        let summary = HeadlessRunner::new(EngineConfig::default())
            .run(input.as_bytes(), &mut output)
            .expect("session runs");

        let text = String::from_utf8(output).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(summary.ticks, 20);
        // One move per tick plus the closing bye
        assert_eq!(lines.len(), 21);
        assert!(lines[0].starts_with(r#"{"type":"move","action":"clear_and_select""#));
        assert!(lines[20].starts_with(r#"{"type":"bye""#));
        assert!(summary.issued > 0);
    }

    #[test]
    fn test_bad_lines_are_reported_and_skipped() {
        let input = [
            r#"{"msg":"tick","tick":0,"me":{"id":1,"score":0,"strike_cooldown_ticks":0},"opponent":{"id":2,"score":0,"strike_cooldown_ticks":0}}"#,
            "garbage",
            r#"{"msg":"quit"}"#,
            r#"{"msg":"init","rules":{}}"#,
        ]
        .join("\n");
        let mut output = Vec::new();
        let summary = HeadlessRunner::new(EngineConfig::default())
            .run(input.as_bytes(), &mut output)
            .expect("session runs");

        let text = String::from_utf8(output).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(summary.rejected, 2);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("before init"));
        assert!(lines[2].starts_with(r#"{"type":"bye","ticks":0"#));
    }

    #[test]
    fn test_session_file_replays_deterministically() {
        let scenario = Scenario::territory(3);
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.jsonl");
        std::fs::write(&path, session_text(&scenario, 120)).expect("write session");

        let session = Session::load(&path).expect("load session");
        assert_eq!(session.ticks.len(), 120);

        let report = verify(&session, &EngineConfig::default(), 3).expect("verify");
        assert_eq!(report.hashes.len(), 3);
        assert!(report.is_deterministic());
    }

    #[test]
    fn test_session_without_init_is_rejected() {
        let text = r#"{"msg":"quit"}"#;
        assert!(matches!(
            Session::parse(text.as_bytes()),
            Err(RunnerError::MissingInit)
        ));
        assert!(matches!(
            Session::parse("{".as_bytes()),
            Err(RunnerError::BadLine { line: 1, .. })
        ));
    }
}
