//! Headless runner for the fleet decision engine.
//!
//! The runner speaks JSON lines so an external game environment (or a test
//! harness) can drive the engine tick by tick:
//!
//! - **stdin**: `init`, `tick` and `quit` messages from the environment
//! - **stdout**: one move per tick, then a closing `bye`
//! - **stderr**: logs (human-readable)
//!
//! Recorded sessions can be replayed offline to produce a decision log, or
//! replayed several times to check that the engine is deterministic.
//!
//! See [`protocol`] for the message format.
//!
//! # Example
//!
//! ```bash
//! # Serve a live session
//! fleet_headless < session.jsonl
//!
//! # Replay a recorded session and save its decision log
//! fleet_headless replay --session session.jsonl --output decisions.bin
//!
//! # Verify determinism
//! fleet_headless verify --session session.jsonl --runs 5
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod protocol;
pub mod runner;

pub use protocol::{Message, ProtocolError, Response, TickReport};
pub use runner::{replay, verify, HeadlessRunner, RunSummary, RunnerError, Session, VerifyReport};
