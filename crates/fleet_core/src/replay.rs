//! Decision log for replay verification.
//!
//! Every tick the engine appends what it issued together with a hash of its
//! internal state. Two runs over the same tick stream must produce the same
//! log; comparing [`DecisionLog::final_hash`] is the cheap way to check it.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::error::{EngineError, Result};
use crate::unit::Tick;

/// Decision log format version.
pub const DECISION_LOG_VERSION: u32 = 1;

/// What the engine did on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Tick index.
    pub tick: Tick,
    /// Command issued, `None` for a no-op.
    pub command: Option<Command>,
    /// Engine state hash after the tick.
    pub state_hash: u64,
}

/// Per-tick record of a whole game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionLog {
    /// Log format version.
    pub version: u32,
    /// Strategy chosen on the first tick.
    pub strategy: String,
    /// Seed of the strategy RNG.
    pub seed: u64,
    /// One record per tick, in tick order.
    pub records: Vec<DecisionRecord>,
}

impl DecisionLog {
    /// Create an empty log.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            version: DECISION_LOG_VERSION,
            strategy: String::new(),
            seed,
            records: Vec::new(),
        }
    }

    /// Append one tick.
    pub fn record(&mut self, tick: Tick, command: Option<Command>, state_hash: u64) {
        self.records.push(DecisionRecord {
            tick,
            command,
            state_hash,
        });
    }

    /// Number of ticks recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Commands actually issued, with their ticks.
    pub fn issued(&self) -> impl Iterator<Item = (Tick, &Command)> {
        self.records
            .iter()
            .filter_map(|r| r.command.as_ref().map(|c| (r.tick, c)))
    }

    /// Last recorded tick.
    #[must_use]
    pub fn last_tick(&self) -> Option<Tick> {
        self.records.last().map(|r| r.tick)
    }

    /// Hash over every record.
    #[must_use]
    pub fn final_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.strategy.hash(&mut hasher);
        self.records.len().hash(&mut hasher);
        for record in &self.records {
            record.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Encode to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode from bytes, rejecting other format versions.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let log: Self = bincode::deserialize(bytes)?;
        if log.version != DECISION_LOG_VERSION {
            return Err(EngineError::LogVersion {
                found: log.version,
                expected: DECISION_LOG_VERSION,
            });
        }
        Ok(log)
    }

    /// Save to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_bytes()?)?;
        Ok(())
    }

    /// Load from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }
}
