//! Deterministic replay.
//!
//! A replay is (level, seed, per-tick input words per player). Replaying
//! constructs a fresh game with the same seed and feeds the inputs in
//! order; blake3 state-hash checkpoints recorded along the way verify
//! that the run has not diverged. Any mismatch at any checkpoint is a
//! determinism bug.

use std::collections::BTreeMap;
use std::sync::Arc;

use antares_data::Plugin;
use serde::{Deserialize, Serialize};

use crate::game::Game;
use crate::level::{start_level, SimError};

// ---------------------------------------------------------------------------
// Log structure
// ---------------------------------------------------------------------------

/// One tick's worth of player input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFrame {
    /// (player, key word) pairs; absent players press nothing.
    pub keys: Vec<(usize, u32)>,
}

impl InputFrame {
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// A recorded game: everything needed to reproduce a run bit-exactly.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplayLog {
    /// Level index in the plugin.
    pub level: usize,
    /// Global stream seed.
    pub seed: i32,
    /// Input frames, indexed by tick from the end of warmup.
    pub frames: Vec<InputFrame>,
    /// State-hash checkpoints keyed by tick.
    pub checkpoints: BTreeMap<u64, String>,
}

/// The outcome of a verification replay.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplayResult {
    pub completed: bool,
    pub ticks_replayed: u64,
    /// The first checkpoint that did not match, if any.
    pub first_divergence: Option<ReplayDivergence>,
}

/// Details of a determinism failure.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplayDivergence {
    pub tick: u64,
    pub expected_hash: String,
    pub actual_hash: String,
}

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

/// Records inputs and periodic checkpoints while a game runs.
pub struct ReplayRecorder {
    log: ReplayLog,
    checkpoint_interval: u64,
    tick: u64,
}

impl ReplayRecorder {
    /// A recorder for a game started from (level, seed). With interval
    /// zero, checkpoints are taken every tick.
    pub fn new(level: usize, seed: i32, checkpoint_interval: u64) -> ReplayRecorder {
        ReplayRecorder {
            log: ReplayLog {
                level,
                seed,
                frames: Vec::new(),
                checkpoints: BTreeMap::new(),
            },
            checkpoint_interval,
            tick: 0,
        }
    }

    /// Record one tick: call before `Game::tick`, after injecting this
    /// tick's inputs into both the recorder and the game.
    pub fn record_tick(&mut self, game: &Game, input: InputFrame) {
        self.log.frames.push(input);
        let take = self.checkpoint_interval == 0 || self.tick % self.checkpoint_interval == 0;
        if take {
            self.log.checkpoints.insert(self.tick, game.state_hash());
        }
        self.tick += 1;
    }

    /// Finish and return the log.
    pub fn finish(self) -> ReplayLog {
        self.log
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Replay a log from scratch, verifying every checkpoint. Stops at the
/// first divergence but reports the ticks completed up to it.
pub fn replay(plug: Arc<Plugin>, log: &ReplayLog) -> Result<ReplayResult, SimError> {
    let mut game = start_level(plug, log.level, log.seed)?;
    let mut ticks_replayed = 0u64;

    for (tick, frame) in log.frames.iter().enumerate() {
        let tick = tick as u64;
        for &(player, mask) in &frame.keys {
            game.inject_input(player, mask);
        }

        if let Some(expected) = log.checkpoints.get(&tick) {
            let actual = game.state_hash();
            if &actual != expected {
                return Ok(ReplayResult {
                    completed: false,
                    ticks_replayed,
                    first_divergence: Some(ReplayDivergence {
                        tick,
                        expected_hash: expected.clone(),
                        actual_hash: actual,
                    }),
                });
            }
        }

        game.tick();
        ticks_replayed += 1;
    }

    Ok(ReplayResult {
        completed: true,
        ticks_replayed,
        first_divergence: None,
    })
}
