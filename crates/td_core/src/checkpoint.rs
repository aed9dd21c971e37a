//! Resumable session snapshots.
//!
//! A checkpoint is a flat, versioned value record with no references
//! into live entity state. It is only ever taken at build-phase boundaries,
//! so it deliberately omits enemies and bullets: resuming always
//! restarts in the build phase, never mid-wave.
//!
//! Loading is tolerant: missing fields fall back to fresh-session
//! defaults, unknown tower kinds become `basic`, and a version mismatch
//! is logged rather than rejected.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::entities::TowerKind;
use crate::error::{GameError, Result};
use crate::session::{Mode, STARTING_GOLD, STARTING_LIVES};

/// Checkpoint format version.
pub const CHECKPOINT_VERSION: u32 = 1;

/// A saved tower: kind, cell, and remaining cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TowerRecord {
    /// Tower kind; unknown names load as basic.
    #[serde(default)]
    pub kind: TowerKind,
    /// Grid column.
    #[serde(default)]
    pub gx: i32,
    /// Grid row.
    #[serde(default)]
    pub gy: i32,
    /// Seconds of cooldown left when captured.
    #[serde(default)]
    pub cooldown_left: f32,
}

/// A resumable snapshot of a session at a build-phase boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Format version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Level the session was playing.
    #[serde(default)]
    pub level_id: u32,
    /// Campaign or endless.
    #[serde(default)]
    pub mode: Mode,
    /// Lives remaining.
    #[serde(default = "default_lives")]
    pub lives: i32,
    /// Gold on hand.
    #[serde(default = "default_gold")]
    pub gold: u32,
    /// Score including the fractional passive bonus.
    #[serde(default)]
    pub score: f64,
    /// Kills so far.
    #[serde(default)]
    pub kills: u32,
    /// Waves fully cleared.
    #[serde(default)]
    pub waves_cleared: u32,
    /// 1-based number of the next wave.
    #[serde(default = "default_wave")]
    pub current_wave_number: u32,
    /// Tower kind selected for building.
    #[serde(default)]
    pub selected_tower: TowerKind,
    /// All placed towers.
    #[serde(default)]
    pub towers: Vec<TowerRecord>,
}

fn default_version() -> u32 {
    CHECKPOINT_VERSION
}

fn default_lives() -> i32 {
    STARTING_LIVES
}

fn default_gold() -> u32 {
    STARTING_GOLD
}

fn default_wave() -> u32 {
    1
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            level_id: 0,
            mode: Mode::default(),
            lives: STARTING_LIVES,
            gold: STARTING_GOLD,
            score: 0.0,
            kills: 0,
            waves_cleared: 0,
            current_wave_number: 1,
            selected_tower: TowerKind::default(),
            towers: Vec::new(),
        }
    }
}

impl Checkpoint {
    /// Save the checkpoint to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize checkpoint: {}", e)))?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to write save file: {}", e)))?;
        Ok(())
    }

    /// Load a checkpoint from a file.
    ///
    /// # Errors
    /// Returns an error if file reading or deserialization fails. A
    /// version mismatch is only logged; the fields still load.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| GameError::InvalidState(format!("Failed to read save file: {}", e)))?;
        let checkpoint: Self = bincode::deserialize(&bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to decode save file: {}", e)))?;

        if checkpoint.version != CHECKPOINT_VERSION {
            tracing::warn!(
                found = checkpoint.version,
                expected = CHECKPOINT_VERSION,
                "save file version mismatch, loading anyway"
            );
        }

        Ok(checkpoint)
    }
}
