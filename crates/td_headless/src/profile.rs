//! Player profiles and run history.
//!
//! A JSON store keyed by username. Each profile holds aggregate stats,
//! per-level best scores, an append-only run history, and at most one
//! saved game. The engine never reads or writes this store; the host
//! commits run records and checkpoints around sessions.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use td_core::checkpoint::Checkpoint;
use td_core::session::RunReport;

/// Error type for profile store operations.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// Failed to read or write the store file.
    #[error("Failed to access profile store: {0}")]
    Io(#[from] std::io::Error),
    /// Store file exists but does not parse.
    #[error("Failed to parse profile store: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Aggregate statistics for one player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStats {
    /// Completed (not saved-and-exited) runs.
    pub games_played: u32,
    /// Campaign victories.
    pub wins: u32,
    /// Kills across all runs.
    pub total_kills: u64,
}

/// One finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unix timestamp (seconds) when the run was recorded.
    pub ts: u64,
    /// Level played.
    pub level: u32,
    /// Final score.
    pub score: i64,
    /// Kills in the run.
    pub kills: u32,
    /// Whether the campaign was won.
    pub won: bool,
}

/// Everything stored for one player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    /// Aggregate stats.
    #[serde(default)]
    pub stats: ProfileStats,
    /// Best recorded score per level id.
    #[serde(default)]
    pub best_score_by_level: BTreeMap<u32, i64>,
    /// Run history, oldest first.
    #[serde(default)]
    pub runs: Vec<RunRecord>,
    /// The single saved-game slot.
    #[serde(default)]
    pub saved_game: Option<Checkpoint>,
}

impl PlayerProfile {
    /// Whether a resumable game is stored.
    #[must_use]
    pub fn has_saved_game(&self) -> bool {
        self.saved_game.is_some()
    }

    /// Overwrite the saved-game slot.
    pub fn save_game(&mut self, checkpoint: Checkpoint) {
        self.saved_game = Some(checkpoint);
    }

    /// Empty the saved-game slot.
    pub fn clear_saved_game(&mut self) {
        self.saved_game = None;
    }

    /// Record a finished run: updates stats, the per-level best (only on
    /// improvement), and the history.
    pub fn record_run(&mut self, ts: u64, report: &RunReport) {
        self.stats.games_played += 1;
        if report.won {
            self.stats.wins += 1;
        }
        self.stats.total_kills += u64::from(report.kills);

        let best = self.best_score_by_level.entry(report.level_id).or_insert(0);
        if report.score > *best {
            *best = report.score;
        }

        self.runs.push(RunRecord {
            ts,
            level: report.level_id,
            score: report.score,
            kills: report.kills,
            won: report.won,
        });
    }
}

/// All player profiles, persisted as one JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileStore {
    /// Profiles keyed by username.
    #[serde(default)]
    pub profiles: BTreeMap<String, PlayerProfile>,
}

impl ProfileStore {
    /// Load the store from a file. A missing file yields an empty store;
    /// a present but malformed file is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ProfileError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let store: Self = serde_json::from_str(&contents)?;
        Ok(store)
    }

    /// Save the store to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ProfileError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Get a profile, creating an empty one if needed.
    pub fn profile_mut(&mut self, username: &str) -> &mut PlayerProfile {
        self.profiles.entry(username.to_string()).or_default()
    }

    /// Look up a profile without creating it.
    #[must_use]
    pub fn profile(&self, username: &str) -> Option<&PlayerProfile> {
        self.profiles.get(username)
    }
}

/// Current unix time in seconds, for run records.
#[must_use]
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
