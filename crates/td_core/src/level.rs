//! Level definitions.
//!
//! A level is authored data: an ordered polyline of grid waypoints the
//! enemies walk, plus the campaign length. Levels are plain serde values
//! so hosts can ship their own as RON/JSON files; the three stock levels
//! are built in.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::grid::{Cell, GridConfig};

/// A complete level definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSpec {
    /// Stable level identifier (used for best-score and saved-game keys).
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Ordered enemy path waypoints in grid coordinates. Consecutive
    /// waypoints must share a row or column.
    pub path_grid: Vec<Cell>,
    /// Waves to clear for campaign victory.
    pub campaign_waves: u32,
}

impl LevelSpec {
    /// Stock level 1: a gentle S through the middle of the board.
    #[must_use]
    pub fn s_curve() -> Self {
        Self {
            id: 1,
            name: "Level 1: S-Curve".to_string(),
            path_grid: vec![
                (0, 5),
                (3, 5),
                (3, 2),
                (8, 2),
                (8, 9),
                (13, 9),
                (13, 6),
                (15, 6),
            ],
            campaign_waves: 6,
        }
    }

    /// Stock level 2: tight switchbacks.
    #[must_use]
    pub fn zigzag_canyon() -> Self {
        Self {
            id: 2,
            name: "Level 2: Zig-Zag Canyon".to_string(),
            path_grid: vec![
                (0, 2),
                (4, 2),
                (4, 9),
                (7, 9),
                (7, 4),
                (10, 4),
                (10, 10),
                (15, 10),
            ],
            campaign_waves: 7,
        }
    }

    /// Stock level 3: one long straight with a short hook at the end.
    #[must_use]
    pub fn long_bridge() -> Self {
        Self {
            id: 3,
            name: "Level 3: Long Bridge".to_string(),
            path_grid: vec![(0, 10), (12, 10), (12, 3), (15, 3)],
            campaign_waves: 8,
        }
    }

    /// All stock levels in id order.
    #[must_use]
    pub fn builtin() -> Vec<Self> {
        vec![Self::s_curve(), Self::zigzag_canyon(), Self::long_bridge()]
    }

    /// Look up a stock level by id.
    #[must_use]
    pub fn builtin_by_id(id: u32) -> Option<Self> {
        Self::builtin().into_iter().find(|level| level.id == id)
    }

    /// Validate the level against a board.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidLevel`] if the path has fewer than two
    /// waypoints or any waypoint lies off the board.
    pub fn validate(&self, grid: &GridConfig) -> Result<()> {
        if self.path_grid.len() < 2 {
            return Err(GameError::InvalidLevel(format!(
                "level {} needs at least 2 path waypoints, got {}",
                self.id,
                self.path_grid.len()
            )));
        }
        for &(gx, gy) in &self.path_grid {
            if !grid.contains_cell(gx, gy) {
                return Err(GameError::InvalidLevel(format!(
                    "level {} waypoint ({gx}, {gy}) is outside the {}x{} board",
                    self.id, grid.cols, grid.rows
                )));
            }
        }
        Ok(())
    }
}
