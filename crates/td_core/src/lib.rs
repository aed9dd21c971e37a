//! # TD Core
//!
//! Deterministic tower-defense simulation core for Geometry Defense.
//!
//! This crate contains **only** the simulation:
//! - No rendering
//! - No terminal or network IO
//! - No system randomness
//!
//! The host loop owns a [`session::Session`], feeds it input events and
//! a time delta each frame, reads back render state, and collects a
//! terminal outcome (a run report or a resumable checkpoint) when the
//! session stops. This separation enables:
//! - Headless scripted runs and CI verification
//! - Determinism testing via state hashes
//! - Pause/resume through flat checkpoint snapshots
//!
//! ## Crate Structure
//!
//! - [`session`] - The per-frame orchestrator
//! - [`combat`] - Targeting, firing, movement, and collision
//! - [`waves`] - Spawn pacing and difficulty scaling
//! - [`checkpoint`] - Resumable snapshots
//! - [`entities`] - Entity records and stat tables
//! - [`grid`] / [`level`] - Board geometry and level data
//! - [`math`] - Float vector math

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod checkpoint;
pub mod combat;
pub mod entities;
pub mod error;
pub mod grid;
pub mod level;
pub mod math;
pub mod session;
pub mod waves;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::checkpoint::{Checkpoint, TowerRecord, CHECKPOINT_VERSION};
    pub use crate::entities::{Bullet, Enemy, EnemyKind, Health, Tower, TowerKind};
    pub use crate::error::{GameError, Result};
    pub use crate::grid::GridConfig;
    pub use crate::level::LevelSpec;
    pub use crate::math::Vec2;
    pub use crate::session::{
        ExitReason, InputEvent, Mode, Phase, RenderState, RunReport, Session, SessionOutcome,
        TickEvents,
    };
    pub use crate::waves::WaveState;
}
