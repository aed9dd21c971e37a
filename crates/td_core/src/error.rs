//! Error types for the simulation engine.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all engine errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Level data failed validation.
    #[error("Invalid level: {0}")]
    InvalidLevel(String),

    /// Invalid engine state (serialization failures, bad save files).
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}
