//! # TD Headless
//!
//! Host loop for the tower-defense engine: drives sessions with a fixed
//! timestep and a scripted player, loads level files, and owns the
//! persistence boundary (player profiles, run history, and the
//! saved-game slot). The engine itself never touches any of this; the
//! host commits run records and checkpoints around sessions.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod autoplay;
pub mod level_file;
pub mod profile;
