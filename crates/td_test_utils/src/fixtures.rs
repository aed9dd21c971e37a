//! Test fixtures and helpers.
//!
//! Pre-built levels, sessions, and drivers for consistent testing.

use td_core::level::LevelSpec;
use td_core::session::{InputEvent, Mode, Phase, Session};

/// The host timestep used throughout the tests (60 fps).
pub const FIXED_DT: f32 = 1.0 / 60.0;

/// A short straight level on the default board: six cells along the top
/// row. Fast to traverse, so leak-through tests finish quickly.
#[must_use]
pub fn strip_level(campaign_waves: u32) -> LevelSpec {
    LevelSpec {
        id: 100,
        name: "Test Strip".to_string(),
        path_grid: vec![(0, 0), (5, 0)],
        campaign_waves,
    }
}

/// A fresh campaign session on [`strip_level`].
#[must_use]
pub fn strip_session(campaign_waves: u32) -> Session {
    Session::new(strip_level(campaign_waves), Mode::Campaign, None)
        .expect("strip level must validate")
}

/// A strip-level session with three basic towers flanking the path.
#[must_use]
pub fn defended_session(campaign_waves: u32) -> Session {
    let mut session = strip_session(campaign_waves);
    for (gx, gy) in [(1, 1), (2, 1), (3, 1)] {
        session.handle_input(InputEvent::PlaceTower { gx, gy });
    }
    session
}

/// Advance a session one frame, starting waves and accepting the
/// endless prompt automatically. The simplest possible scripted player.
pub fn drive_tick(session: &mut Session) {
    match session.phase() {
        Phase::Build => session.handle_input(InputEvent::StartWave),
        Phase::VictoryChoice => session.handle_input(InputEvent::ChooseEndless(true)),
        _ => {}
    }
    session.update(FIXED_DT);
}

/// Totals observed while playing a single wave to its end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaveTotals {
    /// Whether the wave completion fired.
    pub cleared: bool,
    /// Enemies killed.
    pub kills: u32,
    /// Enemies that escaped.
    pub leaked: u32,
}

/// Start a wave and update until it completes, the session leaves the
/// wave phases, or `max_ticks` elapses.
pub fn play_wave(session: &mut Session, max_ticks: u32) -> WaveTotals {
    session.handle_input(InputEvent::StartWave);
    let mut totals = WaveTotals::default();

    for _ in 0..max_ticks {
        let events = session.update(FIXED_DT);
        totals.kills += events.kills.len() as u32;
        totals.leaked += events.leaked;
        if events.wave_cleared.is_some() {
            totals.cleared = true;
            break;
        }
        if !matches!(session.phase(), Phase::Spawning | Phase::Clearing) {
            break;
        }
    }

    totals
}
