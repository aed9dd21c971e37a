//! Wave pacing and difficulty scaling.
//!
//! The wave director decides how many enemies a wave holds, how quickly
//! they spawn, which kind each spawn is, and how stats and rewards ramp
//! with the wave number. All formulas truncate toward zero where they
//! produce integers.

use crate::entities::{EnemyKind, EnemyStats};

/// Per-wave spawn bookkeeping.
///
/// `spawned_this_wave` never exceeds `enemies_this_wave`; the spawn gate
/// in the session enforces it. Counters are reset by [`WaveState::begin`]
/// at every wave start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveState {
    /// 1-based wave number, monotonic non-decreasing.
    pub current_wave: u32,
    /// Waves fully cleared so far.
    pub waves_cleared: u32,
    /// Total enemies this wave will spawn.
    pub enemies_this_wave: u32,
    /// Enemies emitted so far this wave.
    pub spawned_this_wave: u32,
    /// Seconds until the next spawn.
    pub spawn_timer: f32,
}

impl WaveState {
    /// Fresh state before the first wave.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current_wave: 1,
            waves_cleared: 0,
            enemies_this_wave: 0,
            spawned_this_wave: 0,
            spawn_timer: 0.0,
        }
    }

    /// Reset spawn counters for the current wave.
    pub fn begin(&mut self) {
        self.spawn_timer = 0.0;
        self.spawned_this_wave = 0;
        self.enemies_this_wave = wave_quota(self.current_wave);
    }

    /// Record a cleared wave and move to the next one.
    pub fn advance(&mut self) {
        self.waves_cleared += 1;
        self.current_wave += 1;
    }
}

impl Default for WaveState {
    fn default() -> Self {
        Self::new()
    }
}

/// Enemies spawned by the given wave.
#[must_use]
pub const fn wave_quota(wave: u32) -> u32 {
    6 + wave * 2
}

/// Seconds between spawns, shrinking with the wave number down to a
/// floor of 0.25s.
#[must_use]
pub fn spawn_interval(wave: u32) -> f32 {
    (0.85 - wave as f32 * 0.06).max(0.25)
}

/// Kind of the `index`-th spawn (0-based) within a wave: every fifth
/// spawn starting from the third is a tank.
#[must_use]
pub const fn spawn_kind(index: u32) -> EnemyKind {
    if index % 5 == 2 {
        EnemyKind::Tank
    } else {
        EnemyKind::Fast
    }
}

/// Wave-scaled hit points: `base * (1 + 0.18*(wave-1))` truncated, with
/// an extra x1.15 (truncated again) for tanks.
#[must_use]
pub fn scaled_hp(kind: EnemyKind, wave: u32) -> u32 {
    let base = kind.stats().hp;
    let hp = (f64::from(base) * (1.0 + 0.18 * f64::from(wave - 1))) as u32;
    match kind {
        EnemyKind::Tank => (f64::from(hp) * 1.15) as u32,
        EnemyKind::Fast => hp,
    }
}

/// Wave-scaled walk speed: +2 px/s per wave for fast enemies, +1 for
/// tanks.
#[must_use]
pub fn scaled_speed(kind: EnemyKind, wave: u32) -> f32 {
    let per_wave = match kind {
        EnemyKind::Fast => 2.0,
        EnemyKind::Tank => 1.0,
    };
    kind.stats().speed + (wave - 1) as f32 * per_wave
}

/// Gold for killing an enemy on the given wave.
#[must_use]
pub fn kill_gold(kind: EnemyKind, wave: u32) -> u32 {
    let EnemyStats { reward, .. } = kind.stats();
    (f64::from(reward) + f64::from(wave) * 0.5) as u32
}

/// Score for killing an enemy on the given wave.
#[must_use]
pub const fn kill_score(kind: EnemyKind, wave: u32) -> u32 {
    kind.stats().score + wave * 3
}

/// Bonus gold for clearing a wave. Endless mode adds one extra gold per
/// wave already cleared.
#[must_use]
pub const fn clear_bonus(wave: u32, waves_cleared: u32, endless: bool) -> u32 {
    let bonus = 25 + wave * 8;
    if endless {
        bonus + waves_cleared
    } else {
        bonus
    }
}
