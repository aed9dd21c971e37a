//! The session orchestrator.
//!
//! A [`Session`] owns the whole game state for one play-through: board
//! geometry, economy, entity collections, wave bookkeeping, and the
//! checkpoint taken at the last build-phase boundary. The host loop
//! feeds it discrete input events and a time delta each frame; the
//! session mutates its state synchronously and exposes read-only views
//! for rendering. Nothing here blocks, spawns threads, or performs IO.
//!
//! # Tick order
//!
//! Each [`Session::update`] runs, in this order:
//! 1. Spawning (while the wave still has enemies to emit)
//! 2. Wave-completion detection
//! 3. Enemy path-following (and life loss at the path end)
//! 4. Tower cooldowns, targeting, and firing
//! 5. Bullet motion and collision
//! 6. Pruning of dead enemies and spent bullets
//!
//! Pruning happens once per tick, after all interactions, so iteration
//! order stays stable and each bullet resolves at most one collision.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::checkpoint::{Checkpoint, TowerRecord, CHECKPOINT_VERSION};
use crate::combat::{self, PathProgress};
use crate::entities::{Bullet, Enemy, EnemyKind, Tower, TowerKind};
use crate::error::Result;
use crate::grid::{expand_path_cells, Cell, GridConfig};
use crate::level::LevelSpec;
use crate::math::Vec2;
use crate::waves::{self, WaveState};

/// Lives a fresh session starts with.
pub const STARTING_LIVES: i32 = 15;

/// Gold a fresh session starts with.
pub const STARTING_GOLD: u32 = 150;

/// Campaign runs toward a fixed wave count; endless runs forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Fixed number of waves, then a victory decision.
    #[default]
    Campaign,
    /// Unbounded waves with escalating clear bonuses.
    Endless,
}

/// Mutually exclusive session phase.
///
/// One enum instead of a handful of independent booleans, so illegal
/// combinations (a lost session with a wave in progress, say) cannot be
/// represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Between waves: towers may be placed, the next wave may start.
    Build,
    /// Wave running, enemies still to emit.
    Spawning,
    /// Wave fully emitted, waiting for the board to empty.
    Clearing,
    /// Campaign target met; waiting for the endless-or-quit decision.
    VictoryChoice,
    /// Out of lives. Simulation frozen; only exiting remains.
    Lost,
    /// Session over; the outcome is ready to collect.
    Ended,
}

/// Discrete player actions fed in by the host between frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Change the tower kind used for the next placement.
    SelectTower(TowerKind),
    /// Try to build the selected tower at a grid cell.
    PlaceTower {
        /// Grid column.
        gx: i32,
        /// Grid row.
        gy: i32,
    },
    /// Start the next wave (build phase only).
    StartWave,
    /// Save a checkpoint and end the session (discarded if lost).
    SaveAndExit,
    /// Answer the campaign-victory prompt.
    ChooseEndless(bool),
    /// Abandon the session immediately.
    Quit,
}

/// Why the session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitReason {
    /// Player quit outright.
    Quit,
    /// Session ran to a conclusion (victory declined, or defeat).
    End,
    /// Player saved and exited.
    Save,
}

/// One enemy killed this tick, with the awards it produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KillEvent {
    /// Kind of the dead enemy.
    pub kind: EnemyKind,
    /// Gold awarded.
    pub gold: u32,
    /// Score awarded.
    pub score: u32,
}

/// A wave finished this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveCleared {
    /// The wave that finished.
    pub wave: u32,
    /// Bonus gold awarded for it.
    pub bonus: u32,
}

/// Events generated during one tick, for host-side logging and tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickEvents {
    /// Kinds of enemies spawned this tick.
    pub spawned: Vec<EnemyKind>,
    /// Enemies killed this tick.
    pub kills: Vec<KillEvent>,
    /// Enemies that reached the path end this tick.
    pub leaked: u32,
    /// Set when a wave completed this tick. Reported exactly once per
    /// wave.
    pub wave_cleared: Option<WaveCleared>,
    /// Set on the tick the last life was lost.
    pub defeated: bool,
}

/// Final record of a finished (not saved) session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Whether the campaign was completed.
    pub won: bool,
    /// Score, truncated for recording.
    pub score: i64,
    /// Total kills.
    pub kills: u32,
    /// Level played.
    pub level_id: u32,
    /// Whether the campaign target was reached at any point.
    pub campaign_completed: bool,
    /// Whether the session ended in defeat.
    pub lost: bool,
    /// How the session stopped.
    pub exit_reason: ExitReason,
}

/// What a stopped session reports to its host.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Player saved; the host should persist this checkpoint.
    Saved {
        /// The resumable snapshot.
        checkpoint: Checkpoint,
    },
    /// Session concluded; the host should record the run.
    Ended(RunReport),
}

/// Read-only view of everything a presentation layer needs.
///
/// Reads have no side effects; calling [`Session::render_state`] any
/// number of times between updates returns identical data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState<'a> {
    /// Level display name.
    pub level_name: &'a str,
    /// Current mode.
    pub mode: Mode,
    /// Current phase.
    pub phase: Phase,
    /// Lives remaining.
    pub lives: i32,
    /// Gold on hand.
    pub gold: u32,
    /// Score truncated for display.
    pub score: i64,
    /// Total kills.
    pub kills: u32,
    /// 1-based current wave number.
    pub wave: u32,
    /// Waves cleared so far.
    pub waves_cleared: u32,
    /// Campaign length of the level.
    pub campaign_waves: u32,
    /// Tower kind selected for building.
    pub selected_tower: TowerKind,
    /// Latest user-facing message.
    pub message: &'a str,
    /// Active enemies.
    pub enemies: &'a [Enemy],
    /// Placed towers.
    pub towers: &'a [Tower],
    /// Bullets in flight.
    pub bullets: &'a [Bullet],
    /// Whether the start-wave action is currently legal.
    pub start_enabled: bool,
}

/// One tower-defense play-through.
///
/// # Example
///
/// ```
/// use td_core::level::LevelSpec;
/// use td_core::session::{InputEvent, Mode, Session};
///
/// let mut session = Session::new(LevelSpec::s_curve(), Mode::Campaign, None).unwrap();
///
/// // Build a tower next to the path and start the first wave.
/// session.handle_input(InputEvent::PlaceTower { gx: 2, gy: 4 });
/// session.handle_input(InputEvent::StartWave);
///
/// let events = session.update(1.0 / 60.0);
/// assert_eq!(events.spawned.len(), 1);
/// assert_eq!(session.render_state().enemies.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Session {
    grid: GridConfig,
    level: LevelSpec,
    waypoints: Vec<Vec2>,
    path_cells: HashSet<Cell>,
    mode: Mode,
    phase: Phase,
    tick: u64,
    lives: i32,
    gold: u32,
    score: f64,
    kills: u32,
    towers: Vec<Tower>,
    enemies: Vec<Enemy>,
    bullets: Vec<Bullet>,
    wave: WaveState,
    selected_tower: TowerKind,
    message: String,
    campaign_completed: bool,
    lost: bool,
    exit_reason: Option<ExitReason>,
    wave_start_checkpoint: Checkpoint,
    saved_checkpoint: Option<Checkpoint>,
}

impl Session {
    /// Create a session on the default board, optionally resuming from a
    /// checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::GameError::InvalidLevel`] if the level
    /// fails validation.
    pub fn new(level: LevelSpec, mode: Mode, resume: Option<Checkpoint>) -> Result<Self> {
        Self::with_grid(GridConfig::default(), level, mode, resume)
    }

    /// Create a session on a custom board.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::GameError::InvalidLevel`] if the level
    /// fails validation against `grid`.
    pub fn with_grid(
        grid: GridConfig,
        level: LevelSpec,
        mode: Mode,
        resume: Option<Checkpoint>,
    ) -> Result<Self> {
        level.validate(&grid)?;

        let waypoints = level
            .path_grid
            .iter()
            .map(|&(gx, gy)| grid.cell_center(gx, gy))
            .collect();
        let path_cells = expand_path_cells(&level.path_grid);

        let mut session = Self {
            grid,
            level,
            waypoints,
            path_cells,
            mode,
            phase: Phase::Build,
            tick: 0,
            lives: STARTING_LIVES,
            gold: STARTING_GOLD,
            score: 0.0,
            kills: 0,
            towers: Vec::new(),
            enemies: Vec::new(),
            bullets: Vec::new(),
            wave: WaveState::new(),
            selected_tower: TowerKind::Basic,
            message: "1=BASIC, 2=SNIPER, 3=SHOTGUN. Build between waves.".to_string(),
            campaign_completed: false,
            lost: false,
            exit_reason: None,
            wave_start_checkpoint: Checkpoint::default(),
            saved_checkpoint: None,
        };

        if let Some(checkpoint) = resume {
            session.apply_checkpoint(checkpoint);
        }
        session.wave_start_checkpoint = session.capture_checkpoint();

        Ok(session)
    }

    // ------------------------------------------------------------------
    // Input handling
    // ------------------------------------------------------------------

    /// Apply a discrete player action. Non-blocking; illegal actions for
    /// the current phase are ignored or answered with a message.
    pub fn handle_input(&mut self, event: InputEvent) {
        if matches!(self.phase, Phase::Ended) {
            return;
        }

        if matches!(event, InputEvent::Quit) {
            self.exit_reason = Some(ExitReason::Quit);
            self.phase = Phase::Ended;
            return;
        }

        if matches!(self.phase, Phase::VictoryChoice) {
            if let InputEvent::ChooseEndless(yes) = event {
                if yes {
                    self.mode = Mode::Endless;
                    self.phase = Phase::Build;
                    self.message = "Endless mode! Good luck.".to_string();
                } else {
                    self.exit_reason = Some(ExitReason::End);
                    self.phase = Phase::Ended;
                }
            }
            return;
        }

        match event {
            InputEvent::SelectTower(kind) => {
                self.selected_tower = kind;
                self.message = format!("Selected: {}", kind.name().to_uppercase());
            }
            InputEvent::PlaceTower { gx, gy } => {
                if matches!(self.phase, Phase::Build) {
                    self.try_build(gx, gy);
                }
            }
            InputEvent::StartWave => {
                if matches!(self.phase, Phase::Build) {
                    self.start_wave();
                }
            }
            InputEvent::SaveAndExit => self.save_and_exit(),
            InputEvent::ChooseEndless(_) | InputEvent::Quit => {}
        }
    }

    fn try_build(&mut self, gx: i32, gy: i32) {
        if !self.grid.contains_cell(gx, gy) {
            self.message = "That cell is off the board.".to_string();
            return;
        }
        if self.path_cells.contains(&(gx, gy)) {
            self.message = "Cannot build on the path.".to_string();
            return;
        }
        if self.towers.iter().any(|t| t.gx == gx && t.gy == gy) {
            self.message = "A tower already stands there.".to_string();
            return;
        }

        let spec = self.selected_tower.spec();
        if self.gold < spec.cost {
            self.message = "Not enough gold.".to_string();
            return;
        }

        self.gold -= spec.cost;
        self.towers.push(Tower::new(self.selected_tower, gx, gy));
        self.message = format!("Placed {}.", self.selected_tower.name().to_uppercase());
    }

    fn start_wave(&mut self) {
        self.wave_start_checkpoint = self.capture_checkpoint();
        self.wave.begin();
        self.phase = Phase::Spawning;
        self.message = format!("Wave {} started!", self.wave.current_wave);
    }

    fn save_and_exit(&mut self) {
        // A lost game cannot be resumed.
        if matches!(self.phase, Phase::Lost) {
            self.exit_reason = Some(ExitReason::End);
            self.saved_checkpoint = None;
            self.phase = Phase::Ended;
            return;
        }

        self.exit_reason = Some(ExitReason::Save);
        self.saved_checkpoint = Some(if self.wave_active() {
            // In-flight wave progress is discarded, not saved.
            self.wave_start_checkpoint.clone()
        } else {
            self.capture_checkpoint()
        });
        self.phase = Phase::Ended;
    }

    // ------------------------------------------------------------------
    // Simulation
    // ------------------------------------------------------------------

    /// Advance the simulation by `dt` seconds.
    ///
    /// No-op outside the Build/Spawning/Clearing phases: a lost session,
    /// the victory prompt, and an ended session are all frozen.
    pub fn update(&mut self, dt: f32) -> TickEvents {
        let mut events = TickEvents::default();
        if !matches!(self.phase, Phase::Build | Phase::Spawning | Phase::Clearing) {
            return events;
        }
        self.tick += 1;

        self.run_spawning(dt, &mut events);

        if self.run_wave_completion(&mut events) {
            return events;
        }

        self.run_enemy_movement(dt, &mut events);
        self.run_towers(dt);
        self.run_bullets(dt, &mut events);

        // Prune once per tick, after all interactions are resolved.
        self.enemies.retain(|e| e.alive);
        self.bullets.retain(|b| b.alive);

        // Passive score trickles in while a wave is running.
        if self.wave_active() {
            self.score += f64::from(dt) * 2.0;
        }

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "session state hash");
        }

        events
    }

    fn run_spawning(&mut self, dt: f32, events: &mut TickEvents) {
        if !matches!(self.phase, Phase::Spawning) {
            return;
        }

        self.wave.spawn_timer -= dt;
        if self.wave.spawned_this_wave < self.wave.enemies_this_wave && self.wave.spawn_timer <= 0.0
        {
            self.wave.spawn_timer = waves::spawn_interval(self.wave.current_wave);
            let kind = waves::spawn_kind(self.wave.spawned_this_wave);
            self.enemies.push(Enemy::new(
                kind,
                self.waypoints[0],
                waves::scaled_speed(kind, self.wave.current_wave),
                waves::scaled_hp(kind, self.wave.current_wave),
            ));
            self.wave.spawned_this_wave += 1;
            events.spawned.push(kind);
        }

        if self.wave.spawned_this_wave >= self.wave.enemies_this_wave {
            self.phase = Phase::Clearing;
        }
    }

    /// Returns true when the tick should end early (victory prompt).
    fn run_wave_completion(&mut self, events: &mut TickEvents) -> bool {
        if !matches!(self.phase, Phase::Clearing) || !self.enemies.is_empty() {
            return false;
        }

        let bonus = waves::clear_bonus(
            self.wave.current_wave,
            self.wave.waves_cleared,
            matches!(self.mode, Mode::Endless),
        );
        self.gold += bonus;
        events.wave_cleared = Some(WaveCleared {
            wave: self.wave.current_wave,
            bonus,
        });
        self.message = format!("Wave cleared! +{bonus} gold. Build now.");

        self.wave.advance();
        self.phase = Phase::Build;
        // This snapshot becomes the resumable point.
        self.wave_start_checkpoint = self.capture_checkpoint();

        if matches!(self.mode, Mode::Campaign) && self.wave.waves_cleared >= self.level.campaign_waves
        {
            self.campaign_completed = true;
            self.phase = Phase::VictoryChoice;
            self.message = "Campaign complete! Continue in endless mode?".to_string();
            return true;
        }

        false
    }

    fn run_enemy_movement(&mut self, dt: f32, events: &mut TickEvents) {
        for enemy in &mut self.enemies {
            if !enemy.alive {
                continue;
            }
            match combat::step_enemy(enemy, &self.waypoints, dt) {
                PathProgress::ReachedEnd => {
                    enemy.alive = false;
                    self.lives -= 1;
                    events.leaked += 1;
                    if self.lives <= 0 && !self.lost {
                        self.lost = true;
                        self.phase = Phase::Lost;
                        events.defeated = true;
                        self.message = "Defeat!".to_string();
                    }
                }
                PathProgress::Walking => {}
            }
        }
    }

    fn run_towers(&mut self, dt: f32) {
        for tower in &mut self.towers {
            tower.cooldown_left = (tower.cooldown_left - dt).max(0.0);
            if !tower.ready() {
                continue;
            }

            let spec = tower.kind.spec();
            let origin = self.grid.cell_center(tower.gx, tower.gy);
            let Some(target) =
                combat::select_target(origin, spec.range, &self.enemies, &self.waypoints)
            else {
                // No target: hold fire, leave the cooldown alone.
                continue;
            };

            let Some(shots) = combat::plan_shots(&spec, origin, self.enemies[target].pos) else {
                continue;
            };
            self.bullets.extend(shots);
            tower.cooldown_left = spec.cooldown;
        }
    }

    fn run_bullets(&mut self, dt: f32, events: &mut TickEvents) {
        for bullet in &mut self.bullets {
            if !bullet.alive {
                continue;
            }
            let Some(hit) = combat::step_bullet(bullet, &self.grid, &mut self.enemies, dt) else {
                continue;
            };
            if hit.lethal {
                let kind = self.enemies[hit.enemy_index].kind;
                let gold = waves::kill_gold(kind, self.wave.current_wave);
                let score = waves::kill_score(kind, self.wave.current_wave);
                self.kills += 1;
                self.gold += gold;
                self.score += f64::from(score);
                events.kills.push(KillEvent { kind, gold, score });
            }
        }
    }

    // ------------------------------------------------------------------
    // Checkpoints
    // ------------------------------------------------------------------

    /// Snapshot the current build-phase state as a flat checkpoint.
    ///
    /// Enemies and bullets are deliberately not captured; the session
    /// only calls this at build-phase boundaries where none are in
    /// flight, and resuming always restarts in the build phase.
    #[must_use]
    pub fn capture_checkpoint(&self) -> Checkpoint {
        Checkpoint {
            version: CHECKPOINT_VERSION,
            level_id: self.level.id,
            mode: self.mode,
            lives: self.lives,
            gold: self.gold,
            score: self.score,
            kills: self.kills,
            waves_cleared: self.wave.waves_cleared,
            current_wave_number: self.wave.current_wave,
            selected_tower: self.selected_tower,
            towers: self
                .towers
                .iter()
                .map(|t| TowerRecord {
                    kind: t.kind,
                    gx: t.gx,
                    gy: t.gy,
                    cooldown_left: t.cooldown_left.max(0.0),
                })
                .collect(),
        }
    }

    /// Rehydrate from a checkpoint, forcing the build phase: spawners
    /// reset, entity collections emptied, terminal flags cleared.
    fn apply_checkpoint(&mut self, checkpoint: Checkpoint) {
        if checkpoint.version != CHECKPOINT_VERSION {
            tracing::warn!(
                found = checkpoint.version,
                expected = CHECKPOINT_VERSION,
                "checkpoint version mismatch, loading field-by-field"
            );
        }

        self.mode = checkpoint.mode;
        self.lives = checkpoint.lives;
        self.gold = checkpoint.gold;
        self.score = checkpoint.score;
        self.kills = checkpoint.kills;
        self.selected_tower = checkpoint.selected_tower;
        self.wave = WaveState {
            // Wave numbers are 1-based; clamp whatever a stale save says.
            current_wave: checkpoint.current_wave_number.max(1),
            waves_cleared: checkpoint.waves_cleared,
            enemies_this_wave: 0,
            spawned_this_wave: 0,
            spawn_timer: 0.0,
        };

        self.phase = Phase::Build;
        self.enemies.clear();
        self.bullets.clear();
        self.campaign_completed = false;
        self.lost = false;

        self.towers.clear();
        for record in checkpoint.towers {
            if !self.grid.contains_cell(record.gx, record.gy) {
                tracing::warn!(
                    gx = record.gx,
                    gy = record.gy,
                    "dropping saved tower outside the board"
                );
                continue;
            }
            self.towers.push(Tower {
                kind: record.kind,
                gx: record.gx,
                gy: record.gy,
                cooldown_left: record.cooldown_left.max(0.0),
            });
        }

        self.message = format!(
            "Loaded save: Wave {}. Build and press Start Wave.",
            self.wave.current_wave
        );
    }

    // ------------------------------------------------------------------
    // Read-only views and termination
    // ------------------------------------------------------------------

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the host loop should keep feeding frames.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !matches!(self.phase, Phase::Ended)
    }

    /// The level being played.
    #[must_use]
    pub fn level(&self) -> &LevelSpec {
        &self.level
    }

    /// Read-only view for a presentation layer. Idempotent.
    #[must_use]
    pub fn render_state(&self) -> RenderState<'_> {
        RenderState {
            level_name: &self.level.name,
            mode: self.mode,
            phase: self.phase,
            lives: self.lives,
            gold: self.gold,
            score: self.score as i64,
            kills: self.kills,
            wave: self.wave.current_wave,
            waves_cleared: self.wave.waves_cleared,
            campaign_waves: self.level.campaign_waves,
            selected_tower: self.selected_tower,
            message: &self.message,
            enemies: &self.enemies,
            towers: &self.towers,
            bullets: &self.bullets,
            start_enabled: matches!(self.phase, Phase::Build),
        }
    }

    /// Consume the session and report its outcome.
    #[must_use]
    pub fn into_outcome(self) -> SessionOutcome {
        let exit_reason = self.exit_reason.unwrap_or(ExitReason::End);

        if matches!(exit_reason, ExitReason::Save) {
            if let Some(checkpoint) = self.saved_checkpoint {
                return SessionOutcome::Saved { checkpoint };
            }
        }

        SessionOutcome::Ended(RunReport {
            won: self.campaign_completed,
            score: self.score as i64,
            kills: self.kills,
            level_id: self.level.id,
            campaign_completed: self.campaign_completed,
            lost: self.lost,
            exit_reason,
        })
    }

    fn wave_active(&self) -> bool {
        matches!(self.phase, Phase::Spawning | Phase::Clearing)
    }

    /// Hash of the full simulation state.
    ///
    /// Two sessions fed identical inputs produce identical hashes; used
    /// for determinism verification.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        (self.phase as u8).hash(&mut hasher);
        (self.mode as u8).hash(&mut hasher);
        self.lives.hash(&mut hasher);
        self.gold.hash(&mut hasher);
        self.score.to_bits().hash(&mut hasher);
        self.kills.hash(&mut hasher);

        self.wave.current_wave.hash(&mut hasher);
        self.wave.waves_cleared.hash(&mut hasher);
        self.wave.enemies_this_wave.hash(&mut hasher);
        self.wave.spawned_this_wave.hash(&mut hasher);
        self.wave.spawn_timer.to_bits().hash(&mut hasher);

        self.towers.len().hash(&mut hasher);
        for tower in &self.towers {
            (tower.kind as u8).hash(&mut hasher);
            tower.gx.hash(&mut hasher);
            tower.gy.hash(&mut hasher);
            tower.cooldown_left.to_bits().hash(&mut hasher);
        }

        self.enemies.len().hash(&mut hasher);
        for enemy in &self.enemies {
            (enemy.kind as u8).hash(&mut hasher);
            enemy.pos.x.to_bits().hash(&mut hasher);
            enemy.pos.y.to_bits().hash(&mut hasher);
            enemy.speed.to_bits().hash(&mut hasher);
            enemy.health.current.hash(&mut hasher);
            enemy.path_index.hash(&mut hasher);
            enemy.alive.hash(&mut hasher);
        }

        self.bullets.len().hash(&mut hasher);
        for bullet in &self.bullets {
            bullet.pos.x.to_bits().hash(&mut hasher);
            bullet.pos.y.to_bits().hash(&mut hasher);
            bullet.vel.x.to_bits().hash(&mut hasher);
            bullet.vel.y.to_bits().hash(&mut hasher);
            bullet.damage.hash(&mut hasher);
        }

        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn short_level() -> LevelSpec {
        LevelSpec {
            id: 7,
            name: "Test Strip".to_string(),
            path_grid: vec![(0, 0), (5, 0)],
            campaign_waves: 1,
        }
    }

    fn session() -> Session {
        Session::new(short_level(), Mode::Campaign, None).unwrap()
    }

    fn run_wave_through(session: &mut Session) -> (u32, u32) {
        session.handle_input(InputEvent::StartWave);
        let mut cleared = 0;
        let mut leaked = 0;
        for _ in 0..100_000 {
            let events = session.update(DT);
            leaked += events.leaked;
            if events.wave_cleared.is_some() {
                cleared += 1;
            }
            if !matches!(session.phase(), Phase::Spawning | Phase::Clearing) {
                break;
            }
        }
        (cleared, leaked)
    }

    #[test]
    fn test_new_session_defaults() {
        let session = session();
        let state = session.render_state();
        assert_eq!(state.lives, 15);
        assert_eq!(state.gold, 150);
        assert_eq!(state.score, 0);
        assert_eq!(state.wave, 1);
        assert_eq!(state.phase, Phase::Build);
        assert!(state.start_enabled);
    }

    #[test]
    fn test_build_spends_gold_and_adds_tower() {
        let mut session = session();
        session.handle_input(InputEvent::PlaceTower { gx: 2, gy: 2 });
        let state = session.render_state();
        assert_eq!(state.gold, 100);
        assert_eq!(state.towers.len(), 1);
        assert_eq!(state.towers[0].kind, TowerKind::Basic);
    }

    #[test]
    fn test_build_rejections_leave_state_unchanged() {
        let mut session = session();

        session.handle_input(InputEvent::PlaceTower { gx: 3, gy: 0 });
        assert_eq!(session.render_state().message, "Cannot build on the path.");

        session.handle_input(InputEvent::PlaceTower { gx: 2, gy: 2 });
        session.handle_input(InputEvent::PlaceTower { gx: 2, gy: 2 });
        assert_eq!(session.render_state().message, "A tower already stands there.");

        // Two basic towers leave 50 gold, not enough for a sniper.
        session.handle_input(InputEvent::PlaceTower { gx: 4, gy: 4 });
        session.handle_input(InputEvent::SelectTower(TowerKind::Sniper));
        session.handle_input(InputEvent::PlaceTower { gx: 5, gy: 5 });
        assert_eq!(session.render_state().message, "Not enough gold.");

        session.handle_input(InputEvent::PlaceTower { gx: 40, gy: 4 });
        assert_eq!(session.render_state().message, "That cell is off the board.");

        let state = session.render_state();
        assert_eq!(state.gold, 50);
        assert_eq!(state.towers.len(), 2);
    }

    #[test]
    fn test_start_wave_sets_quota_and_rejects_reentry() {
        let mut session = session();
        session.handle_input(InputEvent::StartWave);
        assert_eq!(session.phase(), Phase::Spawning);
        assert_eq!(session.wave.enemies_this_wave, 8);

        // Already in progress: ignored.
        session.handle_input(InputEvent::StartWave);
        assert_eq!(session.wave.spawned_this_wave, 0);
        assert!(!session.render_state().start_enabled);
    }

    #[test]
    fn test_first_spawn_is_immediate() {
        let mut session = session();
        session.handle_input(InputEvent::StartWave);
        let events = session.update(DT);
        assert_eq!(events.spawned, vec![EnemyKind::Fast]);
        assert_eq!(session.render_state().enemies.len(), 1);
    }

    #[test]
    fn test_two_hits_kill_and_award() {
        let mut session = session();
        session.handle_input(InputEvent::StartWave);

        let spawn = session.waypoints[0];
        session.enemies.push(Enemy::new(EnemyKind::Fast, spawn, 0.0, 40));

        session.bullets.push(Bullet::new(spawn, Vec2::ZERO, 20));
        let events = session.update(DT);
        assert!(events.kills.is_empty());
        assert_eq!(session.enemies[0].health.current, 20);

        session.bullets.push(Bullet::new(spawn, Vec2::ZERO, 20));
        let events = session.update(DT);
        assert_eq!(events.kills.len(), 1);
        // Wave 1: gold 15 + 0.5 -> 15, score 18 + 3 -> 21.
        assert_eq!(events.kills[0].gold, 15);
        assert_eq!(events.kills[0].score, 21);
        assert_eq!(session.kills, 1);
        assert_eq!(session.gold, 150 + 15);
    }

    #[test]
    fn test_tower_respects_cooldown() {
        let mut session = session();
        session.handle_input(InputEvent::PlaceTower { gx: 2, gy: 1 });
        session.handle_input(InputEvent::StartWave);

        // Park a durable enemy in range and step once: exactly one shot.
        session
            .enemies
            .push(Enemy::new(EnemyKind::Tank, session.waypoints[0], 0.0, 10_000));
        session.update(DT);
        assert_eq!(session.bullets.len(), 1);

        // Cooldown is still running: no second shot yet.
        session.update(DT);
        assert_eq!(session.bullets.len(), 1, "bullet moved, none added");
        assert!(session.towers[0].cooldown_left > 0.0);

        // After the cooldown elapses the tower fires again.
        let ticks = (TowerKind::Basic.spec().cooldown / DT).ceil() as u32 + 1;
        let mut fired = 0;
        for _ in 0..ticks {
            let before = session.bullets.len();
            session.update(DT);
            if session.bullets.len() > before {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
    }

    #[test]
    fn test_overlapping_target_skips_fire_without_cooldown_reset() {
        let mut session = session();
        session.handle_input(InputEvent::PlaceTower { gx: 2, gy: 2 });
        session.handle_input(InputEvent::StartWave);

        let tower_center = session.grid.cell_center(2, 2);
        session
            .enemies
            .push(Enemy::new(EnemyKind::Tank, tower_center, 0.0, 10_000));
        session.update(DT);

        assert!(session.bullets.is_empty());
        assert_eq!(session.towers[0].cooldown_left, 0.0);
    }

    #[test]
    fn test_leak_costs_a_life() {
        let mut session = session();
        session.handle_input(InputEvent::StartWave);

        let end = *session.waypoints.last().unwrap();
        let mut enemy = Enemy::new(EnemyKind::Fast, end, 0.0, 40);
        enemy.path_index = session.waypoints.len() - 1;
        session.enemies.push(enemy);

        let events = session.update(DT);
        assert_eq!(events.leaked, 1);
        assert_eq!(session.render_state().lives, 14);
        assert!(session.render_state().enemies.iter().all(|e| e.alive));
    }

    #[test]
    fn test_zero_lives_is_terminal_and_freezes_updates() {
        let mut session = session();
        session.lives = 1;
        session.handle_input(InputEvent::StartWave);

        let end = *session.waypoints.last().unwrap();
        let mut enemy = Enemy::new(EnemyKind::Fast, end, 0.0, 40);
        enemy.path_index = session.waypoints.len() - 1;
        session.enemies.push(enemy);

        let events = session.update(DT);
        assert!(events.defeated);
        assert_eq!(session.phase(), Phase::Lost);

        let tick = session.tick;
        let events = session.update(DT);
        assert_eq!(events, TickEvents::default());
        assert_eq!(session.tick, tick);
    }

    #[test]
    fn test_wave_completes_exactly_once() {
        let mut session = session();
        let (cleared, leaked) = run_wave_through(&mut session);
        assert_eq!(cleared, 1);
        assert_eq!(leaked, 8);

        let state = session.render_state();
        assert_eq!(state.lives, 15 - 8);
        // Clear bonus for wave 1 is 25 + 8 = 33.
        assert_eq!(state.gold, 150 + 33);
        assert_eq!(state.waves_cleared, 1);
        assert_eq!(state.wave, 2);
    }

    #[test]
    fn test_campaign_victory_choice_and_endless_switch() {
        let mut session = session();
        run_wave_through(&mut session);
        assert_eq!(session.phase(), Phase::VictoryChoice);

        // Frozen while the prompt is up.
        let tick = session.tick;
        session.update(DT);
        assert_eq!(session.tick, tick);

        session.handle_input(InputEvent::ChooseEndless(true));
        assert_eq!(session.phase(), Phase::Build);
        let state = session.render_state();
        assert_eq!(state.mode, Mode::Endless);
        // Wave counters continue unreset.
        assert_eq!(state.wave, 2);
        assert_eq!(state.waves_cleared, 1);
    }

    #[test]
    fn test_campaign_victory_declined_ends_with_win() {
        let mut session = session();
        run_wave_through(&mut session);
        session.handle_input(InputEvent::ChooseEndless(false));
        assert!(!session.is_running());

        match session.into_outcome() {
            SessionOutcome::Ended(report) => {
                assert!(report.won);
                assert!(report.campaign_completed);
                assert!(!report.lost);
                assert_eq!(report.exit_reason, ExitReason::End);
                assert_eq!(report.level_id, 7);
            }
            SessionOutcome::Saved { .. } => panic!("expected an ended run"),
        }
    }

    #[test]
    fn test_save_during_wave_returns_wave_start_checkpoint() {
        let mut session = session();
        session.handle_input(InputEvent::PlaceTower { gx: 2, gy: 2 });
        session.handle_input(InputEvent::StartWave);
        for _ in 0..30 {
            session.update(DT);
        }

        session.handle_input(InputEvent::SaveAndExit);
        match session.into_outcome() {
            SessionOutcome::Saved { checkpoint } => {
                // Snapshot from the wave start, not mid-wave.
                assert_eq!(checkpoint.gold, 100);
                assert_eq!(checkpoint.current_wave_number, 1);
                assert_eq!(checkpoint.towers.len(), 1);
            }
            SessionOutcome::Ended(_) => panic!("expected a saved game"),
        }
    }

    #[test]
    fn test_save_in_build_phase_is_fresh() {
        let mut session = session();
        let (_, _) = run_wave_through(&mut session);
        session.handle_input(InputEvent::ChooseEndless(true));
        session.handle_input(InputEvent::SaveAndExit);

        match session.into_outcome() {
            SessionOutcome::Saved { checkpoint } => {
                assert_eq!(checkpoint.current_wave_number, 2);
                assert_eq!(checkpoint.waves_cleared, 1);
                assert_eq!(checkpoint.mode, Mode::Endless);
            }
            SessionOutcome::Ended(_) => panic!("expected a saved game"),
        }
    }

    #[test]
    fn test_lost_session_cannot_be_saved() {
        let mut session = session();
        session.lives = 1;
        session.handle_input(InputEvent::StartWave);
        let end = *session.waypoints.last().unwrap();
        let mut enemy = Enemy::new(EnemyKind::Fast, end, 0.0, 40);
        enemy.path_index = session.waypoints.len() - 1;
        session.enemies.push(enemy);
        session.update(DT);
        assert_eq!(session.phase(), Phase::Lost);

        session.handle_input(InputEvent::SaveAndExit);
        match session.into_outcome() {
            SessionOutcome::Ended(report) => {
                assert!(report.lost);
                assert!(!report.won);
                assert_eq!(report.exit_reason, ExitReason::End);
            }
            SessionOutcome::Saved { .. } => panic!("a lost game must not save"),
        }
    }

    #[test]
    fn test_quit_reports_quit() {
        let mut session = session();
        session.handle_input(InputEvent::Quit);
        match session.into_outcome() {
            SessionOutcome::Ended(report) => {
                assert_eq!(report.exit_reason, ExitReason::Quit);
                assert!(!report.won);
            }
            SessionOutcome::Saved { .. } => panic!("quit must not save"),
        }
    }

    #[test]
    fn test_checkpoint_roundtrip_restores_build_phase() {
        let mut session = session();
        session.handle_input(InputEvent::SelectTower(TowerKind::Sniper));
        session.handle_input(InputEvent::PlaceTower { gx: 1, gy: 2 });
        session.handle_input(InputEvent::StartWave);
        for _ in 0..10 {
            session.update(DT);
        }

        let checkpoint = session.wave_start_checkpoint.clone();
        let restored = Session::new(short_level(), Mode::Campaign, Some(checkpoint)).unwrap();

        let state = restored.render_state();
        assert_eq!(state.phase, Phase::Build);
        assert_eq!(state.gold, 150 - 90);
        assert_eq!(state.towers.len(), 1);
        assert_eq!(state.towers[0].kind, TowerKind::Sniper);
        assert_eq!(state.selected_tower, TowerKind::Sniper);
        assert!(state.enemies.is_empty());
        assert!(state.bullets.is_empty());
    }

    #[test]
    fn test_render_state_is_idempotent() {
        let mut session = session();
        session.handle_input(InputEvent::PlaceTower { gx: 2, gy: 2 });
        session.handle_input(InputEvent::StartWave);
        session.update(DT);

        assert_eq!(session.render_state(), session.render_state());
        let hash = session.state_hash();
        let _ = session.render_state();
        assert_eq!(session.state_hash(), hash);
    }

    #[test]
    fn test_path_index_invariant_through_full_wave() {
        let mut session = session();
        session.handle_input(InputEvent::StartWave);
        for _ in 0..100_000 {
            session.update(DT);
            for enemy in session.render_state().enemies {
                assert!(enemy.path_index < session.waypoints.len());
            }
            if matches!(session.phase(), Phase::VictoryChoice | Phase::Build | Phase::Lost) {
                break;
            }
        }
    }

    #[test]
    fn test_cooldown_never_negative() {
        let mut session = session();
        session.handle_input(InputEvent::PlaceTower { gx: 2, gy: 2 });
        session.handle_input(InputEvent::StartWave);
        for _ in 0..600 {
            session.update(DT);
            for tower in session.render_state().towers {
                assert!(tower.cooldown_left >= 0.0);
            }
        }
    }
}
