//! Entity records and static stat tables.
//!
//! Every tower and enemy kind is an enumerated variant carrying a fixed
//! parameter record, so stat lookups are exhaustive matches rather than
//! keyed table lookups. The entity structs themselves are plain value
//! records mutated by the session each tick.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::grid::GridConfig;
use crate::math::Vec2;

/// Half edge length of the square hitbox around an enemy's center.
pub const ENEMY_HALF_EXTENT: f32 = 10.0;

// ============================================================================
// Enemy kinds
// ============================================================================

/// Enemy classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnemyKind {
    /// Quick and fragile; the bulk of every wave.
    Fast,
    /// Slow and durable; every fifth spawn.
    Tank,
}

/// Base (wave-1, unscaled) stats for an enemy kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyStats {
    /// Hit points.
    pub hp: u32,
    /// Walk speed in pixels per second.
    pub speed: f32,
    /// Gold awarded on a kill.
    pub reward: u32,
    /// Score awarded on a kill.
    pub score: u32,
}

impl EnemyKind {
    /// Base stats for this kind.
    #[must_use]
    pub const fn stats(self) -> EnemyStats {
        match self {
            Self::Fast => EnemyStats {
                hp: 40,
                speed: 80.0,
                reward: 15,
                score: 18,
            },
            Self::Tank => EnemyStats {
                hp: 90,
                speed: 70.0,
                reward: 20,
                score: 30,
            },
        }
    }
}

// ============================================================================
// Tower kinds
// ============================================================================

/// Tower classification.
///
/// Serialized as a lowercase name; unknown names deserialize as
/// [`TowerKind::Basic`] so old or hand-edited checkpoints keep loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TowerKind {
    /// Cheap all-rounder.
    #[default]
    Basic,
    /// Long range, slow, high damage.
    Sniper,
    /// Short range burst of pellets.
    Shotgun,
}

/// How a tower emits bullets when it fires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FirePattern {
    /// One bullet straight at the target.
    Single,
    /// A fan of pellets spread evenly across an arc centered on the aim
    /// direction.
    Spread {
        /// Pellets per shot.
        pellets: u32,
        /// Total arc in degrees.
        arc_deg: f32,
    },
}

/// Fixed parameters of a tower kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TowerSpec {
    /// Build cost in gold.
    pub cost: u32,
    /// Acquisition range in pixels.
    pub range: f32,
    /// Seconds between shots.
    pub cooldown: f32,
    /// Damage per bullet.
    pub damage: u32,
    /// Bullet speed in pixels per second.
    pub bullet_speed: f32,
    /// Bullet emission pattern.
    pub pattern: FirePattern,
}

impl TowerKind {
    /// Fixed parameters for this kind.
    #[must_use]
    pub const fn spec(self) -> TowerSpec {
        match self {
            Self::Basic => TowerSpec {
                cost: 50,
                range: 140.0,
                cooldown: 0.55,
                damage: 20,
                bullet_speed: 430.0,
                pattern: FirePattern::Single,
            },
            Self::Sniper => TowerSpec {
                cost: 90,
                range: 300.0,
                cooldown: 1.0,
                damage: 56,
                bullet_speed: 560.0,
                pattern: FirePattern::Single,
            },
            Self::Shotgun => TowerSpec {
                cost: 100,
                range: 120.0,
                cooldown: 1.5,
                damage: 15,
                bullet_speed: 380.0,
                pattern: FirePattern::Spread {
                    pellets: 12,
                    arc_deg: 30.0,
                },
            },
        }
    }

    /// Lowercase name used in checkpoints and messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Sniper => "sniper",
            Self::Shotgun => "shotgun",
        }
    }

    /// Parse a kind name, falling back to [`TowerKind::Basic`] for
    /// anything unknown.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "sniper" => Self::Sniper,
            "shotgun" => Self::Shotgun,
            _ => Self::Basic,
        }
    }

    /// All kinds in selection order.
    pub const ALL: [Self; 3] = [Self::Basic, Self::Sniper, Self::Shotgun];
}

impl Serialize for TowerKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for TowerKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}

// ============================================================================
// Components and entity records
// ============================================================================

/// Health for damageable entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Health {
    /// Current hit points.
    pub current: u32,
    /// Maximum hit points.
    pub max: u32,
}

impl Health {
    /// Create new health at full hit points.
    #[must_use]
    pub const fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Whether the entity is dead (hit points exhausted).
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.current == 0
    }

    /// Apply damage, returning the amount actually dealt.
    /// Uses saturating subtraction to prevent underflow.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let actual = amount.min(self.current);
        self.current = self.current.saturating_sub(actual);
        actual
    }

    /// Health as a percentage (0-100), for presentation layers.
    #[must_use]
    pub fn percentage(&self) -> u32 {
        if self.max == 0 {
            0
        } else {
            (self.current * 100) / self.max
        }
    }
}

/// A walking enemy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Enemy {
    /// Kind (drives reward and rendering).
    pub kind: EnemyKind,
    /// Current position in pixel space.
    pub pos: Vec2,
    /// Walk speed in pixels per second (already wave-scaled).
    pub speed: f32,
    /// Hit points.
    pub health: Health,
    /// Index of the last path waypoint reached; the enemy walks toward
    /// `path_index + 1`. Always less than the waypoint count.
    pub path_index: usize,
    /// Cleared at death or path end; pruned at end of tick.
    pub alive: bool,
}

impl Enemy {
    /// Spawn an enemy at the path start.
    #[must_use]
    pub const fn new(kind: EnemyKind, pos: Vec2, speed: f32, hp: u32) -> Self {
        Self {
            kind,
            pos,
            speed,
            health: Health::new(hp),
            path_index: 0,
            alive: true,
        }
    }

    /// Whether a point lies inside this enemy's hitbox.
    #[must_use]
    pub fn hitbox_contains(&self, point: Vec2) -> bool {
        (point.x - self.pos.x).abs() <= ENEMY_HALF_EXTENT
            && (point.y - self.pos.y).abs() <= ENEMY_HALF_EXTENT
    }
}

/// A placed tower. Grid position is immutable after placement; towers
/// are never destroyed within a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tower {
    /// Kind (drives all fixed parameters via [`TowerKind::spec`]).
    pub kind: TowerKind,
    /// Grid column.
    pub gx: i32,
    /// Grid row.
    pub gy: i32,
    /// Seconds until the tower may fire again. Never negative.
    pub cooldown_left: f32,
}

impl Tower {
    /// Place a tower, ready to fire.
    #[must_use]
    pub const fn new(kind: TowerKind, gx: i32, gy: i32) -> Self {
        Self {
            kind,
            gx,
            gy,
            cooldown_left: 0.0,
        }
    }

    /// Pixel-space center of this tower's cell.
    #[must_use]
    pub fn center(&self, grid: &GridConfig) -> Vec2 {
        grid.cell_center(self.gx, self.gy)
    }

    /// Whether the tower may fire this tick.
    #[must_use]
    pub fn ready(&self) -> bool {
        self.cooldown_left <= 0.0
    }
}

/// A bullet in flight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bullet {
    /// Current position.
    pub pos: Vec2,
    /// Velocity in pixels per second.
    pub vel: Vec2,
    /// Damage dealt on impact.
    pub damage: u32,
    /// Cleared on impact or leaving the world; pruned at end of tick.
    pub alive: bool,
}

impl Bullet {
    /// Spawn a bullet.
    #[must_use]
    pub const fn new(pos: Vec2, vel: Vec2, damage: u32) -> Self {
        Self {
            pos,
            vel,
            damage,
            alive: true,
        }
    }
}
