//! Per-tick combat resolution.
//!
//! Pure functions over entity data: target selection, shot planning,
//! enemy path-following, and bullet motion/collision. The session calls
//! them in a fixed order each tick; none of them touch state outside
//! their arguments.

use crate::entities::{Bullet, Enemy, FirePattern, TowerSpec};
use crate::grid::GridConfig;
use crate::math::Vec2;

/// Ordering key for target selection: how far along the path an enemy
/// is. The segment index ranks first, distance into the segment breaks
/// ties. Kept as two explicit fields rather than a packed scalar so the
/// comparison cannot lose precision on long paths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetKey {
    /// Index of the last waypoint the enemy reached.
    pub segment: usize,
    /// Distance walked past that waypoint, in pixels.
    pub progress: f32,
}

impl TargetKey {
    /// Whether this key strictly outranks `other` (further along the
    /// path).
    #[must_use]
    pub fn outranks(&self, other: &Self) -> bool {
        if self.segment != other.segment {
            return self.segment > other.segment;
        }
        self.progress > other.progress
    }
}

/// Pick the enemy a tower should fire at: the alive enemy within range
/// that is furthest along the path. Returns an index into `enemies`, or
/// `None` when nothing is in range. Ties keep the earlier candidate.
#[must_use]
pub fn select_target(
    origin: Vec2,
    range: f32,
    enemies: &[Enemy],
    waypoints: &[Vec2],
) -> Option<usize> {
    let mut best: Option<(TargetKey, usize)> = None;

    for (index, enemy) in enemies.iter().enumerate() {
        if !enemy.alive {
            continue;
        }
        if enemy.pos.distance(origin) > range {
            continue;
        }

        let key = TargetKey {
            segment: enemy.path_index,
            progress: enemy.pos.distance(waypoints[enemy.path_index]),
        };

        match &best {
            Some((best_key, _)) if !key.outranks(best_key) => {}
            _ => best = Some((key, index)),
        }
    }

    best.map(|(_, index)| index)
}

/// Evenly spaced angle offsets for a pellet fan: `arc * (i/(n-1) - 0.5)`
/// for each pellet, symmetric around zero. A single pellet flies
/// straight.
#[must_use]
pub fn pellet_offsets(pellets: u32, arc: f32) -> Vec<f32> {
    if pellets <= 1 {
        return vec![0.0];
    }
    (0..pellets)
        .map(|i| arc * (i as f32 / (pellets - 1) as f32 - 0.5))
        .collect()
}

/// Plan the bullets a tower emits at a target position.
///
/// Returns `None` when the aim vector has zero length (tower and target
/// exactly overlap); the caller must not reset the cooldown in that
/// case.
#[must_use]
pub fn plan_shots(spec: &TowerSpec, origin: Vec2, target: Vec2) -> Option<Vec<Bullet>> {
    let aim = target - origin;
    if aim.length_squared() == 0.0 {
        return None;
    }

    match spec.pattern {
        FirePattern::Single => {
            let vel = aim.normalize() * spec.bullet_speed;
            Some(vec![Bullet::new(origin, vel, spec.damage)])
        }
        FirePattern::Spread { pellets, arc_deg } => {
            let base = aim.angle();
            let arc = arc_deg.to_radians();
            Some(
                pellet_offsets(pellets, arc)
                    .into_iter()
                    .map(|offset| {
                        let vel = Vec2::from_angle(base + offset) * spec.bullet_speed;
                        Bullet::new(origin, vel, spec.damage)
                    })
                    .collect(),
            )
        }
    }
}

/// Outcome of one movement step for an enemy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathProgress {
    /// Still walking the path.
    Walking,
    /// Standing on the final waypoint; the enemy escapes this tick.
    ReachedEnd,
}

/// Advance an enemy along the waypoint polyline by `speed * dt`.
///
/// Steps that would overshoot the next waypoint snap to it and advance
/// `path_index`; the index never reaches the waypoint count, so the
/// final waypoint is reported as [`PathProgress::ReachedEnd`] instead of
/// walked past.
pub fn step_enemy(enemy: &mut Enemy, waypoints: &[Vec2], dt: f32) -> PathProgress {
    if enemy.path_index >= waypoints.len() - 1 {
        return PathProgress::ReachedEnd;
    }

    let target = waypoints[enemy.path_index + 1];
    let to_target = target - enemy.pos;
    let dist = to_target.length();

    if dist < 1e-6 {
        enemy.path_index += 1;
        return PathProgress::Walking;
    }

    let step = enemy.speed * dt;
    if step >= dist {
        enemy.pos = target;
        enemy.path_index += 1;
    } else {
        enemy.pos += to_target.normalize() * step;
    }

    PathProgress::Walking
}

/// A bullet-enemy impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulletHit {
    /// Index of the struck enemy in the collection passed in.
    pub enemy_index: usize,
    /// Whether the hit emptied the enemy's health.
    pub lethal: bool,
}

/// Advance a bullet and resolve its collision for this tick.
///
/// Bullets leaving the world rectangle die without hitting anything.
/// Otherwise the first alive enemy whose hitbox contains the bullet's
/// point absorbs it; the bullet is destroyed on its first hit and no
/// further enemies are tested.
pub fn step_bullet(
    bullet: &mut Bullet,
    grid: &GridConfig,
    enemies: &mut [Enemy],
    dt: f32,
) -> Option<BulletHit> {
    bullet.pos += bullet.vel * dt;

    if !grid.world_contains(bullet.pos) {
        bullet.alive = false;
        return None;
    }

    for (index, enemy) in enemies.iter_mut().enumerate() {
        if enemy.alive && enemy.hitbox_contains(bullet.pos) {
            enemy.health.apply_damage(bullet.damage);
            bullet.alive = false;
            if enemy.health.is_dead() {
                enemy.alive = false;
                return Some(BulletHit {
                    enemy_index: index,
                    lethal: true,
                });
            }
            return Some(BulletHit {
                enemy_index: index,
                lethal: false,
            });
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{EnemyKind, TowerKind};

    fn straight_waypoints() -> Vec<Vec2> {
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(100.0, 0.0),
            Vec2::new(100.0, 100.0),
        ]
    }

    fn enemy_at(pos: Vec2, path_index: usize) -> Enemy {
        let mut enemy = Enemy::new(EnemyKind::Fast, pos, 80.0, 40);
        enemy.path_index = path_index;
        enemy
    }

    #[test]
    fn test_target_prefers_later_segment() {
        let waypoints = straight_waypoints();
        let enemies = vec![
            enemy_at(Vec2::new(90.0, 0.0), 0),
            enemy_at(Vec2::new(100.0, 10.0), 1),
        ];
        let picked = select_target(Vec2::new(80.0, 20.0), 200.0, &enemies, &waypoints);
        assert_eq!(picked, Some(1));
    }

    #[test]
    fn test_target_tie_broken_by_segment_progress() {
        let waypoints = straight_waypoints();
        let enemies = vec![
            enemy_at(Vec2::new(30.0, 0.0), 0),
            enemy_at(Vec2::new(60.0, 0.0), 0),
        ];
        let picked = select_target(Vec2::new(50.0, 20.0), 200.0, &enemies, &waypoints);
        assert_eq!(picked, Some(1));
    }

    #[test]
    fn test_target_ignores_out_of_range_and_dead() {
        let waypoints = straight_waypoints();
        let far = enemy_at(Vec2::new(1000.0, 1000.0), 1);
        let mut dead = enemy_at(Vec2::new(50.0, 0.0), 0);
        dead.alive = false;
        let enemies = vec![far, dead, enemy_at(Vec2::new(20.0, 0.0), 0)];
        let picked = select_target(Vec2::new(0.0, 0.0), 60.0, &enemies, &waypoints);
        assert_eq!(picked, Some(2));
    }

    #[test]
    fn test_no_target_when_nothing_in_range() {
        let waypoints = straight_waypoints();
        let enemies = vec![enemy_at(Vec2::new(500.0, 0.0), 0)];
        assert_eq!(select_target(Vec2::ZERO, 100.0, &enemies, &waypoints), None);
    }

    #[test]
    fn test_pellet_offsets_symmetric_and_span_arc() {
        let arc = 30.0f32.to_radians();
        let offsets = pellet_offsets(12, arc);
        assert_eq!(offsets.len(), 12);
        // Symmetric around zero: offset[i] == -offset[n-1-i]
        for i in 0..12 {
            assert!((offsets[i] + offsets[11 - i]).abs() < 1e-6);
        }
        // Full span equals the arc exactly
        assert!((offsets[11] - offsets[0] - arc).abs() < 1e-6);
    }

    #[test]
    fn test_single_pellet_flies_straight() {
        assert_eq!(pellet_offsets(1, 1.0), vec![0.0]);
        assert_eq!(pellet_offsets(0, 1.0), vec![0.0]);
    }

    #[test]
    fn test_plan_shots_zero_length_aim() {
        let spec = TowerKind::Basic.spec();
        let origin = Vec2::new(50.0, 50.0);
        assert!(plan_shots(&spec, origin, origin).is_none());
    }

    #[test]
    fn test_plan_shots_single() {
        let spec = TowerKind::Sniper.spec();
        let shots = plan_shots(&spec, Vec2::ZERO, Vec2::new(10.0, 0.0)).unwrap();
        assert_eq!(shots.len(), 1);
        assert!((shots[0].vel.x - spec.bullet_speed).abs() < 1e-3);
        assert!(shots[0].vel.y.abs() < 1e-3);
        assert_eq!(shots[0].damage, spec.damage);
    }

    #[test]
    fn test_plan_shots_shotgun_emits_all_pellets() {
        let spec = TowerKind::Shotgun.spec();
        let shots = plan_shots(&spec, Vec2::ZERO, Vec2::new(0.0, 50.0)).unwrap();
        assert_eq!(shots.len(), 12);
        for shot in &shots {
            assert!((shot.vel.length() - spec.bullet_speed).abs() < 1e-2);
        }
    }

    #[test]
    fn test_step_enemy_walks_toward_next_waypoint() {
        let waypoints = straight_waypoints();
        let mut enemy = enemy_at(Vec2::new(0.0, 0.0), 0);
        assert_eq!(step_enemy(&mut enemy, &waypoints, 0.5), PathProgress::Walking);
        assert!((enemy.pos.x - 40.0).abs() < 1e-4);
        assert_eq!(enemy.path_index, 0);
    }

    #[test]
    fn test_step_enemy_snaps_on_overshoot() {
        let waypoints = straight_waypoints();
        let mut enemy = enemy_at(Vec2::new(99.0, 0.0), 0);
        step_enemy(&mut enemy, &waypoints, 0.5);
        assert_eq!(enemy.pos, Vec2::new(100.0, 0.0));
        assert_eq!(enemy.path_index, 1);
    }

    #[test]
    fn test_step_enemy_reports_path_end() {
        let waypoints = straight_waypoints();
        let mut enemy = enemy_at(Vec2::new(100.0, 100.0), 2);
        assert_eq!(
            step_enemy(&mut enemy, &waypoints, 0.5),
            PathProgress::ReachedEnd
        );
    }

    #[test]
    fn test_path_index_stays_in_bounds_over_full_walk() {
        let waypoints = straight_waypoints();
        let mut enemy = enemy_at(Vec2::new(0.0, 0.0), 0);
        for _ in 0..1000 {
            if step_enemy(&mut enemy, &waypoints, 1.0 / 60.0) == PathProgress::ReachedEnd {
                break;
            }
            assert!(enemy.path_index < waypoints.len());
        }
        assert_eq!(enemy.path_index, waypoints.len() - 1);
    }

    #[test]
    fn test_bullet_culled_outside_world() {
        let grid = GridConfig::default();
        let mut bullet = Bullet::new(Vec2::new(1099.0, 50.0), Vec2::new(500.0, 0.0), 20);
        let hit = step_bullet(&mut bullet, &grid, &mut [], 0.1);
        assert!(hit.is_none());
        assert!(!bullet.alive);
    }

    #[test]
    fn test_bullet_hits_first_enemy_only() {
        let grid = GridConfig::default();
        let mut enemies = vec![
            enemy_at(Vec2::new(100.0, 100.0), 0),
            enemy_at(Vec2::new(105.0, 100.0), 0),
        ];
        let mut bullet = Bullet::new(Vec2::new(100.0, 100.0), Vec2::ZERO, 20);
        let hit = step_bullet(&mut bullet, &grid, &mut enemies, 1.0 / 60.0).unwrap();
        assert_eq!(hit.enemy_index, 0);
        assert!(!hit.lethal);
        assert!(!bullet.alive);
        assert_eq!(enemies[0].health.current, 20);
        assert_eq!(enemies[1].health.current, 40);
    }

    #[test]
    fn test_lethal_hit_marks_enemy_dead() {
        let grid = GridConfig::default();
        let mut enemies = vec![enemy_at(Vec2::new(100.0, 100.0), 0)];
        enemies[0].health.apply_damage(20);
        let mut bullet = Bullet::new(Vec2::new(100.0, 100.0), Vec2::ZERO, 20);
        let hit = step_bullet(&mut bullet, &grid, &mut enemies, 1.0 / 60.0).unwrap();
        assert!(hit.lethal);
        assert!(!enemies[0].alive);
    }
}
