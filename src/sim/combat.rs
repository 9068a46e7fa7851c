//! Projectiles and hit detection

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use super::platforms::{Platform, Viewport};
use super::player::Player;

/// Projectile speed in world units per frame
pub const PROJECTILE_SPEED: f32 = 12.0;

/// Distance from the shooter's center at which projectiles appear
pub const MUZZLE_OFFSET: f32 = 30.0;

/// Projectiles may leave the screen by this much before removal
pub const BOUNDS_MARGIN: f32 = 50.0;

/// Active projectile
#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub id: Uuid,
    pub owner_id: String,
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
}

impl Projectile {
    pub fn new(owner_id: &str, x: f32, y: f32, vel_x: f32, vel_y: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            x,
            y,
            vel_x,
            vel_y,
        }
    }

    /// Fire from a player's center along `angle`
    pub fn fired_by(shooter: &Player, angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(
            &shooter.id,
            shooter.x + cos * MUZZLE_OFFSET,
            shooter.y + sin * MUZZLE_OFFSET,
            cos * PROJECTILE_SPEED,
            sin * PROJECTILE_SPEED,
        )
    }

    pub fn update(&mut self) {
        self.x += self.vel_x;
        self.y += self.vel_y;
    }

    fn out_of_bounds(&self, viewport: Viewport) -> bool {
        self.x < -BOUNDS_MARGIN
            || self.x > viewport.width + BOUNDS_MARGIN
            || self.y < -BOUNDS_MARGIN
            || self.y > viewport.height + BOUNDS_MARGIN
    }
}

/// Why a projectile left play
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum RemovalCause {
    Platform,
    Hit { player_id: String },
    OutOfBounds,
}

/// Result of a projectile striking a player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitEvent {
    pub projectile_id: Uuid,
    pub target_id: String,
    pub owner_id: String,
    pub lives_left: u32,
}

/// Everything one projectile pass produced
#[derive(Debug, Default)]
pub struct ProjectileOutcome {
    pub removed: Vec<(Uuid, RemovalCause)>,
    pub hits: Vec<HitEvent>,
    /// Players whose last life was taken; already removed from the roster
    pub eliminated: Vec<Player>,
}

/// Combat system for projectile resolution
pub struct CombatSystem;

impl CombatSystem {
    /// Advance every projectile one frame and apply at most one outcome each
    pub fn step_projectiles(
        projectiles: &mut Vec<Projectile>,
        players: &mut BTreeMap<String, Player>,
        platforms: &[Platform],
        viewport: Viewport,
    ) -> ProjectileOutcome {
        let mut outcome = ProjectileOutcome::default();

        projectiles.retain_mut(|projectile| {
            projectile.update();

            match Self::resolve(projectile, players, platforms, viewport, &mut outcome) {
                Some(cause) => {
                    outcome.removed.push((projectile.id, cause));
                    false
                }
                None => true,
            }
        });

        outcome
    }

    fn resolve(
        projectile: &Projectile,
        players: &mut BTreeMap<String, Player>,
        platforms: &[Platform],
        viewport: Viewport,
        outcome: &mut ProjectileOutcome,
    ) -> Option<RemovalCause> {
        if platforms
            .iter()
            .any(|p| p.contains_point(projectile.x, projectile.y))
        {
            return Some(RemovalCause::Platform);
        }

        if let Some(target_id) = Self::find_target(projectile, players) {
            let player = players.get_mut(&target_id)?;
            let eliminated = player.take_hit();
            outcome.hits.push(HitEvent {
                projectile_id: projectile.id,
                target_id: target_id.clone(),
                owner_id: projectile.owner_id.clone(),
                lives_left: player.lives,
            });

            if eliminated {
                if let Some(player) = players.remove(&target_id) {
                    outcome.eliminated.push(player);
                }
            }
            return Some(RemovalCause::Hit {
                player_id: target_id,
            });
        }

        if projectile.out_of_bounds(viewport) {
            return Some(RemovalCause::OutOfBounds);
        }

        None
    }

    /// First non-owner player within hit range, in roster order
    fn find_target(projectile: &Projectile, players: &BTreeMap<String, Player>) -> Option<String> {
        players
            .values()
            .filter(|p| p.id != projectile.owner_id && p.is_alive())
            .find(|p| {
                let dx = p.x - projectile.x;
                let dy = p.y - projectile.y;
                dx.hypot(dy) < p.hit_radius()
            })
            .map(|p| p.id.clone())
    }

    /// Count down hit flashes
    pub fn tick_hit_flash(players: &mut BTreeMap<String, Player>) {
        for player in players.values_mut() {
            player.hit_flash = player.hit_flash.saturating_sub(1);
        }
    }
}
