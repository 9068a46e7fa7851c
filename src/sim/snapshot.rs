//! Render-ready frame views

use serde::Serialize;
use uuid::Uuid;

use super::combat::Projectile;
use super::platforms::Platform;
use super::player::{Animation, Player};
use super::SimEvent;

/// Distance of the name label above the sprite's top edge
pub const LABEL_OFFSET: f32 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerView {
    pub id: String,
    pub name: String,
    pub color: String,
    pub x: f32,
    pub y: f32,
    pub label_x: f32,
    pub label_y: f32,
    pub animation: Animation,
    pub facing_right: bool,
    pub weapon_angle: f32,
    pub weapon_flip_y: bool,
    pub lives: u32,
    pub hit_flash: bool,
}

impl From<&Player> for PlayerView {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            color: p.color.clone(),
            x: p.x,
            y: p.y,
            label_x: p.x,
            label_y: p.top() - LABEL_OFFSET,
            animation: p.animation,
            facing_right: p.facing_right,
            weapon_angle: p.weapon.angle,
            weapon_flip_y: p.weapon.flip_y,
            lives: p.lives,
            hit_flash: p.hit_flash > 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectileView {
    pub id: Uuid,
    pub owner_id: String,
    pub x: f32,
    pub y: f32,
}

impl From<&Projectile> for ProjectileView {
    fn from(p: &Projectile) -> Self {
        Self {
            id: p.id,
            owner_id: p.owner_id.clone(),
            x: p.x,
            y: p.y,
        }
    }
}

/// Everything a renderer needs to draw one frame
#[derive(Debug, Clone, Serialize)]
pub struct FrameSnapshot {
    pub frame: u64,
    pub players: Vec<PlayerView>,
    pub platforms: Vec<Platform>,
    pub projectiles: Vec<ProjectileView>,
    pub events: Vec<SimEvent>,
}

/// Decides which frames get a snapshot logged
pub struct SnapshotThrottle {
    frames_since_snapshot: u32,
    interval: u32,
}

impl SnapshotThrottle {
    pub fn new(interval: u32) -> Self {
        Self {
            frames_since_snapshot: 0,
            interval: interval.max(1),
        }
    }

    /// Count a frame; true once every `interval` frames
    pub fn should_emit(&mut self) -> bool {
        self.frames_since_snapshot += 1;
        if self.frames_since_snapshot >= self.interval {
            self.frames_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Emit on the next frame regardless of the interval
    pub fn force_next(&mut self) {
        self.frames_since_snapshot = self.interval;
    }
}
