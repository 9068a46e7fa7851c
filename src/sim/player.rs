//! Per-player kinematic and combat state on the display

use serde::Serialize;

use crate::ws::protocol::Direction;

/// Sprite footprint in world units
pub const PLAYER_WIDTH: f32 = 48.0;
pub const PLAYER_HEIGHT: f32 = 64.0;

/// Lives every player spawns with
pub const STARTING_LIVES: u32 = 3;

/// Fraction of the sprite width a projectile must come within to hit
pub const HIT_RADIUS_FACTOR: f32 = 0.3;

/// Frames the hit flash stays visible
pub const HIT_FLASH_FRAMES: u32 = 12;

/// Aim vectors shorter than this carry no direction
const AIM_DEAD_ZONE: f32 = 1e-3;

/// Latest controller input, overwritten by each routed message
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputState {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub aim_x: f32,
    pub aim_y: f32,
    /// Angle of a fire request not yet consumed by the frame loop
    pub fire: Option<f32>,
}

impl InputState {
    /// Apply a `move` update. Pending fire requests survive.
    pub fn apply_move(&mut self, directions: &[Direction], aim_x: f32, aim_y: f32) {
        self.left = directions.contains(&Direction::Left);
        self.right = directions.contains(&Direction::Right);
        self.jump = directions.contains(&Direction::Jump);
        self.aim_x = aim_x;
        self.aim_y = aim_y;
    }

    pub fn is_firing(&self) -> bool {
        self.fire.is_some()
    }
}

/// Sprite animation chosen from input each frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Animation {
    Idle,
    Left,
    Right,
}

/// Weapon orientation, tagged with the player holding it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Weapon {
    pub owner_id: String,
    /// Rotation in radians, screen coordinates (y down)
    pub angle: f32,
    /// Sprite is mirrored vertically when aiming left
    pub flip_y: bool,
}

impl Weapon {
    pub fn new(owner_id: &str) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            angle: 0.0,
            flip_y: false,
        }
    }

    /// Track an aim vector. Vectors without a direction leave the weapon as is.
    pub fn aim(&mut self, x: f32, y: f32) {
        if x.hypot(y) > AIM_DEAD_ZONE {
            self.set_angle(y.atan2(x));
        }
    }

    pub fn set_angle(&mut self, angle: f32) {
        self.angle = angle;
        self.flip_y = angle.cos() < 0.0;
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub color: String,

    // Position is the sprite center
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub width: f32,
    pub height: f32,

    pub input: InputState,
    pub on_ground: bool,
    /// Jumps started since the last landing
    pub jumps_used: u8,
    /// Frames the current jump has been held, `None` when not holding
    pub jump_timer: Option<u32>,
    pub was_jumping: bool,

    pub animation: Animation,
    pub facing_right: bool,

    pub lives: u32,
    pub hit_flash: u32,
    pub weapon: Weapon,
}

impl Player {
    pub fn new(id: &str, name: &str, color: &str, x: f32, y: f32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            color: color.to_string(),
            x,
            y,
            vel_x: 0.0,
            vel_y: 0.0,
            width: PLAYER_WIDTH,
            height: PLAYER_HEIGHT,
            input: InputState::default(),
            on_ground: false,
            jumps_used: 0,
            jump_timer: None,
            was_jumping: false,
            animation: Animation::Idle,
            facing_right: true,
            lives: STARTING_LIVES,
            hit_flash: 0,
            weapon: Weapon::new(id),
        }
    }

    pub fn left(&self) -> f32 {
        self.x - self.width / 2.0
    }

    pub fn right(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn top(&self) -> f32 {
        self.y - self.height / 2.0
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height / 2.0
    }

    pub fn hit_radius(&self) -> f32 {
        self.width * HIT_RADIUS_FACTOR
    }

    pub fn is_alive(&self) -> bool {
        self.lives > 0
    }

    /// Take one hit. Returns true when this was the last life.
    pub fn take_hit(&mut self) -> bool {
        self.lives = self.lives.saturating_sub(1);
        self.hit_flash = HIT_FLASH_FRAMES;
        !self.is_alive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::f32::consts::PI;

    #[test]
    fn move_update_maps_directions() {
        let mut input = InputState {
            fire: Some(1.0),
            ..Default::default()
        };
        input.apply_move(&[Direction::Left, Direction::Jump], 0.2, -0.4);

        assert!(input.left);
        assert!(!input.right);
        assert!(input.jump);
        assert_eq!(input.aim_x, 0.2);
        assert!(input.is_firing());

        input.apply_move(&[], 0.0, 0.0);
        assert!(!input.left && !input.right && !input.jump);
    }

    #[test]
    fn weapon_flips_when_aiming_left() {
        let mut weapon = Weapon::new("p1");
        weapon.aim(-1.0, 0.0);
        assert_approx_eq!(weapon.angle, PI, 1e-5);
        assert!(weapon.flip_y);

        weapon.aim(1.0, 1.0);
        assert_approx_eq!(weapon.angle, PI / 4.0, 1e-5);
        assert!(!weapon.flip_y);
    }

    #[test]
    fn centered_stick_keeps_previous_aim() {
        let mut weapon = Weapon::new("p1");
        weapon.aim(-0.5, -0.5);
        let before = weapon.clone();
        weapon.aim(0.0, 0.0);
        assert_eq!(weapon, before);
    }

    #[test]
    fn last_hit_reports_elimination() {
        let mut player = Player::new("p1", "Ana", "#00ff99", 100.0, 100.0);
        assert!(!player.take_hit());
        assert!(!player.take_hit());
        assert!(player.take_hit());
        assert_eq!(player.lives, 0);
        assert_eq!(player.hit_flash, HIT_FLASH_FRAMES);
    }

    #[test]
    fn hit_radius_is_thirty_percent_of_width() {
        let player = Player::new("p1", "Ana", "#00ff99", 0.0, 0.0);
        assert_approx_eq!(player.hit_radius(), PLAYER_WIDTH * 0.3, 1e-5);
    }
}
