//! Player movement, jumping, gravity and platform collision
//!
//! Units are world units per frame; the simulation is stepped once per
//! rendered frame.

use super::platforms::{Platform, Viewport};
use super::player::{Animation, Player};

/// Downward acceleration added every frame
pub const GRAVITY: f32 = 0.25;
/// Horizontal speed while a direction is held
pub const MOVE_SPEED: f32 = 4.0;
/// Vertical velocity set when a jump starts
pub const JUMP_FORCE_INITIAL: f32 = -4.5;
/// Extra upward impulse per frame while the jump is held
pub const JUMP_FORCE_CONTINUOUS: f32 = -0.3;
/// Frames the continuous impulse is applied for
pub const MAX_JUMP_TIME: u32 = 15;
/// Jumps allowed between landings
pub const MAX_JUMPS: u8 = 2;

/// Slack for edge comparisons after snapping
const COLLISION_EPSILON: f32 = 0.01;

/// Physics system for advancing players
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Advance one player by one frame
    pub fn step_player(player: &mut Player, platforms: &[Platform], viewport: Viewport) {
        let prev_x = player.x;
        let prev_y = player.y;

        Self::update_animation(player);
        Self::apply_horizontal_input(player);
        Self::apply_jump(player);
        Self::apply_gravity(player);
        Self::resolve_landing(player, prev_y, platforms);
        Self::resolve_side_blocking(player, prev_x, platforms);
        Self::clamp_to_screen(player, viewport);
    }

    /// Pick the animation from input. Facing is kept while idle.
    pub fn update_animation(player: &mut Player) {
        player.animation = if player.input.left {
            player.facing_right = false;
            Animation::Left
        } else if player.input.right {
            player.facing_right = true;
            Animation::Right
        } else {
            Animation::Idle
        };
    }

    /// Horizontal velocity is a direct function of the held direction
    pub fn apply_horizontal_input(player: &mut Player) {
        player.vel_x = if player.input.left {
            -MOVE_SPEED
        } else if player.input.right {
            MOVE_SPEED
        } else {
            0.0
        };
        player.x += player.vel_x;
    }

    /// Jump state machine.
    ///
    /// A new jump needs a rising edge on the jump flag, and either ground
    /// contact or an earlier jump since the last landing with jumps to spare.
    /// Holding the flag adds a continuous impulse until the hold timer runs
    /// out; releasing clears the timer.
    pub fn apply_jump(player: &mut Player) {
        let jump = player.input.jump;

        if jump {
            let rising_edge = !player.was_jumping;
            let can_jump = player.jumps_used < MAX_JUMPS
                && (player.on_ground || player.jumps_used > 0);

            if rising_edge && can_jump {
                player.vel_y = JUMP_FORCE_INITIAL;
                player.jump_timer = Some(0);
                player.jumps_used += 1;
                player.on_ground = false;
            } else if let Some(held) = player.jump_timer {
                if held < MAX_JUMP_TIME {
                    player.vel_y += JUMP_FORCE_CONTINUOUS;
                    player.jump_timer = Some(held + 1);
                }
            }
        } else {
            player.jump_timer = None;
        }

        player.was_jumping = jump;
    }

    /// Gravity is applied unconditionally, then vertical position integrates
    pub fn apply_gravity(player: &mut Player) {
        player.vel_y += GRAVITY;
        player.y += player.vel_y;
    }

    /// Swept landing test against platform tops.
    ///
    /// The first platform whose top the player's bottom edge crossed this
    /// frame while falling wins. Without support the player is airborne.
    pub fn resolve_landing(player: &mut Player, prev_y: f32, platforms: &[Platform]) -> bool {
        if player.vel_y < 0.0 {
            player.on_ground = false;
            return false;
        }

        let prev_bottom = prev_y + player.height / 2.0;
        let bottom = player.bottom();
        let support = platforms.iter().find(|p| {
            let overlaps_x = player.right() > p.left() && player.left() < p.right();
            overlaps_x && prev_bottom <= p.top() + COLLISION_EPSILON && bottom >= p.top()
        });

        match support {
            Some(platform) => {
                player.y = platform.top() - player.height / 2.0;
                player.vel_y = 0.0;
                player.on_ground = true;
                player.jump_timer = None;
                player.jumps_used = 0;
                true
            }
            None => {
                player.on_ground = false;
                false
            }
        }
    }

    /// Stop horizontal movement that crossed into a platform's side
    pub fn resolve_side_blocking(player: &mut Player, prev_x: f32, platforms: &[Platform]) {
        let half_w = player.width / 2.0;

        for platform in platforms {
            let overlaps_y = player.bottom() > platform.top() + COLLISION_EPSILON
                && player.top() < platform.bottom() - COLLISION_EPSILON;
            if !overlaps_y {
                continue;
            }

            let prev_left = prev_x - half_w;
            let prev_right = prev_x + half_w;

            if prev_right <= platform.left() + COLLISION_EPSILON && player.right() > platform.left() {
                player.x = platform.left() - half_w;
                player.vel_x = 0.0;
            } else if prev_left >= platform.right() - COLLISION_EPSILON
                && player.left() < platform.right()
            {
                player.x = platform.right() + half_w;
                player.vel_x = 0.0;
            }
        }
    }

    /// Keep the full sprite width on screen
    pub fn clamp_to_screen(player: &mut Player, viewport: Viewport) {
        let half_w = player.width / 2.0;
        player.x = player.x.clamp(half_w, (viewport.width - half_w).max(half_w));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::platforms::generate_layout;
    use assert_approx_eq::assert_approx_eq;

    fn viewport() -> Viewport {
        Viewport::new(800.0, 600.0)
    }

    fn floor() -> Vec<Platform> {
        vec![Platform::new(0.0, 500.0, 800.0, 100.0)]
    }

    /// Player resting on the floor above
    fn grounded_player() -> Player {
        let mut player = Player::new("p1", "Ana", "#00ff99", 400.0, 0.0);
        player.y = 500.0 - player.height / 2.0;
        player.on_ground = true;
        player
    }

    fn step(player: &mut Player, platforms: &[Platform]) {
        PhysicsSystem::step_player(player, platforms, viewport());
    }

    #[test]
    fn resting_player_stays_put() {
        let platforms = floor();
        let mut player = grounded_player();
        let rest_y = player.y;

        for _ in 0..120 {
            step(&mut player, &platforms);
            assert!(player.on_ground);
            assert_eq!(player.vel_y, 0.0);
            assert_approx_eq!(player.y, rest_y, 1e-4);
        }
    }

    #[test]
    fn horizontal_velocity_follows_input() {
        let platforms = floor();
        let mut player = grounded_player();

        player.input.left = true;
        step(&mut player, &platforms);
        assert_eq!(player.vel_x, -MOVE_SPEED);
        assert_approx_eq!(player.x, 400.0 - MOVE_SPEED, 1e-4);
        assert_eq!(player.animation, Animation::Left);
        assert!(!player.facing_right);

        player.input.left = false;
        step(&mut player, &platforms);
        assert_eq!(player.vel_x, 0.0);
        assert_eq!(player.animation, Animation::Idle);
        assert!(!player.facing_right);
    }

    #[test]
    fn jump_starts_on_rising_edge_only() {
        let platforms = floor();
        let mut player = grounded_player();

        player.input.jump = true;
        step(&mut player, &platforms);
        assert_approx_eq!(player.vel_y, JUMP_FORCE_INITIAL + GRAVITY, 1e-5);
        assert_eq!(player.jumps_used, 1);
        assert!(!player.on_ground);

        // Holding adds the smaller continuous impulse
        step(&mut player, &platforms);
        assert_approx_eq!(
            player.vel_y,
            JUMP_FORCE_INITIAL + 2.0 * GRAVITY + JUMP_FORCE_CONTINUOUS,
            1e-5
        );
        assert_eq!(player.jump_timer, Some(1));
        assert_eq!(player.jumps_used, 1);
    }

    #[test]
    fn hold_timer_caps_continuous_impulse() {
        let platforms = floor();
        let mut player = grounded_player();
        player.input.jump = true;

        for _ in 0..(MAX_JUMP_TIME + 5) {
            step(&mut player, &platforms);
        }
        assert_eq!(player.jump_timer, Some(MAX_JUMP_TIME));

        player.input.jump = false;
        step(&mut player, &platforms);
        assert_eq!(player.jump_timer, None);
        assert_eq!(player.jumps_used, 1);
    }

    #[test]
    fn at_most_two_jumps_before_landing() {
        let platforms = floor();
        let mut player = grounded_player();

        let press = |player: &mut Player| {
            player.input.jump = true;
            step(player, &platforms);
            player.input.jump = false;
            step(player, &platforms);
        };

        press(&mut player);
        press(&mut player);
        assert_eq!(player.jumps_used, MAX_JUMPS);

        // Third press mid-air: only gravity acts
        let vel_before = player.vel_y;
        player.input.jump = true;
        PhysicsSystem::apply_jump(&mut player);
        assert_eq!(player.vel_y, vel_before);
        assert_eq!(player.jumps_used, MAX_JUMPS);
        player.input.jump = false;

        for _ in 0..300 {
            step(&mut player, &platforms);
            if player.on_ground {
                break;
            }
        }
        assert!(player.on_ground);
        assert_eq!(player.jumps_used, 0);
    }

    #[test]
    fn walking_off_a_ledge_gives_no_jump() {
        let mut player = Player::new("p1", "Ana", "#00ff99", 400.0, 100.0);
        player.on_ground = false;
        player.input.jump = true;

        PhysicsSystem::apply_jump(&mut player);
        assert_eq!(player.vel_y, 0.0);
        assert_eq!(player.jumps_used, 0);
    }

    #[test]
    fn falling_player_lands_on_first_crossed_top() {
        let platforms = vec![
            Platform::new(300.0, 200.0, 200.0, 16.0),
            Platform::new(0.0, 500.0, 800.0, 100.0),
        ];
        let mut player = Player::new("p1", "Ana", "#00ff99", 400.0, 200.0 - 32.0 - 3.0);
        player.vel_y = 5.0;

        step(&mut player, &platforms);
        assert!(player.on_ground);
        assert_eq!(player.vel_y, 0.0);
        assert_approx_eq!(player.bottom(), 200.0, 1e-4);
    }

    #[test]
    fn rising_player_passes_through_platform_from_below() {
        let platforms = vec![Platform::new(300.0, 200.0, 200.0, 16.0)];
        let mut player = Player::new("p1", "Ana", "#00ff99", 400.0, 200.0 + 16.0 + 33.0);
        player.vel_y = -6.0;

        step(&mut player, &platforms);
        assert!(!player.on_ground);
        assert!(player.vel_y < 0.0);
    }

    #[test]
    fn side_blocking_stops_at_platform_edge() {
        let wall = Platform::new(424.0 + 2.0, 300.0, 100.0, 300.0);
        let platforms = vec![Platform::new(0.0, 500.0, 800.0, 100.0), wall];
        let mut player = grounded_player();
        player.input.right = true;

        step(&mut player, &platforms);
        assert_approx_eq!(player.right(), wall.left(), 1e-4);
        assert_eq!(player.vel_x, 0.0);
        assert!(player.on_ground);
    }

    #[test]
    fn side_blocking_applies_when_airborne() {
        let wall = Platform::new(300.0, 0.0, 50.0, 400.0);
        let mut player = Player::new("p1", "Ana", "#00ff99", 350.0 + 24.0 + 1.0, 200.0);
        player.input.left = true;

        step(&mut player, &[wall]);
        assert_approx_eq!(player.left(), wall.right(), 1e-4);
        assert_eq!(player.vel_x, 0.0);
    }

    #[test]
    fn screen_edges_clamp_horizontally() {
        let platforms = floor();
        let mut player = grounded_player();
        player.x = 26.0;
        player.input.left = true;

        step(&mut player, &platforms);
        assert_approx_eq!(player.left(), 0.0, 1e-4);

        player.x = 798.0;
        player.input.left = false;
        player.input.right = true;
        step(&mut player, &platforms);
        assert_approx_eq!(player.right(), 800.0, 1e-4);
    }

    #[test]
    fn spawned_player_falls_onto_generated_floor() {
        let viewport = viewport();
        let platforms = generate_layout(viewport);
        let mut player = Player::new("p1", "Ana", "#00ff99", 400.0, 0.0);

        for _ in 0..600 {
            PhysicsSystem::step_player(&mut player, &platforms, viewport);
        }
        assert!(player.on_ground);
        assert!(player.bottom() <= viewport.height);
    }
}
