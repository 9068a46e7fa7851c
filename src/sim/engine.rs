//! Simulation state owned by the display's frame loop

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use super::combat::{CombatSystem, Projectile};
use super::physics::PhysicsSystem;
use super::platforms::{generate_layout, Platform, Viewport};
use super::player::{Player, PLAYER_WIDTH};
use super::snapshot::{FrameSnapshot, PlayerView, ProjectileView};
use super::SimEvent;
use crate::ws::protocol::{PlayerInfo, ServerMsg};

/// Simulation setup
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub viewport: Viewport,
    /// Controller whose elimination ends the game
    pub local_player_id: Option<String>,
    /// Seed for spawn placement; entropy when unset
    pub seed: Option<u64>,
}

impl SimConfig {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            local_player_id: None,
            seed: None,
        }
    }
}

/// Players, platforms and projectiles for one game on the display
pub struct Simulation {
    viewport: Viewport,
    platforms: Vec<Platform>,
    players: BTreeMap<String, Player>,
    projectiles: Vec<Projectile>,
    local_player_id: Option<String>,
    rng: ChaCha8Rng,
    frame: u64,
    /// Events raised by inbound messages, reported with the next frame
    pending_events: Vec<SimEvent>,
    game_over: bool,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Self {
            viewport: config.viewport,
            platforms: generate_layout(config.viewport),
            players: BTreeMap::new(),
            projectiles: Vec::new(),
            local_player_id: config.local_player_id,
            rng,
            frame: 0,
            pending_events: Vec::new(),
            game_over: false,
        }
    }

    /// Feed one routed relay message into the simulation
    pub fn apply(&mut self, msg: ServerMsg) {
        match msg {
            ServerMsg::ExistingPlayers { players } => {
                for info in players {
                    self.spawn_player(&info);
                }
            }
            ServerMsg::NewPlayer(info) => {
                self.spawn_player(&info);
            }
            ServerMsg::Move {
                player_id,
                directions,
                x,
                y,
                ..
            } => match self.players.get_mut(&player_id) {
                Some(player) => player.input.apply_move(&directions, x, y),
                None => debug!(player_id = %player_id, "Move for unknown player"),
            },
            ServerMsg::Shoot {
                player_id, angle, ..
            } => match self.players.get_mut(&player_id) {
                Some(player) => player.input.fire = Some(angle),
                None => debug!(player_id = %player_id, "Shoot for unknown player"),
            },
            ServerMsg::PlayerDisconnect { player_id } => self.remove_player(&player_id),
            ServerMsg::Role { role, player_id } => {
                info!(?role, player_id = ?player_id, "Relay assigned role");
            }
            ServerMsg::Error { error } => {
                warn!(error = %error, "Relay rejected join");
            }
        }
    }

    /// Create a player at a random x along the top. A known id only
    /// refreshes the name and color, keeping position and lives.
    pub fn spawn_player(&mut self, info: &PlayerInfo) -> bool {
        if let Some(existing) = self.players.get_mut(&info.player_id) {
            debug!(player_id = %info.player_id, "Player already spawned");
            existing.name.clone_from(&info.player_name);
            existing.color.clone_from(&info.player_color);
            return false;
        }

        let half_w = PLAYER_WIDTH / 2.0;
        let max_x = (self.viewport.width - half_w).max(half_w);
        let x = if max_x > half_w {
            self.rng.gen_range(half_w..max_x)
        } else {
            half_w
        };

        let player = Player::new(&info.player_id, &info.player_name, &info.player_color, x, 0.0);
        info!(player_id = %player.id, name = %player.name, x, "Player spawned");

        self.pending_events.push(SimEvent::PlayerJoined {
            player_id: player.id.clone(),
            name: player.name.clone(),
        });
        self.players.insert(player.id.clone(), player);
        true
    }

    pub fn remove_player(&mut self, player_id: &str) {
        if self.players.remove(player_id).is_some() {
            info!(player_id = %player_id, "Player left");
            self.pending_events.push(SimEvent::PlayerLeft {
                player_id: player_id.to_string(),
            });
        }
    }

    /// Advance one frame and return what happened
    pub fn step(&mut self) -> Vec<SimEvent> {
        self.frame += 1;
        let mut events = std::mem::take(&mut self.pending_events);

        CombatSystem::tick_hit_flash(&mut self.players);

        for player in self.players.values_mut() {
            PhysicsSystem::step_player(player, &self.platforms, self.viewport);
            player.weapon.aim(player.input.aim_x, player.input.aim_y);

            if let Some(angle) = player.input.fire.take() {
                player.weapon.set_angle(angle);
                let projectile = Projectile::fired_by(player, angle);
                events.push(SimEvent::ProjectileFired {
                    projectile_id: projectile.id,
                    owner_id: player.id.clone(),
                });
                self.projectiles.push(projectile);
            }
        }

        let outcome = CombatSystem::step_projectiles(
            &mut self.projectiles,
            &mut self.players,
            &self.platforms,
            self.viewport,
        );

        events.extend(outcome.hits.into_iter().map(|hit| SimEvent::PlayerHit {
            player_id: hit.target_id,
            by: hit.owner_id,
            lives_left: hit.lives_left,
        }));

        for player in outcome.eliminated {
            info!(player_id = %player.id, "Player eliminated");
            let is_local = self.local_player_id.as_deref() == Some(player.id.as_str());
            events.push(SimEvent::PlayerEliminated {
                player_id: player.id.clone(),
            });
            if is_local {
                self.game_over = true;
                events.push(SimEvent::GameOver { player_id: player.id });
            }
        }

        events.extend(
            outcome
                .removed
                .into_iter()
                .map(|(projectile_id, cause)| SimEvent::ProjectileRemoved {
                    projectile_id,
                    cause,
                }),
        );

        events
    }

    /// Step and package the frame for a renderer
    pub fn step_snapshot(&mut self) -> FrameSnapshot {
        let events = self.step();
        self.snapshot(events)
    }

    pub fn snapshot(&self, events: Vec<SimEvent>) -> FrameSnapshot {
        FrameSnapshot {
            frame: self.frame,
            players: self.players.values().map(PlayerView::from).collect(),
            platforms: self.platforms.clone(),
            projectiles: self.projectiles.iter().map(ProjectileView::from).collect(),
            events,
        }
    }

    /// Rebuild the layout for a new viewport and pull players back on screen
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.platforms = generate_layout(viewport);
        for player in self.players.values_mut() {
            PhysicsSystem::clamp_to_screen(player, viewport);
        }
        debug!(width = viewport.width, height = viewport.height, "Viewport resized");
    }

    /// Drop all entities
    pub fn teardown(&mut self) {
        self.players.clear();
        self.platforms.clear();
        self.projectiles.clear();
        self.pending_events.clear();
        info!(frame = self.frame, "Simulation torn down");
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.get(player_id)
    }

    pub fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.get_mut(player_id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }
}
