//! Display-side simulation: movement, platform collision and combat

pub mod combat;
pub mod engine;
pub mod physics;
pub mod platforms;
pub mod player;
pub mod snapshot;

pub use combat::{CombatSystem, Projectile, RemovalCause};
pub use engine::{SimConfig, Simulation};
pub use physics::PhysicsSystem;
pub use platforms::{Platform, Viewport};
pub use player::{Animation, InputState, Player};
pub use snapshot::{FrameSnapshot, PlayerView, ProjectileView, SnapshotThrottle};

use serde::Serialize;
use uuid::Uuid;

/// Things that happened during a frame, for logging or rendering effects
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SimEvent {
    PlayerJoined {
        player_id: String,
        name: String,
    },
    PlayerLeft {
        player_id: String,
    },
    ProjectileFired {
        projectile_id: Uuid,
        owner_id: String,
    },
    PlayerHit {
        player_id: String,
        by: String,
        lives_left: u32,
    },
    PlayerEliminated {
        player_id: String,
    },
    ProjectileRemoved {
        projectile_id: Uuid,
        #[serde(flatten)]
        cause: RemovalCause,
    },
    /// The local player was eliminated
    GameOver {
        player_id: String,
    },
}
