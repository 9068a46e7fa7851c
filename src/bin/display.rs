//! Headless display client
//!
//! Joins a session as its display, feeds routed controller input into the
//! simulation and steps it at the frame rate, logging what happens.

use futures::{SinkExt, StreamExt};
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use couch_arena::config::DisplayConfig;
use couch_arena::sim::{SimConfig, SimEvent, Simulation, SnapshotThrottle, Viewport};
use couch_arena::util::telemetry::{init_tracing, shutdown_signal};
use couch_arena::util::time::{frame_duration, FRAME_RATE};
use couch_arena::ws::protocol::{ClientMsg, ServerMsg};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = DisplayConfig::from_env()?;
    init_tracing(&config.log_level);

    info!(url = %config.relay_url, session = %config.session_key, "Connecting to relay");
    let (socket, _) = connect_async(config.relay_url.as_str()).await?;
    let (mut sink, mut stream) = socket.split();

    let join = ClientMsg::Join {
        user_id: config.session_key.clone(),
        is_mobile: false,
        player_id: None,
        player_name: None,
        player_color: None,
    };
    sink.send(Message::Text(join.encode()?)).await?;

    let mut sim = Simulation::new(SimConfig {
        viewport: Viewport::new(config.viewport_width, config.viewport_height),
        local_player_id: config.local_player_id.clone(),
        seed: config.seed,
    });

    let mut frames = interval(frame_duration());
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut throttle = SnapshotThrottle::new(FRAME_RATE);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = frames.tick() => {
                let events = sim.step();
                if !events.is_empty() {
                    throttle.force_next();
                }
                let game_over = log_events(&events);

                if throttle.should_emit() {
                    let snapshot = sim.snapshot(events);
                    debug!(
                        frame = snapshot.frame,
                        players = snapshot.players.len(),
                        projectiles = snapshot.projectiles.len(),
                        "Frame"
                    );
                }

                if game_over {
                    info!("Local player eliminated, leaving game");
                    break;
                }
            }

            frame = stream.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Relay closed the connection");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        error!(error = %e, "WebSocket error");
                        break;
                    }
                };

                let msg = match ServerMsg::decode(&text) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!(error = %e, "Failed to parse relay message");
                        continue;
                    }
                };

                match msg {
                    ServerMsg::Role { .. } => {
                        sim.apply(msg);
                        // Ready to render: resync the roster
                        let request = ClientMsg::RequestAllPlayers {
                            user_id: Some(config.session_key.clone()),
                        };
                        sink.send(Message::Text(request.encode()?)).await?;
                    }
                    ServerMsg::Error { error } => {
                        error!(error = %error, "Join rejected");
                        break;
                    }
                    other => sim.apply(other),
                }
            }

            _ = &mut shutdown => break,
        }
    }

    sim.teardown();
    let _ = sink.send(Message::Close(None)).await;
    info!("Display shut down");
    Ok(())
}

/// Log lifecycle events. Returns true when the game is over.
fn log_events(events: &[SimEvent]) -> bool {
    let mut game_over = false;

    for event in events {
        match event {
            SimEvent::PlayerJoined { player_id, name } => {
                info!(player_id = %player_id, name = %name, "Player joined");
            }
            SimEvent::PlayerLeft { player_id } => {
                info!(player_id = %player_id, "Player left");
            }
            SimEvent::PlayerHit {
                player_id,
                by,
                lives_left,
            } => {
                info!(player_id = %player_id, by = %by, lives_left, "Player hit");
            }
            SimEvent::PlayerEliminated { player_id } => {
                info!(player_id = %player_id, "Player eliminated");
            }
            SimEvent::GameOver { player_id } => {
                info!(player_id = %player_id, "Game over");
                game_over = true;
            }
            SimEvent::ProjectileFired { .. } | SimEvent::ProjectileRemoved { .. } => {
                debug!(?event, "Projectile");
            }
        }
    }

    game_over
}
