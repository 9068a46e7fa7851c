//! Relay task: owns the session store and handles events in arrival order

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::ws::protocol::{ClientMsg, Direction, Role, ServerMsg};

use super::peer::{ConnectionId, Peer};
use super::store::{ControllerRecord, Session, SessionStore};
use super::{ConnectionContext, ConnectionRole, RelayError, RelayEvent};

/// Depth of the relay's inbound event queue
pub const RELAY_QUEUE: usize = 1024;

/// Counters published for the health endpoint
#[derive(Debug, Default)]
pub struct RelayStats {
    sessions: AtomicUsize,
    displays: AtomicUsize,
    controllers: AtomicUsize,
}

impl RelayStats {
    fn update(&self, store: &SessionStore) {
        self.sessions.store(store.session_count(), Ordering::Relaxed);
        self.displays.store(store.display_count(), Ordering::Relaxed);
        self.controllers.store(store.controller_count(), Ordering::Relaxed);
    }

    pub fn sessions(&self) -> usize {
        self.sessions.load(Ordering::Relaxed)
    }

    pub fn displays(&self) -> usize {
        self.displays.load(Ordering::Relaxed)
    }

    pub fn controllers(&self) -> usize {
        self.controllers.load(Ordering::Relaxed)
    }
}

/// Fields of a `join`, after decoding
struct JoinRequest {
    session: String,
    is_mobile: bool,
    player_id: Option<String>,
    player_name: Option<String>,
    player_color: Option<String>,
}

/// The relay state machine
pub struct Relay {
    store: SessionStore,
    connections: HashMap<ConnectionId, ConnectionContext>,
    stats: Arc<RelayStats>,
}

impl Relay {
    pub fn new(stats: Arc<RelayStats>) -> Self {
        Self::with_store(SessionStore::new(), stats)
    }

    pub fn with_store(store: SessionStore, stats: Arc<RelayStats>) -> Self {
        Self {
            store,
            connections: HashMap::new(),
            stats,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Process events until every sender is gone
    pub async fn run(mut self, mut events: mpsc::Receiver<RelayEvent>) {
        info!("Relay started");
        while let Some(event) = events.recv().await {
            self.handle(event);
        }
        info!("Relay stopped");
    }

    /// Handle one event to completion
    pub fn handle(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::Connected { peer } => {
                debug!(conn_id = %peer.conn_id(), "Connection opened");
                self.connections
                    .insert(peer.conn_id(), ConnectionContext::new(peer));
            }
            RelayEvent::Inbound { conn_id, msg } => self.handle_message(conn_id, msg),
            RelayEvent::Disconnected { conn_id } => self.handle_disconnect(conn_id),
        }
        self.stats.update(&self.store);
    }

    fn handle_message(&mut self, conn_id: ConnectionId, msg: ClientMsg) {
        let Some(ctx) = self.connections.get(&conn_id).cloned() else {
            warn!(conn_id = %conn_id, "Message from unknown connection");
            return;
        };
        let action = msg.action();

        let result = match msg {
            ClientMsg::Join {
                user_id,
                is_mobile,
                player_id,
                player_name,
                player_color,
            } => self.on_join(
                &ctx,
                JoinRequest {
                    session: user_id,
                    is_mobile,
                    player_id,
                    player_name,
                    player_color,
                },
            ),
            ClientMsg::Move {
                directions,
                x,
                y,
                angle,
                ..
            } => self.on_move(&ctx, directions, x, y, angle),
            ClientMsg::Shoot { x, y, angle, .. } => self.on_shoot(&ctx, x, y, angle),
            ClientMsg::RequestAllPlayers { .. } => self.on_request_all_players(&ctx),
        };

        if let Err(e) = result {
            if e.closes_connection() {
                warn!(conn_id = %conn_id, error = %e, "Join rejected");
                ctx.peer.send(ServerMsg::Error {
                    error: e.to_string(),
                });
                ctx.peer.close();
            } else {
                warn!(conn_id = %conn_id, action, error = %e, "Dropped message");
            }
        }
    }

    fn on_join(&mut self, ctx: &ConnectionContext, join: JoinRequest) -> Result<(), RelayError> {
        if ctx.role != ConnectionRole::Unjoined {
            return Err(RelayError::AlreadyJoined);
        }

        let key = join.session.trim();
        if key.is_empty() {
            return Err(RelayError::EmptySessionKey);
        }
        let player_id = join
            .player_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        let (role, reply) = if !join.is_mobile {
            let roster = self.store.set_display(key, ctx.peer.clone())?;
            ctx.peer.send(ServerMsg::ExistingPlayers { players: roster });
            info!(session = %key, conn_id = %ctx.conn_id(), "Display connected");

            (
                ConnectionRole::Display {
                    session: key.to_string(),
                },
                ServerMsg::Role {
                    role: Role::Display,
                    player_id: None,
                },
            )
        } else if let Some(player_id) = player_id {
            let name = join
                .player_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| player_id.clone());
            let record = self.store.add_controller(
                key,
                &player_id,
                &name,
                join.player_color.as_deref(),
                ctx.peer.clone(),
            );

            if let Some(display) = self.store.get(key).and_then(Session::open_display) {
                display.send(ServerMsg::NewPlayer(record.info()));
            }
            info!(
                session = %key,
                player_id = %player_id,
                color = %record.color,
                "Controller connected"
            );

            (
                ConnectionRole::Controller {
                    session: key.to_string(),
                    player_id: player_id.clone(),
                },
                ServerMsg::Role {
                    role: Role::Controller,
                    player_id: Some(player_id),
                },
            )
        } else {
            return Err(RelayError::MissingPlayerId);
        };

        ctx.peer.send(reply);
        if let Some(entry) = self.connections.get_mut(&ctx.conn_id()) {
            entry.role = role;
        }
        Ok(())
    }

    fn on_move(
        &self,
        ctx: &ConnectionContext,
        directions: Vec<Direction>,
        x: Option<f32>,
        y: Option<f32>,
        angle: Option<f32>,
    ) -> Result<(), RelayError> {
        let (key, player_id) = controller_of(ctx)?;
        let Some(session) = self.store.get(key) else {
            return Ok(());
        };
        let Some(record) = owned_record(session, player_id, ctx.conn_id()) else {
            return Ok(());
        };

        let msg = ServerMsg::Move {
            player_id: record.id.clone(),
            directions: directions
                .into_iter()
                .filter(|d| *d != Direction::Unknown)
                .collect(),
            x: x.unwrap_or_default(),
            y: y.unwrap_or_default(),
            angle: angle.unwrap_or_default(),
            player_name: record.name.clone(),
            player_color: record.color.clone(),
        };
        forward_to_display(key, session, msg);
        Ok(())
    }

    fn on_shoot(
        &self,
        ctx: &ConnectionContext,
        x: Option<f32>,
        y: Option<f32>,
        angle: Option<f32>,
    ) -> Result<(), RelayError> {
        let (key, player_id) = controller_of(ctx)?;
        let Some(session) = self.store.get(key) else {
            return Ok(());
        };
        let Some(record) = owned_record(session, player_id, ctx.conn_id()) else {
            return Ok(());
        };

        let msg = ServerMsg::Shoot {
            player_id: record.id.clone(),
            x: x.unwrap_or_default(),
            y: y.unwrap_or_default(),
            angle: angle.unwrap_or_default(),
            player_name: record.name.clone(),
            player_color: record.color.clone(),
        };
        forward_to_display(key, session, msg);
        Ok(())
    }

    fn on_request_all_players(&self, ctx: &ConnectionContext) -> Result<(), RelayError> {
        let ConnectionRole::Display { session: key } = &ctx.role else {
            return Err(match ctx.role {
                ConnectionRole::Unjoined => RelayError::NotJoined,
                _ => RelayError::NotDisplay,
            });
        };
        let session = self
            .store
            .get(key)
            .filter(|s| s.display().map(Peer::conn_id) == Some(ctx.conn_id()))
            .ok_or(RelayError::NotDisplay)?;

        ctx.peer.send(ServerMsg::ExistingPlayers {
            players: session.roster(),
        });
        Ok(())
    }

    fn handle_disconnect(&mut self, conn_id: ConnectionId) {
        // Removing the context first makes repeated disconnects no-ops
        let Some(ctx) = self.connections.remove(&conn_id) else {
            return;
        };

        match ctx.role {
            ConnectionRole::Unjoined => {
                debug!(conn_id = %conn_id, "Unjoined connection closed");
            }
            ConnectionRole::Display { session } => {
                if self.store.clear_display(&session, conn_id) {
                    info!(session = %session, "Display disconnected");
                }
                self.store.remove_if_empty(&session);
            }
            ConnectionRole::Controller { session, player_id } => {
                if self
                    .store
                    .remove_controller(&session, &player_id, conn_id)
                    .is_some()
                {
                    info!(session = %session, player_id = %player_id, "Controller disconnected");
                    if let Some(display) = self.store.get(&session).and_then(Session::open_display) {
                        display.send(ServerMsg::PlayerDisconnect {
                            player_id: player_id.clone(),
                        });
                    }
                }
                self.store.remove_if_empty(&session);
            }
        }
    }
}

fn controller_of(ctx: &ConnectionContext) -> Result<(&str, &str), RelayError> {
    match &ctx.role {
        ConnectionRole::Controller { session, player_id } => {
            Ok((session.as_str(), player_id.as_str()))
        }
        ConnectionRole::Display { .. } => Err(RelayError::NotController),
        ConnectionRole::Unjoined => Err(RelayError::NotJoined),
    }
}

/// The controller record, if this connection still holds it. A rejoin
/// under the same id moves the record to the new connection.
fn owned_record<'a>(
    session: &'a Session,
    player_id: &str,
    conn_id: ConnectionId,
) -> Option<&'a ControllerRecord> {
    let record = session.controller(player_id)?;
    if record.peer.conn_id() != conn_id {
        debug!(player_id = %player_id, conn_id = %conn_id, "Input from superseded connection dropped");
        return None;
    }
    Some(record)
}

fn forward_to_display(key: &str, session: &Session, msg: ServerMsg) {
    match session.open_display() {
        Some(display) => {
            display.send(msg);
        }
        None => debug!(session = %key, "No display connected, input dropped"),
    }
}

/// Cloneable entry point to the relay task
#[derive(Clone)]
pub struct RelayHandle {
    tx: mpsc::Sender<RelayEvent>,
    stats: Arc<RelayStats>,
}

impl RelayHandle {
    /// Spawn the relay task on the current runtime
    pub fn spawn() -> Self {
        let stats = Arc::new(RelayStats::default());
        let (tx, rx) = mpsc::channel(RELAY_QUEUE);
        tokio::spawn(Relay::new(stats.clone()).run(rx));
        Self { tx, stats }
    }

    pub fn stats(&self) -> &RelayStats {
        &self.stats
    }

    /// Register a connection. Dropping the guard disconnects it.
    pub async fn connect(&self, peer: Peer) -> ConnectionGuard {
        let conn_id = peer.conn_id();
        let _ = self.tx.send(RelayEvent::Connected { peer }).await;
        ConnectionGuard {
            conn_id,
            tx: self.tx.clone(),
        }
    }
}

/// Live registration of one connection with the relay.
///
/// The disconnect event is sent from `Drop`, so it fires exactly once however
/// the connection task ends.
pub struct ConnectionGuard {
    conn_id: ConnectionId,
    tx: mpsc::Sender<RelayEvent>,
}

impl ConnectionGuard {
    pub fn conn_id(&self) -> ConnectionId {
        self.conn_id
    }

    /// Queue an inbound message, waiting while the relay is busy.
    /// Returns false once the relay is gone.
    pub async fn submit(&self, msg: ClientMsg) -> bool {
        self.tx
            .send(RelayEvent::Inbound {
                conn_id: self.conn_id,
                msg,
            })
            .await
            .is_ok()
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let event = RelayEvent::Disconnected {
            conn_id: self.conn_id,
        };
        // A full queue must not lose the disconnect
        if let Err(TrySendError::Full(event)) = self.tx.try_send(event) {
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    let tx = self.tx.clone();
                    runtime.spawn(async move {
                        let _ = tx.send(event).await;
                    });
                }
                Err(_) => warn!(conn_id = %self.conn_id, "No runtime to post disconnect"),
            }
        }
    }
}
