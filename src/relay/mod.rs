//! Session relay: role assignment, routing and disconnect reconciliation

pub mod palette;
pub mod peer;
pub mod service;
pub mod store;

pub use peer::{ConnectionId, Outbound, Peer};
pub use service::{ConnectionGuard, Relay, RelayHandle, RelayStats};
pub use store::{ControllerRecord, Session, SessionStore};

use crate::ws::protocol::ClientMsg;

/// Events consumed by the relay task, one at a time
#[derive(Debug)]
pub enum RelayEvent {
    Connected { peer: Peer },
    Inbound { conn_id: ConnectionId, msg: ClientMsg },
    Disconnected { conn_id: ConnectionId },
}

/// What a connection has become after its join
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionRole {
    Unjoined,
    Display { session: String },
    Controller { session: String, player_id: String },
}

/// Per-connection record handed to every message handler
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub peer: Peer,
    pub role: ConnectionRole,
}

impl ConnectionContext {
    pub fn new(peer: Peer) -> Self {
        Self {
            peer,
            role: ConnectionRole::Unjoined,
        }
    }

    pub fn conn_id(&self) -> ConnectionId {
        self.peer.conn_id()
    }
}

/// Relay-level protocol violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("Session already has a display")]
    DisplayAlreadyConnected,

    #[error("Missing playerID")]
    MissingPlayerId,

    #[error("Missing session key")]
    EmptySessionKey,

    #[error("Connection already joined")]
    AlreadyJoined,

    #[error("Connection has not joined a session")]
    NotJoined,

    #[error("Only the session's display may do that")]
    NotDisplay,

    #[error("Only a controller may do that")]
    NotController,
}

impl RelayError {
    /// Rejections that end the connection
    pub fn closes_connection(&self) -> bool {
        matches!(
            self,
            RelayError::DisplayAlreadyConnected | RelayError::MissingPlayerId
        )
    }
}
