//! Outbound handle to one relay connection

use std::fmt;

use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::ws::protocol::ServerMsg;

/// Identifies one socket for its whole lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Instructions for a connection's writer task
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Message(ServerMsg),
    /// Send a close frame and end the connection
    Close,
}

/// Sending half of a connection's outbound queue
#[derive(Debug, Clone)]
pub struct Peer {
    conn_id: ConnectionId,
    tx: mpsc::Sender<Outbound>,
}

impl Peer {
    pub fn new(conn_id: ConnectionId, tx: mpsc::Sender<Outbound>) -> Self {
        Self { conn_id, tx }
    }

    pub fn conn_id(&self) -> ConnectionId {
        self.conn_id
    }

    /// Whether the writer side is still draining the queue
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Best-effort delivery. A closed or full queue drops the message.
    pub fn send(&self, msg: ServerMsg) -> bool {
        match self.tx.try_send(Outbound::Message(msg)) {
            Ok(()) => true,
            Err(e) => {
                debug!(conn_id = %self.conn_id, error = %e, "Dropped outbound message");
                false
            }
        }
    }

    pub fn close(&self) {
        let _ = self.tx.try_send(Outbound::Close);
    }
}
