//! In-memory session registry
//!
//! A session exists only while it has a display or at least one controller.
//! Every mutation goes through [`SessionStore`] so that invariant is kept in
//! one place.

use std::collections::{BTreeMap, HashMap};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::ws::protocol::PlayerInfo;

use super::palette::assign_color;
use super::peer::{ConnectionId, Peer};
use super::RelayError;

/// One controller registered in a session
#[derive(Debug, Clone)]
pub struct ControllerRecord {
    pub id: String,
    pub name: String,
    pub color: String,
    pub peer: Peer,
}

impl ControllerRecord {
    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            player_id: self.id.clone(),
            player_name: self.name.clone(),
            player_color: self.color.clone(),
        }
    }
}

/// A display slot plus the controllers bound to it
#[derive(Debug, Default)]
pub struct Session {
    display: Option<Peer>,
    controllers: BTreeMap<String, ControllerRecord>,
}

impl Session {
    pub fn display(&self) -> Option<&Peer> {
        self.display.as_ref()
    }

    pub fn controller(&self, id: &str) -> Option<&ControllerRecord> {
        self.controllers.get(id)
    }

    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.display.is_none() && self.controllers.is_empty()
    }

    /// Current roster in controller-id order
    pub fn roster(&self) -> Vec<PlayerInfo> {
        self.controllers.values().map(ControllerRecord::info).collect()
    }

    /// Display peer if its connection is still draining
    pub fn open_display(&self) -> Option<&Peer> {
        self.display.as_ref().filter(|peer| peer.is_open())
    }
}

/// Registry of all live sessions
pub struct SessionStore {
    sessions: HashMap<String, Session>,
    rng: ChaCha8Rng,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_rng(ChaCha8Rng::from_entropy())
    }

    pub fn with_rng(rng: ChaCha8Rng) -> Self {
        Self {
            sessions: HashMap::new(),
            rng,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Session> {
        self.sessions.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.sessions.contains_key(key)
    }

    fn get_or_create(&mut self, key: &str) -> &mut Session {
        if !self.sessions.contains_key(key) {
            info!(session = %key, "Session created");
        }
        self.sessions.entry(key.to_string()).or_default()
    }

    /// Register `peer` as the session's display and return the roster it
    /// should be sent. Fails if a display already holds the slot.
    pub fn set_display(&mut self, key: &str, peer: Peer) -> Result<Vec<PlayerInfo>, RelayError> {
        if self.get(key).is_some_and(|s| s.display.is_some()) {
            return Err(RelayError::DisplayAlreadyConnected);
        }
        let session = self.get_or_create(key);
        session.display = Some(peer);
        Ok(session.roster())
    }

    /// Clear the display slot if `conn_id` still owns it
    pub fn clear_display(&mut self, key: &str, conn_id: ConnectionId) -> bool {
        match self.sessions.get_mut(key) {
            Some(session) if session.display.as_ref().map(Peer::conn_id) == Some(conn_id) => {
                session.display = None;
                true
            }
            _ => false,
        }
    }

    /// Register a controller. A re-join under an existing id takes over the
    /// record and keeps its color.
    pub fn add_controller(
        &mut self,
        key: &str,
        id: &str,
        name: &str,
        requested_color: Option<&str>,
        peer: Peer,
    ) -> ControllerRecord {
        let Self { sessions, rng } = self;
        if !sessions.contains_key(key) {
            info!(session = %key, "Session created");
        }
        let session = sessions.entry(key.to_string()).or_default();

        let color = match session.controllers.get(id) {
            Some(existing) => existing.color.clone(),
            None => assign_color(
                requested_color,
                session.controllers.values().map(|c| c.color.as_str()),
                rng,
            ),
        };

        let record = ControllerRecord {
            id: id.to_string(),
            name: name.to_string(),
            color,
            peer,
        };
        session.controllers.insert(id.to_string(), record.clone());
        record
    }

    /// Remove a controller if `conn_id` still owns its record
    pub fn remove_controller(
        &mut self,
        key: &str,
        id: &str,
        conn_id: ConnectionId,
    ) -> Option<ControllerRecord> {
        let session = self.sessions.get_mut(key)?;
        if session.controllers.get(id)?.peer.conn_id() != conn_id {
            return None;
        }
        session.controllers.remove(id)
    }

    /// Drop the session if it has neither display nor controllers
    pub fn remove_if_empty(&mut self, key: &str) -> bool {
        if self.get(key).is_some_and(Session::is_empty) {
            self.sessions.remove(key);
            info!(session = %key, "Session deleted");
            true
        } else {
            false
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn display_count(&self) -> usize {
        self.sessions.values().filter(|s| s.display.is_some()).count()
    }

    pub fn controller_count(&self) -> usize {
        self.sessions.values().map(Session::controller_count).sum()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::palette::PALETTE;
    use tokio::sync::mpsc;

    fn peer() -> (Peer, mpsc::Receiver<crate::relay::peer::Outbound>) {
        let (tx, rx) = mpsc::channel(8);
        (Peer::new(ConnectionId::new(), tx), rx)
    }

    fn store() -> SessionStore {
        SessionStore::with_rng(ChaCha8Rng::seed_from_u64(42))
    }

    #[test]
    fn second_display_is_rejected_and_first_kept() {
        let mut store = store();
        let (first, _rx1) = peer();
        let (second, _rx2) = peer();
        let first_id = first.conn_id();

        store.set_display("abc", first).unwrap();
        let err = store.set_display("abc", second).unwrap_err();

        assert!(matches!(err, RelayError::DisplayAlreadyConnected));
        let display = store.get("abc").and_then(Session::display).unwrap();
        assert_eq!(display.conn_id(), first_id);
    }

    #[test]
    fn display_receives_existing_roster() {
        let mut store = store();
        let (controller, _rx) = peer();
        store.add_controller("abc", "p1", "Ana", None, controller);

        let (display, _rx2) = peer();
        let roster = store.set_display("abc", display).unwrap();

        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].player_id, "p1");
        assert_eq!(roster[0].player_name, "Ana");
        assert_eq!(roster[0].player_color, PALETTE[0]);
    }

    #[test]
    fn controller_colors_are_unique_within_session() {
        let mut store = store();
        let mut receivers = Vec::new();
        let mut colors = Vec::new();
        for i in 0..PALETTE.len() {
            let (p, rx) = peer();
            receivers.push(rx);
            let record = store.add_controller("abc", &format!("p{}", i), "x", None, p);
            assert!(!colors.contains(&record.color));
            colors.push(record.color);
        }

        // Palettes are per session
        let (p, _rx) = peer();
        let other = store.add_controller("xyz", "p0", "x", None, p);
        assert_eq!(other.color, PALETTE[0]);
    }

    #[test]
    fn rejoin_keeps_color_and_stale_disconnect_is_ignored() {
        let mut store = store();
        let (old, _rx1) = peer();
        let old_id = old.conn_id();
        let first = store.add_controller("abc", "p1", "Ana", Some("#123456"), old);

        let (new, _rx2) = peer();
        let second = store.add_controller("abc", "p1", "Ana", None, new);
        assert_eq!(first.color, second.color);

        assert!(store.remove_controller("abc", "p1", old_id).is_none());
        assert_eq!(store.controller_count(), 1);
    }

    #[test]
    fn session_is_removed_only_when_empty() {
        let mut store = store();
        let (display, _rx1) = peer();
        let display_id = display.conn_id();
        let (controller, _rx2) = peer();
        let controller_id = controller.conn_id();

        store.set_display("abc", display).unwrap();
        store.add_controller("abc", "p1", "Ana", None, controller);

        assert!(store.clear_display("abc", display_id));
        assert!(!store.remove_if_empty("abc"));
        assert!(store.contains("abc"));

        assert!(store.remove_controller("abc", "p1", controller_id).is_some());
        assert!(store.remove_if_empty("abc"));
        assert!(!store.contains("abc"));
        assert_eq!(store.session_count(), 0);
    }

    #[test]
    fn clear_display_requires_owning_connection() {
        let mut store = store();
        let (display, _rx) = peer();
        store.set_display("abc", display).unwrap();

        assert!(!store.clear_display("abc", ConnectionId::new()));
        assert_eq!(store.display_count(), 1);
    }
}
