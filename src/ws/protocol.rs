//! WebSocket protocol message definitions
//! These are the wire types shared by controllers, the display and the relay

use serde::{Deserialize, Serialize};

/// Input tokens a controller can report in a `move`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Jump,
    Up,
    Down,
    /// Any token this build does not understand
    #[serde(other)]
    Unknown,
}

/// Role assigned by the relay on join
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// The shared screen that runs the simulation
    #[serde(rename = "game")]
    Display,
    /// A phone driving one player
    #[serde(rename = "control")]
    Controller,
}

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMsg {
    /// First message on every connection
    Join {
        /// Session key chosen by the display's operator
        #[serde(rename = "userID")]
        user_id: String,
        #[serde(rename = "isMobile", default)]
        is_mobile: bool,
        #[serde(rename = "playerID", default, skip_serializing_if = "Option::is_none")]
        player_id: Option<String>,
        #[serde(rename = "playerName", default, skip_serializing_if = "Option::is_none")]
        player_name: Option<String>,
        #[serde(rename = "playerColor", default, skip_serializing_if = "Option::is_none")]
        player_color: Option<String>,
    },

    /// Controller input update
    Move {
        #[serde(rename = "userID", default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
        #[serde(rename = "playerID", default, skip_serializing_if = "Option::is_none")]
        player_id: Option<String>,
        #[serde(default)]
        directions: Vec<Direction>,
        /// Aim vector X, normalized
        #[serde(default)]
        x: Option<f32>,
        /// Aim vector Y, normalized, screen-down positive
        #[serde(default)]
        y: Option<f32>,
        /// Aim angle in radians
        #[serde(default)]
        angle: Option<f32>,
    },

    /// Controller fire event
    Shoot {
        #[serde(rename = "userID", default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
        #[serde(rename = "playerID", default, skip_serializing_if = "Option::is_none")]
        player_id: Option<String>,
        #[serde(default)]
        x: Option<f32>,
        #[serde(default)]
        y: Option<f32>,
        #[serde(default)]
        angle: Option<f32>,
    },

    /// Display asks for the current roster
    RequestAllPlayers {
        #[serde(rename = "userID", default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
    },
}

impl ClientMsg {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Short name for logging
    pub fn action(&self) -> &'static str {
        match self {
            ClientMsg::Join { .. } => "join",
            ClientMsg::Move { .. } => "move",
            ClientMsg::Shoot { .. } => "shoot",
            ClientMsg::RequestAllPlayers { .. } => "request_all_players",
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Join acknowledgment
    Role {
        role: Role,
        #[serde(rename = "playerID", default, skip_serializing_if = "Option::is_none")]
        player_id: Option<String>,
    },

    /// Roster snapshot for the display
    ExistingPlayers { players: Vec<PlayerInfo> },

    /// A controller joined the display's session
    NewPlayer(PlayerInfo),

    /// Controller input, tagged with the sender
    Move {
        #[serde(rename = "playerID")]
        player_id: String,
        directions: Vec<Direction>,
        x: f32,
        y: f32,
        angle: f32,
        #[serde(rename = "playerName")]
        player_name: String,
        #[serde(rename = "playerColor")]
        player_color: String,
    },

    /// Controller fire event, tagged with the sender
    Shoot {
        #[serde(rename = "playerID")]
        player_id: String,
        x: f32,
        y: f32,
        angle: f32,
        #[serde(rename = "playerName")]
        player_name: String,
        #[serde(rename = "playerColor")]
        player_color: String,
    },

    /// A controller left
    PlayerDisconnect {
        #[serde(rename = "playerID")]
        player_id: String,
    },

    /// Join rejected
    Error { error: String },
}

impl ServerMsg {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Roster entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    #[serde(rename = "playerID")]
    pub player_id: String,
    #[serde(rename = "playerName")]
    pub player_name: String,
    #[serde(rename = "playerColor")]
    pub player_color: String,
}

/// Wire-level failures. Logged and dropped, never fatal.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported frame type: {0}")]
    UnsupportedFrame(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_controller_join() {
        let msg = ClientMsg::decode(
            r##"{"action":"join","userID":"abc","isMobile":true,"playerID":"p1","playerName":"Ana","playerColor":"#ff0000"}"##,
        )
        .unwrap();

        assert_eq!(
            msg,
            ClientMsg::Join {
                user_id: "abc".to_string(),
                is_mobile: true,
                player_id: Some("p1".to_string()),
                player_name: Some("Ana".to_string()),
                player_color: Some("#ff0000".to_string()),
            }
        );
    }

    #[test]
    fn join_without_session_key_is_rejected() {
        assert!(ClientMsg::decode(r#"{"action":"join","isMobile":false}"#).is_err());
    }

    #[test]
    fn move_tolerates_null_and_missing_numbers() {
        let msg = ClientMsg::decode(
            r#"{"action":"move","userID":"abc","directions":["left","jump"],"angle":null}"#,
        )
        .unwrap();

        match msg {
            ClientMsg::Move {
                directions, x, angle, ..
            } => {
                assert_eq!(directions, vec![Direction::Left, Direction::Jump]);
                assert_eq!(x, None);
                assert_eq!(angle, None);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn unknown_direction_tokens_do_not_fail_the_message() {
        let msg = ClientMsg::decode(r#"{"action":"move","directions":["left","dash"]}"#).unwrap();
        match msg {
            ClientMsg::Move { directions, .. } => {
                assert_eq!(directions, vec![Direction::Left, Direction::Unknown]);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn unknown_action_is_rejected() {
        let err = ClientMsg::decode(r#"{"action":"teleport"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Json(_)));
        assert!(ClientMsg::decode("not json").is_err());
    }

    #[test]
    fn server_messages_use_wire_field_names() {
        let role = ServerMsg::Role {
            role: Role::Controller,
            player_id: Some("p1".to_string()),
        };
        let value: serde_json::Value = serde_json::from_str(&role.encode().unwrap()).unwrap();
        assert_eq!(value, json!({"action": "role", "role": "control", "playerID": "p1"}));

        let display = ServerMsg::Role {
            role: Role::Display,
            player_id: None,
        };
        let value: serde_json::Value = serde_json::from_str(&display.encode().unwrap()).unwrap();
        assert_eq!(value, json!({"action": "role", "role": "game"}));
    }

    #[test]
    fn new_player_is_flat_on_the_wire() {
        let msg = ServerMsg::NewPlayer(PlayerInfo {
            player_id: "p1".to_string(),
            player_name: "Ana".to_string(),
            player_color: "#00ff99".to_string(),
        });
        let value: serde_json::Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "action": "new_player",
                "playerID": "p1",
                "playerName": "Ana",
                "playerColor": "#00ff99"
            })
        );
        assert_eq!(ServerMsg::decode(&value.to_string()).unwrap(), msg);
    }

    #[test]
    fn forwarded_move_always_carries_numbers() {
        let msg = ServerMsg::Move {
            player_id: "p1".to_string(),
            directions: vec![Direction::Right],
            x: 0.0,
            y: 0.0,
            angle: 0.0,
            player_name: "Ana".to_string(),
            player_color: "#00ff99".to_string(),
        };
        let value: serde_json::Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(value["angle"], json!(0.0));
        assert_eq!(value["directions"], json!(["right"]));
        assert_eq!(value["playerColor"], json!("#00ff99"));
    }
}
