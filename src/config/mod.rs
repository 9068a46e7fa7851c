//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::util::rate_limit::INPUT_RATE_LIMIT;

/// Relay server configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS. Empty allows any origin.
    pub client_origins: Vec<String>,
    /// Max inbound messages per second per connection
    pub input_rate_limit: u32,
    /// Depth of each connection's outbound queue
    pub outbound_queue: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 3001)),
            log_level: "info".to_string(),
            client_origins: Vec::new(),
            input_rate_limit: INPUT_RATE_LIMIT,
            outbound_queue: 64,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match env::var("PORT") {
            Ok(port) => format!("0.0.0.0:{}", port)
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            Err(_) => match env::var("SERVER_ADDR") {
                Ok(addr) => addr.parse().map_err(|_| ConfigError::InvalidAddress)?,
                Err(_) => defaults.server_addr,
            },
        };

        let client_origins = env::var("CLIENT_ORIGIN")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            server_addr,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            client_origins,
            input_rate_limit: parse_or("INPUT_RATE_LIMIT", defaults.input_rate_limit)?,
            outbound_queue: parse_or("OUTBOUND_QUEUE", defaults.outbound_queue)?,
        })
    }
}

/// Headless display configuration
#[derive(Clone, Debug)]
pub struct DisplayConfig {
    /// Relay WebSocket endpoint
    pub relay_url: String,
    /// Session to drive as the display
    pub session_key: String,
    pub log_level: String,
    pub viewport_width: f32,
    pub viewport_height: f32,
    /// Controller whose elimination ends the game on this display
    pub local_player_id: Option<String>,
    /// Seed for spawn placement
    pub seed: Option<u64>,
}

impl DisplayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let session_key = env::var("SESSION_KEY").map_err(|_| ConfigError::Missing("SESSION_KEY"))?;
        if session_key.trim().is_empty() {
            return Err(ConfigError::Invalid {
                var: "SESSION_KEY",
                value: session_key,
            });
        }

        Ok(Self {
            relay_url: env::var("RELAY_URL")
                .unwrap_or_else(|_| "ws://127.0.0.1:3001/ws".to_string()),
            session_key,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            viewport_width: dimension_or("VIEWPORT_WIDTH", 1280.0)?,
            viewport_height: dimension_or("VIEWPORT_HEIGHT", 720.0)?,
            local_player_id: env::var("LOCAL_PLAYER_ID").ok().filter(|s| !s.is_empty()),
            seed: match env::var("SIM_SEED") {
                Ok(raw) => Some(parse_value("SIM_SEED", raw)?),
                Err(_) => None,
            },
        })
    }
}

fn parse_or<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => parse_value(var, raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(var: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { var, value: raw })
}

fn dimension_or(var: &'static str, default: f32) -> Result<f32, ConfigError> {
    match env::var(var) {
        Ok(raw) => parse_dimension(var, raw),
        Err(_) => Ok(default),
    }
}

/// Viewport sizes must be finite and positive
fn parse_dimension(var: &'static str, raw: String) -> Result<f32, ConfigError> {
    let value: f32 = parse_value(var, raw.clone())?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::Invalid { var, value: raw })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_listen_on_relay_port() {
        let config = Config::default();
        assert_eq!(config.server_addr.port(), 3001);
        assert!(config.client_origins.is_empty());
        assert_eq!(config.input_rate_limit, INPUT_RATE_LIMIT);
    }

    #[test]
    fn parse_value_reports_variable() {
        let err = parse_value::<u32>("OUTBOUND_QUEUE", "lots".to_string()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for OUTBOUND_QUEUE: \"lots\"");
    }

    #[test]
    fn parse_value_trims_whitespace() {
        let width: f32 = parse_value("VIEWPORT_WIDTH", " 800 ".to_string()).unwrap();
        assert_eq!(width, 800.0);
    }

    #[test]
    fn viewport_dimensions_must_be_finite_and_positive() {
        for raw in ["inf", "NaN", "0", "-720"] {
            let err = parse_dimension("VIEWPORT_WIDTH", raw.to_string()).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { var: "VIEWPORT_WIDTH", .. }));
        }
        assert_eq!(parse_dimension("VIEWPORT_WIDTH", "1280".to_string()).unwrap(), 1280.0);
    }
}
