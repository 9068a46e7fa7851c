//! WebSocket transport: wire protocol and per-connection tasks

pub mod handler;
pub mod protocol;

pub use handler::ws_handler;
