//! Couch Arena: a session relay pairing one shared display with phone
//! controllers, plus the display-side platformer simulation.

pub mod app;
pub mod config;
pub mod http;
pub mod relay;
pub mod sim;
pub mod util;
pub mod ws;
