//! Couch Arena relay server
//!
//! Pairs one display with any number of phone controllers per session key
//! and routes controller input to the display over WebSocket.

use tokio::net::TcpListener;
use tracing::info;

use couch_arena::app::AppState;
use couch_arena::config::Config;
use couch_arena::http::build_router;
use couch_arena::util::telemetry::{init_tracing, shutdown_signal};
use couch_arena::util::time::init_server_time;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(&config.log_level);
    init_server_time();

    info!("Starting Couch Arena relay");

    let addr = config.server_addr;
    let state = AppState::new(config);
    let router = build_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!("Relay listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Relay shutdown complete");
    Ok(())
}
