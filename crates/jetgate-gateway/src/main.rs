//! `jetgate` – HTTP-to-rosbridge gateway for the JetMax robot arm.
//!
//! Startup order: telemetry first, then configuration, then the bridge
//! session (spawned; it owns the one websocket connection for the process
//! lifetime), then the HTTP surface.  A failed bridge session is logged and
//! left dead — the gateway keeps serving, command endpoints report the
//! failure per request.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{error, info};

use jetgate_bridge::{BridgeHandle, BridgeSession, StatusCache};
use jetgate_gateway::detect::ScriptDetector;
use jetgate_gateway::state::AppState;
use jetgate_gateway::{config, routes, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _telemetry = telemetry::init("jetgate");

    let config = config::load()?;
    info!(?config, "configuration loaded");

    let cache = StatusCache::new();
    let (bridge, outbound) = BridgeHandle::channel();
    let session = BridgeSession::new(config.bridge_url(), cache.clone(), outbound);
    tokio::spawn(async move {
        if let Err(e) = session.run().await {
            error!(error = %e, "bridge session ended");
        }
    });

    let listen = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let detector = Arc::new(ScriptDetector::new(&config.detect_script));
    let app = routes::build_router(AppState::new(config, bridge, cache, detector));

    info!(%listen, "jetgate listening");
    let listener = tokio::net::TcpListener::bind(listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
