use anyhow::{Context, Result};
use cadence_auth_server::{AppState, Config, app, session_layer, telemetry};
use cadence_identity_session::MemorySessionStore;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

const SESSION_SWEEP_SECONDS: u64 = 60;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables before configuration reads them
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    telemetry::init_tracing(&config);

    let state = AppState::from_config(&config).await?;
    let sessions = MemorySessionStore::new();
    let _sweep = sessions.spawn_expiry_sweep(Duration::from_secs(SESSION_SWEEP_SECONDS));
    let router = app(state, session_layer(&config.session, sessions));

    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Auth server listening on http://{}", addr);
    info!("  GET  /login    - Start sign-in");
    info!("  GET  /callback - Provider redirect target");
    info!("  GET  /me       - Current user");
    info!("  POST /logout   - Sign out");

    axum::serve(listener, router).await?;

    Ok(())
}
