//! HTTP surface for OpenID Connect sign-in.
//!
//! Routes:
//! - `GET /login` redirects to the identity provider
//! - `GET /callback` completes the flow and redirects to the frontend
//! - `GET /me` returns the signed-in user
//! - `POST /logout` destroys the session and returns the provider logout URL
//! - `GET /ping` liveness check

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

use crate::config::SessionSettings;
use cadence_identity_session::MemorySessionStore;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, SessionManagerLayer};

pub use crate::config::Config;
pub use error::ApiError;
pub use routes::app;
pub use state::AppState;

/// Cookie-backed session layer over the given store.
pub fn session_layer(
    settings: &SessionSettings,
    store: MemorySessionStore,
) -> SessionManagerLayer<MemorySessionStore> {
    let expiry = i64::try_from(settings.expiry_seconds).unwrap_or(i64::MAX);

    SessionManagerLayer::new(store)
        .with_name(settings.cookie_name.clone())
        .with_secure(settings.secure)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::seconds(expiry)))
}
