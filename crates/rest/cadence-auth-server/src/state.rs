use crate::config::Config;
use anyhow::Context;
use cadence_identity_core::{IdentityProvider, UserStore};
use cadence_identity_local::{InMemoryUserStore, UserProvisioner};
use cadence_identity_oidc::OidcProvider;
use cadence_identity_session::{SessionAuthenticator, SessionConfig, SessionService};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Shared handler state. Everything in here is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionService,
    pub authenticator: SessionAuthenticator,
    pub frontend_url: String,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn UserStore>,
        flow_timeout: Duration,
        frontend_url: impl Into<String>,
    ) -> Self {
        Self {
            sessions: SessionService::new(
                provider,
                UserProvisioner::new(store.clone()),
                SessionConfig { flow_timeout },
            ),
            authenticator: SessionAuthenticator::new(store),
            frontend_url: frontend_url.into(),
        }
    }

    /// Wires the OIDC provider and an in-memory user store from configuration.
    ///
    /// Provider metadata is fetched eagerly; an unreachable provider only
    /// logs a warning since the metadata is fetched again on demand.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let provider = OidcProvider::new(config.oidc_config())
            .context("Failed to configure OIDC provider")?;

        match provider.warm_up().await {
            Ok(()) => info!("Loaded provider metadata from {}", config.oidc.endpoint),
            Err(err) => warn!("Provider metadata not available yet: {}", err),
        }

        Ok(Self::new(
            Arc::new(provider),
            Arc::new(InMemoryUserStore::new()),
            config.flow_timeout(),
            config.frontend.url.clone(),
        ))
    }
}
