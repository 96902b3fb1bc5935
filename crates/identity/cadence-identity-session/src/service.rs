//! The session-bound login flow: authorization redirect, callback
//! verification and logout.

use crate::flow::{self, FlowState};
use crate::session::AuthSession;
use cadence_identity_core::pkce::{PkceChallenge, constant_time_eq, generate_state};
use cadence_identity_core::{
    IdentityError, IdentityProvider, IdentityResult, LocalUser, VerifiedIdentity,
};
use cadence_identity_local::UserProvisioner;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Upper bound on code exchange plus identity-token verification.
    pub flow_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            flow_timeout: Duration::from_secs(30),
        }
    }
}

/// Query parameters of the provider's redirect back to the callback.
#[derive(Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl std::fmt::Debug for CallbackParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackParams")
            .field("has_code", &self.code.is_some())
            .field("has_state", &self.state.is_some())
            .field("error", &self.error)
            .finish()
    }
}

#[derive(Clone)]
pub struct SessionService {
    provider: Arc<dyn IdentityProvider>,
    provisioner: UserProvisioner,
    config: SessionConfig,
}

impl SessionService {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        provisioner: UserProvisioner,
        config: SessionConfig,
    ) -> Self {
        Self {
            provider,
            provisioner,
            config,
        }
    }

    /// Starts a login: stores fresh state and verifier in the session and
    /// returns the authorization URL to redirect the browser to.
    pub async fn begin_login(&self, session: &dyn AuthSession) -> IdentityResult<String> {
        let state = generate_state();
        let pkce = PkceChallenge::new();
        let url = self.provider.authorization_url(&state, &pkce.code_challenge)?;

        flow::store_flow_state(
            session,
            &FlowState {
                state,
                code_verifier: pkce.code_verifier,
            },
        )
        .await?;

        info!("Started login with provider {}", self.provider.provider_id());
        Ok(url)
    }

    /// Completes a login from the provider's callback.
    ///
    /// The pending flow is removed from the session before anything else,
    /// so a state/verifier pair is consumed by the first callback that
    /// presents it whatever the outcome.
    pub async fn complete_callback(
        &self,
        session: &dyn AuthSession,
        params: CallbackParams,
    ) -> IdentityResult<LocalUser> {
        let Some(pending) = flow::take_flow_state(session).await? else {
            warn!("Callback rejected: no login flow pending in session");
            return Err(IdentityError::InvalidState);
        };

        let returned_state = params.state.as_deref().unwrap_or_default();
        if !constant_time_eq(&pending.state, returned_state) {
            warn!("Callback rejected: state mismatch");
            return Err(IdentityError::InvalidState);
        }

        if let Some(error) = params.error {
            warn!(
                "Provider returned authorization error {}: {}",
                error,
                params.error_description.as_deref().unwrap_or("no description")
            );
            return Err(IdentityError::ExchangeFailed(format!(
                "authorization denied: {error}"
            )));
        }

        let code = params
            .code
            .filter(|code| !code.is_empty())
            .ok_or_else(|| IdentityError::ExchangeFailed("missing authorization code".into()))?;

        let identity = tokio::time::timeout(
            self.config.flow_timeout,
            self.exchange_and_verify(&code, &pending.code_verifier),
        )
        .await
        .map_err(|_| IdentityError::ExchangeFailed("provider round trip timed out".into()))??;

        let user = self.provisioner.provision(&identity).await?;

        session.renew_id().await?;
        flow::write_user_id(session, user.id).await?;
        session.save().await?;

        info!("User {} signed in", user.id);
        Ok(user)
    }

    async fn exchange_and_verify(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> IdentityResult<VerifiedIdentity> {
        let id_token = self.provider.exchange_code(code, code_verifier).await?;
        self.provider.verify_identity_token(&id_token).await
    }

    /// Destroys the session and returns the provider's end-session URL.
    /// Logging out an anonymous session is not an error.
    pub async fn logout(&self, session: &dyn AuthSession) -> IdentityResult<String> {
        let user_id = flow::read_user_id(session).await.ok().flatten();
        session.destroy().await?;

        match user_id {
            Some(user_id) => info!("User {} signed out", user_id),
            None => info!("Logout of an unauthenticated session"),
        }
        self.provider.logout_url()
    }
}
