//! Core identity types and the traits that sit between the sign-in flow,
//! the identity provider and the local user store.

pub mod pkce;
mod store;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use store::{LocalUser, NewLocalUser, UserId, UserStore, UserStoreError, UserStoreResult};

#[derive(Debug, Error)]
pub enum IdentityError {
    /// The callback `state` did not match the one stored in the session,
    /// or no flow was pending.
    #[error("Invalid state parameter")]
    InvalidState,

    #[error("Authorization code exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("Identity token verification failed: {0}")]
    TokenVerificationFailed(String),

    #[error("User provisioning conflict for subject {0}")]
    ProvisioningConflict(String),

    #[error("Authentication required")]
    UnauthenticatedAccess,

    #[error("Identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Invalid provider configuration: {0}")]
    ConfigError(String),

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("User store error: {0}")]
    UserStoreError(#[from] UserStoreError),
}

impl IdentityError {
    /// Whether the error means the browser failed to authenticate, as opposed
    /// to an infrastructure fault on our side.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            IdentityError::InvalidState
                | IdentityError::ExchangeFailed(_)
                | IdentityError::TokenVerificationFailed(_)
                | IdentityError::ProvisioningConflict(_)
                | IdentityError::UnauthenticatedAccess
        )
    }
}

pub type IdentityResult<T> = Result<T, IdentityError>;

/// Identity asserted by a verified identity token. Only ever handed from the
/// callback verifier to the provisioner; never persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    pub subject: String,
    pub email: String,
    pub display_name: String,
}

/// Capability interface of an identity provider.
///
/// The sign-in flow only talks to the provider through this trait, so one
/// concrete implementation exists per provider type and tests can swap in
/// stubs.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn provider_id(&self) -> &str;

    /// Builds the absolute authorization endpoint URL for a fresh flow.
    /// Pure: no network, no session access.
    fn authorization_url(&self, state: &str, code_challenge: &str) -> IdentityResult<String>;

    /// Redeems an authorization code and returns the raw identity token.
    async fn exchange_code(&self, code: &str, code_verifier: &str) -> IdentityResult<String>;

    /// Verifies signature, issuer, audience and expiry of an identity token
    /// and extracts the claims the application cares about.
    async fn verify_identity_token(&self, id_token: &str) -> IdentityResult<VerifiedIdentity>;

    /// Federated end-session URL the browser should be sent to after logout.
    fn logout_url(&self) -> IdentityResult<String>;
}
