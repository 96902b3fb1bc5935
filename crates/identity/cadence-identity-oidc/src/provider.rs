//! OpenID Connect identity provider implementation.

use crate::client::OidcClient;
use crate::config::OidcConfig;
use crate::endpoints::build_authorization_url;
use crate::error::{OidcError, OidcResult};
use async_trait::async_trait;
use cadence_identity_core::{IdentityProvider, IdentityResult, VerifiedIdentity};
use tracing::{debug, info};

/// OIDC provider that implements IdentityProvider
pub struct OidcProvider {
    client: OidcClient,
}

impl OidcProvider {
    pub fn new(config: OidcConfig) -> OidcResult<Self> {
        let client = OidcClient::new(config)?;
        info!(
            "Configured OIDC provider {} at {}",
            client.provider().provider_id,
            client.endpoints().base()
        );
        Ok(Self { client })
    }

    /// Fetches discovery metadata and signing keys ahead of the first login.
    pub async fn warm_up(&self) -> OidcResult<()> {
        self.client.metadata().discovery().await?;
        self.client.metadata().signing_keys(false).await?;
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for OidcProvider {
    fn provider_id(&self) -> &str {
        &self.client.provider().provider_id
    }

    fn authorization_url(&self, state: &str, code_challenge: &str) -> IdentityResult<String> {
        let url = build_authorization_url(
            self.client.endpoints(),
            self.client.provider(),
            state,
            code_challenge,
        )?;
        debug!("Generated authorization URL for provider {}", self.provider_id());
        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str, code_verifier: &str) -> IdentityResult<String> {
        let tokens = self.client.exchange_code(code, code_verifier).await?;
        let id_token = tokens
            .id_token
            .filter(|token| !token.trim().is_empty())
            .ok_or(OidcError::MissingIdToken)?;
        Ok(id_token)
    }

    async fn verify_identity_token(&self, id_token: &str) -> IdentityResult<VerifiedIdentity> {
        let claims = self.client.verify_id_token(id_token).await?;

        Ok(VerifiedIdentity {
            subject: claims.sub,
            email: claims.email.unwrap_or_default(),
            display_name: claims.name.unwrap_or_default(),
        })
    }

    fn logout_url(&self) -> IdentityResult<String> {
        let provider = self.client.provider();
        let url = self
            .client
            .endpoints()
            .end_session(&provider.client_id, &provider.post_logout_redirect_uri)?;
        Ok(url.into())
    }
}
