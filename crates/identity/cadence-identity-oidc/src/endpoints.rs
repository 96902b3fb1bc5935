//! Issuer normalization and the URLs derived from it.

use crate::config::OidcProviderConfig;
use crate::error::{OidcError, OidcResult};
use url::Url;

pub const OIDC_PATH_SUFFIX: &str = "/oidc";
pub const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

/// Endpoints of a provider rooted at a normalized issuer base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    base: String,
}

impl ProviderEndpoints {
    /// Accepts the configured endpoint with or without a trailing slash or
    /// `/oidc` suffix. The resulting base ends in exactly one `/oidc`.
    pub fn from_issuer(endpoint: &str) -> OidcResult<Self> {
        let trimmed = endpoint.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(OidcError::ConfigError(
                "provider endpoint must not be empty".to_string(),
            ));
        }
        Url::parse(trimmed)?;

        let base = if trimmed.ends_with(OIDC_PATH_SUFFIX) {
            trimmed.to_string()
        } else {
            format!("{trimmed}{OIDC_PATH_SUFFIX}")
        };

        Ok(Self { base })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn authorization(&self) -> String {
        format!("{}/auth", self.base)
    }

    pub fn token(&self) -> String {
        format!("{}/token", self.base)
    }

    pub fn discovery(&self) -> String {
        format!("{}{DISCOVERY_PATH}", self.base)
    }

    /// RP-initiated logout URL for the given client.
    pub fn end_session(&self, client_id: &str, post_logout_redirect_uri: &str) -> OidcResult<Url> {
        let mut url = Url::parse(&format!("{}/session/end", self.base))?;
        url.query_pairs_mut()
            .append_pair("client_id", client_id)
            .append_pair("post_logout_redirect_uri", post_logout_redirect_uri);
        Ok(url)
    }
}

/// Builds the authorization redirect for one login attempt.
pub fn build_authorization_url(
    endpoints: &ProviderEndpoints,
    config: &OidcProviderConfig,
    state: &str,
    code_challenge: &str,
) -> OidcResult<Url> {
    let mut url = Url::parse(&endpoints.authorization())?;

    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("scope", &config.effective_scopes().join(" "))
        .append_pair("state", state)
        .append_pair("code_challenge", code_challenge)
        .append_pair("code_challenge_method", cadence_identity_core::pkce::CODE_CHALLENGE_METHOD);

    Ok(url)
}
