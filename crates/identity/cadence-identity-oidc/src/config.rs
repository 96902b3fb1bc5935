//! OIDC provider configuration types.

use serde::{Deserialize, Serialize};

pub const SCOPE_OPENID: &str = "openid";
pub const SCOPE_OFFLINE_ACCESS: &str = "offline_access";

/// Static description of one identity provider client registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcProviderConfig {
    pub provider_id: String,
    /// Issuer base URL, with or without the `/oidc` path suffix
    pub endpoint: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub post_logout_redirect_uri: String,
    pub scopes: Vec<String>,
}

impl OidcProviderConfig {
    pub fn new(
        endpoint: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
        post_logout_redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            provider_id: "oidc".to_string(),
            endpoint: endpoint.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            post_logout_redirect_uri: post_logout_redirect_uri.into(),
            scopes: default_scopes(),
        }
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Configured scopes with `openid` and `offline_access` guaranteed.
    pub fn effective_scopes(&self) -> Vec<String> {
        let mut scopes: Vec<String> = Vec::with_capacity(self.scopes.len() + 2);
        for scope in &self.scopes {
            let scope = scope.trim();
            if !scope.is_empty() && !scopes.iter().any(|s| s == scope) {
                scopes.push(scope.to_string());
            }
        }
        if !scopes.iter().any(|s| s == SCOPE_OPENID) {
            scopes.insert(0, SCOPE_OPENID.to_string());
        }
        if !scopes.iter().any(|s| s == SCOPE_OFFLINE_ACCESS) {
            scopes.push(SCOPE_OFFLINE_ACCESS.to_string());
        }
        scopes
    }
}

pub fn default_scopes() -> Vec<String> {
    vec![
        SCOPE_OPENID.to_string(),
        SCOPE_OFFLINE_ACCESS.to_string(),
        "profile".to_string(),
        "email".to_string(),
    ]
}

/// OIDC client configuration
#[derive(Debug, Clone)]
pub struct OidcConfig {
    pub provider: OidcProviderConfig,
    pub http_timeout_seconds: u64,
    /// Lifetime of the cached discovery document and signing keys
    pub metadata_ttl_seconds: u64,
}

impl OidcConfig {
    pub fn new(provider: OidcProviderConfig) -> Self {
        Self {
            provider,
            http_timeout_seconds: 30,
            metadata_ttl_seconds: 300, // 5 minutes
        }
    }

    pub fn with_http_timeout(mut self, seconds: u64) -> Self {
        self.http_timeout_seconds = seconds;
        self
    }

    pub fn with_metadata_ttl(mut self, seconds: u64) -> Self {
        self.metadata_ttl_seconds = seconds;
        self
    }
}
