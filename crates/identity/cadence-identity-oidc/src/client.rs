//! HTTP side of the flow: code exchange and identity-token verification.

use crate::config::{OidcConfig, OidcProviderConfig};
use crate::discovery::ProviderMetadata;
use crate::endpoints::ProviderEndpoints;
use crate::error::{OidcError, OidcResult};
use crate::types::{IdTokenClaims, TokenErrorResponse, TokenResponse};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Identity tokens must be signed with a public-key algorithm. Shared-secret
/// (HS*) tokens are rejected outright.
const SUPPORTED_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
    Algorithm::ES256,
    Algorithm::ES384,
    Algorithm::EdDSA,
];

pub struct OidcClient {
    http_client: Client,
    provider: OidcProviderConfig,
    endpoints: ProviderEndpoints,
    metadata: ProviderMetadata,
}

impl OidcClient {
    pub fn new(config: OidcConfig) -> OidcResult<Self> {
        let endpoints = ProviderEndpoints::from_issuer(&config.provider.endpoint)?;
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .build()?;

        let metadata = ProviderMetadata::new(
            http_client.clone(),
            endpoints.discovery(),
            endpoints.base().to_string(),
            Duration::from_secs(config.metadata_ttl_seconds),
        );

        Ok(Self {
            http_client,
            provider: config.provider,
            endpoints,
            metadata,
        })
    }

    pub fn provider(&self) -> &OidcProviderConfig {
        &self.provider
    }

    pub fn endpoints(&self) -> &ProviderEndpoints {
        &self.endpoints
    }

    pub fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    /// Exchange authorization code for tokens
    pub async fn exchange_code(&self, code: &str, code_verifier: &str) -> OidcResult<TokenResponse> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.provider.redirect_uri.as_str()),
            ("code_verifier", code_verifier),
            ("client_id", self.provider.client_id.as_str()),
            ("client_secret", self.provider.client_secret.as_str()),
        ];

        let response = self
            .http_client
            .post(self.endpoints.token())
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // Only the OAuth2 error code is logged; the body may echo request data.
            let reason = response
                .json::<TokenErrorResponse>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| "unparseable error body".to_string());
            warn!("Token exchange rejected with status {}: {}", status, reason);
            return Err(OidcError::TokenExchangeFailed(format!("{status}: {reason}")));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| OidcError::InvalidTokenResponse(e.to_string()))?;

        info!("Successfully exchanged code for tokens");
        Ok(token_response)
    }

    /// Verifies signature, issuer, audience and lifetime of an identity token.
    pub async fn verify_id_token(&self, id_token: &str) -> OidcResult<IdTokenClaims> {
        let header = decode_header(id_token)?;
        if !SUPPORTED_ALGORITHMS.contains(&header.alg) {
            return Err(OidcError::UnsupportedAlgorithm(header.alg));
        }

        let discovery = self.metadata.discovery().await?;
        let key = self.decoding_key(header.kid.as_deref()).await?;

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[discovery.issuer.as_str()]);
        validation.set_audience(&[self.provider.client_id.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        let claims = decode::<IdTokenClaims>(id_token, &key, &validation)?.claims;
        if claims.sub.trim().is_empty() {
            return Err(OidcError::InvalidIdToken("empty subject".to_string()));
        }

        debug!("Verified identity token for subject {}", claims.sub);
        Ok(claims)
    }

    /// Looks the key up in the cached set, refetching once on a miss so
    /// that provider key rotation is picked up.
    async fn decoding_key(&self, kid: Option<&str>) -> OidcResult<DecodingKey> {
        let keys = self.metadata.signing_keys(false).await?;
        if let Some(jwk) = keys.find(kid) {
            return Ok(DecodingKey::from_jwk(jwk)?);
        }

        debug!("No signing key for kid {:?}, refreshing key set", kid);
        let keys = self.metadata.signing_keys(true).await?;
        match keys.find(kid) {
            Some(jwk) => Ok(DecodingKey::from_jwk(jwk)?),
            None => Err(OidcError::NoMatchingKey(kid.map(str::to_string))),
        }
    }
}
