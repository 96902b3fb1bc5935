//! Cached provider metadata: the discovery document and its signing keys.
//!
//! Both are fetched lazily and reused until they expire. A failed refresh
//! falls back to the last good copy when one exists; only a provider that
//! has never answered surfaces as unavailable.

use crate::error::{OidcError, OidcResult};
use crate::types::DiscoveryDocument;
use jsonwebtoken::jwk::{Jwk, PublicKeyUse};
use reqwest::Client;
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
struct Cached<T> {
    value: T,
    expires_at: Instant,
}

impl<T: Clone> Cached<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn fresh(&self) -> Option<T> {
        (Instant::now() < self.expires_at).then(|| self.value.clone())
    }
}

/// Signing keys usable for identity-token verification.
#[derive(Debug, Clone, Default)]
pub struct SigningKeys {
    keys: Vec<Jwk>,
}

#[derive(Deserialize)]
struct JwksDocument {
    #[serde(default)]
    keys: Vec<serde_json::Value>,
}

impl SigningKeys {
    /// Keys that fail to parse or are marked for encryption are skipped
    /// individually rather than poisoning the whole set.
    fn from_document(document: JwksDocument) -> Self {
        let keys = document
            .keys
            .into_iter()
            .filter_map(|raw| serde_json::from_value::<Jwk>(raw).ok())
            .filter(|jwk| {
                !matches!(
                    jwk.common.public_key_use,
                    Some(PublicKeyUse::Encryption) | Some(PublicKeyUse::Other(_))
                )
            })
            .collect();
        Self { keys }
    }

    /// A token without a key id is only matched when the set is unambiguous.
    pub fn find(&self, kid: Option<&str>) -> Option<&Jwk> {
        match kid {
            Some(kid) => self
                .keys
                .iter()
                .find(|jwk| jwk.common.key_id.as_deref() == Some(kid)),
            None if self.keys.len() == 1 => self.keys.first(),
            None => None,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

pub struct ProviderMetadata {
    http: Client,
    discovery_url: String,
    /// Normalized issuer the discovery document must name
    issuer: String,
    ttl: Duration,
    discovery: RwLock<Option<Cached<DiscoveryDocument>>>,
    keys: RwLock<Option<Cached<SigningKeys>>>,
}

impl ProviderMetadata {
    pub fn new(http: Client, discovery_url: String, issuer: String, ttl: Duration) -> Self {
        Self {
            http,
            discovery_url,
            issuer,
            ttl,
            discovery: RwLock::new(None),
            keys: RwLock::new(None),
        }
    }

    pub async fn discovery(&self) -> OidcResult<DiscoveryDocument> {
        if let Some(doc) = self.discovery.read().await.as_ref().and_then(Cached::fresh) {
            return Ok(doc);
        }

        match self.fetch_discovery().await {
            Ok(doc) => {
                debug!("Fetched discovery document for issuer {}", doc.issuer);
                *self.discovery.write().await = Some(Cached::new(doc.clone(), self.ttl));
                Ok(doc)
            }
            Err(err @ OidcError::IssuerMismatch { .. }) => {
                warn!("Rejecting discovery document: {}", err);
                Err(err)
            }
            Err(err) => {
                if let Some(stale) = self.discovery.read().await.as_ref() {
                    warn!("Discovery refresh failed, using cached document: {}", err);
                    return Ok(stale.value.clone());
                }
                Err(OidcError::ProviderUnavailable(err.to_string()))
            }
        }
    }

    /// Returns the signing keys, refetching when expired or when `force` is
    /// set. A forced refetch that fails does not fall back to the old set.
    pub async fn signing_keys(&self, force: bool) -> OidcResult<SigningKeys> {
        if !force {
            if let Some(keys) = self.keys.read().await.as_ref().and_then(Cached::fresh) {
                return Ok(keys);
            }
        }

        let discovery = self.discovery().await?;
        match self.fetch_keys(&discovery.jwks_uri).await {
            Ok((keys, ttl)) => {
                debug!("Fetched {} signing keys, cached for {:?}", keys.len(), ttl);
                *self.keys.write().await = Some(Cached::new(keys.clone(), ttl));
                Ok(keys)
            }
            Err(err) => {
                if !force {
                    if let Some(stale) = self.keys.read().await.as_ref() {
                        warn!("Signing key refresh failed, using cached keys: {}", err);
                        return Ok(stale.value.clone());
                    }
                }
                Err(OidcError::ProviderUnavailable(err.to_string()))
            }
        }
    }

    async fn fetch_discovery(&self) -> OidcResult<DiscoveryDocument> {
        let response = self
            .http
            .get(&self.discovery_url)
            .send()
            .await?
            .error_for_status()?;
        let document: DiscoveryDocument = response.json().await?;

        if document.issuer.trim().is_empty() || document.jwks_uri.trim().is_empty() {
            return Err(OidcError::InvalidTokenResponse(
                "discovery document is missing issuer or jwks_uri".to_string(),
            ));
        }

        if document.issuer.trim_end_matches('/') != self.issuer {
            return Err(OidcError::IssuerMismatch {
                expected: self.issuer.clone(),
                found: document.issuer,
            });
        }

        Ok(document)
    }

    async fn fetch_keys(&self, jwks_uri: &str) -> OidcResult<(SigningKeys, Duration)> {
        let response = self.http.get(jwks_uri).send().await?.error_for_status()?;
        let ttl = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|h| h.to_str().ok())
            .and_then(parse_max_age)
            .map(Duration::from_secs)
            .unwrap_or(self.ttl);

        let document: JwksDocument = response.json().await?;
        let keys = SigningKeys::from_document(document);
        if keys.is_empty() {
            return Err(OidcError::InvalidTokenResponse(
                "JWKS contains no usable signing keys".to_string(),
            ));
        }

        Ok((keys, ttl))
    }
}

fn parse_max_age(cache_control: &str) -> Option<u64> {
    cache_control
        .split(',')
        .map(str::trim)
        .find_map(|directive| {
            directive
                .strip_prefix("max-age=")
                .and_then(|val| val.parse::<u64>().ok())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rsa_key(kid: Option<&str>, key_use: &str) -> serde_json::Value {
        let mut key = json!({
            "kty": "RSA",
            "use": key_use,
            "alg": "RS256",
            "n": "sXchDaQebHnPiGvyDOAT4saGEUetSyo9MKLOoWFsueri23bOdgWp4Dy1WlUzewbgBHod5pcM9H95GQRV3JDXboIRROSBigeC5yjU1hGzHHyXss8UDprecbAYxknTcQkhslANGRUZmdTOQ5qTRsLAt6BTYuyvVRdhS8exSZEy_c4gs_7svlJJQ4H9_NxsiIoLwAEk7-Q3UXERGYw_75IDrGA84-lA_-Ct4eTlXHBIY2EaV7t7LjJaynVJCpkv4LKjTTAumiGUIuQhrNhZLuF_RJLqHpM2kgWFLU7-VTdL1VbC2tejvcI2BlMkEpk1BzBZI0KQB0GaDWFLN-aEAw3vRw",
            "e": "AQAB"
        });
        if let Some(kid) = kid {
            key["kid"] = json!(kid);
        }
        key
    }

    fn keys_from(keys: Vec<serde_json::Value>) -> SigningKeys {
        SigningKeys::from_document(JwksDocument { keys })
    }

    #[test]
    fn test_parse_max_age() {
        assert_eq!(parse_max_age("max-age=300"), Some(300));
        assert_eq!(parse_max_age("public, max-age=120"), Some(120));
        assert_eq!(parse_max_age("no-cache, no-store"), None);
        assert_eq!(parse_max_age("max-age=0"), Some(0));
        assert_eq!(parse_max_age(""), None);
        assert_eq!(parse_max_age("max-age=abc"), None);
        assert_eq!(parse_max_age("s-maxage=300"), None);
    }

    #[test]
    fn test_find_by_kid() {
        let keys = keys_from(vec![rsa_key(Some("a"), "sig"), rsa_key(Some("b"), "sig")]);
        assert_eq!(keys.len(), 2);
        assert_eq!(
            keys.find(Some("b")).and_then(|k| k.common.key_id.as_deref()),
            Some("b")
        );
        assert!(keys.find(Some("c")).is_none());
    }

    #[test]
    fn test_kidless_lookup_requires_a_single_key() {
        let single = keys_from(vec![rsa_key(Some("a"), "sig")]);
        assert!(single.find(None).is_some());

        let several = keys_from(vec![rsa_key(Some("a"), "sig"), rsa_key(None, "sig")]);
        assert!(several.find(None).is_none());
    }

    #[test]
    fn test_encryption_and_malformed_keys_are_skipped() {
        let keys = keys_from(vec![
            rsa_key(Some("enc"), "enc"),
            json!({ "kty": "nonsense", "kid": "broken" }),
            rsa_key(Some("sig"), "sig"),
        ]);
        assert_eq!(keys.len(), 1);
        assert!(keys.find(Some("enc")).is_none());
        assert!(keys.find(Some("sig")).is_some());
    }
}
