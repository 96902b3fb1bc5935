//! Integration and security tests against a mock provider.

#[cfg(test)]
mod integration_tests {
    use crate::{OidcConfig, OidcProvider, OidcProviderConfig};
    use cadence_identity_core::{IdentityError, IdentityProvider};
    use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
    use serde_json::{Value, json};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate, Times};

    const CLIENT_ID: &str = "client-123";
    const SIGNING_KID: &str = "signing-key-1";
    const SIGNING_KEY: &[u8] = include_bytes!("../tests/fixtures/signing-private.pem");
    const ROGUE_KEY: &[u8] = include_bytes!("../tests/fixtures/rogue-private.pem");
    const JWKS: &str = include_str!("../tests/fixtures/jwks.json");

    struct Harness {
        server: MockServer,
        provider: OidcProvider,
        issuer: String,
    }

    async fn harness(metadata_ttl_seconds: u64) -> Harness {
        let server = MockServer::start().await;
        let issuer = format!("{}/oidc", server.uri());

        let provider_config = OidcProviderConfig::new(
            // Deliberately without the `/oidc` suffix.
            format!("{}/", server.uri()),
            CLIENT_ID,
            "secret-xyz",
            "http://localhost:3000/callback",
            "http://localhost:3000/",
        );
        let config = OidcConfig::new(provider_config)
            .with_http_timeout(5)
            .with_metadata_ttl(metadata_ttl_seconds);
        let provider = OidcProvider::new(config).unwrap();

        Harness {
            server,
            provider,
            issuer,
        }
    }

    fn discovery_document(issuer: &str) -> Value {
        json!({
            "issuer": issuer,
            "authorization_endpoint": format!("{issuer}/auth"),
            "token_endpoint": format!("{issuer}/token"),
            "jwks_uri": format!("{issuer}/jwks"),
            "end_session_endpoint": format!("{issuer}/session/end"),
            "id_token_signing_alg_values_supported": ["RS256"]
        })
    }

    async fn mount_discovery(h: &Harness, times: impl Into<Times>) {
        Mock::given(method("GET"))
            .and(path("/oidc/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(discovery_document(&h.issuer)))
            .expect(times)
            .mount(&h.server)
            .await;
    }

    async fn mount_jwks(h: &Harness, times: impl Into<Times>) {
        Mock::given(method("GET"))
            .and(path("/oidc/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(JWKS, "application/json"))
            .expect(times)
            .mount(&h.server)
            .await;
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn claims(issuer: &str) -> Value {
        json!({
            "iss": issuer,
            "aud": CLIENT_ID,
            "sub": "user-42",
            "email": "ada@example.com",
            "name": "Ada Lovelace",
            "iat": now(),
            "exp": now() + 300,
        })
    }

    fn sign(key_pem: &[u8], kid: Option<&str>, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = kid.map(str::to_string);
        encode(&header, claims, &EncodingKey::from_rsa_pem(key_pem).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_valid_identity_token_is_accepted() {
        let h = harness(300).await;
        mount_discovery(&h, 1).await;
        mount_jwks(&h, 1).await;

        let token = sign(SIGNING_KEY, Some(SIGNING_KID), &claims(&h.issuer));
        let identity = h.provider.verify_identity_token(&token).await.unwrap();

        assert_eq!(identity.subject, "user-42");
        assert_eq!(identity.email, "ada@example.com");
        assert_eq!(identity.display_name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_metadata_is_cached_between_verifications() {
        let h = harness(300).await;
        mount_discovery(&h, 1).await;
        mount_jwks(&h, 1).await;

        for _ in 0..3 {
            let token = sign(SIGNING_KEY, Some(SIGNING_KID), &claims(&h.issuer));
            h.provider.verify_identity_token(&token).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_missing_optional_claims_default_to_empty() {
        let h = harness(300).await;
        mount_discovery(&h, 1).await;
        mount_jwks(&h, 1).await;

        let mut claims = claims(&h.issuer);
        let object = claims.as_object_mut().unwrap();
        object.remove("email");
        object.remove("name");

        let token = sign(SIGNING_KEY, Some(SIGNING_KID), &claims);
        let identity = h.provider.verify_identity_token(&token).await.unwrap();
        assert_eq!(identity.subject, "user-42");
        assert_eq!(identity.email, "");
        assert_eq!(identity.display_name, "");
    }

    #[tokio::test]
    async fn test_kidless_token_uses_the_only_key() {
        let h = harness(300).await;
        mount_discovery(&h, 1).await;
        mount_jwks(&h, 1).await;

        let token = sign(SIGNING_KEY, None, &claims(&h.issuer));
        assert!(h.provider.verify_identity_token(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_token_signed_by_foreign_key_is_rejected() {
        let h = harness(300).await;
        mount_discovery(&h, 1).await;
        mount_jwks(&h, 1).await;

        let token = sign(ROGUE_KEY, Some(SIGNING_KID), &claims(&h.issuer));
        let err = h.provider.verify_identity_token(&token).await.unwrap_err();
        assert!(matches!(err, IdentityError::TokenVerificationFailed(_)));
    }

    #[tokio::test]
    async fn test_unknown_kid_refetches_keys_once() {
        let h = harness(300).await;
        mount_discovery(&h, 1).await;
        // Initial fetch plus one forced refresh.
        mount_jwks(&h, 2).await;

        let token = sign(ROGUE_KEY, Some("rotated-key"), &claims(&h.issuer));
        let err = h.provider.verify_identity_token(&token).await.unwrap_err();
        assert!(matches!(err, IdentityError::TokenVerificationFailed(_)));
    }

    #[tokio::test]
    async fn test_rotated_key_is_picked_up_on_refresh() {
        let h = harness(300).await;
        mount_discovery(&h, 1).await;

        let mut stale_set: Value = serde_json::from_str(JWKS).unwrap();
        stale_set["keys"][0]["kid"] = json!("previous-key");
        Mock::given(method("GET"))
            .and(path("/oidc/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(stale_set))
            .up_to_n_times(1)
            .with_priority(1)
            .expect(1)
            .mount(&h.server)
            .await;
        mount_jwks(&h, 1).await;

        let token = sign(SIGNING_KEY, Some(SIGNING_KID), &claims(&h.issuer));
        let identity = h.provider.verify_identity_token(&token).await.unwrap();
        assert_eq!(identity.subject, "user-42");
    }

    #[tokio::test]
    async fn test_wrong_audience_is_rejected() {
        let h = harness(300).await;
        mount_discovery(&h, 1).await;
        mount_jwks(&h, 1).await;

        let mut claims = claims(&h.issuer);
        claims["aud"] = json!("someone-else");
        let token = sign(SIGNING_KEY, Some(SIGNING_KID), &claims);

        let err = h.provider.verify_identity_token(&token).await.unwrap_err();
        assert!(matches!(err, IdentityError::TokenVerificationFailed(_)));
    }

    #[tokio::test]
    async fn test_wrong_issuer_is_rejected() {
        let h = harness(300).await;
        mount_discovery(&h, 1).await;
        mount_jwks(&h, 1).await;

        let token = sign(
            SIGNING_KEY,
            Some(SIGNING_KID),
            &claims("https://impostor.example.com/oidc"),
        );

        let err = h.provider.verify_identity_token(&token).await.unwrap_err();
        assert!(matches!(err, IdentityError::TokenVerificationFailed(_)));
    }

    async fn mount_discovery_naming(h: &Harness, issuer: &str) {
        Mock::given(method("GET"))
            .and(path("/oidc/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "issuer": issuer,
                "jwks_uri": format!("{}/jwks", h.issuer),
            })))
            .mount(&h.server)
            .await;
    }

    #[tokio::test]
    async fn test_discovery_naming_foreign_issuer_is_rejected() {
        let h = harness(300).await;
        let foreign = "https://attacker.example.com";
        mount_discovery_naming(&h, foreign).await;
        mount_jwks(&h, 0).await;

        // Signed with the trusted key and matching the document's issuer.
        let token = sign(SIGNING_KEY, Some(SIGNING_KID), &claims(foreign));

        let err = h.provider.verify_identity_token(&token).await.unwrap_err();
        assert!(matches!(err, IdentityError::TokenVerificationFailed(_)));
        assert!(h.provider.warm_up().await.is_err());
    }

    #[tokio::test]
    async fn test_discovery_issuer_with_trailing_slash_is_accepted() {
        let h = harness(300).await;
        let issuer = format!("{}/", h.issuer);
        mount_discovery_naming(&h, &issuer).await;
        mount_jwks(&h, 1).await;

        let token = sign(SIGNING_KEY, Some(SIGNING_KID), &claims(&issuer));
        let identity = h.provider.verify_identity_token(&token).await.unwrap();
        assert_eq!(identity.subject, "user-42");
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let h = harness(300).await;
        mount_discovery(&h, 1).await;
        mount_jwks(&h, 1).await;

        let mut claims = claims(&h.issuer);
        claims["iat"] = json!(now() - 7200);
        claims["exp"] = json!(now() - 3600);
        let token = sign(SIGNING_KEY, Some(SIGNING_KID), &claims);

        let err = h.provider.verify_identity_token(&token).await.unwrap_err();
        assert!(matches!(err, IdentityError::TokenVerificationFailed(_)));
    }

    #[tokio::test]
    async fn test_empty_subject_is_rejected() {
        let h = harness(300).await;
        mount_discovery(&h, 1).await;
        mount_jwks(&h, 1).await;

        let mut claims = claims(&h.issuer);
        claims["sub"] = json!("");
        let token = sign(SIGNING_KEY, Some(SIGNING_KID), &claims);

        let err = h.provider.verify_identity_token(&token).await.unwrap_err();
        assert!(matches!(err, IdentityError::TokenVerificationFailed(_)));
    }

    #[tokio::test]
    async fn test_shared_secret_algorithm_is_rejected_before_any_fetch() {
        let h = harness(300).await;
        mount_discovery(&h, 0).await;
        mount_jwks(&h, 0).await;

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims(&h.issuer),
            &EncodingKey::from_secret(b"secret-xyz"),
        )
        .unwrap();

        let err = h.provider.verify_identity_token(&token).await.unwrap_err();
        assert!(matches!(err, IdentityError::TokenVerificationFailed(_)));
    }

    #[tokio::test]
    async fn test_garbage_token_is_rejected() {
        let h = harness(300).await;
        mount_discovery(&h, 0).await;

        let err = h
            .provider
            .verify_identity_token("not.a.jwt")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::TokenVerificationFailed(_)));
    }

    #[tokio::test]
    async fn test_unreachable_discovery_is_provider_unavailable() {
        let h = harness(300).await;

        let token = sign(SIGNING_KEY, Some(SIGNING_KID), &claims(&h.issuer));
        let err = h.provider.verify_identity_token(&token).await.unwrap_err();
        assert!(matches!(err, IdentityError::ProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn test_outage_after_first_fetch_uses_cached_metadata() {
        let h = harness(0).await;
        // Nothing is ever fresh, so every lookup goes to the network.
        mount_discovery(&h, 1..).await;
        mount_jwks(&h, 1..).await;

        let token = sign(SIGNING_KEY, Some(SIGNING_KID), &claims(&h.issuer));
        h.provider.verify_identity_token(&token).await.unwrap();

        // Every metadata request now fails with 404.
        h.server.reset().await;

        let identity = h.provider.verify_identity_token(&token).await.unwrap();
        assert_eq!(identity.subject, "user-42");
    }

    #[tokio::test]
    async fn test_warm_up_fetches_metadata() {
        let h = harness(300).await;
        mount_discovery(&h, 1).await;
        mount_jwks(&h, 1).await;

        h.provider.warm_up().await.unwrap();

        let token = sign(SIGNING_KEY, Some(SIGNING_KID), &claims(&h.issuer));
        h.provider.verify_identity_token(&token).await.unwrap();
    }

    #[tokio::test]
    async fn test_code_exchange_sends_verifier_and_returns_id_token() {
        let h = harness(300).await;

        Mock::given(method("POST"))
            .and(path("/oidc/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=auth-code-1"))
            .and(body_string_contains("code_verifier=verifier-abc"))
            .and(body_string_contains("client_id=client-123"))
            .and(body_string_contains("client_secret=secret-xyz"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "mock_access_token",
                "token_type": "Bearer",
                "expires_in": 3600,
                "refresh_token": "mock_refresh_token",
                "id_token": "header.payload.signature",
                "scope": "openid offline_access profile email"
            })))
            .expect(1)
            .mount(&h.server)
            .await;

        let id_token = h
            .provider
            .exchange_code("auth-code-1", "verifier-abc")
            .await
            .unwrap();
        assert_eq!(id_token, "header.payload.signature");
    }

    #[tokio::test]
    async fn test_rejected_code_is_exchange_failure() {
        let h = harness(300).await;

        Mock::given(method("POST"))
            .and(path("/oidc/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "authorization code expired"
            })))
            .mount(&h.server)
            .await;

        let err = h
            .provider
            .exchange_code("stale-code", "verifier-abc")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::ExchangeFailed(_)));
    }

    #[tokio::test]
    async fn test_token_response_without_id_token_is_exchange_failure() {
        let h = harness(300).await;

        Mock::given(method("POST"))
            .and(path("/oidc/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "mock_access_token",
                "token_type": "Bearer"
            })))
            .mount(&h.server)
            .await;

        let err = h
            .provider
            .exchange_code("auth-code-1", "verifier-abc")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::ExchangeFailed(_)));
    }

    #[tokio::test]
    async fn test_provider_urls_use_normalized_issuer() {
        let h = harness(300).await;

        let auth_url = h.provider.authorization_url("state-1", "challenge-1").unwrap();
        assert!(auth_url.starts_with(&format!("{}/auth?", h.issuer)));
        assert!(auth_url.contains("code_challenge_method=S256"));
        assert!(auth_url.contains("offline_access"));

        let logout_url = h.provider.logout_url().unwrap();
        assert!(logout_url.starts_with(&format!("{}/session/end?", h.issuer)));
        assert!(logout_url.contains("client_id=client-123"));
        assert!(logout_url.contains("post_logout_redirect_uri=http%3A%2F%2Flocalhost%3A3000%2F"));
    }
}
