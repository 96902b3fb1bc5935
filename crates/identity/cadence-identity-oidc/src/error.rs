//! OIDC error types.

use cadence_identity_core::IdentityError;
use thiserror::Error;

pub type OidcResult<T> = Result<T, OidcError>;

#[derive(Debug, Error)]
pub enum OidcError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("Invalid token response: {0}")]
    InvalidTokenResponse(String),

    #[error("Token response did not contain an id_token")]
    MissingIdToken,

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Unsupported signing algorithm: {0:?}")]
    UnsupportedAlgorithm(jsonwebtoken::Algorithm),

    #[error("No signing key matches key id {0:?}")]
    NoMatchingKey(Option<String>),

    #[error("Invalid identity token: {0}")]
    InvalidIdToken(String),

    #[error("Discovery document names issuer {found}, expected {expected}")]
    IssuerMismatch { expected: String, found: String },
}

impl From<OidcError> for IdentityError {
    fn from(err: OidcError) -> Self {
        match err {
            OidcError::ProviderUnavailable(msg) => IdentityError::ProviderUnavailable(msg),
            OidcError::HttpError(_)
            | OidcError::TokenExchangeFailed(_)
            | OidcError::InvalidTokenResponse(_)
            | OidcError::MissingIdToken => IdentityError::ExchangeFailed(err.to_string()),
            OidcError::Jwt(_)
            | OidcError::UnsupportedAlgorithm(_)
            | OidcError::NoMatchingKey(_)
            | OidcError::InvalidIdToken(_)
            | OidcError::IssuerMismatch { .. } => {
                IdentityError::TokenVerificationFailed(err.to_string())
            }
            OidcError::ConfigError(_) | OidcError::UrlError(_) => {
                IdentityError::ConfigError(err.to_string())
            }
        }
    }
}
