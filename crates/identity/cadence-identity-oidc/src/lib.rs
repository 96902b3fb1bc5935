//! OpenID Connect identity provider for the authorization-code flow with
//! PKCE.
//!
//! This crate provides:
//! - Issuer normalization and authorization URL construction
//! - Authorization code exchange against the provider's token endpoint
//! - Identity-token verification against cached discovery metadata and JWKS
//! - An [`OidcProvider`] implementing the core `IdentityProvider` trait

pub mod client;
pub mod config;
pub mod discovery;
pub mod endpoints;
pub mod error;
pub mod provider;
pub mod types;

#[cfg(test)]
mod tests;

pub use client::OidcClient;
pub use config::{OidcConfig, OidcProviderConfig, default_scopes};
pub use discovery::{ProviderMetadata, SigningKeys};
pub use endpoints::{ProviderEndpoints, build_authorization_url};
pub use error::{OidcError, OidcResult};
pub use provider::OidcProvider;
pub use types::{DiscoveryDocument, IdTokenClaims, TokenResponse};
