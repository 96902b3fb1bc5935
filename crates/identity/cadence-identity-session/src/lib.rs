//! Session-bound OpenID Connect login.
//!
//! [`SessionService`] drives the redirect/callback/logout flow against an
//! `IdentityProvider`, keeping the pending state and PKCE verifier in the
//! browser's session. [`SessionAuthenticator`] answers "who is this session"
//! for later requests.

mod authenticator;
pub mod flow;
mod service;
mod session;
mod store;

pub use authenticator::SessionAuthenticator;
pub use flow::FlowState;
pub use service::{CallbackParams, SessionConfig, SessionService};
pub use session::{AuthSession, InMemorySession, OIDC_STATE_KEY, OIDC_VERIFIER_KEY, USER_ID_KEY};
pub use store::MemorySessionStore;
