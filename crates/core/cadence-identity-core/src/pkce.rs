//! Random flow tokens and the PKCE `S256` transform.
//!
//! All randomness comes from the operating system. A failing entropy source
//! panics inside `rand`; that is fatal to the process rather than an error a
//! single request could recover from.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Bytes of entropy behind a `state` value.
pub const STATE_BYTES: usize = 32;

/// Bytes of entropy behind a PKCE verifier. Encodes to 86 characters, inside
/// the 43..=128 range RFC 7636 allows.
pub const VERIFIER_BYTES: usize = 64;

pub const CODE_CHALLENGE_METHOD: &str = "S256";

/// PKCE code challenge and verifier
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub code_verifier: String,
    pub code_challenge: String,
}

impl Default for PkceChallenge {
    fn default() -> Self {
        Self::new()
    }
}

impl PkceChallenge {
    /// Generate a new PKCE challenge
    pub fn new() -> Self {
        let code_verifier = generate_verifier();
        let code_challenge = derive_challenge(&code_verifier);

        Self {
            code_verifier,
            code_challenge,
        }
    }
}

/// Unguessable value binding a redirect to its callback.
pub fn generate_state() -> String {
    random_url_safe(STATE_BYTES)
}

pub fn generate_verifier() -> String {
    random_url_safe(VERIFIER_BYTES)
}

/// `BASE64URL(SHA256(verifier))` without padding.
pub fn derive_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Compares two secrets without short-circuiting on the first differing byte.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn random_url_safe(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
