//! PKCE (RFC 7636) verifier/challenge generation, S256 method.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Challenge method sent as `code_challenge_method`.
pub const CHALLENGE_METHOD: &str = "S256";

/// A PKCE code verifier and its derived challenge.
///
/// A pair can only be produced by [`PkceChallenge::generate`]; the fields
/// are private so a verifier cannot be injected or swapped after the fact.
/// Generate a fresh pair for every flow — the verifier is only ever sent to
/// the token endpoint, and only once.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    verifier: String,
    challenge: String,
}

impl PkceChallenge {
    /// Generate a new PKCE pair from OS randomness.
    ///
    /// The verifier is 32 random bytes (256 bits) encoded as unpadded
    /// base64url, giving 43 characters of the RFC 7636 unreserved charset.
    /// The challenge is `BASE64URL(SHA256(verifier))`.
    pub fn generate() -> Result<Self> {
        let mut verifier_bytes = [0u8; 32];
        getrandom::getrandom(&mut verifier_bytes).map_err(|e| Error::Pkce(e.to_string()))?;
        let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);
        let challenge = compute_challenge(&verifier);

        Ok(Self {
            verifier,
            challenge,
        })
    }

    /// The code verifier, for the token exchange request.
    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    /// The code challenge, for the authorization URL.
    pub fn challenge(&self) -> &str {
        &self.challenge
    }
}

/// Compute the S256 challenge for a verifier.
fn compute_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Generate a random `state` string for CSRF protection.
///
/// 32 bytes of OS randomness, base64url-encoded. The value must round-trip
/// unchanged through the provider redirect.
pub fn generate_state() -> Result<String> {
    let mut state_bytes = [0u8; 32];
    getrandom::getrandom(&mut state_bytes).map_err(|e| Error::Pkce(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(state_bytes))
}
