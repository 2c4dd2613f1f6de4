//! Token types returned by the exchange.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Raw token endpoint response.
///
/// Unknown fields are kept in `extra` so provider-specific claims survive
/// into the pretty-printed output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token.
    pub access_token: String,
    /// Token type, usually `Bearer`.
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds, relative to issue time.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Refresh token, if the provider issued one.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// OpenID Connect ID token, if requested.
    #[serde(default)]
    pub id_token: Option<String>,
    /// Granted scope.
    #[serde(default)]
    pub scope: Option<String>,
    /// Any additional claims the provider returned.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Tokens handed to the caller, with the expiry resolved to a timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    /// The access token, presented as-is as a bearer credential.
    pub access_token: String,
    /// Token type, usually `Bearer`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Absolute expiry, derived from `expires_in` at issue time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Refresh token, if the provider issued one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// OpenID Connect ID token, if requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Granted scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Any additional claims the provider returned.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TokenSet {
    /// Resolve a wire response into a token set, anchoring `expires_in`
    /// to the given issue time.
    pub fn from_response(response: TokenResponse, issued_at: DateTime<Utc>) -> Self {
        let expires_at = response
            .expires_in
            .map(|secs| issued_at + Duration::seconds(secs));
        Self {
            access_token: response.access_token,
            token_type: response.token_type,
            expires_at,
            refresh_token: response.refresh_token,
            id_token: response.id_token,
            scope: response.scope,
            extra: response.extra,
        }
    }
}
