//! Error types for the authorization flow.

use std::time::Duration;
use thiserror::Error;

/// Errors that abort the authorization flow.
///
/// Every variant is fatal: the flow cancels its sibling tasks and returns
/// without any partial token state. A failed browser launch is deliberately
/// not represented here; it is logged as a warning and the operator can
/// navigate to the printed URL by hand.
#[derive(Debug, Error)]
pub enum Error {
    /// Client configuration rejected before any network activity.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The OS randomness source failed while generating PKCE material.
    #[error("failed to generate PKCE material: {0}")]
    Pkce(String),

    /// The local redirect listener could not be started or violated the
    /// callback protocol.
    #[error("callback listener error: {0}")]
    Listener(String),

    /// The `state` parameter on the redirect did not round-trip.
    #[error("state mismatch on redirect: expected {expected}, got {actual}")]
    CsrfMismatch {
        /// State embedded in the authorization URL.
        expected: String,
        /// State carried by the callback request.
        actual: String,
    },

    /// The provider redirected back with an error instead of a code.
    #[error("authorization denied by provider: {code}: {description}")]
    ProviderDenied {
        /// Provider error code, e.g. `access_denied`.
        code: String,
        /// Provider error description (may be empty).
        description: String,
    },

    /// The token endpoint answered with a non-success status.
    #[error("token exchange failed with status {status}{}", format_provider_error(.error_code, .description))]
    TokenExchange {
        /// HTTP status code.
        status: u16,
        /// Provider error code from the response payload, if any.
        error_code: Option<String>,
        /// Provider error description from the response payload, if any.
        description: Option<String>,
    },

    /// Transport failure talking to the token endpoint (DNS, TLS, timeout).
    #[error("network error during token exchange: {0}")]
    Network(String),

    /// No redirect arrived before the configured deadline.
    #[error("authorization timed out after {0:?}")]
    Timeout(Duration),

    /// The flow was cancelled before completion.
    #[error("authorization cancelled")]
    Cancelled,
}

impl Error {
    /// Create a listener error.
    pub fn listener(msg: impl Into<String>) -> Self {
        Self::Listener(msg.into())
    }

    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether this error came from the provider itself rather than the
    /// local machinery.
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            Self::ProviderDenied { .. } | Self::TokenExchange { .. }
        )
    }
}

fn format_provider_error(code: &Option<String>, description: &Option<String>) -> String {
    match (code, description) {
        (Some(c), Some(d)) => format!(": {c}: {d}"),
        (Some(c), None) => format!(": {c}"),
        (None, Some(d)) => format!(": {d}"),
        (None, None) => String::new(),
    }
}

/// Result type for flow operations.
pub type Result<T> = std::result::Result<T, Error>;
