//! Output-mode rendering.
//!
//! Pure functions from the exchanged token set to the string that goes to
//! stdout, so each mode's behavior is testable without running a flow.

use clap::ValueEnum;
use tokenflow_oauth::TokenSet;

/// What to print after a successful login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Print the refresh token only (empty if the provider issued none).
    PrintRefreshToken,
    /// Print the full token response as pretty-printed JSON.
    PrintBearer,
    /// Open the token in a browser-based JWT debugger.
    InspectJwt,
}

/// The refresh token, or an empty string when the provider issued none.
pub fn refresh_token(tokens: &TokenSet) -> &str {
    tokens.refresh_token.as_deref().unwrap_or_default()
}

/// The full token set as pretty-printed JSON.
pub fn bearer_json(tokens: &TokenSet) -> serde_json::Result<String> {
    serde_json::to_string_pretty(tokens)
}

/// URL of a JWT debugging viewer with the access token in the fragment.
pub fn inspect_url(access_token: &str) -> String {
    format!("https://jwt.io#token={access_token}")
}
