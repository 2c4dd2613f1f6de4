//! # tokenflow-oauth
//!
//! OAuth 2.0 Authorization Code flow with PKCE (RFC 7636, S256) for
//! interactive command-line logins.
//!
//! The crate binds a local loopback receiver for the provider redirect,
//! opens the system browser at the authorization endpoint, verifies the
//! anti-CSRF `state` round-trip, and exchanges the authorization code plus
//! PKCE verifier for tokens. Tokens are handed to the caller; nothing is
//! persisted.
//!
//! ## Core pieces
//!
//! - [`OAuthConfig`]: client id, endpoints, scopes, redirect path, and the
//!   optional `Origin` transport decorator some providers require
//! - [`PkceChallenge`]: fresh verifier/challenge pair per flow
//! - [`CallbackServer`]: one-shot local redirect receiver
//! - [`start_flow`] / [`FlowHandle`]: two-phase flow for callers that manage
//!   the browser themselves
//! - [`run_flow`]: the full interactive flow with concurrent browser launch
//! - [`TokenSet`]: the exchanged tokens with a resolved expiry
//!
//! ## Example
//!
//! ```ignore
//! use tokenflow_oauth::{run_flow, OAuthConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = OAuthConfig::entra("my-tenant-id", "my-client-id")
//!     .with_scopes(["api://my-api/access"]);
//! let tokens = run_flow(&config, CancellationToken::new()).await?;
//! println!("{}", tokens.access_token);
//! ```

pub mod browser;
pub mod config;
pub mod error;
pub mod flow;
pub mod pkce;
pub mod server;
pub mod token;

pub use config::OAuthConfig;
pub use error::{Error, Result};
pub use flow::{build_authorization_url, exchange_code, run_flow, start_flow, FlowHandle};
pub use pkce::{generate_state, PkceChallenge};
pub use server::CallbackServer;
pub use token::{TokenResponse, TokenSet};
