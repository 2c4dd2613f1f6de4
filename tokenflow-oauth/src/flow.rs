//! Flow orchestration: authorization URL, token exchange, and the
//! concurrent receiver/browser machinery.
//!
//! The flow is split in two so callers (and tests) can observe the
//! authorization URL before the redirect happens: [`start_flow`] binds the
//! receiver and builds the URL, [`FlowHandle::wait_for_tokens`] blocks for
//! the redirect and performs the exchange. [`run_flow`] drives both plus
//! the browser launch for the interactive case.

use chrono::Utc;
use serde::Deserialize;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::browser;
use crate::config::OAuthConfig;
use crate::error::{Error, Result};
use crate::pkce::{self, PkceChallenge};
use crate::server::CallbackServer;
use crate::token::{TokenResponse, TokenSet};

/// Build the authorization endpoint URL.
///
/// Pure and deterministic. Every parameter is percent-encoded; `scope` is
/// space-joined and omitted entirely when no scopes were requested.
pub fn build_authorization_url(
    config: &OAuthConfig,
    challenge: &str,
    state: &str,
    redirect_uri: &str,
) -> String {
    let mut params = vec![
        ("response_type", "code".to_string()),
        ("client_id", config.client_id.clone()),
        ("redirect_uri", redirect_uri.to_string()),
        ("code_challenge", challenge.to_string()),
        ("code_challenge_method", pkce::CHALLENGE_METHOD.to_string()),
        ("state", state.to_string()),
    ];
    if !config.scopes.is_empty() {
        params.push(("scope", config.scopes.join(" ")));
    }

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", config.auth_url, query)
}

/// Error payload a token endpoint may return alongside a non-success status.
#[derive(Debug, Deserialize)]
struct ProviderErrorPayload {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Exchange an authorization code for tokens.
///
/// One `application/x-www-form-urlencoded` POST carrying the PKCE verifier
/// in place of a client secret. Transport failures surface as
/// [`Error::Network`] and are not retried; the caller decides whether to
/// rerun the whole flow.
pub async fn exchange_code(
    config: &OAuthConfig,
    code: &str,
    verifier: &str,
    redirect_uri: &str,
) -> Result<TokenSet> {
    let client = config.http_client()?;
    let params = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", redirect_uri),
        ("client_id", config.client_id.as_str()),
        ("code_verifier", verifier),
    ];

    debug!(token_url = %config.token_url, "exchanging authorization code");
    let response = client
        .post(&config.token_url)
        .form(&params)
        .send()
        .await
        .map_err(|e| Error::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let payload: Option<ProviderErrorPayload> = serde_json::from_str(&body).ok();
        let (error_code, description) = match payload {
            Some(p) => (p.error, p.error_description),
            None => (None, (!body.is_empty()).then_some(body)),
        };
        return Err(Error::TokenExchange {
            status: status.as_u16(),
            error_code,
            description,
        });
    }

    let issued_at = Utc::now();
    let wire: TokenResponse = response.json().await.map_err(|e| Error::TokenExchange {
        status: status.as_u16(),
        error_code: None,
        description: Some(format!("unparseable token response: {e}")),
    })?;
    info!("token exchange successful");
    Ok(TokenSet::from_response(wire, issued_at))
}

/// Handle to a started flow: receiver bound, URL built, nothing consumed.
#[derive(Debug)]
pub struct FlowHandle {
    server: CallbackServer,
    config: OAuthConfig,
    pkce: PkceChallenge,
    state: String,
    redirect_uri: String,
}

impl FlowHandle {
    /// The port the receiver is bound on.
    pub fn port(&self) -> u16 {
        self.server.port()
    }

    /// The redirect URI embedded in the authorization URL.
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Block until the redirect arrives, then exchange the code.
    ///
    /// The receiver verifies the `state` round-trip before the code is
    /// accepted; the exchange itself is raced against `cancel` so an
    /// in-flight request is abandoned on cancellation.
    pub async fn wait_for_tokens(self, cancel: CancellationToken) -> Result<TokenSet> {
        let code = self
            .server
            .wait_for_redirect(&self.state, self.config.callback_timeout, cancel.clone())
            .await?;
        debug!("authorization code received");

        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = exchange_code(
                &self.config,
                &code,
                self.pkce.verifier(),
                &self.redirect_uri,
            ) => result,
        }
    }
}

/// Validate config, generate fresh PKCE material, bind the receiver, and
/// build the authorization URL.
///
/// The receiver is bound before the URL exists, so the redirect URI in the
/// URL always points at a listening port.
pub async fn start_flow(config: &OAuthConfig) -> Result<(String, FlowHandle)> {
    config.validate()?;
    let pkce = PkceChallenge::generate()?;
    let state = pkce::generate_state()?;

    let server = CallbackServer::bind(&config.redirect_path).await?;
    let redirect_uri = config.redirect_uri(server.port());
    let auth_url = build_authorization_url(config, pkce.challenge(), &state, &redirect_uri);

    Ok((
        auth_url,
        FlowHandle {
            server,
            config: config.clone(),
            pkce,
            state,
            redirect_uri,
        },
    ))
}

/// Run the complete interactive flow.
///
/// Starts the receiver, hands the authorization URL to a concurrent
/// browser-launch task through a one-shot channel (published only after the
/// receiver is bound), waits for the redirect, and exchanges the code.
/// Fatal errors cancel the sibling task before propagating; a failed
/// browser launch is only a warning.
pub async fn run_flow(config: &OAuthConfig, cancel: CancellationToken) -> Result<TokenSet> {
    let (auth_url, handle) = start_flow(config).await?;

    eprintln!("Open this URL in your browser if it does not open automatically:\n\n  {auth_url}\n");

    let (url_tx, url_rx) = oneshot::channel::<String>();
    let browser_cancel = cancel.clone();
    let browser_task = tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = browser_cancel.cancelled() => {}
            url = url_rx => {
                if let Ok(url) = url {
                    browser::launch(&url);
                }
            }
        }
    });

    // Receiver is bound; the URL may now be published to the browser task.
    let _ = url_tx.send(auth_url);

    let result = handle.wait_for_tokens(cancel.clone()).await;

    // Stop the sibling task; no-op if the launch already finished.
    cancel.cancel();
    browser_task.abort();

    result
}
