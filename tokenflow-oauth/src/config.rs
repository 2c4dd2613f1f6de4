//! Client configuration for the authorization flow.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ORIGIN};

use crate::error::{Error, Result};

/// Configuration for one authorization flow run.
///
/// Immutable once the flow starts; validated before any network activity.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// OAuth client ID.
    pub client_id: String,
    /// Authorization endpoint URL.
    pub auth_url: String,
    /// Token endpoint URL.
    pub token_url: String,
    /// Requested scopes. An empty list means the provider default applies
    /// and no `scope` parameter is sent.
    pub scopes: Vec<String>,
    /// Path component of the local redirect URI.
    pub redirect_path: String,
    /// How long to wait for the provider redirect.
    pub callback_timeout: Duration,
    /// Static `Origin` header injected on every outbound request.
    ///
    /// Entra ID validates single-page-application client registrations by
    /// requiring the header to be present on the token request; the value
    /// itself is not checked.
    pub origin_header: Option<String>,
}

impl OAuthConfig {
    /// Create a new configuration with defaults for the local receiver.
    pub fn new(
        client_id: impl Into<String>,
        auth_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            auth_url: auth_url.into(),
            token_url: token_url.into(),
            scopes: Vec::new(),
            redirect_path: "callback".to_string(),
            callback_timeout: Duration::from_secs(180),
            origin_header: None,
        }
    }

    /// Configuration for a Microsoft Entra ID (Azure AD) app registration.
    ///
    /// Uses the v2.0 endpoints for the tenant and injects the `Origin`
    /// header the SPA-mode PKCE validation requires.
    pub fn entra(tenant_id: &str, client_id: impl Into<String>) -> Self {
        Self::new(
            client_id,
            format!("https://login.microsoftonline.com/{tenant_id}/oauth2/v2.0/authorize"),
            format!("https://login.microsoftonline.com/{tenant_id}/oauth2/v2.0/token"),
        )
        .with_origin_header("http://localhost")
    }

    /// Set the requested scopes.
    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Set the redirect URI path.
    #[must_use]
    pub fn with_redirect_path(mut self, path: impl Into<String>) -> Self {
        self.redirect_path = path.into();
        self
    }

    /// Set the redirect wait deadline.
    #[must_use]
    pub fn with_callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = timeout;
        self
    }

    /// Inject a static `Origin` header on every outbound request.
    #[must_use]
    pub fn with_origin_header(mut self, origin: impl Into<String>) -> Self {
        self.origin_header = Some(origin.into());
        self
    }

    /// Check the configuration before starting the flow.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::configuration("client_id must not be empty"));
        }
        validate_endpoint("authorization endpoint", &self.auth_url)?;
        validate_endpoint("token endpoint", &self.token_url)?;
        if self.redirect_path.trim_matches('/').is_empty() {
            return Err(Error::configuration("redirect path must not be empty"));
        }
        Ok(())
    }

    /// The redirect URI for a receiver bound on `port`.
    pub fn redirect_uri(&self, port: u16) -> String {
        let path = self.redirect_path.trim_start_matches('/');
        format!("http://127.0.0.1:{port}/{path}")
    }

    /// Build the HTTP client used for the token exchange.
    ///
    /// This is where the provider transport decorator lives: when
    /// `origin_header` is set, the header goes out on every request without
    /// touching method or body.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        let mut headers = HeaderMap::new();
        if let Some(ref origin) = self.origin_header {
            let value = HeaderValue::from_str(origin).map_err(|_| {
                Error::configuration(format!("origin header value {origin:?} is not valid"))
            })?;
            headers.insert(ORIGIN, value);
        }
        reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Error::configuration(format!("failed to build HTTP client: {e}")))
    }
}

fn validate_endpoint(name: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| Error::configuration(format!("{name} URL {value:?} is invalid: {e}")))?;
    if parsed.scheme() != "https" && parsed.scheme() != "http" {
        return Err(Error::configuration(format!(
            "{name} URL must be http(s), got {:?}",
            parsed.scheme()
        )));
    }
    Ok(())
}
