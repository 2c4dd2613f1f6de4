//! Local HTTP receiver for the provider redirect.
//!
//! Binds an ephemeral loopback port before the authorization URL is built,
//! serves exactly one callback request, and tears down. Everything the
//! redirect can carry — code, provider error, state mismatch — is resolved
//! here, so the orchestrator only ever sees a code or a typed error.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// What a single callback request resolved to.
enum CallbackOutcome {
    /// Authorization code, state already verified.
    Code(String),
    /// The provider redirected back with an error.
    Denied { code: String, description: String },
    /// State did not round-trip.
    StateMismatch { actual: String },
    /// Request hit the callback path but is missing required parameters.
    Malformed(String),
    /// Not a callback request (wrong path); keep listening.
    NotCallback,
}

/// One-shot local redirect receiver.
///
/// The listener socket is owned by this value and released when it drops,
/// on every exit path. After the first callback request is answered the
/// server returns and nothing further is accepted.
#[derive(Debug)]
pub struct CallbackServer {
    listener: TcpListener,
    path: String,
    port: u16,
}

impl CallbackServer {
    /// Bind an OS-assigned ephemeral port on the loopback interface.
    ///
    /// Must happen before the authorization URL is built — the URL embeds
    /// the bound port in its redirect URI.
    pub async fn bind(path: &str) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| Error::listener(format!("failed to bind loopback listener: {e}")))?;
        let port = listener
            .local_addr()
            .map_err(|e| Error::listener(format!("failed to read bound address: {e}")))?
            .port();
        let path = format!("/{}", path.trim_start_matches('/'));
        debug!(port, path = %path, "callback listener bound");
        Ok(Self {
            listener,
            path,
            port,
        })
    }

    /// The bound ephemeral port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Wait for the provider redirect.
    ///
    /// Resolves with the authorization code once a callback request with a
    /// matching `state` arrives. Requests to other paths are answered with
    /// 404 and do not consume the single callback slot. Cancellation and
    /// the deadline both tear the listener down within bounded time.
    pub async fn wait_for_redirect(
        self,
        expected_state: &str,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<String> {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("callback listener cancelled before redirect");
                Err(Error::Cancelled)
            }
            _ = tokio::time::sleep(timeout) => {
                debug!(?timeout, "no redirect before deadline");
                Err(Error::Timeout(timeout))
            }
            outcome = self.accept_one(expected_state) => outcome,
        }
    }

    /// Accept connections until one callback request decides the outcome.
    async fn accept_one(&self, expected_state: &str) -> Result<String> {
        loop {
            let (stream, peer) = self
                .listener
                .accept()
                .await
                .map_err(|e| Error::listener(format!("accept failed: {e}")))?;
            debug!(%peer, "redirect connection accepted");

            match self.handle_connection(stream, expected_state).await {
                Ok(CallbackOutcome::Code(code)) => return Ok(code),
                Ok(CallbackOutcome::Denied { code, description }) => {
                    return Err(Error::ProviderDenied { code, description })
                }
                Ok(CallbackOutcome::StateMismatch { actual }) => {
                    return Err(Error::CsrfMismatch {
                        expected: expected_state.to_string(),
                        actual,
                    })
                }
                Ok(CallbackOutcome::Malformed(msg)) => {
                    return Err(Error::listener(format!("malformed callback request: {msg}")))
                }
                Ok(CallbackOutcome::NotCallback) => continue,
                Err(e) => {
                    // A single unreadable connection (port scan, dropped
                    // socket) must not kill the wait.
                    warn!("error on redirect connection: {e}");
                    continue;
                }
            }
        }
    }

    /// Serve one connection and classify the request.
    async fn handle_connection(
        &self,
        stream: TcpStream,
        expected_state: &str,
    ) -> std::io::Result<CallbackOutcome> {
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);
        let mut request_line = String::new();
        reader.read_line(&mut request_line).await?;

        // GET /callback?code=xxx&state=yyy HTTP/1.1
        let target = match request_line.split_whitespace().nth(1) {
            Some(target) => target,
            None => return Ok(CallbackOutcome::NotCallback),
        };
        let parsed = match url::Url::parse(&format!("http://127.0.0.1{target}")) {
            Ok(parsed) => parsed,
            Err(_) => return Ok(CallbackOutcome::NotCallback),
        };

        if parsed.path() != self.path {
            respond(&mut writer, 404, NOT_FOUND_PAGE).await?;
            return Ok(CallbackOutcome::NotCallback);
        }

        let query_param = |name: &str| {
            parsed
                .query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
        };

        if let Some(error) = query_param("error") {
            let description = query_param("error_description").unwrap_or_default();
            respond(&mut writer, 200, &failure_page(&error)).await?;
            return Ok(CallbackOutcome::Denied {
                code: error,
                description,
            });
        }

        let state = match query_param("state") {
            Some(state) => state,
            None => {
                respond(&mut writer, 400, &failure_page("missing state parameter")).await?;
                return Ok(CallbackOutcome::Malformed("missing state".to_string()));
            }
        };
        if state != expected_state {
            // Possible CSRF; answer with a generic page and abort the flow.
            respond(&mut writer, 400, &failure_page("request could not be verified")).await?;
            return Ok(CallbackOutcome::StateMismatch { actual: state });
        }

        match query_param("code") {
            Some(code) => {
                respond(&mut writer, 200, SUCCESS_PAGE).await?;
                Ok(CallbackOutcome::Code(code))
            }
            None => {
                respond(&mut writer, 400, &failure_page("missing code parameter")).await?;
                Ok(CallbackOutcome::Malformed("missing code".to_string()))
            }
        }
    }
}

async fn respond(
    writer: &mut tokio::net::tcp::OwnedWriteHalf,
    status: u16,
    body: &str,
) -> std::io::Result<()> {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        _ => "Not Found",
    };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len(),
    );
    writer.write_all(response.as_bytes()).await?;
    writer.shutdown().await
}

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Sign-in complete</title></head>
<body style="font-family: system-ui; text-align: center; padding: 50px;">
<h1>Sign-in complete</h1>
<p>You can close this window and return to the terminal.</p>
</body>
</html>"#;

const NOT_FOUND_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Not found</title></head>
<body style="font-family: system-ui; text-align: center; padding: 50px;">
<h1>Not found</h1>
</body>
</html>"#;

fn failure_page(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Sign-in failed</title></head>
<body style="font-family: system-ui; text-align: center; padding: 50px;">
<h1>Sign-in failed</h1>
<p>{message}</p>
</body>
</html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    const STATE: &str = "expected-state-123";

    async fn send_request(port: u16, target: &str) -> String {
        let mut stream = TcpStream::connect(format!("127.0.0.1:{port}"))
            .await
            .unwrap();
        stream
            .write_all(format!("GET {target} HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n").as_bytes())
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    fn spawn_wait(
        server: CallbackServer,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<Result<String>> {
        tokio::spawn(async move {
            server
                .wait_for_redirect(STATE, Duration::from_secs(5), cancel)
                .await
        })
    }

    #[tokio::test]
    async fn test_valid_callback_yields_code() {
        let server = CallbackServer::bind("callback").await.unwrap();
        let port = server.port();
        let handle = spawn_wait(server, CancellationToken::new());

        let response =
            send_request(port, &format!("/callback?code=auth-code-1&state={STATE}")).await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("Sign-in complete"));

        let code = handle.await.unwrap().unwrap();
        assert_eq!(code, "auth-code-1");
    }

    #[tokio::test]
    async fn test_state_mismatch_is_csrf_error() {
        let server = CallbackServer::bind("callback").await.unwrap();
        let port = server.port();
        let handle = spawn_wait(server, CancellationToken::new());

        let response = send_request(port, "/callback?code=auth-code-1&state=wrong").await;
        assert!(response.starts_with("HTTP/1.1 400"));

        let err = handle.await.unwrap().unwrap_err();
        match err {
            Error::CsrfMismatch { expected, actual } => {
                assert_eq!(expected, STATE);
                assert_eq!(actual, "wrong");
            }
            other => panic!("expected CsrfMismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_provider_error_is_denied() {
        let server = CallbackServer::bind("callback").await.unwrap();
        let port = server.port();
        let handle = spawn_wait(server, CancellationToken::new());

        send_request(
            port,
            "/callback?error=access_denied&error_description=user%20cancelled",
        )
        .await;

        let err = handle.await.unwrap().unwrap_err();
        match err {
            Error::ProviderDenied { code, description } => {
                assert_eq!(code, "access_denied");
                assert_eq!(description, "user cancelled");
            }
            other => panic!("expected ProviderDenied, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_other_paths_do_not_consume_the_slot() {
        let server = CallbackServer::bind("callback").await.unwrap();
        let port = server.port();
        let handle = spawn_wait(server, CancellationToken::new());

        let response = send_request(port, "/favicon.ico").await;
        assert!(response.starts_with("HTTP/1.1 404"));

        send_request(port, &format!("/callback?code=late-code&state={STATE}")).await;
        let code = handle.await.unwrap().unwrap();
        assert_eq!(code, "late-code");
    }

    #[tokio::test]
    async fn test_missing_code_is_listener_error() {
        let server = CallbackServer::bind("callback").await.unwrap();
        let port = server.port();
        let handle = spawn_wait(server, CancellationToken::new());

        send_request(port, &format!("/callback?state={STATE}")).await;
        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Listener(_)));
    }

    #[tokio::test]
    async fn test_cancellation_terminates_wait() {
        let server = CallbackServer::bind("callback").await.unwrap();
        let cancel = CancellationToken::new();
        let handle = spawn_wait(server, cancel.clone());

        cancel.cancel();
        let err = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("receiver must stop within bounded time")
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn test_deadline_terminates_wait() {
        let server = CallbackServer::bind("callback").await.unwrap();
        let err = server
            .wait_for_redirect(STATE, Duration::from_millis(50), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test]
    async fn test_url_encoded_parameters_are_decoded() {
        let server = CallbackServer::bind("callback").await.unwrap();
        let port = server.port();
        let handle = spawn_wait(server, CancellationToken::new());

        send_request(port, &format!("/callback?code=a%2Fb%3Dc&state={STATE}")).await;
        let code = handle.await.unwrap().unwrap();
        assert_eq!(code, "a/b=c");
    }
}
