//! tokenflow: interactive OAuth 2.0 PKCE login.
//!
//! Runs the authorization-code-with-PKCE flow against a Microsoft Entra ID
//! tenant, then prints the obtained credential in the selected output mode.

mod output;

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use output::OutputMode;
use tokenflow_oauth::{browser, run_flow, OAuthConfig};

/// Log in through the system browser and print a bearer token.
#[derive(Debug, Parser)]
#[command(name = "tokenflow", version, about)]
struct Cli {
    /// What to print after a successful login (default: the bare access token).
    #[arg(value_enum)]
    mode: Option<OutputMode>,

    /// Entra ID tenant (directory) ID.
    #[arg(long, env = "TOKENFLOW_TENANT_ID")]
    tenant: String,

    /// OAuth client (application) ID.
    #[arg(long, env = "TOKENFLOW_CLIENT_ID")]
    client_id: String,

    /// Scope to request; repeatable, or comma-separated via the env var.
    /// With no scopes the provider default applies.
    #[arg(long = "scope", env = "TOKENFLOW_SCOPES", value_delimiter = ',')]
    scopes: Vec<String>,

    /// Seconds to wait for the provider redirect before giving up.
    #[arg(long, default_value_t = 180)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = OAuthConfig::entra(&cli.tenant, &cli.client_id)
        .with_scopes(cli.scopes.iter().filter(|s| !s.trim().is_empty()))
        .with_callback_timeout(Duration::from_secs(cli.timeout_secs));

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received, cancelling flow");
            interrupt.cancel();
        }
    });

    let tokens = run_flow(&config, cancel)
        .await
        .context("authorization failed")?;

    if let Some(expires_at) = tokens.expires_at {
        eprintln!("You got a valid token until {expires_at}\n");
    }

    match cli.mode {
        None => println!("{}", tokens.access_token),
        Some(OutputMode::PrintRefreshToken) => println!("{}", output::refresh_token(&tokens)),
        Some(OutputMode::PrintBearer) => println!("{}", output::bearer_json(&tokens)?),
        Some(OutputMode::InspectJwt) => {
            browser::launch(&output::inspect_url(&tokens.access_token));
            // Give the browser a moment to pick the URL up before exit.
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    Ok(())
}
