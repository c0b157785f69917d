//! Operator CLI for leadhook.
//!
//! Sends signed lead events to a webhook destination, checks that a
//! destination is reachable, and prints signatures for payload files.

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use leadhook_core::{DeliveryOutcome, TracingEventHandler, WebhookPayload};
use leadhook_delivery::{ping_endpoint, validate_endpoint, WebhookDeliverer};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod config;

use config::Config;

#[derive(Parser, Debug)]
#[command(name = "leadhook", version)]
#[command(about = "Signed lead-event webhook delivery", long_about = None)]
struct Cli {
    /// Path to configuration file (defaults to ./leadhook.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a synthetic event to check that a destination accepts webhooks
    Ping {
        /// Destination URL
        url: String,

        #[command(flatten)]
        secret: SecretArg,
    },

    /// Deliver a payload file with retries
    Send {
        /// Destination URL
        url: String,

        /// JSON file holding the lead event
        #[arg(short, long)]
        payload: PathBuf,

        #[command(flatten)]
        secret: SecretArg,
    },

    /// Print the canonical body and signature of a payload file
    Sign {
        /// JSON file holding the lead event
        #[arg(short, long)]
        payload: PathBuf,

        #[command(flatten)]
        secret: SecretArg,
    },
}

#[derive(clap::Args, Debug)]
struct SecretArg {
    /// Shared webhook secret (falls back to `webhook_secret` in the config file)
    #[arg(long = "secret", env = "LEADHOOK_WEBHOOK_SECRET", hide_env_values = true)]
    value: Option<String>,
}

impl SecretArg {
    fn resolve(self, config: &Config) -> Result<String> {
        self.value
            .or_else(|| config.webhook_secret.clone())
            .context("no webhook secret: pass --secret or set LEADHOOK_WEBHOOK_SECRET")
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    init_tracing(&config.log_filter);

    match cli.command {
        Command::Ping { url, secret } => {
            let secret = secret.resolve(&config)?;
            validate_endpoint(&url, &secret)?;

            let deliverer = build_deliverer(&config)?;
            let outcome = ping_endpoint(&deliverer, &url, &secret).await?;
            report(&outcome)
        },
        Command::Send { url, payload, secret } => {
            let secret = secret.resolve(&config)?;
            validate_endpoint(&url, &secret)?;
            let payload = read_payload(&payload).await?;

            let deliverer = build_deliverer(&config)?;
            let cancel = CancellationToken::new();
            tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

            info!(url = %url, lead_id = %payload.lead_id, "sending lead event");
            let outcome = deliverer
                .send_with_retry_cancellable(
                    &url,
                    &payload,
                    &secret,
                    &config.to_retry_config(),
                    &cancel,
                )
                .await?;
            report(&outcome)
        },
        Command::Sign { payload, secret } => {
            let secret = secret.resolve(&config)?;
            let payload = read_payload(&payload).await?;

            let body = leadhook_signing::canonical_bytes(&payload)?;
            let signature = leadhook_signing::sign_bytes(&body, &secret)?;

            println!("{}", String::from_utf8_lossy(&body));
            println!("{signature}");
            Ok(ExitCode::SUCCESS)
        },
    }
}

fn build_deliverer(config: &Config) -> Result<WebhookDeliverer> {
    let deliverer = WebhookDeliverer::new(config.to_client_config())
        .context("failed to build HTTP client")?
        .with_event_handler(Arc::new(TracingEventHandler::new()));
    Ok(deliverer)
}

async fn read_payload(path: &std::path::Path) -> Result<WebhookPayload> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read payload file {}", path.display()))?;
    let payload: WebhookPayload = serde_json::from_slice(&raw)
        .with_context(|| format!("{} is not a lead event", path.display()))?;
    payload.validate().context("payload failed validation")?;
    Ok(payload)
}

/// Prints the outcome as JSON and maps it to the exit status.
fn report(outcome: &DeliveryOutcome) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(if outcome.success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("interrupt received, abandoning delivery");
        cancel.cancel();
    }
}

/// Initializes tracing on stderr, keeping stdout for command output.
fn init_tracing(default_filter: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}
