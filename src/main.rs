//! dingbridge - Alertmanager to DingTalk bridge
//!
//! Loads the robot targets, renders an Alertmanager webhook message through
//! a target's templates, and either prints or sends the result.

use anyhow::{Context, Result};
use clap::Parser;
use dingbridge::{
    cli::{Cli, Command},
    config::Config,
    core::WebhookMessage,
    notification::{DingTalkNotifier, Notifier},
};
use std::io::Read;
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = Config::load(&cli).unwrap_or_else(|err| {
        // Manually initialize logging for this specific error
        tracing_subscriber::fmt().with_writer(std::io::stderr).init();
        error!("Failed to load configuration: {:#}", err);
        // Exit if configuration fails, as it's a critical step.
        std::process::exit(1);
    });

    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("dingbridge starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("HTTP Timeout: {}s", config.http.timeout_seconds);
    info!("Template Files: {}", config.templates.len());
    for (name, target) in &config.targets {
        info!(
            "Target '{}': signed={}, mention={}, custom message={}",
            name,
            target.signing_secret().is_some(),
            target.mention.is_some(),
            target.message.as_ref() != Some(&config.default_message),
        );
    }
    info!("-------------------------------------------------------");

    let notifier = DingTalkNotifier::from_config(&config).context("failed to load templates")?;

    match cli.command.unwrap_or(Command::Check) {
        Command::Check => {
            let names: Vec<&str> = notifier.target_names().collect();
            println!("configuration OK: {} target(s) [{}]", names.len(), names.join(", "));
        }
        Command::Render { target, payload } => {
            let message = read_payload(&payload)?;
            let notification = notifier.render(&target, &message)?;
            println!("{}", serde_json::to_string_pretty(&notification)?);
        }
        Command::Send { target, payload } => {
            let message = read_payload(&payload)?;
            let response = notifier.notify(&target, &message).await?;
            println!("{} {}", response.errcode, response.errmsg);
        }
    }

    Ok(())
}

/// Reads an Alertmanager webhook message from a file, or stdin for `-`.
fn read_payload(path: &Path) -> Result<WebhookMessage> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read payload from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read payload from {}", path.display()))?
    };
    serde_json::from_str(&raw).context("payload is not a valid Alertmanager webhook message")
}
