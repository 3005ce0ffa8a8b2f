use std::path::PathBuf;

use anyhow::{Context, Result};
use bamru_auth::{CredentialProvider, GoogleCredentialProvider};
use bamru_calendar::CalendarClient;
use bamru_core::Config;
use bamru_services::{BamruClient, Publisher, Translator};
use clap::Parser;

/// Replace a Google Calendar's events with the published BAMRU events.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// YAML configuration file
    config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    bamru_core::init_logging()?;

    let config = match Config::load_validated(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e.user_message());
            return Err(e).with_context(|| format!("Failed to load {}", cli.config.display()));
        }
    };
    tracing::debug!(?config, "Configuration loaded");

    let credentials = GoogleCredentialProvider::new(
        &config.google_credentials_file,
        &config.google_token_file,
        config.oauth_callback_port,
    );
    let transport = credentials
        .authorized_transport()
        .await
        .context("Failed to authorize with Google")?;

    let source = BamruClient::new(config.bamru_server.as_str(), &config.bamru_session_id)
        .context("Failed to create Bamru client")?;
    let calendar = CalendarClient::new(transport);
    let publisher = Publisher::new(source, calendar)
        .with_translator(Translator::new(config.time_zone.clone()));

    match publisher.publish(&config.calendar_id).await {
        Ok(report) => {
            tracing::info!(
                fetched = report.fetched,
                inserted = report.inserted,
                failed = report.failed,
                "Done"
            );
            Ok(())
        }
        Err(e) => {
            if e.is_auth_error() {
                tracing::error!(
                    "Google rejected the stored token; delete {} to re-authorize",
                    config.google_token_file.display()
                );
            }
            Err(e).context("Publish failed")
        }
    }
}
