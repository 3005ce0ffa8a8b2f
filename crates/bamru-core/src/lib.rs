pub mod config;
pub mod error;

pub use config::{Config, ConfigValidationError, ValidationResult, DEFAULT_OAUTH_CALLBACK_PORT};
pub use error::ConfigError;

use anyhow::Result;

/// Install the process-wide tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise everything at `info` and above is
/// printed. Only the binary calls this.
pub fn init_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::debug!("Logging initialized");
    Ok(())
}
