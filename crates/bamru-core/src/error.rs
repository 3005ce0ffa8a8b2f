//! Configuration error types.

use thiserror::Error;

/// Errors raised while loading or validating the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Short hint printed next to the error by the binary.
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => "Check the path passed on the command line.",
            ConfigError::ParseError(_) => "The configuration file is not valid YAML.",
            ConfigError::MissingSetting(_) => "A required setting is missing from the file.",
            ConfigError::Invalid(_) => "Fix the settings listed above and try again.",
        }
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => ConfigError::MissingSetting(key),
            config::ConfigError::Message(msg) if msg.starts_with("missing field") => {
                ConfigError::MissingSetting(msg)
            }
            other => ConfigError::ParseError(other.to_string()),
        }
    }
}
