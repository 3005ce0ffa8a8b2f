use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variables starting with `BAMRU_GCAL_` override file settings,
/// e.g. `BAMRU_GCAL_BAMRU_SESSION_ID`.
pub const ENV_PREFIX: &str = "BAMRU_GCAL";

/// Port the OAuth callback listener binds to unless configured otherwise.
pub const DEFAULT_OAUTH_CALLBACK_PORT: u16 = 8080;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// All errors joined into one line
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Settings for one publish run.
///
/// The YAML file uses the field names as top-level keys.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the BAMRU server, e.g. `https://bamru.org`
    pub bamru_server: String,

    /// Value of the `sessionid` cookie used to authenticate against BAMRU
    pub bamru_session_id: String,

    /// Google Calendar that gets cleared and repopulated
    pub calendar_id: String,

    /// OAuth client secrets JSON downloaded from the Google Cloud console
    pub google_credentials_file: PathBuf,

    /// Where the Google access/refresh token is cached between runs
    pub google_token_file: PathBuf,

    /// IANA zone attached to BAMRU timestamps that carry no UTC offset
    #[serde(default)]
    pub time_zone: Option<String>,

    /// Local port for the OAuth redirect during interactive authorization
    #[serde(default = "default_oauth_callback_port")]
    pub oauth_callback_port: u16,
}

fn default_oauth_callback_port() -> u16 {
    DEFAULT_OAUTH_CALLBACK_PORT
}

// Hand-written so the session id never ends up in logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bamru_server", &self.bamru_server)
            .field("bamru_session_id", &"<redacted>")
            .field("calendar_id", &self.calendar_id)
            .field("google_credentials_file", &self.google_credentials_file)
            .field("google_token_file", &self.google_token_file)
            .field("time_zone", &self.time_zone)
            .field("oauth_callback_port", &self.oauth_callback_port)
            .finish()
    }
}

impl Config {
    /// Load configuration from a YAML file, applying `BAMRU_GCAL_*`
    /// environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Yaml))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Warnings are logged; any validation error fails the load.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.bamru_server, "bamru_server", &mut result);

        if self.bamru_session_id.trim().is_empty() {
            result.add_error("bamru_session_id", "Session id must not be empty");
        }

        if self.calendar_id.trim().is_empty() {
            result.add_error("calendar_id", "Calendar id must not be empty");
        }

        if self.oauth_callback_port == 0 {
            result.add_error("oauth_callback_port", "Port cannot be 0");
        }

        if let Some(tz) = &self.time_zone {
            if tz.parse::<chrono_tz::Tz>().is_err() {
                result.add_error("time_zone", format!("Unknown time zone: {}", tz));
            }
        }

        if !self.google_credentials_file.exists() {
            // Only needed when the token file can't be used or refreshed.
            result.add_warning(
                "google_credentials_file",
                format!(
                    "File does not exist: {}",
                    self.google_credentials_file.display()
                ),
            );
        }

        if !self.google_token_file.exists() {
            result.add_warning(
                "google_token_file",
                "No cached token yet; interactive authorization will be required",
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if url.port() == Some(0) {
                    result.add_error(field_name, "Port cannot be 0");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use std::io::Write;

    const VALID_YAML: &str = r#"
bamru_server: https://bamru.example.org
bamru_session_id: abc123
calendar_id: team@group.calendar.google.com
google_credentials_file: /nonexistent/credentials.json
google_token_file: /nonexistent/token.json
"#;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn valid_config() -> Config {
        Config {
            bamru_server: "https://bamru.example.org".to_string(),
            bamru_session_id: "abc123".to_string(),
            calendar_id: "primary".to_string(),
            google_credentials_file: PathBuf::from("/nonexistent/credentials.json"),
            google_token_file: PathBuf::from("/nonexistent/token.json"),
            time_zone: None,
            oauth_callback_port: DEFAULT_OAUTH_CALLBACK_PORT,
        }
    }

    #[test]
    fn test_load_yaml_file() {
        let file = write_config(VALID_YAML);
        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.bamru_server, "https://bamru.example.org");
        assert_eq!(config.bamru_session_id, "abc123");
        assert_eq!(config.calendar_id, "team@group.calendar.google.com");
        assert_eq!(
            config.google_token_file,
            PathBuf::from("/nonexistent/token.json")
        );
        assert_eq!(config.time_zone, None);
        assert_eq!(config.oauth_callback_port, DEFAULT_OAUTH_CALLBACK_PORT);
    }

    #[test]
    fn test_load_optional_settings() {
        let yaml = format!("{}time_zone: America/Los_Angeles\noauth_callback_port: 9090\n", VALID_YAML);
        let file = write_config(&yaml);
        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.time_zone.as_deref(), Some("America/Los_Angeles"));
        assert_eq!(config.oauth_callback_port, 9090);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/bamru-gcal.yaml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_missing_required_key() {
        let file = write_config("bamru_server: https://bamru.example.org\n");
        let result = Config::load(file.path());
        assert!(matches!(result, Err(ConfigError::MissingSetting(_))));
    }

    #[test]
    fn test_load_validated_rejects_invalid_url() {
        let yaml = VALID_YAML.replace("https://bamru.example.org", "not-a-url");
        let file = write_config(&yaml);
        let err = Config::load_validated(file.path()).unwrap_err();
        assert!(err.to_string().contains("bamru_server"));
    }

    #[test]
    fn test_valid_config_has_only_warnings() {
        let result = valid_config().validate();
        assert!(result.is_valid(), "unexpected errors: {:?}", result.errors);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.field == "google_token_file"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = valid_config();
        config.bamru_server = "ftp://bamru.example.org".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_empty_ids_are_errors() {
        let mut config = valid_config();
        config.bamru_session_id = " ".to_string();
        config.calendar_id = String::new();
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "bamru_session_id"));
        assert!(result.errors.iter().any(|e| e.field == "calendar_id"));
    }

    #[test]
    fn test_unknown_time_zone() {
        let mut config = valid_config();
        config.time_zone = Some("Mars/Olympus_Mons".to_string());
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "time_zone"));

        config.time_zone = Some("America/Los_Angeles".to_string());
        assert!(config.validate().is_valid());
    }

    #[test]
    fn test_debug_redacts_session_id() {
        let debug = format!("{:?}", valid_config());
        assert!(!debug.contains("abc123"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1: error1"));
        assert!(summary.contains("field2: error2"));
    }
}
