//! Error types for the publish pipeline.

use bamru_calendar::CalendarError;
use thiserror::Error;

/// Failures talking to the Bamru API.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Endpoint must start with '/': {0:?}")]
    RelativePath(String),

    #[error("Session id is not a valid cookie value")]
    InvalidSessionId,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Bamru returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// A source event that can't be turned into a calendar event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    #[error("Event has no start time")]
    MissingStart,

    #[error("Invalid {field} timestamp: {value:?}")]
    InvalidTimestamp { field: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Failed to fetch events from Bamru")]
    Source(#[from] SourceError),

    #[error("Calendar request failed")]
    Calendar(#[from] CalendarError),

    #[error("Failed to translate event {title:?}")]
    Translate {
        title: String,
        #[source]
        source: TranslateError,
    },
}

impl PublishError {
    /// Whether re-running the Google authorization could fix this.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Calendar(e) if e.is_auth_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_error_message() {
        let err = TranslateError::InvalidTimestamp {
            field: "start",
            value: "next tuesday".into(),
        };
        assert_eq!(err.to_string(), "Invalid start timestamp: \"next tuesday\"");
    }

    #[test]
    fn test_publish_error_auth() {
        assert!(PublishError::Calendar(CalendarError::TokenExpired).is_auth_error());
        assert!(!PublishError::Calendar(CalendarError::CalendarNotFound("x".into())).is_auth_error());
        assert!(!PublishError::Calendar(CalendarError::Forbidden("quotaExceeded".into())).is_auth_error());
        assert!(!PublishError::Source(SourceError::InvalidSessionId).is_auth_error());
    }
}
