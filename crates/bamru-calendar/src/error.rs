//! Calendar-specific error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Token expired or revoked")]
    TokenExpired,

    /// 403: quota, missing write access, or a disabled API.
    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Calendar not found: {0}")]
    CalendarNotFound(String),

    #[error("Invalid event data: {0}")]
    InvalidEventData(String),

    #[error("Batch holds more than {0} operations")]
    BatchTooLarge(usize),

    #[error("Invalid batch response: {0}")]
    InvalidBatchResponse(String),

    #[error("API error: {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl CalendarError {
    /// Whether a fresh authorization could fix this.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::TokenExpired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_auth_error() {
        assert!(CalendarError::TokenExpired.is_auth_error());
        assert!(!CalendarError::Forbidden("rateLimitExceeded".into()).is_auth_error());
        assert!(!CalendarError::CalendarNotFound("x".into()).is_auth_error());
        assert!(!CalendarError::BatchTooLarge(1000).is_auth_error());
    }

    #[test]
    fn test_api_error_message() {
        let err = CalendarError::ApiError {
            status: 500,
            message: "backendError".into(),
        };
        assert_eq!(err.to_string(), "API error: 500: backendError");
    }
}
