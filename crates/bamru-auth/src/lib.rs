//! Google credentials for the calendar side of a publish run.
//!
//! The rest of the workspace only sees [`CredentialProvider`] and the
//! [`AuthorizedTransport`] it hands out.

pub mod error;
pub mod google;
pub mod oauth;
pub mod storage;
pub mod transport;

pub use error::AuthError;
pub use google::{ClientSecrets, GoogleCredentialProvider, CALENDAR_SCOPE};
pub use oauth::InstalledAppFlow;
pub use storage::{TokenSet, TokenStore};
pub use transport::AuthorizedTransport;

/// Source of an HTTP transport that is already authorized for the calendar API.
#[allow(async_fn_in_trait)]
pub trait CredentialProvider {
    /// Produce an authorized transport, refreshing or re-authorizing as needed.
    async fn authorized_transport(&self) -> Result<AuthorizedTransport, AuthError>;
}
