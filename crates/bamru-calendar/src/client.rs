//! Google Calendar API client.

use bamru_auth::AuthorizedTransport;
use reqwest::header::CONTENT_TYPE;
use tracing::instrument;

use crate::batch::{parse_batch_response, BatchItemResult, BatchRequest};
use crate::error::CalendarError;

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const CALENDAR_BATCH_URL: &str = "https://www.googleapis.com/batch/calendar/v3";

pub struct CalendarClient {
    transport: AuthorizedTransport,
    base_url: String,
    batch_url: String,
}

impl CalendarClient {
    pub fn new(transport: AuthorizedTransport) -> Self {
        Self::with_base_urls(transport, CALENDAR_API_BASE, CALENDAR_BATCH_URL)
    }

    /// Point the client somewhere other than googleapis.com.
    pub fn with_base_urls(transport: AuthorizedTransport, base_url: &str, batch_url: &str) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            batch_url: batch_url.to_string(),
        }
    }

    /// Delete every event on a calendar.
    #[instrument(skip(self), level = "info")]
    pub async fn clear_calendar(&self, calendar_id: &str) -> Result<(), CalendarError> {
        let url = format!(
            "{}/calendars/{}/clear",
            self.base_url,
            urlencoding::encode(calendar_id),
        );

        let response = self.transport.client().post(&url).send().await?;

        // clear returns 204 No Content on success
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_for_response(response, calendar_id).await)
        }
    }

    /// Send all queued operations in one request.
    ///
    /// Only the outer request can fail here; per-operation failures come
    /// back as non-2xx [`BatchItemResult`]s.
    #[instrument(skip_all, fields(operations = batch.len()), level = "info")]
    pub async fn execute_batch(
        &self,
        batch: &BatchRequest,
    ) -> Result<Vec<BatchItemResult>, CalendarError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let boundary = format!("batch_{}", uuid::Uuid::new_v4().simple());

        let response = self
            .transport
            .client()
            .post(&self.batch_url)
            .header(
                CONTENT_TYPE,
                format!("multipart/mixed; boundary={}", boundary),
            )
            .body(batch.encode(&boundary))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for_response(response, "batch").await);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.text().await?;

        let results = parse_batch_response(&content_type, &body)?;
        tracing::debug!(
            "Batch returned {} results for {} operations",
            results.len(),
            batch.len()
        );
        Ok(results)
    }

    /// Map a non-success response to an error.
    async fn error_for_response(response: reqwest::Response, calendar_id: &str) -> CalendarError {
        match response.status().as_u16() {
            401 => CalendarError::TokenExpired,
            404 => CalendarError::CalendarNotFound(calendar_id.to_string()),
            403 => CalendarError::Forbidden(response.text().await.unwrap_or_default()),
            status => {
                let text = response.text().await.unwrap_or_default();
                CalendarError::ApiError {
                    status,
                    message: text,
                }
            }
        }
    }
}
