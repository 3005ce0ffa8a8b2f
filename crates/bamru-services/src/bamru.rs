//! Bamru club API client.

use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::Client;
use serde::{Deserialize, Deserializer};

use crate::error::SourceError;

/// One event as Bamru serves it. Fields we don't use are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SourceEvent {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub finish: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub all_day: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub leaders: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Bamru sends `null` for unset fields of any type.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Client for the Bamru API, authenticated by a session cookie.
pub struct BamruClient {
    client: Client,
    prefix: String,
}

impl BamruClient {
    /// `prefix` is the API root (e.g. `https://bamru.org/api`); endpoints are
    /// appended to it as-is.
    pub fn new(prefix: impl Into<String>, session_id: &str) -> Result<Self, SourceError> {
        let mut cookie = HeaderValue::from_str(&format!("sessionid={}", session_id))
            .map_err(|_| SourceError::InvalidSessionId)?;
        cookie.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, cookie);

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            prefix: prefix.into(),
        })
    }

    /// GET `{prefix}{endpoint}` and return the JSON body.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn get(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, SourceError> {
        if !endpoint.starts_with('/') {
            return Err(SourceError::RelativePath(endpoint.to_string()));
        }

        let url = format!("{}{}", self.prefix, endpoint);
        let response = self.client.get(&url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| SourceError::InvalidResponse(e.to_string()))
    }

    /// All events marked published in Bamru.
    pub async fn fetch_published_events(&self) -> Result<Vec<SourceEvent>, SourceError> {
        tracing::debug!("Fetching published events");

        let value = self.get("/events", &[("published", "true")]).await?;
        let events: Vec<SourceEvent> = serde_json::from_value(value)
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;

        tracing::debug!("Bamru returned {} published events", events.len());
        Ok(events)
    }
}
