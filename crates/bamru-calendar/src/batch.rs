//! Google's `multipart/mixed` batch protocol.
//!
//! A batch carries N independent calendar operations in one HTTP exchange.
//! Each operation succeeds or fails on its own; the response holds one
//! embedded HTTP response per operation.

use crate::error::CalendarError;
use crate::types::NewEvent;

/// Google rejects batches with more operations than this.
pub const MAX_BATCH_SIZE: usize = 1000;

/// Path prefix of embedded requests, independent of where the batch is sent.
const API_PATH: &str = "/calendar/v3";

#[derive(Debug, Clone)]
struct BatchOperation {
    method: &'static str,
    path: String,
    body: String,
}

/// Operations waiting to be sent as one batch.
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    operations: Vec<BatchOperation>,
}

/// Outcome of one operation, in the order it was added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItemResult {
    pub index: usize,
    pub status: u16,
    pub body: String,
}

impl BatchItemResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl BatchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an `events.insert` on `calendar_id`.
    pub fn add_insert(&mut self, calendar_id: &str, event: &NewEvent) -> Result<(), CalendarError> {
        if self.operations.len() >= MAX_BATCH_SIZE {
            return Err(CalendarError::BatchTooLarge(MAX_BATCH_SIZE));
        }

        let body = serde_json::to_string(event)
            .map_err(|e| CalendarError::InvalidEventData(e.to_string()))?;

        self.operations.push(BatchOperation {
            method: "POST",
            path: format!(
                "{}/calendars/{}/events",
                API_PATH,
                urlencoding::encode(calendar_id)
            ),
            body,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Render the multipart body. Content-IDs are `<item-N>`, N from 1.
    pub(crate) fn encode(&self, boundary: &str) -> String {
        let mut out = String::new();
        for (i, op) in self.operations.iter().enumerate() {
            out.push_str(&format!("--{}\r\n", boundary));
            out.push_str("Content-Type: application/http\r\n");
            out.push_str(&format!("Content-ID: <item-{}>\r\n\r\n", i + 1));
            out.push_str(&format!("{} {} HTTP/1.1\r\n", op.method, op.path));
            out.push_str("Content-Type: application/json; charset=UTF-8\r\n\r\n");
            out.push_str(&op.body);
            out.push_str("\r\n");
        }
        out.push_str(&format!("--{}--\r\n", boundary));
        out
    }
}

/// Pull `boundary=` out of a `multipart/mixed` content type.
fn boundary_from_content_type(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .map(str::trim)
        .find_map(|param| param.strip_prefix("boundary="))
        .map(|b| b.trim_matches('"'))
        .filter(|b| !b.is_empty())
}

/// Split at the first blank line into (headers, rest).
fn split_head(part: &str) -> (&str, &str) {
    match part.find("\n\n") {
        Some(pos) => (&part[..pos], &part[pos + 2..]),
        None => (part, ""),
    }
}

/// `<response-item-3>` -> index 2
fn index_from_content_id(headers: &str) -> Option<usize> {
    headers.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if !name.trim().eq_ignore_ascii_case("content-id") {
            return None;
        }
        let id = value.trim().trim_start_matches('<').trim_end_matches('>');
        let n: usize = id.rsplit('-').next()?.parse().ok()?;
        n.checked_sub(1)
    })
}

/// Parse a batch response body into per-operation results sorted by index.
pub(crate) fn parse_batch_response(
    content_type: &str,
    body: &str,
) -> Result<Vec<BatchItemResult>, CalendarError> {
    let boundary = boundary_from_content_type(content_type).ok_or_else(|| {
        CalendarError::InvalidBatchResponse(format!("no boundary in {:?}", content_type))
    })?;

    let normalized = body.replace("\r\n", "\n");
    let delimiter = format!("--{}", boundary);
    let mut results = Vec::new();

    for (position, part) in normalized.split(delimiter.as_str()).skip(1).enumerate() {
        if part.starts_with("--") {
            break;
        }

        let (outer_headers, embedded) = split_head(part.trim_start_matches('\n'));
        let (status_and_headers, inner_body) = split_head(embedded);

        let status_line = status_and_headers.lines().next().unwrap_or_default();
        let status = status_line
            .split_whitespace()
            .nth(1)
            .and_then(|code| code.parse::<u16>().ok())
            .ok_or_else(|| {
                CalendarError::InvalidBatchResponse(format!("bad status line {:?}", status_line))
            })?;

        results.push(BatchItemResult {
            index: index_from_content_id(outer_headers).unwrap_or(position),
            status,
            body: inner_body.trim_end().to_string(),
        });
    }

    results.sort_by_key(|r| r.index);
    Ok(results)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::types::{EventSpan, Timestamp};

    fn event(summary: &str) -> NewEvent {
        NewEvent::new(
            EventSpan::Timed {
                start: Timestamp::parse("2024-06-01T09:00:00-07:00").unwrap(),
                end: Timestamp::parse("2024-06-01T10:00:00-07:00").unwrap(),
            },
            summary,
            None,
        )
    }

    #[test]
    fn test_encode_parts() {
        let mut batch = BatchRequest::new();
        batch.add_insert("primary", &event("First")).unwrap();
        batch.add_insert("team@group.calendar.google.com", &event("Second")).unwrap();

        let body = batch.encode("b0undary");

        assert_eq!(body.matches("--b0undary\r\n").count(), 2);
        assert!(body.ends_with("--b0undary--\r\n"));
        assert!(body.contains("Content-ID: <item-1>"));
        assert!(body.contains("Content-ID: <item-2>"));
        assert!(body.contains("POST /calendar/v3/calendars/primary/events HTTP/1.1"));
        assert!(body.contains(
            "POST /calendar/v3/calendars/team%40group.calendar.google.com/events HTTP/1.1"
        ));
        assert!(body.contains(r#""summary":"First""#));
    }

    #[test]
    fn test_batch_size_limit() {
        let mut batch = BatchRequest::new();
        let e = event("x");
        for _ in 0..MAX_BATCH_SIZE {
            batch.add_insert("primary", &e).unwrap();
        }
        let result = batch.add_insert("primary", &e);
        assert!(matches!(result, Err(CalendarError::BatchTooLarge(MAX_BATCH_SIZE))));
        assert_eq!(batch.len(), MAX_BATCH_SIZE);
    }

    #[test]
    fn test_boundary_from_content_type() {
        assert_eq!(
            boundary_from_content_type("multipart/mixed; boundary=batch_abc"),
            Some("batch_abc")
        );
        assert_eq!(
            boundary_from_content_type("multipart/mixed; boundary=\"quoted\""),
            Some("quoted")
        );
        assert_eq!(boundary_from_content_type("application/json"), None);
    }

    #[test]
    fn test_parse_response_out_of_order() {
        let body = "--batch_xyz\r\n\
Content-Type: application/http\r\n\
Content-ID: <response-item-2>\r\n\
\r\n\
HTTP/1.1 400 Bad Request\r\n\
Content-Type: application/json; charset=UTF-8\r\n\
\r\n\
{\"error\": {\"code\": 400, \"message\": \"Bad Request\"}}\r\n\
--batch_xyz\r\n\
Content-Type: application/http\r\n\
Content-ID: <response-item-1>\r\n\
\r\n\
HTTP/1.1 200 OK\r\n\
Content-Type: application/json; charset=UTF-8\r\n\
\r\n\
{\"id\": \"evt1\"}\r\n\
--batch_xyz--\r\n";

        let results = parse_batch_response("multipart/mixed; boundary=batch_xyz", body).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].index, 0);
        assert!(results[0].is_success());
        assert_eq!(results[0].body, "{\"id\": \"evt1\"}");
        assert_eq!(results[1].index, 1);
        assert_eq!(results[1].status, 400);
        assert!(!results[1].is_success());
    }

    #[test]
    fn test_parse_response_without_content_ids() {
        let body = "--b\nContent-Type: application/http\n\nHTTP/1.1 204 No Content\n\n\n--b\nContent-Type: application/http\n\nHTTP/1.1 200 OK\n\n{}\n--b--\n";

        let results = parse_batch_response("multipart/mixed; boundary=b", body).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].index, 0);
        assert_eq!(results[0].status, 204);
        assert_eq!(results[1].index, 1);
        assert_eq!(results[1].body, "{}");
    }

    #[test]
    fn test_parse_response_bad_status_line() {
        let body = "--b\nContent-Type: application/http\n\ngarbage\n--b--\n";
        let result = parse_batch_response("multipart/mixed; boundary=b", body);
        assert!(matches!(result, Err(CalendarError::InvalidBatchResponse(_))));
    }

    #[test]
    fn test_parse_response_missing_boundary() {
        let result = parse_batch_response("text/plain", "");
        assert!(matches!(result, Err(CalendarError::InvalidBatchResponse(_))));
    }
}
