//! Google Calendar side of a publish run.
//!
//! Provides the event insert model, the calendar client, and the batch
//! request builder.

pub mod batch;
pub mod client;
pub mod error;
pub mod types;

pub use batch::{BatchItemResult, BatchRequest, MAX_BATCH_SIZE};
pub use client::CalendarClient;
pub use error::CalendarError;
pub use types::{EventDateTime, EventSpan, NewEvent, Timestamp, TimestampError};
