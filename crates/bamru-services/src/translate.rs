//! Bamru event to Google Calendar event.

use bamru_calendar::{EventSpan, NewEvent, Timestamp};
use chrono::Duration;

use crate::bamru::SourceEvent;
use crate::error::TranslateError;

/// Length given to timed events that have no finish.
const DEFAULT_DURATION_HOURS: i64 = 1;

/// Translates source events, optionally pinning offset-less times to a zone.
#[derive(Debug, Clone, Default)]
pub struct Translator {
    default_time_zone: Option<String>,
}

impl Translator {
    pub fn new(default_time_zone: Option<String>) -> Self {
        Self { default_time_zone }
    }

    pub fn translate(&self, event: &SourceEvent) -> Result<NewEvent, TranslateError> {
        let start = non_empty(&event.start).ok_or(TranslateError::MissingStart)?;
        let start = parse_timestamp("start", start)?;
        let finish = non_empty(&event.finish)
            .map(|f| parse_timestamp("finish", f))
            .transpose()?;

        let span = if event.all_day {
            EventSpan::AllDay {
                start: start.date(),
                end: finish.as_ref().map_or_else(|| start.date(), Timestamp::date),
            }
        } else {
            let end = finish.unwrap_or_else(|| start + Duration::hours(DEFAULT_DURATION_HOURS));
            EventSpan::Timed { start, end }
        };

        let mut translated =
            NewEvent::new(span, event.title.clone(), self.default_time_zone.as_deref());
        translated.location = non_empty(&event.location).map(str::to_string);
        translated.description = compose_description(event);
        Ok(translated)
    }
}

/// [`Translator::translate`] with no default time zone.
pub fn translate(event: &SourceEvent) -> Result<NewEvent, TranslateError> {
    Translator::default().translate(event)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn parse_timestamp(field: &'static str, value: &str) -> Result<Timestamp, TranslateError> {
    Timestamp::parse(value).map_err(|_| TranslateError::InvalidTimestamp {
        field,
        value: value.to_string(),
    })
}

// Leaders always come first.
fn compose_description(event: &SourceEvent) -> Option<String> {
    let mut lines = Vec::new();
    if let Some(leaders) = non_empty(&event.leaders) {
        lines.push(format!("Leader(s): {}", leaders));
    }
    if let Some(description) = non_empty(&event.description) {
        lines.push(description.to_string());
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
