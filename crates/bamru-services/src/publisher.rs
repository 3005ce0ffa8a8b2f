//! Replace the calendar's events with Bamru's published events.

use bamru_calendar::{BatchRequest, CalendarClient};

use crate::bamru::BamruClient;
use crate::error::PublishError;
use crate::translate::Translator;

/// Outcome of one publish run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Events returned by Bamru.
    pub fetched: usize,
    /// Batch items Google accepted.
    pub inserted: usize,
    /// Batch items Google rejected or never answered.
    pub failed: usize,
}

pub struct Publisher {
    source: BamruClient,
    calendar: CalendarClient,
    translator: Translator,
}

impl Publisher {
    pub fn new(source: BamruClient, calendar: CalendarClient) -> Self {
        Self {
            source,
            calendar,
            translator: Translator::default(),
        }
    }

    pub fn with_translator(mut self, translator: Translator) -> Self {
        self.translator = translator;
        self
    }

    /// Fetch, clear `calendar_id`, translate, then insert everything in one
    /// batch.
    ///
    /// The calendar is cleared before any event is translated, so a bad
    /// timestamp leaves it empty. Items rejected inside the batch are logged
    /// and counted in the report rather than failing the run.
    pub async fn publish(&self, calendar_id: &str) -> Result<PublishReport, PublishError> {
        tracing::info!("Fetching published events from Bamru");
        let events = self.source.fetch_published_events().await?;
        tracing::info!("Fetched {} events", events.len());

        tracing::info!("Clearing calendar {}", calendar_id);
        self.calendar.clear_calendar(calendar_id).await?;

        let translated = events
            .iter()
            .map(|event| {
                self.translator
                    .translate(event)
                    .map_err(|source| PublishError::Translate {
                        title: event.title.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut report = PublishReport {
            fetched: events.len(),
            ..Default::default()
        };

        if translated.is_empty() {
            tracing::info!("No events to publish");
            return Ok(report);
        }

        tracing::info!("Building batch of {} inserts", translated.len());
        let mut batch = BatchRequest::new();
        for event in &translated {
            batch.add_insert(calendar_id, event)?;
        }

        tracing::info!("Executing batch");
        let results = self.calendar.execute_batch(&batch).await?;

        for result in &results {
            if result.is_success() {
                report.inserted += 1;
            } else {
                report.failed += 1;
                tracing::warn!(
                    index = result.index,
                    status = result.status,
                    summary = translated.get(result.index).map(|e| e.summary.as_str()),
                    "Event insert failed: {}",
                    result.body
                );
            }
        }

        let missing = batch.len().saturating_sub(results.len());
        if missing > 0 {
            tracing::warn!("{} batch items got no response", missing);
            report.failed += missing;
        }

        tracing::info!(
            "Published {} of {} events ({} failed)",
            report.inserted,
            report.fetched,
            report.failed
        );
        Ok(report)
    }
}
