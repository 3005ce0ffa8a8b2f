//! Publishing Bamru events to Google Calendar.
//!
//! [`BamruClient`] reads the published events, [`Translator`] turns each one
//! into a calendar insert, and [`Publisher`] runs the whole replace cycle.

pub mod bamru;
pub mod error;
pub mod publisher;
pub mod translate;

pub use bamru::{BamruClient, SourceEvent};
pub use error::{PublishError, SourceError, TranslateError};
pub use publisher::{PublishReport, Publisher};
pub use translate::{translate, Translator};
