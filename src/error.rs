//! Error types for the count reporting engine.

use thiserror::Error;

/// Errors raised while building a count report.
///
/// Every variant aborts the whole report; the engine never emits a
/// partially-correct table.
#[derive(Error, Debug)]
pub enum ReportError {
    /// A DMG time whose minute field is 60 or more.
    #[error("invalid DMG time code {value}: minute field must be below 60")]
    InvalidTimeCode { value: u32 },

    /// An interval whose end precedes its start.
    #[error("interval end {end} is before its start {start}")]
    ReversedInterval { start: u32, end: u32 },

    /// An interval start that would fall before midnight.
    #[error("interval ending at {value} would start before 0000")]
    BeforeMidnight { value: u32 },

    /// An observation category that is not one of the report columns.
    #[error("category {id} is not part of the current selection")]
    UnknownCategory { id: u32 },

    /// A selected category the survey's catalog does not offer.
    #[error("category {id} is not offered by the survey")]
    CategoryNotInCatalog { id: u32 },

    /// Failure reported by the data source, passed through untouched.
    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
