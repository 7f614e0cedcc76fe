//! Ingestion error types.

use serde::Serialize;
use thiserror::Error;

/// Fatal ingestion errors. When one of these is returned no dataset is
/// installed; the caller keeps whatever dataset it had before.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Required logical columns are absent from the source header entirely.
    #[error("required columns missing from source: {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    /// CSV read error while loading the raw table.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error while loading the raw table.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single row was excluded from the dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RejectReason {
    /// A required cell is empty or missing.
    MissingField(String),
    /// The delivery-time cell could not be parsed as a date-time.
    BadTimestamp(String),
    /// The lead-time cell could not be parsed as a number.
    BadLeadTime(String),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::MissingField(col) => write!(f, "missing required field '{col}'"),
            RejectReason::BadTimestamp(v) => write!(f, "unparseable delivery time '{v}'"),
            RejectReason::BadLeadTime(v) => write!(f, "unparseable lead time '{v}'"),
        }
    }
}

/// One rejected row, reported alongside the surviving dataset.
#[derive(Debug, Clone, Serialize)]
pub struct RowRejection {
    /// 1-based data row number (header not counted).
    pub row: usize,
    pub reason: RejectReason,
}
