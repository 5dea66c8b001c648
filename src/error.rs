//! Error types for ingestion and session control

use chrono::NaiveDate;
use thiserror::Error;

/// A whole-file ingestion failure. Nothing from the file reaches the store.
#[derive(Error, Debug)]
pub enum IngestError {
    /// The header row lacks one or more required columns
    #[error("{file}: missing required column(s) {}", missing.join(", "))]
    Schema { file: String, missing: Vec<String> },

    /// The CSV body could not be read as well-formed records
    #[error("{file}: malformed CSV: {source}")]
    Parse {
        file: String,
        #[source]
        source: csv::Error,
    },

    /// A record's field count disagrees with the header
    #[error("{file}: line {line} has {found} fields, header has {expected}")]
    FieldCount {
        file: String,
        line: u64,
        expected: usize,
        found: usize,
    },

    /// A field swallowed line breaks, which only happens when a quote is
    /// left open
    #[error("{file}: {column} starting on line {line} runs across line breaks (unterminated quote)")]
    UnterminatedField {
        file: String,
        line: u64,
        column: String,
    },

    /// The parse task did not complete
    #[error("{file}: ingestion task failed: {message}")]
    Task { file: String, message: String },
}

impl IngestError {
    /// Name of the file this error belongs to
    pub fn file(&self) -> &str {
        match self {
            IngestError::Schema { file, .. }
            | IngestError::Parse { file, .. }
            | IngestError::FieldCount { file, .. }
            | IngestError::UnterminatedField { file, .. }
            | IngestError::Task { file, .. } => file,
        }
    }

    /// True for structural CSV problems, false for schema validation
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            IngestError::Parse { .. }
                | IngestError::FieldCount { .. }
                | IngestError::UnterminatedField { .. }
        )
    }
}

/// Why a single row was left out of a file's events.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowRejection {
    #[error("row has no user_email")]
    MissingAgent,

    #[error("row has no created_at_est")]
    MissingTimestamp,

    #[error("unparsable created_at_est {value:?}")]
    InvalidTimestamp { value: String },
}

impl RowRejection {
    /// Agent-less rows are not support responses and are dropped quietly.
    pub fn is_silent(&self) -> bool {
        matches!(self, RowRejection::MissingAgent)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("range start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("select a specific agent to view their weekly pattern")]
    AgentRequired,
}
