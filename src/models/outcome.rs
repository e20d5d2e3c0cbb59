use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::models::record::Record;

pub const NOTE_PROCESSED: &str = "processed";
pub const NOTE_NOT_FOUND: &str = "record not found";
pub const NOTE_INSPECTION_FAILED: &str = "result table could not be inspected";
pub const NOTE_FORM_UNOPENABLE: &str = "found but could not open action form";
pub const NOTE_FORM_INCOMPLETE: &str = "form could not be completed";
pub const NOTE_NOTICE_FAILED: &str = "processed, but notice generation failed";

/// Error text kept in a failure note
pub const ERROR_NOTE_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutcomeStatus {
    Success,
    Failure,
}

impl OutcomeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeStatus::Success => "SUCCESS",
            OutcomeStatus::Failure => "FAILURE",
        }
    }
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one attempted record; immutable once produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub record: Record,
    pub status: OutcomeStatus,
    pub note: String,
    pub processed_at: DateTime<Local>,
}

impl Outcome {
    pub fn success(record: Record, note: impl Into<String>) -> Self {
        Self::new(record, OutcomeStatus::Success, note)
    }

    pub fn failure(record: Record, note: impl Into<String>) -> Self {
        Self::new(record, OutcomeStatus::Failure, note)
    }

    fn new(record: Record, status: OutcomeStatus, note: impl Into<String>) -> Self {
        Self {
            record,
            status,
            note: note.into(),
            processed_at: Local::now(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.record.identifier
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}
