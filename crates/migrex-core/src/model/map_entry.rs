use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::keys::{DestinationKey, SourceKey};

/// Per-row status tracked by the identifier map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    /// Written to the destination and unchanged since
    Imported,
    /// Must be re-processed on the next import
    NeedsUpdate,
    /// Deliberately skipped by a process step
    Ignored,
    /// Processing or writing failed
    Failed,
    /// Rollback started for this row but has not removed the entry yet
    RolledBack,
}

impl RowStatus {
    /// Stable integer code used by persistent maps
    pub fn code(&self) -> i64 {
        match self {
            RowStatus::Imported => 0,
            RowStatus::NeedsUpdate => 1,
            RowStatus::Ignored => 2,
            RowStatus::Failed => 3,
            RowStatus::RolledBack => 4,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(RowStatus::Imported),
            1 => Some(RowStatus::NeedsUpdate),
            2 => Some(RowStatus::Ignored),
            3 => Some(RowStatus::Failed),
            4 => Some(RowStatus::RolledBack),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RowStatus::Imported => "imported",
            RowStatus::NeedsUpdate => "needs_update",
            RowStatus::Ignored => "ignored",
            RowStatus::Failed => "failed",
            RowStatus::RolledBack => "rolled_back",
        }
    }
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source-to-destination correspondence for one row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    pub source_key: SourceKey,
    /// Present once the row has been written; kept on later failures
    pub dest_key: Option<DestinationKey>,
    /// Content hash of the row at its last processing attempt
    pub source_hash: String,
    pub status: RowStatus,
    pub last_imported: DateTime<Utc>,
}

impl MapEntry {
    /// Whether an import can leave this row alone
    ///
    /// Only rows that were imported or ignored from identical content are
    /// settled; failed, flagged and half rolled back rows are retried.
    pub fn is_current(&self, source_hash: &str) -> bool {
        matches!(self.status, RowStatus::Imported | RowStatus::Ignored)
            && self.source_hash == source_hash
    }
}

/// Severity of a row message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Error,
    Warning,
    Notice,
}

impl MessageLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageLevel::Error => "error",
            MessageLevel::Warning => "warning",
            MessageLevel::Notice => "notice",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "error" => Some(MessageLevel::Error),
            "warning" => Some(MessageLevel::Warning),
            "notice" => Some(MessageLevel::Notice),
            _ => None,
        }
    }
}

/// Message recorded against a source row during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowMessage {
    pub source_key: SourceKey,
    pub level: MessageLevel,
    pub message: String,
}

/// Number of tracked rows per status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MapCounts {
    pub imported: usize,
    pub needs_update: usize,
    pub ignored: usize,
    pub failed: usize,
    pub rolled_back: usize,
}

impl MapCounts {
    pub fn record(&mut self, status: RowStatus) {
        self.add(status, 1);
    }

    /// Add `n` rows of one status
    pub fn add(&mut self, status: RowStatus, n: usize) {
        let counter = match status {
            RowStatus::Imported => &mut self.imported,
            RowStatus::NeedsUpdate => &mut self.needs_update,
            RowStatus::Ignored => &mut self.ignored,
            RowStatus::Failed => &mut self.failed,
            RowStatus::RolledBack => &mut self.rolled_back,
        };
        *counter += n;
    }

    /// Total tracked rows
    pub fn total(&self) -> usize {
        self.imported + self.needs_update + self.ignored + self.failed + self.rolled_back
    }
}
