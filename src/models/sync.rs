//! Sync queue item model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of record a queue item carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncItemKind {
    /// Saved attendance snapshot for one class and date.
    Attendance,
    /// Generated report awaiting upload.
    Report,
}

impl SyncItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attendance => "attendance",
            Self::Report => "report",
        }
    }
}

/// Lifecycle state of a queue item.
///
/// Legal transitions: `Pending → Syncing → Completed | Failed`, and
/// `Failed → Pending` via an explicit retry. Completed and failed items stay
/// in the queue until external cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncItemStatus {
    Pending,
    Syncing,
    Completed,
    Failed,
}

impl SyncItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Syncing => "syncing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// A locally created record awaiting transmission.
///
/// Owned exclusively by the sync queue; `status`, `progress`, and
/// `last_error` are never mutated from outside it. `progress` is `Some`
/// only while syncing; `last_error` only while failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncQueueItem {
    pub id: Uuid,
    pub kind: SyncItemKind,
    pub class_name: String,
    pub date: NaiveDate,
    pub status: SyncItemStatus,
    /// Transmission progress in percent, meaningful only while syncing.
    pub progress: Option<u8>,
    /// Transport error detail from the most recent failed attempt.
    pub last_error: Option<String>,
}

impl SyncQueueItem {
    /// Create a fresh pending item with a new id.
    pub fn new(kind: SyncItemKind, class_name: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            class_name: class_name.into(),
            date,
            status: SyncItemStatus::Pending,
            progress: None,
            last_error: None,
        }
    }

    /// One-line label for logs and status displays.
    pub fn label(&self) -> String {
        format!("{} {} ({})", self.kind.as_str(), self.class_name, self.date)
    }
}
