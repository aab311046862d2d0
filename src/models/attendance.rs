//! Attendance status and per-student records.

use serde::{Deserialize, Serialize};

/// Present/absent status for one student in one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    /// Lowercase label for display and payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
        }
    }
}

/// One student's status within a saved session.
///
/// Exactly one record per roster student; mutable only while the session is
/// in review, frozen once it is saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub student_id: String,
    pub status: AttendanceStatus,
}
