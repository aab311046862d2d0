//! Attendance session workflow.
//!
//! One session covers one capture event for one class on one date and walks
//! `Idle → Capturing → Detected → Reviewing → Saved`. Retakes go back to
//! `Capturing` from `Detected` or `Reviewing`. On save the session hands a
//! single pending item to the sync queue and freezes; taking attendance
//! again means starting a new session via [`AttendanceSession::start_capture`].
//!
//! Detection itself happens outside this type: the caller runs the detector
//! while the session sits in `Capturing` and feeds the outcome in through
//! [`AttendanceSession::complete_detection`]. A detector failure therefore
//! leaves the session in `Capturing`, ready for a retake.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::info;
use uuid::Uuid;

use crate::detect::DetectionOutcome;
use crate::error::{AppError, Result};
use crate::models::{AttendanceRecord, AttendanceStatus, Roster, SyncItemKind};
use crate::queue::SyncQueue;
use crate::report;

/// Workflow state of one attendance session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Capturing,
    Detected,
    Reviewing,
    Saved,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Capturing => "capturing",
            Self::Detected => "detected",
            Self::Reviewing => "reviewing",
            Self::Saved => "saved",
        }
    }
}

/// One attendance-taking session for a class roster.
#[derive(Debug)]
pub struct AttendanceSession {
    roster: Roster,
    date: NaiveDate,
    state: SessionState,
    class_name: String,
    detection: Option<DetectionOutcome>,
    attendance: HashMap<String, AttendanceStatus>,
}

impl AttendanceSession {
    /// Create an idle session over the given roster.
    pub fn new(roster: Roster, date: NaiveDate) -> Self {
        Self {
            roster,
            date,
            state: SessionState::Idle,
            class_name: String::new(),
            detection: None,
            attendance: HashMap::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Face count from the stored detection outcome, 0 before detection.
    pub fn detected_face_count(&self) -> usize {
        self.detection.as_ref().map_or(0, |d| d.detected_count)
    }

    /// Begin capturing for a class. Discards any prior detection or review
    /// state; this is also how a fresh session starts after a save.
    pub fn start_capture(&mut self, class_name: &str) -> Result<()> {
        if class_name.trim().is_empty() {
            return Err(AppError::InvalidClass("class name cannot be empty".to_string()));
        }
        self.class_name = class_name.trim().to_string();
        self.detection = None;
        self.attendance.clear();
        self.state = SessionState::Capturing;
        info!(class = %self.class_name, "capture started");
        Ok(())
    }

    /// Return to capturing for another shot, keeping the class name.
    pub fn retake(&mut self) -> Result<()> {
        match self.state {
            SessionState::Detected | SessionState::Reviewing => {
                self.detection = None;
                self.attendance.clear();
                self.state = SessionState::Capturing;
                Ok(())
            }
            other => Err(AppError::invalid_state(format!(
                "retake not allowed in {} state",
                other.as_str()
            ))),
        }
    }

    /// Accept a detector outcome and move to `Detected`.
    ///
    /// The outcome must be internally consistent, reference only roster
    /// students, and report no more faces than the roster holds (erroring
    /// rather than clamping keeps review counts trustworthy).
    pub fn complete_detection(&mut self, outcome: DetectionOutcome) -> Result<()> {
        if self.state != SessionState::Capturing {
            return Err(AppError::invalid_state(format!(
                "complete_detection not allowed in {} state",
                self.state.as_str()
            )));
        }
        outcome.validate()?;
        if outcome.detected_count > self.roster.len() {
            return Err(AppError::DetectionOutOfRange(format!(
                "{} faces detected for a roster of {}",
                outcome.detected_count,
                self.roster.len()
            )));
        }
        for m in &outcome.matches {
            if !self.roster.contains(&m.student_id) {
                return Err(AppError::unknown_student(&m.student_id));
            }
        }
        info!(class = %self.class_name, faces = outcome.detected_count, "detection complete");
        self.detection = Some(outcome);
        self.state = SessionState::Detected;
        Ok(())
    }

    /// Seed the attendance map and move to `Reviewing`.
    ///
    /// Matched students start present, every other roster student absent.
    pub fn proceed_to_review(&mut self) -> Result<()> {
        if self.state != SessionState::Detected {
            return Err(AppError::invalid_state(format!(
                "proceed_to_review not allowed in {} state",
                self.state.as_str()
            )));
        }
        let detection = self
            .detection
            .as_ref()
            .ok_or_else(|| AppError::invalid_state("no detection outcome stored"))?;

        let mut attendance = HashMap::with_capacity(self.roster.len());
        for m in &detection.matches {
            attendance.insert(m.student_id.clone(), AttendanceStatus::Present);
        }
        for student in self.roster.iter() {
            attendance.entry(student.id.clone()).or_insert(AttendanceStatus::Absent);
        }

        // Roster completeness is a stated postcondition, not an accident of
        // map defaults.
        if attendance.len() != self.roster.len() {
            return Err(AppError::invalid_state(format!(
                "{} statuses seeded for a roster of {}",
                attendance.len(),
                self.roster.len()
            )));
        }

        self.attendance = attendance;
        self.state = SessionState::Reviewing;
        Ok(())
    }

    /// Override one student's status during review. Idempotent.
    pub fn set_status(&mut self, student_id: &str, status: AttendanceStatus) -> Result<()> {
        if self.state != SessionState::Reviewing {
            return Err(AppError::invalid_state(format!(
                "set_status not allowed in {} state",
                self.state.as_str()
            )));
        }
        if !self.roster.contains(student_id) {
            return Err(AppError::unknown_student(student_id));
        }
        self.attendance.insert(student_id.to_string(), status);
        Ok(())
    }

    pub fn status_of(&self, student_id: &str) -> Option<AttendanceStatus> {
        self.attendance.get(student_id).copied()
    }

    /// Finalize the session: enqueue one pending attendance item and freeze.
    ///
    /// Returns the id of the enqueued item.
    pub fn save(&mut self, queue: &mut SyncQueue) -> Result<Uuid> {
        if self.state != SessionState::Reviewing {
            return Err(AppError::invalid_state(format!(
                "save not allowed in {} state",
                self.state.as_str()
            )));
        }
        for student in self.roster.iter() {
            if !self.attendance.contains_key(&student.id) {
                return Err(AppError::invalid_state(format!(
                    "student {} has no status assigned",
                    student.id
                )));
            }
        }

        let id = queue.enqueue(SyncItemKind::Attendance, &self.class_name, self.date);
        self.state = SessionState::Saved;
        info!(
            class = %self.class_name,
            present = self.present_count(),
            total = self.roster.len(),
            "attendance saved and queued"
        );
        Ok(id)
    }

    /// Records in roster order; empty before review.
    pub fn records(&self) -> Vec<AttendanceRecord> {
        self.roster
            .iter()
            .filter_map(|student| {
                self.attendance.get(&student.id).map(|status| AttendanceRecord {
                    student_id: student.id.clone(),
                    status: *status,
                })
            })
            .collect()
    }

    pub fn present_count(&self) -> usize {
        self.attendance
            .values()
            .filter(|s| **s == AttendanceStatus::Present)
            .count()
    }

    /// Rounded percentage of present students, 0 for an empty roster.
    pub fn attendance_rate(&self) -> u32 {
        report::attendance_rate(self.present_count(), self.roster.len())
    }
}
