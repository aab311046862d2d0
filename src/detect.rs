//! Face detector boundary.
//!
//! The detector itself (camera capture, ML inference) is an external
//! collaborator; this module defines only the contract the session workflow
//! consumes. Implementations resolve after unspecified latency; tests inject
//! doubles that resolve immediately.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Opaque handle to a captured classroom image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedImage {
    /// Storage reference (path, URL, or device handle).
    pub reference: String,
}

impl CapturedImage {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
        }
    }
}

/// One recognized student in a captured image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceMatch {
    pub student_id: String,
    /// Recognition confidence in [0, 1].
    pub confidence: f32,
}

impl FaceMatch {
    pub fn new(student_id: impl Into<String>, confidence: f32) -> Self {
        Self {
            student_id: student_id.into(),
            confidence,
        }
    }
}

/// Result of running detection on one captured image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionOutcome {
    /// Number of faces found in the image.
    pub detected_count: usize,
    /// Matched students, highest confidence first.
    pub matches: Vec<FaceMatch>,
}

impl DetectionOutcome {
    /// Build an outcome whose count is derived from the matches, sorted by
    /// descending confidence.
    pub fn from_matches(mut matches: Vec<FaceMatch>) -> Self {
        matches.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Self {
            detected_count: matches.len(),
            matches,
        }
    }

    /// Check internal consistency: count matches the match list, no
    /// duplicate students, confidences in range.
    pub fn validate(&self) -> Result<()> {
        if self.detected_count != self.matches.len() {
            return Err(AppError::invalid_input(format!(
                "detected count {} does not match {} identified students",
                self.detected_count,
                self.matches.len()
            )));
        }
        for (i, m) in self.matches.iter().enumerate() {
            if !(0.0..=1.0).contains(&m.confidence) {
                return Err(AppError::invalid_input(format!(
                    "confidence {} out of range for student {}",
                    m.confidence, m.student_id
                )));
            }
            if self.matches[..i].iter().any(|prev| prev.student_id == m.student_id) {
                return Err(AppError::invalid_input(format!(
                    "student {} matched more than once",
                    m.student_id
                )));
            }
        }
        Ok(())
    }
}

/// External face detector contract.
///
/// Failure is reported as [`AppError::DetectionFailed`]; the session
/// workflow stays in the capturing state so the caller can retake.
pub trait Detector {
    fn detect(&self, image: &CapturedImage) -> impl Future<Output = Result<DetectionOutcome>> + Send;
}
