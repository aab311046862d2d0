//! Error types and handling.

use thiserror::Error;

/// Application-wide error type.
///
/// Two families: state-machine guard violations (`InvalidState`,
/// `InvalidClass`, `InvalidInput`, `UnknownStudent`, `DetectionOutOfRange`)
/// are contract violations rejected at the API boundary; collaborator
/// failures (`DetectionFailed`, `TransmissionFailed`, `AuthRejected`,
/// `LocationUnavailable`) are expected operational outcomes surfaced to the
/// caller as typed results. None of these abort the process.
#[derive(Error, Debug)]
pub enum AppError {
    /// Operation invoked outside its valid state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Class name missing or blank
    #[error("Invalid class: {0}")]
    InvalidClass(String),

    /// Malformed identifier or count
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Student id not found on the class roster
    #[error("Unknown student: {0}")]
    UnknownStudent(String),

    /// Detected face count exceeds roster size
    #[error("Detection out of range: {0}")]
    DetectionOutOfRange(String),

    /// External detector reported a failure
    #[error("Detection failed: {0}")]
    DetectionFailed(String),

    /// Transport reported a failure (timeouts included)
    #[error("Transmission failed: {0}")]
    TransmissionFailed(String),

    /// Credentials rejected by the authentication backend
    #[error("Authentication rejected")]
    AuthRejected,

    /// Device location could not be obtained
    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),
}

/// Result type alias for AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Create an invalid-state error with message
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Create an invalid-input error with message
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an unknown-student error for the given id
    pub fn unknown_student(id: impl Into<String>) -> Self {
        Self::UnknownStudent(id.into())
    }

    /// Create a transmission error with message
    pub fn transmission(msg: impl Into<String>) -> Self {
        Self::TransmissionFailed(msg.into())
    }
}
