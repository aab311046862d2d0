//! Authenticator boundary and user roles.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Access tier of a signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Teacher,
    ClassAdmin,
    SchoolAdmin,
    SuperAdmin,
}

impl Role {
    /// Human-readable role name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Teacher => "Teacher",
            Self::ClassAdmin => "Class Administrator",
            Self::SchoolAdmin => "School Administrator",
            Self::SuperAdmin => "Super Administrator",
        }
    }

    /// Scope of access granted by the role.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Teacher => "Attendance capture for assigned classes",
            Self::ClassAdmin => "Access to specific classes only",
            Self::SchoolAdmin => "Access to all classes within a school",
            Self::SuperAdmin => "Full system access across all schools",
        }
    }
}

/// Login request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub identifier: String,
    pub secret: String,
    /// Requested role; the backend decides the granted one.
    pub role: Option<Role>,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
            role: None,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }
}

/// Successful login result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub display_name: String,
    pub role: Role,
}

/// External authentication backend contract.
///
/// Failure is [`crate::AppError::AuthRejected`]; a failed login is simply
/// re-presentable, no lockout is modeled.
pub trait Authenticator {
    fn authenticate(&self, credentials: &Credentials) -> impl Future<Output = Result<AuthenticatedUser>> + Send;
}
