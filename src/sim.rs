//! Simulated collaborators for the demo binary.
//!
//! These are injectable stand-ins for the real detector, authentication
//! backend, transport, and geolocation service. The core never depends on
//! them; the demo binary wires them in, and tests use their own doubles
//! with zero latency. Latency here only shapes the demo's pacing.

use std::collections::HashSet;
use std::time::Duration;

use tracing::debug;
use uuid::Uuid;

use crate::auth::{AuthenticatedUser, Authenticator, Credentials, Role};
use crate::detect::{CapturedImage, DetectionOutcome, Detector, FaceMatch};
use crate::error::{AppError, Result};
use crate::geo::{GeoPoint, LocationProvider};
use crate::models::SyncQueueItem;
use crate::queue::Transmitter;

/// Detector double returning a fixed set of matches.
pub struct SimulatedDetector {
    matches: Vec<FaceMatch>,
    latency: Duration,
}

impl SimulatedDetector {
    pub fn new(matches: Vec<FaceMatch>, latency: Duration) -> Self {
        Self { matches, latency }
    }
}

impl Detector for SimulatedDetector {
    async fn detect(&self, image: &CapturedImage) -> Result<DetectionOutcome> {
        debug!(image = %image.reference, "simulated detection running");
        tokio::time::sleep(self.latency).await;
        Ok(DetectionOutcome::from_matches(self.matches.clone()))
    }
}

/// Authenticator double accepting any non-blank credentials.
pub struct SimulatedAuthenticator {
    latency: Duration,
}

impl SimulatedAuthenticator {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Authenticator for SimulatedAuthenticator {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthenticatedUser> {
        tokio::time::sleep(self.latency).await;
        if credentials.identifier.trim().is_empty() || credentials.secret.trim().is_empty() {
            return Err(AppError::AuthRejected);
        }
        let role = credentials.role.unwrap_or(Role::Teacher);
        let prefix = match role {
            Role::Teacher => "Teacher",
            _ => "Admin",
        };
        Ok(AuthenticatedUser {
            display_name: format!("{prefix} {}", credentials.identifier),
            role,
        })
    }
}

/// Transport double: serializes the item payload as JSON and "sends" it,
/// failing for any id on the outage list.
pub struct SimulatedTransmitter {
    latency: Duration,
    fail_ids: HashSet<Uuid>,
}

impl SimulatedTransmitter {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            fail_ids: HashSet::new(),
        }
    }

    /// Make transmission of the given item fail.
    pub fn fail_for(mut self, id: Uuid) -> Self {
        self.fail_ids.insert(id);
        self
    }
}

impl Transmitter for SimulatedTransmitter {
    async fn transmit(&self, item: &SyncQueueItem) -> Result<()> {
        let body = serde_json::to_string(item)
            .map_err(|e| AppError::transmission(format!("payload serialization: {e}")))?;
        debug!(bytes = body.len(), item = %item.label(), "simulated upload");
        tokio::time::sleep(self.latency).await;
        if self.fail_ids.contains(&item.id) {
            return Err(AppError::transmission("simulated network outage"));
        }
        Ok(())
    }
}

/// Location provider double returning a fixed position fix.
pub struct SimulatedLocationProvider {
    point: Option<GeoPoint>,
}

impl SimulatedLocationProvider {
    pub fn fixed(point: GeoPoint) -> Self {
        Self { point: Some(point) }
    }

    /// A provider with no fix available.
    pub fn unavailable() -> Self {
        Self { point: None }
    }
}

impl LocationProvider for SimulatedLocationProvider {
    async fn current_location(&self) -> Result<GeoPoint> {
        self.point
            .ok_or_else(|| AppError::LocationUnavailable("no position fix".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_authenticator_accepts_any_non_blank_credentials() {
        let auth = SimulatedAuthenticator::new(Duration::ZERO);
        let user = auth
            .authenticate(&Credentials::new("T-102", "secret"))
            .await
            .unwrap();
        assert_eq!(user.display_name, "Teacher T-102");
        assert_eq!(user.role, Role::Teacher);
    }

    #[tokio::test]
    async fn test_authenticator_rejects_blank_secret() {
        let auth = SimulatedAuthenticator::new(Duration::ZERO);
        let err = auth.authenticate(&Credentials::new("T-102", "  ")).await.unwrap_err();
        assert!(matches!(err, AppError::AuthRejected));
    }

    #[tokio::test]
    async fn test_authenticator_honors_requested_role() {
        let auth = SimulatedAuthenticator::new(Duration::ZERO);
        let user = auth
            .authenticate(&Credentials::new("A-7", "secret").with_role(Role::SchoolAdmin))
            .await
            .unwrap();
        assert_eq!(user.display_name, "Admin A-7");
        assert_eq!(user.role, Role::SchoolAdmin);
    }

    #[tokio::test]
    async fn test_detector_returns_configured_matches() {
        let detector = SimulatedDetector::new(
            vec![FaceMatch::new("s1", 0.95), FaceMatch::new("s2", 0.88)],
            Duration::ZERO,
        );
        let outcome = detector.detect(&CapturedImage::new("demo.jpg")).await.unwrap();
        assert_eq!(outcome.detected_count, 2);
    }

    #[tokio::test]
    async fn test_location_provider_unavailable() {
        let provider = SimulatedLocationProvider::unavailable();
        let err = provider.current_location().await.unwrap_err();
        assert!(matches!(err, AppError::LocationUnavailable(_)));
    }
}
