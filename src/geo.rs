//! Geolocation, geofencing, and teacher presence classification.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Mean Earth radius in meters, used by the haversine formula.
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A device position fix.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64, accuracy_meters: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_meters,
        }
    }
}

/// Circular boundary around a reference location (the school).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Geofence {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
}

impl Geofence {
    pub fn new(latitude: f64, longitude: f64, radius_meters: f64) -> Self {
        Self {
            latitude,
            longitude,
            radius_meters,
        }
    }

    /// Great-circle distance from the fence center to a point, in meters.
    pub fn distance_to(&self, point: &GeoPoint) -> f64 {
        distance_meters(self.latitude, self.longitude, point.latitude, point.longitude)
    }

    /// Whether the point lies within the fence radius.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.distance_to(point) <= self.radius_meters
    }
}

/// Haversine great-circle distance between two coordinates, in meters.
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// External geolocation provider contract.
///
/// Failure is [`crate::AppError::LocationUnavailable`].
pub trait LocationProvider {
    fn current_location(&self) -> impl Future<Output = Result<GeoPoint>> + Send;
}

/// Presence classification for teacher tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TeacherPresence {
    Present,
    Late,
    Absent,
    OutsideZone,
}

impl TeacherPresence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Late => "late",
            Self::Absent => "absent",
            Self::OutsideZone => "outside-zone",
        }
    }
}

/// Classify a teacher's presence from check-in time and location.
///
/// No check-in means absent. A check-in from outside the fence is
/// outside-zone regardless of time; an in-zone check-in is late when it
/// falls after the configured threshold.
pub fn classify_presence(
    check_in: Option<NaiveTime>,
    location: Option<&GeoPoint>,
    fence: &Geofence,
    late_after: NaiveTime,
) -> TeacherPresence {
    let Some(checked_in_at) = check_in else {
        return TeacherPresence::Absent;
    };
    if let Some(point) = location
        && !fence.contains(point)
    {
        return TeacherPresence::OutsideZone;
    }
    if checked_in_at > late_after {
        TeacherPresence::Late
    } else {
        TeacherPresence::Present
    }
}
