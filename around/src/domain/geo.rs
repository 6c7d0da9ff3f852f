//! Coordinates and the home geofence

use serde::{Deserialize, Serialize};

/// A position fix in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Finite and within the latitude and longitude ranges
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Planar distance in degree space (not great-circle)
    pub fn degree_distance(&self, other: &Coordinate) -> f64 {
        let dlat = self.latitude - other.latitude;
        let dlon = self.longitude - other.longitude;
        (dlat * dlat + dlon * dlon).sqrt()
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Circular region around the user's home building
///
/// The radius is in degrees, which is good enough for a single building
/// footprint and keeps containment a cheap comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HomeGeofence {
    pub center: Coordinate,
    #[serde(rename = "radius-degrees")]
    pub radius_degrees: f64,
}

impl HomeGeofence {
    pub fn new(center: Coordinate, radius_degrees: f64) -> Self {
        Self { center, radius_degrees }
    }

    /// Boundary inclusive: a fix exactly `radius_degrees` away is inside
    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        self.center.degree_distance(coordinate) <= self.radius_degrees
    }
}
