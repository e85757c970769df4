//! Great-circle distance and the classroom geofence.

use crate::models::Location;

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Haversine distance between two points, in metres.
///
/// Non-finite input is not rejected; NaN simply propagates to the result.
pub fn distance(a: Location, b: Location) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lon - a.lon).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_METERS * c
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geofence {
    pub center: Location,
    pub radius_meters: f64,
}

impl Geofence {
    pub fn new(center: Location, radius_meters: f64) -> Self {
        Self {
            center,
            radius_meters,
        }
    }

    /// Returns `Err(distance)` when `point` lies outside the radius.
    pub fn check(&self, point: Location) -> Result<f64, f64> {
        let d = distance(point, self.center);
        if d > self.radius_meters {
            Err(d)
        } else {
            Ok(d)
        }
    }
}
