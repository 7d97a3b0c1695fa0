//! Geographic coordinates on a flat degree plane
//!
//! Source estimation and spread work on raw latitude/longitude pairs. The
//! clustering kernel sees them as nalgebra points with `x = latitude`.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::core_types::units::Radians;

/// Geographic coordinate in decimal degrees
///
/// Distances between points are measured on a flat degree plane
/// (`sqrt(Δlat² + Δlon²)`), not geodesically. At city-to-city scale this is
/// the approximation the spread model is calibrated against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new coordinate
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        GeoPoint {
            latitude,
            longitude,
        }
    }

    /// Offset `(Δlat, Δlon)` of `self` relative to `origin`
    #[inline]
    pub fn offset_from(&self, origin: &GeoPoint) -> (f64, f64) {
        (
            self.latitude - origin.latitude,
            self.longitude - origin.longitude,
        )
    }

    /// Flat-plane distance in degrees
    #[inline]
    pub fn planar_distance(&self, origin: &GeoPoint) -> f64 {
        let (d_lat, d_lon) = self.offset_from(origin);
        (d_lat * d_lat + d_lon * d_lon).sqrt()
    }

    /// Bearing of `self` seen from `origin`, `atan2(Δlat, Δlon)`
    ///
    /// Zero points along +longitude (east) and angles grow toward +latitude.
    #[inline]
    pub fn bearing_from(&self, origin: &GeoPoint) -> Radians {
        let (d_lat, d_lon) = self.offset_from(origin);
        Radians::new(d_lat.atan2(d_lon))
    }

    /// Round both coordinates to `places` decimal places
    pub fn rounded(&self, places: i32) -> GeoPoint {
        GeoPoint::new(
            round_to(self.latitude, places),
            round_to(self.longitude, places),
        )
    }

    /// Whether both coordinates are finite numbers
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

impl From<GeoPoint> for Point2<f64> {
    fn from(p: GeoPoint) -> Point2<f64> {
        Point2::new(p.latitude, p.longitude)
    }
}

impl From<Point2<f64>> for GeoPoint {
    fn from(p: Point2<f64>) -> GeoPoint {
        GeoPoint::new(p.x, p.y)
    }
}

/// Round `value` half away from zero to `places` decimal places
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}
