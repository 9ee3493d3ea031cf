//! Coordinates and great-circle distance.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Mean Earth radius used by the haversine formula, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS-84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees, `[-90, 90]`.
    pub latitude: f64,
    /// Longitude in degrees, `[-180, 180]`.
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting out-of-range or non-finite values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, AppError> {
        let coordinate = Self {
            latitude,
            longitude,
        };
        coordinate.validate()?;
        Ok(coordinate)
    }

    /// Check that both components are finite and in range.
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(AppError::validation(format!(
                "Latitude out of range: {}",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(AppError::validation(format!(
                "Longitude out of range: {}",
                self.longitude
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Great-circle distance between two coordinates in kilometres.
///
/// Haversine with a spherical Earth of radius [`EARTH_RADIUS_KM`]. The
/// result is symmetric in its arguments and exactly `0.0` for identical
/// inputs. Ranges are not checked here; callers reject malformed
/// coordinates upstream.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);

    // Rounding can push h a hair outside [0, 1] for near-antipodal points.
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(latitude: f64, longitude: f64) -> Coordinate {
        Coordinate {
            latitude,
            longitude,
        }
    }

    #[test]
    fn test_zero_for_same_point() {
        for point in [at(0.0, 0.0), at(10.0, 10.0), at(-33.86, 151.2), at(90.0, 0.0)] {
            assert_eq!(distance_km(point, point), 0.0);
        }
    }

    #[test]
    fn test_symmetric() {
        let pairs = [
            (at(0.0, 0.0), at(0.0, 0.05)),
            (at(10.0, 10.0), at(10.02, 9.97)),
            (at(51.5074, -0.1278), at(48.8566, 2.3522)),
            (at(-89.9, 179.9), at(89.9, -179.9)),
        ];
        for (a, b) in pairs {
            assert_eq!(distance_km(a, b), distance_km(b, a));
        }
    }

    #[test]
    fn test_known_distances() {
        let near = distance_km(at(0.0, 0.0), at(0.0, 0.05));
        assert!((near - 5.56).abs() < 0.01, "got {near}");

        let far = distance_km(at(0.0, 0.0), at(0.0, 0.1));
        assert!((far - 11.12).abs() < 0.01, "got {far}");

        let london_paris = distance_km(at(51.5074, -0.1278), at(48.8566, 2.3522));
        assert!((london_paris - 343.5).abs() < 1.0, "got {london_paris}");
    }

    #[test]
    fn test_antipodal_is_finite() {
        let d = distance_km(at(0.0, 0.0), at(0.0, 180.0));
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        assert!(Coordinate::new(91.0, 0.0).is_err());
        assert!(Coordinate::new(0.0, -180.5).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(-90.0, 180.0).is_ok());
    }
}
