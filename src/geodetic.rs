//! Inertial to geodetic conversion on the WGS-84 ellipsoid.
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::time::LatLon;

/// Geodetic position: degrees and kilometres above the ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geodetic {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

impl Geodetic {
    pub fn lat_lon(&self) -> LatLon {
        LatLon { latitude: self.latitude, longitude: self.longitude }
    }
}

/// Convert an ECI position (km) to geodetic coordinates.
///
/// `sidereal` is the Greenwich sidereal angle (rad) of the same instant.
/// Latitude is refined a fixed [`GEODETIC_ITERATIONS`] times with no
/// convergence test.
pub fn eci_to_geodetic(r: [f64; 3], sidereal: f64) -> Geodetic {
    let [x, y, z] = r;
    let a = WGS84_A;
    let f = (WGS84_A - WGS84_B) / WGS84_A;
    let e2 = 2.0 * f - f * f;
    let rxy = (x * x + y * y).sqrt();

    let longitude = y.atan2(x) - sidereal;

    let mut latitude = z.atan2(rxy);
    let mut c = 0.0;
    for _ in 0..GEODETIC_ITERATIONS {
        let sin_lat = latitude.sin();
        c = 1.0 / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        latitude = (z + a * c * e2 * sin_lat).atan2(rxy);
    }
    let altitude = rxy / latitude.cos() - a * c;

    Geodetic {
        latitude: latitude * RAD2DEG,
        longitude: wrap_longitude(longitude * RAD2DEG),
        altitude,
    }
}

/// Wrap a longitude in degrees to [-180, 180].
pub fn wrap_longitude(lon_deg: f64) -> f64 {
    let lon = lon_deg % 360.0;
    if lon > 180.0 {
        lon - 360.0
    } else if lon < -180.0 {
        lon + 360.0
    } else {
        lon
    }
}

/// Haversine distance between two surface points (m) on a spherical Earth.
pub fn great_circle_distance(a: LatLon, b: LatLon) -> f64 {
    let phi1 = a.latitude * DEG2RAD;
    let phi2 = b.latitude * DEG2RAD;
    let dphi = phi2 - phi1;
    let dlambda = (b.longitude - a.longitude) * DEG2RAD;

    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * MEAN_EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Distance to the horizon (m) seen from `altitude_m` metres up.
pub fn horizon_distance(altitude_m: f64) -> f64 {
    (12.756 * altitude_m).sqrt() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_longitude_wraps_past_antimeridian() {
        // atan2 gives 100°, minus a sidereal angle of -90° is 190° raw
        let ang = 100.0 * DEG2RAD;
        let r = [7000.0 * ang.cos(), 7000.0 * ang.sin(), 0.0];
        let geo = eci_to_geodetic(r, -90.0 * DEG2RAD);
        assert_relative_eq!(geo.longitude, -170.0, epsilon = 1e-9);
    }

    #[test]
    fn test_wrap_longitude_range() {
        assert_relative_eq!(wrap_longitude(190.0), -170.0);
        assert_relative_eq!(wrap_longitude(-190.0), 170.0);
        assert_relative_eq!(wrap_longitude(540.5), 180.5 - 360.0);
        assert_eq!(wrap_longitude(180.0), 180.0);
        assert_eq!(wrap_longitude(-180.0), -180.0);
        for i in -20..20 {
            let lon = wrap_longitude(f64::from(i) * 97.3);
            assert!((-180.0..=180.0).contains(&lon), "lon={lon}");
        }
    }

    #[test]
    fn test_equatorial_point() {
        let geo = eci_to_geodetic([WGS84_A + 500.0, 0.0, 0.0], 0.0);
        assert!(geo.latitude.abs() < 1e-6);
        assert_eq!(geo.longitude, 0.0);
        assert_relative_eq!(geo.altitude, 500.0, epsilon = 1e-9);
    }

    #[test]
    fn test_pole() {
        // Near the pole R→0; altitude above the polar radius
        let geo = eci_to_geodetic([1e-3, 0.0, WGS84_B + 400.0], 0.0);
        assert_relative_eq!(geo.latitude, 90.0, epsilon = 1e-4);
    }

    #[test]
    fn test_great_circle_distance() {
        let origin = LatLon { latitude: 0.0, longitude: 0.0 };
        let quarter = LatLon { latitude: 0.0, longitude: 90.0 };
        let pole = LatLon { latitude: 90.0, longitude: 0.0 };
        let quarter_circumference = std::f64::consts::FRAC_PI_2 * MEAN_EARTH_RADIUS_M;
        assert_relative_eq!(great_circle_distance(origin, quarter), quarter_circumference, epsilon = 1e-6);
        assert_relative_eq!(great_circle_distance(origin, pole), quarter_circumference, epsilon = 1e-6);
        assert_eq!(great_circle_distance(origin, origin), 0.0);
    }

    #[test]
    fn test_horizon_distance() {
        assert_eq!(horizon_distance(0.0), 0.0);
        // 400 km up: sqrt(12.756 * 400e3) km
        assert_relative_eq!(horizon_distance(400e3), 2_258_849.3, epsilon = 1.0);
    }
}
