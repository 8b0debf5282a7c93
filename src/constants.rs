//! Physical and astrodynamic constants.
//!
//! SGP4 works in Earth radii and minutes. The zonal harmonics and `xke`
//! below are the WGS-72 values the catalog elements are fit with; only the
//! equatorial radius differs between the two gravity presets.

use serde::{Deserialize, Serialize};

/// Earth gravitational parameter used for the reported period (km³/s²).
pub const MU_EARTH: f64 = 398600.4;

/// WGS-84 equatorial radius (km).
pub const WGS84_A: f64 = 6378.137;

/// WGS-84 polar radius (km).
pub const WGS84_B: f64 = 6356.7523142;

/// Mean Earth radius used for great-circle distances (m).
pub const MEAN_EARTH_RADIUS_M: f64 = 6371.0e3;

/// Minutes per day.
pub const MINUTES_PER_DAY: f64 = 1440.0;

/// Seconds per solar day.
pub const SOLAR_DAY: f64 = 86400.0;

/// Julian date of the Unix epoch (1970-01-01T00:00:00 UTC).
pub const JD_UNIX_EPOCH: f64 = 2440587.5;

/// Julian date of J2000.0.
pub const JD_J2000: f64 = 2451545.0;

/// Kepler solver convergence threshold on successive iterates (rad).
pub const KEPLER_TOLERANCE: f64 = 1.0e-6;

/// Maximum Newton iterations for Kepler's equation.
pub const KEPLER_MAX_ITER: usize = 10;

/// Fixed number of latitude refinements in the geodetic converter.
pub const GEODETIC_ITERATIONS: usize = 20;

/// Perigee height below which the truncated drag equations are used (km).
pub const SIMPLIFIED_PERIGEE_KM: f64 = 220.0;

/// Two pi
pub const TAU: f64 = std::f64::consts::TAU;

/// Degrees to radians
pub const DEG2RAD: f64 = std::f64::consts::PI / 180.0;

/// Radians to degrees
pub const RAD2DEG: f64 = 180.0 / std::f64::consts::PI;

/// Earth constants consumed by the SGP4 propagator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GravityModel {
    /// Equatorial radius (km); one SGP4 distance unit.
    pub radius_km: f64,
    /// sqrt(GM) in Earth radii^1.5 per minute.
    pub xke: f64,
    /// J2 / 2.
    pub ck2: f64,
    /// -3 J4 / 8.
    pub ck4: f64,
    /// J3 zonal harmonic.
    pub xj3: f64,
}

impl Default for GravityModel {
    fn default() -> Self {
        GravityModel::wgs84()
    }
}

impl GravityModel {
    /// WGS-72 constants, as used by the published SGP4 test vectors.
    pub fn wgs72() -> Self {
        GravityModel {
            radius_km: 6378.135,
            xke: 0.0743669161,
            ck2: 5.413080e-4,
            ck4: 0.62098875e-6,
            xj3: -0.253881e-5,
        }
    }

    /// WGS-84 equatorial radius with the WGS-72 harmonics.
    pub fn wgs84() -> Self {
        GravityModel {
            radius_km: WGS84_A,
            ..GravityModel::wgs72()
        }
    }

    /// Default atmosphere reference altitude parameter `s` (Earth radii).
    pub fn s(&self) -> f64 {
        1.0 + 78.0 / self.radius_km
    }

    /// Default `(q0 - s)^4` drag density term (Earth radii^4).
    pub fn qoms2t(&self) -> f64 {
        ((120.0 - 78.0) / self.radius_km).powi(4)
    }

    /// Conversion from Earth radii per minute to km/s.
    pub fn velocity_scale(&self) -> f64 {
        self.radius_km / 60.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wgs72_atmosphere_defaults() {
        let g = GravityModel::wgs72();
        assert_relative_eq!(g.s(), 1.01222928, epsilon = 1e-8);
        assert_relative_eq!(g.qoms2t(), 1.88027916e-9, epsilon = 1e-15);
    }

    #[test]
    fn test_default_is_wgs84_radius() {
        let g = GravityModel::default();
        assert_eq!(g.radius_km, WGS84_A);
        assert_eq!(g.ck2, GravityModel::wgs72().ck2);
    }
}
