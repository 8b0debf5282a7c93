//! Orbit engine: a TLE bound to its SGP4 coefficients.
//!
//! [`Orbit::propagate`] takes the instant explicitly and returns a fresh
//! [`PropagationResult`]; the engine itself never changes after
//! construction, so one `Orbit` can be shared across threads and
//! [`propagate_fleet`] can evaluate many of them in parallel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::GravityModel;
use crate::geodetic::{eci_to_geodetic, Geodetic};
use crate::propagator::{Sgp4, StateVector};
use crate::time;
use crate::tle::{Tle, TleError};

/// Everything computed for one orbit at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropagationResult {
    pub instant: DateTime<Utc>,
    /// Minutes from the element epoch to `instant`.
    pub minutes_since_epoch: f64,
    /// ECI position (km) and velocity (km/s).
    pub state: StateVector,
    pub geodetic: Geodetic,
    /// Speed (km/s).
    pub speed: f64,
    /// Orbital period (s).
    pub period: f64,
}

impl PropagationResult {
    /// Sub-satellite point as (latitude, longitude) in degrees.
    pub fn position(&self) -> (f64, f64) {
        (self.geodetic.latitude, self.geodetic.longitude)
    }

    /// Height above the ellipsoid (km).
    pub fn altitude(&self) -> f64 {
        self.geodetic.altitude
    }

    /// Speed (km/s).
    pub fn velocity(&self) -> f64 {
        self.speed
    }

    /// Orbital period (s).
    pub fn period(&self) -> f64 {
        self.period
    }
}

/// A satellite's element set and the propagator built from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Orbit {
    tle: Tle,
    sgp4: Sgp4,
}

impl Orbit {
    /// Build with the default (WGS-84 radius) gravity model.
    pub fn new(tle: Tle) -> Self {
        Orbit::with_gravity(tle, GravityModel::default())
    }

    pub fn with_gravity(tle: Tle, gravity: GravityModel) -> Self {
        let sgp4 = Sgp4::new(tle.elements(), gravity);
        Orbit { tle, sgp4 }
    }

    /// Parse two TLE lines and build the engine.
    pub fn from_lines(line1: &str, line2: &str) -> Result<Self, TleError> {
        Ok(Orbit::new(Tle::parse(line1, line2)?))
    }

    pub fn tle(&self) -> &Tle {
        &self.tle
    }

    pub fn sgp4(&self) -> &Sgp4 {
        &self.sgp4
    }

    /// Orbital period (s).
    pub fn period(&self) -> f64 {
        self.sgp4.period()
    }

    /// Propagate to `instant`.
    pub fn propagate(&self, instant: DateTime<Utc>) -> PropagationResult {
        let minutes_since_epoch = self.tle.minutes_since_epoch(instant);
        let state = self.sgp4.propagate(minutes_since_epoch);
        let geodetic = eci_to_geodetic(state.r, time::gmst(instant));

        PropagationResult {
            instant,
            minutes_since_epoch,
            state,
            geodetic,
            speed: state.v_mag(),
            period: self.sgp4.period(),
        }
    }

    /// Propagate to the current wall-clock time.
    pub fn propagate_now(&self) -> PropagationResult {
        self.propagate(Utc::now())
    }
}

/// Propagate every orbit to the same instant in parallel.
///
/// Results are in the same order as `orbits`.
pub fn propagate_fleet(orbits: &[Orbit], instant: DateTime<Utc>) -> Vec<PropagationResult> {
    use rayon::prelude::*;

    orbits.par_iter().map(|orbit| orbit.propagate(instant)).collect()
}
