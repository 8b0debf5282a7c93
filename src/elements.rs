//! Mean orbital element sets as consumed by the propagator.
//!
//! A [`Tle`](crate::tle::Tle) carries catalog units (degrees, revolutions
//! per day). [`ElementSet`] holds the same elements in the units SGP4 works
//! in: radians and radians per minute.

use serde::{Deserialize, Serialize};
use crate::constants::*;

/// Classical mean elements plus the B* drag term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementSet {
    /// Inclination (rad)
    pub inclination: f64,
    /// Right ascension of ascending node (rad)
    pub raan: f64,
    /// Eccentricity (dimensionless)
    pub eccentricity: f64,
    /// Argument of perigee (rad)
    pub arg_perigee: f64,
    /// Mean anomaly (rad)
    pub mean_anomaly: f64,
    /// Mean motion (rad/min)
    pub mean_motion: f64,
    /// B* drag term (1/Earth radii)
    pub bstar: f64,
}

impl ElementSet {
    /// Build an element set from catalog units.
    ///
    /// Angles are in degrees and mean motion in revolutions per day.
    pub fn from_degrees(
        inclination_deg: f64,
        raan_deg: f64,
        eccentricity: f64,
        arg_perigee_deg: f64,
        mean_anomaly_deg: f64,
        mean_motion_rev_day: f64,
        bstar: f64,
    ) -> Self {
        ElementSet {
            inclination: inclination_deg * DEG2RAD,
            raan: raan_deg * DEG2RAD,
            eccentricity,
            arg_perigee: arg_perigee_deg * DEG2RAD,
            mean_anomaly: mean_anomaly_deg * DEG2RAD,
            mean_motion: mean_motion_rev_day * TAU / MINUTES_PER_DAY,
            bstar,
        }
    }

    /// Mean motion in revolutions per day.
    pub fn revs_per_day(&self) -> f64 {
        self.mean_motion * MINUTES_PER_DAY / TAU
    }
}

/// Normalize angle to [0, 2π).
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle % TAU;
    if a < 0.0 { a + TAU } else { a }
}
