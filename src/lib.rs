//! # orbtrack
//!
//! Near-Earth satellite tracking from Two-Line Element sets.
//!
//! Parses and validates TLEs, propagates them with the SGP4 model,
//! converts the resulting ECI state to geodetic latitude, longitude and
//! altitude, and samples ground tracks split into day and night runs.

pub mod constants;
pub mod elements;
pub mod tle;
pub mod time;
pub mod propagator;
pub mod geodetic;
pub mod orbit;
pub mod satellite;

pub use orbit::{propagate_fleet, Orbit, PropagationResult};
pub use satellite::{GroundTrack, Satellite, TrackConfig};
pub use tle::{Tle, TleError};

#[cfg(feature = "python")]
mod pybridge;

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn orbtrack(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pybridge::register(m)?;
    Ok(())
}
