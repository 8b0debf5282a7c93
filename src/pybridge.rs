//! Python bindings via PyO3 for orbtrack.
use chrono::{DateTime, Utc};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::constants::GravityModel;
use crate::orbit::{Orbit, PropagationResult};
use crate::satellite::{Satellite, TrackConfig};
use crate::tle::Tle;

fn to_instant(unix_seconds: f64) -> PyResult<DateTime<Utc>> {
    let secs = unix_seconds.floor();
    let nanos = ((unix_seconds - secs) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(secs as i64, nanos).ok_or_else(|| {
        pyo3::exceptions::PyValueError::new_err(format!("timestamp out of range: {unix_seconds}"))
    })
}

fn to_unix_seconds(instant: DateTime<Utc>) -> f64 {
    instant.timestamp() as f64 + f64::from(instant.timestamp_subsec_nanos()) * 1e-9
}

fn result_dict<'py>(py: Python<'py>, result: &PropagationResult) -> PyResult<Bound<'py, PyDict>> {
    let (latitude, longitude) = result.position();
    let dict = PyDict::new(py);
    dict.set_item("time", to_unix_seconds(result.instant))?;
    dict.set_item("minutes_since_epoch", result.minutes_since_epoch)?;
    dict.set_item("latitude", latitude)?;
    dict.set_item("longitude", longitude)?;
    dict.set_item("altitude_km", result.altitude())?;
    dict.set_item("velocity_km_s", result.velocity())?;
    dict.set_item("period_s", result.period())?;
    dict.set_item("position_eci", result.state.r.to_vec())?;
    dict.set_item("velocity_eci", result.state.v.to_vec())?;
    Ok(dict)
}

// TLE
#[pyclass(name = "TLE")]
#[derive(Clone)]
pub struct PyTle {
    inner: Tle,
}

#[pymethods]
impl PyTle {
    /// Parse a TLE from two lines.
    #[staticmethod]
    fn parse(line1: &str, line2: &str) -> PyResult<Self> {
        Tle::parse(line1, line2)
            .map(|t| PyTle { inner: t })
            .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))
    }

    /// Parse a TLE from three lines (name + line1 + line2).
    #[staticmethod]
    fn parse_3line(name: &str, line1: &str, line2: &str) -> PyResult<Self> {
        Tle::parse_3line(name, line1, line2)
            .map(|t| PyTle { inner: t })
            .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))
    }

    /// Parse a batch of TLEs from a multi-line string.
    #[staticmethod]
    fn parse_batch(text: &str) -> PyResult<Vec<PyTle>> {
        Tle::parse_batch(text)
            .map(|tles| tles.into_iter().map(|t| PyTle { inner: t }).collect())
            .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))
    }

    /// Minutes from epoch to a Unix timestamp.
    fn minutes_since_epoch(&self, unix_seconds: f64) -> PyResult<f64> {
        Ok(self.inner.minutes_since_epoch(to_instant(unix_seconds)?))
    }

    /// Epoch as a Unix timestamp.
    #[getter] fn epoch(&self) -> f64 { to_unix_seconds(self.inner.epoch) }
    #[getter] fn name(&self) -> Option<String> { self.inner.name.clone() }
    #[getter] fn catalog_number(&self) -> u32 { self.inner.catalog_number }
    #[getter] fn designator(&self) -> String { self.inner.designator.clone() }
    #[getter] fn inclination(&self) -> f64 { self.inner.inclination }
    #[getter] fn right_ascension(&self) -> f64 { self.inner.right_ascension }
    #[getter] fn eccentricity(&self) -> f64 { self.inner.eccentricity }
    #[getter] fn argument_of_perigee(&self) -> f64 { self.inner.argument_of_perigee }
    #[getter] fn mean_anomaly(&self) -> f64 { self.inner.mean_anomaly }
    #[getter] fn mean_motion(&self) -> f64 { self.inner.mean_motion }
    #[getter] fn drag_term(&self) -> f64 { self.inner.drag_term }

    fn __repr__(&self) -> String {
        format!("{}", self.inner)
    }
}

// Orbit
#[pyclass(name = "Orbit")]
#[derive(Clone)]
pub struct PyOrbit {
    inner: Orbit,
}

#[pymethods]
impl PyOrbit {
    /// Build an orbit engine; `wgs72=True` selects the WGS-72 Earth radius.
    #[new]
    #[pyo3(signature = (tle, wgs72=false))]
    fn new(tle: &PyTle, wgs72: bool) -> Self {
        let gravity = if wgs72 { GravityModel::wgs72() } else { GravityModel::wgs84() };
        PyOrbit { inner: Orbit::with_gravity(tle.inner.clone(), gravity) }
    }

    /// Propagate to a Unix timestamp (current time when omitted).
    #[pyo3(signature = (unix_seconds=None))]
    fn propagate<'py>(&self, py: Python<'py>, unix_seconds: Option<f64>) -> PyResult<Bound<'py, PyDict>> {
        let result = match unix_seconds {
            Some(t) => self.inner.propagate(to_instant(t)?),
            None => self.inner.propagate_now(),
        };
        result_dict(py, &result)
    }

    /// Orbital period (seconds).
    fn period(&self) -> f64 { self.inner.period() }

    fn __repr__(&self) -> String {
        format!("Orbit({})", self.inner.tle())
    }
}

// Satellite
#[pyclass(name = "Satellite")]
pub struct PySatellite {
    inner: Satellite,
}

#[pymethods]
impl PySatellite {
    #[new]
    #[pyo3(signature = (tle, path_length=0.5, samples_per_orbit=180))]
    fn new(tle: &PyTle, path_length: f64, samples_per_orbit: u32) -> Self {
        let config = TrackConfig { path_length, samples_per_orbit };
        PySatellite { inner: Satellite::new(tle.inner.clone(), config) }
    }

    #[getter] fn title(&self) -> String { self.inner.title() }

    /// (latitude, longitude) in degrees at a Unix timestamp.
    fn position(&self, unix_seconds: f64) -> PyResult<(f64, f64)> {
        let p = self.inner.position_at(to_instant(unix_seconds)?);
        Ok((p.latitude, p.longitude))
    }

    /// Ground track from a Unix timestamp.
    ///
    /// Returns list of [time, latitude, longitude, altitude_km, night] rows.
    fn ground_track(&self, py: Python<'_>, unix_seconds: f64) -> PyResult<Vec<(f64, f64, f64, f64, bool)>> {
        let start = to_instant(unix_seconds)?;
        let track = py.allow_threads(|| self.inner.ground_track(start));
        Ok(track
            .points
            .iter()
            .map(|p| (to_unix_seconds(p.instant), p.latitude, p.longitude, p.altitude, p.night))
            .collect())
    }

    /// Night-side runs of the ground track, as index ranges [start, end).
    fn night_segments(&self, py: Python<'_>, unix_seconds: f64) -> PyResult<Vec<(usize, usize)>> {
        let start = to_instant(unix_seconds)?;
        let track = py.allow_threads(|| self.inner.ground_track(start));
        Ok(track.night_ranges().into_iter().map(|r| (r.start, r.end)).collect())
    }
}

// Free functions
#[pyfunction]
fn propagate_fleet<'py>(py: Python<'py>, orbits: Vec<PyOrbit>, unix_seconds: f64) -> PyResult<Vec<Bound<'py, PyDict>>> {
    let instant = to_instant(unix_seconds)?;
    let engines: Vec<Orbit> = orbits.into_iter().map(|o| o.inner).collect();
    let results = py.allow_threads(|| crate::orbit::propagate_fleet(&engines, instant));
    results.iter().map(|r| result_dict(py, r)).collect()
}

#[pyfunction]
fn gmst(unix_seconds: f64) -> PyResult<f64> {
    Ok(crate::time::gmst(to_instant(unix_seconds)?))
}

// Module registration
pub fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyTle>()?;
    m.add_class::<PyOrbit>()?;
    m.add_class::<PySatellite>()?;
    m.add_function(wrap_pyfunction!(propagate_fleet, m)?)?;
    m.add_function(wrap_pyfunction!(gmst, m)?)?;
    Ok(())
}
