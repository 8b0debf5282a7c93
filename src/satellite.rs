//! Tracked satellite with ground-track sampling and day/night split.
use std::ops::Range;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::geodetic::{great_circle_distance, horizon_distance};
use crate::orbit::Orbit;
use crate::time::{sun_subpoint, LatLon};
use crate::tle::Tle;

/// Ground-track sampling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackConfig {
    /// Track length in orbits.
    pub path_length: f64,
    /// Samples per full orbit.
    pub samples_per_orbit: u32,
}

impl Default for TrackConfig {
    fn default() -> Self {
        TrackConfig {
            path_length: 0.5,
            samples_per_orbit: 180,
        }
    }
}

impl TrackConfig {
    /// Number of samples in a track, start point included.
    pub fn sample_count(&self) -> usize {
        let samples = f64::from(self.samples_per_orbit);
        // Shorter than one step (or unset): just the start point
        if !(self.path_length >= 1.0 / samples) {
            return 1;
        }
        (samples * self.path_length).floor() as usize + 2
    }
}

/// One ground-track sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub instant: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// Height above the ellipsoid (km).
    pub altitude: f64,
    /// Sub-satellite point is on the night side.
    pub night: bool,
}

impl TrackPoint {
    pub fn lat_lon(&self) -> LatLon {
        LatLon { latitude: self.latitude, longitude: self.longitude }
    }
}

/// Sampled ground track in time order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTrack {
    pub points: Vec<TrackPoint>,
}

impl GroundTrack {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Index ranges of the maximal runs of consecutive night samples.
    pub fn night_ranges(&self) -> Vec<Range<usize>> {
        let mut ranges = Vec::new();
        let mut start = 0;
        for run in self.points.chunk_by(|a, b| a.night == b.night) {
            if run[0].night {
                ranges.push(start..start + run.len());
            }
            start += run.len();
        }
        ranges
    }

    /// Maximal runs of consecutive night samples.
    pub fn night_segments(&self) -> Vec<&[TrackPoint]> {
        self.night_ranges().into_iter().map(|r| &self.points[r]).collect()
    }
}

/// A named orbit that can report where it is and where it is going.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Satellite {
    orbit: Orbit,
    config: TrackConfig,
}

impl Satellite {
    pub fn new(tle: Tle, config: TrackConfig) -> Self {
        Satellite { orbit: Orbit::new(tle), config }
    }

    pub fn from_orbit(orbit: Orbit, config: TrackConfig) -> Self {
        Satellite { orbit, config }
    }

    /// Satellite name, or the catalog number when the TLE had no name line.
    pub fn title(&self) -> String {
        match &self.orbit.tle().name {
            Some(name) => name.clone(),
            None => format!("NORAD {}", self.orbit.tle().catalog_number),
        }
    }

    pub fn orbit(&self) -> &Orbit {
        &self.orbit
    }

    pub fn config(&self) -> &TrackConfig {
        &self.config
    }

    /// Sub-satellite point at `instant`.
    pub fn position_at(&self, instant: DateTime<Utc>) -> LatLon {
        self.orbit.propagate(instant).geodetic.lat_lon()
    }

    /// Sample the ground track forward from `start`.
    ///
    /// Samples are one `period / samples_per_orbit` apart. Each is computed
    /// independently, so they are evaluated in parallel.
    pub fn ground_track(&self, start: DateTime<Utc>) -> GroundTrack {
        use rayon::prelude::*;

        let count = self.config.sample_count();
        let step_ns = self.orbit.period() * 1e9 / f64::from(self.config.samples_per_orbit);

        let points: Vec<TrackPoint> = (0..count)
            .into_par_iter()
            .map(|i| {
                let offset = Duration::nanoseconds((step_ns * i as f64).round() as i64);
                self.track_point(start + offset)
            })
            .collect();

        log::debug!(
            "{}: {} track samples from {start}, {} night",
            self.title(),
            points.len(),
            points.iter().filter(|p| p.night).count()
        );
        GroundTrack { points }
    }

    fn track_point(&self, instant: DateTime<Utc>) -> TrackPoint {
        let result = self.orbit.propagate(instant);
        let geo = result.geodetic;
        TrackPoint {
            instant,
            latitude: geo.latitude,
            longitude: geo.longitude,
            altitude: geo.altitude,
            night: is_night(geo.lat_lon(), geo.altitude, sun_subpoint(instant)),
        }
    }
}

/// True when `point` lies beyond the terminator by more than the horizon
/// distance seen from `altitude_km`.
pub fn is_night(point: LatLon, altitude_km: f64, sun: LatLon) -> bool {
    let quarter_circumference = std::f64::consts::FRAC_PI_2 * MEAN_EARTH_RADIUS_M;
    let horizon = horizon_distance((altitude_km * 1000.0).max(0.0));
    great_circle_distance(sun, point) > quarter_circumference + horizon
}
