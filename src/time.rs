//! Time and Earth-rotation utilities.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::*;

/// A point on the Earth's surface (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub latitude: f64,
    pub longitude: f64,
}

/// Julian date of a UTC instant.
pub fn julian_date(instant: DateTime<Utc>) -> f64 {
    let secs = instant.timestamp() as f64 + f64::from(instant.timestamp_subsec_nanos()) * 1e-9;
    secs / SOLAR_DAY + JD_UNIX_EPOCH
}

/// Greenwich Mean Sidereal Time (GMST) in radians, in [0, 2π).
pub fn gmst(instant: DateTime<Utc>) -> f64 {
    // IAU 1982, in seconds of time with UT1 ≈ UTC
    let t = (julian_date(instant) - JD_J2000) / 36525.0;
    let seconds = 67310.54841 + (876600.0 * 3600.0 + 8640184.812866) * t + 0.093104 * t * t
        - 6.2e-6 * t * t * t;
    let theta = (seconds * DEG2RAD / 240.0) % TAU;
    if theta < 0.0 { theta + TAU } else { theta }
}

/// Sub-solar point estimate (NOAA low-precision solar position).
///
/// Latitude is the solar declination; longitude follows from the equation
/// of time. Good to a few hundredths of a degree, enough to split a ground
/// track into day and night.
pub fn sun_subpoint(instant: DateTime<Utc>) -> LatLon {
    let minutes_past_midnight = f64::from(instant.num_seconds_from_midnight()) / 60.0
        + f64::from(instant.nanosecond() % 1_000_000_000) / 6.0e10;
    let jc = (julian_date(instant) - JD_J2000) / 36525.0;

    let mean_long = (280.46646 + jc * (36000.76983 + jc * 0.0003032)) % 360.0;
    let mean_anom = 357.52911 + jc * (35999.05029 - 0.0001537 * jc);
    let center = (DEG2RAD * mean_anom).sin() * (1.914602 - jc * (0.004817 + 0.000014 * jc))
        + (2.0 * DEG2RAD * mean_anom).sin() * (0.019993 - 0.000101 * jc)
        + (3.0 * DEG2RAD * mean_anom).sin() * 0.000289;
    let true_long = mean_long + center;
    let omega = DEG2RAD * (125.04 - 1934.136 * jc);
    let apparent_long = true_long - 0.00569 - 0.00478 * omega.sin();

    let mean_obliquity =
        23.0 + (26.0 + (21.448 - jc * (46.815 + jc * (0.00059 - jc * 0.001813))) / 60.0) / 60.0;
    let obliquity = mean_obliquity + 0.00256 * omega.cos();
    let declination =
        ((DEG2RAD * obliquity).sin() * (DEG2RAD * apparent_long).sin()).asin() * RAD2DEG;

    let eccent = 0.016708634 - jc * (0.000042037 + 0.0000001267 * jc);
    let y = (DEG2RAD * obliquity / 2.0).tan().powi(2);
    let l0 = DEG2RAD * mean_long;
    let m = DEG2RAD * mean_anom;
    let eq_of_time = 4.0
        * RAD2DEG
        * (y * (2.0 * l0).sin() - 2.0 * eccent * m.sin()
            + 4.0 * eccent * y * m.sin() * (2.0 * l0).cos()
            - 0.5 * y * y * (4.0 * l0).sin()
            - 1.25 * eccent * eccent * (2.0 * m).sin());

    let true_solar_time = (minutes_past_midnight + eq_of_time).rem_euclid(MINUTES_PER_DAY);
    // Solar noon at Greenwich puts the sun over longitude 0
    let longitude = 180.0 - true_solar_time / 4.0;

    LatLon { latitude: declination, longitude }
}
