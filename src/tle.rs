//! Two-line element sets.
//!
//! Reads the fixed-column NORAD format, with or without a name line, and
//! rejects anything that fails the line markers, the mod-10 checksum or the
//! element range checks. A [`Tle`] is the validated element source every
//! [`Orbit`](crate::orbit::Orbit) is built from.
//!
//! ```text
//! ISS (ZARYA)
//! 1 25544U 98067A   24001.50000000  .00016717  00000-0  10270-3 0  9009
//! 2 25544  51.6400 208.5000 0007417  68.0000 292.1000 15.49560000400004
//! ```
//!
//! ```
//! use orbtrack::tle::Tle;
//!
//! let tle = Tle::parse(
//!     "1 25544U 98067A   24001.50000000  .00016717  00000-0  10270-3 0  9009",
//!     "2 25544  51.6400 208.5000 0007417  68.0000 292.1000 15.49560000400004",
//! )
//! .unwrap();
//! assert_eq!(tle.catalog_number, 25544);
//! ```

use std::ops::Range;
use std::str::FromStr;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::elements::ElementSet;

/// Data line width, checksum column included.
const LINE_WIDTH: usize = 69;

/// Why a pair of lines is not a usable element set.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TleError {
    #[error("line {line} must start with '{line}', found {found:?}")]
    LineMarker { line: u8, found: Option<char> },

    #[error("line {line} is {len} columns, need at least 69 ASCII columns")]
    LineWidth { line: u8, len: usize },

    #[error("line {line} checksum is {expected}, computed {computed}")]
    Checksum { line: u8, expected: u8, computed: u8 },

    #[error("catalog number {line1} on line 1 does not match {line2} on line 2")]
    CatalogMismatch { line1: u32, line2: u32 },

    #[error("line {line} field `{field}` is not a number: {text:?}")]
    Field { line: u8, field: &'static str, text: String },

    #[error("{field} {value} is outside its valid range")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("epoch year {0} cannot be represented")]
    Epoch(i32),

    #[error("no element sets found")]
    Empty,
}

/// A validated element set in catalog units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tle {
    /// Name line, when one preceded the data lines.
    pub name: Option<String>,
    pub catalog_number: u32,
    pub classification: char,
    /// International designator, e.g. `98067A`.
    pub designator: String,
    pub epoch: DateTime<Utc>,
    /// ṅ/2 (rev/day²)
    pub first_derivative: f64,
    /// n̈/6 (rev/day³)
    pub second_derivative: f64,
    /// B* drag term (1/Earth radii).
    pub drag_term: f64,
    pub element_number: u16,
    /// Degrees
    pub inclination: f64,
    /// Right ascension of the ascending node (degrees).
    pub right_ascension: f64,
    pub eccentricity: f64,
    /// Degrees
    pub argument_of_perigee: f64,
    /// Degrees
    pub mean_anomaly: f64,
    /// Revolutions per day.
    pub mean_motion: f64,
    pub revolution_number: u32,
}

impl Tle {
    /// Parse the two data lines.
    pub fn parse(line1: &str, line2: &str) -> Result<Self, TleError> {
        Self::from_lines(None, line1, line2)
    }

    /// Parse a name line followed by the two data lines.
    pub fn parse_3line(name: &str, line1: &str, line2: &str) -> Result<Self, TleError> {
        Self::from_lines(Some(name.trim().to_string()), line1, line2)
    }

    /// Parse every element set in `text`.
    ///
    /// Two-line and three-line sets may be mixed. Blank lines are ignored and
    /// any line that is neither a name directly before a data pair nor part of
    /// one is skipped. A malformed data pair is an error.
    pub fn parse_batch(text: &str) -> Result<Vec<Self>, TleError> {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty())
            .collect();
        let is_pair = |at: usize| {
            at + 1 < lines.len() && lines[at].starts_with('1') && lines[at + 1].starts_with('2')
        };

        let mut sets = Vec::new();
        let mut at = 0;
        while at < lines.len() {
            if is_pair(at) {
                sets.push(Self::parse(lines[at], lines[at + 1])?);
                at += 2;
            } else if is_pair(at + 1) {
                sets.push(Self::parse_3line(lines[at], lines[at + 1], lines[at + 2])?);
                at += 3;
            } else {
                log::debug!("skipping line {at} of element input: {:?}", lines[at]);
                at += 1;
            }
        }

        if sets.is_empty() {
            Err(TleError::Empty)
        } else {
            Ok(sets)
        }
    }

    fn from_lines(name: Option<String>, line1: &str, line2: &str) -> Result<Self, TleError> {
        let l1 = data_line(1, line1)?;
        let l2 = data_line(2, line2)?;

        let catalog_number = field(l1, 1, 2..7, "catalog number")?;
        let line2_catalog = field(l2, 2, 2..7, "catalog number")?;
        if catalog_number != line2_catalog {
            return Err(TleError::CatalogMismatch { line1: catalog_number, line2: line2_catalog });
        }

        // Two-digit years: 57..=99 are 19xx, 00..=56 are 20xx
        let yy: i32 = field(l1, 1, 18..20, "epoch year")?;
        let year = if yy < 57 { 2000 + yy } else { 1900 + yy };
        let day_of_year = finite(field(l1, 1, 20..32, "epoch day")?, "epoch day")?;

        // Leading decimal point is implied
        let ecc_digits = l2[26..33].trim();
        let eccentricity: f64 = format!("0.{ecc_digits}").parse().map_err(|_| TleError::Field {
            line: 2,
            field: "eccentricity",
            text: ecc_digits.to_string(),
        })?;
        if !(0.0..1.0).contains(&eccentricity) {
            return Err(TleError::OutOfRange { field: "eccentricity", value: eccentricity });
        }
        let mean_motion: f64 = field(l2, 2, 52..63, "mean motion")?;
        if !(mean_motion.is_finite() && mean_motion > 0.0) {
            return Err(TleError::OutOfRange { field: "mean motion", value: mean_motion });
        }

        Ok(Tle {
            name,
            catalog_number,
            classification: char::from(l1.as_bytes()[7]),
            designator: l1[9..17].trim().to_string(),
            epoch: epoch_from_day(year, day_of_year)?,
            first_derivative: field(l1, 1, 33..43, "first derivative")?,
            second_derivative: implied_decimal(&l1[44..52], "second derivative")?,
            drag_term: implied_decimal(&l1[53..61], "drag term")?,
            // Bookkeeping counters only; some catalogs leave them blank
            element_number: field(l1, 1, 64..68, "element number").unwrap_or(0),
            inclination: finite(field(l2, 2, 8..16, "inclination")?, "inclination")?,
            right_ascension: finite(field(l2, 2, 17..25, "right ascension")?, "right ascension")?,
            eccentricity,
            argument_of_perigee: finite(field(l2, 2, 34..42, "argument of perigee")?, "argument of perigee")?,
            mean_anomaly: finite(field(l2, 2, 43..51, "mean anomaly")?, "mean anomaly")?,
            mean_motion,
            revolution_number: field(l2, 2, 63..68, "revolution number").unwrap_or(0),
        })
    }

    /// Epoch instant; day 1.0 of the epoch year is January 1st 00:00 UTC.
    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    /// Minutes from epoch to `instant`, negative before epoch.
    pub fn minutes_since_epoch(&self, instant: DateTime<Utc>) -> f64 {
        let elapsed = instant - self.epoch;
        elapsed.num_seconds() as f64 / 60.0 + f64::from(elapsed.subsec_nanos()) / 6.0e10
    }

    /// Elements in propagator units.
    pub fn elements(&self) -> ElementSet {
        ElementSet::from_degrees(
            self.inclination,
            self.right_ascension,
            self.eccentricity,
            self.argument_of_perigee,
            self.mean_anomaly,
            self.mean_motion,
            self.drag_term,
        )
    }
}

impl std::fmt::Display for Tle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{name} ")?;
        }
        write!(
            f,
            "#{} epoch {} i={:.4}° e={:.7} n={:.8} rev/day",
            self.catalog_number,
            self.epoch.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.inclination,
            self.eccentricity,
            self.mean_motion,
        )
    }
}

/// Check the line marker, width and checksum of one data line.
fn data_line(line: u8, text: &str) -> Result<&str, TleError> {
    let text = text.trim_end();
    let marker = char::from(b'0' + line);
    if !text.starts_with(marker) {
        return Err(TleError::LineMarker { line, found: text.chars().next() });
    }
    if text.len() < LINE_WIDTH || !text.is_ascii() {
        return Err(TleError::LineWidth { line, len: text.chars().count() });
    }

    let expected = match text.as_bytes()[LINE_WIDTH - 1] {
        d @ b'0'..=b'9' => d - b'0',
        _ => 0,
    };
    let computed = checksum(&text[..LINE_WIDTH - 1]);
    if expected != computed {
        return Err(TleError::Checksum { line, expected, computed });
    }
    Ok(text)
}

/// Mod-10 sum of the digits, with each '-' counting as one.
fn checksum(text: &str) -> u8 {
    let total = text.bytes().fold(0u32, |sum, b| match b {
        b'0'..=b'9' => sum + u32::from(b - b'0'),
        b'-' => sum + 1,
        _ => sum,
    });
    (total % 10) as u8
}

/// Parse the trimmed text of `columns` (clamped to the line).
fn field<T: FromStr>(text: &str, line: u8, columns: Range<usize>, name: &'static str) -> Result<T, TleError> {
    let end = columns.end.min(text.len());
    let raw = text[columns.start.min(end)..end].trim();
    raw.parse().map_err(|_| TleError::Field { line, field: name, text: raw.to_string() })
}

/// `str::parse` accepts `NaN` and `inf`; no element field may hold either.
fn finite(value: f64, name: &'static str) -> Result<f64, TleError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TleError::OutOfRange { field: name, value })
    }
}

/// Decode the `±NNNNN±E` notation, a mantissa with an implied leading
/// decimal point and a power-of-ten exponent: `-11606-4` is `-0.11606e-4`.
fn implied_decimal(text: &str, name: &'static str) -> Result<f64, TleError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(0.0);
    }
    let (sign, unsigned) = match text.as_bytes()[0] {
        b'-' => ("-", &text[1..]),
        b'+' => ("", &text[1..]),
        _ => ("", text),
    };
    let (mantissa, exponent) = match unsigned.rfind(['+', '-']) {
        Some(at) if at > 0 => unsigned.split_at(at),
        _ => (unsigned, "+0"),
    };
    format!("{sign}0.{}e{exponent}", mantissa.trim())
        .parse()
        .map_err(|_| TleError::Field { line: 1, field: name, text: text.to_string() })
}

fn epoch_from_day(year: i32, day_of_year: f64) -> Result<DateTime<Utc>, TleError> {
    let new_year = Utc
        .with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .ok_or(TleError::Epoch(year))?;
    let offset_ns = ((day_of_year - 1.0) * 86_400.0e9).round() as i64;
    Ok(new_year + Duration::nanoseconds(offset_ns))
}
