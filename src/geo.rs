// src/geo.rs

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/* ---------------- DOMAIN TYPES ---------------- */

// Indicates whether an angle is a latitude or a longitude.
// Used to apply correct bounds and valid directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Axis::Latitude => "latitude",
            Axis::Longitude => "longitude",
        };
        write!(f, "{s}")
    }
}

// Identifies which field of a sexagesimal angle failed during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleField {
    Deg,
    Min,
    Sec,
    Dir,
}

impl fmt::Display for AngleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AngleField::Deg => "degrees",
            AngleField::Min => "minutes",
            AngleField::Sec => "seconds",
            AngleField::Dir => "direction",
        };
        write!(f, "{s}")
    }
}

/* ---------------- LONGITUDE NORMALIZATION ---------------- */

// Maps any finite degree value into (-180, 180] by modular wraparound.
// In-range values come back bit-for-bit; -180 becomes 180.
pub fn normalize_longitude(lon: f64) -> f64 {
    if lon > -180.0 && lon <= 180.0 {
        return lon;
    }
    let wrapped = lon - 360.0 * ((lon - 180.0) / 360.0).ceil();
    if wrapped <= -180.0 {
        wrapped + 360.0
    } else if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/* ---------------- COORDINATE ---------------- */

// Errors raised at the Coordinate boundary, before any geometry runs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoordError {
    #[error("latitude {lat} out of range [-90, 90]")]
    LatitudeOutOfRange { lat: f64 },
    #[error("{axis} is not a finite number")]
    NotFinite { axis: Axis },
}

/// A validated point on the sphere in decimal degrees.
///
/// Latitude lies in `[-90, 90]`; longitude is always kept in `(-180, 180]`.
/// Values are immutable: every transformation yields a new `Coordinate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    lat: f64,
    lon: f64,
}

impl Coordinate {
    /// Validates the latitude and wraps the longitude.
    ///
    /// Out-of-range latitudes are rejected, never clamped.
    pub fn new(lat: f64, lon: f64) -> Result<Self, CoordError> {
        if !lat.is_finite() {
            return Err(CoordError::NotFinite { axis: Axis::Latitude });
        }
        if !lon.is_finite() {
            return Err(CoordError::NotFinite { axis: Axis::Longitude });
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoordError::LatitudeOutOfRange { lat });
        }
        Ok(Self { lat, lon: normalize_longitude(lon) })
    }

    // Results of spherical trigonometry. The latitude comes out of asin and
    // may only drift past the poles by rounding.
    pub(crate) fn from_geometry(lat: f64, lon: f64) -> Self {
        Self {
            lat: lat.clamp(-90.0, 90.0),
            lon: normalize_longitude(lon),
        }
    }

    pub fn lat(self) -> f64 {
        self.lat
    }

    pub fn lon(self) -> f64 {
        self.lon
    }

    /// Latitude and longitude in radians.
    pub fn to_radians(self) -> (f64, f64) {
        (self.lat.to_radians(), self.lon.to_radians())
    }

    /// Compares two coordinates axis by axis with a tolerance in degrees.
    ///
    /// Longitudes are compared across the antimeridian, and every longitude
    /// is equivalent at a pole.
    pub fn approx_eq(self, other: Coordinate, tol: GeoTolerance) -> bool {
        let lat_ok = (self.lat - other.lat).abs() <= tol.deg;
        if !lat_ok {
            return false;
        }
        if (self.lat.abs() - 90.0).abs() <= tol.deg {
            return true;
        }
        normalize_longitude(self.lon - other.lon).abs() <= tol.deg
    }

    /// Human-readable DMS rendering, e.g. `51°30'0.00"N, 0°7'12.00"W`.
    pub fn to_dms(self) -> String {
        format!(
            "{}, {}",
            dd_to_dms(self.lat, Axis::Latitude),
            dd_to_dms(self.lon, Axis::Longitude)
        )
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/* ---------------- COMPARISON ---------------- */

// Tolerance expressed in decimal degrees.
#[derive(Debug, Copy, Clone)]
pub struct GeoTolerance {
    pub deg: f64,
}

impl GeoTolerance {
    // Default tolerance (~11 cm at the equator).
    pub const DEFAULT: Self = Self { deg: 1e-6 };
}

/* ---------------- DECIMAL PAIR ---------------- */

// "<lat>,<lon>" with optional sign and optional space after the comma.
static DECIMAL_PAIR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([-+]?\d+(?:\.\d+)?)\s*,\s*([-+]?\d+(?:\.\d+)?)\s*$")
        .expect("Invalid decimal pair regex")
});

// Parses a decimal "<lat>,<lon>" literal.
// Ok(None) means the text is not a decimal pair at all.
pub fn parse_decimal_pair(input: &str) -> Result<Option<Coordinate>, CoordError> {
    let Some(caps) = DECIMAL_PAIR_RE.captures(input) else {
        return Ok(None);
    };

    let lat: f64 = caps[1]
        .parse()
        .map_err(|_| CoordError::NotFinite { axis: Axis::Latitude })?;
    let lon: f64 = caps[2]
        .parse()
        .map_err(|_| CoordError::NotFinite { axis: Axis::Longitude })?;

    Coordinate::new(lat, lon).map(Some)
}

/* ---------------- SEXAGESIMAL ---------------- */

// Errors related to the numeric content of a sexagesimal angle.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AngleError {
    #[error("angle out of range ({deg}°)")]
    OutOfRange { deg: f64 },
    #[error("invalid degree value")]
    InvalidDegree { deg: f64 },
    #[error("invalid minutes value")]
    InvalidMinutes { min: f64 },
    #[error("invalid seconds value")]
    InvalidSeconds { sec: f64 },
    #[error("invalid direction `{0}`")]
    InvalidDirection(char),
}

// Raw sexagesimal angle as read from the input.
struct Angle {
    deg: f64,
    min: f64,
    sec: f64,
    dir: char,
}

// Validates a sexagesimal angle and converts it to decimal degrees.
fn angle_to_dd(angle: Angle, axis: Axis) -> Result<f64, AngleError> {
    let eps = 1e-12;
    let limit = match axis {
        Axis::Latitude => 90.0,
        Axis::Longitude => 180.0,
    };

    if angle.deg < 0.0 {
        return Err(AngleError::InvalidDegree { deg: angle.deg });
    }
    if angle.min < 0.0 || angle.min >= 60.0 {
        return Err(AngleError::InvalidMinutes { min: angle.min });
    }
    if angle.sec < 0.0 || angle.sec >= 60.0 {
        return Err(AngleError::InvalidSeconds { sec: angle.sec });
    }
    if angle.deg > limit + eps
        || ((angle.deg - limit).abs() < eps && (angle.min > 0.0 || angle.sec > 0.0))
    {
        return Err(AngleError::OutOfRange { deg: angle.deg });
    }

    let negative = match (axis, angle.dir) {
        (Axis::Latitude, 'N') | (Axis::Longitude, 'E') => false,
        (Axis::Latitude, 'S') | (Axis::Longitude, 'W' | 'O') => true,
        (_, dir) => return Err(AngleError::InvalidDirection(dir)),
    };

    let value = angle.deg + angle.min / 60.0 + angle.sec / 3600.0;
    Ok(if negative { -value } else { value })
}

// Degrees / minutes / optional seconds / direction.
// Supports ASCII and Unicode prime symbols.
static SEXAGESIMAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?x)^\s*
            (.+?)                       # degrees
            \s*°\s*
            (.+?)                       # minutes
            \s*['′]\s*
            (?:(.+?)\s*["″]\s*)?        # seconds
            (.)                         # direction
            \s*$"#,
    )
    .expect("Invalid sexagesimal regex")
});

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SexagesimalError {
    #[error("invalid DMS/DDM format")]
    InvalidFormat,
    #[error("invalid {axis} field: {field}")]
    InvalidField { axis: Axis, field: AngleField },
    #[error("invalid {axis} ({source})")]
    InvalidAngle { axis: Axis, source: AngleError },
    #[error("invalid coordinate ({0})")]
    InvalidCoord(#[from] CoordError),
}

fn parse_field(raw: Option<regex::Match<'_>>, axis: Axis, field: AngleField) -> Result<f64, SexagesimalError> {
    let raw = raw.ok_or(SexagesimalError::InvalidFormat)?.as_str().trim();
    let value: f64 = raw
        .parse()
        .map_err(|_| SexagesimalError::InvalidField { axis, field })?;
    if !value.is_finite() {
        return Err(SexagesimalError::InvalidField { axis, field });
    }
    Ok(value)
}

// Parses one DMS (`48°51'29"N`) or DDM (`48°51.48'N`) angle.
pub fn sexagesimal_to_dd(input: &str, axis: Axis) -> Result<f64, SexagesimalError> {
    let caps = SEXAGESIMAL_RE
        .captures(input)
        .ok_or(SexagesimalError::InvalidFormat)?;

    let deg = parse_field(caps.get(1), axis, AngleField::Deg)?;
    let min = parse_field(caps.get(2), axis, AngleField::Min)?;
    let sec = match caps.get(3) {
        Some(_) => parse_field(caps.get(3), axis, AngleField::Sec)?,
        None => 0.0,
    };
    let dir = caps
        .get(4)
        .and_then(|m| m.as_str().chars().next())
        .ok_or(SexagesimalError::InvalidField { axis, field: AngleField::Dir })?
        .to_ascii_uppercase();

    angle_to_dd(Angle { deg, min, sec, dir }, axis)
        .map_err(|source| SexagesimalError::InvalidAngle { axis, source })
}

// Parses a "<lat>, <lon>" pair written in DMS or DDM.
// Ok(None) means the text carries no degree sign and is not sexagesimal.
pub fn parse_sexagesimal_pair(input: &str) -> Result<Option<Coordinate>, SexagesimalError> {
    if !input.contains('°') {
        return Ok(None);
    }
    let (lat_raw, lon_raw) = input
        .split_once(',')
        .ok_or(SexagesimalError::InvalidFormat)?;

    let lat = sexagesimal_to_dd(lat_raw, Axis::Latitude)?;
    let lon = sexagesimal_to_dd(lon_raw, Axis::Longitude)?;

    Ok(Some(Coordinate::new(lat, lon)?))
}

/* ---------------- FORMATTING ---------------- */

// Converts decimal degrees to a DMS string with hundredths of a second.
// Rounding happens on the total so seconds never print as 60.
pub fn dd_to_dms(value: f64, axis: Axis) -> String {
    let dir = match axis {
        Axis::Latitude => if value >= 0.0 { 'N' } else { 'S' },
        Axis::Longitude => if value >= 0.0 { 'E' } else { 'W' },
    };

    let hundredths = (value.abs() * 360_000.0).round() as u64;
    let deg = hundredths / 360_000;
    let min = (hundredths % 360_000) / 6_000;
    let sec = (hundredths % 6_000) as f64 / 100.0;

    format!("{deg}°{min}'{sec:.2}\"{dir}")
}

/* ---------------- TEST ---------------- */
