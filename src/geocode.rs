// src/geocode.rs

use std::collections::HashSet;
use std::path::Path;

use csv::ReaderBuilder;
use serde::Deserialize;
use tracing::{debug, info};

use crate::geo::{CoordError, Coordinate, SexagesimalError, parse_decimal_pair, parse_sexagesimal_pair};

/* ---------------- COLLABORATOR CONTRACT ---------------- */

// One geocoding answer, in decimal degrees.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Candidate {
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
}

// Failure of the lookup service itself (not an empty answer).
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("geocoder unavailable: {0}")]
    Unavailable(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing header field '{0}'")]
    MissingHeaderField(String),
}

/// Resolves free text to zero or more candidates, best match first.
///
/// An empty vector is "not found"; `Err` means the service could not answer.
pub trait Geocoder {
    fn lookup(&self, query: &str) -> Result<Vec<Candidate>, GeocodeError>;
}

/* ---------------- GAZETTEER ---------------- */

// Required CSV headers (order-independent).
const REQUIRED_HEADERS: &[&str] = &["name", "lat", "lon"];

/// Offline place table: case-insensitive exact name lookup over a CSV file
/// with `name,lat,lon` columns.
#[derive(Debug, Clone, Default)]
pub struct Gazetteer {
    places: Vec<Candidate>,
}

impl Gazetteer {
    pub fn new(places: Vec<Candidate>) -> Self {
        Self { places }
    }

    pub fn from_path(path: &Path) -> Result<Self, GeocodeError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let headers: HashSet<String> = reader.headers()?.iter().map(str::to_string).collect();
        for &h in REQUIRED_HEADERS {
            if !headers.contains(h) {
                return Err(GeocodeError::MissingHeaderField(h.to_string()));
            }
        }

        let places = reader
            .deserialize::<Candidate>()
            .collect::<Result<Vec<_>, _>>()?;

        let gazetteer = Self::new(places);
        info!(path = %path.display(), places = gazetteer.len(), "gazetteer loaded");
        Ok(gazetteer)
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}

// With no places loaded there is nothing to ask, which is not the same as
// a name that is missing from the table.
impl Geocoder for Gazetteer {
    fn lookup(&self, query: &str) -> Result<Vec<Candidate>, GeocodeError> {
        if self.is_empty() {
            return Err(GeocodeError::Unavailable("no places loaded (see --places)".into()));
        }
        let needle = query.trim().to_lowercase();
        Ok(self
            .places
            .iter()
            .filter(|p| p.display_name.to_lowercase() == needle)
            .cloned()
            .collect())
    }
}

/* ---------------- LOCATION INPUT ---------------- */

// Errors surfaced to the user when resolving a location.
// All of them leave the session untouched.
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("location not found: '{0}'")]
    InvalidInput(String),
    #[error("error retrieving location ({0}), please retry")]
    GeocodingUnavailable(#[source] GeocodeError),
    #[error("coordinate out of range ({0})")]
    OutOfRangeCoordinate(#[from] CoordError),
    #[error("invalid coordinate ({0})")]
    Sexagesimal(#[from] SexagesimalError),
}

// A resolved location and the label to show next to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Located {
    pub coordinate: Coordinate,
    pub label: String,
}

/// Turns user text into a coordinate.
///
/// Decimal pairs win, then DMS/DDM pairs, then the geocoder. Only the first
/// candidate is used.
pub fn resolve_location(input: &str, geocoder: &dyn Geocoder) -> Result<Located, LocationError> {
    let input = input.trim();

    if let Some(coordinate) = parse_decimal_pair(input)? {
        return Ok(Located { coordinate, label: coordinate.to_string() });
    }
    if let Some(coordinate) = parse_sexagesimal_pair(input)? {
        return Ok(Located { coordinate, label: coordinate.to_dms() });
    }
    if input.is_empty() {
        return Err(LocationError::InvalidInput(String::new()));
    }

    let candidates = geocoder
        .lookup(input)
        .map_err(LocationError::GeocodingUnavailable)?;
    let first = candidates
        .into_iter()
        .next()
        .ok_or_else(|| LocationError::InvalidInput(input.to_string()))?;

    let coordinate = Coordinate::new(first.latitude, first.longitude)?;
    debug!(query = input, %coordinate, "geocoded");
    Ok(Located { coordinate, label: first.display_name })
}

/* ---------------- TEST ---------------- */
