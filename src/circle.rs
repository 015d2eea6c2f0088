// src/circle.rs

use serde::Serialize;
use tracing::debug;

use crate::geo::Coordinate;
use crate::geodesy::destination_point;

/* ---------------- STEPS ---------------- */

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CircleError {
    #[error("a geodesic circle needs at least {min} steps (got {got})")]
    TooFewSteps { got: usize, min: usize },
}

// Number of bearings sampled around a geodesic circle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircleSteps(usize);

impl CircleSteps {
    pub const MIN: usize = 8;
    pub const DEFAULT: Self = Self(128);

    pub fn new(steps: usize) -> Result<Self, CircleError> {
        if steps < Self::MIN {
            return Err(CircleError::TooFewSteps { got: steps, min: Self::MIN });
        }
        Ok(Self(steps))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for CircleSteps {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/* ---------------- POLYGON ---------------- */

/// An open ring of coordinates; the renderer closes it.
///
/// The first point is not repeated at the end.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GeodesicPolygon {
    points: Vec<Coordinate>,
}

impl GeodesicPolygon {
    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }
}

/* ---------------- BUILD ---------------- */

pub struct GeodesicCircle;

impl GeodesicCircle {
    /// Samples `steps` equally spaced bearings starting at 0° and returns the
    /// destination point for each one.
    ///
    /// A zero radius (or a negative/NaN one) yields `steps` copies of
    /// `center`. A radius near πR collapses every sample onto the antipode
    /// of `center`; that is the correct shape and is left as is.
    pub fn build(center: Coordinate, radius_m: f64, steps: CircleSteps) -> GeodesicPolygon {
        let n = steps.get();
        let radius_m = if radius_m > 0.0 { radius_m } else { 0.0 };

        let points = (0..n)
            .map(|i| {
                let bearing = 360.0 * i as f64 / n as f64;
                destination_point(center, bearing, radius_m)
            })
            .collect();

        debug!(%center, radius_m, steps = n, "geodesic circle built");
        GeodesicPolygon { points }
    }
}

/* ---------------- TEST ---------------- */
