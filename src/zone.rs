// src/zone.rs

use std::fmt;

use clap::ValueEnum;
use serde::Serialize;
use tracing::debug;

use crate::circle::{CircleSteps, GeodesicCircle, GeodesicPolygon};
use crate::geo::Coordinate;
use crate::geodesy::{
    AntipodalPair, Focus, HALF_CIRCUMFERENCE_M, QUARTER_CIRCUMFERENCE_M, nearest_focus,
};

/* ---------------- POLICY ---------------- */

// How the zone boundary is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ZonePolicy {
    // Exact equidistant great circle at a quarter circumference from home.
    #[default]
    Fixed,
    // Circle around the nearest focus passing through the probe.
    Probe,
}

impl fmt::Display for ZonePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ZonePolicy::Fixed => "fixed",
            ZonePolicy::Probe => "probe",
        };
        write!(f, "{s}")
    }
}

// What a zone actually represents, so an approximation is never shown as exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    EquidistantBoundary,
    ThroughProbe,
}

impl ZoneKind {
    pub fn label(self) -> &'static str {
        match self {
            ZoneKind::EquidistantBoundary => "Equidistant boundary",
            ZoneKind::ThroughProbe => "Zone through probe",
        }
    }
}

/* ---------------- ZONE ---------------- */

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Zone {
    pub center: Coordinate,
    pub radius_m: f64,
    pub focus: Focus,
    pub kind: ZoneKind,
}

impl Zone {
    pub fn radius_km(&self) -> f64 {
        self.radius_m / 1000.0
    }

    // e.g. "Equidistant boundary (radius 10007.54 km)"
    pub fn label(&self) -> String {
        format!("{} (radius {:.2} km)", self.kind.label(), self.radius_km())
    }
}

// A zone together with its sampled polygon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedZone {
    pub zone: Zone,
    pub polygon: GeodesicPolygon,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ZoneError {
    #[error("the probe policy needs a probe point")]
    MissingProbe,
}

/* ---------------- RESOLVER ---------------- */

#[derive(Debug, Clone, Copy, Default)]
pub struct ZoneResolver {
    steps: CircleSteps,
}

impl ZoneResolver {
    pub fn new(steps: CircleSteps) -> Self {
        Self { steps }
    }

    /// Runs the whole pipeline for `policy` from the current pair.
    ///
    /// The fixed policy ignores `probe`; the probe policy requires it.
    pub fn resolve(
        &self,
        policy: ZonePolicy,
        pair: &AntipodalPair,
        probe: Option<Coordinate>,
    ) -> Result<ResolvedZone, ZoneError> {
        match policy {
            ZonePolicy::Fixed => Ok(self.equidistant(pair)),
            ZonePolicy::Probe => {
                let probe = probe.ok_or(ZoneError::MissingProbe)?;
                Ok(self.through_probe(pair, probe))
            }
        }
    }

    /// The exact locus of points equally far from home and antipode: the
    /// great circle a quarter circumference away from home.
    pub fn equidistant(&self, pair: &AntipodalPair) -> ResolvedZone {
        let zone = Zone {
            center: pair.home(),
            radius_m: QUARTER_CIRCUMFERENCE_M,
            focus: Focus::Home,
            kind: ZoneKind::EquidistantBoundary,
        };
        self.finish(zone)
    }

    /// Circle around whichever pole is nearer to `probe`, passing through it.
    ///
    /// Only coincides with the equidistant boundary when the probe already
    /// lies on that boundary, hence [`ZoneKind::ThroughProbe`].
    pub fn through_probe(&self, pair: &AntipodalPair, probe: Coordinate) -> ResolvedZone {
        let nearest = nearest_focus(probe, pair.home(), pair.antipode());
        let zone = Zone {
            center: pair.focus(nearest.focus),
            radius_m: nearest.distance_m,
            focus: nearest.focus,
            kind: ZoneKind::ThroughProbe,
        };
        self.finish(zone)
    }

    fn finish(&self, zone: Zone) -> ResolvedZone {
        debug_assert!(
            (0.0..=HALF_CIRCUMFERENCE_M).contains(&zone.radius_m),
            "zone radius {} outside [0, πR]",
            zone.radius_m
        );
        let polygon = GeodesicCircle::build(zone.center, zone.radius_m, self.steps);
        debug!(
            center = %zone.center,
            radius_m = zone.radius_m,
            kind = ?zone.kind,
            vertices = polygon.len(),
            "zone resolved"
        );
        ResolvedZone { zone, polygon }
    }
}

/* ---------------- TEST ---------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::distance;

    fn c(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    fn resolver() -> ZoneResolver {
        ZoneResolver::new(CircleSteps::new(64).unwrap())
    }

    #[test]
    fn test_fixed_zone_at_origin() {
        let pair = AntipodalPair::new(c(0.0, 0.0));
        let r = resolver().resolve(ZonePolicy::Fixed, &pair, None).unwrap();
        assert_eq!(r.zone.kind, ZoneKind::EquidistantBoundary);
        assert!((r.zone.radius_m - 10_007_543.0).abs() < 1.0);
        assert_eq!(r.polygon.len(), 64);
    }

    #[test]
    fn test_fixed_zone_is_equidistant_everywhere() {
        for home in [c(51.5, -0.12), c(-89.0, 10.0), c(12.0, 179.5)] {
            let pair = AntipodalPair::new(home);
            let r = resolver().equidistant(&pair);
            for p in r.polygon.points() {
                let dh = distance(*p, pair.home());
                let da = distance(*p, pair.antipode());
                assert!((dh - da).abs() < 1.0, "{p}: {dh} vs {da}");
            }
        }
    }

    #[test]
    fn test_fixed_zone_ignores_probe() {
        let pair = AntipodalPair::new(c(40.0, -74.0));
        let with = resolver().resolve(ZonePolicy::Fixed, &pair, Some(c(1.0, 1.0))).unwrap();
        let without = resolver().resolve(ZonePolicy::Fixed, &pair, None).unwrap();
        assert_eq!(with, without);
    }

    #[test]
    fn test_probe_policy_requires_probe() {
        let pair = AntipodalPair::new(c(40.0, -74.0));
        assert_eq!(
            resolver().resolve(ZonePolicy::Probe, &pair, None),
            Err(ZoneError::MissingProbe)
        );
    }

    #[test]
    fn test_probe_zone_passes_through_probe() {
        let pair = AntipodalPair::new(c(48.85, 2.35));
        let probe = c(30.0, 10.0);
        let r = resolver().through_probe(&pair, probe);
        assert_eq!(r.zone.kind, ZoneKind::ThroughProbe);
        assert_eq!(r.zone.focus, Focus::Home);
        assert_eq!(r.zone.center, pair.home());
        assert!((distance(r.zone.center, probe) - r.zone.radius_m).abs() < 1e-6);
    }

    #[test]
    fn test_probe_nearer_antipode_centers_on_antipode() {
        let pair = AntipodalPair::new(c(48.85, 2.35));
        let r = resolver().through_probe(&pair, c(-40.0, -170.0));
        assert_eq!(r.zone.focus, Focus::Antipode);
        assert_eq!(r.zone.center, pair.antipode());
    }

    #[test]
    fn test_probe_at_antipode_degenerates_to_point() {
        let pair = AntipodalPair::new(c(51.5, -0.12));
        let r = resolver().through_probe(&pair, pair.antipode());
        assert_eq!(r.zone.focus, Focus::Antipode);
        assert_eq!(r.zone.radius_m, 0.0);
        assert_eq!(r.polygon.len(), 64);
        assert!(r.polygon.points().iter().all(|p| distance(*p, pair.antipode()) < 1e-6));
    }

    #[test]
    fn test_zone_label() {
        let pair = AntipodalPair::new(c(0.0, 0.0));
        let r = resolver().equidistant(&pair);
        assert_eq!(r.zone.label(), "Equidistant boundary (radius 10007.54 km)");
    }
}
