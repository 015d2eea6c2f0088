// src/geodesy.rs

use std::f64::consts::PI;

use serde::Serialize;
use tracing::debug;

use crate::geo::{Coordinate, normalize_longitude};

/* ---------------- CONSTANTES ---------------- */

// Mean radius of the Earth in meters (spherical model).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
// Great-circle distance between a point and its antipode (πR).
pub const HALF_CIRCUMFERENCE_M: f64 = PI * EARTH_RADIUS_M;
// Angular radius of the circle equidistant from a point and its antipode (πR/2).
pub const QUARTER_CIRCUMFERENCE_M: f64 = HALF_CIRCUMFERENCE_M / 2.0;
// Conversion factor kilometers → miles.
pub const KM_TO_MILES: f64 = 0.621371;

/* ---------------- NUMERIC UTILS -------------- */

// Rounding of a floating-point number to N decimal places (max 10).
pub fn round(value: f64, decimals: u32) -> f64 {
    let precision = decimals.min(10);
    let factor = 10_f64.powi(precision as i32);
    (value * factor).round() / factor
}

/* ---------------- DISTANCE --------------- */

/// Haversine great-circle distance in meters.
///
/// `a` is clamped to `[0, 1]` before the square root so that rounding near
/// the antipode cannot push `asin` out of its domain. The result is always
/// within `[0, πR]`.
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    let (lat1, lon1) = a.to_radians();
    let (lat2, lon2) = b.to_radians();

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.clamp(0.0, 1.0).sqrt().asin()
}

/// Initial bearing in degrees `[0, 360)` of the great circle from `from` to `to`.
pub fn initial_bearing(from: Coordinate, to: Coordinate) -> f64 {
    let (lat1, lon1) = from.to_radians();
    let (lat2, lon2) = to.to_radians();
    let dlon = lon2 - lon1;

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    y.atan2(x).to_degrees().rem_euclid(360.0)
}

/* ---------------- ANTIPODE --------------- */

/// The point diametrically opposite `c`.
pub fn antipode(c: Coordinate) -> Coordinate {
    Coordinate::from_geometry(-c.lat(), normalize_longitude(c.lon() + 180.0))
}

/// A home point together with its antipode.
///
/// The antipode is derived on construction only, so the pair can never hold
/// a stale antipode for a different home.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AntipodalPair {
    home: Coordinate,
    antipode: Coordinate,
}

impl AntipodalPair {
    pub fn new(home: Coordinate) -> Self {
        Self { home, antipode: antipode(home) }
    }

    pub fn home(&self) -> Coordinate {
        self.home
    }

    pub fn antipode(&self) -> Coordinate {
        self.antipode
    }

    pub fn focus(&self, focus: Focus) -> Coordinate {
        match focus {
            Focus::Home => self.home,
            Focus::Antipode => self.antipode,
        }
    }
}

/* ---------------- NEAREST FOCUS --------------- */

// One of the two poles of an antipodal pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Focus {
    Home,
    Antipode,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FocusDistance {
    pub focus: Focus,
    pub distance_m: f64,
}

/// Which of `home` and `antipode` lies closer to `point`.
///
/// Ties resolve to [`Focus::Home`]. A tie means `point` sits exactly on the
/// equidistant great circle, where either pole describes the same boundary.
pub fn nearest_focus(point: Coordinate, home: Coordinate, antipode: Coordinate) -> FocusDistance {
    let to_home = distance(point, home);
    let to_antipode = distance(point, antipode);

    let nearest = if to_home <= to_antipode {
        FocusDistance { focus: Focus::Home, distance_m: to_home }
    } else {
        FocusDistance { focus: Focus::Antipode, distance_m: to_antipode }
    };
    debug!(%point, to_home, to_antipode, focus = ?nearest.focus, "nearest focus");
    nearest
}

/* ---------------- DIRECT PROBLEM --------------- */

/// Spherical direct geodesic problem: the point reached by travelling
/// `distance_m` along the great circle leaving `origin` at `bearing_deg`.
///
/// Valid for any bearing and for distances up to πR; at πR every bearing
/// lands on the antipode of `origin`.
pub fn destination_point(origin: Coordinate, bearing_deg: f64, distance_m: f64) -> Coordinate {
    let (lat1, lon1) = origin.to_radians();
    let delta = distance_m / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();

    let (sin_lat1, cos_lat1) = lat1.sin_cos();
    let (sin_delta, cos_delta) = delta.sin_cos();

    let sin_lat2 = (sin_lat1 * cos_delta + cos_lat1 * sin_delta * theta.cos()).clamp(-1.0, 1.0);
    let lat2 = sin_lat2.asin();

    let y = theta.sin() * sin_delta * cos_lat1;
    let x = cos_delta - sin_lat1 * sin_lat2;
    let lon2 = lon1 + y.atan2(x);

    Coordinate::from_geometry(lat2.to_degrees(), lon2.to_degrees())
}

/* ---------------- TEST ---------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoTolerance;

    const EPS_M: f64 = 1.0;

    fn c(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    fn samples() -> Vec<Coordinate> {
        vec![
            c(0.0, 0.0),
            c(51.5, -0.12),
            c(-33.8688, 151.2093),
            c(90.0, 0.0),
            c(-90.0, 45.0),
            c(12.3, 180.0),
            c(-45.0, -179.999),
            c(89.9, 179.9),
            c(-0.0001, -90.0),
        ]
    }

    #[test]
    fn test_round_basic() {
        assert_eq!(round(1.23456, 2), 1.23);
        assert_eq!(round(-1.23456, 3), -1.235);
    }

    #[test]
    fn test_distance_zero_and_symmetric() {
        let pts = samples();
        for &a in &pts {
            assert_eq!(distance(a, a), 0.0);
            for &b in &pts {
                assert!((distance(a, b) - distance(b, a)).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_distance_known_value() {
        // Eiffel Tower to Statue of Liberty, ~5837 km.
        let d = distance(c(48.8582, 2.2942), c(40.6893, -74.0441));
        assert!((d / 1000.0 - 5837.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn test_distance_to_antipode_is_half_circumference() {
        for p in samples() {
            let d = distance(p, antipode(p));
            assert!((d - HALF_CIRCUMFERENCE_M).abs() < EPS_M, "{p}: {d}");
        }
    }

    #[test]
    fn test_antipode_involution() {
        for p in samples() {
            let back = antipode(antipode(p));
            assert!(back.approx_eq(p, GeoTolerance { deg: 1e-9 }), "{p} -> {back}");
        }
    }

    #[test]
    fn test_antipode_keeps_decimal_input() {
        let home = c(51.5, -0.12);
        let pair = AntipodalPair::new(home);
        assert_eq!(pair.home().lon().to_bits(), (-0.12f64).to_bits());
        assert_eq!(pair.antipode().lat(), -51.5);

        // 179.88 carries fewer fraction bits than -0.12, so the round trip
        // only holds to a few ulps of 180.
        let back = antipode(pair.antipode());
        assert_eq!(back.lat(), 51.5);
        assert!((back.lon() + 0.12).abs() < 1e-12, "{}", back.lon());

        for lon in [-179.5, -90.25, 45.125, 120.0, 180.0] {
            let p = c(-33.0, lon);
            assert_eq!(antipode(antipode(p)), p, "{lon}");
        }
    }

    #[test]
    fn test_antipode_of_origin() {
        let a = antipode(c(0.0, 0.0));
        assert_eq!(a.lat(), 0.0);
        assert_eq!(a.lon(), 180.0);
    }

    #[test]
    fn test_london_scenario() {
        let home = c(51.5, -0.12);
        let a = antipode(home);
        assert_eq!(a.lat(), -51.5);
        assert!((a.lon() - 179.88).abs() < 1e-9);
        assert!((distance(home, a) - 20_015_086.0).abs() < 2.0);
    }

    #[test]
    fn test_sum_of_distances_to_pair_is_constant() {
        let home = c(51.5, -0.12);
        let anti = antipode(home);
        let mut lat = -90.0;
        while lat <= 90.0 {
            let mut lon = -179.0;
            while lon <= 180.0 {
                let x = c(lat, lon);
                let sum = distance(x, home) + distance(x, anti);
                assert!((sum - HALF_CIRCUMFERENCE_M).abs() < EPS_M, "{x}: {sum}");
                lon += 17.0;
            }
            lat += 7.5;
        }
    }

    #[test]
    fn test_nearest_focus() {
        let home = c(10.0, 20.0);
        let anti = antipode(home);

        let near_home = nearest_focus(c(11.0, 21.0), home, anti);
        assert_eq!(near_home.focus, Focus::Home);

        let at_anti = nearest_focus(anti, home, anti);
        assert_eq!(at_anti.focus, Focus::Antipode);
        assert_eq!(at_anti.distance_m, 0.0);
    }

    #[test]
    fn test_nearest_focus_tie_resolves_to_home() {
        // The north pole lies on the equidistant circle of an equatorial pair.
        let home = c(0.0, 0.0);
        let anti = antipode(home);
        let pole = c(90.0, 0.0);
        let r = nearest_focus(pole, home, anti);
        assert_eq!(r.focus, Focus::Home);
        assert!((r.distance_m - QUARTER_CIRCUMFERENCE_M).abs() < EPS_M);
    }

    #[test]
    fn test_destination_point_matches_distance() {
        let origin = c(51.5, -0.12);
        let mut bearing = 0.0;
        while bearing < 360.0 {
            for d in [1_000.0, 500_000.0, QUARTER_CIRCUMFERENCE_M, 19_000_000.0] {
                let p = destination_point(origin, bearing, d);
                assert!((distance(origin, p) - d).abs() < EPS_M, "b={bearing} d={d}");
            }
            bearing += 22.5;
        }
    }

    #[test]
    fn test_destination_point_north_and_east() {
        let origin = c(0.0, 0.0);
        let north = destination_point(origin, 0.0, QUARTER_CIRCUMFERENCE_M);
        assert!((north.lat() - 90.0).abs() < 1e-9);

        let east = destination_point(origin, 90.0, QUARTER_CIRCUMFERENCE_M);
        assert!(east.lat().abs() < 1e-9);
        assert!((east.lon() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_destination_point_wraps_longitude() {
        let p = destination_point(c(0.0, 170.0), 90.0, 20.0 * 111_194.93);
        assert!(p.lon() < 0.0 && p.lon() > -180.0, "got {p}");
        assert!((p.lon() + 170.0).abs() < 1e-3);
    }

    #[test]
    fn test_destination_point_half_circumference_reaches_antipode() {
        let origin = c(40.0, -74.0);
        let anti = antipode(origin);
        for bearing in [0.0, 45.0, 133.0, 270.0, 359.0] {
            let p = destination_point(origin, bearing, HALF_CIRCUMFERENCE_M);
            assert!(distance(p, anti) < EPS_M, "bearing {bearing}: {p}");
        }
    }

    #[test]
    fn test_initial_bearing() {
        let origin = c(0.0, 0.0);
        assert!((initial_bearing(origin, c(10.0, 0.0)) - 0.0).abs() < 1e-9);
        assert!((initial_bearing(origin, c(0.0, 10.0)) - 90.0).abs() < 1e-9);
        assert!((initial_bearing(origin, c(0.0, -10.0)) - 270.0).abs() < 1e-9);
    }
}
