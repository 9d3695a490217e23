//! Geodetic helpers shared by the estimator, sampler and camera.
//!
//! Everything here is a pure function over plain `f64`/`GeoPoint` values and
//! is safe to call from any thread.

use std::f64::consts::PI;

use crate::types::{GeoPoint, MercatorPoint, SphereVec};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Mercator scale factor (1 / 2π).
pub const MERCATOR_SCALE: f64 = 1.0 / (2.0 * PI);

/// Above this dot product slerp degrades to planar lng/lat interpolation.
pub const SLERP_DOT_THRESHOLD: f64 = 0.9999;

const SLERP_MIN_SIN: f64 = 1e-12;

#[inline]
pub fn deg_to_rad(deg: f64) -> f64 {
    deg * PI / 180.0
}

#[inline]
pub fn rad_to_deg(rad: f64) -> f64 {
    rad * 180.0 / PI
}

/// Reduces any bearing into [0, 360). Non-finite input maps to 0.
pub fn normalize_bearing(deg: f64) -> f64 {
    if !deg.is_finite() {
        return 0.0;
    }
    let b = deg.rem_euclid(360.0);
    // rem_euclid rounds tiny negatives up to exactly 360.0
    if b >= 360.0 {
        0.0
    } else {
        b
    }
}

/// Signed rotation in (-180, 180] that takes `from` onto `to` the short way.
pub fn shortest_bearing_delta(from: f64, to: f64) -> f64 {
    let mut diff = normalize_bearing(to) - normalize_bearing(from);
    if diff > 180.0 {
        diff -= 360.0;
    } else if diff < -180.0 {
        diff += 360.0;
    }
    diff
}

/// Linear bearing interpolation along the shortest rotational path.
pub fn interpolate_bearing(from: f64, to: f64, t: f64) -> f64 {
    normalize_bearing(from + shortest_bearing_delta(from, to) * t)
}

/// Forward projection. Diverges at |lat| = 90; callers keep points inside
/// the Mercator band (see `GeoPoint::new`).
pub fn to_mercator(lng: f64, lat: f64) -> MercatorPoint {
    let lat_rad = deg_to_rad(lat);
    MercatorPoint {
        x: lng * MERCATOR_SCALE,
        y: (PI / 4.0 + lat_rad / 2.0).tan().ln() * MERCATOR_SCALE,
    }
}

pub fn from_mercator(x: f64, y: f64) -> GeoPoint {
    let lat_rad = 2.0 * (y / MERCATOR_SCALE).exp().atan() - PI / 2.0;
    GeoPoint {
        lng: x / MERCATOR_SCALE,
        lat: rad_to_deg(lat_rad),
    }
}

/// Great-circle distance in meters.
pub fn haversine_distance(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let d_lat = deg_to_rad(p2.lat - p1.lat);
    let d_lng = deg_to_rad(p2.lng - p1.lng);
    let a = (d_lat / 2.0).sin().powi(2)
        + deg_to_rad(p1.lat).cos() * deg_to_rad(p2.lat).cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
    EARTH_RADIUS_M * c
}

/// Initial great-circle bearing from `p1` toward `p2`, in [0, 360).
///
/// Coincident points yield atan2(0, 0) = 0; callers special-case zero
/// distance.
pub fn initial_bearing(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let lat1 = deg_to_rad(p1.lat);
    let lat2 = deg_to_rad(p2.lat);
    let d_lng = deg_to_rad(p2.lng - p1.lng);
    let y = d_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lng.cos();
    normalize_bearing(rad_to_deg(y.atan2(x)))
}

/// Point reached by travelling `distance_m` from `origin` at `bearing` degrees.
pub fn destination(origin: &GeoPoint, bearing: f64, distance_m: f64) -> GeoPoint {
    let delta = distance_m / EARTH_RADIUS_M;
    let theta = deg_to_rad(bearing);
    let lat1 = deg_to_rad(origin.lat);
    let lng1 = deg_to_rad(origin.lng);

    let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos())
        .clamp(-1.0, 1.0)
        .asin();
    let lng2 = lng1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

    GeoPoint::new(rad_to_deg(lng2), rad_to_deg(lat2))
}

fn to_sphere(p: &GeoPoint) -> SphereVec {
    let phi = deg_to_rad(90.0 - p.lat);
    let theta = deg_to_rad(p.lng);
    SphereVec::new(phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos())
}

fn from_sphere(v: &SphereVec) -> GeoPoint {
    let phi = v.z.clamp(-1.0, 1.0).acos();
    GeoPoint::new(rad_to_deg(v.y.atan2(v.x)), 90.0 - rad_to_deg(phi))
}

fn lerp_planar(p1: &GeoPoint, p2: &GeoPoint, t: f64) -> GeoPoint {
    GeoPoint::new(
        p1.lng + (p2.lng - p1.lng) * t,
        p1.lat + (p2.lat - p1.lat) * t,
    )
}

/// Spherical linear interpolation between two positions.
///
/// Nearly coincident points (dot > 0.9999, about 0.8° apart) and exactly
/// antipodal points fall back to planar lng/lat interpolation.
pub fn slerp(p1: &GeoPoint, p2: &GeoPoint, t: f64) -> GeoPoint {
    let a = to_sphere(p1);
    let b = to_sphere(p2);
    let dot = a.dot(&b).clamp(-1.0, 1.0);

    if dot > SLERP_DOT_THRESHOLD {
        return lerp_planar(p1, p2, t);
    }

    let omega = dot.acos();
    let sin_omega = omega.sin();
    if sin_omega.abs() < SLERP_MIN_SIN {
        return lerp_planar(p1, p2, t);
    }

    let wa = ((1.0 - t) * omega).sin() / sin_omega;
    let wb = (t * omega).sin() / sin_omega;
    from_sphere(&(a * wa + b * wb))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use geo::{point, HaversineBearing, HaversineDistance};

    fn sample_points() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(-122.4194, 37.7749),
            GeoPoint::new(139.6917, 35.6895),
            GeoPoint::new(151.2093, -33.8688),
            GeoPoint::new(-179.5, 60.0),
            GeoPoint::new(179.5, -60.0),
        ]
    }

    #[test]
    fn test_normalize_bearing_range_and_period() {
        for d in [-1080.5, -360.0, -0.0, -1e-20, 0.0, 45.0, 359.999, 360.0, 725.25, 1e9] {
            let n = normalize_bearing(d);
            assert!((0.0..360.0).contains(&n), "{} -> {}", d, n);
            assert_abs_diff_eq!(n, normalize_bearing(d + 360.0), epsilon = 1e-6);
        }
        assert_eq!(normalize_bearing(f64::NAN), 0.0);
    }

    #[test]
    fn test_shortest_delta_wraps() {
        assert_abs_diff_eq!(shortest_bearing_delta(350.0, 10.0), 20.0, epsilon = 1e-12);
        assert_abs_diff_eq!(shortest_bearing_delta(10.0, 350.0), -20.0, epsilon = 1e-12);
        assert_abs_diff_eq!(shortest_bearing_delta(90.0, 180.0), 90.0, epsilon = 1e-12);
        assert_abs_diff_eq!(interpolate_bearing(350.0, 10.0, 0.5), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mercator_roundtrip() {
        for p in sample_points() {
            let m = to_mercator(p.lng, p.lat);
            let back = from_mercator(m.x, m.y);
            assert_abs_diff_eq!(back.lng, p.lng, epsilon = 1e-9);
            assert_abs_diff_eq!(back.lat, p.lat, epsilon = 1e-9);
        }
        let origin = to_mercator(0.0, 0.0);
        assert_abs_diff_eq!(origin.x, 0.0);
        assert_abs_diff_eq!(origin.y, 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_mercator_pole_diverges() {
        let m = to_mercator(0.0, 90.0);
        assert!(!m.y.is_finite() || m.y.abs() > 1.0);
    }

    #[test]
    fn test_distance_symmetry() {
        let pts = sample_points();
        for a in &pts {
            for b in &pts {
                let ab = haversine_distance(a, b);
                let ba = haversine_distance(b, a);
                assert!((ab - ba).abs() <= 1e-9 * ab.max(1.0));
            }
        }
    }

    #[test]
    fn test_distance_matches_geo_crate() {
        // geo uses the IUGG mean radius (6371008.8 m), hence the loose bound
        let sf = GeoPoint::new(-122.4194, 37.7749);
        let la = GeoPoint::new(-118.2437, 34.0522);
        let ours = haversine_distance(&sf, &la);
        let theirs = point!(x: sf.lng, y: sf.lat).haversine_distance(&point!(x: la.lng, y: la.lat));
        assert!((ours - theirs).abs() / theirs < 1e-5);
    }

    #[test]
    fn test_bearing_matches_geo_crate() {
        let sf = GeoPoint::new(-122.4194, 37.7749);
        let la = GeoPoint::new(-118.2437, 34.0522);
        let ours = initial_bearing(&sf, &la);
        let theirs = point!(x: sf.lng, y: sf.lat).haversine_bearing(point!(x: la.lng, y: la.lat));
        assert_abs_diff_eq!(ours, normalize_bearing(theirs), epsilon = 1e-6);
    }

    #[test]
    fn test_initial_bearing_cardinals() {
        let o = GeoPoint::new(0.0, 0.0);
        assert_abs_diff_eq!(initial_bearing(&o, &GeoPoint::new(0.0, 1.0)), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(initial_bearing(&o, &GeoPoint::new(1.0, 0.0)), 90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(initial_bearing(&o, &GeoPoint::new(0.0, -1.0)), 180.0, epsilon = 1e-9);
        assert_abs_diff_eq!(initial_bearing(&o, &GeoPoint::new(-1.0, 0.0)), 270.0, epsilon = 1e-9);
        assert_eq!(initial_bearing(&o, &o), 0.0);
    }

    #[test]
    fn test_destination_inverts_bearing_and_distance() {
        let start = GeoPoint::new(-110.9, 32.2);
        let end = destination(&start, 10.0, 500.0);
        assert_abs_diff_eq!(haversine_distance(&start, &end), 500.0, epsilon = 1e-6);
        assert_abs_diff_eq!(initial_bearing(&start, &end), 10.0, epsilon = 1e-6);
    }

    #[test]
    fn test_slerp_endpoints() {
        let pts = sample_points();
        for a in &pts {
            for b in &pts {
                if a == b {
                    continue;
                }
                let s0 = slerp(a, b, 0.0);
                let s1 = slerp(a, b, 1.0);
                assert_abs_diff_eq!(s0.lat, a.lat, epsilon = 1e-9);
                assert_abs_diff_eq!(s1.lat, b.lat, epsilon = 1e-9);
                assert_abs_diff_eq!(shortest_bearing_delta(s0.lng, a.lng), 0.0, epsilon = 1e-9);
                assert_abs_diff_eq!(shortest_bearing_delta(s1.lng, b.lng), 0.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_slerp_near_identical_uses_planar_midpoint() {
        let a = GeoPoint::new(12.0, 45.0);
        let b = GeoPoint::new(12.5, 45.5);
        let mid = slerp(&a, &b, 0.5);
        assert_eq!(mid.lng, 12.25);
        assert_eq!(mid.lat, 45.25);
    }

    #[test]
    fn test_slerp_great_circle_midpoint() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(90.0, 0.0);
        let mid = slerp(&a, &b, 0.5);
        assert_abs_diff_eq!(mid.lng, 45.0, epsilon = 1e-9);
        assert_abs_diff_eq!(mid.lat, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_slerp_antipodal_is_finite() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(180.0, 0.0);
        let mid = slerp(&a, &b, 0.5);
        assert!(mid.lng.is_finite() && mid.lat.is_finite());
    }
}
