use serde::Serialize;

use crate::models::TrackPoint;

/// Mean earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Track point with coordinates in real degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
    pub alt: i16,
    pub speed: u16,
    pub heart: u16,
    pub delta: u8,
}

impl From<&TrackPoint> for GeoPoint {
    fn from(p: &TrackPoint) -> Self {
        Self {
            lat: f64::from(p.lat) / 1_000_000.0,
            lon: f64::from(p.lon) / 1_000_000.0,
            alt: p.alt,
            speed: p.speed,
            heart: p.heart,
            delta: p.delta,
        }
    }
}

/// Earth-centered cartesian coordinates; altitude adds to the radius
pub fn cartesian(p: &GeoPoint) -> [f64; 3] {
    let lat = p.lat.to_radians();
    let lon = p.lon.to_radians();
    let h = EARTH_RADIUS_M + f64::from(p.alt);
    [
        h * lat.cos() * lon.cos(),
        h * lat.cos() * lon.sin(),
        h * lat.sin(),
    ]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Heading change at `b` in degrees, walking a -> b -> c
///
/// A zero-length leg yields 0.
pub fn turn_angle(a: &GeoPoint, b: &GeoPoint, c: &GeoPoint) -> f64 {
    let (ca, cb, cc) = (cartesian(a), cartesian(b), cartesian(c));
    let u = sub(cb, ca);
    let v = sub(cc, cb);
    let norm = dot(u, u).sqrt() * dot(v, v).sqrt();
    if norm == 0.0 {
        return 0.0;
    }
    (dot(u, v) / norm).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Convert to degrees and drop points turning by no more than `angle` degrees
///
/// The output always opens with the first point twice. With `angle == 0`
/// every point is kept as is.
pub fn reduce(points: &[TrackPoint], angle: f64) -> Vec<GeoPoint> {
    let converted: Vec<GeoPoint> = points.iter().map(GeoPoint::from).collect();
    if angle == 0.0 {
        return converted;
    }
    let Some(&first) = converted.first() else {
        return converted;
    };

    let mut window = [first, first];
    let mut kept = vec![first, first];
    for &candidate in &converted {
        let turn = turn_angle(&window[0], &window[1], &candidate);
        window = [window[1], candidate];
        if turn > angle {
            kept.push(candidate);
        }
    }
    kept
}
