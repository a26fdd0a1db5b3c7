use serde::{Deserialize, Serialize};

pub mod config;
pub mod units;
pub mod world;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

const KM_PER_DEG: f64 = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;

/// A position on the sphere, in degrees.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(lat: f64, lon: f64) -> Location {
        Location { lat, lon }
    }

    /// Great-circle distance in km (haversine).
    pub fn distance(&self, other: &Location) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// Initial bearing towards `other`, degrees clockwise from north.
    pub fn bearing(&self, other: &Location) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlon = (other.lon - self.lon).to_radians();
        let y = dlon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
        y.atan2(x).to_degrees().rem_euclid(360.0)
    }

    /// Point a fraction `f` of the way along the great circle to `other`.
    pub fn intermediate(&self, other: &Location, f: f64) -> Location {
        let d = self.distance(other) / EARTH_RADIUS_KM;
        if d < 1e-12 {
            return *self;
        }
        let f = f.clamp(0.0, 1.0);
        let lat1 = self.lat.to_radians();
        let lon1 = self.lon.to_radians();
        let lat2 = other.lat.to_radians();
        let lon2 = other.lon.to_radians();
        let a = ((1.0 - f) * d).sin() / d.sin();
        let b = (f * d).sin() / d.sin();
        let x = a * lat1.cos() * lon1.cos() + b * lat2.cos() * lon2.cos();
        let y = a * lat1.cos() * lon1.sin() + b * lat2.cos() * lon2.sin();
        let z = a * lat1.sin() + b * lat2.sin();
        Location {
            lat: z.atan2((x * x + y * y).sqrt()).to_degrees(),
            lon: y.atan2(x).to_degrees(),
        }
    }

    /// Position at time `t` when travelling from `self` (departing `t_start`)
    /// to `other` (arriving `t_end`), linearly in elapsed time.
    pub fn position_at(&self, other: &Location, t_start: f64, t_end: f64, t: f64) -> Location {
        if t_end <= t_start {
            return *other;
        }
        self.intermediate(other, (t - t_start) / (t_end - t_start))
    }

    /// Offsets of `other` relative to `self` in a local flat frame, km east/north.
    pub fn local_offset_km(&self, other: &Location) -> (f64, f64) {
        let x = (other.lon - self.lon) * KM_PER_DEG * self.lat.to_radians().cos();
        let y = (other.lat - self.lat) * KM_PER_DEG;
        (x, y)
    }

    /// Location displaced by km east/north in the local flat frame.
    pub fn offset_km(&self, east: f64, north: f64) -> Location {
        Location {
            lat: self.lat + north / KM_PER_DEG,
            lon: self.lon + east / (KM_PER_DEG * self.lat.to_radians().cos()),
        }
    }

    /// Closest point to `self` on the segment a--b, in the local flat frame.
    pub fn closest_point_on_segment(&self, a: &Location, b: &Location) -> Location {
        let (ax, ay) = self.local_offset_km(a);
        let (bx, by) = self.local_offset_km(b);
        let (dx, dy) = (bx - ax, by - ay);
        let len2 = dx * dx + dy * dy;
        if len2 < 1e-12 {
            return *a;
        }
        let t = (-(ax * dx + ay * dy) / len2).clamp(0.0, 1.0);
        a.intermediate(b, t)
    }
}

/// Ray-cast containment test. Points on the boundary count as inside.
pub fn polygon_contains(polygon: &[Location], p: &Location) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (&polygon[j], &polygon[i]);
        if on_segment(a, b, p) {
            return true;
        }
        if (a.lat > p.lat) != (b.lat > p.lat) {
            let lon_at = a.lon + (p.lat - a.lat) / (b.lat - a.lat) * (b.lon - a.lon);
            if p.lon < lon_at {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn on_segment(a: &Location, b: &Location, p: &Location) -> bool {
    let cross = (b.lat - a.lat) * (p.lon - a.lon) - (b.lon - a.lon) * (p.lat - a.lat);
    if cross.abs() > 1e-9 {
        return false;
    }
    p.lat >= a.lat.min(b.lat) - 1e-9
        && p.lat <= a.lat.max(b.lat) + 1e-9
        && p.lon >= a.lon.min(b.lon) - 1e-9
        && p.lon <= a.lon.max(b.lon) + 1e-9
}

/// Index of the point closest to `p`; ties go to the lowest index.
pub fn nearest(points: &[Location], p: &Location) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, q) in points.iter().enumerate() {
        let d = p.distance(q);
        if best.map(|(_, bd)| d < bd).unwrap_or(true) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i)
}
