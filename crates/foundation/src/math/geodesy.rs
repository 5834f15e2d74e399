use super::LonLat;

/// WGS84 semi-major axis (meters). Also the sphere radius used by Web Mercator.
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening.
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// Point reached by travelling `distance_m` from `origin` along `bearing_rad`
/// (clockwise from north) on a sphere of radius [`WGS84_A`].
pub fn destination_point(origin: LonLat, distance_m: f64, bearing_rad: f64) -> LonLat {
    let lat1 = origin.lat.to_radians();
    let lon1 = origin.lon.to_radians();
    let ang = distance_m / WGS84_A;

    let lat2 = (lat1.sin() * ang.cos() + lat1.cos() * ang.sin() * bearing_rad.cos()).asin();
    let lon2 = lon1
        + (bearing_rad.sin() * ang.sin() * lat1.cos()).atan2(ang.cos() - lat1.sin() * lat2.sin());

    LonLat::new(normalize_lon(lon2.to_degrees()), lat2.to_degrees())
}

/// Closed ring approximating a geodesic circle: `vertices` points plus the
/// repeated first point.
pub fn circular_ring(center: LonLat, radius_m: f64, vertices: usize) -> Vec<LonLat> {
    let n = vertices.max(3);
    let mut ring = Vec::with_capacity(n + 1);
    for i in 0..n {
        let bearing = 2.0 * std::f64::consts::PI * (i as f64) / (n as f64);
        ring.push(destination_point(center, radius_m, bearing));
    }
    ring.push(ring[0]);
    ring
}

fn normalize_lon(lon: f64) -> f64 {
    let mut l = (lon + 180.0) % 360.0;
    if l < 0.0 {
        l += 360.0;
    }
    l - 180.0
}

#[cfg(test)]
mod tests {
    use super::{LonLat, WGS84_A, circular_ring, destination_point};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn destination_due_north_adds_latitude() {
        let quarter = std::f64::consts::FRAC_PI_2 * WGS84_A;
        let p = destination_point(LonLat::new(0.0, 0.0), quarter / 90.0, 0.0);
        assert_close(p.lat, 1.0, 1e-9);
        assert_close(p.lon, 0.0, 1e-9);
    }

    #[test]
    fn destination_wraps_antimeridian() {
        let one_deg = std::f64::consts::PI * WGS84_A / 180.0;
        let p = destination_point(LonLat::new(179.5, 0.0), one_deg, std::f64::consts::FRAC_PI_2);
        assert_close(p.lon, -179.5, 1e-9);
    }

    #[test]
    fn circular_ring_is_closed() {
        let ring = circular_ring(LonLat::new(100.0, 38.4), 25.0, 64);
        assert_eq!(ring.len(), 65);
        assert_eq!(ring.first(), ring.last());
    }
}
