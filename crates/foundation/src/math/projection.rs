use crate::bounds::{Aabb2, GeoBounds};

use super::{LonLat, WGS84_A};

/// Latitude limit of the square Web Mercator world.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;
/// Half the side of the Web Mercator world square (meters).
pub const MERCATOR_HALF_WORLD: f64 = std::f64::consts::PI * WGS84_A;

/// Coordinate reference systems understood by the map.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Projection {
    /// Geographic longitude/latitude in degrees.
    Epsg4326,
    /// Spherical Web Mercator, the engine's working projection.
    Epsg3857,
}

impl Projection {
    /// Parses a projection code. Returns `None` for anything unknown.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "EPSG:4326" | "CRS:84" | "WGS84" => Some(Projection::Epsg4326),
            "EPSG:3857" | "EPSG:900913" | "EPSG:102100" => Some(Projection::Epsg3857),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Projection::Epsg4326 => "EPSG:4326",
            Projection::Epsg3857 => "EPSG:3857",
        }
    }

    /// Forward transform of a coordinate in `self` into EPSG:3857.
    pub fn to_mercator(self, coord: [f64; 2]) -> [f64; 2] {
        match self {
            Projection::Epsg3857 => coord,
            Projection::Epsg4326 => lonlat_to_mercator(LonLat::from(coord)),
        }
    }
}

impl std::fmt::Display for Projection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Forward spherical Mercator. Latitudes are clamped to the square world.
pub fn lonlat_to_mercator(p: LonLat) -> [f64; 2] {
    let lat = p.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let x = WGS84_A * p.lon.to_radians();
    let y = WGS84_A * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    [x, y]
}

pub fn mercator_to_lonlat(xy: [f64; 2]) -> LonLat {
    let lon = (xy[0] / WGS84_A).to_degrees();
    let lat = (2.0 * (xy[1] / WGS84_A).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    LonLat::new(lon, lat)
}

/// Reprojects the geographic min/max corners of `bounds` into EPSG:3857.
pub fn geo_bounds_to_mercator(bounds: &GeoBounds) -> Aabb2 {
    let min = lonlat_to_mercator(LonLat::from(bounds.min_corner()));
    let max = lonlat_to_mercator(LonLat::from(bounds.max_corner()));
    Aabb2::new(min, max)
}
