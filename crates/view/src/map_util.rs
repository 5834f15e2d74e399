//! Pure zoom and extent helpers over tile pyramid metadata.
//!
//! All clamping is inclusive. Geographic input is lon/lat; projected output
//! is EPSG:3857.

use foundation::bounds::{Aabb2, GeoBounds};
use foundation::math::{LonLat, geo_bounds_to_mercator};
use layers::content::{Content, TilePyramid};
use scene::{ENGINE_MAX_ZOOM, ENGINE_MIN_ZOOM, MAX_RESOLUTION};

/// Mean of the longitude and latitude limits. A zero-span boundary yields
/// its single point.
pub fn centroid(boundary: &GeoBounds) -> LonLat {
    LonLat::new(
        (boundary.min_lon + boundary.max_lon) / 2.0,
        (boundary.min_lat + boundary.max_lat) / 2.0,
    )
}

fn level_range(pyramid: &TilePyramid) -> Option<(f64, f64)> {
    Some((f64::from(pyramid.min_zoom()?), f64::from(pyramid.max_zoom()?)))
}

/// Zoom to open a dataset at.
///
/// Without pyramid metadata the default wins. When the default zoom is itself
/// a declared level the request is trusted as is. Otherwise the request is
/// clamped into the declared levels, capped at `shared_ceiling` on shared
/// views.
pub fn clamp_zoom(
    pyramid: Option<&TilePyramid>,
    requested: f64,
    default_zoom: f64,
    shared_ceiling: Option<f64>,
    is_shared: bool,
) -> f64 {
    let Some(pyramid) = pyramid else {
        return default_zoom;
    };
    let Some((min, max)) = level_range(pyramid) else {
        return default_zoom;
    };
    if pyramid.has_level(default_zoom) {
        return requested;
    }
    let effective_max = match (is_shared, shared_ceiling) {
        (true, Some(ceiling)) => max.min(ceiling),
        _ => max,
    };
    // A ceiling below the coarsest level pins the zoom there.
    requested.clamp(min, effective_max.max(min))
}

/// Projected extent and maximum zoom of a content record.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct ExtentAndZoom {
    pub extent: Option<Aabb2>,
    pub max_zoom: Option<f64>,
}

/// Derives the view constraint from the coarsest level's footprint. Records
/// without pyramid metadata give an empty result, meaning unbounded.
pub fn extent_and_max_zoom(
    content: &Content,
    is_shared: bool,
    shared_ceiling: Option<f64>,
) -> ExtentAndZoom {
    let Some(pyramid) = content.pyramid() else {
        return ExtentAndZoom::default();
    };
    let extent = pyramid
        .coarsest()
        .map(|level| geo_bounds_to_mercator(&GeoBounds::from(level.boundary)));
    let max_zoom = pyramid.max_zoom().map(|max| {
        let max = f64::from(max);
        match (is_shared, shared_ceiling) {
            (true, Some(ceiling)) => max.min(ceiling),
            _ => max,
        }
    });
    ExtentAndZoom { extent, max_zoom }
}

/// Nearest zoom the pyramid can serve.
pub fn closest_zoom_level(pyramid: Option<&TilePyramid>, zoom: f64, default_zoom: f64) -> f64 {
    match pyramid.and_then(level_range) {
        Some((min, max)) => zoom.clamp(min, max),
        None => default_zoom,
    }
}

/// Largest zoom at which `extent` fits in a `size` pixel viewport, clamped
/// into the pyramid (or the engine range without one).
pub fn fit_zoom(extent: &Aabb2, size: [u32; 2], pyramid: Option<&TilePyramid>) -> f64 {
    let (min, max) = pyramid
        .and_then(level_range)
        .unwrap_or((ENGINE_MIN_ZOOM, ENGINE_MAX_ZOOM));
    if size[0] == 0 || size[1] == 0 {
        return min;
    }
    let resolution = (extent.width() / f64::from(size[0])).max(extent.height() / f64::from(size[1]));
    if resolution <= 0.0 {
        return max;
    }
    (MAX_RESOLUTION / resolution).log2().clamp(min, max)
}
