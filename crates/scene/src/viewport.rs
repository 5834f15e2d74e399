use foundation::bounds::Aabb2;
use foundation::math::MERCATOR_HALF_WORLD;

/// Pixel size of one XYZ tile.
pub const TILE_SIZE: f64 = 256.0;
/// Resolution (meters per pixel) at zoom 0.
pub const MAX_RESOLUTION: f64 = 2.0 * MERCATOR_HALF_WORLD / TILE_SIZE;
/// Engine-wide zoom limits when no source narrows them.
pub const ENGINE_MIN_ZOOM: f64 = 0.0;
pub const ENGINE_MAX_ZOOM: f64 = 28.0;

pub fn resolution_for_zoom(zoom: f64) -> f64 {
    MAX_RESOLUTION / 2f64.powf(zoom)
}

/// The engine's viewport. Coordinates are EPSG:3857, rotation is radians.
///
/// Invariant: `min_zoom <= zoom <= max_zoom` and, when an extent constraint is
/// set, `center` lies inside it. Setters report whether the value changed.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    center: [f64; 2],
    zoom: f64,
    rotation: f64,
    extent: Option<Aabb2>,
    min_zoom: f64,
    max_zoom: f64,
    size: [u32; 2],
}

impl Viewport {
    pub fn new(center: [f64; 2], zoom: f64) -> Self {
        Self {
            center,
            zoom: zoom.clamp(ENGINE_MIN_ZOOM, ENGINE_MAX_ZOOM),
            rotation: 0.0,
            extent: None,
            min_zoom: ENGINE_MIN_ZOOM,
            max_zoom: ENGINE_MAX_ZOOM,
            size: [0, 0],
        }
    }

    pub fn center(&self) -> [f64; 2] {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn extent(&self) -> Option<Aabb2> {
        self.extent
    }

    pub fn zoom_limits(&self) -> (f64, f64) {
        (self.min_zoom, self.max_zoom)
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    pub fn set_center(&mut self, center: [f64; 2]) -> bool {
        let center = match self.extent {
            Some(extent) => extent.clamp_point(center),
            None => center,
        };
        replace_if_changed(&mut self.center, center)
    }

    /// Clamps inclusively into the current zoom limits.
    pub fn set_zoom(&mut self, zoom: f64) -> bool {
        let zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        replace_if_changed(&mut self.zoom, zoom)
    }

    pub fn set_rotation(&mut self, rotation: f64) -> bool {
        replace_if_changed(&mut self.rotation, rotation)
    }

    /// Narrows (or widens) the zoom limits and re-clamps the current zoom.
    /// Returns whether the zoom itself changed. Inverted limits are swapped.
    ///
    /// Both limits are clamped into the engine range, so limits entirely
    /// above it pin the view to [`ENGINE_MAX_ZOOM`]. NaN limits are ignored.
    pub fn set_zoom_limits(&mut self, min_zoom: f64, max_zoom: f64) -> bool {
        let min_zoom = if min_zoom.is_nan() { ENGINE_MIN_ZOOM } else { min_zoom };
        let max_zoom = if max_zoom.is_nan() { ENGINE_MAX_ZOOM } else { max_zoom };
        let (lo, hi) = if min_zoom <= max_zoom {
            (min_zoom, max_zoom)
        } else {
            (max_zoom, min_zoom)
        };
        let lo = lo.clamp(ENGINE_MIN_ZOOM, ENGINE_MAX_ZOOM);
        self.min_zoom = lo;
        self.max_zoom = hi.clamp(lo, ENGINE_MAX_ZOOM);
        let zoom = self.zoom;
        self.set_zoom(zoom)
    }

    /// Constrains the center. Returns whether the center moved.
    pub fn set_extent(&mut self, extent: Option<Aabb2>) -> bool {
        self.extent = extent;
        let center = self.center;
        self.set_center(center)
    }

    pub fn set_size(&mut self, size: [u32; 2]) {
        self.size = size;
    }

    pub fn resolution(&self) -> f64 {
        resolution_for_zoom(self.zoom)
    }

    /// Bounding box of the area on screen, accounting for rotation.
    pub fn visible_extent(&self) -> Aabb2 {
        let res = self.resolution();
        let w = self.size[0] as f64 * res;
        let h = self.size[1] as f64 * res;
        let (sin, cos) = self.rotation.sin_cos();
        let half_w = (w * cos.abs() + h * sin.abs()) / 2.0;
        let half_h = (w * sin.abs() + h * cos.abs()) / 2.0;
        Aabb2::from_center(self.center, half_w, half_h)
    }
}

fn replace_if_changed<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}
