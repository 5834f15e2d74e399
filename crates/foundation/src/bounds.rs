/// Axis-aligned bounding box in a projected plane (`[min_x, min_y]`, `[max_x, max_y]`).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    pub fn from_center(center: [f64; 2], half_width: f64, half_height: f64) -> Self {
        Aabb2::new(
            [center[0] - half_width, center[1] - half_height],
            [center[0] + half_width, center[1] + half_height],
        )
    }

    pub fn width(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> f64 {
        self.max[1] - self.min[1]
    }

    pub fn center(&self) -> [f64; 2] {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
        ]
    }

    /// Inclusive on every edge.
    pub fn contains_point(&self, p: [f64; 2]) -> bool {
        p[0] >= self.min[0] && p[0] <= self.max[0] && p[1] >= self.min[1] && p[1] <= self.max[1]
    }

    pub fn contains(&self, other: &Aabb2) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }

    pub fn intersects(&self, other: &Aabb2) -> bool {
        self.min[0] <= other.max[0]
            && self.max[0] >= other.min[0]
            && self.min[1] <= other.max[1]
            && self.max[1] >= other.min[1]
    }

    pub fn clamp_point(&self, p: [f64; 2]) -> [f64; 2] {
        [
            p[0].clamp(self.min[0], self.max[0]),
            p[1].clamp(self.min[1], self.max[1]),
        ]
    }
}

/// Geographic boundary in degrees.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GeoBounds {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl GeoBounds {
    pub fn new(min_lon: f64, max_lon: f64, min_lat: f64, max_lat: f64) -> Self {
        GeoBounds {
            min_lon,
            max_lon,
            min_lat,
            max_lat,
        }
    }

    pub fn min_corner(&self) -> [f64; 2] {
        [self.min_lon, self.min_lat]
    }

    pub fn max_corner(&self) -> [f64; 2] {
        [self.max_lon, self.max_lat]
    }

    pub fn is_degenerate(&self) -> bool {
        self.min_lon == self.max_lon && self.min_lat == self.max_lat
    }
}
