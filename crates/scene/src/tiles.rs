use foundation::bounds::Aabb2;
use foundation::math::MERCATOR_HALF_WORLD;

use crate::error::SceneError;

/// XYZ tile address with a top-left origin.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Row index counted from the bottom (TMS), used by `{-y}`. Rows outside
    /// the grid saturate to 0; check [`TileCoord::is_valid`] first.
    pub fn flipped_y(&self) -> u32 {
        let last_row = 1u32
            .checked_shl(u32::from(self.z))
            .map_or(u32::MAX, |rows| rows - 1);
        last_row.saturating_sub(self.y)
    }

    pub fn is_valid(&self) -> bool {
        self.z < 32 && self.x < (1u32 << self.z) && self.y < (1u32 << self.z)
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Z,
    X,
    Y,
    FlippedY,
}

/// Validated `{z}/{x}/{y}` URL template.
///
/// Accepts `{z}`, `{x}` and exactly one row placeholder, `{y}` or `{-y}`.
/// Anything else in braces is rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    raw: String,
    parts: Vec<Part>,
}

impl UrlTemplate {
    pub fn parse(raw: &str) -> Result<Self, SceneError> {
        let malformed = |reason: String| SceneError::MalformedTemplate {
            template: raw.to_string(),
            reason,
        };
        if raw.trim().is_empty() {
            return Err(malformed("template is empty".to_string()));
        }

        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = raw.chars();
        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        if c == '{' {
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(malformed("unbalanced '{'".to_string()));
                    }
                    let part = match name.as_str() {
                        "z" => Part::Z,
                        "x" => Part::X,
                        "y" => Part::Y,
                        "-y" => Part::FlippedY,
                        other => return Err(malformed(format!("unresolved placeholder {{{other}}}"))),
                    };
                    if !literal.is_empty() {
                        parts.push(Part::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(part);
                }
                '}' => return Err(malformed("unbalanced '}'".to_string())),
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }

        let count = |p: &Part| parts.iter().filter(|q| *q == p).count();
        if count(&Part::Z) == 0 || count(&Part::X) == 0 {
            return Err(malformed("missing {z} or {x}".to_string()));
        }
        match count(&Part::Y) + count(&Part::FlippedY) {
            0 => return Err(malformed("missing {y} or {-y}".to_string())),
            1 => {}
            _ if count(&Part::Y) > 0 && count(&Part::FlippedY) > 0 => {
                return Err(malformed("both {y} and {-y} present".to_string()));
            }
            _ => {}
        }

        Ok(Self {
            raw: raw.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn expand(&self, coord: TileCoord) -> String {
        let mut out = String::with_capacity(self.raw.len() + 16);
        for part in &self.parts {
            match part {
                Part::Literal(s) => out.push_str(s),
                Part::Z => out.push_str(&coord.z.to_string()),
                Part::X => out.push_str(&coord.x.to_string()),
                Part::Y => out.push_str(&coord.y.to_string()),
                Part::FlippedY => out.push_str(&coord.flipped_y().to_string()),
            }
        }
        out
    }
}

/// Tiles at zoom `z` that intersect `extent` (EPSG:3857), row-major.
pub fn tile_range(extent: &Aabb2, z: u8) -> Vec<TileCoord> {
    let z = z.min(31);
    let n = 1u64 << z;
    let span = 2.0 * MERCATOR_HALF_WORLD / n as f64;
    let to_index = |v: f64| -> u32 {
        let i = v.floor();
        if i < 0.0 {
            0
        } else {
            (i as u64).min(n - 1) as u32
        }
    };

    let x0 = to_index((extent.min[0] + MERCATOR_HALF_WORLD) / span);
    let x1 = to_index((extent.max[0] + MERCATOR_HALF_WORLD) / span);
    let y0 = to_index((MERCATOR_HALF_WORLD - extent.max[1]) / span);
    let y1 = to_index((MERCATOR_HALF_WORLD - extent.min[1]) / span);

    let mut out = Vec::new();
    for y in y0..=y1 {
        for x in x0..=x1 {
            out.push(TileCoord::new(z, x, y));
        }
    }
    out
}
