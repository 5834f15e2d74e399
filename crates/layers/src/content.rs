//! Content records as supplied by the application state. Read-only here.

use foundation::bounds::GeoBounds;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Boundary {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl From<Boundary> for GeoBounds {
    fn from(b: Boundary) -> Self {
        GeoBounds::new(b.min_lon, b.max_lon, b.min_lat, b.max_lat)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoomLevel {
    pub zoom: u8,
    pub boundary: Boundary,
}

fn default_projection() -> String {
    "EPSG:3857".to_string()
}

/// Multi-resolution tile metadata of one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TilePyramid {
    pub url_template: String,
    #[serde(default = "default_projection")]
    pub projection: String,
    pub zoom_levels: Vec<ZoomLevel>,
}

impl TilePyramid {
    /// Declared zoom levels, ascending and deduplicated.
    pub fn levels(&self) -> Vec<u8> {
        let mut levels: Vec<u8> = self.zoom_levels.iter().map(|l| l.zoom).collect();
        levels.sort_unstable();
        levels.dedup();
        levels
    }

    pub fn min_zoom(&self) -> Option<u8> {
        self.zoom_levels.iter().map(|l| l.zoom).min()
    }

    pub fn max_zoom(&self) -> Option<u8> {
        self.zoom_levels.iter().map(|l| l.zoom).max()
    }

    /// Exact membership; fractional zooms are never members.
    pub fn has_level(&self, zoom: f64) -> bool {
        self.zoom_levels.iter().any(|l| f64::from(l.zoom) == zoom)
    }

    /// The level with the lowest zoom number.
    pub fn coarsest(&self) -> Option<&ZoomLevel> {
        self.zoom_levels.iter().min_by_key(|l| l.zoom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tiles: Option<TilePyramid>,
}

impl Content {
    /// Tile pyramid, if the record has one with at least one level.
    pub fn pyramid(&self) -> Option<&TilePyramid> {
        self.tiles.as_ref().filter(|t| !t.zoom_levels.is_empty())
    }

    pub fn from_json_str(json: &str) -> Result<Self, ContentError> {
        serde_json::from_str(json).map_err(|e| ContentError::Parse(e.to_string()))
    }

    pub fn list_from_json_str(json: &str) -> Result<Vec<Self>, ContentError> {
        serde_json::from_str(json).map_err(|e| ContentError::Parse(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    Parse(String),
}

impl std::fmt::Display for ContentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentError::Parse(msg) => write!(f, "content record parse error: {msg}"),
        }
    }
}

impl std::error::Error for ContentError {}


#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{Content, ContentError, fixtures};

    #[test]
    fn parses_camel_case_records() {
        let json = r#"{
            "id": "dsm-7",
            "name": "Surface model",
            "tiles": {
                "urlTemplate": "/dsm-7/{z}/{x}/{y}.png",
                "zoomLevels": [
                    {"zoom": 14, "boundary": {"minLon": 1.0, "maxLon": 2.0, "minLat": 3.0, "maxLat": 4.0}},
                    {"zoom": 12, "boundary": {"minLon": 0.5, "maxLon": 2.5, "minLat": 2.5, "maxLat": 4.5}}
                ]
            }
        }"#;
        let content = Content::from_json_str(json).unwrap();
        let pyramid = content.pyramid().unwrap();
        assert_eq!(pyramid.projection, "EPSG:3857");
        assert_eq!(pyramid.levels(), vec![12, 14]);
        assert_eq!(pyramid.coarsest().unwrap().zoom, 12);
        assert_eq!(pyramid.coarsest().unwrap().boundary.min_lon, 0.5);
    }

    #[test]
    fn records_without_tiles_have_no_pyramid() {
        let content = Content::from_json_str(r#"{"id": "report"}"#).unwrap();
        assert!(content.pyramid().is_none());

        let empty = Content::from_json_str(
            r#"{"id": "e", "tiles": {"urlTemplate": "/{z}/{x}/{y}", "zoomLevels": []}}"#,
        )
        .unwrap();
        assert!(empty.pyramid().is_none());
    }

    #[test]
    fn membership_and_bounds() {
        let ortho = fixtures::ortho();
        let p = ortho.pyramid().unwrap();
        assert_eq!((p.min_zoom(), p.max_zoom()), (Some(8), Some(22)));
        assert!(p.has_level(19.0));
        assert!(!p.has_level(19.5));
        assert!(!p.has_level(23.0));
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = Content::list_from_json_str("[{").unwrap_err();
        assert!(matches!(err, ContentError::Parse(_)));
    }
}
