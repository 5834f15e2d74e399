//! JSON description of a screen: target, view and declared layers, bottom
//! first.

use foundation::bounds::GeoBounds;
use foundation::math::LonLat;
use layers::content::Content;
use layers::vector::GroundControlPoint;
use serde::Deserialize;
use tracing::debug;
use view::map_util::extent_and_max_zoom;
use view::{ViewProps, ViewerConfig};

#[derive(Debug, Clone, Deserialize)]
pub struct TargetSpec {
    pub id: String,
    pub width: u32,
    pub height: u32,
}

impl Default for TargetSpec {
    fn default() -> Self {
        Self {
            id: "map".to_string(),
            width: 1024,
            height: 768,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ViewSpec {
    pub center: Option<[f64; 2]>,
    pub zoom: Option<f64>,
    pub rotation: f64,
    pub shared: bool,
}

fn full_opacity() -> f64 {
    1.0
}

fn centered() -> f64 {
    0.5
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LayerSpec {
    Tile {
        url: String,
        #[serde(default)]
        projection: Option<String>,
        #[serde(default = "full_opacity")]
        opacity: f64,
    },
    Content {
        content: Content,
    },
    Slider {
        left: String,
        right: String,
        #[serde(default = "centered")]
        position: f64,
    },
    Points {
        points: Vec<GroundControlPoint>,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SceneFile {
    pub target: TargetSpec,
    pub view: ViewSpec,
    pub layers: Vec<LayerSpec>,
}

impl SceneFile {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The first content layer bounds and centers the view.
    pub fn view_props(&self, config: &ViewerConfig) -> ViewProps {
        let content = self.layers.iter().find_map(|layer| match layer {
            LayerSpec::Content { content } => Some(content),
            _ => None,
        });
        let derived = content
            .map(|c| extent_and_max_zoom(c, self.view.shared, Some(config.shared_zoom_ceiling)))
            .unwrap_or_default();
        let pyramid = content.and_then(|c| c.pyramid()).cloned();
        let boundary = pyramid
            .as_ref()
            .and_then(|p| p.coarsest())
            .map(|level| GeoBounds::from(level.boundary));
        debug!(max_zoom = ?derived.max_zoom, bounded = derived.extent.is_some(), "view constraints derived");

        ViewProps {
            center: self.view.center.map(LonLat::from),
            zoom: self.view.zoom,
            rotation: self.view.rotation,
            boundary,
            extent: derived.extent,
            pyramid,
            shared: self.view.shared,
        }
    }
}
