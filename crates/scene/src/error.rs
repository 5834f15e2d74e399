use crate::layer::LayerId;
use crate::tiles::TileCoord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The DOM target is not attached; the engine cannot bind to it.
    TargetMissing { target: String },
    InvalidProjection { code: String },
    MalformedTemplate { template: String, reason: String },
    UnknownLayer(LayerId),
    /// A tile address outside the XYZ grid of its zoom level.
    InvalidTile(TileCoord),
    /// A source operation was applied to a layer whose source has another kind.
    SourceKindMismatch {
        layer: LayerId,
        expected: &'static str,
    },
}

impl SceneError {
    /// Configuration errors point at a defect in calling code or content data.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SceneError::InvalidProjection { .. } | SceneError::MalformedTemplate { .. }
        )
    }
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneError::TargetMissing { target } => {
                write!(f, "map target {target:?} is not attached")
            }
            SceneError::InvalidProjection { code } => write!(f, "invalid projection code {code:?}"),
            SceneError::MalformedTemplate { template, reason } => {
                write!(f, "malformed tile url template {template:?}: {reason}")
            }
            SceneError::UnknownLayer(id) => write!(f, "unknown layer {id}"),
            SceneError::InvalidTile(coord) => write!(f, "tile {coord} is outside the tile grid"),
            SceneError::SourceKindMismatch { layer, expected } => {
                write!(f, "layer {layer} does not have a {expected} source")
            }
        }
    }
}

impl std::error::Error for SceneError {}
