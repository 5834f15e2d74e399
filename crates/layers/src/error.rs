use scene::SceneError;

/// Misuse of the scene channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// No ancestor published a map: the node sits outside a view provider.
    MissingMap,
    /// The screen that owned the map has been torn down.
    MapDropped,
    /// The map is already borrowed further up the stack.
    MapBusy,
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextError::MissingMap => {
                write!(f, "no map in scope: scene nodes must be rendered under a view provider")
            }
            ContextError::MapDropped => write!(f, "the map for this scope has been dropped"),
            ContextError::MapBusy => write!(f, "the map is already borrowed"),
        }
    }
}

impl std::error::Error for ContextError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerError {
    Context(ContextError),
    /// Invalid static configuration (projection, url template).
    Config(SceneError),
    Scene(SceneError),
    BandExhausted { base: i64, span: i64, slot: usize },
}

impl LayerError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, LayerError::Config(_) | LayerError::BandExhausted { .. })
    }
}

impl std::fmt::Display for LayerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerError::Context(e) => write!(f, "{e}"),
            LayerError::Config(e) => write!(f, "layer configuration error: {e}"),
            LayerError::Scene(e) => write!(f, "{e}"),
            LayerError::BandExhausted { base, span, slot } => write!(
                f,
                "z-index band [{base}, {}) cannot hold slot {slot}",
                base.saturating_add(*span)
            ),
        }
    }
}

impl std::error::Error for LayerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LayerError::Context(e) => Some(e),
            LayerError::Config(e) | LayerError::Scene(e) => Some(e),
            LayerError::BandExhausted { .. } => None,
        }
    }
}

impl From<ContextError> for LayerError {
    fn from(e: ContextError) -> Self {
        LayerError::Context(e)
    }
}

impl From<SceneError> for LayerError {
    fn from(e: SceneError) -> Self {
        if e.is_configuration() {
            LayerError::Config(e)
        } else {
            LayerError::Scene(e)
        }
    }
}
