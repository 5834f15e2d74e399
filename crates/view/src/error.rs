use layers::ContextError;
use scene::SceneError;

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewError {
    /// The engine refused to start, usually because the target is missing.
    Engine(SceneError),
    Context(ContextError),
    Config(ConfigError),
}

impl std::fmt::Display for ViewError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewError::Engine(e) => write!(f, "map engine error: {e}"),
            ViewError::Context(e) => write!(f, "{e}"),
            ViewError::Config(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ViewError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ViewError::Engine(e) => Some(e),
            ViewError::Context(e) => Some(e),
            ViewError::Config(e) => Some(e),
        }
    }
}

impl From<SceneError> for ViewError {
    fn from(e: SceneError) -> Self {
        ViewError::Engine(e)
    }
}

impl From<ContextError> for ViewError {
    fn from(e: ContextError) -> Self {
        ViewError::Context(e)
    }
}

impl From<ConfigError> for ViewError {
    fn from(e: ConfigError) -> Self {
        ViewError::Config(e)
    }
}
