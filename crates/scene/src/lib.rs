//! Retained-mode map engine: one instance per screen, holding the ordered
//! layer table, the viewport and the target it paints into.

pub mod engine;
pub mod error;
pub mod geolocation;
pub mod layer;
pub mod render;
pub mod source;
pub mod target;
pub mod tiles;
pub mod viewport;

pub use engine::*;
pub use error::*;
pub use layer::*;
pub use render::*;
pub use source::*;
pub use target::*;
pub use tiles::*;
pub use viewport::*;
