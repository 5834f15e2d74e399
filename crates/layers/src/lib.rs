//! Declarative layer descriptions reconciled onto a live [`scene::MapEngine`].

pub mod content;
pub mod context;
pub mod error;
pub mod group;
pub mod hooks;
pub mod reconciler;
pub mod slider;
pub mod tile;
pub mod vector;
pub mod wrap;

pub use context::*;
pub use error::*;
pub use group::*;
pub use reconciler::*;
pub use wrap::*;
