//! Screen-level view ownership: the provider that owns a map, the zoom and
//! extent math it relies on, and the geolocation control.

pub mod config;
pub mod error;
pub mod geolocation;
pub mod map_util;
pub mod notify;
pub mod provider;

pub use config::*;
pub use error::*;
pub use notify::*;
pub use provider::*;
