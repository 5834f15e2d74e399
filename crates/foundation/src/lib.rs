pub mod arena;
pub mod bounds;
pub mod handles;
pub mod math;
pub mod time;

// Re-exported at the root; `math` stays namespaced.
pub use arena::*;
pub use bounds::*;
pub use handles::*;
pub use time::*;
