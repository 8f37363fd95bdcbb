pub mod bounds;
pub mod geo;
pub mod grid;
pub mod handles;
pub mod ids;
pub mod viewport;

// Foundation crate: small, well-tested primitives only.
pub use bounds::*;
pub use geo::*;
pub use grid::*;
pub use handles::*;
pub use ids::*;
pub use viewport::*;
