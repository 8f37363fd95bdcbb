pub mod event_bus;
pub mod generation;
pub mod metrics;

pub use event_bus::*;
pub use generation::*;
pub use metrics::*;
