use serde::{Deserialize, Serialize};

use crate::bounds::GeoBounds;

/// Zoom level as reported by the map widget. Smaller values are closer to the ground.
pub type ZoomLevel = i32;

/// Snapshot of the visible map area, taken once per settle event.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub bounds: GeoBounds,
    pub level: ZoomLevel,
}

impl Viewport {
    pub const fn new(bounds: GeoBounds, level: ZoomLevel) -> Self {
        Self { bounds, level }
    }
}
