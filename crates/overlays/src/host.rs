use foundation::geo::LatLng;
use foundation::handles::{ListenerHandle, WidgetHandle};
use foundation::ids::SpatialKey;
use foundation::viewport::Viewport;

use crate::symbology::PolygonStyle;

/// HTML marker anchored at a position.
///
/// `x_anchor` and `y_anchor` are fractions of the content box placed on
/// `position`: `(0.5, 1.0)` puts the bottom center on the point.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub position: LatLng,
    pub content: String,
    pub z_index: i32,
    pub x_anchor: f64,
    pub y_anchor: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonSpec {
    pub path: Vec<LatLng>,
    pub style: PolygonStyle,
}

/// The map widget, as seen by the overlay layer.
///
/// Implementations own every widget they hand out; handles are only valid for
/// the host that issued them. Removing an unknown handle is a no-op.
pub trait MapHost {
    /// Current visible area and zoom level, `None` before the map is ready.
    fn viewport(&self) -> Option<Viewport>;

    fn add_marker(&mut self, spec: &MarkerSpec) -> WidgetHandle;
    fn update_marker(&mut self, marker: WidgetHandle, spec: &MarkerSpec);
    fn remove_marker(&mut self, marker: WidgetHandle);

    fn add_polygon(&mut self, spec: &PolygonSpec) -> WidgetHandle;
    fn set_polygon_style(&mut self, polygon: WidgetHandle, style: &PolygonStyle);
    fn remove_polygon(&mut self, polygon: WidgetHandle);

    /// Clicks on `target` are reported back to the embedding as `key`.
    fn bind_click(&mut self, target: WidgetHandle, key: &SpatialKey) -> ListenerHandle;
    fn unbind_click(&mut self, listener: ListenerHandle);
}
