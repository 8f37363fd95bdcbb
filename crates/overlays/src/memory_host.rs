use std::collections::BTreeMap;

use foundation::handles::{HandleAllocator, ListenerHandle, WidgetHandle};
use foundation::ids::SpatialKey;
use foundation::viewport::Viewport;

use crate::host::{MapHost, MarkerSpec, PolygonSpec};
use crate::symbology::PolygonStyle;

/// One call made against an [`InMemoryHost`], in order.
#[derive(Debug, Clone, PartialEq)]
pub enum HostOp {
    AddMarker(WidgetHandle),
    UpdateMarker(WidgetHandle),
    RemoveMarker(WidgetHandle),
    AddPolygon(WidgetHandle),
    StylePolygon(WidgetHandle),
    RemovePolygon(WidgetHandle),
    BindClick(ListenerHandle, SpatialKey),
    UnbindClick(ListenerHandle),
}

impl HostOp {
    pub fn is_create(&self) -> bool {
        matches!(self, HostOp::AddMarker(_) | HostOp::AddPolygon(_))
    }

    pub fn is_destroy(&self) -> bool {
        matches!(self, HostOp::RemoveMarker(_) | HostOp::RemovePolygon(_))
    }
}

/// Headless map host: keeps live widgets in memory and logs every call.
#[derive(Debug, Default)]
pub struct InMemoryHost {
    viewport: Option<Viewport>,
    handles: HandleAllocator,
    markers: BTreeMap<WidgetHandle, MarkerSpec>,
    polygons: BTreeMap<WidgetHandle, PolygonSpec>,
    listeners: BTreeMap<ListenerHandle, (WidgetHandle, SpatialKey)>,
    ops: Vec<HostOp>,
}

impl InMemoryHost {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport: Some(viewport),
            ..Self::default()
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }

    pub fn marker(&self, handle: WidgetHandle) -> Option<&MarkerSpec> {
        self.markers.get(&handle)
    }

    pub fn polygon(&self, handle: WidgetHandle) -> Option<&PolygonSpec> {
        self.polygons.get(&handle)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Key a click on `target` would report, if bound.
    pub fn click_key(&self, target: WidgetHandle) -> Option<&SpatialKey> {
        self.listeners
            .values()
            .find(|(t, _)| *t == target)
            .map(|(_, key)| key)
    }

    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<HostOp> {
        std::mem::take(&mut self.ops)
    }
}

impl MapHost for InMemoryHost {
    fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    fn add_marker(&mut self, spec: &MarkerSpec) -> WidgetHandle {
        let h = self.handles.next_widget();
        self.markers.insert(h, spec.clone());
        self.ops.push(HostOp::AddMarker(h));
        h
    }

    fn update_marker(&mut self, marker: WidgetHandle, spec: &MarkerSpec) {
        if let Some(m) = self.markers.get_mut(&marker) {
            *m = spec.clone();
            self.ops.push(HostOp::UpdateMarker(marker));
        }
    }

    fn remove_marker(&mut self, marker: WidgetHandle) {
        if self.markers.remove(&marker).is_some() {
            self.ops.push(HostOp::RemoveMarker(marker));
        }
    }

    fn add_polygon(&mut self, spec: &PolygonSpec) -> WidgetHandle {
        let h = self.handles.next_widget();
        self.polygons.insert(h, spec.clone());
        self.ops.push(HostOp::AddPolygon(h));
        h
    }

    fn set_polygon_style(&mut self, polygon: WidgetHandle, style: &PolygonStyle) {
        if let Some(p) = self.polygons.get_mut(&polygon) {
            p.style = style.clone();
            self.ops.push(HostOp::StylePolygon(polygon));
        }
    }

    fn remove_polygon(&mut self, polygon: WidgetHandle) {
        if self.polygons.remove(&polygon).is_some() {
            self.ops.push(HostOp::RemovePolygon(polygon));
        }
    }

    fn bind_click(&mut self, target: WidgetHandle, key: &SpatialKey) -> ListenerHandle {
        let l = self.handles.next_listener();
        self.listeners.insert(l, (target, key.clone()));
        self.ops.push(HostOp::BindClick(l, key.clone()));
        l
    }

    fn unbind_click(&mut self, listener: ListenerHandle) {
        if self.listeners.remove(&listener).is_some() {
            self.ops.push(HostOp::UnbindClick(listener));
        }
    }
}
