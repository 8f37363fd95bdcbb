use foundation::bounds::GeoBounds;
use foundation::geo::LatLng;
use foundation::handles::{ListenerHandle, WidgetHandle};
use foundation::ids::SpatialKey;
use foundation::viewport::{Viewport, ZoomLevel};
use overlays::host::{MapHost, MarkerSpec, PolygonSpec};
use overlays::symbology::PolygonStyle;
use tracing::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

// Widgets and listeners live in JS-side registries keyed by small integer ids.
#[wasm_bindgen(inline_js = "
let map = null;
let nextId = 0;
const widgets = new Map();
const listeners = new Map();

export function kakao_create_map(containerId, lat, lng, level, onIdle, onZoom) {
    const k = window.kakao && window.kakao.maps;
    if (!k) throw new Error('kakao maps SDK not loaded');
    const container = document.getElementById(containerId);
    if (!container) throw new Error('missing map container #' + containerId);
    map = new k.Map(container, { center: new k.LatLng(lat, lng), level });
    k.event.addListener(map, 'idle', () => onIdle());
    k.event.addListener(map, 'zoom_changed', () => onZoom(map.getLevel()));
}

export function kakao_viewport() {
    if (!map) return new Float64Array(0);
    const b = map.getBounds();
    const sw = b.getSouthWest();
    const ne = b.getNorthEast();
    return new Float64Array([sw.getLat(), sw.getLng(), ne.getLat(), ne.getLng(), map.getLevel()]);
}

export function kakao_add_marker(lat, lng, content, zIndex, xAnchor, yAnchor) {
    const k = window.kakao.maps;
    const el = document.createElement('div');
    el.innerHTML = content;
    const ov = new k.CustomOverlay({
        position: new k.LatLng(lat, lng),
        content: el,
        xAnchor,
        yAnchor,
        zIndex,
    });
    ov.setMap(map);
    const id = ++nextId;
    widgets.set(id, { kind: 'marker', ov, el });
    return id;
}

export function kakao_update_marker(id, lat, lng, content, zIndex) {
    const w = widgets.get(id);
    if (!w || w.kind !== 'marker') return;
    w.el.innerHTML = content;
    w.ov.setPosition(new window.kakao.maps.LatLng(lat, lng));
    w.ov.setZIndex(zIndex);
}

function polygonOptions(style) {
    return {
        strokeWeight: style.stroke_weight,
        strokeColor: style.stroke_color,
        strokeOpacity: style.stroke_opacity,
        fillColor: style.fill_color,
        fillOpacity: style.fill_opacity,
    };
}

export function kakao_add_polygon(flatPath, styleJson) {
    const k = window.kakao.maps;
    const path = [];
    for (let i = 0; i + 1 < flatPath.length; i += 2) {
        path.push(new k.LatLng(flatPath[i], flatPath[i + 1]));
    }
    const ov = new k.Polygon({ path, ...polygonOptions(JSON.parse(styleJson)) });
    ov.setMap(map);
    const id = ++nextId;
    widgets.set(id, { kind: 'polygon', ov });
    return id;
}

export function kakao_style_polygon(id, styleJson) {
    const w = widgets.get(id);
    if (w && w.kind === 'polygon') w.ov.setOptions(polygonOptions(JSON.parse(styleJson)));
}

export function kakao_remove_widget(id) {
    const w = widgets.get(id);
    if (!w) return;
    w.ov.setMap(null);
    widgets.delete(id);
}

export function kakao_bind_click(targetId, key, onClick) {
    const w = widgets.get(targetId);
    if (!w) return 0;
    const handler = (e) => {
        if (e && e.stopPropagation) e.stopPropagation();
        onClick(key);
    };
    if (w.kind === 'marker') {
        w.el.addEventListener('click', handler);
    } else {
        window.kakao.maps.event.addListener(w.ov, 'click', handler);
    }
    const id = ++nextId;
    listeners.set(id, { w, handler });
    return id;
}

export function kakao_unbind_click(id) {
    const l = listeners.get(id);
    if (!l) return;
    if (l.w.kind === 'marker') {
        l.w.el.removeEventListener('click', l.handler);
    } else {
        window.kakao.maps.event.removeListener(l.w.ov, 'click', l.handler);
    }
    listeners.delete(id);
}
")]
extern "C" {
    #[wasm_bindgen(catch)]
    fn kakao_create_map(
        container_id: &str,
        lat: f64,
        lng: f64,
        level: i32,
        on_idle: &js_sys::Function,
        on_zoom: &js_sys::Function,
    ) -> Result<(), JsValue>;

    fn kakao_viewport() -> Vec<f64>;

    fn kakao_add_marker(
        lat: f64,
        lng: f64,
        content: &str,
        z_index: i32,
        x_anchor: f64,
        y_anchor: f64,
    ) -> u32;
    fn kakao_update_marker(id: u32, lat: f64, lng: f64, content: &str, z_index: i32);
    fn kakao_add_polygon(flat_path: &[f64], style_json: &str) -> u32;
    fn kakao_style_polygon(id: u32, style_json: &str);
    fn kakao_remove_widget(id: u32);
    fn kakao_bind_click(target_id: u32, key: &str, on_click: &js_sys::Function) -> u32;
    fn kakao_unbind_click(id: u32);
}

/// Callbacks the map calls back into. Kept alive for the life of the map.
pub struct MapCallbacks {
    pub on_idle: Closure<dyn FnMut()>,
    pub on_zoom: Closure<dyn FnMut(i32)>,
    pub on_click: Closure<dyn FnMut(String)>,
}

/// Kakao Maps JS SDK behind [`MapHost`].
pub struct KakaoMapHost {
    callbacks: MapCallbacks,
}

impl KakaoMapHost {
    pub fn create(
        container_id: &str,
        center: LatLng,
        level: ZoomLevel,
        callbacks: MapCallbacks,
    ) -> Result<Self, JsValue> {
        kakao_create_map(
            container_id,
            center.lat,
            center.lng,
            level,
            callbacks.on_idle.as_ref().unchecked_ref(),
            callbacks.on_zoom.as_ref().unchecked_ref(),
        )?;
        Ok(Self { callbacks })
    }
}

fn widget_id(h: WidgetHandle) -> u32 {
    u32::try_from(h.0).unwrap_or(0)
}

fn style_json(style: &PolygonStyle) -> String {
    serde_json::to_string(style).unwrap_or_else(|e| {
        warn!(error = %e, "polygon style not serializable");
        "{}".to_string()
    })
}

impl MapHost for KakaoMapHost {
    fn viewport(&self) -> Option<Viewport> {
        match kakao_viewport().as_slice() {
            [s, w, n, e, level] => Some(Viewport::new(
                GeoBounds::from_edges(*s, *w, *n, *e),
                *level as ZoomLevel,
            )),
            _ => None,
        }
    }

    fn add_marker(&mut self, spec: &MarkerSpec) -> WidgetHandle {
        WidgetHandle(u64::from(kakao_add_marker(
            spec.position.lat,
            spec.position.lng,
            &spec.content,
            spec.z_index,
            spec.x_anchor,
            spec.y_anchor,
        )))
    }

    // CustomOverlay has no anchor setter; anchors stay as created.
    fn update_marker(&mut self, marker: WidgetHandle, spec: &MarkerSpec) {
        kakao_update_marker(
            widget_id(marker),
            spec.position.lat,
            spec.position.lng,
            &spec.content,
            spec.z_index,
        );
    }

    fn remove_marker(&mut self, marker: WidgetHandle) {
        kakao_remove_widget(widget_id(marker));
    }

    fn add_polygon(&mut self, spec: &PolygonSpec) -> WidgetHandle {
        let flat: Vec<f64> = spec.path.iter().flat_map(|p| [p.lat, p.lng]).collect();
        WidgetHandle(u64::from(kakao_add_polygon(&flat, &style_json(&spec.style))))
    }

    fn set_polygon_style(&mut self, polygon: WidgetHandle, style: &PolygonStyle) {
        kakao_style_polygon(widget_id(polygon), &style_json(style));
    }

    fn remove_polygon(&mut self, polygon: WidgetHandle) {
        kakao_remove_widget(widget_id(polygon));
    }

    fn bind_click(&mut self, target: WidgetHandle, key: &SpatialKey) -> ListenerHandle {
        let id = kakao_bind_click(
            widget_id(target),
            key.as_str(),
            self.callbacks.on_click.as_ref().unchecked_ref(),
        );
        if id == 0 {
            warn!(key = %key, "click target missing");
        }
        ListenerHandle(u64::from(id))
    }

    fn unbind_click(&mut self, listener: ListenerHandle) {
        kakao_unbind_click(u32::try_from(listener.0).unwrap_or(0));
    }
}
