use std::cell::RefCell;
use std::rc::Rc;

use aggregation::regions::RegionDirectory;
use controller::config::MapConfig;
use controller::controller::ViewportController;
use controller::driver;
use controller::state::{Completion, ListingCompletion};
use foundation::geo::LatLng;
use foundation::handles::WidgetHandle;
use foundation::ids::SpatialKey;
use overlays::host::{MarkerSpec, PolygonSpec};
use overlays::symbology::PolygonStyle;
use tracing::{debug, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

mod http;
mod kakao;
mod logging;

use http::HttpAggregationClient;
use kakao::{KakaoMapHost, MapCallbacks};

type Controller = Rc<RefCell<ViewportController<KakaoMapHost>>>;

struct WebApp {
    controller: Controller,
    client: Rc<HttpAggregationClient>,
}

thread_local! {
    static APP: RefCell<Option<WebApp>> = const { RefCell::new(None) };
}

/// TLS access that yields `None` during teardown or before `init_map`.
fn with_app<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&WebApp) -> R,
{
    APP.try_with(|app| app.borrow().as_ref().map(f))
        .ok()
        .flatten()
}

fn handles() -> Option<(Controller, Rc<HttpAggregationClient>)> {
    with_app(|app| (app.controller.clone(), app.client.clone()))
}

/// Creates the map inside `container_id` and starts following the viewport.
///
/// `config_json` is a [`MapConfig`] object (all fields optional);
/// `regions_json` is the district/neighborhood directory.
#[wasm_bindgen]
pub fn init_map(container_id: &str, config_json: &str, regions_json: &str) -> Result<(), JsValue> {
    let config = MapConfig::from_json(config_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    logging::init(&config.log_level);
    let directory =
        RegionDirectory::from_json(regions_json).map_err(|e| JsValue::from_str(&e.to_string()))?;

    if let Some(old) = APP.with(|app| app.borrow_mut().take()) {
        if let Ok(mut c) = old.controller.try_borrow_mut() {
            c.unmount();
        }
    }

    let callbacks = MapCallbacks {
        on_idle: Closure::wrap(Box::new(map_settled) as Box<dyn FnMut()>),
        on_zoom: Closure::wrap(Box::new(map_zoom_changed) as Box<dyn FnMut(i32)>),
        on_click: Closure::wrap(
            Box::new(|key: String| overlay_clicked(&key)) as Box<dyn FnMut(String)>
        ),
    };
    let host = KakaoMapHost::create(
        container_id,
        config.city_center,
        config.initial_level,
        callbacks,
    )?;

    let client = Rc::new(HttpAggregationClient::new(config.clone()));
    let mut controller = ViewportController::new(config, directory);
    controller.attach_host(host);
    let controller = Rc::new(RefCell::new(controller));

    APP.with(|app| {
        *app.borrow_mut() = Some(WebApp {
            controller,
            client,
        });
    });
    info!(container_id, "map initialised");

    // The SDK emits no idle event for the initial view.
    map_settled();
    Ok(())
}

fn map_settled() {
    let Some((controller, client)) = handles() else {
        return;
    };
    spawn_local(async move {
        match driver::settle(&controller, client.as_ref()).await {
            Some(Completion::Applied(report)) => debug!(?report, "overlays refreshed"),
            Some(Completion::Failed(err)) => warn!(error = %err, "overlay refresh failed"),
            Some(Completion::Stale) | None => {}
        }
    });
}

fn map_zoom_changed(level: i32) {
    let Some((controller, _)) = handles() else {
        return;
    };
    match controller.try_borrow_mut() {
        Ok(mut c) => {
            c.on_zoom_changed(level);
        }
        Err(_) => warn!(level, "zoom change ignored while controller busy"),
    }
}

fn overlay_clicked(key: &str) {
    let Some((controller, client)) = handles() else {
        return;
    };
    let key = SpatialKey::new(key);
    spawn_local(async move {
        if let Some(ListingCompletion::Failed(err)) =
            driver::click(&controller, client.as_ref(), &key).await
        {
            warn!(key = %key, error = %err, "listing fetch failed");
        }
    });
}

/// Sets the listing filter from a picker label and refreshes the overlays.
#[wasm_bindgen]
pub fn set_property_type(label: &str) {
    let changed = with_app(|app| match app.controller.try_borrow_mut() {
        Ok(mut c) => {
            c.set_property_type(label);
            true
        }
        Err(_) => false,
    })
    .unwrap_or(false);
    if changed {
        map_settled();
    }
}

/// Listings of 1-based page `n` as a JSON array.
#[wasm_bindgen]
pub fn listings_page(n: usize) -> Result<String, JsValue> {
    with_app(|app| {
        let c = app.controller.borrow();
        serde_json::to_string(c.app_state().page(n))
    })
    .unwrap_or_else(|| Ok("[]".to_string()))
    .map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn listing_page_count() -> usize {
    with_app(|app| app.controller.borrow().app_state().page_count()).unwrap_or(0)
}

#[wasm_bindgen]
pub fn listings_loading() -> bool {
    with_app(|app| app.controller.borrow().app_state().loading()).unwrap_or(false)
}

/// District or neighborhood name under the map center.
#[wasm_bindgen]
pub fn location_label() -> String {
    with_app(|app| app.controller.borrow().app_state().location_label().to_string())
        .unwrap_or_default()
}

/// Selected region as `{key, guName, dongId, dongName}`, or `null`.
#[wasm_bindgen]
pub fn selected_region() -> String {
    with_app(|app| {
        let c = app.controller.borrow();
        match c.app_state().selected_region() {
            Some(r) => serde_json::json!({
                "key": r.key.as_str(),
                "guName": r.gu_name,
                "dongId": r.dong_id,
                "dongName": r.dong_name,
            })
            .to_string(),
            None => "null".to_string(),
        }
    })
    .unwrap_or_else(|| "null".to_string())
}

/// Controller counters and histograms, for the debug panel.
#[wasm_bindgen]
pub fn metrics_json() -> String {
    with_app(|app| {
        let snap = app.controller.borrow().metrics().snapshot();
        let hist: serde_json::Map<String, serde_json::Value> = snap
            .histograms
            .iter()
            .map(|(name, h)| {
                (
                    name.to_string(),
                    serde_json::json!({"count": h.count, "min": h.min, "max": h.max, "sum": h.sum}),
                )
            })
            .collect();
        serde_json::json!({ "counters": snap.counters, "histograms": hist }).to_string()
    })
    .unwrap_or_else(|| "{}".to_string())
}

/// Draws a marker that is not part of the aggregation overlays, such as a
/// search result pin. The bottom center sits on the point.
///
/// Returns a handle for [`remove_placed`]; `None` before `init_map`.
#[wasm_bindgen]
pub fn place_marker(lat: f64, lng: f64, content: &str, z_index: i32) -> Option<u32> {
    let spec = MarkerSpec {
        position: LatLng::new(lat, lng),
        content: content.to_string(),
        z_index,
        x_anchor: 0.5,
        y_anchor: 1.0,
    };
    with_app(|app| app.controller.try_borrow_mut().ok()?.request_overlay(&spec))
        .flatten()
        .and_then(|h| u32::try_from(h.0).ok())
}

/// Draws an outline from a flat `[lat, lng, lat, lng, ...]` path.
///
/// `style_json` is a partial polygon style; missing fields use the defaults.
#[wasm_bindgen]
pub fn place_polygon(flat_path: Vec<f64>, style_json: &str) -> Result<Option<u32>, JsValue> {
    let style: PolygonStyle = if style_json.trim().is_empty() {
        PolygonStyle::default()
    } else {
        serde_json::from_str(style_json).map_err(|e| JsValue::from_str(&e.to_string()))?
    };
    let spec = PolygonSpec {
        path: flat_path
            .chunks_exact(2)
            .map(|p| LatLng::new(p[0], p[1]))
            .collect(),
        style,
    };
    Ok(
        with_app(|app| app.controller.try_borrow_mut().ok()?.request_polygon(&spec))
            .flatten()
            .and_then(|h| u32::try_from(h.0).ok()),
    )
}

/// Removes a marker or outline drawn by [`place_marker`] or [`place_polygon`].
#[wasm_bindgen]
pub fn remove_placed(handle: u32) {
    with_app(|app| {
        if let Ok(mut c) = app.controller.try_borrow_mut() {
            c.release_overlay(WidgetHandle(u64::from(handle)));
        }
    });
}

/// Removes every overlay and releases the map.
#[wasm_bindgen]
pub fn unmount_map() {
    if let Some(app) = APP.try_with(|app| app.borrow_mut().take()).ok().flatten() {
        if let Ok(mut c) = app.controller.try_borrow_mut() {
            c.unmount();
        }
        info!("map unmounted");
    }
}
