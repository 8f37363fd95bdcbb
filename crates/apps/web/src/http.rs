use aggregation::client::{AggregationClient, FetchError, RegionCounts};
use aggregation::policy::Tier;
use aggregation::protocol::{
    CellListings, CellsRequest, DistrictCount, Listing, NeighborhoodCount, RegionSearchRequest,
    SearchResponse,
};
use aggregation::query::{PropertyType, RegionQuery};
use controller::config::MapConfig;
use foundation::grid::GridCell;
use gloo_net::http::{Request, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::AbortController;

/// Listing backend over `fetch`.
#[derive(Debug, Clone)]
pub struct HttpAggregationClient {
    config: MapConfig,
}

impl HttpAggregationClient {
    pub fn new(config: MapConfig) -> Self {
        Self { config }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        body: Option<String>,
    ) -> Result<T, FetchError> {
        let timeout = Timeout::start(self.config.fetch_timeout_ms)?;
        let request = request.abort_signal(Some(&timeout.controller.signal()));
        let request = match body {
            Some(json) => request
                .header("Content-Type", "application/json")
                .body(json)
                .map_err(|e| FetchError::Transport(e.to_string()))?,
            None => request.build().map_err(|e| FetchError::Transport(e.to_string()))?,
        };

        let resp = request.send().await.map_err(|e| timeout.classify(e))?;
        decode(resp, &timeout).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        self.send(Request::get(&self.config.endpoint(path)), None).await
    }

    async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, FetchError> {
        let json = serde_json::to_string(body).map_err(|e| FetchError::Decode(e.to_string()))?;
        self.send(Request::post(&self.config.endpoint(path)), Some(json))
            .await
    }
}

/// Reads the body under the same abort signal as the request.
async fn decode<T: DeserializeOwned>(resp: Response, timeout: &Timeout) -> Result<T, FetchError> {
    let text = resp.text().await.map_err(|e| timeout.classify(e));
    if !resp.ok() {
        let body = match text {
            Ok(body) => body,
            Err(err @ FetchError::Timeout { .. }) => return Err(err),
            Err(_) => String::new(),
        };
        return Err(FetchError::Status {
            code: resp.status(),
            body,
        });
    }
    serde_json::from_str(&text?).map_err(|e| FetchError::Decode(e.to_string()))
}

/// A failed fetch or body read is a timeout once the abort timer has fired.
fn classify_failure(err: impl std::fmt::Display, fired: bool, after_ms: u32) -> FetchError {
    if fired {
        FetchError::Timeout { after_ms }
    } else {
        FetchError::Transport(err.to_string())
    }
}

impl AggregationClient for HttpAggregationClient {
    async fn counts_by_tier(
        &self,
        tier: Tier,
        property_type: PropertyType,
    ) -> Result<RegionCounts, FetchError> {
        let kind = property_type.key();
        match tier {
            Tier::City | Tier::District => {
                let counts: Vec<DistrictCount> =
                    self.get_json(&format!("/property/count/gu/{kind}")).await?;
                Ok(RegionCounts::Districts(counts))
            }
            Tier::Neighborhood => {
                let counts: Vec<NeighborhoodCount> =
                    self.get_json(&format!("/property/count/dong/{kind}")).await?;
                Ok(RegionCounts::Neighborhoods(counts))
            }
            Tier::Grid => Err(FetchError::Decode("grid tier has no count endpoint".into())),
        }
    }

    async fn listings_by_cell(
        &self,
        cells: &[GridCell],
        property_type: PropertyType,
    ) -> Result<Vec<CellListings>, FetchError> {
        self.post_json(
            &format!("/property/cells?type={}", property_type.key()),
            &CellsRequest { cells },
        )
        .await
    }

    async fn listings_by_region(&self, query: &RegionQuery) -> Result<Vec<Listing>, FetchError> {
        let req = RegionSearchRequest {
            gu_name: query.gu_name.clone(),
            dong_name: query.dong_name.clone(),
            filter: query.property_type.key().to_string(),
            user_id: self.config.user_id,
            page: 1,
            size: self.config.listing_page_size,
        };
        let resp: SearchResponse = self.post_json("/search/mapper", &req).await?;
        Ok(resp.properties)
    }
}

/// Aborts the request after `ms` unless dropped first.
struct Timeout {
    controller: AbortController,
    timer: i32,
    after_ms: u32,
    // Kept alive until the timer is cleared.
    _on_expire: Closure<dyn FnMut()>,
}

impl Timeout {
    fn start(ms: u32) -> Result<Self, FetchError> {
        let controller =
            AbortController::new().map_err(|e| FetchError::Transport(js_message(&e)))?;
        let abort = controller.clone();
        let on_expire = Closure::wrap(Box::new(move || abort.abort()) as Box<dyn FnMut()>);
        let window = web_sys::window().ok_or_else(|| FetchError::Transport("no window".into()))?;
        let timer = window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                on_expire.as_ref().unchecked_ref(),
                i32::try_from(ms).unwrap_or(i32::MAX),
            )
            .map_err(|e| FetchError::Transport(js_message(&e)))?;
        Ok(Self {
            controller,
            timer,
            after_ms: ms,
            _on_expire: on_expire,
        })
    }

    fn fired(&self) -> bool {
        self.controller.signal().aborted()
    }

    fn classify(&self, err: gloo_net::Error) -> FetchError {
        classify_failure(err, self.fired(), self.after_ms)
    }
}

impl Drop for Timeout {
    fn drop(&mut self) {
        if let Some(window) = web_sys::window() {
            window.clear_timeout_with_handle(self.timer);
        }
    }
}

fn js_message(v: &JsValue) -> String {
    v.as_string().unwrap_or_else(|| format!("{v:?}"))
}
