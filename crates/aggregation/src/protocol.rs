//! Wire types for the listing backend.
//!
//! Endpoints (relative to the API base URL):
//! - `GET  /property/count/gu/{type}`   → `[DistrictCount]`
//! - `GET  /property/count/dong/{type}` → `[NeighborhoodCount]`
//! - `POST /property/cells?type={type}` with `CellsRequest` → `[CellListings]`
//! - `POST /search/mapper` with `RegionSearchRequest` → `SearchResponse`
//!
//! Field names follow the backend's camelCase JSON.

use foundation::geo::LatLng;
use foundation::grid::GridCell;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictCount {
    pub gu_name: String,
    pub property_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborhoodCount {
    pub dong_id: u32,
    pub property_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellsRequest<'a> {
    pub cells: &'a [GridCell],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellListings {
    pub cell: GridCell,
    #[serde(default)]
    pub properties: Vec<Listing>,
}

/// One property listing as returned by the cell and search endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub property_id: u64,
    #[serde(default)]
    pub room_type: String,
    #[serde(default)]
    pub contract_type: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub dong_id: Option<u32>,
    #[serde(default)]
    pub gu_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Present only when the request carried a user id.
    #[serde(default)]
    pub liked: bool,
}

impl Listing {
    pub fn position(&self) -> Option<LatLng> {
        let p = LatLng::new(self.latitude?, self.longitude?);
        p.is_finite().then_some(p)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionSearchRequest {
    pub gu_name: Option<String>,
    pub dong_name: Option<String>,
    pub filter: String,
    pub user_id: Option<u64>,
    pub page: u32,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub properties: Vec<Listing>,
}
