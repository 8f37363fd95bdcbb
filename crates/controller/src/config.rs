use aggregation::policy::ZoomResolutionPolicy;
use foundation::geo::LatLng;
use foundation::viewport::ZoomLevel;
use overlays::symbology::OverlayStyles;
use serde::{Deserialize, Serialize};

/// Embedding-page configuration. Every field is optional in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Prefix for every backend path, without a trailing slash.
    pub api_base_url: String,
    /// Sent with region searches so listings carry the `liked` flag.
    pub user_id: Option<u64>,
    /// Name and marker position of the single CITY-tier overlay.
    pub city_name: String,
    pub city_center: LatLng,
    /// Zoom level the map starts at.
    pub initial_level: ZoomLevel,
    /// Listings per page in the listing panel.
    pub page_size: usize,
    /// `size` sent to the region search endpoint.
    pub listing_page_size: u32,
    /// Requests still pending after this long are aborted.
    pub fetch_timeout_ms: u32,
    /// Grid queries above this many cells are skipped.
    pub max_grid_cells: usize,
    /// At NEIGHBORHOOD tier, only show neighborhoods of the selected district.
    pub narrow_neighborhoods_to_selection: bool,
    pub policy: ZoomResolutionPolicy,
    pub styles: OverlayStyles,
    /// `tracing` filter directive for the browser console.
    pub log_level: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            api_base_url: "/api".to_string(),
            user_id: None,
            city_name: "서울".to_string(),
            city_center: LatLng::new(37.5665, 126.978),
            initial_level: 8,
            page_size: 15,
            listing_page_size: 10_000,
            fetch_timeout_ms: 10_000,
            max_grid_cells: 4_096,
            narrow_neighborhoods_to_selection: true,
            policy: ZoomResolutionPolicy::default(),
            styles: OverlayStyles::default(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    /// Zoom thresholds that are not strictly descending from CITY to GRID.
    InconsistentPolicy,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "config parse error: {msg}"),
            ConfigError::InconsistentPolicy => {
                write!(f, "zoom thresholds must descend from city to grid")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl MapConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: MapConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        if !cfg.policy.is_consistent() {
            return Err(ConfigError::InconsistentPolicy);
        }
        Ok(cfg)
    }

    /// Joins `path` onto the API base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
