use aggregation::protocol::Listing;
use aggregation::query::PropertyType;
use aggregation::regions::RegionDirectory;
use aggregation::result::RegionRef;
use foundation::geo::LatLng;
use foundation::ids::SpatialKey;
use foundation::viewport::ZoomLevel;

/// Region the user picked on the map, as shown by the listing panels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedRegion {
    pub key: SpatialKey,
    pub gu_name: Option<String>,
    pub dong_id: Option<u32>,
    pub dong_name: Option<String>,
}

impl SelectedRegion {
    pub fn from_region(key: SpatialKey, region: &RegionRef) -> Self {
        match region {
            RegionRef::City { .. } => SelectedRegion {
                key,
                gu_name: None,
                dong_id: None,
                dong_name: None,
            },
            RegionRef::District { gu_name } => SelectedRegion {
                key,
                gu_name: Some(gu_name.clone()),
                dong_id: None,
                dong_name: None,
            },
            RegionRef::Neighborhood {
                dong_id,
                gu_name,
                dong_name,
            } => SelectedRegion {
                key,
                gu_name: Some(gu_name.clone()),
                dong_id: Some(*dong_id),
                dong_name: Some(dong_name.clone()),
            },
        }
    }
}

/// State shared with the listing panels.
///
/// The map reads the property-type filter and the selected region, and
/// writes the selection, the narrowed listing set and the location label.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    property_type: PropertyType,
    selected_region: Option<SelectedRegion>,
    listings: Vec<Listing>,
    current_page: usize,
    page_size: usize,
    loading: bool,
    location_label: String,
}

impl AppState {
    pub fn new(page_size: usize) -> Self {
        Self {
            property_type: PropertyType::All,
            selected_region: None,
            listings: Vec::new(),
            current_page: 1,
            page_size: page_size.max(1),
            loading: false,
            location_label: String::new(),
        }
    }

    pub fn property_type(&self) -> PropertyType {
        self.property_type
    }

    pub fn set_property_type(&mut self, property_type: PropertyType) {
        self.property_type = property_type;
    }

    pub fn selected_region(&self) -> Option<&SelectedRegion> {
        self.selected_region.as_ref()
    }

    pub fn select_region(&mut self, region: SelectedRegion) {
        self.selected_region = Some(region);
    }

    /// Forgets the selected region and the listings narrowed to it.
    pub fn clear_region(&mut self) {
        self.selected_region = None;
        self.listings.clear();
        self.current_page = 1;
        self.loading = false;
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    /// Replaces the narrowed listing set and rewinds to the first page.
    pub fn set_listings(&mut self, listings: Vec<Listing>) {
        self.listings = listings;
        self.current_page = 1;
        self.loading = false;
    }

    pub fn page_count(&self) -> usize {
        self.listings.len().div_ceil(self.page_size)
    }

    /// 1-based page of listings; out-of-range pages are empty.
    pub fn page(&self, n: usize) -> &[Listing] {
        if n == 0 {
            return &[];
        }
        let start = (n - 1).saturating_mul(self.page_size);
        if start >= self.listings.len() {
            return &[];
        }
        let end = (start + self.page_size).min(self.listings.len());
        &self.listings[start..end]
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Moves to page `n`, clamped to the available pages.
    pub fn set_page(&mut self, n: usize) {
        self.current_page = n.clamp(1, self.page_count().max(1));
    }

    pub fn current_listings(&self) -> &[Listing] {
        self.page(self.current_page)
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn location_label(&self) -> &str {
        &self.location_label
    }

    pub fn set_location_label(&mut self, label: impl Into<String>) {
        self.location_label = label.into();
    }
}

/// Name shown for the map center: the district when zoomed out to level 6
/// or beyond, the neighborhood otherwise.
pub fn location_label(
    directory: &RegionDirectory,
    center: LatLng,
    level: ZoomLevel,
) -> Option<String> {
    if level >= 6 {
        directory
            .nearest_district(center)
            .map(|(_, info)| info.label.clone())
    } else {
        directory
            .nearest_neighborhood(center)
            .map(|(_, _, info)| info.label.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::{AppState, SelectedRegion, location_label};
    use aggregation::protocol::Listing;
    use aggregation::regions::{RegionDirectory, RegionInfo};
    use aggregation::result::RegionRef;
    use foundation::geo::LatLng;
    use foundation::ids::SpatialKey;
    use pretty_assertions::assert_eq;

    fn listings(n: u64) -> Vec<Listing> {
        (1..=n)
            .map(|id| Listing {
                property_id: id,
                room_type: String::new(),
                contract_type: String::new(),
                price: String::new(),
                address: String::new(),
                latitude: None,
                longitude: None,
                dong_id: None,
                gu_name: None,
                image_url: None,
                liked: false,
            })
            .collect()
    }

    fn ids(page: &[Listing]) -> Vec<u64> {
        page.iter().map(|l| l.property_id).collect()
    }

    #[test]
    fn pages_slice_by_page_size() {
        let mut app = AppState::new(15);
        app.set_listings(listings(32));
        assert_eq!(app.page_count(), 3);
        assert_eq!(app.page(1).len(), 15);
        assert_eq!(ids(app.page(3)), vec![31, 32]);
        assert!(app.page(4).is_empty());
        assert!(app.page(0).is_empty());

        app.set_page(9);
        assert_eq!(app.current_page(), 3);
        app.set_listings(listings(3));
        assert_eq!(app.current_page(), 1);
        assert_eq!(ids(app.current_listings()), vec![1, 2, 3]);
    }

    #[test]
    fn clearing_the_region_drops_listings() {
        let mut app = AppState::new(10);
        app.select_region(SelectedRegion::from_region(
            SpatialKey::district("마포구"),
            &RegionRef::District {
                gu_name: "마포구".into(),
            },
        ));
        app.set_loading(true);
        app.set_listings(listings(4));
        app.clear_region();
        assert_eq!(app.selected_region(), None);
        assert!(app.listings().is_empty());
        assert!(!app.loading());
    }

    #[test]
    fn neighborhood_selection_keeps_both_names() {
        let r = SelectedRegion::from_region(
            SpatialKey::neighborhood(11440),
            &RegionRef::Neighborhood {
                dong_id: 11440,
                gu_name: "마포구".into(),
                dong_name: "공덕동".into(),
            },
        );
        assert_eq!(r.gu_name.as_deref(), Some("마포구"));
        assert_eq!(r.dong_name.as_deref(), Some("공덕동"));
        assert_eq!(r.dong_id, Some(11440));
    }

    #[test]
    fn label_switches_granularity_at_level_six() {
        let mut dir = RegionDirectory::new();
        let at = LatLng::new(37.5447, 126.9516);
        dir.insert_district(
            "마포구",
            RegionInfo {
                label: "마포구".into(),
                centroid: LatLng::new(37.5638, 126.9084),
                boundary: None,
            },
        );
        dir.insert_neighborhood(
            11440,
            "마포구",
            RegionInfo { label: "공덕동".into(), centroid: at, boundary: None },
        );
        assert_eq!(location_label(&dir, at, 6).as_deref(), Some("마포구"));
        assert_eq!(location_label(&dir, at, 5).as_deref(), Some("공덕동"));
        assert_eq!(location_label(&RegionDirectory::new(), at, 5), None);
    }
}
