use aggregation::client::{FetchError, ResultContext};
use aggregation::policy::{Resolution, Tier};
use aggregation::protocol::Listing;
use aggregation::query::{AggregationQuery, PropertyType, RegionFilter, RegionQuery};
use aggregation::regions::RegionDirectory;
use aggregation::result::{AggregationResult, EntryPayload};
use foundation::grid::GridIndexer;
use foundation::handles::WidgetHandle;
use foundation::ids::SpatialKey;
use foundation::viewport::{Viewport, ZoomLevel};
use overlays::cache::{OverlayCache, ReconcileReport};
use overlays::host::{MapHost, MarkerSpec, PolygonSpec};
use overlays::selection::{SelectionChange, SelectionState};
use runtime::event_bus::EventBus;
use runtime::generation::{Generation, GenerationCounter};
use runtime::metrics::{Metrics, names};
use tracing::{debug, info, warn};

use crate::app_state::{AppState, SelectedRegion, location_label};
use crate::config::MapConfig;
use crate::state::{Completion, ControllerState, FetchTicket, ListingCompletion, ListingTicket};

/// Keeps rendered overlays in step with the viewport.
///
/// The controller owns the map host outright. Collaborators never see the
/// host; they go through [`viewport`](Self::viewport),
/// [`request_overlay`](Self::request_overlay) and
/// [`request_polygon`](Self::request_polygon).
///
/// Every settle issues a new [`Generation`]; a completion is applied only if
/// its ticket carries the latest one.
#[derive(Debug)]
pub struct ViewportController<H: MapHost> {
    host: Option<H>,
    config: MapConfig,
    directory: RegionDirectory,
    cache: OverlayCache,
    selection: SelectionState,
    app: AppState,
    state: ControllerState,
    generations: GenerationCounter,
    listing_generations: GenerationCounter,
    viewport: Option<Viewport>,
    external_markers: Vec<WidgetHandle>,
    external_polygons: Vec<WidgetHandle>,
    events: EventBus,
    metrics: Metrics,
}

impl<H: MapHost> ViewportController<H> {
    pub fn new(config: MapConfig, directory: RegionDirectory) -> Self {
        Self {
            host: None,
            cache: OverlayCache::new(config.styles.clone()),
            app: AppState::new(config.page_size),
            config,
            directory,
            selection: SelectionState::new(),
            state: ControllerState::Idle,
            generations: GenerationCounter::new(),
            listing_generations: GenerationCounter::new(),
            viewport: None,
            external_markers: Vec::new(),
            external_polygons: Vec::new(),
            events: EventBus::new(),
            metrics: Metrics::new(),
        }
    }

    /// Hands the map host to the controller. A previously attached host is
    /// cleared and handed back.
    pub fn attach_host(&mut self, host: H) -> Option<H> {
        let previous = self.unmount();
        self.host = Some(host);
        self.events
            .emit(self.generations.latest(), "attach", "map host attached");
        info!("map host attached");
        previous
    }

    pub fn is_attached(&self) -> bool {
        self.host.is_some()
    }

    /// Starts a fetch for the current viewport.
    ///
    /// Returns `None` when there is nothing to fetch: no host yet, no
    /// viewport, a suspended zoom level, or a grid query over the cell cap.
    pub fn on_settle(&mut self) -> Option<FetchTicket> {
        let viewport = self.host.as_ref()?.viewport()?;
        self.viewport = Some(viewport);
        self.metrics.inc(names::SETTLES);
        if let Some(label) =
            location_label(&self.directory, viewport.bounds.center(), viewport.level)
        {
            self.app.set_location_label(label);
        }

        let (tier, cell_size) = match self.config.policy.resolve(viewport.level) {
            Resolution::Suspended => {
                self.suspend(viewport.level);
                return None;
            }
            Resolution::Active { tier, cell_size } => (tier, cell_size),
        };

        let property_type = self.app.property_type();
        let query = match tier {
            Tier::Grid => {
                let indexer = GridIndexer::new(cell_size);
                let count = indexer.cell_count(&viewport.bounds);
                if count > self.config.max_grid_cells {
                    warn!(
                        cells = count,
                        max = self.config.max_grid_cells,
                        "grid query too large, skipped"
                    );
                    self.invalidate();
                    return None;
                }
                AggregationQuery::Cells {
                    cells: indexer.cells(&viewport.bounds),
                    property_type,
                }
            }
            _ => AggregationQuery::Counts {
                tier,
                region: self.region_filter(tier),
                property_type,
            },
        };

        let generation = self.generations.advance();
        self.state = ControllerState::Fetching { generation, tier };
        self.events.emit(
            generation,
            "settle",
            format!("level {} → {tier}", viewport.level),
        );
        debug!(%generation, level = viewport.level, %tier, "settle");
        Some(FetchTicket {
            generation,
            viewport,
            query,
        })
    }

    /// Neighborhood counts narrow to the district held in the application
    /// state. That region outlives its overlay: zooming from a clicked
    /// district into the neighborhood band destroys the district marker but
    /// keeps the narrowing until the user deselects or picks another region.
    fn region_filter(&self, tier: Tier) -> RegionFilter {
        if tier != Tier::Neighborhood || !self.config.narrow_neighborhoods_to_selection {
            return RegionFilter::Everywhere;
        }
        match self.app.selected_region().and_then(|r| r.gu_name.clone()) {
            Some(gu) => RegionFilter::District(gu),
            None => RegionFilter::Everywhere,
        }
    }

    /// Applies the answer to `ticket` if no newer settle happened since.
    pub fn complete(
        &mut self,
        ticket: &FetchTicket,
        result: Result<AggregationResult, FetchError>,
    ) -> Completion {
        if !self.generations.is_latest(ticket.generation) {
            self.metrics.inc(names::FETCH_STALE);
            self.events
                .emit(ticket.generation, "stale", "superseded result dropped");
            debug!(
                generation = %ticket.generation,
                latest = %self.generations.latest(),
                "stale result dropped"
            );
            return Completion::Stale;
        }
        self.state = ControllerState::Idle;

        let result = match result {
            Ok(r) => r,
            Err(err) => {
                self.metrics.inc(names::FETCH_FAILED);
                self.events
                    .emit(ticket.generation, "fetch_failed", err.to_string());
                warn!(
                    generation = %ticket.generation,
                    error = %err,
                    "aggregation fetch failed; keeping overlays"
                );
                return Completion::Failed(err);
            }
        };

        let Some(host) = self.host.as_mut() else {
            return Completion::Stale;
        };
        let report = self.cache.reconcile(host, &result);
        if let Some(dropped) = self.selection.retain_rendered(&self.cache) {
            debug!(key = %dropped, "selection dropped with its overlay");
        }
        self.record(&report);
        self.events.emit(
            ticket.generation,
            "applied",
            format!(
                "{} +{} ~{} -{}",
                result.tier, report.created, report.updated, report.destroyed
            ),
        );
        Completion::Applied(report)
    }

    fn record(&mut self, report: &ReconcileReport) {
        self.metrics.inc(names::FETCH_APPLIED);
        self.metrics.add(names::OVERLAYS_CREATED, report.created as u64);
        self.metrics.add(names::OVERLAYS_UPDATED, report.updated as u64);
        self.metrics
            .add(names::OVERLAYS_DESTROYED, report.destroyed as u64);
        self.metrics.add(names::OVERLAYS_REBOUND, report.rebound as u64);
        if report.tier_switched {
            self.metrics.inc(names::TIER_SWITCHES);
        }
        self.metrics
            .record(names::RENDERED_PER_SETTLE, self.cache.len() as i64);
    }

    /// Reacts to a zoom before the map settles.
    ///
    /// A fetch still in flight for a tier other than the one `level` resolves
    /// to is invalidated, whatever is rendered. Rendered overlays of another
    /// tier are cleared along with the selection. Returns `true` if either
    /// happened.
    pub fn on_zoom_changed(&mut self, level: ZoomLevel) -> bool {
        if self.host.is_none() {
            return false;
        }
        let next = self.config.policy.resolve(level).tier();

        let mut acted = false;
        let stale_pending = self.state.pending_tier().filter(|t| Some(*t) != next);
        if let Some(pending) = stale_pending {
            self.invalidate();
            self.events.emit(
                self.generations.latest(),
                "zoom_invalidate",
                format!("level {level}: pending {pending} fetch dropped"),
            );
            debug!(level, %pending, "tier change invalidated pending fetch");
            acted = true;
        }

        let stale_rendered = self.cache.tier().filter(|t| Some(*t) != next);
        if let Some(current) = stale_rendered {
            let cleared = self.clear_overlays();
            self.invalidate();
            self.metrics.inc(names::ZOOM_CLEARS);
            self.events.emit(
                self.generations.latest(),
                "zoom_clear",
                format!("level {level}: {current} cleared"),
            );
            debug!(level, %current, cleared, "tier change cleared overlays");
            acted = true;
        }
        acted
    }

    fn suspend(&mut self, level: ZoomLevel) {
        let cleared = self.clear_overlays();
        self.invalidate();
        self.metrics.inc(names::SUSPENSIONS);
        self.events.emit(
            self.generations.latest(),
            "suspended",
            format!("level {level}"),
        );
        debug!(level, cleared, "no tier for zoom level; overlays cleared");
    }

    // Makes every outstanding ticket stale and returns to Idle.
    fn invalidate(&mut self) {
        self.generations.advance();
        self.state = ControllerState::Idle;
    }

    fn clear_overlays(&mut self) -> usize {
        let Some(host) = self.host.as_mut() else {
            return 0;
        };
        self.selection.clear(&mut self.cache, host);
        let n = self.cache.clear(host);
        self.metrics.add(names::OVERLAYS_DESTROYED, n as u64);
        n
    }

    /// Toggles selection of the clicked overlay.
    ///
    /// A region click records the region and returns the listing request to
    /// run; a grid-cell click writes the cell's listings straight away.
    pub fn on_overlay_click(&mut self, key: &SpatialKey) -> Option<ListingTicket> {
        let host = self.host.as_mut()?;
        let entry = self.cache.get(key)?.entry.clone();
        let change = self.selection.select(key, &mut self.cache, host);
        self.metrics.inc(names::SELECTIONS);
        // Any region listing still in flight belongs to the previous click.
        let generation = self.listing_generations.advance();

        if let SelectionChange::Deselected(_) = change {
            self.app.clear_region();
            self.events.emit(generation, "deselect", key.to_string());
            return None;
        }
        self.events.emit(generation, "select", key.to_string());

        match entry.payload {
            EntryPayload::Region { region, .. } => {
                let selected = SelectedRegion::from_region(key.clone(), &region);
                let query = RegionQuery {
                    gu_name: selected.gu_name.clone(),
                    dong_name: selected.dong_name.clone(),
                    property_type: self.app.property_type(),
                };
                self.app.select_region(selected);
                self.app.set_loading(true);
                Some(ListingTicket {
                    generation,
                    key: key.clone(),
                    query,
                })
            }
            EntryPayload::Cell { listings, .. } => {
                debug!(key = %key, listings = listings.len(), "cell listings selected");
                self.app.set_listings(listings);
                None
            }
        }
    }

    pub fn complete_listings(
        &mut self,
        ticket: &ListingTicket,
        result: Result<Vec<Listing>, FetchError>,
    ) -> ListingCompletion {
        if !self.listing_generations.is_latest(ticket.generation) {
            debug!(key = %ticket.key, "stale listing result dropped");
            return ListingCompletion::Stale;
        }
        match result {
            Ok(listings) => {
                let n = listings.len();
                self.app.set_listings(listings);
                ListingCompletion::Applied(n)
            }
            Err(err) => {
                self.app.set_loading(false);
                warn!(key = %ticket.key, error = %err, "region listing fetch failed");
                ListingCompletion::Failed(err)
            }
        }
    }

    /// Changes the listing filter. The next settle fetches with it.
    pub fn set_property_type(&mut self, label: &str) {
        let property_type = PropertyType::from_label(label);
        self.app.set_property_type(property_type);
        debug!(property_type = property_type.key(), "property type changed");
    }

    /// Draws a marker on behalf of a collaborator. Removed on unmount.
    pub fn request_overlay(&mut self, spec: &MarkerSpec) -> Option<WidgetHandle> {
        let h = self.host.as_mut()?.add_marker(spec);
        self.external_markers.push(h);
        Some(h)
    }

    /// Draws a polygon on behalf of a collaborator. Removed on unmount.
    pub fn request_polygon(&mut self, spec: &PolygonSpec) -> Option<WidgetHandle> {
        let h = self.host.as_mut()?.add_polygon(spec);
        self.external_polygons.push(h);
        Some(h)
    }

    pub fn release_overlay(&mut self, handle: WidgetHandle) {
        let Some(host) = self.host.as_mut() else {
            return;
        };
        if let Some(i) = self.external_markers.iter().position(|h| *h == handle) {
            self.external_markers.swap_remove(i);
            host.remove_marker(handle);
        } else if let Some(i) = self.external_polygons.iter().position(|h| *h == handle) {
            self.external_polygons.swap_remove(i);
            host.remove_polygon(handle);
        }
    }

    /// Tears everything down and hands the host back.
    pub fn unmount(&mut self) -> Option<H> {
        let mut host = self.host.take()?;
        self.selection.clear(&mut self.cache, &mut host);
        let n = self.cache.clear(&mut host);
        for h in self.external_markers.drain(..) {
            host.remove_marker(h);
        }
        for h in self.external_polygons.drain(..) {
            host.remove_polygon(h);
        }
        self.generations.advance();
        self.listing_generations.advance();
        self.state = ControllerState::Idle;
        self.events
            .emit(self.generations.latest(), "unmount", format!("{n} overlays removed"));
        info!(overlays = n, "map host detached");
        Some(host)
    }

    /// Static inputs for turning fetched counts into overlay entries.
    pub fn result_context(&self) -> ResultContext<'_> {
        ResultContext {
            directory: &self.directory,
            city_name: &self.config.city_name,
            city_center: self.config.city_center,
        }
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn latest_generation(&self) -> Generation {
        self.generations.latest()
    }

    pub fn tier(&self) -> Option<Tier> {
        self.cache.tier()
    }

    pub fn rendered_keys(&self) -> Vec<SpatialKey> {
        self.cache.keys().cloned().collect()
    }

    pub fn selected(&self) -> Option<&SpatialKey> {
        self.selection.selected()
    }

    pub fn app_state(&self) -> &AppState {
        &self.app
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    #[cfg(test)]
    pub(crate) fn host_mut(&mut self) -> Option<&mut H> {
        self.host.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::ViewportController;
    use crate::config::MapConfig;
    use crate::state::{Completion, ControllerState, ListingCompletion};
    use aggregation::client::FetchError;
    use aggregation::policy::Tier;
    use aggregation::protocol::Listing;
    use aggregation::query::{AggregationQuery, PropertyType, RegionFilter};
    use aggregation::regions::RegionDirectory;
    use aggregation::result::{AggregateEntry, AggregationResult, EntryPayload, RegionRef};
    use foundation::bounds::GeoBounds;
    use foundation::geo::LatLng;
    use foundation::grid::GridIndexer;
    use foundation::ids::SpatialKey;
    use foundation::viewport::Viewport;
    use overlays::host::{MarkerSpec, PolygonSpec};
    use overlays::memory_host::{HostOp, InMemoryHost};
    use overlays::symbology::PolygonStyle;
    use pretty_assertions::assert_eq;
    use runtime::metrics::names;

    fn seoul(level: i32) -> Viewport {
        Viewport::new(GeoBounds::from_edges(37.54, 126.90, 37.56, 126.94), level)
    }

    fn controller(level: i32) -> ViewportController<InMemoryHost> {
        let mut c = ViewportController::new(MapConfig::default(), RegionDirectory::new());
        c.attach_host(InMemoryHost::new(seoul(level)));
        c
    }

    fn set_level(c: &mut ViewportController<InMemoryHost>, vp: Viewport) {
        c.host_mut().expect("host").set_viewport(vp);
    }

    fn district(name: &str, count: u64) -> AggregateEntry {
        AggregateEntry {
            key: SpatialKey::district(name),
            label: name.into(),
            count,
            centroid: LatLng::new(37.55, 126.92),
            payload: EntryPayload::Region {
                region: RegionRef::District { gu_name: name.into() },
                boundary: None,
            },
        }
    }

    fn districts(counts: &[(&str, u64)]) -> AggregationResult {
        let entries = counts.iter().map(|(n, c)| district(n, *c)).collect();
        AggregationResult::new(Tier::District, entries)
    }

    fn cell_result(vp: &Viewport, size: f64) -> AggregationResult {
        let cells = GridIndexer::new(size).cells(&vp.bounds);
        let entries = cells
            .into_iter()
            .take(2)
            .enumerate()
            .filter_map(|(i, cell)| {
                aggregation::cluster::cell_entry(cell, vec![listing(i as u64 + 1)])
            })
            .collect();
        AggregationResult::new(Tier::Grid, entries)
    }

    fn listing(id: u64) -> Listing {
        Listing {
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
        }
    }

    fn keys(c: &ViewportController<InMemoryHost>) -> Vec<String> {
        c.rendered_keys().iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn events_before_attach_are_ignored() {
        let mut c: ViewportController<InMemoryHost> =
            ViewportController::new(MapConfig::default(), RegionDirectory::new());
        assert!(c.on_settle().is_none());
        assert!(!c.on_zoom_changed(2));
        assert!(c.on_overlay_click(&SpatialKey::district("A")).is_none());
        assert!(c.unmount().is_none());
        assert_eq!(c.state(), ControllerState::Idle);
    }

    #[test]
    fn district_settle_then_small_pan_only_updates() {
        let mut c = controller(7);
        let t = c.on_settle().expect("ticket");
        assert_eq!(t.tier(), Tier::District);
        assert_eq!(
            c.state(),
            ControllerState::Fetching { generation: t.generation, tier: Tier::District }
        );

        let res = districts(&[("A", 12), ("B", 0), ("C", 7)]);
        let Completion::Applied(r) = c.complete(&t, Ok(res)) else {
            panic!("expected applied");
        };
        assert_eq!(r.created, 3);
        assert_eq!(keys(&c), vec!["gu:A", "gu:B", "gu:C"]);
        assert!(c.state().is_idle());

        set_level(&mut c, Viewport::new(seoul(7).bounds.translated(0.001, 0.001), 7));
        c.host_mut().expect("host").take_ops();
        let t = c.on_settle().expect("ticket");
        let res = districts(&[("A", 13), ("B", 0), ("C", 7)]);
        let Completion::Applied(r) = c.complete(&t, Ok(res)) else {
            panic!("expected applied");
        };
        assert_eq!((r.created, r.updated, r.unchanged, r.destroyed), (0, 1, 2, 0));
        let ops = c.host_mut().expect("host").take_ops();
        assert!(ops.iter().all(|op| matches!(op, HostOp::UpdateMarker(_))));
        assert_eq!(c.metrics().counter(names::OVERLAYS_CREATED), 3);
    }

    #[test]
    fn zoom_into_grid_clears_districts_before_any_cell() {
        let mut c = controller(7);
        let t = c.on_settle().expect("ticket");
        c.complete(&t, Ok(districts(&[("A", 12), ("B", 0), ("C", 7)])));
        c.host_mut().expect("host").take_ops();

        assert!(c.on_zoom_changed(2));
        assert!(c.rendered_keys().is_empty());
        assert_eq!(c.tier(), None);

        set_level(&mut c, seoul(2));
        let t = c.on_settle().expect("ticket");
        let AggregationQuery::Cells { cells, .. } = &t.query else {
            panic!("expected a cell query");
        };
        assert!(cells.iter().all(|cell| (cell.size() - 0.001).abs() < 1e-12));
        c.complete(&t, Ok(cell_result(&seoul(2), 0.001)));

        let ops = c.host_mut().expect("host").take_ops();
        let last_destroy = ops.iter().rposition(|op| op.is_destroy()).expect("destroys");
        let first_create = ops.iter().position(|op| op.is_create()).expect("creates");
        assert!(last_destroy < first_create);
        assert_eq!(c.tier(), Some(Tier::Grid));
        assert_eq!(c.rendered_keys().len(), 2);
    }

    #[test]
    fn tier_switch_without_zoom_event_still_clears_first() {
        let mut c = controller(7);
        let t = c.on_settle().expect("ticket");
        c.complete(&t, Ok(districts(&[("A", 12)])));
        set_level(&mut c, seoul(3));
        let t = c.on_settle().expect("ticket");
        let Completion::Applied(r) = c.complete(&t, Ok(cell_result(&seoul(3), 0.002))) else {
            panic!("expected applied");
        };
        assert!(r.tier_switched);
        assert_eq!(r.destroyed, 1);
        assert!(keys(&c).iter().all(|k| k.starts_with("cell:")));
    }

    #[test]
    fn failed_latest_fetch_keeps_previous_overlays() {
        let mut c = controller(7);
        let mut last = None;
        for _ in 0..4 {
            let t = c.on_settle().expect("ticket");
            c.complete(&t, Ok(districts(&[("A", 12), ("B", 3)])));
            last = Some(t.generation);
        }
        assert_eq!(last.map(|g| g.0), Some(4));
        let before = keys(&c);

        let t = c.on_settle().expect("ticket");
        assert_eq!(t.generation.0, 5);
        let got = c.complete(&t, Err(FetchError::Transport("offline".into())));
        assert_eq!(got, Completion::Failed(FetchError::Transport("offline".into())));
        assert_eq!(keys(&c), before);
        assert_eq!(c.state(), ControllerState::Idle);
        assert_eq!(c.metrics().counter(names::FETCH_FAILED), 1);
    }

    #[test]
    fn late_response_for_older_generation_is_dropped() {
        let mut c = controller(7);
        let g1 = c.on_settle().expect("g1");
        let g2 = c.on_settle().expect("g2");
        assert!(g1.generation < g2.generation);

        c.complete(&g2, Ok(districts(&[("B", 1)])));
        c.host_mut().expect("host").take_ops();
        assert_eq!(c.complete(&g1, Ok(districts(&[("A", 9)]))), Completion::Stale);
        assert_eq!(keys(&c), vec!["gu:B"]);
        assert!(c.host_mut().expect("host").ops().is_empty());
        assert_eq!(c.events().last().map(|e| e.kind), Some("stale"));
    }

    #[test]
    fn zoom_clear_invalidates_in_flight_fetch() {
        let mut c = controller(7);
        let t = c.on_settle().expect("ticket");
        c.complete(&t, Ok(districts(&[("A", 1)])));
        let pending = c.on_settle().expect("ticket");
        assert!(c.on_zoom_changed(2));
        assert_eq!(c.complete(&pending, Ok(districts(&[("A", 2)]))), Completion::Stale);
        assert!(c.rendered_keys().is_empty());
    }

    #[test]
    fn suspended_level_clears_everything() {
        let mut c = controller(7);
        let t = c.on_settle().expect("ticket");
        c.complete(&t, Ok(districts(&[("A", 1), ("B", 2)])));
        c.on_overlay_click(&SpatialKey::district("A"));

        set_level(&mut c, seoul(0));
        assert!(c.on_settle().is_none());
        assert!(c.rendered_keys().is_empty());
        assert_eq!(c.selected(), None);
        assert_eq!(c.host_mut().expect("host").marker_count(), 0);
        assert_eq!(c.metrics().counter(names::SUSPENSIONS), 1);
    }

    #[test]
    fn oversized_grid_query_is_skipped() {
        let config = MapConfig { max_grid_cells: 10, ..MapConfig::default() };
        let mut c = ViewportController::new(config, RegionDirectory::new());
        c.attach_host(InMemoryHost::new(seoul(1)));
        assert!(c.on_settle().is_none());
        assert!(c.state().is_idle());
    }

    #[test]
    fn neighborhood_counts_narrow_to_selected_district() {
        let mut c = controller(7);
        let t = c.on_settle().expect("ticket");
        c.complete(&t, Ok(districts(&[("마포구", 12)])));
        let ticket = c.on_overlay_click(&SpatialKey::district("마포구")).expect("listing ticket");
        assert_eq!(ticket.query.gu_name.as_deref(), Some("마포구"));
        assert!(c.app_state().loading());

        set_level(&mut c, seoul(5));
        let t = c.on_settle().expect("ticket");
        assert_eq!(
            t.query,
            AggregationQuery::Counts {
                tier: Tier::Neighborhood,
                region: RegionFilter::District("마포구".into()),
                property_type: PropertyType::All,
            }
        );
    }

    #[test]
    fn region_clicks_are_exclusive_and_last_wins() {
        let mut c = controller(7);
        let t = c.on_settle().expect("ticket");
        c.complete(&t, Ok(districts(&[("A", 1), ("B", 2)])));

        let first = c.on_overlay_click(&SpatialKey::district("A")).expect("A");
        let second = c.on_overlay_click(&SpatialKey::district("B")).expect("B");
        assert_eq!(c.selected(), Some(&SpatialKey::district("B")));
        let emphasized: Vec<_> = c
            .rendered_keys()
            .into_iter()
            .filter(|k| c.cache.get(k).is_some_and(|o| o.emphasized))
            .collect();
        assert_eq!(emphasized, vec![SpatialKey::district("B")]);

        assert_eq!(c.complete_listings(&first, Ok(vec![listing(1)])), ListingCompletion::Stale);
        assert_eq!(
            c.complete_listings(&second, Ok(vec![listing(2), listing(3)])),
            ListingCompletion::Applied(2)
        );
        assert_eq!(c.app_state().listings().len(), 2);
        assert_eq!(c.app_state().current_page(), 1);

        assert!(c.on_overlay_click(&SpatialKey::district("B")).is_none());
        assert_eq!(c.selected(), None);
        assert_eq!(c.app_state().selected_region(), None);
    }

    #[test]
    fn cell_click_writes_listings_directly() {
        let mut c = controller(3);
        let t = c.on_settle().expect("ticket");
        let res = cell_result(&seoul(3), 0.002);
        let key = res.entries[0].key.clone();
        c.complete(&t, Ok(res));
        assert!(c.on_overlay_click(&key).is_none());
        assert_eq!(c.app_state().listings().len(), 1);
        assert_eq!(c.selected(), Some(&key));
    }

    #[test]
    fn property_type_flows_into_queries() {
        let mut c = controller(7);
        c.set_property_type("오피스텔");
        let t = c.on_settle().expect("ticket");
        assert!(matches!(
            t.query,
            AggregationQuery::Counts { property_type: PropertyType::Office, .. }
        ));
    }

    #[test]
    fn unmount_removes_all_widgets() {
        let mut c = controller(7);
        let t = c.on_settle().expect("ticket");
        c.complete(&t, Ok(districts(&[("A", 1)])));
        let pin = c
            .request_overlay(&MarkerSpec {
                position: LatLng::new(37.55, 126.92),
                content: "pin".into(),
                z_index: 10,
                x_anchor: 0.5,
                y_anchor: 0.5,
            })
            .expect("marker");
        let outline = c
            .request_polygon(&PolygonSpec {
                path: vec![
                    LatLng::new(37.54, 126.90),
                    LatLng::new(37.56, 126.90),
                    LatLng::new(37.56, 126.94),
                ],
                style: PolygonStyle::default(),
            })
            .expect("polygon");
        assert_eq!(c.host_mut().expect("host").marker_count(), 2);
        assert_eq!(c.host_mut().expect("host").polygon_count(), 1);

        let host = c.unmount().expect("host");
        assert_eq!((host.marker_count(), host.listener_count()), (0, 0));
        assert!(host.marker(pin).is_none());
        assert!(host.polygon(outline).is_none());
        assert!(c.on_settle().is_none());
        assert_eq!(c.complete(&t, Ok(districts(&[("A", 1)]))), Completion::Stale);
    }

    #[test]
    fn released_collaborator_widgets_are_removed_at_once() {
        let mut c = controller(7);
        let pin = c
            .request_overlay(&MarkerSpec {
                position: LatLng::new(37.55, 126.92),
                content: "pin".into(),
                z_index: 10,
                x_anchor: 0.5,
                y_anchor: 1.0,
            })
            .expect("marker");
        c.release_overlay(pin);
        let host = c.host_mut().expect("host");
        assert_eq!(host.marker_count(), 0);
        assert_eq!(host.take_ops(), vec![HostOp::AddMarker(pin), HostOp::RemoveMarker(pin)]);
        c.release_overlay(pin);
        assert!(c.host_mut().expect("host").ops().is_empty());
    }

    #[test]
    fn zoom_before_first_render_invalidates_pending_fetch() {
        let mut c = controller(7);
        let pending = c.on_settle().expect("ticket");
        assert_eq!(pending.tier(), Tier::District);
        assert_eq!(c.tier(), None);

        assert!(c.on_zoom_changed(2));
        assert!(c.state().is_idle());
        let got = c.complete(&pending, Ok(districts(&[("A", 1), ("B", 2)])));
        assert_eq!(got, Completion::Stale);
        assert!(c.rendered_keys().is_empty());
        assert_eq!(c.tier(), None);
    }

    #[test]
    fn zoom_back_to_rendered_tier_drops_other_tier_fetch() {
        let mut c = controller(7);
        let t = c.on_settle().expect("ticket");
        c.complete(&t, Ok(districts(&[("A", 1), ("B", 2)])));

        set_level(&mut c, seoul(4));
        let pending = c.on_settle().expect("ticket");
        assert_eq!(pending.tier(), Tier::Neighborhood);

        assert!(c.on_zoom_changed(7));
        assert_eq!(keys(&c), vec!["gu:A", "gu:B"]);
        let neighborhoods = AggregationResult::new(Tier::Neighborhood, Vec::new());
        assert_eq!(c.complete(&pending, Ok(neighborhoods)), Completion::Stale);
        assert_eq!(c.tier(), Some(Tier::District));
        assert_eq!(keys(&c), vec!["gu:A", "gu:B"]);
    }

    #[test]
    fn zoom_within_pending_tier_keeps_fetch() {
        let mut c = controller(7);
        let pending = c.on_settle().expect("ticket");
        assert!(!c.on_zoom_changed(6));
        let got = c.complete(&pending, Ok(districts(&[("A", 1)])));
        assert!(matches!(got, Completion::Applied(_)));
    }

    #[test]
    fn selected_district_keeps_narrowing_after_zoom_clear() {
        let mut c = controller(7);
        let t = c.on_settle().expect("ticket");
        c.complete(&t, Ok(districts(&[("마포구", 12)])));
        c.on_overlay_click(&SpatialKey::district("마포구"));

        assert!(c.on_zoom_changed(5));
        assert_eq!(c.selected(), None);
        assert_eq!(
            c.app_state().selected_region().and_then(|r| r.gu_name.as_deref()),
            Some("마포구")
        );

        set_level(&mut c, seoul(5));
        let t = c.on_settle().expect("ticket");
        assert!(matches!(
            t.query,
            AggregationQuery::Counts { region: RegionFilter::District(ref gu), .. } if gu == "마포구"
        ));
    }
}
