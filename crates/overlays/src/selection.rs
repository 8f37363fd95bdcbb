use foundation::ids::SpatialKey;

use crate::cache::OverlayCache;
use crate::host::MapHost;

/// Outcome of a click on an overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionChange {
    Selected {
        key: SpatialKey,
        previous: Option<SpatialKey>,
    },
    /// The selected overlay was clicked again.
    Deselected(SpatialKey),
}

/// Single-slot selection: at most one overlay is emphasized at any time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: Option<SpatialKey>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&SpatialKey> {
        self.selected.as_ref()
    }

    pub fn is_selected(&self, key: &SpatialKey) -> bool {
        self.selected.as_ref() == Some(key)
    }

    /// Toggles `key`. The previous overlay, if still rendered, reverts to the
    /// normal style before the new one is emphasized.
    pub fn select<H: MapHost + ?Sized>(
        &mut self,
        key: &SpatialKey,
        cache: &mut OverlayCache,
        host: &mut H,
    ) -> SelectionChange {
        if self.is_selected(key) {
            cache.set_emphasis(host, key, false);
            self.selected = None;
            return SelectionChange::Deselected(key.clone());
        }
        let previous = self.selected.take();
        if let Some(prev) = &previous {
            cache.set_emphasis(host, prev, false);
        }
        cache.set_emphasis(host, key, true);
        self.selected = Some(key.clone());
        SelectionChange::Selected {
            key: key.clone(),
            previous,
        }
    }

    /// Reverts the emphasized overlay and empties the slot.
    pub fn clear<H: MapHost + ?Sized>(
        &mut self,
        cache: &mut OverlayCache,
        host: &mut H,
    ) -> Option<SpatialKey> {
        let prev = self.selected.take()?;
        cache.set_emphasis(host, &prev, false);
        Some(prev)
    }

    /// Drops the selection if its overlay no longer exists. Returns the dropped key.
    pub fn retain_rendered(&mut self, cache: &OverlayCache) -> Option<SpatialKey> {
        match &self.selected {
            Some(key) if !cache.contains(key) => self.selected.take(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SelectionChange, SelectionState};
    use crate::cache::OverlayCache;
    use crate::memory_host::InMemoryHost;
    use aggregation::policy::Tier;
    use aggregation::result::{AggregateEntry, AggregationResult, EntryPayload, RegionRef};
    use foundation::geo::LatLng;
    use foundation::ids::SpatialKey;
    use pretty_assertions::assert_eq;

    fn districts(names: &[&str]) -> AggregationResult {
        AggregationResult::new(
            Tier::District,
            names
                .iter()
                .map(|n| AggregateEntry {
                    key: SpatialKey::district(n),
                    label: n.to_string(),
                    count: 1,
                    centroid: LatLng::new(37.5, 127.0),
                    payload: EntryPayload::Region {
                        region: RegionRef::District {
                            gu_name: n.to_string(),
                        },
                        boundary: Some(vec![
                            LatLng::new(37.4, 126.9),
                            LatLng::new(37.6, 126.9),
                            LatLng::new(37.6, 127.1),
                        ]),
                    },
                })
                .collect(),
        )
    }

    fn emphasized(cache: &OverlayCache) -> Vec<String> {
        cache
            .keys()
            .filter(|k| cache.get(k).is_some_and(|o| o.emphasized))
            .map(|k| k.to_string())
            .collect()
    }

    #[test]
    fn only_one_overlay_is_emphasized() {
        let mut host = InMemoryHost::default();
        let mut cache = OverlayCache::default();
        cache.reconcile(&mut host, &districts(&["A", "B"]));
        let mut sel = SelectionState::new();
        let a = SpatialKey::district("A");
        let b = SpatialKey::district("B");

        sel.select(&a, &mut cache, &mut host);
        let change = sel.select(&b, &mut cache, &mut host);
        assert_eq!(
            change,
            SelectionChange::Selected {
                key: b.clone(),
                previous: Some(a.clone()),
            }
        );
        assert_eq!(emphasized(&cache), vec!["gu:B"]);
        assert_eq!(sel.selected(), Some(&b));
    }

    #[test]
    fn clicking_the_selection_again_toggles_it_off() {
        let mut host = InMemoryHost::default();
        let mut cache = OverlayCache::default();
        cache.reconcile(&mut host, &districts(&["A"]));
        let mut sel = SelectionState::new();
        let a = SpatialKey::district("A");

        sel.select(&a, &mut cache, &mut host);
        assert_eq!(sel.select(&a, &mut cache, &mut host), SelectionChange::Deselected(a));
        assert_eq!(sel.selected(), None);
        assert!(emphasized(&cache).is_empty());
    }

    #[test]
    fn selection_is_lost_with_its_overlay() {
        let mut host = InMemoryHost::default();
        let mut cache = OverlayCache::default();
        cache.reconcile(&mut host, &districts(&["A", "B"]));
        let mut sel = SelectionState::new();
        let a = SpatialKey::district("A");
        sel.select(&a, &mut cache, &mut host);

        cache.reconcile(&mut host, &districts(&["A", "B"]));
        assert_eq!(sel.retain_rendered(&cache), None);
        assert!(sel.is_selected(&a));

        cache.reconcile(&mut host, &districts(&["B"]));
        assert_eq!(sel.retain_rendered(&cache), Some(a.clone()));
        assert_eq!(sel.selected(), None);

        // selecting after the previous overlay vanished must not fail
        let b = SpatialKey::district("B");
        sel.select(&b, &mut cache, &mut host);
        assert_eq!(emphasized(&cache), vec!["gu:B"]);
        assert_eq!(sel.clear(&mut cache, &mut host), Some(b));
        assert!(emphasized(&cache).is_empty());
    }
}
