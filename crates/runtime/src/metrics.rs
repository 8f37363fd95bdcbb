use std::collections::BTreeMap;

/// Counter and histogram names used across the workspace.
pub mod names {
    pub const SETTLES: &str = "viewport.settles";
    pub const SUSPENSIONS: &str = "viewport.suspensions";
    pub const ZOOM_CLEARS: &str = "viewport.zoom_clears";
    pub const FETCH_APPLIED: &str = "fetch.applied";
    pub const FETCH_STALE: &str = "fetch.stale";
    pub const FETCH_FAILED: &str = "fetch.failed";
    pub const OVERLAYS_CREATED: &str = "overlays.created";
    pub const OVERLAYS_UPDATED: &str = "overlays.updated";
    pub const OVERLAYS_DESTROYED: &str = "overlays.destroyed";
    pub const OVERLAYS_REBOUND: &str = "overlays.rebound";
    pub const TIER_SWITCHES: &str = "overlays.tier_switches";
    pub const SELECTIONS: &str = "selection.changes";
    pub const RENDERED_PER_SETTLE: &str = "overlays.rendered_per_settle";
}

/// Deterministic metrics aggregation.
///
/// Sorted maps keep snapshots in a stable order; nothing here reads the clock.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Metrics {
    counters: BTreeMap<&'static str, u64>,
    histograms: BTreeMap<&'static str, Histogram>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Histogram {
    pub count: u64,
    pub sum: i64,
    pub min: i64,
    pub max: i64,
}

impl Histogram {
    pub fn record(&mut self, value: i64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub counters: Vec<(&'static str, u64)>,
    pub histograms: Vec<(&'static str, Histogram)>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn inc(&mut self, name: &'static str) {
        self.add(name, 1);
    }

    pub fn add(&mut self, name: &'static str, by: u64) {
        if by == 0 {
            return;
        }
        *self.counters.entry(name).or_insert(0) += by;
    }

    pub fn record(&mut self, name: &'static str, value: i64) {
        self.histograms.entry(name).or_default().record(value);
    }

    pub fn histogram(&self, name: &str) -> Option<Histogram> {
        self.histograms.get(name).copied()
    }

    /// Stable, sorted snapshot for logs and the debug panel.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self.counters.iter().map(|(k, v)| (*k, *v)).collect(),
            histograms: self.histograms.iter().map(|(k, v)| (*k, *v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Histogram, Metrics, names};

    #[test]
    fn counters_accumulate() {
        let mut m = Metrics::new();
        m.inc(names::OVERLAYS_CREATED);
        m.add(names::OVERLAYS_CREATED, 2);
        assert_eq!(m.counter(names::OVERLAYS_CREATED), 3);
        assert_eq!(m.counter(names::FETCH_STALE), 0);
    }

    #[test]
    fn zero_adds_do_not_create_entries() {
        let mut m = Metrics::new();
        m.add(names::OVERLAYS_DESTROYED, 0);
        assert!(m.snapshot().counters.is_empty());
    }

    #[test]
    fn histogram_tracks_min_max_sum_count() {
        let mut h = Histogram::default();
        h.record(3);
        h.record(0);
        h.record(12);
        assert_eq!(h.count, 3);
        assert_eq!(h.sum, 15);
        assert_eq!(h.min, 0);
        assert_eq!(h.max, 12);
    }

    #[test]
    fn snapshot_is_stably_sorted() {
        let mut m = Metrics::new();
        m.inc(names::SETTLES);
        m.inc(names::FETCH_APPLIED);
        m.record(names::RENDERED_PER_SETTLE, 3);

        let snap = m.snapshot();
        assert_eq!(
            snap.counters,
            vec![(names::FETCH_APPLIED, 1), (names::SETTLES, 1)]
        );
        assert_eq!(snap.histograms.len(), 1);
    }
}
