use std::collections::{BTreeMap, BTreeSet};

use aggregation::policy::Tier;
use aggregation::result::AggregationResult;
use foundation::ids::SpatialKey;
use tracing::debug;

use crate::host::MapHost;
use crate::overlay::Overlay;
use crate::symbology::OverlayStyles;

/// What one reconciliation did to the map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    /// Kept overlays whose displayed data changed.
    pub updated: usize,
    /// Kept overlays with nothing to change.
    pub unchanged: usize,
    pub destroyed: usize,
    pub rebound: usize,
    pub tier_switched: bool,
}

impl ReconcileReport {
    pub fn host_mutations(&self) -> usize {
        self.created + self.updated + self.destroyed
    }
}

/// Rendered overlays keyed by spatial key, all of one tier.
///
/// Entries are keyed in a `BTreeMap` so teardown order is deterministic.
/// At most one overlay exists per key.
#[derive(Debug, Default)]
pub struct OverlayCache {
    tier: Option<Tier>,
    overlays: BTreeMap<SpatialKey, Overlay>,
    styles: OverlayStyles,
}

impl OverlayCache {
    pub fn new(styles: OverlayStyles) -> Self {
        Self {
            tier: None,
            overlays: BTreeMap::new(),
            styles,
        }
    }

    pub fn tier(&self) -> Option<Tier> {
        self.tier
    }

    pub fn styles(&self) -> &OverlayStyles {
        &self.styles
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    pub fn contains(&self, key: &SpatialKey) -> bool {
        self.overlays.contains_key(key)
    }

    pub fn get(&self, key: &SpatialKey) -> Option<&Overlay> {
        self.overlays.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &SpatialKey> + '_ {
        self.overlays.keys()
    }

    /// Makes the rendered key set equal to the keys of `result`.
    ///
    /// A result of a different tier first tears down everything rendered.
    /// Kept keys are updated in place; their click binding is replaced only if
    /// the binding fingerprint changed.
    pub fn reconcile<H: MapHost + ?Sized>(
        &mut self,
        host: &mut H,
        result: &AggregationResult,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        if self.tier != Some(result.tier) {
            if !self.overlays.is_empty() {
                report.destroyed += self.destroy_all(host);
                report.tier_switched = true;
                debug!(from = ?self.tier, to = %result.tier, "tier switch cleared overlays");
            }
            self.tier = Some(result.tier);
        }

        let mut wanted: BTreeSet<&SpatialKey> = BTreeSet::new();
        for entry in &result.entries {
            if !wanted.insert(&entry.key) {
                debug!(key = %entry.key, "duplicate key in result ignored");
                continue;
            }
            match self.overlays.get_mut(&entry.key) {
                Some(overlay) => {
                    let (changed, rebound) = overlay.update(host, entry.clone(), &self.styles);
                    if changed {
                        report.updated += 1;
                    } else {
                        report.unchanged += 1;
                    }
                    if rebound {
                        report.rebound += 1;
                    }
                }
                None => {
                    let overlay = Overlay::create(host, result.tier, entry.clone(), &self.styles);
                    self.overlays.insert(entry.key.clone(), overlay);
                    report.created += 1;
                }
            }
        }

        let stale: Vec<SpatialKey> = self
            .overlays
            .keys()
            .filter(|k| !wanted.contains(k))
            .cloned()
            .collect();
        for key in stale {
            if let Some(overlay) = self.overlays.remove(&key) {
                overlay.destroy(host);
                report.destroyed += 1;
            }
        }

        debug!(
            tier = %result.tier,
            created = report.created,
            updated = report.updated,
            destroyed = report.destroyed,
            rebound = report.rebound,
            "reconciled overlays"
        );
        report
    }

    /// Destroys every overlay and forgets the tier. Returns how many were removed.
    pub fn clear<H: MapHost + ?Sized>(&mut self, host: &mut H) -> usize {
        let n = self.destroy_all(host);
        self.tier = None;
        n
    }

    /// Restyles one overlay. Returns `false` if `key` is not rendered.
    pub fn set_emphasis<H: MapHost + ?Sized>(
        &mut self,
        host: &mut H,
        key: &SpatialKey,
        emphasized: bool,
    ) -> bool {
        match self.overlays.get_mut(key) {
            Some(overlay) => {
                overlay.set_emphasis(host, emphasized, &self.styles);
                true
            }
            None => false,
        }
    }

    fn destroy_all<H: MapHost + ?Sized>(&mut self, host: &mut H) -> usize {
        let overlays = std::mem::take(&mut self.overlays);
        let n = overlays.len();
        for (_, overlay) in overlays {
            overlay.destroy(host);
        }
        n
    }
}
