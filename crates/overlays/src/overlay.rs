use aggregation::policy::Tier;
use aggregation::result::{AggregateEntry, EntryPayload, RegionRef};
use foundation::handles::{ListenerHandle, WidgetHandle};
use foundation::ids::SpatialKey;
use tracing::debug;

use crate::host::{MapHost, MarkerSpec, PolygonSpec};
use crate::symbology::{OverlayStyles, marker_html};

/// Identity of what a click on an overlay resolves to.
///
/// Covers the region reference or the listing ids of a cell, never the count
/// or label, so count refreshes keep the existing listener.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BindingFingerprint([u8; 32]);

impl BindingFingerprint {
    pub fn of(entry: &AggregateEntry) -> Self {
        let mut h = blake3::Hasher::new();
        h.update(entry.key.as_str().as_bytes());
        h.update(&[0]);
        match &entry.payload {
            EntryPayload::Region { region, .. } => match region {
                RegionRef::City { name } => {
                    h.update(b"city\0");
                    h.update(name.as_bytes());
                }
                RegionRef::District { gu_name } => {
                    h.update(b"gu\0");
                    h.update(gu_name.as_bytes());
                }
                RegionRef::Neighborhood {
                    dong_id,
                    gu_name,
                    dong_name,
                } => {
                    h.update(b"dong\0");
                    h.update(&dong_id.to_le_bytes());
                    h.update(gu_name.as_bytes());
                    h.update(&[0]);
                    h.update(dong_name.as_bytes());
                }
            },
            EntryPayload::Cell { listings, .. } => {
                h.update(b"cell\0");
                for l in listings {
                    h.update(&l.property_id.to_le_bytes());
                }
            }
        }
        BindingFingerprint(*h.finalize().as_bytes())
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClickBinding {
    pub listener: ListenerHandle,
    pub fingerprint: BindingFingerprint,
}

/// Widgets rendered for one spatial key.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub entry: AggregateEntry,
    pub tier: Tier,
    pub marker: WidgetHandle,
    pub polygon: Option<WidgetHandle>,
    pub click: Option<ClickBinding>,
    pub emphasized: bool,
}

pub(crate) fn marker_spec(
    tier: Tier,
    entry: &AggregateEntry,
    emphasized: bool,
    styles: &OverlayStyles,
) -> MarkerSpec {
    MarkerSpec {
        position: entry.centroid,
        content: marker_html(tier, &entry.label, entry.count, emphasized),
        z_index: styles.z_index(emphasized),
        x_anchor: styles.marker_anchor[0],
        y_anchor: styles.marker_anchor[1],
    }
}

impl Overlay {
    pub fn key(&self) -> &SpatialKey {
        &self.entry.key
    }

    /// Creates every widget for `entry` and binds its click.
    pub fn create<H: MapHost + ?Sized>(
        host: &mut H,
        tier: Tier,
        entry: AggregateEntry,
        styles: &OverlayStyles,
    ) -> Self {
        let polygon = entry.outline().map(|path| {
            host.add_polygon(&PolygonSpec {
                path,
                style: styles.polygon(false).clone(),
            })
        });
        let marker = host.add_marker(&marker_spec(tier, &entry, false, styles));
        let listener = host.bind_click(marker, &entry.key);
        Overlay {
            click: Some(ClickBinding {
                listener,
                fingerprint: BindingFingerprint::of(&entry),
            }),
            entry,
            tier,
            marker,
            polygon,
            emphasized: false,
        }
    }

    /// Refreshes displayed data in place. Returns `(changed, rebound)`.
    pub fn update<H: MapHost + ?Sized>(
        &mut self,
        host: &mut H,
        entry: AggregateEntry,
        styles: &OverlayStyles,
    ) -> (bool, bool) {
        if self.entry == entry {
            return (false, false);
        }

        let marker_changed = self.entry.label != entry.label
            || self.entry.count != entry.count
            || self.entry.centroid != entry.centroid;
        if marker_changed {
            host.update_marker(
                self.marker,
                &marker_spec(self.tier, &entry, self.emphasized, styles),
            );
        }

        let outline = entry.outline();
        if outline != self.entry.outline() {
            if let Some(p) = self.polygon.take() {
                host.remove_polygon(p);
            }
            self.polygon = outline.map(|path| {
                host.add_polygon(&PolygonSpec {
                    path,
                    style: styles.polygon(self.emphasized).clone(),
                })
            });
        }

        let fingerprint = BindingFingerprint::of(&entry);
        let rebound = self.click.map(|c| c.fingerprint) != Some(fingerprint);
        if rebound {
            debug!(key = %entry.key, fingerprint = %fingerprint.to_hex(), "click rebound");
            if let Some(c) = self.click.take() {
                host.unbind_click(c.listener);
            }
            self.click = Some(ClickBinding {
                listener: host.bind_click(self.marker, &entry.key),
                fingerprint,
            });
        }

        self.entry = entry;
        (true, rebound)
    }

    pub fn set_emphasis<H: MapHost + ?Sized>(
        &mut self,
        host: &mut H,
        emphasized: bool,
        styles: &OverlayStyles,
    ) {
        if self.emphasized == emphasized {
            return;
        }
        self.emphasized = emphasized;
        if let Some(p) = self.polygon {
            host.set_polygon_style(p, styles.polygon(emphasized));
        }
        host.update_marker(
            self.marker,
            &marker_spec(self.tier, &self.entry, emphasized, styles),
        );
    }

    /// Removes every widget and listener this overlay owns.
    pub fn destroy<H: MapHost + ?Sized>(self, host: &mut H) {
        if let Some(c) = self.click {
            host.unbind_click(c.listener);
        }
        if let Some(p) = self.polygon {
            host.remove_polygon(p);
        }
        host.remove_marker(self.marker);
    }
}
