use std::collections::BTreeMap;

use foundation::geo::mean_position;
use foundation::grid::GridCell;
use foundation::ids::SpatialKey;
use tracing::debug;

use crate::policy::Tier;
use crate::protocol::{CellListings, Listing};
use crate::result::{AggregateEntry, AggregationResult, EntryPayload};

/// Marker entry for one grid cell, or `None` when the cell holds no listings.
///
/// The marker sits at the mean listing position; the cell center is the
/// fallback when no listing carries coordinates.
pub fn cell_entry(cell: GridCell, listings: Vec<Listing>) -> Option<AggregateEntry> {
    if listings.is_empty() {
        return None;
    }
    let centroid = mean_position(listings.iter().filter_map(Listing::position))
        .unwrap_or_else(|| cell.center());
    Some(AggregateEntry {
        key: cell.key(),
        label: String::new(),
        count: listings.len() as u64,
        centroid,
        payload: EntryPayload::Cell { cell, listings },
    })
}

/// Grid-tier result from the cells endpoint.
///
/// A cell reported twice is merged into one entry (keys must stay unique);
/// entries keep the order of first appearance.
pub fn cells_to_result(cells: Vec<CellListings>) -> AggregationResult {
    let mut order: Vec<SpatialKey> = Vec::new();
    let mut merged: BTreeMap<SpatialKey, (GridCell, Vec<Listing>)> = BTreeMap::new();
    for CellListings { cell, properties } in cells {
        let key = cell.key();
        match merged.get_mut(&key) {
            Some((_, listings)) => {
                debug!(key = %key, "duplicate cell merged");
                listings.extend(properties);
            }
            None => {
                order.push(key.clone());
                merged.insert(key, (cell, properties));
            }
        }
    }

    let entries = order
        .into_iter()
        .filter_map(|key| merged.remove(&key))
        .filter_map(|(cell, listings)| cell_entry(cell, listings))
        .collect();
    AggregationResult::new(Tier::Grid, entries)
}
