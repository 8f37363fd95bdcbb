use foundation::geo::LatLng;
use foundation::grid::GridCell;
use foundation::ids::SpatialKey;

use crate::policy::Tier;
use crate::protocol::Listing;

/// Which administrative region an entry describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionRef {
    City {
        name: String,
    },
    District {
        gu_name: String,
    },
    Neighborhood {
        dong_id: u32,
        gu_name: String,
        dong_name: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryPayload {
    Region {
        region: RegionRef,
        boundary: Option<Vec<LatLng>>,
    },
    Cell {
        cell: GridCell,
        listings: Vec<Listing>,
    },
}

/// One wanted overlay: what to show and where.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateEntry {
    pub key: SpatialKey,
    pub label: String,
    pub count: u64,
    pub centroid: LatLng,
    pub payload: EntryPayload,
}

impl AggregateEntry {
    /// Polygon ring to draw under the marker, if any.
    pub fn outline(&self) -> Option<Vec<LatLng>> {
        match &self.payload {
            EntryPayload::Region { boundary, .. } => boundary.clone(),
            EntryPayload::Cell { cell, .. } => Some(cell.path()),
        }
    }

    pub fn region(&self) -> Option<&RegionRef> {
        match &self.payload {
            EntryPayload::Region { region, .. } => Some(region),
            EntryPayload::Cell { .. } => None,
        }
    }

    pub fn listings(&self) -> Option<&[Listing]> {
        match &self.payload {
            EntryPayload::Region { .. } => None,
            EntryPayload::Cell { listings, .. } => Some(listings),
        }
    }
}

/// Everything one fetch produced for one tier. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationResult {
    pub tier: Tier,
    pub entries: Vec<AggregateEntry>,
}

impl AggregationResult {
    pub fn new(tier: Tier, entries: Vec<AggregateEntry>) -> Self {
        Self { tier, entries }
    }

    pub fn empty(tier: Tier) -> Self {
        Self::new(tier, Vec::new())
    }

    pub fn keys(&self) -> impl Iterator<Item = &SpatialKey> + '_ {
        self.entries.iter().map(|e| &e.key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
