use serde::{Deserialize, Serialize};

use crate::bounds::GeoBounds;
use crate::geo::LatLng;
use crate::ids::SpatialKey;

/// One cell of the fixed global lattice.
///
/// Boundaries are always `index * size` for integer lattice indices, never
/// viewport-relative, so the same geographic cell is bit-identical on every redraw.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl GridCell {
    fn from_index(lat_i: i64, lng_i: i64, size: f64) -> Self {
        GridCell {
            min_lat: lat_i as f64 * size,
            max_lat: (lat_i + 1) as f64 * size,
            min_lng: lng_i as f64 * size,
            max_lng: (lng_i + 1) as f64 * size,
        }
    }

    pub fn size(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Stringified min corner + size; stable across redraws.
    pub fn key(&self) -> SpatialKey {
        SpatialKey::new(format!(
            "cell:{:.6}:{:.6}@{}",
            self.min_lat,
            self.min_lng,
            round_size(self.size())
        ))
    }

    pub fn bounds(&self) -> GeoBounds {
        GeoBounds::from_edges(self.min_lat, self.min_lng, self.max_lat, self.max_lng)
    }

    pub fn center(&self) -> LatLng {
        self.bounds().center()
    }

    /// Half-open containment: a point on a shared edge belongs to exactly one cell.
    pub fn contains(&self, p: LatLng) -> bool {
        p.lat >= self.min_lat
            && p.lat < self.max_lat
            && p.lng >= self.min_lng
            && p.lng < self.max_lng
    }

    /// Closed ring (sw, nw, ne, se) for polygon rendering.
    pub fn path(&self) -> Vec<LatLng> {
        vec![
            LatLng::new(self.min_lat, self.min_lng),
            LatLng::new(self.max_lat, self.min_lng),
            LatLng::new(self.max_lat, self.max_lng),
            LatLng::new(self.min_lat, self.max_lng),
        ]
    }
}

// Cell sizes are configured as short decimals (0.002, 0.0005); strip the
// representation noise `max - min` introduces so keys print the configured size.
fn round_size(size: f64) -> f64 {
    (size * 1e9).round() / 1e9
}

/// Converts viewport boxes into lattice cells of one fixed size (degrees).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GridIndexer {
    size: f64,
}

impl GridIndexer {
    pub fn new(size: f64) -> Self {
        Self { size }
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    fn usable(&self) -> bool {
        self.size.is_finite() && self.size > 0.0
    }

    /// Lattice index range `[lo, hi)` per axis covering `bounds`.
    fn index_ranges(&self, bounds: &GeoBounds) -> Option<((i64, i64), (i64, i64))> {
        if !self.usable() || bounds.is_empty() {
            return None;
        }
        let lat = (
            snap_down(bounds.sw.lat, self.size),
            snap_up(bounds.ne.lat, self.size),
        );
        let lng = (
            snap_down(bounds.sw.lng, self.size),
            snap_up(bounds.ne.lng, self.size),
        );
        Some((lat, lng))
    }

    /// Number of cells `cells(bounds)` would produce, without allocating them.
    pub fn cell_count(&self, bounds: &GeoBounds) -> usize {
        let Some(((lat0, lat1), (lng0, lng1))) = self.index_ranges(bounds) else {
            return 0;
        };
        ((lat1 - lat0).max(0) as usize).saturating_mul((lng1 - lng0).max(0) as usize)
    }

    /// Cells covering `bounds`, latitude-major in ascending order.
    ///
    /// The SW corner is snapped down and the NE corner snapped up to multiples
    /// of the cell size. Empty or non-finite boxes yield no cells.
    pub fn cells(&self, bounds: &GeoBounds) -> Vec<GridCell> {
        let Some(((lat0, lat1), (lng0, lng1))) = self.index_ranges(bounds) else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(self.cell_count(bounds));
        for lat_i in lat0..lat1 {
            for lng_i in lng0..lng1 {
                out.push(GridCell::from_index(lat_i, lng_i, self.size));
            }
        }
        out
    }

    /// The lattice cell containing `p` (half-open on the north/east edges).
    pub fn cell_containing(&self, p: LatLng) -> Option<GridCell> {
        if !self.usable() || !p.is_finite() {
            return None;
        }
        let lat_i = snap_down(p.lat, self.size);
        let lng_i = snap_down(p.lng, self.size);
        Some(GridCell::from_index(lat_i, lng_i, self.size))
    }
}

// `floor(v / size)` can land one index too high when the division rounds up to
// an integer; correct against the multiplied boundary so `index * size <= v`.
fn snap_down(v: f64, size: f64) -> i64 {
    let mut i = (v / size).floor() as i64;
    if i as f64 * size > v {
        i -= 1;
    }
    i
}

fn snap_up(v: f64, size: f64) -> i64 {
    let mut i = (v / size).ceil() as i64;
    if (i as f64) * size < v {
        i += 1;
    }
    i
}
