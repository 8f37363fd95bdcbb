use serde::{Deserialize, Serialize};

use crate::geo::LatLng;

/// Axis-aligned lat/lng box given by its south-west and north-east corners.
///
/// Antimeridian wrapping is not modelled: the product only covers one city.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub sw: LatLng,
    pub ne: LatLng,
}

impl GeoBounds {
    pub const fn new(sw: LatLng, ne: LatLng) -> Self {
        GeoBounds { sw, ne }
    }

    pub fn from_edges(min_lat: f64, min_lng: f64, max_lat: f64, max_lng: f64) -> Self {
        GeoBounds::new(LatLng::new(min_lat, min_lng), LatLng::new(max_lat, max_lng))
    }

    /// True when the box has no area or contains non-finite coordinates.
    pub fn is_empty(&self) -> bool {
        !(self.sw.is_finite() && self.ne.is_finite())
            || self.sw.lat >= self.ne.lat
            || self.sw.lng >= self.ne.lng
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            0.5 * (self.sw.lat + self.ne.lat),
            0.5 * (self.sw.lng + self.ne.lng),
        )
    }

    /// Inclusive containment test.
    pub fn contains(&self, p: LatLng) -> bool {
        p.lat >= self.sw.lat && p.lat <= self.ne.lat && p.lng >= self.sw.lng && p.lng <= self.ne.lng
    }

    /// True when `other` lies entirely inside `self` (edges inclusive).
    pub fn contains_bounds(&self, other: &GeoBounds) -> bool {
        self.contains(other.sw) && self.contains(other.ne)
    }

    /// Returns the same box shifted by the given deltas (degrees).
    pub fn translated(&self, d_lat: f64, d_lng: f64) -> Self {
        GeoBounds::new(
            LatLng::new(self.sw.lat + d_lat, self.sw.lng + d_lng),
            LatLng::new(self.ne.lat + d_lat, self.ne.lng + d_lng),
        )
    }
}
