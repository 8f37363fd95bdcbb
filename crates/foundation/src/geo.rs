use serde::{Deserialize, Serialize};

/// Geographic position in degrees (WGS84, as reported by the map widget).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// Arithmetic mean of the given positions.
///
/// Non-finite positions are skipped; returns `None` when nothing usable remains.
pub fn mean_position<I>(points: I) -> Option<LatLng>
where
    I: IntoIterator<Item = LatLng>,
{
    let mut n = 0usize;
    let mut lat_sum = 0.0;
    let mut lng_sum = 0.0;
    for p in points {
        if !p.is_finite() {
            continue;
        }
        n += 1;
        lat_sum += p.lat;
        lng_sum += p.lng;
    }
    if n == 0 {
        return None;
    }
    Some(LatLng::new(lat_sum / n as f64, lng_sum / n as f64))
}
