use std::collections::BTreeMap;

use foundation::geo::LatLng;
use foundation::ids::SpatialKey;
use serde::Deserialize;
use tracing::debug;

use crate::policy::Tier;
use crate::protocol::{DistrictCount, NeighborhoodCount};
use crate::query::RegionFilter;
use crate::result::{AggregateEntry, AggregationResult, EntryPayload, RegionRef};

/// Last whitespace-separated word of an administrative name
/// ("서울특별시 마포구 공덕동" → "공덕동").
pub fn display_label(name: &str) -> &str {
    name.split_whitespace().last().unwrap_or("")
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct DistrictRecord {
    name: String,
    lat: f64,
    lng: f64,
    #[serde(default)]
    boundary: Option<Vec<[f64; 2]>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct NeighborhoodRecord {
    id: u32,
    name: String,
    lat: f64,
    lng: f64,
    /// Owning district; derived from the full name when absent.
    #[serde(default)]
    gu: Option<String>,
    #[serde(default)]
    boundary: Option<Vec<[f64; 2]>>,
}

#[derive(Debug, Default, Deserialize)]
struct DirectoryFile {
    #[serde(default)]
    districts: Vec<DistrictRecord>,
    #[serde(default)]
    neighborhoods: Vec<NeighborhoodRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionInfo {
    pub label: String,
    pub centroid: LatLng,
    pub boundary: Option<Vec<LatLng>>,
}

#[derive(Debug, Clone, PartialEq)]
struct NeighborhoodInfo {
    gu_name: String,
    info: RegionInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DirectoryError {
    Parse(String),
}

impl std::fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DirectoryError::Parse(msg) => write!(f, "region directory parse error: {msg}"),
        }
    }
}

impl std::error::Error for DirectoryError {}

/// Static centroid/boundary catalog joined with backend counts.
///
/// Count endpoints only return `(region, count)`; positions and display names
/// live here. Districts are keyed by their short name ("마포구"), neighborhoods
/// by their numeric id.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RegionDirectory {
    districts: BTreeMap<String, RegionInfo>,
    neighborhoods: BTreeMap<u32, NeighborhoodInfo>,
}

fn ring(raw: Option<Vec<[f64; 2]>>) -> Option<Vec<LatLng>> {
    let pts: Vec<LatLng> = raw?.into_iter().map(|[lat, lng]| LatLng::new(lat, lng)).collect();
    (pts.len() >= 3).then_some(pts)
}

impl RegionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, DirectoryError> {
        let file: DirectoryFile =
            serde_json::from_str(json).map_err(|e| DirectoryError::Parse(e.to_string()))?;

        let mut dir = RegionDirectory::new();
        for d in file.districts {
            let label = display_label(&d.name).to_string();
            dir.insert_district(
                label.clone(),
                RegionInfo {
                    label,
                    centroid: LatLng::new(d.lat, d.lng),
                    boundary: ring(d.boundary),
                },
            );
        }
        for n in file.neighborhoods {
            let gu_name = n.gu.clone().unwrap_or_else(|| parent_name(&n.name).to_string());
            dir.insert_neighborhood(
                n.id,
                gu_name,
                RegionInfo {
                    label: display_label(&n.name).to_string(),
                    centroid: LatLng::new(n.lat, n.lng),
                    boundary: ring(n.boundary),
                },
            );
        }
        Ok(dir)
    }

    pub fn insert_district(&mut self, gu_name: impl Into<String>, info: RegionInfo) {
        self.districts.insert(gu_name.into(), info);
    }

    pub fn insert_neighborhood(
        &mut self,
        dong_id: u32,
        gu_name: impl Into<String>,
        info: RegionInfo,
    ) {
        self.neighborhoods.insert(
            dong_id,
            NeighborhoodInfo {
                gu_name: gu_name.into(),
                info,
            },
        );
    }

    pub fn district(&self, gu_name: &str) -> Option<&RegionInfo> {
        self.districts.get(gu_name)
    }

    pub fn neighborhood(&self, dong_id: u32) -> Option<(&str, &RegionInfo)> {
        self.neighborhoods
            .get(&dong_id)
            .map(|n| (n.gu_name.as_str(), &n.info))
    }

    pub fn district_count(&self) -> usize {
        self.districts.len()
    }

    pub fn neighborhood_count(&self) -> usize {
        self.neighborhoods.len()
    }

    /// District whose centroid is closest to `p`.
    pub fn nearest_district(&self, p: LatLng) -> Option<(&str, &RegionInfo)> {
        self.districts
            .iter()
            .filter(|(_, info)| info.centroid.is_finite())
            .min_by(|a, b| dist2(a.1.centroid, p).total_cmp(&dist2(b.1.centroid, p)))
            .map(|(name, info)| (name.as_str(), info))
    }

    /// Neighborhood whose centroid is closest to `p`, with its district name.
    pub fn nearest_neighborhood(&self, p: LatLng) -> Option<(u32, &str, &RegionInfo)> {
        self.neighborhoods
            .iter()
            .filter(|(_, n)| n.info.centroid.is_finite())
            .min_by(|a, b| dist2(a.1.info.centroid, p).total_cmp(&dist2(b.1.info.centroid, p)))
            .map(|(id, n)| (*id, n.gu_name.as_str(), &n.info))
    }

    /// One entry per known district; unknown names are dropped.
    pub fn join_districts(&self, counts: &[DistrictCount]) -> AggregationResult {
        let mut entries = Vec::with_capacity(counts.len());
        for c in counts {
            let Some(info) = self.districts.get(&c.gu_name) else {
                debug!(gu_name = %c.gu_name, "count for unknown district dropped");
                continue;
            };
            entries.push(AggregateEntry {
                key: SpatialKey::district(&c.gu_name),
                label: info.label.clone(),
                count: c.property_count,
                centroid: info.centroid,
                payload: EntryPayload::Region {
                    region: RegionRef::District {
                        gu_name: c.gu_name.clone(),
                    },
                    boundary: info.boundary.clone(),
                },
            });
        }
        AggregationResult::new(Tier::District, entries)
    }

    /// One entry per known neighborhood the filter allows.
    pub fn join_neighborhoods(
        &self,
        counts: &[NeighborhoodCount],
        filter: &RegionFilter,
    ) -> AggregationResult {
        let mut entries = Vec::with_capacity(counts.len());
        for c in counts {
            let Some(n) = self.neighborhoods.get(&c.dong_id) else {
                debug!(dong_id = c.dong_id, "count for unknown neighborhood dropped");
                continue;
            };
            if !filter.allows_district(&n.gu_name) {
                continue;
            }
            entries.push(AggregateEntry {
                key: SpatialKey::neighborhood(c.dong_id),
                label: n.info.label.clone(),
                count: c.property_count,
                centroid: n.info.centroid,
                payload: EntryPayload::Region {
                    region: RegionRef::Neighborhood {
                        dong_id: c.dong_id,
                        gu_name: n.gu_name.clone(),
                        dong_name: n.info.label.clone(),
                    },
                    boundary: n.info.boundary.clone(),
                },
            });
        }
        AggregationResult::new(Tier::Neighborhood, entries)
    }

    /// The whole city as a single entry: the sum of every district count.
    pub fn join_city(
        &self,
        city_name: &str,
        center: LatLng,
        counts: &[DistrictCount],
    ) -> AggregationResult {
        let total = counts.iter().map(|c| c.property_count).sum();
        let entry = AggregateEntry {
            key: SpatialKey::city(city_name),
            label: city_name.to_string(),
            count: total,
            centroid: center,
            payload: EntryPayload::Region {
                region: RegionRef::City {
                    name: city_name.to_string(),
                },
                boundary: None,
            },
        };
        AggregationResult::new(Tier::City, vec![entry])
    }
}

// Planar squared distance; good enough to pick among regions of one city.
fn dist2(a: LatLng, b: LatLng) -> f64 {
    let d_lat = a.lat - b.lat;
    let d_lng = a.lng - b.lng;
    d_lat * d_lat + d_lng * d_lng
}

// Second-to-last word: "서울특별시 마포구 공덕동" → "마포구".
fn parent_name(full: &str) -> &str {
    let words: Vec<&str> = full.split_whitespace().collect();
    match words.len() {
        0 | 1 => "",
        n => words[n - 2],
    }
}

#[cfg(test)]
mod tests {
    use super::{RegionDirectory, display_label};
    use crate::policy::Tier;
    use crate::protocol::{DistrictCount, NeighborhoodCount};
    use crate::query::RegionFilter;
    use crate::result::{EntryPayload, RegionRef};
    use foundation::geo::LatLng;
    use foundation::ids::SpatialKey;
    use pretty_assertions::assert_eq;

    const DIRECTORY: &str = r#"{
        "districts": [
            {"name": "서울특별시 마포구", "lat": 37.5638, "lng": 126.9084,
             "boundary": [[37.58, 126.88], [37.58, 126.96], [37.53, 126.96], [37.53, 126.88]]},
            {"name": "서울특별시 강남구", "lat": 37.4966, "lng": 127.0629}
        ],
        "neighborhoods": [
            {"id": 11440, "name": "서울특별시 마포구 공덕동", "lat": 37.5447, "lng": 126.9516},
            {"id": 11680, "name": "서울특별시 강남구 역삼동", "lat": 37.4954, "lng": 127.0333, "gu": "강남구"}
        ]
    }"#;

    fn directory() -> RegionDirectory {
        RegionDirectory::from_json(DIRECTORY).expect("directory")
    }

    #[test]
    fn labels_are_last_word() {
        assert_eq!(display_label("서울특별시 마포구 공덕동"), "공덕동");
        assert_eq!(display_label("  마포구 "), "마포구");
        assert_eq!(display_label(""), "");
    }

    #[test]
    fn loads_districts_and_neighborhoods() {
        let dir = directory();
        assert_eq!(dir.district_count(), 2);
        assert_eq!(dir.neighborhood_count(), 2);
        assert_eq!(dir.district("마포구").expect("gu").boundary.as_ref().map(Vec::len), Some(4));
        assert_eq!(dir.district("강남구").expect("gu").boundary, None);
        let (gu, info) = dir.neighborhood(11440).expect("dong");
        assert_eq!(gu, "마포구");
        assert_eq!(info.label, "공덕동");
    }

    #[test]
    fn district_join_drops_unknown_names() {
        let dir = directory();
        let res = dir.join_districts(&[
            DistrictCount { gu_name: "마포구".into(), property_count: 12 },
            DistrictCount { gu_name: "없는구".into(), property_count: 3 },
        ]);
        assert_eq!(res.tier, Tier::District);
        assert_eq!(res.len(), 1);
        let e = &res.entries[0];
        assert_eq!(e.key, SpatialKey::district("마포구"));
        assert_eq!(e.label, "마포구");
        assert_eq!(e.count, 12);
        assert_eq!(e.centroid, LatLng::new(37.5638, 126.9084));
    }

    #[test]
    fn neighborhood_join_respects_district_filter() {
        let dir = directory();
        let counts = [
            NeighborhoodCount { dong_id: 11440, property_count: 4 },
            NeighborhoodCount { dong_id: 11680, property_count: 9 },
        ];
        let all = dir.join_neighborhoods(&counts, &RegionFilter::Everywhere);
        assert_eq!(all.len(), 2);

        let mapo = dir.join_neighborhoods(&counts, &RegionFilter::District("마포구".into()));
        assert_eq!(mapo.len(), 1);
        assert_eq!(
            mapo.entries[0].payload,
            EntryPayload::Region {
                region: RegionRef::Neighborhood {
                    dong_id: 11440,
                    gu_name: "마포구".into(),
                    dong_name: "공덕동".into(),
                },
                boundary: None,
            }
        );
    }

    #[test]
    fn city_join_sums_district_counts() {
        let dir = directory();
        let res = dir.join_city(
            "서울",
            LatLng::new(37.5665, 126.978),
            &[
                DistrictCount { gu_name: "마포구".into(), property_count: 12 },
                DistrictCount { gu_name: "강남구".into(), property_count: 7 },
            ],
        );
        assert_eq!(res.tier, Tier::City);
        assert_eq!(res.entries.len(), 1);
        assert_eq!(res.entries[0].count, 19);
        assert_eq!(res.entries[0].key, SpatialKey::city("서울"));
    }

    #[test]
    fn nearest_region_by_centroid() {
        let dir = directory();
        let near_gongdeok = LatLng::new(37.545, 126.95);
        assert_eq!(dir.nearest_district(near_gongdeok).map(|(n, _)| n), Some("마포구"));
        let (id, gu, info) = dir.nearest_neighborhood(near_gongdeok).expect("dong");
        assert_eq!((id, gu, info.label.as_str()), (11440, "마포구", "공덕동"));
        assert!(RegionDirectory::new().nearest_district(near_gongdeok).is_none());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(RegionDirectory::from_json("{not json").is_err());
    }
}
