use foundation::viewport::ZoomLevel;
use serde::{Deserialize, Serialize};

/// Aggregation granularity. Declaration order is coarsest → finest.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    City,
    District,
    Neighborhood,
    Grid,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::City => "city",
            Tier::District => "district",
            Tier::Neighborhood => "neighborhood",
            Tier::Grid => "grid",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the controller should aggregate at a given zoom level.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Resolution {
    /// No tier applies: every overlay of the previous tier must be cleared.
    Suspended,
    /// `cell_size` is only meaningful for [`Tier::Grid`] and is `0.0` otherwise.
    Active { tier: Tier, cell_size: f64 },
}

impl Resolution {
    pub fn tier(&self) -> Option<Tier> {
        match self {
            Resolution::Suspended => None,
            Resolution::Active { tier, .. } => Some(*tier),
        }
    }
}

/// Level thresholds and grid cell sizes.
///
/// Bands (inclusive lower bounds): CITY `>= city_min_level`, DISTRICT
/// `>= district_min_level`, NEIGHBORHOOD `>= neighborhood_min_level`, GRID
/// `>= grid_min_level`. Grid levels without a positive cell size suspend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomResolutionPolicy {
    pub city_min_level: ZoomLevel,
    pub district_min_level: ZoomLevel,
    pub neighborhood_min_level: ZoomLevel,
    pub grid_min_level: ZoomLevel,
    /// `(level, cell size in degrees)`; finer zoom means smaller cells.
    pub grid_cell_sizes: Vec<(ZoomLevel, f64)>,
}

impl Default for ZoomResolutionPolicy {
    fn default() -> Self {
        Self {
            city_min_level: 9,
            district_min_level: 6,
            neighborhood_min_level: 4,
            grid_min_level: 1,
            grid_cell_sizes: vec![(3, 0.002), (2, 0.001), (1, 0.0005)],
        }
    }
}

impl ZoomResolutionPolicy {
    pub fn resolve(&self, level: ZoomLevel) -> Resolution {
        let active = |tier| Resolution::Active { tier, cell_size: 0.0 };
        if level >= self.city_min_level {
            return active(Tier::City);
        }
        if level >= self.district_min_level {
            return active(Tier::District);
        }
        if level >= self.neighborhood_min_level {
            return active(Tier::Neighborhood);
        }
        if level >= self.grid_min_level {
            let size = self.grid_cell_size(level);
            if size > 0.0 {
                return Resolution::Active {
                    tier: Tier::Grid,
                    cell_size: size,
                };
            }
        }
        Resolution::Suspended
    }

    /// Cell size for a grid level, `0.0` when the level has none.
    pub fn grid_cell_size(&self, level: ZoomLevel) -> f64 {
        self.grid_cell_sizes
            .iter()
            .find(|(l, _)| *l == level)
            .map(|(_, s)| *s)
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or(0.0)
    }

    /// Thresholds must be strictly descending from CITY to GRID.
    pub fn is_consistent(&self) -> bool {
        self.city_min_level > self.district_min_level
            && self.district_min_level > self.neighborhood_min_level
            && self.neighborhood_min_level > self.grid_min_level
    }
}

#[cfg(test)]
mod tests {
    use super::{Resolution, Tier, ZoomResolutionPolicy};

    fn grid(size: f64) -> Resolution {
        Resolution::Active {
            tier: Tier::Grid,
            cell_size: size,
        }
    }

    fn active(tier: Tier) -> Resolution {
        Resolution::Active {
            tier,
            cell_size: 0.0,
        }
    }

    #[test]
    fn default_policy_table() {
        let p = ZoomResolutionPolicy::default();
        assert!(p.is_consistent());
        assert_eq!(p.resolve(1), grid(0.0005));
        assert_eq!(p.resolve(2), grid(0.001));
        assert_eq!(p.resolve(3), grid(0.002));
        assert_eq!(p.resolve(4), active(Tier::Neighborhood));
        assert_eq!(p.resolve(5), active(Tier::Neighborhood));
        for level in 6..=8 {
            assert_eq!(p.resolve(level), active(Tier::District));
        }
        for level in [9, 10, 14, i32::MAX] {
            assert_eq!(p.resolve(level), active(Tier::City));
        }
    }

    #[test]
    fn levels_below_grid_band_suspend() {
        let p = ZoomResolutionPolicy::default();
        for level in [0, -1, i32::MIN] {
            assert_eq!(p.resolve(level), Resolution::Suspended);
            assert_eq!(p.resolve(level).tier(), None);
        }
    }

    #[test]
    fn grid_level_without_size_suspends() {
        let p = ZoomResolutionPolicy {
            grid_cell_sizes: vec![(3, 0.002), (1, 0.0005)],
            ..ZoomResolutionPolicy::default()
        };
        assert_eq!(p.resolve(2), Resolution::Suspended);
        assert_eq!(p.resolve(3), grid(0.002));
    }

    #[test]
    fn tiers_order_coarsest_to_finest() {
        assert!(Tier::City < Tier::District);
        assert!(Tier::District < Tier::Neighborhood);
        assert!(Tier::Neighborhood < Tier::Grid);
    }

    #[test]
    fn partial_json_override_keeps_defaults() {
        let p: ZoomResolutionPolicy =
            serde_json::from_str(r#"{"city_min_level": 10}"#).expect("parse");
        assert_eq!(p.city_min_level, 10);
        assert_eq!(p.district_min_level, 6);
        assert_eq!(p.resolve(9), active(Tier::District));
    }
}
