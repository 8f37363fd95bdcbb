use foundation::grid::GridCell;
use serde::{Deserialize, Serialize};

use crate::policy::Tier;

/// Listing category filter shared with the listing panels.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyType {
    #[default]
    All,
    OneRoom,
    Office,
    House,
}

impl PropertyType {
    /// Path/query value understood by the backend.
    pub fn key(&self) -> &'static str {
        match self {
            PropertyType::All => "all",
            PropertyType::OneRoom => "one-room",
            PropertyType::Office => "office",
            PropertyType::House => "house",
        }
    }

    /// Accepts backend keys and the labels shown in the room-type picker.
    /// Anything unrecognised means no filtering.
    pub fn from_label(label: &str) -> Self {
        let normalized: String = label.split_whitespace().collect();
        match normalized.to_ascii_lowercase().as_str() {
            "one-room" | "oneroom" | "원룸/투룸" | "원룸" | "투룸" => PropertyType::OneRoom,
            "office" | "오피스텔" => PropertyType::Office,
            "house" | "주택/빌라" | "주택" | "빌라" => PropertyType::House,
            _ => PropertyType::All,
        }
    }
}

/// Restricts region counts to part of the city.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RegionFilter {
    #[default]
    Everywhere,
    /// Only neighborhoods belonging to this district.
    District(String),
}

impl RegionFilter {
    pub fn allows_district(&self, gu_name: &str) -> bool {
        match self {
            RegionFilter::Everywhere => true,
            RegionFilter::District(name) => name == gu_name,
        }
    }
}

/// What one settle event asks the backend for.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationQuery {
    Counts {
        tier: Tier,
        region: RegionFilter,
        property_type: PropertyType,
    },
    Cells {
        cells: Vec<GridCell>,
        property_type: PropertyType,
    },
}

impl AggregationQuery {
    pub fn tier(&self) -> Tier {
        match self {
            AggregationQuery::Counts { tier, .. } => *tier,
            AggregationQuery::Cells { .. } => Tier::Grid,
        }
    }
}

/// Listing set behind a clicked district or neighborhood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionQuery {
    pub gu_name: Option<String>,
    pub dong_name: Option<String>,
    pub property_type: PropertyType,
}
