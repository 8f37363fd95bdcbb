use aggregation::client::FetchError;
use aggregation::policy::Tier;
use aggregation::query::{AggregationQuery, RegionQuery};
use foundation::ids::SpatialKey;
use foundation::viewport::Viewport;
use overlays::cache::ReconcileReport;
use runtime::generation::Generation;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ControllerState {
    #[default]
    Idle,
    /// Waiting on the answer for `generation`, a query at `tier`.
    Fetching { generation: Generation, tier: Tier },
}

impl ControllerState {
    pub fn is_idle(&self) -> bool {
        matches!(self, ControllerState::Idle)
    }

    /// Tier of the outstanding fetch, if any.
    pub fn pending_tier(&self) -> Option<Tier> {
        match self {
            ControllerState::Idle => None,
            ControllerState::Fetching { tier, .. } => Some(*tier),
        }
    }
}

/// One aggregation request issued by a settle event.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTicket {
    pub generation: Generation,
    pub viewport: Viewport,
    pub query: AggregationQuery,
}

impl FetchTicket {
    pub fn tier(&self) -> Tier {
        self.query.tier()
    }
}

/// How a fetch completion was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Applied(ReconcileReport),
    /// A newer request was issued meanwhile; nothing changed.
    Stale,
    /// Overlays were left as they were.
    Failed(FetchError),
}

/// Listing request issued by a district or neighborhood click.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingTicket {
    pub generation: Generation,
    pub key: SpatialKey,
    pub query: RegionQuery,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListingCompletion {
    /// Number of listings written to the application state.
    Applied(usize),
    Stale,
    Failed(FetchError),
}
