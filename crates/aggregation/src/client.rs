use foundation::geo::LatLng;
use foundation::grid::GridCell;
use tracing::debug;

use crate::cluster::cells_to_result;
use crate::policy::Tier;
use crate::protocol::{CellListings, DistrictCount, Listing, NeighborhoodCount};
use crate::query::{AggregationQuery, PropertyType, RegionFilter, RegionQuery};
use crate::regions::RegionDirectory;
use crate::result::AggregationResult;

/// Transient failure talking to the listing backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request never produced a response (network, CORS, aborted).
    Transport(String),
    /// Non-2xx response.
    Status { code: u16, body: String },
    /// The body did not match the expected shape.
    Decode(String),
    Timeout { after_ms: u32 },
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Transport(msg) => write!(f, "transport error: {msg}"),
            FetchError::Status { code, body } => write!(f, "HTTP {code}: {body}"),
            FetchError::Decode(msg) => write!(f, "decode error: {msg}"),
            FetchError::Timeout { after_ms } => write!(f, "request timed out after {after_ms} ms"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Raw region counts, before the directory join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionCounts {
    Districts(Vec<DistrictCount>),
    Neighborhoods(Vec<NeighborhoodCount>),
}

/// Backend boundary. One in-flight call per method invocation; callers never
/// cancel, stale answers are discarded by generation instead.
#[allow(async_fn_in_trait)]
pub trait AggregationClient {
    /// District counts for CITY and DISTRICT, neighborhood counts for
    /// NEIGHBORHOOD. GRID is not a count tier.
    async fn counts_by_tier(
        &self,
        tier: Tier,
        property_type: PropertyType,
    ) -> Result<RegionCounts, FetchError>;

    async fn listings_by_cell(
        &self,
        cells: &[GridCell],
        property_type: PropertyType,
    ) -> Result<Vec<CellListings>, FetchError>;

    async fn listings_by_region(&self, query: &RegionQuery) -> Result<Vec<Listing>, FetchError>;
}

/// Static inputs needed to turn raw counts into overlay entries.
#[derive(Debug, Clone, Copy)]
pub struct ResultContext<'a> {
    pub directory: &'a RegionDirectory,
    pub city_name: &'a str,
    pub city_center: LatLng,
}

/// Backend answer before it is joined into overlay entries.
#[derive(Debug, Clone, PartialEq)]
pub enum RawAnswer {
    Counts(RegionCounts),
    Cells(Vec<CellListings>),
}

/// Issues the backend call for `query`. Holds no borrow of the join inputs,
/// so callers can await it without pinning the controller.
pub async fn fetch_raw<C: AggregationClient>(
    client: &C,
    query: &AggregationQuery,
) -> Result<RawAnswer, FetchError> {
    match query {
        AggregationQuery::Cells {
            cells,
            property_type,
        } => {
            if cells.is_empty() {
                return Ok(RawAnswer::Cells(Vec::new()));
            }
            let got = client.listings_by_cell(cells, *property_type).await?;
            debug!(requested = cells.len(), returned = got.len(), "cell listings");
            Ok(RawAnswer::Cells(got))
        }
        AggregationQuery::Counts {
            tier,
            property_type,
            ..
        } => Ok(RawAnswer::Counts(
            client.counts_by_tier(*tier, *property_type).await?,
        )),
    }
}

/// Turns a backend answer into the result for the query's tier.
pub fn join_answer(
    query: &AggregationQuery,
    answer: RawAnswer,
    ctx: ResultContext<'_>,
) -> Result<AggregationResult, FetchError> {
    match (query, answer) {
        (AggregationQuery::Cells { .. }, RawAnswer::Cells(cells)) => Ok(cells_to_result(cells)),
        (AggregationQuery::Counts { tier, region, .. }, RawAnswer::Counts(counts)) => {
            join_counts(*tier, region, counts, ctx)
        }
        (query, _) => Err(FetchError::Decode(format!(
            "answer does not match a {} query",
            query.tier()
        ))),
    }
}

fn join_counts(
    tier: Tier,
    region: &RegionFilter,
    counts: RegionCounts,
    ctx: ResultContext<'_>,
) -> Result<AggregationResult, FetchError> {
    match (tier, counts) {
        (Tier::City, RegionCounts::Districts(c)) => {
            Ok(ctx.directory.join_city(ctx.city_name, ctx.city_center, &c))
        }
        (Tier::District, RegionCounts::Districts(c)) => Ok(ctx.directory.join_districts(&c)),
        (Tier::Neighborhood, RegionCounts::Neighborhoods(c)) => {
            Ok(ctx.directory.join_neighborhoods(&c, region))
        }
        (tier, _) => Err(FetchError::Decode(format!(
            "count shape does not match tier {tier}"
        ))),
    }
}
