//! Async glue between the controller and an [`AggregationClient`].
//!
//! The controller lives in a `RefCell`; every function here borrows it only
//! between awaits, so a second settle or click can run while a fetch is in
//! flight. Whichever finishes last checks its generation before touching
//! the map.

use std::cell::RefCell;

use aggregation::client::{AggregationClient, fetch_raw, join_answer};
use foundation::ids::SpatialKey;
use overlays::host::MapHost;

use crate::controller::ViewportController;
use crate::state::{Completion, ListingCompletion};

/// Handles one settle event end to end. `None` when no fetch was issued.
pub async fn settle<H, C>(
    controller: &RefCell<ViewportController<H>>,
    client: &C,
) -> Option<Completion>
where
    H: MapHost,
    C: AggregationClient,
{
    let ticket = controller.borrow_mut().on_settle()?;
    let answer = fetch_raw(client, &ticket.query).await;

    let mut c = controller.borrow_mut();
    let result = answer.and_then(|a| join_answer(&ticket.query, a, c.result_context()));
    Some(c.complete(&ticket, result))
}

/// Handles a click on the overlay bound to `key`.
pub async fn click<H, C>(
    controller: &RefCell<ViewportController<H>>,
    client: &C,
    key: &SpatialKey,
) -> Option<ListingCompletion>
where
    H: MapHost,
    C: AggregationClient,
{
    let ticket = controller.borrow_mut().on_overlay_click(key)?;
    let result = client.listings_by_region(&ticket.query).await;
    Some(controller.borrow_mut().complete_listings(&ticket, result))
}
