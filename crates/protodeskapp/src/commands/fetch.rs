//! Opening a class and loading its current page.
//!
//! A fetch is split in three so a front end can hold the grid elsewhere while
//! the service call is in flight:
//!
//! 1. [`begin`] takes a [`FetchTicket`] from the grid.
//! 2. [`load`] runs the count and the page query.
//! 3. [`apply`] installs the result, unless the ticket went stale meanwhile.
//!
//! [`run`] does all three in sequence.

use super::{plural, CmdMessage, CmdResult};
use crate::activity::Activity;
use crate::error::{DeskError, Result};
use crate::grid::{FetchTicket, GridState};
use crate::object::DataObject;
use crate::schema::Schema;
use crate::service::ObjectService;

/// Rows and total count for one ticket.
#[derive(Debug)]
pub struct FetchResult {
    pub total: usize,
    pub rows: Vec<DataObject>,
}

/// Class names known to the service, in schema order.
pub async fn classes<S: ObjectService + ?Sized>(service: &S, activity: &Activity) -> Result<Schema> {
    let _busy = activity.begin("schema");
    service.schema().await.map_err(|e| {
        tracing::error!(error = %e, "Loading schema failed");
        e
    })
}

/// A fresh grid for `class_name`, not yet fetched.
pub async fn open<S: ObjectService + ?Sized>(
    service: &S,
    activity: &Activity,
    class_name: &str,
) -> Result<GridState> {
    let mut schema = classes(service, activity).await?;
    let class = schema
        .shift_remove(class_name)
        .ok_or_else(|| DeskError::ClassNotFound(class_name.to_string()))?;
    tracing::debug!(class = class_name, "Opening class");
    Ok(GridState::new(class_name, class))
}

pub fn begin(grid: &mut GridState) -> FetchTicket {
    grid.begin_fetch()
}

pub async fn load<S: ObjectService + ?Sized>(
    service: &S,
    activity: &Activity,
    ticket: &FetchTicket,
) -> Result<FetchResult> {
    let _busy = activity.begin("fetch");
    let fetched = async {
        let total = service.count(&ticket.count).await?;
        let rows = service.find(&ticket.page).await?;
        Ok::<_, DeskError>(FetchResult { total, rows })
    }
    .await;
    fetched.map_err(|e| {
        tracing::error!(class = %ticket.page.class_name, error = %e, "Fetch failed");
        e
    })
}

pub fn apply(grid: &mut GridState, ticket: &FetchTicket, result: FetchResult) -> CmdResult {
    let mut out = CmdResult::default();
    let shown = result.rows.len();
    if grid.apply_fetch(ticket, result.total, result.rows) {
        out.add_message(CmdMessage::info(format!(
            "Showing {} of {}",
            plural(shown, "row"),
            result.total
        )));
    } else {
        out.add_message(CmdMessage::warning("Discarded an outdated result"));
    }
    out
}

pub async fn run<S: ObjectService + ?Sized>(
    service: &S,
    activity: &Activity,
    grid: &mut GridState,
) -> Result<CmdResult> {
    let ticket = begin(grid);
    let result = load(service, activity, &ticket).await?;
    Ok(apply(grid, &ticket, result))
}
