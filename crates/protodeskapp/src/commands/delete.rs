//! Deleting rows and clearing cell blocks.
//!
//! Both are destructive and go through [`confirm`]: touching more than
//! [`CONFIRM_THRESHOLD`](super::CONFIRM_THRESHOLD) rows or cells needs the
//! class name typed back as confirmation. The check runs before any service
//! call, so a refused delete never reaches the service.
//!
//! **Important**: these functions do NOT prompt. The caller shows the count
//! from [`DeskError::ConfirmationRequired`] and calls again with the answer.

use super::{confirm, plural, save_batch, CmdMessage, CmdResult};
use crate::activity::Activity;
use crate::error::{DeskError, Result};
use crate::grid::{CellRange, GridState};
use crate::object::ID_FIELD;
use crate::query::{Filter, Query};
use crate::schema::Kind;
use crate::service::ObjectService;
use crate::value::Value;

/// Delete objects by id with one filtered `delete_many`.
pub async fn rows<S: ObjectService + ?Sized>(
    service: &S,
    activity: &Activity,
    grid: &mut GridState,
    ids: &[String],
    confirmation: Option<&str>,
) -> Result<CmdResult> {
    let mut out = CmdResult::default();
    if ids.is_empty() {
        out.add_message(CmdMessage::info("Nothing to delete"));
        return Ok(out);
    }
    confirm(grid.class_name(), ids.len(), confirmation)?;

    let query = Query::new(grid.class_name()).filter(Filter::is_in(
        ID_FIELD,
        ids.iter().map(|id| Value::from(id.as_str())).collect(),
    ));
    let removed = {
        let _busy = activity.begin("delete");
        service.delete_many(&query).await.map_err(|e| {
            tracing::error!(class = grid.class_name(), error = %e, "Delete failed");
            e
        })?
    };
    grid.mark_deleted(ids.iter().cloned());
    out.deleted = ids.to_vec();
    out.add_message(CmdMessage::success(format!("Deleted {}", plural(removed, "row"))));
    Ok(out)
}

/// Ids of the rows at the given indexes.
pub fn ids_for_rows(grid: &GridState, rows: &[usize]) -> Result<Vec<String>> {
    rows.iter()
        .map(|&index| {
            grid.row(index)
                .and_then(|obj| obj.id.clone())
                .ok_or(DeskError::RowOutOfRange(index))
        })
        .collect()
}

/// Set every writable cell of the block to null.
pub async fn cells<S: ObjectService + ?Sized>(
    service: &S,
    activity: &Activity,
    grid: &mut GridState,
    range: &CellRange,
    confirmation: Option<&str>,
) -> Result<CmdResult> {
    let rows = range.rows.start.min(grid.len())..range.rows.end.min(grid.len());
    let columns = range.columns.start.min(grid.columns().len())
        ..range.columns.end.min(grid.columns().len());
    let mut out = CmdResult::default();
    let count = rows.len() * columns.len();
    if count == 0 {
        out.add_message(CmdMessage::info("Nothing to clear"));
        return Ok(out);
    }
    confirm(grid.class_name(), count, confirmation)?;

    let writable: Vec<String> = grid.columns()[columns]
        .iter()
        .filter(|c| !grid.schema().is_read_only(&c.key) && c.kind() != Kind::Relation)
        .map(|c| c.key.clone())
        .collect();
    if writable.is_empty() {
        out.add_message(CmdMessage::info("No writable cells in the selection"));
        return Ok(out);
    }

    let objects: Vec<_> = grid
        .rows()
        .into_iter()
        .skip(rows.start)
        .take(rows.len())
        .filter(|obj| obj.is_persisted())
        .map(|obj| {
            let mut obj = obj.clone();
            for key in &writable {
                obj.set(key, Value::Null);
            }
            obj
        })
        .collect();

    let saved = save_batch(service, activity, objects).await?;
    grid.fold_saved(saved.clone());
    out.add_message(CmdMessage::success(format!(
        "Cleared {} in {}",
        plural(writable.len(), "column"),
        plural(saved.len(), "row")
    )));
    Ok(out.with_saved(saved))
}
