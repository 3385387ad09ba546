//! Committing a single cell.
//!
//! The row is cloned (or created, for the blank row past the end), the field
//! is assigned, the object is saved, and the saved copy is folded back into
//! the grid. If the save fails the grid is untouched.

use super::{save_batch, CmdMessage, CmdResult};
use crate::activity::Activity;
use crate::error::{DeskError, Result};
use crate::grid::GridState;
use crate::object::DataObject;
use crate::schema::{Column, Kind};
use crate::service::ObjectService;
use crate::value::Value;

pub async fn run<S: ObjectService + ?Sized>(
    service: &S,
    activity: &Activity,
    grid: &mut GridState,
    row: usize,
    column: &str,
    value: Value,
) -> Result<CmdResult> {
    let column = writable_column(grid, column)?;
    let mut out = CmdResult::default();
    if column.kind() == Kind::Relation {
        out.add_message(CmdMessage::info(format!(
            "{} is a relation; add related objects instead",
            column.key
        )));
        return Ok(out);
    }

    let mut obj = row_or_new(grid, row)?;
    obj.set(&column.key, value);
    let saved = save_batch(service, activity, vec![obj]).await?;
    grid.fold_saved(saved.clone());
    out.add_message(CmdMessage::success(format!("Saved {}", column.key)));
    Ok(out.with_saved(saved))
}

/// Upload a file and store it in a file cell.
pub async fn upload<S: ObjectService + ?Sized>(
    service: &S,
    activity: &Activity,
    grid: &mut GridState,
    row: usize,
    column: &str,
    filename: &str,
    bytes: Vec<u8>,
) -> Result<CmdResult> {
    let target = writable_column(grid, column)?;
    if target.kind() != Kind::File {
        return Err(DeskError::Api(format!("{} is not a file column", target.key)));
    }
    row_or_new(grid, row)?;
    let file = {
        let _busy = activity.begin("upload");
        service.upload(filename, bytes).await.map_err(|e| {
            tracing::error!(filename, error = %e, "Upload failed");
            e
        })?
    };
    run(service, activity, grid, row, column, Value::File(file)).await
}

pub(crate) fn writable_column(grid: &GridState, key: &str) -> Result<Column> {
    let column = grid
        .column(key)
        .cloned()
        .ok_or_else(|| DeskError::ColumnNotFound(key.to_string()))?;
    if grid.schema().is_read_only(&column.key) {
        return Err(DeskError::ReadOnlyColumn(column.key));
    }
    Ok(column)
}

/// A copy of row `index`, or a new object for the row just past the end.
pub(crate) fn row_or_new(grid: &GridState, index: usize) -> Result<DataObject> {
    match grid.row(index) {
        Some(obj) => Ok(obj.clone()),
        None if index == grid.len() => Ok(DataObject::new(grid.class_name())),
        None => Err(DeskError::RowOutOfRange(index)),
    }
}
