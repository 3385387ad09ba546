//! Adding related objects to a relation cell.
//!
//! Relation cells cannot be set directly. This is the only way to change one:
//! the given ids are appended as pointers to the target class, ids already
//! present are ignored, and nothing is ever removed. Relations declared
//! through a foreign field are computed by the service and are read-only.

use super::set_cell::{row_or_new, writable_column};
use super::{plural, save_batch, CmdMessage, CmdResult};
use crate::activity::Activity;
use crate::error::{DeskError, Result};
use crate::grid::GridState;
use crate::schema::FieldType;
use crate::service::ObjectService;
use crate::value::{ObjectRef, Value};

pub async fn add<S: ObjectService + ?Sized>(
    service: &S,
    activity: &Activity,
    grid: &mut GridState,
    row: usize,
    column: &str,
    ids: &[String],
) -> Result<CmdResult> {
    let column = writable_column(grid, column)?;
    let FieldType::Relation { target, .. } = &column.field_type else {
        return Err(DeskError::Api(format!("{} is not a relation", column.key)));
    };

    let mut obj = row_or_new(grid, row)?;
    let mut related: Vec<Value> = obj
        .value(&column.key)
        .as_array()
        .map(<[Value]>::to_vec)
        .unwrap_or_default();
    let before = related.len();
    for id in ids {
        if !related.iter().any(|v| v.object_id() == Some(id.as_str())) {
            related.push(Value::Pointer(ObjectRef::new(target.clone(), id.clone())));
        }
    }

    let mut out = CmdResult::default();
    let added = related.len() - before;
    if added == 0 {
        out.add_message(CmdMessage::info("Already related"));
        return Ok(out);
    }
    obj.set(&column.key, Value::Array(related));
    let saved = save_batch(service, activity, vec![obj]).await?;
    grid.fold_saved(saved.clone());
    out.add_message(CmdMessage::success(format!(
        "Added {} to {}",
        plural(added, "object"),
        column.key
    )));
    Ok(out.with_saved(saved))
}
