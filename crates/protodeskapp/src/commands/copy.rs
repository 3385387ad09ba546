//! Copying rows and cell blocks to a [`ClipboardPayload`].
//!
//! Both encodings are always produced: TSV under `text/plain` and an array of
//! wire JSON records under `application/json`. Values are copied as stored,
//! except hidden (secure) columns, which copy as empty cells.

use super::{plural, CmdMessage, CmdResult};
use crate::codec::ClipboardPayload;
use crate::error::{DeskError, Result};
use crate::grid::{CellRange, GridState};
use crate::value::Value;

/// Copy whole rows, every column, in selection order.
pub fn rows(grid: &GridState, rows: &[usize]) -> Result<CmdResult> {
    let keys: Vec<String> = grid.columns().iter().map(|c| c.key.clone()).collect();
    let values = rows
        .iter()
        .map(|&index| {
            let obj = grid.row(index).ok_or(DeskError::RowOutOfRange(index))?;
            Ok(keys.iter().map(|key| obj.value(key)).collect())
        })
        .collect::<Result<Vec<Vec<Value>>>>()?;
    Ok(copied(grid, &keys, values))
}

/// Copy a block of cells, clipped to the grid.
pub fn cells(grid: &GridState, range: &CellRange) -> Result<CmdResult> {
    if range.rows.start >= grid.len() {
        return Err(DeskError::RowOutOfRange(range.rows.start));
    }
    let (keys, values) = grid.cell_values(range);
    Ok(copied(grid, &keys, values))
}

fn copied(grid: &GridState, keys: &[String], mut values: Vec<Vec<Value>>) -> CmdResult {
    let schema = grid.schema();
    for row in &mut values {
        for (key, value) in keys.iter().zip(row.iter_mut()) {
            if schema.is_hidden(key) {
                *value = Value::Null;
            }
        }
    }
    let mut out = CmdResult::default().with_clipboard(ClipboardPayload::from_cells(keys, &values));
    out.add_message(CmdMessage::info(format!("Copied {}", plural(values.len(), "row"))));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::Activity;
    use crate::codec::{decode_payload, DecodedRows};
    use crate::commands::fetch;
    use crate::service::memory::fixtures;

    async fn users() -> GridState {
        let service = fixtures::service();
        let activity = Activity::new();
        let mut grid = fetch::open(&service, &activity, "User").await.unwrap();
        fetch::run(&service, &activity, &mut grid).await.unwrap();
        grid
    }

    #[tokio::test]
    async fn copy_cells_as_tsv_and_json() {
        let grid = users().await;
        let name = grid.column_index("name").unwrap();
        let result = cells(&grid, &CellRange::new(0..2, name..name + 2)).unwrap();
        let payload = result.clipboard.unwrap();

        assert_eq!(payload.text.as_deref(), Some("Ada\t36\nGrace\t45"));
        let Some(DecodedRows::Records(records)) = decode_payload(&payload) else {
            panic!("expected records");
        };
        assert_eq!(records[1].get("name"), Some(&Value::from("Grace")));
        assert_eq!(records[1].get("age"), Some(&Value::Number(45.0)));
    }

    #[tokio::test]
    async fn copy_rows_in_selection_order() {
        let grid = users().await;
        let result = rows(&grid, &[2, 0]).unwrap();
        let Some(DecodedRows::Records(records)) = decode_payload(&result.clipboard.unwrap()) else {
            panic!("expected records");
        };
        assert_eq!(records[0].get("_id"), Some(&Value::from("u3")));
        assert_eq!(records[1].get("_id"), Some(&Value::from("u1")));
    }

    #[tokio::test]
    async fn hidden_columns_copy_empty() {
        let grid = users().await;
        let password = grid.column_index("password").unwrap();
        let payload = cells(&grid, &CellRange::new(0..2, password..password + 1))
            .unwrap()
            .clipboard
            .unwrap();
        assert_eq!(payload.text.as_deref(), Some("\n"));
        assert!(!payload.json.as_deref().unwrap().contains("secret"));

        let whole = rows(&grid, &[0]).unwrap().clipboard.unwrap();
        assert!(!whole.text.as_deref().unwrap().contains("secret"));
        assert!(whole.text.as_deref().unwrap().contains("Ada"));
        assert!(!whole.json.as_deref().unwrap().contains("secret"));
    }

    #[tokio::test]
    async fn copy_out_of_range() {
        let grid = users().await;
        assert!(matches!(rows(&grid, &[7]), Err(DeskError::RowOutOfRange(7))));
        assert!(cells(&grid, &CellRange::single(5, 0)).is_err());
    }
}
