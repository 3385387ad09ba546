//! Pasting clipboard payloads.
//!
//! The payload is decoded once ([`decode_payload`]: JSON records if present,
//! else TSV text) and zipped against target rows:
//!
//! - **Text rows** fill columns by position.
//! - **Records** fill columns by key; unknown keys are ignored. When no key
//!   names a target column (a block copied from other columns), each record's
//!   values fill the columns by position instead, the way text rows do.
//!
//! Per cell, read-only and relation columns are skipped, text that does not
//! decode for the column leaves the old value, and an empty cell clears the
//! field only on rows that already exist remotely. Every changed row becomes
//! one object in a single batch save.
//!
//! ## Targets
//!
//! | Call                         | Rows                                         | Columns                          |
//! |------------------------------|----------------------------------------------|----------------------------------|
//! | [`rows`] with one row        | that row and the ones below, one per payload row | all                          |
//! | [`rows`] with several rows   | the selection, up to the payload length      | all                              |
//! | [`cells`] with a single cell | from the anchor down, one per payload row    | from the anchor to the last one  |
//! | [`cells`] with a block       | the block, clipped to the payload            | the block                        |
//!
//! Rows past the end of the grid become new objects.

use super::{plural, save_batch, CmdMessage, CmdResult};
use crate::activity::Activity;
use crate::codec::{accept_value, decode_payload, decode_text, ClipboardPayload, DecodedRows};
use crate::error::Result;
use crate::grid::{CellRange, GridState};
use crate::object::DataObject;
use crate::schema::{Column, Kind};
use crate::service::ObjectService;
use crate::value::{Record, Value};

/// Paste onto whole rows.
pub async fn rows<S: ObjectService + ?Sized>(
    service: &S,
    activity: &Activity,
    grid: &mut GridState,
    rows: &[usize],
    payload: &ClipboardPayload,
) -> Result<CmdResult> {
    let Some(decoded) = decode_payload(payload) else {
        return Ok(nothing_to_paste());
    };
    let targets: Vec<usize> = match rows {
        [only] => (*only..*only + decoded.len()).collect(),
        _ => rows.iter().copied().take(decoded.len()).collect(),
    };
    let columns = grid.columns().to_vec();
    apply(service, activity, grid, &targets, &columns, decoded).await
}

/// Paste onto a block of cells anchored at its top-left corner.
pub async fn cells<S: ObjectService + ?Sized>(
    service: &S,
    activity: &Activity,
    grid: &mut GridState,
    range: &CellRange,
    payload: &ClipboardPayload,
) -> Result<CmdResult> {
    let Some(decoded) = decode_payload(payload) else {
        return Ok(nothing_to_paste());
    };
    let (row_count, column_count) = if range.is_single() {
        (decoded.len(), usize::MAX)
    } else {
        (decoded.len().min(range.rows.len()), range.columns.len())
    };
    let targets: Vec<usize> = (range.rows.start..range.rows.start + row_count).collect();
    let columns: Vec<Column> = grid
        .columns()
        .iter()
        .skip(range.columns.start)
        .take(column_count)
        .cloned()
        .collect();
    apply(service, activity, grid, &targets, &columns, decoded).await
}

enum CellInput<'a> {
    Text(&'a str),
    Typed(Value),
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Set,
    Ignored,
    Unparsed,
}

async fn apply<S: ObjectService + ?Sized>(
    service: &S,
    activity: &Activity,
    grid: &mut GridState,
    targets: &[usize],
    columns: &[Column],
    decoded: DecodedRows,
) -> Result<CmdResult> {
    let mut out = CmdResult::default();
    let mut objects = Vec::new();

    let sources: Vec<Vec<(&Column, CellInput)>> = match &decoded {
        DecodedRows::Text(rows) => rows
            .iter()
            .map(|cells| {
                columns
                    .iter()
                    .zip(cells.iter())
                    .map(|(column, text)| (column, CellInput::Text(text)))
                    .collect()
            })
            .collect(),
        DecodedRows::Records(records) if names_any(columns, records) => {
            records.iter().map(|r| by_key(columns, r)).collect()
        }
        DecodedRows::Records(records) => records.iter().map(|r| by_position(columns, r)).collect(),
    };

    for (&index, cells) in targets.iter().zip(sources) {
        let mut obj = match grid.row(index) {
            Some(existing) => existing.clone(),
            None => DataObject::new(grid.class_name()),
        };
        let mut changed = false;
        for (column, input) in cells {
            match paste_cell(grid, &mut obj, column, input) {
                Outcome::Set => changed = true,
                Outcome::Unparsed => out.skipped += 1,
                Outcome::Ignored => {}
            }
        }
        if changed {
            objects.push(obj);
        }
    }

    if objects.is_empty() {
        out.add_message(CmdMessage::info("No cells changed"));
        return Ok(out);
    }

    tracing::debug!(class = grid.class_name(), rows = objects.len(), "Pasting");
    let saved = save_batch(service, activity, objects).await?;
    grid.fold_saved(saved.clone());
    out.add_message(CmdMessage::success(format!(
        "Pasted into {}",
        plural(saved.len(), "row")
    )));
    if out.skipped > 0 {
        out.add_message(CmdMessage::warning(format!(
            "{} did not match the column type",
            plural(out.skipped, "cell")
        )));
    }
    Ok(out.with_saved(saved))
}

fn by_key<'a>(columns: &'a [Column], record: &Record) -> Vec<(&'a Column, CellInput<'static>)> {
    record
        .iter()
        .filter_map(|(key, value)| {
            let column = columns.iter().find(|c| &c.key == key)?;
            Some((column, CellInput::Typed(value.clone())))
        })
        .collect()
}

fn by_position<'a>(columns: &'a [Column], record: &Record) -> Vec<(&'a Column, CellInput<'static>)> {
    columns
        .iter()
        .zip(record.values())
        .map(|(column, value)| (column, CellInput::Typed(value.clone())))
        .collect()
}

fn names_any(columns: &[Column], records: &[Record]) -> bool {
    records
        .iter()
        .any(|r| r.keys().any(|key| columns.iter().any(|c| &c.key == key)))
}

fn paste_cell(grid: &GridState, obj: &mut DataObject, column: &Column, input: CellInput) -> Outcome {
    if grid.schema().is_read_only(&column.key) || column.kind() == Kind::Relation {
        return Outcome::Ignored;
    }
    let decoded = match input {
        CellInput::Text("") => Some(Value::Null),
        CellInput::Text(text) => decode_text(text, &column.field_type),
        CellInput::Typed(value) => accept_value(value, &column.field_type),
    };
    let Some(value) = decoded else {
        return Outcome::Unparsed;
    };
    if value.is_null() && !obj.is_persisted() {
        return Outcome::Ignored;
    }
    obj.set(&column.key, value);
    Outcome::Set
}

fn nothing_to_paste() -> CmdResult {
    let mut out = CmdResult::default();
    out.add_message(CmdMessage::warning("Clipboard is empty"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{copy, fetch};
    use crate::service::memory::{fixtures, MemService};
    use rust_decimal::Decimal;
    use serde_json::json;

    async fn users(service: &MemService) -> GridState {
        let activity = Activity::new();
        let mut grid = fetch::open(service, &activity, "User").await.unwrap();
        fetch::run(service, &activity, &mut grid).await.unwrap();
        grid
    }

    fn at(grid: &GridState, key: &str) -> CellRange {
        CellRange::single(0, grid.column_index(key).unwrap())
    }

    #[tokio::test]
    async fn number_cell_accepts_numeric_text() {
        let service = fixtures::service();
        let mut grid = users(&service).await;
        let range = at(&grid, "age");

        cells(&service, &Activity::new(), &mut grid, &range, &ClipboardPayload::from_text("7"))
            .await
            .unwrap();
        assert_eq!(grid.row(0).unwrap().value("age"), Value::Number(7.0));
        assert_eq!(service.get("User", "u1").unwrap().value("age"), Value::Number(7.0));
    }

    #[tokio::test]
    async fn unparseable_text_keeps_old_value() {
        let service = fixtures::service();
        let mut grid = users(&service).await;
        let range = at(&grid, "age");

        let result = cells(&service, &Activity::new(), &mut grid, &range, &ClipboardPayload::from_text("abc"))
            .await
            .unwrap();
        assert_eq!(result.skipped, 1);
        assert_eq!(grid.row(0).unwrap().value("age"), Value::Number(36.0));
        assert_eq!(service.mutation_calls(), 0);
    }

    #[tokio::test]
    async fn single_cell_expands_to_payload() {
        let service = fixtures::service();
        let mut grid = users(&service).await;
        let range = at(&grid, "name");

        // name, age, active: three columns from the anchor
        let payload = ClipboardPayload::from_text("Ann\t1\ttrue\nBob\t2\tnope\n");
        let result = cells(&service, &Activity::new(), &mut grid, &range, &payload)
            .await
            .unwrap();
        assert_eq!(result.saved.len(), 2);
        assert_eq!(result.skipped, 1);
        let second = grid.row(1).unwrap();
        assert_eq!(second.value("name"), Value::from("Bob"));
        assert_eq!(second.value("age"), Value::Number(2.0));
        assert_eq!(second.value("active"), Value::Bool(false));
    }

    #[tokio::test]
    async fn block_clips_payload() {
        let service = fixtures::service();
        let mut grid = users(&service).await;
        let name = grid.column_index("name").unwrap();
        let range = CellRange::new(0..1, name..name + 1);

        let payload = ClipboardPayload::from_text("Ann\t1\nBob\t2");
        cells(&service, &Activity::new(), &mut grid, &range, &payload)
            .await
            .unwrap();
        assert_eq!(grid.row(0).unwrap().value("name"), Value::from("Ann"));
        assert_eq!(grid.row(0).unwrap().value("age"), Value::Number(36.0));
        assert_eq!(grid.row(1).unwrap().value("name"), Value::from("Grace"));
    }

    #[tokio::test]
    async fn rows_skip_read_only_columns() {
        let service = fixtures::service();
        let mut grid = users(&service).await;

        // _id, name, age: the id is read-only
        let payload = ClipboardPayload::from_text("zz\tAnn\t50\nyy\tBob\t51");
        paste_rows(&service, &mut grid, &[0, 1], &payload).await;

        let first = grid.row(0).unwrap();
        assert_eq!(first.id.as_deref(), Some("u1"));
        assert_eq!(first.value("name"), Value::from("Ann"));
        assert_eq!(grid.row(1).unwrap().value("age"), Value::Number(51.0));
        assert_eq!(grid.row(2).unwrap().value("name"), Value::from("Linus"));
    }

    async fn paste_rows(service: &MemService, grid: &mut GridState, targets: &[usize], payload: &ClipboardPayload) {
        rows(service, &Activity::new(), grid, targets, payload).await.unwrap();
    }

    #[tokio::test]
    async fn rows_past_the_end_are_created() {
        let service = fixtures::service();
        let mut grid = users(&service).await;

        let payload = ClipboardPayload::from_text("\tNew\t20\n\tNewer\t");
        let result = rows(&service, &Activity::new(), &mut grid, &[3], &payload)
            .await
            .unwrap();
        assert_eq!(result.saved.len(), 2);
        assert_eq!(grid.len(), 5);
        // an empty cell on a new row sets nothing
        assert_eq!(grid.row(4).unwrap().get("age"), None);
    }

    #[tokio::test]
    async fn empty_cells_clear_persisted_rows() {
        let service = fixtures::service();
        let mut grid = users(&service).await;
        let range = at(&grid, "name");

        cells(&service, &Activity::new(), &mut grid, &range, &ClipboardPayload::from_text("Ann\t"))
            .await
            .unwrap();
        assert_eq!(grid.row(0).unwrap().value("name"), Value::from("Ann"));
        assert_eq!(grid.row(0).unwrap().value("age"), Value::Null);
        assert_eq!(service.get("User", "u1").unwrap().value("age"), Value::Null);
    }

    #[tokio::test]
    async fn json_records_fill_by_key() {
        let service = fixtures::service();
        let mut grid = users(&service).await;

        let payload = ClipboardPayload {
            text: Some("ignored".to_string()),
            json: Some(
                json!([
                    { "balance": 12.5, "unknown": 1, "_id": "zz" },
                    { "manager": { "$pointer": { "className": "User", "_id": "u1" } } }
                ])
                .to_string(),
            ),
        };
        rows(&service, &Activity::new(), &mut grid, &[1, 2], &payload)
            .await
            .unwrap();
        assert_eq!(
            grid.row(0).unwrap().value("balance"),
            Value::Decimal(Decimal::new(1000, 2))
        );
        assert_eq!(
            grid.row(1).unwrap().value("balance"),
            Value::Decimal(Decimal::new(125, 1))
        );
        assert_eq!(grid.row(2).unwrap().value("manager").object_id(), Some("u1"));
    }

    #[tokio::test]
    async fn copied_block_pastes_onto_other_columns() {
        let service = fixtures::service();
        let mut grid = users(&service).await;
        let copied = copy::cells(&grid, &at(&grid, "name")).unwrap().clipboard.unwrap();
        let city = CellRange::single(1, grid.column_index("address.city").unwrap());

        let result = cells(&service, &Activity::new(), &mut grid, &city, &copied)
            .await
            .unwrap();
        assert_eq!(result.saved.len(), 1);
        let second = grid.row(1).unwrap();
        assert_eq!(second.value("address.city"), Value::from("Ada"));
        assert_eq!(second.value("name"), Value::from("Grace"));
        assert_eq!(
            service.get("User", "u2").unwrap().value("address.city"),
            Value::from("Ada")
        );
    }

    #[tokio::test]
    async fn relation_columns_are_not_pasted() {
        let service = fixtures::service();
        let mut grid = users(&service).await;
        let range = at(&grid, "tags");

        let result = cells(&service, &Activity::new(), &mut grid, &range, &ClipboardPayload::from_text("t1"))
            .await
            .unwrap();
        assert!(result.saved.is_empty());
        assert_eq!(service.mutation_calls(), 0);
    }

    #[tokio::test]
    async fn failed_paste_leaves_grid_unchanged() {
        let service = fixtures::service();
        let mut grid = users(&service).await;
        let range = at(&grid, "name");
        service.set_simulate_write_error(true);

        let result = cells(&service, &Activity::new(), &mut grid, &range, &ClipboardPayload::from_text("Ann")).await;
        assert!(result.is_err());
        assert_eq!(grid.row(0).unwrap().value("name"), Value::from("Ada"));
    }

    #[tokio::test]
    async fn empty_payload_is_a_warning() {
        let service = fixtures::service();
        let mut grid = users(&service).await;
        let result = rows(&service, &Activity::new(), &mut grid, &[0], &ClipboardPayload::default())
            .await
            .unwrap();
        assert!(result.saved.is_empty());
        assert_eq!(result.messages.len(), 1);
    }
}
