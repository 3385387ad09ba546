//! # API Facade
//!
//! The API layer is a **thin facade** over the command layer. It is the single
//! entry point for grid operations, whatever the front end.
//!
//! ## Role and Responsibilities
//!
//! The API facade:
//! - **Owns** the service, the open [`GridState`], the [`Activity`] counter
//!   and the [`CellRenderer`]
//! - **Dispatches** to the command functions
//! - **Normalizes inputs**: typed row selections (`"1-3,5"`) and column spans
//!   (`"name:email"`) are resolved here
//! - **Returns structured types** (`Result<CmdResult>`)
//!
//! ## What the API Does NOT Do
//!
//! - **Business logic**: that belongs in `commands/*.rs`
//! - **I/O**: no stdout, stderr or prompts
//!
//! ## Generic Over ObjectService
//!
//! `DeskApi<S: ObjectService>` runs against any service:
//! - CLI: `DeskApi<FileService>`
//! - Tests: `DeskApi<MemService>`

use crate::activity::Activity;
use crate::codec::ClipboardPayload;
use crate::commands;
use crate::editor::CellEditor;
use crate::error::{DeskError, Result};
use crate::grid::{CellRange, GridState};
use crate::query::{Filter, Pagination, SortSpec};
use crate::render::{render_header, CellDisplay, CellRenderer};
use crate::schema::Schema;
use crate::selection::{parse_column_span, parse_row_span, parse_rows};
use crate::service::ObjectService;
use crate::value::Value;

/// Initial filters, sort and page of an opened class.
#[derive(Debug, Clone, Default)]
pub struct GridView {
    pub filters: Vec<Filter>,
    /// `None` keeps the default `_id` ascending sort.
    pub sort: Option<SortSpec>,
    pub page: usize,
}

/// The main API facade.
pub struct DeskApi<S: ObjectService> {
    service: S,
    grid: Option<GridState>,
    activity: Activity,
    renderer: CellRenderer,
    limit: usize,
}

impl<S: ObjectService> DeskApi<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            grid: None,
            activity: Activity::new(),
            renderer: CellRenderer::default(),
            limit: Pagination::default().limit,
        }
    }

    /// Rows per page for classes opened from now on.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_renderer(mut self, renderer: CellRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    pub fn renderer(&self) -> &CellRenderer {
        &self.renderer
    }

    pub fn grid(&self) -> Result<&GridState> {
        self.grid.as_ref().ok_or(DeskError::NoClassOpen)
    }

    fn grid_mut(&mut self) -> Result<&mut GridState> {
        self.grid.as_mut().ok_or(DeskError::NoClassOpen)
    }

    pub async fn schema(&self) -> Result<Schema> {
        commands::fetch::classes(&self.service, &self.activity).await
    }

    /// Open a class and fetch its first page.
    pub async fn open_class(&mut self, class_name: &str) -> Result<commands::CmdResult> {
        self.open_view(class_name, GridView::default()).await
    }

    /// Open a class with filters, sort and page already applied, in one fetch.
    pub async fn open_view(&mut self, class_name: &str, view: GridView) -> Result<commands::CmdResult> {
        let mut grid = commands::fetch::open(&self.service, &self.activity, class_name).await?;
        if !view.filters.is_empty() {
            grid.set_filters(view.filters);
        }
        if let Some(sort) = view.sort {
            grid.set_sort(sort);
        }
        grid.set_page(Pagination {
            limit: self.limit,
            page: view.page,
        });
        let result = commands::fetch::run(&self.service, &self.activity, &mut grid).await?;
        self.grid = Some(grid);
        Ok(result)
    }

    /// Re-fetch the current page.
    pub async fn refresh(&mut self) -> Result<commands::CmdResult> {
        let grid = self.grid.as_mut().ok_or(DeskError::NoClassOpen)?;
        commands::fetch::run(&self.service, &self.activity, grid).await
    }

    pub async fn set_filters(&mut self, filters: Vec<Filter>) -> Result<commands::CmdResult> {
        self.grid_mut()?.set_filters(filters);
        self.refresh().await
    }

    pub async fn toggle_sort(&mut self, column: &str, additive: bool) -> Result<commands::CmdResult> {
        let grid = self.grid_mut()?;
        if grid.column(column).is_none() {
            return Err(DeskError::ColumnNotFound(column.to_string()));
        }
        grid.toggle_sort(column, additive);
        self.refresh().await
    }

    pub async fn set_page(&mut self, page: usize) -> Result<commands::CmdResult> {
        let grid = self.grid_mut()?;
        let limit = grid.page().limit;
        grid.set_page(Pagination { limit, page });
        self.refresh().await
    }

    /// Header labels of the open grid.
    pub fn headers(&self) -> Result<Vec<String>> {
        let grid = self.grid()?;
        Ok(grid
            .columns()
            .iter()
            .map(|c| render_header(c, grid.sort()))
            .collect())
    }

    /// Display of every visible cell, row by row.
    pub fn render_rows(&self) -> Result<Vec<Vec<CellDisplay>>> {
        let grid = self.grid()?;
        Ok(grid
            .rows()
            .into_iter()
            .map(|obj| {
                grid.columns()
                    .iter()
                    .map(|c| self.renderer.render_cell(obj, c, grid.schema()))
                    .collect()
            })
            .collect())
    }

    /// An editor for one cell, seeded with its current value. The row just
    /// past the end edits a new object.
    pub fn editor(&self, row: usize, column: &str) -> Result<CellEditor> {
        let grid = self.grid()?;
        let target = grid
            .column(column)
            .ok_or_else(|| DeskError::ColumnNotFound(column.to_string()))?;
        let value = match grid.row(row) {
            Some(obj) => obj.value(&target.key),
            None if row == grid.len() => Value::Null,
            None => return Err(DeskError::RowOutOfRange(row)),
        };
        let editor = CellEditor::new(value, &target.field_type);
        if grid.schema().is_read_only(&target.key) {
            return Ok(editor.read_only());
        }
        Ok(editor)
    }

    /// Save a committed editor. Editors that were cancelled or left unchanged
    /// save nothing.
    pub async fn commit_editor(
        &mut self,
        row: usize,
        column: &str,
        editor: &mut CellEditor,
    ) -> Result<commands::CmdResult> {
        let changed = editor.is_changed();
        match editor.commit() {
            Some(value) if changed => self.set_cell(row, column, value).await,
            _ => Ok(commands::CmdResult::default()),
        }
    }

    pub async fn set_cell(&mut self, row: usize, column: &str, value: Value) -> Result<commands::CmdResult> {
        let grid = self.grid.as_mut().ok_or(DeskError::NoClassOpen)?;
        commands::set_cell::run(&self.service, &self.activity, grid, row, column, value).await
    }

    /// Parse `text` for the column and set it. Text that does not decode is
    /// reported as an error rather than silently ignored.
    pub async fn set_cell_text(&mut self, row: usize, column: &str, text: &str) -> Result<commands::CmdResult> {
        let field_type = self
            .grid()?
            .column(column)
            .map(|c| c.field_type.clone())
            .ok_or_else(|| DeskError::ColumnNotFound(column.to_string()))?;
        let value = if text.is_empty() {
            Value::Null
        } else {
            crate::codec::decode_text(text, &field_type).ok_or_else(|| {
                DeskError::Api(format!("'{}' is not a valid {} value", text, field_type.label()))
            })?
        };
        self.set_cell(row, column, value).await
    }

    pub async fn upload(
        &mut self,
        row: usize,
        column: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<commands::CmdResult> {
        let grid = self.grid.as_mut().ok_or(DeskError::NoClassOpen)?;
        commands::set_cell::upload(&self.service, &self.activity, grid, row, column, filename, bytes).await
    }

    pub async fn paste_rows(&mut self, rows: &str, payload: &ClipboardPayload) -> Result<commands::CmdResult> {
        let rows = parse_rows(rows).map_err(DeskError::Api)?;
        let grid = self.grid.as_mut().ok_or(DeskError::NoClassOpen)?;
        commands::paste::rows(&self.service, &self.activity, grid, &rows, payload).await
    }

    pub async fn paste_cells(
        &mut self,
        rows: &str,
        columns: &str,
        payload: &ClipboardPayload,
    ) -> Result<commands::CmdResult> {
        let range = self.cell_range(rows, columns)?;
        let grid = self.grid.as_mut().ok_or(DeskError::NoClassOpen)?;
        commands::paste::cells(&self.service, &self.activity, grid, &range, payload).await
    }

    pub fn copy_rows(&self, rows: &str) -> Result<commands::CmdResult> {
        let rows = parse_rows(rows).map_err(DeskError::Api)?;
        commands::copy::rows(self.grid()?, &rows)
    }

    pub fn copy_cells(&self, rows: &str, columns: &str) -> Result<commands::CmdResult> {
        let range = self.cell_range(rows, columns)?;
        commands::copy::cells(self.grid()?, &range)
    }

    pub async fn delete_rows(&mut self, rows: &str, confirmation: Option<&str>) -> Result<commands::CmdResult> {
        let rows = parse_rows(rows).map_err(DeskError::Api)?;
        let ids = commands::delete::ids_for_rows(self.grid()?, &rows)?;
        let grid = self.grid.as_mut().ok_or(DeskError::NoClassOpen)?;
        commands::delete::rows(&self.service, &self.activity, grid, &ids, confirmation).await
    }

    pub async fn delete_cells(
        &mut self,
        rows: &str,
        columns: &str,
        confirmation: Option<&str>,
    ) -> Result<commands::CmdResult> {
        let range = self.cell_range(rows, columns)?;
        let grid = self.grid.as_mut().ok_or(DeskError::NoClassOpen)?;
        commands::delete::cells(&self.service, &self.activity, grid, &range, confirmation).await
    }

    pub async fn add_related<I: AsRef<str>>(
        &mut self,
        row: usize,
        column: &str,
        ids: &[I],
    ) -> Result<commands::CmdResult> {
        let ids: Vec<String> = ids.iter().map(|id| id.as_ref().to_string()).collect();
        let grid = self.grid.as_mut().ok_or(DeskError::NoClassOpen)?;
        commands::relation::add(&self.service, &self.activity, grid, row, column, &ids).await
    }

    fn cell_range(&self, rows: &str, columns: &str) -> Result<CellRange> {
        let grid = self.grid()?;
        let keys: Vec<&str> = grid.columns().iter().map(|c| c.key.as_str()).collect();
        let rows = parse_row_span(rows).map_err(DeskError::Api)?;
        let columns = parse_column_span(columns, &keys).map_err(DeskError::Api)?;
        Ok(CellRange::new(rows, columns))
    }
}

pub use crate::commands::{CmdMessage, CmdResult, MessageLevel};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::EditorState;
    use crate::render::CellTone;
    use crate::service::memory::{fixtures, MemService};

    async fn api() -> DeskApi<MemService> {
        let mut api = DeskApi::new(fixtures::service());
        api.open_class("User").await.unwrap();
        api
    }

    #[tokio::test]
    async fn nothing_open() {
        let mut api = DeskApi::new(fixtures::service());
        assert!(matches!(api.refresh().await, Err(DeskError::NoClassOpen)));
        assert!(matches!(api.copy_rows("1"), Err(DeskError::NoClassOpen)));
    }

    #[tokio::test]
    async fn open_renders_rows() {
        let api = api().await;
        let rows = api.render_rows().unwrap();
        assert_eq!(rows.len(), 3);
        let password = api.grid().unwrap().column_index("password").unwrap();
        assert_eq!(rows[0][password].tone, CellTone::Hidden);
        assert!(api.headers().unwrap()[0].starts_with("_id"));
    }

    #[tokio::test]
    async fn limit_applies_to_open() {
        let mut api = DeskApi::new(fixtures::service()).with_limit(2);
        api.open_class("User").await.unwrap();
        assert_eq!(api.grid().unwrap().len(), 2);
        api.set_page(1).await.unwrap();
        assert_eq!(api.grid().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sort_by_column() {
        let mut api = api().await;
        api.toggle_sort("age", false).await.unwrap();
        let first = api.grid().unwrap().row(0).unwrap().id.clone();
        assert_eq!(first.as_deref(), Some("u3"));
        assert!(api.toggle_sort("nope", false).await.is_err());
    }

    #[tokio::test]
    async fn open_view_applies_everything() {
        let mut api = DeskApi::new(fixtures::service()).with_limit(1);
        let view = GridView {
            filters: vec![Filter::eq("active", Value::Bool(true))],
            sort: Some(SortSpec::by("age", crate::query::SortOrder::Descending)),
            page: 1,
        };
        api.open_view("User", view).await.unwrap();
        let grid = api.grid().unwrap();
        assert_eq!(grid.total(), Some(2));
        assert_eq!(grid.row(0).and_then(|r| r.id.clone()).as_deref(), Some("u3"));
    }

    #[tokio::test]
    async fn filters_refetch() {
        let mut api = api().await;
        api.set_filters(vec![Filter::eq("active", Value::Bool(true))])
            .await
            .unwrap();
        assert_eq!(api.grid().unwrap().total(), Some(2));
    }

    #[tokio::test]
    async fn editor_round_trip() {
        let mut api = api().await;
        let mut editor = api.editor(0, "active").unwrap();
        assert!(editor.activate());
        editor.toggle();
        editor.toggle();
        editor.toggle();
        api.commit_editor(0, "active", &mut editor).await.unwrap();

        assert_eq!(editor.state(), &EditorState::Committed(Value::Bool(false)));
        assert_eq!(api.grid().unwrap().row(0).unwrap().value("active"), Value::Bool(false));
    }

    #[tokio::test]
    async fn unchanged_editor_saves_nothing() {
        let mut api = api().await;
        let mut editor = api.editor(0, "name").unwrap();
        editor.activate();
        api.commit_editor(0, "name", &mut editor).await.unwrap();
        assert_eq!(api.service().mutation_calls(), 0);
    }

    #[tokio::test]
    async fn untouched_null_toggle_saves_nothing() {
        let mut api = api().await;
        api.set_cell(0, "active", Value::Null).await.unwrap();
        let calls = api.service().mutation_calls();

        let mut editor = api.editor(0, "active").unwrap();
        assert!(editor.activate());
        let result = api.commit_editor(0, "active", &mut editor).await.unwrap();

        assert!(result.saved.is_empty());
        assert_eq!(api.service().mutation_calls(), calls);
        let row = api.grid().unwrap().row(0).unwrap().clone();
        assert_eq!(row.value("active"), Value::Null);
        let id = row.id.unwrap();
        assert_eq!(api.service().get("User", &id).unwrap().value("active"), Value::Null);
    }

    #[tokio::test]
    async fn read_only_editor_refuses() {
        let api = api().await;
        let mut editor = api.editor(0, "_id").unwrap();
        assert!(!editor.activate());
    }

    #[tokio::test]
    async fn set_cell_text_reports_bad_input() {
        let mut api = api().await;
        assert!(matches!(
            api.set_cell_text(0, "age", "abc").await,
            Err(DeskError::Api(_))
        ));
        api.set_cell_text(0, "age", "7").await.unwrap();
        assert_eq!(api.grid().unwrap().row(0).unwrap().value("age"), Value::Number(7.0));
    }

    #[tokio::test]
    async fn copy_then_paste_cells() {
        let mut api = api().await;
        let copied = api.copy_cells("1", "name:age").unwrap().clipboard.unwrap();
        api.paste_cells("3", "name", &copied).await.unwrap();

        let row = api.grid().unwrap().row(2).unwrap().clone();
        assert_eq!(row.value("name"), Value::from("Ada"));
        assert_eq!(row.value("age"), Value::Number(36.0));
    }

    #[tokio::test]
    async fn delete_rows_by_selection() {
        let mut api = api().await;
        api.delete_rows("1-3,1", None).await.unwrap();
        assert!(api.grid().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_cells_by_span() {
        let mut api = api().await;
        let err = api.delete_cells("1-2", "name:age", None).await.unwrap_err();
        assert!(matches!(err, DeskError::ConfirmationRequired { count: 4, .. }));
        api.delete_cells("1-2", "name:age", Some("User")).await.unwrap();
        assert_eq!(api.grid().unwrap().row(1).unwrap().value("age"), Value::Null);
    }

    #[tokio::test]
    async fn add_related_by_id() {
        let mut api = api().await;
        api.add_related(1, "tags", &["t2"]).await.unwrap();
        let tags = api.grid().unwrap().row(1).unwrap().value("tags");
        assert_eq!(tags.as_array().map(|t| t.len()), Some(1));
    }
}
