//! # Grid State
//!
//! [`GridState`] is the view state of one open class: schema and columns, the
//! user's filters, sort and page, the fetched rows with their [`Overlay`], and
//! the total count.
//!
//! ## Fetch generations
//!
//! Every fetch is started with [`GridState::begin_fetch`], which bumps a
//! generation counter and returns a [`FetchTicket`] carrying the queries to
//! run. Changing filters, sort or page also bumps the counter. When the
//! response arrives, [`GridState::apply_fetch`] drops it if its ticket is older
//! than the current generation, so a slow response can never overwrite the
//! result of a newer query.
//!
//! Mutation results are not generation checked: whatever save finishes last
//! is what the overlay shows.

use crate::object::DataObject;
use crate::overlay::Overlay;
use crate::query::{Filter, Pagination, Query, SortSpec};
use crate::schema::{ClassSchema, Column};
use crate::value::Value;
use std::ops::Range;

/// A rectangular block of cells, in visible row and column indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRange {
    pub rows: Range<usize>,
    pub columns: Range<usize>,
}

impl CellRange {
    pub fn new(rows: Range<usize>, columns: Range<usize>) -> Self {
        Self { rows, columns }
    }

    pub fn single(row: usize, column: usize) -> Self {
        Self::new(row..row + 1, column..column + 1)
    }

    pub fn is_single(&self) -> bool {
        self.rows.len() == 1 && self.columns.len() == 1
    }

    pub fn cell_count(&self) -> usize {
        self.rows.len() * self.columns.len()
    }
}

/// Queries for one fetch, tagged with the generation that issued them.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    generation: u64,
    /// Filtered query used for the count.
    pub count: Query,
    /// Sorted and paged query for the rows.
    pub page: Query,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone)]
pub struct GridState {
    class_name: String,
    schema: ClassSchema,
    columns: Vec<Column>,
    filters: Vec<Filter>,
    sort: SortSpec,
    page: Pagination,
    overlay: Overlay,
    total: Option<usize>,
    generation: u64,
}

impl GridState {
    pub fn new(class_name: impl Into<String>, schema: ClassSchema) -> Self {
        let columns = schema.columns();
        Self {
            class_name: class_name.into(),
            schema,
            columns,
            filters: Vec::new(),
            sort: SortSpec::default(),
            page: Pagination::default(),
            overlay: Overlay::default(),
            total: None,
            generation: 0,
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn schema(&self) -> &ClassSchema {
        &self.schema
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, key: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.key == key)
    }

    pub fn column_index(&self, key: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.key == key)
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn sort(&self) -> &SortSpec {
        &self.sort
    }

    pub fn page(&self) -> Pagination {
        self.page
    }

    /// Count reported by the last applied fetch.
    pub fn total(&self) -> Option<usize> {
        self.total
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn set_filters(&mut self, filters: Vec<Filter>) {
        self.filters = filters;
        self.generation += 1;
    }

    pub fn set_sort(&mut self, sort: SortSpec) {
        self.sort = sort;
        self.generation += 1;
    }

    pub fn toggle_sort(&mut self, column: &str, additive: bool) {
        self.sort.toggle(column, additive);
        self.generation += 1;
    }

    pub fn set_page(&mut self, page: Pagination) {
        self.page = page;
        self.generation += 1;
    }

    /// Class, filters and includes: everything but sort and window.
    pub fn base_query(&self) -> Query {
        let mut includes = vec!["*".to_string()];
        includes.extend(self.schema.reference_includes());
        self.filters
            .iter()
            .cloned()
            .fold(Query::new(&self.class_name), Query::filter)
            .includes(includes)
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        let count = self.base_query();
        let page = count.clone().sort(self.sort.clone()).page(self.page);
        FetchTicket {
            generation: self.generation,
            count,
            page,
        }
    }

    /// Install a fetch result. Returns `false` and leaves state alone if the
    /// ticket has been superseded.
    pub fn apply_fetch(&mut self, ticket: &FetchTicket, total: usize, rows: Vec<DataObject>) -> bool {
        if ticket.generation != self.generation {
            tracing::warn!(
                class = %self.class_name,
                stale = ticket.generation,
                current = self.generation,
                "Dropping stale fetch response"
            );
            return false;
        }
        self.total = Some(total);
        self.overlay.reset(rows);
        true
    }

    pub fn rows(&self) -> Vec<&DataObject> {
        self.overlay.materialize()
    }

    pub fn row(&self, index: usize) -> Option<&DataObject> {
        self.rows().get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn fold_saved<I: IntoIterator<Item = DataObject>>(&mut self, saved: I) {
        self.overlay.fold_saved(saved);
    }

    pub fn mark_deleted<I, T>(&mut self, ids: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.overlay.mark_deleted(ids);
    }

    /// Cell values for a block, clipped to the grid, with the column keys.
    pub fn cell_values(&self, range: &CellRange) -> (Vec<String>, Vec<Vec<Value>>) {
        let columns: Vec<&Column> = self
            .columns
            .iter()
            .skip(range.columns.start)
            .take(range.columns.len())
            .collect();
        let rows = self.rows();
        let values = rows
            .iter()
            .skip(range.rows.start)
            .take(range.rows.len())
            .map(|obj| columns.iter().map(|c| obj.value(&c.key)).collect())
            .collect();
        (columns.iter().map(|c| c.key.clone()).collect(), values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn grid() -> GridState {
        let schema: ClassSchema = serde_json::from_value(json!({
            "fields": {
                "_id": "string",
                "name": "string",
                "owner": { "type": "pointer", "target": "User" }
            }
        }))
        .unwrap();
        GridState::new("Post", schema)
    }

    #[test]
    fn fetch_query_carries_includes_sort_and_window() {
        let mut grid = grid();
        grid.set_filters(vec![Filter::eq("name", Value::from("a"))]);
        let ticket = grid.begin_fetch();
        assert_eq!(ticket.count.includes, vec!["*", "owner._id"]);
        assert_eq!(ticket.count.filters.len(), 1);
        assert_eq!(ticket.page.limit, Some(100));
        assert_eq!(ticket.page.sort, SortSpec::default());
    }

    #[test]
    fn stale_fetch_is_dropped() {
        let mut grid = grid();
        let first = grid.begin_fetch();
        let second = grid.begin_fetch();
        assert!(grid.apply_fetch(&second, 1, vec![DataObject::with_id("Post", "new")]));
        assert!(!grid.apply_fetch(&first, 1, vec![DataObject::with_id("Post", "old")]));
        assert_eq!(grid.row(0).and_then(|r| r.id.clone()).as_deref(), Some("new"));
    }

    #[test]
    fn view_change_invalidates_in_flight_fetch() {
        let mut grid = grid();
        let ticket = grid.begin_fetch();
        grid.toggle_sort("name", false);
        assert!(!grid.apply_fetch(&ticket, 0, vec![]));
        assert_eq!(grid.total(), None);
    }

    #[test]
    fn cell_values_clip_to_grid() {
        let mut grid = grid();
        let ticket = grid.begin_fetch();
        grid.apply_fetch(
            &ticket,
            2,
            vec![
                DataObject::with_id("Post", "p1").set_with("name", "a"),
                DataObject::with_id("Post", "p2").set_with("name", "b"),
            ],
        );
        let (columns, values) = grid.cell_values(&CellRange::new(1..5, 0..2));
        assert_eq!(columns, vec!["_id", "name"]);
        assert_eq!(values, vec![vec![Value::from("p2"), Value::from("b")]]);
    }

    #[test]
    fn range_counts() {
        assert_eq!(CellRange::new(0..2, 1..3).cell_count(), 4);
        assert!(CellRange::single(3, 4).is_single());
    }
}
