//! Row and column selections typed by users.
//!
//! Rows are 1-based, as shown in listings, and parse into 0-based grid
//! indexes:
//!
//! - **Single**: `3`
//! - **Range**: `2-5` (start must be ≤ end)
//! - **List**: `1,3-4,7`, deduplicated in first-seen order
//!
//! A selection may name at most [`MAX_SELECTED_ROWS`] rows.
//!
//! Columns are named by key. A column span is `first:last`, inclusive, in
//! grid column order.
//!
//! Sorts are comma separated keys, a leading `-` meaning descending:
//! `-age,name`.

use crate::query::{SortOrder, SortSpec};
use indexmap::IndexSet;
use std::ops::Range;

pub const MAX_SELECTED_ROWS: usize = 100_000;

/// Parse a row selection into 0-based indexes.
pub fn parse_rows(s: &str) -> Result<Vec<usize>, String> {
    let mut rows = IndexSet::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let range = parse_row_or_range(part)?;
        if range.len() > MAX_SELECTED_ROWS {
            return Err(too_many_rows(s));
        }
        rows.extend(range);
        if rows.len() > MAX_SELECTED_ROWS {
            return Err(too_many_rows(s));
        }
    }
    if rows.is_empty() {
        return Err(format!("No rows selected: '{}'", s));
    }
    Ok(rows.into_iter().collect())
}

fn too_many_rows(s: &str) -> String {
    format!("Too many rows: '{}' (at most {} per selection)", s, MAX_SELECTED_ROWS)
}

fn parse_row_or_range(s: &str) -> Result<Range<usize>, String> {
    match s.split_once('-') {
        Some((start, end)) => {
            let start = parse_row(start)?;
            let end = parse_row(end)?;
            if start > end {
                return Err(format!("Invalid range: {} (start must be <= end)", s));
            }
            Ok(start..end + 1)
        }
        None => {
            let row = parse_row(s)?;
            Ok(row..row + 1)
        }
    }
}

fn parse_row(s: &str) -> Result<usize, String> {
    match s.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(format!("Invalid row: '{}'", s.trim())),
    }
}

/// Parse a contiguous row span like `2-4` into a 0-based range.
pub fn parse_row_span(s: &str) -> Result<Range<usize>, String> {
    parse_row_or_range(s.trim())
}

/// Resolve `first:last` (or a single key) against the grid's column keys.
pub fn parse_column_span<S: AsRef<str>>(s: &str, columns: &[S]) -> Result<Range<usize>, String> {
    let position = |key: &str| {
        columns
            .iter()
            .position(|c| c.as_ref() == key)
            .ok_or_else(|| format!("Unknown column: '{}'", key))
    };
    match s.split_once(':') {
        Some((first, last)) => {
            let start = position(first.trim())?;
            let end = position(last.trim())?;
            if start > end {
                return Err(format!("Invalid column span: {} (columns out of order)", s));
            }
            Ok(start..end + 1)
        }
        None => {
            let index = position(s.trim())?;
            Ok(index..index + 1)
        }
    }
}

/// Parse a sort like `-age,name`.
pub fn parse_sort(s: &str) -> Result<SortSpec, String> {
    let mut sort = SortSpec::empty();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (column, order) = match part.strip_prefix('-') {
            Some(column) => (column, SortOrder::Descending),
            None => (part.trim_start_matches('+'), SortOrder::Ascending),
        };
        if column.is_empty() {
            return Err(format!("Invalid sort key: '{}'", part));
        }
        sort = sort.then(column, order);
    }
    if sort.is_empty() {
        return Err(format!("No sort keys: '{}'", s));
    }
    Ok(sort)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_parse_to_zero_based() {
        assert_eq!(parse_rows("3"), Ok(vec![2]));
        assert_eq!(parse_rows("1-3,5"), Ok(vec![0, 1, 2, 4]));
        assert_eq!(parse_rows("2,1-2"), Ok(vec![1, 0]));
    }

    #[test]
    fn invalid_rows() {
        assert!(parse_rows("0").is_err());
        assert!(parse_rows("3-1").is_err());
        assert!(parse_rows("x").is_err());
        assert!(parse_rows("").is_err());
    }

    #[test]
    fn huge_selections_are_refused() {
        assert_eq!(parse_rows("1-100000").map(|r| r.len()), Ok(MAX_SELECTED_ROWS));
        assert_eq!(parse_rows("1-100000,50000-50010").map(|r| r.len()), Ok(MAX_SELECTED_ROWS));
        assert!(parse_rows("1-100001").is_err());
        assert!(parse_rows("1-999999999").is_err());
        assert!(parse_rows("1-60000,70000-130000").is_err());
    }

    #[test]
    fn column_spans() {
        let columns = ["_id", "name", "age", "email"];
        assert_eq!(parse_column_span("name:email", &columns), Ok(1..4));
        assert_eq!(parse_column_span("age", &columns), Ok(2..3));
        assert!(parse_column_span("email:name", &columns).is_err());
        assert!(parse_column_span("nope", &columns).is_err());
    }

    #[test]
    fn row_span() {
        assert_eq!(parse_row_span("2-4"), Ok(1..4));
        assert_eq!(parse_row_span("7"), Ok(6..7));
    }

    #[test]
    fn sorts() {
        let sort = parse_sort("-age, name").unwrap();
        let keys: Vec<(&String, &SortOrder)> = sort.iter().collect();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0], (&"age".to_string(), &SortOrder::Descending));
        assert_eq!(keys[1], (&"name".to_string(), &SortOrder::Ascending));
        assert!(parse_sort("-").is_err());
        assert!(parse_sort(" , ").is_err());
    }
}
