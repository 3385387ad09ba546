//! # Rendering Module
//!
//! Turns API results into terminal text.
//!
//! ## Table Layout
//!
//! The grid is printed as a fixed-width table:
//! - `#` column: 1-based row number, the same numbers the row arguments use
//! - one column per grid column, as wide as its widest cell up to
//!   [`MAX_CELL_WIDTH`], or exactly the width saved for it in the session
//!
//! Cells are truncated with `…` by display width, so wide characters line up.
//! Links (pointers, relations, files) are underlined; their targets are not
//! printed.

use super::styles;
use protodeskapp::api::CmdMessage;
use protodeskapp::render::CellDisplay;
use std::collections::HashMap;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub const MAX_CELL_WIDTH: usize = 24;
pub const COLUMN_GAP: &str = "  ";
const ELLIPSIS: char = '…';

/// Truncate to a display width, marking the cut with an ellipsis.
pub fn truncate_to_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > width - 1 {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push(ELLIPSIS);
    out
}

fn pad_to_width(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{}{}", text, " ".repeat(fill))
}

/// Column widths for a table: saved widths win, others fit their content.
pub fn column_widths(
    keys: &[String],
    headers: &[String],
    rows: &[Vec<CellDisplay>],
    saved: &HashMap<String, usize>,
) -> Vec<usize> {
    keys.iter()
        .enumerate()
        .map(|(i, key)| {
            if let Some(&width) = saved.get(key) {
                return width.max(1);
            }
            let widest = rows
                .iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.text.width())
                .chain(headers.get(i).map(|h| h.width()))
                .max()
                .unwrap_or(1);
            widest.clamp(1, MAX_CELL_WIDTH)
        })
        .collect()
}

pub fn render_table(
    keys: &[String],
    headers: &[String],
    rows: &[Vec<CellDisplay>],
    saved: &HashMap<String, usize>,
    first_row: usize,
) -> String {
    let widths = column_widths(keys, headers, rows, saved);
    let number_width = (first_row + rows.len()).to_string().len().max(1);
    let mut out = String::new();

    let mut line = vec![pad_to_width("#", number_width)];
    for (header, &width) in headers.iter().zip(&widths) {
        let text = pad_to_width(&truncate_to_width(header, width), width);
        line.push(styles::header().apply_to(text).to_string());
    }
    out.push_str(line.join(COLUMN_GAP).trim_end());
    out.push('\n');

    for (i, row) in rows.iter().enumerate() {
        let number = format!("{:>w$}", first_row + i + 1, w = number_width);
        let mut line = vec![styles::muted().apply_to(number).to_string()];
        for (cell, &width) in row.iter().zip(&widths) {
            let text = pad_to_width(&truncate_to_width(&cell.text, width), width);
            line.push(styles::tone(cell.tone).apply_to(text).to_string());
        }
        out.push_str(line.join(COLUMN_GAP).trim_end());
        out.push('\n');
    }
    out
}

pub fn render_footer(page: usize, page_count: usize, total: usize) -> String {
    let rows = if total == 1 { "row" } else { "rows" };
    styles::muted()
        .apply_to(format!(
            "Page {} of {} ({} {})",
            page + 1,
            page_count.max(1),
            total,
            rows
        ))
        .to_string()
}

pub fn render_messages(messages: &[CmdMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}\n", styles::message(&m.level).apply_to(&m.content)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use protodeskapp::render::CellTone;

    fn cell(text: &str) -> CellDisplay {
        CellDisplay {
            text: text.to_string(),
            tone: CellTone::String,
            action: None,
        }
    }

    #[test]
    fn truncation_respects_display_width() {
        assert_eq!(truncate_to_width("hello", 10), "hello");
        assert_eq!(truncate_to_width("hello world", 6), "hello…");
        assert_eq!(truncate_to_width("日本語テキスト", 5), "日本…");
        assert_eq!(truncate_to_width("abc", 0), "");
    }

    #[test]
    fn widths_fit_content_or_saved() {
        let keys = vec!["a".to_string(), "b".to_string()];
        let headers = vec!["a (string)".to_string(), "b".to_string()];
        let rows = vec![vec![cell("x"), cell(&"y".repeat(40))]];
        let mut saved = HashMap::new();
        assert_eq!(column_widths(&keys, &headers, &rows, &saved), vec![10, MAX_CELL_WIDTH]);
        saved.insert("b".to_string(), 5);
        assert_eq!(column_widths(&keys, &headers, &rows, &saved), vec![10, 5]);
    }

    #[test]
    fn table_numbers_rows_from_page_start() {
        console::set_colors_enabled(false);
        let keys = vec!["name".to_string()];
        let headers = vec!["name".to_string()];
        let rows = vec![vec![cell("Ada")], vec![cell("Grace")]];
        let table = render_table(&keys, &headers, &rows, &HashMap::new(), 10);
        assert_eq!(table, "#   name\n11  Ada\n12  Grace\n");
    }

    #[test]
    fn footer_pluralizes() {
        console::set_colors_enabled(false);
        assert_eq!(render_footer(0, 1, 1), "Page 1 of 1 (1 row)");
        assert_eq!(render_footer(1, 3, 250), "Page 2 of 3 (250 rows)");
    }
}
