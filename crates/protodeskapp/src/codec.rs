//! # Clipboard Codec
//!
//! Copying a block of cells produces two encodings at once, the same pair a
//! browser clipboard carries:
//!
//! | MIME type          | Encoding                                              |
//! |--------------------|-------------------------------------------------------|
//! | `text/plain`       | tab separated rows, one text conversion per cell      |
//! | `application/json` | array of row records keyed by column, wire JSON values |
//!
//! Pasting prefers the JSON encoding since it keeps types. Plain text is
//! decoded per cell, directed by the target column's [`FieldType`], and is
//! best effort: text that does not parse as the column's type decodes to
//! `None` and the cell is left alone.
//!
//! ## TSV quoting
//!
//! A field containing a tab, a newline, a carriage return or a double quote is
//! wrapped in double quotes, with embedded quotes doubled. Parsing accepts the
//! same form, plus bare `\r\n` line endings.

use crate::schema::FieldType;
use crate::value::{format_date, format_number, parse_date, ObjectRef, Record, Value};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const TEXT_MIME: &str = "text/plain";
pub const JSON_MIME: &str = "application/json";

/// What a copy produces and a paste consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardPayload {
    pub text: Option<String>,
    pub json: Option<String>,
}

impl ClipboardPayload {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            json: None,
        }
    }

    pub fn from_json(json: impl Into<String>) -> Self {
        Self {
            text: None,
            json: Some(json.into()),
        }
    }

    /// Encode a block of cells. Each row lines up with `columns`.
    pub fn from_cells(columns: &[String], rows: &[Vec<Value>]) -> Self {
        Self {
            text: Some(encode_tsv(rows)),
            json: Some(encode_json(columns, rows)),
        }
    }

    /// Look up an encoding by MIME type.
    pub fn get(&self, mime: &str) -> Option<&str> {
        match mime {
            TEXT_MIME => self.text.as_deref(),
            JSON_MIME => self.json.as_deref(),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.as_deref().map_or(true, str::is_empty)
            && self.json.as_deref().map_or(true, str::is_empty)
    }
}

/// Rows decoded from a clipboard payload.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedRows {
    /// Typed records keyed by column name.
    Records(Vec<Record>),
    /// Raw cell text, positional.
    Text(Vec<Vec<String>>),
}

impl DecodedRows {
    pub fn len(&self) -> usize {
        match self {
            DecodedRows::Records(rows) => rows.len(),
            DecodedRows::Text(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Widest row, for text payloads. Records have no positional width.
    pub fn width(&self) -> usize {
        match self {
            DecodedRows::Records(rows) => rows.iter().map(|r| r.len()).max().unwrap_or(0),
            DecodedRows::Text(rows) => rows.iter().map(Vec::len).max().unwrap_or(0),
        }
    }
}

/// Decode a payload, preferring JSON. Returns `None` when neither encoding
/// yields any rows.
pub fn decode_payload(payload: &ClipboardPayload) -> Option<DecodedRows> {
    if let Some(records) = payload.json.as_deref().and_then(decode_json) {
        return Some(DecodedRows::Records(records));
    }
    let rows = parse_tsv(payload.text.as_deref()?);
    if rows.is_empty() {
        None
    } else {
        Some(DecodedRows::Text(rows))
    }
}

fn decode_json(json: &str) -> Option<Vec<Record>> {
    let parsed: serde_json::Value = serde_json::from_str(json).ok()?;
    let items = match &parsed {
        serde_json::Value::Array(items) => items.as_slice(),
        serde_json::Value::Object(_) => std::slice::from_ref(&parsed),
        _ => return None,
    };
    items
        .iter()
        .map(|item| match Value::from_json(item) {
            Value::Object(record) => Some(record),
            _ => None,
        })
        .collect()
}

/// Text form of one cell for the `text/plain` encoding.
pub fn encode_cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(v) => v.to_string(),
        Value::Number(v) => format_number(*v),
        Value::String(s) => s.clone(),
        Value::Decimal(d) => d.to_string(),
        Value::Date(d) => format_date(d),
        Value::Pointer(r) => r.id.clone(),
        Value::File(f) => f.id.clone(),
        Value::Array(_) | Value::Object(_) => value.serialize_inline(),
    }
}

pub fn encode_tsv(rows: &[Vec<Value>]) -> String {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|v| quote_field(&encode_cell_text(v)))
                .collect::<Vec<_>>()
                .join("\t")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn quote_field(field: &str) -> String {
    if field.contains(['\t', '\n', '\r', '"']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Split tab separated text into rows of raw cell text.
pub fn parse_tsv(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut chars = text.chars().peekable();
    let mut at_field_start = true;
    let mut quoted = false;

    while let Some(c) = chars.next() {
        if quoted {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    quoted = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }
        match c {
            '"' if at_field_start => {
                quoted = true;
                at_field_start = false;
            }
            '\t' => {
                row.push(std::mem::take(&mut field));
                at_field_start = true;
            }
            '\r' | '\n' => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
                at_field_start = true;
            }
            c => {
                field.push(c);
                at_field_start = false;
            }
        }
    }
    if !at_field_start || !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    rows
}

pub fn encode_json(columns: &[String], rows: &[Vec<Value>]) -> String {
    let records: Vec<serde_json::Value> = rows
        .iter()
        .map(|row| {
            serde_json::Value::Object(
                columns
                    .iter()
                    .zip(row)
                    .map(|(column, value)| (column.clone(), value.to_json()))
                    .collect(),
            )
        })
        .collect();
    serde_json::Value::Array(records).to_string()
}

/// Decode raw cell text for a column of the given type.
///
/// `None` means the text does not apply to this column. Relation and file
/// columns never decode from text.
pub fn decode_text(text: &str, field_type: &FieldType) -> Option<Value> {
    match field_type {
        FieldType::Boolean => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        FieldType::Number => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Value::Number),
        FieldType::Decimal => parse_decimal(text).map(Value::Decimal),
        FieldType::String => Some(Value::String(text.to_string())),
        FieldType::Date => parse_date(text).map(Value::Date),
        FieldType::Object | FieldType::Shape(_) => match parse_wire(text)? {
            v @ Value::Object(_) => Some(v),
            _ => None,
        },
        FieldType::Array => match parse_wire(text)? {
            v @ Value::Array(_) => Some(v),
            _ => None,
        },
        FieldType::StringArray => match parse_wire(text)? {
            Value::Array(items) if items.iter().all(|v| matches!(v, Value::String(_))) => {
                Some(Value::Array(items))
            }
            _ => None,
        },
        FieldType::Pointer { target } => {
            let id = text.trim();
            (!id.is_empty()).then(|| Value::Pointer(ObjectRef::new(target.clone(), id)))
        }
        FieldType::Relation { .. } | FieldType::File | FieldType::Unknown(_) => None,
    }
}

/// Check a typed value from a JSON payload against a column.
///
/// Strings go through [`decode_text`] so a JSON payload built by a foreign
/// source can still fill typed columns.
pub fn accept_value(value: Value, field_type: &FieldType) -> Option<Value> {
    if let Value::String(text) = &value {
        return decode_text(text, field_type);
    }
    let accepted = match (field_type, &value) {
        (_, Value::Null) => true,
        (FieldType::Boolean, Value::Bool(_)) => true,
        (FieldType::Number, Value::Number(v)) => v.is_finite(),
        (FieldType::Decimal, Value::Decimal(_)) => true,
        (FieldType::Decimal, Value::Number(v)) => {
            return Decimal::from_f64_retain(*v).map(|d| Value::Decimal(d.normalize()))
        }
        (FieldType::Number, Value::Decimal(_)) => {
            return value.as_f64().map(Value::Number);
        }
        (FieldType::Date, Value::Date(_)) => true,
        (FieldType::Object | FieldType::Shape(_), Value::Object(_)) => true,
        (FieldType::Array, Value::Array(_)) => true,
        (FieldType::StringArray, Value::Array(items)) => {
            items.iter().all(|v| matches!(v, Value::String(_)))
        }
        (FieldType::Pointer { target }, Value::Pointer(r)) => &r.class_name == target,
        (FieldType::File, Value::File(_)) => true,
        _ => false,
    };
    accepted.then_some(value)
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

fn parse_wire(text: &str) -> Option<Value> {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .map(|json| Value::from_json(&json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn canonical_values_survive_text() {
        let cases = [
            (Value::Number(7.0), FieldType::Number),
            (Value::Number(-0.125), FieldType::Number),
            (Value::Decimal(Decimal::new(-1999, 3)), FieldType::Decimal),
            (Value::String("tab\there".into()), FieldType::String),
            (Value::Bool(false), FieldType::Boolean),
            (
                Value::Date(Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 1).unwrap()),
                FieldType::Date,
            ),
        ];
        for (value, field_type) in cases {
            let text = encode_cell_text(&value);
            assert_eq!(decode_text(&text, &field_type), Some(value));
        }
    }

    #[test]
    fn unparseable_text_decodes_to_none() {
        assert_eq!(decode_text("abc", &FieldType::Number), None);
        assert_eq!(decode_text("Infinity", &FieldType::Number), None);
        assert_eq!(decode_text("yes", &FieldType::Boolean), None);
        assert_eq!(decode_text("{oops", &FieldType::Object), None);
        assert_eq!(decode_text("[1]", &FieldType::Object), None);
        assert_eq!(decode_text("[1]", &FieldType::StringArray), None);
        assert_eq!(decode_text("  ", &FieldType::Pointer { target: "User".into() }), None);
    }

    #[test]
    fn references_never_decode_from_text() {
        let relation = FieldType::Relation {
            target: "Post".into(),
            foreign_field: None,
        };
        assert_eq!(decode_text("p1", &relation), None);
        assert_eq!(decode_text("f1", &FieldType::File), None);
    }

    #[test]
    fn pointer_text_is_the_id() {
        let value = Value::Pointer(ObjectRef::new("User", "u1"));
        assert_eq!(encode_cell_text(&value), "u1");
        assert_eq!(
            decode_text(" u1 ", &FieldType::Pointer { target: "User".into() }),
            Some(value)
        );
    }

    #[test]
    fn tsv_quotes_special_fields() {
        let rows = vec![
            vec![Value::from("a\tb"), Value::from("say \"hi\""), Value::Null],
            vec![Value::from("line\nbreak"), Value::Number(1.0), Value::Bool(true)],
        ];
        let text = encode_tsv(&rows);
        assert_eq!(
            text,
            "\"a\tb\"\t\"say \"\"hi\"\"\"\t\n\"line\nbreak\"\t1\ttrue"
        );
        assert_eq!(
            parse_tsv(&text),
            vec![
                vec!["a\tb", "say \"hi\"", ""],
                vec!["line\nbreak", "1", "true"],
            ]
        );
    }

    #[test]
    fn tsv_parse_handles_crlf_and_trailing_newline() {
        assert_eq!(parse_tsv("1\t2\r\n3\t4\r\n"), vec![vec!["1", "2"], vec!["3", "4"]]);
        assert_eq!(parse_tsv(""), Vec::<Vec<String>>::new());
        assert_eq!(parse_tsv("\n"), vec![vec![""]]);
    }

    #[test]
    fn payload_prefers_json() {
        let columns = vec!["name".to_string(), "price".to_string()];
        let rows = vec![vec![Value::from("Ada"), Value::Decimal(Decimal::new(150, 2))]];
        let mut payload = ClipboardPayload::from_cells(&columns, &rows);
        assert_eq!(payload.get(TEXT_MIME), Some("Ada\t1.50"));

        let Some(DecodedRows::Records(records)) = decode_payload(&payload) else {
            panic!("Expected records");
        };
        assert_eq!(records[0]["price"], Value::Decimal(Decimal::new(150, 2)));

        payload.json = Some("not json".into());
        assert_eq!(
            decode_payload(&payload),
            Some(DecodedRows::Text(vec![vec!["Ada".into(), "1.50".into()]]))
        );
    }

    #[test]
    fn json_values_are_checked_against_columns() {
        assert_eq!(
            accept_value(Value::from("7"), &FieldType::Number),
            Some(Value::Number(7.0))
        );
        assert_eq!(accept_value(Value::Bool(true), &FieldType::Number), None);
        assert_eq!(accept_value(Value::Null, &FieldType::Date), Some(Value::Null));
        assert_eq!(
            accept_value(Value::Number(2.5), &FieldType::Decimal),
            Some(Value::Decimal(Decimal::new(25, 1)))
        );
    }
}
