//! # Cell Rendering
//!
//! Turns a cell value into a one-line display: its text, a [`CellTone`] the
//! front end maps to a colour, and an optional [`CellAction`] for cells that
//! link somewhere else.
//!
//! Scalars render by what they are, whatever the column claims. Structured and
//! reference values render by the column's kind:
//!
//! | Kind                 | Text                       | Action                          |
//! |----------------------|----------------------------|---------------------------------|
//! | object, array, shape | inline wire JSON           |                                 |
//! | pointer              | target id                  | open target class, `_id == id`  |
//! | relation             | `N objects`                | open target class, filtered     |
//! | file                 | filename                   | download URL                    |
//! | unknown              | blank                      |                                 |
//!
//! Hidden columns always render `(hidden)`.

use crate::object::{DataObject, ID_FIELD};
use crate::query::{Filter, SortOrder, SortSpec};
use crate::schema::{ClassSchema, Column, FieldType, Kind};
use crate::value::{format_number, FileRef, Value};
use chrono::{DateTime, FixedOffset, Offset, Utc};

pub const HIDDEN_PLACEHOLDER: &str = "(hidden)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellTone {
    Null,
    Boolean,
    Number,
    String,
    Date,
    Structured,
    Pointer,
    Relation,
    File,
    Hidden,
    Blank,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellAction {
    /// Open `class_name` in the browser with `filter` applied.
    Navigate { class_name: String, filter: Filter },
    Download { url: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellDisplay {
    pub text: String,
    pub tone: CellTone,
    pub action: Option<CellAction>,
}

impl CellDisplay {
    fn plain(text: impl Into<String>, tone: CellTone) -> Self {
        Self {
            text: text.into(),
            tone,
            action: None,
        }
    }

    fn blank() -> Self {
        Self::plain("", CellTone::Blank)
    }
}

/// Renders cells; dates are shown in the renderer's UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct CellRenderer {
    offset: FixedOffset,
}

impl Default for CellRenderer {
    fn default() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }
}

impl CellRenderer {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// `M/D/YYYY, h:mm:ss AM` in the renderer's offset.
    pub fn format_date(&self, date: &DateTime<Utc>) -> String {
        date.with_timezone(&self.offset)
            .format("%-m/%-d/%Y, %-I:%M:%S %p")
            .to_string()
    }

    /// Render one cell of a row, with column visibility and row context.
    pub fn render_cell(
        &self,
        object: &DataObject,
        column: &Column,
        schema: &ClassSchema,
    ) -> CellDisplay {
        if schema.is_hidden(&column.key) {
            return CellDisplay::plain(HIDDEN_PLACEHOLDER, CellTone::Hidden);
        }
        let value = object.value(&column.key);
        if let (
            FieldType::Relation {
                target,
                foreign_field: Some(foreign_field),
            },
            Value::Array(items),
        ) = (&column.field_type, &value)
        {
            // Foreign-field relations link back by owner rather than by id list.
            let action = object.object_ref().map(|owner| CellAction::Navigate {
                class_name: target.clone(),
                filter: Filter::eq(foreign_field.clone(), Value::Pointer(owner)),
            });
            return CellDisplay {
                text: relation_text(items.len()),
                tone: CellTone::Relation,
                action,
            };
        }
        self.render(&value, &column.field_type)
    }

    /// Render a bare value against a field type.
    pub fn render(&self, value: &Value, field_type: &FieldType) -> CellDisplay {
        match value {
            Value::Null => return CellDisplay::plain("null", CellTone::Null),
            Value::Bool(v) => return CellDisplay::plain(v.to_string(), CellTone::Boolean),
            Value::Number(v) => return CellDisplay::plain(format_number(*v), CellTone::Number),
            Value::Decimal(d) => return CellDisplay::plain(d.to_string(), CellTone::Number),
            Value::String(s) => return CellDisplay::plain(one_line(s), CellTone::String),
            Value::Date(d) => return CellDisplay::plain(self.format_date(d), CellTone::Date),
            _ => {}
        }
        match field_type.kind() {
            Kind::Object | Kind::Array | Kind::Shape => {
                CellDisplay::plain(value.serialize_inline(), CellTone::Structured)
            }
            Kind::Pointer => match value {
                Value::Pointer(r) => CellDisplay {
                    text: r.id.clone(),
                    tone: CellTone::Pointer,
                    action: Some(CellAction::Navigate {
                        class_name: r.class_name.clone(),
                        filter: Filter::eq(ID_FIELD, Value::String(r.id.clone())),
                    }),
                },
                Value::File(f) => file_display(f),
                _ => CellDisplay::blank(),
            },
            Kind::File => match value {
                Value::File(f) => file_display(f),
                _ => CellDisplay::blank(),
            },
            Kind::Relation => match value {
                Value::Array(items) => {
                    let ids: Vec<Value> = items
                        .iter()
                        .filter_map(Value::object_id)
                        .map(Value::from)
                        .collect();
                    CellDisplay {
                        text: relation_text(items.len()),
                        tone: CellTone::Relation,
                        action: field_type.target().map(|target| CellAction::Navigate {
                            class_name: target.to_string(),
                            filter: Filter::is_in(ID_FIELD, ids),
                        }),
                    }
                }
                _ => CellDisplay::blank(),
            },
            _ => CellDisplay::blank(),
        }
    }
}

fn file_display(file: &FileRef) -> CellDisplay {
    CellDisplay {
        text: file.filename.clone(),
        tone: CellTone::File,
        action: file
            .url
            .clone()
            .map(|url| CellAction::Download { url }),
    }
}

fn relation_text(count: usize) -> String {
    format!("{} objects", count)
}

fn one_line(s: &str) -> String {
    if s.contains(['\n', '\r']) {
        s.replace("\r\n", " ").replace(['\n', '\r'], " ")
    } else {
        s.to_string()
    }
}

/// Column header: `key (kind)` plus an arrow when the column is sorted.
pub fn render_header(column: &Column, sort: &SortSpec) -> String {
    let arrow = match sort.get(&column.key) {
        Some(SortOrder::Ascending) => " ▲",
        Some(SortOrder::Descending) => " ▼",
        None => "",
    };
    format!("{} ({}){}", column.key, column.field_type.label(), arrow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ObjectRef;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn schema() -> ClassSchema {
        serde_json::from_value(json!({
            "fields": {
                "_id": "string",
                "owner": { "type": "pointer", "target": "User" },
                "posts": { "type": "relation", "target": "Post", "foreignField": "author" },
                "tags": { "type": "relation", "target": "Tag" },
                "avatar": "file",
                "meta": "object",
                "secret": "string",
                "odd": { "type": "mystery" }
            },
            "secureFields": ["secret"]
        }))
        .unwrap()
    }

    fn column(schema: &ClassSchema, key: &str) -> Column {
        schema.columns().into_iter().find(|c| c.key == key).unwrap()
    }

    #[test]
    fn scalars_render_by_value() {
        let r = CellRenderer::default();
        assert_eq!(r.render(&Value::Null, &FieldType::Number).text, "null");
        assert_eq!(r.render(&Value::Bool(true), &FieldType::Boolean).text, "true");
        assert_eq!(r.render(&Value::Number(42.0), &FieldType::Number).text, "42");
        let dec = r.render(&Value::Decimal(Decimal::new(1050, 2)), &FieldType::Decimal);
        assert_eq!((dec.text.as_str(), dec.tone), ("10.50", CellTone::Number));
    }

    #[test]
    fn dates_use_locale_format_in_offset() {
        let date = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let utc = CellRenderer::default();
        assert_eq!(utc.format_date(&date), "3/5/2024, 2:07:09 PM");
        let tokyo = CellRenderer::new(FixedOffset::east_opt(9 * 3600).unwrap());
        assert_eq!(tokyo.format_date(&date), "3/5/2024, 11:07:09 PM");
    }

    #[test]
    fn pointer_navigates_to_target_row() {
        let schema = schema();
        let obj = DataObject::with_id("Post", "p1").set_with("owner", ObjectRef::new("User", "u1"));
        let display = CellRenderer::default().render_cell(&obj, &column(&schema, "owner"), &schema);
        assert_eq!(display.text, "u1");
        assert_eq!(
            display.action,
            Some(CellAction::Navigate {
                class_name: "User".into(),
                filter: Filter::eq("_id", Value::from("u1")),
            })
        );
    }

    #[test]
    fn relations_show_counts() {
        let schema = schema();
        let tags = Value::Array(vec![
            Value::Pointer(ObjectRef::new("Tag", "t1")),
            Value::Pointer(ObjectRef::new("Tag", "t2")),
        ]);
        let obj = DataObject::with_id("User", "u1")
            .set_with("tags", tags)
            .set_with("posts", Value::Array(vec![]));
        let r = CellRenderer::default();

        let display = r.render_cell(&obj, &column(&schema, "tags"), &schema);
        assert_eq!(display.text, "2 objects");
        assert_eq!(
            display.action,
            Some(CellAction::Navigate {
                class_name: "Tag".into(),
                filter: Filter::is_in("_id", vec![Value::from("t1"), Value::from("t2")]),
            })
        );

        let display = r.render_cell(&obj, &column(&schema, "posts"), &schema);
        assert_eq!(display.text, "0 objects");
        assert_eq!(
            display.action,
            Some(CellAction::Navigate {
                class_name: "Post".into(),
                filter: Filter::eq("author", Value::Pointer(ObjectRef::new("User", "u1"))),
            })
        );
    }

    #[test]
    fn hidden_unknown_and_files() {
        let schema = schema();
        let obj = DataObject::with_id("User", "u1")
            .set_with("secret", "hunter2")
            .set_with("odd", Value::Array(vec![Value::Null]))
            .set_with(
                "avatar",
                Value::File(FileRef {
                    id: "f1".into(),
                    filename: "me.png".into(),
                    url: Some("memory://files/f1/me.png".into()),
                }),
            )
            .set_with("meta", Value::Array(vec![Value::Number(1.0)]));
        let r = CellRenderer::default();

        assert_eq!(r.render_cell(&obj, &column(&schema, "secret"), &schema).text, "(hidden)");
        assert_eq!(r.render_cell(&obj, &column(&schema, "odd"), &schema).tone, CellTone::Blank);
        assert_eq!(r.render_cell(&obj, &column(&schema, "meta"), &schema).text, "[1.0]");
        let file = r.render_cell(&obj, &column(&schema, "avatar"), &schema);
        assert_eq!(file.text, "me.png");
        assert_eq!(
            file.action,
            Some(CellAction::Download {
                url: "memory://files/f1/me.png".into()
            })
        );
    }

    #[test]
    fn header_shows_kind_and_sort() {
        let schema = schema();
        let sort = SortSpec::default();
        assert_eq!(render_header(&column(&schema, "_id"), &sort), "_id (string) ▲");
        assert_eq!(render_header(&column(&schema, "owner"), &sort), "owner (pointer)");
    }
}
