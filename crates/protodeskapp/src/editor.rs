//! # Cell Editor
//!
//! A [`CellEditor`] is the edit session of one cell:
//!
//! ```text
//! Viewing --activate--> Editing --commit--> Committed(value)
//!                          \------cancel--> Cancelled
//! ```
//!
//! Activation is refused for columns that cannot be edited in place
//! (relations, dates and unknown types); those stay in `Viewing`.
//!
//! While editing, the editor keeps two things apart: the text the user is
//! typing and the last value that text parsed to. Typing text that does not
//! parse never loses the previous value, and committing always yields the last
//! value that did parse. That is what lets a number field hold `"12."` or an
//! object editor hold half a literal without breaking the cell.
//!
//! ## Widgets
//!
//! | Field type                      | Widget                                  |
//! |---------------------------------|-----------------------------------------|
//! | boolean                         | toggle, flips in place                  |
//! | number / decimal                | numeric text field                      |
//! | string                          | multi-line text box                     |
//! | object / array / string[] / shape | code editor over the literal language |
//! | file                            | upload control                          |
//! | pointer                         | id field, empty means null              |
//! | relation / date / unknown       | read-only                               |

use crate::codec::encode_cell_text;
use crate::literal::{encode_literal, parse_literal, LiteralError};
use crate::schema::FieldType;
use crate::value::{format_number, FileRef, ObjectRef, Value};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Indent used to seed the code editor.
pub const LITERAL_INDENT: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Widget {
    Toggle,
    NumberField,
    DecimalField,
    TextArea,
    CodeEditor,
    Upload,
    PointerField { target: String },
    ReadOnly,
}

impl Widget {
    pub fn for_field(field_type: &FieldType) -> Widget {
        match field_type {
            FieldType::Boolean => Widget::Toggle,
            FieldType::Number => Widget::NumberField,
            FieldType::Decimal => Widget::DecimalField,
            FieldType::String => Widget::TextArea,
            FieldType::Object | FieldType::Array | FieldType::StringArray | FieldType::Shape(_) => {
                Widget::CodeEditor
            }
            FieldType::File => Widget::Upload,
            FieldType::Pointer { target } => Widget::PointerField {
                target: target.clone(),
            },
            FieldType::Relation { .. } | FieldType::Date | FieldType::Unknown(_) => Widget::ReadOnly,
        }
    }

    pub fn is_editable(&self) -> bool {
        !matches!(self, Widget::ReadOnly)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorState {
    Viewing,
    Editing,
    Committed(Value),
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct CellEditor {
    widget: Widget,
    original: Value,
    value: Value,
    text: String,
    state: EditorState,
    error: Option<LiteralError>,
}

impl CellEditor {
    pub fn new(value: Value, field_type: &FieldType) -> Self {
        Self {
            widget: Widget::for_field(field_type),
            original: value.clone(),
            value,
            text: String::new(),
            state: EditorState::Viewing,
            error: None,
        }
    }

    /// Lock the editor, for columns the service manages itself.
    pub fn read_only(mut self) -> Self {
        self.widget = Widget::ReadOnly;
        self
    }

    pub fn widget(&self) -> &Widget {
        &self.widget
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn is_editing(&self) -> bool {
        self.state == EditorState::Editing
    }

    /// The value a commit would produce right now.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The transient text buffer of text-based widgets.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Why the code editor's current text was rejected, if it was.
    pub fn error(&self) -> Option<&LiteralError> {
        self.error.as_ref()
    }

    pub fn is_changed(&self) -> bool {
        self.value != self.original
    }

    /// Enter editing. Returns `false` when the widget is read-only or the
    /// editor is not viewing.
    pub fn activate(&mut self) -> bool {
        if self.state != EditorState::Viewing || !self.widget.is_editable() {
            return false;
        }
        self.text = self.seed_text();
        self.state = EditorState::Editing;
        true
    }

    fn seed_text(&self) -> String {
        match (&self.widget, &self.original) {
            (_, Value::Null) => String::new(),
            (Widget::NumberField | Widget::DecimalField, v) => match v {
                Value::Number(n) => format_number(*n),
                other => encode_cell_text(other),
            },
            (Widget::CodeEditor, v) => encode_literal(v, LITERAL_INDENT),
            (Widget::PointerField { .. }, v) => v.object_id().unwrap_or_default().to_string(),
            (_, v) => encode_cell_text(v),
        }
    }

    /// Flip a toggle. No effect for other widgets.
    pub fn toggle(&mut self) {
        if !self.is_editing() {
            return;
        }
        if self.widget != Widget::Toggle {
            return;
        }
        self.value = Value::Bool(!self.is_checked());
    }

    /// What a toggle shows. A null value shows as off but stays null until
    /// the first flip.
    pub fn is_checked(&self) -> bool {
        self.value.as_bool().unwrap_or(false)
    }

    /// Replace the text buffer and re-parse it.
    pub fn input(&mut self, text: impl Into<String>) {
        if !self.is_editing() {
            return;
        }
        self.text = text.into();
        match &self.widget {
            Widget::NumberField => {
                if let Some(n) = self.text.trim().parse::<f64>().ok().filter(|n| n.is_finite()) {
                    self.value = Value::Number(n);
                }
            }
            Widget::DecimalField => {
                if let Ok(d) = Decimal::from_str(self.text.trim()) {
                    self.value = Value::Decimal(d);
                }
            }
            Widget::TextArea => self.value = Value::String(self.text.clone()),
            Widget::CodeEditor => match parse_literal(&self.text) {
                Ok(v) => {
                    self.value = v;
                    self.error = None;
                }
                Err(e) => self.error = Some(e),
            },
            Widget::PointerField { target } => {
                let id = self.text.trim();
                self.value = if id.is_empty() {
                    Value::Null
                } else {
                    Value::Pointer(ObjectRef::new(target.clone(), id))
                };
            }
            Widget::Toggle | Widget::Upload | Widget::ReadOnly => {}
        }
    }

    /// Use an uploaded file as the value.
    pub fn attach_file(&mut self, file: FileRef) {
        if self.is_editing() && self.widget == Widget::Upload {
            self.value = Value::File(file);
        }
    }

    /// Finish editing with the last valid value.
    pub fn commit(&mut self) -> Option<Value> {
        if !self.is_editing() {
            return None;
        }
        self.state = EditorState::Committed(self.value.clone());
        Some(self.value.clone())
    }

    pub fn cancel(&mut self) {
        if self.is_editing() {
            self.value = self.original.clone();
            self.state = EditorState::Cancelled;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Record;

    fn editing(value: Value, field_type: FieldType) -> CellEditor {
        let mut editor = CellEditor::new(value, &field_type);
        assert!(editor.activate());
        editor
    }

    #[test]
    fn toggle_flips_only_transient_state() {
        let mut editor = editing(Value::Bool(true), FieldType::Boolean);
        editor.toggle();
        assert_eq!(editor.value(), &Value::Bool(false));
        editor.toggle();
        assert_eq!(editor.value(), &Value::Bool(true));
        assert!(!editor.is_changed());
        editor.toggle();
        assert_eq!(editor.commit(), Some(Value::Bool(false)));
        assert_eq!(editor.state(), &EditorState::Committed(Value::Bool(false)));
    }

    #[test]
    fn null_toggle_starts_false() {
        let mut editor = editing(Value::Null, FieldType::Boolean);
        assert!(!editor.is_checked());
        editor.toggle();
        assert_eq!(editor.commit(), Some(Value::Bool(true)));
    }

    #[test]
    fn untouched_null_toggle_stays_null() {
        let mut editor = editing(Value::Null, FieldType::Boolean);
        assert_eq!(editor.value(), &Value::Null);
        assert!(!editor.is_changed());
        assert_eq!(editor.commit(), Some(Value::Null));
    }

    #[test]
    fn number_field_keeps_last_valid_value() {
        let mut editor = editing(Value::Number(42.0), FieldType::Number);
        assert_eq!(editor.text(), "42");
        editor.input("7");
        editor.input("7.");
        assert_eq!(editor.value(), &Value::Number(7.0));
        editor.input("abc");
        assert_eq!(editor.text(), "abc");
        assert_eq!(editor.commit(), Some(Value::Number(7.0)));
    }

    #[test]
    fn decimal_field() {
        let mut editor = editing(Value::Null, FieldType::Decimal);
        editor.input("1.10");
        assert_eq!(editor.commit(), Some(Value::Decimal(Decimal::new(110, 2))));
    }

    #[test]
    fn code_editor_accepts_literals_only() {
        let mut record = Record::new();
        record.insert("a".into(), Value::Number(1.0));
        let mut editor = editing(Value::Object(record.clone()), FieldType::Object);
        assert_eq!(editor.text(), "{\n  a: 1\n}");

        editor.input("{ a: alert(1) }");
        assert!(editor.error().is_some());
        assert_eq!(editor.value(), &Value::Object(record));

        editor.input("{ a: new Decimal('2.5') }");
        assert!(editor.error().is_none());
        let mut expected = Record::new();
        expected.insert("a".into(), Value::Decimal(Decimal::new(25, 1)));
        assert_eq!(editor.commit(), Some(Value::Object(expected)));
    }

    #[test]
    fn pointer_field_builds_reference() {
        let target = FieldType::Pointer {
            target: "User".into(),
        };
        let mut editor = editing(Value::Pointer(ObjectRef::new("User", "u1")), target.clone());
        assert_eq!(editor.text(), "u1");
        editor.input("u2");
        assert_eq!(editor.value(), &Value::Pointer(ObjectRef::new("User", "u2")));
        editor.input("  ");
        assert_eq!(editor.commit(), Some(Value::Null));
    }

    #[test]
    fn upload_becomes_value() {
        let mut editor = editing(Value::Null, FieldType::File);
        let file = FileRef {
            id: "f1".into(),
            filename: "a.txt".into(),
            url: None,
        };
        editor.attach_file(file.clone());
        assert_eq!(editor.commit(), Some(Value::File(file)));
    }

    #[test]
    fn relation_and_date_refuse_activation() {
        let relation = FieldType::Relation {
            target: "Post".into(),
            foreign_field: None,
        };
        for field_type in [relation, FieldType::Date] {
            let mut editor = CellEditor::new(Value::Null, &field_type);
            assert!(!editor.activate());
            assert_eq!(editor.state(), &EditorState::Viewing);
            assert_eq!(editor.commit(), None);
        }
    }

    #[test]
    fn cancel_restores_original() {
        let mut editor = editing(Value::from("a"), FieldType::String);
        editor.input("b");
        editor.cancel();
        assert_eq!(editor.state(), &EditorState::Cancelled);
        assert_eq!(editor.value(), &Value::from("a"));
        assert_eq!(editor.commit(), None);
    }
}
