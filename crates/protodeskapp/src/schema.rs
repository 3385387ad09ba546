//! # Schema and Type Classification
//!
//! The remote service describes each class as a map of field name to field
//! type descriptor. A descriptor is either a string shorthand (`"number"`) or a
//! structured record (`{"type": "pointer", "target": "User"}`).
//!
//! Descriptors are parsed once into the closed [`FieldType`] union, and
//! [`FieldType::kind`] maps every field type to exactly one [`Kind`]. Neither
//! step can fail: anything unrecognised becomes [`FieldType::Unknown`], which
//! classifies as [`Kind::Unknown`] and renders blank.
//!
//! ## Shapes
//!
//! A `shape` field is a nested record of named fields. For display the grid
//! flattens it into one column per leaf, keyed by the dotted path
//! (`address.city`); see [`ClassSchema::columns`].
//!
//! ## Read-only and hidden columns
//!
//! System columns (`_id`, `__v`, `_created_at`, `_updated_at`, `_expired_at`)
//! and relations declared through a foreign field are never written by the
//! grid. Columns listed in `secureFields` are hidden and render a placeholder.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use std::fmt;

/// Columns the grid never writes.
pub const READ_ONLY_COLUMNS: &[&str] = &["_id", "__v", "_created_at", "_updated_at", "_expired_at"];

/// Target class name that turns a pointer into a file field.
pub const FILE_CLASS: &str = "File";

/// Canonical semantic category of a field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Boolean,
    Number,
    Decimal,
    String,
    Date,
    Object,
    Array,
    Pointer,
    Relation,
    File,
    Shape,
    Unknown,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Boolean => "boolean",
            Kind::Number => "number",
            Kind::Decimal => "decimal",
            Kind::String => "string",
            Kind::Date => "date",
            Kind::Object => "object",
            Kind::Array => "array",
            Kind::Pointer => "pointer",
            Kind::Relation => "relation",
            Kind::File => "file",
            Kind::Shape => "shape",
            Kind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed field type descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Boolean,
    Number,
    Decimal,
    String,
    StringArray,
    Date,
    Object,
    Array,
    File,
    Pointer {
        target: String,
    },
    Relation {
        target: String,
        foreign_field: Option<String>,
    },
    Shape(IndexMap<String, FieldType>),
    /// A descriptor this client does not understand, kept verbatim.
    Unknown(serde_json::Value),
}

impl FieldType {
    /// Parse a raw descriptor. Total: unrecognised input becomes `Unknown`.
    pub fn from_descriptor(descriptor: &serde_json::Value) -> FieldType {
        match descriptor {
            serde_json::Value::String(name) => Self::from_name(name, descriptor, None),
            serde_json::Value::Object(map) => match map.get("type") {
                Some(serde_json::Value::String(name)) => {
                    Self::from_name(name, descriptor, Some(map))
                }
                _ => FieldType::Unknown(descriptor.clone()),
            },
            _ => FieldType::Unknown(descriptor.clone()),
        }
    }

    fn from_name(
        name: &str,
        descriptor: &serde_json::Value,
        map: Option<&serde_json::Map<String, serde_json::Value>>,
    ) -> FieldType {
        let attr = |key: &str| {
            map.and_then(|m| m.get(key))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };
        match name {
            "boolean" => FieldType::Boolean,
            "number" => FieldType::Number,
            "decimal" => FieldType::Decimal,
            "string" => FieldType::String,
            "string[]" => FieldType::StringArray,
            "date" => FieldType::Date,
            "object" => FieldType::Object,
            "array" => FieldType::Array,
            "file" => FieldType::File,
            "pointer" => match attr("target") {
                Some(target) if target == FILE_CLASS => FieldType::File,
                Some(target) => FieldType::Pointer { target },
                None => FieldType::Unknown(descriptor.clone()),
            },
            "relation" => match attr("target") {
                Some(target) => FieldType::Relation {
                    target,
                    foreign_field: attr("foreignField"),
                },
                None => FieldType::Unknown(descriptor.clone()),
            },
            "shape" => match map.and_then(|m| m.get("shape")) {
                Some(serde_json::Value::Object(fields)) => FieldType::Shape(
                    fields
                        .iter()
                        .map(|(k, v)| (k.clone(), FieldType::from_descriptor(v)))
                        .collect(),
                ),
                _ => FieldType::Unknown(descriptor.clone()),
            },
            _ => FieldType::Unknown(descriptor.clone()),
        }
    }

    /// Classify into the closed kind set.
    pub fn kind(&self) -> Kind {
        match self {
            FieldType::Boolean => Kind::Boolean,
            FieldType::Number => Kind::Number,
            FieldType::Decimal => Kind::Decimal,
            FieldType::String => Kind::String,
            FieldType::StringArray | FieldType::Array => Kind::Array,
            FieldType::Date => Kind::Date,
            FieldType::Object => Kind::Object,
            FieldType::File => Kind::File,
            FieldType::Pointer { .. } => Kind::Pointer,
            FieldType::Relation { .. } => Kind::Relation,
            FieldType::Shape(_) => Kind::Shape,
            FieldType::Unknown(_) => Kind::Unknown,
        }
    }

    /// Target class of a pointer, relation or file field.
    pub fn target(&self) -> Option<&str> {
        match self {
            FieldType::Pointer { target } | FieldType::Relation { target, .. } => Some(target),
            FieldType::File => Some(FILE_CLASS),
            _ => None,
        }
    }

    /// Label used in column headers: `string[]` keeps its shorthand.
    pub fn label(&self) -> &'static str {
        match self {
            FieldType::StringArray => "string[]",
            other => other.kind().as_str(),
        }
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(FieldType::from_descriptor(&raw))
    }
}

/// Classify a raw descriptor directly.
pub fn classify(descriptor: &serde_json::Value) -> Kind {
    FieldType::from_descriptor(descriptor).kind()
}

/// A displayed grid column: a dotted key into the row and its field type.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub key: String,
    pub field_type: FieldType,
}

impl Column {
    pub fn kind(&self) -> Kind {
        self.field_type.kind()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ClassSchema {
    #[serde(default)]
    pub fields: IndexMap<String, FieldType>,
    #[serde(default, rename = "secureFields")]
    pub secure_fields: Vec<String>,
}

impl ClassSchema {
    /// Flattened display columns in declaration order.
    pub fn columns(&self) -> Vec<Column> {
        let mut columns = Vec::new();
        flatten_into(&mut columns, None, &self.fields);
        columns
    }

    /// Field type for a (possibly dotted) column key.
    pub fn field_type(&self, key: &str) -> Option<&FieldType> {
        let mut parts = key.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            match current {
                FieldType::Shape(fields) => current = fields.get(part)?,
                _ => return None,
            }
        }
        Some(current)
    }

    pub fn is_read_only(&self, key: &str) -> bool {
        READ_ONLY_COLUMNS.contains(&key)
            || matches!(
                self.field_type(key),
                Some(FieldType::Relation {
                    foreign_field: Some(_),
                    ..
                })
            )
    }

    pub fn is_hidden(&self, key: &str) -> bool {
        self.secure_fields.iter().any(|f| f == key)
    }

    /// Fields whose referenced object ids should be fetched with each row.
    pub fn reference_includes(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(_, t)| matches!(t.kind(), Kind::Pointer | Kind::Relation | Kind::File))
            .map(|(k, _)| format!("{}._id", k))
            .collect()
    }
}

fn flatten_into(out: &mut Vec<Column>, prefix: Option<&str>, fields: &IndexMap<String, FieldType>) {
    for (name, field_type) in fields {
        let key = match prefix {
            Some(p) => format!("{}.{}", p, name),
            None => name.clone(),
        };
        match field_type {
            FieldType::Shape(inner) if !inner.is_empty() => flatten_into(out, Some(&key), inner),
            _ => out.push(Column {
                key,
                field_type: field_type.clone(),
            }),
        }
    }
}

/// The whole database schema: class name to class schema.
pub type Schema = IndexMap<String, ClassSchema>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shorthand_and_structured_descriptors_agree() {
        assert_eq!(classify(&json!("number")), Kind::Number);
        assert_eq!(classify(&json!({ "type": "number" })), Kind::Number);
        assert_eq!(classify(&json!("string[]")), Kind::Array);
        assert_eq!(classify(&json!({ "type": "decimal", "default": 0 })), Kind::Decimal);
    }

    #[test]
    fn classification_is_total() {
        let odd = [
            json!(null),
            json!(42),
            json!([]),
            json!({}),
            json!({ "type": 7 }),
            json!("mystery"),
            json!({ "type": "pointer" }),
            json!({ "type": "shape", "shape": "nope" }),
        ];
        for descriptor in odd {
            assert_eq!(classify(&descriptor), Kind::Unknown, "{}", descriptor);
        }
    }

    #[test]
    fn file_pointer_is_a_file() {
        assert_eq!(classify(&json!({ "type": "pointer", "target": "File" })), Kind::File);
        assert_eq!(classify(&json!("file")), Kind::File);
        assert_eq!(classify(&json!({ "type": "pointer", "target": "User" })), Kind::Pointer);
    }

    #[test]
    fn relation_keeps_foreign_field() {
        let t = FieldType::from_descriptor(
            &json!({ "type": "relation", "target": "Post", "foreignField": "author" }),
        );
        assert_eq!(
            t,
            FieldType::Relation {
                target: "Post".into(),
                foreign_field: Some("author".into())
            }
        );
        assert_eq!(t.target(), Some("Post"));
    }

    #[test]
    fn shapes_flatten_to_dotted_columns() {
        let schema: ClassSchema = serde_json::from_value(json!({
            "fields": {
                "_id": "string",
                "address": {
                    "type": "shape",
                    "shape": {
                        "city": "string",
                        "geo": { "type": "shape", "shape": { "lat": "number" } }
                    }
                },
                "age": "number"
            }
        }))
        .unwrap();
        let keys: Vec<_> = schema.columns().into_iter().map(|c| c.key).collect();
        assert_eq!(keys, vec!["_id", "address.city", "address.geo.lat", "age"]);
        assert_eq!(schema.field_type("address.geo.lat"), Some(&FieldType::Number));
        assert_eq!(schema.field_type("age.nope"), None);
    }

    #[test]
    fn read_only_and_hidden_columns() {
        let schema: ClassSchema = serde_json::from_value(json!({
            "fields": {
                "_id": "string",
                "posts": { "type": "relation", "target": "Post", "foreignField": "author" },
                "tags": { "type": "relation", "target": "Tag" },
                "password": "string"
            },
            "secureFields": ["password"]
        }))
        .unwrap();
        assert!(schema.is_read_only("_id"));
        assert!(schema.is_read_only("posts"));
        assert!(!schema.is_read_only("tags"));
        assert!(schema.is_hidden("password"));
        assert_eq!(schema.reference_includes(), vec!["posts._id", "tags._id"]);
    }
}
