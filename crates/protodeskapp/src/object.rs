//! Grid rows.
//!
//! A [`DataObject`] is one remote record: its class, its id once persisted,
//! and an ordered field map. Rows handed out by the grid are snapshots; every
//! edit works on a clone (or on a fresh object for new rows) and only reaches
//! the grid again after the service has saved it.

use crate::value::{ObjectRef, Record, Value};
use serde_json::Map;

pub const ID_FIELD: &str = "_id";

#[derive(Debug, Clone, PartialEq)]
pub struct DataObject {
    pub class_name: String,
    pub id: Option<String>,
    pub fields: Record,
}

impl DataObject {
    /// A new, unsaved object.
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            id: None,
            fields: Record::new(),
        }
    }

    pub fn with_id(class_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            id: Some(id.into()),
            fields: Record::new(),
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn object_ref(&self) -> Option<ObjectRef> {
        self.id
            .as_ref()
            .map(|id| ObjectRef::new(self.class_name.clone(), id.clone()))
    }

    /// Read a field by dotted path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    /// Like [`get`](Self::get) but reports missing fields as `Null`, and
    /// resolves `_id` to the object id.
    pub fn value(&self, path: &str) -> Value {
        if path == ID_FIELD {
            return self.id.clone().map(Value::String).unwrap_or(Value::Null);
        }
        self.get(path).cloned().unwrap_or(Value::Null)
    }

    /// Assign a field by dotted path, creating intermediate records.
    pub fn set(&mut self, path: &str, value: Value) {
        let mut parts: Vec<&str> = path.split('.').collect();
        let Some(last) = parts.pop() else {
            return;
        };
        let mut record = &mut self.fields;
        for part in parts {
            let slot = record
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Record::new()));
            if !matches!(slot, Value::Object(_)) {
                *slot = Value::Object(Record::new());
            }
            let Value::Object(inner) = slot else {
                return;
            };
            record = inner;
        }
        record.insert(last.to_string(), value);
    }

    pub fn set_with(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.set(path, value.into());
        self
    }

    /// Wire form: the field record with `_id` first.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = Map::new();
        if let Some(id) = &self.id {
            map.insert(ID_FIELD.to_string(), id.clone().into());
        }
        for (k, v) in &self.fields {
            map.insert(k.clone(), v.to_json());
        }
        serde_json::Value::Object(map)
    }

    /// Decode from wire form. Returns `None` if `json` is not a record.
    pub fn from_json(class_name: &str, json: &serde_json::Value) -> Option<Self> {
        let map = json.as_object()?;
        let mut object = DataObject::new(class_name);
        for (k, v) in map {
            if k == ID_FIELD {
                object.id = v.as_str().map(str::to_string);
            } else {
                object.fields.insert(k.clone(), Value::from_json(v));
            }
        }
        Some(object)
    }
}
