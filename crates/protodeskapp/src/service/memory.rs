use super::ObjectService;
use crate::error::{DeskError, Result};
use crate::object::DataObject;
use crate::query::Query;
use crate::schema::{ClassSchema, FieldType, Schema, READ_ONLY_COLUMNS};
use crate::value::{FileRef, Value};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::{json, Map};
use std::cell::{Cell, RefCell};
use uuid::Uuid;

pub const CREATED_AT: &str = "_created_at";
pub const UPDATED_AT: &str = "_updated_at";

/// Objects by class and id, plus the raw schema document.
///
/// This is the query engine shared by the in-memory and file services. It
/// keeps insertion order, so unsorted queries are stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Database {
    schema: Map<String, serde_json::Value>,
    objects: IndexMap<String, IndexMap<String, DataObject>>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a schema document: `{ "<Class>": { "fields": {...} } }`.
    pub fn with_schema(schema: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(schema) = schema else {
            return Err(DeskError::Service("Schema must be a JSON object".to_string()));
        };
        Ok(Self {
            schema,
            objects: IndexMap::new(),
        })
    }

    pub fn schema(&self) -> Result<Schema> {
        Ok(serde_json::from_value(serde_json::Value::Object(
            self.schema.clone(),
        ))?)
    }

    fn class_schema(&self, class_name: &str) -> Result<ClassSchema> {
        let raw = self
            .schema
            .get(class_name)
            .ok_or_else(|| DeskError::ClassNotFound(class_name.to_string()))?;
        Ok(serde_json::from_value(raw.clone())?)
    }

    /// Store an object as given, without stamping. Used to seed data.
    pub fn insert(&mut self, object: DataObject) -> Result<()> {
        let id = object
            .id
            .clone()
            .ok_or_else(|| DeskError::Service("Seeded objects need an id".to_string()))?;
        self.objects
            .entry(object.class_name.clone())
            .or_default()
            .insert(id, object);
        Ok(())
    }

    pub fn find(&self, query: &Query) -> Result<Vec<DataObject>> {
        let mut rows = self.matching(query)?;
        if !query.sort.is_empty() {
            rows.sort_by(|a, b| query.sort.compare(a, b));
        }
        Ok(rows
            .into_iter()
            .skip(query.skip)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect())
    }

    pub fn count(&self, query: &Query) -> Result<usize> {
        Ok(self.matching(query)?.len())
    }

    fn matching(&self, query: &Query) -> Result<Vec<DataObject>> {
        let schema = self.class_schema(&query.class_name)?;
        let Some(objects) = self.objects.get(&query.class_name) else {
            return Ok(Vec::new());
        };
        Ok(objects
            .values()
            .map(|obj| self.with_relations(obj.clone(), &schema))
            .filter(|obj| query.matches(obj))
            .collect())
    }

    /// Fill foreign-field relations: every object of the target class whose
    /// foreign field points back at `obj`.
    fn with_relations(&self, mut obj: DataObject, schema: &ClassSchema) -> DataObject {
        let Some(owner) = obj.object_ref() else {
            return obj;
        };
        for (name, field_type) in &schema.fields {
            let FieldType::Relation {
                target,
                foreign_field: Some(foreign_field),
            } = field_type
            else {
                continue;
            };
            let related = self
                .objects
                .get(target)
                .map(|targets| {
                    targets
                        .values()
                        .filter(|t| t.get(foreign_field).and_then(Value::as_pointer) == Some(&owner))
                        .filter_map(|t| t.object_ref().map(Value::Pointer))
                        .collect()
                })
                .unwrap_or_default();
            obj.fields.insert(name.clone(), Value::Array(related));
        }
        obj
    }

    /// Insert or update. Validates the whole batch before writing anything.
    pub fn save_all(&mut self, objects: Vec<DataObject>, now: DateTime<Utc>) -> Result<Vec<DataObject>> {
        let mut schemas = IndexMap::new();
        for obj in &objects {
            if !schemas.contains_key(&obj.class_name) {
                schemas.insert(obj.class_name.clone(), self.class_schema(&obj.class_name)?);
            }
            if let Some(id) = &obj.id {
                let exists = self
                    .objects
                    .get(&obj.class_name)
                    .is_some_and(|objs| objs.contains_key(id));
                if !exists {
                    return Err(DeskError::ObjectNotFound {
                        class_name: obj.class_name.clone(),
                        id: id.clone(),
                    });
                }
            }
        }

        let mut saved = Vec::with_capacity(objects.len());
        for obj in objects {
            let Some(schema) = schemas.get(&obj.class_name) else {
                continue;
            };
            let class = self.objects.entry(obj.class_name.clone()).or_default();
            let mut stored = match &obj.id {
                Some(id) => class
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| DataObject::with_id(obj.class_name.clone(), id.clone())),
                None => {
                    let mut fresh = DataObject::with_id(obj.class_name.clone(), new_object_id());
                    fresh.set(CREATED_AT, Value::Date(now));
                    fresh
                }
            };
            for (key, value) in obj.fields {
                if READ_ONLY_COLUMNS.contains(&key.as_str()) || schema.is_read_only(&key) {
                    continue;
                }
                stored.fields.insert(key, value);
            }
            stored.set(UPDATED_AT, Value::Date(now));
            if let Some(id) = stored.id.clone() {
                class.insert(id, stored.clone());
            }
            saved.push(stored);
        }
        Ok(saved
            .into_iter()
            .map(|obj| match schemas.get(&obj.class_name) {
                Some(schema) => self.with_relations(obj, schema),
                None => obj,
            })
            .collect())
    }

    pub fn delete_many(&mut self, query: &Query) -> Result<usize> {
        let ids: Vec<String> = self
            .matching(query)?
            .into_iter()
            .filter_map(|obj| obj.id)
            .collect();
        if let Some(objects) = self.objects.get_mut(&query.class_name) {
            for id in &ids {
                objects.shift_remove(id);
            }
        }
        Ok(ids.len())
    }

    /// Document form: `{"schema": {...}, "objects": {"<Class>": [...]}}`.
    pub fn to_json(&self) -> serde_json::Value {
        let objects: Map<String, serde_json::Value> = self
            .objects
            .iter()
            .map(|(class, objs)| {
                (
                    class.clone(),
                    serde_json::Value::Array(objs.values().map(DataObject::to_json).collect()),
                )
            })
            .collect();
        json!({
            "schema": self.schema,
            "objects": objects,
        })
    }

    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        let mut db = Database::with_schema(json.get("schema").cloned().unwrap_or_else(|| json!({})))?;
        if let Some(classes) = json.get("objects").and_then(|o| o.as_object()) {
            for (class_name, objs) in classes {
                for raw in objs.as_array().map(Vec::as_slice).unwrap_or_default() {
                    let obj = DataObject::from_json(class_name, raw).ok_or_else(|| {
                        DeskError::Service(format!("Malformed object in class {}", class_name))
                    })?;
                    db.insert(obj)?;
                }
            }
        }
        Ok(db)
    }
}

pub(crate) fn new_object_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// In-memory object service for tests and embedding.
///
/// Uses `RefCell` for interior mutability; the service trait takes `&self`
/// and everything runs on one thread.
#[derive(Debug, Default)]
pub struct MemService {
    db: RefCell<Database>,
    files: RefCell<IndexMap<String, Vec<u8>>>,
    simulate_write_error: RefCell<bool>,
    simulate_read_error: RefCell<bool>,
    mutation_calls: Cell<usize>,
}

impl MemService {
    pub fn new(db: Database) -> Self {
        Self {
            db: RefCell::new(db),
            ..Default::default()
        }
    }

    /// Make every save, delete and upload fail.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        *self.simulate_write_error.borrow_mut() = simulate;
    }

    /// Make every schema, find and count call fail.
    pub fn set_simulate_read_error(&self, simulate: bool) {
        *self.simulate_read_error.borrow_mut() = simulate;
    }

    /// How many save, delete and upload calls reached the service.
    pub fn mutation_calls(&self) -> usize {
        self.mutation_calls.get()
    }

    /// Snapshot of a stored object, bypassing queries.
    pub fn get(&self, class_name: &str, id: &str) -> Option<DataObject> {
        self.db
            .borrow()
            .find(&Query::new(class_name))
            .ok()?
            .into_iter()
            .find(|obj| obj.id.as_deref() == Some(id))
    }

    pub fn file_bytes(&self, id: &str) -> Option<Vec<u8>> {
        self.files.borrow().get(id).cloned()
    }

    fn check_read(&self) -> Result<()> {
        if *self.simulate_read_error.borrow() {
            return Err(DeskError::Service("Simulated read error".to_string()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<()> {
        self.mutation_calls.set(self.mutation_calls.get() + 1);
        if *self.simulate_write_error.borrow() {
            return Err(DeskError::Service("Simulated write error".to_string()));
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl ObjectService for MemService {
    async fn schema(&self) -> Result<Schema> {
        self.check_read()?;
        self.db.borrow().schema()
    }

    async fn find(&self, query: &Query) -> Result<Vec<DataObject>> {
        self.check_read()?;
        self.db.borrow().find(query)
    }

    async fn count(&self, query: &Query) -> Result<usize> {
        self.check_read()?;
        self.db.borrow().count(query)
    }

    async fn save_all(&self, objects: Vec<DataObject>) -> Result<Vec<DataObject>> {
        self.check_write()?;
        self.db.borrow_mut().save_all(objects, Utc::now())
    }

    async fn delete_many(&self, query: &Query) -> Result<usize> {
        self.check_write()?;
        self.db.borrow_mut().delete_many(query)
    }

    async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<FileRef> {
        self.check_write()?;
        let id = new_object_id();
        self.files.borrow_mut().insert(id.clone(), bytes);
        Ok(FileRef {
            url: Some(format!("memory://files/{}/{}", id, filename)),
            id,
            filename: filename.to_string(),
        })
    }
}

/// A small shop of users, posts and tags covering every field kind.
#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures {
    use super::*;
    use crate::value::ObjectRef;
    use rust_decimal::Decimal;

    pub fn schema_json() -> serde_json::Value {
        json!({
            "User": {
                "fields": {
                    "_id": "string",
                    "name": "string",
                    "age": "number",
                    "active": "boolean",
                    "balance": "decimal",
                    "joined": "date",
                    "address": { "type": "shape", "shape": { "city": "string", "zip": "string" } },
                    "meta": "object",
                    "nicknames": "string[]",
                    "avatar": { "type": "pointer", "target": "File" },
                    "manager": { "type": "pointer", "target": "User" },
                    "tags": { "type": "relation", "target": "Tag" },
                    "posts": { "type": "relation", "target": "Post", "foreignField": "author" },
                    "password": "string",
                    "_created_at": "date",
                    "_updated_at": "date"
                },
                "secureFields": ["password"]
            },
            "Post": {
                "fields": {
                    "_id": "string",
                    "title": "string",
                    "author": { "type": "pointer", "target": "User" }
                }
            },
            "Tag": {
                "fields": {
                    "_id": "string",
                    "name": "string"
                }
            }
        })
    }

    pub fn database() -> Database {
        let mut db = Database::with_schema(schema_json()).expect("fixture schema parses");
        let users = [
            ("u1", "Ada", 36.0, true),
            ("u2", "Grace", 45.0, false),
            ("u3", "Linus", 28.0, true),
        ];
        for (i, (id, name, age, active)) in users.into_iter().enumerate() {
            let user = DataObject::with_id("User", id)
                .set_with("name", name)
                .set_with("age", age)
                .set_with("active", active)
                .set_with("balance", Decimal::new(1000 * (i as i64 + 1), 2))
                .set_with("address.city", "Lisbon")
                .set_with("password", "secret")
                .set_with("tags", Value::Array(vec![]));
            db.insert(user).expect("fixture user inserts");
        }
        for (id, name) in [("t1", "admin"), ("t2", "staff")] {
            db.insert(DataObject::with_id("Tag", id).set_with("name", name))
                .expect("fixture tag inserts");
        }
        for (id, title, author) in [("p1", "Hello", "u1"), ("p2", "Again", "u1"), ("p3", "Hi", "u2")] {
            let post = DataObject::with_id("Post", id)
                .set_with("title", title)
                .set_with("author", ObjectRef::new("User", author));
            db.insert(post).expect("fixture post inserts");
        }
        db
    }

    pub fn service() -> MemService {
        MemService::new(database())
    }
}
