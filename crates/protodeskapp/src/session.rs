//! # Session Settings
//!
//! Per-session settings live in one serialized blob behind a [`SessionStore`]:
//! column widths per class, and the credentials of the signed-in user.
//!
//! The blob is a wire JSON record (see [`crate::value`]):
//!
//! ```json
//! {
//!   "column-widths": { "User": { "name": 180, "email": 240 } },
//!   "user": "admin",
//!   "pass": "secret"
//! }
//! ```
//!
//! [`Session`] is loaded from a store, changed in memory and saved back
//! explicitly. Updates merge into the existing entries; an update that sets a
//! key to null removes it. Credentials only count when both `user` and `pass`
//! are present.

use crate::error::Result;
use crate::service::fs::write_atomic;
use crate::value::{Record, Value};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

pub const COLUMN_WIDTHS_KEY: &str = "column-widths";
pub const USER_KEY: &str = "user";
pub const PASS_KEY: &str = "pass";

/// Where the session blob is kept.
pub trait SessionStore {
    /// The stored blob, or `None` if nothing has been saved.
    fn read(&self) -> Result<Option<String>>;

    fn write(&self, blob: &str) -> Result<()>;
}

/// Session store held in memory, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemSessionStore {
    blob: RefCell<Option<String>>,
}

impl MemSessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemSessionStore {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.blob.borrow().clone())
    }

    fn write(&self, blob: &str) -> Result<()> {
        *self.blob.borrow_mut() = Some(blob.to_string());
        Ok(())
    }
}

/// Session store backed by a single file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn read(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&self.path)?))
    }

    fn write(&self, blob: &str) -> Result<()> {
        write_atomic(&self.path, blob)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub pass: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    entries: Record,
}

impl Session {
    /// Read the session from a store. A blob that does not decode to a record
    /// is discarded and an empty session returned.
    pub fn load<S: SessionStore + ?Sized>(store: &S) -> Result<Session> {
        let Some(blob) = store.read()? else {
            return Ok(Session::default());
        };
        match serde_json::from_str::<Value>(&blob) {
            Ok(Value::Object(entries)) => Ok(Session { entries }),
            _ => {
                tracing::warn!("Discarding unreadable session blob");
                Ok(Session::default())
            }
        }
    }

    pub fn save<S: SessionStore + ?Sized>(&self, store: &S) -> Result<()> {
        let blob = serde_json::to_string(&Value::Object(self.entries.clone()))?;
        store.write(&blob)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn entries(&self) -> &Record {
        &self.entries
    }

    /// Merge `changes` into the session. Null values remove their key.
    pub fn update(&mut self, changes: Record) {
        for (key, value) in changes {
            if value.is_null() {
                self.entries.shift_remove(&key);
            } else {
                self.entries.insert(key, value);
            }
        }
    }

    /// Saved column widths of a class.
    pub fn column_widths(&self, class_name: &str) -> IndexMap<String, f64> {
        self.entries
            .get(COLUMN_WIDTHS_KEY)
            .and_then(Value::as_object)
            .and_then(|classes| classes.get(class_name))
            .and_then(Value::as_object)
            .map(|columns| {
                columns
                    .iter()
                    .filter_map(|(k, v)| Some((k.clone(), v.as_f64()?)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set_column_width(&mut self, class_name: &str, column: &str, width: f64) {
        let mut classes = self
            .entries
            .get(COLUMN_WIDTHS_KEY)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let mut columns = classes
            .get(class_name)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        columns.insert(column.to_string(), Value::Number(width));
        classes.insert(class_name.to_string(), Value::Object(columns));
        let mut changes = Record::new();
        changes.insert(COLUMN_WIDTHS_KEY.to_string(), Value::Object(classes));
        self.update(changes);
    }

    pub fn credentials(&self) -> Option<Credentials> {
        let user = self.get(USER_KEY)?.as_str()?;
        let pass = self.get(PASS_KEY)?.as_str()?;
        if user.is_empty() || pass.is_empty() {
            return None;
        }
        Some(Credentials {
            user: user.to_string(),
            pass: pass.to_string(),
        })
    }

    /// Store or clear the credentials.
    pub fn set_credentials(&mut self, credentials: Option<Credentials>) {
        let (user, pass) = match credentials {
            Some(c) => (Value::String(c.user), Value::String(c.pass)),
            None => (Value::Null, Value::Null),
        };
        let mut changes = Record::new();
        changes.insert(USER_KEY.to_string(), user);
        changes.insert(PASS_KEY.to_string(), pass);
        self.update(changes);
    }
}
