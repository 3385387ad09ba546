//! JSON file object service.
//!
//! The whole database lives in one pretty-printed JSON document (see
//! [`Database::to_json`]). Each call reads the file, runs against the
//! [`Database`] engine and, for mutations, writes the document back through a
//! temporary file and a rename, so a crash never leaves a half-written file.
//!
//! Uploaded files are stored beside the database in `<stem>.files/`, and their
//! URL is a `file://` URL of the stored copy.
//!
//! ```text
//! shop.json            # schema + objects
//! shop.files/
//! └── <id>-<filename>  # uploads
//! ```

use super::memory::{new_object_id, Database};
use super::ObjectService;
use crate::error::{DeskError, Result};
use crate::object::DataObject;
use crate::query::Query;
use crate::schema::Schema;
use crate::value::FileRef;
use async_trait::async_trait;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub struct FileService {
    path: PathBuf,
}

impl FileService {
    /// Open an existing database file.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(DeskError::Service(format!(
                "Database not found: {}",
                path.display()
            )));
        }
        Ok(Self { path })
    }

    /// Create a database file from a schema document, replacing any existing
    /// file at `path`.
    pub fn create(path: impl Into<PathBuf>, schema: serde_json::Value) -> Result<Self> {
        let service = Self { path: path.into() };
        service.store(&Database::with_schema(schema)?)?;
        Ok(service)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn files_dir(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("protodesk");
        self.path.with_file_name(format!("{}.files", stem))
    }

    pub fn load(&self) -> Result<Database> {
        let content = fs::read_to_string(&self.path)?;
        let json: serde_json::Value = serde_json::from_str(&content)?;
        Database::from_json(&json)
    }

    pub fn store(&self, db: &Database) -> Result<()> {
        let content = serde_json::to_string_pretty(&db.to_json())?;
        write_atomic(&self.path, &content)
    }

    /// Load, apply `f`, and store only if it succeeded.
    fn mutate<T>(&self, f: impl FnOnce(&mut Database) -> Result<T>) -> Result<T> {
        let mut db = self.load()?;
        let out = f(&mut db)?;
        self.store(&db)?;
        Ok(out)
    }
}

#[async_trait(?Send)]
impl ObjectService for FileService {
    async fn schema(&self) -> Result<Schema> {
        self.load()?.schema()
    }

    async fn find(&self, query: &Query) -> Result<Vec<DataObject>> {
        self.load()?.find(query)
    }

    async fn count(&self, query: &Query) -> Result<usize> {
        self.load()?.count(query)
    }

    async fn save_all(&self, objects: Vec<DataObject>) -> Result<Vec<DataObject>> {
        self.mutate(|db| db.save_all(objects, Utc::now()))
    }

    async fn delete_many(&self, query: &Query) -> Result<usize> {
        self.mutate(|db| db.delete_many(query))
    }

    async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<FileRef> {
        let dir = self.files_dir();
        fs::create_dir_all(&dir)?;
        let id = new_object_id();
        let name = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload");
        let target = dir.join(format!("{}-{}", id, name));
        fs::write(&target, bytes)?;
        let absolute = fs::canonicalize(&target)?;
        Ok(FileRef {
            id,
            filename: name.to_string(),
            url: Some(format!("file://{}", absolute.display())),
        })
    }
}

/// Write `content` to `path` through a temporary file in the same directory.
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
    }
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("data");
    let tmp = dir.join(format!(".{}-{}.tmp", name, Uuid::new_v4()));
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
