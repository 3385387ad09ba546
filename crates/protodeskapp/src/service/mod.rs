//! # Object Service
//!
//! The remote object database is reached through the [`ObjectService`] trait.
//! Everything the grid needs from it is here: the schema, queries, counts,
//! batch saves, filtered deletes and file uploads.
//!
//! Calls are `async` and the futures are not `Send`: the grid runs on a single
//! event loop and awaits one call at a time per operation.
//!
//! ## Implementations
//!
//! - [`memory::MemService`]: in-memory, with write error simulation for tests.
//! - [`fs::FileService`]: a JSON database file, used by the CLI.
//!
//! Both run queries through [`memory::Database`], which applies filters,
//! sorting and windows the way the remote service does, stamps system
//! columns on save and computes foreign-field relations on read.

use crate::error::Result;
use crate::object::DataObject;
use crate::query::Query;
use crate::schema::Schema;
use crate::value::FileRef;
use async_trait::async_trait;

pub mod fs;
pub mod memory;

#[async_trait(?Send)]
pub trait ObjectService {
    /// Class schemas by class name.
    async fn schema(&self) -> Result<Schema>;

    /// Objects matching the query, sorted and windowed.
    async fn find(&self, query: &Query) -> Result<Vec<DataObject>>;

    /// Number of objects matching the query's filters, ignoring the window.
    async fn count(&self, query: &Query) -> Result<usize>;

    /// Insert objects without an id and update the rest. Returns the saved
    /// objects, in input order, as the service now stores them.
    async fn save_all(&self, objects: Vec<DataObject>) -> Result<Vec<DataObject>>;

    /// Delete every object matching the query's filters. Returns how many.
    async fn delete_many(&self, query: &Query) -> Result<usize>;

    /// Store a file and return a reference to it.
    async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<FileRef>;
}
