//! # Overlay
//!
//! The grid never mutates the rows it fetched. Saved edits are recorded in an
//! [`Overlay`] over the fetched base snapshot:
//!
//! - `updated`: saved objects by id, replacing the base row with that id,
//! - `inserted`: saved objects that were created locally, shown after the base,
//! - `deleted`: ids removed since the fetch.
//!
//! [`Overlay::materialize`] is the only place the three are combined, so the
//! row at any index always shows the latest saved version of that object.
//! A new fetch replaces the base and clears everything else.

use crate::object::DataObject;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct Overlay {
    base: Vec<DataObject>,
    inserted: Vec<DataObject>,
    updated: HashMap<String, DataObject>,
    deleted: HashSet<String>,
}

impl Overlay {
    pub fn new(base: Vec<DataObject>) -> Self {
        Self {
            base,
            ..Default::default()
        }
    }

    /// Replace the base snapshot and drop every local record.
    pub fn reset(&mut self, base: Vec<DataObject>) {
        *self = Self::new(base);
    }

    /// Visible rows: base rows with updates applied, then inserted rows,
    /// without deleted ids.
    pub fn materialize(&self) -> Vec<&DataObject> {
        self.base
            .iter()
            .chain(self.inserted.iter())
            .filter(|obj| !self.is_deleted(obj))
            .map(|obj| match &obj.id {
                Some(id) => self.updated.get(id).unwrap_or(obj),
                None => obj,
            })
            .collect()
    }

    /// Record objects returned by a save. Objects without an id are ignored.
    pub fn fold_saved<I: IntoIterator<Item = DataObject>>(&mut self, saved: I) {
        for obj in saved {
            let Some(id) = obj.id.clone() else {
                continue;
            };
            if self.contains(&id) {
                self.updated.insert(id, obj);
            } else {
                self.inserted.push(obj);
            }
        }
    }

    pub fn mark_deleted<I, T>(&mut self, ids: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.deleted.extend(ids.into_iter().map(Into::into));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.base
            .iter()
            .chain(self.inserted.iter())
            .any(|obj| obj.id.as_deref() == Some(id))
    }

    pub fn is_dirty(&self) -> bool {
        !(self.inserted.is_empty() && self.updated.is_empty() && self.deleted.is_empty())
    }

    pub fn inserted_count(&self) -> usize {
        self.inserted.len()
    }

    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }

    fn is_deleted(&self, obj: &DataObject) -> bool {
        obj.id.as_ref().is_some_and(|id| self.deleted.contains(id))
    }
}
