//! Busy indicator.
//!
//! Long service calls hold an [`ActivityGuard`] for their duration. The guard
//! increments a shared counter when created and decrements it when dropped,
//! so the count falls back on success, on error and on early return alike.
//! A front end shows a spinner while [`Activity::is_busy`] is true.

use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Clone, Default)]
pub struct Activity {
    count: Rc<Cell<usize>>,
}

impl Activity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, label: &'static str) -> ActivityGuard {
        self.count.set(self.count.get() + 1);
        tracing::debug!(activity = label, active = self.count.get(), "Activity started");
        ActivityGuard {
            count: Rc::clone(&self.count),
            label,
        }
    }

    pub fn active(&self) -> usize {
        self.count.get()
    }

    pub fn is_busy(&self) -> bool {
        self.active() > 0
    }
}

#[must_use = "the activity ends when the guard is dropped"]
pub struct ActivityGuard {
    count: Rc<Cell<usize>>,
    label: &'static str,
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        self.count.set(self.count.get().saturating_sub(1));
        tracing::debug!(activity = self.label, active = self.count.get(), "Activity finished");
    }
}
