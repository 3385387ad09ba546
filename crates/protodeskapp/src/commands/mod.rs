//! # Command Layer
//!
//! This module contains the **core grid logic**. Each command lives in its own
//! submodule as free `async` functions over a [`GridState`](crate::grid::GridState)
//! and an [`ObjectService`](crate::service::ObjectService).
//!
//! ## Role and Responsibilities
//!
//! Commands are where the reconciliation happens:
//! - Resolve rows and columns against the open grid
//! - Decode clipboard payloads into typed cell values
//! - Batch the resulting objects into one service call
//! - Fold saved objects back into the grid's overlay
//! - Return a structured [`CmdResult`]
//!
//! ## What Commands Do NOT Do
//!
//! - **Any I/O of their own**: no stdout, stderr or terminal concerns
//! - **Prompts**: destructive commands return
//!   [`DeskError::ConfirmationRequired`](crate::error::DeskError::ConfirmationRequired)
//!   and the UI decides how to ask
//! - **Retries**: a failed service call is logged and returned; grid state
//!   is left as it was before the command
//!
//! ## Command Modules
//!
//! - [`fetch`]: Open a class and load the current page
//! - [`set_cell`]: Commit one cell value, or an uploaded file
//! - [`paste`]: Paste a clipboard payload onto rows or a cell block
//! - [`copy`]: Encode rows or a cell block for the clipboard
//! - [`delete`]: Delete rows or clear a cell block
//! - [`relation`]: Add related objects to a relation cell

use crate::activity::Activity;
use crate::codec::ClipboardPayload;
use crate::error::{DeskError, Result};
use crate::object::DataObject;
use crate::service::ObjectService;
use serde::Serialize;

pub mod copy;
pub mod delete;
pub mod fetch;
pub mod paste;
pub mod relation;
pub mod set_cell;

/// Bulk deletes touching more than this many rows or cells need a typed
/// confirmation.
pub const CONFIRM_THRESHOLD: usize = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CmdResult {
    /// Objects as the service stored them.
    pub saved: Vec<DataObject>,
    /// Ids removed by a delete.
    pub deleted: Vec<String>,
    /// Cells left alone because their text did not decode.
    pub skipped: usize,
    /// Payload produced by a copy.
    pub clipboard: Option<ClipboardPayload>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_saved(mut self, saved: Vec<DataObject>) -> Self {
        self.saved = saved;
        self
    }

    pub fn with_clipboard(mut self, payload: ClipboardPayload) -> Self {
        self.clipboard = Some(payload);
        self
    }
}

/// Check a destructive operation against the confirmation rule.
pub fn confirm(class_name: &str, count: usize, confirmation: Option<&str>) -> Result<()> {
    if count <= CONFIRM_THRESHOLD {
        return Ok(());
    }
    match confirmation {
        None => Err(DeskError::ConfirmationRequired {
            class_name: class_name.to_string(),
            count,
        }),
        Some(given) if given.trim() == class_name => Ok(()),
        Some(given) => Err(DeskError::ConfirmationMismatch {
            class_name: class_name.to_string(),
            given: given.to_string(),
        }),
    }
}

/// Save a batch under an activity scope. Failures are logged before they are
/// returned.
pub(crate) async fn save_batch<S: ObjectService + ?Sized>(
    service: &S,
    activity: &Activity,
    objects: Vec<DataObject>,
) -> Result<Vec<DataObject>> {
    let _busy = activity.begin("save");
    tracing::debug!(count = objects.len(), "Saving objects");
    service.save_all(objects).await.map_err(|e| {
        tracing::error!(error = %e, "Save failed");
        e
    })
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_operations_need_no_confirmation() {
        assert!(confirm("User", 3, None).is_ok());
        assert!(confirm("User", 0, Some("whatever")).is_ok());
    }

    #[test]
    fn large_operations_need_the_class_name() {
        assert!(matches!(
            confirm("User", 4, None),
            Err(DeskError::ConfirmationRequired { count: 4, .. })
        ));
        assert!(matches!(
            confirm("User", 4, Some("user")),
            Err(DeskError::ConfirmationMismatch { .. })
        ));
        assert!(confirm("User", 4, Some("User")).is_ok());
    }

    #[test]
    fn plurals() {
        assert_eq!(plural(1, "row"), "1 row");
        assert_eq!(plural(3, "row"), "3 rows");
    }
}
