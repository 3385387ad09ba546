//! # Configuration
//!
//! Settings are declared with [`confique`] and resolved in priority order:
//!
//! 1. **Environment variables**: `PROTODESK_DATABASE`, `PROTODESK_SESSION`,
//!    `PROTODESK_LIMIT`.
//! 2. **Config file**: `protodesk.toml` in the OS config directory (via the
//!    `directories` crate), or a file given explicitly.
//! 3. **Compiled defaults**.
//!
//! Command-line flags are applied by the client on top of the loaded value.
//!
//! ## Available Settings
//!
//! | Key        | Default                         | Description                         |
//! |------------|---------------------------------|-------------------------------------|
//! | `database` | `protodesk.json`                | JSON database used by the CLI       |
//! | `session`  | next to the database            | Session blob (widths, credentials)  |
//! | `limit`    | `100`                           | Rows per page                       |

use crate::error::{DeskError, Result};
use crate::query::DEFAULT_LIMIT;
use confique::Config;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "protodesk.toml";

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DeskConfig {
    /// Path of the JSON database file.
    #[config(env = "PROTODESK_DATABASE", default = "protodesk.json")]
    pub database: PathBuf,

    /// Path of the session file. When absent, derived from `database`.
    #[config(env = "PROTODESK_SESSION")]
    pub session: Option<PathBuf>,

    /// Rows per page.
    #[config(env = "PROTODESK_LIMIT", default = 100)]
    pub limit: usize,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("protodesk.json"),
            session: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl DeskConfig {
    /// OS config directory for protodesk, if one can be determined.
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "protodesk").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Load from the environment and a config file. `file` overrides the
    /// default location; a missing file is skipped.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let path = file
            .map(Path::to_path_buf)
            .or_else(|| Self::config_dir().map(|dir| dir.join(CONFIG_FILE)));
        let mut builder = DeskConfig::builder().env();
        if let Some(path) = path {
            builder = builder.file(path);
        }
        builder.load().map_err(|e| DeskError::Config(e.to_string()))
    }

    /// Session file: configured, or `<database stem>.session.json` beside
    /// the database.
    pub fn session_path(&self) -> PathBuf {
        if let Some(session) = &self.session {
            return session.clone();
        }
        let stem = self
            .database
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("protodesk");
        self.database.with_file_name(format!("{}.session.json", stem))
    }
}
