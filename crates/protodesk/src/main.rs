//! # Protodesk CLI Architecture
//!
//! Protodesk ships a command-line client for the data grid, but the binary is
//! thin: the CLI lives in `src/cli/`, and this file only invokes `cli::run()`
//! and handles process termination.
//!
//! ## Workspace Structure
//!
//! - `crates/protodeskapp/`: the grid core, UI agnostic
//! - `crates/protodesk/`: this CLI, a client of `protodeskapp`
//!
//! ## Layering
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (crates/protodesk/src/cli/)                      │
//! │  - clap argument parsing (setup.rs)                         │
//! │  - config, runtime and dispatch (commands.rs)               │
//! │  - terminal tables and messages (render.rs, styles.rs)      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (protodeskapp::api::DeskApi)                     │
//! │  - resolves row selections and column spans                 │
//! │  - returns structured `CmdResult` values                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer + FileService (protodeskapp)                 │
//! │  - fetch, edit, paste, delete, reconcile                    │
//! │  - no knowledge of stdout/stderr or process exits           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each invocation opens the database file, fetches the requested page of one
//! class, applies at most one edit and prints the outcome. Row numbers on the
//! command line are the 1-based numbers printed by `browse` for the same
//! filter, sort and page.
//!
//! ## Testing Approach
//!
//! - **Core (`crates/protodeskapp`)**: unit tests against the in-memory service.
//! - **CLI (`tests/cli_e2e.rs`)**: end-to-end runs of the binary on temporary
//!   database files with `assert_cmd`.

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
