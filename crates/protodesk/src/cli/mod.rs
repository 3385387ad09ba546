//! # CLI Behavior
//!
//! This is **one possible UI client** for protodesk, not the application
//! itself. The CLI is the only place that knows about terminal I/O, exit
//! codes and output formatting.
//!
//! ## Selecting Cells
//!
//! - Rows: `1-3,5` (sorted, deduplicated). Commands that take a block use a
//!   span instead: `2-4`, or a single anchor row `2`.
//! - Columns: `name:email` (inclusive, in grid order), or a single column.
//!
//! ### Paste Input
//!
//! `paste` reads stdin, or the system clipboard with `--clipboard`. Text that
//! starts with `[` or `{` and parses as JSON is treated as JSON records;
//! anything else is tab-separated text.
//!
//! ### Confirmation
//!
//! Deleting more than three rows, or clearing more than three cells, needs the
//! class name. Pass it with `--confirm`, or type it at the prompt when stdin is
//! a terminal.
//!
//! ## Module Structure
//!
//! - `commands`: dispatch, one handler per subcommand
//! - `render`: tables, footers and messages
//! - `setup`: argument parsing via clap
//! - `styles`: terminal styles
//! - `clipboard`: system clipboard access

mod clipboard;
mod commands;
mod render;
pub mod setup;
mod styles;

pub use commands::run;
