//! # protodeskapp
//!
//! The core of a schema-driven admin data grid: rows of a remote object
//! database shown as a spreadsheet, with typed cells, in-place editors,
//! clipboard copy and paste, and optimistic edits reconciled with the service.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Front end (CLI, desktop, web)                               │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │ selections, payloads, values
//! ┌──────────────────────────────▼───────────────────────────────┐
//! │  api::DeskApi<S>          parses selections, owns the grid  │
//! └──────────────────────────────┬───────────────────────────────┘
//! ┌──────────────────────────────▼───────────────────────────────┐
//! │  commands::*              fetch, set_cell, paste, copy,      │
//! │                           delete, relation                   │
//! │  grid / overlay           view state, optimistic merge       │
//! │  codec / literal          clipboard text, JSON, literals     │
//! │  render / editor          cell display, edit sessions        │
//! │  schema / value / object  field kinds, typed values, rows    │
//! └──────────────────────────────┬───────────────────────────────┘
//! ┌──────────────────────────────▼───────────────────────────────┐
//! │  service::ObjectService   schema, find, count, save_all,     │
//! │                           delete_many, upload                │
//! │    ├── memory::MemService   (tests)                          │
//! │    └── fs::FileService      (JSON database file)             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The library does no terminal I/O and never exits the process. Failures
//! come back as [`error::DeskError`]; diagnostics go through `tracing`.

pub mod activity;
pub mod api;
pub mod codec;
pub mod commands;
pub mod config;
pub mod editor;
pub mod error;
pub mod grid;
pub mod literal;
pub mod object;
pub mod overlay;
pub mod query;
pub mod render;
pub mod schema;
pub mod selection;
pub mod service;
pub mod session;
pub mod value;
