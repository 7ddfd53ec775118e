//! Agentboard Core
//!
//! Headless, local-first engine for agentboard's block documents, plus the
//! typed client it persists through.
//!
//! # Architecture
//!
//! - **Local-first editing**: every edit applies to an in-memory working copy
//!   first; the network never blocks typing
//! - **Debounced content, immediate structure**: text edits are batched per
//!   debounce window, while creates, deletes and reorders go out at once
//! - **Placeholder ids**: new blocks get a `tmp-` id until the server confirms
//!   them, and no request ever carries a placeholder
//! - **Host-agnostic**: keyboard, selection, menus and focus are pure state
//!   transitions; the UI host supplies geometry and a [`editor::SurfaceHost`]
//!
//! # Modules
//!
//! - [`models`] - Documents, blocks, per-type metadata, tables, focus requests
//! - [`editor`] - Working copy, save pipeline and interaction state machines
//! - [`client`] - `DocumentApi` seam, HTTP client, response cache, SSE streams
//! - [`config`] - File and environment configuration
//! - [`markdown`] - Markdown export and paste import
//! - [`utils`] - HTML fragment and caret-offset helpers

pub mod client;
pub mod config;
pub mod editor;
pub mod markdown;
pub mod models;
pub mod utils;

// Re-export commonly used types
pub use client::{ApiError, DocumentApi, HttpClient};
pub use config::{AppConfig, EditorConfig};
pub use editor::{EditorError, EditorEvent, EditorSession, SaveStatus};
pub use models::*;
