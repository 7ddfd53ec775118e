//! Data Models
//!
//! This module contains the core data structures of the document editor:
//!
//! - `Document` - Title plus ordered blocks, the unit the editor loads and saves
//! - `Block` - One unit of content with a type tag and per-type metadata
//! - `FocusRequest` - One-shot caret placement after structural edits
//! - `TableData` - Row/column grid backing table blocks

mod block;
pub(crate) mod block_meta;
mod document;
mod focus;
mod table;

#[cfg(test)]
mod block_test;

pub use block::{
    Block, BlockDraft, BlockId, BlockType, BlockUpdate, UnknownBlockType, TRANSIENT_ID_PREFIX,
};
pub use block_meta::{BlockMeta, TextAlign};
pub use document::Document;
pub use focus::{CaretPlacement, FocusRequest};
pub use table::TableData;
