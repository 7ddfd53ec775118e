//! Block Data Structures
//!
//! This module defines the `Block` struct, the unit of content inside a
//! document, together with its identifier and type tag.
//!
//! # Architecture
//!
//! - **Closed type set**: `BlockType` is an enum with one variant per renderer,
//!   so every match over it is exhaustive
//! - **Opaque metadata**: per-type structured data lives in [`BlockMeta`] and is
//!   persisted as a JSON string (`meta_json`)
//! - **Transient ids**: blocks created locally carry a `tmp-` prefixed id until
//!   the server confirms them
//!
//! # Examples
//!
//! ```rust
//! use agentboard_core::models::{Block, BlockId, BlockType};
//!
//! let block = Block::transient("doc-1", BlockType::Todo, "Ship it", 3.0);
//! assert!(block.id.is_transient());
//! assert!(block.block_type.is_continuable());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::models::BlockMeta;

/// Prefix carried by every client-generated placeholder id
pub const TRANSIENT_ID_PREFIX: &str = "tmp-";

/// Identifier of a block
///
/// Server ids are opaque strings. The backend sends some of them as JSON
/// integers, so deserialization accepts both and normalizes to a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh placeholder id for a block that has not been created yet
    pub fn transient() -> Self {
        Self(format!("{}{}", TRANSIENT_ID_PREFIX, Uuid::new_v4()))
    }

    /// Whether this id is a placeholder awaiting server confirmation
    pub fn is_transient(&self) -> bool {
        self.0.starts_with(TRANSIENT_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for BlockId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Serialize for BlockId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for BlockId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => BlockId(text),
            RawId::Number(number) => BlockId(number.to_string()),
        })
    }
}

/// Block type tag
///
/// The wire form is the snake_case tag (`"heading_1"`, `"bullet_list"`, ...).
/// Unknown tags degrade to `Paragraph` so a newer backend never breaks the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    BulletList,
    NumberedList,
    Todo,
    Code,
    Quote,
    Divider,
    Table,
    AgentEmbed,
}

impl BlockType {
    /// Every block type, in slash-menu order
    pub const ALL: [BlockType; 12] = [
        BlockType::Paragraph,
        BlockType::Heading1,
        BlockType::Heading2,
        BlockType::Heading3,
        BlockType::BulletList,
        BlockType::NumberedList,
        BlockType::Todo,
        BlockType::Code,
        BlockType::Quote,
        BlockType::Divider,
        BlockType::Table,
        BlockType::AgentEmbed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Paragraph => "paragraph",
            BlockType::Heading1 => "heading_1",
            BlockType::Heading2 => "heading_2",
            BlockType::Heading3 => "heading_3",
            BlockType::BulletList => "bullet_list",
            BlockType::NumberedList => "numbered_list",
            BlockType::Todo => "todo",
            BlockType::Code => "code",
            BlockType::Quote => "quote",
            BlockType::Divider => "divider",
            BlockType::Table => "table",
            BlockType::AgentEmbed => "agent_embed",
        }
    }

    /// Whether the block has an editable text surface
    pub fn is_text(&self) -> bool {
        !self.is_non_editable()
    }

    /// Types whose renderer has no caret (Backspace-merge skips into them)
    pub fn is_non_editable(&self) -> bool {
        matches!(
            self,
            BlockType::Divider | BlockType::Table | BlockType::AgentEmbed
        )
    }

    /// List-like types that Enter propagates to the new block
    pub fn is_continuable(&self) -> bool {
        matches!(
            self,
            BlockType::BulletList | BlockType::NumberedList | BlockType::Todo
        )
    }

    pub fn heading_level(&self) -> Option<u8> {
        match self {
            BlockType::Heading1 => Some(1),
            BlockType::Heading2 => Some(2),
            BlockType::Heading3 => Some(3),
            _ => None,
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a tag does not name a known block type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown block type: {0}")]
pub struct UnknownBlockType(pub String);

impl FromStr for BlockType {
    type Err = UnknownBlockType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockType::ALL
            .iter()
            .copied()
            .find(|block_type| block_type.as_str() == s)
            .ok_or_else(|| UnknownBlockType(s.to_string()))
    }
}

impl Serialize for BlockType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BlockType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(tag.parse().unwrap_or_else(|err: UnknownBlockType| {
            tracing::warn!("{}; rendering as paragraph", err);
            BlockType::Paragraph
        }))
    }
}

/// One unit of document content
///
/// `meta` is the parsed form of the wire field `meta_json`; see [`BlockMeta`]
/// for the parse-with-fallback rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,

    pub document_id: String,

    pub block_type: BlockType,

    /// Plain text or an HTML fragment, depending on the type
    #[serde(default)]
    pub content: String,

    /// Render order; strictly increasing across a document
    pub sort_order: f64,

    #[serde(default)]
    pub indent_level: u32,

    #[serde(
        rename = "meta_json",
        default,
        with = "crate::models::block_meta::as_json_string"
    )]
    pub meta: BlockMeta,
}

impl Block {
    /// Create a client-side block with a placeholder id
    pub fn transient(
        document_id: impl Into<String>,
        block_type: BlockType,
        content: impl Into<String>,
        sort_order: f64,
    ) -> Self {
        Self {
            id: BlockId::transient(),
            document_id: document_id.into(),
            block_type,
            content: content.into(),
            sort_order,
            indent_level: 0,
            meta: BlockMeta::default(),
        }
    }

    /// Length of the content in visible characters, the unit carets are
    /// measured in
    ///
    /// Code blocks hold raw text; every other type holds an HTML fragment
    /// whose tags take no caret positions.
    pub fn char_len(&self) -> usize {
        match self.block_type {
            BlockType::Code => crate::utils::text::char_len(&self.content),
            _ => crate::utils::html::plain_len(&self.content),
        }
    }

    /// Split the content before the visible character at `offset`
    pub fn split_content(&self, offset: usize) -> (String, String) {
        match self.block_type {
            BlockType::Code => crate::utils::text::split_at_char(&self.content, offset),
            _ => crate::utils::html::split_at_plain(&self.content, offset),
        }
    }

    pub fn is_empty(&self) -> bool {
        crate::utils::html::is_blank(&self.content)
    }
}

/// Payload for creating a block on the server
///
/// Carries everything the placeholder holds except its id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockDraft {
    pub block_type: BlockType,
    pub content: String,
    pub sort_order: f64,
    pub indent_level: u32,
    #[serde(rename = "meta_json", with = "crate::models::block_meta::as_json_string")]
    pub meta: BlockMeta,
}

impl From<&Block> for BlockDraft {
    fn from(block: &Block) -> Self {
        Self {
            block_type: block.block_type,
            content: block.content.clone(),
            sort_order: block.sort_order,
            indent_level: block.indent_level,
            meta: block.meta.clone(),
        }
    }
}

/// Payload for a last-write-wins block update
///
/// Ordering is never part of an update; it travels through reorder calls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockUpdate {
    pub block_type: BlockType,
    pub content: String,
    pub indent_level: u32,
    #[serde(rename = "meta_json", with = "crate::models::block_meta::as_json_string")]
    pub meta: BlockMeta,
}

impl From<&Block> for BlockUpdate {
    fn from(block: &Block) -> Self {
        Self {
            block_type: block.block_type,
            content: block.content.clone(),
            indent_level: block.indent_level,
            meta: block.meta.clone(),
        }
    }
}
