//! Document model
//!
//! A document is a title plus an ordered collection of blocks, owned by a
//! project. The server is authoritative for persisted state; the editor keeps
//! a working copy of this struct for the duration of a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Block, BlockId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,

    #[serde(default)]
    pub project_id: Option<String>,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub blocks: Vec<Block>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Document {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            project_id: None,
            title: title.into(),
            blocks: Vec::new(),
            updated_at: None,
        }
    }

    /// Sort blocks into render order
    ///
    /// The server does not guarantee response order. Ties keep their
    /// original relative position.
    pub fn sort_blocks(&mut self) {
        self.blocks
            .sort_by(|a, b| a.sort_order.total_cmp(&b.sort_order));
    }

    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|block| &block.id == id)
    }

    pub fn position(&self, id: &BlockId) -> Option<usize> {
        self.blocks.iter().position(|block| &block.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BlockType;
    use serde_json::json;

    #[test]
    fn test_deserialize_server_payload() {
        let doc: Document = serde_json::from_value(json!({
            "id": "doc-1",
            "project_id": "proj-9",
            "title": "Launch plan",
            "blocks": [
                {
                    "id": 42,
                    "document_id": "doc-1",
                    "block_type": "todo",
                    "content": "Write changelog",
                    "sort_order": 2,
                    "meta_json": "{\"checked\":true}"
                },
                {
                    "id": "b-1",
                    "document_id": "doc-1",
                    "block_type": "heading_1",
                    "content": "Launch",
                    "sort_order": 1,
                    "indent_level": 0,
                    "meta_json": null
                }
            ]
        }))
        .unwrap();

        assert_eq!(doc.blocks.len(), 2);
        assert_eq!(doc.blocks[0].id.as_str(), "42");
        assert!(doc.blocks[0].meta.is_checked());
        assert_eq!(doc.blocks[1].block_type, BlockType::Heading1);
    }

    #[test]
    fn test_sort_blocks_by_order() {
        let mut doc = Document::new("doc-1", "Title");
        doc.blocks.push(Block::transient("doc-1", BlockType::Paragraph, "second", 2.0));
        doc.blocks.push(Block::transient("doc-1", BlockType::Paragraph, "first", 1.0));
        doc.blocks.push(Block::transient("doc-1", BlockType::Paragraph, "middle", 1.5));

        doc.sort_blocks();

        let contents: Vec<&str> = doc.blocks.iter().map(|b| b.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "middle", "second"]);
    }

    #[test]
    fn test_unknown_block_type_degrades_to_paragraph() {
        let block: Block = serde_json::from_value(json!({
            "id": "b-7",
            "document_id": "doc-1",
            "block_type": "kanban_embed",
            "content": "hello",
            "sort_order": 1.0
        }))
        .unwrap();

        assert_eq!(block.block_type, BlockType::Paragraph);
    }
}
