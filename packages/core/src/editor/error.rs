//! Error types for the editor layer
//!
//! Local edits can only fail on bad references (unknown block, wrong type).
//! Network failures surface here once the retry policy has given up.

use thiserror::Error;

use crate::client::ApiError;
use crate::editor::SaveTarget;
use crate::models::{BlockId, BlockType};

#[derive(Error, Debug)]
pub enum EditorError {
    /// Referenced block is not in the working copy
    #[error("Block '{id}' does not exist in this document")]
    BlockNotFound { id: BlockId },

    /// Operation needs a text surface the block type does not have
    #[error("Block '{id}' of type '{block_type}' has no editable text")]
    NotEditable { id: BlockId, block_type: BlockType },

    /// Operation needs a specific block type
    #[error("Block '{id}' is a '{actual}', expected '{expected}'")]
    WrongBlockType {
        id: BlockId,
        expected: BlockType,
        actual: BlockType,
    },

    /// Position outside the block list
    #[error("Index {index} is out of range for {len} blocks")]
    IndexOutOfRange { index: usize, len: usize },

    /// Loading the document failed
    #[error("Failed to load document '{document_id}': {source}")]
    LoadFailed {
        document_id: String,
        #[source]
        source: ApiError,
    },

    /// One or more writes failed after all retry attempts
    #[error("Failed to save {}: {message}", describe_targets(.targets))]
    SaveFailed {
        targets: Vec<SaveTarget>,
        message: String,
    },

    /// Session was closed
    #[error("Editor session is closed")]
    Closed,
}

impl EditorError {
    pub fn block_not_found(id: &BlockId) -> Self {
        Self::BlockNotFound { id: id.clone() }
    }

    pub fn not_editable(id: &BlockId, block_type: BlockType) -> Self {
        Self::NotEditable {
            id: id.clone(),
            block_type,
        }
    }
}

fn describe_targets(targets: &[SaveTarget]) -> String {
    targets
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_failed_lists_targets() {
        let err = EditorError::SaveFailed {
            targets: vec![SaveTarget::Title, SaveTarget::Block(BlockId::new("b-2"))],
            message: "HTTP 503 Service Unavailable: down".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to save title, block b-2: HTTP 503 Service Unavailable: down"
        );
    }

    #[test]
    fn test_not_editable_message() {
        let err = EditorError::not_editable(&BlockId::new("b-1"), BlockType::Divider);
        assert_eq!(
            err.to_string(),
            "Block 'b-1' of type 'divider' has no editable text"
        );
    }
}
