//! Focus requests
//!
//! A `FocusRequest` is a one-shot instruction produced by a structural edit
//! (split, merge, type change, creation). The targeted block's renderer
//! consumes it exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::BlockId;

/// Where the caret lands inside the focused block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "placement", content = "offset", rename_all = "lowercase")]
pub enum CaretPlacement {
    Start,
    End,
    /// Character offset, clamped to the content length when applied
    Offset(usize),
}

impl CaretPlacement {
    /// Resolve to a concrete character offset for content of `len` characters
    pub fn resolve(&self, len: usize) -> usize {
        match self {
            CaretPlacement::Start => 0,
            CaretPlacement::End => len,
            CaretPlacement::Offset(offset) => (*offset).min(len),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusRequest {
    pub block_id: BlockId,
    pub placement: CaretPlacement,
    pub issued_at: DateTime<Utc>,
}

impl FocusRequest {
    pub fn new(block_id: BlockId, placement: CaretPlacement) -> Self {
        Self {
            block_id,
            placement,
            issued_at: Utc::now(),
        }
    }

    pub fn start(block_id: BlockId) -> Self {
        Self::new(block_id, CaretPlacement::Start)
    }

    pub fn end(block_id: BlockId) -> Self {
        Self::new(block_id, CaretPlacement::End)
    }

    pub fn at(block_id: BlockId, offset: usize) -> Self {
        Self::new(block_id, CaretPlacement::Offset(offset))
    }

    /// Same placement aimed at a different block (used when a placeholder is confirmed)
    pub fn retarget(&self, block_id: BlockId) -> Self {
        Self::new(block_id, self.placement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_clamps_offset() {
        assert_eq!(CaretPlacement::Start.resolve(10), 0);
        assert_eq!(CaretPlacement::End.resolve(10), 10);
        assert_eq!(CaretPlacement::Offset(4).resolve(10), 4);
        assert_eq!(CaretPlacement::Offset(40).resolve(10), 10);
    }

    #[test]
    fn test_retarget_keeps_placement() {
        let request = FocusRequest::at(BlockId::transient(), 3);
        let confirmed = request.retarget(BlockId::new("srv-1"));
        assert_eq!(confirmed.block_id.as_str(), "srv-1");
        assert_eq!(confirmed.placement, CaretPlacement::Offset(3));
    }
}
