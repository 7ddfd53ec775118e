//! Fractional block ordering
//!
//! New blocks take a `sort_order` between their neighbours so an insert never
//! renumbers the rest of the document. Once two neighbours get closer than
//! [`MIN_ORDER_GAP`] the whole document is renumbered to `1..=n`.

use crate::models::Block;

/// Smallest gap between adjacent orders before renumbering kicks in
pub const MIN_ORDER_GAP: f64 = 0.0001;

/// Sort order for a block about to be inserted at `index` of `blocks`
///
/// Midway between the neighbours at `index - 1` and `index`; one step past
/// whichever side is missing; `1.0` in an empty document.
///
/// # Examples
/// ```
/// use agentboard_core::editor::ordering::order_for_slot;
/// use agentboard_core::models::{Block, BlockType};
///
/// let blocks = vec![
///     Block::transient("doc", BlockType::Paragraph, "a", 1.0),
///     Block::transient("doc", BlockType::Paragraph, "b", 2.0),
/// ];
/// assert_eq!(order_for_slot(&blocks, 0), 0.0);
/// assert_eq!(order_for_slot(&blocks, 1), 1.5);
/// assert_eq!(order_for_slot(&blocks, 2), 3.0);
/// ```
pub fn order_for_slot(blocks: &[Block], index: usize) -> f64 {
    let before = index
        .checked_sub(1)
        .and_then(|i| blocks.get(i))
        .map(|block| block.sort_order);
    let after = blocks.get(index).map(|block| block.sort_order);

    match (before, after) {
        (Some(low), Some(high)) => low + (high - low) / 2.0,
        (Some(low), None) => low + 1.0,
        (None, Some(high)) => high - 1.0,
        (None, None) => 1.0,
    }
}

/// Whether any neighbours sit closer than [`MIN_ORDER_GAP`] or out of order
pub fn gap_collapsed(blocks: &[Block]) -> bool {
    blocks
        .windows(2)
        .any(|pair| pair[1].sort_order - pair[0].sort_order < MIN_ORDER_GAP)
}

/// Renumber blocks in their current vector order to `1..=n`
pub fn renumber(blocks: &mut [Block]) {
    for (position, block) in blocks.iter_mut().enumerate() {
        block.sort_order = (position + 1) as f64;
    }
}

/// Renumber only when the current orders are too dense; returns whether it did
pub fn normalize_if_needed(blocks: &mut [Block]) -> bool {
    if !gap_collapsed(blocks) {
        return false;
    }
    tracing::debug!("Renumbering {} blocks after order gap collapsed", blocks.len());
    renumber(blocks);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BlockType;

    fn blocks(orders: &[f64]) -> Vec<Block> {
        orders
            .iter()
            .map(|order| Block::transient("doc", BlockType::Paragraph, "", *order))
            .collect()
    }

    fn orders(blocks: &[Block]) -> Vec<f64> {
        blocks.iter().map(|block| block.sort_order).collect()
    }

    #[test]
    fn test_slot_in_empty_document() {
        assert_eq!(order_for_slot(&[], 0), 1.0);
    }

    #[test]
    fn test_slot_at_either_end_steps_past_the_neighbour() {
        let doc = blocks(&[2.0, 5.0]);
        assert_eq!(order_for_slot(&doc, 0), 1.0);
        assert_eq!(order_for_slot(&doc, 2), 6.0);
        // An index past the end behaves like appending
        assert_eq!(order_for_slot(&doc, 7), 6.0);
    }

    #[test]
    fn test_slot_between_neighbours_is_midpoint() {
        let doc = blocks(&[1.0, 3.0, 3.5]);
        assert_eq!(order_for_slot(&doc, 1), 2.0);
        assert_eq!(order_for_slot(&doc, 2), 3.25);
    }

    #[test]
    fn test_gap_collapsed() {
        assert!(!gap_collapsed(&blocks(&[1.0, 2.0, 3.0])));
        assert!(!gap_collapsed(&blocks(&[7.0])));
        assert!(gap_collapsed(&blocks(&[1.0, 1.00001, 2.0])));
        assert!(gap_collapsed(&blocks(&[2.0, 1.0])));
    }

    #[test]
    fn test_normalize_leaves_sparse_orders_alone() {
        let mut doc = blocks(&[0.5, 1.5, 4.0]);
        assert!(!normalize_if_needed(&mut doc));
        assert_eq!(orders(&doc), vec![0.5, 1.5, 4.0]);
    }

    #[test]
    fn test_repeated_midpoint_inserts_eventually_normalize() {
        let mut doc = blocks(&[1.0, 2.0]);

        // Keep inserting directly after the first block
        let mut normalized = false;
        for _ in 0..30 {
            let order = order_for_slot(&doc, 1);
            doc.insert(1, Block::transient("doc", BlockType::Paragraph, "x", order));
            normalized |= normalize_if_needed(&mut doc);
        }

        assert!(normalized);
        assert_eq!(doc.len(), 32);
        assert!(!gap_collapsed(&doc));
    }
}
