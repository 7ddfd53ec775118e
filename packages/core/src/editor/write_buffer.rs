//! Pending-write bookkeeping for the save pipeline
//!
//! Every persisted entity (the title and each block) moves through a small
//! state machine:
//!
//! ```text
//! Clean --edit--> Dirty(g) --take_batch--> Flushing(g) --complete(g)--> Clean
//!                    ^                         |
//!                    +------fail / newer edit--+
//! ```
//!
//! The buffer only tracks *which* entities need writing and at which edit
//! generation. Payloads are read from the working copy when a batch is taken,
//! so the write always carries the latest local value.

use std::collections::HashMap;

use crate::models::BlockId;

/// Entity a pending write belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SaveTarget {
    Title,
    Block(BlockId),
    /// The document's block ordering
    Order,
}

impl SaveTarget {
    pub fn is_transient(&self) -> bool {
        match self {
            SaveTarget::Title | SaveTarget::Order => false,
            SaveTarget::Block(id) => id.is_transient(),
        }
    }

    /// Title first, then blocks by id, then ordering
    fn sort_key(&self) -> (u8, Option<&BlockId>) {
        match self {
            SaveTarget::Title => (0, None),
            SaveTarget::Block(id) => (1, Some(id)),
            SaveTarget::Order => (2, None),
        }
    }
}

impl std::fmt::Display for SaveTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveTarget::Title => f.write_str("title"),
            SaveTarget::Block(id) => write!(f, "block {}", id),
            SaveTarget::Order => f.write_str("block order"),
        }
    }
}

/// Sync state of one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Clean,
    Dirty { generation: u64 },
    /// A write carrying `generation` is in flight; `redirtied` is set when a
    /// newer edit arrived after the batch was taken
    Flushing { generation: u64, redirtied: bool },
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    /// Generation of the latest local edit
    latest: u64,
    /// Generation handed to an in-flight write
    flushing: Option<u64>,
}

#[derive(Debug, Default)]
pub struct WriteBuffer {
    entries: HashMap<SaveTarget, Entry>,
    next_generation: u64,
}

impl WriteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an edit; returns the generation assigned to it
    pub fn mark_dirty(&mut self, target: SaveTarget) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.entries
            .entry(target)
            .and_modify(|entry| entry.latest = generation)
            .or_insert(Entry {
                latest: generation,
                flushing: None,
            });
        generation
    }

    pub fn state(&self, target: &SaveTarget) -> SyncState {
        match self.entries.get(target) {
            None => SyncState::Clean,
            Some(Entry {
                latest,
                flushing: None,
            }) => SyncState::Dirty {
                generation: *latest,
            },
            Some(Entry {
                latest,
                flushing: Some(generation),
            }) => SyncState::Flushing {
                generation: *generation,
                redirtied: latest > generation,
            },
        }
    }

    pub fn is_dirty(&self, target: &SaveTarget) -> bool {
        !matches!(self.state(target), SyncState::Clean)
    }

    /// Move every dirty, server-addressable entity to `Flushing`
    ///
    /// Placeholders stay dirty and are never part of a batch. Entities that
    /// are already flushing are skipped.
    pub fn take_batch(&mut self) -> Vec<(SaveTarget, u64)> {
        let mut batch: Vec<(SaveTarget, u64)> = self
            .entries
            .iter_mut()
            .filter(|(target, entry)| entry.flushing.is_none() && !target.is_transient())
            .map(|(target, entry)| {
                entry.flushing = Some(entry.latest);
                (target.clone(), entry.latest)
            })
            .collect();

        batch.sort_by(|(a, _), (b, _)| a.sort_key().cmp(&b.sort_key()));
        batch
    }

    /// Take a single entity for an immediate write
    pub fn take_one(&mut self, target: &SaveTarget) -> Option<u64> {
        if target.is_transient() {
            return None;
        }
        let entry = self.entries.get_mut(target)?;
        if entry.flushing.is_some() {
            return None;
        }
        entry.flushing = Some(entry.latest);
        Some(entry.latest)
    }

    /// A write carrying `generation` succeeded
    ///
    /// The entity becomes clean only if no newer edit arrived meanwhile.
    pub fn complete(&mut self, target: &SaveTarget, generation: u64) {
        let Some(entry) = self.entries.get_mut(target) else {
            return;
        };
        if entry.latest <= generation {
            self.entries.remove(target);
        } else {
            entry.flushing = None;
        }
    }

    /// A write failed; the entity stays dirty for the next cycle
    pub fn fail(&mut self, target: &SaveTarget) {
        if let Some(entry) = self.entries.get_mut(target) {
            entry.flushing = None;
        }
    }

    /// Move pending state from a placeholder to its confirmed id
    pub fn rekey(&mut self, placeholder: &BlockId, confirmed: &BlockId) {
        if let Some(entry) = self.entries.remove(&SaveTarget::Block(placeholder.clone())) {
            self.entries
                .insert(SaveTarget::Block(confirmed.clone()), entry);
        }
    }

    /// Drop any pending write for a deleted block
    pub fn forget(&mut self, id: &BlockId) {
        self.entries.remove(&SaveTarget::Block(id.clone()));
    }

    /// Every entity with unsaved state
    pub fn targets(&self) -> Vec<SaveTarget> {
        let mut targets: Vec<SaveTarget> = self.entries.keys().cloned().collect();
        targets.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        targets
    }

    pub fn has_pending(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(id: &str) -> SaveTarget {
        SaveTarget::Block(BlockId::new(id))
    }

    #[test]
    fn test_clean_dirty_flushing_clean() {
        let mut buffer = WriteBuffer::new();
        let target = block("b-1");
        assert_eq!(buffer.state(&target), SyncState::Clean);

        let generation = buffer.mark_dirty(target.clone());
        assert_eq!(buffer.state(&target), SyncState::Dirty { generation });

        let batch = buffer.take_batch();
        assert_eq!(batch, vec![(target.clone(), generation)]);
        assert_eq!(
            buffer.state(&target),
            SyncState::Flushing {
                generation,
                redirtied: false
            }
        );

        buffer.complete(&target, generation);
        assert_eq!(buffer.state(&target), SyncState::Clean);
        assert!(!buffer.has_pending());
    }

    #[test]
    fn test_edit_during_flush_keeps_entity_dirty() {
        let mut buffer = WriteBuffer::new();
        let target = block("b-1");
        buffer.mark_dirty(target.clone());
        let (_, sent) = buffer.take_batch().pop().unwrap();

        let newer = buffer.mark_dirty(target.clone());
        assert!(matches!(
            buffer.state(&target),
            SyncState::Flushing { redirtied: true, .. }
        ));

        buffer.complete(&target, sent);
        assert_eq!(buffer.state(&target), SyncState::Dirty { generation: newer });
    }

    #[test]
    fn test_failed_write_returns_to_dirty() {
        let mut buffer = WriteBuffer::new();
        let target = SaveTarget::Title;
        let generation = buffer.mark_dirty(target.clone());
        buffer.take_batch();

        buffer.fail(&target);
        assert_eq!(buffer.state(&target), SyncState::Dirty { generation });
        assert_eq!(buffer.take_batch().len(), 1);
    }

    #[test]
    fn test_placeholders_are_never_batched() {
        let mut buffer = WriteBuffer::new();
        let placeholder = BlockId::transient();
        buffer.mark_dirty(SaveTarget::Block(placeholder.clone()));

        assert!(buffer.take_batch().is_empty());
        assert!(buffer
            .take_one(&SaveTarget::Block(placeholder.clone()))
            .is_none());

        let confirmed = BlockId::new("srv-10");
        buffer.rekey(&placeholder, &confirmed);
        let batch = buffer.take_batch();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].0, SaveTarget::Block(confirmed));
    }

    #[test]
    fn test_title_is_batched_first() {
        let mut buffer = WriteBuffer::new();
        buffer.mark_dirty(block("a"));
        buffer.mark_dirty(SaveTarget::Title);
        buffer.mark_dirty(block("b"));

        let targets: Vec<SaveTarget> = buffer.take_batch().into_iter().map(|(t, _)| t).collect();
        assert_eq!(targets, vec![SaveTarget::Title, block("a"), block("b")]);
    }

    #[test]
    fn test_forget_drops_pending_state() {
        let mut buffer = WriteBuffer::new();
        buffer.mark_dirty(block("gone"));
        buffer.forget(&BlockId::new("gone"));
        assert!(!buffer.has_pending());

        // Completing a forgotten write is a no-op
        buffer.complete(&block("gone"), 1);
        assert!(!buffer.has_pending());
    }
}
