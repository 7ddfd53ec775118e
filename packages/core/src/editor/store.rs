//! Document Store
//!
//! `DocumentStore` is the single writer of the editor's working copy. Every
//! local edit goes through one of its methods, which mutates the document
//! synchronously and reports the side effects the edit implies as a list of
//! [`Effect`]s. The store never performs I/O itself; `EditorSession` turns the
//! effects into timers and network calls.
//!
//! # Placeholder lifecycle
//!
//! Blocks created locally get a transient id and a `Create` effect. Until the
//! server answers, edits to them are buffered but never written. When the
//! create resolves, [`DocumentStore::confirm_block`] swaps the id in place,
//! moves pending writes to the confirmed id and retargets any focus request.
//! A placeholder deleted before confirmation is deleted again by its
//! confirmed id.

use std::collections::HashSet;

use crate::client::OrderEntry;
use crate::editor::ordering;
use crate::editor::write_buffer::{SaveTarget, WriteBuffer};
use crate::editor::EditorError;
use crate::models::{
    Block, BlockDraft, BlockId, BlockMeta, BlockType, BlockUpdate, Document, FocusRequest,
    TableData,
};

/// Deepest indentation the editor allows
pub const MAX_INDENT_LEVEL: u32 = 8;

/// Side effect implied by a local edit
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// A debounced entity became dirty; restart the save timer
    ScheduleSave,
    /// Create a block on the server for a placeholder
    Create { placeholder: BlockId, draft: BlockDraft },
    /// Delete a confirmed block right away
    Delete(BlockId),
    /// Send the full ordering right away
    Reorder(Vec<OrderEntry>),
    /// Write one block right away, bypassing the debounce
    WriteNow(BlockId),
    /// Move keyboard focus
    Focus(FocusRequest),
}

/// A write taken out of the buffer, carrying the payload read at take time
#[derive(Debug, Clone, PartialEq)]
pub enum PendingWrite {
    Title {
        title: String,
        generation: u64,
    },
    Block {
        id: BlockId,
        update: BlockUpdate,
        generation: u64,
    },
}

impl PendingWrite {
    pub fn target(&self) -> SaveTarget {
        match self {
            PendingWrite::Title { .. } => SaveTarget::Title,
            PendingWrite::Block { id, .. } => SaveTarget::Block(id.clone()),
        }
    }

    pub fn generation(&self) -> u64 {
        match self {
            PendingWrite::Title { generation, .. } | PendingWrite::Block { generation, .. } => {
                *generation
            }
        }
    }
}

#[derive(Debug)]
pub struct DocumentStore {
    document: Document,
    buffer: WriteBuffer,
    pending_focus: Option<FocusRequest>,
    /// Placeholders with a create call in flight
    creating: HashSet<BlockId>,
    /// Placeholders whose create failed; re-sent on the next flush
    failed_creates: HashSet<BlockId>,
    /// Placeholders removed locally while their create was in flight
    deleted_placeholders: HashSet<BlockId>,
    /// Deletes that failed; re-sent on the next flush
    failed_deletes: HashSet<BlockId>,
    /// A reorder is owed to the server (placeholders existed, or it failed)
    reorder_pending: bool,
}

impl DocumentStore {
    pub fn new(mut document: Document) -> Self {
        document.sort_blocks();
        Self {
            document,
            buffer: WriteBuffer::new(),
            pending_focus: None,
            creating: HashSet::new(),
            failed_creates: HashSet::new(),
            deleted_placeholders: HashSet::new(),
            failed_deletes: HashSet::new(),
            reorder_pending: false,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn blocks(&self) -> &[Block] {
        &self.document.blocks
    }

    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.document.block(id)
    }

    pub fn position(&self, id: &BlockId) -> Option<usize> {
        self.document.position(id)
    }

    pub fn previous(&self, id: &BlockId) -> Option<&Block> {
        let index = self.position(id)?;
        index.checked_sub(1).and_then(|i| self.document.blocks.get(i))
    }

    pub fn next(&self, id: &BlockId) -> Option<&Block> {
        let index = self.position(id)?;
        self.document.blocks.get(index + 1)
    }

    pub fn buffer(&self) -> &WriteBuffer {
        &self.buffer
    }

    /// Whether any local change has not reached the server yet
    pub fn has_unsaved_changes(&self) -> bool {
        self.buffer.has_pending()
            || !self.creating.is_empty()
            || !self.failed_creates.is_empty()
            || !self.failed_deletes.is_empty()
            || self.reorder_pending
    }

    /// Entities not yet persisted, for error reporting
    pub fn unsaved_targets(&self) -> Vec<SaveTarget> {
        let mut targets = self.buffer.targets();
        let mut blocks: Vec<&BlockId> = self
            .creating
            .iter()
            .chain(&self.failed_creates)
            .chain(&self.failed_deletes)
            .collect();
        blocks.sort();
        for id in blocks {
            let target = SaveTarget::Block(id.clone());
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        if self.reorder_pending {
            targets.push(SaveTarget::Order);
        }
        targets
    }

    fn block_mut(&mut self, id: &BlockId) -> Result<&mut Block, EditorError> {
        self.document
            .blocks
            .iter_mut()
            .find(|block| &block.id == id)
            .ok_or_else(|| EditorError::block_not_found(id))
    }

    fn index_of(&self, id: &BlockId) -> Result<usize, EditorError> {
        self.position(id)
            .ok_or_else(|| EditorError::block_not_found(id))
    }

    fn mark_block(&mut self, id: &BlockId) -> Effect {
        self.buffer.mark_dirty(SaveTarget::Block(id.clone()));
        Effect::ScheduleSave
    }

    fn focus(&mut self, request: FocusRequest) -> Effect {
        self.pending_focus = Some(request.clone());
        Effect::Focus(request)
    }

    // ---- Content edits (debounced) ----

    pub fn set_title(&mut self, title: impl Into<String>) -> Vec<Effect> {
        let title = title.into();
        if self.document.title == title {
            return Vec::new();
        }
        self.document.title = title;
        self.buffer.mark_dirty(SaveTarget::Title);
        vec![Effect::ScheduleSave]
    }

    pub fn update_content(
        &mut self,
        id: &BlockId,
        content: impl Into<String>,
    ) -> Result<Vec<Effect>, EditorError> {
        let content = content.into();
        let block = self.block_mut(id)?;
        if block.block_type.is_non_editable() {
            return Err(EditorError::not_editable(id, block.block_type));
        }
        if block.content == content {
            return Ok(Vec::new());
        }
        block.content = content;
        Ok(vec![self.mark_block(id)])
    }

    pub fn update_meta(&mut self, id: &BlockId, meta: BlockMeta) -> Result<Vec<Effect>, EditorError> {
        let block = self.block_mut(id)?;
        if block.meta == meta {
            return Ok(Vec::new());
        }
        block.meta = meta;
        Ok(vec![self.mark_block(id)])
    }

    /// Replace a table block's rows
    pub fn set_table_rows(
        &mut self,
        id: &BlockId,
        table: TableData,
    ) -> Result<Vec<Effect>, EditorError> {
        let block = self.block_mut(id)?;
        if block.block_type != BlockType::Table {
            return Err(EditorError::WrongBlockType {
                id: id.clone(),
                expected: BlockType::Table,
                actual: block.block_type,
            });
        }
        let mut meta = block.meta.clone();
        meta.rows = Some(table.into_rows());
        self.update_meta(id, meta)
    }

    pub fn set_indent(&mut self, id: &BlockId, level: u32) -> Result<Vec<Effect>, EditorError> {
        let level = level.min(MAX_INDENT_LEVEL);
        let block = self.block_mut(id)?;
        if block.indent_level == level {
            return Ok(Vec::new());
        }
        block.indent_level = level;
        Ok(vec![self.mark_block(id)])
    }

    /// Flip a todo checkbox; confirmed blocks are written immediately
    pub fn toggle_todo(&mut self, id: &BlockId) -> Result<Vec<Effect>, EditorError> {
        let block = self.block_mut(id)?;
        if block.block_type != BlockType::Todo {
            return Err(EditorError::WrongBlockType {
                id: id.clone(),
                expected: BlockType::Todo,
                actual: block.block_type,
            });
        }
        block.meta.checked = Some(!block.meta.is_checked());
        self.buffer.mark_dirty(SaveTarget::Block(id.clone()));

        if id.is_transient() {
            // Written once the create resolves
            Ok(Vec::new())
        } else {
            Ok(vec![Effect::WriteNow(id.clone())])
        }
    }

    pub fn change_type(
        &mut self,
        id: &BlockId,
        block_type: BlockType,
    ) -> Result<Vec<Effect>, EditorError> {
        let block = self.block_mut(id)?;
        if block.block_type == block_type {
            return Ok(Vec::new());
        }
        block.block_type = block_type;
        prepare_meta(&mut block.meta, block_type);

        let mut effects = vec![self.mark_block(id)];
        if block_type.is_text() {
            effects.push(self.focus(FocusRequest::end(id.clone())));
        }
        Ok(effects)
    }

    /// Escape-from-list: same id, paragraph type, caret at start
    pub fn convert_to_paragraph(&mut self, id: &BlockId) -> Result<Vec<Effect>, EditorError> {
        let block = self.block_mut(id)?;
        if block.block_type == BlockType::Paragraph {
            return Ok(vec![self.focus(FocusRequest::start(id.clone()))]);
        }
        block.block_type = BlockType::Paragraph;
        block.meta.checked = None;

        let mut effects = vec![self.mark_block(id)];
        effects.push(self.focus(FocusRequest::start(id.clone())));
        Ok(effects)
    }

    // ---- Structural edits (immediate) ----

    /// Insert a new placeholder block after `after`, or at the top when `None`
    pub fn insert_after(
        &mut self,
        after: Option<&BlockId>,
        block_type: BlockType,
        content: impl Into<String>,
    ) -> Result<(BlockId, Vec<Effect>), EditorError> {
        let index = match after {
            Some(id) => self.index_of(id)? + 1,
            None => 0,
        };
        let mut block = self.new_block_at(index, block_type, content.into());
        if let Some(previous) = index.checked_sub(1).and_then(|i| self.document.blocks.get(i)) {
            if block_type.is_continuable() && previous.block_type == block_type {
                block.indent_level = previous.indent_level;
            }
        }
        Ok(self.insert_block(index, block))
    }

    /// Insert a new placeholder block at the end of the document
    pub fn append(
        &mut self,
        block_type: BlockType,
        content: impl Into<String>,
    ) -> (BlockId, Vec<Effect>) {
        let index = self.document.blocks.len();
        let block = self.new_block_at(index, block_type, content.into());
        self.insert_block(index, block)
    }

    pub fn duplicate(&mut self, id: &BlockId) -> Result<(BlockId, Vec<Effect>), EditorError> {
        let index = self.index_of(id)?;
        let source = &self.document.blocks[index];
        let mut block = self.new_block_at(index + 1, source.block_type, source.content.clone());
        block.indent_level = source.indent_level;
        block.meta = source.meta.clone();
        Ok(self.insert_block(index + 1, block))
    }

    /// Insert a pasted or imported block after `after`, keeping its indent and metadata
    pub fn insert_draft_after(
        &mut self,
        after: Option<&BlockId>,
        draft: BlockDraft,
    ) -> Result<(BlockId, Vec<Effect>), EditorError> {
        let index = match after {
            Some(id) => self.index_of(id)? + 1,
            None => 0,
        };
        let mut block = self.new_block_at(index, draft.block_type, draft.content);
        block.indent_level = draft.indent_level.min(MAX_INDENT_LEVEL);
        if draft.meta != BlockMeta::default() {
            block.meta = draft.meta;
        }
        Ok(self.insert_block(index, block))
    }

    fn new_block_at(&self, index: usize, block_type: BlockType, content: String) -> Block {
        let order = ordering::order_for_slot(&self.document.blocks, index);

        let mut block = Block::transient(self.document.id.clone(), block_type, content, order);
        prepare_meta(&mut block.meta, block_type);
        block
    }

    fn insert_block(&mut self, index: usize, block: Block) -> (BlockId, Vec<Effect>) {
        let id = block.id.clone();
        let block_type = block.block_type;
        self.document.blocks.insert(index, block);

        let mut effects = Vec::new();
        if ordering::normalize_if_needed(&mut self.document.blocks) {
            effects.extend(self.reorder_effect());
        }

        let draft = BlockDraft::from(&self.document.blocks[index]);
        self.creating.insert(id.clone());
        effects.push(Effect::Create {
            placeholder: id.clone(),
            draft,
        });
        if block_type.is_text() {
            effects.push(self.focus(FocusRequest::start(id.clone())));
        }
        (id, effects)
    }

    /// Delete one block and focus its nearest remaining neighbour
    pub fn remove(&mut self, id: &BlockId) -> Result<Vec<Effect>, EditorError> {
        self.remove_many(std::slice::from_ref(id))
    }

    /// Delete a set of blocks (cross-block selection delete)
    ///
    /// Focus lands at the end of the block before the first removed one, or
    /// at the start of the block that took its place. A document is never left
    /// empty; removing everything seeds a fresh paragraph.
    pub fn remove_many(&mut self, ids: &[BlockId]) -> Result<Vec<Effect>, EditorError> {
        let mut first_index = None;
        for id in ids {
            let index = self.index_of(id)?;
            first_index = Some(first_index.map_or(index, |first: usize| first.min(index)));
        }
        let Some(first_index) = first_index else {
            return Ok(Vec::new());
        };

        let mut effects: Vec<Effect> = ids
            .iter()
            .filter_map(|id| self.detach(id))
            .collect();

        if self.document.blocks.is_empty() {
            let (_, seeded) = self.append(BlockType::Paragraph, "");
            effects.extend(seeded);
            return Ok(effects);
        }

        let request = match first_index.checked_sub(1) {
            Some(previous) => FocusRequest::end(self.document.blocks[previous].id.clone()),
            None => FocusRequest::start(self.document.blocks[0].id.clone()),
        };
        effects.push(self.focus(request));
        Ok(effects)
    }

    /// Take a block out of the working copy; returns the delete to send, if any
    fn detach(&mut self, id: &BlockId) -> Option<Effect> {
        let index = self.position(id)?;
        self.document.blocks.remove(index);
        self.buffer.forget(id);
        if self
            .pending_focus
            .as_ref()
            .is_some_and(|request| &request.block_id == id)
        {
            self.pending_focus = None;
        }

        if !id.is_transient() {
            return Some(Effect::Delete(id.clone()));
        }
        if self.creating.remove(id) {
            self.deleted_placeholders.insert(id.clone());
        }
        self.failed_creates.remove(id);
        None
    }

    /// Move the block at `from` so it ends up at index `to`
    pub fn move_block(&mut self, from: usize, to: usize) -> Result<Vec<Effect>, EditorError> {
        let len = self.document.blocks.len();
        for index in [from, to] {
            if index >= len {
                return Err(EditorError::IndexOutOfRange { index, len });
            }
        }
        if from == to {
            return Ok(Vec::new());
        }

        let block = self.document.blocks.remove(from);
        self.document.blocks.insert(to, block);
        ordering::renumber(&mut self.document.blocks);
        Ok(self.reorder_effect().into_iter().collect())
    }

    /// Enter inside a text block: head stays, tail seeds a new block after it
    pub fn split_at(
        &mut self,
        id: &BlockId,
        offset: usize,
    ) -> Result<(BlockId, Vec<Effect>), EditorError> {
        let index = self.index_of(id)?;
        let block = &self.document.blocks[index];
        if block.block_type.is_non_editable() {
            return Err(EditorError::not_editable(id, block.block_type));
        }

        let (head, tail) = block.split_content(offset);
        let new_type = if block.block_type.is_continuable() {
            block.block_type
        } else {
            BlockType::Paragraph
        };
        let indent_level = if new_type == block.block_type {
            block.indent_level
        } else {
            0
        };

        let mut effects = Vec::new();
        if head != block.content {
            self.document.blocks[index].content = head;
            effects.push(self.mark_block(id));
        }

        let mut new_block = self.new_block_at(index + 1, new_type, tail);
        new_block.indent_level = indent_level;
        let (new_id, inserted) = self.insert_block(index + 1, new_block);
        effects.extend(inserted);
        Ok((new_id, effects))
    }

    /// Backspace at offset 0
    ///
    /// Appends this block's content to the previous block and removes it, with
    /// the caret at the old boundary. A non-editable previous block only takes
    /// focus. The first block is left alone.
    pub fn merge_into_previous(&mut self, id: &BlockId) -> Result<Vec<Effect>, EditorError> {
        let index = self.index_of(id)?;
        let Some(previous_index) = index.checked_sub(1) else {
            return Ok(Vec::new());
        };

        let previous = &self.document.blocks[previous_index];
        if previous.block_type.is_non_editable() {
            let request = FocusRequest::end(previous.id.clone());
            return Ok(vec![self.focus(request)]);
        }

        let previous_id = previous.id.clone();
        let boundary = previous.char_len();
        let tail = self.document.blocks[index].content.clone();

        let mut effects = Vec::new();
        if !tail.is_empty() {
            self.document.blocks[previous_index].content.push_str(&tail);
            effects.push(self.mark_block(&previous_id));
        }
        effects.extend(self.detach(id));
        effects.push(self.focus(FocusRequest::at(previous_id, boundary)));
        Ok(effects)
    }

    // ---- Focus ----

    pub fn request_focus(&mut self, request: FocusRequest) -> Effect {
        self.focus(request)
    }

    pub fn pending_focus(&self) -> Option<&FocusRequest> {
        self.pending_focus.as_ref()
    }

    /// Consume the pending request if it targets `block_id`
    pub fn take_focus(&mut self, block_id: &BlockId) -> Option<FocusRequest> {
        if self
            .pending_focus
            .as_ref()
            .is_some_and(|request| &request.block_id == block_id)
        {
            self.pending_focus.take()
        } else {
            None
        }
    }

    /// Drop the pending request only if it is still `request`
    pub fn discard_focus(&mut self, request: &FocusRequest) {
        if self.pending_focus.as_ref() == Some(request) {
            self.pending_focus = None;
        }
    }

    // ---- Server round trips ----

    /// A create call resolved with the server's block
    pub fn confirm_block(&mut self, placeholder: &BlockId, server: Block) -> Vec<Effect> {
        self.creating.remove(placeholder);
        let confirmed = server.id;

        if self.deleted_placeholders.remove(placeholder) {
            tracing::debug!(
                "Block {} was deleted before its create resolved; deleting {}",
                placeholder,
                confirmed
            );
            return vec![Effect::Delete(confirmed)];
        }

        let Some(block) = self
            .document
            .blocks
            .iter_mut()
            .find(|block| &block.id == placeholder)
        else {
            tracing::warn!("Confirmed block {} has no local placeholder", placeholder);
            return Vec::new();
        };
        // Local fields stay authoritative; edits made while the create was in
        // flight are still buffered under the placeholder
        block.id = confirmed.clone();
        block.document_id = server.document_id;

        let mut effects = Vec::new();
        self.buffer.rekey(placeholder, &confirmed);
        if self.buffer.is_dirty(&SaveTarget::Block(confirmed.clone())) {
            effects.push(Effect::ScheduleSave);
        }

        let retargeted = self
            .pending_focus
            .as_ref()
            .filter(|request| &request.block_id == placeholder)
            .map(|request| request.retarget(confirmed.clone()));
        if let Some(request) = retargeted {
            effects.push(self.focus(request));
        }

        if self.reorder_pending {
            effects.extend(self.reorder_effect());
        }
        effects
    }

    /// A create call failed after retries; the placeholder is re-sent on the next flush
    pub fn create_failed(&mut self, placeholder: &BlockId) {
        self.creating.remove(placeholder);
        if self.deleted_placeholders.remove(placeholder) {
            return;
        }
        if self.position(placeholder).is_some() {
            self.failed_creates.insert(placeholder.clone());
        }
    }

    /// Drafts for every placeholder whose create failed earlier
    pub fn take_failed_creates(&mut self) -> Vec<(BlockId, BlockDraft)> {
        let failed: Vec<BlockId> = self.failed_creates.drain().collect();
        let mut drafts = Vec::new();
        for id in failed {
            if let Some(block) = self.document.block(&id) {
                drafts.push((id.clone(), BlockDraft::from(block)));
                self.creating.insert(id);
            }
        }
        drafts
    }

    /// Full ordering, or `None` while any block is still a placeholder
    pub fn order_entries(&self) -> Option<Vec<OrderEntry>> {
        if self.document.blocks.iter().any(|b| b.id.is_transient()) {
            return None;
        }
        Some(
            self.document
                .blocks
                .iter()
                .map(|block| OrderEntry {
                    id: block.id.clone(),
                    sort_order: block.sort_order,
                })
                .collect(),
        )
    }

    fn reorder_effect(&mut self) -> Option<Effect> {
        match self.order_entries() {
            Some(entries) => {
                self.reorder_pending = false;
                Some(Effect::Reorder(entries))
            }
            None => {
                self.reorder_pending = true;
                None
            }
        }
    }

    /// A delete call failed after retries
    pub fn delete_failed(&mut self, id: &BlockId) {
        self.failed_deletes.insert(id.clone());
    }

    pub fn take_failed_deletes(&mut self) -> Vec<BlockId> {
        let mut ids: Vec<BlockId> = self.failed_deletes.drain().collect();
        ids.sort();
        ids
    }

    /// A reorder could not be sent or failed; it goes out with the next flush
    pub fn mark_reorder_pending(&mut self) {
        self.reorder_pending = true;
    }

    /// Pending reorder for the next flush, if one can be sent now
    pub fn take_pending_reorder(&mut self) -> Option<Vec<OrderEntry>> {
        if !self.reorder_pending {
            return None;
        }
        match self.reorder_effect() {
            Some(Effect::Reorder(entries)) => Some(entries),
            _ => None,
        }
    }

    // ---- Flush bookkeeping ----

    /// Every dirty, confirmed entity with its current payload, title first
    pub fn take_batch(&mut self) -> Vec<PendingWrite> {
        let batch = self.buffer.take_batch();
        batch
            .into_iter()
            .filter_map(|(target, generation)| self.payload(target, generation))
            .collect()
    }

    /// One entity for an immediate write
    pub fn take_write(&mut self, target: &SaveTarget) -> Option<PendingWrite> {
        let generation = self.buffer.take_one(target)?;
        self.payload(target.clone(), generation)
    }

    fn payload(&mut self, target: SaveTarget, generation: u64) -> Option<PendingWrite> {
        match target {
            SaveTarget::Title => Some(PendingWrite::Title {
                title: self.document.title.clone(),
                generation,
            }),
            SaveTarget::Block(id) => match self.document.block(&id) {
                Some(block) => Some(PendingWrite::Block {
                    update: BlockUpdate::from(block),
                    id,
                    generation,
                }),
                None => {
                    self.buffer.forget(&id);
                    None
                }
            },
            // Ordering never goes through the write buffer
            SaveTarget::Order => None,
        }
    }

    pub fn complete_write(&mut self, target: &SaveTarget, generation: u64) {
        self.buffer.complete(target, generation);
    }

    pub fn fail_write(&mut self, target: &SaveTarget) {
        self.buffer.fail(target);
    }
}

/// Seed type-specific metadata a block of `block_type` expects
fn prepare_meta(meta: &mut BlockMeta, block_type: BlockType) {
    match block_type {
        BlockType::Todo => {
            meta.checked.get_or_insert(false);
        }
        BlockType::Table => {
            if meta.rows.is_none() {
                meta.rows = Some(TableData::default().into_rows());
            }
        }
        _ => {}
    }
}
