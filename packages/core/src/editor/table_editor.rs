//! Table sub-editor
//!
//! A table block is edited through its own row buffer. Cell edits and
//! row/column changes land in the buffer immediately and are committed into
//! the block's metadata after a short debounce of their own; the commit then
//! rides the document's normal save cycle.

use crate::editor::EditorError;
use crate::models::{Block, BlockId, BlockType, TableData};

/// Default quiet period before buffered table edits are committed
pub const TABLE_DEBOUNCE_MS: u64 = 600;

#[derive(Debug, Clone)]
pub struct TableEditor {
    block_id: BlockId,
    table: TableData,
    dirty: bool,
    /// Bumped on every change; a commit timer only fires for the epoch it saw
    epoch: u64,
}

impl TableEditor {
    pub fn from_block(block: &Block) -> Result<Self, EditorError> {
        if block.block_type != BlockType::Table {
            return Err(EditorError::WrongBlockType {
                id: block.id.clone(),
                expected: BlockType::Table,
                actual: block.block_type,
            });
        }
        let table = block
            .meta
            .rows
            .clone()
            .map(TableData::from_rows)
            .unwrap_or_default();
        Ok(Self {
            block_id: block.id.clone(),
            table,
            dirty: false,
            epoch: 0,
        })
    }

    pub fn block_id(&self) -> &BlockId {
        &self.block_id
    }

    /// Follow the block when its placeholder id is confirmed
    pub fn rekey(&mut self, block_id: BlockId) {
        self.block_id = block_id;
    }

    pub fn table(&self) -> &TableData {
        &self.table
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    fn touch(&mut self, changed: bool) -> bool {
        if changed {
            self.dirty = true;
            self.epoch += 1;
        }
        changed
    }

    pub fn set_cell(&mut self, row: usize, column: usize, text: impl Into<String>) -> bool {
        let text = text.into();
        if self.table.cell(row, column) == Some(text.as_str()) {
            return false;
        }
        let changed = self.table.set_cell(row, column, text);
        self.touch(changed)
    }

    pub fn add_row(&mut self, after: Option<usize>) -> bool {
        self.table.add_row(after);
        self.touch(true)
    }

    pub fn delete_row(&mut self, index: usize) -> bool {
        let changed = self.table.delete_row(index);
        self.touch(changed)
    }

    pub fn add_column(&mut self, after: Option<usize>) -> bool {
        self.table.add_column(after);
        self.touch(true)
    }

    pub fn delete_column(&mut self, index: usize) -> bool {
        let changed = self.table.delete_column(index);
        self.touch(changed)
    }

    /// Rows to commit, if anything changed since the last commit
    pub fn take_commit(&mut self) -> Option<TableData> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(self.table.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_block() -> Block {
        let mut block = Block::transient("doc-1", BlockType::Table, "", 1.0);
        block.meta.rows = Some(vec![vec!["a".into(), "b".into()], vec!["c".into()]]);
        block
    }

    #[test]
    fn test_loads_rows_from_meta() {
        let editor = TableEditor::from_block(&table_block()).unwrap();
        assert_eq!(editor.table().row_count(), 2);
        assert_eq!(editor.table().cell(1, 1), Some(""));
        assert!(!editor.is_dirty());
    }

    #[test]
    fn test_missing_rows_default_to_two_by_two() {
        let mut block = table_block();
        block.meta.rows = None;
        let editor = TableEditor::from_block(&block).unwrap();
        assert_eq!(editor.table().row_count(), 2);
        assert_eq!(editor.table().column_count(), 2);
    }

    #[test]
    fn test_rejects_non_table_blocks() {
        let block = Block::transient("doc-1", BlockType::Paragraph, "x", 1.0);
        assert!(matches!(
            TableEditor::from_block(&block),
            Err(EditorError::WrongBlockType { .. })
        ));
    }

    #[test]
    fn test_changes_bump_epoch_and_commit_once() {
        let mut editor = TableEditor::from_block(&table_block()).unwrap();

        assert!(editor.set_cell(0, 0, "z"));
        assert!(!editor.set_cell(0, 0, "z"));
        assert!(editor.add_row(None));
        assert_eq!(editor.epoch(), 2);

        let committed = editor.take_commit().unwrap();
        assert_eq!(committed.cell(0, 0), Some("z"));
        assert_eq!(committed.row_count(), 3);
        assert!(editor.take_commit().is_none());
    }

    #[test]
    fn test_floor_deletes_do_not_dirty() {
        let mut block = table_block();
        block.meta.rows = Some(vec![vec!["only".into()]]);
        let mut editor = TableEditor::from_block(&block).unwrap();

        assert!(!editor.delete_row(0));
        assert!(!editor.delete_column(0));
        assert!(!editor.is_dirty());
        assert_eq!(editor.epoch(), 0);
    }
}
