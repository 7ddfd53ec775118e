//! Keyboard interpreter
//!
//! Turns a key press inside a block into an [`EditCommand`]. The interpreter
//! is pure: it sees the key, the caret and the neighbouring blocks, and
//! decides. Applying the command is the session's job.
//!
//! | Key | Situation | Command |
//! |-----|-----------|---------|
//! | Enter | shift, code block, non-editable, or a range is selected | pass through |
//! | Enter | empty list-like block | convert to paragraph |
//! | Enter | otherwise | split at caret |
//! | Backspace | caret at 0, previous block non-editable | focus previous (end) |
//! | Backspace | caret at 0, previous block exists | merge into previous |
//! | Backspace | caret at 0, first block, not a paragraph | convert to paragraph |
//! | Backspace/Delete | several blocks selected | delete selection |
//! | ArrowUp/ArrowDown | caret on first/last line | focus neighbour |
//! | `/` | empty paragraph | open slash menu |
//! | Tab / Shift+Tab | list-like block | indent / outdent |

use serde::{Deserialize, Serialize};

use crate::models::{Block, BlockType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Enter,
    Backspace,
    Delete,
    ArrowUp,
    ArrowDown,
    Tab,
    Slash,
    Escape,
    /// Any other key; never intercepted
    Other,
}

/// Caret state inside the focused block's surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaretContext {
    /// Character offset of the caret (selection focus)
    pub offset: usize,
    pub collapsed: bool,
    pub on_first_line: bool,
    pub on_last_line: bool,
}

impl CaretContext {
    /// Collapsed caret on a single-line block
    pub fn at(offset: usize) -> Self {
        Self {
            offset,
            collapsed: true,
            on_first_line: true,
            on_last_line: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInput {
    pub key: Key,
    pub shift: bool,
    pub caret: CaretContext,
}

impl KeyInput {
    pub fn new(key: Key, caret: CaretContext) -> Self {
        Self {
            key,
            shift: false,
            caret,
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }
}

/// What the editor does in response to a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditCommand {
    Split { offset: usize },
    ConvertToParagraph,
    MergeIntoPrevious,
    FocusPreviousEnd,
    FocusNextStart,
    OpenSlashMenu,
    DeleteSelection,
    Indent,
    Outdent,
    /// Let the surface handle the key natively
    PassThrough,
}

impl EditCommand {
    /// Whether the native key action must be suppressed
    pub fn prevents_default(&self) -> bool {
        !matches!(self, EditCommand::PassThrough | EditCommand::OpenSlashMenu)
    }
}

/// Neighbourhood of the focused block
#[derive(Debug, Clone, Copy)]
pub struct KeyContext<'a> {
    pub block: &'a Block,
    pub previous: Option<&'a Block>,
    pub next: Option<&'a Block>,
    /// Number of blocks in the cross-block selection
    pub selected_blocks: usize,
}

pub fn interpret(input: &KeyInput, context: &KeyContext<'_>) -> EditCommand {
    let block = context.block;

    if context.selected_blocks > 1 && matches!(input.key, Key::Backspace | Key::Delete) {
        return EditCommand::DeleteSelection;
    }

    match input.key {
        Key::Enter => interpret_enter(input, block),
        Key::Backspace => interpret_backspace(input, context),
        Key::ArrowUp if input.caret.on_first_line && context.previous.is_some() => {
            EditCommand::FocusPreviousEnd
        }
        Key::ArrowDown if input.caret.on_last_line && context.next.is_some() => {
            EditCommand::FocusNextStart
        }
        Key::Slash if block.block_type == BlockType::Paragraph && block.is_empty() => {
            EditCommand::OpenSlashMenu
        }
        Key::Tab if block.block_type.is_continuable() => {
            if input.shift {
                EditCommand::Outdent
            } else {
                EditCommand::Indent
            }
        }
        _ => EditCommand::PassThrough,
    }
}

fn interpret_enter(input: &KeyInput, block: &Block) -> EditCommand {
    if input.shift
        || block.block_type == BlockType::Code
        || block.block_type.is_non_editable()
        || !input.caret.collapsed
    {
        return EditCommand::PassThrough;
    }
    if block.block_type.is_continuable() && block.is_empty() {
        return EditCommand::ConvertToParagraph;
    }
    EditCommand::Split {
        offset: input.caret.offset,
    }
}

fn interpret_backspace(input: &KeyInput, context: &KeyContext<'_>) -> EditCommand {
    if input.caret.offset != 0 || !input.caret.collapsed {
        return EditCommand::PassThrough;
    }
    match context.previous {
        Some(previous) if previous.block_type.is_non_editable() => EditCommand::FocusPreviousEnd,
        Some(_) => EditCommand::MergeIntoPrevious,
        None if context.block.block_type != BlockType::Paragraph => {
            EditCommand::ConvertToParagraph
        }
        None => EditCommand::PassThrough,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(block_type: BlockType, content: &str) -> Block {
        Block::transient("doc-1", block_type, content, 1.0)
    }

    fn alone(block: &Block) -> KeyContext<'_> {
        KeyContext {
            block,
            previous: None,
            next: None,
            selected_blocks: 0,
        }
    }

    #[test]
    fn test_enter_splits_at_caret() {
        let paragraph = block(BlockType::Paragraph, "hello world");
        let input = KeyInput::new(Key::Enter, CaretContext::at(5));
        assert_eq!(
            interpret(&input, &alone(&paragraph)),
            EditCommand::Split { offset: 5 }
        );
    }

    #[test]
    fn test_enter_on_empty_list_item_escapes() {
        for block_type in [BlockType::BulletList, BlockType::NumberedList, BlockType::Todo] {
            let item = block(block_type, "");
            let input = KeyInput::new(Key::Enter, CaretContext::at(0));
            assert_eq!(
                interpret(&input, &alone(&item)),
                EditCommand::ConvertToParagraph
            );
        }
    }

    #[test]
    fn test_enter_passes_through_for_soft_breaks() {
        let code = block(BlockType::Code, "fn main() {}");
        let input = KeyInput::new(Key::Enter, CaretContext::at(3));
        assert_eq!(interpret(&input, &alone(&code)), EditCommand::PassThrough);

        let paragraph = block(BlockType::Paragraph, "line");
        let shifted = KeyInput::new(Key::Enter, CaretContext::at(2)).with_shift();
        assert_eq!(interpret(&shifted, &alone(&paragraph)), EditCommand::PassThrough);

        let mut ranged = CaretContext::at(2);
        ranged.collapsed = false;
        let input = KeyInput::new(Key::Enter, ranged);
        assert_eq!(interpret(&input, &alone(&paragraph)), EditCommand::PassThrough);
    }

    #[test]
    fn test_backspace_at_start() {
        let previous = block(BlockType::Paragraph, "abc");
        let divider = block(BlockType::Divider, "");
        let current = block(BlockType::Paragraph, "def");
        let input = KeyInput::new(Key::Backspace, CaretContext::at(0));

        let merge = KeyContext {
            previous: Some(&previous),
            ..alone(&current)
        };
        assert_eq!(interpret(&input, &merge), EditCommand::MergeIntoPrevious);

        let skip = KeyContext {
            previous: Some(&divider),
            ..alone(&current)
        };
        assert_eq!(interpret(&input, &skip), EditCommand::FocusPreviousEnd);

        let mid = KeyInput::new(Key::Backspace, CaretContext::at(2));
        assert_eq!(interpret(&mid, &merge), EditCommand::PassThrough);
    }

    #[test]
    fn test_backspace_on_first_block() {
        let heading = block(BlockType::Heading2, "Title");
        let paragraph = block(BlockType::Paragraph, "Body");
        let input = KeyInput::new(Key::Backspace, CaretContext::at(0));

        assert_eq!(
            interpret(&input, &alone(&heading)),
            EditCommand::ConvertToParagraph
        );
        assert_eq!(interpret(&input, &alone(&paragraph)), EditCommand::PassThrough);
    }

    #[test]
    fn test_arrows_cross_blocks_only_at_edges() {
        let previous = block(BlockType::Paragraph, "a");
        let current = block(BlockType::Paragraph, "b\nc");
        let next = block(BlockType::Paragraph, "d");
        let context = KeyContext {
            block: &current,
            previous: Some(&previous),
            next: Some(&next),
            selected_blocks: 0,
        };

        let mut caret = CaretContext::at(1);
        caret.on_last_line = false;
        assert_eq!(
            interpret(&KeyInput::new(Key::ArrowUp, caret), &context),
            EditCommand::FocusPreviousEnd
        );
        assert_eq!(
            interpret(&KeyInput::new(Key::ArrowDown, caret), &context),
            EditCommand::PassThrough
        );

        let first = KeyContext {
            previous: None,
            ..context
        };
        assert_eq!(
            interpret(&KeyInput::new(Key::ArrowUp, CaretContext::at(0)), &first),
            EditCommand::PassThrough
        );
    }

    #[test]
    fn test_slash_only_on_empty_paragraph() {
        let empty = block(BlockType::Paragraph, "");
        let full = block(BlockType::Paragraph, "a/b");
        let heading = block(BlockType::Heading1, "");
        let input = KeyInput::new(Key::Slash, CaretContext::at(0));

        assert_eq!(interpret(&input, &alone(&empty)), EditCommand::OpenSlashMenu);
        assert_eq!(interpret(&input, &alone(&full)), EditCommand::PassThrough);
        assert_eq!(interpret(&input, &alone(&heading)), EditCommand::PassThrough);
        assert!(!EditCommand::OpenSlashMenu.prevents_default());
    }

    #[test]
    fn test_multi_selection_delete_wins() {
        let current = block(BlockType::Paragraph, "text");
        let context = KeyContext {
            selected_blocks: 3,
            ..alone(&current)
        };
        let input = KeyInput::new(Key::Delete, CaretContext::at(2));
        assert_eq!(interpret(&input, &context), EditCommand::DeleteSelection);
    }

    #[test]
    fn test_tab_indents_list_items() {
        let item = block(BlockType::BulletList, "x");
        let input = KeyInput::new(Key::Tab, CaretContext::at(0));
        assert_eq!(interpret(&input, &alone(&item)), EditCommand::Indent);
        assert_eq!(
            interpret(&input.with_shift(), &alone(&item)),
            EditCommand::Outdent
        );
    }
}
