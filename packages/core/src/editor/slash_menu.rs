//! Slash command menu
//!
//! Opened by `/` on an empty paragraph. Typing narrows the catalog, arrows
//! move the highlight (wrapping at both ends), Enter picks and Escape closes.
//! The menu sits below the caret unless it would run off the bottom of the
//! viewport, in which case it flips above.

use crate::editor::geometry::{Rect, Viewport};
use crate::editor::keyboard::Key;
use crate::models::{BlockId, BlockType};

/// Rendered menu height used for placement
pub const SLASH_MENU_HEIGHT: f32 = 320.0;

/// Gap between the caret and the menu edge
const MENU_OFFSET: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlashCommand {
    pub block_type: BlockType,
    pub label: &'static str,
    pub keywords: &'static [&'static str],
}

pub const SLASH_COMMANDS: [SlashCommand; 12] = [
    SlashCommand {
        block_type: BlockType::Paragraph,
        label: "Text",
        keywords: &["paragraph", "plain"],
    },
    SlashCommand {
        block_type: BlockType::Heading1,
        label: "Heading 1",
        keywords: &["h1", "title"],
    },
    SlashCommand {
        block_type: BlockType::Heading2,
        label: "Heading 2",
        keywords: &["h2", "subtitle"],
    },
    SlashCommand {
        block_type: BlockType::Heading3,
        label: "Heading 3",
        keywords: &["h3"],
    },
    SlashCommand {
        block_type: BlockType::BulletList,
        label: "Bulleted list",
        keywords: &["bullet", "ul", "unordered"],
    },
    SlashCommand {
        block_type: BlockType::NumberedList,
        label: "Numbered list",
        keywords: &["ol", "ordered"],
    },
    SlashCommand {
        block_type: BlockType::Todo,
        label: "To-do",
        keywords: &["todo", "task", "checkbox"],
    },
    SlashCommand {
        block_type: BlockType::Code,
        label: "Code",
        keywords: &["snippet", "pre"],
    },
    SlashCommand {
        block_type: BlockType::Quote,
        label: "Quote",
        keywords: &["blockquote", "citation"],
    },
    SlashCommand {
        block_type: BlockType::Divider,
        label: "Divider",
        keywords: &["hr", "separator", "line"],
    },
    SlashCommand {
        block_type: BlockType::Table,
        label: "Table",
        keywords: &["grid", "rows"],
    },
    SlashCommand {
        block_type: BlockType::AgentEmbed,
        label: "Agent",
        keywords: &["ai", "embed", "automation"],
    },
];

impl SlashCommand {
    fn matches(&self, query: &str) -> bool {
        query.is_empty()
            || self.label.to_lowercase().contains(query)
            || self.block_type.as_str().contains(query)
            || self.keywords.iter().any(|keyword| keyword.contains(query))
    }
}

/// Commands matching `query`, case-insensitive, in catalog order
pub fn filter_commands(query: &str) -> Vec<&'static SlashCommand> {
    let query = query.trim().to_lowercase();
    SLASH_COMMANDS
        .iter()
        .filter(|command| command.matches(&query))
        .collect()
}

/// Step `index` forward or backward through `len` items, wrapping at both ends
pub fn cycle_index(index: usize, len: usize, forward: bool) -> usize {
    if len == 0 {
        return 0;
    }
    if forward {
        (index + 1) % len
    } else if index == 0 {
        len - 1
    } else {
        (index - 1).min(len - 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MenuPlacement {
    pub left: f32,
    pub top: f32,
    pub above: bool,
}

/// Place the menu under the caret, flipping above when it would overflow
pub fn place_menu(caret: Rect, viewport: Viewport, menu_height: f32) -> MenuPlacement {
    let above = caret.bottom() + MENU_OFFSET + menu_height > viewport.height;
    let top = if above {
        (caret.top - MENU_OFFSET - menu_height).max(0.0)
    } else {
        caret.bottom() + MENU_OFFSET
    };
    MenuPlacement {
        left: caret.left,
        top,
        above,
    }
}

/// Result of a key press while the menu is open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// Key was not for the menu
    Ignored,
    Moved,
    Choose(BlockType),
    Close,
}

#[derive(Debug, Clone)]
pub struct SlashMenu {
    block_id: BlockId,
    query: String,
    selected_index: usize,
    placement: MenuPlacement,
}

impl SlashMenu {
    pub fn open(block_id: BlockId, caret: Rect, viewport: Viewport) -> Self {
        Self {
            block_id,
            query: String::new(),
            selected_index: 0,
            placement: place_menu(caret, viewport, SLASH_MENU_HEIGHT),
        }
    }

    pub fn block_id(&self) -> &BlockId {
        &self.block_id
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn placement(&self) -> MenuPlacement {
        self.placement
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    /// Update the filter text typed after the slash
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.selected_index = 0;
    }

    pub fn items(&self) -> Vec<&'static SlashCommand> {
        filter_commands(&self.query)
    }

    pub fn selected(&self) -> Option<&'static SlashCommand> {
        self.items().get(self.selected_index).copied()
    }

    pub fn handle_key(&mut self, key: Key) -> MenuAction {
        match key {
            Key::ArrowUp | Key::ArrowDown => {
                let len = self.items().len();
                if len > 0 {
                    self.selected_index =
                        cycle_index(self.selected_index, len, key == Key::ArrowDown);
                }
                MenuAction::Moved
            }
            Key::Enter => match self.selected() {
                Some(command) => MenuAction::Choose(command.block_type),
                None => MenuAction::Close,
            },
            Key::Escape => MenuAction::Close,
            _ => MenuAction::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu() -> SlashMenu {
        SlashMenu::open(
            BlockId::new("b1"),
            Rect::new(100.0, 200.0, 1.0, 20.0),
            Viewport::new(1280.0, 800.0),
        )
    }

    #[test]
    fn test_filter_matches_label_keywords_and_tag() {
        let types = |query: &str| -> Vec<BlockType> {
            filter_commands(query).iter().map(|c| c.block_type).collect()
        };

        assert_eq!(types("").len(), SLASH_COMMANDS.len());
        assert_eq!(
            types("HEAD"),
            vec![BlockType::Heading1, BlockType::Heading2, BlockType::Heading3]
        );
        assert_eq!(types("checkbox"), vec![BlockType::Todo]);
        assert_eq!(types("numbered_list"), vec![BlockType::NumberedList]);
        assert!(types("zzz").is_empty());
    }

    #[test]
    fn test_cycle_index_wraps() {
        assert_eq!(cycle_index(0, 3, true), 1);
        assert_eq!(cycle_index(2, 3, true), 0);
        assert_eq!(cycle_index(0, 3, false), 2);
        assert_eq!(cycle_index(0, 0, true), 0);
    }

    #[test]
    fn test_navigation_and_choice() {
        let mut menu = menu();
        menu.set_query("h");
        let first = menu.items()[0].block_type;

        assert_eq!(menu.handle_key(Key::ArrowUp), MenuAction::Moved);
        let last = *menu.items().last().unwrap();
        assert_eq!(menu.handle_key(Key::Enter), MenuAction::Choose(last.block_type));

        assert_eq!(menu.handle_key(Key::ArrowDown), MenuAction::Moved);
        assert_eq!(menu.handle_key(Key::Enter), MenuAction::Choose(first));
    }

    #[test]
    fn test_query_change_resets_highlight() {
        let mut menu = menu();
        menu.handle_key(Key::ArrowDown);
        assert_eq!(menu.selected_index(), 1);

        menu.set_query("quote");
        assert_eq!(menu.selected_index(), 0);
        assert_eq!(menu.handle_key(Key::Enter), MenuAction::Choose(BlockType::Quote));
    }

    #[test]
    fn test_enter_with_no_matches_closes() {
        let mut menu = menu();
        menu.set_query("nothing matches this");
        assert_eq!(menu.handle_key(Key::Enter), MenuAction::Close);
        assert_eq!(menu.handle_key(Key::Escape), MenuAction::Close);
        assert_eq!(menu.handle_key(Key::Backspace), MenuAction::Ignored);
    }

    #[test]
    fn test_placement_flips_above_near_bottom() {
        let viewport = Viewport::new(1280.0, 800.0);

        let below = place_menu(Rect::new(50.0, 100.0, 1.0, 20.0), viewport, 320.0);
        assert!(!below.above);
        assert_eq!(below.top, 124.0);

        let flipped = place_menu(Rect::new(50.0, 600.0, 1.0, 20.0), viewport, 320.0);
        assert!(flipped.above);
        assert_eq!(flipped.top, 276.0);
        assert_eq!(flipped.left, 50.0);
    }
}
