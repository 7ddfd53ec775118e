//! Floating formatting toolbar
//!
//! Shown only while a non-collapsed text selection sits inside one editable
//! block. Inline actions wrap the selected characters in a tag; the rest are
//! block-level changes routed back through the store.

use crate::editor::geometry::{Point, Rect, Viewport};
use crate::models::{Block, BlockId, BlockType, TextAlign};
use crate::utils::html;

/// Rendered toolbar size used for placement
pub const TOOLBAR_WIDTH: f32 = 360.0;
pub const TOOLBAR_HEIGHT: f32 = 40.0;

const TOOLBAR_GAP: f32 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineStyle {
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
}

impl InlineStyle {
    pub fn tag(&self) -> &'static str {
        match self {
            InlineStyle::Bold => "b",
            InlineStyle::Italic => "i",
            InlineStyle::Underline => "u",
            InlineStyle::Strike => "s",
            InlineStyle::Code => "code",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolbarAction {
    Inline(InlineStyle),
    SetType(BlockType),
    Align(TextAlign),
    /// `None` resets to the default color
    Color(Option<String>),
}

/// A text selection inside one block, in visible-character offsets of its
/// content
#[derive(Debug, Clone, PartialEq)]
pub struct TextSelection {
    pub block_id: BlockId,
    pub start: usize,
    pub end: usize,
    /// Bounding box of the selected text
    pub rect: Rect,
}

impl TextSelection {
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Where the toolbar renders, or `None` when it must stay hidden
pub fn toolbar_position(
    block: &Block,
    selection: &TextSelection,
    viewport: Viewport,
) -> Option<Point> {
    if selection.is_collapsed()
        || selection.block_id != block.id
        || block.block_type.is_non_editable()
    {
        return None;
    }

    let max_left = (viewport.width - TOOLBAR_WIDTH).max(0.0);
    let left = (selection.rect.center_x() - TOOLBAR_WIDTH / 2.0).clamp(0.0, max_left);

    let above = selection.rect.top - TOOLBAR_GAP - TOOLBAR_HEIGHT;
    let top = if above >= 0.0 {
        above
    } else {
        // No room above; drop below the selection
        (selection.rect.bottom() + TOOLBAR_GAP).min((viewport.height - TOOLBAR_HEIGHT).max(0.0))
    };
    Some(Point::new(left, top))
}

/// Wrap the visible characters `start..end` of `content` in `style`'s tag
///
/// Offsets count visible characters, may run past the end and may be given
/// in either order. An empty range leaves the content unchanged.
pub fn wrap_inline(content: &str, start: usize, end: usize, style: InlineStyle) -> String {
    html::wrap_plain_range(content, start, end, style.tag())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(start: usize, end: usize, rect: Rect) -> TextSelection {
        TextSelection {
            block_id: BlockId::new("b1"),
            start,
            end,
            rect,
        }
    }

    fn paragraph() -> Block {
        let mut block = Block::transient("doc-1", BlockType::Paragraph, "hello world", 1.0);
        block.id = BlockId::new("b1");
        block
    }

    #[test]
    fn test_wrap_inline_tags_selected_range() {
        assert_eq!(
            wrap_inline("hello world", 6, 11, InlineStyle::Bold),
            "hello <b>world</b>"
        );
        assert_eq!(
            wrap_inline("héllo", 3, 0, InlineStyle::Code),
            "<code>hél</code>lo"
        );
        assert_eq!(wrap_inline("same", 2, 2, InlineStyle::Italic), "same");
    }

    #[test]
    fn test_wrap_inline_counts_visible_characters() {
        assert_eq!(
            wrap_inline("<b>hello</b> world", 6, 11, InlineStyle::Italic),
            "<b>hello</b> <i>world</i>"
        );
        assert_eq!(
            wrap_inline("a &amp; b", 4, 5, InlineStyle::Underline),
            "a &amp; <u>b</u>"
        );
    }

    #[test]
    fn test_hidden_for_collapsed_or_foreign_selection() {
        let block = paragraph();
        let viewport = Viewport::new(1280.0, 800.0);
        let rect = Rect::new(400.0, 300.0, 80.0, 20.0);

        assert!(toolbar_position(&block, &selection(3, 3, rect), viewport).is_none());

        let mut other = selection(0, 4, rect);
        other.block_id = BlockId::new("b2");
        assert!(toolbar_position(&block, &other, viewport).is_none());

        let mut divider = block.clone();
        divider.block_type = BlockType::Divider;
        assert!(toolbar_position(&divider, &selection(0, 4, rect), viewport).is_none());
    }

    #[test]
    fn test_centered_above_selection() {
        let position = toolbar_position(
            &paragraph(),
            &selection(0, 5, Rect::new(400.0, 300.0, 80.0, 20.0)),
            Viewport::new(1280.0, 800.0),
        )
        .unwrap();

        assert_eq!(position, Point::new(260.0, 252.0));
    }

    #[test]
    fn test_clamped_to_viewport() {
        let viewport = Viewport::new(1000.0, 800.0);

        let left_edge =
            toolbar_position(&paragraph(), &selection(0, 2, Rect::new(5.0, 10.0, 10.0, 20.0)), viewport)
                .unwrap();
        assert_eq!(left_edge.x, 0.0);
        // No room above the first line
        assert_eq!(left_edge.y, 38.0);

        let right_edge = toolbar_position(
            &paragraph(),
            &selection(0, 2, Rect::new(980.0, 300.0, 10.0, 20.0)),
            viewport,
        )
        .unwrap();
        assert_eq!(right_edge.x, 640.0);
    }
}
