//! Cross-block pointer selection
//!
//! Mouse-down on a block sets the anchor. Nothing is selected until the
//! pointer has travelled past a distance threshold; from then on every move
//! selects the anchor plus each block whose vertical midpoint lies between
//! the anchor's midpoint and the pointer.

use crate::editor::geometry::{Point, Rect};
use crate::models::BlockId;

/// Default drag distance before a range selection starts
pub const DRAG_THRESHOLD_PX: f32 = 4.0;

/// On-screen box of one rendered block, in document order
#[derive(Debug, Clone, PartialEq)]
pub struct BlockLayout {
    pub id: BlockId,
    pub rect: Rect,
}

impl BlockLayout {
    pub fn new(id: BlockId, rect: Rect) -> Self {
        Self { id, rect }
    }
}

#[derive(Debug, Clone)]
pub struct BlockSelection {
    threshold_px: f32,
    anchor: Option<BlockId>,
    pointer_origin: Option<Point>,
    dragging: bool,
    selected: Vec<BlockId>,
}

impl Default for BlockSelection {
    fn default() -> Self {
        Self::new(DRAG_THRESHOLD_PX)
    }
}

impl BlockSelection {
    pub fn new(threshold_px: f32) -> Self {
        Self {
            threshold_px: threshold_px.max(0.0),
            anchor: None,
            pointer_origin: None,
            dragging: false,
            selected: Vec::new(),
        }
    }

    /// Mouse-down on `anchor`; drops any previous selection
    pub fn begin(&mut self, anchor: BlockId, point: Point) {
        self.anchor = Some(anchor);
        self.pointer_origin = Some(point);
        self.dragging = false;
        self.selected.clear();
    }

    /// Pointer moved; returns whether the selected set changed
    pub fn update(&mut self, point: Point, layouts: &[BlockLayout]) -> bool {
        let (Some(anchor), Some(origin)) = (self.anchor.as_ref(), self.pointer_origin) else {
            return false;
        };

        if !self.dragging {
            if point.distance_squared(origin) < self.threshold_px * self.threshold_px {
                return false;
            }
            self.dragging = true;
        }

        let Some(anchor_mid) = layouts
            .iter()
            .find(|layout| &layout.id == anchor)
            .map(|layout| layout.rect.mid_y())
        else {
            // Anchor was removed mid-drag
            let changed = !self.selected.is_empty();
            self.clear();
            return changed;
        };

        let low = anchor_mid.min(point.y);
        let high = anchor_mid.max(point.y);
        let selected: Vec<BlockId> = layouts
            .iter()
            .filter(|layout| {
                let mid = layout.rect.mid_y();
                &layout.id == anchor || (low..=high).contains(&mid)
            })
            .map(|layout| layout.id.clone())
            .collect();

        if selected == self.selected {
            return false;
        }
        self.selected = selected;
        true
    }

    /// Mouse-up; the selection stays until cleared
    pub fn end(&mut self) -> bool {
        self.pointer_origin = None;
        let was_dragging = std::mem::replace(&mut self.dragging, false);
        if !was_dragging {
            self.anchor = None;
        }
        self.has_range()
    }

    pub fn clear(&mut self) {
        self.anchor = None;
        self.pointer_origin = None;
        self.dragging = false;
        self.selected.clear();
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Selected ids in document order
    pub fn selected(&self) -> &[BlockId] {
        &self.selected
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.selected.contains(id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// More than one block selected
    pub fn has_range(&self) -> bool {
        self.selected.len() > 1
    }
}
