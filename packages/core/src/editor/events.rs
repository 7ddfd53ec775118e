//! Editor Events
//!
//! Events published by an `EditorSession` so a host can react to save
//! progress, placeholder confirmation and focus changes without polling.
//!
//! # Architecture
//!
//! Events go out over a tokio broadcast channel, so any number of subscribers
//! (status bar, toast layer, renderer) can listen independently. Sends with no
//! subscribers are ignored.

use crate::editor::SaveTarget;
use crate::models::{BlockId, FocusRequest};

/// Default capacity of the event channel
pub const EDITOR_EVENT_CHANNEL_CAPACITY: usize = 128;

/// Save indicator state shown next to the document title
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    /// Last flush gave up after retrying; edits are still held locally
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    SaveStatusChanged(SaveStatus),

    /// A placeholder block was created on the server
    BlockConfirmed { placeholder: BlockId, id: BlockId },

    /// A write gave up after its retry budget
    SaveFailed { target: SaveTarget, message: String },

    /// Keyboard focus should move; the renderer consumes it via the session
    FocusRequested(FocusRequest),
}

impl EditorEvent {
    /// Get a string representation of the event type
    pub fn event_type(&self) -> &str {
        match self {
            EditorEvent::SaveStatusChanged(_) => "save:status",
            EditorEvent::BlockConfirmed { .. } => "block:confirmed",
            EditorEvent::SaveFailed { .. } => "save:failed",
            EditorEvent::FocusRequested(_) => "focus:requested",
        }
    }
}
