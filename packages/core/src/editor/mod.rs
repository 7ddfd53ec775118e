//! Block Editor Engine
//!
//! Everything between a keystroke and a persisted block:
//!
//! - [`store`] - Working copy of a document; every edit applies here first
//! - [`write_buffer`] - Which entities still need writing, and at which generation
//! - [`session`] - Debounced saves, immediate structural calls, retry and status
//! - [`keyboard`] - Maps keys plus caret context to edit commands
//! - [`selection`], [`slash_menu`], [`toolbar`] - Pointer and menu interactions
//! - [`focus`] - Applies one-shot focus requests to a host surface
//! - [`table_editor`] - Buffered cell editing for table blocks
//! - [`render`] - Per-type block views and HTML output
//! - [`ordering`] - Fractional sort orders for inserts and drags

pub mod error;
pub mod events;
pub mod focus;
pub mod geometry;
pub mod keyboard;
pub mod ordering;
pub mod render;
pub mod retry;
pub mod selection;
pub mod session;
pub mod slash_menu;
pub mod store;
pub mod table_editor;
pub mod toolbar;
pub mod write_buffer;


pub use error::EditorError;
pub use events::{EditorEvent, SaveStatus, EDITOR_EVENT_CHANNEL_CAPACITY};
pub use focus::{FocusApplier, FocusOutcome, SurfaceHost};
pub use geometry::{Point, Rect, Viewport};
pub use keyboard::{CaretContext, EditCommand, Key, KeyInput};
pub use retry::RetryPolicy;
pub use selection::{BlockLayout, BlockSelection};
pub use session::EditorSession;
pub use slash_menu::{MenuAction, SlashMenu};
pub use store::{DocumentStore, Effect};
pub use table_editor::TableEditor;
pub use toolbar::{InlineStyle, TextSelection, ToolbarAction};
pub use write_buffer::{SaveTarget, SyncState, WriteBuffer};
