//! Editor Session
//!
//! `EditorSession` owns the working copy of one document for the lifetime of
//! an editing session and runs the save pipeline against a [`DocumentApi`].
//!
//! # Architecture
//!
//! - **Local-first**: every edit applies to the in-memory [`DocumentStore`]
//!   immediately; network persistence is never awaited by the edit itself
//! - **Debounced content writes**: title, content and metadata edits mark the
//!   entity dirty and restart a debounce timer; when it fires, one flush
//!   writes the title and then every dirty confirmed block
//! - **Immediate structural writes**: creates, deletes, reorders and todo
//!   toggles are sent right away as tracked background tasks
//! - **Single flush in flight**: flushes are serialized; edits made during a
//!   flush keep their entity dirty for the next one
//! - **Retry, then surface**: every write goes through the [`RetryPolicy`]; a
//!   write that still fails leaves its entity dirty, sets
//!   [`SaveStatus::Failed`] and broadcasts [`EditorEvent::SaveFailed`]
//!
//! # Examples
//!
//! ```no_run
//! # use agentboard_core::client::{ClientConfig, HttpClient};
//! # use agentboard_core::config::EditorConfig;
//! # use agentboard_core::editor::EditorSession;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new(ClientConfig::new("http://localhost:8080"))?;
//! let session = EditorSession::open(client, "doc-1", EditorConfig::default()).await?;
//!
//! session.set_title("Launch plan").await?;
//! let first = session.blocks().await[0].id.clone();
//! session.update_content(&first, "Ship on Friday").await?;
//!
//! // Wait for every pending write before leaving the page
//! session.settle().await?;
//! session.close();
//! # Ok(())
//! # }
//! ```

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, watch, Mutex, Notify};

use crate::client::{ApiError, DocumentApi};
use crate::config::EditorConfig;
use crate::editor::events::{EditorEvent, SaveStatus};
use crate::editor::focus::{FocusApplier, FocusOutcome, SurfaceHost};
use crate::editor::geometry::{Point, Rect, Viewport};
use crate::editor::keyboard::{self, EditCommand, Key, KeyContext, KeyInput};
use crate::editor::retry::RetryPolicy;
use crate::editor::selection::{BlockLayout, BlockSelection};
use crate::editor::slash_menu::{MenuAction, SlashMenu};
use crate::editor::store::{DocumentStore, Effect, PendingWrite};
use crate::editor::table_editor::TableEditor;
use crate::editor::toolbar::{self, TextSelection, ToolbarAction};
use crate::editor::{EditorError, SaveTarget};
use crate::markdown;
use crate::models::{
    Block, BlockDraft, BlockId, BlockMeta, BlockType, Document, FocusRequest, TableData,
};

/// Rounds of wait-then-flush `settle` runs before reporting what is left
const MAX_SETTLE_ROUNDS: usize = 8;

struct Shared<A> {
    api: A,
    document_id: String,
    config: EditorConfig,
    retry: RetryPolicy,

    store: Mutex<DocumentStore>,
    tables: Mutex<HashMap<BlockId, TableEditor>>,
    selection: Mutex<BlockSelection>,
    slash_menu: Mutex<Option<SlashMenu>>,

    status: watch::Sender<SaveStatus>,
    event_tx: broadcast::Sender<EditorEvent>,

    /// Bumped on every debounced edit; a timer only flushes for the epoch it saw
    debounce_epoch: AtomicU64,
    closed: AtomicBool,
    flush_guard: Mutex<()>,
    order_guard: Mutex<()>,

    /// Structural calls still running
    inflight: AtomicUsize,
    idle: Notify,
}

/// Editing session for one document
pub struct EditorSession<A> {
    shared: Arc<Shared<A>>,
}

// Manual Clone implementation because A doesn't need to be Clone
impl<A> Clone for EditorSession<A> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<A> EditorSession<A>
where
    A: DocumentApi + 'static,
{
    /// Fetch a document once and start editing it
    pub async fn open(api: A, document_id: &str, config: EditorConfig) -> Result<Self, EditorError> {
        let document = api
            .get_document(document_id)
            .await
            .map_err(|source| EditorError::LoadFailed {
                document_id: document_id.to_string(),
                source,
            })?;
        tracing::info!(
            "Opened document {} with {} block(s)",
            document.id,
            document.blocks.len()
        );
        Ok(Self::new(api, document, config))
    }

    /// Start editing an already loaded document
    pub fn new(api: A, document: Document, config: EditorConfig) -> Self {
        let (status, _) = watch::channel(SaveStatus::Idle);
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));

        Self {
            shared: Arc::new(Shared {
                document_id: document.id.clone(),
                retry: config.retry_policy(),
                selection: Mutex::new(BlockSelection::new(config.drag_threshold_px)),
                store: Mutex::new(DocumentStore::new(document)),
                tables: Mutex::new(HashMap::new()),
                slash_menu: Mutex::new(None),
                status,
                event_tx,
                debounce_epoch: AtomicU64::new(0),
                closed: AtomicBool::new(false),
                flush_guard: Mutex::new(()),
                order_guard: Mutex::new(()),
                inflight: AtomicUsize::new(0),
                idle: Notify::new(),
                config,
                api,
            }),
        }
    }

    pub fn document_id(&self) -> &str {
        &self.shared.document_id
    }

    pub fn config(&self) -> &EditorConfig {
        &self.shared.config
    }

    /// Snapshot of the working copy
    pub async fn document(&self) -> Document {
        self.shared.store.lock().await.document().clone()
    }

    pub async fn blocks(&self) -> Vec<Block> {
        self.shared.store.lock().await.blocks().to_vec()
    }

    pub async fn block(&self, id: &BlockId) -> Option<Block> {
        self.shared.store.lock().await.block(id).cloned()
    }

    pub async fn has_unsaved_changes(&self) -> bool {
        self.shared.store.lock().await.has_unsaved_changes()
    }

    pub fn save_status(&self) -> SaveStatus {
        self.shared.status.borrow().clone()
    }

    /// Watch the save indicator
    pub fn watch_status(&self) -> watch::Receiver<SaveStatus> {
        self.shared.status.subscribe()
    }

    /// Subscribe to editor events
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use agentboard_core::client::{ClientConfig, HttpClient};
    /// # use agentboard_core::config::EditorConfig;
    /// # use agentboard_core::editor::{EditorEvent, EditorSession};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// # let client = HttpClient::new(ClientConfig::new("http://localhost:8080"))?;
    /// # let session = EditorSession::open(client, "doc-1", EditorConfig::default()).await?;
    /// let mut rx = session.subscribe_to_events();
    /// tokio::spawn(async move {
    ///     while let Ok(event) = rx.recv().await {
    ///         if let EditorEvent::SaveFailed { target, message } = event {
    ///             eprintln!("Could not save {}: {}", target, message);
    ///         }
    ///     }
    /// });
    /// # Ok(())
    /// # }
    /// ```
    pub fn subscribe_to_events(&self) -> broadcast::Receiver<EditorEvent> {
        self.shared.event_tx.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Stop the session's timers
    ///
    /// Requests already in flight run to completion. Edits that were only
    /// waiting on the debounce are not written; call [`settle`](Self::settle)
    /// first to persist them.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.debounce_epoch.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("Closed editor session for document {}", self.shared.document_id);
    }

    fn ensure_open(&self) -> Result<(), EditorError> {
        if self.is_closed() {
            Err(EditorError::Closed)
        } else {
            Ok(())
        }
    }

    /// Ignores errors if no subscribers
    fn emit_event(&self, event: EditorEvent) {
        let _ = self.shared.event_tx.send(event);
    }

    fn set_status(&self, status: SaveStatus) {
        let changed = self.shared.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status.clone();
                true
            }
        });
        if changed {
            self.emit_event(EditorEvent::SaveStatusChanged(status));
        }
    }

    fn report_failure(&self, target: SaveTarget, error: &ApiError) {
        let message = error.to_string();
        tracing::error!("Failed to save {}: {}", target, message);
        self.set_status(SaveStatus::Failed {
            message: message.clone(),
        });
        self.emit_event(EditorEvent::SaveFailed { target, message });
    }

    /// Run one store mutation and dispatch the effects it reports
    async fn edit<R>(
        &self,
        mutation: impl FnOnce(&mut DocumentStore) -> Result<(R, Vec<Effect>), EditorError>,
    ) -> Result<R, EditorError> {
        self.ensure_open()?;
        let (value, effects) = {
            let mut store = self.shared.store.lock().await;
            mutation(&mut store)?
        };
        self.apply_effects(effects);
        Ok(value)
    }

    fn apply_effects(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ScheduleSave => self.schedule_flush(),
                Effect::Create { placeholder, draft } => {
                    let session = self.clone();
                    self.spawn_tracked(async move { session.send_create(placeholder, draft).await });
                }
                Effect::Delete(id) => {
                    let session = self.clone();
                    self.spawn_tracked(async move { session.send_delete(id).await });
                }
                Effect::Reorder(_) => {
                    let session = self.clone();
                    self.spawn_tracked(async move { session.send_reorder().await });
                }
                Effect::WriteNow(id) => {
                    let session = self.clone();
                    self.spawn_tracked(async move { session.write_now(id).await });
                }
                Effect::Focus(request) => self.emit_event(EditorEvent::FocusRequested(request)),
            }
        }
    }

    fn spawn_tracked<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.shared.inflight.fetch_add(1, Ordering::SeqCst);
        let shared = self.shared.clone();
        tokio::spawn(async move {
            task.await;
            if shared.inflight.fetch_sub(1, Ordering::SeqCst) == 1 {
                shared.idle.notify_waiters();
            }
        });
    }

    async fn wait_idle(&self) {
        loop {
            // Registered before the check so a wakeup in between is not lost
            let notified = self.shared.idle.notified();
            if self.shared.inflight.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    // ---- Save pipeline ----

    /// Restart the debounce timer
    fn schedule_flush(&self) {
        if self.is_closed() {
            return;
        }
        let epoch = self.shared.debounce_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = self.shared.config.debounce();
        let session = self.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if session.is_closed()
                || session.shared.debounce_epoch.load(Ordering::SeqCst) != epoch
            {
                return;
            }
            // Failures are surfaced through status and events
            let _ = session.flush().await;
        });
    }

    /// Flush immediately, skipping the debounce
    pub async fn flush_now(&self) -> Result<(), EditorError> {
        self.shared.debounce_epoch.fetch_add(1, Ordering::SeqCst);
        self.commit_tables().await;
        self.flush().await
    }

    /// Wait until every structural call has finished and every pending write
    /// has been flushed
    ///
    /// Returns an error naming what is still unsaved if anything failed.
    pub async fn settle(&self) -> Result<(), EditorError> {
        let mut result = Ok(());
        for _ in 0..MAX_SETTLE_ROUNDS {
            self.wait_idle().await;
            result = self.flush_now().await;
            if self.shared.inflight.load(Ordering::SeqCst) == 0 {
                break;
            }
        }
        self.wait_idle().await;
        result?;

        let store = self.shared.store.lock().await;
        if !store.has_unsaved_changes() {
            return Ok(());
        }
        let message = match self.save_status() {
            SaveStatus::Failed { message } => message,
            _ => "changes are still pending".to_string(),
        };
        Err(EditorError::SaveFailed {
            targets: store.unsaved_targets(),
            message,
        })
    }

    async fn flush(&self) -> Result<(), EditorError> {
        let _guard = self.shared.flush_guard.lock().await;

        let (writes, structural) = {
            let mut store = self.shared.store.lock().await;
            let mut structural: Vec<Effect> = store
                .take_failed_creates()
                .into_iter()
                .map(|(placeholder, draft)| Effect::Create { placeholder, draft })
                .collect();
            structural.extend(store.take_failed_deletes().into_iter().map(Effect::Delete));
            structural.extend(store.take_pending_reorder().map(Effect::Reorder));
            (store.take_batch(), structural)
        };

        if !structural.is_empty() {
            tracing::debug!("Re-sending {} structural change(s)", structural.len());
            self.apply_effects(structural);
        }
        if writes.is_empty() {
            return Ok(());
        }

        tracing::debug!(
            "Flushing {} pending write(s) for document {}",
            writes.len(),
            self.shared.document_id
        );
        self.set_status(SaveStatus::Saving);

        let mut failures = Vec::new();
        for write in writes {
            let target = write.target();
            let result = self.send_write(&write).await;

            let mut store = self.shared.store.lock().await;
            match result {
                Ok(()) => store.complete_write(&target, write.generation()),
                Err(e) => {
                    store.fail_write(&target);
                    failures.push((target, e));
                }
            }
        }

        let Some((_, last_error)) = failures.last() else {
            self.set_status(SaveStatus::Saved);
            return Ok(());
        };
        let message = last_error.to_string();
        let targets = failures.iter().map(|(target, _)| target.clone()).collect();
        for (target, error) in &failures {
            self.report_failure(target.clone(), error);
        }
        Err(EditorError::SaveFailed { targets, message })
    }

    async fn send_write(&self, write: &PendingWrite) -> Result<(), ApiError> {
        let api = &self.shared.api;
        let document_id = self.shared.document_id.as_str();

        match write {
            PendingWrite::Title { title, .. } => {
                self.shared
                    .retry
                    .run("update title", move || api.update_title(document_id, title))
                    .await
            }
            PendingWrite::Block { id, update, .. } => {
                self.shared
                    .retry
                    .run("update block", move || api.update_block(document_id, id, update))
                    .await
            }
        }
    }

    async fn write_now(&self, id: BlockId) {
        let target = SaveTarget::Block(id);
        let write = self.shared.store.lock().await.take_write(&target);
        let Some(write) = write else {
            // Already riding a flush; make sure a later one picks it up
            self.schedule_flush();
            return;
        };

        let result = self.send_write(&write).await;
        let mut store = self.shared.store.lock().await;
        match result {
            Ok(()) => store.complete_write(&target, write.generation()),
            Err(e) => {
                store.fail_write(&target);
                drop(store);
                self.report_failure(target, &e);
            }
        }
    }

    async fn send_create(&self, placeholder: BlockId, draft: BlockDraft) {
        let api = &self.shared.api;
        let document_id = self.shared.document_id.as_str();
        let payload = &draft;

        let result = self
            .shared
            .retry
            .run("create block", move || api.create_block(document_id, payload))
            .await;

        match result {
            Ok(server) => {
                let confirmed = server.id.clone();
                let effects = self
                    .shared
                    .store
                    .lock()
                    .await
                    .confirm_block(&placeholder, server);
                self.rekey_table(&placeholder, &confirmed).await;

                tracing::debug!("Block {} confirmed as {}", placeholder, confirmed);
                self.emit_event(EditorEvent::BlockConfirmed {
                    placeholder,
                    id: confirmed,
                });
                self.apply_effects(effects);
            }
            Err(e) => {
                self.shared.store.lock().await.create_failed(&placeholder);
                self.report_failure(SaveTarget::Block(placeholder), &e);
            }
        }
    }

    async fn send_delete(&self, id: BlockId) {
        let api = &self.shared.api;
        let document_id = self.shared.document_id.as_str();
        let block_id = &id;

        let result = self
            .shared
            .retry
            .run("delete block", move || api.delete_block(document_id, block_id))
            .await;

        match result {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!("Block {} was already gone on the server", id);
            }
            Err(e) => {
                self.shared.store.lock().await.delete_failed(&id);
                self.report_failure(SaveTarget::Block(id), &e);
            }
        }
    }

    /// Send the current ordering; concurrent reorders collapse to the latest
    async fn send_reorder(&self) {
        let _order = self.shared.order_guard.lock().await;

        let entries = {
            let mut store = self.shared.store.lock().await;
            match store.order_entries() {
                Some(entries) => entries,
                None => {
                    store.mark_reorder_pending();
                    return;
                }
            }
        };

        let api = &self.shared.api;
        let document_id = self.shared.document_id.as_str();
        let order = entries.as_slice();
        let result = self
            .shared
            .retry
            .run("reorder blocks", move || api.reorder_blocks(document_id, order))
            .await;

        if let Err(e) = result {
            self.shared.store.lock().await.mark_reorder_pending();
            self.report_failure(SaveTarget::Order, &e);
        }
    }

    // ---- Content edits ----

    pub async fn set_title(&self, title: impl Into<String>) -> Result<(), EditorError> {
        let title = title.into();
        self.edit(|store| Ok(((), store.set_title(title)))).await
    }

    pub async fn update_content(
        &self,
        id: &BlockId,
        content: impl Into<String>,
    ) -> Result<(), EditorError> {
        let content = content.into();
        self.edit(|store| Ok(((), store.update_content(id, content)?)))
            .await
    }

    pub async fn update_meta(&self, id: &BlockId, meta: BlockMeta) -> Result<(), EditorError> {
        self.edit(|store| Ok(((), store.update_meta(id, meta)?))).await
    }

    pub async fn set_indent(&self, id: &BlockId, level: u32) -> Result<(), EditorError> {
        self.edit(|store| Ok(((), store.set_indent(id, level)?))).await
    }

    /// Flip a todo checkbox; written without waiting for the debounce
    pub async fn toggle_todo(&self, id: &BlockId) -> Result<(), EditorError> {
        self.edit(|store| Ok(((), store.toggle_todo(id)?))).await
    }

    pub async fn change_type(&self, id: &BlockId, block_type: BlockType) -> Result<(), EditorError> {
        self.edit(|store| Ok(((), store.change_type(id, block_type)?)))
            .await?;
        self.prune_tables().await;
        Ok(())
    }

    pub async fn convert_to_paragraph(&self, id: &BlockId) -> Result<(), EditorError> {
        self.edit(|store| Ok(((), store.convert_to_paragraph(id)?)))
            .await
    }

    // ---- Structural edits ----

    /// Insert a block after `after` (or at the top); returns its placeholder id
    pub async fn insert_after(
        &self,
        after: Option<&BlockId>,
        block_type: BlockType,
        content: impl Into<String>,
    ) -> Result<BlockId, EditorError> {
        let content = content.into();
        self.edit(|store| store.insert_after(after, block_type, content))
            .await
    }

    pub async fn append(
        &self,
        block_type: BlockType,
        content: impl Into<String>,
    ) -> Result<BlockId, EditorError> {
        let content = content.into();
        self.edit(|store| Ok(store.append(block_type, content))).await
    }

    pub async fn duplicate(&self, id: &BlockId) -> Result<BlockId, EditorError> {
        self.edit(|store| store.duplicate(id)).await
    }

    /// Paste markdown after `after` (or at the top); returns the new block ids
    ///
    /// The caret lands at the end of the last pasted block.
    pub async fn paste_markdown(
        &self,
        after: Option<&BlockId>,
        markdown: &str,
    ) -> Result<Vec<BlockId>, EditorError> {
        let drafts = markdown::blocks_from_markdown(markdown);
        if drafts.is_empty() {
            return Ok(Vec::new());
        }

        self.edit(|store| {
            let mut anchor = after.cloned();
            let mut ids = Vec::with_capacity(drafts.len());
            let mut effects = Vec::new();
            for draft in drafts {
                let (id, inserted) = store.insert_draft_after(anchor.as_ref(), draft)?;
                effects.extend(inserted.into_iter().filter(|e| !matches!(e, Effect::Focus(_))));
                anchor = Some(id.clone());
                ids.push(id);
            }
            if let Some(last) = anchor {
                effects.push(store.request_focus(FocusRequest::end(last)));
            }
            Ok((ids, effects))
        })
        .await
    }

    /// The working copy as markdown
    pub async fn to_markdown(&self) -> String {
        markdown::document_to_markdown(self.shared.store.lock().await.document())
    }

    pub async fn remove(&self, id: &BlockId) -> Result<(), EditorError> {
        self.edit(|store| Ok(((), store.remove(id)?))).await?;
        self.prune_tables().await;
        Ok(())
    }

    /// Drag reorder: move the block at `from` to index `to`
    pub async fn move_block(&self, from: usize, to: usize) -> Result<(), EditorError> {
        self.edit(|store| Ok(((), store.move_block(from, to)?))).await
    }

    /// Drag reorder by id
    pub async fn move_block_to(&self, id: &BlockId, to: usize) -> Result<(), EditorError> {
        self.edit(|store| {
            let from = store
                .position(id)
                .ok_or_else(|| EditorError::block_not_found(id))?;
            Ok(((), store.move_block(from, to)?))
        })
        .await
    }

    /// Split a text block at a character offset; returns the new block's id
    pub async fn split_at(&self, id: &BlockId, offset: usize) -> Result<BlockId, EditorError> {
        self.edit(|store| store.split_at(id, offset)).await
    }

    pub async fn merge_into_previous(&self, id: &BlockId) -> Result<(), EditorError> {
        self.edit(|store| Ok(((), store.merge_into_previous(id)?)))
            .await?;
        self.prune_tables().await;
        Ok(())
    }

    // ---- Keyboard ----

    /// Interpret a key press in `block_id` and apply the resulting command
    ///
    /// While the slash menu is open, route navigation keys through
    /// [`slash_menu_key`](Self::slash_menu_key) instead.
    pub async fn handle_key(
        &self,
        block_id: &BlockId,
        input: KeyInput,
    ) -> Result<EditCommand, EditorError> {
        self.ensure_open()?;
        let selected_blocks = self.shared.selection.lock().await.len();
        let command = {
            let store = self.shared.store.lock().await;
            let block = store
                .block(block_id)
                .ok_or_else(|| EditorError::block_not_found(block_id))?;
            keyboard::interpret(
                &input,
                &KeyContext {
                    block,
                    previous: store.previous(block_id),
                    next: store.next(block_id),
                    selected_blocks,
                },
            )
        };

        match command {
            EditCommand::Split { offset } => {
                self.split_at(block_id, offset).await?;
            }
            EditCommand::ConvertToParagraph => self.convert_to_paragraph(block_id).await?,
            EditCommand::MergeIntoPrevious => self.merge_into_previous(block_id).await?,
            EditCommand::FocusPreviousEnd => {
                self.edit(|store| {
                    let target = store.previous(block_id).map(|block| block.id.clone());
                    let effects = match target {
                        Some(id) => vec![store.request_focus(FocusRequest::end(id))],
                        None => Vec::new(),
                    };
                    Ok(((), effects))
                })
                .await?
            }
            EditCommand::FocusNextStart => {
                self.edit(|store| {
                    let target = store.next(block_id).map(|block| block.id.clone());
                    let effects = match target {
                        Some(id) => vec![store.request_focus(FocusRequest::start(id))],
                        None => Vec::new(),
                    };
                    Ok(((), effects))
                })
                .await?
            }
            EditCommand::DeleteSelection => {
                self.delete_selection().await?;
            }
            EditCommand::Indent | EditCommand::Outdent => {
                self.edit(|store| {
                    let level = store
                        .block(block_id)
                        .map(|block| block.indent_level)
                        .unwrap_or_default();
                    let level = if command == EditCommand::Indent {
                        level + 1
                    } else {
                        level.saturating_sub(1)
                    };
                    Ok(((), store.set_indent(block_id, level)?))
                })
                .await?
            }
            // The host opens the menu with the caret's geometry
            EditCommand::OpenSlashMenu | EditCommand::PassThrough => {}
        }
        Ok(command)
    }

    // ---- Cross-block selection ----

    pub async fn begin_selection(&self, anchor: BlockId, point: Point) {
        self.shared.selection.lock().await.begin(anchor, point);
    }

    /// Returns whether the selected set changed
    pub async fn update_selection(&self, point: Point, layouts: &[BlockLayout]) -> bool {
        self.shared.selection.lock().await.update(point, layouts)
    }

    /// Returns whether more than one block ended up selected
    pub async fn end_selection(&self) -> bool {
        self.shared.selection.lock().await.end()
    }

    pub async fn clear_selection(&self) {
        self.shared.selection.lock().await.clear();
    }

    pub async fn selected_blocks(&self) -> Vec<BlockId> {
        self.shared.selection.lock().await.selected().to_vec()
    }

    /// Delete every selected block; returns how many were removed
    pub async fn delete_selection(&self) -> Result<usize, EditorError> {
        let selected = {
            let mut selection = self.shared.selection.lock().await;
            let ids = selection.selected().to_vec();
            selection.clear();
            ids
        };
        if selected.is_empty() {
            return Ok(0);
        }

        let removed = self
            .edit(|store| {
                let live: Vec<BlockId> = selected
                    .into_iter()
                    .filter(|id| store.block(id).is_some())
                    .collect();
                let effects = store.remove_many(&live)?;
                Ok((live.len(), effects))
            })
            .await?;
        self.prune_tables().await;
        Ok(removed)
    }

    // ---- Slash menu ----

    pub async fn open_slash_menu(
        &self,
        block_id: BlockId,
        caret: Rect,
        viewport: Viewport,
    ) -> Result<(), EditorError> {
        self.ensure_open()?;
        if self.shared.store.lock().await.block(&block_id).is_none() {
            return Err(EditorError::block_not_found(&block_id));
        }
        *self.shared.slash_menu.lock().await = Some(SlashMenu::open(block_id, caret, viewport));
        Ok(())
    }

    pub async fn slash_menu(&self) -> Option<SlashMenu> {
        self.shared.slash_menu.lock().await.clone()
    }

    /// Update the filter typed after the slash
    pub async fn set_slash_query(&self, query: impl Into<String>) {
        if let Some(menu) = self.shared.slash_menu.lock().await.as_mut() {
            menu.set_query(query);
        }
    }

    pub async fn close_slash_menu(&self) {
        *self.shared.slash_menu.lock().await = None;
    }

    /// Route a key to the open slash menu, applying a chosen block type
    pub async fn slash_menu_key(&self, key: Key) -> Result<MenuAction, EditorError> {
        let (action, block_id) = {
            let mut slot = self.shared.slash_menu.lock().await;
            let Some(menu) = slot.as_mut() else {
                return Ok(MenuAction::Ignored);
            };
            let action = menu.handle_key(key);
            let block_id = menu.block_id().clone();
            if matches!(action, MenuAction::Choose(_) | MenuAction::Close) {
                *slot = None;
            }
            (action, block_id)
        };

        if let MenuAction::Choose(block_type) = action {
            self.choose_block_type(&block_id, block_type).await?;
        }
        Ok(action)
    }

    /// Apply a slash-menu choice
    ///
    /// Clears the typed `/query`. Choosing a type without a caret (divider,
    /// table, agent) also inserts an empty paragraph after it and focuses it.
    pub async fn choose_block_type(
        &self,
        id: &BlockId,
        block_type: BlockType,
    ) -> Result<(), EditorError> {
        self.edit(|store| {
            let typed_command = store
                .block(id)
                .ok_or_else(|| EditorError::block_not_found(id))?
                .content
                .trim_start()
                .starts_with('/');

            let mut effects = Vec::new();
            if typed_command {
                effects.extend(store.update_content(id, "")?);
            }
            effects.extend(store.change_type(id, block_type)?);
            if block_type.is_non_editable() {
                let (_, inserted) = store.insert_after(Some(id), BlockType::Paragraph, "")?;
                effects.extend(inserted);
            }
            Ok(((), effects))
        })
        .await
    }

    // ---- Toolbar ----

    /// Where the formatting toolbar renders for `selection`, if visible
    pub async fn toolbar_position(
        &self,
        selection: &TextSelection,
        viewport: Viewport,
    ) -> Option<Point> {
        let store = self.shared.store.lock().await;
        let block = store.block(&selection.block_id)?;
        toolbar::toolbar_position(block, selection, viewport)
    }

    pub async fn apply_toolbar(
        &self,
        selection: &TextSelection,
        action: ToolbarAction,
    ) -> Result<(), EditorError> {
        let id = &selection.block_id;
        self.edit(|store| {
            let block = store
                .block(id)
                .ok_or_else(|| EditorError::block_not_found(id))?;
            let effects = match action {
                ToolbarAction::Inline(style) => {
                    let content =
                        toolbar::wrap_inline(&block.content, selection.start, selection.end, style);
                    store.update_content(id, content)?
                }
                ToolbarAction::SetType(block_type) => store.change_type(id, block_type)?,
                ToolbarAction::Align(align) => {
                    let mut meta = block.meta.clone();
                    meta.align = Some(align);
                    store.update_meta(id, meta)?
                }
                ToolbarAction::Color(color) => {
                    let mut meta = block.meta.clone();
                    meta.color = color;
                    store.update_meta(id, meta)?
                }
            };
            Ok(((), effects))
        })
        .await
    }

    // ---- Tables ----

    /// Current rows of a table block, including uncommitted edits
    pub async fn table(&self, id: &BlockId) -> Option<TableData> {
        if let Some(editor) = self.shared.tables.lock().await.get(id) {
            return Some(editor.table().clone());
        }
        let store = self.shared.store.lock().await;
        TableEditor::from_block(store.block(id)?)
            .ok()
            .map(|editor| editor.table().clone())
    }

    pub async fn table_set_cell(
        &self,
        id: &BlockId,
        row: usize,
        column: usize,
        text: impl Into<String>,
    ) -> Result<bool, EditorError> {
        let text = text.into();
        self.with_table(id, |editor| editor.set_cell(row, column, text))
            .await
    }

    pub async fn table_add_row(&self, id: &BlockId, after: Option<usize>) -> Result<bool, EditorError> {
        self.with_table(id, |editor| editor.add_row(after)).await
    }

    /// Returns false at the one-row floor
    pub async fn table_delete_row(&self, id: &BlockId, index: usize) -> Result<bool, EditorError> {
        self.with_table(id, |editor| editor.delete_row(index)).await
    }

    pub async fn table_add_column(
        &self,
        id: &BlockId,
        after: Option<usize>,
    ) -> Result<bool, EditorError> {
        self.with_table(id, |editor| editor.add_column(after)).await
    }

    /// Returns false at the one-column floor
    pub async fn table_delete_column(
        &self,
        id: &BlockId,
        index: usize,
    ) -> Result<bool, EditorError> {
        self.with_table(id, |editor| editor.delete_column(index))
            .await
    }

    async fn with_table(
        &self,
        id: &BlockId,
        change: impl FnOnce(&mut TableEditor) -> bool,
    ) -> Result<bool, EditorError> {
        self.ensure_open()?;
        let block = self
            .shared
            .store
            .lock()
            .await
            .block(id)
            .cloned()
            .ok_or_else(|| EditorError::block_not_found(id))?;

        let (changed, epoch) = {
            let mut tables = self.shared.tables.lock().await;
            let editor = match tables.entry(id.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => entry.insert(TableEditor::from_block(&block)?),
            };
            let changed = change(editor);
            (changed, editor.epoch())
        };

        if changed {
            self.schedule_table_commit(id.clone(), epoch);
        }
        Ok(changed)
    }

    fn schedule_table_commit(&self, id: BlockId, epoch: u64) {
        let delay = self.shared.config.table_debounce();
        let session = self.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if session.is_closed() {
                return;
            }
            let table = {
                let mut tables = session.shared.tables.lock().await;
                match tables.get_mut(&id) {
                    Some(editor) if editor.epoch() == epoch => editor.take_commit(),
                    _ => None,
                }
            };
            if let Some(table) = table {
                if let Err(e) = session
                    .edit(|store| Ok(((), store.set_table_rows(&id, table)?)))
                    .await
                {
                    tracing::warn!("Dropping table edit for block {}: {}", id, e);
                }
            }
        });
    }

    /// Commit every table buffer with uncommitted edits
    async fn commit_tables(&self) {
        let commits: Vec<(BlockId, TableData)> = {
            let mut tables = self.shared.tables.lock().await;
            tables
                .iter_mut()
                .filter_map(|(id, editor)| editor.take_commit().map(|table| (id.clone(), table)))
                .collect()
        };
        if commits.is_empty() {
            return;
        }

        let effects = {
            let mut store = self.shared.store.lock().await;
            let mut effects = Vec::new();
            for (id, table) in commits {
                match store.set_table_rows(&id, table) {
                    Ok(committed) => effects.extend(committed),
                    Err(e) => tracing::warn!("Dropping table edit for block {}: {}", id, e),
                }
            }
            effects
        };
        self.apply_effects(effects);
    }

    async fn rekey_table(&self, placeholder: &BlockId, confirmed: &BlockId) {
        let pending = {
            let mut tables = self.shared.tables.lock().await;
            let Some(mut editor) = tables.remove(placeholder) else {
                return;
            };
            editor.rekey(confirmed.clone());
            let pending = editor.is_dirty().then(|| editor.epoch());
            tables.insert(confirmed.clone(), editor);
            pending
        };
        if let Some(epoch) = pending {
            self.schedule_table_commit(confirmed.clone(), epoch);
        }
    }

    /// Drop table buffers whose block is gone or no longer a table
    async fn prune_tables(&self) {
        let live: HashSet<BlockId> = self
            .shared
            .store
            .lock()
            .await
            .blocks()
            .iter()
            .filter(|block| block.block_type == BlockType::Table)
            .map(|block| block.id.clone())
            .collect();
        self.shared
            .tables
            .lock()
            .await
            .retain(|id, _| live.contains(id));
    }

    // ---- Focus ----

    pub async fn pending_focus(&self) -> Option<FocusRequest> {
        self.shared.store.lock().await.pending_focus().cloned()
    }

    pub async fn request_focus(&self, request: FocusRequest) -> Result<(), EditorError> {
        self.edit(|store| Ok(((), vec![store.request_focus(request)])))
            .await
    }

    /// Consume the pending request if it targets `block_id`
    pub async fn take_focus(&self, block_id: &BlockId) -> Option<FocusRequest> {
        self.shared.store.lock().await.take_focus(block_id)
    }

    /// Apply the pending focus request to the host surface
    ///
    /// The request is consumed whether it lands or runs out of attempts, unless
    /// a newer request replaced it in the meantime.
    pub async fn apply_focus<H>(&self, host: &mut H) -> Option<FocusOutcome>
    where
        H: SurfaceHost + ?Sized,
    {
        let (request, text_len) = {
            let store = self.shared.store.lock().await;
            let request = store.pending_focus()?.clone();
            let text_len = store
                .block(&request.block_id)
                .map(|block| block.char_len())
                .unwrap_or(0);
            (request, text_len)
        };

        let outcome = FocusApplier::new(self.shared.config.focus_max_attempts)
            .apply(host, &request, text_len)
            .await;

        self.shared.store.lock().await.discard_focus(&request);
        Some(outcome)
    }
}
