//! Shared fixtures for editor integration tests
//!
//! `RecordingApi` is an in-memory `DocumentApi` that records every call,
//! keeps a server-side copy of the document, and can inject failures or
//! hold create calls open.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agentboard_core::client::{ApiError, DocumentApi, OrderEntry};
use agentboard_core::config::EditorConfig;
use agentboard_core::editor::EditorSession;
use agentboard_core::models::{Block, BlockDraft, BlockId, BlockType, BlockUpdate, Document};
use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::OwnedMutexGuard;

pub const DOC_ID: &str = "doc-1";

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    GetDocument,
    UpdateTitle(String),
    CreateBlock(BlockDraft),
    UpdateBlock(BlockId, BlockUpdate),
    DeleteBlock(BlockId),
    Reorder(Vec<OrderEntry>),
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Call::GetDocument => "get_document",
            Call::UpdateTitle(_) => "update_title",
            Call::CreateBlock(_) => "create_block",
            Call::UpdateBlock(..) => "update_block",
            Call::DeleteBlock(_) => "delete_block",
            Call::Reorder(_) => "reorder_blocks",
        }
    }

    /// Block id carried by the call, if any
    pub fn block_id(&self) -> Option<&BlockId> {
        match self {
            Call::UpdateBlock(id, _) | Call::DeleteBlock(id) => Some(id),
            _ => None,
        }
    }
}

struct Inner {
    server: Mutex<Document>,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<&'static str, (usize, StatusCode)>>,
    create_gate: Arc<tokio::sync::Mutex<()>>,
    next_id: AtomicU64,
}

#[derive(Clone)]
pub struct RecordingApi {
    inner: Arc<Inner>,
}

impl RecordingApi {
    pub fn new(document: Document) -> Self {
        Self {
            inner: Arc::new(Inner {
                server: Mutex::new(document),
                calls: Mutex::new(Vec::new()),
                failures: Mutex::new(HashMap::new()),
                create_gate: Arc::new(tokio::sync::Mutex::new(())),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.calls.lock().unwrap().clone()
    }

    pub fn calls_named(&self, name: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.name() == name)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.inner.calls.lock().unwrap().clear();
    }

    /// Server-side copy of the document, in sort order
    pub fn server_document(&self) -> Document {
        let mut document = self.inner.server.lock().unwrap().clone();
        document.sort_blocks();
        document
    }

    /// Fail the next `times` calls of `operation` with `status`
    pub fn fail_next(&self, operation: &'static str, times: usize, status: StatusCode) {
        self.inner
            .failures
            .lock()
            .unwrap()
            .insert(operation, (times, status));
    }

    /// Hold every create call open until the guard is dropped
    pub async fn hold_creates(&self) -> OwnedMutexGuard<()> {
        self.inner.create_gate.clone().lock_owned().await
    }

    fn record(&self, call: Call) -> Result<(), ApiError> {
        let name = call.name();
        self.inner.calls.lock().unwrap().push(call);

        let mut failures = self.inner.failures.lock().unwrap();
        if let Some((remaining, status)) = failures.get_mut(name) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ApiError::Http {
                    status: *status,
                    body: "injected failure".to_string(),
                });
            }
        }
        Ok(())
    }

    fn with_block<R>(&self, id: &BlockId, f: impl FnOnce(&mut Block) -> R) -> Result<R, ApiError> {
        let mut server = self.inner.server.lock().unwrap();
        server
            .blocks
            .iter_mut()
            .find(|block| &block.id == id)
            .map(f)
            .ok_or(ApiError::Http {
                status: StatusCode::NOT_FOUND,
                body: format!("no block {}", id),
            })
    }
}

#[async_trait]
impl DocumentApi for RecordingApi {
    async fn get_document(&self, _document_id: &str) -> Result<Document, ApiError> {
        self.record(Call::GetDocument)?;
        Ok(self.server_document())
    }

    async fn update_title(&self, _document_id: &str, title: &str) -> Result<(), ApiError> {
        self.record(Call::UpdateTitle(title.to_string()))?;
        self.inner.server.lock().unwrap().title = title.to_string();
        Ok(())
    }

    async fn create_block(&self, document_id: &str, draft: &BlockDraft) -> Result<Block, ApiError> {
        let _gate = self.inner.create_gate.lock().await;
        self.record(Call::CreateBlock(draft.clone()))?;

        let n = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let block = Block {
            id: BlockId::new(format!("srv-{}", n)),
            document_id: document_id.to_string(),
            block_type: draft.block_type,
            content: draft.content.clone(),
            sort_order: draft.sort_order,
            indent_level: draft.indent_level,
            meta: draft.meta.clone(),
        };
        self.inner.server.lock().unwrap().blocks.push(block.clone());
        Ok(block)
    }

    async fn update_block(
        &self,
        _document_id: &str,
        block_id: &BlockId,
        update: &BlockUpdate,
    ) -> Result<(), ApiError> {
        assert!(!block_id.is_transient(), "placeholder id sent to the server");
        self.record(Call::UpdateBlock(block_id.clone(), update.clone()))?;
        self.with_block(block_id, |block| {
            block.block_type = update.block_type;
            block.content = update.content.clone();
            block.indent_level = update.indent_level;
            block.meta = update.meta.clone();
        })
    }

    async fn delete_block(&self, _document_id: &str, block_id: &BlockId) -> Result<(), ApiError> {
        assert!(!block_id.is_transient(), "placeholder id sent to the server");
        self.record(Call::DeleteBlock(block_id.clone()))?;
        let mut server = self.inner.server.lock().unwrap();
        let before = server.blocks.len();
        server.blocks.retain(|block| &block.id != block_id);
        if server.blocks.len() == before {
            return Err(ApiError::Http {
                status: StatusCode::NOT_FOUND,
                body: format!("no block {}", block_id),
            });
        }
        Ok(())
    }

    async fn reorder_blocks(&self, _document_id: &str, order: &[OrderEntry]) -> Result<(), ApiError> {
        assert!(
            order.iter().all(|entry| !entry.id.is_transient()),
            "placeholder id sent in a reorder"
        );
        self.record(Call::Reorder(order.to_vec()))?;
        let mut server = self.inner.server.lock().unwrap();
        for entry in order {
            if let Some(block) = server.blocks.iter_mut().find(|b| b.id == entry.id) {
                block.sort_order = entry.sort_order;
            }
        }
        Ok(())
    }
}

/// A confirmed block as the server would return it
pub fn server_block(id: &str, block_type: BlockType, content: &str, sort_order: f64) -> Block {
    Block {
        id: BlockId::new(id),
        document_id: DOC_ID.to_string(),
        block_type,
        content: content.to_string(),
        sort_order,
        indent_level: 0,
        meta: Default::default(),
    }
}

/// Document with paragraphs `b1..=bN` holding `contents`
pub fn document_with(contents: &[&str]) -> Document {
    let mut document = Document::new(DOC_ID, "Untitled");
    document.blocks = contents
        .iter()
        .enumerate()
        .map(|(i, content)| {
            server_block(
                &format!("b{}", i + 1),
                BlockType::Paragraph,
                content,
                (i + 1) as f64,
            )
        })
        .collect();
    document
}

pub fn test_config() -> EditorConfig {
    EditorConfig {
        retry_base_delay_ms: 10,
        ..EditorConfig::default()
    }
}

pub async fn open_session(
    document: Document,
) -> (EditorSession<RecordingApi>, RecordingApi) {
    init_tracing();
    let api = RecordingApi::new(document);
    let session = EditorSession::open(api.clone(), DOC_ID, test_config())
        .await
        .expect("document should load");
    api.clear_calls();
    (session, api)
}

/// Longer than the default debounce window
pub const PAST_DEBOUNCE: Duration = Duration::from_millis(1300);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
