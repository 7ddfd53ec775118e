//! Backend API Client
//!
//! The editor persists through the [`DocumentApi`] trait so it can run
//! against the REST backend ([`HttpClient`]) or an in-memory double in tests.
//!
//! - [`http`] - reqwest-backed client with request ids, bearer auth and GET caching
//! - [`cache`] - Path-keyed response cache with TTL and prefix invalidation
//! - [`sse`] - Incremental `text/event-stream` parser and agent progress events
//! - [`resources`] - REST paths for documents and the other workspace resources

pub mod cache;
pub mod error;
pub mod http;
pub mod resources;
pub mod sse;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{Block, BlockDraft, BlockId, BlockUpdate, Document};

pub use cache::QueryCache;
pub use error::{format_http_error, ApiError};
pub use http::{ClientConfig, HttpClient};
pub use resources::ResourceKind;
pub use sse::{AgentProgress, SseEvent, SseParser};

/// One entry of a reorder request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEntry {
    pub id: BlockId,
    pub sort_order: f64,
}

/// Persistence seam used by the editor session
///
/// Implementations must be cheap to share across tasks; the session calls
/// them from spawned background tasks.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Load a document with all of its blocks
    async fn get_document(&self, document_id: &str) -> Result<Document, ApiError>;

    async fn update_title(&self, document_id: &str, title: &str) -> Result<(), ApiError>;

    /// Create a block; the returned block carries the server-assigned id
    async fn create_block(&self, document_id: &str, draft: &BlockDraft) -> Result<Block, ApiError>;

    async fn update_block(
        &self,
        document_id: &str,
        block_id: &BlockId,
        update: &BlockUpdate,
    ) -> Result<(), ApiError>;

    async fn delete_block(&self, document_id: &str, block_id: &BlockId) -> Result<(), ApiError>;

    /// Persist the full block ordering
    async fn reorder_blocks(&self, document_id: &str, order: &[OrderEntry]) -> Result<(), ApiError>;
}
