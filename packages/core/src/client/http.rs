//! HTTP Client
//!
//! reqwest-backed implementation of [`DocumentApi`] plus generic JSON access
//! to the other workspace resources.
//!
//! # Behavior
//!
//! - Every request carries a fresh `x-request-id` and the per-request timeout
//! - A configured token is sent as `Authorization: Bearer <token>`
//! - GET responses are cached per path; any mutation invalidates the cached
//!   entries under the mutated resource
//! - Non-2xx responses become [`ApiError::Http`] with the response body
//! - Block ids that are still placeholders are refused before any request
//!
//! Retrying is the caller's concern; the editor wraps calls in its own
//! retry policy.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::client::cache::{QueryCache, DEFAULT_CACHE_TTL};
use crate::client::resources::{self, ResourceKind};
use crate::client::sse::{AgentProgress, SseParser};
use crate::client::{format_http_error, ApiError, DocumentApi, OrderEntry};
use crate::models::{Block, BlockDraft, BlockId, BlockUpdate, Document};

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
const MIN_TIMEOUT_MS: u64 = 250;

/// Connection settings for [`HttpClient`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    /// Bearer token
    pub token: Option<String>,
    pub timeout_ms: u64,
    /// TTL of cached GET responses; 0 disables caching
    pub cache_ttl_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            cache_ttl_ms: DEFAULT_CACHE_TTL.as_millis() as u64,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    token: Option<String>,
    timeout: Duration,
    http: reqwest::Client,
    cache: Option<Arc<Mutex<QueryCache>>>,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(&config.base_url)?;
        let cache = (config.cache_ttl_ms > 0).then(|| {
            Arc::new(Mutex::new(QueryCache::new(Duration::from_millis(
                config.cache_ttl_ms,
            ))))
        });

        Ok(Self {
            base_url,
            token: config.token.filter(|token| !token.trim().is_empty()),
            timeout: Duration::from_millis(config.timeout_ms.max(MIN_TIMEOUT_MS)),
            http: reqwest::Client::new(),
            cache,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for `path`, or `None` for an empty path
    pub fn endpoint(&self, path: &str) -> Option<String> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('/') {
            Some(format!("{}{}", self.base_url, trimmed))
        } else {
            Some(format!("{}/{}", self.base_url, trimmed))
        }
    }

    fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, ApiError> {
        let url = self.endpoint(path).ok_or(ApiError::InvalidPath)?;
        let mut request = self
            .http
            .request(method, url.as_str())
            .header("x-request-id", format!("req_{}", Uuid::new_v4().simple()))
            .timeout(self.timeout);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        Ok(request)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let response = request.send().await.map_err(ApiError::request)?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| ApiError::Read {
            message: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(format_http_error(status, &body));
        }
        Ok(body.to_vec())
    }

    /// GET `path`, served from the cache while fresh
    pub async fn get_json<T>(&self, path: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        if let Some(cache) = &self.cache {
            if let Some(value) = cache.lock().await.get(path).cloned() {
                tracing::debug!("Cache hit for {}", path);
                return serde_json::from_value(value).map_err(ApiError::decode);
            }
        }

        let body = self.send(self.request(Method::GET, path)?).await?;
        let value: serde_json::Value = decode_json(&body)?;
        if let Some(cache) = &self.cache {
            cache.lock().await.insert(path, value.clone());
        }
        serde_json::from_value(value).map_err(ApiError::decode)
    }

    /// Send a JSON body and decode the JSON response
    pub async fn send_json<Req, Res>(
        &self,
        method: Method,
        path: &str,
        payload: &Req,
    ) -> Result<Res, ApiError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let request = self.request(method, path)?.json(payload);
        let body = self.send(request).await;
        self.invalidate(path).await;
        decode_json(&body?)
    }

    /// Send a JSON body and ignore the response body
    pub async fn send_json_discard<Req>(
        &self,
        method: Method,
        path: &str,
        payload: &Req,
    ) -> Result<(), ApiError>
    where
        Req: Serialize + ?Sized,
    {
        let request = self.request(method, path)?.json(payload);
        let body = self.send(request).await;
        self.invalidate(path).await;
        body.map(|_| ())
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let body = self.send(self.request(Method::DELETE, path)?).await;
        self.invalidate(path).await;
        body.map(|_| ())
    }

    /// Drop cached responses under `path` and its parent document
    async fn invalidate(&self, path: &str) {
        let Some(cache) = &self.cache else {
            return;
        };
        let mut cache = cache.lock().await;
        let removed = cache.invalidate_prefix(owning_resource(path));
        if removed > 0 {
            tracing::debug!("Invalidated {} cached response(s) under {}", removed, path);
        }
    }

    pub async fn list<T>(&self, kind: ResourceKind) -> Result<Vec<T>, ApiError>
    where
        T: DeserializeOwned,
    {
        self.get_json(&kind.collection_path()).await
    }

    pub async fn fetch<T>(&self, kind: ResourceKind, id: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        self.get_json(&kind.item_path(id)).await
    }

    /// Subscribe to the live progress of an agent run
    ///
    /// The stream ends after a terminal event or when the server closes it.
    pub async fn agent_progress_stream(
        &self,
        run_id: &str,
    ) -> Result<impl Stream<Item = Result<AgentProgress, ApiError>>, ApiError> {
        let path = resources::agent_run_stream_path(run_id);
        let response = self
            .request(Method::GET, &path)?
            .header(reqwest::header::ACCEPT, "text/event-stream")
            // The stream outlives the per-request timeout
            .timeout(Duration::from_secs(24 * 60 * 60))
            .send()
            .await
            .map_err(ApiError::request)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(format_http_error(status, &body));
        }
        tracing::debug!("Streaming progress for agent run {}", run_id);

        let mut chunks = response.bytes_stream();
        Ok(async_stream::try_stream! {
            let mut parser = SseParser::new();
            'stream: while let Some(chunk) = chunks.next().await {
                let chunk = chunk.map_err(|e| ApiError::Stream { message: e.to_string() })?;
                for event in parser.push(&chunk) {
                    if let Some(progress) = AgentProgress::from_event(&event)? {
                        let done = progress.is_terminal();
                        yield progress;
                        if done {
                            break 'stream;
                        }
                    }
                }
            }
            if let Some(event) = parser.finish() {
                if let Some(progress) = AgentProgress::from_event(&event)? {
                    yield progress;
                }
            }
        })
    }
}

/// `/documents/d-1/blocks/b-2` invalidates everything under `/documents/d-1`
fn owning_resource(path: &str) -> &str {
    let path = path.split('?').next().unwrap_or(path);
    match path.match_indices('/').nth(2) {
        Some((index, _)) => &path[..index],
        None => path,
    }
}

fn normalize_base_url(base_url: &str) -> Result<String, ApiError> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BaseUrlMissing);
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

fn ensure_persisted(id: &BlockId) -> Result<(), ApiError> {
    if id.is_transient() {
        Err(ApiError::transient_id(id))
    } else {
        Ok(())
    }
}

fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(ApiError::decode)
}

#[async_trait]
impl DocumentApi for HttpClient {
    async fn get_document(&self, document_id: &str) -> Result<Document, ApiError> {
        let mut document: Document = self.get_json(&resources::document_path(document_id)).await?;
        document.sort_blocks();
        Ok(document)
    }

    async fn update_title(&self, document_id: &str, title: &str) -> Result<(), ApiError> {
        self.send_json_discard(
            Method::PATCH,
            &resources::document_path(document_id),
            &json!({ "title": title }),
        )
        .await
    }

    async fn create_block(&self, document_id: &str, draft: &BlockDraft) -> Result<Block, ApiError> {
        self.send_json(Method::POST, &resources::blocks_path(document_id), draft)
            .await
    }

    async fn update_block(
        &self,
        document_id: &str,
        block_id: &BlockId,
        update: &BlockUpdate,
    ) -> Result<(), ApiError> {
        ensure_persisted(block_id)?;
        self.send_json_discard(
            Method::PATCH,
            &resources::block_path(document_id, block_id),
            update,
        )
        .await
    }

    async fn delete_block(&self, document_id: &str, block_id: &BlockId) -> Result<(), ApiError> {
        ensure_persisted(block_id)?;
        self.delete(&resources::block_path(document_id, block_id))
            .await
    }

    async fn reorder_blocks(&self, document_id: &str, order: &[OrderEntry]) -> Result<(), ApiError> {
        if let Some(entry) = order.iter().find(|entry| entry.id.is_transient()) {
            return Err(ApiError::transient_id(&entry.id));
        }
        self.send_json_discard(
            Method::PUT,
            &resources::reorder_path(document_id),
            &json!({ "order": order }),
        )
        .await
    }
}
