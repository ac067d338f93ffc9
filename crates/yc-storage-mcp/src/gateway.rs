// crates/yc-storage-mcp/src/gateway.rs
// ============================================================================
// Module: Storage Gateway
// Description: Object-storage abstraction consumed by the tool handlers.
// Purpose: Decouple tool dispatch from the S3 SDK so handlers stay testable.
// Dependencies: async-trait, bytes, serde, thiserror
// ============================================================================

//! ## Overview
//! The storage gateway is the only path from tool handlers to object storage.
//! Production deployments use [`crate::s3_gateway::S3StorageGateway`]; tests
//! substitute an in-memory implementation. Summaries are transient views of
//! gateway responses and are serialized directly into tool output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Summaries
// ============================================================================

/// Bucket listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketSummary {
    /// Bucket name.
    pub name: String,
    /// Creation timestamp (ISO-8601) when reported by the backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
}

/// Object listing entry.
///
/// # Invariants
/// - Entries keep the gateway's native ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSummary {
    /// Object key.
    pub key: String,
    /// Object size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    /// Last modification timestamp (ISO-8601).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    /// Opaque entity tag as returned by the backend.
    #[serde(rename = "etag", skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

/// Single-page object listing query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListObjectsQuery {
    /// Bucket name.
    pub bucket: String,
    /// Optional server-side key prefix filter.
    pub prefix: Option<String>,
    /// Upper bound on returned entries.
    pub max_keys: u32,
}

// ============================================================================
// SECTION: Object Body
// ============================================================================

/// Object payload delivered as a sequence of chunks.
#[async_trait]
pub trait ObjectBody: Send {
    /// Returns the next chunk, or `None` once the body is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the underlying stream fails.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, GatewayError>;
}

/// Boxed object body returned by gateways.
pub type BoxedObjectBody = Box<dyn ObjectBody>;

/// Object body backed by chunks already held in memory.
#[derive(Debug, Default)]
pub struct BufferedObjectBody {
    /// Remaining chunks in delivery order.
    chunks: VecDeque<Bytes>,
}

impl BufferedObjectBody {
    /// Creates a body that yields the given chunks in order.
    #[must_use]
    pub fn new<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl ObjectBody for BufferedObjectBody {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, GatewayError> {
        Ok(self.chunks.pop_front())
    }
}

/// Drains a body into one contiguous buffer, preserving chunk order.
///
/// # Errors
///
/// Returns [`GatewayError`] when any chunk read fails.
pub async fn collect_body(body: &mut dyn ObjectBody) -> Result<Vec<u8>, GatewayError> {
    let mut buffer = Vec::new();
    while let Some(chunk) = body.next_chunk().await? {
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer)
}

// ============================================================================
// SECTION: Gateway Trait
// ============================================================================

/// Object-storage operations used by the tool handlers.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Lists every bucket visible to the configured credentials.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the backend call fails.
    async fn list_buckets(&self) -> Result<Vec<BucketSummary>, GatewayError>;

    /// Lists a single page of objects.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the backend call fails.
    async fn list_objects(&self, query: &ListObjectsQuery)
    -> Result<Vec<ObjectSummary>, GatewayError>;

    /// Opens an object for reading. `None` means the backend sent no body.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the backend call fails.
    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<BoxedObjectBody>, GatewayError>;
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Storage gateway errors.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Invalid client configuration.
    #[error("storage gateway invalid: {0}")]
    Invalid(String),
    /// Backend returned an error (network, auth, not-found, permission).
    #[error("storage backend error: {0}")]
    Backend(String),
    /// Body stream failed mid-read.
    #[error("storage stream error: {0}")]
    Stream(String),
}
