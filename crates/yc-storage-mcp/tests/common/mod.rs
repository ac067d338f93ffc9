// crates/yc-storage-mcp/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared in-memory gateway and audit fixtures for MCP tests.
// Purpose: Provide reusable test infrastructure for deterministic testing.
// Dependencies: yc-storage-mcp
// ============================================================================

//! ## Overview
//! [`InMemoryGateway`] serves buckets, listings, and chunked object bodies
//! from memory and records every call so tests can assert that validation
//! failures never reach the gateway.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::unwrap_in_result,
    reason = "Test fixtures favor direct unwraps for setup clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use yc_storage_mcp::AuditSink;
use yc_storage_mcp::BucketSummary;
use yc_storage_mcp::GatewayError;
use yc_storage_mcp::ObjectSummary;
use yc_storage_mcp::StorageGateway;
use yc_storage_mcp::ToolRouter;
use yc_storage_mcp::audit::LifecycleAuditEvent;
use yc_storage_mcp::audit::ToolCallAuditEvent;
use yc_storage_mcp::audit::TransportAuditEvent;
use yc_storage_mcp::gateway::BoxedObjectBody;
use yc_storage_mcp::gateway::BufferedObjectBody;
use yc_storage_mcp::gateway::ListObjectsQuery;
use yc_storage_mcp::gateway::ObjectBody;

// ============================================================================
// SECTION: Gateway Fixture
// ============================================================================

/// Gateway call recorded by [`InMemoryGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    /// `list_buckets` was invoked.
    ListBuckets,
    /// `list_objects` was invoked with this query.
    ListObjects(ListObjectsQuery),
    /// `get_object` was invoked for this bucket and key.
    GetObject(String, String),
}

/// Stored object payload.
#[derive(Debug, Clone)]
pub enum StoredBody {
    /// Body delivered as these chunks, in order.
    Chunks(Vec<Vec<u8>>),
    /// Backend responded without a body.
    Missing,
    /// First chunk is delivered, then the stream fails.
    BrokenAfterFirst(Vec<u8>),
}

/// In-memory storage gateway.
#[derive(Default)]
pub struct InMemoryGateway {
    buckets: Vec<BucketSummary>,
    objects: BTreeMap<String, Vec<ObjectSummary>>,
    bodies: BTreeMap<(String, String), StoredBody>,
    failure: Option<String>,
    calls: Mutex<Vec<GatewayCall>>,
}

impl InMemoryGateway {
    /// Creates an empty gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a bucket.
    pub fn with_bucket(mut self, name: &str, creation_date: Option<&str>) -> Self {
        self.buckets.push(BucketSummary {
            name: name.to_string(),
            creation_date: creation_date.map(str::to_string),
        });
        self
    }

    /// Adds a listing entry for `bucket`.
    pub fn with_listing(mut self, bucket: &str, key: &str, size: i64) -> Self {
        self.objects.entry(bucket.to_string()).or_default().push(ObjectSummary {
            key: key.to_string(),
            size: Some(size),
            last_modified: Some("2024-05-01T10:00:00Z".to_string()),
            etag: Some(format!("\"etag-{key}\"")),
        });
        self
    }

    /// Stores an object body.
    pub fn with_body(mut self, bucket: &str, key: &str, body: StoredBody) -> Self {
        self.bodies.insert((bucket.to_string(), key.to_string()), body);
        self
    }

    /// Makes every call fail with a backend error.
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Returns recorded calls.
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: GatewayCall) -> Result<(), GatewayError> {
        self.calls.lock().unwrap().push(call);
        self.failure.as_ref().map_or(Ok(()), |message| Err(GatewayError::Backend(message.clone())))
    }
}

#[async_trait]
impl StorageGateway for InMemoryGateway {
    async fn list_buckets(&self) -> Result<Vec<BucketSummary>, GatewayError> {
        self.record(GatewayCall::ListBuckets)?;
        Ok(self.buckets.clone())
    }

    async fn list_objects(
        &self,
        query: &ListObjectsQuery,
    ) -> Result<Vec<ObjectSummary>, GatewayError> {
        self.record(GatewayCall::ListObjects(query.clone()))?;
        let entries = self.objects.get(&query.bucket).cloned().unwrap_or_default();
        Ok(entries
            .into_iter()
            .filter(|entry| {
                query.prefix.as_deref().is_none_or(|prefix| entry.key.starts_with(prefix))
            })
            .collect())
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<BoxedObjectBody>, GatewayError> {
        self.record(GatewayCall::GetObject(bucket.to_string(), key.to_string()))?;
        match self.bodies.get(&(bucket.to_string(), key.to_string())) {
            Some(StoredBody::Chunks(chunks)) => {
                Ok(Some(Box::new(BufferedObjectBody::new(chunks.clone()))))
            }
            Some(StoredBody::Missing) => Ok(None),
            Some(StoredBody::BrokenAfterFirst(first)) => Ok(Some(Box::new(BrokenBody {
                first: Some(Bytes::from(first.clone())),
            }))),
            None => Err(GatewayError::Backend(
                "NoSuchKey: The specified key does not exist.".to_string(),
            )),
        }
    }
}

/// Body that yields one chunk and then fails.
struct BrokenBody {
    first: Option<Bytes>,
}

#[async_trait]
impl ObjectBody for BrokenBody {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, GatewayError> {
        match self.first.take() {
            Some(chunk) => Ok(Some(chunk)),
            None => Err(GatewayError::Stream("connection reset by peer".to_string())),
        }
    }
}

// ============================================================================
// SECTION: Audit Fixture
// ============================================================================

/// Audit sink that keeps tool call events in memory.
#[derive(Default)]
pub struct RecordingAudit {
    tool_calls: Mutex<Vec<ToolCallAuditEvent>>,
}

impl RecordingAudit {
    /// Returns recorded tool call events.
    pub fn tool_calls(&self) -> Vec<ToolCallAuditEvent> {
        self.tool_calls.lock().unwrap().clone()
    }
}

impl AuditSink for RecordingAudit {
    fn record_tool_call(&self, event: &ToolCallAuditEvent) {
        self.tool_calls.lock().unwrap().push(event.clone());
    }

    fn record_lifecycle(&self, _event: &LifecycleAuditEvent) {}

    fn record_transport(&self, _event: &TransportAuditEvent) {}
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a router over `gateway` with a recording audit sink.
pub fn router_with(gateway: Arc<InMemoryGateway>) -> (ToolRouter, Arc<RecordingAudit>) {
    let audit = Arc::new(RecordingAudit::default());
    let router = ToolRouter::new(gateway, audit.clone());
    (router, audit)
}
