// crates/yc-storage-mcp/src/tools.rs
// ============================================================================
// Module: MCP Tool Router
// Description: Tool dispatch and handlers for object-storage tools.
// Purpose: Turn tool calls into gateway operations and text envelopes.
// Dependencies: serde, serde_json, thiserror, tokio
// ============================================================================

//! ## Overview
//! [`ToolRouter`] is the single entry point for `tools/call`. It decodes the
//! argument bag into a typed request, validates it before touching the
//! gateway, runs the handler, and renders the outcome into a
//! [`ToolResponse`]. Handler failures never escape [`ToolRouter::dispatch`].
//!
//! ## Invariants
//! - Argument validation happens before any gateway call.
//! - Exactly one envelope and one audit event per invocation.
//! - `list_objects` never reports more than `maxKeys` entries.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::audit::AuditSink;
use crate::audit::ToolCallAuditEvent;
use crate::context::RequestContext;
use crate::envelope::ToolResponse;
use crate::gateway::BucketSummary;
use crate::gateway::GatewayError;
use crate::gateway::ListObjectsQuery;
use crate::gateway::ObjectSummary;
use crate::gateway::StorageGateway;
use crate::gateway::collect_body;
use crate::tooling::DEFAULT_MAX_KEYS;
use crate::tooling::ToolDefinition;
use crate::tooling::ToolName;
use crate::tooling::tool_definitions;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Largest `maxKeys` accepted by the S3 listing API.
pub const MAX_LIST_KEYS: u32 = i32::MAX.unsigned_abs();

/// Action label for bucket listing failures.
const ACTION_LIST_BUCKETS: &str = "list buckets";
/// Action label for object listing failures.
const ACTION_LIST_OBJECTS: &str = "list objects";
/// Action label for download failures.
const ACTION_DOWNLOAD_OBJECT: &str = "download object";

// ============================================================================
// SECTION: Requests
// ============================================================================

/// `list_buckets` arguments. The tool takes no fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListBucketsRequest {}

/// `list_objects` arguments.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListObjectsRequest {
    /// Bucket name.
    pub bucket: String,
    /// Optional key prefix filter.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Optional upper bound on returned entries.
    #[serde(default, rename = "maxKeys")]
    pub max_keys: Option<u32>,
}

impl ListObjectsRequest {
    /// Validates the request and converts it into a gateway query.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidParams`] when `bucket` is empty or
    /// `maxKeys` is out of range.
    pub fn into_query(self) -> Result<ListObjectsQuery, ToolError> {
        require_non_empty("bucket", &self.bucket)?;
        let max_keys = self.max_keys.unwrap_or(DEFAULT_MAX_KEYS);
        if max_keys == 0 || max_keys > MAX_LIST_KEYS {
            return Err(ToolError::InvalidParams(format!(
                "maxKeys must be between 1 and {MAX_LIST_KEYS}"
            )));
        }
        Ok(ListObjectsQuery {
            bucket: self.bucket,
            prefix: self.prefix.filter(|prefix| !prefix.is_empty()),
            max_keys,
        })
    }
}

/// `download_object` arguments.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DownloadObjectRequest {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Destination path on the local filesystem.
    #[serde(rename = "localPath")]
    pub local_path: String,
}

impl DownloadObjectRequest {
    /// Validates that every field is non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidParams`] naming the first empty field.
    pub fn validate(&self) -> Result<(), ToolError> {
        require_non_empty("bucket", &self.bucket)?;
        require_non_empty("key", &self.key)?;
        require_non_empty("localPath", &self.local_path)
    }
}

// ============================================================================
// SECTION: Results
// ============================================================================

/// Completed download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadResult {
    /// Object key that was downloaded.
    pub key: String,
    /// Path the object was written to.
    pub local_path: String,
    /// Number of bytes written.
    pub byte_count: usize,
}

impl fmt::Display for DownloadResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "File \"{}\" successfully downloaded to \"{}\" (size: {} bytes)",
            self.key, self.local_path, self.byte_count
        )
    }
}

// ============================================================================
// SECTION: Tool Router
// ============================================================================

/// Tool router for object-storage tools.
#[derive(Clone)]
pub struct ToolRouter {
    /// Storage gateway shared by all handlers.
    gateway: Arc<dyn StorageGateway>,
    /// Audit sink for tool call events.
    audit: Arc<dyn AuditSink>,
}

impl ToolRouter {
    /// Creates a router over the given gateway and audit sink.
    #[must_use]
    pub fn new(gateway: Arc<dyn StorageGateway>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            gateway,
            audit,
        }
    }

    /// Returns the tool definitions advertised by `tools/list`.
    #[must_use]
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        tool_definitions()
    }

    /// Invokes a tool and renders the outcome into a response envelope.
    ///
    /// Failures, including unknown tool names, are rendered as
    /// `Error executing <name>: <message>`.
    pub async fn dispatch(
        &self,
        context: &RequestContext,
        name: &str,
        arguments: Value,
    ) -> ToolResponse {
        let started = Instant::now();
        let outcome = self.handle_tool_call(name, arguments).await;
        let error = outcome.as_ref().err().map(ToString::to_string);
        self.audit.record_tool_call(&ToolCallAuditEvent::new(
            context,
            name,
            started.elapsed(),
            error,
        ));
        match outcome {
            Ok(text) => ToolResponse::text(text),
            Err(err) => ToolResponse::error(name, &err),
        }
    }

    /// Routes a tool call to its handler and returns the result text.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when the tool is unknown or the handler fails.
    pub async fn handle_tool_call(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<String, ToolError> {
        let tool = ToolName::parse(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let arguments = normalize_arguments(arguments)?;
        match tool {
            ToolName::ListBuckets => {
                let _: ListBucketsRequest = decode(arguments)?;
                let buckets = self.list_buckets().await?;
                Ok(format!("Found {} bucket(s):\n{}", buckets.len(), pretty_json(&buckets)?))
            }
            ToolName::ListObjects => {
                let query = decode::<ListObjectsRequest>(arguments)?.into_query()?;
                let objects = self.list_objects(&query).await?;
                Ok(format!(
                    "Found {} object(s) in bucket \"{}\":\n{}",
                    objects.len(),
                    query.bucket,
                    pretty_json(&objects)?
                ))
            }
            ToolName::DownloadObject => {
                let request: DownloadObjectRequest = decode(arguments)?;
                request.validate()?;
                Ok(self.download_object(&request).await?.to_string())
            }
        }
    }

    /// Lists every bucket.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Gateway`] when the listing fails.
    pub async fn list_buckets(&self) -> Result<Vec<BucketSummary>, ToolError> {
        self.gateway
            .list_buckets()
            .await
            .map_err(|err| ToolError::gateway(ACTION_LIST_BUCKETS, err))
    }

    /// Lists one page of objects, truncated to `query.max_keys`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Gateway`] when the listing fails.
    pub async fn list_objects(
        &self,
        query: &ListObjectsQuery,
    ) -> Result<Vec<ObjectSummary>, ToolError> {
        let mut objects = self
            .gateway
            .list_objects(query)
            .await
            .map_err(|err| ToolError::gateway(ACTION_LIST_OBJECTS, err))?;
        objects.truncate(usize::try_from(query.max_keys).unwrap_or(usize::MAX));
        Ok(objects)
    }

    /// Downloads an object to `request.local_path`, overwriting existing files.
    ///
    /// Parent directories are created when missing. Nothing is created on disk
    /// when the gateway returns no body.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when the gateway call, body read, directory
    /// creation, or file write fails.
    pub async fn download_object(
        &self,
        request: &DownloadObjectRequest,
    ) -> Result<DownloadResult, ToolError> {
        let body = self
            .gateway
            .get_object(&request.bucket, &request.key)
            .await
            .map_err(|err| ToolError::gateway(ACTION_DOWNLOAD_OBJECT, err))?;
        let Some(mut body) = body else {
            return Err(ToolError::EmptyBody);
        };
        let path = Path::new(&request.local_path);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|err| {
                ToolError::LocalIo(format!("cannot create directory {}: {err}", parent.display()))
            })?;
        }
        let bytes = collect_body(&mut *body)
            .await
            .map_err(|err| ToolError::gateway(ACTION_DOWNLOAD_OBJECT, err))?;
        tokio::fs::write(path, &bytes)
            .await
            .map_err(|err| ToolError::LocalIo(format!("cannot write {}: {err}", path.display())))?;
        Ok(DownloadResult {
            key: request.key.clone(),
            local_path: request.local_path.clone(),
            byte_count: bytes.len(),
        })
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Tool routing errors.
///
/// # Invariants
/// - Display strings are the `<message>` part of the error envelope.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool name not recognized.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    /// Tool arguments failed to decode or validate.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    /// Storage gateway call failed.
    #[error("failed to {action}: {source}")]
    Gateway {
        /// Operation label.
        action: &'static str,
        /// Underlying gateway error.
        source: GatewayError,
    },
    /// Gateway returned an object without a body.
    #[error("failed to download object: empty response from storage gateway")]
    EmptyBody,
    /// Local filesystem operation failed.
    #[error("failed to download object: {0}")]
    LocalIo(String),
    /// Result serialization failed.
    #[error("serialization failure: {0}")]
    Serialization(String),
}

impl ToolError {
    /// Wraps a gateway error with its operation label.
    const fn gateway(action: &'static str, source: GatewayError) -> Self {
        Self::Gateway {
            action,
            source,
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Treats a missing argument bag as empty and rejects non-object bags.
fn normalize_arguments(arguments: Value) -> Result<Value, ToolError> {
    match arguments {
        Value::Null => Ok(Value::Object(serde_json::Map::new())),
        Value::Object(_) => Ok(arguments),
        _ => Err(ToolError::InvalidParams("arguments must be an object".to_string())),
    }
}

/// Decodes a JSON value into a typed request payload.
fn decode<T: DeserializeOwned>(payload: Value) -> Result<T, ToolError> {
    serde_json::from_value(payload).map_err(|err| ToolError::InvalidParams(err.to_string()))
}

/// Rejects empty or whitespace-only string fields.
fn require_non_empty(field: &str, value: &str) -> Result<(), ToolError> {
    if value.trim().is_empty() {
        return Err(ToolError::InvalidParams(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Renders a value as two-space indented JSON.
fn pretty_json<T: Serialize>(value: &T) -> Result<String, ToolError> {
    serde_json::to_string_pretty(value).map_err(|err| ToolError::Serialization(err.to_string()))
}
