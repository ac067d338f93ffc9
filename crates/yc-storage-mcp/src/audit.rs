// crates/yc-storage-mcp/src/audit.rs
// ============================================================================
// Module: MCP Audit Logging
// Description: Structured audit events for tool calls and server lifecycle.
// Purpose: Emit JSON-line logs without taking over stdout.
// Dependencies: serde, serde_json, yc-storage-config
// ============================================================================

//! ## Overview
//! Audit events are serialized as one JSON object per line. The stderr sink is
//! the default because stdout carries the stdio protocol stream. Events never
//! include credentials or object payloads; tool errors are recorded by message.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::config::ServerAuditConfig;
use crate::config::ServerTransport;
use crate::context::RequestContext;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Tool call outcome classification.
///
/// # Invariants
/// - Variants are stable for audit labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutcome {
    /// Handler produced a result text.
    Ok,
    /// Handler failed or the tool was unknown.
    Error,
}

/// Server lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    /// Transport is accepting requests.
    Started,
    /// Transport stopped accepting requests.
    Stopped,
}

/// Tool call audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// JSON-RPC request identifier when provided.
    pub request_id: Option<String>,
    /// Transport used for the request.
    pub transport: ServerTransport,
    /// Peer IP address when available.
    pub peer_ip: Option<String>,
    /// Requested tool name, as sent by the client.
    pub tool: String,
    /// Call outcome.
    pub outcome: ToolOutcome,
    /// Handler duration in milliseconds.
    pub duration_ms: u128,
    /// Error message when the call failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Server lifecycle audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Lifecycle phase.
    pub phase: LifecyclePhase,
    /// Transport being served.
    pub transport: ServerTransport,
    /// Bound HTTP address when applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    /// Server version.
    pub version: &'static str,
}

/// Transport-level failure audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct TransportAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Transport that observed the failure.
    pub transport: ServerTransport,
    /// Failure description.
    pub error: String,
}

impl ToolCallAuditEvent {
    /// Creates a tool call event stamped with the current time.
    #[must_use]
    pub fn new(
        context: &RequestContext,
        tool: &str,
        elapsed: Duration,
        error: Option<String>,
    ) -> Self {
        let outcome = if error.is_some() { ToolOutcome::Error } else { ToolOutcome::Ok };
        Self {
            event: "tool_call",
            timestamp_ms: now_ms(),
            request_id: context.request_id.clone(),
            transport: context.transport,
            peer_ip: context.peer_ip.map(|ip| ip.to_string()),
            tool: tool.to_string(),
            outcome,
            duration_ms: elapsed.as_millis(),
            error,
        }
    }
}

impl LifecycleAuditEvent {
    /// Creates a lifecycle event stamped with the current time.
    #[must_use]
    pub fn new(phase: LifecyclePhase, transport: ServerTransport, bind: Option<String>) -> Self {
        Self {
            event: "server_lifecycle",
            timestamp_ms: now_ms(),
            phase,
            transport,
            bind,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

impl TransportAuditEvent {
    /// Creates a transport failure event stamped with the current time.
    #[must_use]
    pub fn new(transport: ServerTransport, error: impl Into<String>) -> Self {
        Self {
            event: "transport_error",
            timestamp_ms: now_ms(),
            transport,
            error: error.into(),
        }
    }
}

/// Returns the current wall-clock time in milliseconds since epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for server events.
pub trait AuditSink: Send + Sync {
    /// Records a tool call.
    fn record_tool_call(&self, event: &ToolCallAuditEvent);

    /// Records a lifecycle transition.
    fn record_lifecycle(&self, event: &LifecycleAuditEvent);

    /// Records a transport-level failure.
    fn record_transport(&self, event: &TransportAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl StderrAuditSink {
    /// Writes one serialized event line to stderr.
    fn emit<T: Serialize>(event: &T) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

impl AuditSink for StderrAuditSink {
    fn record_tool_call(&self, event: &ToolCallAuditEvent) {
        Self::emit(event);
    }

    fn record_lifecycle(&self, event: &LifecycleAuditEvent) {
        Self::emit(event);
    }

    fn record_transport(&self, event: &TransportAuditEvent) {
        Self::emit(event);
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one serialized event line.
    fn emit<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl AuditSink for FileAuditSink {
    fn record_tool_call(&self, event: &ToolCallAuditEvent) {
        self.emit(event);
    }

    fn record_lifecycle(&self, event: &LifecycleAuditEvent) {
        self.emit(event);
    }

    fn record_transport(&self, event: &TransportAuditEvent) {
        self.emit(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record_tool_call(&self, _event: &ToolCallAuditEvent) {}

    fn record_lifecycle(&self, _event: &LifecycleAuditEvent) {}

    fn record_transport(&self, _event: &TransportAuditEvent) {}
}

/// Builds the audit sink selected by configuration.
///
/// # Errors
///
/// Returns an error when the configured audit file cannot be opened.
pub fn audit_sink_from_config(config: &ServerAuditConfig) -> io::Result<Arc<dyn AuditSink>> {
    if !config.enabled {
        return Ok(Arc::new(NoopAuditSink));
    }
    match config.path.as_deref() {
        Some(path) => Ok(Arc::new(FileAuditSink::new(Path::new(path))?)),
        None => Ok(Arc::new(StderrAuditSink)),
    }
}
