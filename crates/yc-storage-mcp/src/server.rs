// crates/yc-storage-mcp/src/server.rs
// ============================================================================
// Module: MCP Server
// Description: MCP server implementations for stdio and HTTP transports.
// Purpose: Expose object-storage tools via JSON-RPC 2.0.
// Dependencies: axum, serde, serde_json, tokio, yc-storage-config
// ============================================================================

//! ## Overview
//! The MCP server speaks JSON-RPC 2.0 over newline-delimited stdio or over
//! HTTP `POST /rpc`, and always routes tool calls through
//! [`crate::tools::ToolRouter`]. Tool failures are reported inside the tool
//! result envelope; JSON-RPC errors are reserved for protocol problems
//! (malformed messages, unknown methods, invalid `tools/call` params).
//! Notifications (messages without an `id`) never receive a response.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::io::BufRead;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::extract::DefaultBodyLimit;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::post;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio::sync::mpsc;

use crate::audit::AuditSink;
use crate::audit::LifecycleAuditEvent;
use crate::audit::LifecyclePhase;
use crate::audit::TransportAuditEvent;
use crate::audit::audit_sink_from_config;
use crate::config::ServerConfig;
use crate::config::ServerTransport;
use crate::config::StorageCredentials;
use crate::config::StorageMcpConfig;
use crate::context::RequestContext;
use crate::s3_gateway::S3StorageGateway;
use crate::tooling::ToolDefinition;
use crate::tools::ToolRouter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Server name reported on `initialize`.
pub const SERVER_NAME: &str = "yc-storage-mcp";

/// Protocol version used when the client does not send one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC parse error code.
const PARSE_ERROR: i64 = -32700;
/// JSON-RPC invalid request code.
const INVALID_REQUEST: i64 = -32600;
/// JSON-RPC method not found code.
const METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC invalid params code.
const INVALID_PARAMS: i64 = -32602;
/// JSON-RPC internal error code.
const INTERNAL_ERROR: i64 = -32603;

// ============================================================================
// SECTION: MCP Server
// ============================================================================

/// MCP server instance.
pub struct McpServer {
    /// Server transport configuration.
    config: ServerConfig,
    /// Shared request handling state.
    state: Arc<ServerState>,
}

impl McpServer {
    /// Builds a server from an already constructed router.
    #[must_use]
    pub fn new(config: ServerConfig, router: ToolRouter, audit: Arc<dyn AuditSink>) -> Self {
        let state = Arc::new(ServerState {
            router,
            audit,
            max_body_bytes: config.max_body_bytes,
            dispatch_lock: Mutex::new(()),
        });
        Self {
            config,
            state,
        }
    }

    /// Builds a new MCP server from configuration.
    ///
    /// Resolves storage credentials from the environment and creates the
    /// long-lived S3 client.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when configuration, credentials, the audit
    /// sink, or the storage client are invalid.
    pub async fn from_config(mut config: StorageMcpConfig) -> Result<Self, McpServerError> {
        config.validate().map_err(|err| McpServerError::Config(err.to_string()))?;
        let credentials = StorageCredentials::from_env(&config.storage)
            .map_err(|err| McpServerError::Config(err.to_string()))?;
        let gateway = S3StorageGateway::connect(&config.storage, credentials)
            .await
            .map_err(|err| McpServerError::Init(err.to_string()))?;
        let audit = audit_sink_from_config(&config.server.audit)
            .map_err(|err| McpServerError::Init(format!("audit log unavailable: {err}")))?;
        let router = ToolRouter::new(Arc::new(gateway), Arc::clone(&audit));
        Ok(Self::new(config.server, router, audit))
    }

    /// Returns the tool router.
    #[must_use]
    pub fn router(&self) -> &ToolRouter {
        &self.state.router
    }

    /// Serves the configured transport until `shutdown` resolves.
    ///
    /// The stdio transport also stops cleanly when stdin reaches end of file.
    /// Stdin is read on a detached thread, so a read still pending at
    /// shutdown does not keep the process alive.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when the transport fails.
    pub async fn serve_until<F>(self, shutdown: F) -> Result<(), McpServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let transport = self.config.transport;
        let bind = self.config.bind.clone();
        self.state.audit.record_lifecycle(&LifecycleAuditEvent::new(
            LifecyclePhase::Started,
            transport,
            bind.clone(),
        ));
        let result = match transport {
            ServerTransport::Stdio => {
                let max_body_bytes = self.state.max_body_bytes;
                match spawn_line_reader(|| std::io::stdin().lock(), max_body_bytes) {
                    Ok(lines) => {
                        serve_lines(&self.state, lines, tokio::io::stdout(), shutdown).await
                    }
                    Err(err) => Err(err),
                }
            }
            ServerTransport::Http => {
                serve_http(Arc::clone(&self.state), bind.clone(), shutdown).await
            }
        };
        if let Err(err) = &result {
            self.state
                .audit
                .record_transport(&TransportAuditEvent::new(transport, err.to_string()));
        }
        self.state.audit.record_lifecycle(&LifecycleAuditEvent::new(
            LifecyclePhase::Stopped,
            transport,
            bind,
        ));
        result
    }

    /// Serves newline-delimited JSON-RPC over arbitrary streams.
    ///
    /// Returns when the reader reaches end of file or `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when reading or writing fails.
    pub async fn serve_io<R, W, F>(
        &self,
        reader: R,
        writer: W,
        shutdown: F,
    ) -> Result<(), McpServerError>
    where
        R: AsyncBufRead + Unpin + Send,
        W: AsyncWrite + Unpin,
        F: Future<Output = ()>,
    {
        let lines = AsyncLines {
            reader,
            max_body_bytes: self.state.max_body_bytes,
        };
        serve_lines(&self.state, lines, writer, shutdown).await
    }
}

// ============================================================================
// SECTION: Stdio Transport
// ============================================================================

/// Capacity of the channel between the stdin thread and the serve loop.
const STDIN_CHANNEL_CAPACITY: usize = 16;

/// Shared server state for all transports.
struct ServerState {
    /// Tool router for request dispatch.
    router: ToolRouter,
    /// Audit sink for transport events.
    audit: Arc<dyn AuditSink>,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
    /// Serializes tool calls across concurrent HTTP requests.
    dispatch_lock: Mutex<()>,
}

/// One line read from the stdio stream.
#[derive(Debug, PartialEq, Eq)]
enum StdioLine {
    /// Stream closed.
    Eof,
    /// Complete message payload without the trailing newline.
    Payload(Vec<u8>),
    /// Line exceeded the body limit and was discarded.
    Oversized,
}

/// Source of framed stdio messages.
#[async_trait]
trait LineSource: Send {
    /// Returns the next framed message.
    async fn next_line(&mut self) -> Result<StdioLine, McpServerError>;
}

/// Frames lines from an async buffered reader.
struct AsyncLines<R> {
    /// Underlying reader.
    reader: R,
    /// Maximum allowed line size.
    max_body_bytes: usize,
}

#[async_trait]
impl<R> LineSource for AsyncLines<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_line(&mut self) -> Result<StdioLine, McpServerError> {
        read_line(&mut self.reader, self.max_body_bytes).await
    }
}

/// Receives lines framed by a blocking reader thread.
struct ChannelLines {
    /// Receiving half fed by the reader thread.
    receiver: mpsc::Receiver<Result<StdioLine, McpServerError>>,
}

#[async_trait]
impl LineSource for ChannelLines {
    async fn next_line(&mut self) -> Result<StdioLine, McpServerError> {
        self.receiver.recv().await.unwrap_or(Ok(StdioLine::Eof))
    }
}

/// Serves newline-delimited JSON-RPC messages until EOF or shutdown.
async fn serve_lines<L, W, F>(
    state: &ServerState,
    mut lines: L,
    mut writer: W,
    shutdown: F,
) -> Result<(), McpServerError>
where
    L: LineSource,
    W: AsyncWrite + Unpin,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let context = RequestContext::stdio();
    loop {
        let line = tokio::select! {
            () = &mut shutdown => return Ok(()),
            line = lines.next_line() => line?,
        };
        let response = match line {
            StdioLine::Eof => return Ok(()),
            StdioLine::Oversized => {
                state.audit.record_transport(&TransportAuditEvent::new(
                    ServerTransport::Stdio,
                    "request exceeds max_body_bytes",
                ));
                Some(JsonRpcResponse::error(Value::Null, INVALID_REQUEST, "request body too large"))
            }
            StdioLine::Payload(bytes) => {
                if bytes.trim_ascii().is_empty() {
                    continue;
                }
                handle_payload(state, &context, &bytes).await.1
            }
        };
        if let Some(response) = response {
            write_line(&mut writer, &response).await?;
        }
    }
}

/// Spawns a detached thread that frames lines from a blocking reader.
///
/// The thread stops after end of file, a read error, or once the receiver is
/// dropped and the next line arrives.
fn spawn_line_reader<O, R>(open: O, max_body_bytes: usize) -> Result<ChannelLines, McpServerError>
where
    O: FnOnce() -> R + Send + 'static,
    R: BufRead,
{
    let (sender, receiver) = mpsc::channel(STDIN_CHANNEL_CAPACITY);
    std::thread::Builder::new()
        .name("yc-storage-mcp-stdin".to_string())
        .spawn(move || {
            let mut reader = open();
            loop {
                let line = read_line_blocking(&mut reader, max_body_bytes);
                let last = !matches!(line, Ok(StdioLine::Payload(_) | StdioLine::Oversized));
                if sender.blocking_send(line).is_err() || last {
                    break;
                }
            }
        })
        .map_err(|err| McpServerError::Transport(format!("stdin reader spawn failed: {err}")))?;
    Ok(ChannelLines {
        receiver,
    })
}

/// Accumulates one newline-terminated message under the body limit.
struct LineFramer {
    /// Maximum allowed line size.
    max_body_bytes: usize,
    /// Bytes of the current line.
    buffer: Vec<u8>,
    /// Whether the current line already exceeded the limit.
    oversized: bool,
    /// Whether any input was seen for the current line.
    saw_data: bool,
}

impl LineFramer {
    /// Creates an empty framer.
    const fn new(max_body_bytes: usize) -> Self {
        Self {
            max_body_bytes,
            buffer: Vec::new(),
            oversized: false,
            saw_data: false,
        }
    }

    /// Feeds buffered input. Returns bytes consumed and whether the line ended.
    ///
    /// Empty input means end of file and always ends the line.
    fn feed(&mut self, available: &[u8]) -> (usize, bool) {
        if available.is_empty() {
            return (0, true);
        }
        self.saw_data = true;
        let newline = available.iter().position(|byte| *byte == b'\n');
        let chunk = newline.map_or(available, |index| &available[..index]);
        if !self.oversized {
            if self.buffer.len() + chunk.len() > self.max_body_bytes {
                self.oversized = true;
                self.buffer = Vec::new();
            } else {
                self.buffer.extend_from_slice(chunk);
            }
        }
        (newline.map_or(available.len(), |index| index + 1), newline.is_some())
    }

    /// Returns the framed line.
    fn finish(self) -> StdioLine {
        if !self.saw_data {
            StdioLine::Eof
        } else if self.oversized {
            StdioLine::Oversized
        } else {
            StdioLine::Payload(self.buffer)
        }
    }
}

/// Reads one newline-terminated message, enforcing the body limit.
async fn read_line<R>(reader: &mut R, max_body_bytes: usize) -> Result<StdioLine, McpServerError>
where
    R: AsyncBufRead + Unpin,
{
    let mut framer = LineFramer::new(max_body_bytes);
    loop {
        let available = reader
            .fill_buf()
            .await
            .map_err(|err| McpServerError::Transport(format!("stdio read failed: {err}")))?;
        let (consumed, complete) = framer.feed(available);
        reader.consume(consumed);
        if complete {
            return Ok(framer.finish());
        }
    }
}

/// Blocking counterpart of [`read_line`] for the stdin thread.
fn read_line_blocking<R>(reader: &mut R, max_body_bytes: usize) -> Result<StdioLine, McpServerError>
where
    R: BufRead,
{
    let mut framer = LineFramer::new(max_body_bytes);
    loop {
        let available = match BufRead::fill_buf(reader) {
            Ok(available) => available,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => {
                return Err(McpServerError::Transport(format!("stdio read failed: {err}")));
            }
        };
        let (consumed, complete) = framer.feed(available);
        BufRead::consume(reader, consumed);
        if complete {
            return Ok(framer.finish());
        }
    }
}

/// Writes one JSON-RPC response followed by a newline.
async fn write_line<W>(writer: &mut W, response: &JsonRpcResponse) -> Result<(), McpServerError>
where
    W: AsyncWrite + Unpin,
{
    let mut payload = serde_json::to_vec(response)
        .map_err(|_| McpServerError::Transport("json-rpc serialization failed".to_string()))?;
    payload.push(b'\n');
    writer
        .write_all(&payload)
        .await
        .map_err(|err| McpServerError::Transport(format!("stdio write failed: {err}")))?;
    writer
        .flush()
        .await
        .map_err(|err| McpServerError::Transport(format!("stdio write failed: {err}")))
}

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// Serves JSON-RPC requests over HTTP until `shutdown` resolves.
async fn serve_http<F>(
    state: Arc<ServerState>,
    bind: Option<String>,
    shutdown: F,
) -> Result<(), McpServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind = bind.ok_or_else(|| McpServerError::Config("bind address required".to_string()))?;
    let addr: SocketAddr = bind
        .trim()
        .parse()
        .map_err(|_| McpServerError::Config("invalid bind address".to_string()))?;
    let body_limit = state.max_body_bytes;
    let app = Router::new()
        .route("/rpc", post(handle_http))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| McpServerError::Transport(format!("http bind failed: {err}")))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|err| McpServerError::Transport(format!("http server failed: {err}")))
}

/// Handles HTTP JSON-RPC requests.
async fn handle_http(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    bytes: Bytes,
) -> Response {
    let context = RequestContext::http(Some(peer.ip()));
    match handle_payload(&state, &context, &bytes).await {
        (status, Some(response)) => (status, axum::Json(response)).into_response(),
        (_, None) => StatusCode::ACCEPTED.into_response(),
    }
}

// ============================================================================
// SECTION: JSON-RPC Handling
// ============================================================================

/// Incoming JSON-RPC message.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    jsonrpc: String,
    /// Request identifier; absent for notifications.
    #[serde(default)]
    id: Option<Value>,
    /// Method name.
    method: String,
    /// Optional parameters payload.
    #[serde(default)]
    params: Option<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Serialize, Deserialize)]
struct JsonRpcResponse {
    /// JSON-RPC protocol version.
    jsonrpc: String,
    /// Request identifier.
    id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Builds a successful response.
    fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Builds an error response.
    fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// JSON-RPC error payload.
#[derive(Debug, Serialize, Deserialize)]
struct JsonRpcError {
    /// Error code.
    code: i64,
    /// Human-readable error message.
    message: String,
}

/// `initialize` parameters; only the protocol version is read.
#[derive(Debug, Default, Deserialize)]
struct InitializeParams {
    /// Protocol version requested by the client.
    #[serde(default, rename = "protocolVersion")]
    protocol_version: Option<String>,
}

/// Tool call parameters for JSON-RPC requests.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Raw JSON arguments; a missing bag is treated as empty.
    #[serde(default)]
    arguments: Value,
}

/// Tool list response payload.
#[derive(Debug, Serialize)]
struct ToolListResult {
    /// Registered tool definitions.
    tools: Vec<ToolDefinition>,
}

/// Parses a raw message and dispatches it.
async fn handle_payload(
    state: &ServerState,
    context: &RequestContext,
    bytes: &[u8],
) -> (StatusCode, Option<JsonRpcResponse>) {
    if bytes.len() > state.max_body_bytes {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            Some(JsonRpcResponse::error(Value::Null, INVALID_REQUEST, "request body too large")),
        );
    }
    let Ok(value) = serde_json::from_slice::<Value>(bytes) else {
        state
            .audit
            .record_transport(&TransportAuditEvent::new(context.transport, "invalid json payload"));
        return (
            StatusCode::BAD_REQUEST,
            Some(JsonRpcResponse::error(Value::Null, PARSE_ERROR, "parse error")),
        );
    };
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    match serde_json::from_value::<JsonRpcRequest>(value) {
        Ok(request) => (StatusCode::OK, handle_request(state, context, request).await),
        Err(_) => (
            StatusCode::BAD_REQUEST,
            Some(JsonRpcResponse::error(id, INVALID_REQUEST, "invalid json-rpc request")),
        ),
    }
}

/// Dispatches a JSON-RPC request. Returns `None` for notifications.
async fn handle_request(
    state: &ServerState,
    base_context: &RequestContext,
    request: JsonRpcRequest,
) -> Option<JsonRpcResponse> {
    let id = request.id?;
    if request.jsonrpc != "2.0" {
        return Some(JsonRpcResponse::error(id, INVALID_REQUEST, "invalid json-rpc version"));
    }
    let context = base_context.clone().with_request_id(id.to_string());
    let response = match request.method.as_str() {
        "initialize" => {
            let params: InitializeParams = request
                .params
                .and_then(|params| serde_json::from_value(params).ok())
                .unwrap_or_default();
            let protocol_version =
                params.protocol_version.unwrap_or_else(|| DEFAULT_PROTOCOL_VERSION.to_string());
            JsonRpcResponse::result(
                id,
                json!({
                    "protocolVersion": protocol_version,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            )
        }
        "ping" => JsonRpcResponse::result(id, json!({})),
        "tools/list" => {
            let result = ToolListResult {
                tools: state.router.list_tools(),
            };
            to_result(id, &result)
        }
        "tools/call" => {
            let params = request.params.unwrap_or(Value::Null);
            match serde_json::from_value::<ToolCallParams>(params) {
                Ok(call) => {
                    let _guard = state.dispatch_lock.lock().await;
                    let response =
                        state.router.dispatch(&context, &call.name, call.arguments).await;
                    to_result(id, &response)
                }
                Err(_) => JsonRpcResponse::error(id, INVALID_PARAMS, "invalid tools/call params"),
            }
        }
        _ => JsonRpcResponse::error(id, METHOD_NOT_FOUND, "method not found"),
    };
    Some(response)
}

/// Serializes a result payload into a JSON-RPC response.
fn to_result<T: Serialize>(id: Value, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::result(id, value),
        Err(_) => JsonRpcResponse::error(id, INTERNAL_ERROR, "serialization failed"),
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// MCP server errors.
#[derive(Debug, thiserror::Error)]
pub enum McpServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}
