// crates/yc-storage-mcp/src/context.rs
// ============================================================================
// Module: Request Context
// Description: Per-request metadata carried from transports to the router.
// Purpose: Attribute tool calls to a transport and JSON-RPC request id.
// Dependencies: yc-storage-config
// ============================================================================

//! ## Overview
//! [`RequestContext`] records which transport delivered a tool call, the peer
//! address for HTTP callers, and the JSON-RPC request id. It exists only for
//! audit attribution and never changes tool behavior.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::IpAddr;

use crate::config::ServerTransport;

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Request metadata used for audit attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Transport used by the caller.
    pub transport: ServerTransport,
    /// Peer IP address when available.
    pub peer_ip: Option<IpAddr>,
    /// Optional request identifier for auditing.
    pub request_id: Option<String>,
}

impl RequestContext {
    /// Builds a stdio request context.
    #[must_use]
    pub const fn stdio() -> Self {
        Self {
            transport: ServerTransport::Stdio,
            peer_ip: None,
            request_id: None,
        }
    }

    /// Builds an HTTP request context.
    #[must_use]
    pub const fn http(peer_ip: Option<IpAddr>) -> Self {
        Self {
            transport: ServerTransport::Http,
            peer_ip,
            request_id: None,
        }
    }

    /// Returns a copy with the request identifier set.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}
