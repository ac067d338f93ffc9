// crates/yc-storage-mcp/src/lib.rs
// ============================================================================
// Module: YC Storage MCP
// Description: MCP server exposing Yandex Cloud Object Storage tools.
// Purpose: Provide list/download tools over an S3-compatible gateway.
// Dependencies: aws-sdk-s3, axum, tokio, yc-storage-config
// ============================================================================

//! ## Overview
//! YC Storage MCP exposes three tools (`list_buckets`, `list_objects`,
//! `download_object`) to MCP clients over stdio or HTTP. Tool handlers talk to
//! object storage only through [`gateway::StorageGateway`]; the production
//! implementation is [`s3_gateway::S3StorageGateway`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod config;
pub mod context;
pub mod envelope;
pub mod gateway;
pub mod s3_gateway;
pub mod server;
pub mod tooling;
pub mod tools;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use config::StorageMcpConfig;
pub use context::RequestContext;
pub use envelope::ToolContent;
pub use envelope::ToolResponse;
pub use gateway::BucketSummary;
pub use gateway::GatewayError;
pub use gateway::ObjectSummary;
pub use gateway::StorageGateway;
pub use s3_gateway::S3StorageGateway;
pub use server::McpServer;
pub use server::McpServerError;
pub use tooling::ToolDefinition;
pub use tooling::ToolName;
pub use tools::ToolError;
pub use tools::ToolRouter;
