// crates/yc-storage-mcp/src/config.rs
// ============================================================================
// Module: MCP Configuration (Re-export)
// Description: Re-export canonical YC Storage MCP config types.
// Purpose: Keep server callers on a single configuration source of truth.
// Dependencies: yc-storage-config
// ============================================================================

//! ## Overview
//! Server code reads configuration through this module so the MCP crate and
//! the CLI share one set of config types from `yc-storage-config`.

/// Re-export canonical config types and helpers.
pub use yc_storage_config::*;
