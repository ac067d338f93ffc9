// crates/yc-storage-config/src/lib.rs
// ============================================================================
// Module: YC Storage Config Library
// Description: Canonical config model, validation, and credential resolution.
// Purpose: Single source of truth for yc-storage-mcp.toml semantics.
// Dependencies: serde, toml, thiserror
// ============================================================================

//! ## Overview
//! `yc-storage-config` defines the configuration model for the Yandex Cloud
//! Object Storage MCP server. The config file is optional: a missing default
//! file yields built-in defaults that point at the Yandex Cloud regional
//! endpoint. Credentials are always sourced from the process environment.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
