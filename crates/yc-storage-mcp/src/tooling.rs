// crates/yc-storage-mcp/src/tooling.rs
// ============================================================================
// Module: MCP Tool Registry
// Description: Canonical tool names, definitions, and input schemas.
// Purpose: Provide the static tool catalog advertised through tools/list.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! This module defines the MCP tool surface. Tool names are part of the
//! external contract; the registry order is preserved in `tools/list`
//! responses. Append new tools at the end.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default `maxKeys` for `list_objects`.
pub const DEFAULT_MAX_KEYS: u32 = 1000;

// ============================================================================
// SECTION: Tool Names
// ============================================================================

/// Canonical tool names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    /// List every bucket.
    ListBuckets,
    /// List objects in a bucket.
    ListObjects,
    /// Download an object to the local filesystem.
    DownloadObject,
}

impl ToolName {
    /// Returns the canonical string name for the tool.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ListBuckets => "list_buckets",
            Self::ListObjects => "list_objects",
            Self::DownloadObject => "download_object",
        }
    }

    /// Returns all tool names in canonical order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::ListBuckets, Self::ListObjects, Self::DownloadObject]
    }

    /// Parses a tool name from its string representation.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|tool| tool.as_str() == name)
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Tool Definitions
// ============================================================================

/// Tool definition used by MCP tool listing.
///
/// # Invariants
/// - `name` is a stable MCP tool identifier.
/// - `input_schema` is a JSON Schema object for the tool arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// MCP tool name.
    pub name: ToolName,
    /// Tool description for clients.
    pub description: String,
    /// JSON schema for tool input.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Returns the canonical tool definitions in registry order.
#[must_use]
pub fn tool_definitions() -> Vec<ToolDefinition> {
    ToolName::all().iter().map(|tool| tool_definition(*tool)).collect()
}

/// Builds the definition for a single tool.
#[must_use]
pub fn tool_definition(tool: ToolName) -> ToolDefinition {
    let (description, input_schema) = match tool {
        ToolName::ListBuckets => (
            "List all buckets in Yandex Cloud Object Storage.",
            object_schema(&json!({}), &[]),
        ),
        ToolName::ListObjects => (
            "List objects in the given bucket.",
            object_schema(
                &json!({
                    "bucket": schema_string("Bucket name."),
                    "prefix": schema_string("Key prefix used to filter objects (optional)."),
                    "maxKeys": {
                        "type": "integer",
                        "minimum": 1,
                        "default": DEFAULT_MAX_KEYS,
                        "description": "Maximum number of objects to return (default 1000)."
                    }
                }),
                &["bucket"],
            ),
        ),
        ToolName::DownloadObject => (
            "Download an object from a bucket to a local path.",
            object_schema(
                &json!({
                    "bucket": schema_string("Bucket name."),
                    "key": schema_string("Object key (path) inside the bucket."),
                    "localPath": schema_string("Local filesystem path to write the file to.")
                }),
                &["bucket", "key", "localPath"],
            ),
        ),
    };
    ToolDefinition {
        name: tool,
        description: description.to_string(),
        input_schema,
    }
}

// ============================================================================
// SECTION: Schema Helpers
// ============================================================================

/// Builds an object schema with the given properties and required fields.
fn object_schema(properties: &Value, required: &[&str]) -> Value {
    let mut schema = json!({
        "type": "object",
        "properties": properties,
    });
    if !required.is_empty()
        && let Value::Object(map) = &mut schema
    {
        let required_values: Vec<Value> =
            required.iter().map(|value| Value::String((*value).to_string())).collect();
        map.insert(String::from("required"), Value::Array(required_values));
    }
    schema
}

/// Returns a described string schema.
fn schema_string(description: &str) -> Value {
    json!({
        "type": "string",
        "description": description
    })
}
