// crates/yc-storage-mcp/src/envelope.rs
// ============================================================================
// Module: Tool Response Envelope
// Description: Uniform `tools/call` result payload.
// Purpose: Render every tool outcome as a single text content item.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every tool invocation yields exactly one [`ToolResponse`] holding exactly
//! one text item. Failures are rendered into the text as
//! `Error executing <tool>: <message>` rather than surfaced as JSON-RPC errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Display;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Envelope
// ============================================================================

/// Tool call response payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResponse {
    /// Tool output content.
    pub content: Vec<ToolContent>,
}

/// Tool output content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContent {
    /// Human-readable text output.
    Text {
        /// Text payload.
        text: String,
    },
}

impl ToolResponse {
    /// Builds a response with one text item.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: text.into(),
            }],
        }
    }

    /// Builds the error response for a failed tool call.
    #[must_use]
    pub fn error(tool: &str, error: &impl Display) -> Self {
        Self::text(format!("Error executing {tool}: {error}"))
    }

    /// Returns the first text item, if any.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|item| match item {
            ToolContent::Text {
                text,
            } => text.as_str(),
        })
    }
}
