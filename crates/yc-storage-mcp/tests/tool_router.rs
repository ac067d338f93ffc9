// crates/yc-storage-mcp/tests/tool_router.rs
// ============================================================================
// Module: Tool Router Tests
// Description: Dispatcher and listing behavior against an in-memory gateway.
// Purpose: Pin result texts, error envelopes, and validation ordering.
// Dependencies: yc-storage-mcp, serde_json
// ============================================================================

//! ## Overview
//! Exercises `list_buckets`, `list_objects`, and dispatcher error handling
//! through the public [`ToolRouter`] API.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions are permitted."
)]

mod common;

use std::sync::Arc;

use common::GatewayCall;
use common::InMemoryGateway;
use common::router_with;
use serde_json::Value;
use serde_json::json;
use yc_storage_mcp::RequestContext;
use yc_storage_mcp::ToolContent;
use yc_storage_mcp::audit::ToolOutcome;
use yc_storage_mcp::gateway::ListObjectsQuery;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Runs a tool call and returns the single envelope text.
async fn call_text(gateway: &Arc<InMemoryGateway>, name: &str, arguments: Value) -> String {
    let (router, _) = router_with(Arc::clone(gateway));
    let response = router.dispatch(&RequestContext::stdio(), name, arguments).await;
    assert_eq!(response.content.len(), 1);
    match &response.content[0] {
        ToolContent::Text {
            text,
        } => text.clone(),
    }
}

/// Splits a result text into its header and parsed JSON body.
fn split_listing(text: &str) -> (&str, Value) {
    let (header, body) = text.split_once('\n').expect("listing header");
    (header, serde_json::from_str(body).expect("listing json"))
}

// ============================================================================
// SECTION: list_buckets
// ============================================================================

#[tokio::test]
async fn list_buckets_with_no_buckets() {
    let gateway = Arc::new(InMemoryGateway::new());
    let text = call_text(&gateway, "list_buckets", json!({})).await;
    assert_eq!(text, "Found 0 bucket(s):\n[]");
}

#[tokio::test]
async fn list_buckets_reports_names_and_creation_dates() {
    let gateway = Arc::new(
        InMemoryGateway::new()
            .with_bucket("photos", Some("2023-01-02T03:04:05Z"))
            .with_bucket("logs", None),
    );
    let text = call_text(&gateway, "list_buckets", Value::Null).await;
    let (header, body) = split_listing(&text);
    assert_eq!(header, "Found 2 bucket(s):");
    assert_eq!(
        body,
        json!([
            { "name": "photos", "creationDate": "2023-01-02T03:04:05Z" },
            { "name": "logs" }
        ])
    );
    assert!(text.contains("\n  {\n    \"name\": \"photos\""), "pretty JSON expected: {text}");
}

#[tokio::test]
async fn list_buckets_failure_is_wrapped() {
    let gateway = Arc::new(InMemoryGateway::new().failing("AccessDenied"));
    let text = call_text(&gateway, "list_buckets", json!({})).await;
    assert_eq!(
        text,
        "Error executing list_buckets: failed to list buckets: storage backend error: AccessDenied"
    );
}

// ============================================================================
// SECTION: list_objects
// ============================================================================

#[tokio::test]
async fn list_objects_uses_default_limit_and_no_prefix() {
    let gateway = Arc::new(InMemoryGateway::new().with_listing("photos", "a.jpg", 10));
    let text = call_text(&gateway, "list_objects", json!({ "bucket": "photos" })).await;
    let (header, body) = split_listing(&text);
    assert_eq!(header, "Found 1 object(s) in bucket \"photos\":");
    assert_eq!(
        body,
        json!([{
            "key": "a.jpg",
            "size": 10,
            "lastModified": "2024-05-01T10:00:00Z",
            "etag": "\"etag-a.jpg\""
        }])
    );
    assert_eq!(
        gateway.calls(),
        vec![GatewayCall::ListObjects(ListObjectsQuery {
            bucket: "photos".to_string(),
            prefix: None,
            max_keys: 1000,
        })]
    );
}

#[tokio::test]
async fn list_objects_filters_by_prefix_in_gateway_order() {
    let gateway = Arc::new(
        InMemoryGateway::new()
            .with_listing("docs", "2024/b.txt", 2)
            .with_listing("docs", "2023/a.txt", 1)
            .with_listing("docs", "2024/a.txt", 3),
    );
    let text =
        call_text(&gateway, "list_objects", json!({ "bucket": "docs", "prefix": "2024/" })).await;
    let (header, body) = split_listing(&text);
    assert_eq!(header, "Found 2 object(s) in bucket \"docs\":");
    let keys: Vec<&str> =
        body.as_array().unwrap().iter().map(|entry| entry["key"].as_str().unwrap()).collect();
    assert_eq!(keys, vec!["2024/b.txt", "2024/a.txt"]);
}

#[tokio::test]
async fn list_objects_never_reports_more_than_max_keys() {
    let mut gateway = InMemoryGateway::new();
    for index in 0..5 {
        gateway = gateway.with_listing("big", &format!("key-{index}"), index);
    }
    let gateway = Arc::new(gateway);
    let text = call_text(&gateway, "list_objects", json!({ "bucket": "big", "maxKeys": 2 })).await;
    let (header, body) = split_listing(&text);
    assert_eq!(header, "Found 2 object(s) in bucket \"big\":");
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn list_objects_empty_bucket_succeeds() {
    let gateway = Arc::new(InMemoryGateway::new());
    let text = call_text(&gateway, "list_objects", json!({ "bucket": "empty" })).await;
    assert_eq!(text, "Found 0 object(s) in bucket \"empty\":\n[]");
}

#[tokio::test]
async fn list_objects_failure_is_wrapped() {
    let gateway = Arc::new(InMemoryGateway::new().failing("NoSuchBucket"));
    let text = call_text(&gateway, "list_objects", json!({ "bucket": "missing" })).await;
    assert_eq!(
        text,
        "Error executing list_objects: failed to list objects: storage backend error: NoSuchBucket"
    );
}

#[tokio::test]
async fn list_objects_without_bucket_never_calls_gateway() {
    let gateway = Arc::new(InMemoryGateway::new());
    let text = call_text(&gateway, "list_objects", json!({ "prefix": "a" })).await;
    assert!(text.starts_with("Error executing list_objects: invalid parameters:"), "{text}");
    assert!(text.contains("bucket"), "{text}");
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn list_objects_rejects_zero_max_keys_before_gateway() {
    let gateway = Arc::new(InMemoryGateway::new());
    let text = call_text(&gateway, "list_objects", json!({ "bucket": "b", "maxKeys": 0 })).await;
    assert!(text.contains("maxKeys must be between 1 and"), "{text}");
    assert!(gateway.calls().is_empty());
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

#[tokio::test]
async fn unknown_tool_names_the_tool() {
    let gateway = Arc::new(InMemoryGateway::new());
    let text = call_text(&gateway, "upload_object", json!({})).await;
    assert_eq!(text, "Error executing upload_object: unknown tool: upload_object");
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn every_call_is_audited_once() {
    let gateway = Arc::new(InMemoryGateway::new());
    let (router, audit) = router_with(Arc::clone(&gateway));
    let context = RequestContext::stdio().with_request_id("9");
    router.dispatch(&context, "list_buckets", json!({})).await;
    router.dispatch(&context, "nope", json!({})).await;

    let events = audit.tool_calls();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].tool, "list_buckets");
    assert_eq!(events[0].outcome, ToolOutcome::Ok);
    assert_eq!(events[0].request_id.as_deref(), Some("9"));
    assert_eq!(events[1].outcome, ToolOutcome::Error);
    assert_eq!(events[1].error.as_deref(), Some("unknown tool: nope"));
}

#[test]
fn list_tools_matches_registry() {
    let (router, _) = router_with(Arc::new(InMemoryGateway::new()));
    let names: Vec<&str> = router.list_tools().iter().map(|tool| tool.name.as_str()).collect();
    assert_eq!(names, vec!["list_buckets", "list_objects", "download_object"]);
}
