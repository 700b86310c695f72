//! Integration tests for the planning endpoints.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::{Value, json};
use stockplan_admin::config::PlanningConfig;
use stockplan_admin::services::PlanningSnapshot;
use stockplan_core::replenishment::{EditMergePolicy, StorePriority};
use stockplan_integration_tests::{TestApp, two_store_snapshot};

const PLAN_URI: &str = "/api/stock-planning/replenishment";

fn plan_body(priority: &[&str]) -> Value {
    json!({
        "startDate": "2026-09-01",
        "endDate": "2026-09-30",
        "selectedDeliveryOptions": ["D1"],
        "editedSegments": [],
        "storePriority": priority,
    })
}

// ============================================================================
// Planning
// ============================================================================

#[tokio::test]
async fn test_plan_serves_stores_in_priority_order() {
    let app = TestApp::new(two_store_snapshot());

    let (status, body) = app.post(PLAN_URI, plan_body(&["A", "B"])).await;
    assert_eq!(status, StatusCode::OK);

    let table = body["replenishmentTable"].as_array().unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table[0]["STORE"], "A");
    assert_eq!(table[0]["REPLENISHMENT"], 6);
    assert_eq!(table[0]["DELIVERY"], "D1");
    assert_eq!(table[1]["STORE"], "B");
    assert_eq!(table[1]["REPLENISHMENT"], 4);

    let breaks = body["breakData"].as_array().unwrap();
    assert_eq!(breaks.len(), 1);
    assert_eq!(breaks[0]["STORE"], "B");
    assert_eq!(breaks[0]["BREAK_QTY"], 2);

    assert_eq!(body["summary"]["totalReplenishment"], 10);
    assert_eq!(body["summary"]["totalBreakQty"], 2);
    assert_eq!(body["stockSegments"][0]["SKU"], "S1");
}

#[tokio::test]
async fn test_plan_reversed_priority_moves_break() {
    let app = TestApp::new(two_store_snapshot());

    let (status, body) = app.post(PLAN_URI, plan_body(&["B", "A"])).await;
    assert_eq!(status, StatusCode::OK);

    let table = body["replenishmentTable"].as_array().unwrap();
    assert_eq!(table[0]["STORE"], "B");
    assert_eq!(table[0]["REPLENISHMENT"], 6);
    assert_eq!(table[1]["STORE"], "A");
    assert_eq!(table[1]["REPLENISHMENT"], 4);
    assert_eq!(body["breakData"][0]["STORE"], "A");
}

#[tokio::test]
async fn test_plan_applies_segment_edits() {
    let app = TestApp::new(two_store_snapshot());

    let mut body = plan_body(&["A", "B"]);
    body["editedSegments"] = json!([{ "SKU": "S1", "DELIVERY": "D1", "A": 3, "B": 0 }]);

    let (status, body) = app.post(PLAN_URI, body).await;
    assert_eq!(status, StatusCode::OK);

    // B's zeroed target removes it from the plan; sales alone don't qualify it
    let table = body["replenishmentTable"].as_array().unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table[0]["STORE"], "A");
    assert_eq!(table[0]["REPLENISHMENT"], 3);
    assert!(body["breakData"].as_array().unwrap().is_empty());
    assert_eq!(body["stockSegments"][0]["A"], 3);
}

#[tokio::test]
async fn test_plan_edit_overrides_duplicate_fetched_segments() {
    let mut snapshot = two_store_snapshot();
    snapshot.segments.push(
        serde_json::from_value(json!({ "SKU": "S1", "DELIVERY": "D1", "A": 1, "B": 1 })).unwrap(),
    );
    let app = TestApp::new(snapshot);

    let mut body = plan_body(&["A", "B"]);
    body["editedSegments"] = json!([{ "SKU": "S1", "DELIVERY": "D1", "A": 7 }]);

    let (status, body) = app.post(PLAN_URI, body).await;
    assert_eq!(status, StatusCode::OK);

    let table = body["replenishmentTable"].as_array().unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table[0]["STORE"], "A");
    assert_eq!(table[0]["SEGMENT"], 7);
    assert_eq!(table[0]["REPLENISHMENT"], 7);
}

#[tokio::test]
async fn test_plan_reports_dropped_edits() {
    let app = TestApp::new(two_store_snapshot());

    let mut body = plan_body(&["A", "B"]);
    body["editedSegments"] = json!([{ "SKU": "UNKNOWN", "A": 5 }]);

    let (status, body) = app.post(PLAN_URI, body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["droppedEdits"], json!(["UNKNOWN"]));
    assert_eq!(body["summary"]["totalReplenishment"], 10);
}

#[tokio::test]
async fn test_plan_insert_policy_keeps_unknown_edits() {
    let planning = PlanningConfig {
        edit_policy: EditMergePolicy::ReplaceOrInsert,
        ..PlanningConfig::default()
    };
    let app = TestApp::with_planning(two_store_snapshot(), planning);

    let mut body = plan_body(&["A", "B"]);
    body["editedSegments"] = json!([{ "SKU": "UNKNOWN", "A": 5 }]);

    let (status, body) = app.post(PLAN_URI, body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["droppedEdits"], json!([]));
    assert_eq!(body["stockSegments"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_plan_uses_default_priority() {
    let planning = PlanningConfig {
        default_store_priority: StorePriority::new(["B", "A"]),
        ..PlanningConfig::default()
    };
    let app = TestApp::with_planning(two_store_snapshot(), planning);

    let (status, body) = app.post(PLAN_URI, plan_body(&[])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["replenishmentTable"][0]["STORE"], "B");
}

#[tokio::test]
async fn test_plan_without_any_priority_is_bad_request() {
    let app = TestApp::new(two_store_snapshot());

    let (status, body) = app.post(PLAN_URI, plan_body(&[])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("storePriority"));
}

#[tokio::test]
async fn test_plan_inverted_window_is_bad_request() {
    let app = TestApp::new(two_store_snapshot());

    let mut body = plan_body(&["A"]);
    body["endDate"] = json!("2026-08-01");

    let (status, _) = app.post(PLAN_URI, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_plan_malformed_body_is_bad_request() {
    let app = TestApp::new(two_store_snapshot());

    let (status, body) = app.post(PLAN_URI, json!({ "startDate": "nope" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_plan_with_no_data_is_empty() {
    let app = TestApp::new(PlanningSnapshot::default());

    let (status, body) = app.post(PLAN_URI, plan_body(&["A"])).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["replenishmentTable"].as_array().unwrap().is_empty());
    assert_eq!(body["summary"]["totalReplenishment"], 0);
}

// ============================================================================
// Segments
// ============================================================================

fn multi_delivery_snapshot() -> PlanningSnapshot {
    serde_json::from_value(json!({
        "segments": [
            { "SKU": "S1", "DELIVERY": "D1", "A": 1 },
            { "SKU": "S2", "DELIVERY": "D2", "A": 2 },
            { "SKU": "S3", "DELIVERY": "D3", "A": 3 }
        ]
    }))
    .unwrap()
}

#[tokio::test]
async fn test_delivery_options() {
    let app = TestApp::new(multi_delivery_snapshot());

    let (status, body) = app.get("/api/stock-planning/delivery-options").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["D1", "D2", "D3"]));
}

#[tokio::test]
async fn test_segments_filter_by_repeated_delivery() {
    let app = TestApp::new(multi_delivery_snapshot());

    let (status, body) = app
        .get("/api/stock-planning/segments?delivery=D1&delivery=D3")
        .await;
    assert_eq!(status, StatusCode::OK);

    let skus: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["SKU"].as_str().unwrap())
        .collect();
    assert_eq!(skus, ["S1", "S3"]);
}

#[tokio::test]
async fn test_segments_query_and_bad_page() {
    let app = TestApp::new(multi_delivery_snapshot());

    let (status, body) = app.get("/api/stock-planning/segments?query=s2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, _) = app.get("/api/stock-planning/segments?page=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new(PlanningSnapshot::default());

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));

    let (status, _) = app.get("/health/ready").await;
    assert_eq!(status, StatusCode::OK);
}
