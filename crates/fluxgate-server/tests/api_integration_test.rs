//! Integration tests for the fluxgate HTTP API
//!
//! Builds a real router over a recording sink, then sends requests via
//! tower::ServiceExt to cover the range-query and manual-write endpoints.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use tower::ServiceExt;

use fluxgate_core::{Point, NODE_TAG, OWNER_TAG, THING_TAG};
use fluxgate_influx::{MemorySink, PointSink};
use fluxgate_server::{create_router, AppState, PointService};

/// Create a test app over a recording sink, keeping the sink for seeding
/// and inspection.
fn test_app() -> (axum::Router, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let service = PointService::new(sink.clone());
    (create_router(AppState { service }), sink)
}

/// Helper to read response body as bytes
async fn body_bytes(body: Body) -> Vec<u8> {
    body.collect().await.unwrap().to_bytes().to_vec()
}

fn seeded_point() -> Point {
    let mut tags = BTreeMap::new();
    tags.insert(OWNER_TAG.to_string(), "acme".to_string());
    tags.insert(THING_TAG.to_string(), "tractor".to_string());
    tags.insert(NODE_TAG.to_string(), "axle-1".to_string());
    let mut fields = BTreeMap::new();
    fields.insert("lat".to_string(), "-22.91".to_string());
    Point::new(
        Utc.with_ymd_and_hms(2020, 5, 24, 14, 27, 33).unwrap(),
        tags,
        fields,
    )
    .unwrap()
}

// ---------------------------------------------------------------
// Health
// ---------------------------------------------------------------

#[tokio::test]
async fn test_health_check() {
    let (app, _sink) = test_app();

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp.into_body()).await, b"fluxgate");
}

// ---------------------------------------------------------------
// Range queries
// ---------------------------------------------------------------

#[tokio::test]
async fn test_query_points_with_time_param() {
    let (app, sink) = test_app();
    sink.write_point(&seeded_point()).await.unwrap();

    let resp = app
        .oneshot(
            Request::builder()
                .uri(
                    "/owner/acme/thing/tractor/node/axle-1\
                     ?time=2020-05-24T00:00:00Z/2020-05-25T00:00:00Z",
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_bytes(resp.into_body()).await;
    let points: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(points.as_array().unwrap().len(), 1);
    assert_eq!(points[0]["owner"], "acme");
    assert_eq!(points[0]["thing"], "tractor");
    assert_eq!(points[0]["node"], "axle-1");
    assert_eq!(points[0]["attributes"]["lat"], "-22.91");
    assert!(points[0]["dateTime"]
        .as_str()
        .unwrap()
        .starts_with("2020-05-24T14:27:33"));
}

#[tokio::test]
async fn test_query_points_with_start_end_params() {
    let (app, sink) = test_app();
    sink.write_point(&seeded_point()).await.unwrap();

    let resp = app
        .oneshot(
            Request::builder()
                .uri(
                    "/owner/acme/thing/tractor/node/axle-1\
                     ?startDateTime=2020-05-24T00:00:00Z&endDateTime=2020-05-25T00:00:00Z",
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_bytes(resp.into_body()).await;
    let points: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(points.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_query_points_outside_range_is_empty() {
    let (app, sink) = test_app();
    sink.write_point(&seeded_point()).await.unwrap();

    let resp = app
        .oneshot(
            Request::builder()
                .uri(
                    "/owner/acme/thing/tractor/node/axle-1\
                     ?time=2021-01-01T00:00:00Z/2021-12-31T00:00:00Z",
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_bytes(resp.into_body()).await;
    let points: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(points.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_query_points_rejects_malformed_time_param() {
    let (app, _sink) = test_app();

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/owner/acme/thing/tractor/node/axle-1?time=yesterday/today")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = String::from_utf8(body_bytes(resp.into_body()).await).unwrap();
    assert!(body.starts_with("Error parsing time interval query params:"));
}

#[tokio::test]
async fn test_query_points_requires_a_period() {
    let (app, _sink) = test_app();

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/owner/acme/thing/tractor/node/axle-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = String::from_utf8(body_bytes(resp.into_body()).await).unwrap();
    assert!(body.contains("You must provide either the `time` query param"));
}

#[tokio::test]
async fn test_query_points_rejects_fully_wildcarded_identity() {
    let (app, _sink) = test_app();

    let resp = app
        .oneshot(
            Request::builder()
                .uri(
                    "/owner/+/thing/+/node/+\
                     ?time=2020-05-24T00:00:00Z/2020-05-25T00:00:00Z",
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = String::from_utf8(body_bytes(resp.into_body()).await).unwrap();
    assert!(body.contains("At least one of the 'owner', 'thing' or 'node' tags"));
}

#[tokio::test]
async fn test_query_points_allows_partial_wildcards() {
    let (app, sink) = test_app();
    sink.write_point(&seeded_point()).await.unwrap();

    let resp = app
        .oneshot(
            Request::builder()
                .uri(
                    "/owner/acme/thing/+/node/+\
                     ?time=2020-05-24T00:00:00Z/2020-05-25T00:00:00Z",
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_bytes(resp.into_body()).await;
    let points: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(points.as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------
// Manual point writes
// ---------------------------------------------------------------

#[tokio::test]
async fn test_create_point() {
    let (app, sink) = test_app();

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/owner/acme/thing/tractor/node/axle-1")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"dateTime":"2020-05-24T14:27:33Z","lat":"-22.91","lng":"-43.17"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(body_bytes(resp.into_body()).await, b"State point created");

    let written = sink.written().await;
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].tag(OWNER_TAG), Some("acme"));
    assert_eq!(written[0].tag(THING_TAG), Some("tractor"));
    assert_eq!(written[0].tag(NODE_TAG), Some("axle-1"));
    assert_eq!(written[0].fields()["lat"], "-22.91");
    assert_eq!(written[0].fields()["lng"], "-43.17");
    assert!(!written[0].fields().contains_key("dateTime"));
    assert_eq!(
        written[0].timestamp(),
        Utc.with_ymd_and_hms(2020, 5, 24, 14, 27, 33).unwrap()
    );
}

#[tokio::test]
async fn test_create_then_query_point() {
    let (app, _sink) = test_app();

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/owner/acme/thing/tractor/node/axle-1")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"dateTime":"2020-05-24T14:27:33Z","lat":"-22.91"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app
        .oneshot(
            Request::builder()
                .uri(
                    "/owner/acme/thing/tractor/node/axle-1\
                     ?time=2020-05-24T00:00:00Z/2020-05-25T00:00:00Z",
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_bytes(resp.into_body()).await;
    let points: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(points.as_array().unwrap().len(), 1);
    assert_eq!(points[0]["attributes"]["lat"], "-22.91");
}

#[tokio::test]
async fn test_create_point_requires_date_time() {
    let (app, sink) = test_app();

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/owner/acme/thing/tractor/node/axle-1")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"lat":"-22.91"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = String::from_utf8(body_bytes(resp.into_body()).await).unwrap();
    assert_eq!(
        body,
        "The attribute `dateTime` must be provided in the request body. This is the \
         date and time that the data was collected."
    );
    assert!(sink.written().await.is_empty());
}

#[tokio::test]
async fn test_create_point_rejects_malformed_date_time() {
    let (app, sink) = test_app();

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/owner/acme/thing/tractor/node/axle-1")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"dateTime":"24/05/2020","lat":"-22.91"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = String::from_utf8(body_bytes(resp.into_body()).await).unwrap();
    assert_eq!(
        body,
        "You must provide a `dateTime` field in the RFC3339 format (Ex: 2020-05-24T14:27:33Z)"
    );
    assert!(sink.written().await.is_empty());
}

#[tokio::test]
async fn test_create_point_rejects_static_attributes() {
    let (app, sink) = test_app();

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/owner/acme/thing/tractor/node/axle-1")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"dateTime":"2020-05-24T14:27:33Z","$serial":"abc"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = String::from_utf8(body_bytes(resp.into_body()).await).unwrap();
    assert!(body.contains("$serial"));
    assert!(sink.written().await.is_empty());
}

#[tokio::test]
async fn test_create_point_surfaces_sink_failure() {
    let (app, sink) = test_app();
    sink.fail_writes(true);

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/owner/acme/thing/tractor/node/axle-1")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"dateTime":"2020-05-24T14:27:33Z","lat":"-22.91"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
