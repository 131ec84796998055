use std::path::PathBuf;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use cardwise_api::build_app;
use serde_json::json;
use tower::ServiceExt;

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data")
}

#[tokio::test]
async fn health_is_public() {
    let app = build_app(data_dir()).expect("app should build");

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed.get("cards_loaded").and_then(|v| v.as_u64()), Some(2));
}

#[tokio::test]
async fn query_requires_api_key() {
    let app = build_app(data_dir()).expect("app should build");

    let request = Request::builder()
        .method("POST")
        .uri("/v1/query")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "text": "which card is better for dining?"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn query_returns_structured_payload() {
    let app = build_app(data_dir()).expect("app should build");

    let request = Request::builder()
        .method("POST")
        .uri("/v1/query")
        .header("content-type", "application/json")
        .header("x-api-key", "dev-cardwise-key")
        .body(Body::from(
            json!({
                "text": "which card is better if I spend 50000 on dining?"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(
        parsed.get("intent").and_then(|v| v.as_str()),
        Some("feature_comparison")
    );
    let computation = parsed.get("computation").expect("computation present");
    assert_eq!(
        computation.get("winner").and_then(|v| v.as_str()),
        Some("icici-epm")
    );
    assert_eq!(
        computation
            .get("rewards")
            .and_then(|v| v.as_array())
            .map(|v| v.len()),
        Some(2)
    );
    assert!(parsed.get("card_context").is_some());
}

#[tokio::test]
async fn empty_query_is_rejected() {
    let app = build_app(data_dir()).expect("app should build");

    let request = Request::builder()
        .method("POST")
        .uri("/v1/query")
        .header("content-type", "application/json")
        .header("x-api-key", "dev-cardwise-key")
        .body(Body::from(json!({ "text": "   " }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cards_listing_names_both_programmes() {
    let app = build_app(data_dir()).expect("app should build");

    let request = Request::builder()
        .uri("/v1/cards")
        .header("x-api-key", "dev-cardwise-key")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let ids: Vec<&str> = parsed
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|card| card.get("id").and_then(|v| v.as_str()))
        .collect();

    assert!(ids.contains(&"axis-atlas"));
    assert!(ids.contains(&"icici-epm"));
}
