use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use haul_api::{app, middleware::issue_staff_token, AppState, AuthConfig};
use haul_core::{TrackingCode, WarehouseItem, WarehouseItemStatus};
use haul_store::MemoryWarehouseStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "test-secret";

fn auth() -> AuthConfig {
    AuthConfig {
        secret: SECRET.to_string(),
        expiration: 3600,
    }
}

async fn test_app(in_warehouse: &[&str]) -> (Router, MemoryWarehouseStore) {
    let store = MemoryWarehouseStore::new();
    for raw in in_warehouse {
        store
            .insert_item(WarehouseItem::new(
                TrackingCode::parse(raw).unwrap(),
                WarehouseItemStatus::InWarehouse,
            ))
            .await;
    }
    let state = AppState::new(Arc::new(store.clone()), Arc::new(store.clone()), auth(), 16);
    (app(state), store)
}

fn token(role: &str) -> String {
    issue_staff_token(&auth(), "staff-1", role).unwrap()
}

fn post_json(uri: &str, body: Value, role: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(role) = role {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(role)));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, role: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(role) = role {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(role)));
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_check_reports_buckets() {
    let (app, _) = test_app(&["TXM001"]).await;

    let response = app
        .oneshot(post_json(
            "/v1/packings/check",
            json!({ "destination": "HN-01", "tracking_codes": ["TXM001", "TXM002", "TXM001"] }),
            Some("warehouse"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["valid_count"], 1);
    assert_eq!(body["invalid_codes"], json!(["TXM002"]));
    assert_eq!(body["can_create"], false);
    assert_eq!(body["entries"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_create_then_reject_second_packing() {
    let (app, store) = test_app(&["TXM001", "TXM002"]).await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/packings",
            json!({ "destination": "HN-01", "tracking_codes": ["TXM001", "TXM002"] }),
            Some("warehouse"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["status"], "CREATED");
    assert_eq!(created["created_by"], "WAREHOUSE");

    let response = app
        .oneshot(post_json(
            "/v1/packings",
            json!({ "destination": "HN-01", "tracking_codes": ["TXM002"] }),
            Some("warehouse"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["reasons"], json!(["ALREADY_PACKED"]));
    assert_eq!(body["validation"]["already_packed_codes"], json!(["TXM002"]));
    assert_eq!(store.packings().await.len(), 1);
}

#[tokio::test]
async fn test_blank_destination_is_bad_request() {
    let (app, _) = test_app(&["TXM001"]).await;

    let response = app
        .oneshot(post_json(
            "/v1/packings",
            json!({ "destination": "   ", "tracking_codes": ["TXM001"] }),
            Some("warehouse"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_packings_require_staff_token() {
    let (app, _) = test_app(&["TXM001"]).await;
    let body = json!({ "destination": "HN-01", "tracking_codes": ["TXM001"] });

    let missing = app
        .clone()
        .oneshot(post_json("/v1/packings", body.clone(), None))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let customer = app
        .oneshot(post_json("/v1/packings", body, Some("customer")))
        .await
        .unwrap();
    assert_eq!(customer.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_dispatch_and_history() {
    let (app, _) = test_app(&["TXM001"]).await;

    let created = app
        .clone()
        .oneshot(post_json(
            "/v1/packings",
            json!({ "destination": "HN-01", "tracking_codes": ["TXM001"] }),
            Some("warehouse"),
        ))
        .await
        .unwrap();
    let id = body_json(created).await["id"].as_str().unwrap().to_string();

    let dispatched = app
        .clone()
        .oneshot(post_json(&format!("/v1/packings/{}/dispatch", id), json!({}), Some("dispatcher")))
        .await
        .unwrap();
    assert_eq!(dispatched.status(), StatusCode::OK);
    assert_eq!(body_json(dispatched).await["status"], "DISPATCHED");

    let again = app
        .clone()
        .oneshot(post_json(&format!("/v1/packings/{}/dispatch", id), json!({}), Some("dispatcher")))
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::CONFLICT);

    let history = app
        .oneshot(get("/v1/process-log/warehouse_item/TXM001", Some("warehouse")))
        .await
        .unwrap();
    assert_eq!(history.status(), StatusCode::OK);
    let body = body_json(history).await;
    let actions: Vec<&str> = body["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["WAREHOUSE_ITEM_PACKED", "WAREHOUSE_ITEM_DISPATCHED"]);
    assert_eq!(body["entries"][1]["actor_role"], "DISPATCHER");
}

#[tokio::test]
async fn test_unknown_packing_is_not_found() {
    let (app, _) = test_app(&[]).await;

    let response = app
        .oneshot(get(&format!("/v1/packings/{}", uuid::Uuid::new_v4()), Some("warehouse")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_catalogue_and_transitions() {
    let (app, _) = test_app(&[]).await;

    let response = app.clone().oneshot(get("/v1/statuses/order_link", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["statuses"].as_array().unwrap().len(), 9);

    let allowed = app
        .clone()
        .oneshot(get("/v1/statuses/packing/transitions?from=CREATED&to=DISPATCHED", None))
        .await
        .unwrap();
    assert_eq!(body_json(allowed).await["allowed"], true);

    let disallowed = app
        .clone()
        .oneshot(get("/v1/statuses/packing/transitions?from=DISPATCHED&to=CREATED", None))
        .await
        .unwrap();
    assert_eq!(body_json(disallowed).await["allowed"], false);

    let unknown = app
        .clone()
        .oneshot(get("/v1/statuses/packing/transitions?from=CREATED&to=LOST", None))
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);

    let bad_domain = app.oneshot(get("/v1/statuses/shipment", None)).await.unwrap();
    assert_eq!(bad_domain.status(), StatusCode::BAD_REQUEST);
}
