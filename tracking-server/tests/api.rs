//! HTTP routes through the full middleware stack

mod common;

use axum::Router;
use axum::body::Body;
use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{minutes_from_now, order_input, setup};
use tracking_server::api::build_app;

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn health_reports_components() {
    let env = setup(true, false).await;
    let app = build_app(env.state.clone());

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["ledger_enabled"], true);
    assert_eq!(body["messaging_enabled"], false);

    let (status, body) = send(&app, Method::GET, "/health/detailed", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["database"]["status"], "ok");
    assert_eq!(body["checks"]["broker"]["status"], "disabled");
}

#[tokio::test]
async fn responses_carry_request_id() {
    let env = setup(false, false).await;
    let app = build_app(env.state.clone());

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn order_lifecycle_over_http() {
    let env = setup(true, false).await;
    let app = build_app(env.state.clone());

    let (status, created) = send(
        &app,
        Method::POST,
        "/order/add",
        Some(serde_json::to_value(order_input(3)).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let order_id = created["id"].as_i64().unwrap();
    assert_eq!(created["products"].as_array().unwrap().len(), 2);

    let (status, fetched) = send(&app, Method::GET, &format!("/order/{order_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(created["tracking_code"].is_string());
    assert_eq!(fetched["tracking_code"], created["tracking_code"]);
    assert_eq!(fetched["products"], created["products"]);

    let (status, record) = send(
        &app,
        Method::POST,
        "/order/history/add",
        Some(json!({
            "order_id": order_id,
            "order_status": "SHIPPED",
            "note": "Left the warehouse",
            "order_location": "Hub B",
            "timestamp_history": minutes_from_now(1)
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["status"], "SHIPPED");
    assert!(!record["ledger_tx_ref"].as_str().unwrap().is_empty());

    let (status, history) =
        send(&app, Method::GET, &format!("/order/history/{order_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["status"], "SHIPPED");
    assert_eq!(history[1]["status"], "PROCESSING");

    let (status, verdict) =
        send(&app, Method::GET, &format!("/order/verify/{order_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verdict["status"], "VERIFIED");
    assert_eq!(verdict["verified"], true);
}

#[tokio::test]
async fn invalid_status_update_is_bad_request() {
    let env = setup(false, false).await;
    let app = build_app(env.state.clone());

    let (status, body) = send(
        &app,
        Method::POST,
        "/order/history/add",
        Some(json!({ "order_status": "SHIPPED" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 7);
}

#[tokio::test]
async fn unknown_order_endpoints_are_not_found() {
    let env = setup(true, false).await;
    let app = build_app(env.state.clone());

    let (status, body) = send(&app, Method::GET, "/order/verify/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 4003);

    let (status, body) = send(&app, Method::GET, "/order/history/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 4001);

    let (status, _) = send(&app, Method::GET, "/order/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn storages_and_ledger_status() {
    let env = setup(false, false).await;
    tracking_server::db::repository::storage::create(
        env.state.pool(),
        "North depot",
        "1 Depot Way",
        41.5,
        2.1,
    )
    .await
    .unwrap();
    let app = build_app(env.state.clone());

    let (status, storages) = send(&app, Method::GET, "/storages", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(storages.as_array().unwrap().len(), 1);
    assert_eq!(storages[0]["name"], "North depot");

    let (status, ledger) = send(&app, Method::GET, "/ledger/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ledger["connected"], false);
    assert_eq!(ledger["error"], "Ledger is not configured");
}
