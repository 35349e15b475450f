/// HTTP API tests
///
/// Exercises the router in-process with `tower::ServiceExt::oneshot`; no
/// server needs to be running.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use parimutuel_ledger::{router, AppConfig, AppState, ManualClock};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const WAD: u64 = 1_000_000_000_000_000_000;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn app() -> Router {
    let clock = Arc::new(ManualClock::new(1_000));
    let state = AppState::with_clock(&AppConfig::default(), clock).unwrap();
    router(state.shared())
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
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
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn funded_market(app: &Router) -> u64 {
    for user in ["alice", "bob"] {
        let (status, _) = call(app, "POST", &format!("/accounts/{}/deposit", user), Some(json!({ "amount": "5" }))).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = call(
        app,
        "POST",
        "/markets",
        Some(json!({
            "creator": "alice",
            "question": "Will the API work?",
            "category": "test",
            "end_time": 2_000,
            "resolution_time": 3_000,
            "creation_fee": "0.01"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    body["market_id"].as_u64().unwrap()
}

// ============================================================================
// ENDPOINT TESTS
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_market_trading_over_http() {
    let app = app();
    let id = funded_market(&app).await;

    let (status, price) = call(&app, "GET", &format!("/markets/{}/price", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(price["yes_price_bps"], 5_000);
    assert_eq!(price["no_price_bps"], 5_000);

    let (_, preview) = call(&app, "GET", &format!("/markets/{}/preview?is_yes=true&amount=1", id), None).await;
    assert_eq!(preview["shares"].as_u64(), Some(2 * WAD));

    let (status, receipt) = call(
        &app,
        "POST",
        &format!("/markets/{}/buy", id),
        Some(json!({ "trader": "bob", "is_yes": true, "amount": "1" })),
    )
    .await;
    println!("🎲 Buy receipt: {}", receipt);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["shares"].as_u64(), Some(2 * WAD));
    assert_eq!(receipt["side"], "yes");

    let (_, position) = call(&app, "GET", &format!("/markets/{}/positions/bob", id), None).await;
    assert_eq!(position["yes_shares"].as_u64(), Some(2 * WAD));

    let (_, account) = call(&app, "GET", "/accounts/bob", None).await;
    assert_eq!(account["balance"].as_u64(), Some(4 * WAD));
    assert_eq!(account["markets"], json!([id]));
}

#[tokio::test]
async fn test_sell_order_endpoints() {
    let app = app();
    let id = funded_market(&app).await;
    call(
        &app,
        "POST",
        &format!("/markets/{}/buy", id),
        Some(json!({ "trader": "alice", "is_yes": false, "amount": "1" })),
    )
    .await;

    let (status, placed) = call(
        &app,
        "POST",
        &format!("/markets/{}/orders", id),
        Some(json!({ "seller": "alice", "is_yes": false, "shares": "2", "price_per_share": "0.5" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let order_id = placed["order_id"].as_u64().unwrap();

    let (_, open) = call(&app, "GET", &format!("/markets/{}/orders", id), None).await;
    assert_eq!(open.as_array().map(Vec::len), Some(1));

    let (status, fill) = call(
        &app,
        "POST",
        &format!("/orders/{}/fill", order_id),
        Some(json!({ "buyer": "bob", "payment": "1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fill["seller_transfer"]["status"], "paid");

    let (status, err) = call(
        &app,
        "POST",
        &format!("/orders/{}/cancel", order_id),
        Some(json!({ "caller": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "order_not_open");
}

#[tokio::test]
async fn test_resolution_and_claim_over_http() {
    let app = app();
    let id = funded_market(&app).await;
    call(
        &app,
        "POST",
        &format!("/markets/{}/buy", id),
        Some(json!({ "trader": "alice", "is_yes": true, "amount": "1" })),
    )
    .await;
    call(
        &app,
        "POST",
        &format!("/markets/{}/buy", id),
        Some(json!({ "trader": "bob", "is_yes": false, "amount": "1" })),
    )
    .await;

    let (status, err) = call(
        &app,
        "POST",
        &format!("/markets/{}/resolve", id),
        Some(json!({ "caller": "bob", "outcome": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["success"], false);

    let (status, resolution) = call(
        &app,
        "POST",
        &format!("/markets/{}/resolve", id),
        Some(json!({ "caller": "oracle", "outcome": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolution["outcome"], "yes");

    let (status, claim) = call(&app, "POST", &format!("/markets/{}/claim", id), Some(json!({ "user": "alice" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(claim["net"].as_u64(), Some(WAD / 100 * 98));

    let (status, err) = call(&app, "POST", &format!("/markets/{}/claim", id), Some(json!({ "user": "alice" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "nothing_to_claim");

    let (_, events) = call(&app, "GET", &format!("/events?limit=1&market={}", id), None).await;
    assert_eq!(events[0]["type"], "winnings_claimed");
}

#[tokio::test]
async fn test_bad_requests_are_rejected() {
    let app = app();
    let id = funded_market(&app).await;

    let (status, err) = call(
        &app,
        "POST",
        &format!("/markets/{}/buy", id),
        Some(json!({ "trader": "bob", "is_yes": true, "amount": "lots" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "invalid_input");

    let (status, _) = call(&app, "GET", "/markets/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, err) = call(
        &app,
        "POST",
        &format!("/markets/{}/buy", id),
        Some(json!({ "trader": "carol", "is_yes": true, "amount": "1" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["code"], "insufficient_funds");

    let (status, err) = call(
        &app,
        "POST",
        &format!("/markets/{}/resolve", id),
        Some(json!({ "caller": "oracle", "outcome": 7 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "invalid_input");
}

#[tokio::test]
async fn test_ledger_and_seller_orders() {
    let app = app();
    let id = funded_market(&app).await;
    call(
        &app,
        "POST",
        &format!("/markets/{}/buy", id),
        Some(json!({ "trader": "alice", "is_yes": true, "amount": "1" })),
    )
    .await;
    call(
        &app,
        "POST",
        &format!("/markets/{}/orders", id),
        Some(json!({ "seller": "alice", "is_yes": true, "shares": "1", "price_per_share": "0.6" })),
    )
    .await;

    let (status, orders) = call(&app, "GET", &format!("/markets/{}/orders/alice", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().map(Vec::len), Some(1));
    let (_, none) = call(&app, "GET", &format!("/markets/{}/orders/bob", id), None).await;
    assert_eq!(none, json!([]));

    let (status, ledger) = call(&app, "GET", "/ledger?limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ledger["journal_valid"], true);
    assert_eq!(ledger["transactions"].as_array().map(Vec::len), Some(2));
    assert_eq!(ledger["transactions"][0]["tx_type"], "buy");
}
