// Routes module - wires every HTTP endpoint to its handler

use crate::app_state::SharedState;
use crate::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

/// Endpoint summary printed at startup
pub const ENDPOINTS: &[(&str, &str, &str)] = &[
    ("GET", "/markets", "List all markets"),
    ("POST", "/markets", "Create a market (pays creation fee)"),
    ("GET", "/markets/:id", "Market details and prices"),
    ("GET", "/markets/:id/price", "YES/NO price in basis points"),
    ("GET", "/markets/:id/preview", "Shares a spend would buy"),
    ("POST", "/markets/:id/buy", "Buy shares from the curve"),
    ("POST", "/markets/:id/sell", "Sell shares to the curve"),
    ("GET", "/markets/:id/orders", "Open sell orders"),
    ("POST", "/markets/:id/orders", "Place a sell order"),
    ("GET", "/markets/:id/orders/:seller", "Orders placed by a seller"),
    ("POST", "/markets/:id/limit", "Limit buy across book and curve"),
    ("POST", "/markets/:id/resolve", "Resolve (authority only)"),
    ("POST", "/markets/:id/claim", "Claim winnings or refund"),
    ("POST", "/markets/:id/payouts", "Batch payout to winners"),
    ("GET", "/markets/:id/positions/:user", "User position"),
    ("GET", "/orders/:id", "Order details"),
    ("POST", "/orders/:id/fill", "Buy a sell order in full"),
    ("POST", "/orders/:id/cancel", "Cancel a sell order"),
    ("GET", "/users/:addr/markets", "Markets a user traded"),
    ("GET", "/accounts/:addr", "Custody balance and owed amount"),
    ("POST", "/accounts/:addr/deposit", "Deposit funds"),
    ("POST", "/accounts/:addr/withdraw-owed", "Withdraw failed payouts"),
    ("POST", "/fees/withdraw", "Withdraw accrued platform fees"),
    ("GET", "/config", "Engine parameters"),
    ("GET", "/events", "Recent market events"),
    ("GET", "/ledger", "Custody journal activity"),
];

pub fn router(state: SharedState) -> Router {
    Router::new()
        // ===== MARKETS =====
        .route("/markets", get(get_markets).post(create_market))
        .route("/markets/:id", get(get_market))
        .route("/markets/:id/price", get(get_price))
        .route("/markets/:id/preview", get(preview_shares))
        .route("/markets/:id/positions/:user", get(get_position))
        // ===== TRADING =====
        .route("/markets/:id/buy", post(buy_shares))
        .route("/markets/:id/sell", post(sell_shares))
        .route("/markets/:id/orders", get(get_open_orders).post(place_sell_order))
        .route("/markets/:id/orders/:seller", get(get_seller_orders))
        .route("/markets/:id/limit", post(place_limit_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/fill", post(fill_order))
        .route("/orders/:id/cancel", post(cancel_order))
        // ===== SETTLEMENT =====
        .route("/markets/:id/resolve", post(resolve_market))
        .route("/markets/:id/claim", post(claim_winnings))
        .route("/markets/:id/payouts", post(batch_payout))
        .route("/fees/withdraw", post(withdraw_fees))
        // ===== ACCOUNTS =====
        .route("/users/:addr/markets", get(get_user_markets))
        .route("/accounts/:addr", get(get_account))
        .route("/accounts/:addr/deposit", post(deposit))
        .route("/accounts/:addr/withdraw-owed", post(withdraw_owed))
        // ===== META =====
        .route("/config", get(get_info))
        .route("/events", get(get_events))
        .route("/ledger", get(get_ledger_activity))
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
