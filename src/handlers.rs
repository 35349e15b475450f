// HTTP request handlers for the pari-mutuel market API
//
// Thin adapter over `MarketEngine`: the caller and any attached value are
// explicit request fields. Currency, share and price-per-share amounts are
// decimal strings in whole units ("1.5"); responses carry raw 18-decimal
// fixed-point integers.

use crate::app_state::SharedState;
use crate::error::EngineError;
use crate::events::EventRecord;
use crate::ledger::{MarketView, PositionView};
use crate::lifecycle::{BatchPayoutReport, ClaimOutcome, FillReceipt, LimitOrderReceipt, NewMarket, SellReceipt};
use crate::math::{parse_decimal, to_decimal};
use crate::models::{Address, Amount, Bps, MarketId, OrderId, Outcome, Side};
use crate::orderbook::Order;
use crate::pricing::TradeReceipt;
use crate::settlement::Resolution;
use crate::treasury::Transaction;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

// ============================================================================
// ERRORS
// ============================================================================

/// Engine error rendered as `{ success: false, error, code }`
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError(err)
    }
}

pub fn status_for(err: &EngineError) -> StatusCode {
    match err {
        EngineError::InvalidInput(_) | EngineError::Overflow => StatusCode::BAD_REQUEST,
        EngineError::MarketNotFound(_) | EngineError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Unauthorized(_) => StatusCode::FORBIDDEN,
        EngineError::MarketNotActive(_)
        | EngineError::AlreadyResolved(_)
        | EngineError::NotResolved(_)
        | EngineError::NothingToClaim(_)
        | EngineError::OrderNotOpen(_) => StatusCode::CONFLICT,
        EngineError::InsufficientShares { .. }
        | EngineError::InsufficientFunds { .. }
        | EngineError::PriceLimitExceeded { .. }
        | EngineError::TransferFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "error": self.0.to_string(),
            "code": self.0.code(),
        }));
        (status_for(&self.0), body).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn amount(field: &str, text: &str) -> Result<Amount, ApiError> {
    parse_decimal(text)
        .ok_or_else(|| ApiError(EngineError::invalid(format!("{} must be a non-negative decimal, got {:?}", field, text))))
}

// ============================================================================
// REQUEST / RESPONSE BODIES
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateMarketRequest {
    pub creator: String,
    pub question: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub end_time: i64,
    pub resolution_time: i64,
    pub creation_fee: String,
}

#[derive(Debug, Serialize)]
pub struct CreateMarketResponse {
    pub success: bool,
    pub market_id: MarketId,
}

#[derive(Debug, Serialize)]
pub struct PriceResponse {
    pub market_id: MarketId,
    pub yes_price_bps: Bps,
    pub no_price_bps: Bps,
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    pub is_yes: bool,
    pub amount: String,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub market_id: MarketId,
    pub is_yes: bool,
    pub amount: Amount,
    pub shares: Amount,
    pub shares_display: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct TradeRequest {
    pub trader: String,
    pub is_yes: bool,
    /// Currency to spend (buy) or shares to burn (sell)
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub seller: String,
    pub is_yes: bool,
    pub shares: String,
    pub price_per_share: String,
}

#[derive(Debug, Serialize)]
pub struct PlaceOrderResponse {
    pub success: bool,
    pub order_id: OrderId,
}

#[derive(Debug, Deserialize)]
pub struct FillOrderRequest {
    pub buyer: String,
    pub payment: String,
}

#[derive(Debug, Deserialize)]
pub struct CallerRequest {
    pub caller: String,
}

#[derive(Debug, Deserialize)]
pub struct LimitOrderRequest {
    pub trader: String,
    pub is_yes: bool,
    pub limit_price_bps: Bps,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub caller: String,
    /// 1 = Yes, 2 = No, 3 = Invalid
    pub outcome: u8,
}

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub user: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchPayoutRequest {
    pub winners: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub amount: String,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub address: Address,
    pub balance: Amount,
    pub balance_display: Decimal,
    pub owed: Amount,
    pub markets: Vec<MarketId>,
}

#[derive(Debug, Serialize)]
pub struct WithdrawResponse {
    pub success: bool,
    pub amount: Amount,
}

#[derive(Debug, Serialize)]
pub struct EngineInfo {
    pub platform_fee_bps: Bps,
    pub market_creation_fee: Amount,
    pub next_market_id: MarketId,
    pub active_markets: Vec<MarketId>,
    pub accrued_fees: Amount,
}

#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct LedgerActivity {
    pub custody_balance: Amount,
    pub journal_valid: bool,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
    pub market: Option<u64>,
}

// ============================================================================
// MARKETS
// ============================================================================

pub async fn health_check() -> &'static str {
    "Pari-mutuel market engine - Online ✅"
}

pub async fn get_info(State(state): State<SharedState>) -> Json<EngineInfo> {
    let engine = &state.engine;
    Json(EngineInfo {
        platform_fee_bps: engine.platform_fee_bps(),
        market_creation_fee: engine.market_creation_fee(),
        next_market_id: engine.next_market_id(),
        active_markets: engine.get_active_markets(),
        accrued_fees: engine.accrued_fees(),
    })
}

pub async fn get_markets(State(state): State<SharedState>) -> Json<Vec<MarketView>> {
    Json(state.engine.list_markets())
}

pub async fn create_market(
    State(state): State<SharedState>,
    Json(req): Json<CreateMarketRequest>,
) -> ApiResult<CreateMarketResponse> {
    let fee = amount("creation_fee", &req.creation_fee)?;
    let params = NewMarket {
        question: req.question,
        description: req.description,
        category: req.category,
        end_time: req.end_time,
        resolution_time: req.resolution_time,
    };
    let market_id = state.engine.create_market(&Address::new(req.creator), params, fee)?;
    Ok(Json(CreateMarketResponse { success: true, market_id }))
}

pub async fn get_market(State(state): State<SharedState>, Path(id): Path<u64>) -> ApiResult<MarketView> {
    Ok(Json(state.engine.get_market(MarketId(id))?))
}

pub async fn get_price(State(state): State<SharedState>, Path(id): Path<u64>) -> ApiResult<PriceResponse> {
    let market_id = MarketId(id);
    Ok(Json(PriceResponse {
        market_id,
        yes_price_bps: state.engine.get_current_price(market_id, Side::Yes)?,
        no_price_bps: state.engine.get_current_price(market_id, Side::No)?,
    }))
}

pub async fn preview_shares(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Query(query): Query<PreviewQuery>,
) -> ApiResult<PreviewResponse> {
    let spend = amount("amount", &query.amount)?;
    let shares = state
        .engine
        .get_shares_amount(MarketId(id), Side::from_is_yes(query.is_yes), spend)?;
    Ok(Json(PreviewResponse {
        market_id: MarketId(id),
        is_yes: query.is_yes,
        amount: spend,
        shares,
        shares_display: to_decimal(shares),
    }))
}

pub async fn buy_shares(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(req): Json<TradeRequest>,
) -> ApiResult<TradeReceipt> {
    let spend = amount("amount", &req.amount)?;
    let receipt = state.engine.buy_shares(
        MarketId(id),
        &Address::new(req.trader),
        Side::from_is_yes(req.is_yes),
        spend,
    )?;
    Ok(Json(receipt))
}

pub async fn sell_shares(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(req): Json<TradeRequest>,
) -> ApiResult<SellReceipt> {
    let shares = amount("amount", &req.amount)?;
    let receipt = state.engine.sell_shares(
        MarketId(id),
        &Address::new(req.trader),
        Side::from_is_yes(req.is_yes),
        shares,
    )?;
    Ok(Json(receipt))
}

pub async fn get_position(
    State(state): State<SharedState>,
    Path((id, user)): Path<(u64, String)>,
) -> ApiResult<PositionView> {
    Ok(Json(state.engine.get_user_position(MarketId(id), &Address::new(user))?))
}

// ============================================================================
// ORDER BOOK
// ============================================================================

pub async fn get_open_orders(State(state): State<SharedState>, Path(id): Path<u64>) -> ApiResult<Vec<Order>> {
    Ok(Json(state.engine.get_open_orders(MarketId(id))?))
}

pub async fn place_sell_order(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(req): Json<PlaceOrderRequest>,
) -> ApiResult<PlaceOrderResponse> {
    let shares = amount("shares", &req.shares)?;
    let price = amount("price_per_share", &req.price_per_share)?;
    let order_id = state.engine.place_sell_order(
        MarketId(id),
        &Address::new(req.seller),
        Side::from_is_yes(req.is_yes),
        shares,
        price,
    )?;
    Ok(Json(PlaceOrderResponse { success: true, order_id }))
}

pub async fn get_seller_orders(
    State(state): State<SharedState>,
    Path((id, seller)): Path<(u64, String)>,
) -> ApiResult<Vec<Order>> {
    Ok(Json(state.engine.get_seller_orders(MarketId(id), &Address::new(seller))?))
}

pub async fn get_order(State(state): State<SharedState>, Path(id): Path<u64>) -> ApiResult<Order> {
    Ok(Json(state.engine.get_order(OrderId(id))?))
}

pub async fn fill_order(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(req): Json<FillOrderRequest>,
) -> ApiResult<FillReceipt> {
    let payment = amount("payment", &req.payment)?;
    Ok(Json(state.engine.buy_from_sell_order(OrderId(id), &Address::new(req.buyer), payment)?))
}

pub async fn cancel_order(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(req): Json<CallerRequest>,
) -> ApiResult<Order> {
    Ok(Json(state.engine.cancel_sell_order(OrderId(id), &Address::new(req.caller))?))
}

pub async fn place_limit_order(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(req): Json<LimitOrderRequest>,
) -> ApiResult<LimitOrderReceipt> {
    let spend = amount("amount", &req.amount)?;
    let receipt = state.engine.place_limit_order(
        MarketId(id),
        &Address::new(req.trader),
        Side::from_is_yes(req.is_yes),
        req.limit_price_bps,
        spend,
    )?;
    Ok(Json(receipt))
}

// ============================================================================
// SETTLEMENT
// ============================================================================

pub async fn resolve_market(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(req): Json<ResolveRequest>,
) -> ApiResult<Resolution> {
    let outcome = Outcome::from_code(req.outcome)
        .ok_or_else(|| ApiError(EngineError::invalid(format!("unknown outcome code {}", req.outcome))))?;
    Ok(Json(state.engine.resolve_market(MarketId(id), &Address::new(req.caller), outcome)?))
}

pub async fn claim_winnings(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(req): Json<ClaimRequest>,
) -> ApiResult<ClaimOutcome> {
    Ok(Json(state.engine.claim_winnings(MarketId(id), &Address::new(req.user))?))
}

pub async fn batch_payout(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(req): Json<BatchPayoutRequest>,
) -> ApiResult<BatchPayoutReport> {
    let winners: Vec<Address> = req.winners.into_iter().map(Address::new).collect();
    Ok(Json(state.engine.batch_payout_winners(MarketId(id), &winners)?))
}

pub async fn withdraw_fees(
    State(state): State<SharedState>,
    Json(req): Json<CallerRequest>,
) -> ApiResult<WithdrawResponse> {
    let amount = state.engine.withdraw_fees(&Address::new(req.caller))?;
    Ok(Json(WithdrawResponse { success: true, amount }))
}

// ============================================================================
// ACCOUNTS & EVENTS
// ============================================================================

pub async fn deposit(
    State(state): State<SharedState>,
    Path(addr): Path<String>,
    Json(req): Json<DepositRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let value = amount("amount", &req.amount)?;
    let address = Address::new(addr);
    state.treasury.deposit(&address, value).map_err(EngineError::from)?;
    Ok(Json(account_view(&state, address)))
}

pub async fn get_account(State(state): State<SharedState>, Path(addr): Path<String>) -> Json<AccountResponse> {
    Json(account_view(&state, Address::new(addr)))
}

pub async fn withdraw_owed(
    State(state): State<SharedState>,
    Path(addr): Path<String>,
) -> ApiResult<WithdrawResponse> {
    let amount = state.engine.withdraw_owed(&Address::new(addr))?;
    Ok(Json(WithdrawResponse { success: true, amount }))
}

fn account_view(state: &SharedState, address: Address) -> AccountResponse {
    let balance = state.treasury.balance(&address);
    AccountResponse {
        balance,
        balance_display: to_decimal(balance),
        owed: state.engine.owed_balance(&address),
        markets: state.engine.get_user_markets(&address),
        address,
    }
}

pub async fn get_user_markets(State(state): State<SharedState>, Path(addr): Path<String>) -> Json<Vec<MarketId>> {
    Json(state.engine.get_user_markets(&Address::new(addr)))
}

/// Most recent custody journal entries, newest first
pub async fn get_ledger_activity(
    State(state): State<SharedState>,
    Query(query): Query<LedgerQuery>,
) -> Json<LedgerActivity> {
    let limit = query.limit.unwrap_or(50).min(1_000);
    Json(LedgerActivity {
        custody_balance: state.treasury.custody_balance(),
        journal_valid: state.treasury.verify_journal(),
        transactions: state.treasury.recent_transactions(limit),
    })
}

pub async fn get_events(State(state): State<SharedState>, Query(query): Query<EventsQuery>) -> Json<Vec<EventRecord>> {
    let limit = query.limit.unwrap_or(100).min(crate::events::HISTORY_LIMIT);
    Json(state.engine.events().recent(limit, query.market.map(MarketId)))
}
