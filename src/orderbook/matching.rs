// ============================================================================
// Taker Matching - Pari-mutuel Prediction Market
// ============================================================================
//
// Taker-side execution against resting sell orders.
//
// Matching Rules:
//   1. Orders fill all-or-nothing; there are no partial fills
//   2. Price priority: cheaper orders match first
//   3. Time priority: at the same price, older orders match first
//   4. Self-trade prevention: a taker never fills its own orders
//
// A limit order takes book liquidity within its bound and sends any
// remaining budget to the bonding curve, but only if the exact curve price is
// within the bound too. Anything else rejects the whole order.
//
// ============================================================================

use super::orders::Order;
use crate::error::{EngineError, EngineResult};
use crate::ledger::{LedgerUpdate, MarketBook};
use crate::math::{bps_to_price, product_le};
use crate::models::{Address, Amount, Bps, OrderId, Side, BPS_DENOMINATOR};
use crate::pricing::{self, BondingCurve, TradeReceipt};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ============================================================================
// SINGLE FILL
// ============================================================================

/// A validated fill of one order awaiting commit
#[derive(Debug, Clone)]
pub struct PlannedFill {
    pub order: Order,
    pub buyer: Address,
    /// Whole payment forwarded to the seller
    pub payment: Amount,
    pub update: LedgerUpdate,
}

/// Validate `buyer` taking order `id` for `payment`
pub fn plan_fill(
    book: &MarketBook,
    id: OrderId,
    buyer: &Address,
    payment: Amount,
    now: i64,
) -> EngineResult<PlannedFill> {
    let order = book.order(id).ok_or(EngineError::OrderNotFound(id))?;
    if !order.is_open() {
        return Err(EngineError::OrderNotOpen(id));
    }
    book.market.ensure_trading_open(now)?;
    if &order.seller == buyer {
        return Err(EngineError::invalid("cannot fill your own order"));
    }

    let required = order.cost().ok_or(EngineError::Overflow)?;
    if payment < required {
        return Err(EngineError::InsufficientFunds { provided: payment, required });
    }

    let update = book.plan_transfer(&order.seller, buyer, order.side, order.shares, payment)?;
    Ok(PlannedFill {
        order: order.clone(),
        buyer: buyer.clone(),
        payment,
        update,
    })
}

/// Write a planned fill and close the order
pub fn commit_fill(book: &mut MarketBook, fill: PlannedFill, now: i64) -> EngineResult<Order> {
    let id = fill.order.id;
    book.commit(fill.update);
    let order = book.orders.get_mut(&id).ok_or(EngineError::OrderNotFound(id))?;
    order.mark_filled(fill.buyer, now);
    Ok(order.clone())
}

// ============================================================================
// LIMIT ORDER
// ============================================================================

/// One resting order consumed by a limit order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitFill {
    pub order_id: OrderId,
    pub seller: Address,
    pub shares: Amount,
    pub cost: Amount,
}

/// Outcome of a limit order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitOrderReport {
    pub trader: Address,
    pub side: Side,
    pub limit_price_bps: Bps,
    /// Budget spent, always the full amount
    pub amount: Amount,
    pub fills: Vec<LimitFill>,
    pub curve_leg: Option<TradeReceipt>,
    pub total_shares: Amount,
}

/// A validated limit order: the book as it will be after execution
#[derive(Debug, Clone)]
pub struct PlannedLimitOrder {
    pub report: LimitOrderReport,
    pub book: MarketBook,
}

/// Plan a taker buy of `side` spending exactly `amount` at no worse than `limit_price_bps`.
///
/// Works on a scratch copy of the book; the caller swaps it in after
/// collecting `amount` from the trader.
pub fn plan_limit_order(
    curve: &BondingCurve,
    book: &MarketBook,
    trader: &Address,
    side: Side,
    limit_price_bps: Bps,
    amount: Amount,
    now: i64,
) -> EngineResult<PlannedLimitOrder> {
    book.market.ensure_trading_open(now)?;
    if amount == 0 {
        return Err(EngineError::invalid("amount must be positive"));
    }
    if limit_price_bps == 0 || limit_price_bps > BPS_DENOMINATOR {
        return Err(EngineError::invalid("limit price must be within 1..=10000 bps"));
    }

    let limit_price = bps_to_price(limit_price_bps);
    let mut candidates: Vec<&Order> = book
        .orders()
        .filter(|o| o.is_open() && o.side == side && &o.seller != trader && o.price_per_share <= limit_price)
        .collect();
    candidates.sort_by_key(|o| (o.price_per_share, o.timestamp, o.id));
    let candidates: Vec<Order> = candidates.into_iter().cloned().collect();

    let mut scratch = book.clone();
    let mut remaining = amount;
    let mut fills = Vec::new();
    let mut total_shares: Amount = 0;

    for order in candidates {
        let cost = order.cost().ok_or(EngineError::Overflow)?;
        if cost == 0 || cost > remaining {
            continue;
        }
        let planned = plan_fill(&scratch, order.id, trader, cost, now)?;
        commit_fill(&mut scratch, planned, now)?;

        remaining -= cost;
        total_shares = total_shares.checked_add(order.shares).ok_or(EngineError::Overflow)?;
        fills.push(LimitFill {
            order_id: order.id,
            seller: order.seller.clone(),
            shares: order.shares,
            cost,
        });
        if remaining == 0 {
            break;
        }
    }

    let mut curve_leg = None;
    if remaining > 0 {
        if !curve.within_limit(&scratch.market, side, limit_price_bps) {
            debug!(
                "⛔ Limit order rejected: {} bps quote above {} bps limit with {} unspent",
                curve.quote(&scratch.market, side),
                limit_price_bps,
                remaining
            );
            return Err(EngineError::PriceLimitExceeded { limit_bps: limit_price_bps });
        }
        let planned = pricing::plan_buy(curve, &scratch, trader, side, remaining, now)?;
        // floored share counts can push the paid price past the marginal one
        let paid = planned.receipt.amount;
        if !product_le(paid, BPS_DENOMINATOR as Amount, limit_price_bps as Amount, planned.receipt.shares) {
            debug!(
                "⛔ Limit order rejected: {} paid for {} shares exceeds {} bps",
                paid, planned.receipt.shares, limit_price_bps
            );
            return Err(EngineError::PriceLimitExceeded { limit_bps: limit_price_bps });
        }
        scratch.commit(planned.update);
        total_shares = total_shares
            .checked_add(planned.receipt.shares)
            .ok_or(EngineError::Overflow)?;
        curve_leg = Some(planned.receipt);
    }

    Ok(PlannedLimitOrder {
        report: LimitOrderReport {
            trader: trader.clone(),
            side,
            limit_price_bps,
            amount,
            fills,
            curve_leg,
            total_shares,
        },
        book: scratch,
    })
}

// ============================================================================
// TESTS
// ============================================================================
