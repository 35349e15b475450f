// ============================================================================
// Order Book Module - Pari-mutuel Prediction Market
// ============================================================================
//
// Peer-to-peer exchange of already-minted shares. Runs beside the bonding
// curve and never moves its price: a fill transfers existing shares between
// positions and leaves pools and supply untouched.
//
// Escrow:
//   - placing an order reserves the seller's shares
//   - a fill moves the reserved shares to the buyer
//   - a cancel (by the seller, or by resolution) releases them
//
// ============================================================================

pub mod matching;
pub mod orders;

pub use matching::*;
pub use orders::*;

use crate::error::{EngineError, EngineResult};
use crate::ledger::MarketBook;
use crate::models::{Address, Amount, OrderId, Side};
use tracing::info;

/// Escrow `shares` of `side` from `seller` and rest a new open order
pub fn place_sell_order(
    book: &mut MarketBook,
    id: OrderId,
    seller: &Address,
    side: Side,
    shares: Amount,
    price_per_share: Amount,
    now: i64,
) -> EngineResult<Order> {
    book.market.ensure_trading_open(now)?;
    if shares == 0 {
        return Err(EngineError::invalid("shares must be positive"));
    }
    if price_per_share == 0 {
        return Err(EngineError::invalid("price per share must be positive"));
    }

    let order = Order::new(id, book.market.id, seller.clone(), side, shares, price_per_share, now);
    if order.cost().is_none() {
        return Err(EngineError::Overflow);
    }

    book.escrow_shares(seller, side, shares)?;
    book.orders.insert(id, order.clone());

    info!(
        "📝 Sell order {} placed: market {} {} {} shares @ {} by {}",
        id,
        book.market.id,
        side,
        shares,
        price_per_share,
        seller.short()
    );
    Ok(order)
}

/// Withdraw an open order. Only the seller may cancel; allowed at any time.
pub fn cancel_sell_order(
    book: &mut MarketBook,
    id: OrderId,
    caller: &Address,
    now: i64,
) -> EngineResult<Order> {
    let order = book.orders.get(&id).ok_or(EngineError::OrderNotFound(id))?;
    if &order.seller != caller {
        return Err(EngineError::Unauthorized(format!(
            "only the seller may cancel order {}",
            id
        )));
    }
    if !order.is_open() {
        return Err(EngineError::OrderNotOpen(id));
    }

    let (seller, side, shares) = (order.seller.clone(), order.side, order.shares);
    book.release_escrow(&seller, side, shares)?;

    let order = book.orders.get_mut(&id).ok_or(EngineError::OrderNotFound(id))?;
    order.mark_cancelled(now);

    info!("❌ Sell order {} cancelled by {}", id, caller.short());
    Ok(order.clone())
}

/// Cancel every open order in the book, releasing escrow. Used on resolution.
pub fn cancel_all_open(book: &mut MarketBook, now: i64) -> EngineResult<Vec<Order>> {
    let open: Vec<OrderId> = book
        .orders
        .values()
        .filter(|o| o.is_open())
        .map(|o| o.id)
        .collect();

    let mut cancelled = Vec::with_capacity(open.len());
    for id in open {
        let seller = match book.orders.get(&id) {
            Some(order) => order.seller.clone(),
            None => continue,
        };
        cancelled.push(cancel_sell_order(book, id, &seller, now)?);
    }
    Ok(cancelled)
}

/// Open orders of a market, oldest first
pub fn open_orders(book: &MarketBook) -> Vec<Order> {
    book.orders().filter(|o| o.is_open()).cloned().collect()
}

/// Orders (any status) placed by `seller`
pub fn orders_by_seller(book: &MarketBook, seller: &Address) -> Vec<Order> {
    book.orders().filter(|o| &o.seller == seller).cloned().collect()
}

// ============================================================================
// TESTS
// ============================================================================
