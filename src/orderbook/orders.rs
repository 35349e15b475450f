// ============================================================================
// Sell Order Types - Pari-mutuel Prediction Market
// ============================================================================
//
// Peer-to-peer sell orders for already-minted shares.
//
// Price Convention:
//   - `price_per_share` is currency per whole share, 18-decimal fixed point
//   - cost of an order = shares * price_per_share / 10^18
//   - limit orders speak basis points; 10000 bps = 1 whole unit per share
//
// An order is mutable only while open. Filled and cancelled orders are kept
// as history.
//
// ============================================================================

use crate::math::share_cost;
use crate::models::{Address, Amount, MarketId, OrderId, Side};
use serde::{Deserialize, Serialize};

// ============================================================================
// ENUMS
// ============================================================================

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Resting, shares escrowed
    Open,
    /// Bought in full by a taker
    Filled,
    /// Withdrawn by the seller or by resolution
    Cancelled,
}

impl OrderStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, OrderStatus::Open)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

// ============================================================================
// SELL ORDER
// ============================================================================

/// A maker sell order on the peer-to-peer book
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub market_id: MarketId,

    /// Wallet address of the maker
    pub seller: Address,

    pub side: Side,

    /// Shares offered (all-or-nothing)
    pub shares: Amount,

    /// Currency per whole share
    pub price_per_share: Amount,

    /// Unix timestamp when placed
    pub timestamp: i64,

    pub filled: bool,
    pub cancelled: bool,

    /// Taker that filled the order
    pub buyer: Option<Address>,

    /// Unix timestamp of fill or cancellation
    pub closed_at: Option<i64>,
}

impl Order {
    pub fn new(
        id: OrderId,
        market_id: MarketId,
        seller: Address,
        side: Side,
        shares: Amount,
        price_per_share: Amount,
        timestamp: i64,
    ) -> Self {
        Self {
            id,
            market_id,
            seller,
            side,
            shares,
            price_per_share,
            timestamp,
            filled: false,
            cancelled: false,
            buyer: None,
            closed_at: None,
        }
    }

    pub fn status(&self) -> OrderStatus {
        if self.filled {
            OrderStatus::Filled
        } else if self.cancelled {
            OrderStatus::Cancelled
        } else {
            OrderStatus::Open
        }
    }

    pub fn is_open(&self) -> bool {
        self.status().is_active()
    }

    /// Currency required to fill the order; `None` on overflow
    pub fn cost(&self) -> Option<Amount> {
        share_cost(self.shares, self.price_per_share)
    }

    pub(crate) fn mark_filled(&mut self, buyer: Address, now: i64) {
        self.filled = true;
        self.buyer = Some(buyer);
        self.closed_at = Some(now);
    }

    pub(crate) fn mark_cancelled(&mut self, now: i64) {
        self.cancelled = true;
        self.closed_at = Some(now);
    }
}

// ============================================================================
// TESTS
// ============================================================================
