// ============================================================================
// Market Record - Pari-mutuel Prediction Market
// ============================================================================
//
// Aggregate state of one binary market.
//
// Invariants:
//   - yes_pool + no_pool == net trading inflows to this market
//   - resolved == true  =>  active == false
//   - outcome is set exactly once and never returns to Unresolved
//
// ============================================================================

use crate::error::{EngineError, EngineResult};
use crate::math::to_decimal;
use crate::models::{Address, Amount, MarketId, Outcome, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One binary prediction market
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,

    /// Market question/title
    pub question: String,

    pub description: String,

    /// Category (crypto, politics, sports, ...)
    pub category: String,

    /// Account that created the market and paid the creation fee
    pub creator: Address,

    /// Unix timestamp of creation
    pub created_at: i64,

    /// Trading closes at this Unix timestamp
    pub end_time: i64,

    /// Expected resolution Unix timestamp (informational)
    pub resolution_time: i64,

    /// Unix timestamp of resolution, once resolved
    pub resolved_at: Option<i64>,

    pub active: bool,
    pub resolved: bool,
    pub outcome: Outcome,

    /// Currency credited to the YES side, used for payouts
    pub yes_pool: Amount,

    /// Currency credited to the NO side, used for payouts
    pub no_pool: Amount,

    /// Minted YES shares
    pub total_yes_shares: Amount,

    /// Minted NO shares
    pub total_no_shares: Amount,

    /// Sum of open YES cost basis across positions
    pub total_yes_invested: Amount,

    /// Sum of open NO cost basis across positions
    pub total_no_invested: Amount,

    /// Gross currency traded (curve buys and sells plus order-book fills)
    pub total_volume: Amount,
}

impl Market {
    pub fn new(
        id: MarketId,
        question: String,
        description: String,
        category: String,
        creator: Address,
        created_at: i64,
        end_time: i64,
        resolution_time: i64,
    ) -> Self {
        Self {
            id,
            question,
            description,
            category,
            creator,
            created_at,
            end_time,
            resolution_time,
            resolved_at: None,
            active: true,
            resolved: false,
            outcome: Outcome::Unresolved,
            yes_pool: 0,
            no_pool: 0,
            total_yes_shares: 0,
            total_no_shares: 0,
            total_yes_invested: 0,
            total_no_invested: 0,
            total_volume: 0,
        }
    }

    pub fn pool(&self, side: Side) -> Amount {
        match side {
            Side::Yes => self.yes_pool,
            Side::No => self.no_pool,
        }
    }

    pub fn total_shares(&self, side: Side) -> Amount {
        match side {
            Side::Yes => self.total_yes_shares,
            Side::No => self.total_no_shares,
        }
    }

    pub fn total_invested(&self, side: Side) -> Amount {
        match side {
            Side::Yes => self.total_yes_invested,
            Side::No => self.total_no_invested,
        }
    }

    pub(crate) fn pool_mut(&mut self, side: Side) -> &mut Amount {
        match side {
            Side::Yes => &mut self.yes_pool,
            Side::No => &mut self.no_pool,
        }
    }

    pub(crate) fn total_shares_mut(&mut self, side: Side) -> &mut Amount {
        match side {
            Side::Yes => &mut self.total_yes_shares,
            Side::No => &mut self.total_no_shares,
        }
    }

    pub(crate) fn total_invested_mut(&mut self, side: Side) -> &mut Amount {
        match side {
            Side::Yes => &mut self.total_yes_invested,
            Side::No => &mut self.total_no_invested,
        }
    }

    /// Total currency held for this market across both sides
    pub fn total_pool(&self) -> Amount {
        self.yes_pool.saturating_add(self.no_pool)
    }

    /// Check if trading is allowed at `now`
    pub fn is_trading_open(&self, now: i64) -> bool {
        self.active && !self.resolved && now < self.end_time
    }

    /// Error unless trading is allowed at `now`
    pub fn ensure_trading_open(&self, now: i64) -> EngineResult<()> {
        if !self.is_trading_open(now) {
            return Err(EngineError::MarketNotActive(self.id));
        }
        Ok(())
    }

    /// Lock the market with its final outcome. Terminal.
    pub(crate) fn resolve(&mut self, outcome: Outcome, now: i64) -> EngineResult<()> {
        if self.resolved {
            return Err(EngineError::AlreadyResolved(self.id));
        }
        if outcome == Outcome::Unresolved {
            return Err(EngineError::invalid("outcome must be yes, no or invalid"));
        }
        self.resolved = true;
        self.active = false;
        self.outcome = outcome;
        self.resolved_at = Some(now);
        Ok(())
    }
}

// ============================================================================
// MARKET VIEW
// ============================================================================

/// Read-only snapshot of a market for callers (`getMarket`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketView {
    pub id: MarketId,
    pub question: String,
    pub description: String,
    pub category: String,
    pub creator: Address,
    pub created_at: i64,
    pub end_time: i64,
    pub resolution_time: i64,
    pub resolved_at: Option<i64>,
    pub active: bool,
    pub resolved: bool,
    pub outcome: Outcome,
    pub yes_pool: Amount,
    pub no_pool: Amount,
    pub total_pool: Amount,
    pub total_yes_shares: Amount,
    pub total_no_shares: Amount,
    pub total_yes_invested: Amount,
    pub total_no_invested: Amount,
    pub total_volume: Amount,
    /// Current YES quote in bps
    pub yes_price_bps: u64,
    /// Current NO quote in bps
    pub no_price_bps: u64,
    /// Human-readable total pool
    pub total_pool_display: Decimal,
    pub open_orders: usize,
}

impl MarketView {
    pub fn new(market: &Market, yes_price_bps: u64, no_price_bps: u64, open_orders: usize) -> Self {
        Self {
            id: market.id,
            question: market.question.clone(),
            description: market.description.clone(),
            category: market.category.clone(),
            creator: market.creator.clone(),
            created_at: market.created_at,
            end_time: market.end_time,
            resolution_time: market.resolution_time,
            resolved_at: market.resolved_at,
            active: market.active,
            resolved: market.resolved,
            outcome: market.outcome,
            yes_pool: market.yes_pool,
            no_pool: market.no_pool,
            total_pool: market.total_pool(),
            total_yes_shares: market.total_yes_shares,
            total_no_shares: market.total_no_shares,
            total_yes_invested: market.total_yes_invested,
            total_no_invested: market.total_no_invested,
            total_volume: market.total_volume,
            yes_price_bps,
            no_price_bps,
            total_pool_display: to_decimal(market.total_pool()),
            open_orders,
        }
    }
}
