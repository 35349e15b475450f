// ============================================================================
// Ledger Module - Pari-mutuel Prediction Market
// ============================================================================
//
// Authoritative storage for market aggregates and user positions. This is
// the only code that writes pool, share, invested or escrow fields.
//
// Every mutation is planned against an immutable borrow and then committed,
// so a rejected call leaves the book exactly as it was. Callers hold the
// market's exclusive lock around plan and commit.
//
// ============================================================================

pub mod market;
pub mod position;

pub use market::*;
pub use position::*;

use crate::error::{EngineError, EngineResult};
use crate::math::mul_div;
use crate::models::{Address, Amount, OrderId, Side, TradeDirection};
use crate::orderbook::Order;
use std::collections::{BTreeMap, HashMap};

// ============================================================================
// LEDGER UPDATE
// ============================================================================

/// A fully validated set of writes produced by `plan_*`, applied by `commit`.
///
/// Planning borrows the book immutably so callers can collect inbound funds
/// between validation and the write.
#[derive(Debug, Clone)]
#[must_use]
pub struct LedgerUpdate {
    market: Market,
    positions: Vec<(Address, Position)>,
}

impl LedgerUpdate {
    /// Market aggregates as they will be after commit
    pub fn market(&self) -> &Market {
        &self.market
    }
}

// ============================================================================
// MARKET BOOK
// ============================================================================

/// One market with its positions and sell orders: the unit of locking
#[derive(Debug, Clone)]
pub struct MarketBook {
    pub market: Market,
    positions: HashMap<Address, Position>,
    pub(crate) orders: BTreeMap<OrderId, Order>,
}

impl MarketBook {
    pub fn new(market: Market) -> Self {
        Self {
            market,
            positions: HashMap::new(),
            orders: BTreeMap::new(),
        }
    }

    /// Position for `user`, zeroed if none exists. Never inserts.
    pub fn position(&self, user: &Address) -> Position {
        self.positions.get(user).copied().unwrap_or_default()
    }

    /// All (user, position) pairs ever recorded in this market
    pub fn positions(&self) -> impl Iterator<Item = (&Address, &Position)> {
        self.positions.iter()
    }

    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    pub fn open_order_count(&self) -> usize {
        self.orders.values().filter(|o| o.is_open()).count()
    }

    /// Validate a bonding-curve trade and compute the resulting state.
    ///
    /// Buy: adds `amount` to the side's pool and `shares` to the side's supply.
    /// Sell: burns `shares` from the user's available shares and takes
    /// `amount` out of the side's pool; cost basis is released pro rata.
    pub fn plan_trade(
        &self,
        user: &Address,
        side: Side,
        direction: TradeDirection,
        shares: Amount,
        amount: Amount,
    ) -> EngineResult<LedgerUpdate> {
        if shares == 0 {
            return Err(EngineError::invalid("trade must move a non-zero number of shares"));
        }

        let id = self.market.id;
        let mut market = self.market.clone();
        let mut pos = self.position(user);
        market.total_volume = market.total_volume.checked_add(amount).ok_or(EngineError::Overflow)?;

        match direction {
            TradeDirection::Buy => {
                if !market.active || market.resolved {
                    return Err(EngineError::MarketNotActive(id));
                }
                if amount == 0 {
                    return Err(EngineError::invalid("buy amount must be positive"));
                }
                *market.pool_mut(side) = market.pool(side).checked_add(amount).ok_or(EngineError::Overflow)?;
                *market.total_shares_mut(side) =
                    market.total_shares(side).checked_add(shares).ok_or(EngineError::Overflow)?;
                *market.total_invested_mut(side) =
                    market.total_invested(side).checked_add(amount).ok_or(EngineError::Overflow)?;
                *pos.shares_mut(side) = pos.shares(side).checked_add(shares).ok_or(EngineError::Overflow)?;
                *pos.invested_mut(side) = pos.invested(side).checked_add(amount).ok_or(EngineError::Overflow)?;
            }
            TradeDirection::Sell => {
                let available = pos.available(side);
                if available < shares {
                    return Err(EngineError::InsufficientShares { available, requested: shares });
                }
                let supply = market.total_shares(side);
                if supply < shares {
                    return Err(EngineError::InsufficientShares { available: supply, requested: shares });
                }
                let pool = market.pool(side);
                if pool < amount {
                    return Err(EngineError::InsufficientFunds { provided: pool, required: amount });
                }
                let released = pro_rata(pos.invested(side), shares, pos.shares(side))?;
                *market.pool_mut(side) = pool - amount;
                *market.total_shares_mut(side) = supply - shares;
                *market.total_invested_mut(side) = market.total_invested(side).saturating_sub(released);
                *pos.shares_mut(side) -= shares;
                *pos.invested_mut(side) -= released;
            }
        }

        Ok(LedgerUpdate {
            market,
            positions: vec![(user.clone(), pos)],
        })
    }

    /// Validate an escrowed-share transfer from `seller` to `buyer` for `payment`.
    ///
    /// Pool and supply are untouched: the shares already exist.
    pub fn plan_transfer(
        &self,
        seller: &Address,
        buyer: &Address,
        side: Side,
        shares: Amount,
        payment: Amount,
    ) -> EngineResult<LedgerUpdate> {
        if seller == buyer {
            return Err(EngineError::invalid("seller and buyer must differ"));
        }

        let mut market = self.market.clone();
        let mut from = self.position(seller);
        let mut to = self.position(buyer);
        if from.escrowed(side) < shares || from.shares(side) < shares {
            return Err(EngineError::InsufficientShares {
                available: from.escrowed(side),
                requested: shares,
            });
        }

        let released = pro_rata(from.invested(side), shares, from.shares(side))?;
        *to.shares_mut(side) = to.shares(side).checked_add(shares).ok_or(EngineError::Overflow)?;
        *to.invested_mut(side) = to.invested(side).checked_add(payment).ok_or(EngineError::Overflow)?;
        *market.total_invested_mut(side) = market
            .total_invested(side)
            .saturating_sub(released)
            .checked_add(payment)
            .ok_or(EngineError::Overflow)?;
        market.total_volume = market.total_volume.checked_add(payment).ok_or(EngineError::Overflow)?;

        *from.escrowed_mut(side) -= shares;
        *from.shares_mut(side) -= shares;
        *from.invested_mut(side) -= released;

        Ok(LedgerUpdate {
            market,
            positions: vec![(seller.clone(), from), (buyer.clone(), to)],
        })
    }

    /// Write a validated update. Infallible.
    pub fn commit(&mut self, update: LedgerUpdate) {
        self.market = update.market;
        for (user, pos) in update.positions {
            self.positions.insert(user, pos);
        }
    }

    /// Validate and write a bonding-curve trade in one step
    pub fn apply_trade(
        &mut self,
        user: &Address,
        side: Side,
        direction: TradeDirection,
        shares: Amount,
        amount: Amount,
    ) -> EngineResult<()> {
        let update = self.plan_trade(user, side, direction, shares, amount)?;
        self.commit(update);
        Ok(())
    }

    /// Validate and write an escrowed-share transfer in one step
    pub fn transfer_escrowed(
        &mut self,
        seller: &Address,
        buyer: &Address,
        side: Side,
        shares: Amount,
        payment: Amount,
    ) -> EngineResult<()> {
        let update = self.plan_transfer(seller, buyer, side, shares, payment)?;
        self.commit(update);
        Ok(())
    }

    /// Reserve `shares` of `user`'s available shares for a sell order
    pub fn escrow_shares(&mut self, user: &Address, side: Side, shares: Amount) -> EngineResult<()> {
        let mut pos = self.position(user);
        let available = pos.available(side);
        if shares == 0 || available < shares {
            return Err(EngineError::InsufficientShares { available, requested: shares });
        }
        *pos.escrowed_mut(side) += shares;
        self.positions.insert(user.clone(), pos);
        Ok(())
    }

    /// Return escrowed shares to `user`'s available balance
    pub fn release_escrow(&mut self, user: &Address, side: Side, shares: Amount) -> EngineResult<()> {
        let mut pos = self.position(user);
        let escrowed = pos.escrowed(side);
        if escrowed < shares {
            return Err(EngineError::InsufficientShares { available: escrowed, requested: shares });
        }
        *pos.escrowed_mut(side) -= shares;
        self.positions.insert(user.clone(), pos);
        Ok(())
    }

    /// Zero `user`'s available shares on `side` and the matching cost basis.
    ///
    /// Returns the (shares, invested) removed. Market totals are left as they
    /// were at resolution so every later claim divides by the same supply.
    pub fn zero_side(&mut self, user: &Address, side: Side) -> EngineResult<(Amount, Amount)> {
        let mut pos = self.position(user);
        let removed = pos.available(side);
        if removed == 0 {
            return Ok((0, 0));
        }
        let released = pro_rata(pos.invested(side), removed, pos.shares(side))?;
        *pos.shares_mut(side) -= removed;
        *pos.invested_mut(side) -= released;
        self.positions.insert(user.clone(), pos);
        Ok((removed, released))
    }
}

/// value * part / whole, exact when the whole is taken
fn pro_rata(value: Amount, part: Amount, whole: Amount) -> EngineResult<Amount> {
    if part >= whole {
        return Ok(value);
    }
    mul_div(value, part, whole).ok_or(EngineError::Overflow)
}

// ============================================================================
// TESTS
// ============================================================================
