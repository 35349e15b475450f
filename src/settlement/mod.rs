// ============================================================================
// Settlement Engine - Pari-mutuel Prediction Market
// ============================================================================
//
// State machine per market:
//
//   Active ──resolve(outcome)──▶ Resolved(outcome)   (terminal)
//                                   │
//                                   └─ claims settle independently
//
// Claim ordering:
//   The claimed shares are zeroed in the ledger BEFORE any funds move.
//   This module only writes the ledger and returns receipts; the caller
//   pays the net amounts after releasing the market lock. A repeat claim
//   finds zero shares and fails with NothingToClaim.
//
// ============================================================================

pub mod payout;

pub use payout::*;

use crate::error::{EngineError, EngineResult};
use crate::ledger::MarketBook;
use crate::models::{Address, Amount, Bps, MarketId, Outcome, Side};
use crate::orderbook::{cancel_all_open, Order};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// ============================================================================
// RESOLUTION
// ============================================================================

/// What a resolution changed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub market_id: MarketId,
    pub outcome: Outcome,
    /// Pool available to claimants: the losing pool, or both pools if Invalid
    pub total_payout: Amount,
    /// Open orders cancelled so their shares can be claimed
    pub cancelled_orders: Vec<Order>,
}

/// Lock `book` with `outcome`. Terminal; a second call fails `AlreadyResolved`.
pub fn resolve(book: &mut MarketBook, outcome: Outcome, now: i64) -> EngineResult<Resolution> {
    let id = book.market.id;
    if book.market.resolved {
        return Err(EngineError::AlreadyResolved(id));
    }
    if outcome == Outcome::Unresolved {
        return Err(EngineError::invalid("outcome must be yes, no or invalid"));
    }

    let cancelled_orders = cancel_all_open(book, now)?;
    book.market.resolve(outcome, now)?;

    let total_payout = match outcome.winning_side() {
        Some(winner) => book.market.pool(winner.opposite()),
        None => book.market.total_pool(),
    };

    info!(
        "⚖️ Market {} resolved {} (payout pool {}, {} orders cancelled)",
        id,
        outcome,
        total_payout,
        cancelled_orders.len()
    );

    Ok(Resolution {
        market_id: id,
        outcome,
        total_payout,
        cancelled_orders,
    })
}

// ============================================================================
// CLAIMS
// ============================================================================

/// A settled claim; `net` is still owed to `user` until paid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimReceipt {
    pub market_id: MarketId,
    pub user: Address,
    pub outcome: Outcome,
    /// Shares zeroed by this claim (both sides when Invalid)
    pub shares_burned: Amount,
    pub gross: Amount,
    pub fee: Amount,
    pub net: Amount,
}

/// Settle `user`'s claim and zero the claimed shares
pub fn settle_claim(book: &mut MarketBook, user: &Address, fee_bps: Bps) -> EngineResult<ClaimReceipt> {
    let market_id = book.market.id;
    if !book.market.resolved {
        return Err(EngineError::NotResolved(market_id));
    }

    let position = book.position(user);
    let sides: &[Side] = match book.market.outcome.winning_side() {
        Some(Side::Yes) => &[Side::Yes],
        Some(Side::No) => &[Side::No],
        None => &[Side::Yes, Side::No],
    };
    let claimable_shares = sides
        .iter()
        .try_fold(0 as Amount, |acc, side| acc.checked_add(position.available(*side)))
        .ok_or(EngineError::Overflow)?;
    if claimable_shares == 0 {
        return Err(EngineError::NothingToClaim(market_id));
    }

    // compute from the pre-claim position, then zero
    let payout = payout::claimable(&book.market, &position, fee_bps)?;
    for side in sides {
        book.zero_side(user, *side)?;
    }

    debug!(
        "💰 Claim settled: market {} {} gross {} fee {} net {}",
        market_id,
        user.short(),
        payout.gross,
        payout.fee,
        payout.net
    );

    Ok(ClaimReceipt {
        market_id,
        user: user.clone(),
        outcome: book.market.outcome,
        shares_burned: claimable_shares,
        gross: payout.gross,
        fee: payout.fee,
        net: payout.net,
    })
}

/// Claims settled by a batch plus the addresses that had nothing to claim
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSettlement {
    pub receipts: Vec<ClaimReceipt>,
    pub skipped: Vec<Address>,
}

impl BatchSettlement {
    pub fn total_net(&self) -> Amount {
        self.receipts.iter().fold(0, |acc, r| acc.saturating_add(r.net))
    }

    pub fn total_fees(&self) -> Amount {
        self.receipts.iter().fold(0, |acc, r| acc.saturating_add(r.fee))
    }
}

/// Settle every address in `winners`, skipping those with nothing to claim.
///
/// All or nothing: any other error leaves `book` exactly as it was.
pub fn settle_batch(book: &mut MarketBook, winners: &[Address], fee_bps: Bps) -> EngineResult<BatchSettlement> {
    if !book.market.resolved {
        return Err(EngineError::NotResolved(book.market.id));
    }

    let mut scratch = book.clone();
    let mut batch = BatchSettlement::default();
    for winner in winners {
        match settle_claim(&mut scratch, winner, fee_bps) {
            Ok(receipt) => batch.receipts.push(receipt),
            Err(EngineError::NothingToClaim(_)) => batch.skipped.push(winner.clone()),
            Err(e) => {
                debug!("⛔ Batch settlement for market {} aborted at {}: {}", book.market.id, winner.short(), e);
                return Err(e);
            }
        }
    }
    *book = scratch;
    Ok(batch)
}

// ============================================================================
// TESTS
// ============================================================================
