// ============================================================================
// Payout Math - Pari-mutuel Prediction Market
// ============================================================================
//
// Pari-mutuel Rule:
//   Winners split the LOSING pool in proportion to their share of the
//   winning side's supply. Their own side's pool is not paid back.
//
//     gross = losing_pool * user_shares / total_winning_shares
//     fee   = gross * fee_bps / 10000
//     net   = gross - fee
//
// Invalid outcome:
//   Every holder is refunded their pro-rata slice of each side's pool,
//   with no platform fee.
//
// All divisions truncate toward zero, so the sum of payouts never exceeds
// the pool they are drawn from.
//
// ============================================================================

use crate::error::{EngineError, EngineResult};
use crate::ledger::{Market, Position};
use crate::math::{apply_bps, mul_div};
use crate::models::{Amount, Bps, Outcome, Side};
use serde::{Deserialize, Serialize};

/// Gross, fee and net of one payout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub gross: Amount,
    pub fee: Amount,
    pub net: Amount,
}

impl Payout {
    pub fn fee_free(gross: Amount) -> Self {
        Self { gross, fee: 0, net: gross }
    }
}

/// Winner's share of the losing pool. Zero when there is nothing to split.
pub fn winner_gross(losing_pool: Amount, user_shares: Amount, total_winning_shares: Amount) -> EngineResult<Amount> {
    if total_winning_shares == 0 || losing_pool == 0 || user_shares == 0 {
        return Ok(0);
    }
    mul_div(losing_pool, user_shares, total_winning_shares).ok_or(EngineError::Overflow)
}

/// Withhold the platform fee from `gross`
pub fn split_fee(gross: Amount, fee_bps: Bps) -> EngineResult<Payout> {
    let fee = apply_bps(gross, fee_bps).ok_or(EngineError::Overflow)?;
    let net = gross.checked_sub(fee).ok_or(EngineError::Overflow)?;
    Ok(Payout { gross, fee, net })
}

/// Refund owed for `yes` and `no` shares when the market resolves Invalid
pub fn refund_gross(market: &Market, yes: Amount, no: Amount) -> EngineResult<Amount> {
    let from_yes = winner_gross(market.yes_pool, yes, market.total_yes_shares)?;
    let from_no = winner_gross(market.no_pool, no, market.total_no_shares)?;
    from_yes.checked_add(from_no).ok_or(EngineError::Overflow)
}

/// Payout owed for the claimable shares of `position` in a resolved market
pub fn claimable(market: &Market, position: &Position, fee_bps: Bps) -> EngineResult<Payout> {
    match market.outcome {
        Outcome::Unresolved => Err(EngineError::NotResolved(market.id)),
        Outcome::Invalid => {
            let gross = refund_gross(market, position.available(Side::Yes), position.available(Side::No))?;
            Ok(Payout::fee_free(gross))
        }
        Outcome::Yes | Outcome::No => {
            let winner = market.outcome.winning_side().ok_or(EngineError::NotResolved(market.id))?;
            let gross = winner_gross(
                market.pool(winner.opposite()),
                position.available(winner),
                market.total_shares(winner),
            )?;
            split_fee(gross, fee_bps)
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
