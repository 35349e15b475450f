// ============================================================================
// Bonding Curve - Pari-mutuel Prediction Market
// ============================================================================
//
// Share-ratio curve with virtual liquidity V on each side.
//
//   S = supply of the traded side, T = YES + NO supply
//
//   price(side)      = (S + V) / (T + 2V)          (quoted in bps, floored)
//   shares(amount)   = amount * (T + 2V) / (S + V)
//   payout(n)        = min(n * (S + V) / (T + 2V), pool * n / S)
//
// Buying a side raises S and T by the same quantity, which raises that
// side's price and lowers the other's. The two quotes share a denominator,
// so they always sum to 10000 or 9999 bps after flooring.
//
// ============================================================================

use crate::error::{EngineError, EngineResult};
use crate::ledger::Market;
use crate::math::{mul_div, product_le};
use crate::models::{Amount, Bps, Side, BPS_DENOMINATOR};
use serde::{Deserialize, Serialize};

/// Quote of an empty or degenerate market
pub const EVEN_PRICE_BPS: Bps = BPS_DENOMINATOR / 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondingCurve {
    /// Phantom shares added to each side; larger means less price impact
    pub virtual_liquidity: Amount,
}

impl BondingCurve {
    pub fn new(virtual_liquidity: Amount) -> Self {
        Self { virtual_liquidity }
    }

    /// (S + V, T + 2V) for `side`
    fn weights(&self, market: &Market, side: Side) -> (Amount, Amount) {
        let v = self.virtual_liquidity;
        let side_weight = market.total_shares(side).saturating_add(v);
        let total = market
            .total_yes_shares
            .saturating_add(market.total_no_shares)
            .saturating_add(v.saturating_mul(2));
        (side_weight, total)
    }

    /// Current price of `side` in basis points. Pure.
    pub fn quote(&self, market: &Market, side: Side) -> Bps {
        let (side_weight, total) = self.weights(market, side);
        if total == 0 {
            return EVEN_PRICE_BPS;
        }
        mul_div(BPS_DENOMINATOR as Amount, side_weight, total)
            .map(|bps| bps as Bps)
            .unwrap_or(EVEN_PRICE_BPS)
    }

    /// Whether the exact price of `side` is at or below `limit_bps`.
    ///
    /// Compares (S + V) * 10000 against limit * (T + 2V), so a quote that
    /// floors onto the limit does not pass when the true price is above it.
    pub fn within_limit(&self, market: &Market, side: Side, limit_bps: Bps) -> bool {
        let (side_weight, total) = self.weights(market, side);
        if total == 0 {
            return EVEN_PRICE_BPS <= limit_bps;
        }
        product_le(side_weight, BPS_DENOMINATOR as Amount, limit_bps as Amount, total)
    }

    /// Shares minted by spending `amount` on `side` at the current price
    pub fn shares_for_amount(&self, market: &Market, side: Side, amount: Amount) -> EngineResult<Amount> {
        if amount == 0 {
            return Err(EngineError::invalid("amount must be positive"));
        }
        let (side_weight, total) = self.weights(market, side);
        if side_weight == 0 {
            return Err(EngineError::invalid("side has no liquidity to price against"));
        }
        let shares = mul_div(amount, total, side_weight).ok_or(EngineError::Overflow)?;
        if shares == 0 {
            return Err(EngineError::invalid("amount too small to mint a share unit"));
        }
        Ok(shares)
    }

    /// Currency returned for burning `shares` of `side`.
    ///
    /// Priced at the current quote and capped at the holder's pro-rata slice
    /// of the side's pool, so a side's pool can never be overdrawn.
    pub fn sell_payout(&self, market: &Market, side: Side, shares: Amount) -> EngineResult<Amount> {
        if shares == 0 {
            return Err(EngineError::invalid("shares must be positive"));
        }
        let supply = market.total_shares(side);
        if supply < shares {
            return Err(EngineError::InsufficientShares { available: supply, requested: shares });
        }
        let (side_weight, total) = self.weights(market, side);
        let at_price = mul_div(shares, side_weight, total).ok_or(EngineError::Overflow)?;
        let pro_rata = mul_div(market.pool(side), shares, supply).ok_or(EngineError::Overflow)?;
        Ok(at_price.min(pro_rata))
    }
}

// ============================================================================
// TESTS
// ============================================================================
