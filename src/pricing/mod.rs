// ============================================================================
// Pricing Engine - Pari-mutuel Prediction Market
// ============================================================================
//
// Converts currency into minted shares (buy) and shares back into currency
// (sell) along the bonding curve, and answers pure price/yield previews.
//
// Trades are planned, not applied: the caller collects the attached value
// from the trader and then commits the returned `LedgerUpdate` under the
// same market lock. Fees are not charged at trade time.
//
// ============================================================================

pub mod curve;

pub use curve::{BondingCurve, EVEN_PRICE_BPS};

use crate::error::{EngineError, EngineResult};
use crate::ledger::{LedgerUpdate, MarketBook};
use crate::models::{Address, Amount, Bps, MarketId, Side, TradeDirection};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Result of a bonding-curve trade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeReceipt {
    pub market_id: MarketId,
    pub trader: Address,
    pub side: Side,
    pub direction: TradeDirection,
    /// Shares minted (buy) or burned (sell)
    pub shares: Amount,
    /// Currency paid in (buy) or out (sell)
    pub amount: Amount,
    /// Quote of `side` after the trade
    pub new_price_bps: Bps,
}

/// A validated trade awaiting commit
#[derive(Debug, Clone)]
pub struct PlannedTrade {
    pub receipt: TradeReceipt,
    pub update: LedgerUpdate,
}

/// Plan a buy of `side` spending exactly `amount`
pub fn plan_buy(
    curve: &BondingCurve,
    book: &MarketBook,
    trader: &Address,
    side: Side,
    amount: Amount,
    now: i64,
) -> EngineResult<PlannedTrade> {
    book.market.ensure_trading_open(now)?;
    if amount == 0 {
        return Err(EngineError::invalid("amount must be positive"));
    }

    let shares = curve.shares_for_amount(&book.market, side, amount)?;
    let update = book.plan_trade(trader, side, TradeDirection::Buy, shares, amount)?;
    let new_price_bps = curve.quote(update.market(), side);

    debug!(
        "📈 Buy planned: market {} {} {} shares for {} ({} bps after)",
        book.market.id, side, shares, amount, new_price_bps
    );

    Ok(PlannedTrade {
        receipt: TradeReceipt {
            market_id: book.market.id,
            trader: trader.clone(),
            side,
            direction: TradeDirection::Buy,
            shares,
            amount,
            new_price_bps,
        },
        update,
    })
}

/// Plan a sell of `shares` of `side` at the current curve price
pub fn plan_sell(
    curve: &BondingCurve,
    book: &MarketBook,
    trader: &Address,
    side: Side,
    shares: Amount,
    now: i64,
) -> EngineResult<PlannedTrade> {
    book.market.ensure_trading_open(now)?;
    if shares == 0 {
        return Err(EngineError::invalid("shares must be positive"));
    }
    let available = book.position(trader).available(side);
    if available < shares {
        return Err(EngineError::InsufficientShares { available, requested: shares });
    }

    let payout = curve.sell_payout(&book.market, side, shares)?;
    if payout == 0 {
        return Err(EngineError::invalid("sale too small to pay out"));
    }
    let update = book.plan_trade(trader, side, TradeDirection::Sell, shares, payout)?;
    let new_price_bps = curve.quote(update.market(), side);

    debug!(
        "📉 Sell planned: market {} {} {} shares for {} ({} bps after)",
        book.market.id, side, shares, payout, new_price_bps
    );

    Ok(PlannedTrade {
        receipt: TradeReceipt {
            market_id: book.market.id,
            trader: trader.clone(),
            side,
            direction: TradeDirection::Sell,
            shares,
            amount: payout,
            new_price_bps,
        },
        update,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Market;
    use crate::math::units;

    fn book() -> MarketBook {
        MarketBook::new(Market::new(
            MarketId(7),
            "Will BTC close above 100k?".into(),
            String::new(),
            "crypto".into(),
            Address::from("creator"),
            0,
            1_000,
            2_000,
        ))
    }

    fn curve() -> BondingCurve {
        BondingCurve::new(units(100))
    }

    #[test]
    fn test_buy_commit_and_quote() {
        let mut book = book();
        let alice = Address::from("alice");
        let planned = plan_buy(&curve(), &book, &alice, Side::Yes, units(10), 10).unwrap();
        assert_eq!(planned.receipt.shares, units(20));
        assert!(planned.receipt.new_price_bps > 5000);

        // nothing written yet
        assert_eq!(book.market.yes_pool, 0);
        book.commit(planned.update);
        assert_eq!(book.market.yes_pool, units(10));
        assert_eq!(book.position(&alice).yes_shares, units(20));
    }

    #[test]
    fn test_buy_rejected_after_end_time() {
        let book = book();
        let err = plan_buy(&curve(), &book, &Address::from("alice"), Side::No, units(1), 1_000);
        assert_eq!(err.unwrap_err(), EngineError::MarketNotActive(MarketId(7)));
    }

    #[test]
    fn test_round_trip_never_profits() {
        let mut book = book();
        let alice = Address::from("alice");
        let bought = plan_buy(&curve(), &book, &alice, Side::Yes, units(40), 10).unwrap();
        let shares = bought.receipt.shares;
        book.commit(bought.update);

        let sold = plan_sell(&curve(), &book, &alice, Side::Yes, shares, 20).unwrap();
        assert!(sold.receipt.amount <= units(40));
        book.commit(sold.update);
        assert_eq!(book.market.total_yes_shares, 0);
        assert_eq!(book.position(&alice).yes_shares, 0);
    }

    #[test]
    fn test_sell_more_than_held() {
        let mut book = book();
        let alice = Address::from("alice");
        let bought = plan_buy(&curve(), &book, &alice, Side::No, units(5), 10).unwrap();
        book.commit(bought.update);

        let err = plan_sell(&curve(), &book, &Address::from("bob"), Side::No, units(1), 20);
        assert!(matches!(err, Err(EngineError::InsufficientShares { available: 0, .. })));
    }
}
