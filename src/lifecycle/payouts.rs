// ============================================================================
// Resolution & Payouts - Pari-mutuel Prediction Market
// ============================================================================
//
// Resolution is gated on the configured authority. Claims zero shares under
// the market lock; payments leave custody only after the lock is released,
// so a recipient that calls back in finds nothing left to claim.
//
// ============================================================================

use super::{MarketEngine, TransferStatus};
use crate::error::{EngineError, EngineResult};
use crate::events::MarketEvent;
use crate::models::{Address, Amount, MarketId, Outcome};
use crate::settlement::{self, ClaimReceipt, Resolution};
use crate::treasury::TxType;
use serde::Serialize;
use tracing::{info, warn};

/// Result of `claim_winnings`
#[derive(Debug, Clone, Serialize)]
pub struct ClaimOutcome {
    #[serde(flatten)]
    pub receipt: ClaimReceipt,
    pub transfer: TransferStatus,
}

/// Result of `batch_payout_winners`
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchPayoutReport {
    pub market_id: Option<MarketId>,
    /// Net amount settled across the batch, paid or owed
    pub total_paid: Amount,
    pub total_fees: Amount,
    pub claims: Vec<ClaimReceipt>,
    /// Addresses with nothing left to claim
    pub skipped: Vec<Address>,
    /// Recipients whose transfer failed; their net is owed
    pub deferred: Vec<Address>,
}

impl MarketEngine {
    /// Lock a market with its outcome. Only the resolution authority may call.
    pub fn resolve_market(&self, id: MarketId, caller: &Address, outcome: Outcome) -> EngineResult<Resolution> {
        if caller != &self.settings.resolution_authority {
            return Err(EngineError::Unauthorized(format!(
                "{} is not the resolution authority",
                caller
            )));
        }

        let book = self.book(id)?;
        let resolution = {
            let mut book = book.write();
            let now = self.now();
            if self.settings.require_end_time_before_resolve && !book.market.resolved && now < book.market.end_time {
                return Err(EngineError::invalid("market is still trading"));
            }
            settlement::resolve(&mut book, outcome, now)?
        };

        for order in &resolution.cancelled_orders {
            self.events.publish(MarketEvent::SellOrderCancelled {
                order_id: order.id,
                market_id: id,
                seller: order.seller.clone(),
            });
        }
        self.events.publish(MarketEvent::MarketResolved {
            market_id: id,
            outcome,
            total_payout: resolution.total_payout,
        });
        Ok(resolution)
    }

    /// Settle and pay `user`'s winnings (or refund, if Invalid)
    pub fn claim_winnings(&self, id: MarketId, user: &Address) -> EngineResult<ClaimOutcome> {
        let book = self.book(id)?;
        let receipt = settlement::settle_claim(&mut book.write(), user, self.settings.platform_fee_bps)?;

        let transfer = self.pay_claim(&receipt);
        info!(
            "🏆 {} claimed {} (fee {}) from market {}",
            user.short(),
            receipt.net,
            receipt.fee,
            id
        );
        self.events.publish(MarketEvent::WinningsClaimed {
            market_id: id,
            user: user.clone(),
            gross: receipt.gross,
            fee: receipt.fee,
            net: receipt.net,
        });
        Ok(ClaimOutcome { receipt, transfer })
    }

    /// Settle and pay every listed winner. Stale or duplicate entries are
    /// skipped and a failed transfer does not stop the batch.
    pub fn batch_payout_winners(&self, id: MarketId, winners: &[Address]) -> EngineResult<BatchPayoutReport> {
        if winners.len() > self.settings.recommended_batch_size {
            warn!(
                "⚠️ Batch payout of {} recipients for market {} exceeds recommended size {}",
                winners.len(),
                id,
                self.settings.recommended_batch_size
            );
        }

        let book = self.book(id)?;
        let batch = settlement::settle_batch(&mut book.write(), winners, self.settings.platform_fee_bps)?;

        let mut report = BatchPayoutReport {
            market_id: Some(id),
            total_paid: batch.total_net(),
            total_fees: batch.total_fees(),
            skipped: batch.skipped,
            ..Default::default()
        };
        for receipt in batch.receipts {
            if !self.pay_claim(&receipt).is_paid() {
                report.deferred.push(receipt.user.clone());
            }
            self.events.publish(MarketEvent::WinningsClaimed {
                market_id: id,
                user: receipt.user.clone(),
                gross: receipt.gross,
                fee: receipt.fee,
                net: receipt.net,
            });
            report.claims.push(receipt);
        }

        info!(
            "📦 Batch payout for market {}: {} paid to {} recipients, {} fees, {} skipped, {} deferred",
            id,
            report.total_paid,
            report.claims.len(),
            report.total_fees,
            report.skipped.len(),
            report.deferred.len()
        );
        self.events.publish(MarketEvent::BatchPayout {
            market_id: id,
            recipients: report.claims.len(),
            total_paid: report.total_paid,
            total_fees: report.total_fees,
        });
        Ok(report)
    }

    fn pay_claim(&self, receipt: &ClaimReceipt) -> TransferStatus {
        self.accrue_fees(receipt.fee);
        let tx_type = if receipt.outcome == Outcome::Invalid {
            TxType::Refund
        } else {
            TxType::Payout
        };
        self.send(&receipt.user, receipt.net, tx_type, Some(receipt.market_id))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{EngineSettings, ManualClock, NewMarket};
    use crate::math::units;
    use crate::models::Side;
    use crate::treasury::InMemoryTreasury;
    use std::sync::Arc;

    fn setup(settings: EngineSettings) -> (MarketEngine, Arc<InMemoryTreasury>, Arc<ManualClock>, MarketId) {
        let treasury = Arc::new(InMemoryTreasury::new());
        let clock = Arc::new(ManualClock::new(1_000));
        let engine = MarketEngine::new(settings, treasury.clone(), clock.clone());
        for name in ["alice", "bob", "carol"] {
            treasury.deposit(&Address::from(name), units(100)).unwrap();
        }
        let id = engine
            .create_market(
                &Address::from("alice"),
                NewMarket {
                    question: "Will the launch happen?".into(),
                    description: String::new(),
                    category: "space".into(),
                    end_time: 2_000,
                    resolution_time: 2_500,
                },
                engine.market_creation_fee(),
            )
            .unwrap();
        (engine, treasury, clock, id)
    }

    #[test]
    fn test_resolve_waits_for_end_time_when_configured() {
        let settings = EngineSettings {
            require_end_time_before_resolve: true,
            ..Default::default()
        };
        let (engine, _, clock, id) = setup(settings);
        let oracle = engine.settings().resolution_authority.clone();

        assert!(matches!(
            engine.resolve_market(id, &oracle, Outcome::Yes),
            Err(EngineError::InvalidInput(_))
        ));
        clock.set(2_000);
        engine.resolve_market(id, &oracle, Outcome::Yes).unwrap();
    }

    #[test]
    fn test_batch_defers_rejected_recipient() {
        let (engine, treasury, _, id) = setup(EngineSettings::default());
        let (alice, bob, carol) = (Address::from("alice"), Address::from("bob"), Address::from("carol"));
        engine.buy_shares(id, &alice, Side::No, units(6)).unwrap();
        engine.buy_shares(id, &bob, Side::No, units(6)).unwrap();
        engine.buy_shares(id, &carol, Side::Yes, units(8)).unwrap();
        let oracle = engine.settings().resolution_authority.clone();
        engine.resolve_market(id, &oracle, Outcome::No).unwrap();

        treasury.reject_payments_to(&bob);
        let report = engine.batch_payout_winners(id, &[alice.clone(), bob.clone()]).unwrap();
        assert_eq!(report.claims.len(), 2);
        assert_eq!(report.deferred, vec![bob.clone()]);
        assert_eq!(engine.owed_balance(&bob), report.claims[1].net);
        assert!(report.total_paid + report.total_fees <= units(8));

        // Nothing left to claim once settled, even though payment is owed
        assert_eq!(engine.claim_winnings(id, &bob).unwrap_err(), EngineError::NothingToClaim(id));
    }

    #[test]
    fn test_resolution_emits_event() {
        let (engine, _, _, id) = setup(EngineSettings::default());
        let oracle = engine.settings().resolution_authority.clone();
        let mut rx = engine.events().subscribe();
        let resolution = engine.resolve_market(id, &oracle, Outcome::Invalid).unwrap();
        assert_eq!(resolution.total_payout, 0);

        let record = rx.try_recv().unwrap();
        assert_eq!(record.event.market_id(), Some(id));
    }
}
