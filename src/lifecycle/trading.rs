// ============================================================================
// Trading Operations - Pari-mutuel Prediction Market
// ============================================================================
//
// Curve trades and peer-to-peer orders. Each operation runs
// plan -> collect -> commit under the market's write lock and pays any
// outbound value after the lock is released.
//
// ============================================================================

use super::{MarketEngine, TransferStatus};
use crate::error::EngineResult;
use crate::events::MarketEvent;
use crate::models::{Address, Amount, Bps, MarketId, OrderId, Side};
use crate::orderbook::{self, LimitOrderReport, Order};
use crate::pricing::{self, TradeReceipt};
use crate::treasury::TxType;
use serde::Serialize;
use std::sync::atomic::Ordering;
use tracing::info;

/// Result of a curve sell: the receipt plus the payout transfer
#[derive(Debug, Clone, Serialize)]
pub struct SellReceipt {
    #[serde(flatten)]
    pub trade: TradeReceipt,
    pub transfer: TransferStatus,
}

/// Result of `buy_from_sell_order`
#[derive(Debug, Clone, Serialize)]
pub struct FillReceipt {
    pub order: Order,
    pub payment: Amount,
    /// Transfer of the payment to the seller
    pub seller_transfer: TransferStatus,
}

/// Result of `place_limit_order`
#[derive(Debug, Clone, Serialize)]
pub struct LimitOrderReceipt {
    #[serde(flatten)]
    pub report: LimitOrderReport,
    /// Transfers to the sellers of filled orders, in fill order
    pub seller_transfers: Vec<TransferStatus>,
}

impl MarketEngine {
    /// Buy `side` spending exactly `amount` (the attached value)
    pub fn buy_shares(&self, id: MarketId, trader: &Address, side: Side, amount: Amount) -> EngineResult<TradeReceipt> {
        let book = self.book(id)?;
        let receipt = {
            let mut book = book.write();
            let planned = pricing::plan_buy(&self.settings.curve, &book, trader, side, amount, self.now())?;
            self.treasury.collect(trader, amount, TxType::Buy, Some(id))?;
            book.commit(planned.update);
            planned.receipt
        };
        self.track_user(trader, id);

        info!(
            "🎲 {} bought {} {} shares in market {} for {} (now {} bps)",
            trader.short(),
            receipt.shares,
            side,
            id,
            receipt.amount,
            receipt.new_price_bps
        );
        self.events.publish(MarketEvent::SharesPurchased {
            market_id: id,
            trader: trader.clone(),
            is_yes: side.is_yes(),
            shares: receipt.shares,
            cost: receipt.amount,
            new_price: receipt.new_price_bps,
        });
        Ok(receipt)
    }

    /// Sell `shares` of `side` back to the curve
    pub fn sell_shares(&self, id: MarketId, trader: &Address, side: Side, shares: Amount) -> EngineResult<SellReceipt> {
        let book = self.book(id)?;
        let trade = {
            let mut book = book.write();
            let planned = pricing::plan_sell(&self.settings.curve, &book, trader, side, shares, self.now())?;
            book.commit(planned.update);
            planned.receipt
        };

        let transfer = self.send(trader, trade.amount, TxType::SellProceeds, Some(id));
        info!(
            "💱 {} sold {} {} shares in market {} for {}",
            trader.short(),
            trade.shares,
            side,
            id,
            trade.amount
        );
        self.events.publish(MarketEvent::SharesSold {
            market_id: id,
            trader: trader.clone(),
            is_yes: side.is_yes(),
            shares: trade.shares,
            payout: trade.amount,
            new_price: trade.new_price_bps,
        });
        Ok(SellReceipt { trade, transfer })
    }

    /// Escrow shares and rest a sell order on the book
    pub fn place_sell_order(
        &self,
        id: MarketId,
        seller: &Address,
        side: Side,
        shares: Amount,
        price_per_share: Amount,
    ) -> EngineResult<OrderId> {
        let book = self.book(id)?;
        let order = {
            let mut book = book.write();
            let order_id = OrderId(self.next_order_id.fetch_add(1, Ordering::SeqCst));
            orderbook::place_sell_order(&mut book, order_id, seller, side, shares, price_per_share, self.now())?
        };
        self.order_index.write().insert(order.id, id);

        self.events.publish(MarketEvent::SellOrderPlaced {
            order_id: order.id,
            market_id: id,
            seller: seller.clone(),
            is_yes: side.is_yes(),
            shares,
            price_per_share,
        });
        Ok(order.id)
    }

    /// Take a resting order in full. `payment` is the attached value and goes
    /// entirely to the seller.
    pub fn buy_from_sell_order(&self, order_id: OrderId, buyer: &Address, payment: Amount) -> EngineResult<FillReceipt> {
        let id = self.market_of_order(order_id)?;
        let book = self.book(id)?;
        let order = {
            let mut book = book.write();
            let now = self.now();
            let planned = orderbook::plan_fill(&book, order_id, buyer, payment, now)?;
            self.treasury.collect(buyer, payment, TxType::OrderPayment, Some(id))?;
            orderbook::commit_fill(&mut book, planned, now)?
        };
        self.track_user(buyer, id);

        let seller_transfer = self.send(&order.seller, payment, TxType::OrderProceeds, Some(id));
        info!(
            "🤝 Order {} filled: {} {} shares {} -> {} for {}",
            order_id,
            order.shares,
            order.side,
            order.seller.short(),
            buyer.short(),
            payment
        );
        self.events.publish(MarketEvent::SellOrderMatched {
            order_id,
            market_id: id,
            seller: order.seller.clone(),
            buyer: buyer.clone(),
            shares: order.shares,
            payment,
        });
        Ok(FillReceipt {
            order,
            payment,
            seller_transfer,
        })
    }

    /// Cancel an open order; only its seller may
    pub fn cancel_sell_order(&self, order_id: OrderId, caller: &Address) -> EngineResult<Order> {
        let id = self.market_of_order(order_id)?;
        let book = self.book(id)?;
        let order = orderbook::cancel_sell_order(&mut book.write(), order_id, caller, self.now())?;

        self.events.publish(MarketEvent::SellOrderCancelled {
            order_id,
            market_id: id,
            seller: order.seller.clone(),
        });
        Ok(order)
    }

    /// Taker buy of `side` spending exactly `amount` at no worse than `limit_price_bps`
    pub fn place_limit_order(
        &self,
        id: MarketId,
        trader: &Address,
        side: Side,
        limit_price_bps: Bps,
        amount: Amount,
    ) -> EngineResult<LimitOrderReceipt> {
        let book = self.book(id)?;
        let report = {
            let mut book = book.write();
            let planned = orderbook::plan_limit_order(
                &self.settings.curve,
                &book,
                trader,
                side,
                limit_price_bps,
                amount,
                self.now(),
            )?;
            self.treasury.collect(trader, amount, TxType::Buy, Some(id))?;
            *book = planned.book;
            planned.report
        };
        self.track_user(trader, id);

        let mut seller_transfers = Vec::with_capacity(report.fills.len());
        for fill in &report.fills {
            seller_transfers.push(self.send(&fill.seller, fill.cost, TxType::OrderProceeds, Some(id)));
            self.events.publish(MarketEvent::SellOrderMatched {
                order_id: fill.order_id,
                market_id: id,
                seller: fill.seller.clone(),
                buyer: trader.clone(),
                shares: fill.shares,
                payment: fill.cost,
            });
        }
        if let Some(leg) = &report.curve_leg {
            self.events.publish(MarketEvent::SharesPurchased {
                market_id: id,
                trader: trader.clone(),
                is_yes: side.is_yes(),
                shares: leg.shares,
                cost: leg.amount,
                new_price: leg.new_price_bps,
            });
        }

        info!(
            "📋 Limit order by {} in market {}: {} for {} {} shares ({} book fills)",
            trader.short(),
            id,
            amount,
            report.total_shares,
            side,
            report.fills.len()
        );
        self.events.publish(MarketEvent::LimitOrderPlaced {
            market_id: id,
            trader: trader.clone(),
            is_yes: side.is_yes(),
            limit_price: limit_price_bps,
            amount,
            shares: report.total_shares,
        });
        Ok(LimitOrderReceipt {
            report,
            seller_transfers,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
