// ============================================================================
// Market Events - Pari-mutuel Prediction Market
// ============================================================================
//
// Fire-and-observe notifications for activity feeds and indexers.
//
// Every committed state change publishes one event. Subscribers get a
// live `broadcast` stream; the last HISTORY_LIMIT events are also kept for
// polling. Publishing never fails the operation that produced the event.
//
// ============================================================================

use crate::models::{Address, Amount, Bps, MarketId, OrderId, Outcome};
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use tokio::sync::broadcast;

/// Events retained for polling
pub const HISTORY_LIMIT: usize = 1000;

/// Live subscriber buffer
pub const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketEvent {
    MarketCreated {
        market_id: MarketId,
        creator: Address,
        question: String,
        end_time: i64,
    },
    SharesPurchased {
        market_id: MarketId,
        trader: Address,
        is_yes: bool,
        shares: Amount,
        cost: Amount,
        new_price: Bps,
    },
    SharesSold {
        market_id: MarketId,
        trader: Address,
        is_yes: bool,
        shares: Amount,
        payout: Amount,
        new_price: Bps,
    },
    MarketResolved {
        market_id: MarketId,
        outcome: Outcome,
        total_payout: Amount,
    },
    SellOrderPlaced {
        order_id: OrderId,
        market_id: MarketId,
        seller: Address,
        is_yes: bool,
        shares: Amount,
        price_per_share: Amount,
    },
    SellOrderMatched {
        order_id: OrderId,
        market_id: MarketId,
        seller: Address,
        buyer: Address,
        shares: Amount,
        payment: Amount,
    },
    SellOrderCancelled {
        order_id: OrderId,
        market_id: MarketId,
        seller: Address,
    },
    LimitOrderPlaced {
        market_id: MarketId,
        trader: Address,
        is_yes: bool,
        limit_price: Bps,
        amount: Amount,
        shares: Amount,
    },
    WinningsClaimed {
        market_id: MarketId,
        user: Address,
        gross: Amount,
        fee: Amount,
        net: Amount,
    },
    BatchPayout {
        market_id: MarketId,
        recipients: usize,
        total_paid: Amount,
        total_fees: Amount,
    },
    FeesWithdrawn {
        recipient: Address,
        amount: Amount,
    },
}

impl MarketEvent {
    /// Market the event belongs to, if any
    pub fn market_id(&self) -> Option<MarketId> {
        match self {
            MarketEvent::MarketCreated { market_id, .. }
            | MarketEvent::SharesPurchased { market_id, .. }
            | MarketEvent::SharesSold { market_id, .. }
            | MarketEvent::MarketResolved { market_id, .. }
            | MarketEvent::SellOrderPlaced { market_id, .. }
            | MarketEvent::SellOrderMatched { market_id, .. }
            | MarketEvent::SellOrderCancelled { market_id, .. }
            | MarketEvent::LimitOrderPlaced { market_id, .. }
            | MarketEvent::WinningsClaimed { market_id, .. }
            | MarketEvent::BatchPayout { market_id, .. } => Some(*market_id),
            MarketEvent::FeesWithdrawn { .. } => None,
        }
    }
}

/// A published event with its sequence number
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    pub seq: u64,
    pub timestamp: i64,
    #[serde(flatten)]
    pub event: MarketEvent,
}

#[derive(Debug, Default)]
struct History {
    next_seq: u64,
    records: VecDeque<EventRecord>,
}

/// Broadcast fan-out plus bounded history
pub struct EventBus {
    tx: broadcast::Sender<EventRecord>,
    history: Mutex<History>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            history: Mutex::new(History::default()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: MarketEvent) -> EventRecord {
        let record = {
            let mut history = self.history.lock();
            history.next_seq += 1;
            let record = EventRecord {
                seq: history.next_seq,
                timestamp: Utc::now().timestamp(),
                event,
            };
            history.records.push_back(record.clone());
            while history.records.len() > HISTORY_LIMIT {
                history.records.pop_front();
            }
            record
        };

        // no receivers is fine
        let _ = self.tx.send(record.clone());
        record
    }

    /// Most recent events, newest first, optionally for one market
    pub fn recent(&self, limit: usize, market: Option<MarketId>) -> Vec<EventRecord> {
        self.history
            .lock()
            .records
            .iter()
            .rev()
            .filter(|r| market.map_or(true, |m| r.event.market_id() == Some(m)))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.history.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
