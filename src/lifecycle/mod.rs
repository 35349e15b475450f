// ============================================================================
// Market Lifecycle Controller - Pari-mutuel Prediction Market
// ============================================================================
//
// `MarketEngine` owns every market and is the operation surface used by the
// HTTP layer and by tests.
//
// Concurrency:
//   - one `RwLock<MarketBook>` per market; writers are serialized per
//     market, readers see a committed snapshot
//   - different markets never share a lock
//   - global indexes (markets, orders, user markets) are held only for
//     lookups and inserts, never across a market operation
//
// Funds:
//   - inbound value is collected under the market lock after validation
//     and before the ledger write
//   - outbound value is paid after the write and after the lock is
//     released; a failed payment is credited to `owed` for later pull
//
// ============================================================================

pub mod clock;
mod payouts;
mod trading;

pub use clock::{Clock, ManualClock, SystemClock};
pub use payouts::*;
pub use trading::*;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::events::{EventBus, MarketEvent};
use crate::ledger::{Market, MarketBook, MarketView, PositionView};
use crate::models::{Address, Amount, Bps, MarketId, OrderId, Side};
use crate::orderbook::{self, Order};
use crate::pricing::BondingCurve;
use crate::treasury::{Treasury, TxType};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

// ============================================================================
// SETTINGS
// ============================================================================

/// Engine parameters in fixed point, derived from `EngineConfig`
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub platform_fee_bps: Bps,
    pub market_creation_fee: Amount,
    pub curve: BondingCurve,
    pub resolution_authority: Address,
    pub fee_recipient: Address,
    pub recommended_batch_size: usize,
    pub require_end_time_before_resolve: bool,
}

impl EngineSettings {
    pub fn from_config(config: &EngineConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            platform_fee_bps: config.platform_fee_bps,
            market_creation_fee: config.market_creation_fee_amount()?,
            curve: BondingCurve::new(config.virtual_liquidity_amount()?),
            resolution_authority: config.resolution_authority(),
            fee_recipient: config.fee_recipient(),
            recommended_batch_size: config.recommended_batch_size,
            require_end_time_before_resolve: config.require_end_time_before_resolve,
        })
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self {
            platform_fee_bps: config.platform_fee_bps,
            market_creation_fee: crate::math::units(1) / 100,
            curve: BondingCurve::new(crate::math::units(100)),
            resolution_authority: config.resolution_authority(),
            fee_recipient: config.fee_recipient(),
            recommended_batch_size: config.recommended_batch_size,
            require_end_time_before_resolve: config.require_end_time_before_resolve,
        }
    }
}

// ============================================================================
// REQUEST / RESULT TYPES
// ============================================================================

/// Parameters of `create_market`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMarket {
    pub question: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub end_time: i64,
    pub resolution_time: i64,
}

/// How an outbound transfer ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TransferStatus {
    Paid,
    /// Credited to the recipient's owed balance; retry with `withdraw_owed`
    Owed { reason: String },
}

impl TransferStatus {
    pub fn is_paid(&self) -> bool {
        matches!(self, TransferStatus::Paid)
    }
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct MarketEngine {
    settings: EngineSettings,
    treasury: Arc<dyn Treasury>,
    clock: Arc<dyn Clock>,
    markets: RwLock<HashMap<MarketId, Arc<RwLock<MarketBook>>>>,
    order_index: RwLock<HashMap<OrderId, MarketId>>,
    user_markets: RwLock<HashMap<Address, BTreeSet<MarketId>>>,
    next_market_id: AtomicU64,
    next_order_id: AtomicU64,
    /// Platform fees and creation fees not yet withdrawn
    fee_vault: Mutex<Amount>,
    /// Payments that failed and wait to be pulled
    owed: Mutex<HashMap<Address, Amount>>,
    events: EventBus,
}

impl MarketEngine {
    pub fn new(settings: EngineSettings, treasury: Arc<dyn Treasury>, clock: Arc<dyn Clock>) -> Self {
        info!(
            "📒 Market engine initialized (fee {} bps, creation fee {}, virtual liquidity {})",
            settings.platform_fee_bps,
            crate::math::to_decimal(settings.market_creation_fee),
            crate::math::to_decimal(settings.curve.virtual_liquidity)
        );
        Self {
            settings,
            treasury,
            clock,
            markets: RwLock::new(HashMap::new()),
            order_index: RwLock::new(HashMap::new()),
            user_markets: RwLock::new(HashMap::new()),
            next_market_id: AtomicU64::new(1),
            next_order_id: AtomicU64::new(1),
            fee_vault: Mutex::new(0),
            owed: Mutex::new(HashMap::new()),
            events: EventBus::new(),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    // ========================================================================
    // INTERNAL HELPERS
    // ========================================================================

    pub(crate) fn book(&self, id: MarketId) -> EngineResult<Arc<RwLock<MarketBook>>> {
        self.markets
            .read()
            .get(&id)
            .cloned()
            .ok_or(EngineError::MarketNotFound(id))
    }

    pub(crate) fn market_of_order(&self, id: OrderId) -> EngineResult<MarketId> {
        self.order_index
            .read()
            .get(&id)
            .copied()
            .ok_or(EngineError::OrderNotFound(id))
    }

    pub(crate) fn track_user(&self, user: &Address, market: MarketId) {
        self.user_markets
            .write()
            .entry(user.clone())
            .or_default()
            .insert(market);
    }

    /// Pay `amount` out of custody; on failure credit it to `owed`
    pub(crate) fn send(
        &self,
        to: &Address,
        amount: Amount,
        tx_type: TxType,
        market: Option<MarketId>,
    ) -> TransferStatus {
        match self.treasury.pay(to, amount, tx_type, market) {
            Ok(()) => TransferStatus::Paid,
            Err(e) => {
                warn!(
                    "⚠️ Transfer of {} to {} failed ({}); credited as owed",
                    amount,
                    to.short(),
                    e
                );
                let mut owed = self.owed.lock();
                let entry = owed.entry(to.clone()).or_insert(0);
                *entry = entry.saturating_add(amount);
                TransferStatus::Owed { reason: e.to_string() }
            }
        }
    }

    pub(crate) fn accrue_fees(&self, amount: Amount) {
        if amount > 0 {
            let mut vault = self.fee_vault.lock();
            *vault = vault.saturating_add(amount);
        }
    }

    // ========================================================================
    // CREATION
    // ========================================================================

    /// Create a market. `creation_fee` is the value attached by `creator`.
    pub fn create_market(&self, creator: &Address, params: NewMarket, creation_fee: Amount) -> EngineResult<MarketId> {
        let now = self.now();
        let question = params.question.trim();
        if question.is_empty() {
            return Err(EngineError::invalid("question must not be empty"));
        }
        if params.end_time <= now {
            return Err(EngineError::invalid("end time must be in the future"));
        }
        if params.resolution_time < params.end_time {
            return Err(EngineError::invalid("resolution time must not precede end time"));
        }
        if creation_fee < self.settings.market_creation_fee {
            return Err(EngineError::InsufficientFunds {
                provided: creation_fee,
                required: self.settings.market_creation_fee,
            });
        }

        self.treasury.collect(creator, creation_fee, TxType::CreationFee, None)?;
        self.accrue_fees(creation_fee);

        let id = MarketId(self.next_market_id.fetch_add(1, Ordering::SeqCst));
        let market = Market::new(
            id,
            question.to_string(),
            params.description,
            params.category,
            creator.clone(),
            now,
            params.end_time,
            params.resolution_time,
        );
        self.markets
            .write()
            .insert(id, Arc::new(RwLock::new(MarketBook::new(market))));

        info!("🎯 Market {} created by {}: {}", id, creator.short(), question);
        self.events.publish(MarketEvent::MarketCreated {
            market_id: id,
            creator: creator.clone(),
            question: question.to_string(),
            end_time: params.end_time,
        });
        Ok(id)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn get_market(&self, id: MarketId) -> EngineResult<MarketView> {
        let book = self.book(id)?;
        let book = book.read();
        let curve = &self.settings.curve;
        Ok(MarketView::new(
            &book.market,
            curve.quote(&book.market, Side::Yes),
            curve.quote(&book.market, Side::No),
            book.open_order_count(),
        ))
    }

    /// Every market, ordered by id
    pub fn list_markets(&self) -> Vec<MarketView> {
        let mut ids: Vec<MarketId> = self.markets.read().keys().copied().collect();
        ids.sort();
        ids.into_iter().filter_map(|id| self.get_market(id).ok()).collect()
    }

    pub fn get_current_price(&self, id: MarketId, side: Side) -> EngineResult<Bps> {
        let book = self.book(id)?;
        let book = book.read();
        Ok(self.settings.curve.quote(&book.market, side))
    }

    /// Shares `amount` would buy on `side` right now. Pure preview.
    pub fn get_shares_amount(&self, id: MarketId, side: Side, amount: Amount) -> EngineResult<Amount> {
        let book = self.book(id)?;
        let book = book.read();
        self.settings.curve.shares_for_amount(&book.market, side, amount)
    }

    pub fn get_user_position(&self, id: MarketId, user: &Address) -> EngineResult<PositionView> {
        let book = self.book(id)?;
        let position = book.read().position(user);
        Ok(position.into())
    }

    /// Markets open for trading right now
    pub fn get_active_markets(&self) -> Vec<MarketId> {
        let now = self.now();
        let books: Vec<(MarketId, Arc<RwLock<MarketBook>>)> =
            self.markets.read().iter().map(|(id, b)| (*id, b.clone())).collect();
        let mut active: Vec<MarketId> = books
            .into_iter()
            .filter(|(_, book)| book.read().market.is_trading_open(now))
            .map(|(id, _)| id)
            .collect();
        active.sort();
        active
    }

    /// Markets `user` has ever held a position in
    pub fn get_user_markets(&self, user: &Address) -> Vec<MarketId> {
        self.user_markets
            .read()
            .get(user)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn next_market_id(&self) -> MarketId {
        MarketId(self.next_market_id.load(Ordering::SeqCst))
    }

    pub fn market_creation_fee(&self) -> Amount {
        self.settings.market_creation_fee
    }

    pub fn platform_fee_bps(&self) -> Bps {
        self.settings.platform_fee_bps
    }

    pub fn get_order(&self, id: OrderId) -> EngineResult<Order> {
        let market = self.market_of_order(id)?;
        let book = self.book(market)?;
        let order = book.read().order(id).cloned();
        order.ok_or(EngineError::OrderNotFound(id))
    }

    pub fn get_open_orders(&self, id: MarketId) -> EngineResult<Vec<Order>> {
        let book = self.book(id)?;
        let orders = orderbook::open_orders(&book.read());
        Ok(orders)
    }

    /// Every order `seller` has placed in market `id`, open or closed
    pub fn get_seller_orders(&self, id: MarketId, seller: &Address) -> EngineResult<Vec<Order>> {
        let book = self.book(id)?;
        let orders = orderbook::orders_by_seller(&book.read(), seller);
        Ok(orders)
    }

    /// Fees accrued and not yet withdrawn
    pub fn accrued_fees(&self) -> Amount {
        *self.fee_vault.lock()
    }

    /// Failed payments waiting for `user` to pull
    pub fn owed_balance(&self, user: &Address) -> Amount {
        self.owed.lock().get(user).copied().unwrap_or(0)
    }

    // ========================================================================
    // ADMIN
    // ========================================================================

    /// Pay the fee vault to the configured fee recipient
    pub fn withdraw_fees(&self, caller: &Address) -> EngineResult<Amount> {
        if caller != &self.settings.fee_recipient && caller != &self.settings.resolution_authority {
            return Err(EngineError::Unauthorized(format!(
                "{} may not withdraw platform fees",
                caller
            )));
        }

        let amount = std::mem::take(&mut *self.fee_vault.lock());
        if amount == 0 {
            return Ok(0);
        }
        let recipient = self.settings.fee_recipient.clone();
        if let Err(e) = self.treasury.pay(&recipient, amount, TxType::FeeWithdrawal, None) {
            self.accrue_fees(amount);
            return Err(EngineError::TransferFailed(e.to_string()));
        }

        info!("🏦 Withdrew {} in platform fees to {}", amount, recipient.short());
        self.events.publish(MarketEvent::FeesWithdrawn { recipient, amount });
        Ok(amount)
    }

    /// Retry payments that previously failed for `caller`
    pub fn withdraw_owed(&self, caller: &Address) -> EngineResult<Amount> {
        let amount = self.owed.lock().remove(caller).unwrap_or(0);
        if amount == 0 {
            return Err(EngineError::invalid("nothing owed"));
        }
        if let Err(e) = self.treasury.pay(caller, amount, TxType::OwedWithdrawal, None) {
            let mut owed = self.owed.lock();
            let entry = owed.entry(caller.clone()).or_insert(0);
            *entry = entry.saturating_add(amount);
            return Err(EngineError::TransferFailed(e.to_string()));
        }
        info!("💸 Paid {} owed to {}", amount, caller.short());
        Ok(amount)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::units;
    use crate::treasury::InMemoryTreasury;

    fn engine() -> (MarketEngine, Arc<InMemoryTreasury>, Arc<ManualClock>) {
        let treasury = Arc::new(InMemoryTreasury::new());
        let clock = Arc::new(ManualClock::new(1_000));
        let engine = MarketEngine::new(EngineSettings::default(), treasury.clone(), clock.clone());
        (engine, treasury, clock)
    }

    fn params(end_time: i64) -> NewMarket {
        NewMarket {
            question: "Will it snow?".into(),
            description: String::new(),
            category: "weather".into(),
            end_time,
            resolution_time: end_time + 100,
        }
    }

    #[test]
    fn test_create_market_validations() {
        let (engine, treasury, _) = engine();
        let alice = Address::from("alice");
        treasury.deposit(&alice, units(1)).unwrap();
        let fee = engine.market_creation_fee();

        let mut empty = params(2_000);
        empty.question = "  ".into();
        assert!(matches!(engine.create_market(&alice, empty, fee), Err(EngineError::InvalidInput(_))));
        assert!(engine.create_market(&alice, params(1_000), fee).is_err());

        let mut early = params(2_000);
        early.resolution_time = 1_500;
        assert!(engine.create_market(&alice, early, fee).is_err());

        assert!(matches!(
            engine.create_market(&alice, params(2_000), fee - 1),
            Err(EngineError::InsufficientFunds { .. })
        ));

        assert_eq!(engine.next_market_id(), MarketId(1));
        let id = engine.create_market(&alice, params(2_000), fee).unwrap();
        assert_eq!(id, MarketId(1));
        assert_eq!(engine.next_market_id(), MarketId(2));
        assert_eq!(engine.accrued_fees(), fee);
        assert_eq!(treasury.balance(&alice), units(1) - fee);
    }

    #[test]
    fn test_active_markets_follow_clock() {
        let (engine, treasury, clock) = engine();
        let alice = Address::from("alice");
        treasury.deposit(&alice, units(1)).unwrap();
        let fee = engine.market_creation_fee();
        let first = engine.create_market(&alice, params(2_000), fee).unwrap();
        let second = engine.create_market(&alice, params(3_000), fee).unwrap();

        assert_eq!(engine.get_active_markets(), vec![first, second]);
        clock.set(2_500);
        assert_eq!(engine.get_active_markets(), vec![second]);
    }

    #[test]
    fn test_withdraw_fees_authorization() {
        let (engine, treasury, _) = engine();
        let alice = Address::from("alice");
        treasury.deposit(&alice, units(1)).unwrap();
        let fee = engine.market_creation_fee();
        engine.create_market(&alice, params(2_000), fee).unwrap();

        assert!(matches!(engine.withdraw_fees(&alice), Err(EngineError::Unauthorized(_))));
        let recipient = engine.settings().fee_recipient.clone();
        assert_eq!(engine.withdraw_fees(&recipient).unwrap(), fee);
        assert_eq!(treasury.balance(&recipient), fee);
        assert_eq!(engine.accrued_fees(), 0);
    }

    #[test]
    fn test_unknown_market() {
        let (engine, _, _) = engine();
        assert_eq!(engine.get_market(MarketId(42)).unwrap_err(), EngineError::MarketNotFound(MarketId(42)));
        assert!(engine.get_user_markets(&Address::from("nobody")).is_empty());
    }
}
