/// Pari-mutuel Prediction Market Ledger
/// Exports all modules for use as a library crate

pub mod app_state;
pub mod config;
pub mod error;
pub mod events;
pub mod handlers;
pub mod ledger;
pub mod lifecycle;
pub mod math;
pub mod models;
pub mod orderbook;
pub mod pricing;
pub mod routes;
pub mod settlement;
pub mod treasury;

// Core value types
pub use models::{Address, Amount, Bps, MarketId, OrderId, Outcome, Side, TradeDirection, BPS_DENOMINATOR, WAD};
pub use error::{EngineError, EngineResult, TreasuryError};

// Ledger, pricing, order book and settlement
pub use ledger::{Market, MarketBook, MarketView, Position, PositionView};
pub use pricing::{BondingCurve, TradeReceipt};
pub use orderbook::{LimitOrderReport, Order, OrderStatus};
pub use settlement::{BatchSettlement, ClaimReceipt, Payout, Resolution};

// Engine surface
pub use lifecycle::{
    BatchPayoutReport, ClaimOutcome, Clock, EngineSettings, FillReceipt, LimitOrderReceipt, ManualClock,
    MarketEngine, NewMarket, SellReceipt, SystemClock, TransferStatus,
};
pub use treasury::{InMemoryTreasury, Transaction, Treasury, TxType};
pub use events::{EventBus, EventRecord, MarketEvent};
pub use config::AppConfig;
pub use app_state::{AppState, SharedState};
pub use routes::router;
