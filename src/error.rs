// ============================================================================
// Errors - Pari-mutuel Prediction Market
// ============================================================================
//
// Every rejected operation returns one of these and leaves the ledger
// untouched. Only outbound transfer failures happen after a commit, and
// those are reported in operation results rather than as errors.
//
// ============================================================================

use crate::models::{Amount, MarketId, OrderId};
use thiserror::Error;

/// Errors returned by engine operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Zero amount, malformed side/outcome, bad timestamps, empty question
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("market {0} not found")]
    MarketNotFound(MarketId),

    /// Trading after `endTime`, after resolution, or on an inactive market
    #[error("market {0} is not active")]
    MarketNotActive(MarketId),

    #[error("market {0} is already resolved")]
    AlreadyResolved(MarketId),

    #[error("market {0} is not resolved")]
    NotResolved(MarketId),

    #[error("insufficient shares: have {available}, need {requested}")]
    InsufficientShares { available: Amount, requested: Amount },

    #[error("insufficient funds: have {provided}, need {required}")]
    InsufficientFunds { provided: Amount, required: Amount },

    /// Zero remaining winning shares, including the double-claim case
    #[error("nothing to claim in market {0}")]
    NothingToClaim(MarketId),

    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// Fill or cancel of an order that is already filled or cancelled
    #[error("order {0} is not open")]
    OrderNotOpen(OrderId),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Limit order that cannot be filled in full within its price bound
    #[error("no liquidity within limit price {limit_bps} bps")]
    PriceLimitExceeded { limit_bps: u64 },

    #[error("arithmetic overflow")]
    Overflow,

    /// Custody could not collect the value attached to an operation
    #[error("transfer failed: {0}")]
    TransferFailed(String),
}

impl EngineError {
    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidInput(_) => "invalid_input",
            EngineError::MarketNotFound(_) => "market_not_found",
            EngineError::MarketNotActive(_) => "market_not_active",
            EngineError::AlreadyResolved(_) => "already_resolved",
            EngineError::NotResolved(_) => "not_resolved",
            EngineError::InsufficientShares { .. } => "insufficient_shares",
            EngineError::InsufficientFunds { .. } => "insufficient_funds",
            EngineError::NothingToClaim(_) => "nothing_to_claim",
            EngineError::OrderNotFound(_) => "order_not_found",
            EngineError::OrderNotOpen(_) => "order_not_open",
            EngineError::Unauthorized(_) => "unauthorized",
            EngineError::PriceLimitExceeded { .. } => "price_limit_exceeded",
            EngineError::Overflow => "overflow",
            EngineError::TransferFailed(_) => "transfer_failed",
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        EngineError::InvalidInput(msg.into())
    }
}

/// Custody-level failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreasuryError {
    #[error("account {account} has {available}, needs {required}")]
    InsufficientBalance {
        account: String,
        available: Amount,
        required: Amount,
    },

    #[error("custody holds {available}, cannot pay {required}")]
    CustodyShortfall { available: Amount, required: Amount },

    #[error("recipient {0} rejected the transfer")]
    RecipientRejected(String),

    #[error("arithmetic overflow")]
    Overflow,
}

impl From<TreasuryError> for EngineError {
    fn from(err: TreasuryError) -> Self {
        match err {
            TreasuryError::InsufficientBalance { available, required, .. } => {
                EngineError::InsufficientFunds { provided: available, required }
            }
            TreasuryError::Overflow => EngineError::Overflow,
            other => EngineError::TransferFailed(other.to_string()),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
