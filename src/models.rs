// ============================================================================
// Core Types - Pari-mutuel Prediction Market
// ============================================================================
//
// Identifiers, sides, outcomes and the fixed-point units shared by every
// component.
//
// Units:
//   - Amount: currency and share quantities, 18-decimal fixed point
//     (1 whole unit = WAD = 10^18)
//   - Bps: prices and fees in basis points (10000 = 100%)
//
// ============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// UNITS
// ============================================================================

/// Currency or share quantity in 18-decimal fixed point
pub type Amount = u128;

/// Basis points (1/100 of a percent)
pub type Bps = u64;

/// One whole unit of currency or one whole share
pub const WAD: Amount = 1_000_000_000_000_000_000;

/// 100% in basis points
pub const BPS_DENOMINATOR: Bps = 10_000;

// ============================================================================
// IDENTIFIERS
// ============================================================================

/// Sequential market identifier (first market is 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketId(pub u64);

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sequential sell-order identifier, unique across markets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque caller identity (wallet address, account name, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Address(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened form for log lines
    pub fn short(&self) -> &str {
        self.0.get(..16).unwrap_or(&self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Address(value.to_string())
    }
}

// ============================================================================
// SIDE & OUTCOME
// ============================================================================

/// Which side of a binary market a trade or order refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Yes,
    No,
}

impl Side {
    pub fn from_is_yes(is_yes: bool) -> Self {
        if is_yes { Side::Yes } else { Side::No }
    }

    pub fn is_yes(&self) -> bool {
        matches!(self, Side::Yes)
    }

    pub fn opposite(&self) -> Self {
        match self {
            Side::Yes => Side::No,
            Side::No => Side::Yes,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Yes => "yes",
            Side::No => "no",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Market outcome. Wire codes: 0=Unresolved, 1=Yes, 2=No, 3=Invalid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    #[default]
    Unresolved,
    Yes,
    No,
    Invalid,
}

impl Outcome {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Outcome::Unresolved),
            1 => Some(Outcome::Yes),
            2 => Some(Outcome::No),
            3 => Some(Outcome::Invalid),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Outcome::Unresolved => 0,
            Outcome::Yes => 1,
            Outcome::No => 2,
            Outcome::Invalid => 3,
        }
    }

    /// Winning side, if the outcome names one
    pub fn winning_side(&self) -> Option<Side> {
        match self {
            Outcome::Yes => Some(Side::Yes),
            Outcome::No => Some(Side::No),
            Outcome::Unresolved | Outcome::Invalid => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Outcome::Unresolved => "unresolved",
            Outcome::Yes => "yes",
            Outcome::No => "no",
            Outcome::Invalid => "invalid",
        };
        f.write_str(label)
    }
}

/// Direction of a bonding-curve trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    Buy,
    Sell,
}

// ============================================================================
// TESTS
// ============================================================================
