// ============================================================================
// Position Record - Pari-mutuel Prediction Market
// ============================================================================
//
// A user's holdings in one market. Created lazily on first trade, never
// deleted: a claimed or fully sold position is zeroed and kept for audit.
//
// Escrow:
//   Shares backing an open sell order stay counted in `*_shares` but are
//   also counted in `*_escrowed`. Only `available = shares - escrowed` can
//   be sold, escrowed again, or claimed.
//
// ============================================================================

use crate::models::{Amount, Side};
use serde::{Deserialize, Serialize};

/// Per-(market, user) holdings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub yes_shares: Amount,
    pub no_shares: Amount,
    pub yes_invested: Amount,
    pub no_invested: Amount,
    pub yes_escrowed: Amount,
    pub no_escrowed: Amount,
}

impl Position {
    pub fn shares(&self, side: Side) -> Amount {
        match side {
            Side::Yes => self.yes_shares,
            Side::No => self.no_shares,
        }
    }

    pub fn invested(&self, side: Side) -> Amount {
        match side {
            Side::Yes => self.yes_invested,
            Side::No => self.no_invested,
        }
    }

    pub fn escrowed(&self, side: Side) -> Amount {
        match side {
            Side::Yes => self.yes_escrowed,
            Side::No => self.no_escrowed,
        }
    }

    /// Shares not reserved by open sell orders
    pub fn available(&self, side: Side) -> Amount {
        self.shares(side).saturating_sub(self.escrowed(side))
    }

    pub fn total_invested(&self) -> Amount {
        self.yes_invested.saturating_add(self.no_invested)
    }

    pub fn is_empty(&self) -> bool {
        self.yes_shares == 0 && self.no_shares == 0
    }

    pub(crate) fn shares_mut(&mut self, side: Side) -> &mut Amount {
        match side {
            Side::Yes => &mut self.yes_shares,
            Side::No => &mut self.no_shares,
        }
    }

    pub(crate) fn invested_mut(&mut self, side: Side) -> &mut Amount {
        match side {
            Side::Yes => &mut self.yes_invested,
            Side::No => &mut self.no_invested,
        }
    }

    pub(crate) fn escrowed_mut(&mut self, side: Side) -> &mut Amount {
        match side {
            Side::Yes => &mut self.yes_escrowed,
            Side::No => &mut self.no_escrowed,
        }
    }
}

/// Position snapshot returned by `getUserPosition`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionView {
    pub yes_shares: Amount,
    pub no_shares: Amount,
    pub yes_invested: Amount,
    pub no_invested: Amount,
    pub yes_escrowed: Amount,
    pub no_escrowed: Amount,
    pub total_invested: Amount,
}

impl From<Position> for PositionView {
    fn from(p: Position) -> Self {
        Self {
            yes_shares: p.yes_shares,
            no_shares: p.no_shares,
            yes_invested: p.yes_invested,
            no_invested: p.no_invested,
            yes_escrowed: p.yes_escrowed,
            no_escrowed: p.no_escrowed,
            total_invested: p.total_invested(),
        }
    }
}
