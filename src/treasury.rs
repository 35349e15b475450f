// ============================================================================
// Treasury - Pari-mutuel Prediction Market
// ============================================================================
//
// Custody of native currency for the engine.
//
//   collect: pull value attached to an operation into custody
//   pay:     send value out of custody
//
// The engine only calls `collect` while validating an operation, and only
// calls `pay` after the ledger write is committed. A failed `pay` is never
// rolled back; the engine records it as owed instead.
//
// `InMemoryTreasury` keeps account balances and an append-only journal in
// which every entry's hash covers the previous entry's hash.
//
// ============================================================================

use crate::error::TreasuryError;
use crate::models::{Address, Amount, MarketId};
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

/// Journal account name for the engine's custody
pub const CUSTODY_ACCOUNT: &str = "custody";

/// Journal account name for value entering from outside
pub const EXTERNAL_ACCOUNT: &str = "external";

// ============================================================================
// TRANSACTION JOURNAL
// ============================================================================

/// Transaction types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    Deposit,
    CreationFee,
    Buy,
    SellProceeds,
    OrderPayment,
    OrderProceeds,
    Payout,
    Refund,
    FeeWithdrawal,
    OwedWithdrawal,
}

/// A single journal entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub tx_type: TxType,
    pub from: String,
    pub to: String,
    pub amount: Amount,
    pub market_id: Option<MarketId>,
    pub timestamp: i64,
    /// Hash of the preceding entry (empty for the first)
    pub prev_hash: String,
    pub hash: String,
}

impl Transaction {
    fn new(
        tx_type: TxType,
        from: &str,
        to: &str,
        amount: Amount,
        market_id: Option<MarketId>,
        prev_hash: &str,
    ) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        let timestamp = Utc::now().timestamp();
        let hash = hash(&entry_preimage(prev_hash, &id, tx_type, from, to, amount, market_id, timestamp));
        Self {
            id,
            tx_type,
            from: from.to_string(),
            to: to.to_string(),
            amount,
            market_id,
            timestamp,
            prev_hash: prev_hash.to_string(),
            hash,
        }
    }

    fn recompute_hash(&self) -> String {
        hash(&entry_preimage(
            &self.prev_hash,
            &self.id,
            self.tx_type,
            &self.from,
            &self.to,
            self.amount,
            self.market_id,
            self.timestamp,
        ))
    }
}

#[allow(clippy::too_many_arguments)]
fn entry_preimage(
    prev_hash: &str,
    id: &str,
    tx_type: TxType,
    from: &str,
    to: &str,
    amount: Amount,
    market_id: Option<MarketId>,
    timestamp: i64,
) -> String {
    let market = market_id.map(|m| m.to_string()).unwrap_or_default();
    format!("{prev_hash}|{id}|{tx_type:?}|{from}|{to}|{amount}|{market}|{timestamp}")
}

/// Compute SHA256 hash
pub fn hash(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

// ============================================================================
// TREASURY TRAIT
// ============================================================================

/// Funds custody used by the engine
pub trait Treasury: Send + Sync {
    /// Move `amount` from `from` into custody
    fn collect(
        &self,
        from: &Address,
        amount: Amount,
        tx_type: TxType,
        market_id: Option<MarketId>,
    ) -> Result<(), TreasuryError>;

    /// Move `amount` from custody to `to`
    fn pay(
        &self,
        to: &Address,
        amount: Amount,
        tx_type: TxType,
        market_id: Option<MarketId>,
    ) -> Result<(), TreasuryError>;
}

// ============================================================================
// IN-MEMORY TREASURY
// ============================================================================

#[derive(Debug, Default)]
struct TreasuryState {
    balances: HashMap<Address, Amount>,
    custody: Amount,
    journal: Vec<Transaction>,
    rejecting: HashSet<Address>,
}

impl TreasuryState {
    fn record(
        &mut self,
        tx_type: TxType,
        from: &str,
        to: &str,
        amount: Amount,
        market_id: Option<MarketId>,
    ) -> Transaction {
        let prev = self.journal.last().map(|t| t.hash.as_str()).unwrap_or("");
        let tx = Transaction::new(tx_type, from, to, amount, market_id, prev);
        self.journal.push(tx.clone());
        tx
    }
}

/// Account balances plus the custody pot, behind one lock
#[derive(Debug, Default)]
pub struct InMemoryTreasury {
    state: Mutex<TreasuryState>,
}

impl InMemoryTreasury {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `account` from outside the system
    pub fn deposit(&self, account: &Address, amount: Amount) -> Result<Transaction, TreasuryError> {
        let mut state = self.state.lock();
        let balance = state.balances.entry(account.clone()).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(TreasuryError::Overflow)?;
        Ok(state.record(TxType::Deposit, EXTERNAL_ACCOUNT, account.as_str(), amount, None))
    }

    pub fn balance(&self, account: &Address) -> Amount {
        self.state.lock().balances.get(account).copied().unwrap_or(0)
    }

    /// Currency currently held on behalf of markets and the fee vault
    pub fn custody_balance(&self) -> Amount {
        self.state.lock().custody
    }

    /// Make every future payment to `account` fail
    pub fn reject_payments_to(&self, account: &Address) {
        self.state.lock().rejecting.insert(account.clone());
    }

    pub fn accept_payments_to(&self, account: &Address) {
        self.state.lock().rejecting.remove(account);
    }

    /// Journal entries touching `account`, oldest first
    pub fn transactions(&self, account: &Address) -> Vec<Transaction> {
        let state = self.state.lock();
        state
            .journal
            .iter()
            .filter(|t| t.from == account.as_str() || t.to == account.as_str())
            .cloned()
            .collect()
    }

    /// Most recent journal entries, newest first
    pub fn recent_transactions(&self, limit: usize) -> Vec<Transaction> {
        self.state.lock().journal.iter().rev().take(limit).cloned().collect()
    }

    /// Check that every entry hashes correctly and links to its predecessor
    pub fn verify_journal(&self) -> bool {
        let state = self.state.lock();
        let mut prev = "";
        for tx in &state.journal {
            if tx.prev_hash != prev || tx.recompute_hash() != tx.hash {
                return false;
            }
            prev = tx.hash.as_str();
        }
        true
    }
}

impl Treasury for InMemoryTreasury {
    fn collect(
        &self,
        from: &Address,
        amount: Amount,
        tx_type: TxType,
        market_id: Option<MarketId>,
    ) -> Result<(), TreasuryError> {
        if amount == 0 {
            return Ok(());
        }
        let mut state = self.state.lock();
        let available = state.balances.get(from).copied().unwrap_or(0);
        if available < amount {
            return Err(TreasuryError::InsufficientBalance {
                account: from.to_string(),
                available,
                required: amount,
            });
        }
        let custody = state.custody.checked_add(amount).ok_or(TreasuryError::Overflow)?;
        state.balances.insert(from.clone(), available - amount);
        state.custody = custody;
        state.record(tx_type, from.as_str(), CUSTODY_ACCOUNT, amount, market_id);
        Ok(())
    }

    fn pay(
        &self,
        to: &Address,
        amount: Amount,
        tx_type: TxType,
        market_id: Option<MarketId>,
    ) -> Result<(), TreasuryError> {
        if amount == 0 {
            return Ok(());
        }
        let mut state = self.state.lock();
        if state.rejecting.contains(to) {
            return Err(TreasuryError::RecipientRejected(to.to_string()));
        }
        if state.custody < amount {
            return Err(TreasuryError::CustodyShortfall {
                available: state.custody,
                required: amount,
            });
        }
        let balance = state.balances.get(to).copied().unwrap_or(0);
        let balance = balance.checked_add(amount).ok_or(TreasuryError::Overflow)?;
        state.custody -= amount;
        state.balances.insert(to.clone(), balance);
        state.record(tx_type, CUSTODY_ACCOUNT, to.as_str(), amount, market_id);
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
