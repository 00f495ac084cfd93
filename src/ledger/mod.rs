//! Player Ledger Repository
//!
//! Owns player balances and the append-only game event log. `settle_debit`
//! is the only balance mutator: it checks funds, applies
//! `balance - bet + winnings` and appends the event as one atomic unit,
//! serialized per player.

pub mod memory;
pub mod rocks;

use crate::games::types::{GameEvent, NewPlayer, PendingEvent, Player, PlayerId};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;

pub use memory::MemoryLedger;
pub use rocks::RocksLedger;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("Player {0} not found")]
    NotFound(PlayerId),

    #[error("Insufficient funds: balance {balance}, bet {bet}")]
    InsufficientFunds { balance: Decimal, bet: Decimal },

    #[error("Invalid player record: {0}")]
    InvalidPlayer(String),

    #[error("Ledger storage failure: {0}")]
    Storage(String),

    #[error("Corrupted ledger record: {0}")]
    Corrupted(String),

    #[error("Balance overflow: balance {balance}, bet {bet}, winnings {winnings}")]
    BalanceOverflow {
        balance: Decimal,
        bet: Decimal,
        winnings: Decimal,
    },
}

impl From<rocksdb::Error> for LedgerError {
    fn from(e: rocksdb::Error) -> Self {
        LedgerError::Storage(e.to_string())
    }
}

/// What a successful `settle_debit` observed and wrote
#[derive(Debug, Clone, PartialEq)]
pub struct DebitReceipt {
    /// Balance seen inside the atomic unit, before the debit
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub event: GameEvent,
}

/// Stored balance checked against the event history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation {
    pub player_id: PlayerId,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub opening_balance: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub total_bet: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub total_winnings: Decimal,
    pub event_count: usize,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub expected_balance: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub stored_balance: Decimal,
}

impl Reconciliation {
    pub fn is_balanced(&self) -> bool {
        self.expected_balance == self.stored_balance
    }

    pub(crate) fn compute(player: &Player, events: &[GameEvent]) -> Self {
        let total_bet: Decimal = events.iter().map(|e| e.bet_amount).sum();
        let total_winnings: Decimal = events.iter().map(|e| e.winnings).sum();
        Self {
            player_id: player.id,
            opening_balance: player.opening_balance,
            total_bet,
            total_winnings,
            event_count: events.len(),
            expected_balance: player.opening_balance - total_bet + total_winnings,
            stored_balance: player.balance,
        }
    }
}

#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Point-in-time balance read
    async fn get_balance(&self, player_id: PlayerId) -> Result<Decimal, LedgerError>;

    async fn get_player(&self, player_id: PlayerId) -> Result<Option<Player>, LedgerError>;

    /// Atomically: verify the player exists and `balance >= bet`, apply
    /// `balance - bet + winnings`, append the event. On any error nothing
    /// is written. Concurrent calls for one player run one after another.
    async fn settle_debit(
        &self,
        player_id: PlayerId,
        bet: Decimal,
        winnings: Decimal,
        event: PendingEvent,
    ) -> Result<DebitReceipt, LedgerError>;

    async fn create_player(&self, player: NewPlayer) -> Result<Player, LedgerError>;

    async fn list_players(&self) -> Result<Vec<Player>, LedgerError>;

    /// Every event in id order
    async fn list_events(&self) -> Result<Vec<GameEvent>, LedgerError>;

    async fn events_for_player(&self, player_id: PlayerId) -> Result<Vec<GameEvent>, LedgerError>;

    /// Remove every player and event (debug only)
    async fn clear(&self) -> Result<(), LedgerError>;

    async fn reconcile(&self, player_id: PlayerId) -> Result<Reconciliation, LedgerError> {
        let player = self
            .get_player(player_id)
            .await?
            .ok_or(LedgerError::NotFound(player_id))?;
        let events = self.events_for_player(player_id).await?;
        Ok(Reconciliation::compute(&player, &events))
    }
}

pub(crate) fn validate_new_player(player: &NewPlayer) -> Result<(), LedgerError> {
    if player.full_name.trim().is_empty() {
        return Err(LedgerError::InvalidPlayer("full_name must not be empty".to_string()));
    }
    if player.balance < Decimal::ZERO {
        return Err(LedgerError::InvalidPlayer(format!(
            "opening balance {} is negative",
            player.balance
        )));
    }
    Ok(())
}

/// Funds check and new balance shared by both implementations
pub(crate) fn apply_debit(
    balance: Decimal,
    bet: Decimal,
    winnings: Decimal,
) -> Result<Decimal, LedgerError> {
    if bet > balance {
        return Err(LedgerError::InsufficientFunds { balance, bet });
    }
    balance
        .checked_sub(bet)
        .and_then(|remaining| remaining.checked_add(winnings))
        .ok_or(LedgerError::BalanceOverflow { balance, bet, winnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_apply_debit() {
        assert_eq!(apply_debit(dec!(100), dec!(1), dec!(2)), Ok(dec!(101)));
        assert_eq!(apply_debit(dec!(5), dec!(5), Decimal::ZERO), Ok(Decimal::ZERO));
        assert_eq!(
            apply_debit(dec!(5), dec!(6), Decimal::ZERO),
            Err(LedgerError::InsufficientFunds { balance: dec!(5), bet: dec!(6) })
        );
    }

    #[test]
    fn test_apply_debit_overflow_is_an_error() {
        let result = apply_debit(Decimal::MAX, dec!(1), dec!(2));
        assert_eq!(
            result,
            Err(LedgerError::BalanceOverflow { balance: Decimal::MAX, bet: dec!(1), winnings: dec!(2) })
        );
    }
}
