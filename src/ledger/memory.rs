//! In-process ledger for tests and ephemeral runs.

use super::{apply_debit, validate_new_player, DebitReceipt, LedgerError, LedgerRepository};
use crate::games::types::{GameEvent, NewPlayer, PendingEvent, Player, PlayerId};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

#[derive(Default)]
struct LedgerState {
    players: BTreeMap<PlayerId, Player>,
    events: Vec<GameEvent>,
    next_player_id: u64,
    next_event_id: u64,
}

/// Every operation runs under one mutex, so each call is atomic and
/// settlements are totally ordered.
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>, LedgerError> {
        self.state
            .lock()
            .map_err(|_| LedgerError::Storage("ledger mutex poisoned".to_string()))
    }
}

#[async_trait]
impl LedgerRepository for MemoryLedger {
    async fn get_balance(&self, player_id: PlayerId) -> Result<Decimal, LedgerError> {
        let state = self.lock()?;
        state
            .players
            .get(&player_id)
            .map(|p| p.balance)
            .ok_or(LedgerError::NotFound(player_id))
    }

    async fn get_player(&self, player_id: PlayerId) -> Result<Option<Player>, LedgerError> {
        Ok(self.lock()?.players.get(&player_id).cloned())
    }

    async fn settle_debit(
        &self,
        player_id: PlayerId,
        bet: Decimal,
        winnings: Decimal,
        event: PendingEvent,
    ) -> Result<DebitReceipt, LedgerError> {
        let mut state = self.lock()?;
        let balance_before = state
            .players
            .get(&player_id)
            .map(|p| p.balance)
            .ok_or(LedgerError::NotFound(player_id))?;
        let balance_after = apply_debit(balance_before, bet, winnings)?;

        state.next_event_id += 1;
        let event = event.into_event(state.next_event_id, player_id);
        state.events.push(event.clone());
        if let Some(player) = state.players.get_mut(&player_id) {
            player.balance = balance_after;
        }

        Ok(DebitReceipt {
            balance_before,
            balance_after,
            event,
        })
    }

    async fn create_player(&self, player: NewPlayer) -> Result<Player, LedgerError> {
        validate_new_player(&player)?;
        let mut state = self.lock()?;
        state.next_player_id += 1;
        let created = Player {
            id: PlayerId(state.next_player_id),
            full_name: player.full_name,
            balance: player.balance,
            opening_balance: player.balance,
            created_at: Utc::now(),
        };
        state.players.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_players(&self) -> Result<Vec<Player>, LedgerError> {
        Ok(self.lock()?.players.values().cloned().collect())
    }

    async fn list_events(&self) -> Result<Vec<GameEvent>, LedgerError> {
        Ok(self.lock()?.events.clone())
    }

    async fn events_for_player(&self, player_id: PlayerId) -> Result<Vec<GameEvent>, LedgerError> {
        Ok(self
            .lock()?
            .events
            .iter()
            .filter(|e| e.player_id == player_id)
            .cloned()
            .collect())
    }

    async fn clear(&self) -> Result<(), LedgerError> {
        let mut state = self.lock()?;
        state.players.clear();
        state.events.clear();
        Ok(())
    }
}
