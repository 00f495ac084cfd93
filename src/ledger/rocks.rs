//! RocksDB-backed ledger.
//!
//! Key layout:
//! - `player:{id be}`                      → JSON `Player`
//! - `event:{id be}`                       → JSON `GameEvent`
//! - `index:player_event:{player be}{id be}` → empty, per-player event index
//! - `meta:next_player_id`                 → u64 be, last assigned player id
//! - `meta:next_event_id`                  → u64 be, last assigned event id
//!
//! A settlement writes the player record, the event and its index entry in a
//! single `WriteBatch`, so the balance never moves without its event.

use super::{apply_debit, validate_new_player, DebitReceipt, LedgerError, LedgerRepository};
use crate::{
    games::types::{GameEvent, NewPlayer, PendingEvent, Player, PlayerId},
    storage::LedgerStorage,
};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use rocksdb::WriteBatch;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tracing::{debug, info};

const PLAYER_PREFIX: &[u8] = b"player:";
const EVENT_PREFIX: &[u8] = b"event:";
const PLAYER_EVENT_INDEX_PREFIX: &[u8] = b"index:player_event:";
const NEXT_PLAYER_ID_KEY: &[u8] = b"meta:next_player_id";
const NEXT_EVENT_ID_KEY: &[u8] = b"meta:next_event_id";

fn player_key(id: PlayerId) -> Vec<u8> {
    let mut key = Vec::with_capacity(PLAYER_PREFIX.len() + 8);
    key.extend_from_slice(PLAYER_PREFIX);
    key.extend_from_slice(&id.0.to_be_bytes());
    key
}

fn event_key(id: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(EVENT_PREFIX.len() + 8);
    key.extend_from_slice(EVENT_PREFIX);
    key.extend_from_slice(&id.to_be_bytes());
    key
}

fn player_event_prefix(player_id: PlayerId) -> Vec<u8> {
    let mut key = Vec::with_capacity(PLAYER_EVENT_INDEX_PREFIX.len() + 16);
    key.extend_from_slice(PLAYER_EVENT_INDEX_PREFIX);
    key.extend_from_slice(&player_id.0.to_be_bytes());
    key
}

fn player_event_key(player_id: PlayerId, event_id: u64) -> Vec<u8> {
    let mut key = player_event_prefix(player_id);
    key.extend_from_slice(&event_id.to_be_bytes());
    key
}

/// Trailing big-endian u64 of a key
fn trailing_id(key: &[u8]) -> Option<u64> {
    let bytes: [u8; 8] = key.get(key.len().checked_sub(8)?..)?.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

fn encode<T: Serialize>(value: &T, what: &str) -> Result<Vec<u8>, LedgerError> {
    serde_json::to_vec(value)
        .map_err(|e| LedgerError::Storage(format!("Failed to encode {}: {}", what, e)))
}

fn decode<T: DeserializeOwned>(bytes: &[u8], what: &str) -> Result<T, LedgerError> {
    serde_json::from_slice(bytes)
        .map_err(|e| LedgerError::Corrupted(format!("Failed to decode {}: {}", what, e)))
}

fn read_counter(storage: &LedgerStorage, key: &[u8]) -> Result<u64, LedgerError> {
    match storage.get(key)? {
        Some(bytes) => {
            let bytes: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                LedgerError::Corrupted(format!("{} is not 8 bytes", String::from_utf8_lossy(key)))
            })?;
            Ok(u64::from_be_bytes(bytes))
        }
        None => Ok(0),
    }
}

pub struct RocksLedger {
    storage: LedgerStorage,
    /// One async mutex per player serializes settlements on that balance
    player_locks: DashMap<PlayerId, Arc<AsyncMutex<()>>>,
    /// Settlements hold it shared; `clear` holds it exclusively
    maintenance: RwLock<()>,
    next_player_id: Mutex<u64>,
    next_event_id: AtomicU64,
}

impl RocksLedger {
    /// Open the ledger, recovering id counters from what is already stored
    pub fn open(storage: LedgerStorage) -> Result<Self, LedgerError> {
        let last_player_id = read_counter(&storage, NEXT_PLAYER_ID_KEY)?;
        // Older databases may lack the event counter; the greatest event key covers them.
        let last_event_id = read_counter(&storage, NEXT_EVENT_ID_KEY)?.max(
            storage
                .last_key_with_prefix(EVENT_PREFIX)?
                .as_deref()
                .and_then(trailing_id)
                .unwrap_or(0),
        );

        info!(last_player_id, last_event_id, "Opened ledger");

        Ok(Self {
            storage,
            player_locks: DashMap::new(),
            maintenance: RwLock::new(()),
            next_player_id: Mutex::new(last_player_id),
            next_event_id: AtomicU64::new(last_event_id),
        })
    }

    fn load_player(&self, player_id: PlayerId) -> Result<Option<Player>, LedgerError> {
        match self.storage.get(&player_key(player_id))? {
            Some(bytes) => decode(&bytes, "player").map(Some),
            None => Ok(None),
        }
    }

    fn load_event(&self, event_id: u64) -> Result<GameEvent, LedgerError> {
        let bytes = self
            .storage
            .get(&event_key(event_id))?
            .ok_or_else(|| LedgerError::Corrupted(format!("indexed event {} missing", event_id)))?;
        decode(&bytes, "event")
    }

    fn player_lock(&self, player_id: PlayerId) -> Arc<AsyncMutex<()>> {
        self.player_locks.entry(player_id).or_default().clone()
    }
}

#[async_trait]
impl LedgerRepository for RocksLedger {
    async fn get_balance(&self, player_id: PlayerId) -> Result<Decimal, LedgerError> {
        self.load_player(player_id)?
            .map(|p| p.balance)
            .ok_or(LedgerError::NotFound(player_id))
    }

    async fn get_player(&self, player_id: PlayerId) -> Result<Option<Player>, LedgerError> {
        self.load_player(player_id)
    }

    async fn settle_debit(
        &self,
        player_id: PlayerId,
        bet: Decimal,
        winnings: Decimal,
        event: PendingEvent,
    ) -> Result<DebitReceipt, LedgerError> {
        let _shared = self.maintenance.read().await;
        let lock = self.player_lock(player_id);
        let _guard = lock.lock().await;

        // No await below: a dropped call can only be cancelled before the write.
        let mut player = self
            .load_player(player_id)?
            .ok_or(LedgerError::NotFound(player_id))?;
        let balance_before = player.balance;
        let balance_after = apply_debit(balance_before, bet, winnings)?;
        player.balance = balance_after;

        let event_id = self.next_event_id.fetch_add(1, Ordering::SeqCst) + 1;
        let event = event.into_event(event_id, player_id);

        let mut batch = WriteBatch::default();
        batch.put(player_key(player_id), encode(&player, "player")?);
        batch.put(event_key(event_id), encode(&event, "event")?);
        batch.put(player_event_key(player_id, event_id), b"");
        batch.put(NEXT_EVENT_ID_KEY, event_id.to_be_bytes());
        self.storage.write(batch)?;

        debug!(
            player_id = %player_id,
            event_id,
            %balance_before,
            %balance_after,
            "Settled debit"
        );

        Ok(DebitReceipt {
            balance_before,
            balance_after,
            event,
        })
    }

    async fn create_player(&self, player: NewPlayer) -> Result<Player, LedgerError> {
        validate_new_player(&player)?;
        let mut next_id = self
            .next_player_id
            .lock()
            .map_err(|_| LedgerError::Storage("player id counter poisoned".to_string()))?;

        let id = PlayerId(*next_id + 1);
        let created = Player {
            id,
            full_name: player.full_name,
            balance: player.balance,
            opening_balance: player.balance,
            created_at: Utc::now(),
        };

        self.storage.batch_write(&[
            (player_key(id), encode(&created, "player")?),
            (NEXT_PLAYER_ID_KEY.to_vec(), id.0.to_be_bytes().to_vec()),
        ])?;
        *next_id = id.0;

        info!(player_id = %id, balance = %created.balance, "Created player");
        Ok(created)
    }

    async fn list_players(&self) -> Result<Vec<Player>, LedgerError> {
        self.storage
            .scan_prefix(PLAYER_PREFIX)?
            .iter()
            .map(|(_, value)| decode(value, "player"))
            .collect()
    }

    async fn list_events(&self) -> Result<Vec<GameEvent>, LedgerError> {
        self.storage
            .scan_prefix(EVENT_PREFIX)?
            .iter()
            .map(|(_, value)| decode(value, "event"))
            .collect()
    }

    async fn events_for_player(&self, player_id: PlayerId) -> Result<Vec<GameEvent>, LedgerError> {
        self.storage
            .scan_prefix(&player_event_prefix(player_id))?
            .iter()
            .map(|(key, _)| {
                let event_id = trailing_id(key)
                    .ok_or_else(|| LedgerError::Corrupted("short event index key".to_string()))?;
                self.load_event(event_id)
            })
            .collect()
    }

    async fn clear(&self) -> Result<(), LedgerError> {
        let _exclusive = self.maintenance.write().await;
        let players = self.storage.delete_prefix(PLAYER_PREFIX)?;
        let events = self.storage.delete_prefix(EVENT_PREFIX)?;
        self.storage.delete_prefix(PLAYER_EVENT_INDEX_PREFIX)?;
        self.player_locks.clear();
        info!(players, events, "Cleared ledger");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::{card::Card, outcome::Choice};
    use rust_decimal_macros::dec;

    fn pending(bet: Decimal, winnings: Decimal) -> PendingEvent {
        PendingEvent {
            timestamp: Utc::now(),
            bet_amount: bet,
            player_choice: Choice::High,
            card: Card::new(9, 3).unwrap(),
            winnings,
        }
    }

    fn open(dir: &std::path::Path) -> RocksLedger {
        RocksLedger::open(LedgerStorage::new(dir).unwrap()).unwrap()
    }

    #[test]
    fn test_trailing_id() {
        assert_eq!(trailing_id(&event_key(77)), Some(77));
        assert_eq!(trailing_id(&player_event_key(PlayerId(3), 9)), Some(9));
        assert_eq!(trailing_id(b"short"), None);
    }

    #[tokio::test]
    async fn test_settlement_persists_balance_and_event() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open(dir.path());
        let player = ledger
            .create_player(NewPlayer { full_name: "Jaakko Jaakkola".to_string(), balance: dec!(1000) })
            .await
            .unwrap();

        let receipt = ledger
            .settle_debit(player.id, dec!(50), dec!(100), pending(dec!(50), dec!(100)))
            .await
            .unwrap();

        assert_eq!(receipt.balance_after, dec!(1050));
        assert_eq!(ledger.get_balance(player.id).await.unwrap(), dec!(1050));
        assert_eq!(ledger.events_for_player(player.id).await.unwrap(), vec![receipt.event.clone()]);
        assert_eq!(ledger.list_events().await.unwrap(), vec![receipt.event]);
    }

    #[tokio::test]
    async fn test_counters_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let first_player = {
            let ledger = open(dir.path());
            let player = ledger
                .create_player(NewPlayer { full_name: "A".to_string(), balance: dec!(10) })
                .await
                .unwrap();
            ledger
                .settle_debit(player.id, dec!(1), dec!(0), pending(dec!(1), dec!(0)))
                .await
                .unwrap();
            player.id
        };

        let ledger = open(dir.path());
        let second = ledger
            .create_player(NewPlayer { full_name: "B".to_string(), balance: dec!(10) })
            .await
            .unwrap();
        assert_eq!(second.id, PlayerId(first_player.0 + 1));

        let receipt = ledger
            .settle_debit(second.id, dec!(1), dec!(0), pending(dec!(1), dec!(0)))
            .await
            .unwrap();
        assert_eq!(receipt.event.id, 2);
        assert_eq!(ledger.get_balance(first_player).await.unwrap(), dec!(9));
    }

    #[tokio::test]
    async fn test_rejected_debit_leaves_no_trace() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open(dir.path());
        let player = ledger
            .create_player(NewPlayer { full_name: "Rahaton Tallaaja".to_string(), balance: dec!(0) })
            .await
            .unwrap();

        let err = ledger
            .settle_debit(player.id, dec!(1), dec!(0), pending(dec!(1), dec!(0)))
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(ledger.get_balance(player.id).await.unwrap(), Decimal::ZERO);
        assert!(ledger.list_events().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_removes_players_and_events() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open(dir.path());
        let player = ledger
            .create_player(NewPlayer { full_name: "A".to_string(), balance: dec!(5) })
            .await
            .unwrap();
        ledger
            .settle_debit(player.id, dec!(1), dec!(2), pending(dec!(1), dec!(2)))
            .await
            .unwrap();

        ledger.clear().await.unwrap();

        assert!(ledger.list_players().await.unwrap().is_empty());
        assert!(ledger.list_events().await.unwrap().is_empty());
        assert!(ledger.events_for_player(player.id).await.unwrap().is_empty());
        assert_eq!(ledger.get_balance(player.id).await, Err(LedgerError::NotFound(player.id)));
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_clear_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let ledger = open(dir.path());
            let player = ledger
                .create_player(NewPlayer { full_name: "A".to_string(), balance: dec!(5) })
                .await
                .unwrap();
            ledger
                .settle_debit(player.id, dec!(1), dec!(0), pending(dec!(1), dec!(0)))
                .await
                .unwrap();
            ledger.clear().await.unwrap();
        }

        let ledger = open(dir.path());
        let player = ledger
            .create_player(NewPlayer { full_name: "B".to_string(), balance: dec!(5) })
            .await
            .unwrap();
        assert_eq!(player.id, PlayerId(2));

        let receipt = ledger
            .settle_debit(player.id, dec!(1), dec!(0), pending(dec!(1), dec!(0)))
            .await
            .unwrap();
        assert_eq!(receipt.event.id, 2);
    }
}
