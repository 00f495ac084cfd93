//! End-to-end settlement scenarios against the persistent ledger

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tuplaus::{
    config::GameConfig,
    games::{Card, Choice, NewPlayer, PlayerId, RawPlayRequest, ScriptedCardSource, SettlementEngine, SettlementError},
    ledger::{LedgerRepository, RocksLedger},
    storage::LedgerStorage,
};

fn card(rank: u8) -> Card {
    Card::new(rank, 2).unwrap()
}

async fn setup(
    dir: &tempfile::TempDir,
    balance: Decimal,
    cards: ScriptedCardSource,
) -> (Arc<SettlementEngine>, Arc<RocksLedger>, PlayerId) {
    let storage = LedgerStorage::new(dir.path()).unwrap();
    let ledger = Arc::new(RocksLedger::open(storage).unwrap());
    let player = ledger
        .create_player(NewPlayer {
            full_name: "Matti Meikäläinen".to_string(),
            balance,
        })
        .await
        .unwrap();
    let engine = SettlementEngine::new(ledger.clone(), Arc::new(cards), GameConfig::default());
    (Arc::new(engine), ledger, player.id)
}

#[tokio::test]
async fn test_low_win_then_high_card_loss() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, ledger, id) = setup(&dir, dec!(100), ScriptedCardSource::new([card(2), card(9)])).await;

    let win = engine.settle(&RawPlayRequest::new(id, dec!(1), Choice::Low)).await.unwrap();
    assert!(win.won);
    assert_eq!(win.card.code(), "2C");
    assert_eq!(win.winnings, dec!(2));
    assert_eq!(win.balance_after, dec!(101));

    let loss = engine.settle(&RawPlayRequest::new(id, dec!(1), Choice::Low)).await.unwrap();
    assert!(!loss.won);
    assert_eq!(loss.winnings, Decimal::ZERO);
    assert_eq!(loss.balance_after, dec!(100));

    let events = ledger.events_for_player(id).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].id, win.event_id);
    assert_eq!(events[1].card, card(9));
    assert!(events[0].timestamp <= events[1].timestamp);

    let report = ledger.reconcile(id).await.unwrap();
    assert!(report.is_balanced());
    assert_eq!(report.stored_balance, dec!(100));
}

#[tokio::test]
async fn test_zero_balance_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, ledger, id) = setup(&dir, Decimal::ZERO, ScriptedCardSource::repeating(card(2))).await;

    let err = engine
        .settle(&RawPlayRequest::new(id, dec!(1), Choice::Low))
        .await
        .unwrap_err();

    assert_eq!(err, SettlementError::InsufficientFunds);
    assert_eq!(ledger.get_balance(id).await.unwrap(), Decimal::ZERO);
    assert!(ledger.list_events().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_full_balance_bet_is_allowed() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _, id) = setup(&dir, dec!(5), ScriptedCardSource::repeating(card(13))).await;

    let outcome = engine.settle(&RawPlayRequest::new(id, dec!(5), Choice::High)).await.unwrap();
    assert!(outcome.won);
    assert_eq!(outcome.balance_after, dec!(10));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_full_balance_bets_settle_once() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, ledger, id) = setup(&dir, dec!(10), ScriptedCardSource::repeating(card(7))).await;

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.settle(&RawPlayRequest::new(id, dec!(10), Choice::Low)).await })
        })
        .collect();

    let mut settled = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => settled += 1,
            Err(e) => assert_eq!(e, SettlementError::InsufficientFunds),
        }
    }

    assert_eq!(settled, 1);
    assert_eq!(ledger.get_balance(id).await.unwrap(), Decimal::ZERO);
    assert_eq!(ledger.list_events().await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_plays_lose_no_updates() {
    let dir = tempfile::tempdir().unwrap();
    let cards = ScriptedCardSource::new((0..40).map(|i| card(if i % 3 == 0 { 3 } else { 10 })));
    let (engine, ledger, id) = setup(&dir, dec!(100), cards).await;

    let handles: Vec<_> = (0..40)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.settle(&RawPlayRequest::new(id, dec!(1), Choice::Low)).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let events = ledger.events_for_player(id).await.unwrap();
    assert_eq!(events.len(), 40);

    // 14 lows drawn: each win nets +1, each loss -1.
    let wins = events.iter().filter(|e| e.winnings > Decimal::ZERO).count() as i64;
    assert_eq!(wins, 14);
    assert_eq!(ledger.get_balance(id).await.unwrap(), dec!(100) + Decimal::from(wins - (40 - wins)));
    assert!(ledger.reconcile(id).await.unwrap().is_balanced());
}

#[tokio::test]
async fn test_ledger_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let (engine, _, id) = setup(&dir, dec!(20), ScriptedCardSource::repeating(card(1))).await;
        engine.settle(&RawPlayRequest::new(id, dec!(4), Choice::Low)).await.unwrap();
        id
    };

    let ledger = RocksLedger::open(LedgerStorage::new(dir.path()).unwrap()).unwrap();
    assert_eq!(ledger.get_balance(id).await.unwrap(), dec!(24));
    let report = ledger.reconcile(id).await.unwrap();
    assert_eq!(report.event_count, 1);
    assert!(report.is_balanced());
}

#[tokio::test]
async fn test_balance_read_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let (_, ledger, id) = setup(&dir, dec!(12.50), ScriptedCardSource::repeating(card(5))).await;

    let first = ledger.get_balance(id).await.unwrap();
    let second = ledger.get_balance(id).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first, dec!(12.50));
}
