//! Tuplaus - double-or-nothing card game settlement service
//!
//! A player bets on whether a drawn card is low (A-6) or high (8-K); a seven
//! loses either way and a win pays twice the bet. Each play is settled
//! against a player ledger as one atomic debit-and-record step.

pub mod api;
pub mod config;
pub mod errors;
pub mod games;
pub mod ledger;
pub mod metrics;
pub mod storage;

pub use config::TuplausConfig;
pub use errors::{TuplausError, TuplausResult};
pub use games::{SettlementEngine, SettlementError};
pub use ledger::{LedgerError, LedgerRepository, MemoryLedger, RocksLedger};
