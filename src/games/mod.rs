pub mod card;
pub mod card_source;
pub mod outcome;
pub mod settlement;
pub mod types;

pub use card::{Card, CardError};
pub use card_source::{CardSource, OsCardSource, ScriptedCardSource};
pub use outcome::{evaluate, Choice, Evaluation, Side};
pub use settlement::{RejectionKind, SettlementEngine, SettlementError, SettlementState};
pub use types::*;
