use crate::games::{card::Card, outcome::Choice};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Player account identifier, assigned by the ledger
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Player account as stored in the ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub full_name: String,
    pub balance: Decimal,
    /// Balance at account creation; the base for reconciliation
    pub opening_balance: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Admin input for creating a player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlayer {
    pub full_name: String,
    pub balance: Decimal,
}

/// Immutable record of one settled play
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameEvent {
    pub id: u64,
    pub player_id: PlayerId,
    /// When settlement began
    pub timestamp: DateTime<Utc>,
    pub bet_amount: Decimal,
    pub player_choice: Choice,
    pub card: Card,
    pub winnings: Decimal,
}

/// Event contents prepared by the engine before the ledger assigns an id
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEvent {
    pub timestamp: DateTime<Utc>,
    pub bet_amount: Decimal,
    pub player_choice: Choice,
    pub card: Card,
    pub winnings: Decimal,
}

impl PendingEvent {
    pub fn into_event(self, id: u64, player_id: PlayerId) -> GameEvent {
        GameEvent {
            id,
            player_id,
            timestamp: self.timestamp,
            bet_amount: self.bet_amount,
            player_choice: self.player_choice,
            card: self.card,
            winnings: self.winnings,
        }
    }
}

/// Settlement request exactly as decoded from the wire; fields keep their
/// JSON type so validation can tell a mistyped player id from a bad bet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlayRequest {
    #[serde(default)]
    pub player_id: serde_json::Value,
    #[serde(default)]
    pub bet: serde_json::Value,
    #[serde(default)]
    pub choice: serde_json::Value,
}

impl RawPlayRequest {
    pub fn new(player_id: PlayerId, bet: Decimal, choice: Choice) -> Self {
        Self {
            player_id: serde_json::json!(player_id.0),
            // Decimal text is always valid JSON number syntax.
            bet: serde_json::Number::from_str(&bet.to_string())
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            choice: serde_json::json!(choice.to_string()),
        }
    }
}

/// Request that passed input validation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatedPlay {
    pub player_id: PlayerId,
    pub bet: Decimal,
    pub choice: Choice,
}

/// Caller-visible result of a successful settlement
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementOutcome {
    pub won: bool,
    pub card: Card,
    pub bet: Decimal,
    pub winnings: Decimal,
    pub balance_after: Decimal,
    pub event_id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_play_request_keeps_bet_text() {
        let request = RawPlayRequest::new(PlayerId(3), dec!(0.1), Choice::High);
        assert_eq!(request.player_id, serde_json::json!(3));
        assert_eq!(request.bet.to_string(), "0.1");
        assert_eq!(request.choice, serde_json::json!("high"));

        let whole = RawPlayRequest::new(PlayerId(3), dec!(10), Choice::Low);
        assert_eq!(whole.bet, serde_json::json!(10));
    }
}
