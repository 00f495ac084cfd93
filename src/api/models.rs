//! API Request and Response Models
//!
//! Money goes over the wire as JSON numbers; stored records keep exact
//! decimal strings.

use crate::games::{
    card::Card,
    outcome::Choice,
    types::{GameEvent, NewPlayer, Player, PlayerId, SettlementOutcome},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Successful settlement as seen by the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayResponse {
    pub victory: bool,
    pub card_code: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub winnings: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
}

impl From<SettlementOutcome> for PlayResponse {
    fn from(outcome: SettlementOutcome) -> Self {
        Self {
            victory: outcome.won,
            card_code: outcome.card.code(),
            winnings: outcome.winnings,
            balance: outcome.balance_after,
        }
    }
}

/// POST /api/debug/addPlayer body
#[derive(Debug, Clone, Deserialize)]
pub struct AddPlayerRequest {
    pub player: NewPlayer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub full_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub opening_balance: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<Player> for PlayerView {
    fn from(player: Player) -> Self {
        Self {
            id: player.id,
            full_name: player.full_name,
            balance: player.balance,
            opening_balance: player.opening_balance,
            created_at: player.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventView {
    pub id: u64,
    pub player_id: PlayerId,
    pub timestamp: DateTime<Utc>,
    #[serde(with = "rust_decimal::serde::float")]
    pub bet_amount: Decimal,
    pub player_choice: Choice,
    pub card: Card,
    #[serde(with = "rust_decimal::serde::float")]
    pub winnings: Decimal,
}

impl From<GameEvent> for EventView {
    fn from(event: GameEvent) -> Self {
        Self {
            id: event.id,
            player_id: event.player_id,
            timestamp: event.timestamp,
            bet_amount: event.bet_amount,
            player_choice: event.player_choice,
            card: event.card,
            winnings: event.winnings,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddPlayerResponse {
    pub player: PlayerView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EverythingResponse {
    pub everything: Everything,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Everything {
    pub players: Vec<PlayerView>,
    pub events: Vec<EventView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::card::Card;
    use rust_decimal_macros::dec;

    #[test]
    fn test_play_response_wire_names() {
        let response = PlayResponse::from(SettlementOutcome {
            won: true,
            card: Card::new(12, 3).unwrap(),
            bet: dec!(1.5),
            winnings: dec!(3),
            balance_after: dec!(101.5),
            event_id: 4,
        });

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["victory"], true);
        assert_eq!(json["cardCode"], "QH");
        assert_eq!(json["winnings"], 3.0);
        assert_eq!(json["balance"], 101.5);
    }

    #[test]
    fn test_dump_views_use_numbers() {
        let event = GameEvent {
            id: 1,
            player_id: PlayerId(2),
            timestamp: Utc::now(),
            bet_amount: dec!(10),
            player_choice: Choice::High,
            card: Card::new(11, 4).unwrap(),
            winnings: dec!(20),
        };

        let json = serde_json::to_value(EventView::from(event)).unwrap();
        assert_eq!(json["bet_amount"], 10.0);
        assert_eq!(json["winnings"], 20.0);
        assert_eq!(json["card"], "JD");
        assert_eq!(json["player_choice"], "high");
    }

    #[test]
    fn test_add_player_request_decodes() {
        let request: AddPlayerRequest =
            serde_json::from_str(r#"{"player":{"full_name":"Testi Pelaaja","balance":100}}"#).unwrap();
        assert_eq!(request.player.full_name, "Testi Pelaaja");
        assert_eq!(request.player.balance, dec!(100));
    }
}
