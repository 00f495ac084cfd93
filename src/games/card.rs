//! Playing card model and two-character card codes.
//!
//! Code layout: `[rank][suit]`, rank `A 2-9 T J Q K`, suit `S C H D`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

const RANK_CODES: [char; 13] = ['A', '2', '3', '4', '5', '6', '7', '8', '9', 'T', 'J', 'Q', 'K'];
const SUIT_CODES: [char; 4] = ['S', 'C', 'H', 'D'];

pub const MIN_RANK: u8 = 1;
pub const MAX_RANK: u8 = 13;
pub const MIN_SUIT: u8 = 1;
pub const MAX_SUIT: u8 = 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CardError {
    #[error("Invalid card: {0}")]
    InvalidCard(String),
}

/// A drawn card; rank 1..=13 (ace low), suit 1..=4
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Card {
    rank: u8,
    suit: u8,
}

impl Card {
    pub fn new(rank: u8, suit: u8) -> Result<Self, CardError> {
        if !(MIN_RANK..=MAX_RANK).contains(&rank) {
            return Err(CardError::InvalidCard(format!("rank {} outside 1-13", rank)));
        }
        if !(MIN_SUIT..=MAX_SUIT).contains(&suit) {
            return Err(CardError::InvalidCard(format!("suit {} outside 1-4", suit)));
        }
        Ok(Self { rank, suit })
    }

    /// Build from loosely typed numbers, rejecting fractions, NaN and infinities
    pub fn try_from_numbers(rank: f64, suit: f64) -> Result<Self, CardError> {
        fn whole(value: f64, what: &str) -> Result<u8, CardError> {
            if !value.is_finite() || value.fract() != 0.0 || !(0.0..=255.0).contains(&value) {
                return Err(CardError::InvalidCard(format!("{} {} is not a card index", what, value)));
            }
            Ok(value as u8)
        }
        Self::new(whole(rank, "rank")?, whole(suit, "suit")?)
    }

    /// Caller guarantees the pair is in range
    pub(crate) fn from_valid(rank: u8, suit: u8) -> Self {
        debug_assert!((MIN_RANK..=MAX_RANK).contains(&rank) && (MIN_SUIT..=MAX_SUIT).contains(&suit));
        Self { rank, suit }
    }

    pub fn rank(&self) -> u8 {
        self.rank
    }

    pub fn suit(&self) -> u8 {
        self.suit
    }

    pub fn code(&self) -> String {
        let mut code = String::with_capacity(2);
        code.push(RANK_CODES[(self.rank - 1) as usize]);
        code.push(SUIT_CODES[(self.suit - 1) as usize]);
        code
    }

    /// All 52 cards, rank-major
    pub fn all() -> impl Iterator<Item = Card> {
        (MIN_RANK..=MAX_RANK)
            .flat_map(|rank| (MIN_SUIT..=MAX_SUIT).map(move |suit| Card { rank, suit }))
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Card {
    type Err = CardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let (Some(r), Some(su), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(CardError::InvalidCard(format!("'{}' is not a two-character code", s)));
        };
        let rank = RANK_CODES
            .iter()
            .position(|&c| c == r)
            .ok_or_else(|| CardError::InvalidCard(format!("unknown rank '{}'", r)))?;
        let suit = SUIT_CODES
            .iter()
            .position(|&c| c == su)
            .ok_or_else(|| CardError::InvalidCard(format!("unknown suit '{}'", su)))?;
        Card::new(rank as u8 + 1, suit as u8 + 1)
    }
}

impl Serialize for Card {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.code())
    }
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        code.parse().map_err(serde::de::Error::custom)
    }
}
