//! Low/high evaluation of a drawn rank against the player's choice.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Rank that belongs to neither side; the house keeps the bet
pub const VOID_RANK: u8 = 7;

/// Side the player bets on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    Low,
    High,
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Choice::Low => write!(f, "low"),
            Choice::High => write!(f, "high"),
        }
    }
}

impl FromStr for Choice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Choice::Low),
            "high" => Ok(Choice::High),
            other => Err(format!("choice must be \"low\" or \"high\", got \"{}\"", other)),
        }
    }
}

/// Side a drawn rank falls on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Low,
    High,
    Void,
}

impl Side {
    pub fn of_rank(rank: u8) -> Self {
        match rank {
            r if r < VOID_RANK => Side::Low,
            VOID_RANK => Side::Void,
            _ => Side::High,
        }
    }

    pub fn matches(self, choice: Choice) -> bool {
        matches!(
            (self, choice),
            (Side::Low, Choice::Low) | (Side::High, Choice::High)
        )
    }
}

/// Result of judging one draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub side: Side,
    pub won: bool,
}

impl Evaluation {
    /// Double the bet on a win, nothing otherwise; `None` if doubling overflows
    pub fn payout(&self, bet: Decimal) -> Option<Decimal> {
        if self.won {
            bet.checked_mul(Decimal::TWO)
        } else {
            Some(Decimal::ZERO)
        }
    }
}

pub fn evaluate(rank: u8, choice: Choice) -> Evaluation {
    let side = Side::of_rank(rank);
    Evaluation {
        side,
        won: side.matches(choice),
    }
}
