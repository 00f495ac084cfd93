//! Settlement Engine
//!
//! Runs one play through `Received → Validated → Drawn → Judged → Settled`,
//! or stops in `Rejected` with a tagged cause. The ledger and the card source
//! are injected, so the engine holds no global state.

use crate::{
    config::GameConfig,
    games::{
        card_source::CardSource,
        outcome::{evaluate, Choice},
        types::{PendingEvent, PlayerId, RawPlayRequest, SettlementOutcome, ValidatedPlay},
    },
    ledger::{LedgerError, LedgerRepository},
    metrics::SettlementMetrics,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value;
use std::{fmt, future::Future, str::FromStr, sync::Arc, time::Duration, time::Instant};
use tracing::{debug, info, warn};

/// Why a play was rejected. Callers branch on the variant, never on text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettlementError {
    /// Malformed bet or choice
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Player reference does not resolve; treated as "not allowed to act as this player"
    #[error("Unknown player")]
    UnknownPlayer,

    #[error("Insufficient funds")]
    InsufficientFunds,

    /// Ledger unreachable, timed out or aborted; nothing was applied
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    InvalidInput,
    UnknownPlayer,
    InsufficientFunds,
    PersistenceFailure,
}

impl RejectionKind {
    pub fn as_label(&self) -> &'static str {
        match self {
            RejectionKind::InvalidInput => "invalid_input",
            RejectionKind::UnknownPlayer => "unknown_player",
            RejectionKind::InsufficientFunds => "insufficient_funds",
            RejectionKind::PersistenceFailure => "persistence_failure",
        }
    }
}

impl SettlementError {
    pub fn kind(&self) -> RejectionKind {
        match self {
            SettlementError::InvalidInput(_) => RejectionKind::InvalidInput,
            SettlementError::UnknownPlayer => RejectionKind::UnknownPlayer,
            SettlementError::InsufficientFunds => RejectionKind::InsufficientFunds,
            SettlementError::PersistenceFailure(_) => RejectionKind::PersistenceFailure,
        }
    }

    /// Everything except persistence failures is the caller's fault
    pub fn is_client_fault(&self) -> bool {
        !matches!(self, SettlementError::PersistenceFailure(_))
    }
}

impl From<LedgerError> for SettlementError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::NotFound(_) => SettlementError::UnknownPlayer,
            LedgerError::InsufficientFunds { .. } => SettlementError::InsufficientFunds,
            LedgerError::InvalidPlayer(msg) => SettlementError::InvalidInput(msg),
            e @ LedgerError::BalanceOverflow { .. } => SettlementError::InvalidInput(e.to_string()),
            LedgerError::Storage(msg) | LedgerError::Corrupted(msg) => {
                SettlementError::PersistenceFailure(msg)
            }
        }
    }
}

/// Lifecycle of one settlement, used for tracing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementState {
    Received,
    Validated,
    Drawn,
    Judged,
    Settled,
    Rejected,
}

impl fmt::Display for SettlementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SettlementState::Received => "received",
            SettlementState::Validated => "validated",
            SettlementState::Drawn => "drawn",
            SettlementState::Judged => "judged",
            SettlementState::Settled => "settled",
            SettlementState::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

fn parse_player_id(value: &Value) -> Option<PlayerId> {
    if let Some(id) = value.as_u64() {
        return Some(PlayerId(id));
    }
    // Whole floats such as `3.0` are still integer references.
    let id = value.as_f64()?;
    (id.is_finite() && id >= 0.0 && id.fract() == 0.0 && id <= u64::MAX as f64)
        .then(|| PlayerId(id as u64))
}

fn parse_amount(number: &serde_json::Number) -> Option<Decimal> {
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Input checks in a fixed order: a mistyped player id wins over a bad
/// bet or choice, and existence is checked afterwards against the ledger.
pub fn validate(request: &RawPlayRequest, max_bet: Option<Decimal>) -> Result<ValidatedPlay, SettlementError> {
    let player_id = parse_player_id(&request.player_id).ok_or(SettlementError::UnknownPlayer)?;

    let Value::Number(bet) = &request.bet else {
        return Err(SettlementError::InvalidInput("bet must be a number".to_string()));
    };
    let Value::String(choice) = &request.choice else {
        return Err(SettlementError::InvalidInput("choice must be a string".to_string()));
    };

    let bet = parse_amount(bet)
        .ok_or_else(|| SettlementError::InvalidInput(format!("bet {} is out of range", bet)))?;
    if bet <= Decimal::ZERO {
        return Err(SettlementError::InvalidInput(format!("bet {} must be positive", bet)));
    }

    // A winning payout must stay representable.
    if bet.checked_mul(Decimal::TWO).is_none() {
        return Err(SettlementError::InvalidInput(format!("bet {} is out of range", bet)));
    }

    let choice = Choice::from_str(choice).map_err(SettlementError::InvalidInput)?;

    if let Some(max_bet) = max_bet {
        if bet > max_bet {
            return Err(SettlementError::InvalidInput(format!(
                "bet {} exceeds maximum {}",
                bet, max_bet
            )));
        }
    }

    Ok(ValidatedPlay {
        player_id,
        bet,
        choice,
    })
}

pub struct SettlementEngine {
    ledger: Arc<dyn LedgerRepository>,
    cards: Arc<dyn CardSource>,
    config: GameConfig,
    metrics: Option<SettlementMetrics>,
}

impl SettlementEngine {
    pub fn new(ledger: Arc<dyn LedgerRepository>, cards: Arc<dyn CardSource>, config: GameConfig) -> Self {
        Self {
            ledger,
            cards,
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: SettlementMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn metrics(&self) -> Option<&SettlementMetrics> {
        self.metrics.as_ref()
    }

    /// Settle one play end to end
    pub async fn settle(&self, request: &RawPlayRequest) -> Result<SettlementOutcome, SettlementError> {
        let started = Instant::now();
        let result = self.run(request).await;

        match &result {
            Ok(outcome) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_settled(outcome.bet, outcome.winnings, started.elapsed());
                }
            }
            Err(e) => {
                debug!(state = %SettlementState::Rejected, cause = e.kind().as_label(), "{}", e);
                if !e.is_client_fault() {
                    warn!("Settlement failed: {}", e);
                }
                if let Some(metrics) = &self.metrics {
                    metrics.record_rejected(e.kind().as_label(), started.elapsed());
                }
            }
        }

        result
    }

    async fn run(&self, request: &RawPlayRequest) -> Result<SettlementOutcome, SettlementError> {
        let timestamp = Utc::now();
        debug!(state = %SettlementState::Received, "Settlement request");

        let play = validate(request, self.config.max_bet)?;
        self.with_deadline(self.ledger.get_balance(play.player_id)).await?;
        debug!(state = %SettlementState::Validated, player_id = %play.player_id, bet = %play.bet, choice = %play.choice);

        let card = self.cards.draw();
        debug!(state = %SettlementState::Drawn, card = %card);

        let evaluation = evaluate(card.rank(), play.choice);
        let winnings = evaluation
            .payout(play.bet)
            .ok_or_else(|| SettlementError::InvalidInput(format!("bet {} is out of range", play.bet)))?;
        debug!(state = %SettlementState::Judged, side = ?evaluation.side, won = evaluation.won);

        let pending = PendingEvent {
            timestamp,
            bet_amount: play.bet,
            player_choice: play.choice,
            card,
            winnings,
        };
        let receipt = self
            .with_deadline(self.ledger.settle_debit(play.player_id, play.bet, winnings, pending))
            .await?;

        // Reported from the balance observed inside the atomic debit, never re-read.
        let balance_after = receipt.balance_before - play.bet + winnings;
        debug_assert_eq!(balance_after, receipt.balance_after);

        info!(
            state = %SettlementState::Settled,
            player_id = %play.player_id,
            event_id = receipt.event.id,
            card = %card,
            won = evaluation.won,
            %winnings,
            %balance_after,
            "Play settled"
        );

        Ok(SettlementOutcome {
            won: evaluation.won,
            card,
            bet: play.bet,
            winnings,
            balance_after,
            event_id: receipt.event.id,
        })
    }

    fn persistence_timeout(&self) -> Duration {
        Duration::from_millis(self.config.persistence_timeout_ms)
    }

    async fn with_deadline<T>(
        &self,
        call: impl Future<Output = Result<T, LedgerError>>,
    ) -> Result<T, LedgerError> {
        let timeout = self.persistence_timeout();
        tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| LedgerError::Storage(format!("ledger call exceeded {:?}", timeout)))?
    }
}
