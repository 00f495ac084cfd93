//! Settlement metrics exported in Prometheus text format

use prometheus::{Counter, Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use std::time::Duration;
use tracing::warn;

#[derive(Clone)]
pub struct SettlementMetrics {
    registry: Registry,
    settlements_total: IntCounterVec,
    wagered_total: Counter,
    paid_out_total: Counter,
    settlement_duration: Histogram,
}

impl SettlementMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let settlements_total = IntCounterVec::new(
            Opts::new("tuplaus_settlements_total", "Settlement attempts by result"),
            &["result"],
        )?;
        let wagered_total = Counter::new("tuplaus_wagered_total", "Sum of settled bets")?;
        let paid_out_total = Counter::new("tuplaus_paid_out_total", "Sum of winnings paid")?;
        let settlement_duration = Histogram::with_opts(
            HistogramOpts::new(
                "tuplaus_settlement_duration_seconds",
                "Time from request receipt to settled or rejected",
            )
            .buckets(vec![0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.5, 1.0]),
        )?;

        registry.register(Box::new(settlements_total.clone()))?;
        registry.register(Box::new(wagered_total.clone()))?;
        registry.register(Box::new(paid_out_total.clone()))?;
        registry.register(Box::new(settlement_duration.clone()))?;

        Ok(Self {
            registry,
            settlements_total,
            wagered_total,
            paid_out_total,
            settlement_duration,
        })
    }

    pub fn record_settled(&self, bet: Decimal, winnings: Decimal, elapsed: Duration) {
        self.settlements_total.with_label_values(&["settled"]).inc();
        add_amount(&self.wagered_total, bet);
        add_amount(&self.paid_out_total, winnings);
        self.settlement_duration.observe(elapsed.as_secs_f64());
    }

    /// `result` is the rejection kind label, e.g. `insufficient_funds`
    pub fn record_rejected(&self, result: &str, elapsed: Duration) {
        self.settlements_total.with_label_values(&[result]).inc();
        self.settlement_duration.observe(elapsed.as_secs_f64());
    }

    pub fn settlements(&self, result: &str) -> u64 {
        self.settlements_total.with_label_values(&[result]).get()
    }

    /// Text exposition of every registered metric
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Adds a non-negative amount, skipping values with no `f64` form
fn add_amount(counter: &Counter, amount: Decimal) {
    match amount.to_f64() {
        Some(value) if value.is_finite() && value >= 0.0 => counter.inc_by(value),
        _ => warn!(%amount, "Skipping metric increment for unrepresentable amount"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_counts_and_exposition() {
        let metrics = SettlementMetrics::new().unwrap();
        metrics.record_settled(dec!(1), dec!(2), Duration::from_millis(1));
        metrics.record_settled(dec!(3), dec!(0), Duration::from_millis(2));
        metrics.record_rejected("insufficient_funds", Duration::from_millis(1));

        assert_eq!(metrics.settlements("settled"), 2);
        assert_eq!(metrics.settlements("insufficient_funds"), 1);

        let text = metrics.encode().unwrap();
        assert!(text.contains("tuplaus_settlements_total{result=\"settled\"} 2"));
        assert!(text.contains("tuplaus_wagered_total 4"));
        assert!(text.contains("tuplaus_settlement_duration_seconds_count 3"));
    }

    #[test]
    fn test_negative_amount_is_skipped() {
        let metrics = SettlementMetrics::new().unwrap();
        metrics.record_settled(dec!(-1), dec!(2), Duration::from_millis(1));

        assert_eq!(metrics.wagered_total.get(), 0.0);
        assert_eq!(metrics.paid_out_total.get(), 2.0);
        assert_eq!(metrics.settlements("settled"), 1);
    }
}
