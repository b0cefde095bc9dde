//! Routing decision value object.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::priority::RoutingPriority;
use super::scoring::VenueQuote;
use crate::domain::order_execution::OrderSide;
use crate::domain::shared::Symbol;

/// One venue's score and the inputs behind it, kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueScore {
    /// Venue name.
    pub venue: String,
    /// Final score (reliability applied).
    pub score: Decimal,
    /// Execution price for the requested side.
    pub price: Decimal,
    /// Taker fee rate.
    pub taker_fee: Decimal,
    /// Quoted spread.
    pub spread: Decimal,
    /// 24h volume.
    pub volume: Decimal,
    /// Mean latency in milliseconds.
    pub latency_ms: Option<u64>,
    /// Reliability score at decision time.
    pub reliability: Decimal,
}

impl VenueScore {
    /// Capture the inputs of `quote` alongside its score.
    #[must_use]
    pub fn from_quote(quote: &VenueQuote, side: OrderSide, score: Decimal) -> Self {
        Self {
            venue: quote.venue.clone(),
            score,
            price: quote.execution_price(side),
            taker_fee: quote.taker_fee,
            spread: quote.spread(),
            volume: quote.volume,
            latency_ms: quote
                .average_latency
                .map(|l| u64::try_from(l.as_millis()).unwrap_or(u64::MAX)),
            reliability: quote.reliability,
        }
    }
}

/// Chosen venue plus every score considered.
///
/// Immutable once built; failover produces a new decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    symbol: Symbol,
    side: OrderSide,
    amount: Decimal,
    priority: RoutingPriority,
    selected: usize,
    scores: Vec<VenueScore>,
    estimated_fee: Decimal,
    estimated_cost: Decimal,
    failover_from: Option<String>,
    reason: String,
    timestamp: DateTime<Utc>,
}

impl RoutingDecision {
    /// Build a decision selecting the first entry of `scores`.
    ///
    /// `scores` must be sorted descending; returns `None` when empty.
    #[must_use]
    pub fn select_top(
        symbol: Symbol,
        side: OrderSide,
        amount: Decimal,
        priority: RoutingPriority,
        scores: Vec<VenueScore>,
        timestamp: DateTime<Utc>,
    ) -> Option<Self> {
        let top = scores.first()?;
        let (estimated_fee, estimated_cost) = estimate(top, amount);
        let reason = format!("best {priority} score {}", top.score.round_dp(6));

        Some(Self {
            symbol,
            side,
            amount,
            priority,
            selected: 0,
            scores,
            estimated_fee,
            estimated_cost,
            failover_from: None,
            reason,
            timestamp,
        })
    }

    /// A copy of this decision re-targeted at the venue ranked `index`.
    ///
    /// Returns `None` when `index` is out of range.
    #[must_use]
    pub fn failover_to(&self, index: usize, timestamp: DateTime<Utc>) -> Option<Self> {
        let target = self.scores.get(index)?;
        let from = self.venue().to_string();
        let (estimated_fee, estimated_cost) = estimate(target, self.amount);

        Some(Self {
            selected: index,
            estimated_fee,
            estimated_cost,
            reason: format!("{} (failover from {from})", self.reason),
            failover_from: Some(from),
            timestamp,
            ..self.clone()
        })
    }

    /// Selected venue name.
    #[must_use]
    pub fn venue(&self) -> &str {
        &self.selected_score().venue
    }

    /// Selected venue's score entry.
    #[must_use]
    pub fn selected_score(&self) -> &VenueScore {
        &self.scores[self.selected]
    }

    /// Rank of the selected venue in [`scores`](Self::scores).
    #[must_use]
    pub const fn selected_rank(&self) -> usize {
        self.selected
    }

    /// All venue scores, best first.
    #[must_use]
    pub fn scores(&self) -> &[VenueScore] {
        &self.scores
    }

    /// Routed symbol.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Routed side.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.side
    }

    /// Routed amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// Priority the ranking used.
    #[must_use]
    pub const fn priority(&self) -> RoutingPriority {
        self.priority
    }

    /// `amount * price * taker_fee` at the selected venue.
    #[must_use]
    pub const fn estimated_fee(&self) -> Decimal {
        self.estimated_fee
    }

    /// `amount * price * (1 + taker_fee)` at the selected venue.
    #[must_use]
    pub const fn estimated_cost(&self) -> Decimal {
        self.estimated_cost
    }

    /// Venue this decision failed over from, if any.
    #[must_use]
    pub fn failover_from(&self) -> Option<&str> {
        self.failover_from.as_deref()
    }

    /// Human-readable selection note.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Decision time.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

fn estimate(score: &VenueScore, amount: Decimal) -> (Decimal, Decimal) {
    let notional = amount * score.price;
    let fee = notional * score.taker_fee;
    (fee, notional + fee)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn score(venue: &str, value: Decimal, price: Decimal) -> VenueScore {
        VenueScore {
            venue: venue.to_string(),
            score: value,
            price,
            taker_fee: dec!(0.001),
            spread: dec!(1),
            volume: dec!(1000),
            latency_ms: Some(5),
            reliability: Decimal::ONE,
        }
    }

    fn decision() -> RoutingDecision {
        RoutingDecision::select_top(
            Symbol::new("BTC/USDT"),
            OrderSide::Buy,
            dec!(2),
            RoutingPriority::Price,
            vec![score("a", dec!(0.9), dec!(100)), score("b", dec!(0.8), dec!(101))],
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn estimates_cost_with_taker_fee() {
        let d = decision();
        assert_eq!(d.venue(), "a");
        assert_eq!(d.estimated_fee(), dec!(0.2));
        assert_eq!(d.estimated_cost(), dec!(200.2));
    }

    #[test]
    fn failover_annotates_and_reestimates() {
        let d = decision().failover_to(1, Utc::now()).unwrap();
        assert_eq!(d.venue(), "b");
        assert_eq!(d.failover_from(), Some("a"));
        assert!(d.reason().ends_with("(failover from a)"));
        assert_eq!(d.estimated_cost(), dec!(202.202));
        assert!(decision().failover_to(5, Utc::now()).is_none());
    }

    #[test]
    fn empty_scores_yield_no_decision() {
        assert!(
            RoutingDecision::select_top(
                Symbol::new("X"),
                OrderSide::Sell,
                dec!(1),
                RoutingPriority::Fees,
                Vec::new(),
                Utc::now()
            )
            .is_none()
        );
    }
}
