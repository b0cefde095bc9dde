//! Venue scoring.

use rust_decimal::Decimal;
use std::time::Duration;

use super::priority::RoutingPriority;
use crate::domain::order_execution::OrderSide;

/// Score used for SPEED when a venue has no latency history yet.
const NO_LATENCY_SCORE: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// One venue's market data, fees and health as seen in a single snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueQuote {
    /// Venue name.
    pub venue: String,
    /// Best bid.
    pub bid: Decimal,
    /// Best ask.
    pub ask: Decimal,
    /// Last traded price.
    pub last: Decimal,
    /// 24h traded volume.
    pub volume: Decimal,
    /// Maker fee rate.
    pub maker_fee: Decimal,
    /// Taker fee rate.
    pub taker_fee: Decimal,
    /// Mean observed latency.
    pub average_latency: Option<Duration>,
    /// Reliability score in (0, 1].
    pub reliability: Decimal,
}

impl VenueQuote {
    /// Price paid (buy) or received (sell) when taking liquidity.
    #[must_use]
    pub const fn execution_price(&self, side: OrderSide) -> Decimal {
        match side {
            OrderSide::Buy => self.ask,
            OrderSide::Sell => self.bid,
        }
    }

    /// Quoted spread.
    #[must_use]
    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }
}

/// Tunables for scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringParams {
    /// Volume that maps to a full liquidity score.
    pub liquidity_reference: Decimal,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            liquidity_reference: Decimal::from(1_000_000),
        }
    }
}

/// Score a venue for `priority`; higher is better.
///
/// Every score is multiplied by the venue's reliability so an unreliable
/// venue is penalised whatever the priority.
#[must_use]
pub fn score_venue(
    quote: &VenueQuote,
    side: OrderSide,
    priority: RoutingPriority,
    params: &ScoringParams,
) -> Decimal {
    let base = match priority {
        RoutingPriority::Price => match side {
            OrderSide::Buy if quote.ask > Decimal::ZERO => Decimal::ONE / quote.ask,
            OrderSide::Buy => Decimal::ZERO,
            OrderSide::Sell => quote.bid.max(Decimal::ZERO),
        },
        RoutingPriority::Fees => {
            Decimal::ONE / (Decimal::ONE + quote.taker_fee.max(Decimal::ZERO) * Decimal::ONE_THOUSAND)
        }
        RoutingPriority::Speed => quote.average_latency.map_or(NO_LATENCY_SCORE, |latency| {
            Decimal::ONE / (Decimal::ONE + duration_secs(latency) * Decimal::TEN)
        }),
        RoutingPriority::Liquidity => {
            if params.liquidity_reference <= Decimal::ZERO {
                Decimal::ZERO
            } else {
                (quote.volume / params.liquidity_reference).clamp(Decimal::ZERO, Decimal::ONE)
            }
        }
        RoutingPriority::Reliability => quote.reliability,
    };

    base * quote.reliability
}

/// Score every quote and sort descending. Ties keep input order.
#[must_use]
pub fn rank_venues<'a>(
    quotes: &'a [VenueQuote],
    side: OrderSide,
    priority: RoutingPriority,
    params: &ScoringParams,
) -> Vec<(&'a VenueQuote, Decimal)> {
    let mut ranked: Vec<_> = quotes
        .iter()
        .map(|q| (q, score_venue(q, side, priority, params)))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

fn duration_secs(duration: Duration) -> Decimal {
    let micros = i64::try_from(duration.as_micros()).unwrap_or(i64::MAX);
    Decimal::new(micros, 6)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn quote(venue: &str, bid: Decimal, ask: Decimal) -> VenueQuote {
        VenueQuote {
            venue: venue.to_string(),
            bid,
            ask,
            last: bid,
            volume: dec!(500000),
            maker_fee: dec!(0.001),
            taker_fee: dec!(0.001),
            average_latency: Some(Duration::from_millis(100)),
            reliability: Decimal::ONE,
        }
    }

    #[test]
    fn price_priority_prefers_lowest_ask_for_buys() {
        let quotes = vec![quote("a", dec!(99), dec!(101)), quote("b", dec!(98), dec!(100))];
        let ranked = rank_venues(&quotes, OrderSide::Buy, RoutingPriority::Price, &ScoringParams::default());
        assert_eq!(ranked[0].0.venue, "b");
    }

    #[test]
    fn price_priority_prefers_highest_bid_for_sells() {
        let quotes = vec![quote("a", dec!(99), dec!(101)), quote("b", dec!(98), dec!(100))];
        let ranked = rank_venues(&quotes, OrderSide::Sell, RoutingPriority::Price, &ScoringParams::default());
        assert_eq!(ranked[0].0.venue, "a");
        assert_eq!(ranked[0].1, dec!(99));
    }

    #[test]
    fn fees_score_formula() {
        let q = quote("a", dec!(1), dec!(1));
        // 1 / (1 + 0.001 * 1000) = 0.5
        assert_eq!(
            score_venue(&q, OrderSide::Buy, RoutingPriority::Fees, &ScoringParams::default()),
            dec!(0.5)
        );
    }

    #[test]
    fn speed_score_formula() {
        let mut q = quote("a", dec!(1), dec!(1));
        // 1 / (1 + 0.1 * 10) = 0.5
        assert_eq!(
            score_venue(&q, OrderSide::Buy, RoutingPriority::Speed, &ScoringParams::default()),
            dec!(0.5)
        );
        // no history scores like a 100ms venue
        q.average_latency = None;
        assert_eq!(
            score_venue(&q, OrderSide::Buy, RoutingPriority::Speed, &ScoringParams::default()),
            dec!(0.5)
        );
    }

    #[test]
    fn liquidity_clamped_to_one() {
        let mut q = quote("a", dec!(1), dec!(1));
        let params = ScoringParams::default();
        assert_eq!(score_venue(&q, OrderSide::Buy, RoutingPriority::Liquidity, &params), dec!(0.5));
        q.volume = dec!(5000000);
        assert_eq!(score_venue(&q, OrderSide::Buy, RoutingPriority::Liquidity, &params), Decimal::ONE);
    }

    #[test]
    fn reliability_multiplies_every_priority() {
        let mut q = quote("a", dec!(1), dec!(1));
        q.reliability = dec!(0.5);
        let params = ScoringParams::default();
        assert_eq!(score_venue(&q, OrderSide::Buy, RoutingPriority::Reliability, &params), dec!(0.25));
        assert_eq!(score_venue(&q, OrderSide::Buy, RoutingPriority::Liquidity, &params), dec!(0.25));
        assert_eq!(score_venue(&q, OrderSide::Sell, RoutingPriority::Price, &params), dec!(0.5));
    }

    proptest! {
        #[test]
        fn top_ranked_venue_scores_at_least_every_other(
            venues in prop::collection::vec((1_000i64..100_000, 1i64..500, 0i64..2_000_000, 1u32..=100), 1..8),
            sell in any::<bool>(),
        ) {
            let quotes: Vec<VenueQuote> = venues
                .iter()
                .enumerate()
                .map(|(i, &(bid, spread, volume, reliability))| {
                    let mut q = quote(&format!("v{i}"), Decimal::new(bid, 2), Decimal::new(bid + spread, 2));
                    q.volume = Decimal::from(volume);
                    q.reliability = Decimal::new(i64::from(reliability), 2);
                    q
                })
                .collect();
            let side = if sell { OrderSide::Sell } else { OrderSide::Buy };
            let params = ScoringParams::default();

            for priority in [
                RoutingPriority::Price,
                RoutingPriority::Fees,
                RoutingPriority::Speed,
                RoutingPriority::Liquidity,
                RoutingPriority::Reliability,
            ] {
                let ranked = rank_venues(&quotes, side, priority, &params);
                let best = ranked[0].1;
                for q in &quotes {
                    prop_assert!(best >= score_venue(q, side, priority, &params));
                }
            }
        }
    }
}
