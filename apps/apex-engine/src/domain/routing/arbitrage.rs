//! Cross-venue arbitrage detection.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::scoring::VenueQuote;
use crate::domain::shared::Symbol;

/// A buy-here, sell-there opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbitrageOpportunity {
    /// Symbol.
    pub symbol: Symbol,
    /// Venue to buy on (at its ask).
    pub buy_venue: String,
    /// Venue to sell on (at its bid).
    pub sell_venue: String,
    /// Ask on the buy venue.
    pub buy_price: Decimal,
    /// Bid on the sell venue.
    pub sell_price: Decimal,
    /// `(sell_bid - buy_ask) / buy_ask * 100`.
    pub gross_profit_percent: Decimal,
    /// Gross minus both taker fees in percentage points.
    pub net_profit_percent: Decimal,
}

/// Opportunities whose net profit exceeds `min_profit_percent`, best first.
///
/// Both orientations of every venue pair are evaluated.
#[must_use]
pub fn find_arbitrage(
    symbol: &Symbol,
    quotes: &[VenueQuote],
    min_profit_percent: Decimal,
) -> Vec<ArbitrageOpportunity> {
    let mut opportunities = Vec::new();

    for (i, first) in quotes.iter().enumerate() {
        for second in &quotes[i + 1..] {
            for (buy, sell) in [(first, second), (second, first)] {
                opportunities.extend(
                    evaluate(symbol, buy, sell)
                        .filter(|opp| opp.net_profit_percent > min_profit_percent),
                );
            }
        }
    }

    opportunities.sort_by(|a, b| b.net_profit_percent.cmp(&a.net_profit_percent));
    opportunities
}

fn evaluate(symbol: &Symbol, buy: &VenueQuote, sell: &VenueQuote) -> Option<ArbitrageOpportunity> {
    if buy.ask <= Decimal::ZERO {
        return None;
    }
    let gross = (sell.bid - buy.ask) / buy.ask * Decimal::ONE_HUNDRED;
    let net = gross - (buy.taker_fee + sell.taker_fee) * Decimal::ONE_HUNDRED;

    Some(ArbitrageOpportunity {
        symbol: symbol.clone(),
        buy_venue: buy.venue.clone(),
        sell_venue: sell.venue.clone(),
        buy_price: buy.ask,
        sell_price: sell.bid,
        gross_profit_percent: gross,
        net_profit_percent: net,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quote(venue: &str, bid: Decimal, ask: Decimal, fee: Decimal) -> VenueQuote {
        VenueQuote {
            venue: venue.to_string(),
            bid,
            ask,
            last: bid,
            volume: dec!(1),
            maker_fee: fee,
            taker_fee: fee,
            average_latency: None,
            reliability: Decimal::ONE,
        }
    }

    #[test]
    fn finds_profitable_direction_only() {
        let quotes = vec![
            quote("cheap", dec!(99), dec!(100), dec!(0.001)),
            quote("rich", dec!(102), dec!(103), dec!(0.001)),
        ];
        let opps = find_arbitrage(&Symbol::new("BTC/USDT"), &quotes, dec!(0.5));
        assert_eq!(opps.len(), 1);
        assert_eq!(opps[0].buy_venue, "cheap");
        assert_eq!(opps[0].sell_venue, "rich");
        assert_eq!(opps[0].gross_profit_percent, dec!(2));
        assert_eq!(opps[0].net_profit_percent, dec!(1.8));
    }

    #[test]
    fn threshold_excludes_and_sorts_descending() {
        let quotes = vec![
            quote("a", dec!(99), dec!(100), Decimal::ZERO),
            quote("b", dec!(101), dec!(101.5), Decimal::ZERO),
            quote("c", dec!(104), dec!(105), Decimal::ZERO),
        ];
        let opps = find_arbitrage(&Symbol::new("ETH/USDT"), &quotes, dec!(1.5));
        assert!(opps.iter().all(|o| o.net_profit_percent > dec!(1.5)));
        assert!(
            opps.windows(2)
                .all(|w| w[0].net_profit_percent >= w[1].net_profit_percent)
        );
        assert_eq!(opps[0].buy_venue, "a");
        assert_eq!(opps[0].sell_venue, "c");
    }
}
