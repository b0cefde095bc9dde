//! Paper Venue
//!
//! In-memory venue for tests and dry runs. Quotes, bars, balances and fees
//! are set by the caller. Market orders fill in full at the ask (BUY) or
//! bid (SELL); marketable limits fill at the touch; everything else rests
//! as OPEN until cancelled.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::debug;

use crate::application::ports::{Balance, Fees, Ticker, VenueError, VenuePort};
use crate::domain::order_execution::{Order, OrderSide, OrderType};
use crate::domain::shared::{Candle, Symbol, VenueOrderId};

#[derive(Debug)]
struct PaperState {
    tickers: HashMap<Symbol, Ticker>,
    bars: HashMap<Symbol, Vec<Candle>>,
    balances: Vec<Balance>,
    fees: Fees,
    connected: bool,
    fail_data: bool,
    reject_orders: bool,
    latency: Option<Duration>,
    placed: Vec<Order>,
    resting: HashMap<VenueOrderId, Order>,
}

/// In-memory venue with settable market state and failure toggles.
#[derive(Debug)]
pub struct PaperVenue {
    name: String,
    state: RwLock<PaperState>,
}

impl PaperVenue {
    /// Create a connected venue with 0.1% maker/taker fees and no quotes.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(PaperState {
                tickers: HashMap::new(),
                bars: HashMap::new(),
                balances: Vec::new(),
                fees: Fees {
                    maker: Decimal::new(1, 3),
                    taker: Decimal::new(1, 3),
                },
                connected: true,
                fail_data: false,
                reject_orders: false,
                latency: None,
                placed: Vec::new(),
                resting: HashMap::new(),
            }),
        }
    }

    /// Set the fee schedule.
    #[must_use]
    pub fn with_fees(self, maker: Decimal, taker: Decimal) -> Self {
        self.state.write().fees = Fees { maker, taker };
        self
    }

    /// Delay every market data call by `latency`.
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state.write().latency = Some(latency);
        self
    }

    /// Quote a symbol. `last` is the mid.
    pub fn set_quote(
        &self,
        symbol: impl Into<Symbol>,
        bid: Decimal,
        ask: Decimal,
        volume: Decimal,
    ) {
        let symbol = symbol.into();
        let ticker = Ticker {
            symbol: symbol.clone(),
            bid,
            ask,
            last: (bid + ask) / Decimal::TWO,
            volume,
            timestamp: Utc::now(),
        };
        self.state.write().tickers.insert(symbol, ticker);
    }

    /// Replace a symbol's ticker wholesale.
    pub fn set_ticker(&self, ticker: Ticker) {
        self.state.write().tickers.insert(ticker.symbol.clone(), ticker);
    }

    /// Set the bars returned for a symbol.
    pub fn set_bars(&self, symbol: impl Into<Symbol>, bars: Vec<Candle>) {
        self.state.write().bars.insert(symbol.into(), bars);
    }

    /// Set or replace the balance of one asset.
    pub fn set_balance(&self, asset: &str, free: Decimal, used: Decimal) {
        let mut state = self.state.write();
        state.balances.retain(|b| b.asset != asset);
        state.balances.push(Balance {
            asset: asset.to_string(),
            free,
            used,
            total: free + used,
        });
    }

    /// Toggle the session.
    pub fn set_connected(&self, connected: bool) {
        self.state.write().connected = connected;
    }

    /// Make every market data call fail with a network error.
    pub fn set_fail_data(&self, fail: bool) {
        self.state.write().fail_data = fail;
    }

    /// Make every placement fail with a rejection.
    pub fn set_reject_orders(&self, reject: bool) {
        self.state.write().reject_orders = reject;
    }

    /// Every order accepted so far, in placement order.
    #[must_use]
    pub fn placed_orders(&self) -> Vec<Order> {
        self.state.read().placed.clone()
    }

    /// Orders resting on the paper book.
    #[must_use]
    pub fn resting_orders(&self) -> Vec<Order> {
        self.state.read().resting.values().cloned().collect()
    }

    async fn market_data_gate(&self) -> Result<(), VenueError> {
        let (latency, fail, connected) = {
            let state = self.state.read();
            (state.latency, state.fail_data, state.connected)
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if !connected {
            return Err(self.unavailable());
        }
        if fail {
            return Err(VenueError::Network {
                message: format!("{} market data unavailable", self.name),
            });
        }
        Ok(())
    }

    fn unavailable(&self) -> VenueError {
        VenueError::Unavailable {
            venue: self.name.clone(),
        }
    }
}

/// Fill price for an order against `ticker`, or `None` when it rests.
fn fill_price(order: &Order, ticker: &Ticker) -> Option<Decimal> {
    let touch = match order.side() {
        OrderSide::Buy => ticker.ask,
        OrderSide::Sell => ticker.bid,
    };
    match order.order_type() {
        OrderType::Market => Some(touch),
        OrderType::Limit => {
            let limit = order.price()?;
            let marketable = match order.side() {
                OrderSide::Buy => touch <= limit,
                OrderSide::Sell => touch >= limit,
            };
            marketable.then_some(touch)
        }
        OrderType::StopLoss | OrderType::TakeProfit | OrderType::StopLimit => None,
    }
}

fn venue_rejected(error: impl std::fmt::Display) -> VenueError {
    VenueError::Rejected {
        reason: error.to_string(),
    }
}

#[async_trait]
impl VenuePort for PaperVenue {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_connected(&self) -> bool {
        self.state.read().connected
    }

    async fn ticker(&self, symbol: &Symbol) -> Result<Ticker, VenueError> {
        self.market_data_gate().await?;
        self.state
            .read()
            .tickers
            .get(symbol)
            .cloned()
            .ok_or_else(|| VenueError::UnknownSymbol {
                symbol: symbol.to_string(),
            })
    }

    async fn ohlcv(
        &self,
        symbol: &Symbol,
        _timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, VenueError> {
        self.market_data_gate().await?;
        let state = self.state.read();
        let bars = state.bars.get(symbol).ok_or_else(|| VenueError::UnknownSymbol {
            symbol: symbol.to_string(),
        })?;
        let skip = bars.len().saturating_sub(limit);
        Ok(bars[skip..].to_vec())
    }

    async fn place_order(&self, mut order: Order) -> Result<Order, VenueError> {
        let mut state = self.state.write();
        if !state.connected {
            return Err(self.unavailable());
        }
        if state.reject_orders {
            return Err(VenueError::Rejected {
                reason: format!("{} is rejecting orders", self.name),
            });
        }
        let ticker = state
            .tickers
            .get(order.symbol())
            .cloned()
            .ok_or_else(|| VenueError::UnknownSymbol {
                symbol: order.symbol().to_string(),
            })?;

        let venue_order_id = VenueOrderId::generate();
        order.assign_venue(self.name.clone());
        order.accept(Some(venue_order_id.clone())).map_err(venue_rejected)?;
        match fill_price(&order, &ticker) {
            Some(price) => {
                order.apply_fill(order.remaining(), price).map_err(venue_rejected)?;
                debug!(
                    venue = %self.name,
                    order_id = %order.id(),
                    price = %price,
                    "Paper fill"
                );
            }
            None => {
                state.resting.insert(venue_order_id, order.clone());
            }
        }
        state.placed.push(order.clone());
        Ok(order)
    }

    async fn cancel_order(
        &self,
        venue_order_id: &VenueOrderId,
        _symbol: &Symbol,
    ) -> Result<bool, VenueError> {
        let mut state = self.state.write();
        if !state.connected {
            return Err(self.unavailable());
        }
        Ok(state.resting.remove(venue_order_id).is_some())
    }

    async fn balance(&self, asset: Option<&str>) -> Result<Vec<Balance>, VenueError> {
        self.market_data_gate().await?;
        let state = self.state.read();
        Ok(state
            .balances
            .iter()
            .filter(|b| asset.is_none_or(|a| b.asset == a))
            .cloned()
            .collect())
    }

    async fn fees(&self) -> Result<Fees, VenueError> {
        self.market_data_gate().await?;
        Ok(self.state.read().fees)
    }

    async fn symbols(&self) -> Result<Vec<Symbol>, VenueError> {
        self.market_data_gate().await?;
        let mut symbols: Vec<Symbol> = self.state.read().tickers.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::{OrderRequest, OrderStatus};
    use rust_decimal_macros::dec;

    fn venue() -> PaperVenue {
        let venue = PaperVenue::new("paper");
        venue.set_quote("BTC/USDT", dec!(99), dec!(101), dec!(5000));
        venue
    }

    fn order(request: OrderRequest) -> Order {
        Order::new(request).unwrap()
    }

    #[tokio::test]
    async fn market_buy_fills_at_ask() {
        let venue = venue();
        let placed = venue
            .place_order(order(OrderRequest::market("BTC/USDT", OrderSide::Buy, dec!(2))))
            .await
            .unwrap();

        assert_eq!(placed.status(), OrderStatus::Filled);
        assert_eq!(placed.average_price(), Some(dec!(101)));
        assert_eq!(placed.venue(), Some("paper"));
        assert_eq!(venue.placed_orders().len(), 1);
    }

    #[tokio::test]
    async fn passive_limit_rests_and_cancels() {
        let venue = venue();
        let placed = venue
            .place_order(order(OrderRequest::limit(
                "BTC/USDT",
                OrderSide::Sell,
                dec!(1),
                dec!(120),
            )))
            .await
            .unwrap();

        assert_eq!(placed.status(), OrderStatus::Open);
        let id = placed.venue_order_id().unwrap().clone();
        assert!(venue.cancel_order(&id, placed.symbol()).await.unwrap());
        assert!(!venue.cancel_order(&id, placed.symbol()).await.unwrap());
    }

    #[tokio::test]
    async fn failure_toggles() {
        let venue = venue();
        let symbol = Symbol::new("BTC/USDT");

        venue.set_fail_data(true);
        assert!(matches!(venue.ticker(&symbol).await, Err(VenueError::Network { .. })));

        venue.set_fail_data(false);
        venue.set_reject_orders(true);
        let result = venue
            .place_order(order(OrderRequest::market("BTC/USDT", OrderSide::Buy, dec!(1))))
            .await;
        assert!(matches!(result, Err(VenueError::Rejected { .. })));

        venue.set_connected(false);
        assert!(!venue.is_connected());
        assert!(matches!(venue.fees().await, Err(VenueError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn unknown_symbol() {
        let venue = venue();
        let result = venue.ticker(&Symbol::new("DOGE/USDT")).await;
        assert!(matches!(result, Err(VenueError::UnknownSymbol { .. })));
    }

    #[tokio::test]
    async fn ohlcv_returns_latest_bars() {
        let venue = venue();
        let start = Utc::now();
        let bars: Vec<Candle> = (0..5)
            .map(|i| {
                let time = start + chrono::TimeDelta::minutes(i);
                Candle::flat(time, dec!(100) + Decimal::from(i), dec!(1))
            })
            .collect();
        venue.set_bars("BTC/USDT", bars);

        let latest = venue.ohlcv(&Symbol::new("BTC/USDT"), "1m", 2).await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[1].close, dec!(104));
    }

    #[tokio::test]
    async fn balance_filter() {
        let venue = venue();
        venue.set_balance("USDT", dec!(1000), dec!(0));
        venue.set_balance("BTC", dec!(1), dec!(0.5));

        let usdt = venue.balance(Some("USDT")).await.unwrap();
        assert_eq!(usdt.len(), 1);
        assert_eq!(venue.balance(None).await.unwrap().len(), 2);
        assert_eq!(venue.balance(Some("BTC")).await.unwrap()[0].total, dec!(1.5));
    }
}
