//! Bar-replay backtest engine.
//!
//! One position at a time. Each bar records equity at the close, then
//! checks the open position's stop and target against the bar range, and
//! only when nothing fired asks the strategy for signals. Capital changes
//! only when a position closes.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::config::BacktestConfig;
use super::error::BacktestError;
use super::metrics::{PerformanceCalculator, PerformanceSummary};
use super::strategy::{Signal, SignalKind, SignalSource};
use super::trade::{EquityPoint, Trade};
use crate::domain::position_tracking::{ExitReason, OpenPositionParams, Position, PositionSide};
use crate::domain::risk_management::{RiskConfig, RiskManager};
use crate::domain::shared::{Candle, Symbol};

/// Decimal places kept on position quantities (rounded toward zero).
const QUANTITY_DP: u32 = 8;

const SECONDS_PER_HOUR: Decimal = Decimal::from_parts(3600, 0, 0, false, 0);

/// Outcome of one backtest run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Strategy that produced the signals.
    pub strategy_name: String,
    /// Symbol replayed.
    pub symbol: Symbol,
    /// Bar timeframe label.
    pub timeframe: String,
    /// First bar time.
    pub start: DateTime<Utc>,
    /// Last bar time.
    pub end: DateTime<Utc>,
    /// Starting capital.
    pub initial_capital: Decimal,
    /// Capital after the forced close on the last bar.
    pub final_capital: Decimal,
    /// Closed trades in order.
    pub trades: Vec<Trade>,
    /// One point per bar.
    pub equity_curve: Vec<EquityPoint>,
    /// Entry signals refused by the risk gate.
    pub signals_rejected: u64,
    /// Derived metrics.
    pub summary: PerformanceSummary,
}

/// Replays an OHLCV series through a [`SignalSource`].
#[derive(Debug, Clone)]
pub struct BacktestEngine {
    config: BacktestConfig,
    risk_config: RiskConfig,
}

impl BacktestEngine {
    /// Create an engine; risk limits come from the configured preset sized
    /// to the initial capital.
    #[must_use]
    pub fn new(config: BacktestConfig) -> Self {
        let risk_config = RiskConfig::preset(config.risk_level, config.initial_capital);
        Self {
            config,
            risk_config,
        }
    }

    /// Replace the risk limits.
    #[must_use]
    pub fn with_risk(mut self, risk_config: RiskConfig) -> Self {
        self.risk_config = risk_config;
        self
    }

    /// Configuration in force.
    #[must_use]
    pub const fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Risk limits in force.
    #[must_use]
    pub const fn risk_config(&self) -> &RiskConfig {
        &self.risk_config
    }

    /// Run `strategy` over `bars`, oldest first.
    pub fn run<S>(
        &self,
        strategy: &mut S,
        symbol: &Symbol,
        bars: &[Candle],
    ) -> Result<BacktestResult, BacktestError>
    where
        S: SignalSource + ?Sized,
    {
        self.config.validate()?;
        self.risk_config
            .validate()
            .map_err(|e| BacktestError::config("risk", e.to_string()))?;
        let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
            return Err(BacktestError::EmptySeries);
        };
        if let Some(index) = bars
            .windows(2)
            .position(|pair| pair[1].time <= pair[0].time)
        {
            return Err(BacktestError::UnorderedSeries { index: index + 1 });
        }

        info!(
            strategy = strategy.name(),
            symbol = %symbol,
            bars = bars.len(),
            initial_capital = %self.config.initial_capital,
            "Backtest started"
        );

        let mut run = Replay::new(&self.config, self.risk_config.clone(), symbol.clone());
        for (i, bar) in bars.iter().enumerate() {
            run.roll_day(bar.time);
            run.record_equity(bar);

            if let Some((reason, level)) = run
                .position
                .as_ref()
                .and_then(|p| p.bar_exit(bar.high, bar.low))
            {
                run.close(level, reason, bar.time);
                continue;
            }

            for signal in strategy.generate_signals(symbol, &bars[..=i]) {
                run.on_signal(&signal, bar);
            }
        }
        if run.position.is_some() {
            run.close(last.close, ExitReason::EndOfData, last.time);
        }

        let summary = PerformanceCalculator::new(self.config.initial_capital).calculate(
            &run.trades,
            &run.equity_curve,
            run.capital,
        );
        info!(
            strategy = strategy.name(),
            symbol = %symbol,
            trades = summary.total_trades,
            final_capital = %run.capital,
            total_return_percent = %summary.total_return_percent.round_dp(2),
            signals_rejected = run.signals_rejected,
            "Backtest completed"
        );

        Ok(BacktestResult {
            strategy_name: strategy.name().to_string(),
            symbol: symbol.clone(),
            timeframe: self.config.timeframe.clone(),
            start: first.time,
            end: last.time,
            initial_capital: self.config.initial_capital,
            final_capital: run.capital,
            trades: run.trades,
            equity_curve: run.equity_curve,
            signals_rejected: run.signals_rejected,
            summary,
        })
    }
}

/// Mutable state of one run.
struct Replay<'a> {
    config: &'a BacktestConfig,
    risk: RiskManager,
    symbol: Symbol,
    capital: Decimal,
    position: Option<Position>,
    trades: Vec<Trade>,
    equity_curve: Vec<EquityPoint>,
    signals_rejected: u64,
    day: Option<NaiveDate>,
    day_pnl: Decimal,
}

impl<'a> Replay<'a> {
    fn new(config: &'a BacktestConfig, risk_config: RiskConfig, symbol: Symbol) -> Self {
        Self {
            config,
            risk: RiskManager::new(risk_config),
            symbol,
            capital: config.initial_capital,
            position: None,
            trades: Vec::new(),
            equity_curve: Vec::new(),
            signals_rejected: 0,
            day: None,
            day_pnl: Decimal::ZERO,
        }
    }

    fn roll_day(&mut self, time: DateTime<Utc>) {
        let today = time.date_naive();
        match self.day {
            Some(day) if day == today => {}
            Some(_) => {
                self.risk.reset_daily();
                self.day_pnl = Decimal::ZERO;
                self.day = Some(today);
            }
            None => self.day = Some(today),
        }
    }

    fn record_equity(&mut self, bar: &Candle) {
        let unrealized = self
            .position
            .as_ref()
            .map_or(Decimal::ZERO, |p| p.pnl_at(bar.close));
        self.equity_curve.push(EquityPoint {
            time: bar.time,
            equity: self.capital + unrealized,
            price: bar.close,
        });
    }

    fn on_signal(&mut self, signal: &Signal, bar: &Candle) {
        let held = self.position.as_ref().map(Position::side);
        match (signal.kind, held) {
            (SignalKind::Buy, None) => self.open(PositionSide::Long, signal, bar),
            (SignalKind::Sell, None) if self.config.allow_short => {
                self.open(PositionSide::Short, signal, bar);
            }
            (SignalKind::Sell, Some(PositionSide::Long))
            | (SignalKind::Buy, Some(PositionSide::Short)) => {
                self.close(bar.close, ExitReason::Signal, bar.time);
            }
            _ => {}
        }
    }

    fn open(&mut self, side: PositionSide, signal: &Signal, bar: &Candle) {
        if let Some(reason) = self.risk.open_rejection(self.capital, &self.symbol) {
            self.signals_rejected += 1;
            debug!(symbol = %self.symbol, reason = %reason, time = %bar.time, "Entry rejected");
            return;
        }

        let slip = self.config.slippage;
        let entry = match side {
            PositionSide::Long => bar.close * (Decimal::ONE + slip),
            PositionSide::Short => bar.close * (Decimal::ONE - slip),
        };
        let (stop, target) = self.levels(side, entry, signal);
        let quantity = (self.capital * self.config.position_fraction / entry)
            .round_dp_with_strategy(QUANTITY_DP, RoundingStrategy::ToZero);
        if quantity <= Decimal::ZERO {
            debug!(capital = %self.capital, entry = %entry, "Position size rounds to zero");
            return;
        }

        let position = match Position::open(OpenPositionParams {
            symbol: self.symbol.clone(),
            side,
            entry_price: entry,
            quantity,
            stop_loss: Some(stop),
            take_profit: Some(target),
            opened_at: bar.time,
            metadata: signal.metadata.clone(),
        }) {
            Ok(position) => position,
            Err(e) => {
                warn!(error = %e, "Backtest position not opened");
                return;
            }
        };

        if let Err(e) = self
            .risk
            .add_risk(&self.symbol, quantity * (entry - stop).abs(), self.capital)
        {
            warn!(error = %e, "Backtest position risk not tracked");
        }
        debug!(
            side = %side,
            entry = %entry,
            quantity = %quantity,
            stop_loss = %stop,
            take_profit = %target,
            time = %bar.time,
            "Backtest position opened"
        );
        self.position = Some(position);
    }

    /// Signal levels when they sit on the right side of the entry, risk
    /// defaults otherwise.
    fn levels(&self, side: PositionSide, entry: Decimal, signal: &Signal) -> (Decimal, Decimal) {
        let on_loss_side = |level: Decimal| match side {
            PositionSide::Long => level < entry,
            PositionSide::Short => level > entry,
        };
        let on_gain_side = |level: Decimal| match side {
            PositionSide::Long => level > entry,
            PositionSide::Short => level < entry,
        };
        let stop = signal
            .stop_loss()
            .filter(|level| on_loss_side(*level))
            .unwrap_or_else(|| self.risk.stop_loss(entry, side));
        let target = signal
            .take_profit()
            .filter(|level| on_gain_side(*level))
            .unwrap_or_else(|| self.risk.take_profit(entry, side));
        (stop, target)
    }

    fn close(&mut self, level: Decimal, reason: ExitReason, time: DateTime<Utc>) {
        let Some(mut position) = self.position.take() else {
            return;
        };

        let slip = self.config.slippage;
        let fill = match position.side() {
            PositionSide::Long => level * (Decimal::ONE - slip),
            PositionSide::Short => level * (Decimal::ONE + slip),
        };
        let gross = match position.close(fill, reason, time) {
            Ok(gross) => gross,
            Err(e) => {
                warn!(error = %e, "Backtest position not closed");
                return;
            }
        };

        let entry = position.entry_price();
        let quantity = position.quantity();
        let commission = (entry + fill) * quantity * self.config.commission;
        let pnl = gross - commission;
        self.capital += pnl;

        self.risk.remove_risk(&self.symbol);
        self.day_pnl += pnl;
        self.risk.record_daily_pnl(self.day_pnl);

        let notional = entry * quantity;
        let pnl_percent = if notional > Decimal::ZERO {
            pnl / notional * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };
        let holding_seconds = (time - position.opened_at()).num_seconds();

        let trade = Trade {
            trade_id: format!("trade-{:05}", self.trades.len() + 1),
            symbol: self.symbol.clone(),
            side: position.side(),
            entry_time: position.opened_at(),
            exit_time: time,
            entry_price: entry,
            exit_price: level,
            exit_fill_price: fill,
            quantity,
            stop_loss: position.stop_loss(),
            take_profit: position.take_profit(),
            gross_pnl: gross,
            commission,
            pnl,
            pnl_percent,
            exit_reason: reason,
            holding_period_hours: Decimal::from(holding_seconds) / SECONDS_PER_HOUR,
        };
        debug!(
            trade_id = %trade.trade_id,
            exit_reason = reason.as_str(),
            exit_price = %level,
            pnl = %pnl,
            capital = %self.capital,
            "Backtest position closed"
        );
        self.trades.push(trade);
    }
}
