//! Performance calculator for backtest results.

use rust_decimal::Decimal;

use super::constants::{HUNDRED, TRADING_DAYS};
use super::math::{downside_deviation, mean, sqrt_decimal, std_dev};
use super::types::PerformanceSummary;
use crate::backtest::trade::{EquityPoint, Trade};

/// Derives a [`PerformanceSummary`] from a trade ledger and equity curve.
#[derive(Debug, Clone, Copy)]
pub struct PerformanceCalculator {
    initial_equity: Decimal,
}

impl PerformanceCalculator {
    /// Create a calculator for a run that started with `initial_equity`.
    #[must_use]
    pub const fn new(initial_equity: Decimal) -> Self {
        Self { initial_equity }
    }

    /// Calculate all metrics. `final_equity` is the realized capital at the
    /// end of the run.
    #[must_use]
    pub fn calculate(
        &self,
        trades: &[Trade],
        equity_curve: &[EquityPoint],
        final_equity: Decimal,
    ) -> PerformanceSummary {
        let total_return = final_equity - self.initial_equity;
        let total_return_percent = percent(total_return, self.initial_equity);

        let (gross_profit, gross_loss, winning_trades, losing_trades) = trade_stats(trades);
        let total_trades = trades.len() as u64;

        let win_rate = ratio(Decimal::from(winning_trades), Decimal::from(total_trades));
        let avg_win = ratio(gross_profit, Decimal::from(winning_trades));
        let avg_loss = ratio(gross_loss, Decimal::from(losing_trades));

        let profit_factor = (gross_loss > Decimal::ZERO).then(|| gross_profit / gross_loss);
        let payoff_ratio = (avg_loss > Decimal::ZERO).then(|| avg_win / avg_loss);

        let loss_rate = ratio(Decimal::from(losing_trades), Decimal::from(total_trades));
        let expectancy = win_rate * avg_win - loss_rate * avg_loss;

        let (max_consecutive_wins, max_consecutive_losses) = consecutive_streaks(trades);
        let (max_drawdown, max_drawdown_percent) = self.drawdown(equity_curve);

        let returns = period_returns(equity_curve);
        let annualizer = sqrt_decimal(TRADING_DAYS).unwrap_or(Decimal::ONE);
        let sharpe_ratio = risk_adjusted(&returns, std_dev(&returns)).map(|r| r * annualizer);
        let sortino_ratio =
            risk_adjusted(&returns, downside_deviation(&returns)).map(|r| r * annualizer);

        PerformanceSummary {
            initial_equity: self.initial_equity,
            final_equity,
            total_return,
            total_return_percent,
            total_trades,
            winning_trades,
            losing_trades,
            win_rate: win_rate * HUNDRED,
            avg_win,
            avg_loss,
            profit_factor,
            payoff_ratio,
            expectancy,
            gross_profit,
            gross_loss,
            total_commission: trades.iter().map(|t| t.commission).sum(),
            max_consecutive_wins,
            max_consecutive_losses,
            max_drawdown,
            max_drawdown_percent,
            sharpe_ratio,
            sortino_ratio,
        }
    }

    /// Largest absolute decline from a running peak that starts at the
    /// initial equity, and its percent of that peak.
    fn drawdown(&self, equity_curve: &[EquityPoint]) -> (Decimal, Decimal) {
        let mut peak = self.initial_equity;
        let mut max_drawdown = Decimal::ZERO;
        let mut max_drawdown_percent = Decimal::ZERO;

        for point in equity_curve {
            if point.equity > peak {
                peak = point.equity;
                continue;
            }
            let drawdown = peak - point.equity;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
                max_drawdown_percent = percent(drawdown, peak);
            }
        }

        (max_drawdown, max_drawdown_percent)
    }
}

fn trade_stats(trades: &[Trade]) -> (Decimal, Decimal, u64, u64) {
    let mut gross_profit = Decimal::ZERO;
    let mut gross_loss = Decimal::ZERO;
    let mut winning = 0u64;
    let mut losing = 0u64;

    for trade in trades {
        if trade.is_winner() {
            gross_profit += trade.pnl;
            winning += 1;
        } else if trade.is_loser() {
            gross_loss += trade.pnl.abs();
            losing += 1;
        }
    }

    (gross_profit, gross_loss, winning, losing)
}

fn consecutive_streaks(trades: &[Trade]) -> (u64, u64) {
    let mut max_wins = 0u64;
    let mut max_losses = 0u64;
    let mut current_wins = 0u64;
    let mut current_losses = 0u64;

    for trade in trades {
        if trade.is_winner() {
            current_wins += 1;
            current_losses = 0;
            max_wins = max_wins.max(current_wins);
        } else if trade.is_loser() {
            current_losses += 1;
            current_wins = 0;
            max_losses = max_losses.max(current_losses);
        }
    }

    (max_wins, max_losses)
}

fn period_returns(equity_curve: &[EquityPoint]) -> Vec<Decimal> {
    equity_curve
        .windows(2)
        .filter(|pair| pair[0].equity > Decimal::ZERO)
        .map(|pair| (pair[1].equity - pair[0].equity) / pair[0].equity)
        .collect()
}

/// Mean return over a deviation; `None` with fewer than two returns or a
/// zero deviation.
fn risk_adjusted(returns: &[Decimal], deviation: Option<Decimal>) -> Option<Decimal> {
    if returns.len() < 2 {
        return None;
    }
    let deviation = deviation.filter(|d| *d > Decimal::ZERO)?;
    Some(mean(returns)? / deviation)
}

fn ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator > Decimal::ZERO {
        numerator / denominator
    } else {
        Decimal::ZERO
    }
}

fn percent(part: Decimal, whole: Decimal) -> Decimal {
    ratio(part, whole) * HUNDRED
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position_tracking::{ExitReason, PositionSide};
    use chrono::{TimeDelta, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn trade(pnl: Decimal) -> Trade {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Trade {
            trade_id: "trade-00001".to_string(),
            symbol: "BTC/USDT".into(),
            side: PositionSide::Long,
            entry_time: t,
            exit_time: t + TimeDelta::hours(1),
            entry_price: dec!(100),
            exit_price: dec!(100),
            exit_fill_price: dec!(100),
            quantity: dec!(1),
            stop_loss: None,
            take_profit: None,
            gross_pnl: pnl,
            commission: dec!(1),
            pnl,
            pnl_percent: pnl,
            exit_reason: ExitReason::Signal,
            holding_period_hours: dec!(1),
        }
    }

    fn curve(values: &[Decimal]) -> Vec<EquityPoint> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, equity)| EquityPoint {
                time: start + TimeDelta::hours(i as i64),
                equity: *equity,
                price: dec!(100),
            })
            .collect()
    }

    #[test]
    fn trade_statistics() {
        let trades = [trade(dec!(100)), trade(dec!(50)), trade(dec!(-50)), trade(dec!(100))];
        let summary =
            PerformanceCalculator::new(dec!(1000)).calculate(&trades, &[], dec!(1200));

        assert_eq!(summary.total_trades, 4);
        assert_eq!(summary.win_rate, dec!(75));
        assert_eq!(summary.avg_loss, dec!(50));
        assert_eq!(summary.profit_factor, Some(dec!(5)));
        assert_eq!(summary.total_return, dec!(200));
        assert_eq!(summary.total_return_percent, dec!(20));
        assert_eq!(summary.max_consecutive_wins, 2);
        assert_eq!(summary.max_consecutive_losses, 1);
        assert_eq!(summary.total_commission, dec!(4));
        assert!((summary.expectancy - dec!(50)).abs() < dec!(0.0000001));
    }

    #[test]
    fn no_losers_means_no_profit_factor() {
        let summary =
            PerformanceCalculator::new(dec!(1000)).calculate(&[trade(dec!(10))], &[], dec!(1010));
        assert_eq!(summary.profit_factor, None);
        assert_eq!(summary.payoff_ratio, None);
    }

    #[test]
    fn drawdown_from_running_peak() {
        let points = curve(&[dec!(1000), dec!(1200), dec!(900), dec!(1300), dec!(1100)]);
        let summary = PerformanceCalculator::new(dec!(1000)).calculate(&[], &points, dec!(1100));
        assert_eq!(summary.max_drawdown, dec!(300));
        assert_eq!(summary.max_drawdown_percent, dec!(25));
    }

    #[test]
    fn flat_curve_has_no_sharpe() {
        let points = curve(&[dec!(1000), dec!(1000), dec!(1000)]);
        let summary = PerformanceCalculator::new(dec!(1000)).calculate(&[], &points, dec!(1000));
        assert_eq!(summary.sharpe_ratio, None);
        assert_eq!(summary.sortino_ratio, None);
    }

    #[test]
    fn rising_curve_has_positive_sharpe() {
        let points = curve(&[dec!(1000), dec!(1010), dec!(1015), dec!(1030)]);
        let summary = PerformanceCalculator::new(dec!(1000)).calculate(&[], &points, dec!(1030));
        assert!(summary.sharpe_ratio.is_some_and(|s| s > Decimal::ZERO));
        // no negative returns
        assert_eq!(summary.sortino_ratio, None);
    }
}
