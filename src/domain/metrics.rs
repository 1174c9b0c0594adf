//! Performance metrics over a finished run (MetricsCalculator).

use super::config::BacktestConfig;
use super::ledger::AccountLedger;
use super::position::Trade;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub start_value: f64,
    pub end_value: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub max_drawdown: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// 0.0 with `win_rate_available == false` when there are no trades.
    pub win_rate: f64,
    pub win_rate_available: bool,
    /// `f64::INFINITY` when no trade lost money.
    pub profit_factor: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
}

impl Metrics {
    pub fn compute(ledger: &AccountLedger, trades: &[Trade], config: &BacktestConfig) -> Self {
        let start_value = ledger.start_value();
        let end_value = ledger.end_value();
        let periods_per_year = config.timeframe.periods_per_year();

        let total_return = (end_value / start_value - 1.0) * 100.0;
        let annualized_return = annualize(total_return, ledger.len(), periods_per_year);

        let max_drawdown = ledger
            .snapshots()
            .iter()
            .map(|s| s.drawdown)
            .fold(0.0_f64, f64::min);

        let mut winning_trades = 0usize;
        let mut losing_trades = 0usize;
        let mut gross_profit = 0.0_f64;
        let mut gross_loss = 0.0_f64;
        for trade in trades {
            if trade.is_winner() {
                winning_trades += 1;
                gross_profit += trade.profit;
            } else if trade.is_loser() {
                losing_trades += 1;
                gross_loss += trade.profit.abs();
            }
        }

        let total_trades = trades.len();
        let win_rate_available = total_trades > 0;
        let win_rate = if win_rate_available {
            winning_trades as f64 / total_trades as f64 * 100.0
        } else {
            0.0
        };

        let profit_factor = if losing_trades > 0 && gross_loss > 0.0 {
            gross_profit / gross_loss
        } else {
            f64::INFINITY
        };

        let returns = ledger.period_returns();
        let period_rf = (1.0 + config.risk_free_rate).powf(1.0 / periods_per_year) - 1.0;
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(&returns, period_rf, periods_per_year);

        Metrics {
            start_value,
            end_value,
            total_return,
            annualized_return,
            max_drawdown,
            total_trades,
            winning_trades,
            losing_trades,
            win_rate,
            win_rate_available,
            profit_factor,
            sharpe_ratio,
            sortino_ratio,
            calmar_ratio: calmar(annualized_return, max_drawdown),
        }
    }
}

fn annualize(total_return: f64, bars: usize, periods_per_year: f64) -> f64 {
    let years = bars as f64 / periods_per_year;
    if years <= 0.0 || total_return == 0.0 {
        return 0.0;
    }
    // A fractional power of a non-positive growth factor is NaN; equity wiped out is -100%.
    if 1.0 + total_return / 100.0 <= 0.0 {
        return -100.0;
    }
    ((1.0 + total_return / 100.0).powf(1.0 / years) - 1.0) * 100.0
}

fn calmar(annualized_return: f64, max_drawdown: f64) -> f64 {
    let depth = max_drawdown.abs();
    if depth < 0.01 {
        return if annualized_return > 0.0 { f64::INFINITY } else { 0.0 };
    }
    annualized_return / depth
}

/// Annualised (sharpe, sortino) from per-period returns. Population deviation.
fn compute_risk_adjusted(returns: &[f64], period_rf: f64, periods_per_year: f64) -> (f64, f64) {
    let excess: Vec<f64> = returns
        .iter()
        .filter(|r| r.is_finite())
        .map(|r| r - period_rf)
        .collect();
    if excess.is_empty() {
        return (0.0, 0.0);
    }

    let n = excess.len() as f64;
    let mean = excess.iter().sum::<f64>() / n;
    let variance = excess.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();
    let scale = periods_per_year.sqrt();

    let sharpe = if stddev > f64::EPSILON {
        mean / stddev * scale
    } else {
        0.0
    };

    let downside: Vec<f64> = excess.iter().filter(|&&r| r < 0.0).map(|r| r * r).collect();
    let sortino = if downside.is_empty() {
        if mean > 0.0 { f64::INFINITY } else { 0.0 }
    } else {
        let downside_dev = (downside.iter().sum::<f64>() / downside.len() as f64).sqrt();
        if downside_dev > f64::EPSILON {
            mean / downside_dev * scale
        } else {
            0.0
        }
    };

    (sharpe, sortino)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::{Direction, ExitReason};
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn date(i: usize) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::days(i as i64)
    }

    fn make_ledger(start: f64, values: &[f64]) -> AccountLedger {
        let mut ledger = AccountLedger::new(start);
        for (i, &v) in values.iter().enumerate() {
            ledger.record(date(i), 1.0, v, 0.0, 0);
        }
        ledger
    }

    fn make_trade(profit: f64) -> Trade {
        Trade {
            direction: Direction::Long,
            entry_index: 0,
            exit_index: 1,
            entry_date: date(0),
            exit_date: date(1),
            entry_price: 100.0,
            exit_price: 100.0 + profit / 10.0,
            quantity: 10.0,
            entry_commission: 0.0,
            exit_commission: 0.0,
            profit,
            profit_pct: profit / 10.0,
            holding_bars: 1,
            exit_reason: ExitReason::Signal,
        }
    }

    #[test]
    fn total_return_positive() {
        let ledger = make_ledger(100_000.0, &[100_000.0, 110_000.0]);
        let m = Metrics::compute(&ledger, &[], &BacktestConfig::default());
        assert_relative_eq!(m.total_return, 10.0, epsilon = 1e-9);
        assert_eq!(m.start_value, 100_000.0);
        assert_eq!(m.end_value, 110_000.0);
    }

    #[test]
    fn annualized_return_over_one_year_equals_total() {
        let mut values = vec![100.0; 364];
        values.push(120.0);
        let ledger = make_ledger(100.0, &values);
        let m = Metrics::compute(&ledger, &[], &BacktestConfig::default());
        assert_relative_eq!(m.annualized_return, 20.0, epsilon = 1e-9);
    }

    #[test]
    fn annualized_return_zero_when_flat() {
        let ledger = make_ledger(100.0, &[100.0, 100.0]);
        let m = Metrics::compute(&ledger, &[], &BacktestConfig::default());
        assert_eq!(m.annualized_return, 0.0);
    }

    #[test]
    fn annualized_return_clamped_when_equity_goes_negative() {
        let ledger = make_ledger(100.0, &[100.0, 60.0, -50.0]);
        let m = Metrics::compute(&ledger, &[], &BacktestConfig::default());
        assert_relative_eq!(m.total_return, -150.0, epsilon = 1e-9);
        assert_eq!(m.annualized_return, -100.0);
        assert!(m.calmar_ratio.is_finite());
        assert!(m.calmar_ratio < 0.0);
    }

    #[test]
    fn max_drawdown_is_most_negative() {
        let ledger = make_ledger(100.0, &[110.0, 90.0, 95.0, 80.0, 100.0]);
        let m = Metrics::compute(&ledger, &[], &BacktestConfig::default());
        assert_relative_eq!(m.max_drawdown, (80.0 - 110.0) / 110.0 * 100.0);
    }

    #[test]
    fn trade_stats_wins_and_losses() {
        let trades = vec![make_trade(100.0), make_trade(-50.0), make_trade(200.0), make_trade(0.0)];
        let ledger = make_ledger(1_000.0, &[1_250.0]);
        let m = Metrics::compute(&ledger, &trades, &BacktestConfig::default());
        assert_eq!(m.total_trades, 4);
        assert_eq!(m.winning_trades, 2);
        assert_eq!(m.losing_trades, 1);
        assert_relative_eq!(m.win_rate, 50.0);
        assert!(m.win_rate_available);
        assert_relative_eq!(m.profit_factor, 6.0);
    }

    #[test]
    fn profit_factor_sentinel_without_losers() {
        let trades = vec![make_trade(100.0), make_trade(0.0)];
        let ledger = make_ledger(1_000.0, &[1_100.0]);
        let m = Metrics::compute(&ledger, &trades, &BacktestConfig::default());
        assert!(m.profit_factor.is_infinite() && m.profit_factor > 0.0);
    }

    #[test]
    fn no_trades_flags_win_rate_unavailable() {
        let ledger = make_ledger(1_000.0, &[1_000.0]);
        let m = Metrics::compute(&ledger, &[], &BacktestConfig::default());
        assert_eq!(m.total_trades, 0);
        assert_eq!(m.win_rate, 0.0);
        assert!(!m.win_rate_available);
        assert!(m.profit_factor.is_infinite());
    }

    #[test]
    fn sharpe_zero_for_constant_equity() {
        let ledger = make_ledger(100.0, &[100.0, 100.0, 100.0]);
        let m = Metrics::compute(&ledger, &[], &BacktestConfig::default());
        assert_eq!(m.sharpe_ratio, 0.0);
    }

    #[test]
    fn sharpe_matches_hand_computation() {
        let returns: [f64; 3] = [0.01, -0.02, 0.03];
        let mean = 0.02 / 3.0;
        let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / 3.0;
        let (sharpe, _) = compute_risk_adjusted(&returns, 0.0, 365.0);
        assert_relative_eq!(sharpe, mean / var.sqrt() * 365f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn sortino_uses_downside_only() {
        let returns = [0.02, -0.01, 0.03, -0.03];
        let mean = 0.01 / 4.0;
        let downside = ((0.01f64.powi(2) + 0.03f64.powi(2)) / 2.0).sqrt();
        let (_, sortino) = compute_risk_adjusted(&returns, 0.0, 252.0);
        assert_relative_eq!(sortino, mean / downside * 252f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn sortino_infinite_with_only_gains() {
        let (_, sortino) = compute_risk_adjusted(&[0.01, 0.02], 0.0, 365.0);
        assert!(sortino.is_infinite());
    }

    #[test]
    fn calmar_ratio() {
        assert_relative_eq!(calmar(20.0, -10.0), 2.0);
        assert!(calmar(5.0, 0.0).is_infinite());
        assert_eq!(calmar(-5.0, 0.0), 0.0);
    }

    #[test]
    fn risk_free_rate_lowers_sharpe() {
        let ledger = make_ledger(100.0, &[101.0, 100.5, 102.0, 101.0, 103.0]);
        let base = Metrics::compute(&ledger, &[], &BacktestConfig::default());
        let with_rf = Metrics::compute(
            &ledger,
            &[],
            &BacktestConfig {
                risk_free_rate: 0.5,
                ..Default::default()
            },
        );
        assert!(with_rf.sharpe_ratio < base.sharpe_ratio);
    }
}
