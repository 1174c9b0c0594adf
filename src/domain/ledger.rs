//! Per-bar account snapshots and the equity curve (AccountLedger).

use chrono::NaiveDateTime;

#[derive(Debug, Clone, PartialEq)]
pub struct AccountSnapshot {
    pub date: NaiveDateTime,
    pub price: f64,
    pub balance: f64,
    pub position_value: f64,
    pub total_value: f64,
    /// Change in total value since the previous bar (or since the start for bar 0).
    pub profit_loss: f64,
    pub cumulative_return: f64,
    /// Percent below the running peak, never positive.
    pub drawdown: f64,
    pub active_trades: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountLedger {
    start_value: f64,
    peak: f64,
    snapshots: Vec<AccountSnapshot>,
}

impl AccountLedger {
    pub fn new(start_value: f64) -> Self {
        AccountLedger {
            start_value,
            peak: start_value,
            snapshots: Vec::new(),
        }
    }

    pub fn with_capacity(start_value: f64, bars: usize) -> Self {
        AccountLedger {
            snapshots: Vec::with_capacity(bars),
            ..AccountLedger::new(start_value)
        }
    }

    /// Append the snapshot for one bar and return it.
    pub fn record(
        &mut self,
        date: NaiveDateTime,
        price: f64,
        balance: f64,
        position_value: f64,
        active_trades: usize,
    ) -> &AccountSnapshot {
        let total_value = balance + position_value;
        let previous = self
            .snapshots
            .last()
            .map(|s| s.total_value)
            .unwrap_or(self.start_value);

        if total_value > self.peak {
            self.peak = total_value;
        }
        let drawdown = if self.peak > 0.0 && total_value < self.peak {
            (total_value - self.peak) / self.peak * 100.0
        } else {
            0.0
        };

        self.snapshots.push(AccountSnapshot {
            date,
            price,
            balance,
            position_value,
            total_value,
            profit_loss: total_value - previous,
            cumulative_return: (total_value / self.start_value - 1.0) * 100.0,
            drawdown,
            active_trades,
        });
        &self.snapshots[self.snapshots.len() - 1]
    }

    pub fn start_value(&self) -> f64 {
        self.start_value
    }

    pub fn snapshots(&self) -> &[AccountSnapshot] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn end_value(&self) -> f64 {
        self.snapshots
            .last()
            .map(|s| s.total_value)
            .unwrap_or(self.start_value)
    }

    pub fn equity_curve(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.total_value).collect()
    }

    pub fn drawdowns(&self) -> Vec<f64> {
        self.snapshots.iter().map(|s| s.drawdown).collect()
    }

    /// Simple per-period returns, the first measured against the start value.
    pub fn period_returns(&self) -> Vec<f64> {
        let mut prev = self.start_value;
        self.snapshots
            .iter()
            .map(|s| {
                let r = if prev > 0.0 { s.total_value / prev - 1.0 } else { 0.0 };
                prev = s.total_value;
                r
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn date(i: usize) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::days(i as i64)
    }

    fn ledger_with(values: &[f64]) -> AccountLedger {
        let mut ledger = AccountLedger::new(100.0);
        for (i, &v) in values.iter().enumerate() {
            ledger.record(date(i), 1.0, v, 0.0, 0);
        }
        ledger
    }

    #[test]
    fn new_ledger_is_empty() {
        let ledger = AccountLedger::new(1_000.0);
        assert!(ledger.is_empty());
        assert_eq!(ledger.end_value(), 1_000.0);
    }

    #[test]
    fn total_is_balance_plus_position_value() {
        let mut ledger = AccountLedger::new(1_000.0);
        let snap = ledger.record(date(0), 10.0, 400.0, 650.0, 1).clone();
        assert_relative_eq!(snap.total_value, 1_050.0);
        assert_relative_eq!(snap.profit_loss, 50.0);
        assert_relative_eq!(snap.cumulative_return, 5.0, epsilon = 1e-9);
        assert_eq!(snap.drawdown, 0.0);
        assert_eq!(snap.active_trades, 1);
    }

    #[test]
    fn drawdown_from_running_peak() {
        let ledger = ledger_with(&[110.0, 99.0, 120.0, 90.0]);
        let dd = ledger.drawdowns();
        assert_eq!(dd[0], 0.0);
        assert_relative_eq!(dd[1], (99.0 - 110.0) / 110.0 * 100.0);
        assert_eq!(dd[2], 0.0);
        assert_relative_eq!(dd[3], -25.0);
        assert!(dd.iter().all(|&d| d <= 0.0));
    }

    #[test]
    fn drawdown_below_start_counts_from_start_value() {
        let ledger = ledger_with(&[90.0]);
        assert_relative_eq!(ledger.snapshots()[0].drawdown, -10.0);
    }

    #[test]
    fn bar_profit_loss_is_change_from_previous_bar() {
        let ledger = ledger_with(&[105.0, 103.0]);
        assert_relative_eq!(ledger.snapshots()[0].profit_loss, 5.0);
        assert_relative_eq!(ledger.snapshots()[1].profit_loss, -2.0);
    }

    #[test]
    fn period_returns_start_from_initial_value() {
        let ledger = ledger_with(&[110.0, 121.0]);
        let r = ledger.period_returns();
        assert_relative_eq!(r[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(r[1], 0.1, epsilon = 1e-12);
    }

    #[test]
    fn equity_curve_and_end_value() {
        let ledger = ledger_with(&[101.0, 102.0, 99.0]);
        assert_eq!(ledger.equity_curve(), vec![101.0, 102.0, 99.0]);
        assert_eq!(ledger.end_value(), 99.0);
        assert_eq!(ledger.len(), 3);
    }
}
