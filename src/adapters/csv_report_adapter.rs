//! CSV export of the account ledger and summary statistics.

use crate::domain::backtest::BacktestRun;
use crate::domain::error::BacktestError;
use crate::domain::metrics::Metrics;
use crate::ports::report_port::ReportPort;
use std::io::Write;
use std::path::Path;

pub const REPORT_HEADER: [&str; 9] = [
    "Date",
    "Price",
    "Balance",
    "Position Value",
    "Total Value",
    "Profit/Loss",
    "Cumulative Return (%)",
    "Drawdown (%)",
    "Active Trades",
];

pub const SUMMARY_MARKER: &str = "Summary Statistics";

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    fn check_matches_run(
        run: &BacktestRun,
        total_trades: usize,
        initial_capital: f64,
    ) -> Result<(), BacktestError> {
        let actual_trades = run.trades().len();
        if total_trades != actual_trades {
            return Err(BacktestError::ReportMismatch {
                field: "total_trades".to_string(),
                expected: total_trades.to_string(),
                actual: actual_trades.to_string(),
            });
        }
        let actual_capital = run.config.initial_capital;
        if (initial_capital - actual_capital).abs() > 1e-9 * actual_capital.abs().max(1.0) {
            return Err(BacktestError::ReportMismatch {
                field: "initial_capital".to_string(),
                expected: initial_capital.to_string(),
                actual: actual_capital.to_string(),
            });
        }
        Ok(())
    }

    fn write_report(run: &BacktestRun, output_path: &Path) -> Result<(), csv::Error> {
        let mut wtr = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(output_path)?;

        wtr.write_record(REPORT_HEADER)?;
        for s in run.snapshots() {
            wtr.write_record([
                s.date.format(DATE_FORMAT).to_string(),
                s.price.to_string(),
                s.balance.to_string(),
                s.position_value.to_string(),
                s.total_value.to_string(),
                s.profit_loss.to_string(),
                s.cumulative_return.to_string(),
                s.drawdown.to_string(),
                s.active_trades.to_string(),
            ])?;
        }

        // csv quotes a lone empty field, so the separator line goes straight to the file.
        let mut file = wtr.into_inner().map_err(|e| csv::Error::from(e.into_error()))?;
        file.write_all(b"\n")?;

        let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(file);
        wtr.write_record([SUMMARY_MARKER])?;
        for (key, value) in summary_rows(run.metrics(), run.snapshots().len()) {
            wtr.write_record([key, value.as_str()])?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Key/value rows of the summary block, in output order.
pub fn summary_rows(metrics: &Metrics, data_points: usize) -> Vec<(&'static str, String)> {
    let win_rate = if metrics.win_rate_available {
        metrics.win_rate.to_string()
    } else {
        "N/A".to_string()
    };
    vec![
        ("Initial Capital", metrics.start_value.to_string()),
        ("Final Value", metrics.end_value.to_string()),
        ("Total Return (%)", metrics.total_return.to_string()),
        ("Annualized Return (%)", metrics.annualized_return.to_string()),
        ("Max Drawdown (%)", metrics.max_drawdown.to_string()),
        ("Total Trades", metrics.total_trades.to_string()),
        ("Winning Trades", metrics.winning_trades.to_string()),
        ("Losing Trades", metrics.losing_trades.to_string()),
        ("Win Rate (%)", win_rate),
        ("Profit Factor", metrics.profit_factor.to_string()),
        ("Sharpe Ratio", metrics.sharpe_ratio.to_string()),
        ("Sortino Ratio", metrics.sortino_ratio.to_string()),
        ("Calmar Ratio", metrics.calmar_ratio.to_string()),
        ("Total Data Points", data_points.to_string()),
    ]
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        run: &BacktestRun,
        total_trades: usize,
        initial_capital: f64,
        output_path: &Path,
    ) -> Result<(), BacktestError> {
        Self::check_matches_run(run, total_trades, initial_capital)?;

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(BacktestError::ReportWrite {
                    path: output_path.display().to_string(),
                    reason: format!("directory {} does not exist", parent.display()),
                });
            }
        }

        Self::write_report(run, output_path).map_err(|e| BacktestError::ReportWrite {
            path: output_path.display().to_string(),
            reason: e.to_string(),
        })?;
        tracing::info!(path = %output_path.display(), rows = run.snapshots().len(), "wrote account report");
        Ok(())
    }
}
