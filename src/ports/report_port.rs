//! Report generation port trait.

use std::path::Path;

use crate::domain::backtest::BacktestRun;
use crate::domain::error::BacktestError;

/// Port for exporting the account ledger of a finished run.
///
/// `total_trades` and `initial_capital` are what the caller believes the run
/// produced; a writer must refuse to export when they disagree with `run`.
pub trait ReportPort {
    fn write(
        &self,
        run: &BacktestRun,
        total_trades: usize,
        initial_capital: f64,
        output_path: &Path,
    ) -> Result<(), BacktestError>;
}
