//! Backtest engine and event loop (TradeExecutionEngine).
//!
//! Each bar runs mark-to-market, exits, entry and snapshot, in that order.
//! After the last bar every open position is liquidated and the final
//! snapshot reflects the flat account, so the ledger holds exactly one
//! snapshot per input bar.

use std::collections::BTreeMap;

use super::config::BacktestConfig;
use super::error::BacktestError;
use super::ledger::{AccountLedger, AccountSnapshot};
use super::metrics::Metrics;
use super::position::{Direction, Trade};
use super::position_manager::PositionManager;
use super::signal::{Bar, SignalFeed};

/// Metrics and trade log handed back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub metrics: Metrics,
    pub trades: Vec<Trade>,
}

/// Everything a finished run produced, including the ledger needed for
/// report export. Pass it by reference to a report writer.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestRun {
    pub result: BacktestResult,
    pub ledger: AccountLedger,
    pub config: BacktestConfig,
}

impl BacktestRun {
    pub fn metrics(&self) -> &Metrics {
        &self.result.metrics
    }

    pub fn trades(&self) -> &[Trade] {
        &self.result.trades
    }

    pub fn snapshots(&self) -> &[AccountSnapshot] {
        self.ledger.snapshots()
    }
}

/// Mutable state of one run. Created fresh by [`run_backtest`] and consumed
/// when the run finishes.
pub struct TradeExecutionEngine<'a> {
    config: &'a BacktestConfig,
    positions: PositionManager,
    ledger: AccountLedger,
}

impl<'a> TradeExecutionEngine<'a> {
    pub fn new(config: &'a BacktestConfig, bars: usize) -> Self {
        TradeExecutionEngine {
            config,
            positions: PositionManager::new(config.initial_capital),
            ledger: AccountLedger::with_capacity(config.initial_capital, bars),
        }
    }

    /// Steps 1-3 for a bar: mark, exit, enter.
    pub fn process_bar(&mut self, bar: &Bar) {
        self.positions.mark_to_market(bar.price);
        self.positions.evaluate_exits(bar, self.config);
        if let Some(direction) = Direction::from_entry_signal(bar.entry) {
            self.positions
                .open(direction, bar.price, bar.index, bar.date, self.config);
        }
    }

    /// Step 4: record the post-trade account state for a bar.
    pub fn snapshot(&mut self, bar: &Bar) -> &AccountSnapshot {
        self.ledger.record(
            bar.date,
            bar.price,
            self.positions.balance(),
            self.positions.position_value(bar.price),
            self.positions.open_count(),
        )
    }

    /// Liquidate at the final bar and record its snapshot.
    pub fn finish(mut self, last: &Bar) -> BacktestRun {
        let liquidated = self
            .positions
            .force_close_all(last.price, last.index, last.date, self.config);
        if liquidated > 0 {
            tracing::debug!(count = liquidated, "liquidated open positions at end of data");
        }
        self.snapshot(last);

        let trades = self.positions.into_trades();
        let metrics = Metrics::compute(&self.ledger, &trades, self.config);
        BacktestRun {
            result: BacktestResult { metrics, trades },
            ledger: self.ledger,
            config: self.config.clone(),
        }
    }
}

/// Replay `feed` under `config`. A pure function of its inputs.
pub fn run_backtest(feed: &SignalFeed, config: &BacktestConfig) -> Result<BacktestRun, BacktestError> {
    config.validate()?;
    if feed.is_empty() {
        return Err(BacktestError::EmptySeries);
    }

    tracing::info!(
        bars = feed.len(),
        trade_type = %config.trade_type,
        timeframe = %config.timeframe,
        "starting backtest"
    );

    let mut engine = TradeExecutionEngine::new(config, feed.len());
    let last_index = feed.len() - 1;
    for bar in feed.bars() {
        engine.process_bar(&bar);
        if bar.index < last_index {
            engine.snapshot(&bar);
        }
    }
    let run = engine.finish(&feed.bar(last_index));

    tracing::info!(
        trades = run.result.trades.len(),
        end_value = run.result.metrics.end_value,
        total_return = run.result.metrics.total_return,
        "backtest finished"
    );
    Ok(run)
}

/// Run several named signal sets against the same prices, each in its own context.
pub fn run_sweep(
    feed: &SignalFeed,
    signal_sets: &BTreeMap<String, (Vec<i8>, Vec<i8>)>,
    config: &BacktestConfig,
) -> Result<BTreeMap<String, BacktestRun>, BacktestError> {
    config.validate()?;
    signal_sets
        .iter()
        .map(|(name, (entries, exits))| {
            tracing::info!(name = %name, "running signal set");
            let variant = feed.with_signals(entries.clone(), exits.clone())?;
            run_backtest(&variant, config).map(|run| (name.clone(), run))
        })
        .collect()
}
