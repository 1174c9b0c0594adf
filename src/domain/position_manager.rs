//! Open-position bookkeeping: entries, mark-to-market, exit triggers, closes.
//!
//! The manager owns the cash balance and the trade log for one run. Capital
//! committed to a position leaves the balance at entry and comes back, with
//! P/L and less exit commission, when the position closes.

use chrono::NaiveDateTime;

use super::config::BacktestConfig;
use super::execution::{
    apply_entry_slippage, apply_exit_slippage, calculate_commission, quantity_for,
    stop_loss_level, take_profit_level,
};
use super::position::{Direction, ExitReason, Position, PositionStatus, Trade};
use super::signal::Bar;

#[derive(Debug, Clone, PartialEq)]
pub struct PositionManager {
    balance: f64,
    positions: Vec<Position>,
    trades: Vec<Trade>,
}

impl PositionManager {
    pub fn new(initial_capital: f64) -> Self {
        PositionManager {
            balance: initial_capital,
            positions: Vec::new(),
            trades: Vec::new(),
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn open_count(&self) -> usize {
        self.positions.len()
    }

    pub fn has_capacity(&self, max_positions: usize) -> bool {
        max_positions == 0 || self.positions.len() < max_positions
    }

    /// Sum of open position values at `price`.
    pub fn position_value(&self, price: f64) -> f64 {
        self.positions.iter().map(|p| p.market_value(price)).sum()
    }

    /// Open a position sized at `position_size_pct` of the current balance.
    ///
    /// Returns `None` without touching any state when capacity is exhausted,
    /// the trade type forbids `direction`, or there is no capital to commit.
    pub fn open(
        &mut self,
        direction: Direction,
        price: f64,
        bar_index: usize,
        date: NaiveDateTime,
        config: &BacktestConfig,
    ) -> Option<&Position> {
        if !self.has_capacity(config.max_positions) {
            tracing::debug!(
                bar = bar_index,
                open = self.positions.len(),
                max = config.max_positions,
                "entry rejected: max positions reached"
            );
            return None;
        }
        if !config.trade_type.permits(direction) {
            tracing::debug!(
                bar = bar_index,
                %direction,
                trade_type = %config.trade_type,
                "entry rejected: side not permitted"
            );
            return None;
        }

        let committed = self.balance * config.position_size_pct;
        if committed <= 0.0 {
            tracing::debug!(bar = bar_index, balance = self.balance, "entry rejected: no capital");
            return None;
        }

        let fill = apply_entry_slippage(price, direction, config.slippage_pct);
        let quantity = quantity_for(committed, fill, config.commission_pct);
        let entry_commission = calculate_commission(quantity * fill, config.commission_pct);

        self.balance -= committed;

        let position = Position {
            direction,
            entry_index: bar_index,
            entry_date: date,
            entry_price: fill,
            quantity,
            committed,
            entry_commission,
            stop_loss: stop_loss_level(fill, direction, config.stop_loss_pct),
            take_profit: take_profit_level(fill, direction, config.take_profit_pct),
            bars_held: 0,
            last_price: price,
            unrealized_pnl: 0.0,
            status: PositionStatus::Open,
        };
        tracing::debug!(
            bar = bar_index,
            %direction,
            fill,
            quantity,
            committed,
            "position opened"
        );
        self.positions.push(position);
        self.positions.last()
    }

    /// Revalue every open position at `price` and advance its holding counter.
    pub fn mark_to_market(&mut self, price: f64) {
        for pos in &mut self.positions {
            pos.last_price = price;
            pos.unrealized_pnl = pos.unrealized_pnl(price);
            pos.bars_held += 1;
        }
    }

    /// First trigger that fires for `position` on `bar`, in precedence order.
    pub fn exit_trigger(position: &Position, bar: &Bar, config: &BacktestConfig) -> Option<ExitReason> {
        if position.should_stop_loss(bar.price) {
            return Some(ExitReason::StopLoss);
        }
        if position.should_take_profit(bar.price) {
            return Some(ExitReason::TakeProfit);
        }
        if config.max_holding_period > 0 && position.bars_held >= config.max_holding_period {
            return Some(ExitReason::MaxHolding);
        }
        if config.force_close_on_signal
            && bar.exit == position.direction.closing_signal()
            && position.bars_held >= config.min_holding_period
        {
            return Some(ExitReason::Signal);
        }
        None
    }

    /// Close every position whose trigger fires on `bar`. Returns the number closed.
    pub fn evaluate_exits(&mut self, bar: &Bar, config: &BacktestConfig) -> usize {
        let mut closed = 0;
        let mut i = 0;
        while i < self.positions.len() {
            match Self::exit_trigger(&self.positions[i], bar, config) {
                Some(reason) => {
                    let position = self.positions.remove(i);
                    self.close(position, bar.price, bar.index, bar.date, reason, config);
                    closed += 1;
                }
                None => i += 1,
            }
        }
        closed
    }

    /// Settle `position` at `market_price` and append the trade to the log.
    pub fn close(
        &mut self,
        position: Position,
        market_price: f64,
        bar_index: usize,
        date: NaiveDateTime,
        reason: ExitReason,
        config: &BacktestConfig,
    ) -> &Trade {
        let exit_price = apply_exit_slippage(market_price, position.direction, config.slippage_pct);
        let exit_commission = calculate_commission(position.quantity * exit_price, config.commission_pct);
        let proceeds = position.market_value(exit_price) - exit_commission;
        let profit = proceeds - position.committed;

        self.balance += proceeds;

        tracing::debug!(
            bar = bar_index,
            direction = %position.direction,
            reason = %reason,
            exit_price,
            profit,
            "position closed"
        );

        self.trades.push(Trade {
            direction: position.direction,
            entry_index: position.entry_index,
            exit_index: bar_index,
            entry_date: position.entry_date,
            exit_date: date,
            entry_price: position.entry_price,
            exit_price,
            quantity: position.quantity,
            entry_commission: position.entry_commission,
            exit_commission,
            profit,
            profit_pct: profit / position.committed * 100.0,
            holding_bars: bar_index - position.entry_index,
            exit_reason: reason,
        });
        &self.trades[self.trades.len() - 1]
    }

    /// Liquidate everything at the final bar. Returns the number closed.
    pub fn force_close_all(
        &mut self,
        last_price: f64,
        last_index: usize,
        last_date: NaiveDateTime,
        config: &BacktestConfig,
    ) -> usize {
        let open = std::mem::take(&mut self.positions);
        let count = open.len();
        for position in open {
            self.close(position, last_price, last_index, last_date, ExitReason::EndOfData, config);
        }
        count
    }

    /// Hand over the trade log at the end of a run.
    pub fn into_trades(self) -> Vec<Trade> {
        self.trades
    }
}
