//! Open positions and closed trade records.

use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    /// Map a canonical entry signal to a direction. 0 means no entry.
    pub fn from_entry_signal(signal: i8) -> Option<Direction> {
        match signal {
            1 => Some(Direction::Long),
            -1 => Some(Direction::Short),
            _ => None,
        }
    }

    /// Exit signal value that closes a position of this direction.
    pub fn closing_signal(self) -> i8 {
        match self {
            Direction::Long => -1,
            Direction::Short => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Signal,
    TakeProfit,
    StopLoss,
    MaxHolding,
    EndOfData,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::Signal => "signal",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::StopLoss => "stop_loss",
            ExitReason::MaxHolding => "max_holding",
            ExitReason::EndOfData => "end_of_data",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub direction: Direction,
    pub entry_index: usize,
    pub entry_date: NaiveDateTime,
    /// Slippage-adjusted fill.
    pub entry_price: f64,
    pub quantity: f64,
    /// Capital taken from the balance at entry, commission included.
    pub committed: f64,
    pub entry_commission: f64,
    /// 0.0 when disabled.
    pub stop_loss: f64,
    /// 0.0 when disabled.
    pub take_profit: f64,
    pub bars_held: usize,
    pub last_price: f64,
    pub unrealized_pnl: f64,
    pub status: PositionStatus,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.direction == Direction::Long
    }

    pub fn is_short(&self) -> bool {
        self.direction == Direction::Short
    }

    /// Entry notional excluding commission.
    pub fn notional(&self) -> f64 {
        self.quantity * self.entry_price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.direction.sign() * self.quantity * (price - self.entry_price)
    }

    /// Escrowed notional plus unrealised P/L. Reduces to `quantity * price` for longs.
    pub fn market_value(&self, price: f64) -> f64 {
        self.notional() + self.unrealized_pnl(price)
    }

    pub fn should_stop_loss(&self, price: f64) -> bool {
        if self.stop_loss == 0.0 {
            return false;
        }
        if self.is_long() {
            price <= self.stop_loss
        } else {
            price >= self.stop_loss
        }
    }

    pub fn should_take_profit(&self, price: f64) -> bool {
        if self.take_profit == 0.0 {
            return false;
        }
        if self.is_long() {
            price >= self.take_profit
        } else {
            price <= self.take_profit
        }
    }
}

/// Immutable record of a closed position.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub direction: Direction,
    pub entry_index: usize,
    pub exit_index: usize,
    pub entry_date: NaiveDateTime,
    pub exit_date: NaiveDateTime,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    pub entry_commission: f64,
    pub exit_commission: f64,
    /// Net of both commissions.
    pub profit: f64,
    /// Relative to committed capital.
    pub profit_pct: f64,
    pub holding_bars: usize,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.profit > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.profit < 0.0
    }
}
