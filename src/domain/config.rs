//! Backtest parameters and the closed enums selected from them.
//!
//! String-typed settings (`trade_type`, `timeframe`, `price_field`) are parsed
//! once when the config is built. The engine only ever sees the enums.

use std::fmt;
use std::str::FromStr;

use super::error::BacktestError;
use super::position::Direction;

/// Which sides a strategy may trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeType {
    Long,
    Short,
    LongShort,
}

impl TradeType {
    pub fn permits(self, direction: Direction) -> bool {
        match self {
            TradeType::Long => direction == Direction::Long,
            TradeType::Short => direction == Direction::Short,
            TradeType::LongShort => true,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TradeType::Long => "long",
            TradeType::Short => "short",
            TradeType::LongShort => "long_short",
        }
    }
}

impl FromStr for TradeType {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "long" => Ok(TradeType::Long),
            "short" => Ok(TradeType::Short),
            "long_short" => Ok(TradeType::LongShort),
            other => Err(BacktestError::invalid(
                "trade_type",
                format!("unsupported trade_type '{other}' (expected long, short or long_short)"),
            )),
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bar interval, used only to annualise metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
    W1,
}

impl Timeframe {
    pub fn periods_per_year(self) -> f64 {
        match self {
            Timeframe::M1 => 365.0 * 1440.0,
            Timeframe::M5 => 365.0 * 288.0,
            Timeframe::M15 => 365.0 * 96.0,
            Timeframe::M30 => 365.0 * 48.0,
            Timeframe::H1 => 365.0 * 24.0,
            Timeframe::H4 => 365.0 * 6.0,
            Timeframe::D1 => 365.0,
            Timeframe::W1 => 52.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
            Timeframe::W1 => "1w",
        }
    }
}

impl FromStr for Timeframe {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1m" => Ok(Timeframe::M1),
            "5m" => Ok(Timeframe::M5),
            "15m" => Ok(Timeframe::M15),
            "30m" => Ok(Timeframe::M30),
            "1h" => Ok(Timeframe::H1),
            "4h" => Ok(Timeframe::H4),
            "1d" => Ok(Timeframe::D1),
            "1w" => Ok(Timeframe::W1),
            other => Err(BacktestError::invalid(
                "timeframe",
                format!("unsupported timeframe '{other}'"),
            )),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OHLC column used as the per-bar reference price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
}

impl PriceField {
    pub fn as_str(self) -> &'static str {
        match self {
            PriceField::Open => "open",
            PriceField::High => "high",
            PriceField::Low => "low",
            PriceField::Close => "close",
        }
    }
}

impl FromStr for PriceField {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(PriceField::Open),
            "high" => Ok(PriceField::High),
            "low" => Ok(PriceField::Low),
            "close" => Ok(PriceField::Close),
            other => Err(BacktestError::invalid(
                "price_field",
                format!("unsupported price_field '{other}'"),
            )),
        }
    }
}

/// Parameters of a single backtest run.
///
/// Percentages are fractions: `commission_pct = 0.001` is 0.1 %,
/// `position_size_pct = 1.0` commits the whole balance.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub commission_pct: f64,
    pub slippage_pct: f64,
    pub position_size_pct: f64,
    pub take_profit_pct: f64,
    pub stop_loss_pct: f64,
    pub min_holding_period: usize,
    pub max_holding_period: usize,
    pub timeframe: Timeframe,
    pub trade_type: TradeType,
    pub price_field: PriceField,
    pub max_positions: usize,
    pub force_close_on_signal: bool,
    pub risk_free_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: 10_000.0,
            commission_pct: 0.001,
            slippage_pct: 0.0,
            position_size_pct: 1.0,
            take_profit_pct: 0.0,
            stop_loss_pct: 0.0,
            min_holding_period: 1,
            max_holding_period: 0,
            timeframe: Timeframe::D1,
            trade_type: TradeType::Long,
            price_field: PriceField::Close,
            max_positions: 1,
            force_close_on_signal: true,
            risk_free_rate: 0.0,
        }
    }
}

impl BacktestConfig {
    /// Range checks on the numeric fields. Enum fields are valid by construction.
    pub fn validate(&self) -> Result<(), BacktestError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(BacktestError::invalid(
                "initial_capital",
                "initial_capital must be positive",
            ));
        }
        non_negative("commission_pct", self.commission_pct)?;
        non_negative("slippage_pct", self.slippage_pct)?;
        non_negative("take_profit_pct", self.take_profit_pct)?;
        non_negative("stop_loss_pct", self.stop_loss_pct)?;
        if self.commission_pct >= 1.0 {
            return Err(BacktestError::invalid(
                "commission_pct",
                "commission_pct must be below 1.0",
            ));
        }
        if self.slippage_pct >= 1.0 {
            return Err(BacktestError::invalid(
                "slippage_pct",
                "slippage_pct must be below 1.0",
            ));
        }
        if !self.position_size_pct.is_finite()
            || self.position_size_pct <= 0.0
            || self.position_size_pct > 1.0
        {
            return Err(BacktestError::invalid(
                "position_size_pct",
                "position_size_pct must be in (0, 1]",
            ));
        }
        if self.min_holding_period < 1 {
            return Err(BacktestError::invalid(
                "min_holding_period",
                "min_holding_period must be at least 1",
            ));
        }
        if !self.risk_free_rate.is_finite() || !(0.0..1.0).contains(&self.risk_free_rate) {
            return Err(BacktestError::invalid(
                "risk_free_rate",
                "risk_free_rate must be in [0, 1)",
            ));
        }
        Ok(())
    }
}

fn non_negative(key: &str, value: f64) -> Result<(), BacktestError> {
    if !value.is_finite() || value < 0.0 {
        return Err(BacktestError::invalid(key, format!("{key} must be non-negative")));
    }
    Ok(())
}
