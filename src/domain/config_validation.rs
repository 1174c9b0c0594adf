//! Building and validating a [`BacktestConfig`] from the `[backtest]` section.
//!
//! Missing keys take the [`BacktestConfig::default`] value. Integer keys must
//! be whole numbers and are checked for sign here because the domain type
//! stores them unsigned.

use crate::domain::config::{BacktestConfig, PriceField, Timeframe, TradeType};
use crate::domain::error::BacktestError;
use crate::ports::config_port::ConfigPort;

const SECTION: &str = "backtest";

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, BacktestError> {
    validate_numeric_values(config)?;
    let defaults = BacktestConfig::default();
    let built = BacktestConfig {
        initial_capital: config.get_double(SECTION, "initial_capital", defaults.initial_capital),
        commission_pct: config.get_double(SECTION, "commission_pct", defaults.commission_pct),
        slippage_pct: config.get_double(SECTION, "slippage_pct", defaults.slippage_pct),
        position_size_pct: config.get_double(
            SECTION,
            "position_size_pct",
            defaults.position_size_pct,
        ),
        take_profit_pct: config.get_double(SECTION, "take_profit_pct", defaults.take_profit_pct),
        stop_loss_pct: config.get_double(SECTION, "stop_loss_pct", defaults.stop_loss_pct),
        min_holding_period: read_count(config, "min_holding_period", defaults.min_holding_period)?,
        max_holding_period: read_count(config, "max_holding_period", defaults.max_holding_period)?,
        timeframe: read_enum::<Timeframe>(config, "timeframe")?.unwrap_or(defaults.timeframe),
        trade_type: read_enum::<TradeType>(config, "trade_type")?.unwrap_or(defaults.trade_type),
        price_field: read_enum::<PriceField>(config, "price_field")?
            .unwrap_or(defaults.price_field),
        max_positions: read_count(config, "max_positions", defaults.max_positions)?,
        force_close_on_signal: config.get_bool(
            SECTION,
            "force_close_on_signal",
            defaults.force_close_on_signal,
        ),
        risk_free_rate: config.get_double(SECTION, "risk_free_rate", defaults.risk_free_rate),
    };
    built.validate()?;
    Ok(built)
}

/// Values that are present but not numbers would otherwise silently become defaults.
fn validate_numeric_values(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    const NUMERIC_KEYS: [&str; 11] = [
        "initial_capital",
        "commission_pct",
        "slippage_pct",
        "position_size_pct",
        "take_profit_pct",
        "stop_loss_pct",
        "risk_free_rate",
        "min_holding_period",
        "max_holding_period",
        "max_positions",
        "force_close_on_signal",
    ];
    const INTEGER_KEYS: [&str; 3] = ["min_holding_period", "max_holding_period", "max_positions"];
    for key in NUMERIC_KEYS {
        let Some(raw) = config.get_string(SECTION, key) else {
            continue;
        };
        let raw = raw.trim();
        let ok = if key == "force_close_on_signal" {
            matches!(
                raw.to_lowercase().as_str(),
                "true" | "false" | "yes" | "no" | "1" | "0"
            )
        } else if INTEGER_KEYS.contains(&key) {
            raw.parse::<i64>().is_ok()
        } else {
            raw.parse::<f64>().is_ok()
        };
        if !ok {
            return Err(BacktestError::invalid(
                key,
                format!("'{raw}' is not a valid value for {key}"),
            ));
        }
    }
    Ok(())
}

fn read_count(config: &dyn ConfigPort, key: &str, default: usize) -> Result<usize, BacktestError> {
    let value = config.get_int(SECTION, key, default as i64);
    usize::try_from(value)
        .map_err(|_| BacktestError::invalid(key, format!("{key} must be non-negative")))
}

fn read_enum<T>(config: &dyn ConfigPort, key: &str) -> Result<Option<T>, BacktestError>
where
    T: std::str::FromStr<Err = BacktestError>,
{
    match config.get_string(SECTION, key) {
        Some(raw) if !raw.trim().is_empty() => raw.parse().map(Some),
        _ => Ok(None),
    }
}
