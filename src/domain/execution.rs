//! Fill cost model: slippage and commission.
//!
//! Slippage always moves the fill against the trader. Buying (long entry,
//! short cover) fills higher, selling (long exit, short entry) fills lower.

use super::position::Direction;

/// Commission on a notional value. `commission_pct` is a fraction.
pub fn calculate_commission(notional: f64, commission_pct: f64) -> f64 {
    notional * commission_pct
}

/// Entry fill: long buys at `price * (1 + s)`, short sells at `price * (1 - s)`.
pub fn apply_entry_slippage(market_price: f64, direction: Direction, slippage_pct: f64) -> f64 {
    match direction {
        Direction::Long => market_price * (1.0 + slippage_pct),
        Direction::Short => market_price * (1.0 - slippage_pct),
    }
}

/// Exit fill: long sells at `price * (1 - s)`, short covers at `price * (1 + s)`.
pub fn apply_exit_slippage(market_price: f64, direction: Direction, slippage_pct: f64) -> f64 {
    match direction {
        Direction::Long => market_price * (1.0 - slippage_pct),
        Direction::Short => market_price * (1.0 + slippage_pct),
    }
}

/// Stop-loss level for a fill, 0.0 when disabled.
pub fn stop_loss_level(fill: f64, direction: Direction, stop_loss_pct: f64) -> f64 {
    if stop_loss_pct <= 0.0 {
        return 0.0;
    }
    fill * (1.0 - direction.sign() * stop_loss_pct)
}

/// Take-profit level for a fill, 0.0 when disabled.
pub fn take_profit_level(fill: f64, direction: Direction, take_profit_pct: f64) -> f64 {
    if take_profit_pct <= 0.0 {
        return 0.0;
    }
    fill * (1.0 + direction.sign() * take_profit_pct)
}

/// Quantity bought with `committed` capital when commission is paid on top of the notional.
pub fn quantity_for(committed: f64, fill: f64, commission_pct: f64) -> f64 {
    committed / (fill * (1.0 + commission_pct))
}
