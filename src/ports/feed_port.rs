//! Signal feed port trait.

use crate::domain::config::{PriceField, TradeType};
use crate::domain::error::BacktestError;
use crate::domain::signal::SignalFeed;

/// Source of aligned price and signal data for one instrument.
pub trait FeedPort {
    /// Load the feed, taking prices from `price_field` and normalising
    /// signals under `trade_type`.
    fn load_feed(&self, price_field: PriceField, trade_type: TradeType) -> Result<SignalFeed, BacktestError>;
}
