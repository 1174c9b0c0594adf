#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use sigtrader::domain::config::{BacktestConfig, PriceField, TradeType};
use sigtrader::domain::error::BacktestError;
use sigtrader::domain::signal::SignalFeed;
use sigtrader::ports::feed_port::FeedPort;
use std::io::Write;

/// In-memory feed that ignores the price field and returns a prepared series.
pub struct MockFeedPort {
    pub feed: Option<SignalFeed>,
    pub error: Option<String>,
}

impl MockFeedPort {
    pub fn new(feed: SignalFeed) -> Self {
        Self {
            feed: Some(feed),
            error: None,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            feed: None,
            error: Some(reason.to_string()),
        }
    }
}

impl FeedPort for MockFeedPort {
    fn load_feed(
        &self,
        _price_field: PriceField,
        _trade_type: TradeType,
    ) -> Result<SignalFeed, BacktestError> {
        if let Some(reason) = &self.error {
            return Err(BacktestError::Feed {
                reason: reason.clone(),
            });
        }
        self.feed.clone().ok_or(BacktestError::EmptySeries)
    }
}

pub fn date(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + Duration::days(i as i64)
}

pub fn dates(n: usize) -> Vec<NaiveDateTime> {
    (0..n).map(date).collect()
}

pub fn make_feed(prices: &[f64], entries: &[i8], exits: &[i8]) -> SignalFeed {
    SignalFeed::new(
        dates(prices.len()),
        prices.to_vec(),
        entries.to_vec(),
        exits.to_vec(),
    )
    .unwrap()
}

/// Feed with a single entry signal on `entry_bar` and no exits.
pub fn entry_at(prices: &[f64], entry_bar: usize, signal: i8) -> SignalFeed {
    let mut entries = vec![0; prices.len()];
    entries[entry_bar] = signal;
    make_feed(prices, &entries, &vec![0; prices.len()])
}

pub fn zero_cost_config() -> BacktestConfig {
    BacktestConfig {
        initial_capital: 10_000.0,
        commission_pct: 0.0,
        slippage_pct: 0.0,
        ..Default::default()
    }
}

pub fn write_temp_file(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub const FEED_CSV: &str = "date,open,high,low,close,volume,entry,exit\n\
    2024-01-01,99.0,101.0,98.0,100.0,1000,1,0\n\
    2024-01-02,100.0,104.0,99.0,103.0,1200,0,0\n\
    2024-01-03,103.0,106.0,101.0,105.0,900,0,0\n\
    2024-01-04,105.0,106.0,96.0,97.0,1500,0,0\n\
    2024-01-05,97.0,111.0,97.0,110.0,1100,0,-1\n\
    2024-01-06,110.0,112.0,108.0,111.0,800,1,0\n\
    2024-01-07,111.0,115.0,110.0,114.0,950,0,0\n";
