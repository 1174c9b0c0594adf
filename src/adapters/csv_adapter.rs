//! CSV signal feed adapter.
//!
//! Expects a header row with `date`, the four OHLC columns, an optional
//! `volume`, and `entry` / `exit` signal columns. Columns are located by
//! name, so their order does not matter.

use crate::domain::config::{PriceField, TradeType};
use crate::domain::error::BacktestError;
use crate::domain::signal::{SignalFeed, SignalSeries};
use crate::ports::feed_port::FeedPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::path::PathBuf;

pub struct CsvFeedAdapter {
    path: PathBuf,
}

impl CsvFeedAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn feed_error(&self, reason: impl std::fmt::Display) -> BacktestError {
        BacktestError::Feed {
            reason: format!("{}: {}", self.path.display(), reason),
        }
    }
}

/// Raw columns of the feed before typing.
struct Columns {
    date: usize,
    price: usize,
    entry: usize,
    exit: usize,
}

impl Columns {
    fn locate(headers: &csv::StringRecord, price_field: PriceField) -> Result<Self, String> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| format!("missing {name} column"))
        };
        // The unused OHLC columns must still be present.
        for name in ["open", "high", "low", "close"] {
            find(name)?;
        }
        Ok(Columns {
            date: find("date")?,
            price: find(price_field.as_str())?,
            entry: find("entry")?,
            exit: find("exit")?,
        })
    }
}

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// A column is boolean when its first value is `true` or `false`; every
/// other value must then agree.
fn parse_signal_column(values: &[String], field: &str) -> Result<SignalSeries, BacktestError> {
    let boolean = values.first().is_some_and(|v| parse_flag(v).is_some());
    if boolean {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                parse_flag(v).ok_or_else(|| {
                    BacktestError::data(i, field, format!("expected true/false, got '{v}'"))
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(SignalSeries::Boolean)
    } else {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                v.trim().parse::<i64>().map_err(|_| {
                    BacktestError::data(i, field, format!("invalid signal value '{v}'"))
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(SignalSeries::RawInteger)
    }
}

impl FeedPort for CsvFeedAdapter {
    fn load_feed(
        &self,
        price_field: PriceField,
        trade_type: TradeType,
    ) -> Result<SignalFeed, BacktestError> {
        let mut rdr = csv::Reader::from_path(&self.path).map_err(|e| self.feed_error(e))?;
        let headers = rdr.headers().map_err(|e| self.feed_error(e))?.clone();
        let columns = Columns::locate(&headers, price_field).map_err(|e| self.feed_error(e))?;

        let mut dates = Vec::new();
        let mut prices = Vec::new();
        let mut entries = Vec::new();
        let mut exits = Vec::new();

        for (i, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.feed_error(format!("CSV parse error: {e}")))?;
            let field = |col: usize| record.get(col).unwrap_or("").to_string();

            let raw_date = field(columns.date);
            let date = parse_date(&raw_date)
                .ok_or_else(|| BacktestError::data(i, "date", format!("invalid date '{raw_date}'")))?;
            let raw_price = field(columns.price);
            let price: f64 = raw_price.trim().parse().map_err(|_| {
                BacktestError::data(
                    i,
                    price_field.as_str(),
                    format!("invalid {} value '{raw_price}'", price_field.as_str()),
                )
            })?;

            dates.push(date);
            prices.push(price);
            entries.push(field(columns.entry));
            exits.push(field(columns.exit));
        }

        if prices.is_empty() {
            return Err(BacktestError::EmptySeries);
        }
        let entries = parse_signal_column(&entries, "entry")?;
        let exits = parse_signal_column(&exits, "exit")?;
        tracing::debug!(path = %self.path.display(), bars = prices.len(), "loaded signal feed");
        SignalFeed::from_series(dates, prices, &entries, &exits, trade_type)
    }
}
