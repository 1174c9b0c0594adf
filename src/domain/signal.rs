//! Signal ingestion and the canonical per-bar input feed.
//!
//! Raw signals arrive either as integers (-1/0/1) or as boolean flags. They
//! are resolved once into [`SignalSeries`] and normalised to `i8` before the
//! engine sees them; [`SignalFeed`] is the only input type the engine accepts.

use chrono::NaiveDateTime;

use super::config::TradeType;
use super::error::BacktestError;

/// Whether a series holds entry or exit signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Entry,
    Exit,
}

impl SignalKind {
    fn field(self) -> &'static str {
        match self {
            SignalKind::Entry => "entry",
            SignalKind::Exit => "exit",
        }
    }
}

/// A signal column as supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalSeries {
    RawInteger(Vec<i64>),
    Boolean(Vec<bool>),
}

impl SignalSeries {
    pub fn len(&self) -> usize {
        match self {
            SignalSeries::RawInteger(v) => v.len(),
            SignalSeries::Boolean(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Normalise to the canonical -1/0/1 encoding.
    ///
    /// Booleans take their direction from the trade type: under `long` an
    /// entry flag means +1 and an exit flag -1, under `short` the reverse.
    /// `long_short` cannot infer a side from a flag and is rejected.
    pub fn normalize(&self, kind: SignalKind, trade_type: TradeType) -> Result<Vec<i8>, BacktestError> {
        match self {
            SignalSeries::RawInteger(values) => values
                .iter()
                .enumerate()
                .map(|(i, &v)| match v {
                    -1 => Ok(-1),
                    0 => Ok(0),
                    1 => Ok(1),
                    other => Err(BacktestError::data(
                        i,
                        kind.field(),
                        format!("signal value {other} is not one of -1, 0, 1"),
                    )),
                })
                .collect(),
            SignalSeries::Boolean(flags) => {
                let on: i8 = match (trade_type, kind) {
                    (TradeType::Long, SignalKind::Entry) | (TradeType::Short, SignalKind::Exit) => 1,
                    (TradeType::Long, SignalKind::Exit) | (TradeType::Short, SignalKind::Entry) => -1,
                    (TradeType::LongShort, _) => {
                        return Err(BacktestError::invalid(
                            kind.field(),
                            "boolean signals are ambiguous in long_short mode; supply -1/0/1",
                        ));
                    }
                };
                Ok(flags.iter().map(|&f| if f { on } else { 0 }).collect())
            }
        }
    }
}

/// Aligned per-bar input: dates, reference prices and canonical signals.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalFeed {
    dates: Vec<NaiveDateTime>,
    prices: Vec<f64>,
    entries: Vec<i8>,
    exits: Vec<i8>,
}

impl SignalFeed {
    /// Build a feed, checking shape and data quality up front.
    ///
    /// Fails on empty input, length mismatches, non-finite or non-positive
    /// prices, dates that are not strictly increasing and out-of-range
    /// signal values.
    pub fn new(
        dates: Vec<NaiveDateTime>,
        prices: Vec<f64>,
        entries: Vec<i8>,
        exits: Vec<i8>,
    ) -> Result<Self, BacktestError> {
        let n = prices.len();
        if n == 0 {
            return Err(BacktestError::EmptySeries);
        }
        for (field, len) in [("entries", entries.len()), ("exits", exits.len()), ("dates", dates.len())] {
            if len != n {
                return Err(BacktestError::ShapeMismatch {
                    field: field.to_string(),
                    expected: n,
                    actual: len,
                });
            }
        }
        for (i, &p) in prices.iter().enumerate() {
            if !p.is_finite() {
                return Err(BacktestError::data(i, "price", "price is not finite"));
            }
            if p <= 0.0 {
                return Err(BacktestError::data(i, "price", "price must be positive"));
            }
        }
        for (i, w) in dates.windows(2).enumerate() {
            if w[1] <= w[0] {
                return Err(BacktestError::data(
                    i + 1,
                    "date",
                    format!("date {} does not follow {}", w[1], w[0]),
                ));
            }
        }
        for (field, series) in [("entry", &entries), ("exit", &exits)] {
            if let Some(i) = series.iter().position(|s| !(-1..=1).contains(s)) {
                return Err(BacktestError::data(
                    i,
                    field,
                    format!("signal value {} is not one of -1, 0, 1", series[i]),
                ));
            }
        }
        Ok(SignalFeed {
            dates,
            prices,
            entries,
            exits,
        })
    }

    /// Build a feed from uncanonicalised signal columns.
    pub fn from_series(
        dates: Vec<NaiveDateTime>,
        prices: Vec<f64>,
        entries: &SignalSeries,
        exits: &SignalSeries,
        trade_type: TradeType,
    ) -> Result<Self, BacktestError> {
        let entries = entries.normalize(SignalKind::Entry, trade_type)?;
        let exits = exits.normalize(SignalKind::Exit, trade_type)?;
        SignalFeed::new(dates, prices, entries, exits)
    }

    /// Same dates and prices with a different signal set.
    pub fn with_signals(&self, entries: Vec<i8>, exits: Vec<i8>) -> Result<Self, BacktestError> {
        SignalFeed::new(self.dates.clone(), self.prices.clone(), entries, exits)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDateTime] {
        &self.dates
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn entries(&self) -> &[i8] {
        &self.entries
    }

    pub fn exits(&self) -> &[i8] {
        &self.exits
    }

    pub fn bar(&self, index: usize) -> Bar {
        Bar {
            index,
            date: self.dates[index],
            price: self.prices[index],
            entry: self.entries[index],
            exit: self.exits[index],
        }
    }

    pub fn bars(&self) -> impl Iterator<Item = Bar> + '_ {
        (0..self.len()).map(|i| self.bar(i))
    }
}

/// One bar of a [`SignalFeed`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub index: usize,
    pub date: NaiveDateTime,
    pub price: f64,
    pub entry: i8,
    pub exit: i8,
}
