use chrono::{DateTime, Utc};
use error_stack::{Report, bail};
use serde::{Deserialize, Serialize};

use crate::error::SeriesError;

/// One OHLCV observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Candles in strictly ascending timestamp order.
///
/// The only way to build one is [`CandleSeries::new`], which rejects
/// out-of-order timestamps and malformed prices before they reach the
/// indicator pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(candles: Vec<Candle>) -> Result<Self, Report<SeriesError>> {
        for (index, candle) in candles.iter().enumerate() {
            validate_candle(index, candle)?;
            if index > 0 && candle.timestamp <= candles[index - 1].timestamp {
                bail!(SeriesError::NotAscending { index });
            }
        }
        Ok(Self { candles })
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Keep only the most recent `lookback` candles.
    pub fn tail(&self, lookback: usize) -> Self {
        let start = self.candles.len().saturating_sub(lookback);
        Self {
            candles: self.candles[start..].to_vec(),
        }
    }
}

fn validate_candle(index: usize, candle: &Candle) -> Result<(), Report<SeriesError>> {
    let columns = [
        ("open", candle.open),
        ("high", candle.high),
        ("low", candle.low),
        ("close", candle.close),
        ("volume", candle.volume),
    ];
    for (column, value) in columns {
        if !value.is_finite() || value < 0.0 {
            bail!(SeriesError::InvalidValue { index, column });
        }
    }
    if candle.high < candle.low {
        bail!(SeriesError::InvertedRange { index });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candle(day: u32, close: f64) -> Candle {
        Candle {
            timestamp: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 10.0,
        }
    }

    #[test]
    fn ascending_series_accepted() {
        let series = CandleSeries::new(vec![candle(1, 10.0), candle(2, 11.0)]).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.last().unwrap().close, 11.0);
    }

    #[test]
    fn duplicate_timestamp_rejected() {
        let result = CandleSeries::new(vec![candle(1, 10.0), candle(1, 11.0)]);
        assert!(matches!(
            result.unwrap_err().current_context(),
            SeriesError::NotAscending { index: 1 }
        ));
    }

    #[test]
    fn descending_series_rejected() {
        assert!(CandleSeries::new(vec![candle(2, 10.0), candle(1, 11.0)]).is_err());
    }

    #[test]
    fn negative_volume_rejected() {
        let mut bad = candle(1, 10.0);
        bad.volume = -1.0;
        assert!(matches!(
            CandleSeries::new(vec![bad]).unwrap_err().current_context(),
            SeriesError::InvalidValue {
                column: "volume",
                ..
            }
        ));
    }

    #[test]
    fn nan_close_rejected() {
        let mut bad = candle(1, 10.0);
        bad.close = f64::NAN;
        assert!(CandleSeries::new(vec![bad]).is_err());
    }

    #[test]
    fn inverted_range_rejected() {
        let mut bad = candle(1, 10.0);
        bad.high = 5.0;
        assert!(CandleSeries::new(vec![bad]).is_err());
    }

    #[test]
    fn tail_keeps_most_recent() {
        let series =
            CandleSeries::new(vec![candle(1, 1.0), candle(2, 2.0), candle(3, 3.0)]).unwrap();
        let tail = series.tail(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail.candles()[0].close, 2.0);
        assert_eq!(series.tail(10).len(), 3);
    }

    #[test]
    fn candle_serde_round_trip() {
        let json = serde_json::to_string(&candle(5, 42.0)).unwrap();
        let parsed: Candle = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, candle(5, 42.0));
    }
}
