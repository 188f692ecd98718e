use std::path::Path;

use chrono::{DateTime, Utc};
use error_stack::{Report, ResultExt};
use serde::Deserialize;
use tracing::debug;

use crate::error::FeedError;
use crate::model::{Candle, CandleSeries};

/// Exchange exports carry either epoch milliseconds or RFC 3339 strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeedTimestamp {
    Millis(i64),
    Rfc3339(DateTime<Utc>),
}

#[derive(Debug, Deserialize)]
struct FeedCandle {
    #[serde(alias = "time", alias = "open_time")]
    timestamp: FeedTimestamp,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(alias = "vol")]
    volume: f64,
}

impl FeedCandle {
    fn into_candle(self, index: usize) -> Result<Candle, Report<FeedError>> {
        let timestamp = match self.timestamp {
            FeedTimestamp::Rfc3339(ts) => ts,
            FeedTimestamp::Millis(ms) => DateTime::from_timestamp_millis(ms).ok_or_else(|| {
                Report::new(FeedError::Parse)
                    .attach(format!("candle {index}: timestamp {ms} out of range"))
            })?,
        };
        Ok(Candle {
            timestamp,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        })
    }
}

/// Read a JSON array of candles from `path` into a validated series.
pub fn load_candles(path: &Path) -> Result<CandleSeries, Report<FeedError>> {
    let content = std::fs::read_to_string(path)
        .change_context(FeedError::ReadFile)
        .attach_with(|| format!("path: {}", path.display()))?;

    let series = parse_candles(&content).attach_with(|| format!("path: {}", path.display()))?;

    debug!(path = %path.display(), candles = series.len(), "loaded candle feed");
    Ok(series)
}

/// Parse candle JSON already in memory.
pub fn parse_candles(json: &str) -> Result<CandleSeries, Report<FeedError>> {
    let raw: Vec<FeedCandle> = serde_json::from_str(json).change_context(FeedError::Parse)?;

    let candles = raw
        .into_iter()
        .enumerate()
        .map(|(index, row)| row.into_candle(index))
        .collect::<Result<Vec<_>, _>>()?;

    CandleSeries::new(candles).change_context(FeedError::InvalidSeries)
}
