pub mod atr;
pub mod bollinger;
pub mod ma;
pub mod macd;
pub mod obv;
pub mod rsi;
pub mod stoch_rsi;
pub mod volume;

use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::model::Candle;

/// A technical analysis indicator that operates on a slice of candles.
///
/// Candles must be in ascending chronological order (oldest first).
pub trait Indicator: Send + Sync {
    /// Unique name of this indicator (e.g., "rsi", "sma").
    fn name(&self) -> &str;

    /// Minimum number of candles required to produce at least one defined value.
    fn required_candles(&self) -> usize;

    /// Calculate indicator values from candles.
    ///
    /// Returns exactly one value per input candle. Rows without enough
    /// history are `None`; a series shorter than the lookback yields all
    /// `None` rather than an error.
    fn calculate(&self, candles: &[Candle]) -> Vec<Option<f64>>;
}

/// Extract close prices from a slice of candles.
pub fn close_prices(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// Extract volumes from a slice of candles.
pub fn volumes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.volume).collect()
}

/// Lift a fully defined column into the optional representation.
pub fn defined(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().copied().map(Some).collect()
}

/// Apply `f` over every trailing window of `period` values.
///
/// A row is `None` when fewer than `period` values precede it, when any value
/// inside its window is `None`, or when `f` itself declines to produce one.
pub fn rolling<F>(values: &[Option<f64>], period: usize, f: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    let mut window = Vec::with_capacity(period);
    (0..values.len())
        .map(|i| {
            if period == 0 || i + 1 < period {
                return None;
            }
            window.clear();
            for value in &values[i + 1 - period..=i] {
                window.push((*value)?);
            }
            f(&window)
        })
        .collect()
}

pub fn mean(window: &[f64]) -> f64 {
    window.iter().sum::<f64>() / window.len() as f64
}

pub(crate) fn ensure_period(period: usize) -> Result<(), Report<IndicatorError>> {
    if period == 0 {
        bail!(IndicatorError::InvalidParameter {
            name: "period must be > 0".into(),
        });
    }
    Ok(())
}
