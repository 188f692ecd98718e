use error_stack::Report;

use crate::error::IndicatorError;
use crate::indicator::{Indicator, close_prices, ensure_period, mean, rolling};
use crate::model::Candle;

/// RSI (Relative Strength Index) from simple rolling averages of gains and
/// losses over the trailing `period` differences.
pub struct Rsi {
    period: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        ensure_period(period)?;
        Ok(Self { period })
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn calculate_prices(&self, prices: &[f64]) -> Vec<Option<f64>> {
        let deltas: Vec<Option<f64>> = std::iter::once(None)
            .chain(prices.windows(2).map(|w| Some(w[1] - w[0])))
            .take(prices.len())
            .collect();

        let gains: Vec<Option<f64>> = deltas.iter().map(|d| d.map(|d| d.max(0.0))).collect();
        let losses: Vec<Option<f64>> = deltas.iter().map(|d| d.map(|d| (-d).max(0.0))).collect();

        let avg_gain = rolling(&gains, self.period, |w| Some(mean(w)));
        let avg_loss = rolling(&losses, self.period, |w| Some(mean(w)));

        avg_gain
            .into_iter()
            .zip(avg_loss)
            .map(|(gain, loss)| rsi_value(gain?, loss?))
            .collect()
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        "rsi"
    }

    fn required_candles(&self) -> usize {
        self.period + 1
    }

    fn calculate(&self, candles: &[Candle]) -> Vec<Option<f64>> {
        self.calculate_prices(&close_prices(candles))
    }
}

/// A window with no losses saturates at 100; a window with no movement at
/// all has no defined strength.
fn rsi_value(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if avg_loss == 0.0 {
        return (avg_gain > 0.0).then_some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}
