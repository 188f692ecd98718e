use error_stack::Report;

use crate::error::IndicatorError;
use crate::indicator::{Indicator, close_prices, defined, ensure_period, mean, rolling};
use crate::model::Candle;

/// Simple Moving Average.
pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        ensure_period(period)?;
        Ok(Self { period })
    }

    /// Rolling mean over a column that may already contain undefined rows.
    pub fn calculate_values(&self, values: &[Option<f64>]) -> Vec<Option<f64>> {
        rolling(values, self.period, |w| Some(mean(w)))
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        "sma"
    }

    fn required_candles(&self) -> usize {
        self.period
    }

    fn calculate(&self, candles: &[Candle]) -> Vec<Option<f64>> {
        self.calculate_values(&defined(&close_prices(candles)))
    }
}

/// Exponential Moving Average without bias adjustment.
///
/// Seeded at the first price, so every row is defined.
pub struct Ema {
    span: usize,
}

impl Ema {
    pub fn new(span: usize) -> Result<Self, Report<IndicatorError>> {
        ensure_period(span)?;
        Ok(Self { span })
    }

    pub fn alpha(&self) -> f64 {
        2.0 / (self.span as f64 + 1.0)
    }

    pub fn calculate_prices(&self, prices: &[f64]) -> Vec<f64> {
        let alpha = self.alpha();
        let mut results = Vec::with_capacity(prices.len());
        let mut ema: Option<f64> = None;
        for &price in prices {
            let next = match ema {
                Some(prev) => alpha * price + (1.0 - alpha) * prev,
                None => price,
            };
            ema = Some(next);
            results.push(next);
        }
        results
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        "ema"
    }

    fn required_candles(&self) -> usize {
        1
    }

    fn calculate(&self, candles: &[Candle]) -> Vec<Option<f64>> {
        defined(&self.calculate_prices(&close_prices(candles)))
    }
}

/// Rolling sample standard deviation (n - 1 denominator).
pub struct RollingStd {
    period: usize,
}

impl RollingStd {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        ensure_period(period)?;
        Ok(Self { period })
    }

    pub fn calculate_values(&self, values: &[Option<f64>]) -> Vec<Option<f64>> {
        rolling(values, self.period, sample_std)
    }
}

fn sample_std(window: &[f64]) -> Option<f64> {
    if window.len() < 2 {
        return None;
    }
    let m = mean(window);
    let variance =
        window.iter().map(|&p| (p - m).powi(2)).sum::<f64>() / (window.len() - 1) as f64;
    Some(variance.sqrt())
}
