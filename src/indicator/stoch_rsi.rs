use error_stack::Report;

use crate::error::IndicatorError;
use crate::indicator::ma::Sma;
use crate::indicator::rsi::Rsi;
use crate::indicator::{Indicator, close_prices, ensure_period, rolling};
use crate::model::Candle;

/// One row of Stochastic RSI output in the [0, 1] range.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StochRsiPoint {
    pub raw: Option<f64>,
    pub k: Option<f64>,
    pub d: Option<f64>,
}

/// Stochastic RSI: the RSI min-max normalised over a trailing window, then
/// smoothed twice (%K, then %D).
pub struct StochRsi {
    rsi: Rsi,
    window: usize,
    k_smoothing: Sma,
    d_smoothing: Sma,
    k_period: usize,
    d_period: usize,
}

impl StochRsi {
    /// `window` is the min/max lookback; it normally equals the RSI period.
    pub fn new(
        rsi_period: usize,
        window: usize,
        k_period: usize,
        d_period: usize,
    ) -> Result<Self, Report<IndicatorError>> {
        ensure_period(window)?;
        Ok(Self {
            rsi: Rsi::new(rsi_period)?,
            window,
            k_smoothing: Sma::new(k_period)?,
            d_smoothing: Sma::new(d_period)?,
            k_period,
            d_period,
        })
    }

    pub fn calculate_full(&self, candles: &[Candle]) -> Vec<StochRsiPoint> {
        let rsi = self.rsi.calculate_prices(&close_prices(candles));
        self.calculate_from_rsi(&rsi)
    }

    /// Reuse an RSI column the caller already computed with the same period.
    pub fn calculate_from_rsi(&self, rsi: &[Option<f64>]) -> Vec<StochRsiPoint> {
        let raw = rolling(rsi, self.window, normalise_last);
        let k = self.k_smoothing.calculate_values(&raw);
        let d = self.d_smoothing.calculate_values(&k);

        raw.into_iter()
            .zip(k)
            .zip(d)
            .map(|((raw, k), d)| StochRsiPoint { raw, k, d })
            .collect()
    }
}

/// Position of the newest value inside the window's range; `None` when the
/// range is empty.
fn normalise_last(window: &[f64]) -> Option<f64> {
    let current = *window.last()?;
    let lowest = window.iter().copied().fold(f64::INFINITY, f64::min);
    let highest = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = highest - lowest;
    if range == 0.0 {
        return None;
    }
    Some((current - lowest) / range)
}

impl Indicator for StochRsi {
    fn name(&self) -> &str {
        "stoch_rsi"
    }

    fn required_candles(&self) -> usize {
        self.rsi.required_candles() + self.window - 1 + self.k_period - 1 + self.d_period - 1
    }

    /// Returns %K values only.
    fn calculate(&self, candles: &[Candle]) -> Vec<Option<f64>> {
        self.calculate_full(candles).into_iter().map(|p| p.k).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::testing::{assert_close, candles_from_closes, wavy_closes};

    #[test]
    fn stoch_rsi_zero_window_invalid() {
        assert!(StochRsi::new(14, 0, 3, 3).is_err());
        assert!(StochRsi::new(14, 14, 0, 3).is_err());
    }

    #[test]
    fn normalise_known_value() {
        assert_close(normalise_last(&[10.0, 30.0, 20.0]).unwrap(), 0.5);
        assert_close(normalise_last(&[10.0, 30.0, 30.0]).unwrap(), 1.0);
    }

    #[test]
    fn zero_range_is_undefined() {
        assert_eq!(normalise_last(&[50.0, 50.0, 50.0]), None);
    }

    #[test]
    fn values_in_unit_range_once_defined() {
        let stoch = StochRsi::new(7, 7, 3, 3).unwrap();
        let points = stoch.calculate_full(&candles_from_closes(&wavy_closes(150)));
        let mut defined_d = 0;
        for p in &points {
            for v in [p.raw, p.k, p.d].into_iter().flatten() {
                assert!((0.0..=1.0 + 1e-12).contains(&v), "out of range: {v}");
            }
            if p.d.is_some() {
                defined_d += 1;
            }
        }
        assert!(defined_d > 0);
    }

    #[test]
    fn first_defined_d_matches_required_candles() {
        let stoch = StochRsi::new(3, 3, 2, 2).unwrap();
        let points = stoch.calculate_full(&candles_from_closes(&wavy_closes(40)));
        let first = points.iter().position(|p| p.d.is_some()).unwrap();
        assert_eq!(first + 1, stoch.required_candles());
    }

    #[test]
    fn undefined_rsi_keeps_stoch_undefined() {
        let stoch = StochRsi::new(3, 3, 3, 3).unwrap();
        let points = stoch.calculate_full(&candles_from_closes(&[10.0; 20]));
        assert!(points.iter().all(|p| p.raw.is_none() && p.k.is_none() && p.d.is_none()));
    }
}
