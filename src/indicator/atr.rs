use error_stack::Report;

use crate::error::IndicatorError;
use crate::indicator::{Indicator, defined, ensure_period, mean, rolling};
use crate::model::Candle;

/// Average True Range as a simple rolling mean of true range.
pub struct Atr {
    period: usize,
}

impl Atr {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        ensure_period(period)?;
        Ok(Self { period })
    }
}

/// True range per candle. The first candle has no previous close, so its
/// range is just high - low.
pub fn true_range(candles: &[Candle]) -> Vec<f64> {
    candles
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let range = c.high - c.low;
            match i.checked_sub(1).map(|p| candles[p].close) {
                Some(prev_close) => range
                    .max((c.high - prev_close).abs())
                    .max((c.low - prev_close).abs()),
                None => range,
            }
        })
        .collect()
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        "atr"
    }

    fn required_candles(&self) -> usize {
        self.period
    }

    fn calculate(&self, candles: &[Candle]) -> Vec<Option<f64>> {
        rolling(&defined(&true_range(candles)), self.period, |w| Some(mean(w)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::testing::{assert_close, candle};

    #[test]
    fn atr_period_zero_invalid() {
        assert!(Atr::new(0).is_err());
    }

    #[test]
    fn true_range_uses_previous_close_gap() {
        let candles = vec![
            candle(0, 10.0, 11.0, 9.0, 10.0, 1.0),
            // gap up: high - prev close = 5 beats high - low = 1
            candle(1, 14.0, 15.0, 14.0, 14.5, 1.0),
            // gap down: |low - prev close| = 4.5
            candle(2, 10.5, 11.0, 10.0, 10.5, 1.0),
        ];
        let tr = true_range(&candles);
        assert_close(tr[0], 2.0);
        assert_close(tr[1], 5.0);
        assert_close(tr[2], 4.5);
    }

    #[test]
    fn atr_rolling_mean_of_true_range() {
        let candles = vec![
            candle(0, 10.0, 11.0, 9.0, 10.0, 1.0),
            candle(1, 14.0, 15.0, 14.0, 14.5, 1.0),
            candle(2, 10.5, 11.0, 10.0, 10.5, 1.0),
        ];
        let atr = Atr::new(2).unwrap().calculate(&candles);
        assert_eq!(atr[0], None);
        assert_close(atr[1].unwrap(), 3.5);
        assert_close(atr[2].unwrap(), 4.75);
    }

    #[test]
    fn atr_short_series_undefined() {
        let candles = vec![candle(0, 10.0, 11.0, 9.0, 10.0, 1.0)];
        assert_eq!(Atr::new(14).unwrap().calculate(&candles), vec![None]);
    }
}
