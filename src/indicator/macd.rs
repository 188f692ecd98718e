use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::ma::Ema;
use crate::indicator::{Indicator, close_prices, defined};
use crate::model::Candle;

/// One row of MACD output. All fields are defined from the first candle
/// because the underlying EMAs are seeded at the first close.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub fast_ema: f64,
    pub slow_ema: f64,
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
    slow_period: usize,
}

impl Macd {
    pub fn new(
        fast_period: usize,
        slow_period: usize,
        signal_period: usize,
    ) -> Result<Self, Report<IndicatorError>> {
        if fast_period == 0 || slow_period == 0 || signal_period == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "all periods must be > 0".into(),
            });
        }
        if fast_period >= slow_period {
            bail!(IndicatorError::InvalidParameter {
                name: "fast_period must be < slow_period".into(),
            });
        }
        Ok(Self {
            fast: Ema::new(fast_period)?,
            slow: Ema::new(slow_period)?,
            signal: Ema::new(signal_period)?,
            slow_period,
        })
    }

    pub fn calculate_full(&self, candles: &[Candle]) -> Vec<MacdPoint> {
        let prices = close_prices(candles);
        let fast_ema = self.fast.calculate_prices(&prices);
        let slow_ema = self.slow.calculate_prices(&prices);

        let macd_line: Vec<f64> = fast_ema
            .iter()
            .zip(&slow_ema)
            .map(|(f, s)| f - s)
            .collect();
        let signal_line = self.signal.calculate_prices(&macd_line);

        fast_ema
            .into_iter()
            .zip(slow_ema)
            .zip(macd_line)
            .zip(signal_line)
            .map(|(((fast_ema, slow_ema), macd), signal)| MacdPoint {
                fast_ema,
                slow_ema,
                macd,
                signal,
                histogram: macd - signal,
            })
            .collect()
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        "macd"
    }

    fn required_candles(&self) -> usize {
        self.slow_period
    }

    /// Returns MACD line values only.
    fn calculate(&self, candles: &[Candle]) -> Vec<Option<f64>> {
        let line: Vec<f64> = self
            .calculate_full(candles)
            .into_iter()
            .map(|p| p.macd)
            .collect();
        defined(&line)
    }
}
