use error_stack::{Report, bail};
use serde::{Deserialize, Serialize};

use crate::error::IndicatorError;
use crate::indicator::ma::{Ema, RollingStd, Sma};
use crate::indicator::{Indicator, close_prices, defined, ensure_period};
use crate::model::Candle;

/// Which moving average sits at the centre of the bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandCenter {
    Simple,
    Exponential,
}

/// One row of band output; every field is `None` until the window fills.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bands {
    pub upper: Option<f64>,
    pub middle: Option<f64>,
    pub lower: Option<f64>,
    pub std_dev: Option<f64>,
}

pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
    center: CenterLine,
    std_dev: RollingStd,
}

enum CenterLine {
    Simple(Sma),
    Exponential(Ema),
}

impl BollingerBands {
    pub fn new(
        period: usize,
        std_dev_multiplier: f64,
        center: BandCenter,
    ) -> Result<Self, Report<IndicatorError>> {
        ensure_period(period)?;
        if std_dev_multiplier <= 0.0 {
            bail!(IndicatorError::InvalidParameter {
                name: "std_dev_multiplier must be > 0".into(),
            });
        }
        let center = match center {
            BandCenter::Simple => CenterLine::Simple(Sma::new(period)?),
            BandCenter::Exponential => CenterLine::Exponential(Ema::new(period)?),
        };
        Ok(Self {
            period,
            std_dev_multiplier,
            center,
            std_dev: RollingStd::new(period)?,
        })
    }

    /// Returns one [`Bands`] per candle.
    pub fn calculate_bands(&self, candles: &[Candle]) -> Vec<Bands> {
        let prices = close_prices(candles);
        let column = defined(&prices);

        let middle = match &self.center {
            CenterLine::Simple(sma) => sma.calculate_values(&column),
            CenterLine::Exponential(ema) => defined(&ema.calculate_prices(&prices)),
        };
        let std_dev = self.std_dev.calculate_values(&column);

        middle
            .into_iter()
            .zip(std_dev)
            .map(|(middle, std_dev)| match (middle, std_dev) {
                (Some(m), Some(s)) => Bands {
                    upper: Some(m + self.std_dev_multiplier * s),
                    middle: Some(m),
                    lower: Some(m - self.std_dev_multiplier * s),
                    std_dev: Some(s),
                },
                (middle, std_dev) => Bands {
                    middle,
                    std_dev,
                    ..Bands::default()
                },
            })
            .collect()
    }
}

impl Indicator for BollingerBands {
    fn name(&self) -> &str {
        "bollinger"
    }

    fn required_candles(&self) -> usize {
        self.period
    }

    /// Returns middle band values only.
    fn calculate(&self, candles: &[Candle]) -> Vec<Option<f64>> {
        self.calculate_bands(candles)
            .into_iter()
            .map(|b| b.middle)
            .collect()
    }
}
