use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::ma::Sma;
use crate::indicator::{Indicator, defined, volumes};
use crate::model::Candle;

/// Simple average of traded volume over a period.
pub struct VolumeMA {
    sma: Sma,
    period: usize,
}

impl VolumeMA {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        Ok(Self {
            sma: Sma::new(period)?,
            period,
        })
    }

    /// For each candle, whether its volume exceeds `surge_multiplier` times
    /// the volume MA. `None` until the MA window fills.
    pub fn detect_surges(
        &self,
        candles: &[Candle],
        surge_multiplier: f64,
    ) -> Result<Vec<Option<bool>>, Report<IndicatorError>> {
        if surge_multiplier <= 0.0 {
            bail!(IndicatorError::InvalidParameter {
                name: "surge_multiplier must be > 0".into(),
            });
        }
        Ok(self
            .calculate(candles)
            .into_iter()
            .zip(candles)
            .map(|(ma, c)| ma.map(|ma| c.volume > ma * surge_multiplier))
            .collect())
    }
}

impl Indicator for VolumeMA {
    fn name(&self) -> &str {
        "volume_ma"
    }

    fn required_candles(&self) -> usize {
        self.period
    }

    /// Returns volume MA values.
    fn calculate(&self, candles: &[Candle]) -> Vec<Option<f64>> {
        self.sma.calculate_values(&defined(&volumes(candles)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::testing::{assert_close, candle};

    fn candles_with_volumes(vols: &[f64]) -> Vec<Candle> {
        vols.iter()
            .enumerate()
            .map(|(i, &v)| candle(i, 100.0, 100.0, 100.0, 100.0, v))
            .collect()
    }

    #[test]
    fn volume_ma_period_zero_invalid() {
        assert!(VolumeMA::new(0).is_err());
    }

    #[test]
    fn volume_ma_short_series_undefined() {
        let vma = VolumeMA::new(5).unwrap();
        assert_eq!(vma.calculate(&candles_with_volumes(&[1.0; 4])), vec![None; 4]);
    }

    #[test]
    fn volume_ma_known_value() {
        let vma = VolumeMA::new(3).unwrap();
        let values = vma.calculate(&candles_with_volumes(&[1.0, 2.0, 3.0, 4.0]));
        // (1+2+3)/3 = 2.0, (2+3+4)/3 = 3.0
        assert_close(values[2].unwrap(), 2.0);
        assert_close(values[3].unwrap(), 3.0);
    }

    #[test]
    fn surge_detection() {
        let vma = VolumeMA::new(3).unwrap();
        // avg of first 3 = 1.0; window [1,1,5] has avg 7/3 and 5 > 2 * 7/3
        let candles = candles_with_volumes(&[1.0, 1.0, 1.0, 5.0]);
        let surges = vma.detect_surges(&candles, 2.0).unwrap();
        assert_eq!(surges, vec![None, None, Some(false), Some(true)]);
    }

    #[test]
    fn rise_flag_is_strict_at_multiplier_one() {
        let vma = VolumeMA::new(2).unwrap();
        let candles = candles_with_volumes(&[2.0, 2.0, 3.0]);
        let surges = vma.detect_surges(&candles, 1.0).unwrap();
        assert_eq!(surges, vec![None, Some(false), Some(true)]);
    }

    #[test]
    fn non_positive_multiplier_rejected() {
        let vma = VolumeMA::new(3).unwrap();
        assert!(vma.detect_surges(&candles_with_volumes(&[1.0; 4]), 0.0).is_err());
    }
}
