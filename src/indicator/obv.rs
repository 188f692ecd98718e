use crate::indicator::{Indicator, defined};
use crate::model::Candle;

/// On-Balance Volume: running total of volume signed by the close-to-close
/// direction. Starts at zero on the first candle.
pub struct Obv;

impl Obv {
    pub fn calculate_values(&self, candles: &[Candle]) -> Vec<f64> {
        let mut total = 0.0;
        candles
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if let Some(prev) = i.checked_sub(1).map(|p| &candles[p]) {
                    if c.close > prev.close {
                        total += c.volume;
                    } else if c.close < prev.close {
                        total -= c.volume;
                    }
                }
                total
            })
            .collect()
    }
}

impl Indicator for Obv {
    fn name(&self) -> &str {
        "obv"
    }

    fn required_candles(&self) -> usize {
        1
    }

    fn calculate(&self, candles: &[Candle]) -> Vec<Option<f64>> {
        defined(&self.calculate_values(candles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::testing::{candle, wavy_closes};

    #[test]
    fn obv_known_sequence() {
        let candles = vec![
            candle(0, 10.0, 10.0, 10.0, 10.0, 5.0),
            candle(1, 11.0, 11.0, 11.0, 11.0, 3.0),
            candle(2, 11.0, 11.0, 11.0, 11.0, 7.0),
            candle(3, 9.0, 9.0, 9.0, 9.0, 4.0),
        ];
        assert_eq!(Obv.calculate_values(&candles), vec![0.0, 3.0, 3.0, -1.0]);
    }

    #[test]
    fn obv_is_prefix_sum_of_signed_volume() {
        let candles: Vec<Candle> = wavy_closes(60)
            .into_iter()
            .enumerate()
            .map(|(i, c)| candle(i, c, c, c, c, 1.0 + i as f64))
            .collect();
        let obv = Obv.calculate_values(&candles);
        assert_eq!(obv[0], 0.0);
        for t in 1..candles.len() {
            let diff = candles[t].close - candles[t - 1].close;
            let signed = if diff > 0.0 {
                candles[t].volume
            } else if diff < 0.0 {
                -candles[t].volume
            } else {
                0.0
            };
            assert_eq!(obv[t], obv[t - 1] + signed);
        }
    }
}
