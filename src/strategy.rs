pub mod condition;

use std::fmt;

use serde::Serialize;

use crate::pipeline::Field;
use crate::profile::ProfileKind;

/// Rule categories the scoring engine knows how to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// RSI against its oversold/overbought thresholds.
    OscillatorExtremity,
    /// Ordering of price and the two trend averages.
    TrendAlignment,
    /// MACD against its signal line.
    MomentumDirection,
    /// MACD histogram changing sign between the previous and latest rows.
    MomentumTransition,
    /// Close against the Bollinger bands.
    BandPosition,
    /// Oversold RSI while the close sits on the lower band.
    OversoldAtBandFloor,
    VolumeConfirmation,
    FlowConfirmation,
    /// Latest ATR against the mean ATR of the whole series.
    VolatilityRegime,
    /// Stochastic RSI %K crossing %D.
    StochasticCross,
}

impl RuleKind {
    /// Fields read from the latest row.
    pub fn required_fields(self) -> &'static [Field] {
        match self {
            Self::OscillatorExtremity => &[Field::Rsi],
            Self::TrendAlignment => &[Field::TrendShort, Field::TrendLong],
            Self::MomentumDirection => &[Field::Macd, Field::MacdSignal],
            Self::MomentumTransition => &[Field::MacdHistogram],
            Self::BandPosition => &[Field::BandUpper, Field::BandLower],
            Self::OversoldAtBandFloor => &[Field::Rsi, Field::BandLower],
            Self::VolumeConfirmation => &[Field::VolumeMa],
            Self::FlowConfirmation => &[Field::Obv],
            Self::VolatilityRegime => &[Field::Atr],
            Self::StochasticCross => &[Field::StochK, Field::StochD],
        }
    }
}

/// One row of a profile's rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleSpec {
    pub kind: RuleKind,
    /// Whether a bullish outcome adds one point to the score.
    pub scored: bool,
}

impl RuleSpec {
    pub const fn scored(kind: RuleKind) -> Self {
        Self { kind, scored: true }
    }

    pub const fn descriptive(kind: RuleKind) -> Self {
        Self {
            kind,
            scored: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    StrongBuy,
    NeutralOrWeakBuy,
    SellOrHold,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StrongBuy => "STRONG_BUY",
            Self::NeutralOrWeakBuy => "NEUTRAL_OR_WEAK_BUY",
            Self::SellOrHold => "SELL_OR_HOLD",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Observations in rule-table order, followed by the verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalReport {
    pub profile: ProfileKind,
    pub observations: Vec<String>,
    pub score: u32,
    pub max_score: u32,
    pub verdict: Verdict,
    pub verdict_line: String,
}

impl SignalReport {
    /// Every observation, then the verdict line last.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.observations
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.verdict_line.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_display() {
        assert_eq!(Verdict::StrongBuy.to_string(), "STRONG_BUY");
        assert_eq!(Verdict::NeutralOrWeakBuy.to_string(), "NEUTRAL_OR_WEAK_BUY");
        assert_eq!(Verdict::SellOrHold.to_string(), "SELL_OR_HOLD");
    }

    #[test]
    fn verdict_serializes_like_display() {
        let json = serde_json::to_string(&Verdict::NeutralOrWeakBuy).unwrap();
        assert_eq!(json, "\"NEUTRAL_OR_WEAK_BUY\"");
    }

    #[test]
    fn report_lines_end_with_verdict() {
        let report = SignalReport {
            profile: ProfileKind::Standard,
            observations: vec!["a".into(), "b".into()],
            score: 1,
            max_score: 6,
            verdict: Verdict::SellOrHold,
            verdict_line: "Overall: sell or stay out".into(),
        };
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines, vec!["a", "b", "Overall: sell or stay out"]);
    }
}
