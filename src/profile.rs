use std::collections::HashSet;
use std::fmt;

use error_stack::Report;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, IndicatorError};
use crate::indicator::Indicator;
use crate::indicator::bollinger::BandCenter;
use crate::indicator::ma::{Ema, Sma};
use crate::indicator::stoch_rsi::StochRsi;
use crate::pipeline::Field;
use crate::strategy::{RuleKind, RuleSpec, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    Standard,
    ShortHorizon,
}

impl ProfileKind {
    /// Parse a config-format string into a `ProfileKind`.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(Self::Standard),
            "short_horizon" => Some(Self::ShortHorizon),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::ShortHorizon => "short_horizon",
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The pair of averages the trend rule compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendAverages {
    /// Price, short SMA and long SMA must be stacked in order.
    Simple { short: usize, long: usize },
    /// The two EMAs are compared directly.
    Exponential { short: usize, long: usize },
}

impl TrendAverages {
    pub fn periods(self) -> (usize, usize) {
        match self {
            Self::Simple { short, long } | Self::Exponential { short, long } => (short, long),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Simple { .. } => "MA",
            Self::Exponential { .. } => "EMA",
        }
    }

    pub fn indicators(
        self,
    ) -> Result<(Box<dyn Indicator>, Box<dyn Indicator>), Report<IndicatorError>> {
        let pair: (Box<dyn Indicator>, Box<dyn Indicator>) = match self {
            Self::Simple { short, long } => (Box::new(Sma::new(short)?), Box::new(Sma::new(long)?)),
            Self::Exponential { short, long } => {
                (Box::new(Ema::new(short)?), Box::new(Ema::new(long)?))
            }
        };
        Ok(pair)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StochRsiParams {
    pub window: usize,
    pub k_smoothing: usize,
    pub d_smoothing: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub stoch_overbought: f64,
    pub stoch_oversold: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            stoch_overbought: 0.8,
            stoch_oversold: 0.2,
        }
    }
}

/// Declared score range and the verdict cut-offs on it.
#[derive(Debug, Clone, PartialEq)]
pub struct VerdictScale {
    pub max_score: u32,
    pub strong_buy_at: u32,
    pub sell_or_hold_at: u32,
    pub strong_buy_label: &'static str,
    pub neutral_label: &'static str,
    pub sell_or_hold_label: &'static str,
}

impl VerdictScale {
    pub fn verdict(&self, score: u32) -> Verdict {
        if score >= self.strong_buy_at {
            Verdict::StrongBuy
        } else if score <= self.sell_or_hold_at {
            Verdict::SellOrHold
        } else {
            Verdict::NeutralOrWeakBuy
        }
    }

    pub fn label(&self, verdict: Verdict) -> &'static str {
        match verdict {
            Verdict::StrongBuy => self.strong_buy_label,
            Verdict::NeutralOrWeakBuy => self.neutral_label,
            Verdict::SellOrHold => self.sell_or_hold_label,
        }
    }
}

/// Everything that differs between analysis variants: indicator parameters,
/// optional indicator families, the rule table and the verdict scale.
///
/// Built once and handed to both the pipeline and the scoring engine, so the
/// fields one computes are the fields the other reads.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorProfile {
    pub kind: ProfileKind,
    pub rsi_period: usize,
    pub macd: MacdParams,
    pub trend: TrendAverages,
    pub band_period: usize,
    pub band_multiplier: f64,
    pub band_center: BandCenter,
    pub atr_period: usize,
    pub volume_period: usize,
    pub volume_surge_multiplier: f64,
    pub stoch_rsi: Option<StochRsiParams>,
    pub thresholds: Thresholds,
    pub rules: Vec<RuleSpec>,
    pub scale: VerdictScale,
}

impl IndicatorProfile {
    pub fn standard() -> Self {
        use RuleKind::*;
        Self {
            kind: ProfileKind::Standard,
            rsi_period: 14,
            macd: MacdParams {
                fast: 12,
                slow: 26,
                signal: 9,
            },
            trend: TrendAverages::Simple { short: 20, long: 60 },
            band_period: 20,
            band_multiplier: 2.0,
            band_center: BandCenter::Simple,
            atr_period: 14,
            volume_period: 20,
            volume_surge_multiplier: 1.0,
            stoch_rsi: None,
            thresholds: Thresholds::default(),
            rules: vec![
                RuleSpec::scored(OscillatorExtremity),
                RuleSpec::scored(TrendAlignment),
                RuleSpec::scored(MomentumDirection),
                RuleSpec::scored(MomentumTransition),
                RuleSpec::scored(BandPosition),
                RuleSpec::descriptive(OversoldAtBandFloor),
                RuleSpec::scored(VolumeConfirmation),
                RuleSpec::descriptive(FlowConfirmation),
                RuleSpec::descriptive(VolatilityRegime),
            ],
            scale: VerdictScale {
                max_score: 6,
                strong_buy_at: 4,
                sell_or_hold_at: 2,
                strong_buy_label: "Overall: strong buy",
                neutral_label: "Overall: wait or weak buy",
                sell_or_hold_label: "Overall: sell or stay out",
            },
        }
    }

    pub fn short_horizon() -> Self {
        use RuleKind::*;
        Self {
            kind: ProfileKind::ShortHorizon,
            rsi_period: 7,
            macd: MacdParams {
                fast: 8,
                slow: 21,
                signal: 5,
            },
            trend: TrendAverages::Exponential { short: 5, long: 20 },
            band_period: 20,
            band_multiplier: 2.0,
            band_center: BandCenter::Exponential,
            atr_period: 14,
            volume_period: 20,
            volume_surge_multiplier: 1.0,
            stoch_rsi: Some(StochRsiParams {
                window: 7,
                k_smoothing: 3,
                d_smoothing: 3,
            }),
            thresholds: Thresholds::default(),
            rules: vec![
                RuleSpec::scored(OscillatorExtremity),
                RuleSpec::descriptive(TrendAlignment),
                RuleSpec::scored(MomentumDirection),
                RuleSpec::scored(MomentumTransition),
                RuleSpec::scored(BandPosition),
                RuleSpec::descriptive(OversoldAtBandFloor),
                RuleSpec::scored(VolumeConfirmation),
                RuleSpec::scored(FlowConfirmation),
                RuleSpec::descriptive(VolatilityRegime),
                RuleSpec::scored(StochasticCross),
            ],
            scale: VerdictScale {
                max_score: 7,
                strong_buy_at: 5,
                sell_or_hold_at: 2,
                strong_buy_label: "Short-term: strong buy entry",
                neutral_label: "Short-term: wait for confirmation or enter lightly",
                sell_or_hold_label: "Short-term: sell or stay out",
            },
        }
    }

    pub fn for_kind(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::Standard => Self::standard(),
            ProfileKind::ShortHorizon => Self::short_horizon(),
        }
    }

    /// Toggle the optional Stochastic RSI family, windowed on the RSI period.
    pub fn with_stoch_rsi(mut self, enabled: bool) -> Self {
        self.stoch_rsi = enabled.then_some(StochRsiParams {
            window: self.rsi_period,
            k_smoothing: 3,
            d_smoothing: 3,
        });
        self
    }

    pub fn with_volume_surge_multiplier(mut self, multiplier: f64) -> Self {
        self.volume_surge_multiplier = multiplier;
        self
    }

    /// Fields the pipeline attaches for this profile.
    pub fn produced_fields(&self) -> HashSet<Field> {
        let mut fields: HashSet<Field> = [
            Field::Rsi,
            Field::TrendShort,
            Field::TrendLong,
            Field::BandMiddle,
            Field::BandStd,
            Field::BandUpper,
            Field::BandLower,
            Field::EmaFast,
            Field::EmaSlow,
            Field::Macd,
            Field::MacdSignal,
            Field::MacdHistogram,
            Field::TrueRange,
            Field::Atr,
            Field::Obv,
            Field::VolumeMa,
        ]
        .into_iter()
        .collect();
        if self.stoch_rsi.is_some() {
            fields.extend([Field::StochRsi, Field::StochK, Field::StochD]);
        }
        fields
    }

    /// Minimum viable series length: the longest window the profile uses,
    /// plus one for close-to-close differences and one for the previous row
    /// the scoring engine compares against.
    pub fn min_history(&self) -> usize {
        let trend = match self.trend {
            TrendAverages::Simple { long, .. } => long,
            TrendAverages::Exponential { .. } => 1,
        };
        let stoch = self
            .stoch_rsi
            .and_then(|p| StochRsi::new(self.rsi_period, p.window, p.k_smoothing, p.d_smoothing).ok())
            .map_or(0, |stoch| stoch.required_candles());
        let longest = [
            trend,
            self.band_period,
            self.rsi_period,
            self.atr_period,
            self.volume_period,
            stoch,
        ]
        .into_iter()
        .max()
        .unwrap_or(1);
        longest + 2
    }

    /// Check that the rule table, the optional families and the declared
    /// verdict scale agree with each other.
    pub fn validate(&self) -> Result<(), Report<ConfigError>> {
        let invalid = |field: String| Err(Report::new(ConfigError::Validation { field }));

        let periods = [
            ("rsi_period", self.rsi_period),
            ("band_period", self.band_period),
            ("atr_period", self.atr_period),
            ("volume_period", self.volume_period),
        ];
        for (name, period) in periods {
            if period == 0 {
                return invalid(format!("profile[{}].{name} must be > 0", self.kind));
            }
        }
        if self.macd.fast == 0 || self.macd.fast >= self.macd.slow || self.macd.signal == 0 {
            return invalid(format!(
                "profile[{}].macd periods must satisfy 0 < fast < slow and signal > 0",
                self.kind
            ));
        }
        if self.band_multiplier <= 0.0 || self.volume_surge_multiplier <= 0.0 {
            return invalid(format!("profile[{}] multipliers must be > 0", self.kind));
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            if !seen.insert(rule.kind) {
                return invalid(format!(
                    "profile[{}].rules: duplicate rule {:?}",
                    self.kind, rule.kind
                ));
            }
        }

        let produced = self.produced_fields();
        for rule in &self.rules {
            if let Some(missing) = rule.kind.required_fields().iter().find(|f| !produced.contains(*f)) {
                return invalid(format!(
                    "profile[{}].rules: {:?} reads {missing}, which this profile does not compute",
                    self.kind, rule.kind
                ));
            }
        }

        let scored = self.rules.iter().filter(|r| r.scored).count() as u32;
        if scored != self.scale.max_score {
            return invalid(format!(
                "profile[{}].scale.max_score is {} but {scored} rules are scored",
                self.kind, self.scale.max_score
            ));
        }
        if self.scale.sell_or_hold_at >= self.scale.strong_buy_at
            || self.scale.strong_buy_at > self.scale.max_score
        {
            return invalid(format!(
                "profile[{}].scale thresholds must satisfy sell_or_hold < strong_buy <= max",
                self.kind
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_kind_round_trip() {
        for kind in [ProfileKind::Standard, ProfileKind::ShortHorizon] {
            assert_eq!(ProfileKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(ProfileKind::from_str("scalping"), None);
    }

    #[test]
    fn builtin_profiles_are_consistent() {
        IndicatorProfile::standard().validate().unwrap();
        IndicatorProfile::short_horizon().validate().unwrap();
        IndicatorProfile::standard()
            .with_stoch_rsi(true)
            .validate()
            .unwrap();
    }

    #[test]
    fn declared_maximums() {
        assert_eq!(IndicatorProfile::standard().scale.max_score, 6);
        assert_eq!(IndicatorProfile::short_horizon().scale.max_score, 7);
    }

    #[test]
    fn short_horizon_requires_stochastic_rsi() {
        let profile = IndicatorProfile::short_horizon().with_stoch_rsi(false);
        assert!(profile.validate().is_err());
    }

    #[test]
    fn max_score_must_match_scored_rules() {
        let mut profile = IndicatorProfile::standard();
        profile.rules[7] = RuleSpec::scored(RuleKind::FlowConfirmation);
        assert!(profile.validate().is_err());
        profile.scale.max_score = 7;
        profile.validate().unwrap();
    }

    #[test]
    fn duplicate_rules_rejected() {
        let mut profile = IndicatorProfile::standard();
        profile.rules.push(RuleSpec::descriptive(RuleKind::VolatilityRegime));
        assert!(profile.validate().is_err());
    }

    #[test]
    fn thresholds_must_be_ordered() {
        let mut profile = IndicatorProfile::standard();
        profile.scale.sell_or_hold_at = 4;
        assert!(profile.validate().is_err());
    }

    #[test]
    fn zero_surge_multiplier_rejected() {
        let profile = IndicatorProfile::standard().with_volume_surge_multiplier(0.0);
        assert!(profile.validate().is_err());
    }

    #[test]
    fn verdict_mapping_standard() {
        let scale = IndicatorProfile::standard().scale;
        assert_eq!(scale.verdict(0), Verdict::SellOrHold);
        assert_eq!(scale.verdict(2), Verdict::SellOrHold);
        assert_eq!(scale.verdict(3), Verdict::NeutralOrWeakBuy);
        assert_eq!(scale.verdict(4), Verdict::StrongBuy);
        assert_eq!(scale.verdict(6), Verdict::StrongBuy);
    }

    #[test]
    fn verdict_mapping_short_horizon() {
        let scale = IndicatorProfile::short_horizon().scale;
        assert_eq!(scale.verdict(2), Verdict::SellOrHold);
        assert_eq!(scale.verdict(3), Verdict::NeutralOrWeakBuy);
        assert_eq!(scale.verdict(4), Verdict::NeutralOrWeakBuy);
        assert_eq!(scale.verdict(5), Verdict::StrongBuy);
    }

    #[test]
    fn min_history_per_profile() {
        // SMA 60 dominates the standard profile
        assert_eq!(IndicatorProfile::standard().min_history(), 62);
        // band and volume windows of 20 dominate the short-horizon profile
        assert_eq!(IndicatorProfile::short_horizon().min_history(), 22);
    }
}
