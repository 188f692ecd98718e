use error_stack::{Report, bail};
use tracing::debug;

use crate::error::SignalError;
use crate::indicator::mean;
use crate::pipeline::{EnrichedRow, EnrichedSeries, Field};
use crate::profile::{IndicatorProfile, TrendAverages};
use crate::strategy::{RuleKind, SignalReport};

const LATEST: &str = "latest";
const PREVIOUS: &str = "previous";

/// Result of evaluating a single rule against the latest two rows.
#[derive(Debug, Clone, PartialEq)]
struct RuleOutcome {
    observation: Option<String>,
    /// The condition that earns a point when the rule is scored.
    bullish: bool,
}

impl RuleOutcome {
    fn bullish(observation: String) -> Self {
        Self {
            observation: Some(observation),
            bullish: true,
        }
    }

    fn neutral(observation: String) -> Self {
        Self {
            observation: Some(observation),
            bullish: false,
        }
    }

    fn silent() -> Self {
        Self {
            observation: None,
            bullish: false,
        }
    }
}

struct RuleContext<'a> {
    profile: &'a IndicatorProfile,
    previous: &'a EnrichedRow,
    latest: &'a EnrichedRow,
    atr_mean: Option<f64>,
}

impl RuleContext<'_> {
    fn latest(&self, field: Field) -> Result<f64, Report<SignalError>> {
        require(self.latest, field, LATEST)
    }

    fn previous(&self, field: Field) -> Result<f64, Report<SignalError>> {
        require(self.previous, field, PREVIOUS)
    }

    fn close(&self) -> f64 {
        self.latest.candle.close
    }
}

fn require(row: &EnrichedRow, field: Field, position: &'static str) -> Result<f64, Report<SignalError>> {
    row.get(field).ok_or_else(|| {
        Report::new(SignalError::MissingIndicator {
            field,
            row: position,
        })
    })
}

/// Fields a rule compares against the previous row.
fn previous_fields(kind: RuleKind) -> &'static [Field] {
    match kind {
        RuleKind::MomentumTransition => &[Field::MacdHistogram],
        RuleKind::FlowConfirmation => &[Field::Obv],
        RuleKind::StochasticCross => &[Field::StochK, Field::StochD],
        _ => &[],
    }
}

/// Score the latest two rows of `enriched` with the profile's rule table.
///
/// Fails instead of scoring when the series is shorter than two rows or when
/// any field the rule table reads is undefined on the rows it reads.
pub fn evaluate(
    enriched: &EnrichedSeries,
    profile: &IndicatorProfile,
) -> Result<SignalReport, Report<SignalError>> {
    if enriched.profile != profile.kind {
        bail!(SignalError::ProfileMismatch {
            computed: enriched.profile,
            requested: profile.kind,
        });
    }
    let Some((previous, latest)) = enriched.last_two() else {
        bail!(SignalError::InsufficientHistory {
            required: 2,
            available: enriched.len(),
        });
    };

    for rule in &profile.rules {
        for &field in rule.kind.required_fields() {
            require(latest, field, LATEST)?;
        }
        for &field in previous_fields(rule.kind) {
            require(previous, field, PREVIOUS)?;
        }
        if rule.kind == RuleKind::VolumeConfirmation && latest.volume_rising.is_none() {
            bail!(SignalError::MissingIndicator {
                field: Field::VolumeMa,
                row: LATEST,
            });
        }
    }

    let atr: Vec<f64> = enriched.column(Field::Atr).into_iter().flatten().collect();
    let ctx = RuleContext {
        profile,
        previous,
        latest,
        atr_mean: (!atr.is_empty()).then(|| mean(&atr)),
    };

    let mut observations = Vec::with_capacity(profile.rules.len());
    let mut score = 0u32;
    for rule in &profile.rules {
        let outcome = evaluate_rule(rule.kind, &ctx)?;
        if let Some(observation) = outcome.observation {
            observations.push(observation);
        }
        if rule.scored && outcome.bullish {
            score += 1;
        }
    }

    let verdict = profile.scale.verdict(score);
    debug!(
        profile = %profile.kind,
        score,
        max_score = profile.scale.max_score,
        verdict = %verdict,
        "evaluated signal rules"
    );

    Ok(SignalReport {
        profile: profile.kind,
        observations,
        score,
        max_score: profile.scale.max_score,
        verdict,
        verdict_line: profile.scale.label(verdict).to_string(),
    })
}

fn evaluate_rule(kind: RuleKind, ctx: &RuleContext<'_>) -> Result<RuleOutcome, Report<SignalError>> {
    match kind {
        RuleKind::OscillatorExtremity => oscillator_extremity(ctx),
        RuleKind::TrendAlignment => trend_alignment(ctx),
        RuleKind::MomentumDirection => momentum_direction(ctx),
        RuleKind::MomentumTransition => momentum_transition(ctx),
        RuleKind::BandPosition => band_position(ctx),
        RuleKind::OversoldAtBandFloor => oversold_at_band_floor(ctx),
        RuleKind::VolumeConfirmation => volume_confirmation(ctx),
        RuleKind::FlowConfirmation => flow_confirmation(ctx),
        RuleKind::VolatilityRegime => volatility_regime(ctx),
        RuleKind::StochasticCross => stochastic_cross(ctx),
    }
}

fn oscillator_extremity(ctx: &RuleContext<'_>) -> Result<RuleOutcome, Report<SignalError>> {
    let rsi = ctx.latest(Field::Rsi)?;
    let t = &ctx.profile.thresholds;
    Ok(if rsi < t.rsi_oversold {
        RuleOutcome::bullish(format!(
            "RSI {rsi:.2} < {:.0}: oversold, buying opportunity",
            t.rsi_oversold
        ))
    } else if rsi > t.rsi_overbought {
        RuleOutcome::neutral(format!(
            "RSI {rsi:.2} > {:.0}: overbought, selling pressure likely",
            t.rsi_overbought
        ))
    } else {
        RuleOutcome::neutral(format!("RSI {rsi:.2}: neutral zone"))
    })
}

fn trend_alignment(ctx: &RuleContext<'_>) -> Result<RuleOutcome, Report<SignalError>> {
    let short = ctx.latest(Field::TrendShort)?;
    let long = ctx.latest(Field::TrendLong)?;
    let (short_period, long_period) = ctx.profile.trend.periods();
    let label = ctx.profile.trend.label();

    Ok(match ctx.profile.trend {
        TrendAverages::Simple { .. } => {
            let close = ctx.close();
            if close > short && short > long {
                RuleOutcome::bullish(format!(
                    "price > {label}{short_period} > {label}{long_period}: bullish alignment, uptrend"
                ))
            } else if close < short && short < long {
                RuleOutcome::neutral(format!(
                    "price < {label}{short_period} < {label}{long_period}: bearish alignment, downtrend"
                ))
            } else {
                RuleOutcome::neutral("moving averages mixed: no clear direction".to_string())
            }
        }
        TrendAverages::Exponential { .. } => {
            if short > long {
                RuleOutcome::bullish(format!(
                    "{label}{short_period} > {label}{long_period}: short-term uptrend"
                ))
            } else if short < long {
                RuleOutcome::neutral(format!(
                    "{label}{short_period} < {label}{long_period}: short-term downtrend"
                ))
            } else {
                RuleOutcome::neutral(format!(
                    "{label}{short_period} = {label}{long_period}: no clear direction"
                ))
            }
        }
    })
}

fn momentum_direction(ctx: &RuleContext<'_>) -> Result<RuleOutcome, Report<SignalError>> {
    let macd = ctx.latest(Field::Macd)?;
    let signal = ctx.latest(Field::MacdSignal)?;
    Ok(if macd > signal {
        RuleOutcome::bullish("MACD > signal: bullish momentum".to_string())
    } else if macd < signal {
        RuleOutcome::neutral("MACD < signal: bearish momentum".to_string())
    } else {
        RuleOutcome::neutral("MACD equals signal: neutral momentum".to_string())
    })
}

fn momentum_transition(ctx: &RuleContext<'_>) -> Result<RuleOutcome, Report<SignalError>> {
    let previous = ctx.previous(Field::MacdHistogram)?;
    let current = ctx.latest(Field::MacdHistogram)?;
    Ok(if previous <= 0.0 && current > 0.0 {
        RuleOutcome::bullish("MACD histogram turned positive: bullish crossover".to_string())
    } else if previous >= 0.0 && current < 0.0 {
        RuleOutcome::neutral("MACD histogram turned negative: bearish crossover".to_string())
    } else {
        RuleOutcome::silent()
    })
}

fn band_position(ctx: &RuleContext<'_>) -> Result<RuleOutcome, Report<SignalError>> {
    let close = ctx.close();
    let lower = ctx.latest(Field::BandLower)?;
    let upper = ctx.latest(Field::BandUpper)?;
    Ok(if close <= lower {
        RuleOutcome::bullish("close at or below the lower Bollinger band: rebound candidate".to_string())
    } else if close >= upper {
        RuleOutcome::neutral("close at or above the upper Bollinger band: overheated".to_string())
    } else {
        RuleOutcome::neutral("close inside the Bollinger bands: stable".to_string())
    })
}

fn oversold_at_band_floor(ctx: &RuleContext<'_>) -> Result<RuleOutcome, Report<SignalError>> {
    let rsi = ctx.latest(Field::Rsi)?;
    let lower = ctx.latest(Field::BandLower)?;
    Ok(
        if rsi < ctx.profile.thresholds.rsi_oversold && ctx.close() <= lower {
            RuleOutcome::bullish("oversold RSI on the lower band: strong rebound setup".to_string())
        } else {
            RuleOutcome::silent()
        },
    )
}

fn volume_confirmation(ctx: &RuleContext<'_>) -> Result<RuleOutcome, Report<SignalError>> {
    let rising = ctx.latest.volume_rising.ok_or_else(|| {
        Report::new(SignalError::MissingIndicator {
            field: Field::VolumeMa,
            row: LATEST,
        })
    })?;
    let period = ctx.profile.volume_period;
    Ok(if rising {
        RuleOutcome::bullish(format!(
            "volume above its {period}-period average: buying interest"
        ))
    } else {
        RuleOutcome::neutral(format!(
            "volume not above its {period}-period average: quiet market"
        ))
    })
}

fn flow_confirmation(ctx: &RuleContext<'_>) -> Result<RuleOutcome, Report<SignalError>> {
    let previous = ctx.previous(Field::Obv)?;
    let current = ctx.latest(Field::Obv)?;
    Ok(if current > previous {
        RuleOutcome::bullish("OBV rising: volume flowing in".to_string())
    } else {
        RuleOutcome::neutral("OBV flat or falling: volume flowing out".to_string())
    })
}

fn volatility_regime(ctx: &RuleContext<'_>) -> Result<RuleOutcome, Report<SignalError>> {
    let atr = ctx.latest(Field::Atr)?;
    let series_mean = ctx.atr_mean.ok_or_else(|| {
        Report::new(SignalError::MissingIndicator {
            field: Field::Atr,
            row: "series",
        })
    })?;
    // descriptive only; a high ATR is neither bullish nor bearish
    Ok(if atr > series_mean {
        RuleOutcome::neutral(format!(
            "ATR {atr:.2} above its mean {series_mean:.2}: elevated volatility"
        ))
    } else {
        RuleOutcome::neutral(format!(
            "ATR {atr:.2} at or below its mean {series_mean:.2}: low volatility"
        ))
    })
}

fn stochastic_cross(ctx: &RuleContext<'_>) -> Result<RuleOutcome, Report<SignalError>> {
    let prev_k = ctx.previous(Field::StochK)?;
    let prev_d = ctx.previous(Field::StochD)?;
    let k = ctx.latest(Field::StochK)?;
    let d = ctx.latest(Field::StochD)?;
    let t = &ctx.profile.thresholds;

    let crossed_up = prev_k <= prev_d && k > d;
    let crossed_down = prev_k >= prev_d && k < d;
    let observation = if crossed_up && k > t.stoch_overbought {
        format!("StochRSI %K crossed above %D at {k:.2}: overbought, pullback risk")
    } else if crossed_down && k < t.stoch_oversold {
        format!("StochRSI %K crossed below %D at {k:.2}: oversold, reversal candidate")
    } else {
        format!("StochRSI %K {k:.2} / %D {d:.2}: neutral")
    };

    Ok(RuleOutcome {
        observation: Some(observation),
        bullish: k > d,
    })
}
