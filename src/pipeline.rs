use std::collections::BTreeMap;
use std::fmt;

use error_stack::Report;
use serde::Serialize;
use tracing::debug;

use crate::error::IndicatorError;
use crate::indicator::Indicator;
use crate::indicator::atr::{Atr, true_range};
use crate::indicator::bollinger::BollingerBands;
use crate::indicator::macd::Macd;
use crate::indicator::obv::Obv;
use crate::indicator::rsi::Rsi;
use crate::indicator::stoch_rsi::StochRsi;
use crate::indicator::defined;
use crate::indicator::volume::VolumeMA;
use crate::model::{Candle, CandleSeries};
use crate::profile::{IndicatorProfile, ProfileKind};

/// Every derived column the pipeline can attach to a candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Rsi,
    TrendShort,
    TrendLong,
    BandMiddle,
    BandStd,
    BandUpper,
    BandLower,
    EmaFast,
    EmaSlow,
    Macd,
    MacdSignal,
    MacdHistogram,
    StochRsi,
    StochK,
    StochD,
    TrueRange,
    Atr,
    Obv,
    VolumeMa,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rsi => "rsi",
            Self::TrendShort => "trend_short",
            Self::TrendLong => "trend_long",
            Self::BandMiddle => "band_middle",
            Self::BandStd => "band_std",
            Self::BandUpper => "band_upper",
            Self::BandLower => "band_lower",
            Self::EmaFast => "ema_fast",
            Self::EmaSlow => "ema_slow",
            Self::Macd => "macd",
            Self::MacdSignal => "macd_signal",
            Self::MacdHistogram => "macd_histogram",
            Self::StochRsi => "stoch_rsi",
            Self::StochK => "stoch_k",
            Self::StochD => "stoch_d",
            Self::TrueRange => "true_range",
            Self::Atr => "atr",
            Self::Obv => "obv",
            Self::VolumeMa => "volume_ma",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A candle with its derived fields. `None` marks a value without enough
/// history (or with a degenerate denominator); it is never zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRow {
    #[serde(flatten)]
    pub candle: Candle,
    pub values: BTreeMap<Field, Option<f64>>,
    pub volume_rising: Option<bool>,
}

impl EnrichedRow {
    /// Value of `field`; `None` when undefined or not produced by the profile.
    pub fn get(&self, field: Field) -> Option<f64> {
        self.values.get(&field).copied().flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedSeries {
    pub profile: ProfileKind,
    pub rows: Vec<EnrichedRow>,
}

impl EnrichedSeries {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(previous, latest)` when at least two rows exist.
    pub fn last_two(&self) -> Option<(&EnrichedRow, &EnrichedRow)> {
        match self.rows.as_slice() {
            [.., previous, latest] => Some((previous, latest)),
            _ => None,
        }
    }

    pub fn column(&self, field: Field) -> Vec<Option<f64>> {
        self.rows.iter().map(|row| row.get(field)).collect()
    }
}

/// Derive every indicator the profile asks for.
///
/// Short series are not an error: fields whose window is longer than the
/// series are simply undefined on every row. Errors only come from invalid
/// profile parameters.
pub fn compute_indicators(
    series: &CandleSeries,
    profile: &IndicatorProfile,
) -> Result<EnrichedSeries, Report<IndicatorError>> {
    let candles = series.candles();
    let mut columns: Vec<(Field, Vec<Option<f64>>)> = Vec::new();

    let (trend_short, trend_long) = profile.trend.indicators()?;
    let single: [(Field, Box<dyn Indicator>); 6] = [
        (Field::Rsi, Box::new(Rsi::new(profile.rsi_period)?)),
        (Field::TrendShort, trend_short),
        (Field::TrendLong, trend_long),
        (Field::Atr, Box::new(Atr::new(profile.atr_period)?)),
        (Field::Obv, Box::new(Obv)),
        (Field::VolumeMa, Box::new(VolumeMA::new(profile.volume_period)?)),
    ];
    for (field, indicator) in &single {
        columns.push((*field, indicator.calculate(candles)));
    }
    columns.push((Field::TrueRange, defined(&true_range(candles))));

    let bands = BollingerBands::new(
        profile.band_period,
        profile.band_multiplier,
        profile.band_center,
    )?
    .calculate_bands(candles);
    columns.push((Field::BandMiddle, bands.iter().map(|b| b.middle).collect()));
    columns.push((Field::BandStd, bands.iter().map(|b| b.std_dev).collect()));
    columns.push((Field::BandUpper, bands.iter().map(|b| b.upper).collect()));
    columns.push((Field::BandLower, bands.iter().map(|b| b.lower).collect()));

    let macd = Macd::new(profile.macd.fast, profile.macd.slow, profile.macd.signal)?
        .calculate_full(candles);
    columns.push((Field::EmaFast, macd.iter().map(|p| Some(p.fast_ema)).collect()));
    columns.push((Field::EmaSlow, macd.iter().map(|p| Some(p.slow_ema)).collect()));
    columns.push((Field::Macd, macd.iter().map(|p| Some(p.macd)).collect()));
    columns.push((Field::MacdSignal, macd.iter().map(|p| Some(p.signal)).collect()));
    columns.push((Field::MacdHistogram, macd.iter().map(|p| Some(p.histogram)).collect()));

    if let Some(params) = &profile.stoch_rsi {
        let stoch = StochRsi::new(
            profile.rsi_period,
            params.window,
            params.k_smoothing,
            params.d_smoothing,
        )?;
        let points = match columns.iter().find(|(field, _)| *field == Field::Rsi) {
            Some((_, rsi)) => stoch.calculate_from_rsi(rsi),
            None => stoch.calculate_full(candles),
        };
        columns.push((Field::StochRsi, points.iter().map(|p| p.raw).collect()));
        columns.push((Field::StochK, points.iter().map(|p| p.k).collect()));
        columns.push((Field::StochD, points.iter().map(|p| p.d).collect()));
    }

    let volume_rising = VolumeMA::new(profile.volume_period)?
        .detect_surges(candles, profile.volume_surge_multiplier)?;

    let rows: Vec<EnrichedRow> = candles
        .iter()
        .enumerate()
        .map(|(i, candle)| EnrichedRow {
            candle: candle.clone(),
            values: columns.iter().map(|(field, col)| (*field, col[i])).collect(),
            volume_rising: volume_rising[i],
        })
        .collect();

    debug!(
        profile = %profile.kind,
        rows = rows.len(),
        fields = columns.len(),
        "computed indicators"
    );

    Ok(EnrichedSeries {
        profile: profile.kind,
        rows,
    })
}
