use derive_more::{Display, Error};

use crate::profile::ProfileKind;
use crate::pipeline::Field;

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("failed to read config file")]
    ReadFile,
    #[display("failed to parse config: {reason}")]
    Parse { reason: String },
    #[display("invalid config: {field}")]
    Validation { field: String },
}

#[derive(Debug, Display, Error)]
pub enum SeriesError {
    #[display("candle {index} is not after the previous candle")]
    NotAscending { index: usize },
    #[display("candle {index} has a negative or non-finite {column}")]
    InvalidValue { index: usize, column: &'static str },
    #[display("candle {index} has high below low")]
    InvertedRange { index: usize },
}

#[derive(Debug, Display, Error)]
pub enum FeedError {
    #[display("failed to read candle file")]
    ReadFile,
    #[display("failed to parse candle file")]
    Parse,
    #[display("candle file contains an invalid series")]
    InvalidSeries,
}

#[derive(Debug, Display, Error)]
pub enum IndicatorError {
    #[display("invalid parameter: {name}")]
    InvalidParameter { name: String },
}

#[derive(Debug, Display, Error)]
pub enum SignalError {
    #[display("insufficient history: need {required} rows, got {available}")]
    InsufficientHistory { required: usize, available: usize },
    #[display("insufficient history: {field} is undefined on the {row} row")]
    MissingIndicator { field: Field, row: &'static str },
    #[display("series was computed for the {computed} profile, not {requested}")]
    ProfileMismatch {
        computed: ProfileKind,
        requested: ProfileKind,
    },
}

impl SignalError {
    /// Both row-count and undefined-field failures mean the series is too
    /// short for the active rule table.
    pub fn is_insufficient_history(&self) -> bool {
        matches!(
            self,
            Self::InsufficientHistory { .. } | Self::MissingIndicator { .. }
        )
    }
}
