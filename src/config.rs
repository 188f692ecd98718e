use std::collections::HashSet;
use std::path::Path;

use error_stack::{Report, ResultExt};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::profile::{IndicatorProfile, ProfileKind};

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

fn default_lookback() -> usize {
    200
}

fn default_profile() -> String {
    "standard".into()
}

fn default_surge_multiplier() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub general: GeneralConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub instruments: Vec<InstrumentConfig>,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Accepted values: `"text"` | `"json"`
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Candles kept from the tail of each series before analysis.
    #[serde(default = "default_lookback")]
    pub lookback: usize,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    /// Accepted values: `"standard"` | `"short_horizon"`
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default)]
    pub stoch_rsi: bool,
    #[serde(default = "default_surge_multiplier")]
    pub volume_surge_multiplier: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            stoch_rsi: false,
            volume_surge_multiplier: default_surge_multiplier(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InstrumentConfig {
    pub name: String,
    /// Path to a JSON array of candles.
    pub candles: String,
}

/// Load and validate an `AppConfig` from a TOML file at `path`.
pub fn load(path: &Path) -> Result<AppConfig, Report<ConfigError>> {
    let content = std::fs::read_to_string(path)
        .change_context(ConfigError::ReadFile)
        .attach_with(|| format!("path: {}", path.display()))?;

    let config: AppConfig = toml::from_str(&content).change_context(ConfigError::Parse {
        reason: "invalid TOML syntax or schema mismatch".into(),
    })?;

    validate(&config)?;

    Ok(config)
}

impl AppConfig {
    /// Build the indicator profile for this run. `override_kind` (from the
    /// command line) wins over `[analysis].profile`.
    pub fn profile(
        &self,
        override_kind: Option<&str>,
    ) -> Result<IndicatorProfile, Report<ConfigError>> {
        let name = override_kind.unwrap_or(&self.analysis.profile);
        let kind = parse_profile(name)?;

        let mut profile = IndicatorProfile::for_kind(kind)
            .with_volume_surge_multiplier(self.analysis.volume_surge_multiplier);
        if self.analysis.stoch_rsi && profile.stoch_rsi.is_none() {
            profile = profile.with_stoch_rsi(true);
        }
        profile.validate()?;
        Ok(profile)
    }
}

fn parse_profile(name: &str) -> Result<ProfileKind, Report<ConfigError>> {
    ProfileKind::from_str(name).ok_or_else(|| {
        Report::new(ConfigError::Validation {
            field: format!("analysis.profile: unknown profile \"{name}\""),
        })
    })
}

fn validate(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    validate_general(config)?;
    validate_analysis(config)?;
    validate_instrument_names(config)?;
    Ok(())
}

fn validate_general(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    if config.general.lookback < 2 {
        return Err(Report::new(ConfigError::Validation {
            field: format!(
                "general.lookback must be >= 2, got {}",
                config.general.lookback
            ),
        }));
    }
    Ok(())
}

fn validate_analysis(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    parse_profile(&config.analysis.profile)?;
    let multiplier = config.analysis.volume_surge_multiplier;
    if !multiplier.is_finite() || multiplier <= 0.0 {
        return Err(Report::new(ConfigError::Validation {
            field: format!("analysis.volume_surge_multiplier must be > 0, got {multiplier}"),
        }));
    }
    Ok(())
}

fn validate_instrument_names(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let mut seen = HashSet::new();
    for instrument in &config.instruments {
        if instrument.name.trim().is_empty() {
            return Err(Report::new(ConfigError::Validation {
                field: format!(
                    "instruments[candles={}].name must not be empty",
                    instrument.candles
                ),
            }));
        }
        if !seen.insert(instrument.name.as_str()) {
            return Err(Report::new(ConfigError::Validation {
                field: format!("instruments: duplicate name \"{}\"", instrument.name),
            }));
        }
    }
    Ok(())
}
