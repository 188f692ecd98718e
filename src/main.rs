use std::path::{Path, PathBuf};

use clap::Parser;
use derive_more::{Display, Error};
use error_stack::{Report, ResultExt};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use coin_signal::config::{self, AppConfig, InstrumentConfig};
use coin_signal::feed;
use coin_signal::notifier::Notifier;
use coin_signal::notifier::terminal::TerminalNotifier;
use coin_signal::pipeline::{EnrichedSeries, compute_indicators};
use coin_signal::profile::IndicatorProfile;
use coin_signal::strategy::condition::evaluate;

#[derive(Debug, Display, Error)]
pub enum AppError {
    #[display("configuration error")]
    Config,
    #[display("candle feed error")]
    Feed,
    #[display("indicator error")]
    Indicator,
    #[display("signal error")]
    Signal,
    #[display("export error")]
    Export,
}

#[derive(Parser)]
#[command(name = "coin-signal", about = "Technical indicator and trading signal report")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    /// Override `[analysis].profile` ("standard" | "short_horizon")
    #[arg(short, long)]
    profile: Option<String>,
    /// Write each instrument's enriched series as JSON into this directory
    #[arg(long)]
    export_dir: Option<PathBuf>,
}

fn main() {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Report<AppError>> {
    let cli = Cli::parse();
    let config = config::load(Path::new(&cli.config)).change_context(AppError::Config)?;

    init_tracing(&config);

    let profile = config
        .profile(cli.profile.as_deref())
        .change_context(AppError::Config)?;

    if config.instruments.is_empty() {
        warn!("no instruments configured; nothing to do");
        return Ok(());
    }

    if let Some(dir) = &cli.export_dir {
        std::fs::create_dir_all(dir)
            .change_context(AppError::Export)
            .attach_with(|| format!("export_dir: {}", dir.display()))?;
    }

    info!(
        profile = %profile.kind,
        instruments = config.instruments.len(),
        lookback = config.general.lookback,
        "starting analysis"
    );

    let notifier: Box<dyn Notifier> = Box::new(TerminalNotifier);
    let mut failed = 0usize;
    for instrument in &config.instruments {
        if let Err(e) = analyse_instrument(
            instrument,
            &profile,
            config.general.lookback,
            cli.export_dir.as_deref(),
            notifier.as_ref(),
        ) {
            failed += 1;
            warn!(instrument = %instrument.name, error = ?e, "analysis failed (continuing)");
        }
    }

    info!(
        analysed = config.instruments.len() - failed,
        failed,
        "analysis complete"
    );
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::new(&config.general.log_level);
    match config.general.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

fn analyse_instrument(
    instrument: &InstrumentConfig,
    profile: &IndicatorProfile,
    lookback: usize,
    export_dir: Option<&Path>,
    notifier: &dyn Notifier,
) -> Result<(), Report<AppError>> {
    let series = feed::load_candles(Path::new(&instrument.candles))
        .change_context(AppError::Feed)
        .attach_with(|| format!("instrument: {}", instrument.name))?
        .tail(lookback);

    info!(
        instrument = %instrument.name,
        candles = series.len(),
        required = profile.min_history(),
        "analysing instrument"
    );

    let enriched = compute_indicators(&series, profile).change_context(AppError::Indicator)?;

    if let Some(dir) = export_dir {
        export_series(dir, &instrument.name, &enriched)?;
    }

    let report = evaluate(&enriched, profile)
        .change_context(AppError::Signal)
        .attach_with(|| {
            format!(
                "instrument: {} ({} candles, profile needs {})",
                instrument.name,
                series.len(),
                profile.min_history()
            )
        })?;

    notifier.notify(&instrument.name, &report);
    Ok(())
}

fn export_series(
    dir: &Path,
    instrument: &str,
    enriched: &EnrichedSeries,
) -> Result<(), Report<AppError>> {
    let file_name: String = instrument
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let path = dir.join(format!("{file_name}.json"));

    let json = serde_json::to_string_pretty(enriched).change_context(AppError::Export)?;
    std::fs::write(&path, json)
        .change_context(AppError::Export)
        .attach_with(|| format!("path: {}", path.display()))?;

    info!(instrument, path = %path.display(), rows = enriched.len(), "exported enriched series");
    Ok(())
}
