//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config::{unknown_keys, EngineConfig};
use crate::domain::drawdown::DrawdownState;
use crate::domain::engine::{Decision, RegimeEngine, TargetAllocation};
use crate::domain::error::RegimeError;
use crate::domain::instrument::Instrument;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::regime::RegimeCell;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(
    name = "regimetrader",
    about = "Regime detection and exposure mapping engine"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay daily bars and emit one target allocation per actionable bar
    Signal {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory holding <SYMBOL>.csv files
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
        /// Bond-trend symbol driving the safe-haven overlay
        #[arg(long)]
        bond_symbol: Option<String>,
        /// Fixed drawdown fraction applied to every bar
        #[arg(long)]
        drawdown: Option<f64>,
        /// CSV output path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file and print the resolved parameters
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Overrides applied on top of the `[data]` section.
#[derive(Debug, Clone, Default)]
pub struct SignalOptions {
    pub symbol: Option<String>,
    pub bond_symbol: Option<String>,
    pub drawdown: Option<f64>,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Signal {
            config,
            data_dir,
            symbol,
            bond_symbol,
            drawdown,
            output,
        } => {
            let options = SignalOptions {
                symbol,
                bond_symbol,
                drawdown,
            };
            run_signal(&config, data_dir, &options, output.as_ref())
        }
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn report(err: RegimeError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(&err)
}

fn run_signal(
    config_path: &PathBuf,
    data_dir: Option<PathBuf>,
    options: &SignalOptions,
    output_path: Option<&PathBuf>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let config = match EngineConfig::from_config(&adapter) {
        Ok(c) => c,
        Err(e) => return report(e),
    };

    let data_dir = data_dir.unwrap_or_else(|| PathBuf::from(&config.data_dir));
    eprintln!("Reading bars from {}", data_dir.display());
    let data_port = CsvAdapter::new(data_dir);

    let allocations = match run_signal_pipeline(&data_port, config, options) {
        Ok(a) => a,
        Err(e) => return report(e),
    };

    let written = match output_path {
        Some(path) => File::create(path)
            .map_err(RegimeError::from)
            .and_then(|file| write_allocations(file, &allocations)),
        None => write_allocations(io::stdout().lock(), &allocations),
    };
    if let Err(e) = written {
        return report(e);
    }

    if let Some(last) = allocations.last() {
        eprintln!(
            "{} allocations, last {} cell={} exposure={:.4} weights: {}",
            allocations.len(),
            last.date,
            last.cell,
            last.adjusted_exposure(),
            last.weights
        );
    }
    if let Some(path) = output_path {
        eprintln!("Wrote {}", path.display());
    }
    ExitCode::SUCCESS
}

/// Loads bars through `data_port` and replays them through a fresh engine.
pub fn run_signal_pipeline(
    data_port: &dyn DataPort,
    mut config: EngineConfig,
    options: &SignalOptions,
) -> Result<Vec<TargetAllocation>, RegimeError> {
    let symbol = options
        .symbol
        .clone()
        .unwrap_or_else(|| config.symbol().to_string());
    if let Some(bond) = &options.bond_symbol {
        if config.instruments.bull_bond.is_none() || config.instruments.bear_bond.is_none() {
            return Err(RegimeError::invalid(
                "instruments",
                "bond_trend",
                format!("bond symbol {} needs bull_bond and bear_bond instruments", bond),
            ));
        }
        config.instruments.bond_trend = Some(bond.clone());
    }
    let bond_symbol = if config.instruments.has_bonds() {
        config.instruments.bond_trend.clone()
    } else {
        None
    };
    let drawdown = match options.drawdown {
        Some(fraction) if (0.0..=1.0).contains(&fraction) => DrawdownState::from_fraction(fraction),
        Some(_) => {
            return Err(RegimeError::invalid(
                "drawdown",
                "override",
                "drawdown must be between 0 and 1",
            ));
        }
        // No portfolio in a replay: equity sits at its high-water mark.
        None => DrawdownState::flat(1.0),
    };

    let bars = data_port.fetch_bars(&symbol, config.start_date, config.end_date)?;
    if bars.is_empty() {
        return Err(RegimeError::NoData { symbol });
    }
    let minimum = config.min_history();
    if bars.len() < minimum {
        return Err(RegimeError::InsufficientData {
            symbol,
            bars: bars.len(),
            minimum,
        });
    }

    let bond_closes = match bond_symbol {
        Some(bond) => load_bond_closes(data_port, &bond, &config)?,
        None => BTreeMap::new(),
    };
    eprintln!(
        "Replaying {} bars of {} ({} bond closes, warm-up {})",
        bars.len(),
        symbol,
        bond_closes.len(),
        minimum
    );

    let mut engine = RegimeEngine::new(config)?;
    Ok(replay(&mut engine, &bars, &bond_closes, &drawdown))
}

/// A missing bond file is not fatal: the overlay falls back to cash.
fn load_bond_closes(
    data_port: &dyn DataPort,
    bond: &str,
    config: &EngineConfig,
) -> Result<BTreeMap<NaiveDate, f64>, RegimeError> {
    match data_port.fetch_bars(bond, config.start_date, config.end_date) {
        Ok(bars) => Ok(bars.into_iter().map(|b| (b.date, b.close)).collect()),
        Err(RegimeError::NoData { .. }) => {
            tracing::warn!(bond, "no bond bars, safe-haven overlay will stay in cash");
            Ok(BTreeMap::new())
        }
        Err(e) => Err(e),
    }
}

pub fn replay(
    engine: &mut RegimeEngine,
    bars: &[OhlcvBar],
    bond_closes: &BTreeMap<NaiveDate, f64>,
    drawdown: &DrawdownState,
) -> Vec<TargetAllocation> {
    bars.iter()
        .filter_map(|bar| {
            match engine.on_bar(bar, bond_closes.get(&bar.date).copied(), drawdown) {
                Decision::Target(t) => Some(t),
                Decision::NotReady { .. } => None,
            }
        })
        .collect()
}

pub fn write_allocations<W: Write>(
    writer: W,
    allocations: &[TargetAllocation],
) -> Result<(), RegimeError> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut header: Vec<&str> = vec![
        "date",
        "trend_strength",
        "z_score",
        "trend_state",
        "vol_state",
        "cell",
        "raw_exposure",
        "adjusted_exposure",
        "region",
    ];
    header.extend(Instrument::ALL.iter().map(|i| i.key()));
    wtr.write_record(&header).map_err(io::Error::from)?;

    for a in allocations {
        let mut row = vec![
            a.date.to_string(),
            format!("{:.4}", a.trend_strength),
            format!("{:.4}", a.z_score),
            a.trend_state.to_string(),
            a.vol_state.to_string(),
            a.cell.to_string(),
            format!("{:.4}", a.raw_exposure()),
            format!("{:.4}", a.adjusted_exposure()),
            a.region.to_string(),
        ];
        row.extend(
            Instrument::ALL
                .iter()
                .map(|&i| format!("{:.6}", a.weights.weight(i))),
        );
        wtr.write_record(&row).map_err(io::Error::from)?;
    }
    wtr.flush()?;
    Ok(())
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let config = match EngineConfig::from_config(&adapter) {
        Ok(c) => c,
        Err(e) => return report(e),
    };

    let unknown = unknown_keys(&adapter);
    if !unknown.is_empty() {
        eprintln!("\nUnrecognised keys (ignored):");
        for key in &unknown {
            eprintln!("  {}", key);
        }
    }

    eprintln!("\nInstruments:");
    for instrument in Instrument::ALL {
        if instrument == Instrument::Cash {
            continue;
        }
        let symbol = config.instruments.symbol(instrument).unwrap_or("(none)");
        eprintln!("  {:<16} {}", instrument.key(), symbol);
    }
    if let Some(bond) = &config.instruments.bond_trend {
        eprintln!("  {:<16} {}", "bond_trend", bond);
    }

    let tf = &config.trend_filter;
    eprintln!("\nTrend filter:");
    eprintln!(
        "  q={} r={} p0={} sigma_lookback={} trend_lookback={} noise_mode={}",
        tf.process_noise,
        tf.measurement_noise,
        tf.initial_covariance,
        tf.sigma_lookback,
        tf.trend_lookback,
        tf.noise_mode
    );
    eprintln!(
        "  trend: ma {}/{} entry {} exit {}",
        config.trend.fast_ma,
        config.trend.slow_ma,
        config.trend.entry_threshold,
        config.trend.exit_threshold
    );

    let vol = &config.volatility;
    eprintln!("\nVolatility:");
    eprintln!(
        "  realized {} baseline {} upper {} lower {} dwell {}",
        vol.realized_window,
        vol.baseline_window,
        vol.upper_threshold,
        vol.lower_threshold,
        vol.min_dwell_bars
    );

    eprintln!("\nCells:");
    for cell in RegimeCell::ALL {
        let rule = config.cells.rule(cell);
        eprintln!("  {:<18} {:>6.2} {:?}", cell.key(), rule.exposure, rule.posture);
    }

    eprintln!("\nRisk:");
    eprintln!(
        "  drawdown soft {} hard {}",
        config.drawdown.soft_threshold, config.drawdown.hard_threshold
    );
    eprintln!(
        "  safe haven sma {}/{} multiplier {} cap {}",
        config.safe_haven.fast_window,
        config.safe_haven.slow_window,
        config.safe_haven.bond_multiplier,
        config.safe_haven.max_bond_weight
    );
    eprintln!(
        "  exposure [{}, {}]",
        config.exposure.min, config.exposure.max
    );

    eprintln!("\nWarm-up: {} bars", config.min_history());
    eprintln!("Configuration is valid.");
    ExitCode::SUCCESS
}
