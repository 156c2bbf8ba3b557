//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::history_feed::{HistoryFeed, LoadReport};
use crate::adapters::paper_broker::PaperBroker;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, RunSummary};
use crate::domain::code_data::IndicatorSettings;
use crate::domain::config_validation::validate_config;
use crate::domain::engine::{DecisionEngine, EngineSettings};
use crate::domain::error::VolshieldError;
use crate::domain::exposure::ExposurePolicy;
use crate::domain::policy::{EntryFactors, PolicyParameters, SkipReason};
use crate::domain::portfolio::Portfolio;
use crate::domain::sizing::SizingParameters;
use crate::domain::universe::{InstrumentClass, Universe, parse_codes};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "volshield", about = "Volatility-sized trend-following decision engine")]
pub struct Cli {
    /// Log filter when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay bar history through the decision engine
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory of {CODE}.csv files; overrides [backtest] data_dir
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print the resolved configuration, defaults included
    ShowConfig {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Everything a run needs, resolved from configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub backtest: BacktestConfig,
    pub universe: Universe,
    pub engine: EngineSettings,
    pub indicators: IndicatorSettings,
}

pub struct RunOutcome {
    pub summary: RunSummary,
    pub portfolio: Portfolio,
    pub load_report: LoadReport,
    pub open_positions: Vec<String>,
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(&cli.log_level);
    match cli.command {
        Command::Run { config, data_dir } => run_backtest(&config, data_dir.as_ref()),
        Command::Validate { config } => run_validate(&config),
        Command::ShowConfig { config } => run_show_config(&config),
    }
}

/// RUST_LOG wins over `--log-level`. A second call is a no-op.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn get_count(adapter: &dyn ConfigPort, section: &str, key: &str, default: usize) -> Result<usize, VolshieldError> {
    let value = adapter.get_int(section, key, default as i64);
    usize::try_from(value).map_err(|_| VolshieldError::invalid(section, key, format!("{} must not be negative", key)))
}

fn parse_date(adapter: &dyn ConfigPort, key: &str) -> Result<NaiveDate, VolshieldError> {
    let raw = adapter
        .get_string("backtest", key)
        .ok_or_else(|| VolshieldError::missing("backtest", key))?;
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| VolshieldError::invalid("backtest", key, "invalid date format (expected YYYY-MM-DD)"))
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, VolshieldError> {
    Ok(BacktestConfig {
        start_date: parse_date(adapter, "start_date")?,
        end_date: parse_date(adapter, "end_date")?,
        initial_capital: adapter.get_double("backtest", "initial_capital", 100_000.0),
        data_dir: adapter
            .get_string("backtest", "data_dir")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "data".to_string()),
        warmup_periods: get_count(adapter, "backtest", "warmup_periods", 100)?,
    })
}

pub fn build_universe(adapter: &dyn ConfigPort) -> Result<Universe, VolshieldError> {
    let mut lists = Vec::with_capacity(InstrumentClass::ALL.len());
    for class in InstrumentClass::ALL {
        let raw = adapter
            .get_string("universe", class.config_key())
            .unwrap_or_default();
        lists.push((class, parse_codes(&raw)?));
    }
    let benchmark = adapter
        .get_string("universe", "benchmark")
        .unwrap_or_default();
    Ok(Universe::from_lists(&lists, &benchmark)?)
}

pub fn build_engine_settings(adapter: &dyn ConfigPort, warmup_periods: usize) -> Result<EngineSettings, VolshieldError> {
    let d = SizingParameters::default();
    let sizing = SizingParameters {
        exposure_ceiling: adapter.get_double("sizing", "exposure_ceiling", d.exposure_ceiling),
        target_volatility: adapter.get_double("sizing", "target_volatility", d.target_volatility),
        min_weight: adapter.get_double("sizing", "min_weight", d.min_weight),
        max_weight: adapter.get_double("sizing", "max_weight", d.max_weight),
        leverage_multiplier: adapter.get_double("sizing", "leverage", d.leverage_multiplier),
        annualization_periods: adapter.get_double("sizing", "annualization_periods", d.annualization_periods),
        default_weight: adapter.get_double("sizing", "default_weight", d.default_weight),
    };

    let exposure_policy = match adapter.get_string("sizing", "exposure_policy") {
        Some(raw) => raw
            .parse::<ExposurePolicy>()
            .map_err(|reason| VolshieldError::invalid("sizing", "exposure_policy", reason))?,
        None => ExposurePolicy::default(),
    };

    let p = PolicyParameters::default();
    let policy = PolicyParameters {
        momentum_threshold: adapter.get_double("policy", "momentum_threshold", p.momentum_threshold),
        entry_factors: EntryFactors {
            crypto: adapter.get_double("policy", "crypto_factor", p.entry_factors.crypto),
            equity: adapter.get_double("policy", "equity_factor", p.entry_factors.equity),
            forex: adapter.get_double("policy", "forex_factor", p.entry_factors.forex),
        },
    };

    Ok(EngineSettings {
        sizing,
        policy,
        exposure_policy,
        warmup_periods,
    })
}

pub fn build_indicator_settings(adapter: &dyn ConfigPort) -> Result<IndicatorSettings, VolshieldError> {
    let d = IndicatorSettings::default();
    Ok(IndicatorSettings {
        supertrend_period: get_count(adapter, "indicators", "supertrend_period", d.supertrend_period)?,
        fast_multiplier: adapter.get_double("indicators", "fast_multiplier", d.fast_multiplier),
        slow_multiplier: adapter.get_double("indicators", "slow_multiplier", d.slow_multiplier),
        rsi_period: get_count(adapter, "indicators", "rsi_period", d.rsi_period)?,
        long_ma_period: get_count(adapter, "indicators", "long_ma_period", d.long_ma_period)?,
        benchmark_ma_period: get_count(adapter, "indicators", "benchmark_ma_period", d.benchmark_ma_period)?,
        weekly_average_weeks: get_count(adapter, "indicators", "weekly_average_weeks", d.weekly_average_weeks)?,
        atr_period: get_count(adapter, "indicators", "atr_period", d.atr_period)?,
    })
}

/// Raw checks, typed build, then range checks. Any error here is fatal.
pub fn build_run_config(adapter: &dyn ConfigPort) -> Result<RunConfig, VolshieldError> {
    validate_config(adapter)?;

    let backtest = build_backtest_config(adapter)?;
    backtest.validate()?;
    let universe = build_universe(adapter)?;
    let engine = build_engine_settings(adapter, backtest.warmup_periods)?;
    engine.sizing.validate()?;
    engine.policy.validate()?;
    let indicators = build_indicator_settings(adapter)?;
    indicators.validate()?;

    Ok(RunConfig {
        backtest,
        universe,
        engine,
        indicators,
    })
}

/// Load, replay and settle one run against any data source.
pub fn run_pipeline(data_port: &dyn DataPort, config: &RunConfig) -> Result<RunOutcome, VolshieldError> {
    let (feed, load_report) = HistoryFeed::load(
        data_port,
        &config.universe,
        &config.indicators,
        config.backtest.start_date,
        config.backtest.end_date,
    )?;
    let timeline = feed.timeline();
    let lookback = config.indicators.longest_lookback();
    if config.backtest.warmup_periods < lookback {
        warn!(
            warmup_periods = config.backtest.warmup_periods,
            lookback,
            "warm-up shorter than indicator lookback, early entries will skip as not ready"
        );
    }
    info!(
        instruments = feed.loaded_count(),
        dates = timeline.len(),
        start = %config.backtest.start_date,
        end = %config.backtest.end_date,
        "running"
    );

    let mut engine = DecisionEngine::new(config.universe.clone(), config.engine.clone())?;
    let mut broker = PaperBroker::new(config.backtest.initial_capital);
    let summary = backtest_engine::run_backtest(&mut engine, &timeline, &feed, &feed, &mut broker);

    let open_positions = engine
        .open_positions()
        .into_iter()
        .map(String::from)
        .collect();

    Ok(RunOutcome {
        summary,
        portfolio: broker.into_portfolio(),
        load_report,
        open_positions,
    })
}

fn run_backtest(config_path: &PathBuf, data_dir_override: Option<&PathBuf>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let config = match build_run_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let data_dir = data_dir_override
        .cloned()
        .unwrap_or_else(|| PathBuf::from(&config.backtest.data_dir));
    let data_port = CsvAdapter::new(data_dir);

    match run_pipeline(&data_port, &config) {
        Ok(outcome) => {
            eprint!("{}", format_summary(&outcome, &config));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn format_summary(outcome: &RunOutcome, config: &RunConfig) -> String {
    let s = &outcome.summary;
    let p = &outcome.portfolio;
    let wins = p.closed_trades.iter().filter(|t| t.is_win()).count();
    let avg_return = if p.closed_trades.is_empty() {
        0.0
    } else {
        p.closed_trades.iter().map(|t| t.return_pct()).sum::<f64>() / p.closed_trades.len() as f64
    };
    let mut out = String::new();

    out.push_str("\n=== Run Summary ===\n");
    out.push_str(&format!(
        "Period:           {} to {}\n",
        config.backtest.start_date, config.backtest.end_date
    ));
    out.push_str(&format!(
        "Periods:          {} ({} warm-up)\n",
        s.periods, s.warmup_periods
    ));
    out.push_str(&format!("Final Equity:     {:.2}\n", p.total_equity()));
    out.push_str(&format!("Total Return:     {:.2}%\n", p.total_return() * 100.0));
    out.push_str(&format!("Max Drawdown:     -{:.1}%\n", p.max_drawdown() * 100.0));
    out.push_str(&format!("Peak Exposure:    {:.1}%\n", s.peak_exposure * 100.0));
    out.push_str(&format!("Entries / Exits:  {} / {}\n", s.entries, s.exits));
    out.push_str(&format!(
        "Closed Trades:    {} ({} winners)\n",
        p.closed_trades.len(),
        wins
    ));
    out.push_str(&format!("Avg Trade Return: {:.2}%\n", avg_return * 100.0));

    out.push_str("\n=== Skips ===\n");
    for reason in [
        SkipReason::RegimeDenied,
        SkipReason::ExposureCeiling,
        SkipReason::IndicatorNotReady,
        SkipReason::NoSignal,
    ] {
        out.push_str(&format!("  {:<20} {}\n", reason.to_string(), s.skipped(reason)));
    }
    out.push_str(&format!("  {:<20} {}\n", "missing_data", s.missing_observations));

    if !outcome.open_positions.is_empty() {
        out.push_str(&format!("\nOpen at end: {}\n", outcome.open_positions.join(", ")));
    }
    if !outcome.load_report.skipped.is_empty() {
        out.push_str("\nNot loaded:\n");
        for (code, reason) in &outcome.load_report.skipped {
            out.push_str(&format!("  {}: {}\n", code, reason));
        }
    }
    out
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    match build_run_config(&adapter) {
        Ok(config) => {
            eprintln!(
                "Config is valid: {} instruments, benchmark {}",
                config.universe.count(),
                config.universe.benchmark
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_show_config(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    match build_run_config(&adapter) {
        Ok(config) => {
            print!("{}", describe_config(&config));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// The resolved configuration in INI layout.
pub fn describe_config(config: &RunConfig) -> String {
    let b = &config.backtest;
    let s = &config.engine.sizing;
    let p = &config.engine.policy;
    let i = &config.indicators;

    let codes_of = |class: InstrumentClass| {
        config
            .universe
            .instruments
            .iter()
            .filter(|inst| inst.class == class)
            .map(|inst| inst.code.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut out = String::new();
    out.push_str("[backtest]\n");
    out.push_str(&format!("start_date = {}\n", b.start_date));
    out.push_str(&format!("end_date = {}\n", b.end_date));
    out.push_str(&format!("initial_capital = {}\n", b.initial_capital));
    out.push_str(&format!("data_dir = {}\n", b.data_dir));
    out.push_str(&format!("warmup_periods = {}\n", b.warmup_periods));

    out.push_str("\n[universe]\n");
    for class in InstrumentClass::ALL {
        out.push_str(&format!("{} = {}\n", class.config_key(), codes_of(class)));
    }
    out.push_str(&format!("benchmark = {}\n", config.universe.benchmark));

    out.push_str("\n[sizing]\n");
    out.push_str(&format!("exposure_ceiling = {}\n", s.exposure_ceiling));
    out.push_str(&format!("target_volatility = {}\n", s.target_volatility));
    out.push_str(&format!("min_weight = {}\n", s.min_weight));
    out.push_str(&format!("max_weight = {}\n", s.max_weight));
    out.push_str(&format!("leverage = {}\n", s.leverage_multiplier));
    out.push_str(&format!("annualization_periods = {}\n", s.annualization_periods));
    out.push_str(&format!("default_weight = {}\n", s.default_weight));
    out.push_str(&format!("exposure_policy = {}\n", config.engine.exposure_policy));

    out.push_str("\n[policy]\n");
    out.push_str(&format!("momentum_threshold = {}\n", p.momentum_threshold));
    out.push_str(&format!("crypto_factor = {}\n", p.entry_factors.crypto));
    out.push_str(&format!("equity_factor = {}\n", p.entry_factors.equity));
    out.push_str(&format!("forex_factor = {}\n", p.entry_factors.forex));

    out.push_str("\n[indicators]\n");
    out.push_str(&format!("supertrend_period = {}\n", i.supertrend_period));
    out.push_str(&format!("fast_multiplier = {}\n", i.fast_multiplier));
    out.push_str(&format!("slow_multiplier = {}\n", i.slow_multiplier));
    out.push_str(&format!("rsi_period = {}\n", i.rsi_period));
    out.push_str(&format!("long_ma_period = {}\n", i.long_ma_period));
    out.push_str(&format!("benchmark_ma_period = {}\n", i.benchmark_ma_period));
    out.push_str(&format!("weekly_average_weeks = {}\n", i.weekly_average_weeks));
    out.push_str(&format!("atr_period = {}\n", i.atr_period));
    out
}
