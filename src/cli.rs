//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::validate_index_config;
use crate::domain::error::IdxtrackError;
use crate::domain::index_config::{
    AnalyticsParams, Currency, IndexConfig, IndexType, Schedule, ScreenParams, UniverseId,
};
use crate::domain::market_data::{list_countries, MarketData};
use crate::domain::period::tracking_periods;
use crate::domain::pipeline::{build_index, IndexBuild};
use crate::domain::sheet::{price_sheet_name, qualitative_sheet_name, FOREX_SHEET, INDEX_SHEET};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

const DEFAULT_OUTPUT_DIR: &str = "idxtrack-output";

#[derive(Parser, Debug)]
#[command(name = "idxtrack", about = "Custom equity index builder and tracker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build, track and analyze an index
    Build {
        #[arg(short, long)]
        config: PathBuf,
        /// Output directory for the CSV tables
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        currency: Option<String>,
        #[arg(long)]
        universe: Option<String>,
        /// Index type: high-vol-per, momentum or geographic
        #[arg(long)]
        index: Option<String>,
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate an index configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List countries available to a geographic index
    Countries {
        #[arg(short, long)]
        config: PathBuf,
        /// Reference year of the qualitative sheet
        #[arg(long)]
        year: Option<i32>,
    },
    /// List the sheets the configured source exposes
    Sheets {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Build {
            config,
            output,
            currency,
            universe,
            index,
            country,
            dry_run,
        } => {
            let overrides = [
                ("currency", currency),
                ("universe", universe),
                ("type", index),
                ("country", country),
            ];
            run_build(&config, output.as_deref(), &overrides, dry_run)
        }
        Command::Validate { config } => run_validate(&config),
        Command::Countries { config, year } => run_countries(&config, year),
        Command::Sheets { config } => run_sheets(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Command-line values layered over a file configuration.
///
/// Only string keys are overridden; numeric lookups of an overridden key
/// parse the override.
pub struct LayeredConfig<'a> {
    base: &'a dyn ConfigPort,
    overrides: HashMap<(String, String), String>,
}

impl<'a> LayeredConfig<'a> {
    pub fn new(base: &'a dyn ConfigPort) -> Self {
        Self {
            base,
            overrides: HashMap::new(),
        }
    }

    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.overrides
            .insert((section.to_string(), key.to_string()), value.into());
    }

    fn get_override(&self, section: &str, key: &str) -> Option<&str> {
        self.overrides
            .get(&(section.to_string(), key.to_string()))
            .map(String::as_str)
    }
}

impl ConfigPort for LayeredConfig<'_> {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        match self.get_override(section, key) {
            Some(v) => Some(v.to_string()),
            None => self.base.get_string(section, key),
        }
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        match self.get_override(section, key) {
            Some(v) => v.trim().parse().unwrap_or(default),
            None => self.base.get_int(section, key, default),
        }
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        match self.get_override(section, key) {
            Some(v) => v.trim().parse().unwrap_or(default),
            None => self.base.get_double(section, key, default),
        }
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.base.get_bool(section, key, default)
    }
}

fn required(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, IdxtrackError> {
    config
        .get_string(section, key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| IdxtrackError::ConfigMissing {
            section: section.into(),
            key: key.into(),
        })
}

/// Assemble the immutable run configuration from `[index]`, `[schedule]`,
/// `[screen]` and `[analytics]`.
pub fn build_index_config(config: &dyn ConfigPort) -> Result<IndexConfig, IdxtrackError> {
    let parse_err = |key: &str| {
        let key = key.to_string();
        move |e: IdxtrackError| IdxtrackError::ConfigInvalid {
            section: "index".into(),
            key,
            reason: e.to_string(),
        }
    };

    let currency = required(config, "index", "currency")?
        .parse::<Currency>()
        .map_err(parse_err("currency"))?;
    let universe = required(config, "index", "universe")?
        .parse::<UniverseId>()
        .map_err(parse_err("universe"))?;
    let index_type = required(config, "index", "type")?
        .parse::<IndexType>()
        .map_err(parse_err("type"))?;
    let source_currency = match config.get_string("index", "source_currency") {
        Some(s) => s.parse::<Currency>().map_err(parse_err("source_currency"))?,
        None => Currency::Usd,
    };
    let country = config
        .get_string("index", "country")
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    let schedule_defaults = Schedule::default();
    let screen_defaults = ScreenParams::default();
    let analytics_defaults = AnalyticsParams::default();

    let index_config = IndexConfig {
        currency,
        universe,
        index_type,
        country,
        source_currency,
        schedule: Schedule {
            history_start: config.get_int(
                "schedule",
                "history_start",
                schedule_defaults.history_start as i64,
            ) as i32,
            first_formation_year: config.get_int(
                "schedule",
                "first_formation_year",
                schedule_defaults.first_formation_year as i64,
            ) as i32,
            last_formation_year: config.get_int(
                "schedule",
                "last_formation_year",
                schedule_defaults.last_formation_year as i64,
            ) as i32,
        },
        screen: ScreenParams {
            volatility_quantile: config.get_double(
                "screen",
                "volatility_quantile",
                screen_defaults.volatility_quantile,
            ),
            valuation_quantile: config.get_double(
                "screen",
                "valuation_quantile",
                screen_defaults.valuation_quantile,
            ),
            valuation_attribute: config
                .get_string("screen", "valuation_attribute")
                .unwrap_or(screen_defaults.valuation_attribute),
            capitalization_attribute: config
                .get_string("screen", "capitalization_attribute")
                .unwrap_or(screen_defaults.capitalization_attribute),
            country_attribute: config
                .get_string("screen", "country_attribute")
                .unwrap_or(screen_defaults.country_attribute),
            momentum_top_n: config.get_int(
                "screen",
                "momentum_top_n",
                screen_defaults.momentum_top_n as i64,
            )
            .max(1) as usize,
        },
        analytics: AnalyticsParams {
            risk_free_rate: config.get_double(
                "analytics",
                "risk_free_rate",
                analytics_defaults.risk_free_rate,
            ),
            periods_per_year: config.get_double(
                "analytics",
                "periods_per_year",
                analytics_defaults.periods_per_year,
            ),
        },
    };
    index_config.check()?;
    Ok(index_config)
}

/// Open the data source named by `[source] kind`.
pub fn open_source(config: &dyn ConfigPort) -> Result<Box<dyn DataPort>, IdxtrackError> {
    let kind = required(config, "source", "kind")?;
    match kind.trim().to_lowercase().as_str() {
        "csv" => {
            let path = required(config, "source", "path")?;
            Ok(Box::new(CsvAdapter::new(PathBuf::from(path))))
        }
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            use crate::adapters::sqlite_adapter::SqliteAdapter;
            Ok(Box::new(SqliteAdapter::from_config(config)?))
        }
        #[cfg(not(feature = "sqlite"))]
        "sqlite" => Err(IdxtrackError::Configuration {
            reason: "sqlite feature is required for [source] kind = sqlite".into(),
        }),
        other => Err(IdxtrackError::ConfigInvalid {
            section: "source".into(),
            key: "kind".into(),
            reason: format!("unknown source kind '{}'", other),
        }),
    }
}

pub fn run_build(
    config_path: &Path,
    output_path: Option<&Path>,
    overrides: &[(&str, Option<String>)],
    dry_run: bool,
) -> ExitCode {
    // Stage 1: Load config and apply command-line overrides
    eprintln!("Loading config from {}", config_path.display());
    let file_config = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let mut adapter = LayeredConfig::new(&file_config);
    for (key, value) in overrides {
        if let Some(value) = value {
            adapter.set("index", key, value.as_str());
        }
    }

    // Stage 2: Validate and resolve
    if let Err(e) = validate_index_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    let index_config = match build_index_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if dry_run {
        print_plan(&index_config);
        eprintln!("\nDry run complete: configuration is valid");
        return ExitCode::SUCCESS;
    }

    // Stage 3: Open source and run the pipeline
    let port = match open_source(&adapter) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let market_data = MarketData::new(port.as_ref(), index_config.source_currency);

    eprintln!(
        "Building {} on {} in {}",
        index_config.index_label(),
        index_config.universe,
        index_config.currency
    );
    let build = match build_index(&market_data, &index_config) {
        Ok(b) => b,
        Err(failure) => {
            eprintln!("error: {failure}");
            return (&failure).into();
        }
    };

    // Stage 4: Console summary
    print_summary(&build);

    // Stage 5: Write tables
    let output = output_path
        .map(Path::to_path_buf)
        .or_else(|| adapter.get_string("output", "dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    match CsvReportAdapter.write(&build, &output.to_string_lossy()) {
        Ok(()) => {
            eprintln!("\nReport written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to write report: {e}");
            (&e).into()
        }
    }
}

fn print_plan(config: &IndexConfig) {
    eprintln!("\nIndex:");
    eprintln!("  type:      {}", config.index_label());
    eprintln!("  universe:  {}", config.universe);
    eprintln!("  currency:  {} (source {})", config.currency, config.source_currency);

    let periods: Vec<String> = tracking_periods(
        config.schedule.formation_years(),
        config.index_type.is_semi_annual(),
    )
    .iter()
    .map(ToString::to_string)
    .collect();
    eprintln!("\nTracking periods: {}", periods.join(", "));

    let mut sheets = vec![
        price_sheet_name(config.universe.ticker()),
        INDEX_SHEET.to_string(),
    ];
    sheets.extend(config.schedule.formation_years().map(qualitative_sheet_name));
    if config.currency != config.source_currency {
        sheets.push(FOREX_SHEET.to_string());
    }
    eprintln!("Sheets required:  {}", sheets.join(", "));
}

fn print_summary(build: &IndexBuild) {
    eprintln!(
        "\n=== {} vs {} ({}) ===",
        build.label,
        build.config.universe,
        build.config.currency
    );
    if let (Some(first), Some(last)) = (build.index.first(), build.index.last()) {
        eprintln!(
            "Tracked:          {} to {} ({} points)",
            first.date,
            last.date,
            build.index.len()
        );
    }
    if let Some((period, weights)) = build.latest_weights() {
        eprintln!("Constituents:     {} (period {})", weights.len(), period);
    }
    for (label, value) in build.report.rows() {
        match value {
            Ok(v) => eprintln!("{:<28}{:.2}", format!("{}:", label), v),
            Err(e) => eprintln!("{:<28}n/a ({})", format!("{}:", label), e),
        }
    }
}

pub fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_index_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    match build_index_config(&adapter) {
        Ok(config) => {
            print_plan(&config);
            eprintln!("\nConfig validated successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn run_countries(config_path: &Path, year: Option<i32>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let port = match open_source(&adapter) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let year = year.unwrap_or_else(|| {
        adapter.get_int(
            "schedule",
            "first_formation_year",
            Schedule::default().first_formation_year as i64,
        ) as i32
    });
    let attribute = adapter
        .get_string("screen", "country_attribute")
        .unwrap_or(ScreenParams::default().country_attribute);

    match list_countries(port.as_ref(), year, &attribute) {
        Ok(countries) => {
            for country in &countries {
                println!("{}", country);
            }
            eprintln!("{} countries found in {}", countries.len(), year);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn run_sheets(config_path: &Path) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let port = match open_source(&adapter) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    match port.list_sheets() {
        Ok(sheets) if sheets.is_empty() => {
            eprintln!("No sheets found");
            ExitCode::SUCCESS
        }
        Ok(sheets) => {
            for sheet in &sheets {
                println!("{}", sheet);
            }
            eprintln!("{} sheets found", sheets.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}
