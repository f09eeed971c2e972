use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use clap::{Args, Parser, Subcommand, ValueEnum};
use photocopy_core::{
    app_paths, load_config, save_config, validate_template, AppConfig, DuplicatePolicy,
    ExifMetadataProvider, LogLevel, NullGeocodingService, Operation, Options, OsFileSystem,
    Pipeline, RelatedFileMode, DEFAULT_TEMPLATE,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "photocopy")]
#[command(about = "Organizes photos and videos into a destination tree driven by a path template")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scan the source and print the plan without touching the destination.
    Plan(RunArgs),
    /// Scan the source and copy or move files into the destination.
    Run(RunArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
    /// Write the current defaults to the platform config file.
    Init,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[arg(long)]
    source: PathBuf,
    #[arg(long)]
    destination: PathBuf,
    #[arg(long, default_value = DEFAULT_TEMPLATE)]
    template: String,
    #[arg(long, value_enum, default_value_t = OperationArg::Copy)]
    operation: OperationArg,
    #[arg(long, default_value_t = true)]
    recursive: bool,
    #[arg(long, value_enum, default_value_t = DuplicatePolicyArg::SkipIdentical)]
    duplicate_policy: DuplicatePolicyArg,
    #[arg(long, default_value = "")]
    unknown_location_fallback: String,
    #[arg(long, default_value_t = false)]
    country_as_code: bool,
    #[arg(long, value_enum, default_value_t = RelatedFileModeArg::None)]
    related_file_mode: RelatedFileModeArg,
    #[arg(long)]
    min_date: Option<String>,
    #[arg(long)]
    max_date: Option<String>,
    #[arg(long, value_enum, default_value_t = LogLevelArg::Normal)]
    log_level: LogLevelArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OperationArg {
    Copy,
    Move,
}

impl From<OperationArg> for Operation {
    fn from(value: OperationArg) -> Self {
        match value {
            OperationArg::Copy => Operation::Copy,
            OperationArg::Move => Operation::Move,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DuplicatePolicyArg {
    SkipIdentical,
    Overwrite,
    KeepBoth,
    Fail,
}

impl From<DuplicatePolicyArg> for DuplicatePolicy {
    fn from(value: DuplicatePolicyArg) -> Self {
        match value {
            DuplicatePolicyArg::SkipIdentical => DuplicatePolicy::SkipIdentical,
            DuplicatePolicyArg::Overwrite => DuplicatePolicy::Overwrite,
            DuplicatePolicyArg::KeepBoth => DuplicatePolicy::KeepBoth,
            DuplicatePolicyArg::Fail => DuplicatePolicy::Fail,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RelatedFileModeArg {
    None,
    SameStem,
}

impl From<RelatedFileModeArg> for RelatedFileMode {
    fn from(value: RelatedFileModeArg) -> Self {
        match value {
            RelatedFileModeArg::None => RelatedFileMode::None,
            RelatedFileModeArg::SameStem => RelatedFileMode::SameStem,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevelArg {
    ErrorsOnly,
    Normal,
    Verbose,
}

impl From<LogLevelArg> for LogLevel {
    fn from(value: LogLevelArg) -> Self {
        match value {
            LogLevelArg::ErrorsOnly => LogLevel::ErrorsOnly,
            LogLevelArg::Normal => LogLevel::Normal,
            LogLevelArg::Verbose => LogLevel::Verbose,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Plan(args) => run_pipeline(args, true),
        Commands::Run(args) => run_pipeline(args, false),
        Commands::Config(config) => match config.action {
            ConfigAction::Show => cmd_config_show(),
            ConfigAction::Init => cmd_config_init(),
        },
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn init_logging(level: LogLevel) {
    let filter = match level {
        LogLevel::ErrorsOnly => "error",
        LogLevel::Normal => "info",
        LogLevel::Verbose => "debug",
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .try_init();
}

fn parse_date_bound(raw: &str) -> Result<DateTime<Local>> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("expected a date in YYYY-MM-DD form, got '{raw}'"))?;
    Local
        .from_local_datetime(&date.and_hms_opt(0, 0, 0).expect("midnight is always valid"))
        .single()
        .ok_or_else(|| anyhow::anyhow!("'{raw}' is ambiguous in the local timezone"))
}

fn run_pipeline(args: RunArgs, dry_run: bool) -> Result<ExitCode> {
    let log_level: LogLevel = args.log_level.into();
    init_logging(log_level);

    validate_template(&args.template)?;

    let options = Options {
        source: args.source,
        destination: args.destination,
        template: args.template,
        operation: args.operation.into(),
        dry_run,
        recursive: args.recursive,
        min_date: args.min_date.as_deref().map(parse_date_bound).transpose()?,
        max_date: args.max_date.as_deref().map(parse_date_bound).transpose()?,
        duplicate_policy: args.duplicate_policy.into(),
        unknown_location_fallback: args.unknown_location_fallback,
        country_as_code: args.country_as_code,
        log_level,
        related_file_mode: args.related_file_mode.into(),
    };

    let fs = OsFileSystem;
    let metadata_provider = ExifMetadataProvider;
    let geocoder = NullGeocodingService;

    let mut pipeline = Pipeline::new(options, &fs, &metadata_provider, &geocoder)?;
    let scan_summary = pipeline.scan()?;
    println!(
        "scanned {} files, accepted {} ({} rejected, {} inaccessible)",
        scan_summary.scanned,
        scan_summary.accepted,
        scan_summary.rejected_by_validator,
        scan_summary.access_errors
    );

    let apply_summary = pipeline.apply()?;
    println!(
        "{}: new={} renamed={} overwritten={} skipped={} errors={}",
        if dry_run { "plan" } else { "applied" },
        apply_summary.new,
        apply_summary.renamed,
        apply_summary.overwritten,
        apply_summary.skipped_identical,
        apply_summary.collision_errors
    );

    if apply_summary.collision_errors > 0 {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_config_show() -> Result<ExitCode> {
    let config = load_config()?;
    let paths = app_paths()?;
    println!("config file: {}", paths.config_path.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(ExitCode::SUCCESS)
}

fn cmd_config_init() -> Result<ExitCode> {
    save_config(&AppConfig::default())?;
    let paths = app_paths()?;
    println!("wrote defaults to {}", paths.config_path.display());
    Ok(ExitCode::SUCCESS)
}
