use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dotnet_reports::aggregate::{CoverageAggregator, UnitTestResultsAggregator};
use dotnet_reports::cli::{self, Style};
use dotnet_reports::config::{
    split_patterns, CoverageConfiguration, FailurePolicy, FileSettings, UnitTestConfiguration,
};
use dotnet_reports::parsers::{CoverageFormat, TestResultsFormat};
use dotnet_reports::wildcard::WildcardResolver;

/// dotnet-reports: read .NET coverage and unit test reports into one summary.
#[derive(Parser)]
#[command(name = "dotnet-reports", version, about)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate coverage reports into per-file line coverage.
    Coverage(CoverageArgs),

    /// Aggregate unit test result reports into project-wide counters.
    Tests(TestsArgs),

    /// List the files a report path pattern matches.
    Resolve {
        /// Pattern such as "TestResults/**/*.trx".
        pattern: String,

        /// Directory relative patterns are resolved against.
        #[arg(long, default_value = ".")]
        base_dir: PathBuf,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// TOML settings file with a [properties] table of report patterns.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory relative patterns are resolved against (default: settings
    /// file `base_dir`, else the current directory).
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Skip reports that fail to parse instead of aborting.
    #[arg(long)]
    best_effort: bool,

    /// Output style.
    #[arg(long, value_enum, default_value = "text")]
    style: Style,
}

#[derive(Args)]
struct CoverageArgs {
    /// NCover 3 report patterns (comma-separated, repeatable).
    #[arg(long, value_name = "PATTERNS")]
    ncover3: Vec<String>,

    /// OpenCover report patterns.
    #[arg(long, value_name = "PATTERNS")]
    opencover: Vec<String>,

    /// dotCover aggregated HTML index patterns.
    #[arg(long, value_name = "PATTERNS")]
    dotcover: Vec<String>,

    /// dotCover single-file HTML report patterns.
    #[arg(long, value_name = "PATTERNS")]
    dotcover_html: Vec<String>,

    /// Visual Studio .coveragexml report patterns.
    #[arg(long, value_name = "PATTERNS")]
    vscoveragexml: Vec<String>,

    /// List the uncovered line ranges of every file.
    #[arg(long)]
    uncovered: bool,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct TestsArgs {
    /// NUnit report patterns, suite durations included.
    #[arg(long, value_name = "PATTERNS")]
    nunit: Vec<String>,

    /// NUnit report patterns, root summary only.
    #[arg(long, value_name = "PATTERNS")]
    nunit_summary: Vec<String>,

    /// Visual Studio .trx patterns, run duration included.
    #[arg(long, value_name = "PATTERNS")]
    trx: Vec<String>,

    /// Visual Studio .trx patterns, counters only.
    #[arg(long, value_name = "PATTERNS")]
    trx_counters: Vec<String>,

    /// xUnit report patterns.
    #[arg(long, value_name = "PATTERNS")]
    xunit: Vec<String>,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = match cli.command {
        Commands::Coverage(args) => run_coverage(args)?,
        Commands::Tests(args) => run_tests(args)?,
        Commands::Resolve { pattern, base_dir } => {
            cli::cmd_resolve(&WildcardResolver::with_platform_separator(base_dir), &pattern)?
        }
    };
    print!("{output}");
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Settings file, resolver and failure policy shared by both report families.
fn load_common(common: &CommonArgs) -> Result<(FileSettings, WildcardResolver, FailurePolicy)> {
    let settings = match &common.config {
        Some(path) => FileSettings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => FileSettings::default(),
    };

    let base_dir = common
        .base_dir
        .clone()
        .or_else(|| settings.base_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let policy = if common.best_effort {
        FailurePolicy::BestEffort
    } else {
        settings.policy
    };

    Ok((settings, WildcardResolver::with_platform_separator(base_dir), policy))
}

fn patterns(values: &[String]) -> Vec<String> {
    values.iter().flat_map(|v| split_patterns(v)).collect()
}

fn run_coverage(args: CoverageArgs) -> Result<String> {
    let (settings, resolver, policy) = load_common(&args.common)?;
    let conf = CoverageConfiguration::for_language(settings.language_key());
    let mut aggregator = CoverageAggregator::from_settings(&conf, &settings, policy);

    for (format, values) in [
        (CoverageFormat::NCover3, &args.ncover3),
        (CoverageFormat::OpenCover, &args.opencover),
        (CoverageFormat::DotCoverAggregated, &args.dotcover),
        (CoverageFormat::DotCover, &args.dotcover_html),
        (CoverageFormat::VisualStudioCoverageXml, &args.vscoveragexml),
    ] {
        if !values.is_empty() {
            aggregator.add_format(format, patterns(values));
        }
    }

    if !aggregator.has_report_paths() {
        anyhow::bail!("No coverage report configured; pass report patterns or --config");
    }
    cli::cmd_coverage(&aggregator, &resolver, args.common.style, args.uncovered)
}

fn run_tests(args: TestsArgs) -> Result<String> {
    let (settings, resolver, policy) = load_common(&args.common)?;
    let conf = UnitTestConfiguration::for_language(settings.language_key());
    let mut aggregator = UnitTestResultsAggregator::from_settings(&conf, &settings, policy);

    for (format, values) in [
        (TestResultsFormat::NUnit, &args.nunit),
        (TestResultsFormat::NUnitSummary, &args.nunit_summary),
        (TestResultsFormat::VisualStudio, &args.trx),
        (TestResultsFormat::VisualStudioCounters, &args.trx_counters),
        (TestResultsFormat::XUnit, &args.xunit),
    ] {
        if !values.is_empty() {
            aggregator.add_format(format, patterns(values));
        }
    }

    if !aggregator.has_report_paths() {
        anyhow::bail!("No test results report configured; pass report patterns or --config");
    }
    cli::cmd_tests(&aggregator, &resolver, args.common.style)
}
