use clap::Parser;
use colored::Colorize;
use miette::{miette, Result};
use std::path::PathBuf;
use tracing::info;

mod analysis;
mod config;
mod discovery;
mod dupes;
mod error;
mod execute;
mod pipeline;
mod plan;
mod report;
mod risk;
mod safety;
mod usage;

use config::CleanupConfig;
use pipeline::{CleanupPipeline, Phase};
use report::Reporter;

/// codesweep - batch cleanup for multi-language web codebases
#[derive(Parser, Debug)]
#[command(name = "codesweep")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the project directory to clean
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Source directories to analyze (can be specified multiple times)
    #[arg(short, long)]
    source: Vec<PathBuf>,

    /// Patterns to exclude (can be specified multiple times)
    #[arg(short, long)]
    exclude: Vec<String>,

    /// Report the plan without touching any file
    #[arg(long)]
    dry_run: bool,

    /// Remove unused imports
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    remove_unused_imports: bool,

    /// Remove unused private/protected methods
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    remove_unused_methods: bool,

    /// Remove unused variables and properties
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    remove_unused_variables: bool,

    /// Rewrite duplicate methods and style rules
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    refactor_duplicates: bool,

    /// Extract duplicated template blocks into shared components
    #[arg(long)]
    create_components: bool,

    /// Delete files whose every symbol is unused
    #[arg(long)]
    delete_files: bool,

    /// Copy every file into the backup directory before modifying it
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    create_backup: bool,

    /// Run the validation test suites before and after execution
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    run_tests: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "terminal")]
    format: OutputFormat,

    /// Output file (for json format)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - only output results
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug, Default)]
enum OutputFormat {
    #[default]
    Terminal,
    Json,
}

impl From<OutputFormat> for report::ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Terminal => report::ReportFormat::Terminal,
            OutputFormat::Json => report::ReportFormat::Json,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    info!("codesweep v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;

    if !config.dry_run && !cli.yes {
        let proceed = dialoguer::Confirm::new()
            .with_prompt(format!(
                "Clean up {} (a checkpoint and backups will be taken first)?",
                cli.path.display()
            ))
            .default(false)
            .interact()
            .map_err(|e| miette!("Prompt failed: {}", e))?;
        if !proceed {
            println!("{}", "Aborted.".yellow());
            return Ok(());
        }
    }

    let spinner = if matches!(cli.format, OutputFormat::Terminal) && !cli.quiet && !cli.verbose {
        use indicatif::{ProgressBar, ProgressStyle};
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("valid template"),
        );
        pb.set_message("Sweeping...");
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let report = CleanupPipeline::new(config, &cli.path).run();

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let reporter = Reporter::new(cli.format.into(), cli.output.clone());
    reporter
        .report(&report)
        .map_err(|e| miette!("Report rendering failed: {}", e))?;

    if report.phase_reached == Phase::Failed {
        std::process::exit(1);
    }
    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<CleanupConfig> {
    let mut config = if let Some(config_path) = &cli.config {
        CleanupConfig::from_file(config_path)?
    } else {
        CleanupConfig::from_default_locations(&cli.path)?
    };

    // Override with CLI arguments
    if !cli.source.is_empty() {
        config.source_dirs = cli.source.clone();
    }
    if !cli.exclude.is_empty() {
        config.exclude.extend(cli.exclude.clone());
    }
    config.dry_run = cli.dry_run;
    config.create_backup = cli.create_backup;
    config.run_tests = cli.run_tests;
    config.categories.remove_unused_imports = cli.remove_unused_imports;
    config.categories.remove_unused_methods = cli.remove_unused_methods;
    config.categories.remove_unused_variables = cli.remove_unused_variables;
    config.categories.refactor_duplicates = cli.refactor_duplicates;
    config.categories.create_components = cli.create_components;
    config.categories.delete_files = cli.delete_files;

    Ok(config)
}
