use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use waste_insight::analysis::build_summaries;
use waste_insight::config::PipelineConfig;
use waste_insight::data::{load_and_preprocess, remove_outliers_iqr_per_line, Field, RecordSet};
use waste_insight::ml::train_and_compare_models;
use waste_insight::output::{
    render_management_report, save_model_artifacts, write_outputs, write_parquet,
};

#[derive(Parser, Debug)]
#[command(name = "waste-insight", version)]
#[command(about = "Clean a factory waste log, summarise it and compare waste prediction models")]
struct Cli {
    /// Log at debug level (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean the waste log and write summary tables plus the management report
    Analyze(CommonArgs),
    /// Train the candidate models and save metrics, the best model and its report
    Train {
        #[command(flatten)]
        common: CommonArgs,

        /// Seed for the train/test split, cross-validation and ensembles
        #[arg(long, default_value_t = 42)]
        random_state: u64,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Source spreadsheet (.xlsx, .xls, .xlsm, .xlsb, .ods or .csv)
    #[arg(long)]
    input: PathBuf,

    /// Output directory for tables, reports and model artifacts
    #[arg(long, default_value = "outputs")]
    out: PathBuf,

    /// Skip the per-line IQR outlier removal step
    #[arg(long)]
    skip_iqr_outlier_removal: bool,

    /// Fail when a mandatory column is missing from the source header
    #[arg(long)]
    strict_schema: bool,

    /// JSON pipeline configuration (template layout, headers, line map, limits)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match cli.command {
        Command::Analyze(common) => run_analysis(&common),
        Command::Train {
            common,
            random_state,
        } => run_training(&common, random_state),
    }
}

fn load_config(args: &CommonArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    config.strict_schema |= args.strict_schema;
    config.validate().context("validating pipeline configuration")?;
    Ok(config)
}

/// Load, clean and (unless skipped) outlier-filter the input.
fn prepare(args: &CommonArgs, config: &PipelineConfig) -> Result<RecordSet> {
    let set = load_and_preprocess(&args.input, config)
        .with_context(|| format!("preparing {}", args.input.display()))?;
    if args.skip_iqr_outlier_removal {
        log::info!("outlier removal skipped");
        return Ok(set);
    }
    Ok(remove_outliers_iqr_per_line(
        &set,
        Field::WasteKg,
        &config.outliers,
    ))
}

fn run_analysis(args: &CommonArgs) -> Result<()> {
    let config = load_config(args)?;
    let set = prepare(args, &config)?;

    let outputs = build_summaries(&set, config.top_events);
    let tables = write_outputs(&outputs, &args.out)?;
    let parquet = args.out.join("cleaned_data.parquet");
    write_parquet(&outputs.cleaned, &parquet)?;
    let report = render_management_report(&outputs, &args.out)?;

    println!("Analysis completed successfully");
    println!("Cleaned records: {}", outputs.cleaned.len());
    for path in tables.iter().chain([&parquet]) {
        println!("Table: {}", path.display());
    }
    println!("Report: {}", report.display());
    Ok(())
}

fn run_training(args: &CommonArgs, seed: u64) -> Result<()> {
    let config = load_config(args)?;
    let set = prepare(args, &config)?;

    let outcome = train_and_compare_models(&set, seed, &config.training)
        .context("training candidate models")?;
    let artifacts = save_model_artifacts(&outcome.metrics, &outcome.best, &args.out)?;

    println!("Model training completed successfully");
    println!(
        "Best model: {} (test RMSE {:.3})",
        outcome.best_result().name,
        outcome.best_result().rmse
    );
    println!("Metrics: {}", artifacts.metrics.display());
    println!("Model: {}", artifacts.model.display());
    println!("Report: {}", artifacts.report.display());
    Ok(())
}
