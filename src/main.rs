//! spectroscopy-eval - evaluate trained spectroscopy classifiers
//!
//! A CLI tool that reads the prediction/target files each trained model
//! left in its own subdirectory, computes classification metrics, and writes
//! confusion matrices, a metric comparison chart and a text summary.
//!
//! Exit codes:
//!   0 - Success, or no model results found
//!   1 - Runtime error (unreadable directories, config, write failure, etc.)

mod analysis;
mod cli;
mod config;
mod loader;
mod models;
mod pickle;
mod plot;
mod report;
mod scanner;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use loader::LoadOptions;
use models::{EvaluatedModel, EvaluationReport, ReportMetadata};
use scanner::{ModelDir, ModelScanner, ScanConfig};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

const CONFUSION_FILE: &str = "confusion_matrices.png";
const COMPARISON_FILE: &str = "metrics_comparison.png";

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // The config is read before logging starts so `general.verbose` can
    // raise the level; how it was found is logged once the subscriber is up.
    let (mut config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(&args, &config);

    info!("spectroscopy-eval v{}", env!("CARGO_PKG_VERSION"));
    source.log();
    debug!("Arguments: {:?}", args);

    // Run the evaluation
    if let Err(e) = run_evaluation(&args, &config) {
        error!("Evaluation failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .spectroscopy-eval.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize result keys, figure layout, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = if !args.quiet && config.general.verbose {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Where the active configuration came from.
enum ConfigSource {
    Explicit(PathBuf),
    DefaultFile,
    BuiltIn,
    /// The default file exists but could not be used.
    Rejected(String),
}

impl ConfigSource {
    fn log(&self) {
        match self {
            ConfigSource::Explicit(path) => info!("Loaded config from: {}", path.display()),
            ConfigSource::DefaultFile => info!("Loaded default config from {}", DEFAULT_CONFIG_FILE),
            ConfigSource::BuiltIn => debug!("No config file found, using defaults"),
            ConfigSource::Rejected(reason) => warn!("Failed to load config: {}", reason),
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::Explicit(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigSource::DefaultFile)),
        Ok(None) => Ok((Config::default(), ConfigSource::BuiltIn)),
        Err(e) => Ok((Config::default(), ConfigSource::Rejected(format!("{:#}", e)))),
    }
}

fn banner(title: &str) {
    println!("\n{}", "=".repeat(80));
    println!("{}", title);
    println!("{}", "=".repeat(80));
}

/// Run the complete evaluation workflow.
fn run_evaluation(args: &Args, config: &Config) -> Result<()> {
    let start_time = Instant::now();
    let family = config.general.family.as_str();

    let scanner = ModelScanner::new(args.models_dir.clone(), ScanConfig::from(&config.loader));
    let model_dirs = scanner.discover_models()?;
    info!(
        "Found {} model directories in {}",
        model_dirs.len(),
        args.models_dir.display()
    );

    // Handle --dry-run: list what would be evaluated and exit
    if args.dry_run {
        return handle_dry_run(&scanner, &model_dirs);
    }

    std::fs::create_dir_all(&args.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            args.output_dir.display()
        )
    })?;

    banner(&format!("{} Model Evaluation Summary", family));

    // Step 1: Load and score every model
    let options = LoadOptions::from(&config.loader);
    let progress = progress_bar(model_dirs.len() as u64, args.quiet)?;
    let mut evaluated: Vec<EvaluatedModel> = Vec::new();
    let mut files_skipped = 0;

    for model_dir in &model_dirs {
        progress.set_message(model_dir.name.clone());

        let (model, skipped) = evaluate_model_dir(&scanner, model_dir, &options);
        files_skipped += skipped;
        if let Some(model) = model {
            progress.suspend(|| print!("{}", report::console_summary(&model)));
            evaluated.push(model);
        }

        progress.inc(1);
    }
    progress.finish_and_clear();

    if evaluated.is_empty() {
        println!("\nNo model results found in {}", args.models_dir.display());
        println!("Make sure training has completed and results are saved.");
        return Ok(());
    }

    // Step 2: Figures
    if config.plot.enabled {
        println!("\n{}", "=".repeat(80));
        println!("Generating Visualizations");
        println!("{}\n", "=".repeat(80));

        save_figure(
            "confusion matrices",
            &args.output_dir.join(CONFUSION_FILE),
            |path| plot::render_confusion_matrices(&evaluated, path, &config.plot, family),
        );
        save_figure(
            "metrics comparison",
            &args.output_dir.join(COMPARISON_FILE),
            |path| plot::render_metrics_comparison(&evaluated, path, &config.plot, family),
        );
    } else {
        info!("Figure rendering disabled");
    }

    // Step 3: Summaries
    let summary_path = args.output_dir.join(&config.report.summary_file);
    report::write_text_summary(&evaluated, family, &summary_path)?;
    println!("Saved summary to {}", summary_path.display());

    if config.report.write_json {
        let report = EvaluationReport {
            metadata: ReportMetadata {
                models_dir: args.models_dir.clone(),
                evaluated_at: Utc::now(),
                family: family.to_string(),
                models_evaluated: evaluated.len(),
                files_skipped,
                duration_seconds: start_time.elapsed().as_secs_f64(),
                tool_version: env!("CARGO_PKG_VERSION").to_string(),
            },
            models: evaluated,
        };

        let json_path = args.output_dir.join(&config.report.json_file);
        report::write_json_report(&report, &json_path)?;
        println!("Saved JSON report to {}", json_path.display());
    }

    if files_skipped > 0 {
        info!("{} result files could not be used", files_skipped);
    }
    debug!("Evaluation took {:.1}s", start_time.elapsed().as_secs_f64());

    banner("Evaluation Complete");
    println!("Results saved to: {}", args.output_dir.display());
    println!("{}\n", "=".repeat(80));

    Ok(())
}

/// Load and score one model directory. Also returns the number of
/// result files that could not be used.
fn evaluate_model_dir(
    scanner: &ModelScanner,
    model_dir: &ModelDir,
    options: &LoadOptions,
) -> (Option<EvaluatedModel>, usize) {
    let files = match scanner.result_files(&model_dir.path) {
        Ok(files) => files,
        Err(e) => {
            warn!("Could not read {}: {:#}", model_dir.name, e);
            return (None, 0);
        }
    };

    let load = loader::load_results(&files, options);
    let Some(results) = load.results else {
        debug!("No usable results in {}", model_dir.name);
        return (None, load.files_skipped);
    };

    match analysis::evaluate(&model_dir.name, &results) {
        Ok(model) => (Some(model), load.files_skipped),
        Err(e) => {
            warn!(
                "Skipping {}: could not score {}: {}",
                model_dir.name,
                results.source.display(),
                e
            );
            (None, load.files_skipped)
        }
    }
}

/// Render one figure; a failure is reported and the run continues.
fn save_figure(label: &str, path: &Path, render: impl FnOnce(&Path) -> Result<()>) {
    match render(path) {
        Ok(()) => println!("Saved {} to {}", label, path.display()),
        Err(e) => warn!("Could not render {}: {:#}", label, e),
    }
}

fn progress_bar(len: u64, quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }

    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Handle --dry-run: list models and result files, write nothing.
fn handle_dry_run(scanner: &ModelScanner, model_dirs: &[ModelDir]) -> Result<()> {
    println!("\n🔍 Dry run: listing result files (nothing is written)...\n");

    if model_dirs.is_empty() {
        println!("   No model directories found.");
    }

    let mut total = 0;
    for model_dir in model_dirs {
        let files = scanner.result_files(&model_dir.path)?;
        println!("   📁 {} ({} result files)", model_dir.name, files.len());
        for file in &files {
            let name = file.file_name().unwrap_or(file.as_os_str());
            println!("     📄 {}", name.to_string_lossy());
        }
        total += files.len();
    }

    println!(
        "\n   Total: {} models, {} result files",
        model_dirs.len(),
        total
    );
    println!("\n✅ Dry run complete. No files were written.");
    Ok(())
}
