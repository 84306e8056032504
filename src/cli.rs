//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// spectroscopy-eval - score trained spectroscopy classifiers
///
/// Reads the prediction/target files each model left under the models
/// directory, computes classification metrics, and writes confusion
/// matrices, a comparison chart and a text summary.
///
/// Examples:
///   spectroscopy-eval
///   spectroscopy-eval --models_dir ./runs/models --output_dir ./runs/results
///   spectroscopy-eval --family ResNet --format json
///   spectroscopy-eval --dry-run
///   spectroscopy-eval --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory with one subdirectory of result files per model
    #[arg(
        long = "models_dir",
        visible_alias = "models-dir",
        default_value = "./benchmark/cnn/models",
        value_name = "DIR"
    )]
    pub models_dir: PathBuf,

    /// Directory for figures and summaries (created if missing)
    #[arg(
        long = "output_dir",
        visible_alias = "output-dir",
        default_value = "./benchmark/cnn/results",
        value_name = "DIR"
    )]
    pub output_dir: PathBuf,

    /// Path to configuration file
    ///
    /// If not specified, looks for .spectroscopy-eval.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Model family used in figure and summary titles
    ///
    /// Defaults to "CNN" or the value in the config file
    #[arg(long, value_name = "NAME", env = "SPECTROSCOPY_EVAL_FAMILY")]
    pub family: Option<String>,

    /// Summary format (text, json)
    ///
    /// The text summary is always written; json adds summary.json
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Skip rendering the figures
    #[arg(long)]
    pub no_plots: bool,

    /// Dry run: list models and result files without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .spectroscopy-eval.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain text (default)
    #[default]
    Text,
    /// Plain text plus a JSON report
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // A missing models directory is reported later as "no results"
        if self.models_dir.exists() && !self.models_dir.is_dir() {
            return Err(format!(
                "Models path is not a directory: {}",
                self.models_dir.display()
            ));
        }

        if self.output_dir.exists() && !self.output_dir.is_dir() {
            return Err(format!(
                "Output path is not a directory: {}",
                self.output_dir.display()
            ));
        }

        if let Some(ref family) = self.family {
            if family.trim().is_empty() {
                return Err("Family name cannot be empty".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
