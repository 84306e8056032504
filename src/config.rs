//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.spectroscopy-eval.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".spectroscopy-eval.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Result file settings.
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Figure settings.
    #[serde(default)]
    pub plot: PlotConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Model family shown in figure and summary titles.
    #[serde(default = "default_family")]
    pub family: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            family: default_family(),
        }
    }
}

fn default_family() -> String {
    "CNN".to_string()
}

/// Result file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Result file extension, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Dict key holding model outputs.
    #[serde(default = "default_prediction_key")]
    pub prediction_key: String,

    /// Dict key holding ground-truth labels.
    #[serde(default = "default_target_key")]
    pub target_key: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            prediction_key: default_prediction_key(),
            target_key: default_target_key(),
        }
    }
}

fn default_extension() -> String {
    "pickle".to_string()
}

fn default_prediction_key() -> String {
    "pred".to_string()
}

fn default_target_key() -> String {
    "tgt".to_string()
}

/// Figure settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotConfig {
    /// Render figures at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Rows in the confusion matrix grid.
    #[serde(default = "default_grid_rows")]
    pub grid_rows: usize,

    /// Columns in the confusion matrix grid.
    #[serde(default = "default_grid_columns")]
    pub grid_columns: usize,

    /// Confusion matrix figure size in pixels (width, height).
    #[serde(default = "default_confusion_size")]
    pub confusion_size: [u32; 2],

    /// Comparison chart size in pixels (width, height).
    #[serde(default = "default_comparison_size")]
    pub comparison_size: [u32; 2],
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            grid_rows: default_grid_rows(),
            grid_columns: default_grid_columns(),
            confusion_size: default_confusion_size(),
            comparison_size: default_comparison_size(),
        }
    }
}

impl PlotConfig {
    /// Number of panels in the confusion matrix grid.
    pub fn capacity(&self) -> usize {
        self.grid_rows * self.grid_columns
    }
}

fn default_grid_rows() -> usize {
    2
}

fn default_grid_columns() -> usize {
    3
}

fn default_confusion_size() -> [u32; 2] {
    [1800, 1200] // 18x12 inches at 100 dpi
}

fn default_comparison_size() -> [u32; 2] {
    [1500, 1000]
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Plain-text summary file name inside the output directory.
    #[serde(default = "default_summary_file")]
    pub summary_file: String,

    /// Also write the JSON report.
    #[serde(default)]
    pub write_json: bool,

    /// JSON report file name inside the output directory.
    #[serde(default = "default_json_file")]
    pub json_file: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            summary_file: default_summary_file(),
            write_json: false,
            json_file: default_json_file(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_summary_file() -> String {
    "summary.txt".to_string()
}

fn default_json_file() -> String {
    "summary.json".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_if_exists(Path::new(DEFAULT_CONFIG_FILE))
    }

    fn load_if_exists(path: &Path) -> Result<Option<Self>> {
        if path.exists() {
            Ok(Some(Self::load(path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref family) = args.family {
            self.general.family = family.clone();
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
        if args.no_plots {
            self.plot.enabled = false;
        }
        if args.format == crate::cli::OutputFormat::Json {
            self.report.write_json = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
