//! Model directory discovery.
//!
//! The trainer writes one subdirectory per model under the models directory,
//! each holding one or more result files. This module finds them.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Configuration for result discovery.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Result file extension, without the dot.
    pub extension: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extension: "pickle".to_string(),
        }
    }
}

impl From<&crate::config::LoaderConfig> for ScanConfig {
    fn from(config: &crate::config::LoaderConfig) -> Self {
        Self {
            extension: config.extension.clone(),
        }
    }
}

/// A model subdirectory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDir {
    /// Model name (the directory name).
    pub name: String,
    /// Full path to the directory.
    pub path: PathBuf,
}

/// Finds model directories and their result files.
pub struct ModelScanner {
    config: ScanConfig,
    models_dir: PathBuf,
}

impl ModelScanner {
    /// Create a new scanner rooted at `models_dir`.
    pub fn new(models_dir: PathBuf, config: ScanConfig) -> Self {
        Self { config, models_dir }
    }

    /// Immediate subdirectories of the models directory, sorted by name.
    ///
    /// A missing models directory yields no models.
    pub fn discover_models(&self) -> Result<Vec<ModelDir>> {
        if !self.models_dir.is_dir() {
            debug!("Models directory not found: {}", self.models_dir.display());
            return Ok(Vec::new());
        }

        let mut models = Vec::new();
        let walker = WalkDir::new(&self.models_dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.with_context(|| {
                format!("Failed to read models directory {}", self.models_dir.display())
            })?;

            if !entry.file_type().is_dir() || is_hidden(&entry) {
                continue;
            }

            models.push(ModelDir {
                name: entry.file_name().to_string_lossy().to_string(),
                path: entry.into_path(),
            });
        }

        Ok(models)
    }

    /// Result files directly inside `model_dir`, sorted by name.
    pub fn result_files(&self, model_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let walker = WalkDir::new(model_dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry
                .with_context(|| format!("Failed to read model directory {}", model_dir.display()))?;

            if entry.file_type().is_file() && self.matches(entry.path()) {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }

    /// Check if a path has the configured result extension.
    pub fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| ext == self.config.extension)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}
