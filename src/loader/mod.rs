//! Loading prediction/target pairs from result files.
//!
//! Each result file is expected to be a pickled dict with a prediction entry
//! and a target entry. Files that fail to decode are reported and skipped;
//! the remaining files of the model are still read.

use crate::models::{Array, ArrayError, RawResults};
use crate::pickle::{self, PickleError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised for a single result file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Pickle(#[from] PickleError),

    #[error("expected a dict, found {0}")]
    NotADict(String),

    #[error("missing key {0:?}")]
    MissingKey(String),

    #[error("entry {key:?}: {source}")]
    Array {
        key: String,
        #[source]
        source: ArrayError,
    },
}

impl LoadError {
    /// Whether the file decoded fine but simply isn't a results dict.
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self, LoadError::NotADict(_) | LoadError::MissingKey(_))
    }
}

/// Which dict entries hold predictions and targets.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub prediction_key: String,
    pub target_key: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            prediction_key: "pred".to_string(),
            target_key: "tgt".to_string(),
        }
    }
}

impl From<&crate::config::LoaderConfig> for LoadOptions {
    fn from(config: &crate::config::LoaderConfig) -> Self {
        Self {
            prediction_key: config.prediction_key.clone(),
            target_key: config.target_key.clone(),
        }
    }
}

/// Outcome of loading one model directory.
#[derive(Debug, Default)]
pub struct ModelLoad {
    /// Results from the last usable file, if any.
    pub results: Option<RawResults>,
    /// Files that were read successfully.
    pub files_used: usize,
    /// Files that could not be used.
    pub files_skipped: usize,
}

/// Read one result file.
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<RawResults, LoadError> {
    let value = pickle::from_path(path)?;

    if !value.is_dict() {
        return Err(LoadError::NotADict(value.type_name()));
    }

    let entry = |key: &str| -> Result<Array, LoadError> {
        let item = value
            .get(key)
            .ok_or_else(|| LoadError::MissingKey(key.to_string()))?;
        Array::from_value(item).map_err(|source| LoadError::Array {
            key: key.to_string(),
            source,
        })
    };

    // Check both keys before converting either array.
    for key in [&options.prediction_key, &options.target_key] {
        if value.get(key).is_none() {
            return Err(LoadError::MissingKey(key.clone()));
        }
    }

    Ok(RawResults {
        predictions: entry(&options.prediction_key)?,
        targets: entry(&options.target_key)?,
        source: path.to_path_buf(),
    })
}

/// Read all result files of a model; when several qualify the last one wins.
pub fn load_results(files: &[PathBuf], options: &LoadOptions) -> ModelLoad {
    let mut load = ModelLoad::default();

    for file in files {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file.display().to_string());

        match load_file(file, options) {
            Ok(results) => {
                debug!(
                    "Loaded {} (pred {:?}, tgt {:?})",
                    name, results.predictions.shape, results.targets.shape
                );
                load.files_used += 1;
                load.results = Some(results);
            }
            Err(e) if e.is_shape_mismatch() => {
                debug!("Skipping {}: {}", name, e);
                load.files_skipped += 1;
            }
            Err(e) => {
                warn!("Could not load {}: {}", name, e);
                load.files_skipped += 1;
            }
        }
    }

    load
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pickle::fixtures;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_load_numpy_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(temp_dir.path(), "results.pickle", fixtures::NUMPY_SCORES_P4);

        let results = load_file(&path, &LoadOptions::default()).unwrap();
        assert_eq!(results.predictions.shape, vec![3, 2]);
        assert_eq!(results.targets.data, vec![0.0, 1.0, 0.0]);
        assert_eq!(results.source, path);
    }

    #[test]
    fn test_not_a_dict() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(temp_dir.path(), "list.pickle", fixtures::NOT_A_DICT);
        let err = load_file(&path, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::NotADict(ref t) if t == "list"));
        assert!(err.is_shape_mismatch());
    }

    #[test]
    fn test_missing_target_key() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(temp_dir.path(), "partial.pickle", fixtures::MISSING_TARGET);
        let err = load_file(&path, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::MissingKey(ref k) if k == "tgt"));
    }

    #[test]
    fn test_custom_keys() {
        let temp_dir = TempDir::new().unwrap();
        let path = write(temp_dir.path(), "r.pickle", fixtures::DICT_P2);
        let options = LoadOptions {
            prediction_key: "pred".to_string(),
            target_key: "neg".to_string(),
        };
        let results = load_file(&path, &options).unwrap();
        assert_eq!(results.targets.shape, Vec::<usize>::new());
        assert_eq!(results.targets.data, vec![-5.0]);
    }

    #[test]
    fn test_last_usable_file_wins_and_failures_are_counted() {
        let temp_dir = TempDir::new().unwrap();
        let files = vec![
            write(temp_dir.path(), "a.pickle", fixtures::DICT_P4),
            write(temp_dir.path(), "b.pickle", b"garbage"),
            write(temp_dir.path(), "c.pickle", fixtures::NUMPY_LABELS_P2),
            write(temp_dir.path(), "d.pickle", fixtures::NOT_A_DICT),
        ];

        let load = load_results(&files, &LoadOptions::default());
        assert_eq!(load.files_used, 2);
        assert_eq!(load.files_skipped, 2);

        let results = load.results.unwrap();
        assert_eq!(results.source, files[2]);
        assert_eq!(results.predictions.data, vec![0.0, 1.0, 1.0, 2.0]);
    }

    #[test]
    fn test_no_usable_files() {
        let temp_dir = TempDir::new().unwrap();
        let files = vec![write(temp_dir.path(), "bad.pickle", b"\x80\x04")];
        let load = load_results(&files, &LoadOptions::default());
        assert!(load.results.is_none());
        assert_eq!(load.files_skipped, 1);
    }
}
