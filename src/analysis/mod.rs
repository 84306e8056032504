//! Metric computation for loaded model results.
//!
//! This module turns raw prediction/target arrays into class labels and
//! computes the headline classification metrics and confusion matrix.

mod classes;
mod metrics;

pub use classes::derive_classes;
pub use metrics::{compute_metrics, confusion_matrix};

use crate::models::{EvaluatedModel, RawResults};
use thiserror::Error;

/// Errors raised while scoring a model.
#[derive(Debug, Error, PartialEq)]
pub enum MetricsError {
    #[error("predictions have {pred} samples but targets have {tgt}")]
    LengthMismatch { pred: usize, tgt: usize },

    #[error("no samples to evaluate")]
    Empty,

    #[error("label {0} is not an integer class index")]
    NonIntegral(f64),

    #[error("{0}-dimensional outputs are not supported")]
    Dimensions(usize),

    #[error("targets have {0} columns but predictions are plain labels")]
    OneHotTargets(usize),
}

/// Score one model's results.
pub fn evaluate(name: &str, results: &RawResults) -> Result<EvaluatedModel, MetricsError> {
    let (pred, tgt) = derive_classes(&results.predictions, &results.targets)?;
    let metrics = compute_metrics(&pred, &tgt)?;
    let confusion = confusion_matrix(&pred, &tgt)?;

    Ok(EvaluatedModel {
        name: name.to_string(),
        metrics,
        confusion,
        n_samples: tgt.len(),
        source: results.source.clone(),
    })
}
