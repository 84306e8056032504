//! Data models for the evaluator.
//!
//! This module contains the core data structures used throughout the
//! application: numeric arrays decoded from result files, per-model metrics
//! and the evaluation report.

use crate::pickle::{self, PickleError, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised when a decoded value cannot be turned into an [`Array`].
#[derive(Debug, Error)]
pub enum ArrayError {
    #[error("nested sequences have inconsistent shapes")]
    Ragged,

    #[error("expected numeric data, found {0}")]
    NotNumeric(String),

    #[error(transparent)]
    Pickle(#[from] PickleError),
}

/// Dense, C-ordered numeric array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Array {
    /// Extent of each dimension; empty for a scalar.
    pub shape: Vec<usize>,
    /// Elements in row-major order.
    pub data: Vec<f64>,
}

impl Array {
    /// Creates an array, checking that `data` fills `shape`.
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Self, ArrayError> {
        if shape.iter().product::<usize>() != data.len() {
            return Err(ArrayError::Ragged);
        }
        Ok(Self { shape, data })
    }

    /// One-dimensional array.
    pub fn from_vec(data: Vec<f64>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    /// Converts a decoded pickle value: NumPy arrays and scalars, nested
    /// lists/tuples of numbers, or a bare number.
    pub fn from_value(value: &Value) -> Result<Self, ArrayError> {
        if let Some(array) = pickle::numpy::to_array(value)? {
            return Ok(array);
        }

        match value {
            Value::Bool(b) => Ok(Self::scalar(if *b { 1.0 } else { 0.0 })),
            Value::Int(n) => Ok(Self::scalar(*n as f64)),
            Value::Float(x) => Ok(Self::scalar(*x)),
            Value::List(items) | Value::Tuple(items) => {
                let children = items
                    .iter()
                    .map(Self::from_value)
                    .collect::<Result<Vec<_>, _>>()?;
                Self::stack(children)
            }
            other => Err(ArrayError::NotNumeric(other.type_name())),
        }
    }

    fn scalar(value: f64) -> Self {
        Self {
            shape: Vec::new(),
            data: vec![value],
        }
    }

    /// Stack equally shaped arrays along a new leading axis.
    fn stack(children: Vec<Array>) -> Result<Self, ArrayError> {
        let inner = match children.first() {
            Some(first) => first.shape.clone(),
            None => return Ok(Self::from_vec(Vec::new())),
        };
        if children.iter().any(|c| c.shape != inner) {
            return Err(ArrayError::Ragged);
        }

        let mut shape = Vec::with_capacity(inner.len() + 1);
        shape.push(children.len());
        shape.extend(inner);
        let data = children.into_iter().flat_map(|c| c.data).collect();
        Ok(Self { shape, data })
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Column count of a 2-D array, `None` otherwise.
    pub fn columns(&self) -> Option<usize> {
        match self.shape.as_slice() {
            [_, cols] => Some(*cols),
            _ => None,
        }
    }

    /// Iterate rows of a 2-D array.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        let width = self.columns().unwrap_or(1).max(1);
        self.data.chunks(width)
    }
}

/// Results read from one model directory.
#[derive(Debug, Clone)]
pub struct RawResults {
    /// Model output: class indices or per-class scores.
    pub predictions: Array,
    /// Ground-truth labels.
    pub targets: Array,
    /// File the results were read from.
    pub source: PathBuf,
}

/// The five headline classification metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub f1_macro: f64,
    pub f1_micro: f64,
    /// Macro-averaged precision.
    pub precision: f64,
    /// Macro-averaged recall.
    pub recall: f64,
}

/// Metrics shown in the comparison chart, in panel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Accuracy,
    F1Macro,
    Precision,
    Recall,
}

impl MetricKind {
    /// All charted metrics, in panel order.
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Accuracy,
        MetricKind::F1Macro,
        MetricKind::Precision,
        MetricKind::Recall,
    ];

    /// Read this metric from a metrics record.
    pub fn value(&self, metrics: &ClassificationMetrics) -> f64 {
        match self {
            MetricKind::Accuracy => metrics.accuracy,
            MetricKind::F1Macro => metrics.f1_macro,
            MetricKind::Precision => metrics.precision,
            MetricKind::Recall => metrics.recall,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Accuracy => write!(f, "Accuracy"),
            MetricKind::F1Macro => write!(f, "F1 Score (Macro)"),
            MetricKind::Precision => write!(f, "Precision"),
            MetricKind::Recall => write!(f, "Recall"),
        }
    }
}

/// Confusion matrix over the sorted set of labels seen in either vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Class labels, ascending. Row and column `i` both refer to `labels[i]`.
    pub labels: Vec<i64>,
    /// `counts[true][predicted]`.
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Largest cell count.
    pub fn max_count(&self) -> usize {
        self.counts
            .iter()
            .flat_map(|row| row.iter().copied())
            .max()
            .unwrap_or(0)
    }

    /// Number of classes.
    pub fn size(&self) -> usize {
        self.labels.len()
    }
}

/// One evaluated model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatedModel {
    /// Model name (the subdirectory name).
    pub name: String,
    pub metrics: ClassificationMetrics,
    pub confusion: ConfusionMatrix,
    /// Number of evaluated samples.
    pub n_samples: usize,
    /// Result file the model was read from.
    pub source: PathBuf,
}

/// Metadata about an evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Directory that was scanned for model subdirectories.
    pub models_dir: PathBuf,
    /// Date and time of the evaluation.
    pub evaluated_at: DateTime<Utc>,
    /// Model family label used in titles.
    pub family: String,
    /// Number of models with usable results.
    pub models_evaluated: usize,
    /// Result files that could not be used.
    pub files_skipped: usize,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
    /// Version of this tool.
    pub tool_version: String,
}

/// The complete evaluation report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub metadata: ReportMetadata,
    pub models: Vec<EvaluatedModel>,
}
