//! Turning raw model outputs into class labels.

use super::MetricsError;
use crate::models::Array;

/// Derive `(predicted, true)` class labels from raw arrays.
///
/// Multi-column predictions are per-class scores: the predicted class is the
/// row-wise argmax, and multi-column targets are reduced the same way. Single
/// columns and 1-D arrays are read as labels directly.
pub fn derive_classes(pred: &Array, tgt: &Array) -> Result<(Vec<i64>, Vec<i64>), MetricsError> {
    if pred.ndim() > 2 {
        return Err(MetricsError::Dimensions(pred.ndim()));
    }
    if tgt.ndim() > 2 {
        return Err(MetricsError::Dimensions(tgt.ndim()));
    }

    let scores = pred.columns().is_some_and(|cols| cols > 1);

    if scores {
        let pred_classes = argmax_rows(pred);
        let tgt_classes = if tgt.columns().is_some_and(|cols| cols > 1) {
            argmax_rows(tgt)
        } else {
            labels(&tgt.data)?
        };
        return Ok((pred_classes, tgt_classes));
    }

    // One-hot targets only make sense against score predictions.
    if let Some(cols) = tgt.columns().filter(|&c| c > 1) {
        return Err(MetricsError::OneHotTargets(cols));
    }
    Ok((labels(&pred.data)?, labels(&tgt.data)?))
}

/// Index of the largest value in each row; the first maximum wins.
fn argmax_rows(array: &Array) -> Vec<i64> {
    array
        .rows()
        .map(|row| {
            let mut best = 0;
            for (i, &v) in row.iter().enumerate() {
                if v > row[best] {
                    best = i;
                }
            }
            best as i64
        })
        .collect()
}

fn labels(values: &[f64]) -> Result<Vec<i64>, MetricsError> {
    values
        .iter()
        .map(|&v| {
            if v.is_finite() && v.fract() == 0.0 {
                Ok(v as i64)
            } else {
                Err(MetricsError::NonIntegral(v))
            }
        })
        .collect()
}
