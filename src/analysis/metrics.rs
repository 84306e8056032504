//! Classification metrics.
//!
//! Per-class scores are taken over the sorted union of labels that appear in
//! either vector. A score whose denominator is zero counts as 0, and macro
//! averages weight every class equally.

use super::MetricsError;
use crate::models::{ClassificationMetrics, ConfusionMatrix};
use std::collections::BTreeSet;

/// Build the confusion matrix (`counts[true][predicted]`).
pub fn confusion_matrix(pred: &[i64], tgt: &[i64]) -> Result<ConfusionMatrix, MetricsError> {
    check_lengths(pred, tgt)?;

    let labels: Vec<i64> = tgt
        .iter()
        .chain(pred.iter())
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut counts = vec![vec![0usize; labels.len()]; labels.len()];
    for (p, t) in pred.iter().zip(tgt) {
        // Both labels come from `labels`, so the searches always succeed.
        if let (Ok(row), Ok(col)) = (labels.binary_search(t), labels.binary_search(p)) {
            counts[row][col] += 1;
        }
    }

    Ok(ConfusionMatrix { labels, counts })
}

/// Per-class true positive, false positive and false negative counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ClassCounts {
    tp: usize,
    fp: usize,
    fn_count: usize,
}

impl ClassCounts {
    fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_count)
    }

    fn f1(&self) -> f64 {
        ratio(2 * self.tp, 2 * self.tp + self.fp + self.fn_count)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn class_counts(cm: &ConfusionMatrix) -> Vec<ClassCounts> {
    let n = cm.size();
    (0..n)
        .map(|i| {
            let tp = cm.counts[i][i];
            let row_sum: usize = cm.counts[i].iter().sum();
            let col_sum: usize = cm.counts.iter().map(|row| row[i]).sum();
            ClassCounts {
                tp,
                fp: col_sum - tp,
                fn_count: row_sum - tp,
            }
        })
        .collect()
}

fn macro_mean(per_class: &[ClassCounts], score: impl Fn(&ClassCounts) -> f64) -> f64 {
    if per_class.is_empty() {
        return 0.0;
    }
    per_class.iter().map(score).sum::<f64>() / per_class.len() as f64
}

/// Compute accuracy, macro/micro F1, macro precision and macro recall.
pub fn compute_metrics(pred: &[i64], tgt: &[i64]) -> Result<ClassificationMetrics, MetricsError> {
    let cm = confusion_matrix(pred, tgt)?;
    Ok(metrics_from_confusion(&cm))
}

/// Metrics derived from an already built confusion matrix.
fn metrics_from_confusion(cm: &ConfusionMatrix) -> ClassificationMetrics {
    let per_class = class_counts(cm);
    let total: usize = cm.counts.iter().flatten().sum();

    let micro = per_class
        .iter()
        .fold(ClassCounts::default(), |acc, c| ClassCounts {
            tp: acc.tp + c.tp,
            fp: acc.fp + c.fp,
            fn_count: acc.fn_count + c.fn_count,
        });

    ClassificationMetrics {
        accuracy: ratio(micro.tp, total),
        f1_macro: macro_mean(&per_class, ClassCounts::f1),
        f1_micro: micro.f1(),
        precision: macro_mean(&per_class, ClassCounts::precision),
        recall: macro_mean(&per_class, ClassCounts::recall),
    }
}

fn check_lengths(pred: &[i64], tgt: &[i64]) -> Result<(), MetricsError> {
    if pred.len() != tgt.len() {
        return Err(MetricsError::LengthMismatch {
            pred: pred.len(),
            tgt: tgt.len(),
        });
    }
    if tgt.is_empty() {
        return Err(MetricsError::Empty);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-4,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_three_class_reference_values() {
        // Reference values from scikit-learn's documentation examples.
        let tgt = [0, 1, 2, 0, 1, 2];
        let pred = [0, 2, 1, 0, 0, 1];
        let m = compute_metrics(&pred, &tgt).unwrap();

        assert_close(m.accuracy, 1.0 / 3.0);
        assert_close(m.f1_macro, 0.26667);
        assert_close(m.f1_micro, 1.0 / 3.0);
        assert_close(m.precision, 0.22222);
        assert_close(m.recall, 1.0 / 3.0);
    }

    #[test]
    fn test_label_only_in_predictions_counts_as_class() {
        let tgt = [0, 0, 1];
        let pred = [0, 2, 1];
        let m = compute_metrics(&pred, &tgt).unwrap();

        assert_close(m.accuracy, 2.0 / 3.0);
        assert_close(m.precision, 2.0 / 3.0);
        assert_close(m.recall, 0.5);
        assert_close(m.f1_macro, (2.0 / 3.0 + 1.0) / 3.0);
    }

    #[test]
    fn test_perfect_predictions() {
        let labels = [3, 1, 4, 1, 5];
        let m = compute_metrics(&labels, &labels).unwrap();
        assert_eq!(m.accuracy, 1.0);
        assert_eq!(m.f1_macro, 1.0);
        assert_eq!(m.f1_micro, 1.0);
        assert_eq!(m.precision, 1.0);
        assert_eq!(m.recall, 1.0);
    }

    #[test]
    fn test_confusion_matrix_layout() {
        let tgt = [0, 1, 2, 2];
        let pred = [0, 1, 1, 2];
        let cm = confusion_matrix(&pred, &tgt).unwrap();
        assert_eq!(cm.labels, vec![0, 1, 2]);
        assert_eq!(cm.counts, vec![vec![1, 0, 0], vec![0, 1, 0], vec![0, 1, 1]]);
    }

    #[test]
    fn test_negative_and_sparse_labels() {
        let tgt = [-1, 7, 7];
        let pred = [-1, 7, -1];
        let cm = confusion_matrix(&pred, &tgt).unwrap();
        assert_eq!(cm.labels, vec![-1, 7]);
        assert_eq!(cm.counts, vec![vec![1, 0], vec![1, 1]]);
    }

    #[test]
    fn test_length_mismatch() {
        assert_eq!(
            compute_metrics(&[0, 1], &[0]),
            Err(MetricsError::LengthMismatch { pred: 2, tgt: 1 })
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(compute_metrics(&[], &[]), Err(MetricsError::Empty));
    }
}
