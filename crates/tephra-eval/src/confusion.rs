//! Confusion matrix accumulation and per-class metrics.

use std::fmt;

use crate::EvalError;

/// A confusion matrix for multi-class classification.
///
/// Entry `matrix[true_class][predicted_class]` counts how many samples
/// with true label `true_class` were predicted as `predicted_class`.
/// Matrices start empty and accumulate observations, so one matrix can be
/// built per resample and merged into a run-wide aggregate.
#[derive(Debug, Clone)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
    n_classes: usize,
}

/// Per-class precision, recall, and support.
///
/// Precision is `None` when the class was never predicted; recall is
/// `None` when the class has no true samples.
#[derive(Debug, Clone)]
pub struct ClassMetrics {
    /// The class index.
    pub class: usize,
    /// Precision: TP / (TP + FP), undefined without positive predictions.
    pub precision: Option<f64>,
    /// Recall: TP / (TP + FN), undefined without true samples.
    pub recall: Option<f64>,
    /// Number of true samples in this class.
    pub support: usize,
}

impl ConfusionMatrix {
    /// Create an empty matrix for `n_classes` classes.
    #[must_use]
    pub fn new(n_classes: usize) -> Self {
        Self {
            matrix: vec![vec![0; n_classes]; n_classes],
            n_classes,
        }
    }

    /// Record one observation.
    pub fn record(&mut self, truth: usize, predicted: usize) {
        self.matrix[truth][predicted] += 1;
    }

    /// Build a matrix from parallel label slices.
    #[must_use]
    pub fn from_labels(truths: &[usize], predicted: &[usize], n_classes: usize) -> Self {
        let mut cm = Self::new(n_classes);
        for (&t, &p) in truths.iter().zip(predicted) {
            cm.record(t, p);
        }
        cm
    }

    /// Add every count of `other` into this matrix.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ClassCountMismatch`] when class counts differ.
    pub fn merge(&mut self, other: &ConfusionMatrix) -> Result<(), EvalError> {
        if other.n_classes != self.n_classes {
            return Err(EvalError::ClassCountMismatch {
                expected: self.n_classes,
                got: other.n_classes,
            });
        }
        for (row, other_row) in self.matrix.iter_mut().zip(&other.matrix) {
            for (cell, &add) in row.iter_mut().zip(other_row) {
                *cell += add;
            }
        }
        Ok(())
    }

    /// Overall accuracy from the diagonal; `None` for an empty matrix.
    #[must_use]
    pub fn accuracy(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let correct: usize = (0..self.n_classes).map(|i| self.matrix[i][i]).sum();
        Some(correct as f64 / total as f64)
    }

    /// Per-class precision, recall, and support.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        let row_sums = self.row_sums();
        let col_sums = self.col_sums();
        (0..self.n_classes)
            .map(|c| {
                let tp = self.matrix[c][c];
                let precision = (col_sums[c] > 0).then(|| tp as f64 / col_sums[c] as f64);
                let recall = (row_sums[c] > 0).then(|| tp as f64 / row_sums[c] as f64);
                ClassMetrics {
                    class: c,
                    precision,
                    recall,
                    support: row_sums[c],
                }
            })
            .collect()
    }

    /// Row sums: number of true instances per class.
    #[must_use]
    pub fn row_sums(&self) -> Vec<usize> {
        self.matrix.iter().map(|row| row.iter().sum()).collect()
    }

    /// Column sums: number of predicted instances per class.
    #[must_use]
    pub fn col_sums(&self) -> Vec<usize> {
        (0..self.n_classes)
            .map(|c| self.matrix.iter().map(|row| row[c]).sum())
            .collect()
    }

    /// Total number of recorded observations.
    #[must_use]
    pub fn total(&self) -> usize {
        self.matrix.iter().flat_map(|row| row.iter()).sum()
    }

    /// Return the underlying matrix rows.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8}", "")?;
        for j in 0..self.n_classes {
            write!(f, " pred_{j:>3}")?;
        }
        writeln!(f)?;
        for (i, row) in self.matrix.iter().enumerate() {
            write!(f, "true_{i:>3}")?;
            for val in row {
                write!(f, " {val:>7}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_and_column_sums_match_counts() {
        // True: [0,0,0, 1,1, 2], Pred: [0,1,0, 1,1, 0]
        let cm = ConfusionMatrix::from_labels(&[0, 0, 0, 1, 1, 2], &[0, 1, 0, 1, 1, 0], 3);
        assert_eq!(cm.row_sums(), vec![3, 2, 1]);
        assert_eq!(cm.col_sums(), vec![3, 3, 0]);
        assert_eq!(cm.total(), 6);
    }

    #[test]
    fn accuracy_matches_diagonal() {
        let truths = vec![0, 0, 1, 1, 2, 2];
        let preds = vec![0, 1, 1, 1, 2, 0];
        let cm = ConfusionMatrix::from_labels(&truths, &preds, 3);
        let direct = truths
            .iter()
            .zip(&preds)
            .filter(|&(&t, &p)| t == p)
            .count() as f64
            / truths.len() as f64;
        assert!((cm.accuracy().unwrap() - direct).abs() < 1e-12);
    }

    #[test]
    fn empty_matrix_accuracy_undefined() {
        let cm = ConfusionMatrix::new(4);
        assert!(cm.accuracy().is_none());
    }

    #[test]
    fn unpredicted_class_has_undefined_precision() {
        // Class 2 never predicted.
        let cm = ConfusionMatrix::from_labels(&[0, 1, 2], &[0, 1, 0], 3);
        let metrics = cm.class_metrics();
        assert!(metrics[2].precision.is_none());
        assert_eq!(metrics[2].recall, Some(0.0));
        assert_eq!(metrics[2].support, 1);
    }

    #[test]
    fn absent_class_has_undefined_recall() {
        let cm = ConfusionMatrix::from_labels(&[0, 0], &[0, 1], 3);
        let metrics = cm.class_metrics();
        assert!(metrics[2].recall.is_none());
        assert_eq!(metrics[2].support, 0);
    }

    #[test]
    fn merge_accumulates() {
        let mut total = ConfusionMatrix::from_labels(&[0, 1], &[0, 1], 2);
        let other = ConfusionMatrix::from_labels(&[0, 1], &[1, 1], 2);
        total.merge(&other).unwrap();
        assert_eq!(total.as_rows()[0], vec![1, 1]);
        assert_eq!(total.as_rows()[1], vec![0, 2]);
        assert_eq!(total.total(), 4);
    }

    #[test]
    fn merge_class_count_mismatch() {
        let mut a = ConfusionMatrix::new(3);
        let b = ConfusionMatrix::new(4);
        let err = a.merge(&b).unwrap_err();
        assert!(matches!(
            err,
            EvalError::ClassCountMismatch {
                expected: 3,
                got: 4
            }
        ));
    }

    #[test]
    fn known_precision_values() {
        // True: [0,0,0, 1,1,1], Pred: [0,0,1, 1,1,0]
        let cm = ConfusionMatrix::from_labels(&[0, 0, 0, 1, 1, 1], &[0, 0, 1, 1, 1, 0], 2);
        let metrics = cm.class_metrics();
        assert!((metrics[0].precision.unwrap() - 2.0 / 3.0).abs() < 1e-12);
        assert!((metrics[0].recall.unwrap() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn display_formatting() {
        let cm = ConfusionMatrix::from_labels(&[0, 1], &[0, 1], 2);
        let output = format!("{cm}");
        assert!(output.contains("pred_"));
        assert!(output.contains("true_"));
    }
}
