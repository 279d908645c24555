//! Aggregation of per-resample outcomes into an evaluation report.

use tracing::{info, instrument};

use crate::EvalError;
use crate::confusion::ConfusionMatrix;
use crate::metrics::{accuracy, macro_auc, macro_precision, precision_per_class};
use crate::trainer::ResampleOutcome;

/// Metrics for one resample's out-of-bag holdout.
#[derive(Debug, Clone)]
pub struct ResampleMetrics {
    /// The resample these metrics describe.
    pub resample_id: usize,
    /// Number of out-of-bag rows scored.
    pub n_holdout: usize,
    /// Holdout accuracy; `None` when the holdout is empty.
    pub accuracy: Option<f64>,
    /// Macro-averaged precision over predicted classes.
    pub precision: Option<f64>,
    /// Per-class precision; `None` where the class was never predicted.
    pub precision_per_class: Vec<Option<f64>>,
    /// Macro-averaged one-vs-rest ROC-AUC over defined classes.
    pub auc: Option<f64>,
}

/// Per-row correctness across every resample where the row was held out.
#[derive(Debug, Clone)]
pub struct SpatialAccuracy {
    /// Source row index in the modeling frame.
    pub row: usize,
    /// Number of resamples where this row was out-of-bag.
    pub n_appearances: usize,
    /// Number of those appearances that were predicted correctly.
    pub n_correct: usize,
    /// `n_correct / n_appearances`.
    pub correct_fraction: f64,
}

/// The aggregated evaluation over a full bootstrap ensemble.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    /// Pooled accuracy over every out-of-bag prediction.
    pub overall_accuracy: f64,
    /// Mean of per-resample accuracies with a non-empty holdout.
    pub mean_accuracy: f64,
    /// Population standard deviation of those per-resample accuracies.
    pub std_accuracy: f64,
    /// Mean of per-resample macro AUCs; `None` when every resample's AUC
    /// is undefined.
    pub mean_auc: Option<f64>,
    /// Metrics per resample, in resample-id order.
    pub per_resample: Vec<ResampleMetrics>,
    /// Pooled confusion matrix over every out-of-bag prediction.
    pub confusion: ConfusionMatrix,
    /// Per-row correctness for rows held out at least once, in row order.
    pub spatial: Vec<SpatialAccuracy>,
}

/// Aggregate resample outcomes into an [`EvaluationReport`].
///
/// `n_rows` is the modeling frame's row count and bounds the spatial
/// table; rows never held out are omitted from it.
///
/// # Errors
///
/// Returns [`EvalError::EmptyPredictions`] when no resample produced any
/// out-of-bag prediction.
#[instrument(skip_all, fields(n_resamples = outcomes.len()))]
pub fn aggregate(
    outcomes: &[ResampleOutcome],
    n_classes: usize,
    n_rows: usize,
) -> Result<EvaluationReport, EvalError> {
    let total_predictions: usize = outcomes.iter().map(|o| o.predictions.len()).sum();
    if total_predictions == 0 {
        return Err(EvalError::EmptyPredictions);
    }

    let mut confusion = ConfusionMatrix::new(n_classes);
    let mut appearances = vec![0usize; n_rows];
    let mut corrects = vec![0usize; n_rows];
    let mut per_resample = Vec::with_capacity(outcomes.len());

    for outcome in outcomes {
        let truths: Vec<usize> = outcome.predictions.iter().map(|p| p.truth).collect();
        let predicted: Vec<usize> = outcome.predictions.iter().map(|p| p.predicted).collect();
        let probabilities: Vec<Vec<f64>> = outcome
            .predictions
            .iter()
            .map(|p| p.probabilities.clone())
            .collect();

        for prediction in &outcome.predictions {
            confusion.record(prediction.truth, prediction.predicted);
            appearances[prediction.row] += 1;
            corrects[prediction.row] += usize::from(prediction.predicted == prediction.truth);
        }

        per_resample.push(ResampleMetrics {
            resample_id: outcome.resample_id,
            n_holdout: outcome.predictions.len(),
            accuracy: accuracy(&truths, &predicted),
            precision: macro_precision(&truths, &predicted, n_classes),
            precision_per_class: precision_per_class(&truths, &predicted, n_classes),
            auc: macro_auc(&truths, &probabilities, n_classes),
        });
    }

    // Pooled accuracy from the aggregate matrix; per-resample statistics
    // from holdouts that actually had predictions.
    let overall_accuracy = confusion.accuracy().ok_or(EvalError::EmptyPredictions)?;

    let resample_accuracies: Vec<f64> = per_resample.iter().filter_map(|m| m.accuracy).collect();
    let n = resample_accuracies.len() as f64;
    let mean_accuracy = resample_accuracies.iter().sum::<f64>() / n;
    let std_accuracy = (resample_accuracies
        .iter()
        .map(|&a| (a - mean_accuracy).powi(2))
        .sum::<f64>()
        / n)
        .sqrt();

    let resample_aucs: Vec<f64> = per_resample.iter().filter_map(|m| m.auc).collect();
    let mean_auc = if resample_aucs.is_empty() {
        None
    } else {
        Some(resample_aucs.iter().sum::<f64>() / resample_aucs.len() as f64)
    };

    let spatial: Vec<SpatialAccuracy> = (0..n_rows)
        .filter(|&row| appearances[row] > 0)
        .map(|row| SpatialAccuracy {
            row,
            n_appearances: appearances[row],
            n_correct: corrects[row],
            correct_fraction: corrects[row] as f64 / appearances[row] as f64,
        })
        .collect();

    info!(
        total_predictions,
        overall_accuracy,
        mean_accuracy,
        n_spatial_rows = spatial.len(),
        "evaluation aggregated"
    );

    Ok(EvaluationReport {
        overall_accuracy,
        mean_accuracy,
        std_accuracy,
        mean_auc,
        per_resample,
        confusion,
        spatial,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trainer::Prediction;

    fn prediction(row: usize, truth: usize, predicted: usize) -> Prediction {
        let mut probabilities = vec![0.1; 3];
        probabilities[predicted] = 0.8;
        Prediction {
            row,
            truth,
            predicted,
            probabilities,
        }
    }

    #[test]
    fn pooled_accuracy_over_all_predictions() {
        let outcomes = vec![
            ResampleOutcome {
                resample_id: 0,
                predictions: vec![prediction(0, 0, 0), prediction(1, 1, 1)],
            },
            ResampleOutcome {
                resample_id: 1,
                predictions: vec![prediction(0, 0, 1), prediction(2, 2, 2)],
            },
        ];
        let report = aggregate(&outcomes, 3, 3).unwrap();
        assert!((report.overall_accuracy - 0.75).abs() < 1e-12);
        assert_eq!(report.per_resample.len(), 2);
        assert_eq!(report.per_resample[0].accuracy, Some(1.0));
        assert_eq!(report.per_resample[1].accuracy, Some(0.5));
        assert!((report.mean_accuracy - 0.75).abs() < 1e-12);
        assert!((report.std_accuracy - 0.25).abs() < 1e-12);
        // Resample 1 predicted classes 1 and 2 only: class 0 undefined.
        let per_class = &report.per_resample[1].precision_per_class;
        assert!(per_class[0].is_none());
        assert_eq!(per_class[1], Some(0.0));
        assert_eq!(per_class[2], Some(1.0));
    }

    #[test]
    fn spatial_table_tracks_per_row_correctness() {
        let outcomes = vec![
            ResampleOutcome {
                resample_id: 0,
                predictions: vec![prediction(0, 0, 0), prediction(1, 1, 0)],
            },
            ResampleOutcome {
                resample_id: 1,
                predictions: vec![prediction(0, 0, 0)],
            },
        ];
        let report = aggregate(&outcomes, 3, 4).unwrap();
        assert_eq!(report.spatial.len(), 2);
        let row0 = &report.spatial[0];
        assert_eq!((row0.row, row0.n_appearances, row0.n_correct), (0, 2, 2));
        assert!((row0.correct_fraction - 1.0).abs() < 1e-12);
        let row1 = &report.spatial[1];
        assert_eq!((row1.row, row1.n_appearances, row1.n_correct), (1, 1, 0));
        assert_eq!(row1.correct_fraction, 0.0);
    }

    #[test]
    fn empty_holdout_resample_excluded_from_statistics() {
        let outcomes = vec![
            ResampleOutcome {
                resample_id: 0,
                predictions: vec![prediction(0, 0, 0)],
            },
            ResampleOutcome {
                resample_id: 1,
                predictions: vec![],
            },
        ];
        let report = aggregate(&outcomes, 3, 1).unwrap();
        assert_eq!(report.per_resample[1].n_holdout, 0);
        assert!(report.per_resample[1].accuracy.is_none());
        assert!((report.mean_accuracy - 1.0).abs() < 1e-12);
        assert_eq!(report.std_accuracy, 0.0);
    }

    #[test]
    fn all_empty_outcomes_error() {
        let outcomes = vec![ResampleOutcome {
            resample_id: 0,
            predictions: vec![],
        }];
        let err = aggregate(&outcomes, 3, 5).unwrap_err();
        assert!(matches!(err, EvalError::EmptyPredictions));
    }

    #[test]
    fn confusion_matrix_pools_outcomes() {
        let outcomes = vec![
            ResampleOutcome {
                resample_id: 0,
                predictions: vec![prediction(0, 0, 1)],
            },
            ResampleOutcome {
                resample_id: 1,
                predictions: vec![prediction(1, 0, 1)],
            },
        ];
        let report = aggregate(&outcomes, 2, 2).unwrap();
        assert_eq!(report.confusion.as_rows()[0], vec![0, 2]);
        assert_eq!(report.overall_accuracy, 0.0);
    }
}
