//! Per-resample training loop: fit pipeline and forest in-bag, predict
//! the out-of-bag holdout.

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tephra_prep::{ModelingFrame, PreprocessConfig, Resample};
use tephra_rf::{ForestConfig, RankedFeature};
use tracing::{debug, info, instrument};

use crate::EvalError;

/// One out-of-bag prediction.
#[derive(Debug, Clone)]
pub struct Prediction {
    /// Source row index in the modeling frame.
    pub row: usize,
    /// True class label.
    pub truth: usize,
    /// Predicted class label.
    pub predicted: usize,
    /// Averaged per-class probabilities, padded to the full class count.
    pub probabilities: Vec<f64>,
}

/// Out-of-bag predictions for one resample.
#[derive(Debug, Clone)]
pub struct ResampleOutcome {
    /// The resample this outcome belongs to.
    pub resample_id: usize,
    /// One prediction per out-of-bag row, in ascending row order.
    pub predictions: Vec<Prediction>,
}

/// Runs the leakage-safe evaluation loop over a bootstrap ensemble.
///
/// For each resample, the preprocessing pipeline and the forest are fitted
/// strictly on the in-bag rows; the fitted pair then scores the out-of-bag
/// rows. Resamples are processed in parallel, each with a forest seed
/// derived from the base seed and the resample id, so outcomes do not
/// depend on scheduling order.
#[derive(Debug, Clone)]
pub struct ResampleTrainer {
    preprocess: PreprocessConfig,
    forest: ForestConfig,
    n_classes: usize,
}

impl ResampleTrainer {
    /// Create a trainer from preprocessing and forest configurations.
    #[must_use]
    pub fn new(preprocess: PreprocessConfig, forest: ForestConfig, n_classes: usize) -> Self {
        Self {
            preprocess,
            forest,
            n_classes,
        }
    }

    /// Train and score every resample.
    ///
    /// Returns one [`ResampleOutcome`] per resample, in resample-id order.
    /// A resample whose out-of-bag set is empty yields an outcome with no
    /// predictions rather than an error.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`EvalError::Preprocess`] | Pipeline fit or transform failed for a resample |
    /// | [`EvalError::Train`] | Forest training or prediction failed for a resample |
    #[instrument(skip_all, fields(n_resamples = resamples.len(), n_rows = frame.n_rows()))]
    pub fn run(
        &self,
        frame: &ModelingFrame,
        labels: &[usize],
        resamples: &[Resample],
    ) -> Result<Vec<ResampleOutcome>, EvalError> {
        info!(
            n_resamples = resamples.len(),
            n_classes = self.n_classes,
            "starting resample evaluation"
        );
        let mut outcomes: Vec<ResampleOutcome> = resamples
            .par_iter()
            .map(|resample| self.run_one(frame, labels, resample))
            .collect::<Result<_, _>>()?;
        outcomes.sort_by_key(|o| o.resample_id);
        Ok(outcomes)
    }

    fn run_one(
        &self,
        frame: &ModelingFrame,
        labels: &[usize],
        resample: &Resample,
    ) -> Result<ResampleOutcome, EvalError> {
        let pipeline = self
            .preprocess
            .fit(frame, &resample.in_bag)
            .map_err(|source| EvalError::Preprocess {
                resample_id: resample.id,
                source,
            })?;

        let train_matrix = pipeline
            .transform(frame, &resample.in_bag)
            .map_err(|source| EvalError::Preprocess {
                resample_id: resample.id,
                source,
            })?;
        let train_labels: Vec<usize> = resample.in_bag.iter().map(|&r| labels[r]).collect();

        let fit = self
            .forest
            .clone()
            .with_seed(self.forest.seed().wrapping_add(resample.id as u64))
            .fit(train_matrix.rows(), &train_labels, train_matrix.names())
            .map_err(|source| EvalError::Train {
                resample_id: resample.id,
                source,
            })?;

        if resample.out_of_bag.is_empty() {
            debug!(resample_id = resample.id, "no out-of-bag rows");
            return Ok(ResampleOutcome {
                resample_id: resample.id,
                predictions: Vec::new(),
            });
        }

        let holdout_matrix = pipeline
            .transform(frame, &resample.out_of_bag)
            .map_err(|source| EvalError::Preprocess {
                resample_id: resample.id,
                source,
            })?;
        let probabilities = fit
            .forest()
            .predict_proba_batch(holdout_matrix.rows())
            .map_err(|source| EvalError::Train {
                resample_id: resample.id,
                source,
            })?;

        let predictions = resample
            .out_of_bag
            .iter()
            .zip(probabilities)
            .map(|(&row, proba)| {
                let predicted = proba.predicted_class();
                // In-bag rows may miss high-index classes; pad so every
                // prediction carries the full class count.
                let mut probs = proba.into_vec();
                probs.resize(self.n_classes, 0.0);
                Prediction {
                    row,
                    truth: labels[row],
                    predicted,
                    probabilities: probs,
                }
            })
            .collect();

        debug!(
            resample_id = resample.id,
            n_holdout = resample.out_of_bag.len(),
            "resample scored"
        );
        Ok(ResampleOutcome {
            resample_id: resample.id,
            predictions,
        })
    }

    /// Fit the pipeline and forest on the full dataset and return the
    /// ranked feature importances.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`EvalError::Preprocess`] | Pipeline fit or transform failed |
    /// | [`EvalError::ImportanceFit`] | Forest training failed |
    #[instrument(skip_all, fields(n_rows = frame.n_rows()))]
    pub fn importance_run(
        &self,
        frame: &ModelingFrame,
        labels: &[usize],
    ) -> Result<Vec<RankedFeature>, EvalError> {
        let all_rows: Vec<usize> = (0..frame.n_rows()).collect();
        let pipeline = self
            .preprocess
            .fit(frame, &all_rows)
            .map_err(|source| EvalError::Preprocess {
                resample_id: 0,
                source,
            })?;
        let matrix = pipeline
            .transform(frame, &all_rows)
            .map_err(|source| EvalError::Preprocess {
                resample_id: 0,
                source,
            })?;
        let fit = self
            .forest
            .fit(matrix.rows(), labels, matrix.names())
            .map_err(|source| EvalError::ImportanceFit { source })?;
        info!(
            n_features = matrix.n_features(),
            "full-dataset importance fit complete"
        );
        Ok(fit.importances().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tephra_prep::{BootstrapConfig, CategoricalColumn, NumericColumn};

    /// Forty rows across four classes with a class-aligned numeric column
    /// and a categorical column with one rare level.
    fn make_frame() -> (ModelingFrame, Vec<usize>) {
        let mut x = Vec::new();
        let mut cat = Vec::new();
        let mut labels = Vec::new();
        for class in 0..4 {
            for i in 0..10 {
                x.push(class as f64 * 10.0 + i as f64 * 0.1);
                cat.push(if class == 0 && i == 0 {
                    "rare".to_string()
                } else if class % 2 == 0 {
                    "even".to_string()
                } else {
                    "odd".to_string()
                });
                labels.push(class);
            }
        }
        let frame = ModelingFrame::new(
            vec![NumericColumn::new("x", x).unwrap()],
            vec![CategoricalColumn::new("parity", cat)],
        )
        .unwrap();
        (frame, labels)
    }

    fn make_trainer(n_trees: usize) -> ResampleTrainer {
        ResampleTrainer::new(
            PreprocessConfig::new(),
            ForestConfig::new(n_trees).unwrap().with_seed(7),
            4,
        )
    }

    #[test]
    fn outcomes_cover_only_out_of_bag_rows() {
        let (frame, labels) = make_frame();
        let resamples = BootstrapConfig::new(5).unwrap().with_seed(3).draw(40).unwrap();
        let outcomes = make_trainer(20).run(&frame, &labels, &resamples).unwrap();
        assert_eq!(outcomes.len(), 5);
        for (outcome, resample) in outcomes.iter().zip(&resamples) {
            assert_eq!(outcome.resample_id, resample.id);
            let rows: Vec<usize> = outcome.predictions.iter().map(|p| p.row).collect();
            assert_eq!(rows, resample.out_of_bag);
        }
    }

    #[test]
    fn probabilities_padded_to_class_count() {
        let (frame, labels) = make_frame();
        let resamples = BootstrapConfig::new(3).unwrap().draw(40).unwrap();
        let outcomes = make_trainer(10).run(&frame, &labels, &resamples).unwrap();
        for outcome in &outcomes {
            for prediction in &outcome.predictions {
                assert_eq!(prediction.probabilities.len(), 4);
            }
        }
    }

    #[test]
    fn deterministic_across_runs() {
        let (frame, labels) = make_frame();
        let resamples = BootstrapConfig::new(4).unwrap().with_seed(11).draw(40).unwrap();
        let trainer = make_trainer(15);
        let a = trainer.run(&frame, &labels, &resamples).unwrap();
        let b = trainer.run(&frame, &labels, &resamples).unwrap();
        for (oa, ob) in a.iter().zip(&b) {
            let pa: Vec<usize> = oa.predictions.iter().map(|p| p.predicted).collect();
            let pb: Vec<usize> = ob.predictions.iter().map(|p| p.predicted).collect();
            assert_eq!(pa, pb);
        }
    }

    #[test]
    fn separable_data_scores_well() {
        let (frame, labels) = make_frame();
        let resamples = BootstrapConfig::new(5).unwrap().draw(40).unwrap();
        let outcomes = make_trainer(30).run(&frame, &labels, &resamples).unwrap();
        let (correct, total) = outcomes
            .iter()
            .flat_map(|o| &o.predictions)
            .fold((0usize, 0usize), |(c, t), p| {
                (c + usize::from(p.predicted == p.truth), t + 1)
            });
        assert!(total > 0);
        let accuracy = correct as f64 / total as f64;
        assert!(accuracy > 0.8, "accuracy = {accuracy}");
    }

    #[test]
    fn importance_run_ranks_numeric_first() {
        let (frame, labels) = make_frame();
        let importances = make_trainer(30).importance_run(&frame, &labels).unwrap();
        assert_eq!(importances[0].name, "x");
        assert_eq!(importances[0].rank, 1);
    }
}
