//! Random forest training and prediction.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::{ForestConfig, MaxFeatures};
use crate::error::RfError;
use crate::importance::{RankedFeature, rank_importances};
use crate::tree::{Tree, TreeParams, grow};

/// A fitted random forest ensemble.
#[derive(Debug, Clone)]
pub struct Forest {
    trees: Vec<Tree>,
    n_features: usize,
    n_classes: usize,
    feature_names: Vec<String>,
}

/// Averaged per-class probabilities for one sample.
#[derive(Debug, Clone)]
pub struct ClassProbabilities {
    probs: Vec<f64>,
}

impl ClassProbabilities {
    /// Return the predicted class (argmax of probabilities).
    #[must_use]
    pub fn predicted_class(&self) -> usize {
        self.probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx)
            .unwrap_or(0)
    }

    /// Return the probability distribution as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.probs
    }

    /// Consume the distribution and return the probability vector.
    #[must_use]
    pub fn into_vec(self) -> Vec<f64> {
        self.probs
    }
}

/// Result of random forest training: the ensemble plus ranked importances.
#[derive(Debug)]
pub struct ForestFit {
    forest: Forest,
    importances: Vec<RankedFeature>,
}

impl ForestFit {
    /// Borrow the fitted forest.
    #[must_use]
    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// Return the ranked mean-decrease-in-impurity feature importances.
    #[must_use]
    pub fn importances(&self) -> &[RankedFeature] {
        &self.importances
    }
}

pub(crate) fn resolve_max_features(
    max_features: MaxFeatures,
    n_features: usize,
) -> Result<usize, RfError> {
    let resolved = match max_features {
        MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
        MaxFeatures::All => n_features,
        MaxFeatures::Fixed(n) => n,
    };
    if resolved == 0 || resolved > n_features {
        return Err(RfError::InvalidMaxFeatures {
            max_features: resolved,
            n_features,
        });
    }
    Ok(resolved)
}

/// Train the forest: validate, derive per-tree seeds, grow trees in parallel.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &ForestConfig,
    features: &[Vec<f64>],
    labels: &[usize],
    feature_names: &[String],
) -> Result<ForestFit, RfError> {
    if features.is_empty() {
        return Err(RfError::EmptyDataset);
    }
    let n_samples = features.len();
    let n_features = features[0].len();
    if n_features == 0 {
        return Err(RfError::ZeroFeatures);
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(RfError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        for (feature_index, &val) in row.iter().enumerate() {
            if !val.is_finite() {
                return Err(RfError::NonFiniteValue {
                    sample_index,
                    feature_index,
                });
            }
        }
    }

    let max_features = resolve_max_features(config.max_features, n_features)?;
    let n_classes = labels.iter().max().copied().unwrap_or(0) + 1;

    info!(
        n_samples,
        n_features, n_classes, max_features, "training random forest"
    );

    // Column-major copy once; trees index into it without further copying.
    let columns: Vec<Vec<f64>> = (0..n_features)
        .map(|f| features.iter().map(|row| row[f]).collect())
        .collect();

    let params = TreeParams {
        max_depth: config.max_depth,
        min_samples_split: config.min_samples_split,
        min_samples_leaf: config.min_samples_leaf,
        max_features,
    };

    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();

    let trees: Vec<Tree> = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            // Per-tree bootstrap of the training rows.
            let indices: Vec<usize> = (0..n_samples)
                .map(|_| rng.gen_range(0..n_samples))
                .collect();
            grow(&columns, labels, &indices, n_classes, &params, &mut rng)
        })
        .collect();

    debug!(n_trees_grown = trees.len(), "tree growth complete");

    let mut totals = vec![0.0f64; n_features];
    for tree in &trees {
        tree.accumulate_gains(&mut totals);
    }
    let importances = rank_importances(&totals, feature_names);

    Ok(ForestFit {
        forest: Forest {
            trees,
            n_features,
            n_classes,
            feature_names: feature_names.to_vec(),
        },
        importances,
    })
}

impl Forest {
    /// Predict the class label for a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, RfError> {
        Ok(self.predict_proba(sample)?.predicted_class())
    }

    /// Return the averaged class probability distribution for a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<ClassProbabilities, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut avg = vec![0.0f64; self.n_classes];
        for tree in &self.trees {
            for (slot, p) in avg.iter_mut().zip(tree.predict_proba(sample)) {
                *slot += p;
            }
        }
        let n = self.trees.len() as f64;
        avg.iter_mut().for_each(|v| *v /= n);
        Ok(ClassProbabilities { probs: avg })
    }

    /// Predict class labels for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, RfError> {
        features
            .into_par_iter()
            .map(|sample| self.predict(sample))
            .collect()
    }

    /// Return probability distributions for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_proba_batch(
        &self,
        features: &[Vec<f64>],
    ) -> Result<Vec<ClassProbabilities>, RfError> {
        features
            .into_par_iter()
            .map(|sample| self.predict_proba(sample))
            .collect()
    }

    /// Return the number of features this forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the feature names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Four well-separated clusters, one per class.
    fn make_four_class_data() -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for class in 0..4 {
            let offset = class as f64 * 10.0;
            for i in 0..15 {
                features.push(vec![offset + i as f64 * 0.1, 0.5]);
                labels.push(class);
            }
        }
        let names = vec!["x".to_string(), "y".to_string()];
        (features, labels, names)
    }

    #[test]
    fn four_class_separable_accuracy() {
        let (features, labels, names) = make_four_class_data();
        let fit = ForestConfig::new(50)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .with_seed(42)
            .fit(&features, &labels, &names)
            .unwrap();
        let predictions = fit.forest().predict_batch(&features).unwrap();
        let correct = predictions
            .iter()
            .zip(&labels)
            .filter(|&(&p, &l)| p == l)
            .count();
        let accuracy = correct as f64 / labels.len() as f64;
        assert!(accuracy > 0.9, "accuracy = {accuracy}");
    }

    #[test]
    fn deterministic_with_same_seed() {
        let (features, labels, names) = make_four_class_data();
        let fit1 = ForestConfig::new(10)
            .unwrap()
            .with_seed(99)
            .fit(&features, &labels, &names)
            .unwrap();
        let fit2 = ForestConfig::new(10)
            .unwrap()
            .with_seed(99)
            .fit(&features, &labels, &names)
            .unwrap();
        let p1 = fit1.forest().predict_batch(&features).unwrap();
        let p2 = fit2.forest().predict_batch(&features).unwrap();
        assert_eq!(p1, p2);
    }

    #[test]
    fn predict_proba_sums_to_one() {
        let (features, labels, names) = make_four_class_data();
        let fit = ForestConfig::new(20)
            .unwrap()
            .with_seed(42)
            .fit(&features, &labels, &names)
            .unwrap();
        let proba = fit.forest().predict_proba(&features[0]).unwrap();
        let sum: f64 = proba.as_slice().iter().sum();
        assert!((sum - 1.0).abs() < 1e-10, "sum = {sum}");
        assert_eq!(proba.as_slice().len(), 4);
    }

    #[test]
    fn importances_sum_to_one() {
        let (features, labels, names) = make_four_class_data();
        let fit = ForestConfig::new(20)
            .unwrap()
            .with_seed(42)
            .fit(&features, &labels, &names)
            .unwrap();
        let total: f64 = fit.importances().iter().map(|f| f.importance).sum();
        assert!((total - 1.0).abs() < 1e-10, "total = {total}");
        assert_eq!(fit.importances()[0].rank, 1);
    }

    #[test]
    fn constant_feature_has_zero_importance() {
        let (features, labels, names) = make_four_class_data();
        let fit = ForestConfig::new(20)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .with_seed(42)
            .fit(&features, &labels, &names)
            .unwrap();
        let y = fit
            .importances()
            .iter()
            .find(|f| f.name == "y")
            .expect("feature y present");
        assert_eq!(y.importance, 0.0);
    }

    #[test]
    fn invalid_tree_count_error() {
        assert!(matches!(
            ForestConfig::new(0),
            Err(RfError::InvalidTreeCount { n_trees: 0 })
        ));
    }

    #[test]
    fn empty_dataset_error() {
        let config = ForestConfig::new(5).unwrap();
        let err = config.fit(&[], &[], &[]).unwrap_err();
        assert!(matches!(err, RfError::EmptyDataset));
    }

    #[test]
    fn feature_count_mismatch_error() {
        let config = ForestConfig::new(5).unwrap();
        let features = vec![vec![1.0, 2.0], vec![3.0]];
        let err = config
            .fit(&features, &[0, 1], &["a".into(), "b".into()])
            .unwrap_err();
        assert!(matches!(
            err,
            RfError::FeatureCountMismatch { sample_index: 1, .. }
        ));
    }

    #[test]
    fn non_finite_value_error() {
        let config = ForestConfig::new(5).unwrap();
        let features = vec![vec![1.0], vec![f64::INFINITY]];
        let err = config.fit(&features, &[0, 1], &["a".into()]).unwrap_err();
        assert!(matches!(err, RfError::NonFiniteValue { sample_index: 1, .. }));
    }

    #[test]
    fn invalid_fixed_max_features_error() {
        let (features, labels, names) = make_four_class_data();
        let err = ForestConfig::new(5)
            .unwrap()
            .with_max_features(MaxFeatures::Fixed(10))
            .fit(&features, &labels, &names)
            .unwrap_err();
        assert!(matches!(
            err,
            RfError::InvalidMaxFeatures {
                max_features: 10,
                n_features: 2
            }
        ));
    }

    #[test]
    fn prediction_feature_mismatch_error() {
        let (features, labels, names) = make_four_class_data();
        let fit = ForestConfig::new(5)
            .unwrap()
            .fit(&features, &labels, &names)
            .unwrap();
        let err = fit.forest().predict(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            RfError::PredictionFeatureMismatch { expected: 2, got: 1 }
        ));
    }
}
