//! Configuration builder for random forest training.

use crate::error::RfError;
use crate::forest::ForestFit;

/// Strategy for determining the number of features considered at each split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxFeatures {
    /// Square root of total features (the classification default).
    Sqrt,
    /// All features (no subsampling).
    All,
    /// A fixed count.
    Fixed(usize),
}

/// Configuration for random forest training.
///
/// Construct via [`ForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default    |
/// |---------------------|------------|
/// | `max_features`      | `Sqrt`     |
/// | `max_depth`         | `None`     |
/// | `min_samples_split` | 2          |
/// | `min_samples_leaf`  | 1          |
/// | `seed`              | 42         |
#[derive(Debug, Clone)]
pub struct ForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) max_features: MaxFeatures,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) seed: u64,
}

impl ForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, RfError> {
        if n_trees == 0 {
            return Err(RfError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            max_features: MaxFeatures::Sqrt,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        })
    }

    /// Set the max features strategy.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the maximum tree depth. `None` means unlimited.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the max features strategy.
    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train a random forest on the provided dataset.
    ///
    /// `features[sample_idx][feature_idx]` — row-major layout.
    /// `labels[sample_idx]` — class labels (zero-based).
    /// `feature_names` — names for each feature column.
    ///
    /// # Errors
    ///
    /// | Variant                           | When                                             |
    /// |-----------------------------------|--------------------------------------------------|
    /// | [`RfError::EmptyDataset`]         | `features` is empty                              |
    /// | [`RfError::ZeroFeatures`]         | rows have zero feature columns                   |
    /// | [`RfError::FeatureCountMismatch`] | rows have inconsistent lengths                   |
    /// | [`RfError::NonFiniteValue`]       | any value is NaN or infinite                     |
    /// | [`RfError::InvalidMaxFeatures`]   | resolved max_features is outside [1, n_features] |
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
    ) -> Result<ForestFit, RfError> {
        crate::forest::train(self, features, labels, feature_names)
    }
}
