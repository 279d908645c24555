//! Deterministic bootstrap resampling.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::PrepError;

/// Configuration for drawing an ensemble of bootstrap resamples.
///
/// # Defaults
///
/// | Parameter     | Default |
/// |---------------|---------|
/// | `n_resamples` | 25      |
/// | `seed`        | 42      |
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    n_resamples: usize,
    seed: u64,
}

/// One bootstrap draw: in-bag row indices (with repeats) and the
/// out-of-bag holdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resample {
    /// Zero-based resample identifier, stable across runs with the same seed.
    pub id: usize,
    /// Row indices drawn with replacement; length equals the source row count.
    pub in_bag: Vec<usize>,
    /// Rows never drawn, in ascending order.
    pub out_of_bag: Vec<usize>,
}

impl BootstrapConfig {
    /// Create a config with the given number of resamples.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::InvalidResampleCount`] if `n_resamples` is zero.
    pub fn new(n_resamples: usize) -> Result<Self, PrepError> {
        if n_resamples == 0 {
            return Err(PrepError::InvalidResampleCount { n_resamples });
        }
        Ok(Self {
            n_resamples,
            seed: 42,
        })
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the number of resamples.
    #[must_use]
    pub fn n_resamples(&self) -> usize {
        self.n_resamples
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Draw the bootstrap ensemble for a dataset of `n_samples` rows.
    ///
    /// Each resample draws `n_samples` indices uniformly with replacement.
    /// Per-resample RNGs are seeded from a master ChaCha8 stream, so the
    /// membership of every resample is a pure function of `(seed, n_resamples,
    /// n_samples)`.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::EmptyDataset`] if `n_samples` is zero.
    #[instrument(skip(self), fields(n_resamples = self.n_resamples, n_samples))]
    pub fn draw(&self, n_samples: usize) -> Result<Vec<Resample>, PrepError> {
        if n_samples == 0 {
            return Err(PrepError::EmptyDataset);
        }

        let mut master_rng = ChaCha8Rng::seed_from_u64(self.seed);
        let resamples: Vec<Resample> = (0..self.n_resamples)
            .map(|id| {
                let mut rng = ChaCha8Rng::seed_from_u64(master_rng.r#gen());
                let mut drawn = vec![false; n_samples];
                let mut in_bag = Vec::with_capacity(n_samples);
                for _ in 0..n_samples {
                    let idx = rng.gen_range(0..n_samples);
                    in_bag.push(idx);
                    drawn[idx] = true;
                }
                let out_of_bag: Vec<usize> = (0..n_samples).filter(|&i| !drawn[i]).collect();
                debug!(id, n_oob = out_of_bag.len(), "resample drawn");
                Resample {
                    id,
                    in_bag,
                    out_of_bag,
                }
            })
            .collect();

        Ok(resamples)
    }
}
