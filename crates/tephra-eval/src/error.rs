//! Error types for tephra-eval.

use tephra_prep::PrepError;
use tephra_rf::RfError;

/// Errors from the resample training loop and metric aggregation.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// Returned when preprocessing fails for one resample.
    #[error("preprocessing failed for resample {resample_id}")]
    Preprocess {
        /// The resample being processed.
        resample_id: usize,
        /// The underlying preprocessing error.
        source: PrepError,
    },

    /// Returned when model training or prediction fails for one resample.
    #[error("model training failed for resample {resample_id}")]
    Train {
        /// The resample being processed.
        resample_id: usize,
        /// The underlying forest error.
        source: RfError,
    },

    /// Returned when the full-dataset importance fit fails.
    #[error("importance fit on the full dataset failed")]
    ImportanceFit {
        /// The underlying forest error.
        source: RfError,
    },

    /// Returned when merging confusion matrices with different class counts.
    #[error("confusion matrices have different class counts: {expected} vs {got}")]
    ClassCountMismatch {
        /// Class count of the receiving matrix.
        expected: usize,
        /// Class count of the merged matrix.
        got: usize,
    },

    /// Returned when aggregation is attempted over zero predictions.
    #[error("no out-of-bag predictions to aggregate")]
    EmptyPredictions,
}
