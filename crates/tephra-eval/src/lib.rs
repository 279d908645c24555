//! Leakage-safe bootstrap evaluation for the tephra pipeline.
//!
//! Pairs each bootstrap resample with its own preprocessing fit and
//! forest, scores the out-of-bag holdout, and aggregates accuracy,
//! precision, ROC-AUC, confusion, and per-row spatial correctness across
//! the ensemble.

mod confusion;
mod error;
mod metrics;
mod report;
mod trainer;

pub use confusion::{ClassMetrics, ConfusionMatrix};
pub use error::EvalError;
pub use metrics::{accuracy, macro_auc, macro_precision, one_vs_rest_auc, precision_per_class};
pub use report::{EvaluationReport, ResampleMetrics, SpatialAccuracy, aggregate};
pub use trainer::{Prediction, ResampleOutcome, ResampleTrainer};
