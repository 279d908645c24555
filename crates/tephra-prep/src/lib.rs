//! Preprocessing and resampling for the tephra pipeline.
//!
//! Provides a leakage-safe two-phase preprocessing pipeline (rare-level
//! collapsing, one-hot encoding, zero-variance filtering, standardization)
//! and a deterministic bootstrap resampler.

mod error;
mod frame;
mod pipeline;
mod resample;

pub use error::PrepError;
pub use frame::{CategoricalColumn, ModelingFrame, NumericColumn};
pub use pipeline::{FeatureMatrix, FittedPipeline, PreprocessConfig};
pub use resample::{BootstrapConfig, Resample};
