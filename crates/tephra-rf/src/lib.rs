//! Random forest classification for the tephra pipeline.
//!
//! Provides a hand-rolled random forest with Gini CART trees, per-tree
//! bootstrap sampling, parallel training via rayon, averaged probability
//! prediction, and mean-decrease-in-impurity feature importance.

mod config;
mod error;
mod forest;
mod importance;
mod tree;

pub use config::{ForestConfig, MaxFeatures};
pub use error::RfError;
pub use forest::{ClassProbabilities, Forest, ForestFit};
pub use importance::RankedFeature;
