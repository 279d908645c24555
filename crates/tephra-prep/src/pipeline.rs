//! Two-phase preprocessing pipeline: fit once, transform anywhere.
//!
//! A fit learns rare-level collapsing, one-hot vocabulary, zero-variance
//! masking, and standardization statistics from exactly the rows it is
//! given. The resulting [`FittedPipeline`] is an immutable snapshot;
//! transforms are pure functions of that snapshot and the input rows, so
//! holdout data never leaks into the learned parameters.

use std::collections::HashMap;

use tracing::{debug, instrument};

use crate::PrepError;
use crate::frame::ModelingFrame;

/// Synthetic level that absorbs rare and unseen categorical values.
const OTHER_LEVEL: &str = "other";

/// Configuration for a preprocessing pipeline fit.
///
/// # Defaults
///
/// | Parameter        | Default |
/// |------------------|---------|
/// | `rare_threshold` | 0.05    |
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    rare_threshold: f64,
}

impl PreprocessConfig {
    /// Create a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rare_threshold: 0.05,
        }
    }

    /// Set the minimum relative frequency a categorical level needs to
    /// survive rare-level collapsing.
    #[must_use]
    pub fn with_rare_threshold(mut self, rare_threshold: f64) -> Self {
        self.rare_threshold = rare_threshold;
        self
    }

    /// Return the rare-level threshold.
    #[must_use]
    pub fn rare_threshold(&self) -> f64 {
        self.rare_threshold
    }

    /// Fit the pipeline on the given rows of `frame`.
    ///
    /// Learns, strictly from the referenced rows:
    /// 1. per-categorical retained level sets (levels at or above
    ///    `rare_threshold` relative frequency); everything else collapses
    ///    into a synthetic `other` level,
    /// 2. the one-hot vocabulary (first retained level is the reference
    ///    baseline and gets no indicator column; `other` always gets one),
    /// 3. the zero-variance column mask,
    /// 4. per-column mean and population standard deviation.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`PrepError::InvalidRareThreshold`] | Threshold outside (0.0, 1.0) |
    /// | [`PrepError::EmptyFitSet`] | `rows` is empty |
    /// | [`PrepError::RowOutOfBounds`] | Any row index >= `frame.n_rows()` |
    #[instrument(skip_all, fields(n_fit_rows = rows.len()))]
    pub fn fit(&self, frame: &ModelingFrame, rows: &[usize]) -> Result<FittedPipeline, PrepError> {
        if self.rare_threshold <= 0.0 || self.rare_threshold >= 1.0 {
            return Err(PrepError::InvalidRareThreshold {
                threshold: self.rare_threshold,
            });
        }
        if rows.is_empty() {
            return Err(PrepError::EmptyFitSet);
        }
        check_rows(rows, frame.n_rows())?;

        let n_fit = rows.len() as f64;

        // Rare-level collapsing: retain levels at or above the threshold.
        let mut vocabs = Vec::with_capacity(frame.categorical().len());
        for col in frame.categorical() {
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for &r in rows {
                *counts.entry(col.values()[r].as_str()).or_insert(0) += 1;
            }
            let mut retained: Vec<String> = counts
                .iter()
                .filter(|&(_, &count)| count as f64 / n_fit >= self.rare_threshold)
                .map(|(&level, _)| level.to_string())
                .collect();
            retained.sort();
            debug!(
                column = col.name(),
                n_levels = counts.len(),
                n_retained = retained.len(),
                "collapsed rare levels"
            );
            vocabs.push(CategoricalVocab { retained });
        }

        // Candidate columns: numeric predictors, then indicator columns for
        // every retained level past the baseline, then the `other` indicator.
        let mut candidates: Vec<(String, ColumnSource)> = frame
            .numeric()
            .iter()
            .enumerate()
            .map(|(i, col)| (col.name().to_string(), ColumnSource::Numeric(i)))
            .collect();
        for (ci, col) in frame.categorical().iter().enumerate() {
            for level in vocabs[ci].retained.iter().skip(1) {
                candidates.push((
                    format!("{}_{}", col.name(), level),
                    ColumnSource::Level {
                        column: ci,
                        level: level.clone(),
                    },
                ));
            }
            candidates.push((
                format!("{}_{}", col.name(), OTHER_LEVEL),
                ColumnSource::Other { column: ci },
            ));
        }

        // Zero-variance mask plus standardization statistics, one pass per
        // candidate over the fit rows.
        let mut columns = Vec::with_capacity(candidates.len());
        for (name, source) in candidates {
            let values: Vec<f64> = rows
                .iter()
                .map(|&r| raw_value(frame, &vocabs, &source, r))
                .collect();
            let mean = values.iter().sum::<f64>() / n_fit;
            let variance = values.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n_fit;
            if variance == 0.0 {
                debug!(column = %name, "dropped zero-variance column");
                continue;
            }
            columns.push(FittedColumn {
                name,
                source,
                mean,
                std: variance.sqrt(),
            });
        }

        debug!(n_features = columns.len(), "pipeline fitted");

        Ok(FittedPipeline {
            n_numeric: frame.numeric().len(),
            n_categorical: frame.categorical().len(),
            vocabs,
            columns,
        })
    }
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Retained (non-collapsed) levels of one categorical column, sorted.
#[derive(Debug, Clone)]
struct CategoricalVocab {
    retained: Vec<String>,
}

impl CategoricalVocab {
    fn is_retained(&self, level: &str) -> bool {
        self.retained.binary_search_by(|l| l.as_str().cmp(level)).is_ok()
    }
}

/// Where a transformed column draws its raw value from.
#[derive(Debug, Clone)]
enum ColumnSource {
    /// Numeric predictor at the given frame column index.
    Numeric(usize),
    /// Indicator for one retained level of a categorical column.
    Level { column: usize, level: String },
    /// Indicator for the synthetic `other` level of a categorical column.
    Other { column: usize },
}

/// One surviving output column with its frozen standardization statistics.
#[derive(Debug, Clone)]
struct FittedColumn {
    name: String,
    source: ColumnSource,
    mean: f64,
    std: f64,
}

/// An immutable preprocessing parameter snapshot.
///
/// Produced by [`PreprocessConfig::fit`]. Applying it never mutates the
/// snapshot or recomputes statistics, so the same fit applied to the same
/// rows always yields identical output.
#[derive(Debug, Clone)]
pub struct FittedPipeline {
    n_numeric: usize,
    n_categorical: usize,
    vocabs: Vec<CategoricalVocab>,
    columns: Vec<FittedColumn>,
}

impl FittedPipeline {
    /// Transform the given rows of `frame` into a standardized feature matrix.
    ///
    /// Rare and unseen categorical levels map to the `other` indicator.
    /// Standardization uses the fit-time mean and standard deviation.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`PrepError::FrameShapeMismatch`] | `frame` column counts differ from the fit frame |
    /// | [`PrepError::RowOutOfBounds`] | Any row index >= `frame.n_rows()` |
    pub fn transform(
        &self,
        frame: &ModelingFrame,
        rows: &[usize],
    ) -> Result<FeatureMatrix, PrepError> {
        if frame.numeric().len() != self.n_numeric
            || frame.categorical().len() != self.n_categorical
        {
            return Err(PrepError::FrameShapeMismatch {
                expected_numeric: self.n_numeric,
                expected_categorical: self.n_categorical,
                got_numeric: frame.numeric().len(),
                got_categorical: frame.categorical().len(),
            });
        }
        check_rows(rows, frame.n_rows())?;

        let matrix: Vec<Vec<f64>> = rows
            .iter()
            .map(|&r| {
                self.columns
                    .iter()
                    .map(|col| (raw_value(frame, &self.vocabs, &col.source, r) - col.mean) / col.std)
                    .collect()
            })
            .collect();

        Ok(FeatureMatrix {
            names: self.feature_names(),
            rows: matrix,
        })
    }

    /// Return the surviving output column names, in output order.
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Return the number of surviving output columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.columns.len()
    }
}

/// A standardized row-major feature matrix with named columns.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    names: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Return the column names.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Return the feature rows (`rows[sample][feature]`).
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.names.len()
    }
}

fn check_rows(rows: &[usize], n_rows: usize) -> Result<(), PrepError> {
    for &r in rows {
        if r >= n_rows {
            return Err(PrepError::RowOutOfBounds { index: r, n_rows });
        }
    }
    Ok(())
}

fn raw_value(
    frame: &ModelingFrame,
    vocabs: &[CategoricalVocab],
    source: &ColumnSource,
    row: usize,
) -> f64 {
    match source {
        ColumnSource::Numeric(i) => frame.numeric()[*i].values()[row],
        ColumnSource::Level { column, level } => {
            // A retained level never collapses, so a direct comparison
            // matches the collapsed value.
            f64::from(frame.categorical()[*column].values()[row] == *level)
        }
        ColumnSource::Other { column } => {
            let value = &frame.categorical()[*column].values()[row];
            f64::from(!vocabs[*column].is_retained(value))
        }
    }
}
