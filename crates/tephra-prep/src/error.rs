//! Error types for tephra-prep.

/// Errors from preprocessing and resampling operations.
#[derive(Debug, thiserror::Error)]
pub enum PrepError {
    /// Returned when the rare-level threshold is outside (0.0, 1.0).
    #[error("rare_threshold must be in (0.0, 1.0), got {threshold}")]
    InvalidRareThreshold {
        /// The invalid threshold value provided.
        threshold: f64,
    },

    /// Returned when a frame column has a different length than the frame row count.
    #[error("column \"{column}\" has {got} values, expected {expected}")]
    ColumnLengthMismatch {
        /// Name of the offending column.
        column: String,
        /// Expected number of values (frame row count).
        expected: usize,
        /// Actual number of values in the column.
        got: usize,
    },

    /// Returned when a pipeline fit is attempted on zero rows.
    #[error("cannot fit preprocessing pipeline on an empty row set")]
    EmptyFitSet,

    /// Returned when a row index exceeds the frame row count.
    #[error("row index {index} out of bounds for frame with {n_rows} rows")]
    RowOutOfBounds {
        /// The offending row index.
        index: usize,
        /// Number of rows in the frame.
        n_rows: usize,
    },

    /// Returned when a fitted pipeline is applied to a frame with a different shape.
    #[error(
        "frame shape mismatch: fitted on {expected_numeric} numeric / {expected_categorical} categorical columns, got {got_numeric} / {got_categorical}"
    )]
    FrameShapeMismatch {
        /// Numeric column count at fit time.
        expected_numeric: usize,
        /// Categorical column count at fit time.
        expected_categorical: usize,
        /// Numeric column count of the transform frame.
        got_numeric: usize,
        /// Categorical column count of the transform frame.
        got_categorical: usize,
    },

    /// Returned when zero bootstrap resamples are requested.
    #[error("n_resamples must be at least 1, got {n_resamples}")]
    InvalidResampleCount {
        /// The invalid resample count provided.
        n_resamples: usize,
    },

    /// Returned when resampling is attempted on an empty dataset.
    #[error("cannot draw bootstrap resamples from an empty dataset")]
    EmptyDataset,

    /// Returned when a numeric cell is NaN or infinite.
    #[error("non-finite value in column \"{column}\", row {row}")]
    NonFiniteValue {
        /// Name of the offending column.
        column: String,
        /// Zero-based row index of the offending value.
        row: usize,
    },
}
