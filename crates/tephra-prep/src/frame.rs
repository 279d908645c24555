//! Column-major modeling frame consumed by the preprocessing pipeline.

use crate::PrepError;

/// A named numeric predictor column.
#[derive(Debug, Clone)]
pub struct NumericColumn {
    pub(crate) name: String,
    pub(crate) values: Vec<f64>,
}

impl NumericColumn {
    /// Create a numeric column, rejecting NaN and infinite values.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::NonFiniteValue`] naming the column and row of
    /// the first non-finite value.
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Result<Self, PrepError> {
        let name = name.into();
        for (row, &v) in values.iter().enumerate() {
            if !v.is_finite() {
                return Err(PrepError::NonFiniteValue { column: name, row });
            }
        }
        Ok(Self { name, values })
    }

    /// Return the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the column values.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// A named categorical predictor column with free-text levels.
#[derive(Debug, Clone)]
pub struct CategoricalColumn {
    pub(crate) name: String,
    pub(crate) values: Vec<String>,
}

impl CategoricalColumn {
    /// Create a categorical column.
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Return the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the column values.
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// A column-major table of numeric and categorical predictors.
///
/// The frame itself is read-only once constructed; pipeline fits and
/// transforms reference it by row index so bootstrap resamples never
/// copy the underlying data.
#[derive(Debug, Clone)]
pub struct ModelingFrame {
    n_rows: usize,
    numeric: Vec<NumericColumn>,
    categorical: Vec<CategoricalColumn>,
}

impl ModelingFrame {
    /// Assemble a frame from predictor columns.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::ColumnLengthMismatch`] when any column length
    /// differs from the first column's length.
    pub fn new(
        numeric: Vec<NumericColumn>,
        categorical: Vec<CategoricalColumn>,
    ) -> Result<Self, PrepError> {
        let n_rows = numeric
            .first()
            .map(|c| c.values.len())
            .or_else(|| categorical.first().map(|c| c.values.len()))
            .unwrap_or(0);

        for col in &numeric {
            if col.values.len() != n_rows {
                return Err(PrepError::ColumnLengthMismatch {
                    column: col.name.clone(),
                    expected: n_rows,
                    got: col.values.len(),
                });
            }
        }
        for col in &categorical {
            if col.values.len() != n_rows {
                return Err(PrepError::ColumnLengthMismatch {
                    column: col.name.clone(),
                    expected: n_rows,
                    got: col.values.len(),
                });
            }
        }

        Ok(Self {
            n_rows,
            numeric,
            categorical,
        })
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Return the numeric columns.
    #[must_use]
    pub fn numeric(&self) -> &[NumericColumn] {
        &self.numeric
    }

    /// Return the categorical columns.
    #[must_use]
    pub fn categorical(&self) -> &[CategoricalColumn] {
        &self.categorical
    }
}
