//! Domain types for tephra-io.

use tephra_prep::{CategoricalColumn, ModelingFrame, NumericColumn};

use crate::IoError;
use crate::label::VolcanoClass;

/// A volcano identifier.
///
/// Wraps the non-empty `volcano_number` field of the input CSV. The id is
/// non-predictive; it only rides along for joining predictions back to
/// records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VolcanoId(String);

impl VolcanoId {
    pub(crate) fn new(id: String) -> Self {
        debug_assert!(!id.is_empty(), "volcano id must not be empty");
        Self(id)
    }

    /// Return the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VolcanoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The modeling table: selected predictor columns plus labels and ids.
///
/// Produced by [`VolcanoReader`](crate::VolcanoReader). All vectors are
/// parallel — index `i` describes one volcano. Immutable once loaded.
#[derive(Debug)]
pub struct ModelingTable {
    ids: Vec<VolcanoId>,
    classes: Vec<VolcanoClass>,
    latitude: Vec<f64>,
    longitude: Vec<f64>,
    elevation: Vec<f64>,
    tectonic_settings: Vec<String>,
    major_rock: Vec<String>,
}

impl ModelingTable {
    pub(crate) fn new(
        ids: Vec<VolcanoId>,
        classes: Vec<VolcanoClass>,
        latitude: Vec<f64>,
        longitude: Vec<f64>,
        elevation: Vec<f64>,
        tectonic_settings: Vec<String>,
        major_rock: Vec<String>,
    ) -> Self {
        Self {
            ids,
            classes,
            latitude,
            longitude,
            elevation,
            tectonic_settings,
            major_rock,
        }
    }

    /// Return the volcano ids.
    #[must_use]
    pub fn ids(&self) -> &[VolcanoId] {
        &self.ids
    }

    /// Return the derived class labels.
    #[must_use]
    pub fn classes(&self) -> &[VolcanoClass] {
        &self.classes
    }

    /// Return the class indices as a label vector for training.
    #[must_use]
    pub fn label_indices(&self) -> Vec<usize> {
        self.classes.iter().map(|c| c.index()).collect()
    }

    /// Return the latitudes.
    #[must_use]
    pub fn latitude(&self) -> &[f64] {
        &self.latitude
    }

    /// Return the longitudes.
    #[must_use]
    pub fn longitude(&self) -> &[f64] {
        &self.longitude
    }

    /// Return the elevations.
    #[must_use]
    pub fn elevation(&self) -> &[f64] {
        &self.elevation
    }

    /// Return the number of volcanoes.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.ids.len()
    }

    /// Assemble the predictor columns into a [`ModelingFrame`].
    ///
    /// Numeric predictors: latitude, longitude, elevation. Categorical
    /// predictors: tectonic settings, major rock. The id and label columns
    /// stay out of the frame.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Frame`] if the columns cannot be assembled; the
    /// reader's validation makes this unreachable for a loaded table.
    pub fn frame(&self) -> Result<ModelingFrame, IoError> {
        let numeric = vec![
            NumericColumn::new("latitude", self.latitude.clone()),
            NumericColumn::new("longitude", self.longitude.clone()),
            NumericColumn::new("elevation", self.elevation.clone()),
        ]
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| IoError::Frame { source })?;

        let categorical = vec![
            CategoricalColumn::new("tectonic_settings", self.tectonic_settings.clone()),
            CategoricalColumn::new("major_rock_1", self.major_rock.clone()),
        ];

        ModelingFrame::new(numeric, categorical).map_err(|source| IoError::Frame { source })
    }
}
