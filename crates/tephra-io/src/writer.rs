//! JSON report writer for evaluation and spatial outputs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ExperimentName;

/// One resample's metric row, as handed to the writer.
#[derive(Debug, Clone)]
pub struct ResampleRow {
    /// Resample identifier.
    pub resample_id: usize,
    /// Number of out-of-bag rows scored.
    pub n_holdout: usize,
    /// Holdout accuracy; `None` serializes as JSON null.
    pub accuracy: Option<f64>,
    /// Macro-averaged precision; `None` serializes as JSON null.
    pub precision: Option<f64>,
    /// Per-class precision, class-index order; `None` entries serialize as null.
    pub precision_per_class: Vec<Option<f64>>,
    /// Macro-averaged ROC-AUC; `None` serializes as JSON null.
    pub auc: Option<f64>,
}

/// One volcano's spatial correctness row, as handed to the writer.
#[derive(Debug, Clone)]
pub struct SpatialRow {
    /// Volcano number.
    pub volcano_number: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// True class name.
    pub true_class: String,
    /// Number of resamples where this volcano was out-of-bag.
    pub n_appearances: usize,
    /// Fraction of those appearances predicted correctly.
    pub correct_fraction: f64,
}

/// Writes evaluation results to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_evaluation.json` and
/// `{experiment}_spatial.json`. Inputs are plain rows and primitives —
/// the writer has no dependency on `tephra-eval`.
pub struct ReportWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ReportWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Write the evaluation report to `{experiment}_evaluation.json`.
    ///
    /// `importances` entries are `(feature name, importance, rank)`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip_all)]
    pub fn write_evaluation(
        &self,
        overall_accuracy: f64,
        mean_accuracy: f64,
        std_accuracy: f64,
        mean_auc: Option<f64>,
        resamples: &[ResampleRow],
        confusion_matrix: &[Vec<usize>],
        class_names: &[&str],
        importances: &[(String, f64, usize)],
    ) -> Result<PathBuf, IoError> {
        let path = self
            .output_dir
            .join(format!("{}_evaluation.json", self.experiment.as_str()));

        let resample_entries: Vec<ResampleEntry> = resamples
            .iter()
            .map(|r| ResampleEntry {
                resample_id: r.resample_id,
                n_holdout: r.n_holdout,
                accuracy: r.accuracy,
                precision: r.precision,
                precision_per_class: r.precision_per_class.clone(),
                auc: r.auc,
            })
            .collect();

        let features: Vec<FeatureEntry> = importances
            .iter()
            .map(|(name, importance, rank)| FeatureEntry {
                name: name.as_str(),
                importance: *importance,
                rank: *rank,
            })
            .collect();

        let artifact = EvaluationArtifact {
            experiment: self.experiment.as_str(),
            n_resamples: resamples.len(),
            overall_accuracy,
            mean_accuracy,
            std_accuracy,
            mean_auc,
            resamples: resample_entries,
            class_names,
            confusion_matrix,
            feature_importances: features,
        };

        let json = serde_json::to_string_pretty(&artifact).expect("serialization cannot fail");
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "evaluation report written");
        Ok(path)
    }

    /// Write the spatial correctness table to `{experiment}_spatial.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_spatial(&self, rows: &[SpatialRow]) -> Result<PathBuf, IoError> {
        let path = self
            .output_dir
            .join(format!("{}_spatial.json", self.experiment.as_str()));

        let entries: Vec<SpatialEntry> = rows
            .iter()
            .map(|r| SpatialEntry {
                volcano_number: r.volcano_number.as_str(),
                latitude: r.latitude,
                longitude: r.longitude,
                true_class: r.true_class.as_str(),
                n_appearances: r.n_appearances,
                correct_fraction: r.correct_fraction,
            })
            .collect();

        let artifact = SpatialArtifact {
            experiment: self.experiment.as_str(),
            n_volcanoes: rows.len(),
            volcanoes: entries,
        };

        let json = serde_json::to_string_pretty(&artifact).expect("serialization cannot fail");
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "spatial report written");
        Ok(path)
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct EvaluationArtifact<'a> {
    experiment: &'a str,
    n_resamples: usize,
    overall_accuracy: f64,
    mean_accuracy: f64,
    std_accuracy: f64,
    mean_auc: Option<f64>,
    resamples: Vec<ResampleEntry>,
    class_names: &'a [&'a str],
    confusion_matrix: &'a [Vec<usize>],
    feature_importances: Vec<FeatureEntry<'a>>,
}

#[derive(Serialize)]
struct ResampleEntry {
    resample_id: usize,
    n_holdout: usize,
    accuracy: Option<f64>,
    precision: Option<f64>,
    precision_per_class: Vec<Option<f64>>,
    auc: Option<f64>,
}

#[derive(Serialize)]
struct FeatureEntry<'a> {
    name: &'a str,
    importance: f64,
    rank: usize,
}

#[derive(Serialize)]
struct SpatialArtifact<'a> {
    experiment: &'a str,
    n_volcanoes: usize,
    volcanoes: Vec<SpatialEntry<'a>>,
}

#[derive(Serialize)]
struct SpatialEntry<'a> {
    volcano_number: &'a str,
    latitude: f64,
    longitude: f64,
    true_class: &'a str,
    n_appearances: usize,
    correct_fraction: f64,
}
