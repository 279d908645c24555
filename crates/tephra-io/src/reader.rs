//! CSV volcano record reader with full input validation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{ModelingTable, VolcanoId};
use crate::label::VolcanoClass;

/// Columns the reader requires, located by header name.
const REQUIRED_COLUMNS: [&str; 7] = [
    "volcano_number",
    "primary_volcano_type",
    "latitude",
    "longitude",
    "elevation",
    "tectonic_settings",
    "major_rock_1",
];

/// Reads volcano records from a CSV file into a [`ModelingTable`].
///
/// Columns are located by header name; extra columns are ignored. The
/// class label is derived from `primary_volcano_type` during the read.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::MissingColumn`] | A required column is absent from the header |
/// | [`IoError::InvalidNumericValue`] | Numeric cell is empty, unparseable, or non-finite |
/// | [`IoError::DuplicateVolcanoNumber`] | Same volcano number appears twice |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
pub struct VolcanoReader {
    path: PathBuf,
}

impl VolcanoReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file, returning a [`ModelingTable`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<ModelingTable, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) tolerates short rows; a missing cell then surfaces
        // as an InvalidNumericValue naming the column instead of a
        // low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        })?;

        // Resolve required columns by header name.
        let mut indices = HashMap::new();
        for required in REQUIRED_COLUMNS {
            let idx = header
                .iter()
                .position(|name| name == required)
                .ok_or_else(|| IoError::MissingColumn {
                    path: self.path.clone(),
                    column: required.to_string(),
                })?;
            indices.insert(required, idx);
        }
        debug!(n_header_columns = header.len(), "resolved CSV header");

        let mut ids = Vec::new();
        let mut classes = Vec::new();
        let mut latitude = Vec::new();
        let mut longitude = Vec::new();
        let mut elevation = Vec::new();
        let mut tectonic_settings = Vec::new();
        let mut major_rock = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| IoError::CsvParse {
                path: self.path.clone(),
                offset: e.position().map_or(0, |p| p.byte()),
                source: e,
            })?;

            let get = |column: &str| record.get(indices[column]).unwrap_or("");

            let id_str = get("volcano_number").to_string();
            if let Some(&first_row) = seen.get(&id_str) {
                return Err(IoError::DuplicateVolcanoNumber {
                    path: self.path.clone(),
                    volcano_number: id_str,
                    first_row,
                    second_row: row_index,
                });
            }
            seen.insert(id_str.clone(), row_index);

            latitude.push(self.parse_numeric(get("latitude"), row_index, "latitude")?);
            longitude.push(self.parse_numeric(get("longitude"), row_index, "longitude")?);
            elevation.push(self.parse_numeric(get("elevation"), row_index, "elevation")?);

            classes.push(VolcanoClass::from_primary_type(get("primary_volcano_type")));
            tectonic_settings.push(get("tectonic_settings").to_string());
            major_rock.push(get("major_rock_1").to_string());
            ids.push(VolcanoId::new(id_str));
        }

        if ids.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        info!(n_volcanoes = ids.len(), "modeling table loaded");

        Ok(ModelingTable::new(
            ids,
            classes,
            latitude,
            longitude,
            elevation,
            tectonic_settings,
            major_rock,
        ))
    }

    fn parse_numeric(&self, raw: &str, row_index: usize, column: &str) -> Result<f64, IoError> {
        let value: f64 = raw.parse().map_err(|_| IoError::InvalidNumericValue {
            path: self.path.clone(),
            row_index,
            column: column.to_string(),
            raw: raw.to_string(),
        })?;
        if !value.is_finite() {
            return Err(IoError::InvalidNumericValue {
                path: self.path.clone(),
                row_index,
                column: column.to_string(),
                raw: raw.to_string(),
            });
        }
        Ok(value)
    }
}
