//! File I/O, validation, and serialization for the tephra pipeline.

mod domain;
mod error;
mod label;
mod reader;
mod writer;

pub use domain::{ExperimentName, ModelingTable, VolcanoId};
pub use error::IoError;
pub use label::VolcanoClass;
pub use reader::VolcanoReader;
pub use writer::{ReportWriter, ResampleRow, SpatialRow};
