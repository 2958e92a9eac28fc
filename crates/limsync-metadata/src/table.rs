//! Loaded metadata table, schema gate, and typed rows.

use indexmap::IndexMap;
use thiserror::Error;

use limsync_core::AnnotationPayload;

pub const FILENAME: &str = "filename";
pub const DATASET: &str = "dataset";
pub const PROJECT: &str = "project";

/// Columns every metadata file must carry.
pub const REQUIRED_COLUMNS: [&str; 3] = [FILENAME, DATASET, PROJECT];

/// Legacy group column, ignored.
pub const LEGACY_GROUP_COLUMN: &str = "OMERO_group";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Metadata file missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// One data line of the file, cells keyed by column name in header order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line (or sheet row) the cells came from.
    pub line: u64,
    pub values: IndexMap<String, String>,
}

/// Header plus data rows, as read from disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataTable {
    columns: Vec<String>,
    rows: Vec<RawRow>,
}

impl MetadataTable {
    pub fn new(columns: Vec<String>, rows: Vec<RawRow>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Check the header for the required columns, reporting all that are absent.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|required| !self.columns.iter().any(|c| c == *required))
            .map(|c| c.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::MissingColumns(missing))
        }
    }

    /// Validate the header, then split every row into its typed form.
    pub fn into_rows(self) -> Result<Vec<MetadataRow>, SchemaError> {
        self.validate()?;
        Ok(self.rows.into_iter().map(MetadataRow::from_raw).collect())
    }
}

/// A metadata line split into the fields that place the image and the
/// fields that describe it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRow {
    pub line: u64,
    /// Original import filename to match.
    pub filename: String,
    pub dataset: String,
    pub project: String,
    /// Everything else, in column order. Becomes the annotation payload.
    ///
    /// Columns whose cell is empty on this line are left out, so the
    /// payload can hold fewer keys than the header has leftover columns.
    /// `OMERO_group` is never included.
    pub extra: AnnotationPayload,
}

impl MetadataRow {
    fn from_raw(raw: RawRow) -> Self {
        let mut values = raw.values;
        values.shift_remove(LEGACY_GROUP_COLUMN);
        let project = values.shift_remove(PROJECT).unwrap_or_default();
        let dataset = values.shift_remove(DATASET).unwrap_or_default();
        let filename = values.shift_remove(FILENAME).unwrap_or_default();
        values.retain(|_, v| !v.is_empty());

        Self {
            line: raw.line,
            filename,
            dataset,
            project,
            extra: values,
        }
    }

    /// Required fields left blank on this line.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.filename.trim().is_empty() {
            missing.push(FILENAME);
        }
        if self.dataset.trim().is_empty() {
            missing.push(DATASET);
        }
        if self.project.trim().is_empty() {
            missing.push(PROJECT);
        }
        missing
    }
}
