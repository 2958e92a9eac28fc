//! Metadata file format detection.

use std::path::Path;

use limsync_core::{Error, Result};

/// Supported metadata file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataFormat {
    Csv,
    Tsv,
    Workbook,
}

impl MetadataFormat {
    /// Detect format from extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "tsv" | "tab" | "txt" => Some(Self::Tsv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(Self::Workbook),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::from_extension(ext).ok_or_else(|| {
            Error::Metadata(format!(
                "unsupported metadata file type '{}' ({}); expected csv, tsv, xlsx or ods",
                ext,
                path.display()
            ))
        })
    }

    /// Field delimiter for text formats.
    pub fn delimiter(&self) -> Option<u8> {
        match self {
            Self::Csv => Some(b','),
            Self::Tsv => Some(b'\t'),
            Self::Workbook => None,
        }
    }
}
