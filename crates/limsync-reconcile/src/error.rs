//! Reconciliation errors.

use thiserror::Error;

use crate::types::RowProgress;
use limsync_metadata::SchemaError;

#[derive(Error, Debug)]
pub enum ReconcileError {
    /// The metadata header lacks a required column. Raised before any
    /// repository call.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Failed to enumerate orphan images: {0}")]
    Enumerate(#[source] limsync_core::Error),

    /// A repository call failed while processing a row. `progress` records
    /// which writes already landed; nothing is rolled back.
    #[error("line {line} ({filename}): {source} [{progress}]")]
    Row {
        line: u64,
        filename: String,
        progress: RowProgress,
        #[source]
        source: limsync_core::Error,
    },
}

impl ReconcileError {
    pub fn progress(&self) -> Option<&RowProgress> {
        match self {
            Self::Row { progress, .. } => Some(progress),
            _ => None,
        }
    }
}
