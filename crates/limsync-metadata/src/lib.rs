//! Metadata loading — LIMS export file → validated rows.
//!
//! A file is read into a [`MetadataTable`] of string cells keyed by column
//! name. The schema gate ([`MetadataTable::validate`]) runs once over the
//! header before any row is handed out.

pub mod format;
pub mod loader;
pub mod table;

pub use format::MetadataFormat;
pub use loader::load_metadata;
pub use table::{MetadataRow, MetadataTable, RawRow, SchemaError, REQUIRED_COLUMNS};
