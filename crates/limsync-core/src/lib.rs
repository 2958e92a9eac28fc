//! limsync core — identifiers, scoped session, repository contract, errors.

pub mod config;
pub mod error;
pub mod repository;
pub mod types;

pub use config::ConnectionConfig;
pub use error::{Error, Result};
pub use repository::{AnnotationPayload, ImageRepository};
pub use types::*;
