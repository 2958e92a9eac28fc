//! Reconciliation engine — metadata rows × orphan pool → filed, annotated images.
//!
//! For every metadata row, find the orphan images whose original filename
//! matches, get-or-create the row's Project and Dataset, link the images,
//! and attach the remaining columns as one namespaced key-value annotation.

pub mod engine;
pub mod error;
pub mod resolver;
pub mod types;

pub use engine::{reconcile, Reconciler};
pub use error::ReconcileError;
pub use resolver::{ContainerResolver, Resolved};
pub use types::*;
