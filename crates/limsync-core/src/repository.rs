//! The image repository contract the reconciliation engine runs against.

use indexmap::IndexMap;

use crate::error::Result;
use crate::types::{
    AnnotationId, AnnotationTarget, ContainerId, ContainerKind, ImageId, ScopedSession,
};

/// Ordered key-value pairs posted as one annotation.
pub type AnnotationPayload = IndexMap<String, String>;

/// Operations needed from an image repository service.
///
/// Every call is a blocking round-trip and receives the scoped session
/// explicitly. Implementations must not retry or roll back on their own.
pub trait ImageRepository {
    /// List images not linked to any dataset, in the repository's order.
    fn orphan_images(&self, session: &ScopedSession) -> Result<Vec<ImageId>>;

    /// Whether the image was imported from a file named exactly `name`.
    fn has_original_filename(
        &self,
        session: &ScopedSession,
        image: ImageId,
        name: &str,
    ) -> Result<bool>;

    /// Containers named exactly `name`. Datasets are looked up under
    /// `parent`; projects take no parent.
    fn find_containers(
        &self,
        session: &ScopedSession,
        kind: ContainerKind,
        name: &str,
        parent: Option<ContainerId>,
    ) -> Result<Vec<ContainerId>>;

    /// Create a container named `name`. A dataset is placed under `parent`.
    fn create_container(
        &self,
        session: &ScopedSession,
        kind: ContainerKind,
        name: &str,
        parent: Option<ContainerId>,
    ) -> Result<ContainerId>;

    /// Link an image into a dataset.
    fn link(&self, session: &ScopedSession, dataset: ContainerId, image: ImageId) -> Result<()>;

    /// Attach one key-value annotation under `namespace` to all `targets`.
    fn post_annotation(
        &self,
        session: &ScopedSession,
        kind: AnnotationTarget,
        targets: &[ImageId],
        payload: &AnnotationPayload,
        namespace: &str,
    ) -> Result<AnnotationId>;

    /// Release the session. Called once, on every exit path.
    fn close(&self, session: &ScopedSession) -> Result<()>;
}

/// Check the parent argument of `create_container` against the kind.
pub fn check_parent(kind: ContainerKind, parent: Option<ContainerId>) -> Result<()> {
    match (kind, parent) {
        (ContainerKind::Project, Some(p)) => Err(crate::Error::InvalidRequest(format!(
            "a project cannot have a parent (got {})",
            p
        ))),
        (ContainerKind::Dataset, None) => Err(crate::Error::InvalidRequest(
            "a dataset must be created under a project".into(),
        )),
        _ => Ok(()),
    }
}
