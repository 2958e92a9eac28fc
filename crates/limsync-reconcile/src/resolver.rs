//! Get-or-create for projects and datasets.

use tracing::{debug, info, warn};

use limsync_core::{ContainerId, ContainerKind, ImageRepository, Result, ScopedSession};

/// A container id and whether this call created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub id: ContainerId,
    pub created: bool,
}

/// Resolves container names to ids, creating what is missing.
///
/// When several containers share a name the first one listed wins. No
/// guard stops two concurrent runs from both creating the same name.
pub struct ContainerResolver<'a, R: ImageRepository + ?Sized> {
    repo: &'a R,
    session: &'a ScopedSession,
}

impl<'a, R: ImageRepository + ?Sized> ContainerResolver<'a, R> {
    pub fn new(repo: &'a R, session: &'a ScopedSession) -> Self {
        Self { repo, session }
    }

    /// Project named `name` in the session's scope.
    pub fn resolve_project(&self, name: &str) -> Result<Resolved> {
        self.resolve(ContainerKind::Project, name, None)
    }

    /// Dataset named `name` inside `project`.
    pub fn resolve_dataset(&self, project: ContainerId, name: &str) -> Result<Resolved> {
        self.resolve(ContainerKind::Dataset, name, Some(project))
    }

    fn resolve(
        &self,
        kind: ContainerKind,
        name: &str,
        parent: Option<ContainerId>,
    ) -> Result<Resolved> {
        let existing = self.repo.find_containers(self.session, kind, name, parent)?;

        match existing.as_slice() {
            [] => {
                let id = self.repo.create_container(self.session, kind, name, parent)?;
                match parent {
                    Some(project) => info!("Created {} '{}' ({}) in project {}", kind, name, id, project),
                    None => info!("Created {} '{}' ({})", kind, name, id),
                }
                Ok(Resolved { id, created: true })
            }
            [first, rest @ ..] => {
                if rest.is_empty() {
                    debug!("Using existing {} '{}' ({})", kind, name, first);
                } else {
                    warn!(
                        "{} {}s named '{}' exist; using the first ({})",
                        existing.len(),
                        kind,
                        name,
                        first
                    );
                }
                Ok(Resolved {
                    id: *first,
                    created: false,
                })
            }
        }
    }
}
