//! Reconciliation outcomes and reports.

use std::fmt;

use serde::Serialize;

use limsync_core::{AnnotationId, ContainerId, ImageId};

/// What happened to one metadata row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowOutcome {
    /// Matching images were linked into the dataset and annotated.
    Moved {
        project: ContainerId,
        dataset: ContainerId,
        images: Vec<ImageId>,
        annotation: AnnotationId,
        project_created: bool,
        dataset_created: bool,
    },
    /// No orphan image carries this filename. Nothing was changed.
    NotFound,
    /// A placement cell was blank. Nothing was looked up or changed.
    Incomplete { missing: Vec<&'static str> },
}

/// Per-row notice handed to the caller as soon as the row is done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowReport {
    pub line: u64,
    pub filename: String,
    #[serde(flatten)]
    pub outcome: RowOutcome,
}

/// How far a row's mutations got before a repository call failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum RowProgress {
    /// Nothing was written for this row.
    Untouched,
    /// The project exists (possibly just created); no dataset yet.
    ProjectResolved { project: ContainerId },
    /// Project and dataset exist; no image linked yet.
    ContainersResolved {
        project: ContainerId,
        dataset: ContainerId,
    },
    /// Some images were linked before a link call failed.
    PartiallyLinked {
        dataset: ContainerId,
        linked: Vec<ImageId>,
        pending: Vec<ImageId>,
    },
    /// Every image is linked; the annotation was not posted.
    LinkedButNotAnnotated {
        dataset: ContainerId,
        images: Vec<ImageId>,
    },
}

impl RowProgress {
    /// Whether the repository may hold writes from this row.
    pub fn mutated(&self) -> bool {
        !matches!(self, Self::Untouched)
    }
}

impl fmt::Display for RowProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Untouched => write!(f, "nothing applied"),
            Self::ProjectResolved { project } => {
                write!(f, "project {} resolved, dataset not resolved", project)
            }
            Self::ContainersResolved { project, dataset } => write!(
                f,
                "project {} and dataset {} resolved, no images linked",
                project, dataset
            ),
            Self::PartiallyLinked {
                dataset,
                linked,
                pending,
            } => write!(
                f,
                "linked {:?} to dataset {}, not linked {:?}, not annotated",
                ids(linked),
                dataset,
                ids(pending)
            ),
            Self::LinkedButNotAnnotated { dataset, images } => write!(
                f,
                "linked {:?} to dataset {}, not annotated",
                ids(images),
                dataset
            ),
        }
    }
}

fn ids(images: &[ImageId]) -> Vec<i64> {
    images.iter().map(|i| i.0).collect()
}

/// Totals for one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub rows_total: usize,
    pub moved: usize,
    pub not_found: usize,
    pub incomplete: usize,
    pub images_linked: usize,
    pub annotations: usize,
    pub projects_created: usize,
    pub datasets_created: usize,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn record(&mut self, outcome: &RowOutcome) {
        match outcome {
            RowOutcome::Moved {
                images,
                project_created,
                dataset_created,
                ..
            } => {
                self.moved += 1;
                self.images_linked += images.len();
                self.annotations += 1;
                self.projects_created += usize::from(*project_created);
                self.datasets_created += usize::from(*dataset_created);
            }
            RowOutcome::NotFound => self.not_found += 1,
            RowOutcome::Incomplete { .. } => self.incomplete += 1,
        }
    }
}
