//! Row-by-row reconciliation.

use tracing::{debug, info, warn};

use crate::error::ReconcileError;
use crate::resolver::ContainerResolver;
use crate::types::*;
use limsync_core::{AnnotationTarget, ImageId, ImageRepository, ScopedSession, METADATA_NAMESPACE};
use limsync_metadata::{MetadataRow, MetadataTable};

/// Files orphan images according to metadata rows.
pub struct Reconciler<'a, R: ImageRepository + ?Sized> {
    repo: &'a R,
    session: &'a ScopedSession,
}

impl<'a, R: ImageRepository + ?Sized> Reconciler<'a, R> {
    pub fn new(repo: &'a R, session: &'a ScopedSession) -> Self {
        Self { repo, session }
    }

    /// Validate the table, snapshot the orphan pool, then process every
    /// row in file order. `on_row` sees each row's report as soon as the
    /// row is done.
    ///
    /// Stops at the first repository failure; the error carries how far
    /// that row got.
    pub fn run<F>(&self, table: MetadataTable, mut on_row: F) -> Result<RunReport, ReconcileError>
    where
        F: FnMut(&RowReport),
    {
        let start = std::time::Instant::now();
        let rows = table.into_rows()?;

        let pool = self
            .repo
            .orphan_images(self.session)
            .map_err(ReconcileError::Enumerate)?;
        info!(
            "Reconciling {} metadata rows against {} orphan images",
            rows.len(),
            pool.len()
        );

        let mut report = RunReport {
            rows_total: rows.len(),
            ..Default::default()
        };
        for row in &rows {
            let outcome = self.process_row(row, &pool)?;
            report.record(&outcome);
            on_row(&RowReport {
                line: row.line,
                filename: row.filename.clone(),
                outcome,
            });
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Reconciliation complete: moved={}, not_found={}, incomplete={}, images={}, duration={}ms",
            report.moved,
            report.not_found,
            report.incomplete,
            report.images_linked,
            report.duration_ms
        );
        Ok(report)
    }

    /// Locate, file and annotate the images for one row.
    pub fn process_row(
        &self,
        row: &MetadataRow,
        pool: &[ImageId],
    ) -> Result<RowOutcome, ReconcileError> {
        let missing = row.missing_fields();
        if !missing.is_empty() {
            warn!("Line {}: blank {} cell(s), skipped", row.line, missing.join(", "));
            return Ok(RowOutcome::Incomplete { missing });
        }

        let fail = |progress: RowProgress, source: limsync_core::Error| ReconcileError::Row {
            line: row.line,
            filename: row.filename.clone(),
            progress,
            source,
        };

        let images = self
            .match_filename(&row.filename, pool)
            .map_err(|e| fail(RowProgress::Untouched, e))?;
        if images.is_empty() {
            debug!("Line {}: no orphan named {}", row.line, row.filename);
            return Ok(RowOutcome::NotFound);
        }

        let resolver = ContainerResolver::new(self.repo, self.session);
        let project = resolver
            .resolve_project(&row.project)
            .map_err(|e| fail(RowProgress::Untouched, e))?;
        let dataset = resolver
            .resolve_dataset(project.id, &row.dataset)
            .map_err(|e| fail(RowProgress::ProjectResolved { project: project.id }, e))?;

        for (i, image) in images.iter().enumerate() {
            if let Err(e) = self.repo.link(self.session, dataset.id, *image) {
                let progress = if i == 0 {
                    RowProgress::ContainersResolved {
                        project: project.id,
                        dataset: dataset.id,
                    }
                } else {
                    RowProgress::PartiallyLinked {
                        dataset: dataset.id,
                        linked: images[..i].to_vec(),
                        pending: images[i..].to_vec(),
                    }
                };
                return Err(fail(progress, e));
            }
        }
        info!("Moved images {:?} to dataset {}", images, dataset.id);

        let annotation = self
            .repo
            .post_annotation(
                self.session,
                AnnotationTarget::Image,
                &images,
                &row.extra,
                METADATA_NAMESPACE,
            )
            .map_err(|e| {
                fail(
                    RowProgress::LinkedButNotAnnotated {
                        dataset: dataset.id,
                        images: images.clone(),
                    },
                    e,
                )
            })?;
        info!("Created annotation {} on images {:?}", annotation, images);

        Ok(RowOutcome::Moved {
            project: project.id,
            dataset: dataset.id,
            images,
            annotation,
            project_created: project.created,
            dataset_created: dataset.created,
        })
    }

    /// Pool members imported under exactly `filename`, in pool order.
    fn match_filename(
        &self,
        filename: &str,
        pool: &[ImageId],
    ) -> limsync_core::Result<Vec<ImageId>> {
        let mut matches = Vec::new();
        for image in pool {
            if self
                .repo
                .has_original_filename(self.session, *image, filename)?
            {
                matches.push(*image);
            }
        }
        Ok(matches)
    }
}

/// Run a reconciliation and close the session afterwards, whatever the
/// result. A failure to close is logged and does not mask the run's result.
pub fn reconcile<R, F>(
    repo: &R,
    session: &ScopedSession,
    table: MetadataTable,
    on_row: F,
) -> Result<RunReport, ReconcileError>
where
    R: ImageRepository + ?Sized,
    F: FnMut(&RowReport),
{
    let result = Reconciler::new(repo, session).run(table, on_row);
    if let Err(e) = repo.close(session) {
        warn!("Failed to close session: {}", e);
    }
    result
}
