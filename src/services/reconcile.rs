use color_eyre::eyre::{Result, WrapErr};

use crate::model::{Diff, TrackId, TrackSet};
use crate::ports::tidal::{ApiPlaylist, CollectionSource, MutationClient};

/// Identity and limits of the managed playlist being reconciled.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub playlist_name: String,
    pub playlist_description: String,
    /// Maximum ids per add call (Tidal caps mutation batches at 100).
    pub batch_limit: usize,
}

/// What a reconciliation run did.
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub created_playlist: bool,
    pub added: usize,
    pub removed: usize,
    pub failed_adds: usize,
    pub failed_removes: usize,
}

impl ReconcileReport {
    pub fn changed(&self) -> bool {
        self.added + self.removed > 0
    }

    pub fn failed(&self) -> usize {
        self.failed_adds + self.failed_removes
    }
}

/// Brings the managed playlist into agreement with a desired membership set.
///
/// Mutations are best-effort: a failed add batch or remove call is recorded in
/// the report and the rest of the run continues. Re-running the tool retries
/// failed items naturally, because the diff is recomputed from scratch.
pub struct ReconcileService<'a, S, M>
where
    S: CollectionSource,
    M: MutationClient,
{
    source: &'a S,
    mutator: &'a M,
    options: ReconcileOptions,
}

impl<'a, S, M> ReconcileService<'a, S, M>
where
    S: CollectionSource,
    M: MutationClient,
{
    pub fn new(source: &'a S, mutator: &'a M, options: ReconcileOptions) -> Self {
        Self {
            source,
            mutator,
            options,
        }
    }

    /// Reconcile the managed playlist against `desired`.
    ///
    /// Creates the playlist when `managed` is `None` (current contents are then
    /// empty by definition). Removals run first, one id per call; additions
    /// follow in order-preserving batches of at most `batch_limit`.
    pub async fn reconcile(
        &self,
        managed: Option<ApiPlaylist>,
        desired: &TrackSet,
    ) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();

        let (playlist, current) = match managed {
            Some(playlist) => {
                let tracks = self
                    .source
                    .playlist_tracks(&playlist)
                    .await
                    .wrap_err_with(|| {
                        format!("Failed to fetch current tracks of '{}'", playlist.name)
                    })?;
                let current: TrackSet = tracks.into_iter().map(|track| track.id).collect();
                tracing::info!(
                    name = %playlist.name,
                    current = current.len(),
                    "updating existing playlist"
                );
                (playlist, current)
            }
            None => {
                tracing::info!(
                    name = %self.options.playlist_name,
                    tracks = desired.len(),
                    "creating managed playlist"
                );
                let playlist = self
                    .mutator
                    .create_playlist(
                        &self.options.playlist_name,
                        &self.options.playlist_description,
                    )
                    .await
                    .wrap_err("Failed to create managed playlist")?;
                report.created_playlist = true;
                (playlist, TrackSet::new())
            }
        };

        let diff = Diff::between(&current, desired);
        if diff.is_empty() {
            tracing::info!(name = %playlist.name, "no tracks to add or remove");
            return Ok(report);
        }
        tracing::info!(
            to_add = diff.to_add.len(),
            to_remove = diff.to_remove.len(),
            "computed diff"
        );

        // Removals first. The API only removes one track per call.
        for id in diff.to_remove.iter() {
            match self.mutator.remove_track(&playlist, id).await {
                Ok(()) => {
                    report.removed += 1;
                    tracing::debug!(%id, "removed track");
                }
                Err(error) => {
                    report.failed_removes += 1;
                    tracing::error!(%id, error = %error, "failed to remove track");
                }
            }
        }

        // chunks(0) would panic; a misconfigured limit degrades to one-by-one.
        let batch_limit = self.options.batch_limit.max(1);
        let to_add: Vec<TrackId> = diff.to_add.iter().collect();
        for batch in to_add.chunks(batch_limit) {
            match self.mutator.add_tracks(&playlist, batch).await {
                Ok(()) => {
                    report.added += batch.len();
                    tracing::debug!(count = batch.len(), "added track batch");
                }
                Err(error) => {
                    report.failed_adds += batch.len();
                    tracing::error!(count = batch.len(), error = %error, "failed to add track batch");
                }
            }
        }

        tracing::info!(
            name = %playlist.name,
            added = report.added,
            removed = report.removed,
            failed = report.failed(),
            "reconcile complete"
        );
        Ok(report)
    }
}
