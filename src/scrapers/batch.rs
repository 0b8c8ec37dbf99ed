//! Batch fan-out of episode resolutions under a two-tier concurrency gate.
//!
//! The global semaphore caps concurrent sessions across all batches; a
//! fresh per-batch semaphore keeps one caller from starving others.
//! Permits are acquired batch-local first, then global, always in that
//! order. Results come back in selection order; a failed episode task
//! contributes no entry instead of aborting the batch.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ScrapeError, ScrapeResult};
use crate::models::{series_name_from_url, BatchOutcome, BatchRequest, DownloadInfo, ResolutionResult};
use crate::scrapers::range;
use crate::scrapers::resolver::ResolveEpisode;

pub struct BatchOrchestrator<R: ResolveEpisode + 'static> {
    resolver: Arc<R>,
    global_gate: Arc<Semaphore>,
    batch_sessions: usize,
}

impl<R: ResolveEpisode + 'static> BatchOrchestrator<R> {
    /// `global_gate` is the process-wide session cap, shared by every
    /// orchestrator in the process; `batch_sessions` bounds one call.
    pub fn new(resolver: Arc<R>, global_gate: Arc<Semaphore>, batch_sessions: usize) -> Self {
        Self {
            resolver,
            global_gate,
            batch_sessions,
        }
    }

    pub async fn resolve(&self, request: BatchRequest) -> ScrapeResult<BatchOutcome> {
        let total = request.episodes.len() as u32;
        let selected: Vec<u32> = match request.range_expr {
            Some(ref expr) => range::parse(expr)?,
            None => (1..=total).collect(),
        };

        let anime = request
            .episodes
            .first()
            .map(|e| series_name_from_url(&e.url))
            .unwrap_or_default();
        let batch_id = Uuid::new_v4();
        info!(%batch_id, anime = %anime, episodes = selected.len(), "starting batch");

        let batch_gate = Arc::new(Semaphore::new(self.batch_sessions));
        let mut guard = AbortOnDrop::default();
        let mut tasks: Vec<(u32, String, Option<EpisodeTask>)> = Vec::new();

        for &ordinal in &selected {
            let Some(episode) = request.episodes.get(ordinal as usize - 1) else {
                warn!(%batch_id, ordinal, "ordinal outside catalog, skipping");
                tasks.push((ordinal, String::new(), None));
                continue;
            };

            let url = episode.url.clone();
            let resolver = Arc::clone(&self.resolver);
            let batch_gate = Arc::clone(&batch_gate);
            let global_gate = Arc::clone(&self.global_gate);

            let handle = tokio::spawn(async move {
                let _batch_permit = batch_gate
                    .acquire_owned()
                    .await
                    .map_err(|_| ScrapeError::Session("batch gate closed".to_string()))?;
                let _global_permit = global_gate
                    .acquire_owned()
                    .await
                    .map_err(|_| ScrapeError::Session("global gate closed".to_string()))?;
                resolver.resolve(&url).await
            });
            guard.push(handle.abort_handle());
            tasks.push((ordinal, episode.title.clone(), Some(handle)));
        }

        let mut items = Vec::new();
        let mut unresolved = 0usize;
        for (ordinal, title, task) in tasks {
            let Some(task) = task else {
                unresolved += 1;
                continue;
            };
            match task.await {
                Ok(Ok(download)) => {
                    if download.is_none() {
                        debug!(%batch_id, ordinal, "episode had no resolvable link");
                    }
                    items.push(ResolutionResult {
                        episode: ordinal,
                        title,
                        download,
                    });
                }
                Ok(Err(e)) => {
                    warn!(%batch_id, ordinal, error = %e, "episode resolution failed");
                    unresolved += 1;
                }
                Err(e) => {
                    warn!(%batch_id, ordinal, error = %e, "episode task did not finish");
                    unresolved += 1;
                }
            }
        }
        guard.defuse();

        let resolved = items.iter().filter(|i| i.download.is_some()).count();
        info!(%batch_id, anime = %anime, resolved, unresolved, "batch finished");
        Ok(BatchOutcome {
            anime,
            items,
            unresolved,
        })
    }
}

type EpisodeTask = JoinHandle<ScrapeResult<Option<DownloadInfo>>>;

/// Cancelling the batch future aborts every in-flight episode task, so
/// their sessions close through owned-session teardown.
#[derive(Default)]
struct AbortOnDrop {
    handles: Vec<AbortHandle>,
}

impl AbortOnDrop {
    fn push(&mut self, handle: AbortHandle) {
        self.handles.push(handle);
    }

    fn defuse(mut self) {
        self.handles.clear();
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}
