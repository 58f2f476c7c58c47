//! Answer synchronizer: saves one step's answer with an optimistic update
//! and decides where to go once the save has settled.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::SessionApi;
use crate::error::SyncError;
use crate::session::cache::SessionCache;
use crate::session::model::ProfilePatch;

use super::history::HistoryTracker;
use super::navigation::{Destination, compute_next};
use super::registry::StepId;

/// Settled result of a successful submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitOutcome {
    pub step: StepId,
    pub destination: Destination,
    /// Whether a remote write was issued. `false` on the unchanged path.
    pub written: bool,
}

/// Runs one transaction per submission:
///
/// 1. unchanged answer: record the step and move on, no network write;
/// 2. changed answer: snapshot, apply locally, `PATCH`, then commit the
///    store's response or roll back to the snapshot.
///
/// A destination is only returned once the transaction has settled, and
/// history is only touched on success.
pub struct AnswerSynchronizer {
    api: Arc<dyn SessionApi>,
    cache: SessionCache,
    history: Arc<HistoryTracker>,
}

impl AnswerSynchronizer {
    pub fn new(api: Arc<dyn SessionApi>, cache: SessionCache, history: Arc<HistoryTracker>) -> Self {
        Self {
            api,
            cache,
            history,
        }
    }

    pub async fn submit(&self, step: StepId, patch: ProfilePatch) -> Result<SubmitOutcome, SyncError> {
        let current = self.cache.snapshot().await;
        let changed = patch.changed_fields(&current);

        if changed.is_empty() {
            debug!(step = %step, "Answer unchanged, skipping write");
            self.history.append(step).await;
            return Ok(SubmitOutcome {
                step,
                destination: compute_next(step, None, &current),
                written: false,
            });
        }

        info!(step = %step, ?changed, "Saving answer");
        let ctx = self.cache.begin_optimistic(&patch).await;

        match self.api.patch(&patch).await {
            Ok(updated) => {
                self.cache.commit(ctx, updated).await;
                self.history.append(step).await;
                let cached = self.cache.snapshot().await;
                Ok(SubmitOutcome {
                    step,
                    destination: compute_next(step, Some(&patch), &cached),
                    written: true,
                })
            }
            Err(source) => {
                warn!(step = %step, error = %source, "Saving answer failed, rolling back");
                self.cache.rollback(ctx).await;
                Err(SyncError::Remote { step, source })
            }
        }
    }
}
