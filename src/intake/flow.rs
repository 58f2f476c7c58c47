//! Intake flow façade: the cache, history and synchronizer of one flow
//! instance, plus the step views the rendering layer mounts.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::api::SessionApi;
use crate::config::RouteConfig;
use crate::error::FlowError;
use crate::session::cache::SessionCache;
use crate::session::model::{ProfilePatch, SessionEntity};
use crate::store::FlowStore;

use super::history::{HistoryStack, HistoryTracker};
use super::navigation::{Destination, compute_back, is_back_allowed};
use super::registry::{StepDefinition, StepId, StepInput, lookup};
use super::sync::{AnswerSynchronizer, SubmitOutcome};

/// Everything a step's render unit needs.
#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub step: StepId,
    pub title: &'static str,
    pub input: StepInput,
    /// Previously saved answer for this step's fields, for pre-filling.
    pub current: ProfilePatch,
    pub back_allowed: bool,
    pub back: Destination,
}

/// Snapshot of flow state for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct FlowStatus {
    pub flow_key: String,
    pub history: HistoryStack,
    pub entity: SessionEntity,
}

/// Explicit state for one intake flow. No globals: everything a step
/// needs is reached through this value.
pub struct IntakeFlow {
    api: Arc<dyn SessionApi>,
    cache: SessionCache,
    history: Arc<HistoryTracker>,
    synchronizer: AnswerSynchronizer,
    routes: RouteConfig,
}

impl IntakeFlow {
    /// Load persisted history for `flow_key` and prime the cache from the
    /// session store.
    pub async fn open(
        flow_key: impl Into<String>,
        api: Arc<dyn SessionApi>,
        store: Arc<dyn FlowStore>,
        routes: RouteConfig,
    ) -> Result<Self, FlowError> {
        let history = Arc::new(HistoryTracker::load(flow_key, store).await?);
        let cache = SessionCache::new();
        cache.refresh(api.as_ref()).await?;

        let synchronizer =
            AnswerSynchronizer::new(Arc::clone(&api), cache.clone(), Arc::clone(&history));

        info!(flow_key = %history.flow_key(), "Intake flow opened");
        Ok(Self {
            api,
            cache,
            history,
            synchronizer,
            routes,
        })
    }

    pub fn routes(&self) -> &RouteConfig {
        &self.routes
    }

    /// User landed on the entry point: forget the previous traversal.
    pub async fn enter_landing(&self) -> Result<(), FlowError> {
        self.history.reset().await?;
        Ok(())
    }

    /// Where a new traversal begins.
    pub fn start(&self) -> Destination {
        Destination::Step(StepId::first())
    }

    /// Build the view for a step route name.
    pub async fn view(&self, step_name: &str) -> Result<StepView, FlowError> {
        let definition = resolve(step_name)?;
        let entity = self.cache.snapshot().await;
        let history = self.history.snapshot().await;

        Ok(StepView {
            step: definition.id,
            title: definition.title,
            input: definition.input.into(),
            current: entity.project(definition.fields()),
            back_allowed: is_back_allowed(definition.id, &history),
            back: compute_back(definition.id, &history),
        })
    }

    /// Save an answer; returns where to navigate once it has settled.
    ///
    /// The answer must be non-empty and only carry the step's own fields.
    pub async fn submit(
        &self,
        step_name: &str,
        patch: ProfilePatch,
    ) -> Result<SubmitOutcome, FlowError> {
        let definition = resolve(step_name)?;
        definition.check_answer(&patch)?;
        Ok(self.synchronizer.submit(definition.id, patch).await?)
    }

    /// Destination of "back" from a step. Does not change any state.
    pub async fn back(&self, step_name: &str) -> Result<Destination, FlowError> {
        let definition = resolve(step_name)?;
        let history = self.history.snapshot().await;
        Ok(compute_back(definition.id, &history))
    }

    /// Re-read the entity from the session store.
    pub async fn refresh(&self) -> Result<SessionEntity, FlowError> {
        Ok(self.cache.refresh(self.api.as_ref()).await?)
    }

    pub async fn history(&self) -> HistoryStack {
        self.history.snapshot().await
    }

    pub async fn entity(&self) -> SessionEntity {
        self.cache.snapshot().await
    }

    pub async fn status(&self) -> FlowStatus {
        FlowStatus {
            flow_key: self.history.flow_key().to_string(),
            history: self.history().await,
            entity: self.entity().await,
        }
    }
}

fn resolve(step_name: &str) -> Result<&'static StepDefinition, FlowError> {
    lookup(step_name).ok_or_else(|| FlowError::UnknownStep(step_name.to_string()))
}
