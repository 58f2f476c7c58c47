//! History stack: the steps a user has actually completed, used to make
//! "back" well defined.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::DatabaseError;
use crate::store::FlowStore;

use super::registry::StepId;

/// Settings key the stack is persisted under.
pub const HISTORY_KEY: &str = "step_history";

/// Result of asking for the step before `current`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "step", rename_all = "snake_case")]
pub enum Previous {
    /// Go back to the flow's landing page.
    EntryPoint,
    Step(StepId),
}

/// Ordered, duplicate-free list of completed steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryStack {
    steps: Vec<StepId>,
}

impl HistoryStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a stack from a list, keeping the first occurrence of each step.
    pub fn from_steps(steps: impl IntoIterator<Item = StepId>) -> Self {
        let mut stack = Self::new();
        for step in steps {
            stack.append(step);
        }
        stack
    }

    /// Append `step` unless it is already present anywhere in the stack.
    /// Returns whether the stack changed.
    pub fn append(&mut self, step: StepId) -> bool {
        if self.contains(step) {
            return false;
        }
        self.steps.push(step);
        true
    }

    pub fn reset(&mut self) {
        self.steps.clear();
    }

    pub fn contains(&self, step: StepId) -> bool {
        self.steps.contains(&step)
    }

    pub fn position(&self, step: StepId) -> Option<usize> {
        self.steps.iter().position(|s| *s == step)
    }

    /// Destination of "back" from `current`. Total for every input:
    ///
    /// - empty stack: entry point;
    /// - `current` at index 0: entry point;
    /// - `current` at index i > 0: the step at i - 1;
    /// - `current` never pushed: the most recently completed step.
    pub fn previous_of(&self, current: StepId) -> Previous {
        let Some(last) = self.steps.last() else {
            return Previous::EntryPoint;
        };
        match self.position(current) {
            Some(0) => Previous::EntryPoint,
            Some(index) => Previous::Step(self.steps[index - 1]),
            None => Previous::Step(*last),
        }
    }

    pub fn steps(&self) -> &[StepId] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// A [`HistoryStack`] persisted in a [`FlowStore`] under one flow scope.
pub struct HistoryTracker {
    flow_key: String,
    store: Arc<dyn FlowStore>,
    stack: RwLock<HistoryStack>,
}

impl HistoryTracker {
    /// Load the persisted stack for `flow_key`.
    ///
    /// A value that does not parse as a list of steps is discarded and the
    /// stack starts empty.
    pub async fn load(
        flow_key: impl Into<String>,
        store: Arc<dyn FlowStore>,
    ) -> Result<Self, DatabaseError> {
        let flow_key = flow_key.into();
        let stack = match store.get_setting(&flow_key, HISTORY_KEY).await? {
            Some(value) => match serde_json::from_value::<Vec<StepId>>(value) {
                Ok(steps) => HistoryStack::from_steps(steps),
                Err(e) => {
                    warn!(flow_key = %flow_key, error = %e, "Discarding unreadable step history");
                    HistoryStack::new()
                }
            },
            None => HistoryStack::new(),
        };
        debug!(flow_key = %flow_key, steps = stack.len(), "Step history loaded");

        Ok(Self {
            flow_key,
            store,
            stack: RwLock::new(stack),
        })
    }

    pub fn flow_key(&self) -> &str {
        &self.flow_key
    }

    pub async fn snapshot(&self) -> HistoryStack {
        self.stack.read().await.clone()
    }

    /// Append and persist. Persistence failures are logged; the in-memory
    /// stack is still updated.
    pub async fn append(&self, step: StepId) -> bool {
        let mut stack = self.stack.write().await;
        if !stack.append(step) {
            return false;
        }
        debug!(flow_key = %self.flow_key, step = %step, "Step completed");
        self.persist(&stack).await;
        true
    }

    /// Empty the stack and remove it from the store.
    pub async fn reset(&self) -> Result<(), DatabaseError> {
        let mut stack = self.stack.write().await;
        stack.reset();
        self.store.delete_setting(&self.flow_key, HISTORY_KEY).await?;
        debug!(flow_key = %self.flow_key, "Step history reset");
        Ok(())
    }

    async fn persist(&self, stack: &HistoryStack) {
        let value = match serde_json::to_value(stack) {
            Ok(v) => v,
            Err(e) => {
                warn!("Failed to serialize step history: {}", e);
                return;
            }
        };
        if let Err(e) = self
            .store
            .set_setting(&self.flow_key, HISTORY_KEY, &value)
            .await
        {
            warn!("Failed to persist step history: {}", e);
        }
    }
}
