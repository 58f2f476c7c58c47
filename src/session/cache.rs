//! Session entity cache: the local materialized view of the remote profile.
//!
//! Every change to the cached entity bumps a read generation under the same
//! write lock that applies it. Reads that started under an older generation,
//! or while a write is in flight, are discarded when they complete, so a late
//! response can never clobber a newer optimistic or committed value.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::api::SessionApi;
use crate::error::ApiError;

use super::model::{ProfilePatch, SessionEntity};

#[derive(Debug, Default)]
struct CacheSlot {
    entity: SessionEntity,
    /// Bumped on every change to `entity` made by a transaction.
    generation: u64,
    /// Id of the most recently started transaction.
    latest_transaction: u64,
    /// Transactions started but not yet committed or rolled back.
    pending: usize,
}

/// Handle for a read started at a given generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadTicket(u64);

/// Snapshot captured at the start of an optimistic transaction.
///
/// Consumed by exactly one of [`SessionCache::commit`] or
/// [`SessionCache::rollback`]; never persisted.
#[derive(Debug)]
pub struct OptimisticContext {
    previous: SessionEntity,
    transaction: u64,
}

impl OptimisticContext {
    /// The entity as it was immediately before the optimistic write.
    pub fn previous(&self) -> &SessionEntity {
        &self.previous
    }
}

/// Shared, cloneable cache of the session entity.
#[derive(Debug, Clone, Default)]
pub struct SessionCache {
    inner: Arc<RwLock<CacheSlot>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(entity: SessionEntity) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheSlot {
                entity,
                ..Default::default()
            })),
        }
    }

    pub async fn snapshot(&self) -> SessionEntity {
        self.inner.read().await.entity.clone()
    }

    /// Start a read; pass the ticket to [`fill`](Self::fill) when it resolves.
    pub async fn read_ticket(&self) -> ReadTicket {
        ReadTicket(self.inner.read().await.generation)
    }

    /// Store a fetched entity unless the cache changed since `ticket` or a
    /// write is still in flight. Returns whether the value was stored.
    pub async fn fill(&self, ticket: ReadTicket, entity: SessionEntity) -> bool {
        let mut slot = self.inner.write().await;
        if slot.generation != ticket.0 || slot.pending > 0 {
            debug!(
                read_generation = ticket.0,
                current_generation = slot.generation,
                pending = slot.pending,
                "Discarding stale session read"
            );
            return false;
        }
        slot.entity = entity;
        true
    }

    /// Re-read the entity from the store.
    ///
    /// A missing session reads as an empty profile. Returns the cache
    /// contents after the read settles, which may be a newer optimistic
    /// value if the read went stale.
    pub async fn refresh(&self, api: &dyn SessionApi) -> Result<SessionEntity, ApiError> {
        let ticket = self.read_ticket().await;
        let fetched = match api.current().await {
            Ok(entity) => entity,
            Err(ApiError::NotFound) => {
                debug!("No anonymous session yet, starting from an empty profile");
                SessionEntity::default()
            }
            Err(e) => return Err(e),
        };
        self.fill(ticket, fetched).await;
        Ok(self.snapshot().await)
    }

    /// Snapshot, invalidate outstanding reads, and apply `patch` in one step.
    pub async fn begin_optimistic(&self, patch: &ProfilePatch) -> OptimisticContext {
        let mut slot = self.inner.write().await;
        slot.generation += 1;
        slot.latest_transaction += 1;
        slot.pending += 1;
        let previous = slot.entity.clone();
        slot.entity.apply(patch);
        OptimisticContext {
            previous,
            transaction: slot.latest_transaction,
        }
    }

    /// Replace the optimistic value with the store's authoritative one.
    ///
    /// Skipped when a newer transaction has started since `ctx`.
    pub async fn commit(&self, ctx: OptimisticContext, authoritative: SessionEntity) -> bool {
        let mut slot = self.inner.write().await;
        slot.pending = slot.pending.saturating_sub(1);
        if slot.latest_transaction != ctx.transaction {
            debug!(
                transaction = ctx.transaction,
                latest_transaction = slot.latest_transaction,
                "Transaction superseded, skipping commit"
            );
            return false;
        }
        slot.generation += 1;
        slot.entity = authoritative;
        true
    }

    /// Restore the snapshot taken at transaction start.
    ///
    /// Skipped when a newer transaction has started since `ctx`.
    pub async fn rollback(&self, ctx: OptimisticContext) -> bool {
        let mut slot = self.inner.write().await;
        slot.pending = slot.pending.saturating_sub(1);
        if slot.latest_transaction != ctx.transaction {
            debug!(
                transaction = ctx.transaction,
                latest_transaction = slot.latest_transaction,
                "Transaction superseded, skipping rollback"
            );
            return false;
        }
        slot.generation += 1;
        slot.entity = ctx.previous;
        true
    }
}
