//! `FlowStore` trait: async key/value persistence scoped per flow instance.

use async_trait::async_trait;

use crate::error::DatabaseError;

/// Backend-agnostic store for flow state.
///
/// Values are JSON documents addressed by `(scope, key)`. A scope is one
/// flow instance, so nothing written under one scope is visible to another.
#[async_trait]
pub trait FlowStore: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    /// Read a value, `None` if never written.
    async fn get_setting(
        &self,
        scope: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError>;

    /// Insert or replace a value.
    async fn set_setting(
        &self,
        scope: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError>;

    /// Delete a value. Returns whether anything was removed.
    async fn delete_setting(&self, scope: &str, key: &str) -> Result<bool, DatabaseError>;
}
