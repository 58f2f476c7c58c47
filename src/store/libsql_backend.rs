//! libSQL backend: async `FlowStore` implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::info;

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::FlowStore;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    // Owns the database so `conn` stays valid; never read directly.
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[async_trait]
impl FlowStore for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    async fn get_setting(
        &self,
        scope: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT value FROM flow_settings WHERE scope = ?1 AND key = ?2",
                params![scope, key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_setting: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let value_str: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("get_setting: {e}")))?;
                let value: serde_json::Value = serde_json::from_str(&value_str)
                    .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_setting: {e}"))),
        }
    }

    async fn set_setting(
        &self,
        scope: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        let value_str = serde_json::to_string(value)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        conn.execute(
            "INSERT INTO flow_settings (scope, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (scope, key) DO UPDATE SET value = ?3, updated_at = ?4",
            params![scope, key, value_str, now],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("set_setting: {e}")))?;

        Ok(())
    }

    async fn delete_setting(&self, scope: &str, key: &str) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let count = conn
            .execute(
                "DELETE FROM flow_settings WHERE scope = ?1 AND key = ?2",
                params![scope, key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_setting: {e}")))?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    #[tokio::test]
    async fn settings_crud() {
        let db = test_db().await;
        let value = serde_json::json!(["gender", "religion"]);

        db.set_setting("flow1", "step_history", &value).await.unwrap();
        let fetched = db.get_setting("flow1", "step_history").await.unwrap();
        assert_eq!(fetched, Some(value));

        let updated = serde_json::json!(["gender", "religion", "age"]);
        db.set_setting("flow1", "step_history", &updated).await.unwrap();
        let fetched = db.get_setting("flow1", "step_history").await.unwrap();
        assert_eq!(fetched, Some(updated));

        let deleted = db.delete_setting("flow1", "step_history").await.unwrap();
        assert!(deleted);
        let gone = db.get_setting("flow1", "step_history").await.unwrap();
        assert!(gone.is_none());

        let again = db.delete_setting("flow1", "step_history").await.unwrap();
        assert!(!again);
    }

    #[tokio::test]
    async fn settings_scope_isolation() {
        let db = test_db().await;
        db.set_setting("flow1", "key", &serde_json::json!("val1"))
            .await
            .unwrap();
        db.set_setting("flow2", "key", &serde_json::json!("val2"))
            .await
            .unwrap();

        let v1 = db.get_setting("flow1", "key").await.unwrap().unwrap();
        let v2 = db.get_setting("flow2", "key").await.unwrap().unwrap();
        assert_eq!(v1, "val1");
        assert_eq!(v2, "val2");
    }

    #[tokio::test]
    async fn settings_get_nonexistent() {
        let db = test_db().await;
        let result = db.get_setting("nobody", "nothing").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn local_file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("intake.db");

        {
            let db = LibSqlBackend::new_local(&path).await.unwrap();
            db.set_setting("flow", "step_history", &serde_json::json!(["age"]))
                .await
                .unwrap();
        }

        let db = LibSqlBackend::new_local(&path).await.unwrap();
        let value = db.get_setting("flow", "step_history").await.unwrap();
        assert_eq!(value, Some(serde_json::json!(["age"])));
    }
}
