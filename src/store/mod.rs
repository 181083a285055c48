//! Persistence for task records.
//!
//! Both backends honour the same contract: `list` is newest-first by
//! `created_at`, creation never sets `updated_at`, and every edit or
//! completion stamps `updated_at` with the mutation time. Nothing here guards
//! against editing a completed task; that rule lives in the client.

mod memory;
mod sqlite;

pub use memory::MemoryTaskStore;
pub use sqlite::SqliteTaskStore;

use crate::error::StoreError;
use crate::models::{NewTask, Task, TaskEdit};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Task>, StoreError>;

    async fn create(&self, input: NewTask) -> Result<Task, StoreError>;

    async fn update(&self, id: &str, edit: TaskEdit) -> Result<Task, StoreError>;

    async fn complete(&self, id: &str) -> Result<Task, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// Picks a backend from `DATABASE_URL`; no URL means an in-memory store.
pub async fn connect(database_url: Option<&str>) -> anyhow::Result<Arc<dyn TaskStore>> {
    match database_url {
        None => {
            tracing::warn!("DATABASE_URL not set, tasks will only live in memory");
            Ok(Arc::new(MemoryTaskStore::new()))
        }
        Some(url) if url.starts_with("sqlite:") => {
            let store = SqliteTaskStore::connect(url).await?;
            tracing::info!("using sqlite task store");
            Ok(Arc::new(store))
        }
        Some(url) => {
            let scheme = url.split(':').next().unwrap_or(url).to_string();
            Err(crate::error::ConfigError::UnsupportedDatabase(scheme).into())
        }
    }
}

#[cfg(test)]
pub(crate) mod contract {
    //! Behaviour every backend must share, run against each one.

    use super::*;
    use chrono::{TimeZone, Utc};

    pub fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: None,
            due_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
        }
    }

    pub async fn create_sets_defaults(store: &dyn TaskStore) {
        let task = store.create(new_task("Buy milk")).await.unwrap();
        assert!(!task.id.is_empty());
        assert!(!task.is_done);
        assert_eq!(task.updated_at, None);
        assert_eq!(task.title, "Buy milk");
    }

    pub async fn list_is_newest_first(store: &dyn TaskStore) {
        let first = store.create(new_task("first")).await.unwrap();
        let second = store.create(new_task("second")).await.unwrap();
        let listed = store.list().await.unwrap();
        let ids: Vec<_> = listed.iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    pub async fn update_keeps_identity(store: &dyn TaskStore) {
        let created = store.create(new_task("draft")).await.unwrap();
        let edit = TaskEdit {
            title: "final".to_string(),
            description: Some("notes".to_string()),
            due_at: Utc.with_ymd_and_hms(2024, 2, 1, 18, 0, 0).unwrap(),
        };
        let updated = store.update(&created.id, edit).await.unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.title, "final");
        assert_eq!(updated.description.as_deref(), Some("notes"));
        assert!(updated.updated_at.is_some());
        assert!(!updated.is_done);
    }

    pub async fn complete_is_idempotent(store: &dyn TaskStore) {
        let created = store.create(new_task("run")).await.unwrap();
        let done = store.complete(&created.id).await.unwrap();
        assert!(done.is_done);
        assert!(done.updated_at.is_some());
        let again = store.complete(&created.id).await.unwrap();
        assert!(again.is_done);
    }

    pub async fn delete_removes_record(store: &dyn TaskStore) {
        let created = store.create(new_task("gone")).await.unwrap();
        store.delete(&created.id).await.unwrap();
        let listed = store.list().await.unwrap();
        assert!(listed.iter().all(|t| t.id != created.id));
    }

    pub async fn unknown_id_is_not_found(store: &dyn TaskStore) {
        let edit = TaskEdit {
            title: "x".to_string(),
            description: None,
            due_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
        };
        assert!(matches!(
            store.update("missing", edit).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.complete("missing").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.delete("missing").await,
            Err(StoreError::NotFound(_))
        ));
    }

    pub async fn buy_milk_scenario(store: &dyn TaskStore) {
        let created = store.create(new_task("Buy milk")).await.unwrap();
        assert!(!created.is_done);

        let done = store.complete(&created.id).await.unwrap();
        assert!(done.is_done);

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].is_done);

        store.delete(&created.id).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_without_url_uses_memory() {
        let store = connect(None).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_connect_rejects_unknown_scheme() {
        let err = connect(Some("mongodb://localhost/tasks")).await.err().unwrap();
        assert!(err.to_string().contains("mongodb"));
    }
}
