use super::TaskStore;
use crate::error::StoreError;
use crate::models::{NewTask, Task, TaskEdit};
use crate::timestamp::now;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local store, kept in insertion order.
#[derive(Default)]
pub struct MemoryTaskStore {
    tasks: RwLock<Vec<Task>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self.tasks.read().await.iter().rev().cloned().collect();
        // Stable sort keeps later inserts first when timestamps tie
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn create(&self, input: NewTask) -> Result<Task, StoreError> {
        let task = Task {
            id: Uuid::new_v4().to_string(),
            title: input.title,
            description: input.description,
            due_at: input.due_at,
            is_done: false,
            created_at: now(),
            updated_at: None,
        };
        self.tasks.write().await.push(task.clone());
        Ok(task)
    }

    async fn update(&self, id: &str, edit: TaskEdit) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        task.title = edit.title;
        task.description = edit.description;
        task.due_at = edit.due_at;
        task.updated_at = Some(now());
        Ok(task.clone())
    }

    async fn complete(&self, id: &str) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        task.is_done = true;
        task.updated_at = Some(now());
        Ok(task.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract;

    #[tokio::test]
    async fn test_create_sets_defaults() {
        contract::create_sets_defaults(&MemoryTaskStore::new()).await;
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        contract::list_is_newest_first(&MemoryTaskStore::new()).await;
    }

    #[tokio::test]
    async fn test_update_keeps_identity() {
        contract::update_keeps_identity(&MemoryTaskStore::new()).await;
    }

    #[tokio::test]
    async fn test_complete_is_idempotent() {
        contract::complete_is_idempotent(&MemoryTaskStore::new()).await;
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        contract::delete_removes_record(&MemoryTaskStore::new()).await;
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        contract::unknown_id_is_not_found(&MemoryTaskStore::new()).await;
    }

    #[tokio::test]
    async fn test_buy_milk_scenario() {
        contract::buy_milk_scenario(&MemoryTaskStore::new()).await;
    }

    #[tokio::test]
    async fn test_empty_store_lists_nothing() {
        assert!(MemoryTaskStore::new().list().await.unwrap().is_empty());
    }
}
