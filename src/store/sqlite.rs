use super::TaskStore;
use crate::error::StoreError;
use crate::models::{NewTask, Task, TaskEdit};
use crate::timestamp::{from_storage, now, to_storage};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    due_at TEXT NOT NULL,
    is_done INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT
)";

const SELECT_COLUMNS: &str =
    "SELECT id, title, description, due_at, is_done, created_at, updated_at FROM tasks";

pub struct SqliteTaskStore {
    pool: SqlitePool,
}

impl SqliteTaskStore {
    /// Opens (creating if needed) the database at `url` and ensures the schema.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // Every pooled connection to :memory: would see its own empty database
        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new().connect_with(options).await?
        };

        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        Ok(Self { pool })
    }

    async fn fetch(&self, id: &str) -> Result<Task, StoreError> {
        let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        row_to_task(&row)
    }
}

fn row_to_task(row: &SqliteRow) -> Result<Task, StoreError> {
    let timestamp = |column: &str, raw: &str| {
        from_storage(raw).ok_or_else(|| {
            StoreError::Unavailable(format!("invalid {} value {:?}", column, raw))
        })
    };

    let due_at: String = row.try_get("due_at")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: Option<String> = row.try_get("updated_at")?;
    let is_done: i64 = row.try_get("is_done")?;

    Ok(Task {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        due_at: timestamp("due_at", &due_at)?,
        is_done: is_done != 0,
        created_at: timestamp("created_at", &created_at)?,
        updated_at: match updated_at {
            Some(raw) => Some(timestamp("updated_at", &raw)?),
            None => None,
        },
    })
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        let sql = format!("{} ORDER BY created_at DESC, rowid DESC", SELECT_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_task).collect()
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

        sqlx::query(
            "INSERT INTO tasks (id, title, description, due_at, is_done, created_at, updated_at)
             VALUES (?, ?, ?, ?, 0, ?, NULL)",
        )
        .bind(&task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(to_storage(&task.due_at))
        .bind(to_storage(&task.created_at))
        .execute(&self.pool)
        .await?;

        Ok(task)
    }

    async fn update(&self, id: &str, edit: TaskEdit) -> Result<Task, StoreError> {
        let result = sqlx::query(
            "UPDATE tasks SET title = ?, description = ?, due_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&edit.title)
        .bind(&edit.description)
        .bind(to_storage(&edit.due_at))
        .bind(to_storage(&now()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.fetch(id).await
    }

    async fn complete(&self, id: &str) -> Result<Task, StoreError> {
        let result = sqlx::query("UPDATE tasks SET is_done = 1, updated_at = ? WHERE id = ?")
            .bind(to_storage(&now()))
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.fetch(id).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
