use super::AppState;
use crate::error::{ApiError, ApiResult};
use crate::models::{NewTask, ScheduleRequest, Task, TaskEdit};
use crate::timestamp::parse_due;
use axum::{body::Bytes, extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};

// Body of POST and PUT
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct TaskBody {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_at: Option<String>,
}

// Body of PATCH and DELETE
#[derive(Deserialize, Debug, Default)]
pub struct IdBody {
    pub id: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct PlanBody {
    pub text: Option<String>,
}

// Bodies are read as JSON whatever the Content-Type; an empty body is `{}`
fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> ApiResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::Validation(format!("Invalid JSON body: {}", e)))
}

fn require_id(id: Option<String>) -> ApiResult<String> {
    match id {
        Some(id) if !id.trim().is_empty() => Ok(id),
        _ => Err(ApiError::Validation("Missing task ID".to_string())),
    }
}

fn require_due(due_at: Option<&str>) -> ApiResult<DateTime<Utc>> {
    match due_at {
        None => Err(ApiError::Validation("Missing dueAt".to_string())),
        Some(raw) => parse_due(raw)
            .ok_or_else(|| ApiError::Validation(format!("Invalid dueAt: {}", raw))),
    }
}

fn clean_description(description: Option<String>) -> Option<String> {
    description.filter(|d| !d.trim().is_empty())
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn list_tasks(State(state): State<AppState>) -> ApiResult<Json<Vec<Task>>> {
    let tasks = state.store.list().await?;
    Ok(Json(tasks))
}

pub async fn create_task(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<Task>> {
    let body: TaskBody = parse_body(&body)?;
    let input = NewTask {
        title: body.title.unwrap_or_default(),
        description: clean_description(body.description),
        due_at: require_due(body.due_at.as_deref())?,
    };

    let task = state.store.create(input).await?;
    tracing::info!(id = %task.id, "task created");
    Ok(Json(task))
}

pub async fn update_task(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<Task>> {
    let body: TaskBody = parse_body(&body)?;
    let id = require_id(body.id)?;
    let edit = TaskEdit {
        title: body.title.unwrap_or_default(),
        description: clean_description(body.description),
        due_at: require_due(body.due_at.as_deref())?,
    };

    let task = state.store.update(&id, edit).await?;
    tracing::info!(%id, "task updated");
    Ok(Json(task))
}

pub async fn complete_task(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<Task>> {
    let body: IdBody = parse_body(&body)?;
    let id = require_id(body.id)?;
    let task = state.store.complete(&id).await?;
    tracing::info!(%id, "task completed");
    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body: IdBody = parse_body(&body)?;
    let id = require_id(body.id)?;
    state.store.delete(&id).await?;
    tracing::info!(%id, "task deleted");
    Ok(Json(json!({ "message": "Task deleted" })))
}

pub async fn schedule(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let request: ScheduleRequest = parse_body(&body)?;
    let schedule = state.ai.schedule(&request).await?;
    Ok(Json(json!({ "schedule": schedule })))
}

pub async fn suggest(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let suggestions = state.ai.suggest().await?;
    Ok(Json(json!({ "suggestions": suggestions })))
}

pub async fn plan(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body: PlanBody = parse_body(&body)?;
    let plan = state.ai.plan(body.text.as_deref().unwrap_or_default()).await?;
    Ok(Json(json!({ "plan": plan })))
}
