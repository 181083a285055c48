use crate::error::ClientError;
use crate::models::{NewTask, ScheduleRequest, Task, TaskEdit};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

/// What the terminal client needs from the backend.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    async fn fetch_tasks(&self) -> Result<Vec<Task>, ClientError>;
    async fn create_task(&self, task: &NewTask) -> Result<Task, ClientError>;
    async fn update_task(&self, id: &str, edit: &TaskEdit) -> Result<Task, ClientError>;
    async fn complete_task(&self, id: &str) -> Result<Task, ClientError>;
    async fn delete_task(&self, id: &str) -> Result<(), ClientError>;
    async fn fetch_schedule(&self, request: &ScheduleRequest) -> Result<String, ClientError>;
    async fn fetch_suggestions(&self) -> Result<String, ClientError>;
    async fn fetch_plan(&self, text: &str) -> Result<String, ClientError>;
}

pub struct ApiClient {
    client: Client,
    instance_url: String,
}

impl ApiClient {
    pub fn new(instance_url: &str) -> ApiClient {
        ApiClient {
            client: Client::new(),
            instance_url: instance_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.instance_url, path)
    }
}

// Turns a non-2xx response into its `{error}` message
async fn read_json<T: DeserializeOwned>(res: Response) -> Result<T, ClientError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res.json::<T>().await?);
    }

    let error_text = res.text().await?;
    let message = serde_json::from_str::<Value>(&error_text)
        .ok()
        .and_then(|v| v["error"].as_str().map(str::to_string))
        .unwrap_or(error_text);

    Err(ClientError::Server {
        status: status.as_u16(),
        message,
    })
}

fn field(mut body: Value, key: &str) -> String {
    match body.get_mut(key).map(Value::take) {
        Some(Value::String(s)) => s,
        _ => String::new(),
    }
}

#[async_trait]
impl TaskBackend for ApiClient {
    async fn fetch_tasks(&self) -> Result<Vec<Task>, ClientError> {
        let res = self.client.get(self.url("/api/tasks")).send().await?;
        read_json(res).await
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task, ClientError> {
        let res = self
            .client
            .post(self.url("/api/tasks"))
            .json(task)
            .send()
            .await?;
        read_json(res).await
    }

    async fn update_task(&self, id: &str, edit: &TaskEdit) -> Result<Task, ClientError> {
        let mut task_data = json!(edit);
        task_data["id"] = json!(id);

        let res = self
            .client
            .put(self.url("/api/tasks"))
            .json(&task_data)
            .send()
            .await?;
        read_json(res).await
    }

    async fn complete_task(&self, id: &str) -> Result<Task, ClientError> {
        let res = self
            .client
            .patch(self.url("/api/tasks"))
            .json(&json!({ "id": id }))
            .send()
            .await?;
        read_json(res).await
    }

    async fn delete_task(&self, id: &str) -> Result<(), ClientError> {
        let res = self
            .client
            .delete(self.url("/api/tasks"))
            .json(&json!({ "id": id }))
            .send()
            .await?;
        read_json::<Value>(res).await.map(|_| ())
    }

    async fn fetch_schedule(&self, request: &ScheduleRequest) -> Result<String, ClientError> {
        let res = self
            .client
            .post(self.url("/api/ai/schedule"))
            .json(request)
            .send()
            .await?;
        Ok(field(read_json(res).await?, "schedule"))
    }

    async fn fetch_suggestions(&self) -> Result<String, ClientError> {
        let res = self.client.get(self.url("/api/ai/suggest")).send().await?;
        Ok(field(read_json(res).await?, "suggestions"))
    }

    async fn fetch_plan(&self, text: &str) -> Result<String, ClientError> {
        let res = self
            .client
            .post(self.url("/api/ai/custom"))
            .json(&json!({ "text": text }))
            .send()
            .await?;
        Ok(field(read_json(res).await?, "plan"))
    }
}
