//! Stateless proxy from task lists and free-text hints to hosted models.

mod huggingface;
mod openrouter;
pub mod prompt;

pub use huggingface::{HuggingFaceProvider, DEFAULT_MODEL_URL as HF_DEFAULT_MODEL_URL};
pub use openrouter::{
    OpenRouterProvider, DEFAULT_BASE_URL as OPENROUTER_DEFAULT_BASE_URL,
    DEFAULT_MODEL as OPENROUTER_DEFAULT_MODEL,
};

use crate::error::AiError;
use crate::models::ScheduleRequest;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub const NO_SCHEDULE: &str = "No schedule generated.";
pub const NO_SUGGESTIONS: &str = "No suggestions generated.";
pub const NO_PLAN: &str = "No plan generated.";

#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider answered with a failure status; carries its raw body.
    #[error("upstream returned {status}")]
    Upstream { status: u16, body: String },

    #[error("transport failure: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Transport(err.to_string())
    }
}

/// A hosted text-generation endpoint.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Environment variable holding the credential, used in error messages.
    fn credential_var(&self) -> &'static str;

    fn is_configured(&self) -> bool;

    /// Sends one prompt. `Ok(None)` means the response lacked a completion.
    async fn complete(&self, prompt: &str) -> Result<Option<String>, ProviderError>;
}

pub struct AiProxy {
    chat: Arc<dyn CompletionProvider>,
    plan: Arc<dyn CompletionProvider>,
}

impl AiProxy {
    pub fn new(chat: Arc<dyn CompletionProvider>, plan: Arc<dyn CompletionProvider>) -> Self {
        Self { chat, plan }
    }

    pub async fn schedule(&self, request: &ScheduleRequest) -> Result<String, AiError> {
        let prompt = prompt::schedule_prompt(request.hint.as_deref(), &request.tasks);
        run(self.chat.as_ref(), &prompt, NO_SCHEDULE).await
    }

    pub async fn suggest(&self) -> Result<String, AiError> {
        run(self.chat.as_ref(), &prompt::suggest_prompt(), NO_SUGGESTIONS).await
    }

    pub async fn plan(&self, text: &str) -> Result<String, AiError> {
        run(self.plan.as_ref(), &prompt::plan_prompt(text), NO_PLAN).await
    }
}

async fn run(
    provider: &dyn CompletionProvider,
    prompt: &str,
    fallback: &str,
) -> Result<String, AiError> {
    if !provider.is_configured() {
        tracing::warn!(provider = provider.name(), "credential missing, skipping call");
        return Err(AiError::Configuration(format!(
            "Missing {} in environment.",
            provider.credential_var()
        )));
    }

    match provider.complete(prompt).await {
        Ok(Some(text)) if !text.is_empty() => Ok(text),
        Ok(_) => {
            tracing::debug!(provider = provider.name(), "no completion in response");
            Ok(fallback.to_string())
        }
        Err(ProviderError::Upstream { status, body }) => {
            tracing::warn!(provider = provider.name(), status, "upstream reported failure");
            Err(AiError::Upstream(body))
        }
        Err(ProviderError::Transport(detail)) => {
            tracing::error!(provider = provider.name(), %detail, "AI call failed");
            Err(AiError::Connection)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fake::{FakeProvider, Reply};
    use super::*;
    use crate::models::TaskBrief;

    fn proxy(chat: Arc<FakeProvider>) -> AiProxy {
        AiProxy::new(chat, Arc::new(FakeProvider::unconfigured()))
    }

    #[tokio::test]
    async fn test_schedule_returns_completion() {
        let chat = Arc::new(FakeProvider::new(Reply::Text("08:00 gym")));
        let request = ScheduleRequest {
            hint: Some("gym in morning".to_string()),
            tasks: vec![TaskBrief {
                title: "Study".to_string(),
                due_at: "2024-01-01T18:00".to_string(),
                description: None,
            }],
        };

        let schedule = proxy(chat.clone()).schedule(&request).await.unwrap();
        assert_eq!(schedule, "08:00 gym");
        assert_eq!(chat.calls(), 1);

        let prompt = chat.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("1) Study - Due: 2024-01-01T18:00"));
    }

    #[tokio::test]
    async fn test_empty_request_falls_back_to_literal() {
        let chat = Arc::new(FakeProvider::new(Reply::Missing));
        let schedule = proxy(chat)
            .schedule(&ScheduleRequest::default())
            .await
            .unwrap();
        assert_eq!(schedule, NO_SCHEDULE);
    }

    #[tokio::test]
    async fn test_empty_completion_counts_as_missing() {
        let chat = Arc::new(FakeProvider::new(Reply::Text("")));
        assert_eq!(proxy(chat).suggest().await.unwrap(), NO_SUGGESTIONS);
    }

    #[tokio::test]
    async fn test_missing_credential_makes_no_call() {
        let chat = Arc::new(FakeProvider::unconfigured());
        let err = proxy(chat.clone())
            .schedule(&ScheduleRequest::default())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            AiError::Configuration("Missing FAKE_API_KEY in environment.".to_string())
        );
        assert_eq!(chat.calls(), 0);
    }

    #[tokio::test]
    async fn test_upstream_body_is_relayed_verbatim() {
        let body = r#"{"error":{"message":"Rate limit exceeded","code":429}}"#;
        let chat = Arc::new(FakeProvider::new(Reply::Upstream(body)));
        let err = proxy(chat).suggest().await.unwrap_err();
        assert_eq!(err, AiError::Upstream(body.to_string()));
    }

    #[tokio::test]
    async fn test_transport_failure_hides_detail() {
        let chat = Arc::new(FakeProvider::new(Reply::Transport));
        let err = proxy(chat).suggest().await.unwrap_err();
        assert_eq!(err, AiError::Connection);
        assert_eq!(err.to_string(), "AI connection failed.");
    }

    #[tokio::test]
    async fn test_plan_uses_plan_provider() {
        let chat = Arc::new(FakeProvider::new(Reply::Text("chat")));
        let plan = Arc::new(FakeProvider::new(Reply::Text("08:00 - Task A")));
        let proxy = AiProxy::new(chat.clone(), plan.clone());

        assert_eq!(proxy.plan("busy day").await.unwrap(), "08:00 - Task A");
        assert_eq!(chat.calls(), 0);
        assert_eq!(plan.calls(), 1);
    }
}
