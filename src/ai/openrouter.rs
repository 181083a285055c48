use super::{CompletionProvider, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "x-ai/grok-4.1-fast:free";

const REFERER: &str = "https://daily-tasks-ai.vercel.app";
const APP_TITLE: &str = "DailyTasksAI";

/// Chat-completions client for OpenRouter (or any OpenAI-compatible gateway).
pub struct OpenRouterProvider {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenRouterProvider {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    fn credential_var(&self) -> &'static str {
        "OPENROUTER_API_KEY"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, prompt: &str) -> Result<Option<String>, ProviderError> {
        let api_key = self.api_key.as_deref().unwrap_or_default();
        let url = format!("{}/chat/completions", self.base_url);

        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let res = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", REFERER)
            .header("X-Title", APP_TITLE)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        let raw = res.text().await?;

        if !status.is_success() {
            return Err(ProviderError::Upstream {
                status: status.as_u16(),
                body: raw,
            });
        }

        let data: Value = serde_json::from_str(&raw)
            .map_err(|e| ProviderError::Transport(format!("invalid response body: {}", e)))?;

        Ok(data["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string))
    }
}
