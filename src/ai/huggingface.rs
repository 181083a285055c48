use super::{CompletionProvider, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_MODEL_URL: &str =
    "https://router.huggingface.co/hf-inference/models/google/flan-t5-base";

/// Hugging Face inference endpoint for a text2text model.
pub struct HuggingFaceProvider {
    client: Client,
    model_url: String,
    api_key: Option<String>,
}

impl HuggingFaceProvider {
    pub fn new(
        model_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            model_url: model_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }
}

#[async_trait]
impl CompletionProvider for HuggingFaceProvider {
    fn name(&self) -> &str {
        "huggingface"
    }

    fn credential_var(&self) -> &'static str {
        "HF_API_KEY"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, prompt: &str) -> Result<Option<String>, ProviderError> {
        let api_key = self.api_key.as_deref().unwrap_or_default();

        let res = self
            .client
            .post(&self.model_url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&json!({ "inputs": prompt }))
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

        Ok(data[0]["generated_text"].as_str().map(str::to_string))
    }
}
