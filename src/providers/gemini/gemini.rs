use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::GeminiConfig;
use crate::providers::traits::{CompletionProvider, ProviderError, TaskType};

#[derive(Clone)]
pub struct GeminiProvider {
    api_key: String,
    client: Client,
    api_url: String,
    model: String,
    embedding_model: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

impl GeminiProvider {
    pub fn new(config: &GeminiConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            client: Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
        }
    }

    async fn post(&self, url: &str, body: &Value) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::RateLimited(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.api_url, self.model);
        let body = json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }]
        });

        let response_json: Value = self.post(&url, &body).await?.json().await?;

        response_json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                let debug_json = serde_json::to_string(&response_json).unwrap_or_default();
                ProviderError::InvalidResponse(debug_json)
            })
    }

    async fn generate_embedding(&self, text: &str, task: TaskType) -> Result<Vec<f32>, ProviderError> {
        let url = format!("{}/models/{}:embedContent", self.api_url, self.embedding_model);
        let body = json!({
            "content": { "parts": [{ "text": text }] },
            "taskType": task.as_str(),
        });

        let response = self.post(&url, &body).await?;
        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(parsed.embedding.values)
    }

    fn get_model_info(&self) -> String {
        format!("{} / {}", self.model, self.embedding_model)
    }
}
