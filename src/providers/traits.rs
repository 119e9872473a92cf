use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Rate limited by provider: {0}")]
    RateLimited(String),
    #[error("API request failed: Status {status}, Body: {body}")]
    Api { status: u16, body: String },
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
    #[error("Gave up after {attempts} rate-limited attempts")]
    RetriesExhausted { attempts: u32 },
}

impl ProviderError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ProviderError::RateLimited(_))
    }
}

/// Embedding task hint understood by the embedding endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::RetrievalDocument => "RETRIEVAL_DOCUMENT",
            TaskType::RetrievalQuery => "RETRIEVAL_QUERY",
        }
    }
}

/// A single attempt against the remote text/embedding service. Retrying is
/// the caller's business.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;

    async fn generate_embedding(&self, text: &str, task: TaskType) -> Result<Vec<f32>, ProviderError>;

    fn get_model_info(&self) -> String;
}
