use async_trait::async_trait;
use std::sync::Mutex;

use super::traits::{CompletionProvider, ProviderError, TaskType};

type CompleteFn = Box<dyn Fn(&str) -> Result<String, ProviderError> + Send + Sync>;
type EmbedFn = Box<dyn Fn(&str, TaskType) -> Result<Vec<f32>, ProviderError> + Send + Sync>;

/// In-process provider answering from closures and recording every request.
pub struct ScriptedProvider {
    complete_fn: CompleteFn,
    embed_fn: EmbedFn,
    pub prompts: Mutex<Vec<String>>,
    pub embedded: Mutex<Vec<(String, TaskType)>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            complete_fn: Box::new(|_| Ok("resposta".to_string())),
            embed_fn: Box::new(|_, _| Ok(vec![1.0, 0.0])),
            prompts: Mutex::new(Vec::new()),
            embedded: Mutex::new(Vec::new()),
        }
    }

    pub fn with_complete<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<String, ProviderError> + Send + Sync + 'static,
    {
        self.complete_fn = Box::new(f);
        self
    }

    pub fn with_embed<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, TaskType) -> Result<Vec<f32>, ProviderError> + Send + Sync + 'static,
    {
        self.embed_fn = Box::new(f);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn embedded(&self) -> Vec<(String, TaskType)> {
        self.embedded.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.complete_fn)(prompt)
    }

    async fn generate_embedding(&self, text: &str, task: TaskType) -> Result<Vec<f32>, ProviderError> {
        self.embedded.lock().unwrap().push((text.to_string(), task));
        (self.embed_fn)(text, task)
    }

    fn get_model_info(&self) -> String {
        "scripted".to_string()
    }
}
