use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::document::truncate_chars;
use crate::providers::{CompletionProvider, ProviderError, RetryPolicy, TaskType};

/// Document text sent to the oracle is cut to this many characters.
pub const MAX_ORACLE_CHARS: usize = 2000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityHints {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
}

impl EntityHints {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.field.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reformulation {
    pub reformulated: String,
    #[serde(default)]
    pub entities: EntityHints,
}

impl Reformulation {
    fn verbatim(query: &str) -> Self {
        Self {
            reformulated: query.to_string(),
            entities: EntityHints::default(),
        }
    }
}

/// Parses the oracle's reformulation reply, tolerating Markdown code fences.
/// Blank hint values are treated as absent.
pub fn parse_reformulation(response: &str) -> Option<Reformulation> {
    let cleaned = response.replace("```json", "").replace("```", "");
    let mut parsed: Reformulation = serde_json::from_str(cleaned.trim()).ok()?;
    if parsed.reformulated.trim().is_empty() {
        return None;
    }

    let non_blank = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    parsed.entities.name = non_blank(parsed.entities.name.take());
    parsed.entities.field = non_blank(parsed.entities.field.take());
    Some(parsed)
}

/// Text and embedding calls against the generative service, each wrapped in
/// its retry policy.
#[derive(Clone)]
pub struct Oracle {
    provider: Arc<dyn CompletionProvider>,
    text_retry: RetryPolicy,
    embed_retry: RetryPolicy,
}

impl Oracle {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self::with_policies(provider, RetryPolicy::text_default(), RetryPolicy::embedding_default())
    }

    pub fn with_policies(provider: Arc<dyn CompletionProvider>, text_retry: RetryPolicy, embed_retry: RetryPolicy) -> Self {
        Self {
            provider,
            text_retry,
            embed_retry,
        }
    }

    pub fn model_info(&self) -> String {
        self.provider.get_model_info()
    }

    async fn generate(&self, label: &str, prompt: &str) -> Result<String, ProviderError> {
        let provider = &self.provider;
        self.text_retry.run(label, move || provider.complete(prompt)).await
    }

    pub async fn classify(&self, text: &str) -> Result<String, ProviderError> {
        let prompt = format!(
            "Classifique o seguinte texto em uma categoria principal: {}",
            truncate_chars(text, MAX_ORACLE_CHARS)
        );
        self.generate("classify", &prompt).await
    }

    pub async fn subclassify(&self, text: &str, category: &str) -> Result<String, ProviderError> {
        let prompt = format!(
            "Dada a categoria \"{}\", classifique o seguinte texto em uma subcategoria: {}",
            category,
            truncate_chars(text, MAX_ORACLE_CHARS)
        );
        self.generate("subclassify", &prompt).await
    }

    pub async fn observe(&self, text: &str) -> Result<String, ProviderError> {
        let prompt = format!(
            "Faça uma observação inteligente sobre o conteúdo do seguinte texto: {}",
            truncate_chars(text, MAX_ORACLE_CHARS)
        );
        self.generate("observe", &prompt).await
    }

    pub async fn embed(&self, text: &str, task: TaskType) -> Result<Vec<f32>, ProviderError> {
        let text = truncate_chars(text, MAX_ORACLE_CHARS);
        let provider = &self.provider;
        self.embed_retry
            .run("embed", move || provider.generate_embedding(text, task))
            .await
    }

    /// Rewrites a user question into search phrasing plus entity hints.
    /// Never fails: any oracle or parse error yields the question verbatim.
    pub async fn reformulate(&self, query: &str) -> Reformulation {
        let prompt = format!(
            r#"Analise a seguinte pergunta em linguagem natural e reformule-a para uma busca em um sistema de contratos de locação. Identifique entidades (ex.: nome de pessoa) e o campo buscado (ex.: valor do aluguel). Retorne APENAS o JSON puro, sem marcações de Markdown como ```json ou ```. Exemplo:
{{
  "reformulated": "valor do aluguel no contrato onde João é o locatário",
  "entities": {{ "name": "João", "field": "valor do aluguel" }}
}}
Pergunta: {}"#,
            query
        );

        match self.generate("reformulate", &prompt).await {
            Ok(response) => parse_reformulation(&response).unwrap_or_else(|| {
                log::warn!("Unparsable reformulation, using question verbatim: {:?}", response);
                Reformulation::verbatim(query)
            }),
            Err(e) => {
                log::warn!("Reformulation failed, using question verbatim: {}", e);
                Reformulation::verbatim(query)
            }
        }
    }

    pub async fn answer(&self, prompt: &str) -> Result<String, ProviderError> {
        let prompt = format!(
            "Responda à seguinte pergunta em linguagem natural, clara e acessível, evitando jargões técnicos como \"locatário\" ou \"locador\". Use termos como \"inquilino\" ou \"proprietário\" quando apropriado: {}",
            prompt
        );
        self.generate("answer", &prompt).await
    }
}
