use thiserror::Error;

use crate::database::store::{DocumentStore, StoreError, DEFAULT_TOP_K};
use crate::document::{Document, Landlord, Tenant};
use crate::llm::oracle::{EntityHints, Oracle, MAX_ORACLE_CHARS};
use crate::providers::{ProviderError, TaskType};

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Failed to embed question: {0}")]
    Embedding(#[source] ProviderError),
    #[error("Failed to retrieve documents: {0}")]
    Retrieval(#[from] StoreError),
    #[error("Failed to compose answer: {0}")]
    Answer(#[source] ProviderError),
}

#[derive(Debug, Clone)]
pub struct QueryResult {
    pub reformulated: String,
    pub entities: EntityHints,
    pub documents: Vec<Document>,
    pub answer: String,
}

impl QueryResult {
    pub fn relevant_doc_names(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.name.clone()).collect()
    }

    pub fn landlords(&self) -> Vec<Option<Landlord>> {
        self.documents.iter().map(|d| d.locador.clone()).collect()
    }

    pub fn tenants(&self) -> Vec<Option<Tenant>> {
        self.documents.iter().map(|d| d.locatario.clone()).collect()
    }
}

/// Builds the answer-composition prompt from the question, the retrieved
/// excerpts and any entity hints.
pub fn build_prompt(question: &str, documents: &[&Document], entities: &EntityHints) -> String {
    let excerpts = documents
        .iter()
        .map(|doc| doc.excerpt(MAX_ORACLE_CHARS))
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = format!("Pergunta: {}\n\nTrechos relevantes:\n{}", question, excerpts);
    if let Some(name) = &entities.name {
        prompt.push_str(&format!(
            "\n\nContexto: A pergunta provavelmente se refere ao contrato onde {} é o inquilino.",
            name
        ));
    }
    if let Some(field) = &entities.field {
        prompt.push_str(&format!("\nFoquem em responder sobre o {}.", field));
    }
    prompt
}

pub struct QueryPipeline {
    oracle: Oracle,
    top_k: usize,
}

impl QueryPipeline {
    pub fn new(oracle: Oracle) -> Self {
        Self {
            oracle,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn oracle(&self) -> &Oracle {
        &self.oracle
    }

    pub async fn process_query(&self, store: &DocumentStore, question: &str) -> Result<QueryResult, QueryError> {
        let reformulation = self.oracle.reformulate(question).await;
        log::info!("Reformulated {:?} as {:?}", question, reformulation.reformulated);

        let query_embedding = self
            .oracle
            .embed(&reformulation.reformulated, TaskType::RetrievalQuery)
            .await
            .map_err(QueryError::Embedding)?;

        let similar = store.find_similar(&query_embedding, self.top_k)?;
        log::debug!(
            "Retrieved {:?}",
            similar.iter().map(|d| d.name.as_str()).collect::<Vec<_>>()
        );

        let prompt = build_prompt(&reformulation.reformulated, &similar, &reformulation.entities);
        let answer = self.oracle.answer(&prompt).await.map_err(QueryError::Answer)?;

        Ok(QueryResult {
            reformulated: reformulation.reformulated,
            entities: reformulation.entities,
            documents: similar.into_iter().cloned().collect(),
            answer,
        })
    }
}
